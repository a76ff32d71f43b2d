use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

// Serial for 9999-12-31 in the 1900 date system.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid filename regex"));

/// Lowercased extension of `file_name` if it is one we can decode.
pub fn supported_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Strips path components and anything outside `[A-Za-z0-9_.-]`.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let ascii: String = base.chars().map(strip_accent).collect();
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(ascii.trim(), "_");
    replaced.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Lowercase and strip the Portuguese diacritics found in sheet headers.
pub fn fold_accents(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_accent)
        .collect()
}

fn strip_accent(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let base = match lower {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => return c,
    };
    if c.is_uppercase() {
        base.to_ascii_uppercase()
    } else {
        base
    }
}

/// Converts a 1900-system spreadsheet serial into a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Renders a timestamp the way date cells appear in records.
pub fn render_datetime(value: &NaiveDateTime) -> String {
    if value.time() == chrono::NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Year-first formats only apply to input that starts with a four-digit year,
/// so `15-01-23` is not read as year 15.
fn year_width_fits(s: &str, format: &str) -> bool {
    if !format.starts_with("%Y") {
        return true;
    }
    match s.as_bytes().get(..5) {
        Some(prefix) => prefix[..4].iter().all(u8::is_ascii_digit) && !prefix[4].is_ascii_digit(),
        None => false,
    }
}

pub fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    // Two-digit year forms come first: `%Y` would read `23` as year 23.
    const DATETIME_FORMATS: [&str; 10] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%y %H:%M:%S",
        "%d/%m/%y %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 8] = [
        "%Y-%m-%d",
        "%d/%m/%y",
        "%d/%m/%Y",
        "%Y/%m/%d",
        "%d-%m-%y",
        "%d-%m-%Y",
        "%d.%m.%y",
        "%d.%m.%Y",
    ];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS.iter().filter(|f| year_width_fits(s, f)) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS.iter().filter(|f| year_width_fits(s, f)) {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}
