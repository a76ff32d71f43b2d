use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::{ColumnMapping, Record};

/// Cell as decoded from the workbook, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// `None` is the not-a-time sentinel.
    DateTime(Option<NaiveDateTime>),
}

/// Header row plus data rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    pub header: Vec<RawCell>,
    pub rows: Vec<Vec<RawCell>>,
}

/// Anything that can hand out sheets by name, in workbook order.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;
    fn grid(&mut self, name: &str) -> Result<RawGrid>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSheet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

/// Role assignment for one sheet: the serialized mapping plus the two
/// free-text parking columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub mapping: ColumnMapping,
    pub parking_operation: Option<String>,
    pub parking_billing: Option<String>,
}

/// What to do when a declared sheet cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetErrorPolicy {
    #[default]
    FailFast,
    Skip,
}

impl std::str::FromStr for SheetErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "abort" => Ok(SheetErrorPolicy::FailFast),
            "skip" | "continue" => Ok(SheetErrorPolicy::Skip),
            other => Err(format!("unknown sheet error policy '{}'", other)),
        }
    }
}
