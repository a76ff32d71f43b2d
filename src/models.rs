use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A normalized cell. `Null` stands for every empty, NaN, infinite or
/// not-a-time source cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Key used when this value is counted as a category.
    pub fn category_key(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{:.1}", f),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Null => "null".to_string(),
        }
    }
}

/// One normalized row, keyed by column label in header order.
pub type Record = IndexMap<String, CellValue>;

/// Category -> count, ordered by descending count.
pub type FrequencyTable = IndexMap<String, u64>;

/// Period -> count, ordered ascending by period.
pub type PeriodTable = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub nome: Option<String>,
    pub tipo: Option<String>,
    pub cidade: Option<String>,
    pub contato: Option<String>,
    pub data_contato: Option<String>,
    pub contrato: Option<String>,
    pub grupo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(rename = "por_tipo", default, skip_serializing_if = "Option::is_none")]
    pub by_kind: Option<FrequencyTable>,
    #[serde(rename = "top_cidades", default, skip_serializing_if = "Option::is_none")]
    pub top_cities: Option<FrequencyTable>,
    #[serde(rename = "contatos_realizados", default, skip_serializing_if = "Option::is_none")]
    pub contacts_done: Option<u64>,
    #[serde(rename = "contatos_pendentes", default, skip_serializing_if = "Option::is_none")]
    pub contacts_pending: Option<u64>,
    #[serde(rename = "com_contrato", default, skip_serializing_if = "Option::is_none")]
    pub with_contract: Option<u64>,
    #[serde(rename = "sem_contrato", default, skip_serializing_if = "Option::is_none")]
    pub without_contract: Option<u64>,
    #[serde(rename = "top_grupos", default, skip_serializing_if = "Option::is_none")]
    pub top_groups: Option<FrequencyTable>,
    #[serde(rename = "evolucao_temporal", default, skip_serializing_if = "Option::is_none")]
    pub monthly: Option<PeriodTable>,
    #[serde(rename = "contatos_por_ano", default, skip_serializing_if = "Option::is_none")]
    pub yearly: Option<PeriodTable>,
    #[serde(rename = "ultimos_12_meses", default, skip_serializing_if = "Option::is_none")]
    pub last_12_months: Option<PeriodTable>,
    #[serde(rename = "operacao_estacionamento", default, skip_serializing_if = "Option::is_none")]
    pub parking_operation: Option<FrequencyTable>,
    #[serde(rename = "cobra_estacionamento", default, skip_serializing_if = "Option::is_none")]
    pub parking_billing: Option<FrequencyTable>,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        *self == Statistics::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetResult {
    pub name: String,
    pub total_records: usize,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub statistics: Statistics,
}

/// Output of one ingestion run. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestDocument {
    pub sheets: Vec<SheetResult>,
    pub last_updated: NaiveDateTime,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub sheets_count: usize,
    pub sheets: Vec<SheetSummary>,
    pub last_updated: NaiveDateTime,
}

impl From<&IngestDocument> for DocumentSummary {
    fn from(document: &IngestDocument) -> Self {
        Self {
            sheets_count: document.sheets.len(),
            sheets: document
                .sheets
                .iter()
                .map(|sheet| SheetSummary {
                    name: sheet.name.clone(),
                    records: sheet.total_records,
                })
                .collect(),
            last_updated: document.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys() {
        assert_eq!(CellValue::Text("Campinas".into()).category_key(), "Campinas");
        assert_eq!(CellValue::Int(3).category_key(), "3");
        assert_eq!(CellValue::Float(2.0).category_key(), "2.0");
        assert_eq!(CellValue::Float(2.5).category_key(), "2.5");
        assert_eq!(CellValue::Bool(true).category_key(), "true");
        assert_eq!(CellValue::Null.category_key(), "null");
    }

    #[test]
    fn test_cell_values_roundtrip_through_json() {
        let mut record = Record::new();
        record.insert("Nome".into(), CellValue::Text("Hospital A".into()));
        record.insert("Leitos".into(), CellValue::Int(120));
        record.insert("Taxa".into(), CellValue::Float(0.5));
        record.insert("Ativo".into(), CellValue::Bool(false));
        record.insert("Contrato".into(), CellValue::Null);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Nome":"Hospital A","Leitos":120,"Taxa":0.5,"Ativo":false,"Contrato":null}"#
        );
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_empty_statistics_serialize_to_empty_object() {
        let json = serde_json::to_value(Statistics::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_mapping_serializes_all_roles() {
        let mapping = ColumnMapping {
            nome: Some("Nome".into()),
            ..ColumnMapping::default()
        };
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nome": "Nome", "tipo": null, "cidade": null, "contato": null,
                "data_contato": null, "contrato": null, "grupo": null
            })
        );
    }
}
