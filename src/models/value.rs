use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A data model as supplied by the collaborating data provider.
pub type Model = serde_json::Value;

/// Opaque row key supplied alongside each model.
pub type Key = serde_json::Value;

/// One row of the unpaginated result set.
///
/// `index` is the zero-based sequence position within the full result, not
/// within the current batch.
#[derive(Debug, Clone)]
pub struct Row {
    pub model: Model,
    pub key: Key,
    pub index: u64,
}

/// A single resolved cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// A spreadsheet formula, stored with its leading `=`.
    Formula(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert a JSON scalar into a cell value. Arrays and objects are
    /// carried as their JSON text so they survive into text formats.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else {
                    CellValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Loose equality used for group-boundary detection: values are compared
    /// through their display text, so `Int(1)` and `Text("1")` belong to the
    /// same run.
    pub fn loose_eq(&self, other: &CellValue) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Formula(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_displays_empty() {
        assert_eq!(CellValue::Null.to_string(), "");
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(CellValue::from_json(&serde_json::json!(3)), CellValue::Int(3));
        assert_eq!(
            CellValue::from_json(&serde_json::json!(2.5)),
            CellValue::Float(2.5)
        );
        assert_eq!(
            CellValue::from_json(&serde_json::json!("x")),
            CellValue::Text("x".to_string())
        );
        assert_eq!(CellValue::from_json(&serde_json::Value::Null), CellValue::Null);
    }

    #[test]
    fn test_loose_equality_coerces_types() {
        assert!(CellValue::Int(1).loose_eq(&CellValue::Text("1".to_string())));
        assert!(!CellValue::Int(1).loose_eq(&CellValue::Int(2)));
    }

    #[test]
    fn test_float_display_has_no_trailing_zero() {
        assert_eq!(CellValue::Float(2.0).to_string(), "2");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
    }
}
