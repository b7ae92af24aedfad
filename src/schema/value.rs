//! Raw values stored in an intake session.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A value entered through a widget.
///
/// Deserialised untagged: JSON integers become `Int`, other numbers `Float`,
/// and `"YYYY-MM-DD"` strings `Date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

impl FieldValue {
    /// Numeric view used when assembling a feature vector. Dates have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Date(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::Date(_) => "date",
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}
