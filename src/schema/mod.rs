//! Feature schema — the ordered, typed definition of every model input.
//!
//! The schema is a process-wide constant. Its field order is the column order
//! of the trained classifier; the vector builder walks it verbatim and the
//! model loader checks the artifact's feature names against it.

pub mod categories;
pub mod fields;
pub mod value;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::IntakeError;

pub use categories::Category;
pub use fields::{DAYS_SINCE_LAST_MENSTRUAL, LAST_MENSTRUAL_DATE, NOT_APPLICABLE};
pub use value::FieldValue;

/// Type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    Integer,
    Float,
    Categorical,
    /// Computed at read time from the stored date under `source`.
    DateDerived { source: &'static str },
}

/// Valid values for a feature (or, for derived features, for its source).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    IntRange { min: i64, max: Option<i64> },
    FloatRange { min: f64, max: Option<f64> },
    Codes { options: &'static [Category] },
    /// Dates from January 1st of `earliest_year` up to today.
    PastDate { earliest_year: i32 },
}

/// Value a widget starts with when nothing is stored yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetDefault {
    Value(FieldValue),
    Today,
}

impl WidgetDefault {
    pub fn resolve(&self, today: NaiveDate) -> FieldValue {
        match self {
            Self::Value(v) => *v,
            Self::Today => FieldValue::Date(today),
        }
    }
}

/// One entry of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureField {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub domain: Domain,
    /// Substituted into the feature vector when the value is absent.
    pub default: f64,
    /// Pre-populates the widget when the value is absent.
    pub widget_default: WidgetDefault,
}

impl FeatureField {
    /// Key under which the raw value is stored in a session.
    pub fn storage_key(&self) -> &'static str {
        match self.kind {
            FeatureKind::DateDerived { source } => source,
            _ => self.name,
        }
    }

    /// Options for categorical fields.
    pub fn options(&self) -> Option<&'static [Category]> {
        match self.domain {
            Domain::Codes { options } => Some(options),
            _ => None,
        }
    }

    /// Display label for a stored code.
    pub fn label_for(&self, code: i64) -> Option<&'static str> {
        self.options()
            .and_then(|options| categories::label_for(options, code))
    }

    /// Check `value` against the domain, normalising numeric representation.
    ///
    /// Whole floats are accepted for integer fields and integers are widened
    /// for float fields; anything else of the wrong type is rejected.
    pub fn check(
        &self,
        key: &str,
        value: FieldValue,
        today: NaiveDate,
    ) -> Result<FieldValue, IntakeError> {
        match self.domain {
            Domain::IntRange { min, max } => {
                let v = whole_number(key, value)?;
                if v < min || max.is_some_and(|max| v > max) {
                    return Err(out_of_range(key, value, min, max));
                }
                Ok(FieldValue::Int(v))
            }
            Domain::Codes { options } => {
                let code = whole_number(key, value)?;
                if categories::label_for(options, code).is_none() {
                    return Err(IntakeError::NotInDomain {
                        name: key.to_string(),
                        code,
                    });
                }
                Ok(FieldValue::Int(code))
            }
            Domain::FloatRange { min, max } => {
                let v = match value {
                    FieldValue::Int(v) => v as f64,
                    FieldValue::Float(v) if v.is_finite() => v,
                    other => return Err(wrong_type(key, "a finite number", other)),
                };
                if v < min || max.is_some_and(|max| v > max) {
                    return Err(out_of_range(key, value, min, max));
                }
                Ok(FieldValue::Float(v))
            }
            Domain::PastDate { earliest_year } => {
                let date = value
                    .as_date()
                    .ok_or_else(|| wrong_type(key, "a date", value))?;
                let earliest = NaiveDate::from_ymd_opt(earliest_year, 1, 1).unwrap_or(NaiveDate::MIN);
                if date < earliest || date > today {
                    return Err(IntakeError::OutOfRange {
                        name: key.to_string(),
                        value: date.to_string(),
                        range: format!("{earliest}..={today}"),
                    });
                }
                Ok(value)
            }
        }
    }
}

fn whole_number(key: &str, value: FieldValue) -> Result<i64, IntakeError> {
    match value {
        FieldValue::Int(v) => Ok(v),
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        FieldValue::Float(v) if v.fract() == 0.0 && v.is_finite() => {
            if v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(out_of_range(key, value, i64::MIN, Some(i64::MAX)))
            }
        }
        other => Err(wrong_type(key, "a whole number", other)),
    }
}

fn wrong_type(key: &str, expected: &'static str, found: FieldValue) -> IntakeError {
    IntakeError::WrongType {
        name: key.to_string(),
        expected,
        found: format!("{} {found}", found.type_name()),
    }
}

fn out_of_range<T: std::fmt::Display>(
    key: &str,
    value: FieldValue,
    min: T,
    max: Option<T>,
) -> IntakeError {
    let range = match max {
        Some(max) => format!("{min}..={max}"),
        None => format!("{min}.."),
    };
    IntakeError::OutOfRange {
        name: key.to_string(),
        value: value.to_string(),
        range,
    }
}

/// How a writable key maps onto the schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    /// The key is the feature itself.
    Feature(&'static FeatureField),
    /// The key is the stored source of a derived feature.
    Source(&'static FeatureField),
}

impl Binding {
    pub fn field(&self) -> &'static FeatureField {
        match self {
            Self::Feature(f) | Self::Source(f) => f,
        }
    }
}

/// The ordered feature list.
#[derive(Debug, PartialEq)]
pub struct FeatureSchema {
    fields: &'static [FeatureField],
}

static FIBROMYALGIA: FeatureSchema = FeatureSchema {
    fields: fields::FIBROMYALGIA_FIELDS,
};

impl FeatureSchema {
    /// The schema the fibromyalgia classifier was trained on.
    pub fn fibromyalgia() -> &'static FeatureSchema {
        &FIBROMYALGIA
    }

    pub fn fields(&self) -> &'static [FeatureField] {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn field(&self, name: &str) -> Option<&'static FeatureField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a key submitted by a widget. Derived features are rejected.
    pub fn binding(&self, key: &str) -> Result<Binding, IntakeError> {
        if let Some(field) = self.field(key) {
            return match field.kind {
                FeatureKind::DateDerived { .. } => Err(IntakeError::DerivedField {
                    name: key.to_string(),
                }),
                _ => Ok(Binding::Feature(field)),
            };
        }
        self.fields
            .iter()
            .find(|f| matches!(f.kind, FeatureKind::DateDerived { source } if source == key))
            .map(Binding::Source)
            .ok_or_else(|| IntakeError::UnknownField {
                name: key.to_string(),
            })
    }

    /// Validate and normalise a submitted value for `key`.
    pub fn validate(
        &self,
        key: &str,
        value: FieldValue,
        today: NaiveDate,
    ) -> Result<FieldValue, IntakeError> {
        self.binding(key)?.field().check(key, value, today)
    }
}
