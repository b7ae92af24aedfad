//! The fibromyalgia feature table.
//!
//! Order is the column order the classifier was trained on. Do not reorder.

use super::categories::{
    CYCLE_REGULARITY, MARITAL_STATUS, OCCUPATIONAL_PATTERN, PAIN_INTENSITY, YES_NO,
};
use super::{Domain, FeatureField, FeatureKind, WidgetDefault};
use crate::schema::FieldValue;

/// Stored key of the date the derived day count is computed from.
pub const LAST_MENSTRUAL_DATE: &str = "last_menstrual_date";

/// Derived feature; never set directly.
pub const DAYS_SINCE_LAST_MENSTRUAL: &str = "days_since_last_menstrual";

/// Sentinel for "not applicable".
pub const NOT_APPLICABLE: f64 = -1.0;

/// Earliest accepted menstrual date (January 1st of this year).
pub const EARLIEST_DATE_YEAR: i32 = 1900;

const fn int(name: &'static str, min: i64, max: Option<i64>) -> FeatureField {
    FeatureField {
        name,
        kind: FeatureKind::Integer,
        domain: Domain::IntRange { min, max },
        default: 0.0,
        widget_default: WidgetDefault::Value(FieldValue::Int(0)),
    }
}

const fn float(name: &'static str, min: f64, initial: f64) -> FeatureField {
    FeatureField {
        name,
        kind: FeatureKind::Float,
        domain: Domain::FloatRange { min, max: None },
        default: 0.0,
        widget_default: WidgetDefault::Value(FieldValue::Float(initial)),
    }
}

const fn categorical(
    name: &'static str,
    options: &'static [super::Category],
    initial: i64,
) -> FeatureField {
    FeatureField {
        name,
        kind: FeatureKind::Categorical,
        domain: Domain::Codes { options },
        default: 0.0,
        widget_default: WidgetDefault::Value(FieldValue::Int(initial)),
    }
}

pub(super) const FIBROMYALGIA_FIELDS: &[FeatureField] = &[
    // Demographics
    int("age", 0, Some(120)),
    categorical("marital_status", MARITAL_STATUS, 1),
    categorical("occupational_pattern", OCCUPATIONAL_PATTERN, 1),
    int("monthly_income", 0, None),
    // Health & clinical
    categorical("substance_usage_disorder", YES_NO, 0),
    categorical("suicide_self_harm", YES_NO, 0),
    categorical("pain_intensity", PAIN_INTENSITY, -1),
    int("total_widespread_index", 0, Some(19)),
    int("symptoms_experienced", 0, Some(41)),
    int("sss_severity_score", 0, Some(12)),
    categorical("resting_fmri_done", YES_NO, 0),
    categorical("comorb_presence", YES_NO, 0),
    // Medication & physiology
    int("number_drugs_currently", 0, Some(15)),
    int("number_drugs_crisis", 0, Some(20)),
    float("daily_dose", 0.0, 0.0),
    float("menstrual_cycle_duration", -1.0, -1.0),
    categorical("menstrual_cycle_regular", CYCLE_REGULARITY, -1),
    float("patient_weight", 0.0, 0.0),
    int("patient_height", 0, None),
    float("bmi", 0.0, 0.0),
    float("imd", 0.0, 0.0),
    FeatureField {
        name: DAYS_SINCE_LAST_MENSTRUAL,
        kind: FeatureKind::DateDerived {
            source: LAST_MENSTRUAL_DATE,
        },
        domain: Domain::PastDate {
            earliest_year: EARLIEST_DATE_YEAR,
        },
        default: NOT_APPLICABLE,
        widget_default: WidgetDefault::Today,
    },
];
