//! Page layouts and the widget read/write-back pass.
//!
//! Each input page is a fixed list of widgets bound to storage keys. A render
//! pass reads every widget's stored value (or its default), writes it back, and
//! returns descriptors the presentation layer can draw. Writing back makes a
//! visited page's defaults part of the intake, the same as a user leaving a
//! widget untouched.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::state::{IntakeState, NavAction, WizardPage};
use crate::error::IntakeError;
use crate::schema::{Domain, FeatureSchema, FieldValue, LAST_MENSTRUAL_DATE};

/// Kind of input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    NumberInput,
    Slider,
    Select,
    Radio,
    DateInput,
}

/// A widget on a page, bound to one storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub control: Control,
}

const fn w(key: &'static str, label: &'static str, control: Control) -> WidgetSpec {
    WidgetSpec { key, label, control }
}

const DEMOGRAPHICS: &[WidgetSpec] = &[
    w("age", "Age", Control::NumberInput),
    w("marital_status", "Marital Status", Control::Select),
    w("occupational_pattern", "Occupational Pattern", Control::Select),
    w("monthly_income", "Monthly Income", Control::NumberInput),
];

const HEALTH: &[WidgetSpec] = &[
    w("substance_usage_disorder", "Substance/Alcohol Use Disorder?", Control::Radio),
    w("suicide_self_harm", "History of Suicide or Self-Harm?", Control::Radio),
    w("pain_intensity", "Pain Intensity", Control::Select),
    w("total_widespread_index", "Widespread Pain Index (0–19)", Control::Slider),
    w("symptoms_experienced", "No. of Symptoms Experienced (0–41)", Control::Slider),
    w("sss_severity_score", "SSS Severity Score (0–12)", Control::Slider),
    w("resting_fmri_done", "Resting fMRI Done?", Control::Radio),
    w("comorb_presence", "Comorbidity Present?", Control::Radio),
];

const PHYSIOLOGY: &[WidgetSpec] = &[
    w("number_drugs_currently", "No. of Drugs Used Daily", Control::Slider),
    w("number_drugs_crisis", "No. of Drugs Used During Crisis", Control::Slider),
    w("daily_dose", "Daily Dose (Opioids)", Control::NumberInput),
    w("menstrual_cycle_duration", "Menstrual Cycle Duration (days)", Control::NumberInput),
    w("menstrual_cycle_regular", "Cycle Regularity", Control::Select),
    w("patient_weight", "Weight (kg)", Control::NumberInput),
    w("patient_height", "Height (cm)", Control::NumberInput),
    w("bmi", "BMI", Control::NumberInput),
    w("imd", "Daily Morphine Dose (IMD)", Control::NumberInput),
    w(LAST_MENSTRUAL_DATE, "Date of Last Menstrual Period", Control::DateInput),
];

/// Widgets shown on `page`. The results page has none.
pub fn widgets(page: WizardPage) -> &'static [WidgetSpec] {
    match page {
        WizardPage::Demographics => DEMOGRAPHICS,
        WizardPage::Health => HEALTH,
        WizardPage::Physiology => PHYSIOLOGY,
        WizardPage::Results => &[],
    }
}

/// A widget ready to draw.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetView {
    pub key: &'static str,
    pub label: &'static str,
    pub control: Control,
    pub value: FieldValue,
    /// Label of the current option for categorical widgets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<&'static str>,
    pub domain: Domain,
    /// Upper bound for date widgets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<NaiveDate>,
}

/// A navigation button ready to draw.
#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub action: NavAction,
    pub label: &'static str,
}

pub fn action_views(page: WizardPage) -> Vec<ActionView> {
    page.actions()
        .iter()
        .map(|action| ActionView {
            action: *action,
            label: action.label(page),
        })
        .collect()
}

/// Read every widget on the current page, write the value back, and describe
/// it. Idempotent: a second pass with no intervening updates changes nothing.
pub fn render_pass(
    schema: &FeatureSchema,
    state: &mut IntakeState,
    today: NaiveDate,
) -> Vec<WidgetView> {
    let mut views = Vec::new();
    for spec in widgets(state.page) {
        let Ok(binding) = schema.binding(spec.key) else {
            tracing::warn!(key = spec.key, "Widget bound to a key outside the schema");
            continue;
        };
        let field = binding.field();
        let value = state
            .get(spec.key)
            .unwrap_or_else(|| field.widget_default.resolve(today));
        state.set(spec.key, value);

        let display = match value {
            FieldValue::Int(code) => field.label_for(code),
            _ => None,
        };
        views.push(WidgetView {
            key: spec.key,
            label: spec.label,
            control: spec.control,
            value,
            display,
            domain: field.domain,
            latest: matches!(spec.control, Control::DateInput).then_some(today),
        });
    }
    views
}

/// Validate a batch of updates against the current page.
///
/// Either every update is valid and the normalised values are returned, or
/// the first failure is reported and nothing should be written.
pub fn validate_updates(
    schema: &FeatureSchema,
    page: WizardPage,
    updates: &BTreeMap<String, FieldValue>,
    today: NaiveDate,
) -> Result<Vec<(&'static str, FieldValue)>, IntakeError> {
    let mut accepted = Vec::with_capacity(updates.len());
    for (key, value) in updates {
        schema.binding(key)?;
        let spec = widgets(page)
            .iter()
            .find(|w| w.key == key.as_str())
            .ok_or_else(|| IntakeError::NotOnPage {
                name: key.clone(),
                page,
            })?;
        let value = schema.validate(key, *value, today)?;
        accepted.push((spec.key, value));
    }
    Ok(accepted)
}

/// Info lines shown under the widgets.
pub fn info_lines(state: &IntakeState, today: NaiveDate) -> Vec<String> {
    match state.page {
        WizardPage::Physiology => vec![format!(
            "Days Since Last Menstrual: {}",
            state.days_since_last_menstrual(today)
        )],
        _ => Vec::new(),
    }
}
