//! Wizard pages and the per-session intake record.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{FeatureField, FeatureKind, FieldValue, LAST_MENSTRUAL_DATE};

/// The pages of the intake wizard.
///
/// Progresses linearly: Demographics → Health → Physiology → Results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPage {
    #[default]
    Demographics,
    Health,
    Physiology,
    Results,
}

/// A navigation button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    Back,
    Next,
    StartOver,
}

impl NavAction {
    /// Button caption on `page`.
    pub fn label(&self, page: WizardPage) -> &'static str {
        match (self, page) {
            (Self::Next, WizardPage::Physiology) => "Submit & Predict",
            (Self::Next, _) => "Next",
            (Self::Back, _) => "Back",
            (Self::StartOver, _) => "Start Over",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Back => "back",
            Self::Next => "next",
            Self::StartOver => "start over",
        }
    }
}

impl WizardPage {
    pub const ALL: [WizardPage; 4] = [
        Self::Demographics,
        Self::Health,
        Self::Physiology,
        Self::Results,
    ];

    /// Zero-based page cursor.
    pub fn index(&self) -> u8 {
        match self {
            Self::Demographics => 0,
            Self::Health => 1,
            Self::Physiology => 2,
            Self::Results => 3,
        }
    }

    /// Page reached by `Next`, if the page has a Next button.
    pub fn next(&self) -> Option<WizardPage> {
        match self {
            Self::Demographics => Some(Self::Health),
            Self::Health => Some(Self::Physiology),
            Self::Physiology => Some(Self::Results),
            Self::Results => None,
        }
    }

    /// Page reached by `Back`. Neither the first page nor the results page
    /// has a Back button.
    pub fn back(&self) -> Option<WizardPage> {
        match self {
            Self::Health => Some(Self::Demographics),
            Self::Physiology => Some(Self::Health),
            Self::Demographics | Self::Results => None,
        }
    }

    /// Buttons shown on this page, in display order.
    pub fn actions(&self) -> &'static [NavAction] {
        match self {
            Self::Demographics => &[NavAction::Next],
            Self::Health | Self::Physiology => &[NavAction::Back, NavAction::Next],
            Self::Results => &[NavAction::StartOver],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Demographics => "Demographic Information",
            Self::Health => "Health & Clinical Info",
            Self::Physiology => "Medication & Physiological Metrics",
            Self::Results => "Model Detection",
        }
    }

    /// Whether this is an input page (as opposed to the results page).
    pub fn collects_input(&self) -> bool {
        !matches!(self, Self::Results)
    }
}

impl std::fmt::Display for WizardPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Demographics => "demographics",
            Self::Health => "health",
            Self::Physiology => "physiology",
            Self::Results => "results",
        };
        write!(f, "{s}")
    }
}

/// Values collected in one session plus the page cursor.
///
/// Unset fields are absent from `values`. Values are only replaced, never
/// removed one by one; [`IntakeState::reset`] clears everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeState {
    pub page: WizardPage,
    values: BTreeMap<String, FieldValue>,
}

impl IntakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.values.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Store a value. Callers validate first.
    pub(crate) fn set(&mut self, key: &str, value: FieldValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Back to a blank first page.
    pub fn reset(&mut self) {
        self.values.clear();
        self.page = WizardPage::Demographics;
    }

    /// Days between the stored last menstrual date and `today`, or -1 when
    /// no date is stored.
    pub fn days_since_last_menstrual(&self, today: NaiveDate) -> i64 {
        self.get(LAST_MENSTRUAL_DATE)
            .and_then(|v| v.as_date())
            .map(|date| (today - date).num_days())
            .unwrap_or(-1)
    }

    /// Numeric value of a feature, derived fields computed against `today`.
    /// `None` when the user never set it.
    pub fn feature_value(&self, field: &FeatureField, today: NaiveDate) -> Option<f64> {
        match field.kind {
            FeatureKind::DateDerived { source } => self
                .get(source)
                .and_then(|v| v.as_date())
                .map(|date| (today - date).num_days() as f64),
            _ => self.get(field.name).and_then(|v| v.as_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::schema::{DAYS_SINCE_LAST_MENSTRUAL, FeatureSchema};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn next_walks_all_pages() {
        let mut current = WizardPage::Demographics;
        for expected in [WizardPage::Health, WizardPage::Physiology, WizardPage::Results] {
            current = current.next().unwrap();
            assert_eq!(current, expected);
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn back_exists_only_on_middle_pages() {
        assert_eq!(WizardPage::Health.back(), Some(WizardPage::Demographics));
        assert_eq!(WizardPage::Physiology.back(), Some(WizardPage::Health));
        assert!(WizardPage::Demographics.back().is_none());
        assert!(WizardPage::Results.back().is_none());
    }

    #[test]
    fn actions_match_transitions() {
        for page in WizardPage::ALL {
            let actions = page.actions();
            assert_eq!(actions.contains(&NavAction::Next), page.next().is_some());
            assert_eq!(actions.contains(&NavAction::Back), page.back().is_some());
            assert_eq!(
                actions.contains(&NavAction::StartOver),
                page == WizardPage::Results
            );
        }
    }

    #[test]
    fn submit_label_on_physiology_page() {
        assert_eq!(NavAction::Next.label(WizardPage::Physiology), "Submit & Predict");
        assert_eq!(NavAction::Next.label(WizardPage::Health), "Next");
    }

    #[test]
    fn index_matches_order() {
        for (i, page) in WizardPage::ALL.iter().enumerate() {
            assert_eq!(page.index() as usize, i);
        }
    }

    #[test]
    fn display_matches_serde() {
        for page in WizardPage::ALL {
            let json = serde_json::to_string(&page).unwrap();
            assert_eq!(format!("\"{page}\""), json);
        }
    }

    #[test]
    fn days_since_last_menstrual_ten_days() {
        let mut state = IntakeState::new();
        state.set(
            LAST_MENSTRUAL_DATE,
            FieldValue::Date(today() - Duration::days(10)),
        );
        assert_eq!(state.days_since_last_menstrual(today()), 10);

        let field = FeatureSchema::fibromyalgia()
            .field(DAYS_SINCE_LAST_MENSTRUAL)
            .unwrap();
        assert_eq!(state.feature_value(field, today()), Some(10.0));
    }

    #[test]
    fn days_since_last_menstrual_unset_is_sentinel() {
        let state = IntakeState::new();
        assert_eq!(state.days_since_last_menstrual(today()), -1);
    }

    #[test]
    fn derived_value_follows_the_clock() {
        let mut state = IntakeState::new();
        state.set(LAST_MENSTRUAL_DATE, FieldValue::Date(today()));
        assert_eq!(state.days_since_last_menstrual(today()), 0);
        assert_eq!(
            state.days_since_last_menstrual(today() + Duration::days(3)),
            3
        );
    }

    #[test]
    fn reset_clears_values_and_cursor() {
        let mut state = IntakeState::new();
        state.set("age", FieldValue::Int(45));
        state.page = WizardPage::Results;
        state.reset();
        assert!(state.is_empty());
        assert_eq!(state.page, WizardPage::Demographics);
    }
}
