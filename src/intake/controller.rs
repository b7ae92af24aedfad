//! WizardController — drives page transitions and owns one session's intake.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::clock::Clock;
use super::pages::{self, ActionView, WidgetView};
use super::state::{IntakeState, NavAction, WizardPage};
use super::vector::{CompletenessPolicy, FeatureVectorBuilder, PredictionInput};
use crate::error::{Error, IntakeError};
use crate::model::{Prediction, PredictionService};
use crate::schema::{FeatureSchema, FieldValue};

/// Everything the presentation layer needs to draw the current page.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub page: WizardPage,
    pub step: u8,
    pub title: &'static str,
    pub widgets: Vec<WidgetView>,
    pub info: Vec<String>,
    pub actions: Vec<ActionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

/// Body of the results page.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
    /// Set when the prediction failed; rendering the page again retries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Everything entered, plus the derived day count.
    pub summary: BTreeMap<String, serde_json::Value>,
}

/// The intake state machine for one session.
pub struct WizardController {
    schema: &'static FeatureSchema,
    clock: Arc<dyn Clock>,
    builder: FeatureVectorBuilder,
    state: IntakeState,
    prediction: Option<Prediction>,
}

impl WizardController {
    pub fn new(
        schema: &'static FeatureSchema,
        clock: Arc<dyn Clock>,
        policy: CompletenessPolicy,
    ) -> Self {
        Self {
            schema,
            clock,
            builder: FeatureVectorBuilder::new(schema, policy),
            state: IntakeState::new(),
            prediction: None,
        }
    }

    pub fn page(&self) -> WizardPage {
        self.state.page
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    /// Cached prediction, present once the results page has predicted.
    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    /// Move forward. The Physiology → Results edge is "Submit & Predict".
    pub fn next(&mut self) -> Result<WizardPage, IntakeError> {
        let to = self
            .state
            .page
            .next()
            .ok_or_else(|| self.invalid(NavAction::Next))?;
        Ok(self.go(to))
    }

    /// Move back one input page.
    pub fn back(&mut self) -> Result<WizardPage, IntakeError> {
        let to = self
            .state
            .page
            .back()
            .ok_or_else(|| self.invalid(NavAction::Back))?;
        Ok(self.go(to))
    }

    /// Discard everything and return to the first page. Results page only.
    pub fn start_over(&mut self) -> Result<WizardPage, IntakeError> {
        if self.state.page != WizardPage::Results {
            return Err(self.invalid(NavAction::StartOver));
        }
        self.state.reset();
        self.prediction = None;
        tracing::debug!("Intake reset");
        Ok(self.state.page)
    }

    fn go(&mut self, to: WizardPage) -> WizardPage {
        tracing::debug!(from = %self.state.page, to = %to, "Page transition");
        self.state.page = to;
        to
    }

    fn invalid(&self, action: NavAction) -> IntakeError {
        IntakeError::InvalidTransition {
            from: self.state.page,
            action: action.as_str(),
        }
    }

    /// Store `updates` for the current page, then take `action`.
    ///
    /// The action is checked first, so a rejected move writes nothing.
    pub fn submit(
        &mut self,
        action: NavAction,
        updates: &BTreeMap<String, FieldValue>,
    ) -> Result<WizardPage, IntakeError> {
        let to = match action {
            NavAction::Next => self.state.page.next(),
            NavAction::Back => self.state.page.back(),
            NavAction::StartOver => None,
        }
        .ok_or_else(|| self.invalid(action))?;
        self.apply(updates)?;
        Ok(self.go(to))
    }

    /// Write widget values for the current page.
    ///
    /// All updates are validated before any is stored, so a rejected batch
    /// leaves the intake unchanged. A render pass follows, filling the page's
    /// untouched widgets with their defaults.
    pub fn apply(&mut self, updates: &BTreeMap<String, FieldValue>) -> Result<(), IntakeError> {
        let today = self.clock.today();
        let accepted = pages::validate_updates(self.schema, self.state.page, updates, today)?;
        for (key, value) in accepted {
            self.state.set(key, value);
        }
        pages::render_pass(self.schema, &mut self.state, today);
        Ok(())
    }

    /// The vector the classifier would see right now.
    pub fn build_vector(&self) -> Result<PredictionInput, IntakeError> {
        self.builder.build(&self.state, self.clock.today())
    }

    /// Predict from the collected intake. Results page only.
    ///
    /// The vector is rebuilt against today's date on every call; a cached
    /// outcome is reused only while its input still matches. Failures are not
    /// cached and leave the intake untouched, so calling again retries.
    pub fn predict(&mut self, service: &PredictionService) -> Result<&Prediction, Error> {
        if self.state.page != WizardPage::Results {
            return Err(IntakeError::NotOnResults {
                page: self.state.page,
            }
            .into());
        }
        let input = self.build_vector()?;
        let prediction = match self.prediction.take() {
            Some(cached) if cached.input == input => cached,
            _ => service.predict(input)?,
        };
        let cached: &Prediction = self.prediction.insert(prediction);
        Ok(cached)
    }

    /// Render the current page.
    ///
    /// Input pages run a render pass (writing widget defaults back). The
    /// results page predicts, or reports why it could not.
    pub fn render(&mut self, service: &PredictionService) -> PageView {
        let today = self.clock.today();
        let page = self.state.page;
        let widgets = pages::render_pass(self.schema, &mut self.state, today);

        let result = (page == WizardPage::Results).then(|| {
            let (prediction, error) = match self.predict(service) {
                Ok(p) => (Some(p.clone()), None),
                Err(e) => {
                    tracing::warn!(error = %e, "Prediction failed");
                    (None, Some(e.to_string()))
                }
            };
            ResultView {
                prediction,
                error,
                summary: self.summary(),
            }
        });

        PageView {
            page,
            step: page.index() + 1,
            title: page.title(),
            widgets,
            info: pages::info_lines(&self.state, today),
            actions: pages::action_views(page),
            result,
        }
    }

    fn summary(&self) -> BTreeMap<String, serde_json::Value> {
        let mut summary: BTreeMap<String, serde_json::Value> = self
            .state
            .values()
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or_default()))
            .collect();
        summary.insert(
            crate::schema::DAYS_SINCE_LAST_MENSTRUAL.to_string(),
            self.state
                .days_since_last_menstrual(self.clock.today())
                .into(),
        );
        summary
    }
}

impl std::fmt::Debug for WizardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardController")
            .field("state", &self.state)
            .field("policy", &self.builder.policy())
            .field("predicted", &self.prediction.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::error::PredictionError;
    use crate::intake::clock::FixedClock;
    use crate::model::{ClassLabel, Classifier};
    use crate::schema::LAST_MENSTRUAL_DATE;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn controller(policy: CompletenessPolicy) -> WizardController {
        WizardController::new(
            FeatureSchema::fibromyalgia(),
            Arc::new(FixedClock(today())),
            policy,
        )
    }

    /// Healthy control for one exact vector, condition present otherwise.
    struct ExactMatch(Vec<f64>);

    impl Classifier for ExactMatch {
        fn name(&self) -> &str {
            "exact"
        }
        fn n_features(&self) -> usize {
            self.0.len()
        }
        fn predict(&self, features: &[f64]) -> Result<i64, PredictionError> {
            Ok(if features == self.0.as_slice() { 1 } else { 0 })
        }
    }

    /// Fails on the first call only.
    struct FlakyOnce(std::sync::atomic::AtomicBool);

    impl Classifier for FlakyOnce {
        fn name(&self) -> &str {
            "flaky"
        }
        fn n_features(&self) -> usize {
            22
        }
        fn predict(&self, _features: &[f64]) -> Result<i64, PredictionError> {
            if self.0.swap(true, std::sync::atomic::Ordering::SeqCst) {
                Ok(0)
            } else {
                Err(PredictionError::Failed {
                    model: "flaky".to_string(),
                    reason: "transient".to_string(),
                })
            }
        }
    }

    fn updates(pairs: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn constant(code: i64) -> PredictionService {
        struct Constant(i64);
        impl Classifier for Constant {
            fn name(&self) -> &str {
                "constant"
            }
            fn n_features(&self) -> usize {
                22
            }
            fn predict(&self, _features: &[f64]) -> Result<i64, PredictionError> {
                Ok(self.0)
            }
        }
        PredictionService::new(Arc::new(Constant(code)))
    }

    #[test]
    fn starts_on_demographics() {
        let c = controller(CompletenessPolicy::Permissive);
        assert_eq!(c.page(), WizardPage::Demographics);
        assert!(c.state().is_empty());
        assert!(c.prediction().is_none());
    }

    #[test]
    fn next_from_first_page_reaches_health() {
        let mut c = controller(CompletenessPolicy::Permissive);
        assert_eq!(c.next().unwrap(), WizardPage::Health);
    }

    #[test]
    fn back_from_health_ignores_field_values() {
        let mut c = controller(CompletenessPolicy::Permissive);
        c.next().unwrap();
        c.apply(&updates(&[("pain_intensity", FieldValue::Int(1))]))
            .unwrap();
        assert_eq!(c.back().unwrap(), WizardPage::Demographics);
        assert_eq!(c.state().get("pain_intensity"), Some(FieldValue::Int(1)));
    }

    #[test]
    fn transitions_without_buttons_are_rejected() {
        let mut c = controller(CompletenessPolicy::Permissive);
        assert!(matches!(
            c.back(),
            Err(IntakeError::InvalidTransition {
                from: WizardPage::Demographics,
                ..
            })
        ));
        assert!(c.start_over().is_err());

        c.next().unwrap();
        c.next().unwrap();
        c.next().unwrap();
        assert_eq!(c.page(), WizardPage::Results);
        assert!(c.next().is_err());
        assert!(c.back().is_err());
        assert_eq!(c.page(), WizardPage::Results);
    }

    /// Clock whose date tests can move.
    struct MovableClock(std::sync::Mutex<NaiveDate>);

    impl MovableClock {
        fn advance(&self, days: i64) {
            let mut date = self.0.lock().unwrap();
            *date += Duration::days(days);
        }
    }

    impl Clock for MovableClock {
        fn today(&self) -> NaiveDate {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn submit_checks_the_move_before_writing() {
        let mut c = controller(CompletenessPolicy::Permissive);
        let err = c
            .submit(NavAction::Back, &updates(&[("age", FieldValue::Int(77))]))
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { .. }));
        assert_eq!(c.page(), WizardPage::Demographics);
        assert!(c.state().get("age").is_none());

        assert!(
            c.submit(NavAction::StartOver, &BTreeMap::new())
                .is_err()
        );

        let page = c
            .submit(NavAction::Next, &updates(&[("age", FieldValue::Int(77))]))
            .unwrap();
        assert_eq!(page, WizardPage::Health);
        assert_eq!(c.state().get("age"), Some(FieldValue::Int(77)));
    }

    #[test]
    fn submit_with_invalid_values_stays_put() {
        let mut c = controller(CompletenessPolicy::Permissive);
        let err = c
            .submit(NavAction::Next, &updates(&[("age", FieldValue::Int(500))]))
            .unwrap_err();
        assert!(matches!(err, IntakeError::OutOfRange { .. }));
        assert_eq!(c.page(), WizardPage::Demographics);
    }

    #[test]
    fn results_follow_the_date_forward() {
        let clock = Arc::new(MovableClock(std::sync::Mutex::new(today())));
        let mut c = WizardController::new(
            FeatureSchema::fibromyalgia(),
            clock.clone(),
            CompletenessPolicy::Permissive,
        );
        let service = constant(0);

        c.next().unwrap();
        c.next().unwrap();
        c.apply(&updates(&[(
            LAST_MENSTRUAL_DATE,
            FieldValue::Date(today() - Duration::days(10)),
        )]))
        .unwrap();
        c.next().unwrap();

        let view = c.render(&service);
        let prediction = view.result.unwrap().prediction.unwrap();
        assert_eq!(prediction.input.get("days_since_last_menstrual"), Some(10.0));

        clock.advance(3);
        let result = c.render(&service).result.unwrap();
        let prediction = result.prediction.unwrap();
        assert_eq!(prediction.input.get("days_since_last_menstrual"), Some(13.0));
        assert_eq!(result.summary["days_since_last_menstrual"], 13);
        assert_eq!(
            c.prediction().unwrap().input,
            c.build_vector().unwrap()
        );
    }

    #[test]
    fn start_over_clears_everything() {
        let service = constant(0);
        let mut c = controller(CompletenessPolicy::Permissive);
        c.apply(&updates(&[("age", FieldValue::Int(30))])).unwrap();
        c.next().unwrap();
        c.next().unwrap();
        c.next().unwrap();
        c.render(&service);
        assert!(c.prediction().is_some());

        assert_eq!(c.start_over().unwrap(), WizardPage::Demographics);
        assert!(c.state().is_empty());
        assert!(c.prediction().is_none());
    }

    #[test]
    fn rejected_batch_changes_nothing() {
        let mut c = controller(CompletenessPolicy::Permissive);
        c.apply(&updates(&[("age", FieldValue::Int(40))])).unwrap();
        let before = c.state().clone();

        let err = c
            .apply(&updates(&[
                ("age", FieldValue::Int(50)),
                ("marital_status", FieldValue::Int(9)),
            ]))
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotInDomain { .. }));
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn predict_only_on_results() {
        let service = constant(1);
        let mut c = controller(CompletenessPolicy::Permissive);
        assert!(matches!(
            c.predict(&service),
            Err(Error::Intake(IntakeError::NotOnResults { .. }))
        ));
    }

    #[test]
    fn end_to_end_walkthrough() {
        let schema = FeatureSchema::fibromyalgia();
        let mut c = controller(CompletenessPolicy::Permissive);

        c.apply(&updates(&[
            ("age", FieldValue::Int(45)),
            ("marital_status", FieldValue::Int(2)),
        ]))
        .unwrap();
        c.next().unwrap();
        c.apply(&updates(&[("pain_intensity", FieldValue::Int(1))]))
            .unwrap();
        c.next().unwrap();
        c.apply(&BTreeMap::new()).unwrap();
        c.next().unwrap();

        let input = c.build_vector().unwrap();
        assert_eq!(input.len(), schema.len());
        assert_eq!(input.values()[schema.position("age").unwrap()], 45.0);
        assert_eq!(input.values()[schema.position("marital_status").unwrap()], 2.0);
        assert_eq!(input.get("pain_intensity"), Some(1.0));
        // Visited pages contribute widget defaults.
        assert_eq!(input.get("occupational_pattern"), Some(1.0));
        assert_eq!(input.get("menstrual_cycle_regular"), Some(-1.0));
        assert_eq!(input.get("days_since_last_menstrual"), Some(0.0));

        let service = PredictionService::new(Arc::new(ExactMatch(input.values().to_vec())));
        let view = c.render(&service);
        let result = view.result.unwrap();
        let prediction = result.prediction.unwrap();
        assert_eq!(prediction.label, ClassLabel::HealthyControl);
        assert_eq!(prediction.display, "Healthy Control");
        assert!(result.error.is_none());
        assert_eq!(result.summary["age"], serde_json::json!(45));
    }

    #[test]
    fn skipped_pages_default_silently_when_permissive() {
        let service = constant(0);
        let mut c = controller(CompletenessPolicy::Permissive);
        c.next().unwrap();
        c.next().unwrap();
        c.next().unwrap();
        let p = c.predict(&service).unwrap();
        assert_eq!(p.input.get("age"), Some(0.0));
        assert_eq!(p.input.get("days_since_last_menstrual"), Some(-1.0));
    }

    #[test]
    fn require_all_refuses_skipped_pages() {
        let service = constant(0);
        let mut c = controller(CompletenessPolicy::RequireAll);
        c.next().unwrap();
        c.next().unwrap();
        c.next().unwrap();
        let view = c.render(&service);
        let result = view.result.unwrap();
        assert!(result.prediction.is_none());
        assert!(result.error.unwrap().contains("incomplete"));
        assert!(c.prediction().is_none());
    }

    #[test]
    fn require_all_accepts_visited_pages() {
        let service = constant(0);
        let mut c = controller(CompletenessPolicy::RequireAll);
        for _ in 0..3 {
            c.apply(&BTreeMap::new()).unwrap();
            c.next().unwrap();
        }
        assert!(c.predict(&service).is_ok());
    }

    #[test]
    fn failed_prediction_can_be_retried() {
        let service = PredictionService::new(Arc::new(FlakyOnce(Default::default())));
        let mut c = controller(CompletenessPolicy::Permissive);
        c.apply(&updates(&[("age", FieldValue::Int(33))])).unwrap();
        for _ in 0..3 {
            c.next().unwrap();
        }
        let before = c.state().clone();

        let first = c.render(&service).result.unwrap();
        assert!(first.error.unwrap().contains("transient"));
        assert_eq!(c.state(), &before);

        let second = c.render(&service).result.unwrap();
        assert_eq!(
            second.prediction.unwrap().label,
            ClassLabel::ConditionPresent
        );
    }

    #[test]
    fn prediction_is_cached_until_start_over() {
        let service = constant(1);
        let mut c = controller(CompletenessPolicy::Permissive);
        for _ in 0..3 {
            c.next().unwrap();
        }
        c.predict(&service).unwrap();
        let other = constant(0);
        assert_eq!(c.predict(&other).unwrap().class_code, 1);
    }

    #[test]
    fn page_view_shape() {
        let service = constant(0);
        let mut c = controller(CompletenessPolicy::Permissive);
        c.next().unwrap();
        c.next().unwrap();
        c.apply(&updates(&[(
            LAST_MENSTRUAL_DATE,
            FieldValue::Date(today() - Duration::days(10)),
        )]))
        .unwrap();
        let view = c.render(&service);
        assert_eq!(view.step, 3);
        assert_eq!(view.widgets.len(), 10);
        assert_eq!(view.info, vec!["Days Since Last Menstrual: 10"]);
        let labels: Vec<_> = view.actions.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["Back", "Submit & Predict"]);
        assert!(view.result.is_none());
    }
}
