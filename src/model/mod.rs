//! Prediction service — the pre-trained classifier behind the results page.
//!
//! The core treats the classifier as an opaque, deterministic function of a
//! fixed-length vector. `PredictionService` adds the length check and the
//! class-code → label convention on top of any [`Classifier`].

pub mod artifact;
pub mod voting;

use std::sync::Arc;

use serde::Serialize;

use crate::error::PredictionError;
use crate::intake::vector::PredictionInput;

pub use artifact::load_model;
pub use voting::{Estimator, TreeNode, Voting, VotingClassifier};

/// A trained binary classifier.
pub trait Classifier: Send + Sync {
    /// Identifier for logs.
    fn name(&self) -> &str;

    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict the class code for one row.
    fn predict(&self, features: &[f64]) -> Result<i64, PredictionError>;
}

/// Meaning of a predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    ConditionPresent,
    HealthyControl,
}

impl ClassLabel {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ConditionPresent => "Fibromyalgia",
            Self::HealthyControl => "Healthy Control",
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which class code means what. Fixed by convention, not read from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMapping {
    pub condition_present: i64,
    pub healthy_control: i64,
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self {
            condition_present: 0,
            healthy_control: 1,
        }
    }
}

impl LabelMapping {
    pub fn label(&self, code: i64) -> Option<ClassLabel> {
        if code == self.condition_present {
            Some(ClassLabel::ConditionPresent)
        } else if code == self.healthy_control {
            Some(ClassLabel::HealthyControl)
        } else {
            None
        }
    }
}

/// Outcome of one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: ClassLabel,
    pub display: &'static str,
    pub class_code: i64,
    pub input: PredictionInput,
}

/// Classifier plus label convention, shared by every session.
#[derive(Clone)]
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    labels: LabelMapping,
}

impl PredictionService {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            labels: LabelMapping::default(),
        }
    }

    pub fn with_labels(mut self, labels: LabelMapping) -> Self {
        self.labels = labels;
        self
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Run the classifier on `input`.
    pub fn predict(&self, input: PredictionInput) -> Result<Prediction, PredictionError> {
        let expected = self.classifier.n_features();
        if input.len() != expected {
            return Err(PredictionError::InputLength {
                expected,
                found: input.len(),
            });
        }

        let code = self.classifier.predict(input.values())?;
        let label = self
            .labels
            .label(code)
            .ok_or(PredictionError::UnknownClass { code })?;

        tracing::info!(
            model = self.classifier.name(),
            class_code = code,
            label = %label,
            "Prediction complete"
        );

        Ok(Prediction {
            label,
            display: label.display_name(),
            class_code: code,
            input,
        })
    }
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("model", &self.classifier.name())
            .field("labels", &self.labels)
            .finish()
    }
}
