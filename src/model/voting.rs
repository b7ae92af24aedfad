//! Voting ensemble over logistic-regression and decision-tree estimators.
//!
//! Mirrors the arithmetic of a scikit-learn `VotingClassifier` exported to
//! JSON: soft voting averages class probabilities, hard voting counts each
//! estimator's argmax. Weights scale both. Ties go to the lowest class index.

use serde::Deserialize;

use super::Classifier;
use crate::error::PredictionError;

/// Voting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voting {
    #[default]
    Hard,
    Soft,
}

/// A node of a fitted decision tree.
///
/// Splits send `x[feature] <= threshold` left.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Per-class weights (counts or probabilities).
        value: Vec<f64>,
    },
}

/// One member of the ensemble.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    /// Binary logistic regression: `P(classes[1]) = σ(coef·x + intercept)`.
    LogisticRegression { coef: Vec<f64>, intercept: f64 },
    DecisionTree { nodes: Vec<TreeNode> },
}

impl Estimator {
    /// Check the estimator's shape against the ensemble.
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self {
            Self::LogisticRegression { coef, intercept } => {
                if n_classes != 2 {
                    return Err(format!(
                        "logistic regression supports 2 classes, model has {n_classes}"
                    ));
                }
                if coef.len() != n_features {
                    return Err(format!(
                        "logistic regression has {} coefficients, expected {n_features}",
                        coef.len()
                    ));
                }
                if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
                    return Err("logistic regression has non-finite parameters".to_string());
                }
            }
            Self::DecisionTree { nodes } => {
                if nodes.is_empty() {
                    return Err("decision tree has no nodes".to_string());
                }
                for (i, node) in nodes.iter().enumerate() {
                    match node {
                        TreeNode::Split {
                            feature,
                            left,
                            right,
                            ..
                        } => {
                            if *feature >= n_features {
                                return Err(format!("tree node {i} splits on feature {feature}"));
                            }
                            // Children must point forward, which also rules out cycles.
                            if *left <= i || *right <= i || *left >= nodes.len() || *right >= nodes.len() {
                                return Err(format!("tree node {i} has invalid children"));
                            }
                        }
                        TreeNode::Leaf { value } => {
                            if value.len() != n_classes {
                                return Err(format!(
                                    "tree leaf {i} has {} class weights, expected {n_classes}",
                                    value.len()
                                ));
                            }
                            if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                                return Err(format!("tree leaf {i} has invalid weights"));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Class probabilities for one row. Only called on validated estimators.
    pub(crate) fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match self {
            Self::LogisticRegression { coef, intercept } => {
                let z: f64 = coef.iter().zip(x).map(|(c, v)| c * v).sum::<f64>() + intercept;
                let p = 1.0 / (1.0 + (-z).exp());
                vec![1.0 - p, p]
            }
            Self::DecisionTree { nodes } => {
                let mut i = 0;
                loop {
                    match &nodes[i] {
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            let v = x.get(*feature).copied().unwrap_or(f64::NAN);
                            i = if v <= *threshold { *left } else { *right };
                        }
                        TreeNode::Leaf { value } => {
                            let total: f64 = value.iter().sum();
                            if total > 0.0 {
                                return value.iter().map(|v| v / total).collect();
                            }
                            let n = value.len() as f64;
                            return vec![1.0 / n; value.len()];
                        }
                    }
                }
            }
        }
    }
}

/// Index of the largest value; first one wins on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// A fitted voting ensemble.
#[derive(Debug, Clone)]
pub struct VotingClassifier {
    name: String,
    feature_names: Vec<String>,
    classes: Vec<i64>,
    voting: Voting,
    weights: Vec<f64>,
    estimators: Vec<Estimator>,
}

impl VotingClassifier {
    /// Assemble and validate an ensemble. `weights` defaults to all ones.
    pub fn new(
        name: impl Into<String>,
        feature_names: Vec<String>,
        classes: Vec<i64>,
        voting: Voting,
        weights: Option<Vec<f64>>,
        estimators: Vec<Estimator>,
    ) -> Result<Self, String> {
        if estimators.is_empty() {
            return Err("ensemble has no estimators".to_string());
        }
        if classes.len() < 2 {
            return Err(format!("expected at least 2 classes, got {}", classes.len()));
        }
        let weights = weights.unwrap_or_else(|| vec![1.0; estimators.len()]);
        if weights.len() != estimators.len() {
            return Err(format!(
                "{} weights for {} estimators",
                weights.len(),
                estimators.len()
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("weights must be finite and non-negative".to_string());
        }
        for (i, estimator) in estimators.iter().enumerate() {
            estimator
                .validate(feature_names.len(), classes.len())
                .map_err(|e| format!("estimator {i}: {e}"))?;
        }

        Ok(Self {
            name: name.into(),
            feature_names,
            classes,
            voting,
            weights,
            estimators,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn voting(&self) -> Voting {
        self.voting
    }

    pub fn estimators(&self) -> &[Estimator] {
        &self.estimators
    }

    /// Aggregated per-class scores for one row.
    fn scores(&self, x: &[f64]) -> Vec<f64> {
        let mut scores = vec![0.0; self.classes.len()];
        for (estimator, weight) in self.estimators.iter().zip(&self.weights) {
            let proba = estimator.predict_proba(x);
            match self.voting {
                Voting::Soft => {
                    for (s, p) in scores.iter_mut().zip(&proba) {
                        *s += weight * p;
                    }
                }
                Voting::Hard => scores[argmax(&proba)] += weight,
            }
        }
        scores
    }
}

impl Classifier for VotingClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn predict(&self, features: &[f64]) -> Result<i64, PredictionError> {
        if features.len() != self.n_features() {
            return Err(PredictionError::InputLength {
                expected: self.n_features(),
                found: features.len(),
            });
        }
        if let Some(i) = features.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::Failed {
                model: self.name.clone(),
                reason: format!("feature {} is not finite", self.feature_names[i]),
            });
        }
        let scores = self.scores(features);
        tracing::debug!(model = %self.name, ?scores, "Ensemble scores");
        Ok(self.classes[argmax(&scores)])
    }
}
