//! Loading the classifier from its JSON artifact.
//!
//! The artifact is the trained ensemble exported to JSON:
//!
//! ```json
//! {
//!   "name": "voting_classifier",
//!   "feature_names": ["age", "marital_status", "..."],
//!   "classes": [0, 1],
//!   "voting": "soft",
//!   "weights": [1.0, 1.0],
//!   "estimators": [
//!     { "type": "logistic_regression", "coef": [...], "intercept": -0.4 },
//!     { "type": "decision_tree", "nodes": [
//!         { "feature": 7, "threshold": 6.5, "left": 1, "right": 2 },
//!         { "value": [40.0, 3.0] },
//!         { "value": [2.0, 51.0] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! `feature_names` must list the schema's features in schema order; the load
//! fails otherwise, so a reordered export is caught before any prediction.

use std::path::Path;

use serde::Deserialize;

use super::voting::{Estimator, Voting, VotingClassifier};
use crate::error::ModelError;
use crate::schema::FeatureSchema;

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    #[serde(default)]
    name: Option<String>,
    feature_names: Vec<String>,
    classes: Vec<i64>,
    #[serde(default)]
    voting: Voting,
    #[serde(default)]
    weights: Option<Vec<f64>>,
    estimators: Vec<Estimator>,
}

/// Load and validate the model at `path` against `schema`.
pub fn load_model(path: &Path, schema: &FeatureSchema) -> Result<VotingClassifier, ModelError> {
    if !path.is_file() {
        return Err(ModelError::Missing {
            path: path.to_path_buf(),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let artifact: ModelArtifact =
        serde_json::from_str(&raw).map_err(|e| ModelError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    check_feature_order(&artifact.feature_names, schema)?;

    let name = artifact.name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string())
    });

    let model = VotingClassifier::new(
        name,
        artifact.feature_names,
        artifact.classes,
        artifact.voting,
        artifact.weights,
        artifact.estimators,
    )
    .map_err(|reason| ModelError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;

    tracing::info!(
        path = %path.display(),
        estimators = model.estimators().len(),
        voting = ?model.voting(),
        "Loaded classifier"
    );
    Ok(model)
}

fn check_feature_order(names: &[String], schema: &FeatureSchema) -> Result<(), ModelError> {
    for (position, expected) in schema.names().enumerate() {
        let found = names.get(position).map(String::as_str).unwrap_or("<missing>");
        if found != expected {
            return Err(ModelError::FeatureOrderMismatch {
                position,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    if let Some(extra) = names.get(schema.len()) {
        return Err(ModelError::FeatureOrderMismatch {
            position: schema.len(),
            expected: "<end of schema>".to_string(),
            found: extra.clone(),
        });
    }
    Ok(())
}
