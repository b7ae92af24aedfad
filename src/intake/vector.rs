//! Assembly of the ordered feature vector fed to the classifier.

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

use super::state::IntakeState;
use crate::error::IntakeError;
use crate::schema::FeatureSchema;

/// What to do when a feature was never entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessPolicy {
    /// Substitute each field's declared default.
    #[default]
    Permissive,
    /// Refuse to build while any feature (or a derived feature's source) is
    /// missing.
    RequireAll,
}

/// One row for the classifier, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInput {
    schema: &'static FeatureSchema,
    values: Vec<f64>,
}

impl PredictionInput {
    /// Wrap raw values. The builder is the normal way to obtain one.
    pub fn from_values(schema: &'static FeatureSchema, values: Vec<f64>) -> Self {
        Self { schema, values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .position(name)
            .and_then(|i| self.values.get(i).copied())
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.schema.names().zip(self.values.iter().copied())
    }
}

// Serialised as an object whose keys keep schema order.
impl Serialize for PredictionInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Turns an [`IntakeState`] into a [`PredictionInput`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder {
    schema: &'static FeatureSchema,
    policy: CompletenessPolicy,
}

impl FeatureVectorBuilder {
    pub fn new(schema: &'static FeatureSchema, policy: CompletenessPolicy) -> Self {
        Self { schema, policy }
    }

    pub fn policy(&self) -> CompletenessPolicy {
        self.policy
    }

    /// Feature names (storage keys for derived fields) with no stored value,
    /// in schema order.
    pub fn missing(&self, state: &IntakeState) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.storage_key())
            .filter(|key| !state.contains(key))
            .map(String::from)
            .collect()
    }

    /// Build the vector: stored value per field in schema order, the field's
    /// default where absent. No range checks happen here.
    pub fn build(
        &self,
        state: &IntakeState,
        today: NaiveDate,
    ) -> Result<PredictionInput, IntakeError> {
        if self.policy == CompletenessPolicy::RequireAll {
            let missing = self.missing(state);
            if !missing.is_empty() {
                return Err(IntakeError::IncompleteIntake { missing });
            }
        }

        let values = self
            .schema
            .fields()
            .iter()
            .map(|field| state.feature_value(field, today).unwrap_or(field.default))
            .collect();

        Ok(PredictionInput::from_values(self.schema, values))
    }
}
