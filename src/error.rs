//! Error types for the intake service.

use std::path::PathBuf;

use uuid::Uuid;

use crate::intake::state::WizardPage;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while locating or loading the model artifact.
///
/// All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model file '{}' not found. Please ensure it is in the app directory.", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read model file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model file '{}': {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("Model feature {position} is '{found}' but the intake schema expects '{expected}'")]
    FeatureOrderMismatch {
        position: usize,
        expected: String,
        found: String,
    },
}

/// Errors raised by a prediction call. Recoverable: intake state is untouched.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Feature vector has {found} values, model expects {expected}")]
    InputLength { expected: usize, found: usize },

    #[error("Model returned unknown class code {code}")]
    UnknownClass { code: i64 },

    #[error("Classifier {model} failed: {reason}")]
    Failed { model: String, reason: String },
}

/// Errors raised by the wizard and its field writers.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    #[error("Field {name} is not entered on the {page} page")]
    NotOnPage { name: String, page: WizardPage },

    #[error("Field {name} is derived and cannot be set directly")]
    DerivedField { name: String },

    #[error("Value {value} for {name} is outside {range}")]
    OutOfRange {
        name: String,
        value: String,
        range: String,
    },

    #[error("Code {code} is not a valid option for {name}")]
    NotInDomain { name: String, code: i64 },

    #[error("Field {name} expects {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Cannot {action} from the {from} page")]
    InvalidTransition { from: WizardPage, action: &'static str },

    #[error("Intake is incomplete, missing: {}", missing.join(", "))]
    IncompleteIntake { missing: Vec<String> },

    #[error("Prediction is only available on the results page (currently {page})")]
    NotOnResults { page: WizardPage },
}

/// Session host errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
