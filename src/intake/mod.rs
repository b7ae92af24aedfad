//! Intake wizard — pages, per-session state, and feature vector assembly.
//!
//! A session walks four pages: Demographics → Health → Physiology → Results.
//! The first three collect values through widgets; the last one builds the
//! feature vector and asks the prediction service for a label. Nothing here
//! touches global state; each session owns its own `WizardController`.

pub mod clock;
pub mod controller;
pub mod pages;
pub mod state;
pub mod vector;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{PageView, ResultView, WizardController};
pub use state::{IntakeState, NavAction, WizardPage};
pub use vector::{CompletenessPolicy, FeatureVectorBuilder, PredictionInput};
