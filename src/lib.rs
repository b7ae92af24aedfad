//! Fibro Intake — a guided patient intake wizard with a pre-trained
//! fibromyalgia classifier behind it.

pub mod config;
pub mod error;
pub mod intake;
pub mod model;
pub mod routes;
pub mod schema;
pub mod session;
