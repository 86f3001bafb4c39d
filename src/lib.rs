//! CO2 emission estimation service.
//!
//! Electrical usage readings go through [`features::Normalizer`] into the
//! column order a trained regression model expects, the model runs behind
//! [`model::Estimator`], and [`report::Report`] turns the number into what
//! the form displays.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod page;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod service;
pub mod types;

pub use error::{EstimatorError, Result};
