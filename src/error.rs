//! Error types for the estimator and its HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Invalid '{field}' value {value:?}: {reason}")]
    TypeConversion {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid '{field}' value: {value}")]
    InvalidCategory { field: &'static str, value: String },

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Failed to load model artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EstimatorError {
    pub fn artifact(path: impl Into<String>, reason: impl ToString) -> Self {
        EstimatorError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorError::TypeConversion { .. } => "type_conversion",
            EstimatorError::InvalidCategory { .. } => "invalid_category",
            EstimatorError::SchemaMismatch(_) => "schema_mismatch",
            EstimatorError::ArtifactLoad { .. } => "artifact_load",
            EstimatorError::Prediction(_) => "prediction",
            EstimatorError::Config(_) => "config",
        }
    }

    /// Whether the user can fix this by editing the submission.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EstimatorError::TypeConversion { .. } | EstimatorError::InvalidCategory { .. }
        )
    }
}

impl IntoResponse for EstimatorError {
    fn into_response(self) -> Response {
        let status = if self.is_input_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            tracing::error!(kind = self.kind(), detail = %self, "estimation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = Json(json!({
            "error": true,
            "kind": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
