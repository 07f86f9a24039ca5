// src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;
use thiserror::Error;

pub type AdvisorResult<T> = Result<T, AdvisorError>;

/// Everything that can go wrong between a raw request body and a response.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Input must be a JSON object")]
    NotAnObject,

    #[error("Invalid JSON body: {0}")]
    MalformedJson(String),

    #[error("No message provided")]
    NoMessage,

    #[error("Missing required field: '{0}'")]
    MissingField(String),

    #[error("Invalid data type: field '{field}' {detail}")]
    TypeMismatch { field: String, detail: String },

    #[error("Invalid value: field '{field}' {detail}")]
    OutOfRange { field: String, detail: String },

    #[error("Invalid value: feature '{0}' is not a finite number")]
    NonFiniteFeature(String),

    #[error("Prediction error: float division by zero computing '{feature}'")]
    DivisionByZero { feature: &'static str },

    #[error("Feature mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Feature schema names '{0}', which no derivation rule produces")]
    UnknownFeature(String),

    #[error("Feature schema lists '{0}' more than once")]
    DuplicateFeature(String),

    #[error("Prediction error: {0}")]
    UpstreamPrediction(String),

    #[error("{0}")]
    UpstreamGeneration(String),

    #[error("History error: {0}")]
    History(String),
}

impl AdvisorError {
    pub fn type_mismatch(field: &str, detail: impl Into<String>) -> Self {
        AdvisorError::TypeMismatch {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub fn out_of_range(field: &str, detail: impl Into<String>) -> Self {
        AdvisorError::OutOfRange {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    /// Caller-input problems are 400s, everything else is on our side.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdvisorError::NotAnObject
            | AdvisorError::MalformedJson(_)
            | AdvisorError::NoMessage
            | AdvisorError::MissingField(_)
            | AdvisorError::TypeMismatch { .. }
            | AdvisorError::OutOfRange { .. }
            | AdvisorError::NonFiniteFeature(_)
            | AdvisorError::FeatureCountMismatch { .. } => StatusCode::BAD_REQUEST,
            AdvisorError::DivisionByZero { .. }
            | AdvisorError::UnknownFeature(_)
            | AdvisorError::DuplicateFeature(_)
            | AdvisorError::UpstreamPrediction(_)
            | AdvisorError::UpstreamGeneration(_)
            | AdvisorError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_bad_requests() {
        let errors = vec![
            AdvisorError::NotAnObject,
            AdvisorError::MalformedJson("eof".to_string()),
            AdvisorError::NoMessage,
            AdvisorError::MissingField("Income".to_string()),
            AdvisorError::type_mismatch("Age", "is not an integer"),
            AdvisorError::out_of_range("Rent", "must not be negative"),
            AdvisorError::NonFiniteFeature("Expense_Efficiency".to_string()),
            AdvisorError::FeatureCountMismatch {
                expected: 45,
                actual: 44,
            },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
        }
    }

    #[test]
    fn test_upstream_errors_are_server_errors() {
        assert_eq!(
            AdvisorError::UpstreamPrediction("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AdvisorError::UpstreamGeneration("quota".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_zero_income_division_is_a_prediction_error() {
        let err = AdvisorError::DivisionByZero {
            feature: "Essential_Expense_Ratio",
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Prediction error:"));
    }

    #[test]
    fn test_messages_name_the_problem() {
        assert_eq!(
            AdvisorError::MissingField("Income".to_string()).to_string(),
            "Missing required field: 'Income'"
        );
        assert_eq!(
            AdvisorError::FeatureCountMismatch {
                expected: 45,
                actual: 40
            }
            .to_string(),
            "Feature mismatch: expected 45, got 40"
        );
    }
}
