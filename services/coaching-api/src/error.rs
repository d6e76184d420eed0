//! HTTP error mapping for the handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::dto::{AeConflict, ErrorResponse, FieldIssue};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::coaching::GenerateError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldIssue>),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("AE already assigned to another strategy")]
    AeConflict {
        existing_strategy_id: Option<Uuid>,
        existing_strategy_name: Option<String>,
    },
    #[error("Already generated for this AE and call: {ae_email}, {gong_call_id}")]
    DuplicateGeneration { ae_email: String, gong_call_id: String },
    #[error("Failed to {action}")]
    Internal {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Adapter for `map_err` that keeps the failing action for the response text.
pub fn internal<E>(action: &'static str) -> impl FnOnce(E) -> ApiError
where
    E: Into<anyhow::Error>,
{
    move |e| ApiError::Internal { action, source: e.into() }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AeConflict { .. } | ApiError::DuplicateGeneration { .. } => {
                StatusCode::CONFLICT
            }
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps generation failures, keeping `action` for the unclassified case.
    pub fn from_generate(action: &'static str) -> impl FnOnce(GenerateError) -> ApiError {
        move |e| match e {
            GenerateError::Duplicate { ae_email, gong_call_id } => {
                ApiError::DuplicateGeneration { ae_email, gong_call_id }
            }
            other => ApiError::Internal { action, source: other.into() },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            ApiError::Validation(details) => {
                (status, Json(ErrorResponse { error: message, details })).into_response()
            }
            ApiError::NotFound(_) => {
                (status, Json(ErrorResponse { error: message, details: Vec::new() })).into_response()
            }
            ApiError::AeConflict { existing_strategy_id, existing_strategy_name } => {
                warn!(?existing_strategy_id, "AE email already assigned");
                let body = AeConflict { error: message, existing_strategy_id, existing_strategy_name };
                (status, Json(body)).into_response()
            }
            ApiError::DuplicateGeneration { .. } => {
                warn!("{message}");
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal { action, source } => {
                error!(error = ?source, "failed to {action}");
                (status, Json(ErrorResponse { error: message, details: Vec::new() })).into_response()
            }
        }
    }
}
