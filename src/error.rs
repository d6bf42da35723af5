use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Smart routing is not enabled")]
    FeatureDisabled,

    #[error("Embedding failed: {0}")]
    EmbeddingError(String),

    #[error("Similarity index error: {0}")]
    IndexError(String),

    #[error("Invalid tool catalog: {0}")]
    CatalogError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::FeatureDisabled => {
                tracing::debug!("Search rejected, smart routing disabled");
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::EmbeddingError(e) => {
                tracing::error!(error = %e, "Embedding error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::IndexError(e) => {
                tracing::error!(error = %e, "Index error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::CatalogError(msg) => {
                tracing::warn!(error = %msg, "Catalog error");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
