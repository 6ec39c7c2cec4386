use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Not enough feature data to produce a recommendation
///
/// Returned by the profile builder and the dissimilarity ranker. These are
/// expected outcomes for sparse inputs, not faults.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsufficientData {
    #[error("No feature data in user history.")]
    NoHistoryFeatures,

    #[error("No candidate songs with complete features.")]
    NoCompleteCandidates,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InsufficientData(reason) => {
                (StatusCode::UNPROCESSABLE_ENTITY, reason.to_string())
            }
            AppError::Io(_) | AppError::Csv(_) | AppError::Schema(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
