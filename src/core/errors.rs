use http::StatusCode;
use thiserror::Error;

use crate::core::http::Response;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not authenticated")]
    AuthRequired,
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid method")]
    MethodNotAllowed,
    #[error("{0}")]
    BadRequest(String),
    /// Form input rejected; rendered back into the form by the caller
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthRequired => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let message = match &err {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Response::json(err.status(), &serde_json::json!({ "error": message }))
    }
}
