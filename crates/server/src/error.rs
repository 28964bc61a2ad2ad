use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::realtime::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("parent comment does not exist or belongs to another post")]
    InvalidParent,

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("comment streams are shutting down")]
    Unavailable,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<RegistryError> for ServiceError {
    fn from(_: RegistryError) -> Self {
        ServiceError::Unavailable
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidParent
            | ServiceError::InvalidContent(_)
            | ServiceError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ServiceError::Store(err) => {
                tracing::error!(?err, "store failure");
                "Internal server error, see logs for details".to_string()
            }
            other => {
                tracing::info!("returning error to client: {other}");
                other.to_string()
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
