use axum::http::StatusCode;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

/// Failures of the habit and completion stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("habit {0} not found")]
    HabitNotFound(String),

    #[error("{0}")]
    Invalid(String),

    /// The stored state differs from what the caller expected to toggle.
    #[error("completion for {date} changed concurrently; re-fetch and retry")]
    Conflict { date: String },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::HabitNotFound(_) => Self::not_found(err.to_string()),
            StoreError::Invalid(_) => Self::bad_request(err.to_string()),
            StoreError::Conflict { .. } => Self::conflict(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
