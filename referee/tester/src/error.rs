use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use scoring::models::ServerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("Zone already exists")]
    Conflict,

    #[error("Internal error")]
    Poisoned,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ServerError {
            code: Some(i64::from(status.as_u16())),
            message: Some(self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
