use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bastion_core::AppError;
use bastion_domain::TokenRejection;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around application errors and token rejections.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Rejected(TokenRejection),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<TokenRejection> for ApiError {
    fn from(value: TokenRejection) -> Self {
        Self::Rejected(value)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::App(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::App(AppError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::App(AppError::Conflict(_)) => StatusCode::CONFLICT,
            Self::App(AppError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::App(AppError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::App(AppError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::App(AppError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected(TokenRejection::Blocked) => StatusCode::TOO_MANY_REQUESTS,
            Self::Rejected(_) => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::App(AppError::Validation(_)) => "validation",
            Self::App(AppError::NotFound(_)) => "not_found",
            Self::App(AppError::Conflict(_)) => "conflict",
            Self::App(AppError::Unauthorized(_)) => "unauthorized",
            Self::App(AppError::Forbidden(_)) => "forbidden",
            Self::App(AppError::RateLimited(_)) => "blocked",
            Self::App(AppError::Internal(_)) => "internal",
            Self::Rejected(rejection) => rejection.as_str(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::App(error) => error.to_string(),
            Self::Rejected(rejection) => format!("token rejected: {rejection}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::App(AppError::Internal(message)) = &self {
            tracing::error!(error = %message, "request failed");
        }

        let payload = Json(ErrorResponse::new(self.code(), self.message()));
        (self.status(), payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
