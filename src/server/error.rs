use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{SchemaError, StoreError};

/// API错误类型
pub struct AppError(pub anyhow::Error);

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// token 不匹配
#[derive(Debug, thiserror::Error)]
#[error("鉴权失败")]
pub struct Unauthorized;

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.is::<Unauthorized>() {
            return StatusCode::UNAUTHORIZED;
        }
        match self.0.downcast_ref::<StoreError>() {
            Some(StoreError::Schema(SchemaError::DuplicateField(_))) => StatusCode::CONFLICT,
            Some(
                StoreError::Schema(_)
                | StoreError::MissingRequiredField(_)
                | StoreError::UnknownField(_)
                | StoreError::TypeMismatch { .. }
                | StoreError::InvalidValue { .. }
                | StoreError::InvalidFramePath(_),
            ) => StatusCode::BAD_REQUEST,
            Some(StoreError::RecordNotFound(_)) => StatusCode::NOT_FOUND,
            Some(StoreError::ImageCopy { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
