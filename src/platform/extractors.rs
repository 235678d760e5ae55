use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::platform::app_error::AppError;

/// `axum::Json` whose rejections use the service's JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
