use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

/// Every failure a handler can surface. Each variant owns its HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ForbiddenResource(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Conflict(_) | AppError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnreachable(_) | AppError::UpstreamFailure(_) | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps a unique-index violation to `Conflict`, anything else to an internal error.
    pub fn from_insert(err: DieselError, conflict_message: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::Conflict(conflict_message.into())
            }
            err => AppError::Other(err.into()),
        }
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Record not found".into()),
            err => AppError::Other(err.into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Other(err) => {
                tracing::error!("Internal error: {:#}", err);
                format!("Server error: {}", err)
            }
            AppError::ServiceUnreachable(_) | AppError::UpstreamFailure(_) => {
                tracing::error!("Upstream failure: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Standard success envelope. `data` is flattened so its keys sit beside `success`.
#[derive(Serialize, Debug)]
pub struct StdResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> StdResponse<T> {
    pub fn ok(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            message: Some(message),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for StdResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::ForbiddenResource("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Other(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = AppError::from_insert(
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                Box::new("duplicate key".to_string()),
            ),
            "A return order already exists for this order",
        );
        assert!(matches!(err, AppError::Conflict(msg) if msg == "A return order already exists for this order"));

        let err = AppError::from_insert(DieselError::NotFound, "dup");
        assert!(matches!(err, AppError::Other(_)));
    }

    #[test]
    fn std_response_flattens_payload() {
        #[derive(Serialize)]
        struct Payload {
            token: &'static str,
        }

        let value = serde_json::to_value(StdResponse::ok(Payload { token: "abc" }, "ok")).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["token"], "abc");
        assert_eq!(value["message"], "ok");
    }
}
