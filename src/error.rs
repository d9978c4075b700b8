//! Unified application error model.
//! Entry points return `AppResult`; an error carries a stable code plus a human message and
//! knows its own HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No session, a role without the required capability, or a session lookup that failed.
    Unauthorized { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Unauthorized { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthorized { message, .. } => message.as_str(),
        }
    }

    pub fn unauthorized<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthorized { .. } => 401,
        }
    }

    fn status_label(&self) -> &'static str {
        match self {
            AppError::Unauthorized { .. } => "unauthorized",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": self.status_label(),
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::unauthorized("unauthorized", "no").http_status(), 401);
    }

    #[test]
    fn display_joins_code_and_message() {
        let e = AppError::unauthorized("unauthorized", "editor role required");
        assert_eq!(e.to_string(), "unauthorized: editor role required");
    }

    #[test]
    fn into_response_renders_json_body() {
        let resp = AppError::unauthorized("unauthorized", "no session").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert!(resp.headers().get("location").is_none());
    }
}
