use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{FetchError, FetchErrorKind};
use crate::shared::SeriesKind;

/// Error type for proxy endpoint responses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Fetch { kind: SeriesKind, error: FetchError },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::Fetch { kind, error } => write!(f, "fetch_error({kind}): {error}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn fetch(kind: SeriesKind, error: FetchError) -> Self {
        Self::Fetch { kind, error }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Fetch { error, .. } => match error.kind {
                FetchErrorKind::Upstream | FetchErrorKind::Transport => StatusCode::BAD_GATEWAY,
                FetchErrorKind::Shape => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_str = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Fetch { kind, error } => {
                tracing::error!(kind = %kind, error = %error, "Proxy fetch failed");
                format!("Failed to fetch {} data", kind.label())
            }
        };

        let body = json!({ "error": error_str });
        (status, axum::Json(body)).into_response()
    }
}
