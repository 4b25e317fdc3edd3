//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::domain::error::TradeflowError;

use super::is_htmx_request;
use super::templates::{ErrorFragment, ErrorPage};

/// JSON error returned by the `/data` API: `{ "message": ..., "error": ... }`.
#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

impl From<TradeflowError> for WebError {
    fn from(err: TradeflowError) -> Self {
        let status = status_from_error(&err);
        let message = match &err {
            TradeflowError::DuplicateTrade { .. } => "Record for this date already exists".into(),
            e if status.is_server_error() => {
                error!(error = %e, "request failed");
                "Error processing data".into()
            }
            e => e.to_string(),
        };
        Self::new(status, message).with_error(err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            error: self.error.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn status_from_error(err: &TradeflowError) -> StatusCode {
    match err {
        TradeflowError::DuplicateTrade { .. } | TradeflowError::DuplicateId { .. } => {
            StatusCode::CONFLICT
        }
        TradeflowError::RecordNotFound { .. } | TradeflowError::SettingsMissing => {
            StatusCode::NOT_FOUND
        }
        TradeflowError::InvalidSettings { .. }
        | TradeflowError::InvalidRecord { .. }
        | TradeflowError::ConfirmationRequired { .. } => StatusCode::BAD_REQUEST,
        TradeflowError::ConfigMissing { .. }
        | TradeflowError::ConfigInvalid { .. }
        | TradeflowError::ConfigParse { .. }
        | TradeflowError::Storage { .. }
        | TradeflowError::Database { .. }
        | TradeflowError::DatabaseQuery { .. }
        | TradeflowError::Serialization(_)
        | TradeflowError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTML rendition of `err` for the browser pages: a fragment for HTMX, a full page otherwise.
pub fn handle_error(err: TradeflowError, headers: &HeaderMap) -> Response {
    let status = status_from_error(&err);
    if status.is_server_error() {
        error!(error = %err, "page request failed");
    } else {
        warn!(error = %err, "page request rejected");
    }

    let message = err.to_string();
    let rendered = if is_htmx_request(headers) {
        ErrorFragment {
            status: status.as_u16(),
            message: &message,
        }
        .render()
    } else {
        ErrorPage {
            status: status.as_u16(),
            message: &message,
        }
        .render()
    };

    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn duplicate_trade_is_conflict() {
        let err = TradeflowError::DuplicateTrade {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        let web: WebError = err.into();
        assert_eq!(web.status, StatusCode::CONFLICT);
        assert_eq!(web.message, "Record for this date already exists");
        assert!(web.error.unwrap().contains("2024-05-01"));
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            status_from_error(&TradeflowError::RecordNotFound { id: "x".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_from_error(&TradeflowError::invalid_record("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_from_error(&TradeflowError::Storage {
                reason: "disk".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_hide_detail_in_message() {
        let web: WebError = TradeflowError::Database {
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(web.message, "Error processing data");
        assert_eq!(web.error.as_deref(), Some("database error: connection refused"));
    }
}
