//! Problem details returned to the admin interface.
//!
//! Validation failures are values, not errors: an operation that fails
//! validation returns one of these and leaves the store untouched.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::store::StoreError;

pub const PROBLEM_MEDIA_TYPE: &str = "application/api-problem+json";

/// A user-facing description of what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub uri: &'static str,

    pub status: u16,

    pub title: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProblemDetail {
    pub const fn new(uri: &'static str, status: u16, title: &'static str) -> Self {
        Self {
            uri,
            status,
            title,
            detail: None,
        }
    }

    /// The same problem with a specific explanation.
    pub fn detailed(&self, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..self.clone()
        }
    }

    /// Whether two details describe the same kind of problem.
    pub fn same_kind(&self, other: &ProblemDetail) -> bool {
        self.uri == other.uri
    }
}

impl std::fmt::Display for ProblemDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.title, detail),
            None => f.write_str(self.title),
        }
    }
}

impl IntoResponse for ProblemDetail {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST);
        let body = serde_json::to_string(&self).unwrap_or_else(|_| self.to_string());
        (status, [(header::CONTENT_TYPE, PROBLEM_MEDIA_TYPE)], body).into_response()
    }
}

macro_rules! problem {
    ($name:ident, $slug:literal, $status:literal, $title:literal) => {
        pub const $name: ProblemDetail = ProblemDetail::new(concat!("http://librarysimplified.org/terms/problem/", $slug), $status, $title);
    };
}

problem!(INCOMPLETE_CONFIGURATION, "incomplete-configuration", 400, "Incomplete configuration");
problem!(NO_PROTOCOL_FOR_NEW_SERVICE, "no-protocol-for-new-service", 400, "No protocol for new service");
problem!(UNKNOWN_PROTOCOL, "unknown-protocol", 400, "Unknown protocol");
problem!(MISSING_SERVICE, "missing-service", 404, "Missing service");
problem!(CANNOT_CHANGE_PROTOCOL, "cannot-change-protocol", 400, "Cannot change protocol");
problem!(INTEGRATION_NAME_ALREADY_IN_USE, "integration-name-already-in-use", 400, "Integration name already in use");
problem!(DUPLICATE_INTEGRATION, "duplicate-integration", 400, "Duplicate integration");
problem!(NO_SUCH_LIBRARY, "no-such-library", 400, "No such library");
problem!(MULTIPLE_SITEWIDE_SERVICES, "multiple-sitewide-services", 400, "Multiple sitewide services");
problem!(INVALID_EMAIL, "invalid-email", 400, "Invalid email format");
problem!(INVALID_URL, "invalid-url", 400, "Invalid URL format");
problem!(INVALID_NUMBER, "invalid-number", 400, "Invalid number format");
problem!(UNKNOWN_LANGUAGE, "unknown-language", 400, "Unknown language");
problem!(INVALID_CONFIGURATION_OPTION, "invalid-configuration-option", 400, "Invalid configuration option");
problem!(REMOTE_INTEGRATION_FAILED, "remote-integration-failed", 502, "Remote integration failed");
problem!(INTERNAL_SERVER_ERROR, "internal-server-error", 500, "Internal server error");

impl From<StoreError> for ProblemDetail {
    fn from(e: StoreError) -> Self {
        INTERNAL_SERVER_ERROR.detailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_keeps_kind() {
        let problem = INVALID_EMAIL.detailed("\"x\" is not a valid email address.");
        assert!(problem.same_kind(&INVALID_EMAIL));
        assert_eq!(problem.status, 400);
        assert!(INVALID_EMAIL.detail.is_none());
        assert!(problem.uri.ends_with("/invalid-email"));
    }

    #[test]
    fn test_serializes_as_problem_json() {
        let json = serde_json::to_value(MISSING_SERVICE.detailed("gone")).unwrap();
        assert_eq!(json["type"], "http://librarysimplified.org/terms/problem/missing-service");
        assert_eq!(json["status"], 404);
        assert_eq!(json["detail"], "gone");

        let bare = serde_json::to_value(UNKNOWN_PROTOCOL).unwrap();
        assert!(bare.get("detail").is_none());
    }

    #[test]
    fn test_into_response() {
        let response = CANNOT_CHANGE_PROTOCOL.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_MEDIA_TYPE);
    }
}
