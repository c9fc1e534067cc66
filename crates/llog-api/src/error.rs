//! API error type and HTTP mapping.
//!
//! Every handler failure funnels through [`ApiError`], which renders as a
//! JSON body `{ "error": message }` with the mapped status code: not-found
//! is 404, validation 400, conflict 409, origin-fetch and inference
//! failures 502, everything else 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use llog_core::Error;

/// Handler-level error, carrying the user-facing message.
#[derive(Debug)]
pub enum ApiError {
    /// Unexpected failure; details are logged, not returned to the client.
    Internal(Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::ItemNotFound(id) => ApiError::NotFound(format!("Item not found: {}", id)),
            Error::FolderNotFound(path) => {
                ApiError::NotFound(format!("Folder not found: {}", path))
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::OriginFetch(msg) => ApiError::BadGateway(format!("Origin fetch failed: {}", msg)),
            Error::Inference(msg) => {
                ApiError::BadGateway(format!("Metadata generation failed: {}", msg))
            }
            Error::Database(db_err) => {
                // Surface constraint violations as client errors instead of
                // opaque 500s.
                let msg = db_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    ApiError::Conflict("Resource already exists".to_string())
                } else if msg.contains("foreign key") {
                    ApiError::BadRequest("Referenced resource does not exist".to_string())
                } else {
                    ApiError::Internal(Error::Database(db_err))
                }
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_http_statuses() {
        let cases = [
            (Error::ItemNotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::FolderNotFound("math".into()), StatusCode::NOT_FOUND),
            (Error::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (Error::InvalidInput("bad page".into()), StatusCode::BAD_REQUEST),
            (Error::Conflict("duplicate".into()), StatusCode::CONFLICT),
            (Error::OriginFetch("notion 500".into()), StatusCode::BAD_GATEWAY),
            (Error::Inference("backend down".into()), StatusCode::BAD_GATEWAY),
            (Error::Job("queue".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Config("missing".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_not_found_message_includes_the_id() {
        let api_err = ApiError::from(Error::ItemNotFound("abc-123".into()));
        match api_err {
            ApiError::NotFound(msg) => assert_eq!(msg, "Item not found: abc-123"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = ApiError::Internal(Error::Internal("secret table name".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
