use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0}")]
    NotFound(CommentId),

    #[error("Comment content must not be empty")]
    EmptyContent,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::EmptyContent => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "success": false,
                "message": msg,
                "type": "unknown",
            }),
            Error::Unauthenticated => json!({
                "success": false,
                "message": "authentication required",
                "type": "unauthenticated",
            }),
            Error::PermissionDenied => json!({
                "success": false,
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotFound(id) => json!({
                "success": false,
                "message": "comment not found",
                "type": "not-found",
                "id": id,
            }),
            Error::EmptyContent => json!({
                "success": false,
                "message": "comment content must not be empty",
                "type": "empty-content",
            }),
            Error::NullByteInString(s) => json!({
                "success": false,
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::BadRequest(msg) => json!({
                "success": false,
                "message": msg,
                "type": "bad-request",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "unauthenticated" => Error::Unauthenticated,
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound(CommentId::new(
                    data.get("id")
                        .and_then(|id| id.as_str())
                        .ok_or_else(|| anyhow!("error is a not-found without an id"))?,
                )),
                "empty-content" => Error::EmptyContent,
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                "bad-request" => Error::BadRequest(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }

    /// Parses an error body, falling back to the bare `message` field some
    /// backend routes return, then to the status code itself
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        if let Ok(err) = Error::parse(body) {
            return err;
        }
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| {
                String::from(status.canonical_reason().unwrap_or("Request failed"))
            });
        match status {
            http::StatusCode::UNAUTHORIZED => Error::Unauthenticated,
            http::StatusCode::FORBIDDEN => Error::PermissionDenied,
            s if s.is_client_error() => Error::BadRequest(message),
            _ => Error::Unknown(message),
        }
    }
}
