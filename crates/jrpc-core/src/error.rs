use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::protocol::Params;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    #[error("cannot mix positional and keyword params in one call to `{method}`")]
    InvalidArguments { method: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("invalid JSON-RPC response: {0}")]
    Parse(String),

    #[error(transparent)]
    Server(Box<ServerError>),
}

impl RpcError {
    /// True when the server answered with a JSON-RPC `error`, as opposed to
    /// a configuration, transport, HTTP, or decoding failure.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    pub fn as_server_error(&self) -> Option<&ServerError> {
        match self {
            Self::Server(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServerError> for RpcError {
    fn from(err: ServerError) -> Self {
        Self::Server(Box::new(err))
    }
}

// ==============================================================================
// Server Error
// ==============================================================================

/// A JSON-RPC `error` returned by the server, plus the call that produced it.
///
/// The payload is kept verbatim: servers disagree on its shape (string, bare
/// code, or the standard `{"code", "message"}` object). [`ServerError::code`]
/// and [`ServerError::message`] read the standard shape when it is present.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    pub payload: Value,
    pub method: String,
    pub id: u64,
    pub params: Params,
}

impl ServerError {
    pub fn code(&self) -> Option<i64> {
        match &self.payload {
            Value::Object(map) => map.get("code").and_then(Value::as_i64),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Value::Object(map) => map.get("message").and_then(Value::as_str),
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server error in `{}` (id {}): {}",
            self.method, self.id, self.payload
        )
    }
}

impl std::error::Error for ServerError {}
