//! JSON-RPC 2.0 envelopes and response validation.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RpcError, ServerError};
use crate::transport::RawResponse;

pub const JSONRPC_VERSION: &str = "2.0";

// ==============================================================================
// Params
// ==============================================================================

/// The `params` member of a request: a list for positional arguments, an
/// object for keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Params {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

/// Arguments collected for one call, before they are checked and turned
/// into [`Params`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Insert `name` only when `value` is present. Daemons tend to treat an
    /// explicit `null` differently from a missing key.
    pub fn kwarg_opt<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.kwarg(name, value),
            None => self,
        }
    }

    /// Resolve into wire params. Positional and keyword arguments are
    /// mutually exclusive; with neither, params is an empty list.
    pub fn into_params(self, method: &str) -> Result<Params, RpcError> {
        match (self.positional.is_empty(), self.named.is_empty()) {
            (false, false) => Err(RpcError::InvalidArguments {
                method: method.to_owned(),
            }),
            (false, true) => Ok(Params::Positional(self.positional)),
            (true, false) => Ok(Params::Named(self.named)),
            (true, true) => Ok(Params::default()),
        }
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Map::new(),
        }
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(named: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }
}

impl From<Params> for CallArgs {
    fn from(params: Params) -> Self {
        match params {
            Params::Positional(values) => values.into(),
            Params::Named(map) => map.into(),
        }
    }
}

// ==============================================================================
// Envelopes
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Params,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Params) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// Validate a raw HTTP response against the request that produced it.
///
/// The HTTP status only matters when the body is not an envelope: a JSON
/// object with a `result` or `error` member is decoded the same way whatever
/// the status, since some daemons answer RPC errors (and even successes) with
/// 500. A non-2xx body without an envelope is an HTTP failure; a 2xx body
/// without one is a parse failure. A missing or null `result` is `Null`.
pub(crate) fn decode_response(
    request: &JsonRpcRequest,
    response: RawResponse,
) -> Result<Value, RpcError> {
    let RawResponse { status, body } = response;
    let decoded = serde_json::from_str::<Value>(&body);

    let mut envelope = if status.is_success() {
        match decoded {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(RpcError::Parse(format!(
                    "expected a JSON-RPC response object, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) => {
                return Err(RpcError::Parse(format!(
                    "decode JSON-RPC response: {e}; body={body}"
                )))
            }
        }
    } else {
        match decoded {
            Ok(Value::Object(map)) if map.contains_key("result") || map.contains_key("error") => {
                map
            }
            _ => return Err(RpcError::Http { status, body }),
        }
    };

    let error = envelope.remove("error").unwrap_or(Value::Null);
    if is_error_present(&error) {
        return Err(ServerError {
            payload: error,
            method: request.method.clone(),
            id: request.id,
            params: request.params.clone(),
        }
        .into());
    }

    Ok(envelope.remove("result").unwrap_or(Value::Null))
}

/// Whether an envelope's `error` member reports a failure. Only `null`,
/// `false` and numeric zero mean "no error"; empty strings, arrays and
/// objects still count as errors.
pub fn is_error_present(error: &Value) -> bool {
    match error {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Truthiness of a JSON value: `null`, `false`, zero, and empty strings,
/// arrays, or objects are falsy. Daemons use it for boolean-ish results such
/// as a wallet load acknowledgement.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
