//! JSON-RPC over HTTP, plus thin clients for common cryptocurrency daemons.
//!
//! The generic client lives in [`jrpc_core`] and is re-exported here. The
//! daemon modules add default endpoints and typed wrappers for the methods
//! each daemon is usually driven with; anything else stays reachable through
//! their `method` builders.

pub mod bitcoind;
pub mod electrum;
pub mod error;
pub mod monero;
pub mod preset;
pub mod steem_engine;

pub use jrpc_core::{
    is_truthy, CallArgs, ClientConfig, HttpTransport, MethodCall, Params, RpcClient, RpcError,
    ServerError, StatusCode, Transport,
};

pub use bitcoind::BitcoinRpc;
pub use electrum::ElectrumRpc;
pub use error::DaemonError;
pub use monero::MoneroRpc;
pub use preset::Preset;
pub use steem_engine::SteemEngineRpc;

use serde::Serialize;
use serde_json::Value;

/// Serialize a params struct into keyword arguments. Fields serialized as
/// absent (`skip_serializing_if`) are left out of the request.
pub(crate) fn named_args<S: Serialize>(
    method: &'static str,
    params: &S,
) -> Result<CallArgs, DaemonError> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => Ok(map.into()),
        Ok(other) => Err(DaemonError::UnexpectedResult {
            method,
            reason: format!("params must serialize to an object, got {other}"),
        }),
        Err(e) => Err(DaemonError::UnexpectedResult {
            method,
            reason: format!("params do not serialize: {e}"),
        }),
    }
}
