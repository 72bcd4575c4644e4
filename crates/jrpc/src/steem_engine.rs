//! Steem Engine contract queries.

use jrpc_core::{CallArgs, ClientConfig, HttpTransport, MethodCall, RpcClient, RpcError, Transport};
use serde_json::{json, Map, Value};

use crate::error::DaemonError;
use crate::preset::Preset;

/// Paging for [`SteemEngineRpc::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: u32,
    pub offset: u32,
    pub indexes: Vec<Value>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            offset: 0,
            indexes: Vec::new(),
        }
    }
}

pub struct SteemEngineRpc<T = HttpTransport> {
    rpc: RpcClient<T>,
}

impl SteemEngineRpc {
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::with_client(RpcClient::new(config)?))
    }

    /// The public `api.steem-engine.com` contracts endpoint.
    pub fn public() -> Result<Self, RpcError> {
        Self::new(Preset::STEEM_ENGINE.config())
    }
}

impl<T: Transport> SteemEngineRpc<T> {
    pub fn with_client(rpc: RpcClient<T>) -> Self {
        Self { rpc }
    }

    pub fn inner(&self) -> &RpcClient<T> {
        &self.rpc
    }

    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_, T> {
        self.rpc.method(name)
    }

    /// Contract metadata (`name`, `owner`, `code`, `tables`, ...), or `None`
    /// when no such contract exists.
    pub async fn getcontract(&self, name: &str) -> Result<Option<Value>, DaemonError> {
        let raw = self
            .rpc
            .call("getContract", CallArgs::new().kwarg("name", name))
            .await?;
        Ok(non_null(raw))
    }

    /// First row of `contract.table` matching `query`.
    pub async fn findone(
        &self,
        contract: &str,
        table: &str,
        query: Map<String, Value>,
    ) -> Result<Option<Value>, DaemonError> {
        let args = CallArgs::new()
            .kwarg("contract", contract)
            .kwarg("table", table)
            .kwarg("query", query);
        let raw = self.rpc.call("findOne", args).await?;
        Ok(non_null(raw))
    }

    /// Rows of `contract.table` matching `query` (all rows when `None`).
    pub async fn find(
        &self,
        contract: &str,
        table: &str,
        query: Option<Map<String, Value>>,
        options: &FindOptions,
    ) -> Result<Vec<Value>, DaemonError> {
        let args = CallArgs::new()
            .kwarg("contract", contract)
            .kwarg("table", table)
            .kwarg("query", query.unwrap_or_default())
            .kwarg("limit", options.limit)
            .kwarg("offset", options.offset)
            .kwarg("indexes", json!(options.indexes));
        match self.rpc.call("find", args).await? {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => Ok(rows),
            other => Err(DaemonError::UnexpectedResult {
                method: "find",
                reason: format!("expected a list of rows, got {other}"),
            }),
        }
    }
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_defaults_to_a_thousand_rows() {
        let options = FindOptions::default();
        assert_eq!(options.limit, 1000);
        assert_eq!(options.offset, 0);
        assert!(options.indexes.is_empty());
    }

    #[test]
    fn null_means_not_found() {
        assert_eq!(non_null(Value::Null), None);
        assert_eq!(non_null(json!({"symbol": "ENG"})), Some(json!({"symbol": "ENG"})));
    }
}
