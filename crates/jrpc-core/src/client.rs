use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::RpcError;
use crate::protocol::{decode_response, CallArgs, JsonRpcRequest};
use crate::transport::{HttpTransport, Transport};

// ==============================================================================
// RpcClient
// ==============================================================================

/// JSON-RPC 2.0 client bound to one transport session.
///
/// Any method name can be invoked, either directly with [`RpcClient::call`]
/// or through a [`MethodCall`] handle from [`RpcClient::method`]. Request ids
/// start at 1 and advance once per call, failed calls included.
///
/// ```no_run
/// # async fn demo() -> Result<(), jrpc_core::RpcError> {
/// use jrpc_core::{ClientConfig, RpcClient};
///
/// let rpc = RpcClient::new(ClientConfig::new("api.example.com", 443).with_ssl(true))?;
/// let rows = rpc.method("list_all").arg("first").arg("second").send().await?;
/// let john = rpc.method("find").kwarg("name", "john").send().await?;
/// # let _ = (rows, john);
/// # Ok(())
/// # }
/// ```
pub struct RpcClient<T = HttpTransport> {
    transport: T,
    next_id: AtomicU64,
}

impl RpcClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::with_transport(HttpTransport::new(&config)?))
    }
}

impl<T: Transport> RpcClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A handle that invokes `name` on the server.
    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_, T> {
        MethodCall {
            client: self,
            method: name.into(),
            args: CallArgs::new(),
        }
    }

    fn reserve_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method` and return its `result` verbatim.
    ///
    /// Mixed positional and keyword arguments are rejected before any I/O,
    /// but the call still uses up its request id.
    pub async fn call(&self, method: &str, args: impl Into<CallArgs>) -> Result<Value, RpcError> {
        let id = self.reserve_request_id();
        let params = args.into().into_params(method)?;
        debug!(
            rpc.id = id,
            rpc.method = method,
            rpc.params = params.len(),
            "rpc call"
        );
        let request = JsonRpcRequest::new(id, method, params);

        let response = self.transport.post(&request).await?;
        debug!(
            rpc.id = id,
            rpc.method = method,
            status = %response.status,
            body_len = response.body.len(),
            "rpc response"
        );
        trace!(rpc.id = id, rpc.method = method, body = %response.body, "rpc response body");

        let result = decode_response(&request, response);
        if let Err(err @ RpcError::Parse(_)) = &result {
            warn!(
                rpc.id = id,
                rpc.method = method,
                endpoint = self.transport.endpoint(),
                error = %err,
                "undecodable JSON-RPC response"
            );
        }
        result
    }

    pub async fn call_positional(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.call(method, params).await
    }

    pub async fn call_named(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Value, RpcError> {
        self.call(method, params).await
    }

    /// Like [`RpcClient::call`], deserializing the result into `R`.
    pub async fn call_as<R: DeserializeOwned>(
        &self,
        method: &str,
        args: impl Into<CallArgs>,
    ) -> Result<R, RpcError> {
        let raw = self.call(method, args).await?;
        serde_json::from_value(raw)
            .map_err(|e| RpcError::Parse(format!("unexpected `{method}` result: {e}")))
    }
}

// ==============================================================================
// MethodCall
// ==============================================================================

/// A pending invocation of one named method, built up argument by argument.
#[must_use = "a MethodCall does nothing until `send` is awaited"]
pub struct MethodCall<'a, T = HttpTransport> {
    client: &'a RpcClient<T>,
    method: String,
    args: CallArgs,
}

impl<'a, T: Transport> MethodCall<'a, T> {
    pub fn name(&self) -> &str {
        &self.method
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args = self.args.arg(value);
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args = self.args.kwarg(name, value);
        self
    }

    /// Replace the collected arguments wholesale.
    pub fn args(mut self, args: impl Into<CallArgs>) -> Self {
        self.args = args.into();
        self
    }

    pub async fn send(self) -> Result<Value, RpcError> {
        self.client.call(&self.method, self.args).await
    }

    pub async fn send_as<R: DeserializeOwned>(self) -> Result<R, RpcError> {
        self.client.call_as(&self.method, self.args).await
    }
}
