//! Transport session abstraction.
//!
//! Defines the [`Transport`] trait the client posts envelopes through, and
//! provides the HTTP implementation ([`HttpTransport`]) plus a test mock
//! (`mock::MockTransport`).

mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::RpcError;
use crate::protocol::JsonRpcRequest;

/// An HTTP response as received, before JSON-RPC validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Posts request envelopes to one fixed endpoint.
///
/// Implementations own their connection state (pool, cookies) and reuse it
/// across calls. Failures are reported once and never retried here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &JsonRpcRequest) -> Result<RawResponse, RpcError>;

    /// Where requests go, for diagnostics.
    fn endpoint(&self) -> &str;
}
