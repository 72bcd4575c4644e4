use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Url};

use crate::config::ClientConfig;
use crate::error::RpcError;
use crate::protocol::JsonRpcRequest;

use super::{RawResponse, Transport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC transport over HTTP(S).
///
/// Wraps a single `reqwest::Client`, so every call made through one
/// transport shares its keep-alive pool and cookie jar.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    auth: Option<(String, String)>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, RpcError> {
        let url = config.endpoint_url()?;
        let auth = config.resolve_auth()?;
        if config.timeout.is_zero() {
            return Err(RpcError::Configuration(
                "timeout must be greater than zero".to_owned(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .pool_max_idle_per_host(1)
            .tcp_nodelay(true)
            .cookie_store(true)
            .build()
            .map_err(|e| RpcError::Configuration(format!("build HTTP client: {e}")))?;

        Ok(Self { client, url, auth })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &JsonRpcRequest) -> Result<RawResponse, RpcError> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder.send().await.map_err(RpcError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(RpcError::Transport)?;

        Ok(RawResponse { status, body })
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}
