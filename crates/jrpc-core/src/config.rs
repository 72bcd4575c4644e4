//! Client configuration: where the server lives and how to authenticate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Deserializer};

use crate::error::RpcError;

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for one [`RpcClient`](crate::RpcClient).
///
/// The endpoint URL is `http(s)://hostname:port/path`. Authentication
/// precedence:
/// 1. explicit `username` + `password`
/// 2. cookie file (`username:password`) from `cookie_file`
/// 3. no auth
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    #[serde(default = "default_timeout", deserialize_with = "timeout_from_secs")]
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            ssl: false,
            path: String::new(),
            username: None,
            password: None,
            cookie_file: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Endpoint path below the host, e.g. `json_rpc`. A leading `/` is ignored.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_cookie_file(mut self, cookie_file: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(cookie_file.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build and validate the endpoint URL.
    pub fn endpoint_url(&self) -> Result<Url, RpcError> {
        let host = self.hostname.trim();
        if host.is_empty() {
            return Err(RpcError::Configuration(
                "hostname must not be empty".to_owned(),
            ));
        }
        if self.port == 0 {
            return Err(RpcError::Configuration(
                "port must be a positive integer".to_owned(),
            ));
        }
        let scheme = if self.ssl { "https" } else { "http" };
        // Bare IPv6 literals need brackets inside a URL authority.
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_owned()
        };
        let path = self.path.strip_prefix('/').unwrap_or(&self.path);
        let raw = format!("{scheme}://{host}:{}/{path}", self.port);

        Url::parse(&raw)
            .map_err(|e| RpcError::Configuration(format!("invalid endpoint URL `{raw}`: {e}")))
    }

    /// Resolve basic-auth credentials.
    pub fn resolve_auth(&self) -> Result<Option<(String, String)>, RpcError> {
        match (&self.username, &self.password, &self.cookie_file) {
            (Some(user), Some(pass), _) => Ok(Some((user.clone(), pass.clone()))),
            (Some(_), None, _) => Err(RpcError::Configuration(
                "a username was given without a password".to_owned(),
            )),
            (None, Some(_), _) => Err(RpcError::Configuration(
                "a password was given without a username".to_owned(),
            )),
            (None, None, Some(path)) => read_cookie(path).map(Some),
            (None, None, None) => Ok(None),
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn timeout_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

/// Read `user:password` from the first line of a daemon cookie file.
fn read_cookie(path: &Path) -> Result<(String, String), RpcError> {
    let bad_cookie = |what: &str| {
        RpcError::Configuration(format!("cookie file {}: {what}", path.display()))
    };

    let content = std::fs::read_to_string(path).map_err(|e| bad_cookie(&e.to_string()))?;
    let first_line = content.lines().next().unwrap_or_default().trim();
    match first_line.split_once(':') {
        Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
            Ok((user.to_owned(), pass.to_owned()))
        }
        _ if first_line.is_empty() => Err(bad_cookie("no credentials on the first line")),
        _ => Err(bad_cookie("expected `user:password`")),
    }
}
