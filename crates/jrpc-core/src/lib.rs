pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{MethodCall, RpcClient};
pub use config::ClientConfig;
pub use error::{RpcError, ServerError};
pub use protocol::{is_error_present, is_truthy, CallArgs, Params};
pub use transport::{HttpTransport, Transport};

pub use reqwest::StatusCode;
