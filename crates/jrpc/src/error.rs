use jrpc_core::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("invalid amount `{value}`: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("unexpected `{method}` result: {reason}")]
    UnexpectedResult { method: &'static str, reason: String },

    #[error("Electrum wallet not loaded; call load_wallet first")]
    WalletNotLoaded,

    #[error("tried auto-loading the Electrum wallet but the daemon did not confirm it")]
    WalletLoadFailed,

    #[error("JSON-RPC method `{0}` does not exist")]
    MethodNotFound(String),
}
