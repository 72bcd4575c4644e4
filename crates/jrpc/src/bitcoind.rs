//! `bitcoind`-compatible wallet and chain RPC (Bitcoin, Litecoin, and most
//! daemons forked from Bitcoin Core).

use bitcoin::{Amount, BlockHash, Denomination, SignedAmount};
use jrpc_core::{CallArgs, ClientConfig, HttpTransport, MethodCall, RpcClient, RpcError, Transport};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::DaemonError;
use crate::preset::Preset;

// ==============================================================================
// Types
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Legacy,
    P2shSegwit,
    Bech32,
}

impl AddressType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::P2shSegwit => "p2sh-segwit",
            Self::Bech32 => "bech32",
        }
    }
}

/// The commonly used part of `getblockchaininfo`. Everything else the node
/// reports is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlockchainInfo {
    pub chain: String,
    pub blocks: u64,
    pub headers: u64,
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: BlockHash,
    #[serde(default)]
    pub pruned: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ==============================================================================
// BitcoinRpc
// ==============================================================================

/// Client for `bitcoind` compatible JSON-RPC services.
///
/// Methods without a wrapper here are still reachable through
/// [`BitcoinRpc::method`] or [`BitcoinRpc::inner`].
pub struct BitcoinRpc<T = HttpTransport> {
    rpc: RpcClient<T>,
}

impl BitcoinRpc {
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::with_client(RpcClient::new(config)?))
    }

    /// `bitcoind` on `127.0.0.1:8332` with the given RPC credentials.
    pub fn local(username: &str, password: &str) -> Result<Self, RpcError> {
        Self::new(Preset::BITCOIN.config().with_credentials(username, password))
    }

    /// `litecoind` on `127.0.0.1:9332` with the given RPC credentials.
    pub fn litecoin(username: &str, password: &str) -> Result<Self, RpcError> {
        Self::new(Preset::LITECOIN.config().with_credentials(username, password))
    }
}

impl<T: Transport> BitcoinRpc<T> {
    pub fn with_client(rpc: RpcClient<T>) -> Self {
        Self { rpc }
    }

    pub fn inner(&self) -> &RpcClient<T> {
        &self.rpc
    }

    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_, T> {
        self.rpc.method(name)
    }

    /// Generate a new address, optionally of a specific type.
    pub async fn getnewaddress(
        &self,
        account: &str,
        address_type: Option<AddressType>,
    ) -> Result<String, DaemonError> {
        let mut args = CallArgs::new().arg(account);
        if let Some(kind) = address_type {
            args = args.arg(kind.as_str());
        }
        Ok(self.rpc.call_as("getnewaddress", args).await?)
    }

    /// Wallet balance with at least `confirmations` confirmations. `account`
    /// is ignored by modern nodes; `"*"` means all accounts on older ones.
    pub async fn getbalance(
        &self,
        account: &str,
        confirmations: u32,
        watch_only: bool,
    ) -> Result<SignedAmount, DaemonError> {
        let raw = self
            .rpc
            .call(
                "getbalance",
                vec![json!(account), json!(confirmations), json!(watch_only)],
            )
            .await?;
        let text = btc_amount_text("getbalance", &raw)?;
        SignedAmount::from_str_in(&text, Denomination::Bitcoin).map_err(|e| {
            DaemonError::InvalidAmount {
                value: text,
                reason: e.to_string(),
            }
        })
    }

    /// Total received by a wallet address with at least `confirmations`.
    pub async fn getreceivedbyaddress(
        &self,
        address: &str,
        confirmations: u32,
    ) -> Result<Amount, DaemonError> {
        let raw = self
            .rpc
            .call(
                "getreceivedbyaddress",
                vec![json!(address), json!(confirmations)],
            )
            .await?;
        let text = btc_amount_text("getreceivedbyaddress", &raw)?;
        Amount::from_str_in(&text, Denomination::Bitcoin).map_err(|e| DaemonError::InvalidAmount {
            value: text,
            reason: e.to_string(),
        })
    }

    /// Send `amount` to `address` and return the txid.
    ///
    /// The amount goes over the wire as a JSON number of whole coins, which
    /// every bitcoind fork accepts.
    pub async fn sendtoaddress(
        &self,
        address: &str,
        amount: Amount,
        comment: &str,
        comment_to: &str,
        subtract_fee: bool,
    ) -> Result<String, DaemonError> {
        let params = vec![
            json!(address),
            json!(amount.to_btc()),
            json!(comment),
            json!(comment_to),
            json!(subtract_fee),
        ];
        Ok(self.rpc.call_as("sendtoaddress", params).await?)
    }

    pub async fn listtransactions(
        &self,
        account: &str,
        count: u32,
        skip: u32,
        watch_only: bool,
    ) -> Result<Vec<Value>, DaemonError> {
        let params = vec![
            json!(account),
            json!(count),
            json!(skip),
            json!(watch_only),
        ];
        Ok(self.rpc.call_as("listtransactions", params).await?)
    }

    pub async fn getblockchaininfo(&self) -> Result<BlockchainInfo, DaemonError> {
        Ok(self
            .rpc
            .call_as("getblockchaininfo", CallArgs::new())
            .await?)
    }

    pub async fn getnetworkinfo(&self) -> Result<Value, DaemonError> {
        Ok(self.rpc.call("getnetworkinfo", CallArgs::new()).await?)
    }

    /// Deprecated upstream in favour of `getnetworkinfo` and
    /// `getblockchaininfo`; kept for older forks.
    pub async fn getinfo(&self) -> Result<Value, DaemonError> {
        Ok(self.rpc.call("getinfo", CallArgs::new()).await?)
    }
}

/// Daemons report amounts as JSON floats (or strings on some forks). Floats
/// are pinned to 8 decimal places before parsing so binary rounding noise
/// never reaches the satoshi digit.
fn btc_amount_text(method: &'static str, raw: &Value) -> Result<String, DaemonError> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(|btc| format!("{btc:.8}"))
            .ok_or_else(|| DaemonError::UnexpectedResult {
                method,
                reason: format!("amount {n} is not representable"),
            }),
        Value::String(s) => Ok(s.trim().to_owned()),
        other => Err(DaemonError::UnexpectedResult {
            method,
            reason: format!("expected an amount, got {other}"),
        }),
    }
}
