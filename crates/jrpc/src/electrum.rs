//! Electrum (and Electrum-LTC) daemon RPC.
//!
//! Electrum answers most failures with HTTP 500 and a JSON-RPC error body.
//! [`ElectrumRpc::call`] recognises two of them: "wallet not loaded" and
//! "method not found". With wallet auto-load enabled, the first one triggers a
//! single `load_wallet` followed by one retry of the failed call.

use jrpc_core::{
    is_truthy, CallArgs, ClientConfig, HttpTransport, MethodCall, RpcClient, RpcError, Transport,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::DaemonError;
use crate::named_args;
use crate::preset::Preset;

// ==============================================================================
// Request Types
// ==============================================================================

/// Filters for `listaddresses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddressFilter {
    pub receiving: bool,
    pub change: bool,
    pub labels: bool,
    pub frozen: bool,
    pub unused: bool,
    pub funded: bool,
    pub balance: bool,
}

/// Parameters for `payto`. Unset options are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayTo {
    pub destination: String,
    /// Amount in whole coins as a decimal string, or `"!"` to send everything.
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feerate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_coins: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_addr: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub nocheck: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub unsigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rbf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}

impl PayTo {
    pub fn new(destination: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            amount: amount.into(),
            ..Self::default()
        }
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Options for `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWallet {
    pub passphrase: Option<String>,
    pub password: Option<String>,
    pub encrypt_file: bool,
    pub seed_type: Option<String>,
    pub wallet_path: Option<String>,
}

// ==============================================================================
// ElectrumRpc
// ==============================================================================

pub struct ElectrumRpc<T = HttpTransport> {
    rpc: RpcClient<T>,
    wallet_autoload: bool,
    wallet_password: Option<String>,
}

impl ElectrumRpc {
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::with_client(RpcClient::new(config)?))
    }

    /// Electrum daemon on `127.0.0.1:7777` with the given RPC credentials.
    pub fn local(username: &str, password: &str) -> Result<Self, RpcError> {
        Self::new(Preset::ELECTRUM.config().with_credentials(username, password))
    }
}

impl<T: Transport> ElectrumRpc<T> {
    pub fn with_client(rpc: RpcClient<T>) -> Self {
        Self {
            rpc,
            wallet_autoload: false,
            wallet_password: None,
        }
    }

    /// Load the default wallet (with `password`, if encrypted) whenever a
    /// call fails because no wallet is loaded, then retry that call once.
    pub fn with_wallet_autoload(mut self, password: Option<String>) -> Self {
        self.wallet_autoload = true;
        self.wallet_password = password;
        self
    }

    pub fn inner(&self) -> &RpcClient<T> {
        &self.rpc
    }

    /// Raw builder on the underlying client. Calls made through it skip the
    /// wallet auto-load and error translation of [`ElectrumRpc::call`].
    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_, T> {
        self.rpc.method(name)
    }

    /// Call any Electrum command, translating Electrum's wallet and
    /// unknown-method errors.
    pub async fn call(&self, method: &str, args: impl Into<CallArgs>) -> Result<Value, DaemonError> {
        let args = args.into();
        let err = match self.rpc.call(method, args.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !(self.wallet_autoload && condition(&err) == Some(Condition::WalletNotLoaded)) {
            return Err(translate(method, err));
        }

        info!(
            rpc.method = method,
            "wallet not loaded; auto-loading because wallet autoload is enabled"
        );
        let loaded = self
            .rpc
            .call(
                "load_wallet",
                CallArgs::new().kwarg_opt("password", self.wallet_password.clone()),
            )
            .await
            .map_err(|e| translate("load_wallet", e))?;
        if !is_truthy(&loaded) {
            warn!(rpc.method = method, result = %loaded, "wallet auto-load was refused");
            return Err(DaemonError::WalletLoadFailed);
        }

        self.rpc
            .call(method, args)
            .await
            .map_err(|e| translate(method, e))
    }

    async fn call_as<R: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        args: impl Into<CallArgs>,
    ) -> Result<R, DaemonError> {
        let raw = self.call(method, args).await?;
        serde_json::from_value(raw).map_err(|e| DaemonError::UnexpectedResult {
            method,
            reason: e.to_string(),
        })
    }

    /// Create a wallet. Returns `{seed, path, msg}`.
    pub async fn create(&self, options: &CreateWallet) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg_opt("wallet_path", options.wallet_path.clone())
            .kwarg_opt("password", options.password.clone())
            .kwarg_opt("passphrase", options.passphrase.clone())
            .kwarg("encrypt_file", options.encrypt_file)
            .kwarg_opt("seed_type", options.seed_type.clone());
        self.call("create", args).await
    }

    /// Create a new receiving address beyond the wallet's gap limit.
    pub async fn create_new_address(&self, wallet: Option<&str>) -> Result<String, DaemonError> {
        self.call_as("createnewaddress", CallArgs::new().kwarg_opt("wallet", wallet))
            .await
    }

    pub async fn get_info(&self) -> Result<Value, DaemonError> {
        self.call("getinfo", CallArgs::new()).await
    }

    pub async fn get_address_history(&self, address: &str) -> Result<Vec<Value>, DaemonError> {
        self.call_as("getaddresshistory", CallArgs::new().arg(address))
            .await
    }

    pub async fn get_address_unspent(&self, address: &str) -> Result<Vec<Value>, DaemonError> {
        self.call_as("getaddressunspent", CallArgs::new().arg(address))
            .await
    }

    /// Returns `{confirmed, unconfirmed}` as decimal strings.
    pub async fn get_address_balance(&self, address: &str) -> Result<Value, DaemonError> {
        self.call("getaddressbalance", CallArgs::new().arg(address))
            .await
    }

    pub async fn get_transaction(&self, txid: &str, wallet: Option<&str>) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("txid", txid)
            .kwarg_opt("wallet", wallet);
        self.call("gettransaction", args).await
    }

    /// First unused address of the wallet, or `None` when every address has
    /// received funds or backs a payment request.
    pub async fn get_unused_address(&self, wallet: Option<&str>) -> Result<Option<String>, DaemonError> {
        self.call_as("getunusedaddress", CallArgs::new().kwarg_opt("wallet", wallet))
            .await
    }

    pub async fn list_addresses(
        &self,
        filter: AddressFilter,
        wallet: Option<&str>,
    ) -> Result<Value, DaemonError> {
        let args = named_args("listaddresses", &filter)?.kwarg_opt("wallet", wallet);
        self.call("listaddresses", args).await
    }

    pub async fn list_wallets(&self) -> Result<Vec<Value>, DaemonError> {
        self.call_as("list_wallets", CallArgs::new()).await
    }

    /// Build (and by default sign) a transaction. Returns the transaction.
    pub async fn payto(&self, request: &PayTo) -> Result<Value, DaemonError> {
        let args = named_args("payto", request)?;
        self.call("payto", args).await
    }

    /// Load a wallet. `true` when the daemon confirms it.
    pub async fn load_wallet(
        &self,
        wallet_path: Option<&str>,
        password: Option<&str>,
    ) -> Result<bool, DaemonError> {
        let args = CallArgs::new()
            .kwarg_opt("wallet_path", wallet_path)
            .kwarg_opt("password", password);
        let raw = self
            .rpc
            .call("load_wallet", args)
            .await
            .map_err(|e| translate("load_wallet", e))?;
        Ok(is_truthy(&raw))
    }

    pub async fn close_wallet(&self) -> Result<Value, DaemonError> {
        self.call("close_wallet", CallArgs::new()).await
    }

    pub async fn validate_address(&self, address: &str) -> Result<Value, DaemonError> {
        self.call("validateaddress", CallArgs::new().arg(address))
            .await
    }

    pub async fn version(&self) -> Result<String, DaemonError> {
        self.call_as("version", CallArgs::new()).await
    }
}

// ==============================================================================
// Error Translation
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    WalletNotLoaded,
    MethodNotFound,
}

fn condition(err: &RpcError) -> Option<Condition> {
    let message = error_message(err)?.to_ascii_lowercase();
    if message.contains("wallet not loaded") {
        Some(Condition::WalletNotLoaded)
    } else if message.contains("method not found") {
        Some(Condition::MethodNotFound)
    } else {
        None
    }
}

/// The `error.message` text, whether it arrived as a JSON-RPC error or
/// inside the body of a failed HTTP response.
fn error_message(err: &RpcError) -> Option<String> {
    match err {
        RpcError::Server(server) => server.message().map(str::to_owned),
        RpcError::Http { body, .. } => {
            let body: Value = serde_json::from_str(body).ok()?;
            body.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_owned)
        }
        _ => None,
    }
}

fn translate(method: &str, err: RpcError) -> DaemonError {
    match condition(&err) {
        Some(Condition::WalletNotLoaded) => DaemonError::WalletNotLoaded,
        Some(Condition::MethodNotFound) => DaemonError::MethodNotFound(method.to_owned()),
        None => DaemonError::Rpc(err),
    }
}
