//! `monero-wallet-rpc` client.
//!
//! Monero amounts travel as integer piconero ("atomic units", 10^12 per XMR).
//! [`decimal_to_atomic`] and [`atomic_to_decimal`] convert between that and
//! human-readable decimal strings without going through floating point.

use std::fmt;

use jrpc_core::{CallArgs, ClientConfig, HttpTransport, MethodCall, RpcClient, RpcError, Transport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DaemonError;
use crate::named_args;
use crate::preset::Preset;

/// Piconero per XMR.
pub const ATOMIC_UNIT: u64 = 1_000_000_000_000;
const ATOMIC_DECIMALS: usize = 12;

// ==============================================================================
// Amount Conversion
// ==============================================================================

/// Convert a decimal XMR amount such as `"10"` or `"1.2345"` into piconero.
pub fn decimal_to_atomic(amount: &str) -> Result<u64, DaemonError> {
    let invalid = |reason: &str| DaemonError::InvalidAmount {
        value: amount.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = amount.trim();
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("empty amount"));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected an unsigned decimal number"));
    }
    if frac.len() > ATOMIC_DECIMALS {
        return Err(invalid("more than 12 decimal places"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("amount too large"))?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<width$}", width = ATOMIC_DECIMALS)
            .parse()
            .map_err(|_| invalid("invalid fractional part"))?
    };

    whole
        .checked_mul(ATOMIC_UNIT)
        .and_then(|atomic| atomic.checked_add(frac))
        .ok_or_else(|| invalid("amount too large"))
}

/// Convert piconero into a decimal XMR string with no trailing zeros.
pub fn atomic_to_decimal(atomic: u64) -> String {
    let whole = atomic / ATOMIC_UNIT;
    let frac = atomic % ATOMIC_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = ATOMIC_DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

// ==============================================================================
// Types
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubaddressIndex {
    pub major: u32,
    pub minor: u32,
}

/// One entry from `get_payments`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MoneroPayment {
    pub address: String,
    pub amount: u64,
    pub block_height: Option<u64>,
    pub payment_id: String,
    pub subaddr_index: SubaddressIndex,
    pub tx_hash: String,
    pub unlock_time: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MoneroPayment {
    pub fn decimal_amount(&self) -> String {
        atomic_to_decimal(self.amount)
    }
}

/// One entry from `get_transfers`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MoneroTransfer {
    pub address: String,
    pub amount: u64,
    pub confirmations: u64,
    pub double_spend_seen: bool,
    pub fee: u64,
    pub height: u64,
    pub note: Option<String>,
    pub payment_id: String,
    pub subaddr_index: SubaddressIndex,
    pub subaddr_indices: Vec<SubaddressIndex>,
    pub suggested_confirmations_threshold: u64,
    pub timestamp: Option<u64>,
    pub txid: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub unlock_time: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MoneroTransfer {
    pub fn decimal_amount(&self) -> String {
        atomic_to_decimal(self.amount)
    }

    pub fn decimal_fee(&self) -> String {
        atomic_to_decimal(self.fee)
    }
}

impl fmt::Display for MoneroTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} XMR {} {} ({} confirmations)",
            self.decimal_amount(),
            match self.kind.as_str() {
                "in" => "into",
                "out" => "to",
                _ => "at",
            },
            self.address,
            self.confirmations
        )
    }
}

/// `get_transfers` result. The `in` and `out` lists are decoded; any other
/// category the wallet reports (`pending`, `pool`, `failed`) stays raw.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MoneroTransfers {
    #[serde(rename = "in", default)]
    pub incoming: Vec<MoneroTransfer>,
    #[serde(rename = "out", default)]
    pub outgoing: Vec<MoneroTransfer>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Filter for `get_transfers`. Keys in `extra` are sent as-is and win over
/// the named fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferQuery {
    pub account_index: u32,
    pub pending: bool,
    #[serde(rename = "in")]
    pub incoming: bool,
    #[serde(rename = "out")]
    pub outgoing: bool,
    pub subaddr_indices: Vec<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TransferQuery {
    fn default() -> Self {
        Self {
            account_index: 0,
            pending: true,
            incoming: true,
            outgoing: true,
            subaddr_indices: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub amount: u64,
    pub address: String,
}

/// Parameters for `transfer`. Keys in `extra` are sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    pub destinations: Vec<Destination>,
    pub account_index: u32,
    pub subaddr_indices: Vec<u32>,
    pub priority: u32,
    pub mixin: u32,
    pub ring_size: u32,
    pub payment_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransferRequest {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            account_index: 0,
            subaddr_indices: Vec::new(),
            priority: 0,
            mixin: 0,
            ring_size: 0,
            payment_id: String::new(),
            extra: Map::new(),
        }
    }
}

// ==============================================================================
// MoneroRpc
// ==============================================================================

/// Client for `monero-wallet-rpc`. Every method sends keyword params.
pub struct MoneroRpc<T = HttpTransport> {
    rpc: RpcClient<T>,
}

impl MoneroRpc {
    pub fn new(config: ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::with_client(RpcClient::new(config)?))
    }

    /// `monero-wallet-rpc` on `127.0.0.1:18082/json_rpc` with the given
    /// RPC login.
    pub fn local(username: &str, password: &str) -> Result<Self, RpcError> {
        Self::new(Preset::MONERO.config().with_credentials(username, password))
    }
}

impl<T: Transport> MoneroRpc<T> {
    pub fn with_client(rpc: RpcClient<T>) -> Self {
        Self { rpc }
    }

    pub fn inner(&self) -> &RpcClient<T> {
        &self.rpc
    }

    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_, T> {
        self.rpc.method(name)
    }

    /// Returns `{address, address_index}`.
    pub async fn create_address(&self, account_index: u32, label: &str) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("account_index", account_index)
            .kwarg("label", label);
        Ok(self.rpc.call("create_address", args).await?)
    }

    /// Returns `{account_index, address}`.
    pub async fn create_account(&self, label: &str) -> Result<Value, DaemonError> {
        let args = CallArgs::new().kwarg("label", label);
        Ok(self.rpc.call("create_account", args).await?)
    }

    pub async fn create_wallet(
        &self,
        filename: &str,
        password: Option<&str>,
        language: &str,
    ) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("filename", filename)
            .kwarg_opt("password", password)
            .kwarg("language", language);
        Ok(self.rpc.call("create_wallet", args).await?)
    }

    pub async fn get_height(&self) -> Result<u64, DaemonError> {
        let raw = self.rpc.call("get_height", CallArgs::new()).await?;
        field_u64("get_height", &raw, "height")
    }

    pub async fn get_accounts(&self, tag: Option<&str>) -> Result<Value, DaemonError> {
        let args = CallArgs::new().kwarg_opt("tag", tag);
        Ok(self.rpc.call("get_accounts", args).await?)
    }

    pub async fn get_address(
        &self,
        account_index: u32,
        address_index: &[u32],
    ) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("account_index", account_index)
            .kwarg("address_index", address_index.to_vec());
        Ok(self.rpc.call("get_address", args).await?)
    }

    pub async fn get_balance(
        &self,
        account_index: u32,
        address_indices: &[u32],
    ) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("account_index", account_index)
            .kwarg("address_indices", address_indices.to_vec());
        Ok(self.rpc.call("get_balance", args).await?)
    }

    pub async fn get_payments(&self, payment_id: &str) -> Result<Vec<MoneroPayment>, DaemonError> {
        #[derive(Deserialize)]
        struct Payments {
            #[serde(default)]
            payments: Vec<MoneroPayment>,
        }

        let args = CallArgs::new().kwarg("payment_id", payment_id);
        let payments: Payments = self.rpc.call_as("get_payments", args).await?;
        Ok(payments.payments)
    }

    pub async fn get_transfers(&self, query: &TransferQuery) -> Result<MoneroTransfers, DaemonError> {
        let args = named_args("get_transfers", query)?;
        Ok(self.rpc.call_as("get_transfers", args).await?)
    }

    /// RPC version, encoded as `major << 16 | minor`.
    pub async fn get_version(&self) -> Result<u64, DaemonError> {
        let raw = self.rpc.call("get_version", CallArgs::new()).await?;
        field_u64("get_version", &raw, "version")
    }

    /// Build a `monero:` payment URI. `amount` is in piconero.
    pub async fn make_uri(
        &self,
        address: &str,
        amount: Option<u64>,
        payment_id: Option<&str>,
        recipient_name: Option<&str>,
        tx_description: Option<&str>,
    ) -> Result<String, DaemonError> {
        let args = CallArgs::new()
            .kwarg("address", address)
            .kwarg_opt("amount", amount)
            .kwarg_opt("payment_id", payment_id)
            .kwarg_opt("recipient_name", recipient_name)
            .kwarg_opt("tx_description", tx_description);
        let raw = self.rpc.call("make_uri", args).await?;
        Ok(raw
            .get("uri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    /// Returns `{integrated_address, payment_id}`. The wallet picks its
    /// primary address and a random payment id for whichever is omitted.
    pub async fn make_integrated_address(
        &self,
        standard_address: Option<&str>,
        payment_id: Option<&str>,
    ) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg_opt("standard_address", standard_address)
            .kwarg_opt("payment_id", payment_id);
        Ok(self.rpc.call("make_integrated_address", args).await?)
    }

    pub async fn open_wallet(&self, filename: &str, password: Option<&str>) -> Result<Value, DaemonError> {
        let args = CallArgs::new()
            .kwarg("filename", filename)
            .kwarg_opt("password", password);
        Ok(self.rpc.call("open_wallet", args).await?)
    }

    pub async fn close_wallet(&self) -> Result<Value, DaemonError> {
        Ok(self.rpc.call("close_wallet", CallArgs::new()).await?)
    }

    /// Save the wallet file.
    pub async fn store(&self) -> Result<Value, DaemonError> {
        Ok(self.rpc.call("store", CallArgs::new()).await?)
    }

    /// Returns `{amount, fee, tx_hash, tx_key, ...}`.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<Value, DaemonError> {
        let args = named_args("transfer", request)?;
        Ok(self.rpc.call("transfer", args).await?)
    }

    /// Send a decimal XMR `amount` to a single address.
    pub async fn simple_transfer(
        &self,
        amount: &str,
        address: &str,
        account_index: u32,
        payment_id: &str,
    ) -> Result<Value, DaemonError> {
        let mut request = TransferRequest::new(vec![Destination {
            amount: decimal_to_atomic(amount)?,
            address: address.to_owned(),
        }]);
        request.account_index = account_index;
        request.payment_id = payment_id.to_owned();
        self.transfer(&request).await
    }

    /// Returns `{valid, integrated, subaddress, nettype, openalias_address}`.
    pub async fn validate_address(&self, address: &str) -> Result<Value, DaemonError> {
        let args = CallArgs::new().kwarg("address", address);
        Ok(self.rpc.call("validate_address", args).await?)
    }
}

fn field_u64(method: &'static str, raw: &Value, field: &str) -> Result<u64, DaemonError> {
    raw.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| DaemonError::UnexpectedResult {
            method,
            reason: format!("missing integer `{field}`"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decimal_to_atomic_whole_and_fractional() {
        assert_eq!(decimal_to_atomic("10").unwrap(), 10_000_000_000_000);
        assert_eq!(decimal_to_atomic("1.2345").unwrap(), 1_234_500_000_000);
        assert_eq!(decimal_to_atomic(".5").unwrap(), 500_000_000_000);
        assert_eq!(decimal_to_atomic("0.000000000001").unwrap(), 1);
    }

    #[test]
    fn decimal_to_atomic_rejects_bad_input() {
        for bad in ["", ".", "-1", "1e3", "1.2.3", "0.0000000000001", "99999999999"] {
            assert!(
                matches!(decimal_to_atomic(bad), Err(DaemonError::InvalidAmount { .. })),
                "{bad:?} must be rejected"
            );
        }
    }

    #[test]
    fn atomic_to_decimal_trims_trailing_zeros() {
        assert_eq!(atomic_to_decimal(10_000_000_000_000), "10");
        assert_eq!(atomic_to_decimal(1_234_500_000_000), "1.2345");
        assert_eq!(atomic_to_decimal(1), "0.000000000001");
        assert_eq!(atomic_to_decimal(0), "0");
    }

    #[test]
    fn transfer_query_serializes_in_and_out_keys() {
        let mut query = TransferQuery {
            account_index: 1,
            outgoing: false,
            ..TransferQuery::default()
        };
        query.extra.insert("pool".to_owned(), json!(true));

        let args = named_args("get_transfers", &query)
            .unwrap()
            .into_params("get_transfers")
            .unwrap();
        assert_eq!(
            serde_json::to_value(args).unwrap(),
            json!({
                "account_index": 1,
                "pending": true,
                "in": true,
                "out": false,
                "subaddr_indices": [],
                "pool": true
            })
        );
    }

    #[test]
    fn transfers_keep_unknown_categories() {
        let transfers: MoneroTransfers = serde_json::from_value(json!({
            "in": [{"address": "55LTR8", "amount": 1_234_500_000_000u64, "type": "in", "confirmations": 3}],
            "pool": [{"amount": 1}]
        }))
        .unwrap();

        assert_eq!(transfers.incoming.len(), 1);
        assert!(transfers.outgoing.is_empty());
        assert_eq!(transfers.incoming[0].decimal_amount(), "1.2345");
        assert_eq!(transfers.incoming[0].kind, "in");
        assert!(transfers.other.contains_key("pool"));
        assert_eq!(
            transfers.incoming[0].to_string(),
            "1.2345 XMR into 55LTR8 (3 confirmations)"
        );
    }
}
