//! Ledger JSON-RPC client.
//!
//! Three calls: `requestAirdrop`, `getBalance`, `submitTransaction`.
//! Every call is one bounded HTTP round-trip; `submitTransaction` only
//! returns once the node reports the transaction confirmed, so a success
//! here means the contract account exists on ledger. No retries: a
//! failed or timed-out call is fatal to the session that issued it.

use farebox_common::rpc::{RpcRequest, RpcResponse};
use farebox_common::{Error, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::identity::LedgerAddress;

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LedgerClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl LedgerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            timeout: DEFAULT_RPC_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!(method, id, "ledger rpc call");

        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::timeout(format!("ledger {method}"))
                } else {
                    Error::ledger(err)
                }
            })?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| Error::ledger(format!("malformed response to {method}: {err}")))?;
        body.into_result()
            .map_err(|err| Error::ledger(format!("{method}: {err}")))
    }

    /// Request `amount` units for `address` from the node's faucet.
    /// Returns the amount actually granted.
    pub async fn request_airdrop(&self, address: &LedgerAddress, amount: u64) -> Result<u64> {
        let result = self
            .call(
                "requestAirdrop",
                json!({"address": address.as_str(), "amount": amount}),
            )
            .await?;
        result["amount"]
            .as_u64()
            .ok_or_else(|| Error::ledger("requestAirdrop reply missing amount"))
    }

    /// Current balance of `address`.
    pub async fn get_balance(&self, address: &LedgerAddress) -> Result<u64> {
        let result = self
            .call("getBalance", json!({"address": address.as_str()}))
            .await?;
        result["amount"]
            .as_u64()
            .ok_or_else(|| Error::ledger("getBalance reply missing amount"))
    }

    /// Submit a signed transaction (base64 body) and block until the node
    /// confirms it. Returns the confirmed signature.
    pub async fn submit_transaction(&self, transaction_base64: &str) -> Result<String> {
        let result = self
            .call(
                "submitTransaction",
                json!({"transaction": transaction_base64}),
            )
            .await?;
        result["signature"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::ledger("submitTransaction reply missing signature"))
    }
}
