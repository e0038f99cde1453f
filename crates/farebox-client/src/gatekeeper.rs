//! Gatekeeper authorization client.
//!
//! One JSON-RPC call: `newConnection(destination, contractAddress,
//! payerAddress, feeInterval) -> {relayHost, relayPort}`. Each call is a
//! fresh authorization check against the escrow contract; grants are
//! never cached. One bounded wait; any failure (transport, timeout,
//! malformed reply, or explicit rejection) is fatal to the caller's
//! session, since falling back to the direct path would bypass payment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info};

use farebox_common::rpc::{RpcRequest, RpcResponse};
use farebox_common::{Error, Result};
use farebox_core::splice::RelayGrant;

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GatekeeperClient {
    http: reqwest::Client,
    url: String,
    fee_interval: u64,
    timeout: Duration,
    next_id: AtomicU64,
}

impl GatekeeperClient {
    pub fn new(url: impl Into<String>, fee_interval: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            fee_interval,
            timeout: DEFAULT_RPC_TIMEOUT,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request an authorized relay toward `destination`, backed by the
    /// given contract and payer.
    pub async fn request_relay(
        &self,
        destination: &str,
        contract_address: &str,
        payer_address: &str,
    ) -> Result<RelayGrant> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(
            id,
            "newConnection",
            json!({
                "destination": destination,
                "contractAddress": contract_address,
                "payerAddress": payer_address,
                "feeInterval": self.fee_interval,
            }),
        );
        debug!(destination, contract = contract_address, "requesting relay");

        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::gatekeeper(format!("newConnection timed out after {:?}", self.timeout))
                } else {
                    Error::gatekeeper(err)
                }
            })?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| Error::gatekeeper(format!("malformed response: {err}")))?;
        let result = body.into_result().map_err(Error::gatekeeper)?;

        let grant: RelayGrant = serde_json::from_value(result)
            .map_err(|err| Error::gatekeeper(format!("malformed grant: {err}")))?;
        info!(relay = %format!("{}:{}", grant.relay_host, grant.relay_port),
              destination, "relay granted");
        Ok(grant)
    }
}
