//! Session configuration.
//!
//! The original deployment hard-wired its service endpoints and party
//! identities as module constants; here they are explicit values handed
//! to each component at construction so tests and alternate deployments
//! can substitute their own.

use serde::{Deserialize, Serialize};

/// Default local development endpoints.
pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:3000/server";
pub const DEFAULT_LEDGER_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_GATEKEEPER_URL: &str = "http://127.0.0.1:8122";

/// Amount granted to a fresh payer by the funding source.
pub const DEFAULT_AIRDROP_AMOUNT: u64 = 10_000;
/// Balance locked into a new escrow contract account.
pub const DEFAULT_CONTRACT_BALANCE: u64 = 1_000;
/// Interval, in ledger units, at which the gatekeeper meters charges.
pub const DEFAULT_FEE_INTERVAL: u64 = 1_000;

/// Network endpoints for the three external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// WebSocket URL of the media server's signaling channel.
    pub signaling_url: String,
    /// HTTP URL of the ledger's JSON-RPC node.
    pub ledger_url: String,
    /// HTTP URL of the gatekeeper's JSON-RPC service.
    pub gatekeeper_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            ledger_url: DEFAULT_LEDGER_URL.to_string(),
            gatekeeper_url: DEFAULT_GATEKEEPER_URL.to_string(),
        }
    }
}

/// Party identities and amounts for the escrow flow.
///
/// Addresses are hex-encoded Ed25519 public keys. The payer is NOT
/// configured here: a fresh payer identity is generated per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Address the escrow program is deployed at.
    pub program_address: String,
    /// Gatekeeper identity recorded as a contract party.
    pub gatekeeper_address: String,
    /// Stream provider identity recorded as a contract party.
    pub provider_address: String,
    /// Units requested from the funding source per session.
    pub airdrop_amount: u64,
    /// Units locked into the contract account.
    pub contract_balance: u64,
    /// Metering interval passed to the gatekeeper.
    pub fee_interval: u64,
}

impl EscrowConfig {
    pub fn new(
        program_address: impl Into<String>,
        gatekeeper_address: impl Into<String>,
        provider_address: impl Into<String>,
    ) -> Self {
        Self {
            program_address: program_address.into(),
            gatekeeper_address: gatekeeper_address.into(),
            provider_address: provider_address.into(),
            airdrop_amount: DEFAULT_AIRDROP_AMOUNT,
            contract_balance: DEFAULT_CONTRACT_BALANCE,
            fee_interval: DEFAULT_FEE_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_are_local() {
        let endpoints = EndpointConfig::default();
        assert!(endpoints.signaling_url.starts_with("ws://127.0.0.1"));
        assert!(endpoints.ledger_url.starts_with("http://127.0.0.1"));
        assert!(endpoints.gatekeeper_url.starts_with("http://127.0.0.1"));
    }

    #[test]
    fn test_escrow_config_defaults() {
        let escrow = EscrowConfig::new("aa", "bb", "cc");
        assert_eq!(escrow.airdrop_amount, DEFAULT_AIRDROP_AMOUNT);
        assert_eq!(escrow.contract_balance, DEFAULT_CONTRACT_BALANCE);
        assert!(escrow.airdrop_amount > escrow.contract_balance);
    }

    #[test]
    fn test_escrow_config_serde_round_trip() {
        let escrow = EscrowConfig::new("aa", "bb", "cc");
        let json = serde_json::to_string(&escrow).unwrap();
        let back: EscrowConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.program_address, "aa");
        assert_eq!(back.fee_interval, escrow.fee_interval);
    }
}
