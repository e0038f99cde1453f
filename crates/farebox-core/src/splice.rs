//! Relay splice: rewrite a negotiated candidate list through a paid relay.
//!
//! A paying viewer must never reach the broadcaster over the direct
//! peer-to-peer fast path, so every UDP candidate is dropped outright and
//! the surviving primary candidate is rewritten to the relay endpoint the
//! gatekeeper authorized. The transform is pure; ordering relative to the
//! rest of the negotiation is the session orchestrator's responsibility.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::negotiate::{CandidateProtocol, IceCandidate};

/// Relay endpoint issued by the gatekeeper for one
/// (destination, contract, payer) triple. Never cached or reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayGrant {
    pub relay_host: String,
    pub relay_port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpliceError {
    /// The server offered no relay-capable (non-UDP) candidate.
    #[error("no relay-capable candidate remains after filtering {dropped} udp candidate(s)")]
    NoEligibleCandidate { dropped: usize },
}

/// Drop every UDP candidate, then rewrite the remaining primary
/// candidate's address and port to the grant's relay endpoint.
///
/// Filtering is by declared protocol kind, never by list position.
/// Deterministic: the same inputs always produce the same output.
pub fn splice_consumer_path(
    candidates: &[IceCandidate],
    grant: &RelayGrant,
) -> Result<Vec<IceCandidate>, SpliceError> {
    let mut spliced: Vec<IceCandidate> = candidates
        .iter()
        .filter(|c| c.protocol != CandidateProtocol::Udp)
        .cloned()
        .collect();

    let primary = spliced
        .first_mut()
        .ok_or(SpliceError::NoEligibleCandidate {
            dropped: candidates.len(),
        })?;
    primary.address = grant.relay_host.clone();
    primary.port = grant.relay_port;

    Ok(spliced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(protocol: CandidateProtocol, address: &str, port: u16) -> IceCandidate {
        IceCandidate {
            foundation: "candidate0".to_string(),
            priority: 1076302079,
            address: address.to_string(),
            port,
            protocol,
            candidate_type: "host".to_string(),
        }
    }

    fn grant() -> RelayGrant {
        RelayGrant {
            relay_host: "127.0.0.1".to_string(),
            relay_port: 9100,
        }
    }

    #[test]
    fn drops_udp_and_rewrites_primary() {
        let original = vec![
            candidate(CandidateProtocol::Udp, "198.51.100.7", 40000),
            candidate(CandidateProtocol::Tcp, "198.51.100.7", 40001),
        ];
        let spliced = splice_consumer_path(&original, &grant()).unwrap();
        assert_eq!(spliced.len(), 1);
        assert_eq!(spliced[0].protocol, CandidateProtocol::Tcp);
        assert_eq!(spliced[0].address, "127.0.0.1");
        assert_eq!(spliced[0].port, 9100);
    }

    #[test]
    fn filters_by_kind_not_position() {
        // TCP first, UDP second: the UDP one must still be the one dropped.
        let original = vec![
            candidate(CandidateProtocol::Tcp, "198.51.100.7", 40001),
            candidate(CandidateProtocol::Udp, "198.51.100.7", 40000),
        ];
        let spliced = splice_consumer_path(&original, &grant()).unwrap();
        assert_eq!(spliced.len(), 1);
        assert_eq!(spliced[0].protocol, CandidateProtocol::Tcp);
        assert_eq!(spliced[0].port, 9100);
    }

    #[test]
    fn only_primary_is_rewritten() {
        let original = vec![
            candidate(CandidateProtocol::Tcp, "198.51.100.7", 40001),
            candidate(CandidateProtocol::Tcp, "198.51.100.8", 40002),
        ];
        let spliced = splice_consumer_path(&original, &grant()).unwrap();
        assert_eq!(spliced.len(), 2);
        assert_eq!(spliced[0].address, "127.0.0.1");
        assert_eq!(spliced[0].port, 9100);
        assert_eq!(spliced[1].address, "198.51.100.8");
        assert_eq!(spliced[1].port, 40002);
    }

    #[test]
    fn fails_when_nothing_survives() {
        let original = vec![candidate(CandidateProtocol::Udp, "198.51.100.7", 40000)];
        let err = splice_consumer_path(&original, &grant()).unwrap_err();
        assert_eq!(err, SpliceError::NoEligibleCandidate { dropped: 1 });

        let empty: Vec<IceCandidate> = vec![];
        assert!(splice_consumer_path(&empty, &grant()).is_err());
    }

    #[test]
    fn deterministic() {
        let original = vec![
            candidate(CandidateProtocol::Udp, "198.51.100.7", 40000),
            candidate(CandidateProtocol::Tcp, "198.51.100.7", 40001),
        ];
        let first = splice_consumer_path(&original, &grant()).unwrap();
        let second = splice_consumer_path(&original, &grant()).unwrap();
        assert_eq!(first, second);
    }
}
