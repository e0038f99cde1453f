//! Core Farebox protocol types.
//!
//! This crate provides:
//! - Negotiation value types (capabilities, ICE candidates, DTLS parameters)
//! - The per-transport connection state machine
//! - The relay splice transform that rewrites a negotiated candidate list
//!   through a paid relay
//! - The signaling request/response envelope
//!
//! Everything here is pure: no sockets, no clocks, no tasks. The I/O lives
//! in `farebox-client` and `farebox-escrow`.

#![forbid(unsafe_code)]

pub mod negotiate;
pub mod signal;
pub mod splice;
pub mod transport;

pub use negotiate::{
    CandidateProtocol, CodecCapability, CodecParameters, DtlsFingerprint, DtlsParameters,
    DtlsRole, IceCandidate, IceParameters, MediaKind, RtpCapabilities, RtpParameters,
    TransportParams,
};
pub use splice::{splice_consumer_path, RelayGrant, SpliceError};
pub use transport::{TransportDirection, TransportError, TransportMachine, TransportState};
