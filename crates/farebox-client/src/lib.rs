//! Farebox client library.
//!
//! The viewer/broadcaster side of the pay-per-view protocol: a WebSocket
//! signaling client toward the media server, the device/transport
//! negotiator, the gatekeeper authorization client, a local media source
//! abstraction, and the session orchestrator that strings them together
//! (with the escrow flow from `farebox-escrow` spliced into the viewer
//! path).

#![forbid(unsafe_code)]

pub mod device;
pub mod gatekeeper;
pub mod link;
pub mod media;
pub mod session;
pub mod signaling;

pub use device::{Device, Transport};
pub use gatekeeper::GatekeeperClient;
pub use link::{
    LinkFactory, LinkPlan, LinkState, ScriptedLink, ScriptedLinkFactory, SocketLink,
    SocketLinkFactory, TransportLink,
};
pub use media::{MediaConstraints, MediaSource, MediaTrack, RemoteStream, TestPatternSource};
pub use session::{SessionMode, SessionRunner};
pub use signaling::SignalingClient;
