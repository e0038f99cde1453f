//! Local media sources and remote stream handles.
//!
//! The core never touches pixels: a broadcast session acquires an opaque
//! track from a `MediaSource` and attaches it to a transport; a viewer
//! session receives a `RemoteStream` handle and hands it to whatever
//! renders it. `TestPatternSource` ships for headless runs.

use tracing::debug;
use uuid::Uuid;

use farebox_common::Result;
use farebox_core::negotiate::{MediaKind, RtpParameters};

/// Constraints for acquiring a local track.
#[derive(Debug, Clone)]
pub struct MediaConstraints {
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            kind: MediaKind::Video,
            width: 1280,
            height: 720,
            frame_rate: 30,
        }
    }
}

/// Handle to one acquired local track.
pub struct MediaTrack {
    id: String,
    kind: MediaKind,
    label: String,
    stopped: bool,
}

impl MediaTrack {
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            stopped: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Release the underlying capture. Idempotent.
    pub fn stop(&mut self) {
        if !self.stopped {
            debug!(track = %self.id, label = %self.label, "stopping media track");
            self.stopped = true;
        }
    }
}

/// Provider of local media tracks.
pub trait MediaSource: Send {
    fn acquire(&mut self, constraints: &MediaConstraints) -> Result<MediaTrack>;
}

/// Synthetic source for headless runs: always succeeds, produces no
/// actual frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPatternSource;

impl MediaSource for TestPatternSource {
    fn acquire(&mut self, constraints: &MediaConstraints) -> Result<MediaTrack> {
        Ok(MediaTrack::new(
            constraints.kind,
            format!("test-pattern-{}", constraints.kind),
        ))
    }
}

/// One stream the media server is forwarding to a viewer session.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub consumer_id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}
