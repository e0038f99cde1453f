//! Media-plane link engines.
//!
//! A `TransportLink` runs the local side of a transport's connectivity
//! handshake: started with the (possibly spliced) transport parameters,
//! it yields the local DTLS parameters and reports progress on a watch
//! channel (`New → Connecting → Connected | Failed`). The signaling
//! round-trips alone never flip a transport to connected; only a link
//! state event does.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::RngCore;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use farebox_common::{Error, Result};
use farebox_core::negotiate::{
    CandidateProtocol, DtlsFingerprint, DtlsParameters, DtlsRole, IceCandidate, TransportParams,
};
use farebox_core::transport::TransportDirection;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const UDP_PROBE_PAYLOAD: &[u8] = b"fbx-probe";
const UDP_PROBE_COUNT: usize = 3;

/// Connection state reported by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Failed,
}

/// One media-plane connectivity engine.
pub trait TransportLink: Send {
    /// Begin the local handshake toward the primary candidate. Returns
    /// the local DTLS parameters; connection progress arrives on the
    /// watch channel from [`Self::states`].
    fn start(
        &mut self,
        params: &TransportParams,
    ) -> impl Future<Output = Result<DtlsParameters>> + Send;

    fn states(&self) -> watch::Receiver<LinkState>;

    /// Stop the handshake. Safe to call at any time, including before
    /// `start` or after completion.
    fn close(&mut self);
}

/// Creates one link per transport.
pub trait LinkFactory: Send {
    type Link: TransportLink;

    fn open(&self, direction: TransportDirection) -> Self::Link;
}

/// Local DTLS parameters for a fresh link.
// TODO: derive the fingerprint from the DTLS certificate once the media
// engine exposes one; until then each link presents a fresh random
// fingerprint.
fn local_dtls_parameters() -> DtlsParameters {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let value = bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":");
    DtlsParameters {
        role: DtlsRole::Client,
        fingerprints: vec![DtlsFingerprint {
            algorithm: "sha-256".to_string(),
            value,
        }],
    }
}

/// Socket-level link: probes reachability of the primary candidate with
/// a bounded TCP connect or a short burst of UDP probes.
pub struct SocketLink {
    direction: TransportDirection,
    timeout: Duration,
    state_tx: watch::Sender<LinkState>,
    state_rx: watch::Receiver<LinkState>,
    task: Option<JoinHandle<()>>,
}

impl SocketLink {
    pub fn new(direction: TransportDirection, timeout: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(LinkState::New);
        Self {
            direction,
            timeout,
            state_tx,
            state_rx,
            task: None,
        }
    }
}

async fn probe_candidate(candidate: &IceCandidate, timeout: Duration) -> Result<()> {
    let target = format!("{}:{}", candidate.address, candidate.port);
    match candidate.protocol {
        CandidateProtocol::Tcp => {
            tokio::time::timeout(timeout, TcpStream::connect(&target))
                .await
                .map_err(|_| Error::timeout(format!("tcp probe to {target}")))??;
            Ok(())
        }
        CandidateProtocol::Udp => {
            // Hole-punch style: a short burst, no reply expected.
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            for _ in 0..UDP_PROBE_COUNT {
                socket.send_to(UDP_PROBE_PAYLOAD, &target).await?;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(())
        }
    }
}

impl TransportLink for SocketLink {
    async fn start(&mut self, params: &TransportParams) -> Result<DtlsParameters> {
        let primary = params
            .ice_candidates
            .first()
            .cloned()
            .ok_or_else(|| Error::negotiation("transport has no candidates"))?;

        self.state_tx.send_replace(LinkState::Connecting);
        let tx = self.state_tx.clone();
        let timeout = self.timeout;
        let direction = self.direction;
        self.task = Some(tokio::spawn(async move {
            match probe_candidate(&primary, timeout).await {
                Ok(()) => {
                    debug!(%direction, endpoint = %primary.endpoint(), "link connected");
                    tx.send_replace(LinkState::Connected);
                }
                Err(err) => {
                    warn!(%direction, endpoint = %primary.endpoint(), %err, "link failed");
                    tx.send_replace(LinkState::Failed);
                }
            }
        }));

        Ok(local_dtls_parameters())
    }

    fn states(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SocketLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SocketLinkFactory {
    timeout: Option<Duration>,
}

impl LinkFactory for SocketLinkFactory {
    type Link = SocketLink;

    fn open(&self, direction: TransportDirection) -> SocketLink {
        SocketLink::new(direction, self.timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT))
    }
}

/// What a [`ScriptedLink`] does when started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPlan {
    /// Report connected immediately.
    Connect,
    /// Report failure immediately.
    Fail,
    /// Stay in `Connecting` forever.
    Stall,
}

/// Deterministic link for headless runs and tests: follows a fixed plan
/// instead of touching the network, and records the parameters it was
/// started with.
pub struct ScriptedLink {
    plan: LinkPlan,
    started: Arc<Mutex<Vec<TransportParams>>>,
    state_tx: watch::Sender<LinkState>,
    state_rx: watch::Receiver<LinkState>,
}

impl TransportLink for ScriptedLink {
    async fn start(&mut self, params: &TransportParams) -> Result<DtlsParameters> {
        if let Ok(mut started) = self.started.lock() {
            started.push(params.clone());
        }
        self.state_tx.send_replace(LinkState::Connecting);
        match self.plan {
            LinkPlan::Connect => {
                self.state_tx.send_replace(LinkState::Connected);
            }
            LinkPlan::Fail => {
                self.state_tx.send_replace(LinkState::Failed);
            }
            LinkPlan::Stall => {}
        }
        Ok(local_dtls_parameters())
    }

    fn states(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    fn close(&mut self) {}
}

#[derive(Clone)]
pub struct ScriptedLinkFactory {
    plan: LinkPlan,
    started: Arc<Mutex<Vec<TransportParams>>>,
}

impl ScriptedLinkFactory {
    pub fn new(plan: LinkPlan) -> Self {
        Self {
            plan,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Parameters every started link was handed, in start order.
    pub fn started_params(&self) -> Vec<TransportParams> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl LinkFactory for ScriptedLinkFactory {
    type Link = ScriptedLink;

    fn open(&self, _direction: TransportDirection) -> ScriptedLink {
        let (state_tx, state_rx) = watch::channel(LinkState::New);
        ScriptedLink {
            plan: self.plan,
            started: self.started.clone(),
            state_tx,
            state_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farebox_core::negotiate::{IceParameters, TransportParams};

    fn params() -> TransportParams {
        TransportParams {
            id: "t1".to_string(),
            ice_candidates: vec![IceCandidate {
                foundation: "c0".to_string(),
                priority: 1,
                address: "127.0.0.1".to_string(),
                port: 9,
                protocol: CandidateProtocol::Tcp,
                candidate_type: "host".to_string(),
            }],
            ice_parameters: IceParameters {
                username_fragment: "u".to_string(),
                password: "p".to_string(),
                ice_lite: false,
            },
            dtls_parameters: local_dtls_parameters(),
        }
    }

    #[tokio::test]
    async fn scripted_link_reports_planned_state() {
        let factory = ScriptedLinkFactory::new(LinkPlan::Connect);
        let mut link = factory.open(TransportDirection::Recv);
        let dtls = link.start(&params()).await.unwrap();
        assert!(!dtls.fingerprints.is_empty());
        assert_eq!(*link.states().borrow(), LinkState::Connected);
        assert_eq!(factory.started_params().len(), 1);

        let failing = ScriptedLinkFactory::new(LinkPlan::Fail);
        let mut link = failing.open(TransportDirection::Recv);
        link.start(&params()).await.unwrap();
        assert_eq!(*link.states().borrow(), LinkState::Failed);
    }

    #[tokio::test]
    async fn socket_link_fails_on_unreachable_candidate() {
        // Port 9 (discard) on localhost is almost certainly closed; the
        // probe must end in Failed, not hang.
        let mut link = SocketLink::new(TransportDirection::Recv, Duration::from_millis(500));
        link.start(&params()).await.unwrap();
        let mut states = link.states();
        let deadline = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let state = *states.borrow_and_update();
                if state == LinkState::Failed || state == LinkState::Connected {
                    return state;
                }
                if states.changed().await.is_err() {
                    return *states.borrow();
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(deadline, LinkState::Failed);
    }

    #[tokio::test]
    async fn socket_link_requires_a_candidate() {
        let mut link = SocketLink::new(TransportDirection::Send, DEFAULT_PROBE_TIMEOUT);
        let mut empty = params();
        empty.ice_candidates.clear();
        assert!(link.start(&empty).await.is_err());
    }

    #[test]
    fn dtls_fingerprint_shape() {
        let dtls = local_dtls_parameters();
        assert_eq!(dtls.fingerprints.len(), 1);
        let value = &dtls.fingerprints[0].value;
        // 32 bytes -> 32 hex pairs joined by ':'
        assert_eq!(value.len(), 32 * 2 + 31);
        assert!(value.split(':').all(|p| p.len() == 2));
    }
}
