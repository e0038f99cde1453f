//! Session orchestrator.
//!
//! One `SessionRunner` drives at most one session at a time. The
//! broadcast path is free: capabilities, send transport, local media,
//! produce. The viewer path interleaves the escrow flow: capabilities,
//! consumer parameters, fund, open contract, relay grant, splice, and
//! only then the receive transport. A viewer transport is never built
//! from un-spliced candidates, and no failure falls back to the direct
//! path. Every exit path, including mid-sequence failures, runs the same
//! teardown.

use std::time::Duration;

use tracing::{debug, info, warn};

use farebox_common::{EndpointConfig, Error, EscrowConfig, Result};
use farebox_core::negotiate::TransportParams;
use farebox_core::splice::{splice_consumer_path, RelayGrant};
use farebox_core::transport::{TransportDirection, TransportState};
use farebox_escrow::{EscrowContract, EscrowSession, LedgerClient};

use crate::device::{Device, Transport};
use crate::gatekeeper::GatekeeperClient;
use crate::link::{LinkFactory, TransportLink};
use crate::media::{MediaConstraints, MediaSource, MediaTrack, RemoteStream};
use crate::signaling::SignalingClient;

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Broadcast,
    View,
}

struct ActiveSession<L> {
    mode: SessionMode,
    signaling: SignalingClient,
    transports: Vec<Transport>,
    links: Vec<L>,
    track: Option<MediaTrack>,
    contract: Option<EscrowContract>,
    grant: Option<RelayGrant>,
    producer_id: Option<String>,
    remote: Option<RemoteStream>,
}

impl<L> ActiveSession<L> {
    fn new(mode: SessionMode, signaling: SignalingClient) -> Self {
        Self {
            mode,
            signaling,
            transports: Vec::new(),
            links: Vec::new(),
            track: None,
            contract: None,
            grant: None,
            producer_id: None,
            remote: None,
        }
    }
}

/// Owns the session lifecycle: `start` runs one full negotiation
/// sequence, `stop` tears everything down and is safe to call at any
/// time, any number of times.
pub struct SessionRunner<F: LinkFactory> {
    endpoints: EndpointConfig,
    escrow_config: EscrowConfig,
    links: F,
    media: Box<dyn MediaSource>,
    rpc_timeout: Duration,
    active: Option<ActiveSession<F::Link>>,
}

impl<F: LinkFactory> SessionRunner<F> {
    pub fn new(
        endpoints: EndpointConfig,
        escrow_config: EscrowConfig,
        links: F,
        media: Box<dyn MediaSource>,
    ) -> Self {
        Self {
            endpoints,
            escrow_config,
            links,
            media,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            active: None,
        }
    }

    /// Bound every signaling/ledger/gatekeeper round-trip by `timeout`.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn open_transports(&self) -> usize {
        self.active.as_ref().map_or(0, |s| s.transports.len())
    }

    pub fn transport_states(&self) -> Vec<TransportState> {
        self.active
            .as_ref()
            .map_or_else(Vec::new, |s| s.transports.iter().map(|t| t.state()).collect())
    }

    pub fn producer_id(&self) -> Option<&str> {
        self.active.as_ref().and_then(|s| s.producer_id.as_deref())
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.active.as_ref().and_then(|s| s.remote.as_ref())
    }

    pub fn contract(&self) -> Option<&EscrowContract> {
        self.active.as_ref().and_then(|s| s.contract.as_ref())
    }

    pub fn grant(&self) -> Option<&RelayGrant> {
        self.active.as_ref().and_then(|s| s.grant.as_ref())
    }

    /// Start one session. Refused while a previous session is still
    /// active: callers must let `stop` resolve first, so a new session
    /// can never observe the old one's transports.
    pub async fn start(&mut self, mode: SessionMode) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::negotiation(
                "a session is already active; stop it before starting another",
            ));
        }
        info!(?mode, url = %self.endpoints.signaling_url, "starting session");

        let signaling = SignalingClient::connect(&self.endpoints.signaling_url)
            .await?
            .with_timeout(self.rpc_timeout);
        self.active = Some(ActiveSession::new(mode, signaling));

        let result = match mode {
            SessionMode::Broadcast => self.run_broadcast().await,
            SessionMode::View => self.run_view().await,
        };
        if let Err(err) = result {
            warn!(%err, "session failed, tearing down");
            self.stop().await;
            return Err(err);
        }
        Ok(())
    }

    async fn run_broadcast(&mut self) -> Result<()> {
        let session = self
            .active
            .as_mut()
            .ok_or_else(|| Error::negotiation("no active session"))?;

        let capabilities = session.signaling.get_capabilities().await?;
        let device = Device::load(capabilities)?;
        let mut transport = device.create_send_transport(&session.signaling).await?;

        let track = self.media.acquire(&MediaConstraints::default())?;
        let rtp_parameters = device.rtp_parameters_for(track.kind())?;
        let mut link = self.links.open(TransportDirection::Send);

        let connected = transport
            .connect_send(&session.signaling, &mut link, track.kind(), rtp_parameters)
            .await;
        session.transports.push(transport);
        session.links.push(link);
        session.track = Some(track);

        let producer_id = connected?;
        session.producer_id = Some(producer_id);
        Ok(())
    }

    async fn run_view(&mut self) -> Result<()> {
        let session = self
            .active
            .as_mut()
            .ok_or_else(|| Error::negotiation("no active session"))?;

        let capabilities = session.signaling.get_capabilities().await?;
        let device = Device::load(capabilities)?;

        // The candidate set is fetched before any payment happens: it
        // names the destination the grant is scoped to and is the input
        // to the splice. The local transport is only built afterwards.
        let params = session.signaling.create_consumer_transport(true).await?;
        let primary = params
            .ice_candidates
            .first()
            .ok_or_else(|| Error::negotiation("server offered no candidates"))?;
        let destination = primary.endpoint();

        let ledger =
            LedgerClient::new(&self.endpoints.ledger_url).with_timeout(self.rpc_timeout);
        let escrow = EscrowSession::new(ledger, self.escrow_config.clone())?;
        let payer = escrow.fund().await?;
        let contract = escrow.open_contract(&payer).await?;
        session.contract = Some(contract.clone());

        let gatekeeper = GatekeeperClient::new(
            &self.endpoints.gatekeeper_url,
            self.escrow_config.fee_interval,
        )
        .with_timeout(self.rpc_timeout);
        let grant = gatekeeper
            .request_relay(
                &destination,
                contract.address.as_str(),
                payer.address().as_str(),
            )
            .await?;

        let spliced = splice_consumer_path(&params.ice_candidates, &grant)
            .map_err(Error::splice)?;
        debug!(candidates = spliced.len(), relay = %format!("{}:{}", grant.relay_host, grant.relay_port),
               "consumer path spliced");
        session.grant = Some(grant);

        let spliced_params = TransportParams {
            ice_candidates: spliced,
            ..params
        };
        let mut transport = device.create_recv_transport(spliced_params);
        let mut link = self.links.open(TransportDirection::Recv);
        let connected = transport.connect_recv(&session.signaling, &mut link).await;
        session.transports.push(transport);
        session.links.push(link);
        connected?;

        let transport = session
            .transports
            .last()
            .ok_or_else(|| Error::negotiation("no active session"))?;
        let remote = transport
            .consume(&session.signaling, device.rtp_capabilities())
            .await?;
        info!(consumer = %remote.consumer_id, producer = %remote.producer_id,
              "viewing via paid relay");
        session.remote = Some(remote);
        Ok(())
    }

    /// Tear down the active session: close every link and transport,
    /// release the local media track, drop session state. A no-op when
    /// nothing is active; calling it twice observes nothing to close.
    pub async fn stop(&mut self) {
        let Some(mut session) = self.active.take() else {
            debug!("stop: no active session");
            return;
        };
        for link in session.links.iter_mut() {
            link.close();
        }
        for transport in session.transports.iter_mut() {
            transport.close();
        }
        if let Some(track) = session.track.as_mut() {
            track.stop();
        }
        session.signaling.close().await;
        info!(mode = ?session.mode, "session stopped");
    }
}
