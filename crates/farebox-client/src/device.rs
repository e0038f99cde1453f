//! Device and transport negotiation.
//!
//! A `Device` is the local negotiation endpoint, loaded from the server's
//! capabilities; transports can only be created through a loaded device.
//! Connecting a transport interleaves the link handshake with the
//! signaling round-trips and only reports connected once the link does.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use farebox_common::{Error, Result};
use farebox_core::negotiate::{
    CodecParameters, MediaKind, RtpCapabilities, RtpParameters, TransportParams,
};
use farebox_core::transport::{TransportDirection, TransportMachine, TransportState};

use crate::link::{LinkState, TransportLink};
use crate::media::RemoteStream;
use crate::signaling::SignalingClient;

const LINK_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Local negotiation endpoint, valid only once capabilities loaded.
pub struct Device {
    capabilities: RtpCapabilities,
}

impl Device {
    /// Load the device from server capabilities. Fails on an empty
    /// capability set; no transport can exist before this succeeds.
    pub fn load(capabilities: RtpCapabilities) -> Result<Self> {
        if capabilities.codecs.is_empty() {
            return Err(Error::negotiation("server capabilities list no codecs"));
        }
        debug!(codecs = capabilities.codecs.len(), "device loaded");
        Ok(Self { capabilities })
    }

    pub fn rtp_capabilities(&self) -> &RtpCapabilities {
        &self.capabilities
    }

    /// Ask the server for send-transport parameters and build the local
    /// transport in `Created` state.
    pub async fn create_send_transport(&self, signaling: &SignalingClient) -> Result<Transport> {
        let params = signaling.create_producer_transport(&self.capabilities).await?;
        Ok(Transport::new(TransportDirection::Send, params))
    }

    /// Build a receive transport from externally supplied parameters.
    ///
    /// The parameters are taken as given rather than fetched here because
    /// the viewer path rewrites the candidate list (relay splice) between
    /// fetching and construction.
    pub fn create_recv_transport(&self, params: TransportParams) -> Transport {
        Transport::new(TransportDirection::Recv, params)
    }

    /// RTP parameters for one stream of the given kind, derived from the
    /// first matching server codec.
    pub fn rtp_parameters_for(&self, kind: MediaKind) -> Result<RtpParameters> {
        let codec = self
            .capabilities
            .codec_for(kind)
            .ok_or_else(|| Error::negotiation(format!("server offers no {kind} codec")))?;
        let payload_type = match kind {
            MediaKind::Audio => 111,
            MediaKind::Video => 96,
        };
        Ok(RtpParameters {
            codecs: vec![CodecParameters {
                mime_type: codec.mime_type.clone(),
                payload_type,
                clock_rate: codec.clock_rate,
                channels: codec.channels,
            }],
            mid: None,
        })
    }
}

/// One unidirectional transport under negotiation.
pub struct Transport {
    id: String,
    direction: TransportDirection,
    params: TransportParams,
    machine: TransportMachine,
}

impl Transport {
    fn new(direction: TransportDirection, params: TransportParams) -> Self {
        Self {
            id: params.id.clone(),
            direction,
            params,
            machine: TransportMachine::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> TransportDirection {
        self.direction
    }

    pub fn state(&self) -> TransportState {
        self.machine.state()
    }

    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Connect a send transport: start the link, forward local DTLS
    /// parameters, announce the stream, then wait for the link to report
    /// connected. Returns the server-assigned producer id.
    pub async fn connect_send<L: TransportLink>(
        &mut self,
        signaling: &SignalingClient,
        link: &mut L,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<String> {
        self.machine.on_connect().map_err(Error::negotiation)?;
        let result = async {
            let dtls = link.start(&self.params).await?;
            signaling.connect_producer_transport(&dtls).await?;
            let producer_id = signaling.produce(&self.id, kind, rtp_parameters).await?;
            await_link_connected(link.states(), LINK_CONNECT_TIMEOUT).await?;
            Ok(producer_id)
        }
        .await;

        match result {
            Ok(producer_id) => {
                self.machine.on_connected().map_err(Error::negotiation)?;
                info!(transport = %self.id, producer = %producer_id, "send transport connected");
                Ok(producer_id)
            }
            Err(err) => {
                self.fail_and_close(link);
                Err(err)
            }
        }
    }

    /// Connect a receive transport: start the link and forward local DTLS
    /// parameters. No produce step on this direction.
    pub async fn connect_recv<L: TransportLink>(
        &mut self,
        signaling: &SignalingClient,
        link: &mut L,
    ) -> Result<()> {
        self.machine.on_connect().map_err(Error::negotiation)?;
        let result = async {
            let dtls = link.start(&self.params).await?;
            signaling
                .connect_consumer_transport(&self.id, &dtls)
                .await?;
            await_link_connected(link.states(), LINK_CONNECT_TIMEOUT).await
        }
        .await;

        match result {
            Ok(()) => {
                self.machine.on_connected().map_err(Error::negotiation)?;
                info!(transport = %self.id, "recv transport connected");
                Ok(())
            }
            Err(err) => {
                self.fail_and_close(link);
                Err(err)
            }
        }
    }

    /// Ask the server to forward one stream to this transport and resume
    /// it. Valid only while the transport is connecting or connected.
    pub async fn consume(
        &self,
        signaling: &SignalingClient,
        capabilities: &RtpCapabilities,
    ) -> Result<RemoteStream> {
        match self.machine.state() {
            TransportState::Connecting | TransportState::Connected => {}
            state => {
                return Err(Error::negotiation(format!(
                    "cannot consume on a {state:?} transport"
                )))
            }
        }
        let reply = signaling.consume(capabilities).await?;
        signaling.resume().await?;
        Ok(RemoteStream {
            consumer_id: reply.id,
            producer_id: reply.producer_id,
            kind: reply.kind,
            rtp_parameters: reply.rtp_parameters,
        })
    }

    /// Explicit teardown; idempotent.
    pub fn close(&mut self) {
        if !self.machine.is_closed() {
            debug!(transport = %self.id, direction = %self.direction, "closing transport");
        }
        self.machine.on_close();
    }

    fn fail_and_close<L: TransportLink>(&mut self, link: &mut L) {
        // Failed is only reachable from Connecting; anything else goes
        // straight to Closed.
        let _ = self.machine.on_failed();
        self.machine.on_close();
        link.close();
    }
}

async fn await_link_connected(
    mut states: watch::Receiver<LinkState>,
    timeout: Duration,
) -> Result<()> {
    let wait = async {
        loop {
            let state = *states.borrow_and_update();
            match state {
                LinkState::Connected => return Ok(()),
                LinkState::Failed => return Err(Error::negotiation("link handshake failed")),
                LinkState::New | LinkState::Connecting => {}
            }
            if states.changed().await.is_err() {
                return Err(Error::negotiation("link dropped during handshake"));
            }
        }
    };
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| Error::timeout("link handshake"))?
}
