//! WebSocket signaling client with request/response correlation.
//!
//! Requests carry an id; a background reader task routes each response to
//! the oneshot waiter registered under that id. Closing the client drops
//! every pending waiter, so a late server response to a torn-down session
//! is discarded instead of resurrecting it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use farebox_common::{Error, Result};
use farebox_core::negotiate::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters, TransportParams};
use farebox_core::signal::{
    method, ConnectTransportRequest, ConsumeReply, ConsumeRequest, CreateTransportRequest,
    ProduceReply, ProduceRequest, ServerFrame, SignalRequest,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

enum Outbound {
    Frame(String),
    Close,
}

pub struct SignalingClient {
    out_tx: mpsc::Sender<Outbound>,
    pending: PendingMap,
    next_id: AtomicU64,
    timeout: Duration,
    reader: Option<JoinHandle<()>>,
}

impl SignalingClient {
    /// Connect to the media server's signaling endpoint and spawn the
    /// reader/writer tasks.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url).await.map_err(Error::signaling)?;
        let (mut sink, mut stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(32);
        tokio::spawn(async move {
            while let Some(outbound) = out_rx.recv().await {
                let result = match outbound {
                    Outbound::Frame(text) => sink.send(Message::Text(text)).await,
                    Outbound::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                };
                if let Err(err) = result {
                    warn!(%err, "signaling write failed");
                    break;
                }
            }
        });

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let pending_for_reader = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let frame: ServerFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(%err, "malformed signaling frame");
                        continue;
                    }
                };
                match frame.id {
                    Some(id) => {
                        let waiter = pending_for_reader.lock().await.remove(&id);
                        match waiter {
                            Some(tx) => {
                                let result = match frame.error {
                                    Some(message) => Err(Error::signaling(message)),
                                    None => Ok(frame.data),
                                };
                                let _ = tx.send(result);
                            }
                            // Request cancelled or session torn down.
                            None => debug!(id, "dropping late signaling response"),
                        }
                    }
                    None => {
                        debug!(method = frame.method.as_deref().unwrap_or("?"),
                               "server notification");
                    }
                }
            }
            // Connection gone: fail everything still in flight.
            pending_for_reader.lock().await.clear();
        });

        Ok(Self {
            out_tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            reader: Some(reader),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One request/response round-trip over the signaling channel.
    async fn request(&self, method: &str, data: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = SignalRequest::new(id, method, data);
        let text = serde_json::to_string(&frame).map_err(Error::signaling)?;
        if self.out_tx.send(Outbound::Frame(text)).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(Error::signaling("signaling channel closed"));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::timeout(format!("signaling {method}")))
            }
            Ok(Err(_)) => Err(Error::signaling("signaling channel closed")),
            Ok(Ok(result)) => result,
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|err| Error::signaling(format!("malformed {method} reply: {err}")))
    }

    pub async fn get_capabilities(&self) -> Result<RtpCapabilities> {
        let value = self.request(method::GET_CAPABILITIES, Value::Null).await?;
        Self::parse(method::GET_CAPABILITIES, value)
    }

    pub async fn create_producer_transport(
        &self,
        rtp_capabilities: &RtpCapabilities,
    ) -> Result<TransportParams> {
        let body = CreateTransportRequest {
            force_tcp: false,
            rtp_capabilities: Some(rtp_capabilities.clone()),
        };
        let value = self
            .request(
                method::CREATE_PRODUCER_TRANSPORT,
                serde_json::to_value(body).map_err(Error::signaling)?,
            )
            .await?;
        Self::parse(method::CREATE_PRODUCER_TRANSPORT, value)
    }

    pub async fn connect_producer_transport(&self, dtls: &DtlsParameters) -> Result<()> {
        let body = ConnectTransportRequest {
            transport_id: None,
            dtls_parameters: dtls.clone(),
        };
        self.request(
            method::CONNECT_PRODUCER_TRANSPORT,
            serde_json::to_value(body).map_err(Error::signaling)?,
        )
        .await?;
        Ok(())
    }

    pub async fn produce(
        &self,
        transport_id: &str,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<String> {
        let body = ProduceRequest {
            transport_id: transport_id.to_string(),
            kind,
            rtp_parameters,
        };
        let value = self
            .request(
                method::PRODUCE,
                serde_json::to_value(body).map_err(Error::signaling)?,
            )
            .await?;
        let reply: ProduceReply = Self::parse(method::PRODUCE, value)?;
        Ok(reply.id)
    }

    pub async fn create_consumer_transport(&self, force_tcp: bool) -> Result<TransportParams> {
        let body = CreateTransportRequest {
            force_tcp,
            rtp_capabilities: None,
        };
        let value = self
            .request(
                method::CREATE_CONSUMER_TRANSPORT,
                serde_json::to_value(body).map_err(Error::signaling)?,
            )
            .await?;
        Self::parse(method::CREATE_CONSUMER_TRANSPORT, value)
    }

    pub async fn connect_consumer_transport(
        &self,
        transport_id: &str,
        dtls: &DtlsParameters,
    ) -> Result<()> {
        let body = ConnectTransportRequest {
            transport_id: Some(transport_id.to_string()),
            dtls_parameters: dtls.clone(),
        };
        self.request(
            method::CONNECT_CONSUMER_TRANSPORT,
            serde_json::to_value(body).map_err(Error::signaling)?,
        )
        .await?;
        Ok(())
    }

    pub async fn consume(&self, rtp_capabilities: &RtpCapabilities) -> Result<ConsumeReply> {
        let body = ConsumeRequest {
            rtp_capabilities: rtp_capabilities.clone(),
        };
        let value = self
            .request(
                method::CONSUME,
                serde_json::to_value(body).map_err(Error::signaling)?,
            )
            .await?;
        Self::parse(method::CONSUME, value)
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(method::RESUME, Value::Null).await?;
        Ok(())
    }

    /// Tear the channel down. In-flight requests fail with a channel-closed
    /// error; responses arriving afterwards are dropped by the reader.
    pub async fn close(&mut self) {
        let _ = self.out_tx.send(Outbound::Close).await;
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        self.pending.lock().await.clear();
    }
}
