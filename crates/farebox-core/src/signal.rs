//! Signaling envelope and typed request/reply payloads.
//!
//! Every exchange with the media server is a JSON request/response pair
//! over the signaling WebSocket: requests carry `{id, method, data}` and
//! the server answers with `{id, data}` or `{id, error}`. Frames without
//! an id are server-initiated notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::negotiate::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters};

/// Signaling method names, as the media server spells them.
pub mod method {
    pub const GET_CAPABILITIES: &str = "getCapabilities";
    pub const CREATE_PRODUCER_TRANSPORT: &str = "createProducerTransport";
    pub const CONNECT_PRODUCER_TRANSPORT: &str = "connectProducerTransport";
    pub const PRODUCE: &str = "produce";
    pub const CREATE_CONSUMER_TRANSPORT: &str = "createConsumerTransport";
    pub const CONNECT_CONSUMER_TRANSPORT: &str = "connectConsumerTransport";
    pub const CONSUME: &str = "consume";
    pub const RESUME: &str = "resume";
}

/// One client-to-server request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl SignalRequest {
    pub fn new(id: u64, method: impl Into<String>, data: Value) -> Self {
        Self {
            id,
            method: method.into(),
            data,
        }
    }
}

/// One server-to-client frame: a response when `id` is present,
/// otherwise a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerFrame {
    pub fn response(id: u64, data: Value) -> Self {
        Self {
            id: Some(id),
            method: None,
            data,
            error: None,
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            method: None,
            data: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// Request body for `createProducerTransport` / `createConsumerTransport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransportRequest {
    pub force_tcp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtp_capabilities: Option<RtpCapabilities>,
}

/// Request body for `connectProducerTransport` / `connectConsumerTransport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectTransportRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_id: Option<String>,
    pub dtls_parameters: DtlsParameters,
}

/// Request body for `produce`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub transport_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

/// Reply body for `produce`: the server-assigned producer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduceReply {
    pub id: String,
}

/// Request body for `consume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub rtp_capabilities: RtpCapabilities,
}

/// Reply body for `consume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeReply {
    pub producer_id: String,
    pub id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}
