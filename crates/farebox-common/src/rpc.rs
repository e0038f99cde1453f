//! JSON-RPC 2.0 envelope types.
//!
//! Both the ledger node and the gatekeeper speak JSON-RPC 2.0 over HTTP
//! POST; the request/response framing is shared here so clients and the
//! in-process fakes used by integration tests agree on one encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Error object carried in a failed JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

/// A single JSON-RPC 2.0 response, either `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Collapse the response into the `result` payload or the error object.
    pub fn into_result(self) -> std::result::Result<Value, RpcError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_round_trip() {
        let req = RpcRequest::new(7, "newConnection", json!({"destination": "1.2.3.4:40000"}));
        let text = serde_json::to_string(&req).unwrap();
        let back: RpcRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.jsonrpc, JSONRPC_VERSION);
        assert_eq!(back.id, 7);
        assert_eq!(back.method, "newConnection");
    }

    #[test]
    fn test_response_into_result() {
        let ok = RpcResponse::ok(1, json!({"amount": 10000}));
        assert_eq!(ok.into_result().unwrap()["amount"], 10000);

        let err = RpcResponse::err(2, -32000, "contract unfunded");
        let rpc_err = err.into_result().unwrap_err();
        assert_eq!(rpc_err.code, -32000);
        assert!(rpc_err.to_string().contains("contract unfunded"));
    }
}
