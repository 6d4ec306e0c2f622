use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version carried by every request and response envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Numeric error codes used in error envelopes. The `-327xx` range follows the
/// JSON-RPC 2.0 convention; `-3200x` codes are domain-specific.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
    pub const UNSUPPORTED_OPERATION: i32 = -32004;
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<JsonRpcId>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<JsonRpcId>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC ID can be string, number, or null
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
    Null,
}

impl JsonRpcRequest {
    pub fn new(id: JsonRpcId, method: impl Into<String>, params: Value) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(id),
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_omits_error() {
        let response = JsonRpcResponse::success(
            Some(JsonRpcId::String("r1".to_string())),
            json!({"id": "t1"}),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "r1");
        assert_eq!(value["result"]["id"], "t1");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_envelope_omits_result() {
        let response = JsonRpcResponse::error(
            Some(JsonRpcId::Number(7)),
            JsonRpcError {
                code: error_codes::TASK_NOT_FOUND,
                message: "Task not found: t9".to_string(),
                data: Some(json!({"id": "t9"})),
            },
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], -32001);
        assert_eq!(value["error"]["data"]["id"], "t9");
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_id_roundtrip() {
        let numeric: JsonRpcId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, JsonRpcId::Number(42));

        let text: JsonRpcId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(text, JsonRpcId::String("abc".to_string()));

        let null: JsonRpcId = serde_json::from_str("null").unwrap();
        assert_eq!(null, JsonRpcId::Null);
    }
}
