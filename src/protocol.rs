//! Newline-delimited JSON-RPC envelope: request decoding and response encoding.

use rmcp::model::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::CallToolParams;

pub const JSONRPC_VERSION: &str = "2.0";

/// Request ids are echoed back verbatim, so any JSON value is kept as-is.
pub type RequestId = Value;

/// A decoded inbound line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// `None` marks a notification
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Kept untyped; a non-string method is routed as unknown, not rejected
    #[serde(default)]
    pub method: Value,
    #[serde(default)]
    pub params: Option<Value>,
}

/// The methods this server acts on, each with its decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Initialize,
    ToolsList,
    ToolsCall(CallToolParams),
    Initialized,
    Unknown(String),
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The method as a string; missing or non-string methods render as their JSON text.
    pub fn method_name(&self) -> String {
        match &self.method {
            Value::String(method) => method.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Resolve the method and its params into a [`RequestKind`].
    pub fn kind(&self) -> Result<RequestKind, RpcError> {
        let kind = match self.method.as_str() {
            Some("initialize") => RequestKind::Initialize,
            Some("tools/list") => RequestKind::ToolsList,
            Some("notifications/initialized") => RequestKind::Initialized,
            Some("tools/call") => RequestKind::ToolsCall(CallToolParams::from_params(self.params.clone())?),
            _ => RequestKind::Unknown(self.method_name()),
        };
        Ok(kind)
    }
}

/// Decode one transport line. Only invalid JSON and non-objects are parse errors;
/// field types are left for the dispatcher to judge.
pub fn parse_line(line: &str) -> Result<Request, RpcError> {
    let value: Value = serde_json::from_str(line).map_err(|e| RpcError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(RpcError::Parse("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| RpcError::Parse(e.to_string()))
}

/// Error classes reported back to the caller
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Parse(_) => ErrorCode::PARSE_ERROR.0,
            RpcError::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND.0,
            RpcError::ExecutionFailed(_) | RpcError::Internal(_) => ErrorCode::INTERNAL_ERROR.0,
        }
    }

    /// The fixed message placed on the wire
    pub fn message(&self) -> &'static str {
        match self {
            RpcError::Parse(_) => "Parse error",
            RpcError::MethodNotFound(_) => "Method not found",
            RpcError::ExecutionFailed(_) => "Command execution failed",
            RpcError::Internal(_) => "Internal error",
        }
    }

    /// Auxiliary context; only execution and internal failures carry any.
    pub fn data(&self) -> Value {
        match self {
            RpcError::ExecutionFailed(text) | RpcError::Internal(text) => {
                Value::String(text.clone())
            }
            RpcError::Parse(_) | RpcError::MethodNotFound(_) => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    pub data: Value,
}

impl From<RpcError> for ErrorObject {
    fn from(err: RpcError) -> Self {
        ErrorObject {
            code: err.code(),
            message: err.message().to_string(),
            data: err.data(),
        }
    }
}

/// Outbound envelope; exactly one of `result`/`error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, err: RpcError) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(err.into()),
        }
    }

    /// Serialize to a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request() {
        let req = parse_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).unwrap();
        assert_eq!(req.id, Some(json!(1)));
        assert_eq!(req.method, "initialize");
        assert_eq!(req.params, None);
        assert_eq!(req.kind().unwrap(), RequestKind::Initialize);
    }

    #[test]
    fn test_parse_keeps_id_verbatim() {
        let req = parse_line(r#"{"id":"abc-1","method":"tools/list"}"#).unwrap();
        assert_eq!(req.id, Some(json!("abc-1")));

        let req = parse_line(r#"{"id":{"nested":[1,2]},"method":"tools/list"}"#).unwrap();
        assert_eq!(req.id, Some(json!({"nested": [1, 2]})));
    }

    #[test]
    fn test_missing_or_null_id_is_notification() {
        let req = parse_line(r#"{"method":"notifications/initialized"}"#).unwrap();
        assert!(req.is_notification());
        assert_eq!(req.kind().unwrap(), RequestKind::Initialized);

        let req = parse_line(r#"{"id":null,"method":"notifications/initialized"}"#).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for line in ["{not json", "[1,\"initialize\"]", "42", "\"text\"", "{\"id\":1,"] {
            let err = parse_line(line).unwrap_err();
            assert_eq!(err.code(), -32700, "line: {}", line);
        }
    }

    #[test]
    fn test_missing_method_is_unknown() {
        let req = parse_line(r#"{"id":3}"#).unwrap();
        assert_eq!(req.kind().unwrap(), RequestKind::Unknown(String::new()));
    }

    #[test]
    fn test_non_string_method_is_unknown_not_parse_error() {
        let req = parse_line(r#"{"id":1,"method":5}"#).unwrap();
        assert_eq!(req.id, Some(json!(1)));
        assert_eq!(req.kind().unwrap(), RequestKind::Unknown("5".to_string()));

        let req = parse_line(r#"{"id":1,"method":null}"#).unwrap();
        assert_eq!(req.kind().unwrap(), RequestKind::Unknown(String::new()));
    }

    #[test]
    fn test_tools_call_with_missing_name_still_decodes() {
        let req = parse_line(r#"{"id":9,"method":"tools/call","params":{}}"#).unwrap();
        match req.kind().unwrap() {
            RequestKind::ToolsCall(params) => assert_eq!(params.name, Value::Null),
            other => panic!("Expected tools/call, got {:?}", other),
        }
    }

    #[test]
    fn test_tools_call_kind() {
        let req = parse_line(
            r#"{"id":2,"method":"tools/call","params":{"name":"execute_command","arguments":{"command":"ls"}}}"#,
        )
        .unwrap();
        match req.kind().unwrap() {
            RequestKind::ToolsCall(params) => {
                assert_eq!(params.name, "execute_command");
                assert_eq!(params.arguments, json!({"command": "ls"}));
            }
            other => panic!("Expected tools/call, got {:?}", other),
        }
    }

    #[test]
    fn test_tools_call_without_params_is_internal_error() {
        let req = parse_line(r#"{"id":2,"method":"tools/call"}"#).unwrap();
        let err = req.kind().unwrap_err();
        assert_eq!(err.code(), -32603);
        assert!(err.data().is_string());
    }

    #[test]
    fn test_success_envelope() {
        let line = Response::success(json!(1), json!({"ok": true})).to_line().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#);
    }

    #[test]
    fn test_error_envelope() {
        let line = Response::error(Value::Null, RpcError::Parse("eof".to_string()))
            .to_line()
            .unwrap();
        assert_eq!(
            line,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error","data":null}}"#
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RpcError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::ExecutionFailed("x".into()).code(), -32603);
        assert_eq!(RpcError::Internal("x".into()).code(), -32603);
        assert_eq!(
            RpcError::ExecutionFailed("No such file".into()).data(),
            json!("No such file")
        );
    }
}
