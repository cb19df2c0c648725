use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::protocol::RpcError;

/// Params of a `tools/call` request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallToolParams {
    /// Untyped so that a missing or non-string name is a tool mismatch, not a decode error
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub arguments: Value,
}

impl CallToolParams {
    /// Absent params cannot be inspected at all; any other non-object carries no name.
    pub fn from_params(params: Option<Value>) -> Result<Self, RpcError> {
        match params {
            None | Some(Value::Null) => Err(RpcError::Internal(
                "tools/call requires params".to_string(),
            )),
            Some(params @ Value::Object(_)) => {
                serde_json::from_value(params).map_err(|e| RpcError::Internal(e.to_string()))
            }
            Some(_) => Ok(Self {
                name: Value::Null,
                arguments: Value::Null,
            }),
        }
    }

    pub fn is_tool(&self, tool_name: &str) -> bool {
        self.name.as_str() == Some(tool_name)
    }

    pub fn name_for_display(&self) -> String {
        match &self.name {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

/// Arguments accepted by the `execute_command` tool
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ExecuteCommandArgs {
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Everything the executor needs for one invocation, with defaults resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ExecuteCommandArgs {
    pub fn from_arguments(arguments: Value) -> Result<Self, RpcError> {
        serde_json::from_value(arguments).map_err(|e| RpcError::Internal(e.to_string()))
    }

    /// Extract execution context, falling back to the configured base directory
    pub fn execution_context(self, config: &ServerConfig) -> ExecutionContext {
        let working_dir = self
            .cwd
            .map(PathBuf::from)
            .unwrap_or_else(|| config.default_cwd.clone());
        ExecutionContext {
            command: self.command,
            args: self.args,
            working_dir,
        }
    }
}

impl ExecutionContext {
    /// The line handed to the shell: command and args joined by single spaces
    pub fn shell_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_params_absent_is_internal_error() {
        assert!(matches!(CallToolParams::from_params(None), Err(RpcError::Internal(_))));
        assert!(matches!(
            CallToolParams::from_params(Some(Value::Null)),
            Err(RpcError::Internal(_))
        ));
    }

    #[test]
    fn test_call_params_without_string_name_is_not_the_tool() {
        for params in [json!({}), json!({"name": 5}), json!("execute_command"), json!([1])] {
            let params = CallToolParams::from_params(Some(params)).unwrap();
            assert!(!params.is_tool("execute_command"));
        }

        let params = CallToolParams::from_params(Some(json!({"name": "execute_command"}))).unwrap();
        assert!(params.is_tool("execute_command"));
        assert_eq!(params.arguments, Value::Null);
    }

    #[test]
    fn test_deserialize_with_all_fields() {
        let args = ExecuteCommandArgs::from_arguments(json!({
            "command": "ls",
            "args": ["-l", "-a"],
            "cwd": "/tmp"
        }))
        .unwrap();
        assert_eq!(args.command, "ls");
        assert_eq!(args.args, vec!["-l", "-a"]);
        assert_eq!(args.cwd, Some("/tmp".to_string()));
    }

    #[test]
    fn test_deserialize_minimal() {
        let args = ExecuteCommandArgs::from_arguments(json!({"command": "pwd"})).unwrap();
        assert!(args.args.is_empty());
        assert_eq!(args.cwd, None);
    }

    #[test]
    fn test_missing_command_is_internal_error() {
        let err = ExecuteCommandArgs::from_arguments(json!({"args": ["x"]})).unwrap_err();
        assert_eq!(err.code(), -32603);
        assert!(err.data().as_str().unwrap().contains("command"));
    }

    #[test]
    fn test_absent_arguments_is_internal_error() {
        let err = ExecuteCommandArgs::from_arguments(Value::Null).unwrap_err();
        assert!(matches!(err, RpcError::Internal(_)));
    }

    #[test]
    fn test_execution_context_default_cwd() {
        let config = ServerConfig::default().with_default_cwd("/srv/base");
        let ctx = ExecuteCommandArgs::from_arguments(json!({"command": "pwd"}))
            .unwrap()
            .execution_context(&config);
        assert_eq!(ctx.working_dir, PathBuf::from("/srv/base"));
    }

    #[test]
    fn test_execution_context_explicit_cwd() {
        let config = ServerConfig::default().with_default_cwd("/srv/base");
        let ctx = ExecuteCommandArgs::from_arguments(json!({"command": "pwd", "cwd": "/tmp"}))
            .unwrap()
            .execution_context(&config);
        assert_eq!(ctx.working_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_shell_line() {
        let ctx = ExecutionContext {
            command: "echo".to_string(),
            args: vec!["a".to_string(), "b | tr a-z A-Z".to_string()],
            working_dir: PathBuf::from("."),
        };
        assert_eq!(ctx.shell_line(), "echo a b | tr a-z A-Z");

        let bare = ExecutionContext {
            args: vec![],
            ..ctx
        };
        assert_eq!(bare.shell_line(), "echo");
    }
}
