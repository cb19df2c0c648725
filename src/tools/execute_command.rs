use rmcp::schemars;
use serde_json::Value;
use tracing::{error, info};

use super::{ToolDescriptor, ToolOutput};
use crate::config::ServerConfig;
use crate::executor::{run_command, ExecutionResult};
use crate::protocol::RpcError;
use crate::request::ExecuteCommandArgs;

pub const TOOL_NAME: &str = "execute_command";
const TOOL_DESCRIPTION: &str = "Execute a command in the system shell";

/// The single exposed tool. Its descriptor is generated once and reused for every listing.
#[derive(Debug, Clone)]
pub struct ExecuteCommandTool {
    descriptor: ToolDescriptor,
}

impl ExecuteCommandTool {
    pub fn new() -> Result<Self, serde_json::Error> {
        let mut input_schema = serde_json::to_value(schemars::schema_for!(ExecuteCommandArgs))?;
        if let Value::Object(map) = &mut input_schema {
            map.remove("$schema");
        }
        Ok(Self {
            descriptor: ToolDescriptor {
                name: TOOL_NAME,
                description: TOOL_DESCRIPTION,
                input_schema,
            },
        })
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Decode the call arguments, run the command and render its outcome.
    /// A nonzero exit status is a successful call; only launch failures are errors.
    pub async fn call(&self, arguments: Value, config: &ServerConfig) -> Result<ToolOutput, RpcError> {
        let ctx = ExecuteCommandArgs::from_arguments(arguments)?.execution_context(config);
        let line = ctx.shell_line();

        match run_command(ctx, &config.shell).await {
            Ok(result) => {
                info!(command = %line, exit_code = ?result.exit_code, "command finished");
                Ok(ToolOutput::text(render(&result)))
            }
            Err(e) => {
                error!(command = %line, "{}", e);
                Err(RpcError::ExecutionFailed(e.to_string()))
            }
        }
    }
}

/// Human-readable block returned as the call's text content
pub fn render(result: &ExecutionResult) -> String {
    let exit_code = result
        .exit_code
        .map_or_else(|| "null".to_string(), |code| code.to_string());
    format!(
        "Command: {} {}\nExit Code: {}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
        result.command,
        result.args.join(" "),
        exit_code,
        result.stdout,
        result.stderr
    )
}
