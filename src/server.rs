use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::protocol::{self, RequestId, RequestKind, Response, RpcError};
use crate::request::CallToolParams;
use crate::tools::ExecuteCommandTool;

/// What a handler produced: a result payload, nothing (notification-style
/// methods), or an error to report.
type Outcome = Result<Option<Value>, RpcError>;

/// Process-scoped server context: configuration plus the one static tool.
pub struct CommandExecutorServer {
    config: ServerConfig,
    tool: ExecuteCommandTool,
}

impl CommandExecutorServer {
    pub fn new(config: ServerConfig) -> Result<Self, serde_json::Error> {
        Ok(Self {
            config,
            tool: ExecuteCommandTool::new()?,
        })
    }

    /// Read requests from `reader` until end of input, writing one line per
    /// response to `writer`.
    ///
    /// `tools/call` requests run on their own tasks, so their responses may
    /// come out in a different order than the requests went in. Everything
    /// else is answered in arrival order. Returns once input is exhausted and
    /// every in-flight call has been answered.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        info!(
            name = %self.config.server_name,
            version = %self.config.server_version,
            "Serving requests"
        );

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            match std::str::from_utf8(&buf) {
                Ok(line) => {
                    // Blank lines are not skipped: they fail to parse like any other bad line
                    let line = line.trim_end_matches(['\r', '\n']);
                    debug!("Received: {}", line);
                    self.handle_line(line, &tx).await;
                }
                Err(e) => {
                    warn!("Discarding non UTF-8 line: {}", e);
                    send(&tx, Response::error(Value::Null, RpcError::Parse(e.to_string())));
                }
            }
        }

        info!("EOF received, waiting for in-flight commands");
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }

    async fn handle_line(self: &Arc<Self>, line: &str, tx: &UnboundedSender<Response>) {
        let request = match protocol::parse_line(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("{}", e);
                send(tx, Response::error(Value::Null, e));
                return;
            }
        };

        if request.is_notification() {
            debug!("Notification: {}", request.method_name());
        }

        let id = request.id.clone();
        match request.kind() {
            Ok(kind @ RequestKind::ToolsCall(_)) => {
                let server = Arc::clone(self);
                let task = tokio::spawn(async move { server.dispatch(kind).await });
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = task
                        .await
                        .unwrap_or_else(|e| Err(RpcError::Internal(e.to_string())));
                    respond(&tx, id, outcome);
                });
            }
            Ok(kind) => respond(tx, id, self.dispatch(kind).await),
            Err(e) => respond(tx, id, Err(e)),
        }
    }

    /// Route one decoded request to its handler.
    pub async fn dispatch(&self, kind: RequestKind) -> Outcome {
        match kind {
            RequestKind::Initialize => Ok(Some(self.initialize_result())),
            RequestKind::ToolsList => Ok(Some(self.tools_list_result())),
            RequestKind::ToolsCall(params) => self.call_tool(params).await,
            RequestKind::Initialized => {
                debug!("Client initialized");
                Ok(None)
            }
            RequestKind::Unknown(method) => {
                warn!("Unknown method: {}", method);
                Err(RpcError::MethodNotFound(method))
            }
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": self.config.protocol_version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.config.server_name,
                "version": self.config.server_version,
            }
        })
    }

    fn tools_list_result(&self) -> Value {
        json!({ "tools": [self.tool.descriptor()] })
    }

    async fn call_tool(&self, params: CallToolParams) -> Outcome {
        if !params.is_tool(self.tool.name()) {
            let name = params.name_for_display();
            warn!("Unknown tool: {}", name);
            return Err(RpcError::MethodNotFound(name));
        }

        let output = self.tool.call(params.arguments, &self.config).await?;
        serde_json::to_value(output)
            .map(Some)
            .map_err(|e| RpcError::Internal(e.to_string()))
    }
}

/// Notifications never get a response; everything else gets exactly one.
fn respond(tx: &UnboundedSender<Response>, id: Option<RequestId>, outcome: Outcome) {
    let Some(id) = id else {
        if let Err(e) = outcome {
            debug!("Dropping error for notification: {}", e);
        }
        return;
    };

    match outcome {
        Ok(Some(result)) => send(tx, Response::success(id, result)),
        Ok(None) => {}
        Err(e) => send(tx, Response::error(id, e)),
    }
}

fn send(tx: &UnboundedSender<Response>, response: Response) {
    if tx.send(response).is_err() {
        error!("Response writer has shut down");
    }
}

async fn write_responses<W>(mut writer: W, mut rx: UnboundedReceiver<Response>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = match response.to_line() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode response: {}", e);
                continue;
            }
        };

        debug!("Sending: {}", line);
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    writer.shutdown().await
}
