use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ShellConfig;
use crate::request::ExecutionContext;

/// Captured outcome of a process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub command: String,
    pub args: Vec<String>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// The process could not be started or supervised
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),
}

/// Run `ctx` through the shell and collect both output streams until exit.
/// There is no timeout: this resolves only once the child terminates.
pub async fn run_command(ctx: ExecutionContext, shell: &ShellConfig) -> Result<ExecutionResult, ExecError> {
    let line = ctx.shell_line();
    debug!(command = %line, cwd = %ctx.working_dir.display(), "spawning");

    let mut cmd = Command::new(&shell.program);
    cmd.args(&shell.args)
        .arg(&line)
        .current_dir(&ctx.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;

    let stdout_handle = spawn_reader(child.stdout.take());
    let stderr_handle = spawn_reader(child.stderr.take());

    let status = child.wait().await.map_err(ExecError::Wait)?;

    let stdout = join_output(stdout_handle, "stdout").await;
    let stderr = join_output(stderr_handle, "stderr").await;

    debug!(command = %line, exit_code = ?status.code(), "command exited");

    Ok(ExecutionResult {
        command: ctx.command,
        args: ctx.args,
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match stream {
            Some(reader) => read_stream(reader).await,
            None => Ok(Vec::new()),
        }
    })
}

/// Append every chunk in arrival order; the buffer is unbounded.
async fn read_stream<R>(mut reader: R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(buffer)
}

async fn join_output(handle: JoinHandle<std::io::Result<Vec<u8>>>, label: &str) -> Vec<u8> {
    match handle.await {
        Ok(Ok(buf)) => buf,
        Ok(Err(err)) => {
            warn!("Failed to read {}: {}", label, err);
            Vec::new()
        }
        Err(err) => {
            warn!("{} reader task failed: {}", label, err);
            Vec::new()
        }
    }
}
