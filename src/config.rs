use rmcp::model::ProtocolVersion;
use std::path::{Path, PathBuf};

/// Shell program and the flags that make it run a single command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ShellConfig {
    #[cfg(unix)]
    fn default() -> Self {
        Self {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }

    #[cfg(windows)]
    fn default() -> Self {
        Self {
            program: "cmd.exe".to_string(),
            args: vec!["/d".to_string(), "/s".to_string(), "/c".to_string()],
        }
    }
}

/// Process-scoped server configuration, built once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: ProtocolVersion,
    /// Working directory used when a call does not supply `cwd`
    pub default_cwd: PathBuf,
    pub shell: ShellConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: ProtocolVersion::V_2024_11_05,
            default_cwd: PathBuf::from("."),
            shell: ShellConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve the configuration for the running process.
    /// Commands default to the directory the executable is installed in.
    pub fn for_current_process() -> Self {
        Self {
            default_cwd: install_dir(),
            ..Default::default()
        }
    }

    pub fn with_default_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_cwd = dir.into();
        self
    }
}

fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
