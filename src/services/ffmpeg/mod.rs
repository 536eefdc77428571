pub mod duration;
pub mod policy;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

pub use duration::parse_duration;
pub use policy::TransformPolicy;

/// Name used when the binary cannot be found on the search path.
pub const FFMPEG_COMMAND: &str = "ffmpeg";

/// Errors raised while driving the external binary
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to collect process output: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured result of one invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External media tool used by the transcode pipeline.
///
/// Implementations receive the argument list without the program name.
#[async_trait::async_trait]
pub trait MediaTool: Send + Sync {
    /// Run the tool with `args`, killing it if it outlives `timeout`.
    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<ToolOutput, ToolError>;

    /// The program this tool invokes, for logging and health reporting.
    fn program(&self) -> String;
}

/// Resolve the ffmpeg binary.
///
/// Order: explicit override, then the executable search path, then the bare
/// command name. Never fails.
pub fn resolve_binary(explicit: Option<&str>) -> PathBuf {
    if let Some(explicit) = explicit {
        return PathBuf::from(explicit);
    }

    match which::which(FFMPEG_COMMAND) {
        Ok(path) => path,
        Err(e) => {
            debug!(
                "{} not found on PATH ({}), falling back to bare command name",
                FFMPEG_COMMAND, e
            );
            PathBuf::from(FFMPEG_COMMAND)
        }
    }
}

/// Runs the real ffmpeg binary as a child process
pub struct FfmpegTool {
    binary: PathBuf,
}

impl FfmpegTool {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn from_config(config: &crate::config::ServiceConfig) -> Self {
        let binary = resolve_binary(config.ffmpeg_binary.as_deref());
        info!("🎬 Using ffmpeg binary: {}", binary.display());
        Self::new(binary)
    }
}

#[async_trait::async_trait]
impl MediaTool for FfmpegTool {
    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<ToolOutput, ToolError> {
        debug!("Running {} {:?}", self.binary.display(), args);

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must take the child down with it
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout(timeout))??;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}
