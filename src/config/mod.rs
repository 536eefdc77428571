use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration for the transcode endpoint
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port to listen on (default: 8080)
    pub port: u16,

    /// Maximum request body size in bytes (default: 500 MB)
    pub max_upload_size: usize,

    /// Explicit ffmpeg binary. When unset the search path is consulted.
    pub ffmpeg_binary: Option<String>,

    /// Wall-clock bound for the transform invocation (default: 600s)
    pub transform_timeout: Duration,

    /// Wall-clock bound for the probe invocation (default: 60s)
    pub probe_timeout: Duration,

    /// Directory for scoped temp files (default: system temp dir)
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_upload_size: 500 * 1024 * 1024, // 500 MB
            ffmpeg_binary: None,
            transform_timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(60),
            temp_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            ffmpeg_binary: non_blank(env::var("FFMPEG_BINARY").ok()),

            transform_timeout: env::var("TRANSFORM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.transform_timeout),

            probe_timeout: env::var("PROBE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.probe_timeout),

            temp_dir: non_blank(env::var("TEMP_DIR").ok()).map(PathBuf::from),
        }
    }
}

/// Treat a set-but-blank variable the same as an unset one.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
