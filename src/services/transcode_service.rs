use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::services::ffmpeg::policy::probe_args;
use crate::services::ffmpeg::{MediaTool, ToolError, TransformPolicy, parse_duration};
use crate::utils::temp_file::ScopedTempFile;

const INPUT_PREFIX: &str = "upload-";
const OUTPUT_PREFIX: &str = "processed-";
const TEMP_SUFFIX: &str = ".mp4";

/// Outcomes of the transcode pipeline that end a request early
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to get video duration")]
    DurationUnavailable,

    #[error("Transform timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transform failed (exit code {exit_code:?})")]
    TransformFailed { exit_code: Option<i32> },

    #[error("Temp file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful transform. The input file is already gone; the
/// output is released when this value (or whatever took the guard) drops.
#[derive(Debug)]
pub struct ProcessedVideo {
    pub output: ScopedTempFile,
    pub duration_secs: f64,
}

/// Drives one upload through probe and transform
pub struct TranscodeService {
    tool: Arc<dyn MediaTool>,
    policy: TransformPolicy,
    temp_dir: Option<PathBuf>,
    probe_timeout: Duration,
    transform_timeout: Duration,
}

impl TranscodeService {
    pub fn new(tool: Arc<dyn MediaTool>, policy: TransformPolicy, config: &ServiceConfig) -> Self {
        Self {
            tool,
            policy,
            temp_dir: config.temp_dir.clone(),
            probe_timeout: config.probe_timeout,
            transform_timeout: config.transform_timeout,
        }
    }

    pub fn program(&self) -> String {
        self.tool.program()
    }

    /// Write the upload stream into a fresh scoped input file.
    pub async fn stage_upload<'a>(
        &self,
        mut reader: impl AsyncRead + Unpin + Send + 'a,
    ) -> Result<ScopedTempFile, TranscodeError> {
        let (input, mut file) =
            ScopedTempFile::create(self.temp_dir.as_deref(), INPUT_PREFIX, TEMP_SUFFIX)?;

        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        info!(
            "📥 Staged upload: {} ({} bytes)",
            input.path().display(),
            written
        );
        Ok(input)
    }

    /// Probe the staged input for its duration, then run the transform.
    ///
    /// Both temp files are released on every error path; on success only the
    /// output survives, owned by the returned value.
    pub async fn process(&self, input: ScopedTempFile) -> Result<ProcessedVideo, TranscodeError> {
        let output = ScopedTempFile::empty(self.temp_dir.as_deref(), OUTPUT_PREFIX, TEMP_SUFFIX)?;

        info!("🎞️  Processing video: {}", input.path().display());

        let duration_secs = match self.probe_duration(&input).await {
            Some(secs) => secs,
            None => {
                error!("Failed to get video duration for {}", input.path().display());
                return Err(TranscodeError::DurationUnavailable);
            }
        };

        let args = self
            .policy
            .args(input.path(), output.path(), duration_secs);

        let result = match self.tool.run(args, self.transform_timeout).await {
            Ok(result) => result,
            Err(ToolError::Timeout(limit)) => {
                error!("⏱️  FFmpeg timeout after {:?}, video took too long to process", limit);
                return Err(TranscodeError::Timeout(limit));
            }
            Err(e) => {
                error!("FFmpeg could not be run: {}", e);
                return Err(TranscodeError::TransformFailed { exit_code: None });
            }
        };

        info!("FFmpeg Exit Code: {:?}", result.exit_code);
        info!("FFmpeg Output: {}", result.stdout);
        info!("FFmpeg Error: {}", result.stderr);

        let output_size = output.size_on_disk().await.unwrap_or(0);
        if !result.success() || output_size == 0 {
            error!(
                "FFmpeg failed or output video is empty (exit code {:?}, {} bytes)",
                result.exit_code, output_size
            );
            return Err(TranscodeError::TransformFailed {
                exit_code: result.exit_code,
            });
        }

        input.remove();

        info!(
            "✅ Transform finished: {} ({} bytes)",
            output.path().display(),
            output_size
        );
        Ok(ProcessedVideo {
            output,
            duration_secs,
        })
    }

    async fn probe_duration(&self, input: &ScopedTempFile) -> Option<f64> {
        let probe = match self.tool.run(probe_args(input.path()), self.probe_timeout).await {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Probe invocation failed: {}", e);
                return None;
            }
        };

        let parsed = parse_duration(&probe.stderr)?;
        let duration_secs = parsed.bounded_secs();
        info!(
            "Source duration: {}:{}:{} (using {:.2} seconds)",
            parsed.hours, parsed.minutes, parsed.seconds, duration_secs
        );
        Some(duration_secs)
    }
}
