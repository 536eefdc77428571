use crate::api::error::AppError;
use crate::services::transcode_service::ProcessedVideo;
use crate::utils::headers::{attachment_headers, processed_filename};
use crate::utils::temp_file::ScopedTempFile;
use axum::{
    body::Body,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::Response,
};
use futures::{StreamExt, TryStreamExt};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{info, warn};

#[utoipa::path(
    post,
    path = "/process-video",
    request_body(content = Multipart, description = "Video upload in the `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Processed video as an attachment"),
        (status = 400, description = "No file uploaded"),
        (status = 413, description = "Upload exceeds the body limit"),
        (status = 500, description = "Probe, timeout or encode failure")
    ),
    tag = "video"
)]
pub async fn process_video(
    State(state): State<crate::AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected upload without a multipart body: {}", rejection);
            return Err(AppError::NoFileUploaded);
        }
    };

    let mut staged: Option<(ScopedTempFile, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(&e))?
    {
        // Only the first `file` part carrying a filename is processed;
        // plain form values and everything else are drained
        if staged.is_some() || field.name() != Some("file") {
            continue;
        }
        let Some(original_filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let body_with_io_error = field.map_err(std::io::Error::other);
        let reader = StreamReader::new(body_with_io_error);

        let input = state.transcoder.stage_upload(reader).await?;
        staged = Some((input, original_filename));
    }

    let (input, original_filename) = staged.ok_or(AppError::NoFileUploaded)?;
    let processed = state.transcoder.process(input).await?;

    stream_attachment(processed, Some(&original_filename)).await
}

/// Stream the output back. The temp file guard travels with the body stream
/// and is released once the body has been fully sent or dropped.
async fn stream_attachment(
    processed: ProcessedVideo,
    original_filename: Option<&str>,
) -> Result<Response, AppError> {
    let output = processed.output;

    let fallback = output
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video.mp4".to_string());
    let filename = processed_filename(original_filename, &fallback);

    let sniffed = infer::get_from_path(output.path())
        .ok()
        .flatten()
        .map(|kind| kind.mime_type());
    let (content_type, content_disposition) = attachment_headers(&filename, sniffed);

    let size = output.size_on_disk().await.unwrap_or(0);
    let file = tokio::fs::File::open(output.path())
        .await
        .map_err(|e| AppError::Internal(format!("Failed to open processed video: {}", e)))?;

    info!(
        "📤 Sending {} ({} bytes, {:.2}s)",
        filename, size, processed.duration_secs
    );

    let stream = ReaderStream::new(file).map(move |chunk| {
        let _guard = &output;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
