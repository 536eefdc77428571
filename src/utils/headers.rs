use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::Path;

/// Build the download name for a processed upload: `processed_<stem>.mp4`.
///
/// Falls back to `fallback` (normally the output temp file name) when the
/// client sent no usable filename.
pub fn processed_filename(original: Option<&str>, fallback: &str) -> String {
    let stem = original
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name))
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty());

    match stem {
        Some(stem) => format!("processed_{}.mp4", stem),
        None => fallback.to_string(),
    }
}

/// Resolve `Content-Type` and an attachment `Content-Disposition` for a file.
///
/// `sniffed` is the MIME type detected from the file's magic bytes, if any.
pub fn attachment_headers(filename: &str, sniffed: Option<&str>) -> (String, String) {
    let content_type = match sniffed {
        Some(mime) => mime.to_string(),
        None => {
            let extension = filename.split('.').next_back().unwrap_or("").to_lowercase();
            match extension.as_str() {
                "mp4" | "m4v" => "video/mp4".to_string(),
                "mov" => "video/quicktime".to_string(),
                "webm" => "video/webm".to_string(),
                "mkv" => "video/x-matroska".to_string(),
                _ => mime::APPLICATION_OCTET_STREAM.to_string(),
            }
        }
    };

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "video.mp4"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    );

    (content_type, content_disposition)
}
