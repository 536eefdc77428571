use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use ffmpeg_api::config::ServiceConfig;
use ffmpeg_api::services::ffmpeg::{MediaTool, ToolError, ToolOutput, TransformPolicy};
use ffmpeg_api::services::transcode_service::TranscodeService;
use ffmpeg_api::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";
const INFO_STDERR: &str = "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':\n  Duration: 00:01:05.40, start: 0.000000, bitrate: 1205 kb/s\n";

#[derive(Clone, Copy)]
enum Mode {
    /// Output = "processed:" + input bytes
    Echo,
    NoDuration,
    /// `-i <input>` never answers within its timeout
    DurationLookupHangs,
    Timeout,
    ExitNonZero,
    EmptyOutput,
}

struct FakeFfmpeg {
    mode: Mode,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeFfmpeg {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaTool for FakeFfmpeg {
    async fn run(&self, args: Vec<OsString>, timeout: Duration) -> Result<ToolOutput, ToolError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push(args.clone());

        // Duration lookup: `-i <input>`
        if args.len() == 2 {
            if let Mode::DurationLookupHangs = self.mode {
                return Err(ToolError::Timeout(timeout));
            }
            let stderr = match self.mode {
                Mode::NoDuration => "in.mp4: Invalid data found when processing input".to_string(),
                _ => INFO_STDERR.to_string(),
            };
            return Ok(ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr,
            });
        }

        match self.mode {
            Mode::Timeout => Err(ToolError::Timeout(timeout)),
            Mode::ExitNonZero => Ok(ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Unknown encoder 'libx264'".to_string(),
            }),
            Mode::EmptyOutput => Ok(ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            }),
            Mode::Echo | Mode::NoDuration | Mode::DurationLookupHangs => {
                let i = args.iter().position(|a| a == "-i").unwrap();
                let data = tokio::fs::read(&args[i + 1]).await?;
                let mut out = b"processed:".to_vec();
                out.extend_from_slice(&data);
                tokio::fs::write(args.last().unwrap(), out).await?;
                Ok(ToolOutput {
                    exit_code: Some(0),
                    ..Default::default()
                })
            }
        }
    }

    fn program(&self) -> String {
        "fake-ffmpeg".to_string()
    }
}

fn setup(mode: Mode) -> (Router, Arc<FakeFfmpeg>, TempDir) {
    setup_with(mode, |_| {})
}

fn setup_with(mode: Mode, tweak: impl FnOnce(&mut ServiceConfig)) -> (Router, Arc<FakeFfmpeg>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig {
        temp_dir: Some(dir.path().to_path_buf()),
        ..ServiceConfig::default()
    };
    tweak(&mut config);

    let tool = Arc::new(FakeFfmpeg {
        mode,
        calls: Mutex::new(Vec::new()),
    });
    let transcoder = Arc::new(TranscodeService::new(
        tool.clone(),
        TransformPolicy::default(),
        &config,
    ));

    let app = create_app(AppState { transcoder, config });
    (app, tool, dir)
}

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: video/mp4\r\n\r\n",
        boundary = BOUNDARY,
        field = field,
        filename = filename,
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-video")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn residual_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_home_banner() {
    let (app, _, _dir) = setup(Mode::Echo);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"FFmpeg API is running!");
}

#[tokio::test]
async fn test_health_reports_tool() {
    let (app, _, _dir) = setup(Mode::Echo);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ffmpeg"], "fake-ffmpeg");
}

#[tokio::test]
async fn test_successful_transform_streams_output() {
    let (app, tool, dir) = setup(Mode::Echo);

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mov", b"raw video bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"processed_clip.mp4\""));
    assert!(response.headers().contains_key("x-request-id"));

    // Output is still held by the in-flight body; the input is already gone
    assert_eq!(residual_files(dir.path()), 1);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"processed:raw video bytes");
    assert_eq!(residual_files(dir.path()), 0);

    let calls = tool.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0][0], "-i");

    let transform = &calls[1];
    let t = transform.iter().position(|a| a == "-t").unwrap();
    let bound: f64 = transform[t + 1].parse().unwrap();
    assert!((bound - 64.9).abs() < 1e-9);
    assert_eq!(transform[0], "-y");
    assert!(transform.iter().any(|a| a == "libx264"));
}

#[tokio::test]
async fn test_missing_file_field() {
    let (app, tool, dir) = setup(Mode::Echo);

    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        hello\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY
    );

    let response = app
        .oneshot(upload_request(body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "No file uploaded!"}));
    assert!(tool.calls().is_empty());
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_text_field_named_file_is_not_an_upload() {
    let (app, tool, dir) = setup(Mode::Echo);

    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"\r\n\r\n\
        abc\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY
    );

    let response = app
        .oneshot(upload_request(body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "No file uploaded!"}));
    assert!(tool.calls().is_empty());
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_non_multipart_request() {
    let (app, tool, _dir) = setup(Mode::Echo);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process-video")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"file": "clip.mp4"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "No file uploaded!"}));
    assert!(tool.calls().is_empty());
}

#[tokio::test]
async fn test_unparsable_duration() {
    let (app, tool, dir) = setup(Mode::NoDuration);

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mp4", b"garbage")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Failed to get video duration!"})
    );
    // Duration lookup only, no transform
    assert_eq!(tool.calls().len(), 1);
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_duration_lookup_timeout() {
    let (app, tool, dir) = setup_with(Mode::DurationLookupHangs, |config| {
        config.probe_timeout = Duration::from_millis(50)
    });

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mp4", b"video")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Failed to get video duration!"})
    );
    // The transform never runs
    assert_eq!(tool.calls().len(), 1);
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transform_timeout() {
    let (app, _, dir) = setup(Mode::Timeout);

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mp4", b"long video")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Processing timeout!"}));
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transform_nonzero_exit() {
    let (app, _, dir) = setup(Mode::ExitNonZero);

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mp4", b"video")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "FFmpeg failed or output file is empty!"})
    );
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_transform_empty_output() {
    let (app, _, dir) = setup(Mode::EmptyOutput);

    let response = app
        .oneshot(upload_request(multipart_body("file", "clip.mp4", b"video")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "FFmpeg failed or output file is empty!"})
    );
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let (app, tool, dir) = setup_with(Mode::Echo, |config| config.max_upload_size = 1024);

    let body = multipart_body("file", "big.mp4", &vec![7u8; 4096]);
    let len = body.len();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process-video")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .header("Content-Length", len)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(tool.calls().is_empty());
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_repeated_uploads_use_distinct_temp_files() {
    let (app, tool, dir) = setup(Mode::Echo);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("file", "same.mp4", b"same bytes")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"processed:same bytes");
    }

    let calls = tool.calls();
    assert_eq!(calls.len(), 4);
    let first_input = &calls[0][1];
    let second_input = &calls[2][1];
    assert_ne!(first_input, second_input);
    assert_ne!(calls[1].last(), calls[3].last());
    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_concurrent_uploads() {
    let (app, _, dir) = setup(Mode::Echo);

    let tasks = (0..8).map(|n| {
        let app = app.clone();
        tokio::spawn(async move {
            let content = format!("video #{}", n);
            let response = app
                .oneshot(upload_request(multipart_body(
                    "file",
                    &format!("clip{}.mp4", n),
                    content.as_bytes(),
                )))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, format!("processed:{}", content).into_bytes());
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(residual_files(dir.path()), 0);
}

#[tokio::test]
async fn test_request_id_generated_when_absent() {
    let (app, _, _dir) = setup(Mode::Echo);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let request_id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(!request_id.is_empty());
    assert_ne!(request_id, "unknown");
}

#[tokio::test]
async fn test_request_id_echoed_from_client() {
    let (app, _, _dir) = setup(Mode::Echo);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}
