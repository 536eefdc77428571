pub mod ffmpeg;
pub mod transcode_service;
