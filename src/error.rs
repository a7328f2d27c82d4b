use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("annotation parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no video found for clip '{0}'")]
    VideoNotFound(String),
    #[error("failed to open video {path}: {reason}")]
    VideoOpen { path: PathBuf, reason: String },
    #[error("failed to decode frame {frame} of {path}")]
    Decode { path: PathBuf, frame: u64 },
    #[error("bad frame descriptor '{0}'")]
    FrameKey(String),
    #[error("image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),
    #[error("worker pool error: {0}")]
    Pool(String),
}
