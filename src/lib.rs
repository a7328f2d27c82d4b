//! trapcrop — turns per-video object-detection annotations into a
//! deduplicated set of per-class JPEG crops.
//!
//! Core flow:
//! 1. Index videos - one walk of the video root, clip name -> path
//! 2. Sample frames - confidence filter + stride over the candidate list
//! 3. Validate boxes - relative -> pixel conversion with rejection gates
//! 4. Deduplicate - bounded per-class IoU history, shared across workers

pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::CropError;
pub use media::{VideoMeta, VideoOpener, VideoSource};
pub use pipeline::{PipelineScheduler, RunSummary};

/// Wires the `log` facade to env_logger (reads RUST_LOG). Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
