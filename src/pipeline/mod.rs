//! The extraction-and-deduplication pipeline.
//!
//! Flow: [`VideoLocator`] indexes the video root once, then for each
//! annotation file the [`FrameSampler`] picks frame indices, the
//! [`CropExtractionEngine`] decodes each selected frame and runs every
//! detection through [`BoxValidator`] and [`OverlapHistory`] before
//! saving, and the [`PipelineScheduler`] fans files across the worker
//! pools.

pub mod annotations;
pub mod bbox;
pub mod engine;
pub mod history;
pub mod locator;
pub mod sampler;
pub mod scheduler;

pub use annotations::{AnnotationFile, Detection};
pub use bbox::{iou, BoxValidator, CenterBox, PixelRect, RelBox, Rejection};
pub use engine::{CropExtractionEngine, FileReport};
pub use history::OverlapHistory;
pub use locator::{VideoLocator, VIDEO_EXTENSIONS};
pub use sampler::{FrameCandidate, FrameSampler, SamplePlan};
pub use scheduler::{PipelineScheduler, RunSummary};
