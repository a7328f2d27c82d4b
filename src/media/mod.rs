//! Seam to the video decoding backend.
//!
//! The pipeline only needs open-by-path, seek+decode-to-RGB and stream
//! metadata; everything else about the media layer stays behind these
//! traits. Dropping a [`VideoSource`] releases the underlying handle, so
//! a clip is closed on every exit path of the task that opened it.

#[cfg(feature = "opencv-backend")]
mod opencv;

#[cfg(feature = "opencv-backend")]
pub use opencv::OpencvOpener;

use std::path::Path;

use image::RgbImage;

use crate::error::CropError;

/// Stream properties read once at open time.
#[derive(Debug, Clone, Copy)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    /// 0 means the container did not report a frame count.
    pub frame_count: u64,
    pub fps: f64,
}

/// One opened clip, exclusively owned by the task processing its
/// annotation file.
pub trait VideoSource {
    fn meta(&self) -> VideoMeta;

    /// Seek to `index` and decode that frame as RGB.
    fn read_frame(&mut self, index: u64) -> Result<RgbImage, CropError>;
}

/// Opens clips by path. Shared read-only across worker threads.
pub trait VideoOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, CropError>;
}
