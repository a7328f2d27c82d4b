//! OpenCV-backed video decoding.

use std::path::{Path, PathBuf};

use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::{VideoMeta, VideoOpener, VideoSource};
use crate::error::CropError;

pub struct OpencvOpener;

impl VideoOpener for OpencvOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>, CropError> {
        let open_err = |reason: String| CropError::VideoOpen {
            path: path.to_path_buf(),
            reason,
        };

        let cap = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
            .map_err(|e| open_err(e.to_string()))?;
        if !cap.is_opened().map_err(|e| open_err(e.to_string()))? {
            return Err(open_err("capture not opened".to_string()));
        }

        let meta = VideoMeta {
            width: cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32,
            height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32,
            frame_count: cap.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0).max(0.0) as u64,
            fps: cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0),
        };

        Ok(Box::new(OpencvSource {
            cap,
            meta,
            path: path.to_path_buf(),
        }))
    }
}

struct OpencvSource {
    cap: VideoCapture,
    meta: VideoMeta,
    path: PathBuf,
}

impl VideoSource for OpencvSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage, CropError> {
        let decode_err = || CropError::Decode {
            path: self.path.clone(),
            frame: index,
        };

        self.cap
            .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
            .map_err(|_| decode_err())?;

        let mut bgr = Mat::default();
        let got = self.cap.read(&mut bgr).map_err(|_| decode_err())?;
        if !got || bgr.empty() {
            return Err(decode_err());
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|_| decode_err())?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes().map_err(|_| decode_err())?.to_vec();
        RgbImage::from_raw(width, height, data).ok_or_else(decode_err)
    }
}
