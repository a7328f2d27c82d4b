//! Per-annotation-file crop extraction.
//!
//! One engine call handles one annotation file end to end: resolve class
//! and clip, open the video, decode each sampled frame once, then fan the
//! frame's detections across the inner pool for validate / dedup / save.
//! Every failure below the file level is counted and skipped, never
//! propagated.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageOutputFormat, RgbImage};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::config::PipelineConfig;
use crate::error::CropError;
use crate::media::VideoOpener;
use crate::pipeline::annotations::{self, AnnotationFile, Detection};
use crate::pipeline::bbox::{BoxValidator, RelBox};
use crate::pipeline::history::OverlapHistory;
use crate::pipeline::locator::VideoLocator;
use crate::pipeline::sampler::FrameSampler;

/// Outcome counts for one annotation file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub annotation: PathBuf,
    pub class: String,
    pub saved: u64,
    pub frames_with_detections: u64,
    /// Near-duplicates discarded by the overlap history.
    pub duplicates: u64,
    /// Validation-gate rejections (policy, not errors).
    pub rejected: u64,
    /// Decode, parse and save failures.
    pub errors: u64,
    /// File never processed (unreadable, clip missing, clip unopenable).
    pub skipped: bool,
}

impl FileReport {
    fn new(annotation: &Path, class: String) -> Self {
        Self {
            annotation: annotation.to_path_buf(),
            class,
            saved: 0,
            frames_with_detections: 0,
            duplicates: 0,
            rejected: 0,
            errors: 0,
            skipped: false,
        }
    }

    pub(crate) fn failed(annotation: &Path) -> Self {
        let mut report = Self::new(annotation, annotations::class_of(annotation));
        report.errors = 1;
        report.skipped = true;
        report
    }
}

enum DetOutcome {
    Saved,
    Duplicate,
    Rejected,
    Error,
    BelowConfidence,
}

pub struct CropExtractionEngine<'a> {
    config: &'a PipelineConfig,
    locator: &'a VideoLocator,
    history: &'a OverlapHistory,
    opener: &'a dyn VideoOpener,
    detection_pool: &'a ThreadPool,
    validator: BoxValidator,
    sampler: FrameSampler,
}

impl<'a> CropExtractionEngine<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        locator: &'a VideoLocator,
        history: &'a OverlapHistory,
        opener: &'a dyn VideoOpener,
        detection_pool: &'a ThreadPool,
    ) -> Self {
        Self {
            config,
            locator,
            history,
            opener,
            detection_pool,
            validator: BoxValidator::from_config(config),
            sampler: FrameSampler::new(config.confidence_threshold, config.sample_interval_secs),
        }
    }

    pub fn process_file(&self, annotation_path: &Path) -> FileReport {
        let class = annotations::class_of(annotation_path);
        let clip = annotations::clip_name(annotation_path);
        let mut report = FileReport::new(annotation_path, class);

        let ann = match AnnotationFile::load(annotation_path) {
            Ok(ann) => ann,
            Err(e) => {
                warn!("skipping {}: {e}", annotation_path.display());
                report.errors += 1;
                report.skipped = true;
                return report;
            }
        };

        let Some(video_path) = self.locator.resolve(&clip) else {
            warn!("{}", CropError::VideoNotFound(clip));
            report.skipped = true;
            return report;
        };

        // The source lives for this scope only; Drop closes the clip on
        // every exit path.
        let mut source = match self.opener.open(video_path) {
            Ok(source) => source,
            Err(e) => {
                warn!("skipping {}: {e}", annotation_path.display());
                report.errors += 1;
                report.skipped = true;
                return report;
            }
        };
        let meta = source.meta();

        let out_dir = self.config.output_root.join(&report.class);
        if let Err(e) = fs::create_dir_all(&out_dir) {
            warn!("cannot create {}: {e}", out_dir.display());
            report.errors += 1;
            report.skipped = true;
            return report;
        }

        let plan = self.sampler.sample(&ann, meta.frame_count, meta.fps);
        report.errors += plan.dropped_keys as u64;

        for candidate in &plan.candidates {
            let frame = match source.read_frame(candidate.index) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("{e}");
                    report.errors += 1;
                    continue;
                }
            };
            let dets = ann
                .detections
                .get(&candidate.key)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if dets.is_empty() {
                continue;
            }
            report.frames_with_detections += 1;

            let outcomes: Vec<DetOutcome> = self.detection_pool.install(|| {
                dets.par_iter()
                    .enumerate()
                    .map(|(det_idx, det)| {
                        self.process_detection(
                            &frame,
                            det_idx,
                            det,
                            &report.class,
                            &clip,
                            candidate.index,
                            &out_dir,
                        )
                    })
                    .collect()
            });

            for outcome in outcomes {
                match outcome {
                    DetOutcome::Saved => report.saved += 1,
                    DetOutcome::Duplicate => report.duplicates += 1,
                    DetOutcome::Rejected => report.rejected += 1,
                    DetOutcome::Error => report.errors += 1,
                    DetOutcome::BelowConfidence => {}
                }
            }
        }

        info!(
            "{}: saved {} | duplicates {} | rejected {} | errors {}",
            annotation_path.display(),
            report.saved,
            report.duplicates,
            report.rejected,
            report.errors
        );
        report
    }

    fn process_detection(
        &self,
        frame: &RgbImage,
        det_idx: usize,
        det: &Detection,
        class: &str,
        clip: &str,
        frame_index: u64,
        out_dir: &Path,
    ) -> DetOutcome {
        if det.conf < self.config.confidence_threshold {
            return DetOutcome::BelowConfidence;
        }

        let rel = RelBox::from_bbox(det.bbox);
        let (rect, center) = match self
            .validator
            .validate(class, rel, frame.width(), frame.height())
        {
            Ok(accepted) => accepted,
            Err(_) => return DetOutcome::Rejected,
        };

        // The history slot is reserved before the save so two overlapping
        // boxes can never both pass; a failed save keeps its reservation.
        if !self.history.check_and_record(class, center) {
            return DetOutcome::Duplicate;
        }

        let crop = image::imageops::crop_imm(frame, rect.x, rect.y, rect.w, rect.h).to_image();
        let name = format!(
            "{clip}_f{frame_index:08}_d{det_idx:03}_c{conf:.2}.jpg",
            conf = det.conf
        );
        let path = out_dir.join(name);
        match save_jpeg(&crop, &path, self.config.jpeg_quality) {
            Ok(()) => DetOutcome::Saved,
            Err(e) => {
                warn!("failed to save {}: {e}", path.display());
                DetOutcome::Error
            }
        }
    }
}

fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> Result<(), CropError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
    fs::write(path, buffer.into_inner())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_filename_format() {
        let name = format!(
            "{clip}_f{frame:08}_d{det:03}_c{conf:.2}.jpg",
            clip = "clip01",
            frame = 10u64,
            det = 0usize,
            conf = 0.9f64
        );
        assert_eq!(name, "clip01_f00000010_d000_c0.90.jpg");
    }

    #[test]
    fn test_save_jpeg_roundtrip_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 30]));
        let path = dir.path().join("crop.jpg");
        save_jpeg(&img, &path, 90).unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }
}
