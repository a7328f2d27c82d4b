use std::collections::HashMap;
use std::path::PathBuf;

/// Tunables for one pipeline run.
///
/// Per-class tables (`iou_thresholds`, `min_box_ratios`) override the
/// corresponding default for the named class only.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root scanned recursively for annotation `.json` files.
    pub annotation_root: PathBuf,
    /// Root scanned recursively for video files.
    pub video_root: PathBuf,
    /// Crops land under `<output_root>/<class>/`.
    pub output_root: PathBuf,
    /// Detections below this confidence are ignored everywhere.
    pub confidence_threshold: f64,
    /// Nominal temporal spacing between decoded frames, in seconds.
    pub sample_interval_secs: f64,
    /// Boxes remembered per class before FIFO eviction.
    pub history_capacity: usize,
    /// A crop whose IoU with any remembered box of its class exceeds this
    /// is dropped as a near-duplicate.
    pub default_iou_threshold: f64,
    pub iou_thresholds: HashMap<String, f64>,
    /// Minimum relative width/height for a crop-eligible box.
    pub default_min_box_ratio: f64,
    pub min_box_ratios: HashMap<String, f64>,
    /// Boxes at or beyond this long/short side ratio are rejected.
    pub max_aspect_ratio: f64,
    /// Outer pool size over annotation files; `None` = half the cores.
    pub file_workers: Option<usize>,
    /// Inner pool size over detections within one decoded frame.
    pub detection_workers: usize,
    pub jpeg_quality: u8,
}

impl PipelineConfig {
    pub fn new(
        annotation_root: impl Into<PathBuf>,
        video_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            annotation_root: annotation_root.into(),
            video_root: video_root.into(),
            output_root: output_root.into(),
            confidence_threshold: 0.5,
            sample_interval_secs: 0.5,
            history_capacity: 150,
            default_iou_threshold: 0.7,
            iou_thresholds: HashMap::new(),
            default_min_box_ratio: 0.04,
            min_box_ratios: HashMap::new(),
            max_aspect_ratio: 5.0,
            file_workers: None,
            detection_workers: 4,
            jpeg_quality: 90,
        }
    }

    pub fn iou_threshold(&self, class: &str) -> f64 {
        self.iou_thresholds
            .get(class)
            .copied()
            .unwrap_or(self.default_iou_threshold)
    }

    pub fn min_box_ratio(&self, class: &str) -> f64 {
        self.min_box_ratios
            .get(class)
            .copied()
            .unwrap_or(self.default_min_box_ratio)
    }
}
