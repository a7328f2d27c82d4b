//! End-to-end pipeline runs over a temp directory tree, with a mock
//! video backend standing in for the media collaborator.

use std::fs::{self, File};
use std::path::Path;

use image::{Rgb, RgbImage};
use serde_json::json;

use trapcrop::error::CropError;
use trapcrop::media::{VideoMeta, VideoOpener, VideoSource};
use trapcrop::{PipelineConfig, PipelineScheduler};

struct MockOpener {
    meta: VideoMeta,
    fail_frames: Vec<u64>,
}

impl MockOpener {
    fn new(meta: VideoMeta) -> Self {
        Self {
            meta,
            fail_frames: Vec::new(),
        }
    }
}

impl VideoOpener for MockOpener {
    fn open(&self, _path: &Path) -> Result<Box<dyn VideoSource>, CropError> {
        Ok(Box::new(MockSource {
            meta: self.meta,
            fail_frames: self.fail_frames.clone(),
        }))
    }
}

struct MockSource {
    meta: VideoMeta,
    fail_frames: Vec<u64>,
}

impl VideoSource for MockSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read_frame(&mut self, index: u64) -> Result<RgbImage, CropError> {
        if self.fail_frames.contains(&index) {
            return Err(CropError::Decode {
                path: "mock".into(),
                frame: index,
            });
        }
        let shade = (index % 256) as u8;
        Ok(RgbImage::from_fn(self.meta.width, self.meta.height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, shade])
        }))
    }
}

fn meta_640() -> VideoMeta {
    VideoMeta {
        width: 640,
        height: 480,
        frame_count: 100,
        // Stride = max(1, round(fps * 0.5)) = 1: every candidate decoded.
        fps: 2.0,
    }
}

fn write_annotation(path: &Path, frames: &[(&str, &str, f64, [f64; 4])]) {
    let mut file_map = serde_json::Map::new();
    let mut det_map = serde_json::Map::new();
    for &(key, descriptor, conf, bbox) in frames {
        file_map.insert(key.to_string(), json!(descriptor));
        det_map.insert(key.to_string(), json!([{ "conf": conf, "bbox": bbox }]));
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        serde_json::to_string_pretty(&json!({ "file": file_map, "detections": det_map })).unwrap(),
    )
    .unwrap();
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(path).unwrap();
}

fn test_config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(
        root.join("annotations"),
        root.join("videos"),
        root.join("output"),
    );
    config.file_workers = Some(2);
    config.detection_workers = 2;
    config
}

#[test]
fn recurring_box_saves_once_and_dedups_second() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_annotation(
        &root.join("annotations/deer_json/clip01.json"),
        &[
            ("f_000010", "clip01_000010.png", 0.9, [0.1, 0.1, 0.2, 0.2]),
            ("f_000011", "clip01_000025.png", 0.9, [0.1, 0.1, 0.2, 0.2]),
        ],
    );
    touch(&root.join("videos/clip01.mp4"));

    let mut config = test_config(root);
    config.iou_thresholds.insert("deer".to_string(), 0.6);

    let summary = PipelineScheduler::new(config)
        .run(&MockOpener::new(meta_640()))
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.frames_with_detections, 2);
    assert_eq!(summary.skipped_files, 0);

    // Frames process in ascending index order, so frame 10 wins.
    let saved = root.join("output/deer/clip01_f00000010_d000_c0.90.jpg");
    assert!(saved.exists(), "missing {}", saved.display());
    assert!(!root
        .join("output/deer/clip01_f00000025_d000_c0.90.jpg")
        .exists());
}

#[test]
fn missing_clip_skips_file_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_annotation(
        &root.join("annotations/deer_json/ghost.json"),
        &[("f_000001", "ghost_000001.png", 0.9, [0.1, 0.1, 0.2, 0.2])],
    );
    write_annotation(
        &root.join("annotations/boar_json/clip02.json"),
        &[("f_000001", "clip02_000001.png", 0.9, [0.4, 0.4, 0.3, 0.3])],
    );
    touch(&root.join("videos/clip02.mp4"));

    let summary = PipelineScheduler::new(test_config(root))
        .run(&MockOpener::new(meta_640()))
        .unwrap();

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(summary.saved, 1);

    let ghost = summary
        .files
        .iter()
        .find(|r| r.annotation.ends_with("ghost.json"))
        .unwrap();
    assert!(ghost.skipped);
    assert_eq!(ghost.saved, 0);
}

#[test]
fn low_confidence_frames_never_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_annotation(
        &root.join("annotations/deer_json/clip01.json"),
        &[("f_000001", "clip01_000001.png", 0.3, [0.1, 0.1, 0.2, 0.2])],
    );
    touch(&root.join("videos/clip01.mp4"));

    let summary = PipelineScheduler::new(test_config(root))
        .run(&MockOpener::new(meta_640()))
        .unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.frames_with_detections, 0);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_files, 0);
}

#[test]
fn decode_failure_skips_frame_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_annotation(
        &root.join("annotations/deer_json/clip01.json"),
        &[
            ("f_000001", "clip01_000001.png", 0.9, [0.1, 0.1, 0.2, 0.2]),
            ("f_000002", "clip01_000040.png", 0.9, [0.6, 0.6, 0.3, 0.3]),
        ],
    );
    touch(&root.join("videos/clip01.mp4"));

    let mut opener = MockOpener::new(meta_640());
    opener.fail_frames.push(1);

    let summary = PipelineScheduler::new(test_config(root))
        .run(&opener)
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.saved, 1);
    assert!(root
        .join("output/deer/clip01_f00000040_d000_c0.90.jpg")
        .exists());
}

#[test]
fn malformed_annotation_file_is_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let bad = root.join("annotations/deer_json/broken.json");
    fs::create_dir_all(bad.parent().unwrap()).unwrap();
    fs::write(&bad, "{ not json").unwrap();

    write_annotation(
        &root.join("annotations/deer_json/clip01.json"),
        &[("f_000001", "clip01_000001.png", 0.9, [0.1, 0.1, 0.2, 0.2])],
    );
    touch(&root.join("videos/clip01.mp4"));

    let summary = PipelineScheduler::new(test_config(root))
        .run(&MockOpener::new(meta_640()))
        .unwrap();

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.skipped_files, 1);
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.errors, 1);
}

#[test]
fn same_class_across_files_shares_history() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    // Two clips of the same class carrying the same relative box; only
    // one crop survives, whichever file got there first.
    write_annotation(
        &root.join("annotations/deer_json/clip01.json"),
        &[("f_000001", "clip01_000001.png", 0.9, [0.1, 0.1, 0.2, 0.2])],
    );
    write_annotation(
        &root.join("annotations/deer_json/clip02.json"),
        &[("f_000001", "clip02_000001.png", 0.9, [0.1, 0.1, 0.2, 0.2])],
    );
    touch(&root.join("videos/clip01.mp4"));
    touch(&root.join("videos/clip02.mp4"));

    let summary = PipelineScheduler::new(test_config(root))
        .run(&MockOpener::new(meta_640()))
        .unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.duplicates, 1);
}
