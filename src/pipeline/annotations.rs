//! Annotation JSON data model and frame-descriptor parsing.
//!
//! One annotation file describes one clip: a `file` map from frame key to
//! the frame-image basename (which carries the frame index as its numeric
//! suffix) and a `detections` map from frame key to the boxes found there.
//! Detections for a key that never appears in `file` cannot be resolved to
//! a frame index and are skipped, not fatal.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CropError;

/// One detected box: confidence plus a relative `(x, y, w, h)` bounding
/// box in normalized [0,1] coordinates, `(x, y)` = top-left.
#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
    pub conf: f64,
    pub bbox: [f64; 4],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationFile {
    /// frame key -> frame descriptor.
    #[serde(default)]
    pub file: HashMap<String, String>,
    /// frame key -> detections at that frame.
    #[serde(default)]
    pub detections: HashMap<String, Vec<Detection>>,
}

impl AnnotationFile {
    pub fn load(path: &Path) -> Result<Self, CropError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Frame index encoded as the numeric suffix of the descriptor's basename,
/// after the last underscore: `"clip_000123.png"` -> 123.
pub fn parse_frame_index(descriptor: &str) -> Result<u64, CropError> {
    let bad = || CropError::FrameKey(descriptor.to_string());
    let stem = Path::new(descriptor)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(bad)?;
    let digits = stem.rsplit('_').next().unwrap_or(stem);
    digits.parse().map_err(|_| bad())
}

/// Class name comes from the annotation file's parent directory, with a
/// trailing `_json` suffix stripped: `fox_json/clip01.json` -> `fox`.
pub fn class_of(annotation_path: &Path) -> String {
    let dir = annotation_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    dir.strip_suffix("_json").unwrap_or(dir).to_string()
}

/// Clip name the annotation file refers to: its own basename sans extension.
pub fn clip_name(annotation_path: &Path) -> String {
    annotation_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Recursively collects every `.json` file under `root`, sorted for a
/// stable task order.
pub fn scan_root(root: &Path) -> Result<Vec<PathBuf>, CropError> {
    let mut found = Vec::new();
    collect_json(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CropError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_index() {
        assert_eq!(parse_frame_index("clip01_000123.png").unwrap(), 123);
        assert_eq!(parse_frame_index("a_b_000007.jpg").unwrap(), 7);
        assert_eq!(parse_frame_index("42.png").unwrap(), 42);
        assert!(parse_frame_index("clip01_abc.png").is_err());
        assert!(parse_frame_index("").is_err());
    }

    #[test]
    fn test_class_of_strips_json_suffix() {
        assert_eq!(class_of(Path::new("/data/fox_json/clip01.json")), "fox");
        assert_eq!(class_of(Path::new("/data/boar/clip01.json")), "boar");
    }

    #[test]
    fn test_clip_name() {
        assert_eq!(clip_name(Path::new("/data/fox_json/Clip01.json")), "Clip01");
    }

    #[test]
    fn test_annotation_file_parses() {
        let raw = r#"{
            "file": { "f_000010": "clip01_000010.png" },
            "detections": {
                "f_000010": [ { "conf": 0.9, "bbox": [0.1, 0.2, 0.3, 0.4] } ]
            }
        }"#;
        let ann: AnnotationFile = serde_json::from_str(raw).unwrap();
        assert_eq!(ann.file.len(), 1);
        let dets = &ann.detections["f_000010"];
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].conf, 0.9);
        assert_eq!(dets[0].bbox, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_missing_maps_default_to_empty() {
        let ann: AnnotationFile = serde_json::from_str("{}").unwrap();
        assert!(ann.file.is_empty());
        assert!(ann.detections.is_empty());
    }
}
