//! Maps clip names to video paths, built from one walk of the video root.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::CropError;

/// Recognized video container extensions (compared case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Lowercase-stem -> path lookup for every video under the root. Built
/// once before the concurrent phase; read-only afterwards.
pub struct VideoLocator {
    by_stem: HashMap<String, PathBuf>,
}

impl VideoLocator {
    pub fn build(root: &Path) -> Result<Self, CropError> {
        let mut by_stem = HashMap::new();
        walk(root, &mut by_stem)?;
        info!("indexed {} videos under {}", by_stem.len(), root.display());
        Ok(Self { by_stem })
    }

    /// Case-insensitive exact lookup; a miss means "skip", never an error.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.by_stem
            .get(&name.to_ascii_lowercase())
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

fn walk(dir: &Path, map: &mut HashMap<String, PathBuf>) -> Result<(), CropError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, map)?;
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        // First match wins; later stem collisions are ignored.
        map.entry(stem.to_ascii_lowercase()).or_insert(path);
    }
    Ok(())
}
