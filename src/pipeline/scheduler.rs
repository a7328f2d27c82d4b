//! Fans annotation files across the worker pools and sums the results.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::PipelineConfig;
use crate::error::CropError;
use crate::media::VideoOpener;
use crate::pipeline::annotations;
use crate::pipeline::engine::{CropExtractionEngine, FileReport};
use crate::pipeline::history::OverlapHistory;
use crate::pipeline::locator::VideoLocator;

/// Totals for one run, plus the per-file reports they were summed from.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    pub saved: u64,
    pub frames_with_detections: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub errors: u64,
    pub skipped_files: u64,
}

impl RunSummary {
    fn from_reports(files: Vec<FileReport>) -> Self {
        let mut summary = Self {
            files,
            ..Self::default()
        };
        for report in &summary.files {
            summary.saved += report.saved;
            summary.frames_with_detections += report.frames_with_detections;
            summary.duplicates += report.duplicates;
            summary.rejected += report.rejected;
            summary.errors += report.errors;
            summary.skipped_files += report.skipped as u64;
        }
        summary
    }
}

/// Runs the whole pipeline: one outer pool over annotation files, one
/// small shared inner pool over detections within a decoded frame.
pub struct PipelineScheduler {
    config: PipelineConfig,
}

impl PipelineScheduler {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Scans the annotation root, indexes the video root and processes
    /// every annotation file found.
    pub fn run(&self, opener: &dyn VideoOpener) -> Result<RunSummary, CropError> {
        let files = annotations::scan_root(&self.config.annotation_root)?;
        let locator = VideoLocator::build(&self.config.video_root)?;
        self.run_with_files(&locator, opener, &files)
    }

    pub fn run_with_files(
        &self,
        locator: &VideoLocator,
        opener: &dyn VideoOpener,
        files: &[PathBuf],
    ) -> Result<RunSummary, CropError> {
        let history = OverlapHistory::from_config(&self.config);

        let outer_threads = self
            .config
            .file_workers
            .unwrap_or_else(|| num_cpus::get() / 2)
            .max(1);
        let outer_pool = ThreadPoolBuilder::new()
            .num_threads(outer_threads)
            .build()
            .map_err(|e| CropError::Pool(e.to_string()))?;
        let inner_pool = ThreadPoolBuilder::new()
            .num_threads(self.config.detection_workers.max(1))
            .build()
            .map_err(|e| CropError::Pool(e.to_string()))?;

        info!(
            "processing {} annotation files on {} workers",
            files.len(),
            outer_threads
        );

        let engine =
            CropExtractionEngine::new(&self.config, locator, &history, opener, &inner_pool);

        let reports: Vec<FileReport> = outer_pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    match catch_unwind(AssertUnwindSafe(|| engine.process_file(path))) {
                        Ok(report) => report,
                        Err(_) => {
                            warn!("task for {} panicked", path.display());
                            FileReport::failed(path)
                        }
                    }
                })
                .collect()
        });

        let summary = RunSummary::from_reports(reports);
        info!(
            "run complete: {} files | saved {} | duplicates {} | rejected {} | errors {} | skipped {}",
            summary.files.len(),
            summary.saved,
            summary.duplicates,
            summary.rejected,
            summary.errors,
            summary.skipped_files
        );
        Ok(summary)
    }
}
