//! Selects which annotated frames are worth decoding.

use log::debug;

use crate::pipeline::annotations::{parse_frame_index, AnnotationFile};

/// One frame picked for decoding: its index in the clip plus the key its
/// detections live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCandidate {
    pub index: u64,
    pub key: String,
}

/// The sampler's output: sorted, stride-subsampled candidates plus the
/// number of frame keys dropped for unparsable descriptors.
#[derive(Debug, Default)]
pub struct SamplePlan {
    pub candidates: Vec<FrameCandidate>,
    pub dropped_keys: usize,
}

pub struct FrameSampler {
    confidence_threshold: f64,
    interval_secs: f64,
}

impl FrameSampler {
    pub fn new(confidence_threshold: f64, interval_secs: f64) -> Self {
        Self {
            confidence_threshold,
            interval_secs,
        }
    }

    /// Keeps frames with at least one detection at/above the confidence
    /// threshold, sorted ascending by frame index, then strides the
    /// candidate list by `max(1, round(fps * interval))`.
    ///
    /// The stride runs over the filtered list, not wall-clock time: with
    /// sparse detections the effective spacing exceeds the nominal
    /// interval. A `frame_count` of 0 means the container did not report
    /// one and disables the range gate.
    pub fn sample(&self, ann: &AnnotationFile, frame_count: u64, fps: f64) -> SamplePlan {
        let mut plan = SamplePlan::default();
        let mut candidates = Vec::new();

        for (key, descriptor) in &ann.file {
            let index = match parse_frame_index(descriptor) {
                Ok(index) => index,
                Err(e) => {
                    debug!("dropping frame key {key}: {e}");
                    plan.dropped_keys += 1;
                    continue;
                }
            };
            if frame_count > 0 && index >= frame_count {
                plan.dropped_keys += 1;
                continue;
            }
            let Some(dets) = ann.detections.get(key) else {
                continue;
            };
            if dets.iter().any(|d| d.conf >= self.confidence_threshold) {
                candidates.push(FrameCandidate {
                    index,
                    key: key.clone(),
                });
            }
        }

        candidates.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.key.cmp(&b.key)));

        let stride = ((fps * self.interval_secs).round() as usize).max(1);
        plan.candidates = candidates.into_iter().step_by(stride).collect();
        plan
    }
}
