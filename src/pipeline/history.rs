//! Per-class bounded history of accepted crop geometry.
//!
//! Which overlapping crop wins is schedule-dependent when several files of
//! the same class run concurrently; the history only guarantees that two
//! boxes over the class threshold can never both pass.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use crate::config::PipelineConfig;
use crate::pipeline::bbox::{iou, CenterBox};

/// Remembers, per class, the relative geometry of recently saved crops and
/// answers "is this box a near-duplicate of something already saved".
///
/// Each class has its own lock, so unrelated classes never serialize
/// against each other; the outer map lock is only written when a class is
/// seen for the first time.
pub struct OverlapHistory {
    classes: RwLock<HashMap<String, Mutex<VecDeque<CenterBox>>>>,
    capacity: usize,
    default_threshold: f64,
    thresholds: HashMap<String, f64>,
}

impl OverlapHistory {
    pub fn new(capacity: usize, default_threshold: f64, thresholds: HashMap<String, f64>) -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            capacity,
            default_threshold,
            thresholds,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.history_capacity,
            config.default_iou_threshold,
            config.iou_thresholds.clone(),
        )
    }

    fn threshold(&self, class: &str) -> f64 {
        self.thresholds
            .get(class)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    fn with_class<R>(&self, class: &str, f: impl FnOnce(&mut VecDeque<CenterBox>) -> R) -> R {
        {
            let map = self.classes.read().unwrap();
            if let Some(slot) = map.get(class) {
                return f(&mut slot.lock().unwrap());
            }
        }
        let mut map = self.classes.write().unwrap();
        let slot = map
            .entry(class.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let result = f(&mut slot.lock().unwrap());
        result
    }

    fn push(boxes: &mut VecDeque<CenterBox>, b: CenterBox, capacity: usize) {
        boxes.push_back(b);
        while boxes.len() > capacity {
            boxes.pop_front();
        }
    }

    /// True when `b` overlaps any remembered box of `class` beyond the
    /// class threshold. A class with no history is never a duplicate.
    pub fn is_duplicate(&self, class: &str, b: &CenterBox) -> bool {
        let threshold = self.threshold(class);
        self.with_class(class, |boxes| boxes.iter().any(|p| iou(p, b) > threshold))
    }

    /// Appends `b`, evicting the oldest entry past capacity (FIFO).
    pub fn record(&self, class: &str, b: CenterBox) {
        self.with_class(class, |boxes| Self::push(boxes, b, self.capacity));
    }

    /// Atomic check-then-record: returns true (and remembers `b`) when the
    /// box is new for its class, false when it duplicates history. The
    /// whole operation is one per-class critical section, so concurrent
    /// callers can never both pass with overlapping boxes.
    pub fn check_and_record(&self, class: &str, b: CenterBox) -> bool {
        let threshold = self.threshold(class);
        self.with_class(class, |boxes| {
            if boxes.iter().any(|p| iou(p, &b) > threshold) {
                return false;
            }
            Self::push(boxes, b, self.capacity);
            true
        })
    }

    /// Entries currently remembered for `class`.
    pub fn class_len(&self, class: &str) -> usize {
        let map = self.classes.read().unwrap();
        map.get(class).map_or(0, |slot| slot.lock().unwrap().len())
    }
}
