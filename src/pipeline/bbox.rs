//! Box geometry: relative/pixel conversions, IoU, validation gates.

use std::collections::HashMap;

use crate::config::PipelineConfig;

/// Relative box in normalized [0,1] coordinates, `(x, y)` = top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RelBox {
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        Self {
            x: bbox[0],
            y: bbox[1],
            w: bbox[2],
            h: bbox[3],
        }
    }

    /// Center-based form, the representation the overlap history stores.
    pub fn to_center(self) -> CenterBox {
        CenterBox {
            cx: self.x + self.w / 2.0,
            cy: self.y + self.h / 2.0,
            w: self.w,
            h: self.h,
        }
    }
}

/// Relative box in center form `(cx, cy, w, h)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

/// Intersection-over-union of two axis-aligned center-form boxes.
/// Disjoint boxes and degenerate unions both yield 0.
pub fn iou(a: &CenterBox, b: &CenterBox) -> f64 {
    let ix = ((a.cx + a.w / 2.0).min(b.cx + b.w / 2.0)
        - (a.cx - a.w / 2.0).max(b.cx - b.w / 2.0))
    .max(0.0);
    let iy = ((a.cy + a.h / 2.0).min(b.cy + b.h / 2.0)
        - (a.cy - a.h / 2.0).max(b.cy - b.h / 2.0))
    .max(0.0);
    let inter = ix * iy;
    if inter <= 0.0 {
        return 0.0;
    }
    let union = a.w * a.h + b.w * b.h - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Pixel-space crop rectangle, guaranteed to lie inside its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Why a detection was not turned into a crop. Policy outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Zero or negative relative width/height.
    Degenerate,
    /// Below the per-class minimum size ratio.
    TooSmall,
    /// Nothing left after clamping to the frame.
    Empty,
    /// Implausibly elongated, likely a detector artifact.
    BadAspect,
}

/// Runs the ordered rejection gates that turn a relative box into a valid
/// pixel crop.
pub struct BoxValidator {
    default_min_ratio: f64,
    min_ratios: HashMap<String, f64>,
    max_aspect_ratio: f64,
}

impl BoxValidator {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            default_min_ratio: config.default_min_box_ratio,
            min_ratios: config.min_box_ratios.clone(),
            max_aspect_ratio: config.max_aspect_ratio,
        }
    }

    fn min_ratio(&self, class: &str) -> f64 {
        self.min_ratios
            .get(class)
            .copied()
            .unwrap_or(self.default_min_ratio)
    }

    /// On acceptance returns the pixel crop rect plus the center-form
    /// relative box the overlap history needs.
    pub fn validate(
        &self,
        class: &str,
        rel: RelBox,
        frame_w: u32,
        frame_h: u32,
    ) -> Result<(PixelRect, CenterBox), Rejection> {
        if rel.w <= 0.0 || rel.h <= 0.0 {
            return Err(Rejection::Degenerate);
        }
        let min = self.min_ratio(class);
        if rel.w < min || rel.h < min {
            return Err(Rejection::TooSmall);
        }
        if frame_w == 0 || frame_h == 0 {
            return Err(Rejection::Empty);
        }

        // Absolute conversion, top-left clamped into the frame, then the
        // far edge clamped back to the boundary.
        let x = ((rel.x * frame_w as f64) as i64).clamp(0, frame_w as i64 - 1);
        let y = ((rel.y * frame_h as f64) as i64).clamp(0, frame_h as i64 - 1);
        let mut w = (rel.w * frame_w as f64) as i64;
        let mut h = (rel.h * frame_h as f64) as i64;
        if x + w > frame_w as i64 {
            w = frame_w as i64 - x;
        }
        if y + h > frame_h as i64 {
            h = frame_h as i64 - y;
        }
        if w <= 0 || h <= 0 {
            return Err(Rejection::Empty);
        }

        let (long, short) = if w >= h { (w, h) } else { (h, w) };
        if long as f64 / short as f64 >= self.max_aspect_ratio {
            return Err(Rejection::BadAspect);
        }

        Ok((
            PixelRect {
                x: x as u32,
                y: y as u32,
                w: w as u32,
                h: h as u32,
            },
            rel.to_center(),
        ))
    }
}
