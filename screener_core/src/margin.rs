use serde::{Deserialize, Serialize};

use crate::canvas::{Canvas, Resolution};
use crate::deps::{Dependents, Recompute};
use crate::error::{Axis, InvalidConfig};

/// Pixel insets in (top, left, bottom, right) order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl Insets {
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn all(px: u32) -> Self {
        Self::new(px, px, px, px)
    }

    pub fn tlbr(self) -> (u32, u32, u32, u32) {
        (self.top, self.left, self.bottom, self.right)
    }

    /// Sides after turning the picture a quarter turn clockwise:
    /// what was on the left ends up on top.
    pub fn rotated_clockwise(self) -> Self {
        Self::new(self.left, self.bottom, self.right, self.top)
    }

    pub fn rotated_counterclockwise(self) -> Self {
        Self::new(self.right, self.top, self.left, self.bottom)
    }

    /// Margins on each axis must leave at least one pixel of canvas.
    pub fn check(self, resolution: Resolution) -> Result<Self, InvalidConfig> {
        let vertical = self.top.saturating_add(self.bottom);
        if vertical >= resolution.height {
            return Err(InvalidConfig::MarginsExceedCanvas {
                axis: Axis::Vertical,
                sum: vertical,
                limit: resolution.height,
            });
        }
        let horizontal = self.left.saturating_add(self.right);
        if horizontal >= resolution.width {
            return Err(InvalidConfig::MarginsExceedCanvas {
                axis: Axis::Horizontal,
                sum: horizontal,
                limit: resolution.width,
            });
        }
        Ok(self)
    }
}

/// Margin insets and inter-cell gutter. Pixel values are owned here,
/// normalized values are derived from the canvas on every recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct Margin {
    insets: Insets,
    gutter_px: u32,

    top: f64,
    left: f64,
    bottom: f64,
    right: f64,
    gutter_w: f64,
    gutter_h: f64,

    pub(crate) dependents: Dependents,
}

impl Margin {
    /// Builds and computes a margin against `canvas`.
    pub fn new(canvas: &Canvas, insets: Insets, gutter_px: u32) -> Result<Self, InvalidConfig> {
        let insets = insets.check(canvas.resolution())?;
        let mut margin = Self {
            insets,
            gutter_px,
            top: 0.0,
            left: 0.0,
            bottom: 0.0,
            right: 0.0,
            gutter_w: 0.0,
            gutter_h: 0.0,
            dependents: Dependents::new(),
        };
        margin.recompute(canvas);
        Ok(margin)
    }

    pub fn insets(&self) -> Insets {
        self.insets
    }

    pub fn top_px(&self) -> u32 {
        self.insets.top
    }

    pub fn left_px(&self) -> u32 {
        self.insets.left
    }

    pub fn bottom_px(&self) -> u32 {
        self.insets.bottom
    }

    pub fn right_px(&self) -> u32 {
        self.insets.right
    }

    pub fn gutter_px(&self) -> u32 {
        self.gutter_px
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// Normalized gutter as (width, height). The two differ unless the
    /// canvas is square.
    pub fn gutter(&self) -> (f64, f64) {
        (self.gutter_w, self.gutter_h)
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    pub(crate) fn store(&mut self, insets: Insets, gutter_px: u32) {
        self.insets = insets;
        self.gutter_px = gutter_px;
    }
}

impl Recompute for Margin {
    type Upstream = Canvas;

    fn recompute(&mut self, canvas: &Canvas) {
        let width = canvas.width() as f64;
        let height = canvas.height() as f64;

        self.top = self.insets.top as f64 / height;
        self.left = self.insets.left as f64 / width;
        self.bottom = self.insets.bottom as f64 / height;
        self.right = self.insets.right as f64 / width;

        self.gutter_w = self.gutter_px as f64 / width;
        self.gutter_h = self.gutter_px as f64 / height;
    }
}

impl std::fmt::Display for Margin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Margin top {}px left {}px bottom {}px right {}px gutter {}px",
            self.insets.top,
            self.insets.left,
            self.insets.bottom,
            self.insets.right,
            self.gutter_px
        )
    }
}
