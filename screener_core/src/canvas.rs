use serde::{Deserialize, Serialize};

use crate::deps::Dependents;
use crate::error::InvalidConfig;

/// The pixel working area. Root of the recompute cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width_px: u32,
    height_px: u32,
    pub(crate) dependents: Dependents,
}

/// Plain pixel resolution, used by collaborators and the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn check(self) -> Result<Self, InvalidConfig> {
        if self.width == 0 || self.height == 0 {
            return Err(InvalidConfig::EmptyCanvas {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    pub fn rotated(self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl Canvas {
    pub fn new(resolution: Resolution) -> Result<Self, InvalidConfig> {
        let resolution = resolution.check()?;
        Ok(Self {
            width_px: resolution.width,
            height_px: resolution.height,
            dependents: Dependents::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width_px
    }

    pub fn height(&self) -> u32 {
        self.height_px
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width_px, self.height_px)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width_px as f64 / self.height_px as f64
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    /// Stores an already validated resolution. Callers run the cascade.
    pub(crate) fn store(&mut self, resolution: Resolution) {
        self.width_px = resolution.width;
        self.height_px = resolution.height;
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Canvas {}x{}px", self.width_px, self.height_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_dimensions() {
        assert!(Canvas::new(Resolution::new(0, 1080)).is_err());
        assert!(Canvas::new(Resolution::new(1920, 0)).is_err());
    }

    #[test]
    fn aspect_ratio_is_width_over_height() -> anyhow::Result<()> {
        let canvas = Canvas::new(Resolution::new(1920, 1080))?;
        assert!((canvas.aspect_ratio() - 16.0 / 9.0).abs() < 1e-12);
        assert_eq!(canvas.resolution().rotated(), Resolution::new(1080, 1920));
        Ok(())
    }
}
