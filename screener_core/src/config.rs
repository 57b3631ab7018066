use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::canvas::Resolution;
use crate::margin::Insets;

/// Starting values for a new layout, read from a TOML file.
///
/// ```toml
/// [canvas]
/// width = 1920
/// height = 1080
///
/// [margin]
/// top = 20
/// gutter = 10
///
/// [grid]
/// cols = 12
/// rows = 6
///
/// [export]
/// studio = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub canvas: CanvasDefaults,
    pub margin: MarginDefaults,
    pub grid: GridDefaults,
    pub export: ExportDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasDefaults {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasDefaults {
    fn default() -> Self {
        let res = Resolution::default();
        Self {
            width: res.width,
            height: res.height,
        }
    }
}

impl CanvasDefaults {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarginDefaults {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
    pub gutter: u32,
}

impl MarginDefaults {
    pub fn insets(&self) -> Insets {
        Insets::new(self.top, self.left, self.bottom, self.right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridDefaults {
    pub cols: u32,
    pub rows: u32,
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self { cols: 12, rows: 6 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportDefaults {
    /// Target the standalone compositor, which has no MediaIn/MediaOut.
    pub studio: bool,
}

impl Defaults {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parse defaults toml")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read defaults file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serialize defaults to toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Layout;

    #[test]
    fn empty_file_means_stock_defaults() -> anyhow::Result<()> {
        let defaults = Defaults::from_toml_str("")?;
        assert_eq!(defaults, Defaults::default());
        assert_eq!(defaults.canvas.resolution(), Resolution::new(1920, 1080));
        assert_eq!((defaults.grid.cols, defaults.grid.rows), (12, 6));
        assert!(!defaults.export.studio);
        Ok(())
    }

    #[test]
    fn partial_sections_keep_the_rest() -> anyhow::Result<()> {
        let defaults = Defaults::from_toml_str(
            r#"
            [margin]
            top = 20
            gutter = 10

            [export]
            studio = true
            "#,
        )?;
        assert_eq!(defaults.margin.insets(), Insets::new(20, 0, 0, 0));
        assert_eq!(defaults.margin.gutter, 10);
        assert_eq!(defaults.canvas.width, 1920);
        assert!(defaults.export.studio);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Defaults::from_toml_str("[grid]\ncolumns = 4\n").is_err());
    }

    #[test]
    fn written_defaults_read_back() -> anyhow::Result<()> {
        let mut defaults = Defaults::default();
        defaults.grid.cols = 4;
        let text = defaults.to_toml_string()?;
        assert_eq!(Defaults::from_toml_str(&text)?, defaults);
        Ok(())
    }

    #[test]
    fn invalid_defaults_do_not_build_a_layout() -> anyhow::Result<()> {
        let defaults = Defaults::from_toml_str("[margin]\ntop = 600\nbottom = 600\n")?;
        assert!(Layout::from_defaults(&defaults).is_err());

        let layout = Layout::from_defaults(&Defaults::default())?;
        assert_eq!(layout.grid().map(|g| g.composition()), Some((12, 6)));
        Ok(())
    }
}
