pub mod canvas;
pub mod cell;
pub mod config;
pub mod deps;
pub mod error;
pub mod fusion;
pub mod geometry;
pub mod grid;
pub mod layers;
pub mod layout;
pub mod live;
pub mod margin;
pub mod screen;

pub use canvas::{Canvas, Resolution};
pub use cell::GridCell;
pub use config::Defaults;
pub use deps::{Dependent, Dependents, Recompute};
pub use error::{Axis, InvalidConfig, LayoutError, LayoutResult, Precondition};
pub use geometry::{Corners, Geometry, Point, Span};
pub use grid::{Grid, GridMetrics};
pub use layers::Layers;
pub use layout::{Layout, LayoutSnapshot, ScreenSnapshot};
pub use live::{FlowHost, HostValue, LiveGraph};
pub use margin::{Insets, Margin};
pub use screen::{Screen, ScreenId, ScreenValues};

pub fn version() -> &'static str {
    "0.1.0"
}
