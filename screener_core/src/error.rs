use thiserror::Error;

use crate::ScreenId;

/// Which canvas axis a size check failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// A configuration that can never be committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfig {
    #[error("canvas must be at least 1x1 px, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("{axis} margins ({sum}px) must be smaller than the canvas ({limit}px)")]
    MarginsExceedCanvas { axis: Axis, sum: u32, limit: u32 },

    #[error("{axis} gutter of {gutter}px leaves no room for the cells")]
    GutterExceedsCanvas { axis: Axis, gutter: u32 },

    #[error("{axis} room of {room}px cannot hold {count} cells of at least 1px")]
    CellsNarrowerThanPixel { axis: Axis, count: u32, room: u64 },

    #[error("a {cols}x{rows} grid has more cells than can be indexed")]
    TooManyCells { cols: u32, rows: u32 },

    #[error("grid needs at least one column and one row, got {cols}x{rows}")]
    EmptyGrid { cols: u32, rows: u32 },

    #[error("spans and positions start at 1, got span {colspan}x{rowspan} at ({col}, {row})")]
    ZeroSpan {
        colspan: u32,
        rowspan: u32,
        col: u32,
        row: u32,
    },

    #[error("screen reaches cell ({last_col}, {last_row}) outside a {cols}x{rows} grid")]
    ScreenOutsideGrid {
        last_col: u32,
        last_row: u32,
        cols: u32,
        rows: u32,
    },

    #[error("cell {index} is not part of a grid of {count} cells")]
    UnknownCell { index: u32, count: u32 },
}

/// Something the operation needs does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("no grid attached, attach a grid first")]
    NoGrid,

    #[error("screen {0} does not exist")]
    UnknownScreen(ScreenId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] InvalidConfig),

    #[error("missing precondition: {0}")]
    Missing(#[from] Precondition),

    #[error("{0} is not implemented")]
    Unsupported(&'static str),
}

impl LayoutError {
    pub fn is_invalid(&self) -> bool {
        matches!(self, LayoutError::Invalid(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, LayoutError::Missing(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, LayoutError::Unsupported(_))
    }
}

pub type LayoutResult<T> = Result<T, LayoutError>;
