use serde::{Deserialize, Serialize};

use crate::deps::Recompute;
use crate::geometry::{Corners, Geometry, Point, Span};
use crate::grid::GridMetrics;

/// Stable identity of a screen inside its grid. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreenId(pub u32);

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The only record the exporter consumes: normalized size, center and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScreenValues {
    pub width: f64,
    pub height: f64,
    pub center: [f64; 2],
    pub size: f64,
}

/// A user-claimed rectangle of grid cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    id: ScreenId,
    layer: u32,
    span: Span,
    geometry: Geometry,
}

impl Screen {
    pub(crate) fn new(id: ScreenId, layer: u32, span: Span, metrics: &GridMetrics) -> Self {
        let mut screen = Self {
            id,
            layer,
            span,
            geometry: Geometry::default(),
        };
        screen.recompute(metrics);
        screen
    }

    pub fn id(&self) -> ScreenId {
        self.id
    }

    /// Media-input layer from the grid's allocator, reused after deletion.
    ///
    /// The clipboard export does not read this: it numbers media inputs by
    /// their position in the screen list, so after a delete and re-add the
    /// two differ. The live host driver allocates the same way as the grid.
    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn colspan(&self) -> u32 {
        self.span.colspan
    }

    pub fn rowspan(&self) -> u32 {
        self.span.rowspan
    }

    pub fn col(&self) -> u32 {
        self.span.col
    }

    pub fn row(&self) -> u32 {
        self.span.row
    }

    pub fn width(&self) -> f64 {
        self.geometry.width
    }

    pub fn height(&self) -> f64 {
        self.geometry.height
    }

    pub fn x(&self) -> f64 {
        self.geometry.x
    }

    pub fn y(&self) -> f64 {
        self.geometry.y
    }

    pub fn size(&self) -> f64 {
        self.geometry.size
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn values(&self) -> ScreenValues {
        ScreenValues {
            width: self.geometry.width,
            height: self.geometry.height,
            center: [self.geometry.x, self.geometry.y],
            size: self.geometry.size,
        }
    }

    pub fn corners(&self) -> Corners {
        self.geometry.corners()
    }

    pub fn expanded_corners(&self, metrics: &GridMetrics) -> Corners {
        self.geometry.expanded_corners(metrics)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.corners().contains(p)
    }

    /// Replaces the placement and recomputes once. The caller validated it.
    pub(crate) fn edit(&mut self, span: Span, metrics: &GridMetrics) {
        self.span = span;
        self.recompute(metrics);
    }

    pub fn flip_horizontally(&mut self, metrics: &GridMetrics) {
        self.edit(self.span.flipped_horizontally(metrics.cols), metrics);
    }

    pub fn flip_vertically(&mut self, metrics: &GridMetrics) {
        self.edit(self.span.flipped_vertically(metrics.rows), metrics);
    }

    /// Remaps the placement for a grid that is being turned clockwise.
    /// Only the span changes here; geometry follows on the next recompute,
    /// once the grid itself has turned.
    pub(crate) fn rotate_clockwise(&mut self, cols_before: u32) {
        self.span = self.span.rotated_clockwise(cols_before);
    }

    pub(crate) fn rotate_counterclockwise(&mut self, rows_before: u32) {
        self.span = self.span.rotated_counterclockwise(rows_before);
    }
}

impl Recompute for Screen {
    type Upstream = GridMetrics;

    fn recompute(&mut self, metrics: &GridMetrics) {
        self.geometry = Geometry::of(self.span, metrics);
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Screen {} layer {}: {}x{} at col {} row {}",
            self.id,
            self.layer,
            self.span.colspan,
            self.span.rowspan,
            self.span.col,
            self.span.row
        )
    }
}
