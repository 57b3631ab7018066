use crate::deps::Recompute;
use crate::geometry::{Corners, Geometry, Point, Span};
use crate::grid::GridMetrics;

/// One 1x1 unit of the grid, addressed by its row-major 1-based index.
/// Used to draw the grid and hit-test drag selections.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    index: u32,
    span: Span,
    geometry: Geometry,
}

impl GridCell {
    pub(crate) fn new(index: u32, (col, row): (u32, u32), metrics: &GridMetrics) -> Self {
        let mut cell = Self {
            index,
            span: Span::cell(col, row),
            geometry: Geometry::default(),
        };
        cell.recompute(metrics);
        cell
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn col(&self) -> u32 {
        self.span.col
    }

    pub fn row(&self) -> u32 {
        self.span.row
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn corners(&self) -> Corners {
        self.geometry.corners()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.corners().contains(p)
    }

    /// Containment including half the gutter around the cell, so a drag
    /// released in a gutter still snaps to the nearest cell.
    pub fn contains_expanded(&self, p: Point, metrics: &GridMetrics) -> bool {
        self.geometry.expanded_corners(metrics).contains(p)
    }
}

impl Recompute for GridCell {
    type Upstream = GridMetrics;

    fn recompute(&mut self, metrics: &GridMetrics) {
        self.geometry = Geometry::of(self.span, metrics);
    }
}
