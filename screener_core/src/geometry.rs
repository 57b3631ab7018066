use serde::{Deserialize, Serialize};

use crate::error::InvalidConfig;
use crate::grid::GridMetrics;

/// A point in normalized canvas space, y measured bottom-up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Corners {
    /// Strict containment: a point on an edge is outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.top_left.x
            && p.x < self.top_right.x
            && p.y < self.top_left.y
            && p.y > self.bottom_left.y
    }
}

/// Grid-unit placement of a rectangle: spans plus the 1-based
/// lowest column and row it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub colspan: u32,
    pub rowspan: u32,
    pub col: u32,
    pub row: u32,
}

impl Span {
    pub fn new(colspan: u32, rowspan: u32, col: u32, row: u32) -> Self {
        Self {
            colspan,
            rowspan,
            col,
            row,
        }
    }

    pub fn cell(col: u32, row: u32) -> Self {
        Self::new(1, 1, col, row)
    }

    /// Smallest span covering two cells given as 1-based (col, row).
    pub fn between(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::new(
            a.0.abs_diff(b.0) + 1,
            a.1.abs_diff(b.1) + 1,
            a.0.min(b.0),
            a.1.min(b.1),
        )
    }

    pub fn last_col(&self) -> u32 {
        self.col + self.colspan - 1
    }

    pub fn last_row(&self) -> u32 {
        self.row + self.rowspan - 1
    }

    /// The span must be non-empty and lie inside a `cols` x `rows` grid.
    pub fn check(self, cols: u32, rows: u32) -> Result<Self, InvalidConfig> {
        if self.colspan == 0 || self.rowspan == 0 || self.col == 0 || self.row == 0 {
            return Err(InvalidConfig::ZeroSpan {
                colspan: self.colspan,
                rowspan: self.rowspan,
                col: self.col,
                row: self.row,
            });
        }
        let (last_col, last_row) = (
            self.col.saturating_add(self.colspan - 1),
            self.row.saturating_add(self.rowspan - 1),
        );
        if last_col > cols || last_row > rows {
            return Err(InvalidConfig::ScreenOutsideGrid {
                last_col,
                last_row,
                cols,
                rows,
            });
        }
        Ok(self)
    }

    pub fn flipped_horizontally(self, cols: u32) -> Self {
        Self {
            col: cols - (self.col - 1) - self.colspan + 1,
            ..self
        }
    }

    pub fn flipped_vertically(self, rows: u32) -> Self {
        Self {
            row: rows - (self.row - 1) - self.rowspan + 1,
            ..self
        }
    }

    /// Placement after the whole picture turns a quarter clockwise.
    /// `cols` is the column count before the turn. Normalized centers map
    /// `(x, y) -> (y, 1 - x)`.
    pub fn rotated_clockwise(self, cols: u32) -> Self {
        Self::new(
            self.rowspan,
            self.colspan,
            self.row,
            cols - (self.col - 1) - self.colspan + 1,
        )
    }

    /// Placement after a quarter counter-clockwise turn. `rows` is the row
    /// count before the turn. Normalized centers map `(x, y) -> (1 - y, x)`.
    pub fn rotated_counterclockwise(self, rows: u32) -> Self {
        Self::new(
            self.rowspan,
            self.colspan,
            rows - (self.row - 1) - self.rowspan + 1,
            self.col,
        )
    }
}

/// Normalized size and center of a placed rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl Geometry {
    pub fn of(span: Span, m: &GridMetrics) -> Self {
        let colspan = span.colspan as f64;
        let rowspan = span.rowspan as f64;

        let width = m.col_width * colspan + (colspan - 1.0) * m.gutter_w;
        let height = m.row_height * rowspan + (rowspan - 1.0) * m.gutter_h;

        let x = width / 2.0 + m.left + (span.col as f64 - 1.0) * (m.col_width + m.gutter_w);
        let y = height / 2.0 + m.bottom + (span.row as f64 - 1.0) * (m.row_height + m.gutter_h);

        Self {
            width,
            height,
            x,
            y,
            size: width.max(height),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn corners(&self) -> Corners {
        self.grown(0.0, 0.0)
    }

    /// Corners grown by half a gutter on every side, so neighbouring
    /// rectangles meet in the middle of the gutter.
    pub fn expanded_corners(&self, m: &GridMetrics) -> Corners {
        self.grown(m.gutter_w / 2.0, m.gutter_h / 2.0)
    }

    fn grown(&self, dx: f64, dy: f64) -> Corners {
        let half_w = self.width / 2.0 + dx;
        let half_h = self.height / 2.0 + dy;
        Corners {
            top_left: Point::new(self.x - half_w, self.y + half_h),
            top_right: Point::new(self.x + half_w, self.y + half_h),
            bottom_left: Point::new(self.x - half_w, self.y - half_h),
            bottom_right: Point::new(self.x + half_w, self.y - half_h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_orders_the_corners() {
        assert_eq!(Span::between((6, 3), (1, 1)), Span::new(6, 3, 1, 1));
        assert_eq!(Span::between((2, 5), (4, 2)), Span::new(3, 4, 2, 2));
    }

    #[test]
    fn check_rejects_spans_leaving_the_grid() {
        assert!(Span::new(2, 2, 11, 5).check(12, 6).is_ok());
        assert!(matches!(
            Span::new(3, 1, 11, 1).check(12, 6),
            Err(InvalidConfig::ScreenOutsideGrid { last_col: 13, .. })
        ));
        assert!(matches!(
            Span::new(0, 1, 1, 1).check(12, 6),
            Err(InvalidConfig::ZeroSpan { .. })
        ));
    }

    #[test]
    fn flip_mirrors_inside_the_grid() {
        let span = Span::new(3, 2, 2, 1);
        assert_eq!(span.flipped_horizontally(12).col, 9);
        assert_eq!(span.flipped_vertically(6).row, 5);
    }

    #[test]
    fn rotation_swaps_spans_and_moves_the_origin() {
        // 4x3 grid, screen covering cols 1-2 of row 1 (bottom left).
        let span = Span::new(2, 1, 1, 1);
        let cw = span.rotated_clockwise(4);
        // Turned clockwise the bottom-left corner lands top-left of a 3x4 grid.
        assert_eq!(cw, Span::new(1, 2, 1, 3));
        assert_eq!(cw.rotated_counterclockwise(4), span);
    }

    #[test]
    fn corners_are_strictly_exclusive() {
        let geometry = Geometry {
            width: 0.5,
            height: 0.5,
            x: 0.25,
            y: 0.25,
            size: 0.5,
        };
        let corners = geometry.corners();
        assert!(corners.contains(Point::new(0.25, 0.25)));
        assert!(!corners.contains(Point::new(0.5, 0.25)));
        assert!(!corners.contains(Point::new(0.25, 0.0)));
        assert_eq!(corners.bottom_right, Point::new(0.5, 0.0));
    }
}
