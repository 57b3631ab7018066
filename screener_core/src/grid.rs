use tracing::{debug, info};

use crate::canvas::Resolution;
use crate::cell::GridCell;
use crate::deps::{Dependent, Dependents, Recompute};
use crate::error::{Axis, InvalidConfig};
use crate::geometry::{Point, Span};
use crate::layers::Layers;
use crate::margin::{Insets, Margin};
use crate::screen::{Screen, ScreenId};

/// Everything a screen needs from its grid to place itself, copied out so
/// children can recompute while the grid is mutably borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub cols: u32,
    pub rows: u32,
    pub col_width: f64,
    pub row_height: f64,
    pub left: f64,
    pub bottom: f64,
    pub gutter_w: f64,
    pub gutter_h: f64,
}

impl GridMetrics {
    pub fn derive(margin: &Margin, cols: u32, rows: u32) -> Self {
        let (gutter_w, gutter_h) = margin.gutter();
        let col_width =
            (1.0 - margin.left() - margin.right() - (cols as f64 - 1.0) * gutter_w) / cols as f64;
        let row_height =
            (1.0 - margin.top() - margin.bottom() - (rows as f64 - 1.0) * gutter_h) / rows as f64;

        Self {
            cols,
            rows,
            col_width,
            row_height,
            left: margin.left(),
            bottom: margin.bottom(),
            gutter_w,
            gutter_h,
        }
    }
}

/// Checks in whole pixels that `cols` x `rows` cells plus their gutters fit
/// inside the margins with every cell at least one pixel wide and tall.
/// Margins must already have been checked against `resolution`.
pub fn check_room(
    resolution: Resolution,
    insets: Insets,
    gutter_px: u32,
    cols: u32,
    rows: u32,
) -> Result<(), InvalidConfig> {
    if cols == 0 || rows == 0 {
        return Err(InvalidConfig::EmptyGrid { cols, rows });
    }

    let room_w = resolution.width as u64 - insets.left as u64 - insets.right as u64;
    if (cols as u64 - 1) * gutter_px as u64 >= room_w {
        return Err(InvalidConfig::GutterExceedsCanvas {
            axis: Axis::Horizontal,
            gutter: gutter_px,
        });
    }
    let cells_w = room_w - (cols as u64 - 1) * gutter_px as u64;
    if cols as u64 > cells_w {
        return Err(InvalidConfig::CellsNarrowerThanPixel {
            axis: Axis::Horizontal,
            count: cols,
            room: cells_w,
        });
    }

    let room_h = resolution.height as u64 - insets.top as u64 - insets.bottom as u64;
    if (rows as u64 - 1) * gutter_px as u64 >= room_h {
        return Err(InvalidConfig::GutterExceedsCanvas {
            axis: Axis::Vertical,
            gutter: gutter_px,
        });
    }
    let cells_h = room_h - (rows as u64 - 1) * gutter_px as u64;
    if rows as u64 > cells_h {
        return Err(InvalidConfig::CellsNarrowerThanPixel {
            axis: Axis::Vertical,
            count: rows,
            room: cells_h,
        });
    }
    if cols as u64 * rows as u64 > u32::MAX as u64 {
        return Err(InvalidConfig::TooManyCells { cols, rows });
    }

    Ok(())
}

/// Row-major matrix of 1-based cell indices: row 0 holds `1..=cols`.
pub fn build_matrix(cols: u32, rows: u32) -> Vec<Vec<u32>> {
    (0..rows)
        .map(|row| {
            let first = row * cols + 1;
            (first..first + cols).collect()
        })
        .collect()
}

/// Column/row partition of the margin-inset canvas. Owns its screens and
/// cells and recomputes them, in registration order, after itself.
#[derive(Debug, Clone)]
pub struct Grid {
    cols: u32,
    rows: u32,
    metrics: GridMetrics,
    matrix: Vec<Vec<u32>>,

    screens: Vec<Screen>,
    cells: Vec<GridCell>,
    cells_shape: (u32, u32),
    layers: Layers,
    next_id: u32,

    revision: u64,
    pub(crate) dependents: Dependents,
}

impl Grid {
    /// `cols`/`rows` must already have passed [`check_room`].
    pub(crate) fn new(margin: &Margin, cols: u32, rows: u32) -> Self {
        let mut grid = Self {
            cols,
            rows,
            metrics: GridMetrics::derive(margin, cols, rows),
            matrix: Vec::new(),
            screens: Vec::new(),
            cells: Vec::new(),
            cells_shape: (0, 0),
            layers: Layers::new(),
            next_id: 1,
            revision: 0,
            dependents: Dependents::new(),
        };
        grid.recompute(margin);
        grid
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn composition(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn col_width(&self) -> f64 {
        self.metrics.col_width
    }

    pub fn row_height(&self) -> f64 {
        self.metrics.row_height
    }

    pub fn gutter(&self) -> (f64, f64) {
        (self.metrics.gutter_w, self.metrics.gutter_h)
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn matrix(&self) -> &[Vec<u32>] {
        &self.matrix
    }

    /// Number of completed recomputes, for observing cascade behaviour.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    pub fn cell_count(&self) -> u32 {
        self.cols * self.rows
    }

    /// Resolves a 1-based cell index to 1-based (col, row) by scanning the matrix.
    pub fn coords_of(&self, index: u32) -> Result<(u32, u32), InvalidConfig> {
        self.matrix
            .iter()
            .enumerate()
            .find_map(|(row, cells)| {
                cells
                    .iter()
                    .position(|&i| i == index)
                    .map(|col| (col as u32 + 1, row as u32 + 1))
            })
            .ok_or(InvalidConfig::UnknownCell {
                index,
                count: self.cell_count(),
            })
    }

    /// 1-based cell index of (col, row); `None` off the grid.
    pub fn index_of(&self, col: u32, row: u32) -> Option<u32> {
        if col == 0 || row == 0 || col > self.cols || row > self.rows {
            return None;
        }
        Some((row - 1) * self.cols + col)
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id() == id)
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Topmost screen strictly containing `p`. Later screens sit on top.
    pub fn screen_at(&self, p: Point) -> Option<&Screen> {
        self.screens.iter().rev().find(|s| s.contains(p))
    }

    pub fn cell_at(&self, p: Point) -> Option<&GridCell> {
        self.cells.iter().find(|c| c.contains(p))
    }

    /// Like [`Grid::cell_at`] but a point inside a gutter snaps to the
    /// closest cell.
    pub fn cell_near(&self, p: Point) -> Option<&GridCell> {
        self.cells.iter().find(|c| c.contains_expanded(p, &self.metrics))
    }

    pub(crate) fn store_composition(&mut self, cols: u32, rows: u32) {
        self.cols = cols;
        self.rows = rows;
    }

    /// Adds an already validated screen and registers it for recomputes.
    pub(crate) fn add_screen(&mut self, span: Span) -> ScreenId {
        let id = ScreenId(self.next_id);
        self.next_id += 1;

        let layer = self.layers.take();
        self.screens.push(Screen::new(id, layer, span, &self.metrics));
        self.dependents.register(Dependent::Screen(id));

        info!(screen = %id, layer, ?span, "screen claimed");
        id
    }

    pub(crate) fn remove_screen(&mut self, id: ScreenId) -> Option<Screen> {
        let pos = self.screens.iter().position(|s| s.id() == id)?;
        let screen = self.screens.remove(pos);
        self.layers.remove(screen.layer());
        self.dependents.unregister(Dependent::Screen(id));

        info!(screen = %id, layer = screen.layer(), "screen deleted");
        Some(screen)
    }

    pub(crate) fn clear_screens(&mut self) -> usize {
        let count = self.screens.len();
        self.screens.clear();
        self.layers = Layers::new();
        self.dependents.retain(|d| !matches!(d, Dependent::Screen(_)));
        count
    }

    pub(crate) fn edit_screen(&mut self, id: ScreenId, span: Span) -> bool {
        let metrics = self.metrics;
        match self.screens.iter_mut().find(|s| s.id() == id) {
            Some(screen) => {
                screen.edit(span, &metrics);
                true
            }
            None => false,
        }
    }

    /// Mirrors every screen left to right. `false` when there was nothing
    /// to flip.
    pub(crate) fn flip_horizontally(&mut self) -> bool {
        if self.screens.is_empty() {
            return false;
        }
        let metrics = self.metrics;
        for screen in &mut self.screens {
            screen.flip_horizontally(&metrics);
        }
        true
    }

    pub(crate) fn flip_vertically(&mut self) -> bool {
        if self.screens.is_empty() {
            return false;
        }
        let metrics = self.metrics;
        for screen in &mut self.screens {
            screen.flip_vertically(&metrics);
        }
        true
    }

    /// Remaps every screen for a clockwise quarter turn. Must run before the
    /// composition is swapped.
    pub(crate) fn remap_clockwise(&mut self) {
        let cols = self.cols;
        for screen in &mut self.screens {
            screen.rotate_clockwise(cols);
        }
    }

    pub(crate) fn remap_counterclockwise(&mut self) {
        let rows = self.rows;
        for screen in &mut self.screens {
            screen.rotate_counterclockwise(rows);
        }
    }

    fn regenerate_cells(&mut self) {
        self.dependents.retain(|d| !matches!(d, Dependent::Cell(_)));
        self.cells.clear();

        for (row, indices) in self.matrix.iter().enumerate() {
            for (col, &index) in indices.iter().enumerate() {
                self.cells.push(GridCell::new(
                    index,
                    (col as u32 + 1, row as u32 + 1),
                    &self.metrics,
                ));
                self.dependents.register(Dependent::Cell(index));
            }
        }
        self.cells_shape = (self.cols, self.rows);
    }

    /// Recomputes every registered dependent in order.
    fn notify(&mut self) {
        let metrics = self.metrics;
        for dep in self.dependents.iter() {
            match *dep {
                Dependent::Cell(index) => {
                    if let Some(cell) = self.cells.get_mut(index as usize - 1) {
                        cell.recompute(&metrics);
                    }
                }
                Dependent::Screen(id) => {
                    if let Some(screen) = self.screens.iter_mut().find(|s| s.id() == id) {
                        screen.recompute(&metrics);
                    }
                }
                Dependent::Margin | Dependent::Grid => {}
            }
        }
    }
}

impl Recompute for Grid {
    type Upstream = Margin;

    fn recompute(&mut self, margin: &Margin) {
        self.metrics = GridMetrics::derive(margin, self.cols, self.rows);
        self.matrix = build_matrix(self.cols, self.rows);

        if self.cells_shape != (self.cols, self.rows) {
            self.regenerate_cells();
        }
        self.notify();

        self.revision += 1;
        debug!(
            cols = self.cols,
            rows = self.rows,
            col_width = self.metrics.col_width,
            row_height = self.metrics.row_height,
            dependents = self.dependents.len(),
            "grid recomputed"
        );
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Grid {} cols x {} rows", self.cols, self.rows)
    }
}
