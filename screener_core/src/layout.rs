use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, Resolution};
use crate::config::Defaults;
use crate::deps::{Dependent, Recompute};
use crate::error::{InvalidConfig, LayoutError, LayoutResult, Precondition};
use crate::fusion;
use crate::geometry::{Point, Span};
use crate::grid::{Grid, check_room};
use crate::margin::{Insets, Margin};
use crate::screen::{Screen, ScreenId, ScreenValues};

/// One editing session: the canvas, its margin and the grid carved out of
/// them. Every setter validates the whole resulting configuration first,
/// then commits and recomputes everything downstream before returning.
#[derive(Debug, Clone)]
pub struct Layout {
    canvas: Canvas,
    margin: Margin,
    grid: Option<Grid>,
}

/// Where a cascade starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Canvas,
    Margin,
    Grid,
}

/// A full pixel-level configuration, checked as a unit before commit.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    resolution: Resolution,
    insets: Insets,
    gutter_px: u32,
    composition: Option<(u32, u32)>,
}

impl Layout {
    pub fn new(resolution: Resolution, insets: Insets, gutter_px: u32) -> LayoutResult<Self> {
        let candidate = Candidate {
            resolution,
            insets,
            gutter_px,
            composition: None,
        };
        candidate.check(std::iter::empty())?;

        let mut canvas = Canvas::new(resolution)?;
        let margin = Margin::new(&canvas, insets, gutter_px)?;
        canvas.dependents.register(Dependent::Margin);

        Ok(Self {
            canvas,
            margin,
            grid: None,
        })
    }

    /// Builds a layout with a grid attached from a defaults file.
    pub fn from_defaults(defaults: &Defaults) -> anyhow::Result<Self> {
        let mut layout = Self::new(
            defaults.canvas.resolution(),
            defaults.margin.insets(),
            defaults.margin.gutter,
        )
        .context("defaults describe an invalid canvas or margin")?;
        layout
            .attach_grid(defaults.grid.cols, defaults.grid.rows)
            .context("defaults describe an invalid grid")?;
        Ok(layout)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn margin(&self) -> &Margin {
        &self.margin
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn require_grid(&self) -> LayoutResult<&Grid> {
        self.grid.as_ref().ok_or(LayoutError::Missing(Precondition::NoGrid))
    }

    fn grid_mut(&mut self) -> LayoutResult<&mut Grid> {
        self.grid.as_mut().ok_or(LayoutError::Missing(Precondition::NoGrid))
    }

    fn current(&self) -> Candidate {
        Candidate {
            resolution: self.canvas.resolution(),
            insets: self.margin.insets(),
            gutter_px: self.margin.gutter_px(),
            composition: self.grid.as_ref().map(Grid::composition),
        }
    }

    fn spans(&self) -> Vec<Span> {
        self.grid
            .as_ref()
            .map(|g| g.screens().iter().map(Screen::span).collect())
            .unwrap_or_default()
    }

    /// Validates `next` together with the screens it would carry, then
    /// stores it and runs one cascade from `origin`. Nothing is touched
    /// when validation fails.
    fn commit(&mut self, next: Candidate, spans: &[Span], origin: Origin) -> LayoutResult<()> {
        if let Err(err) = next.check(spans.iter().copied()) {
            warn!(%err, "rejected layout change");
            return Err(err.into());
        }

        self.canvas.store(next.resolution);
        self.margin.store(next.insets, next.gutter_px);
        if let (Some(grid), Some((cols, rows))) = (self.grid.as_mut(), next.composition) {
            grid.store_composition(cols, rows);
        }

        self.cascade(origin);
        Ok(())
    }

    fn cascade(&mut self, origin: Origin) {
        debug!(?origin, "cascade");
        match origin {
            Origin::Canvas => {
                let deps: Vec<Dependent> = self.canvas.dependents().iter().copied().collect();
                for dep in deps {
                    self.recompute(dep);
                }
            }
            Origin::Margin => self.recompute(Dependent::Margin),
            Origin::Grid => self.recompute(Dependent::Grid),
        }
    }

    /// Depth-first walk: recompute `dep`, then everything registered on it.
    fn recompute(&mut self, dep: Dependent) {
        match dep {
            Dependent::Margin => {
                self.margin.recompute(&self.canvas);
                let deps: Vec<Dependent> = self.margin.dependents().iter().copied().collect();
                for dep in deps {
                    self.recompute(dep);
                }
            }
            Dependent::Grid => {
                if let Some(grid) = self.grid.as_mut() {
                    grid.recompute(&self.margin);
                }
            }
            // Cells and screens register on the grid, which walks them itself.
            Dependent::Cell(_) | Dependent::Screen(_) => {}
        }
    }

    // ---- canvas ----

    pub fn set_canvas_width(&mut self, width: u32) -> LayoutResult<()> {
        let height = self.canvas.height();
        self.set_resolution(Resolution::new(width, height))
    }

    pub fn set_canvas_height(&mut self, height: u32) -> LayoutResult<()> {
        let width = self.canvas.width();
        self.set_resolution(Resolution::new(width, height))
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> LayoutResult<()> {
        let next = Candidate {
            resolution,
            ..self.current()
        };
        let spans = self.spans();
        self.commit(next, &spans, Origin::Canvas)
    }

    // ---- margin ----

    pub fn set_margin_top(&mut self, px: u32) -> LayoutResult<()> {
        let insets = Insets {
            top: px,
            ..self.margin.insets()
        };
        self.set_margin_tlbr(insets)
    }

    pub fn set_margin_left(&mut self, px: u32) -> LayoutResult<()> {
        let insets = Insets {
            left: px,
            ..self.margin.insets()
        };
        self.set_margin_tlbr(insets)
    }

    pub fn set_margin_bottom(&mut self, px: u32) -> LayoutResult<()> {
        let insets = Insets {
            bottom: px,
            ..self.margin.insets()
        };
        self.set_margin_tlbr(insets)
    }

    pub fn set_margin_right(&mut self, px: u32) -> LayoutResult<()> {
        let insets = Insets {
            right: px,
            ..self.margin.insets()
        };
        self.set_margin_tlbr(insets)
    }

    /// Same inset on all four sides, one recompute.
    pub fn set_margin_all(&mut self, px: u32) -> LayoutResult<()> {
        self.set_margin_tlbr(Insets::all(px))
    }

    /// All four insets at once, one recompute.
    pub fn set_margin_tlbr(&mut self, insets: Insets) -> LayoutResult<()> {
        let next = Candidate {
            insets,
            ..self.current()
        };
        let spans = self.spans();
        self.commit(next, &spans, Origin::Margin)
    }

    pub fn set_gutter(&mut self, px: u32) -> LayoutResult<()> {
        let next = Candidate {
            gutter_px: px,
            ..self.current()
        };
        let spans = self.spans();
        self.commit(next, &spans, Origin::Margin)
    }

    // ---- grid ----

    /// Attaches a grid to this canvas. Replaces any previous grid and its
    /// screens.
    pub fn attach_grid(&mut self, cols: u32, rows: u32) -> LayoutResult<()> {
        let next = Candidate {
            composition: Some((cols, rows)),
            ..self.current()
        };
        if let Err(err) = next.check(std::iter::empty()) {
            warn!(%err, "rejected grid");
            return Err(err.into());
        }

        self.grid = Some(Grid::new(&self.margin, cols, rows));
        self.margin.dependents.register(Dependent::Grid);
        info!(cols, rows, "grid attached");
        Ok(())
    }

    pub fn set_cols(&mut self, cols: u32) -> LayoutResult<()> {
        let rows = self.require_grid()?.rows();
        self.set_composition(cols, rows)
    }

    pub fn set_rows(&mut self, rows: u32) -> LayoutResult<()> {
        let cols = self.require_grid()?.cols();
        self.set_composition(cols, rows)
    }

    /// Columns and rows at once, one recompute. Screens that would fall
    /// outside the new grid make the change invalid.
    pub fn set_composition(&mut self, cols: u32, rows: u32) -> LayoutResult<()> {
        self.require_grid()?;
        let next = Candidate {
            composition: Some((cols, rows)),
            ..self.current()
        };
        let spans = self.spans();
        self.commit(next, &spans, Origin::Grid)
    }

    // ---- screens ----

    /// Claims the rectangle of cells spanned by two cell indices, in any order.
    pub fn claim_cells(&mut self, a: u32, b: u32) -> LayoutResult<ScreenId> {
        let grid = self.require_grid()?;
        let span = Span::between(grid.coords_of(a)?, grid.coords_of(b)?);
        self.add_screen(span)
    }

    /// Claims the cells under a drag from `from` to `to`. Each end snaps to
    /// the cell whose gutter-expanded area contains it; `None` when either
    /// end is off the grid.
    pub fn claim_between(&mut self, from: Point, to: Point) -> LayoutResult<Option<ScreenId>> {
        let grid = self.require_grid()?;
        let (Some(a), Some(b)) = (grid.cell_near(from), grid.cell_near(to)) else {
            debug!(?from, ?to, "drag ended off the grid");
            return Ok(None);
        };
        let span = Span::between((a.col(), a.row()), (b.col(), b.row()));
        self.add_screen(span).map(Some)
    }

    pub fn add_screen(&mut self, span: Span) -> LayoutResult<ScreenId> {
        let grid = self.grid_mut()?;
        let span = span.check(grid.cols(), grid.rows())?;
        Ok(grid.add_screen(span))
    }

    /// Replaces a screen's placement, one recompute.
    pub fn edit_screen(&mut self, id: ScreenId, span: Span) -> LayoutResult<()> {
        let grid = self.grid_mut()?;
        if grid.screen(id).is_none() {
            return Err(Precondition::UnknownScreen(id).into());
        }
        let span = match span.check(grid.cols(), grid.rows()) {
            Ok(span) => span,
            Err(err) => {
                warn!(screen = %id, %err, "rejected screen edit");
                return Err(err.into());
            }
        };
        grid.edit_screen(id, span);
        Ok(())
    }

    fn edit_screen_with(&mut self, id: ScreenId, f: impl FnOnce(&mut Span)) -> LayoutResult<()> {
        let mut span = self
            .require_grid()?
            .screen(id)
            .map(Screen::span)
            .ok_or(Precondition::UnknownScreen(id))?;
        f(&mut span);
        self.edit_screen(id, span)
    }

    pub fn set_screen_colspan(&mut self, id: ScreenId, colspan: u32) -> LayoutResult<()> {
        self.edit_screen_with(id, |s| s.colspan = colspan)
    }

    pub fn set_screen_rowspan(&mut self, id: ScreenId, rowspan: u32) -> LayoutResult<()> {
        self.edit_screen_with(id, |s| s.rowspan = rowspan)
    }

    pub fn set_screen_col(&mut self, id: ScreenId, col: u32) -> LayoutResult<()> {
        self.edit_screen_with(id, |s| s.col = col)
    }

    pub fn set_screen_row(&mut self, id: ScreenId, row: u32) -> LayoutResult<()> {
        self.edit_screen_with(id, |s| s.row = row)
    }

    pub fn delete_screen(&mut self, id: ScreenId) -> LayoutResult<Screen> {
        self.grid_mut()?
            .remove_screen(id)
            .ok_or(LayoutError::Missing(Precondition::UnknownScreen(id)))
    }

    pub fn clear_screens(&mut self) -> LayoutResult<usize> {
        let count = self.grid_mut()?.clear_screens();
        info!(count, "screens cleared");
        Ok(count)
    }

    pub fn screens(&self) -> &[Screen] {
        self.grid.as_ref().map(Grid::screens).unwrap_or_default()
    }

    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.grid.as_ref().and_then(|g| g.screen(id))
    }

    pub fn screen_at(&self, p: Point) -> Option<&Screen> {
        self.grid.as_ref().and_then(|g| g.screen_at(p))
    }

    pub fn select_screen(&mut self, _id: ScreenId) -> LayoutResult<()> {
        Err(LayoutError::Unsupported("screen selection"))
    }

    pub fn deselect_screen(&mut self, _id: ScreenId) -> LayoutResult<()> {
        Err(LayoutError::Unsupported("screen deselection"))
    }

    // ---- transforms ----

    pub fn flip_horizontally(&mut self) -> LayoutResult<bool> {
        let flipped = self.grid_mut()?.flip_horizontally();
        if flipped {
            info!("screens flipped horizontally");
        }
        Ok(flipped)
    }

    pub fn flip_vertically(&mut self) -> LayoutResult<bool> {
        let flipped = self.grid_mut()?.flip_vertically();
        if flipped {
            info!("screens flipped vertically");
        }
        Ok(flipped)
    }

    /// Turns the whole layout a quarter clockwise: canvas dimensions swap,
    /// margins move one side round, cols and rows swap and every screen is
    /// remapped so it covers the same picture area. One cascade.
    pub fn rotate_clockwise(&mut self) -> LayoutResult<()> {
        let (cols, rows) = self.require_grid()?.composition();
        let next = Candidate {
            resolution: self.canvas.resolution().rotated(),
            insets: self.margin.insets().rotated_clockwise(),
            gutter_px: self.margin.gutter_px(),
            composition: Some((rows, cols)),
        };
        let spans: Vec<Span> = self
            .spans()
            .into_iter()
            .map(|s| s.rotated_clockwise(cols))
            .collect();
        next.check(spans.iter().copied())?;

        self.grid_mut()?.remap_clockwise();
        self.commit(next, &spans, Origin::Canvas)?;
        info!("layout rotated clockwise");
        Ok(())
    }

    pub fn rotate_counterclockwise(&mut self) -> LayoutResult<()> {
        let (cols, rows) = self.require_grid()?.composition();
        let next = Candidate {
            resolution: self.canvas.resolution().rotated(),
            insets: self.margin.insets().rotated_counterclockwise(),
            gutter_px: self.margin.gutter_px(),
            composition: Some((rows, cols)),
        };
        let spans: Vec<Span> = self
            .spans()
            .into_iter()
            .map(|s| s.rotated_counterclockwise(rows))
            .collect();
        next.check(spans.iter().copied())?;

        self.grid_mut()?.remap_counterclockwise();
        self.commit(next, &spans, Origin::Canvas)?;
        info!("layout rotated counter-clockwise");
        Ok(())
    }

    // ---- output ----

    pub fn screen_values(&self) -> LayoutResult<Vec<ScreenValues>> {
        Ok(self.require_grid()?.screens().iter().map(Screen::values).collect())
    }

    /// Node-graph text for the compositor, ready for the clipboard.
    /// Clipboard text for the current screens. Media inputs get `Layer`
    /// values by list position, not [`Screen::layer`].
    pub fn export(&self, studio: bool) -> LayoutResult<String> {
        let values = self.screen_values()?;
        info!(screens = values.len(), studio, "exporting node graph");
        Ok(fusion::render(&values, self.canvas.resolution(), studio))
    }

    pub fn snapshot(&self) -> LayoutResult<LayoutSnapshot> {
        let grid = self.require_grid()?;
        Ok(LayoutSnapshot {
            resolution: self.canvas.resolution(),
            margin: self.margin.insets(),
            gutter: self.margin.gutter_px(),
            cols: grid.cols(),
            rows: grid.rows(),
            screens: grid
                .screens()
                .iter()
                .map(|s| ScreenSnapshot {
                    id: s.id(),
                    layer: s.layer(),
                    span: s.span(),
                    values: s.values(),
                })
                .collect(),
        })
    }
}

impl Candidate {
    fn check(&self, spans: impl IntoIterator<Item = Span>) -> Result<(), InvalidConfig> {
        self.resolution.check()?;
        self.insets.check(self.resolution)?;
        if let Some((cols, rows)) = self.composition {
            check_room(self.resolution, self.insets, self.gutter_px, cols, rows)?;
            for span in spans {
                span.check(cols, rows)?;
            }
        }
        Ok(())
    }
}

/// Read-only picture of a layout for collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub resolution: Resolution,
    pub margin: Insets,
    pub gutter: u32,
    pub cols: u32,
    pub rows: u32,
    pub screens: Vec<ScreenSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub id: ScreenId,
    pub layer: u32,
    pub span: Span,
    pub values: ScreenValues,
}

impl LayoutSnapshot {
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serialize layout snapshot to json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hd() -> anyhow::Result<Layout> {
        let mut layout = Layout::new(Resolution::new(1920, 1080), Insets::default(), 0)?;
        layout.attach_grid(12, 6)?;
        Ok(layout)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn claim_cells_builds_the_spanned_rectangle() -> anyhow::Result<()> {
        let mut layout = hd()?;
        // cell 30 is col 6 of row 3
        let id = layout.claim_cells(30, 1)?;
        let screen = layout.screen(id).expect("claimed screen exists");

        assert_eq!(screen.span(), Span::new(6, 3, 1, 1));
        assert_eq!(screen.width(), 0.5);
        assert_eq!(screen.height(), 0.5);
        assert_eq!((screen.x(), screen.y()), (0.25, 0.25));
        Ok(())
    }

    #[test]
    fn margin_change_reaches_every_screen() -> anyhow::Result<()> {
        let mut layout = hd()?;
        let id = layout.claim_cells(1, 1)?;
        let before = layout.screen(id).map(Screen::values);

        layout.set_margin_left(192)?;
        let screen = layout.screen(id).expect("screen survives");

        assert_ne!(Some(screen.values()), before);
        assert!(close(screen.x() - screen.width() / 2.0, 0.1));
        Ok(())
    }

    #[test]
    fn bulk_setters_recompute_once() -> anyhow::Result<()> {
        let mut layout = hd()?;
        let rev = |l: &Layout| l.grid().map(Grid::revision).unwrap_or(0);

        let start = rev(&layout);
        layout.set_margin_all(20)?;
        assert_eq!(rev(&layout), start + 1);

        layout.set_margin_tlbr(Insets::new(1, 2, 3, 4))?;
        assert_eq!(rev(&layout), start + 2);

        layout.set_resolution(Resolution::new(1280, 720))?;
        assert_eq!(rev(&layout), start + 3);

        layout.set_composition(6, 3)?;
        assert_eq!(rev(&layout), start + 4);
        Ok(())
    }

    #[test]
    fn rejected_margin_leaves_state_untouched() -> anyhow::Result<()> {
        let mut layout = hd()?;
        layout.set_margin_top(500)?;
        let grid_before = layout.grid().map(|g| (g.revision(), g.row_height()));

        let err = layout.set_margin_bottom(580).unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(layout.margin().bottom_px(), 0);
        assert_eq!(layout.margin().top_px(), 500);
        assert_eq!(
            layout.grid().map(|g| (g.revision(), g.row_height())),
            grid_before
        );
        Ok(())
    }

    #[test]
    fn shrinking_the_grid_under_a_screen_is_rejected() -> anyhow::Result<()> {
        let mut layout = hd()?;
        layout.claim_cells(12, 12)?;

        let err = layout.set_cols(11).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::Invalid(InvalidConfig::ScreenOutsideGrid { .. })
        ));
        assert_eq!(layout.grid().map(Grid::cols), Some(12));
        Ok(())
    }

    #[test]
    fn missing_grid_is_its_own_error() -> anyhow::Result<()> {
        let mut layout = Layout::new(Resolution::default(), Insets::default(), 0)?;

        let claim = layout.claim_cells(1, 2).unwrap_err();
        assert_eq!(claim, LayoutError::Missing(Precondition::NoGrid));
        assert!(layout.export(false).unwrap_err().is_missing());
        assert!(
            layout
                .claim_between(Point::new(0.1, 0.1), Point::new(0.2, 0.2))
                .unwrap_err()
                .is_missing()
        );
        Ok(())
    }

    #[test]
    fn selection_is_unsupported() -> anyhow::Result<()> {
        let mut layout = hd()?;
        let id = layout.claim_cells(1, 1)?;
        assert!(layout.select_screen(id).unwrap_err().is_unsupported());
        assert!(layout.deselect_screen(id).unwrap_err().is_unsupported());
        Ok(())
    }

    #[test]
    fn drag_claims_the_cells_under_both_ends() -> anyhow::Result<()> {
        let mut layout = hd()?;
        let id = layout
            .claim_between(Point::new(0.95, 0.95), Point::new(0.55, 0.6))?
            .expect("both ends on the grid");
        assert_eq!(
            layout.screen(id).map(Screen::span),
            Some(Span::new(6, 3, 7, 4))
        );

        assert_eq!(
            layout.claim_between(Point::new(0.5, 0.5), Point::new(1.5, 0.5))?,
            None
        );
        Ok(())
    }

    #[test]
    fn rotation_keeps_screens_over_the_same_picture_area() -> anyhow::Result<()> {
        let mut layout = Layout::new(Resolution::new(1920, 1080), Insets::new(10, 20, 30, 40), 8)?;
        layout.attach_grid(4, 3)?;
        let id = layout.add_screen(Span::new(2, 1, 1, 1))?;
        let before = layout.screen(id).map(Screen::values).expect("screen");

        layout.rotate_clockwise()?;
        assert_eq!(layout.canvas().resolution(), Resolution::new(1080, 1920));
        assert_eq!(layout.margin().insets(), Insets::new(20, 30, 40, 10));
        assert_eq!(layout.grid().map(Grid::composition), Some((3, 4)));

        let after = layout.screen(id).map(Screen::values).expect("screen");
        assert!(close(after.center[0], before.center[1]));
        assert!(close(after.center[1], 1.0 - before.center[0]));
        assert!(close(after.width, before.height));
        assert!(close(after.height, before.width));

        layout.rotate_counterclockwise()?;
        assert_eq!(layout.screen(id).map(Screen::span), Some(Span::new(2, 1, 1, 1)));
        assert_eq!(layout.margin().insets(), Insets::new(10, 20, 30, 40));
        Ok(())
    }

    #[test]
    fn deleting_unknown_screen_is_missing() -> anyhow::Result<()> {
        let mut layout = hd()?;
        let err = layout.delete_screen(ScreenId(99)).unwrap_err();
        assert_eq!(err, LayoutError::Missing(Precondition::UnknownScreen(ScreenId(99))));
        Ok(())
    }

    #[test]
    fn snapshot_lists_screens_in_claim_order() -> anyhow::Result<()> {
        let mut layout = hd()?;
        layout.claim_cells(1, 1)?;
        layout.claim_cells(2, 2)?;

        let snapshot = layout.snapshot()?;
        assert_eq!(snapshot.screens.len(), 2);
        assert_eq!(snapshot.screens[1].layer, 1);

        let json = snapshot.to_json()?;
        assert!(json.contains("\"Width\""));
        Ok(())
    }
}
