use anyhow::{Context, bail};
use std::io::{self, Write};
use std::str::FromStr;

use screener_core::{Insets, Layout, Point, ScreenId, Span};

const HELP: &str = r#"Commands:
    canvas <w> <h>
    margin all|top|left|bottom|right <px>
    margin <top> <left> <bottom> <right>
    gutter <px>
    grid <cols> <rows>
    add <cell> <cell>          (claims the rectangle spanned by two cells)
    drag <x1> <y1> <x2> <y2>   (normalized, y up)
    del <id>
    clear
    flip h|v
    rotate cw|ccw
    span <id> <colspan> <rowspan> <col> <row>
    list
    values
    matrix
    export [studio]
    quit
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One interactive editing session over a layout.
#[derive(Debug)]
pub struct Session {
    layout: Layout,
    studio: bool,
}

fn arg<T: FromStr>(parts: &[&str], i: usize, what: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parts
        .get(i)
        .with_context(|| format!("missing <{what}>"))?
        .parse()
        .with_context(|| format!("{what} must be a number"))
}

impl Session {
    pub fn new(layout: Layout, studio: bool) -> Self {
        Self { layout, studio }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn execute(&mut self, line: &str, out: &mut impl Write) -> anyhow::Result<Flow> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Ok(Flow::Continue);
        };
        let cmd = first.to_lowercase();

        match cmd.as_str() {
            "help" => write!(out, "{HELP}")?,
            "quit" | "exit" => return Ok(Flow::Quit),

            "canvas" => {
                let w = arg(&parts, 1, "w")?;
                let h = arg(&parts, 2, "h")?;
                self.layout.set_resolution(screener_core::Resolution::new(w, h))?;
                writeln!(out, "canvas {}", self.layout.canvas())?;
            }

            "margin" => {
                match parts.len() {
                    3 => {
                        let px = arg(&parts, 2, "px")?;
                        match parts[1] {
                            "all" => self.layout.set_margin_all(px)?,
                            "top" => self.layout.set_margin_top(px)?,
                            "left" => self.layout.set_margin_left(px)?,
                            "bottom" => self.layout.set_margin_bottom(px)?,
                            "right" => self.layout.set_margin_right(px)?,
                            side => bail!("unknown margin side '{side}'"),
                        }
                    }
                    5 => {
                        let insets = Insets::new(
                            arg(&parts, 1, "top")?,
                            arg(&parts, 2, "left")?,
                            arg(&parts, 3, "bottom")?,
                            arg(&parts, 4, "right")?,
                        );
                        self.layout.set_margin_tlbr(insets)?;
                    }
                    _ => {
                        writeln!(out, "Usage: margin all|top|left|bottom|right <px>")?;
                        writeln!(out, "       margin <top> <left> <bottom> <right>")?;
                        return Ok(Flow::Continue);
                    }
                }
                writeln!(out, "margin {}", self.layout.margin())?;
            }

            "gutter" => {
                self.layout.set_gutter(arg(&parts, 1, "px")?)?;
                writeln!(out, "gutter {}px", self.layout.margin().gutter_px())?;
            }

            "grid" => {
                let cols = arg(&parts, 1, "cols")?;
                let rows = arg(&parts, 2, "rows")?;
                if self.layout.grid().is_some() {
                    self.layout.set_composition(cols, rows)?;
                } else {
                    self.layout.attach_grid(cols, rows)?;
                }
                writeln!(out, "grid {cols}x{rows}")?;
            }

            "add" => {
                let a = arg(&parts, 1, "cell")?;
                let b = arg(&parts, 2, "cell")?;
                let id = self.layout.claim_cells(a, b)?;
                self.print_screen(id, out)?;
            }

            "drag" => {
                let from = Point::new(arg(&parts, 1, "x1")?, arg(&parts, 2, "y1")?);
                let to = Point::new(arg(&parts, 3, "x2")?, arg(&parts, 4, "y2")?);
                match self.layout.claim_between(from, to)? {
                    Some(id) => self.print_screen(id, out)?,
                    None => writeln!(out, "drag ended off the grid, nothing claimed")?,
                }
            }

            "del" | "delete" => {
                let id = ScreenId(arg(&parts, 1, "id")?);
                let screen = self.layout.delete_screen(id)?;
                writeln!(out, "deleted {} (layer {} free)", screen.id(), screen.layer())?;
            }

            "clear" => {
                let n = self.layout.clear_screens()?;
                writeln!(out, "cleared {n} screens")?;
            }

            "flip" => {
                let flipped = match parts.get(1).copied() {
                    Some("h") => self.layout.flip_horizontally()?,
                    Some("v") => self.layout.flip_vertically()?,
                    _ => {
                        writeln!(out, "Usage: flip h|v")?;
                        return Ok(Flow::Continue);
                    }
                };
                if !flipped {
                    writeln!(out, "no screens to flip")?;
                }
            }

            "rotate" => {
                match parts.get(1).copied() {
                    Some("cw") => self.layout.rotate_clockwise()?,
                    Some("ccw") => self.layout.rotate_counterclockwise()?,
                    _ => {
                        writeln!(out, "Usage: rotate cw|ccw")?;
                        return Ok(Flow::Continue);
                    }
                }
                writeln!(out, "canvas {}", self.layout.canvas())?;
            }

            "span" => {
                let id = ScreenId(arg(&parts, 1, "id")?);
                let span = Span::new(
                    arg(&parts, 2, "colspan")?,
                    arg(&parts, 3, "rowspan")?,
                    arg(&parts, 4, "col")?,
                    arg(&parts, 5, "row")?,
                );
                self.layout.edit_screen(id, span)?;
                self.print_screen(id, out)?;
            }

            "list" => {
                writeln!(out, "Screens:")?;
                for s in self.layout.screens() {
                    writeln!(
                        out,
                        "  {:>4} | layer {:>2} | {}x{} at col {} row {}",
                        s.id().to_string(),
                        s.layer(),
                        s.colspan(),
                        s.rowspan(),
                        s.col(),
                        s.row()
                    )?;
                }
            }

            "values" => {
                for (i, v) in self.layout.screen_values()?.iter().enumerate() {
                    writeln!(
                        out,
                        "  {:>2}: Width={} Height={} Center=({}, {}) Size={}",
                        i + 1,
                        v.width,
                        v.height,
                        v.center[0],
                        v.center[1],
                        v.size
                    )?;
                }
            }

            "matrix" => {
                let grid = self.layout.require_grid()?;
                // top row first, the way the canvas reads
                for row in grid.matrix().iter().rev() {
                    let cells: Vec<String> = row.iter().map(|c| format!("{c:>3}")).collect();
                    writeln!(out, "{}", cells.join(" "))?;
                }
            }

            "export" => {
                let studio = self.studio || parts.get(1) == Some(&"studio");
                write!(out, "{}", self.layout.export(studio)?)?;
            }

            "select" | "deselect" => {
                let id = ScreenId(arg(&parts, 1, "id")?);
                if cmd == "select" {
                    self.layout.select_screen(id)?;
                } else {
                    self.layout.deselect_screen(id)?;
                }
            }

            other => writeln!(out, "Unknown command '{other}'. Type 'help'.")?,
        }

        Ok(Flow::Continue)
    }

    fn print_screen(&self, id: ScreenId, out: &mut impl Write) -> anyhow::Result<()> {
        let s = self
            .layout
            .screen(id)
            .with_context(|| format!("screen {id} vanished"))?;
        writeln!(
            out,
            "{} layer {} | {}x{} at col {} row {} | w {:.4} h {:.4} c ({:.4}, {:.4})",
            s.id(),
            s.layer(),
            s.colspan(),
            s.rowspan(),
            s.col(),
            s.row(),
            s.width(),
            s.height(),
            s.x(),
            s.y()
        )?;
        Ok(())
    }
}

pub fn run(mut session: Session) -> anyhow::Result<()> {
    println!("Type 'help' for commands. 'quit' to exit.");
    let mut stdout = io::stdout();

    loop {
        print!("scr> ");
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            // EOF (Ctrl+D)
            break;
        }

        match session.execute(line.trim(), &mut stdout) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => println!("error: {err:#}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> anyhow::Result<Session> {
        let layout = Layout::from_defaults(&screener_core::Defaults::default())?;
        Ok(Session::new(layout, false))
    }

    fn run_line(s: &mut Session, line: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        s.execute(line, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn add_then_list() -> anyhow::Result<()> {
        let mut s = session()?;
        let added = run_line(&mut s, "add 30 1")?;
        assert!(added.starts_with("#1 layer 0 | 6x3 at col 1 row 1"));

        let listed = run_line(&mut s, "list")?;
        assert!(listed.contains("layer  0 | 6x3 at col 1 row 1"));
        Ok(())
    }

    #[test]
    fn quit_ends_the_session() -> anyhow::Result<()> {
        let mut s = session()?;
        assert_eq!(s.execute("quit", &mut Vec::new())?, Flow::Quit);
        assert_eq!(s.execute("", &mut Vec::new())?, Flow::Continue);
        Ok(())
    }

    #[test]
    fn rejected_edit_surfaces_as_error() -> anyhow::Result<()> {
        let mut s = session()?;
        let err = s.execute("margin 600 0 600 0", &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("margin"));
        assert_eq!(s.layout().margin().top_px(), 0);
        Ok(())
    }

    #[test]
    fn missing_argument_is_named() -> anyhow::Result<()> {
        let mut s = session()?;
        let err = s.execute("grid 4", &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "missing <rows>");
        Ok(())
    }

    #[test]
    fn matrix_prints_top_row_first() -> anyhow::Result<()> {
        let mut s = session()?;
        run_line(&mut s, "grid 2 2")?;
        let text = run_line(&mut s, "matrix")?;
        assert_eq!(text, "  3   4\n  1   2\n");
        Ok(())
    }

    #[test]
    fn rotate_swaps_the_canvas() -> anyhow::Result<()> {
        let mut s = session()?;
        run_line(&mut s, "add 1 1")?;
        run_line(&mut s, "rotate cw")?;
        assert_eq!(s.layout().canvas().width(), 1080);
        assert_eq!(s.layout().grid().map(|g| g.composition()), Some((6, 12)));
        Ok(())
    }

    #[test]
    fn selection_is_reported_unsupported() -> anyhow::Result<()> {
        let mut s = session()?;
        run_line(&mut s, "add 1 1")?;
        let err = s.execute("select 1", &mut Vec::new()).unwrap_err();
        let layout_err = err.downcast_ref::<screener_core::LayoutError>();
        assert!(layout_err.is_some_and(|e| e.is_unsupported()));
        Ok(())
    }

    #[test]
    fn export_in_studio_mode() -> anyhow::Result<()> {
        let mut s = session()?;
        run_line(&mut s, "add 1 8")?;
        let text = run_line(&mut s, "export studio")?;
        assert!(text.starts_with("{\n\tTools = ordered() {\n"));
        assert!(!text.contains("MediaIn"));
        Ok(())
    }
}
