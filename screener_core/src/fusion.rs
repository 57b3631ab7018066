//! Node-graph text for Fusion / the Resolve Fusion page.
//!
//! Every screen becomes a compositing triple: a `MediaIn` feeding a `Merge`
//! that is masked by a `RectangleMask`. Merges chain top to bottom, starting
//! from a `Background` sized to the canvas and ending in a `MediaOut`.
//! Studio mode drops `MediaIn` and `MediaOut`, which the standalone
//! compositor does not have.

use std::fmt;

use crate::canvas::Resolution;
use crate::screen::ScreenValues;

pub const CANVAS_NAME: &str = "SSCanvas";
pub const MEDIA_OUT_NAME: &str = "MediaOut1";

/// Flow units per editor grid step: one tool tile.
pub const TILE_WIDTH: i32 = 110;
pub const TILE_HEIGHT: i32 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Background,
    MediaIn,
    Merge,
    RectangleMask,
    MediaOut,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Background => "Background",
            ToolKind::MediaIn => "MediaIn",
            ToolKind::Merge => "Merge",
            ToolKind::RectangleMask => "RectangleMask",
            ToolKind::MediaOut => "MediaOut",
        }
    }

    /// Name of the output other tools connect to.
    pub fn output(self) -> &'static str {
        match self {
            ToolKind::RectangleMask => "Mask",
            _ => "Output",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor position in grid steps. Layout only, no effect on the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowPos {
    pub x: i32,
    pub y: i32,
}

impl FlowPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

pub fn canvas_pos() -> FlowPos {
    FlowPos::new(0, 0)
}

pub fn media_in_pos(index: usize) -> FlowPos {
    FlowPos::new(-1, index as i32)
}

pub fn merge_pos(index: usize) -> FlowPos {
    FlowPos::new(0, index as i32)
}

pub fn mask_pos(index: usize) -> FlowPos {
    FlowPos::new(1, index as i32)
}

pub fn media_out_pos(screen_count: usize) -> FlowPos {
    FlowPos::new(0, screen_count as i32)
}

pub fn media_in_name(index: usize) -> String {
    format!("SSScreen{}", index + 1)
}

pub fn merge_name(index: usize) -> String {
    format!("SSMerge{}", index + 1)
}

pub fn mask_name(index: usize) -> String {
    format!("SSMask{}", index + 1)
}

/// Tool whose output feeds the background of merge `index`.
pub fn background_source(index: usize) -> String {
    match index {
        0 => CANVAS_NAME.to_string(),
        n => merge_name(n - 1),
    }
}

/// Literal or connection carried by a named input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Int(i64),
    Number(f64),
    Text(String),
    Pair(f64, f64),
    Source { op: String, output: &'static str },
}

impl InputValue {
    pub fn source(op: impl Into<String>, kind: ToolKind) -> Self {
        InputValue::Source {
            op: op.into(),
            output: kind.output(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub kind: ToolKind,
    pub inputs: Vec<(&'static str, InputValue)>,
    pub pos: FlowPos,
}

impl Tool {
    pub fn new(name: impl Into<String>, kind: ToolKind, pos: FlowPos) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            pos,
        }
    }

    pub fn input(mut self, name: &'static str, value: InputValue) -> Self {
        self.inputs.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.inputs.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// One tool block of the clipboard text, tab-indented for the envelope.
impl fmt::Display for Tool {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "\t\t{} = {} {{", self.name, self.kind)?;
        writeln!(out, "\t\t\tInputs = {{")?;
        for (name, value) in &self.inputs {
            match value {
                InputValue::Int(v) => writeln!(out, "\t\t\t\t{name} = Input {{ Value = {v}, }},")?,
                InputValue::Number(v) => {
                    writeln!(out, "\t\t\t\t{name} = Input {{ Value = {v}, }},")?
                }
                InputValue::Text(v) => {
                    writeln!(out, "\t\t\t\t{name} = Input {{ Value = \"{v}\", }},")?
                }
                InputValue::Pair(x, y) => {
                    writeln!(out, "\t\t\t\t{name} = Input {{ Value = {{ {x}, {y} }}, }},")?
                }
                InputValue::Source { op, output } => {
                    writeln!(out, "\t\t\t\t{name} = Input {{")?;
                    writeln!(out, "\t\t\t\t\tSourceOp = \"{op}\",")?;
                    writeln!(out, "\t\t\t\t\tSource = \"{output}\",")?;
                    writeln!(out, "\t\t\t\t}},")?;
                }
            }
        }
        writeln!(out, "\t\t\t}},")?;
        writeln!(
            out,
            "\t\t\tViewInfo = OperatorInfo {{ Pos = {{ {}, {} }} }},",
            self.pos.x * TILE_WIDTH,
            self.pos.y * TILE_HEIGHT
        )?;
        writeln!(out, "\t\t}},")
    }
}

pub fn canvas_tool(resolution: Resolution) -> Tool {
    Tool::new(CANVAS_NAME, ToolKind::Background, canvas_pos())
        .input("Width", InputValue::Int(resolution.width.into()))
        .input("Height", InputValue::Int(resolution.height.into()))
}

/// Merge, optional media-in and mask for screen `index`, in output order.
pub fn screen_tools(
    index: usize,
    values: &ScreenValues,
    resolution: Resolution,
    studio: bool,
) -> Vec<Tool> {
    let [x, y] = values.center;

    let mut merge = Tool::new(merge_name(index), ToolKind::Merge, merge_pos(index))
        .input("Center", InputValue::Pair(x, y))
        .input("Size", InputValue::Number(values.size))
        .input(
            "Background",
            InputValue::source(background_source(index), ToolKind::Merge),
        );
    if !studio {
        merge = merge.input(
            "Foreground",
            InputValue::source(media_in_name(index), ToolKind::MediaIn),
        );
    }
    merge = merge.input(
        "EffectMask",
        InputValue::source(mask_name(index), ToolKind::RectangleMask),
    );

    let mask = Tool::new(mask_name(index), ToolKind::RectangleMask, mask_pos(index))
        .input("Center", InputValue::Pair(x, y))
        .input("Width", InputValue::Number(values.width))
        .input("Height", InputValue::Number(values.height))
        .input("MaskWidth", InputValue::Int(resolution.width.into()))
        .input("MaskHeight", InputValue::Int(resolution.height.into()));

    let mut tools = vec![merge];
    if !studio {
        tools.push(
            Tool::new(media_in_name(index), ToolKind::MediaIn, media_in_pos(index))
                .input("Layer", InputValue::Text(index.to_string())),
        );
    }
    tools.push(mask);
    tools
}

pub fn media_out_tool(screen_count: usize) -> Tool {
    let last = match screen_count {
        0 => CANVAS_NAME.to_string(),
        n => merge_name(n - 1),
    };
    Tool::new(MEDIA_OUT_NAME, ToolKind::MediaOut, media_out_pos(screen_count))
        .input("Input", InputValue::source(last, ToolKind::Merge))
}

/// Every tool of the graph in output order.
pub fn plan(screens: &[ScreenValues], resolution: Resolution, studio: bool) -> Vec<Tool> {
    let mut tools = vec![canvas_tool(resolution)];
    for (index, values) in screens.iter().enumerate() {
        tools.extend(screen_tools(index, values, resolution, studio));
    }
    if !studio {
        tools.push(media_out_tool(screens.len()));
    }
    tools
}

/// Wraps already rendered tool blocks in the clipboard envelope.
pub fn wrap(tools: &str) -> String {
    format!("{{\n\tTools = ordered() {{\n{tools}\t}},\n}}\n")
}

/// Full clipboard text for a sequence of screens. Deterministic.
pub fn render(screens: &[ScreenValues], resolution: Resolution, studio: bool) -> String {
    let body: String = plan(screens, resolution, studio)
        .iter()
        .map(Tool::to_string)
        .collect();
    wrap(&body)
}
