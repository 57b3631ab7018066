//! Drives a host compositor's object model directly instead of producing
//! clipboard text. Naming, chaining and positions follow [`crate::fusion`];
//! only the sink differs.

use anyhow::{Context, bail};
use tracing::{debug, info, warn};

use crate::canvas::Resolution;
use crate::fusion::{self, FlowPos, ToolKind};
use crate::layers::Layers;
use crate::screen::ScreenValues;

/// Value accepted by a host input: a literal or a link to another node's
/// main output.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue<H> {
    Int(i64),
    Number(f64),
    Text(String),
    Pair(f64, f64),
    Link(H),
}

/// The minimal object model the live graph needs from a host.
pub trait FlowHost {
    /// Opaque node handle.
    type Handle: Clone + PartialEq + std::fmt::Debug;

    fn create_node(&mut self, kind: ToolKind, pos: FlowPos) -> anyhow::Result<Self::Handle>;

    fn set_input(
        &mut self,
        node: &Self::Handle,
        name: &str,
        value: HostValue<Self::Handle>,
    ) -> anyhow::Result<()>;

    fn get_input(&self, node: &Self::Handle, name: &str) -> Option<HostValue<Self::Handle>>;

    fn set_position(&mut self, node: &Self::Handle, pos: FlowPos) -> anyhow::Result<()>;

    fn delete(&mut self, node: Self::Handle) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct Triple<N> {
    merge: N,
    mask: N,
    media_in: Option<N>,
}

/// Canvas, one triple per screen and the output node, mirrored on a host.
#[derive(Debug)]
pub struct LiveGraph<H: FlowHost> {
    host: H,
    studio: bool,
    canvas: Option<H::Handle>,
    media_out: Option<H::Handle>,
    screens: Vec<Triple<H::Handle>>,
}

impl<H: FlowHost> LiveGraph<H> {
    pub fn new(host: H, studio: bool) -> Self {
        Self {
            host,
            studio,
            canvas: None,
            media_out: None,
            screens: Vec::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn canvas(&self) -> Option<&H::Handle> {
        self.canvas.as_ref()
    }

    pub fn media_out(&self) -> Option<&H::Handle> {
        self.media_out.as_ref()
    }

    pub fn merge(&self, index: usize) -> Option<&H::Handle> {
        self.screens.get(index).map(|t| &t.merge)
    }

    pub fn mask(&self, index: usize) -> Option<&H::Handle> {
        self.screens.get(index).map(|t| &t.mask)
    }

    pub fn media_in(&self, index: usize) -> Option<&H::Handle> {
        self.screens.get(index).and_then(|t| t.media_in.as_ref())
    }

    fn require_canvas(&self) -> anyhow::Result<H::Handle> {
        self.canvas.clone().context("no canvas node, call add_canvas first")
    }

    pub fn add_canvas(&mut self, resolution: Resolution) -> anyhow::Result<()> {
        if self.canvas.is_some() {
            bail!("canvas node already exists");
        }

        let canvas = self
            .host
            .create_node(ToolKind::Background, fusion::canvas_pos())
            .context("create canvas node")?;
        self.host.set_input(&canvas, "UseFrameFormatSettings", HostValue::Int(0))?;
        self.canvas = Some(canvas);
        self.update_canvas(resolution)?;

        if !self.studio {
            let out = self
                .host
                .create_node(ToolKind::MediaOut, fusion::media_out_pos(self.screens.len()))
                .context("create output node")?;
            self.media_out = Some(out);
            self.refresh_media_out()?;
        }
        Ok(())
    }

    pub fn update_canvas(&mut self, resolution: Resolution) -> anyhow::Result<()> {
        let canvas = self.require_canvas()?;
        self.host.set_input(&canvas, "Width", HostValue::Int(resolution.width.into()))?;
        self.host.set_input(&canvas, "Height", HostValue::Int(resolution.height.into()))?;
        Ok(())
    }

    /// Layer for a new media input: the smallest one no live input uses.
    pub fn next_layer(&self) -> u32 {
        let layers: Layers = self
            .screens
            .iter()
            .filter_map(|t| t.media_in.as_ref())
            .filter_map(|node| match self.host.get_input(node, "Layer") {
                Some(HostValue::Text(text)) => text.parse().ok(),
                Some(HostValue::Int(n)) => u32::try_from(n).ok(),
                _ => None,
            })
            .collect();
        layers.next_free()
    }

    /// Appends a triple for `values` at the bottom of the chain and returns
    /// its index. On failure every node created for it is removed again.
    pub fn add_screen(
        &mut self,
        values: &ScreenValues,
        resolution: Resolution,
    ) -> anyhow::Result<usize> {
        let canvas = self.require_canvas()?;
        let index = self.screens.len();
        let background = match self.screens.last() {
            Some(prev) => prev.merge.clone(),
            None => canvas,
        };

        let mut created = Vec::new();
        let built = self.build_triple(index, background, values, resolution, &mut created);
        let triple = match built {
            Ok(triple) => triple,
            Err(err) => {
                self.discard(created);
                return Err(err);
            }
        };

        self.screens.push(triple);
        self.refresh_media_out()?;

        info!(index, "screen added to host graph");
        Ok(index)
    }

    fn build_triple(
        &mut self,
        index: usize,
        background: H::Handle,
        values: &ScreenValues,
        resolution: Resolution,
        created: &mut Vec<H::Handle>,
    ) -> anyhow::Result<Triple<H::Handle>> {
        let merge = self
            .host
            .create_node(ToolKind::Merge, fusion::merge_pos(index))
            .context("create merge node")?;
        created.push(merge.clone());
        let mask = self
            .host
            .create_node(ToolKind::RectangleMask, fusion::mask_pos(index))
            .context("create mask node")?;
        created.push(mask.clone());

        let media_in = if self.studio {
            None
        } else {
            let layer = self.next_layer();
            let node = self
                .host
                .create_node(ToolKind::MediaIn, fusion::media_in_pos(index))
                .context("create media input node")?;
            created.push(node.clone());
            self.host.set_input(&node, "Layer", HostValue::Text(layer.to_string()))?;
            debug!(index, layer, "media input created");
            Some(node)
        };

        self.host.set_input(&merge, "Background", HostValue::Link(background))?;
        if let Some(node) = &media_in {
            self.host.set_input(&merge, "Foreground", HostValue::Link(node.clone()))?;
        }
        self.host.set_input(&merge, "EffectMask", HostValue::Link(mask.clone()))?;

        let triple = Triple {
            merge,
            mask,
            media_in,
        };
        self.write_geometry(&triple, values, resolution)?;
        Ok(triple)
    }

    fn discard(&mut self, nodes: Vec<H::Handle>) {
        for node in nodes.into_iter().rev() {
            if let Err(err) = self.host.delete(node) {
                warn!(error = %err, "could not remove a partially created node");
            }
        }
    }

    /// Pushes new geometry into an existing triple.
    pub fn update_screen(
        &mut self,
        index: usize,
        values: &ScreenValues,
        resolution: Resolution,
    ) -> anyhow::Result<()> {
        let Some(triple) = self.screens.get(index).cloned() else {
            bail!("no screen at index {index}");
        };
        self.write_geometry(&triple, values, resolution)
    }

    fn write_geometry(
        &mut self,
        triple: &Triple<H::Handle>,
        values: &ScreenValues,
        resolution: Resolution,
    ) -> anyhow::Result<()> {
        let [x, y] = values.center;
        let (merge, mask) = (&triple.merge, &triple.mask);

        self.host.set_input(merge, "Center", HostValue::Pair(x, y))?;
        self.host.set_input(merge, "Size", HostValue::Number(values.size))?;

        self.host.set_input(mask, "Center", HostValue::Pair(x, y))?;
        self.host.set_input(mask, "Width", HostValue::Number(values.width))?;
        self.host.set_input(mask, "Height", HostValue::Number(values.height))?;
        self.host.set_input(mask, "MaskWidth", HostValue::Int(resolution.width.into()))?;
        self.host.set_input(mask, "MaskHeight", HostValue::Int(resolution.height.into()))?;
        Ok(())
    }

    /// Re-sends every screen's geometry, e.g. after a margin or grid change.
    pub fn update_screens(
        &mut self,
        values: &[ScreenValues],
        resolution: Resolution,
    ) -> anyhow::Result<()> {
        if values.len() != self.screens.len() {
            bail!(
                "host graph has {} screens, got values for {}",
                self.screens.len(),
                values.len()
            );
        }
        self.update_canvas(resolution)?;
        for (index, v) in values.iter().enumerate() {
            self.update_screen(index, v, resolution)?;
        }
        Ok(())
    }

    fn delete_triple(&mut self, triple: Triple<H::Handle>) -> anyhow::Result<()> {
        if let Some(node) = triple.media_in {
            self.host.delete(node).context("delete media input node")?;
        }
        self.host.delete(triple.mask).context("delete mask node")?;
        self.host.delete(triple.merge).context("delete merge node")
    }

    /// Removes the triple at `index`, re-chains its successor and closes the
    /// gap in editor positions. The triple stays tracked until the host has
    /// deleted its nodes.
    pub fn delete_screen(&mut self, index: usize) -> anyhow::Result<()> {
        let Some(triple) = self.screens.get(index).cloned() else {
            bail!("no screen at index {index}");
        };
        self.delete_triple(triple)?;
        self.screens.remove(index);

        if let Some(next) = self.screens.get(index).map(|t| t.merge.clone()) {
            let background = match index {
                0 => self.require_canvas()?,
                n => self.screens[n - 1].merge.clone(),
            };
            self.host.set_input(&next, "Background", HostValue::Link(background))?;
        }

        self.refresh_positions()?;
        self.refresh_media_out()?;
        info!(index, remaining = self.screens.len(), "screen removed from host graph");
        Ok(())
    }

    pub fn clear_screens(&mut self) -> anyhow::Result<()> {
        while let Some(triple) = self.screens.last().cloned() {
            self.delete_triple(triple)?;
            self.screens.pop();
        }
        self.refresh_media_out()
    }

    fn refresh_positions(&mut self) -> anyhow::Result<()> {
        for (index, triple) in self.screens.iter().enumerate() {
            self.host.set_position(&triple.merge, fusion::merge_pos(index))?;
            self.host.set_position(&triple.mask, fusion::mask_pos(index))?;
            if let Some(node) = &triple.media_in {
                self.host.set_position(node, fusion::media_in_pos(index))?;
            }
        }
        Ok(())
    }

    fn refresh_media_out(&mut self) -> anyhow::Result<()> {
        let Some(out) = self.media_out.clone() else {
            return Ok(());
        };
        let last = match self.screens.last() {
            Some(triple) => triple.merge.clone(),
            None => self.require_canvas()?,
        };
        self.host.set_input(&out, "Input", HostValue::Link(last))?;
        self.host.set_position(&out, fusion::media_out_pos(self.screens.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone)]
    struct Node {
        kind: ToolKind,
        pos: FlowPos,
        inputs: BTreeMap<String, HostValue<u32>>,
    }

    #[derive(Debug, Default)]
    struct MemoryHost {
        nodes: BTreeMap<u32, Node>,
        next: u32,
        refuse_kind: Option<ToolKind>,
        refuse_deletes: bool,
    }

    impl MemoryHost {
        fn node(&self, handle: &u32) -> &Node {
            &self.nodes[handle]
        }

        fn count(&self, kind: ToolKind) -> usize {
            self.nodes.values().filter(|n| n.kind == kind).count()
        }
    }

    impl FlowHost for MemoryHost {
        type Handle = u32;

        fn create_node(&mut self, kind: ToolKind, pos: FlowPos) -> anyhow::Result<u32> {
            if self.refuse_kind == Some(kind) {
                bail!("host refused to create a {kind}");
            }
            self.next += 1;
            self.nodes.insert(
                self.next,
                Node {
                    kind,
                    pos,
                    inputs: BTreeMap::new(),
                },
            );
            Ok(self.next)
        }

        fn set_input(
            &mut self,
            node: &u32,
            name: &str,
            value: HostValue<u32>,
        ) -> anyhow::Result<()> {
            let node = self.nodes.get_mut(node).context("unknown node")?;
            node.inputs.insert(name.to_string(), value);
            Ok(())
        }

        fn get_input(&self, node: &u32, name: &str) -> Option<HostValue<u32>> {
            self.nodes.get(node)?.inputs.get(name).cloned()
        }

        fn set_position(&mut self, node: &u32, pos: FlowPos) -> anyhow::Result<()> {
            self.nodes.get_mut(node).context("unknown node")?.pos = pos;
            Ok(())
        }

        fn delete(&mut self, node: u32) -> anyhow::Result<()> {
            if self.refuse_deletes {
                bail!("host refused to delete node {node}");
            }
            self.nodes.remove(&node).context("unknown node")?;
            Ok(())
        }
    }

    fn values(x: f64) -> ScreenValues {
        ScreenValues {
            width: 0.25,
            height: 0.5,
            center: [x, 0.25],
            size: 0.5,
        }
    }

    fn graph(studio: bool, screens: usize) -> anyhow::Result<LiveGraph<MemoryHost>> {
        let mut g = LiveGraph::new(MemoryHost::default(), studio);
        g.add_canvas(Resolution::default())?;
        for i in 0..screens {
            g.add_screen(&values(i as f64 * 0.25), Resolution::default())?;
        }
        Ok(g)
    }

    fn layer_of(g: &LiveGraph<MemoryHost>, index: usize) -> Option<HostValue<u32>> {
        let node = g.media_in(index)?;
        g.host().get_input(node, "Layer")
    }

    #[test]
    fn screens_chain_from_the_canvas() -> anyhow::Result<()> {
        let g = graph(false, 2)?;
        let canvas = *g.canvas().context("canvas")?;
        let m0 = *g.merge(0).context("merge 0")?;
        let m1 = *g.merge(1).context("merge 1")?;
        let host = g.host();

        assert_eq!(host.node(&m0).inputs["Background"], HostValue::Link(canvas));
        assert_eq!(host.node(&m1).inputs["Background"], HostValue::Link(m0));
        assert_eq!(
            host.node(&m1).inputs["EffectMask"],
            HostValue::Link(*g.mask(1).context("mask 1")?)
        );

        let out = host.node(g.media_out().context("media out")?);
        assert_eq!(out.inputs["Input"], HostValue::Link(m1));
        assert_eq!(out.pos, FlowPos::new(0, 2));
        Ok(())
    }

    #[test]
    fn deleted_layer_is_reused() -> anyhow::Result<()> {
        let mut g = graph(false, 3)?;
        assert_eq!(layer_of(&g, 2), Some(HostValue::Text("2".into())));

        g.delete_screen(1)?;
        g.add_screen(&values(0.9), Resolution::default())?;

        assert_eq!(layer_of(&g, 2), Some(HostValue::Text("1".into())));
        Ok(())
    }

    #[test]
    fn delete_rechains_and_renumbers() -> anyhow::Result<()> {
        let mut g = graph(false, 3)?;
        let canvas = *g.canvas().context("canvas")?;
        g.delete_screen(0)?;

        assert_eq!(g.len(), 2);
        let first = *g.merge(0).context("merge")?;
        let host = g.host();
        assert_eq!(host.node(&first).inputs["Background"], HostValue::Link(canvas));
        assert_eq!(host.node(&first).pos, FlowPos::new(0, 0));
        assert_eq!(
            host.node(g.media_in(1).context("media in")?).pos,
            FlowPos::new(-1, 1)
        );
        assert_eq!(
            host.node(g.media_out().context("media out")?).pos,
            FlowPos::new(0, 2)
        );
        assert_eq!(host.count(ToolKind::Merge), 2);
        assert_eq!(host.count(ToolKind::MediaIn), 2);
        Ok(())
    }

    #[test]
    fn studio_graph_has_no_media_nodes() -> anyhow::Result<()> {
        let g = graph(true, 2)?;
        let host = g.host();
        assert_eq!(host.count(ToolKind::MediaIn), 0);
        assert_eq!(host.count(ToolKind::MediaOut), 0);
        assert!(g.media_out().is_none());

        let m0 = *g.merge(0).context("merge")?;
        assert!(host.node(&m0).inputs.get("Foreground").is_none());
        Ok(())
    }

    #[test]
    fn clearing_points_the_output_back_at_the_canvas() -> anyhow::Result<()> {
        let mut g = graph(false, 2)?;
        g.clear_screens()?;
        let canvas = *g.canvas().context("canvas")?;
        let host = g.host();

        assert_eq!(host.nodes.len(), 2);
        let out = host.node(g.media_out().context("media out")?);
        assert_eq!(out.inputs["Input"], HostValue::Link(canvas));
        assert_eq!(out.pos, FlowPos::new(0, 0));
        Ok(())
    }

    #[test]
    fn screens_need_a_canvas() {
        let mut g = LiveGraph::new(MemoryHost::default(), false);
        assert!(g.add_screen(&values(0.0), Resolution::default()).is_err());
    }

    #[test]
    fn failed_add_leaves_no_nodes_behind() -> anyhow::Result<()> {
        let mut g = graph(false, 1)?;
        g.host.refuse_kind = Some(ToolKind::MediaIn);

        assert!(g.add_screen(&values(0.5), Resolution::default()).is_err());
        assert_eq!(g.len(), 1);
        assert_eq!(g.host().count(ToolKind::Merge), 1);
        assert_eq!(g.host().count(ToolKind::RectangleMask), 1);

        g.host.refuse_kind = None;
        let index = g.add_screen(&values(0.5), Resolution::default())?;
        assert_eq!(index, 1);
        let merge = g.merge(1).context("merge 1")?;
        assert_eq!(g.host().node(merge).pos, FlowPos::new(0, 1));

        g.clear_screens()?;
        assert_eq!(g.host().count(ToolKind::Merge), 0);
        assert_eq!(g.host().count(ToolKind::RectangleMask), 0);
        Ok(())
    }

    #[test]
    fn failed_delete_keeps_the_triple_tracked() -> anyhow::Result<()> {
        let mut g = graph(false, 2)?;
        g.host.refuse_deletes = true;

        assert!(g.delete_screen(0).is_err());
        assert!(g.clear_screens().is_err());
        assert_eq!(g.len(), 2);

        g.host.refuse_deletes = false;
        g.clear_screens()?;
        assert!(g.is_empty());
        // canvas and output only
        assert_eq!(g.host().nodes.len(), 2);
        Ok(())
    }
}
