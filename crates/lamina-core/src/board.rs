use std::collections::BTreeMap;

use geo::Coord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::draw::Draw;
use crate::geometry::{self, Shape};
use crate::layer::{Layer, LayerCode, Side};
use crate::part::{Footprint, PartInstance};
use crate::route::Route;
use crate::rules::DesignRules;

/// Drill hits below this diameter are too small to affect the substrate
/// silhouette and are left out of the body computation.
const BODY_HOLE_THRESHOLD: f64 = 0.3;

/// One end of a recorded net connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRef {
    pub part: Option<String>,
    pub pad: Option<String>,
}

/// A single drill hit. Plated hits come from vias and through-hole pins;
/// unplated ones from mounting holes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillHit {
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
    pub plated: bool,
}

/// The board under construction: a layer stack, an outline, drills,
/// keepouts, placed parts, and recorded net connections. All coordinates
/// are millimeters with the origin at the lower-left corner.
#[derive(Debug)]
pub struct Board {
    pub id: Uuid,
    pub size: (f64, f64),
    pub drc: DesignRules,
    layers: BTreeMap<LayerCode, Layer>,
    /// Outline rings; the last ring is the exterior, any earlier rings are
    /// interior cutouts.
    outline: Vec<Vec<Coord<f64>>>,
    drills: Vec<DrillHit>,
    keepouts: Vec<Shape>,
    parts: BTreeMap<char, Vec<PartInstance>>,
    nets: Vec<(PadRef, PadRef)>,
}

impl Board {
    /// A two-layer board of the given width and height with the default
    /// eight-layer fab stack (paste, silk, mask, copper on both faces).
    pub fn new(width: f64, height: f64) -> Self {
        let mut board = Self {
            id: Uuid::new_v4(),
            size: (width, height),
            drc: DesignRules::default(),
            layers: BTreeMap::new(),
            outline: Vec::new(),
            drills: Vec::new(),
            keepouts: Vec::new(),
            parts: BTreeMap::new(),
            nets: Vec::new(),
        };
        for code in [
            LayerCode::TopPaste,
            LayerCode::TopSilk,
            LayerCode::TopMask,
            LayerCode::TopCopper,
            LayerCode::BottomCopper,
            LayerCode::BottomMask,
            LayerCode::BottomSilk,
            LayerCode::BottomPaste,
        ] {
            board.layers.insert(code, Layer::new(code));
        }
        board.reorder_layer_stack();
        debug!("created board {} ({} x {} mm)", board.id, width, height);
        board
    }

    /// Insert `n` inner copper layers (GP2, GP3, …) between the outer pair.
    pub fn add_inner_copper_layers(&mut self, n: u8) {
        for i in 0..n {
            let code = LayerCode::Inner(2 + i);
            self.layers.insert(code, Layer::new(code));
        }
        self.reorder_layer_stack();
    }

    /// Recompute z-order, descriptions, and Gerber file functions after the
    /// stack changes. Copper layers are numbered top-down starting at L1.
    fn reorder_layer_stack(&mut self) {
        let mut cu = 0u32;
        for (z, (code, layer)) in self.layers.iter_mut().enumerate() {
            layer.z_order = z as u32;
            if code.is_copper() {
                cu += 1;
                let (desc, place) = match code {
                    LayerCode::TopCopper => ("Top Copper".to_string(), "Top"),
                    LayerCode::BottomCopper => ("Bottom Copper".to_string(), "Bot"),
                    _ => (format!("Inner Copper Layer {}", cu), "Inr"),
                };
                layer.desc = desc;
                layer.function = format!("Copper,L{},{}", cu, place);
            } else {
                layer.desc = match code {
                    LayerCode::TopPaste => "Top Paste",
                    LayerCode::TopSilk => "Top Silkscreen",
                    LayerCode::TopMask => "Top Soldermask",
                    LayerCode::BottomMask => "Bottom Soldermask",
                    LayerCode::BottomSilk => "Bottom Silkscreen",
                    LayerCode::BottomPaste => "Bottom Paste",
                    _ => "",
                }
                .to_string();
            }
        }
    }

    // ── Layer access ─────────────────────────────────────────────────

    pub fn layer(&self, code: LayerCode) -> Option<&Layer> {
        self.layers.get(&code)
    }

    pub fn layer_mut(&mut self, code: LayerCode) -> Option<&mut Layer> {
        self.layers.get_mut(&code)
    }

    /// The layer codes present, in stack order.
    pub fn layer_codes(&self) -> Vec<LayerCode> {
        self.layers.keys().copied().collect()
    }

    /// Copper layer codes present, top to bottom.
    pub fn copper_codes(&self) -> Vec<LayerCode> {
        self.layers.keys().copied().filter(|c| c.is_copper()).collect()
    }

    /// Append geometry to a layer, optionally tagged with a net owner.
    /// An unknown layer code is logged and skipped rather than panicking,
    /// so scripts written for a deeper stack degrade gracefully.
    pub fn layer_add(&mut self, code: LayerCode, shape: Shape, owner: Option<&str>) {
        match self.layers.get_mut(&code) {
            Some(layer) => match owner {
                Some(net) => layer.add_named(shape, net),
                None => layer.add(shape),
            },
            None => warn!("layer {} not in stack, geometry dropped", code),
        }
    }

    pub(crate) fn layer_connect(&mut self, code: LayerCode, shape: Shape) {
        if let Some(layer) = self.layers.get_mut(&code) {
            layer.add_connected(shape);
        }
    }

    /// The merged image of one layer, isolation and pour applied.
    pub fn preview(&mut self, code: LayerCode) -> Shape {
        let clearance = self.drc.clearance;
        let Self { layers, keepouts, .. } = self;
        match layers.get_mut(&code) {
            Some(layer) => layer.preview(clearance, keepouts),
            None => geometry::empty(),
        }
    }

    fn invalidate_layers(&mut self) {
        for layer in self.layers.values_mut() {
            layer.invalidate();
        }
    }

    /// A human-readable summary of the stack, one line per layer.
    pub fn layer_stack_str(&self) -> String {
        self.layers
            .iter()
            .map(|(code, l)| {
                format!("Layer {} : {} ({} shapes)", code, l.desc, l.shape_count())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ── Outline and substrate ────────────────────────────────────────

    /// The rectangular board boundary, expanded outward by `r`.
    pub fn boundary(&self, r: f64) -> Vec<Coord<f64>> {
        let (w, h) = self.size;
        vec![
            geometry::pt(-r, -r),
            geometry::pt(w + r, -r),
            geometry::pt(w + r, h + r),
            geometry::pt(-r, h + r),
        ]
    }

    /// Keep traces and pours `outline_clearance` away from the board edge.
    pub fn boundary_keepout(&mut self) {
        let ring = self.boundary(0.0);
        let ko = geometry::ring_stroke(&ring, 2.0 * self.drc.outline_clearance);
        self.keepouts.push(ko);
        self.invalidate_layers();
    }

    /// Record the rectangular boundary as the board outline, with its edge
    /// keepout.
    pub fn add_outline(&mut self) {
        let ring = self.boundary(0.0);
        self.outline_ring(ring);
        self.boundary_keepout();
    }

    /// Record a closed outline ring. Rings added before the final one are
    /// treated as interior cutouts.
    pub fn outline_ring(&mut self, ring: Vec<Coord<f64>>) {
        self.outline.push(ring);
    }

    pub fn outline_rings(&self) -> &[Vec<Coord<f64>>] {
        &self.outline
    }

    /// The substrate silhouette: the outline with cutouts and all drill
    /// hits larger than the body threshold removed.
    pub fn body(&self) -> Shape {
        let mut mask = match self.outline.last() {
            Some(exterior) => {
                let cutouts: Vec<Vec<Coord<f64>>> =
                    self.outline[..self.outline.len() - 1].to_vec();
                geometry::polygon_with_holes(exterior, &cutouts)
            }
            None => {
                let (w, h) = self.size;
                geometry::rect(0.0, 0.0, w, h)
            }
        };
        for hit in &self.drills {
            if hit.diameter > BODY_HOLE_THRESHOLD {
                let hole = geometry::disc(geometry::pt(hit.x, hit.y), hit.diameter / 2.0);
                mask = geometry::subtract(&mask, &hole);
            }
        }
        mask
    }

    /// The substrate silhouette, under the name the exporters read.
    pub fn substrate(&self) -> Shape {
        self.body()
    }

    // ── Drills, holes, keepouts ──────────────────────────────────────

    /// A plated drill hit (vias, through-hole pins).
    pub fn add_drill(&mut self, xy: (f64, f64), diameter: f64) {
        self.drills.push(DrillHit {
            x: xy.0,
            y: xy.1,
            diameter,
            plated: true,
        });
        self.invalidate_layers();
    }

    /// A non-plated mounting hole: drill hit, copper keepout, and (policy
    /// permitting) soldermask relief on both faces.
    pub fn add_hole(&mut self, xy: (f64, f64), diameter: f64) {
        self.drills.push(DrillHit {
            x: xy.0,
            y: xy.1,
            diameter,
            plated: false,
        });
        let center = geometry::pt(xy.0, xy.1);
        self.keepouts.push(geometry::disc(
            center,
            diameter / 2.0 + self.drc.hole_clearance,
        ));
        if self.drc.mask_holes {
            let relief = geometry::disc(center, diameter / 2.0 + self.drc.hole_mask);
            self.layer_add(LayerCode::TopMask, relief.clone(), None);
            self.layer_add(LayerCode::BottomMask, relief, None);
        }
        self.invalidate_layers();
    }

    pub fn drills(&self) -> &[DrillHit] {
        &self.drills
    }

    pub fn add_keepout(&mut self, shape: Shape) {
        self.keepouts.push(shape);
        self.invalidate_layers();
    }

    pub fn keepouts(&self) -> &[Shape] {
        &self.keepouts
    }

    // ── Pour and nets ────────────────────────────────────────────────

    /// Pour `net` over one copper layer: the substrate inset by the trace
    /// clearance, minus keepouts, flowed around everything not owned by
    /// `net`. Unknown layers are logged and skipped.
    pub fn fill_layer(&mut self, code: LayerCode, net: &str) {
        if !self.layers.contains_key(&code) {
            warn!("cannot fill layer {}: not in layer stack", code);
            return;
        }
        let clearance = self.drc.clearance;
        let mut background = geometry::buffer(&self.body(), -clearance);
        let layer_keepouts = &self.layers[&code].keepouts;
        let ko = geometry::union_all(self.keepouts.iter().chain(layer_keepouts.iter()));
        if !geometry::is_empty(&ko) {
            background = geometry::subtract(&background, &ko);
        }
        if let Some(layer) = self.layers.get_mut(&code) {
            layer.fill(&background, net, clearance);
        }
    }

    /// Record a logical connection between two pads.
    pub fn add_net_pair(&mut self, a: PadRef, b: PadRef) {
        self.nets.push((a, b));
    }

    /// Record a connection between two cursors bound to pads.
    pub fn addnet(&mut self, a: &Draw, b: &Draw) {
        self.nets.push((a.pad_ref(), b.pad_ref()));
    }

    pub fn nets(&self) -> &[(PadRef, PadRef)] {
        &self.nets
    }

    // ── Cursors ──────────────────────────────────────────────────────

    /// A top-side drawing cursor at `xy` with heading `dir`.
    pub fn draw(&self, xy: (f64, f64), dir: f64) -> Draw {
        Draw::new(geometry::pt(xy.0, xy.1), dir, Side::Top, self.drc.trace_width)
    }

    /// A bottom-side cursor; its turns and lateral moves are mirrored.
    pub fn draw_back(&self, xy: (f64, f64), dir: f64) -> Draw {
        Draw::new(
            geometry::pt(xy.0, xy.1),
            dir,
            Side::Bottom,
            self.drc.trace_width,
        )
    }

    pub fn rules(&self) -> &DesignRules {
        &self.drc
    }

    // ── Parts ────────────────────────────────────────────────────────

    /// Place a footprint at `xy` on the given side. Reference designators
    /// are assigned per family in placement order (`R1`, `R2`, …) and the
    /// returned id is final.
    pub fn add_part<F: Footprint + ?Sized>(
        &mut self,
        xy: (f64, f64),
        footprint: &F,
        side: Side,
    ) -> String {
        let dc = match side {
            Side::Top => self.draw(xy, 0.0),
            Side::Bottom => self.draw_back(xy, 0.0),
        };
        self.place_part(dc, footprint)
    }

    /// Place a footprint through an already positioned cursor, so parts can
    /// be rotated or placed relative to other geometry.
    pub fn place_part<F: Footprint + ?Sized>(&mut self, mut dc: Draw, footprint: &F) -> String {
        let family = footprint.family();
        let n = self.parts.get(&family).map_or(0, Vec::len) + 1;
        let id = format!("{}{}", family, n);
        dc.set_part(&id);
        let mut instance =
            PartInstance::new(&id, family, &footprint.name(), dc.side(), dc.position());
        instance.rotation = dc.heading();
        footprint.place(&mut dc, self, &mut instance);
        debug!("placed part {} ({})", id, instance.footprint);
        self.parts.entry(family).or_default().push(instance);
        id
    }

    pub fn find_part(&self, id: &str) -> Option<&PartInstance> {
        self.parts.values().flatten().find(|p| p.id == id)
    }

    /// All placed parts, grouped by family, in placement order.
    pub fn parts(&self) -> impl Iterator<Item = &PartInstance> {
        self.parts.values().flatten()
    }

    // ── Rivers ───────────────────────────────────────────────────────

    /// A single-trace river.
    pub fn river1(&self, t: Draw) -> Route {
        Route::new(self.drc.channel(), vec![t])
    }

    /// Gather a bank of parallel cursors into a river by bending each
    /// through `a` degrees and closing it up to the channel pitch against
    /// the leader. Positive `a` gathers toward the last cursor.
    pub fn enriver(&self, mut bank: Vec<Draw>, a: f64) -> Route {
        let channel = self.drc.channel();
        let idx: Vec<usize> = if a > 0.0 {
            (0..bank.len()).rev().collect()
        } else {
            (0..bank.len()).collect()
        };
        bank[idx[0]].right(a);
        let leader = bank[idx[0]].clone();
        for (i, &j) in idx.iter().enumerate().skip(1) {
            let gap = channel * i as f64;
            let t = &mut bank[j];
            t.left(a);
            t.approach(gap, &leader);
            t.right(2.0 * a);
        }
        let dst = bank[*idx.last().expect("enriver needs a non-empty bank")].clone();
        extend(&dst, &mut bank);
        Route::new(channel, bank)
    }

    /// Gather a bank through a 90 degree corner: each cursor runs out to
    /// its channel offset and turns, so the bank pitch is exact after one
    /// turn.
    pub fn enriver90(&self, mut bank: Vec<Draw>, a: f64) -> Route {
        let channel = self.drc.channel();
        let idx: Vec<usize> = if a < 0.0 {
            (0..bank.len()).rev().collect()
        } else {
            (0..bank.len()).collect()
        };
        bank[idx[0]].right(a);
        for (i, &j) in idx.iter().enumerate().skip(1) {
            let gap = channel * i as f64;
            let t = &mut bank[j];
            t.forward(gap);
            t.right(a);
        }
        let dst = bank[idx[0]].clone();
        extend(&dst, &mut bank);
        Route::new(channel, bank)
    }
}

/// Advance every cursor so all are level with `dst` along their common
/// heading. All headings must already match.
pub fn extend(dst: &Draw, traces: &mut [Draw]) {
    let dir0 = traces
        .first()
        .map(Draw::heading)
        .unwrap_or_else(|| dst.heading());
    assert!(
        traces
            .iter()
            .all(|t| ((t.heading() - dir0).rem_euclid(360.0)).min(
                (dir0 - t.heading()).rem_euclid(360.0)
            ) < 1e-4),
        "all traces must be parallel"
    );
    let mut finish_line = dst.clone();
    finish_line.left(90.0);
    for t in traces {
        t.approach(0.0, &finish_line);
    }
}
