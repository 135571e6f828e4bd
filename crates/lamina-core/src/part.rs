//! Placed parts and footprints.
//!
//! A [`Footprint`] stamps pads, silkscreen, and drills through a cursor it
//! is handed at the part origin; the resulting [`PartInstance`] keeps one
//! escape cursor per pad so routing can start exactly where placement
//! finished.

use std::collections::BTreeMap;

use geo::{Coord, Rect};
use log::debug;

use crate::board::Board;
use crate::draw::Draw;
use crate::geometry;
use crate::layer::Side;
use crate::units::inches;

/// A placed component: identity, BOM fields, and the pad cursors.
#[derive(Debug, Clone)]
pub struct PartInstance {
    /// Reference designator, e.g. `R3`.
    pub id: String,
    pub family: char,
    pub footprint: String,
    pub val: String,
    pub mfr: String,
    pub vendor: String,
    pub vendor_code: String,
    pub side: Side,
    /// Cursor position at placement time, for centroid export.
    pub center: Coord<f64>,
    /// Cursor heading at placement time, degrees clockwise from board "up".
    pub rotation: f64,
    pub in_bom: bool,
    /// One cursor per pad, in pad order, each with a fresh path starting
    /// at the pad center.
    pub pads: Vec<Draw>,
    /// Bounding box of all pad copper, used for escape direction.
    pub bounds: Option<Rect<f64>>,
}

impl PartInstance {
    pub fn new(id: &str, family: char, footprint: &str, side: Side, center: Coord<f64>) -> Self {
        Self {
            id: id.to_string(),
            family,
            footprint: footprint.to_string(),
            val: String::new(),
            mfr: String::new(),
            vendor: String::new(),
            vendor_code: String::new(),
            side,
            center,
            rotation: 0.0,
            in_bom: true,
            pads: Vec::new(),
            bounds: None,
        }
    }

    /// Look up a pad by name, falling back to its 1-based index.
    pub fn pad(&self, selector: &str) -> Option<&Draw> {
        if let Some(p) = self.pads.iter().find(|p| p.name() == Some(selector)) {
            return Some(p);
        }
        selector
            .parse::<usize>()
            .ok()
            .filter(|&n| n >= 1)
            .and_then(|n| self.pads.get(n - 1))
    }

    pub fn pad_mut(&mut self, index: usize) -> Option<&mut Draw> {
        self.pads.get_mut(index)
    }

    fn grow_bounds(&mut self, r: Rect<f64>) {
        self.bounds = Some(match self.bounds {
            None => r,
            Some(b) => Rect::new(
                geometry::pt(b.min().x.min(r.min().x), b.min().y.min(r.min().y)),
                geometry::pt(b.max().x.max(r.max().x), b.max().y.max(r.max().y)),
            ),
        });
    }

    fn record_pad(&mut self, dc: &Draw, footprint_shape: &geometry::Shape) {
        if let Some(r) = geometry::bounds(footprint_shape) {
            self.grow_bounds(r);
        }
        let mut pad = dc.fork();
        pad.set_part(&self.id);
        self.pads.push(pad);
    }

    /// Stamp the cursor's walked outline as a surface-mount pad: copper and
    /// paste as walked, soldermask opened up by the mask margin.
    pub fn smd_pad(&mut self, dc: &mut Draw, board: &mut Board) {
        let g = dc.poly();
        let mask = geometry::buffer(&g, board.rules().soldermask_margin / 2.0);
        board.layer_add(self.side.copper(), g.clone(), None);
        board.layer_add(self.side.mask(), mask, None);
        board.layer_add(self.side.paste(), g.clone(), None);
        self.record_pad(dc, &g);
    }

    /// A plated through-hole pin: drill hit plus an octagonal pad with
    /// mask relief on both faces.
    pub fn pin_pad(&mut self, dc: &mut Draw, board: &mut Board, drill: f64) {
        let xy = dc.position();
        board.add_drill((xy.x, xy.y), drill);
        let mut walk = dc.fork();
        walk.n_agon(drill, 8);
        let g = walk.poly();
        board.layer_add(Side::Top.copper(), g.clone(), None);
        board.layer_add(Side::Bottom.copper(), g.clone(), None);
        board.layer_add(Side::Top.mask(), g.clone(), None);
        board.layer_add(Side::Bottom.mask(), g.clone(), None);
        self.record_pad(dc, &g);
    }

    /// Package outline on the silkscreen with a chamfered corner marking
    /// pin 1.
    pub fn chamfered_outline(&self, dc: &mut Draw, board: &mut Board, w: f64, h: f64) {
        let nt = 0.4;
        dc.push();
        dc.forward(h / 2.0);
        dc.left(90.0);
        dc.forward(w / 2.0 - nt);
        dc.right(180.0);
        dc.new_path();
        for e in [w - nt, h, w, h - nt] {
            dc.forward(e);
            dc.right(90.0);
        }
        dc.silko(board);
        dc.pop();
        dc.new_path();
    }
}

/// A component land pattern. `place` runs once per instance with a cursor
/// at the part origin, already tagged with the reference designator.
pub trait Footprint {
    /// Reference designator family letter (`R`, `C`, `U`, `J`, …).
    fn family(&self) -> char;

    /// Footprint name for the BOM, e.g. `0603`.
    fn name(&self) -> String;

    fn place(&self, dc: &mut Draw, board: &mut Board, part: &mut PartInstance);
}

// ── Footprint registry ───────────────────────────────────────────────

type FootprintCtor = Box<dyn Fn(&str) -> Box<dyn Footprint>>;

/// Maps footprint identifiers to constructors, so a board can be described
/// by data that names footprints instead of types. The constructor argument
/// is the part value (`"10k"`, `"100n"`; the pin count for headers).
#[derive(Default)]
pub struct FootprintRegistry {
    entries: BTreeMap<String, FootprintCtor>,
}

impl FootprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in footprints: chip discretes in every size plus the two
    /// header pitches.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        for size in [
            ChipSize::I0402,
            ChipSize::I0603,
            ChipSize::I0805,
            ChipSize::I1206,
        ] {
            reg.register(&format!("R{}", size.label()), move |val| {
                Box::new(ChipDiscrete::resistor(size, val))
            });
            reg.register(&format!("C{}", size.label()), move |val| {
                Box::new(ChipDiscrete::capacitor(size, val))
            });
            reg.register(&format!("L{}", size.label()), move |val| {
                Box::new(ChipDiscrete::inductor(size, val))
            });
        }
        reg.register("SIL", |val| {
            Box::new(PinHeader::sil(val.parse().unwrap_or(2)))
        });
        reg.register("SIL-2MM", |val| {
            Box::new(PinHeader::sil_2mm(val.parse().unwrap_or(2)))
        });
        reg
    }

    pub fn register<F>(&mut self, key: &str, ctor: F)
    where
        F: Fn(&str) -> Box<dyn Footprint> + 'static,
    {
        self.entries.insert(key.to_string(), Box::new(ctor));
    }

    /// Build the footprint registered under `key`, if any.
    pub fn create(&self, key: &str, val: &str) -> Option<Box<dyn Footprint>> {
        self.entries.get(key).map(|ctor| ctor(val))
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

// ── Two-terminal chip parts ──────────────────────────────────────────

/// Imperial chip sizes for two-terminal discretes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSize {
    I0402,
    I0603,
    I0805,
    I1206,
}

impl ChipSize {
    /// (pad center offset, pad width, pad height, silk width, silk height)
    fn params(self) -> (f64, f64, f64, f64, f64) {
        match self {
            ChipSize::I0402 => (0.5, 0.6, 0.6, 2.5, 1.5),
            ChipSize::I0603 => (0.8, 1.0, 1.0, 3.5, 1.9),
            ChipSize::I0805 => (1.0, 1.5, 1.0, 3.9, 2.4),
            ChipSize::I1206 => (1.5, 1.8, 1.2, 5.1, 2.7),
        }
    }

    fn label(self) -> &'static str {
        match self {
            ChipSize::I0402 => "0402",
            ChipSize::I0603 => "0603",
            ChipSize::I0805 => "0805",
            ChipSize::I1206 => "1206",
        }
    }
}

/// A two-pad chip discrete (resistor, capacitor, inductor).
#[derive(Debug, Clone)]
pub struct ChipDiscrete {
    pub family: char,
    pub size: ChipSize,
    pub val: String,
    pub mfr: String,
}

impl ChipDiscrete {
    pub fn resistor(size: ChipSize, val: &str) -> Self {
        Self {
            family: 'R',
            size,
            val: val.to_string(),
            mfr: String::new(),
        }
    }

    pub fn capacitor(size: ChipSize, val: &str) -> Self {
        Self {
            family: 'C',
            size,
            val: val.to_string(),
            mfr: String::new(),
        }
    }

    pub fn inductor(size: ChipSize, val: &str) -> Self {
        Self {
            family: 'L',
            size,
            val: val.to_string(),
            mfr: String::new(),
        }
    }
}

impl Footprint for ChipDiscrete {
    fn family(&self) -> char {
        self.family
    }

    fn name(&self) -> String {
        self.size.label().to_string()
    }

    fn place(&self, dc: &mut Draw, board: &mut Board, part: &mut PartInstance) {
        part.val = self.val.clone();
        part.mfr = self.mfr.clone();
        let (offset, pw, ph, sw, sh) = self.size.params();
        for d in [-90.0, 90.0] {
            dc.push();
            dc.right(d);
            dc.forward(offset);
            dc.rect(pw, ph);
            part.smd_pad(dc, board);
            dc.pop();
        }
        for (i, pad) in part.pads.iter_mut().enumerate() {
            pad.set_name(&(i + 1).to_string());
        }
        dc.new_path();
        dc.rect(sw, sh);
        dc.silk(board);
        dc.new_path();
        debug!("{}: chip {} placed", part.id, self.size.label());
    }
}

// ── Pin headers ──────────────────────────────────────────────────────

/// A single-row through-hole pin header.
#[derive(Debug, Clone)]
pub struct PinHeader {
    pub pins: u32,
    /// Pin-to-pin pitch in millimeters.
    pub pitch: f64,
    /// Drill diameter in millimeters.
    pub drill: f64,
}

impl PinHeader {
    /// Standard 0.1 inch header.
    pub fn sil(pins: u32) -> Self {
        Self {
            pins,
            pitch: inches(0.1),
            drill: 0.8,
        }
    }

    /// 2 mm pitch variant.
    pub fn sil_2mm(pins: u32) -> Self {
        Self {
            pins,
            pitch: 2.0,
            drill: 0.64,
        }
    }
}

impl Footprint for PinHeader {
    fn family(&self) -> char {
        'J'
    }

    fn name(&self) -> String {
        format!("SIL-{}", self.pins)
    }

    fn place(&self, dc: &mut Draw, board: &mut Board, part: &mut PartInstance) {
        dc.forward(((self.pins - 1) as f64 / 2.0) * self.pitch);
        dc.right(180.0);
        for i in 0..self.pins {
            part.pin_pad(dc, board, self.drill);
            if i + 1 < self.pins {
                dc.forward(self.pitch);
            }
        }
        for (i, pad) in part.pads.iter_mut().enumerate() {
            pad.set_name(&(i + 1).to_string());
        }
        dc.new_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerCode;

    #[test]
    fn test_refdes_assignment_is_monotonic_per_family() {
        let mut board = Board::new(50.0, 50.0);
        let r = ChipDiscrete::resistor(ChipSize::I0603, "10k");
        let c = ChipDiscrete::capacitor(ChipSize::I0402, "100n");
        assert_eq!(board.add_part((10.0, 10.0), &r, Side::Top), "R1");
        assert_eq!(board.add_part((20.0, 10.0), &c, Side::Top), "C1");
        assert_eq!(board.add_part((30.0, 10.0), &r, Side::Top), "R2");
        assert_eq!(board.add_part((40.0, 10.0), &c, Side::Top), "C2");
    }

    #[test]
    fn test_chip_discrete_stamps_pad_stack() {
        let mut board = Board::new(50.0, 50.0);
        let r = ChipDiscrete::resistor(ChipSize::I0805, "1k");
        let id = board.add_part((25.0, 25.0), &r, Side::Top);
        // two pads on copper, mask, and paste; one silk outline
        assert_eq!(board.layer(LayerCode::TopCopper).unwrap().shape_count(), 2);
        assert_eq!(board.layer(LayerCode::TopMask).unwrap().shape_count(), 2);
        assert_eq!(board.layer(LayerCode::TopPaste).unwrap().shape_count(), 2);
        assert_eq!(board.layer(LayerCode::TopSilk).unwrap().shape_count(), 1);
        let part = board.find_part(&id).unwrap();
        assert_eq!(part.pads.len(), 2);
        assert_eq!(part.val, "1k");
        assert!(part.bounds.is_some());
    }

    #[test]
    fn test_bottom_side_placement_uses_bottom_layers() {
        let mut board = Board::new(50.0, 50.0);
        let c = ChipDiscrete::capacitor(ChipSize::I0603, "1u");
        board.add_part((25.0, 25.0), &c, Side::Bottom);
        assert_eq!(board.layer(LayerCode::TopCopper).unwrap().shape_count(), 0);
        assert_eq!(board.layer(LayerCode::BottomCopper).unwrap().shape_count(), 2);
        assert_eq!(board.layer(LayerCode::BottomSilk).unwrap().shape_count(), 1);
    }

    #[test]
    fn test_pad_lookup_by_name_and_index() {
        let mut board = Board::new(50.0, 50.0);
        let r = ChipDiscrete::resistor(ChipSize::I0603, "10k");
        let id = board.add_part((25.0, 25.0), &r, Side::Top);
        let part = board.find_part(&id).unwrap();
        let p1 = part.pad("1").unwrap();
        let p2 = part.pad("2").unwrap();
        assert_eq!(p1.part_id(), Some("R1"));
        assert!(p1.distance(p2) > 1.0);
        assert!(part.pad("3").is_none());
    }

    #[test]
    fn test_pads_escape_outward() {
        let mut board = Board::new(50.0, 50.0);
        let r = ChipDiscrete::resistor(ChipSize::I1206, "0R");
        let id = board.add_part((25.0, 25.0), &r, Side::Top);
        let mut pad = board.find_part(&id).unwrap().pad("1").unwrap().clone();
        let before = pad.position();
        pad.outside(&board);
        let after = pad.position();
        // pad 1 sits left of center, so outward is further left
        assert!(after.x < before.x);
    }

    #[test]
    fn test_registry_creates_and_places() {
        let reg = FootprintRegistry::standard();
        let mut board = Board::new(50.0, 50.0);
        let fp = reg.create("R0603", "10k").unwrap();
        let id = board.add_part((10.0, 10.0), fp.as_ref(), Side::Top);
        assert_eq!(id, "R1");
        assert_eq!(board.find_part("R1").unwrap().val, "10k");
        let hdr = reg.create("SIL", "3").unwrap();
        assert_eq!(board.add_part((30.0, 10.0), hdr.as_ref(), Side::Top), "J1");
        assert_eq!(board.find_part("J1").unwrap().pads.len(), 3);
        assert!(reg.create("QFN64", "").is_none());
        assert!(reg.names().contains(&"C0402"));
    }

    #[test]
    fn test_pin_header_drills_and_pads() {
        let mut board = Board::new(50.0, 50.0);
        let j = PinHeader::sil(4);
        let id = board.add_part((25.0, 25.0), &j, Side::Top);
        assert_eq!(id, "J1");
        assert_eq!(board.drills().len(), 4);
        let part = board.find_part(&id).unwrap();
        assert_eq!(part.pads.len(), 4);
        // pads sit one pitch apart
        let d = part.pad("1").unwrap().distance(part.pad("2").unwrap());
        assert!((d - inches(0.1)).abs() < 1e-9);
        // through-hole pads land on both outer copper layers
        assert_eq!(board.layer(LayerCode::TopCopper).unwrap().shape_count(), 4);
        assert_eq!(board.layer(LayerCode::BottomCopper).unwrap().shape_count(), 4);
    }
}
