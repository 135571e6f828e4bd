use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Shape};

/// Identifies one physical layer of the board, Gerber-extension style.
///
/// The variant order is the physical stack order from the top paste stencil
/// down to the bottom paste stencil, so the derived `Ord` sorts a layer map
/// into z-order. Inner copper layers are numbered `GP2`, `GP3`, … as they
/// are inserted between the outer copper pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LayerCode {
    /// Top paste stencil (GTP).
    TopPaste,
    /// Top silkscreen legend (GTO).
    TopSilk,
    /// Top soldermask (GTS).
    TopMask,
    /// Top copper (GTL).
    TopCopper,
    /// Inner copper layer n (GPn), n >= 2.
    Inner(u8),
    /// Bottom copper (GBL).
    BottomCopper,
    /// Bottom soldermask (GBS).
    BottomMask,
    /// Bottom silkscreen legend (GBO).
    BottomSilk,
    /// Bottom paste stencil (GBP).
    BottomPaste,
}

impl LayerCode {
    pub fn is_copper(&self) -> bool {
        matches!(
            self,
            LayerCode::TopCopper | LayerCode::Inner(_) | LayerCode::BottomCopper
        )
    }

    pub fn is_inner(&self) -> bool {
        matches!(self, LayerCode::Inner(_))
    }

    pub fn is_mask(&self) -> bool {
        matches!(self, LayerCode::TopMask | LayerCode::BottomMask)
    }

    pub fn is_silk(&self) -> bool {
        matches!(self, LayerCode::TopSilk | LayerCode::BottomSilk)
    }

    pub fn is_paste(&self) -> bool {
        matches!(self, LayerCode::TopPaste | LayerCode::BottomPaste)
    }

    /// The board side this layer faces, if it is side-specific.
    pub fn side(&self) -> Option<Side> {
        match self {
            LayerCode::TopPaste
            | LayerCode::TopSilk
            | LayerCode::TopMask
            | LayerCode::TopCopper => Some(Side::Top),
            LayerCode::Inner(_) => None,
            _ => Some(Side::Bottom),
        }
    }

    /// The copper layer on the opposite outer face, for through-vias.
    pub fn opposite_copper(&self) -> Option<LayerCode> {
        match self {
            LayerCode::TopCopper => Some(LayerCode::BottomCopper),
            LayerCode::BottomCopper => Some(LayerCode::TopCopper),
            _ => None,
        }
    }
}

impl fmt::Display for LayerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerCode::TopPaste => write!(f, "GTP"),
            LayerCode::TopSilk => write!(f, "GTO"),
            LayerCode::TopMask => write!(f, "GTS"),
            LayerCode::TopCopper => write!(f, "GTL"),
            LayerCode::Inner(n) => write!(f, "GP{}", n),
            LayerCode::BottomCopper => write!(f, "GBL"),
            LayerCode::BottomMask => write!(f, "GBS"),
            LayerCode::BottomSilk => write!(f, "GBO"),
            LayerCode::BottomPaste => write!(f, "GBP"),
        }
    }
}

impl FromStr for LayerCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GTP" => Ok(LayerCode::TopPaste),
            "GTO" => Ok(LayerCode::TopSilk),
            "GTS" => Ok(LayerCode::TopMask),
            "GTL" => Ok(LayerCode::TopCopper),
            "GBL" => Ok(LayerCode::BottomCopper),
            "GBS" => Ok(LayerCode::BottomMask),
            "GBO" => Ok(LayerCode::BottomSilk),
            "GBP" => Ok(LayerCode::BottomPaste),
            _ => {
                if let Some(n) = s.strip_prefix("GP") {
                    n.parse::<u8>()
                        .map(LayerCode::Inner)
                        .map_err(|_| format!("unknown layer code {:?}", s))
                } else {
                    Err(format!("unknown layer code {:?}", s))
                }
            }
        }
    }
}

/// Which face of the board a cursor or part is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub fn copper(&self) -> LayerCode {
        match self {
            Side::Top => LayerCode::TopCopper,
            Side::Bottom => LayerCode::BottomCopper,
        }
    }

    pub fn mask(&self) -> LayerCode {
        match self {
            Side::Top => LayerCode::TopMask,
            Side::Bottom => LayerCode::BottomMask,
        }
    }

    pub fn silk(&self) -> LayerCode {
        match self {
            Side::Top => LayerCode::TopSilk,
            Side::Bottom => LayerCode::BottomSilk,
        }
    }

    pub fn paste(&self) -> LayerCode {
        match self {
            Side::Top => LayerCode::TopPaste,
            Side::Bottom => LayerCode::BottomPaste,
        }
    }
}

/// One physical layer: an ordered accumulation of shapes, a list of
/// net-owned ("named") shapes that participate in clearance isolation, and
/// a lazily merged preview.
///
/// Mutators all funnel through [`Layer::invalidate`], which is what keeps
/// the preview cache from ever being read stale.
#[derive(Debug, Clone)]
pub struct Layer {
    pub code: LayerCode,
    pub desc: String,
    /// Gerber file-function attribute, e.g. `Copper,L1,Top`.
    pub function: String,
    pub z_order: u32,
    /// Generic geometry: silk, mechanical marks, unpowered copper.
    shapes: Vec<Shape>,
    /// Net-owned geometry, isolated from other owners in the preview.
    named: Vec<(String, Shape)>,
    /// Via discs tagged with a net, for downstream thermal reasoning.
    pub connected: Vec<Shape>,
    /// Regions where fill on this layer must not be placed.
    pub keepouts: Vec<Shape>,
    /// Result of a net pour, kept apart from the add lists.
    fill: Option<(String, Shape)>,
    /// Merged preview keyed by the clearance it was computed with.
    cache: Option<(f64, Shape)>,
}

impl Layer {
    pub fn new(code: LayerCode) -> Self {
        Self {
            code,
            desc: String::new(),
            function: String::new(),
            z_order: 0,
            shapes: Vec::new(),
            named: Vec::new(),
            connected: Vec::new(),
            keepouts: Vec::new(),
            fill: None,
            cache: None,
        }
    }

    pub fn is_copper(&self) -> bool {
        self.code.is_copper()
    }

    /// Append generic geometry. Empty shapes are accepted and dropped.
    pub fn add(&mut self, shape: Shape) {
        if geometry::is_empty(&shape) {
            return;
        }
        self.shapes.push(shape);
        self.invalidate();
    }

    /// Append net-owned geometry that must keep clearance from other nets.
    pub fn add_named(&mut self, shape: Shape, owner: &str) {
        if geometry::is_empty(&shape) {
            return;
        }
        self.named.push((owner.to_string(), shape));
        self.invalidate();
    }

    pub fn add_keepout(&mut self, shape: Shape) {
        self.keepouts.push(shape);
        self.invalidate();
    }

    pub fn add_connected(&mut self, shape: Shape) {
        self.connected.push(shape);
    }

    /// Drop the cached preview. Every mutator calls this.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len() + self.named.len()
    }

    /// Distinct net owners present among the named shapes.
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = self.named.iter().map(|(n, _)| n.as_str()).collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    /// Count of named shapes per owner, for stack reports.
    pub fn net_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for (owner, _) in &self.named {
            match counts.iter_mut().find(|(n, _)| n == owner) {
                Some((_, c)) => *c += 1,
                None => counts.push((owner.clone(), 1)),
            }
        }
        counts
    }

    /// The merged layer image.
    ///
    /// Unnamed geometry is unioned as-is. Each named owner's geometry is
    /// reduced by `clearance` against the union of every *other* owner's
    /// geometry and by all keepouts (this layer's plus the board-wide set
    /// passed in), then unioned in, together with any stored pour. The
    /// result is cached until the next mutation or a call with a different
    /// clearance.
    pub fn preview(&mut self, clearance: f64, board_keepouts: &[Shape]) -> Shape {
        if let Some((c, cached)) = &self.cache {
            if *c == clearance {
                return cached.clone();
            }
        }
        let mut merged = geometry::union_all(self.shapes.iter());
        if !self.named.is_empty() {
            // Owner-by-owner isolation only runs when a net owner exists.
            let keepout = geometry::union_all(
                self.keepouts.iter().chain(board_keepouts.iter()),
            );
            for owner in self.owners() {
                let own = geometry::union_all(
                    self.named
                        .iter()
                        .filter(|(n, _)| n == owner)
                        .map(|(_, s)| s),
                );
                let others = geometry::union_all(
                    self.named
                        .iter()
                        .filter(|(n, _)| n != owner)
                        .map(|(_, s)| s),
                );
                let mut iso = geometry::isolated(&own, &others, clearance);
                if !geometry::is_empty(&keepout) {
                    iso = geometry::subtract(&iso, &keepout);
                }
                merged = geometry::unite(&merged, &iso);
            }
        }
        if let Some((_, pour)) = &self.fill {
            merged = geometry::unite(&merged, pour);
        }
        self.cache = Some((clearance, merged.clone()));
        merged
    }

    /// Compute and store a net pour: `background` plus this layer's shapes
    /// already owned by `keep`, minus everything else buffered outward by
    /// `clearance`.
    pub fn fill(&mut self, background: &Shape, keep: &str, clearance: f64) {
        let own = geometry::union_all(
            std::iter::once(background).chain(
                self.named
                    .iter()
                    .filter(|(n, _)| n == keep)
                    .map(|(_, s)| s),
            ),
        );
        let others = geometry::union_all(
            self.shapes.iter().chain(
                self.named
                    .iter()
                    .filter(|(n, _)| n != keep)
                    .map(|(_, s)| s),
            ),
        );
        let pour = geometry::isolated(&own, &others, clearance);
        self.fill = Some((keep.to_string(), pour));
        self.invalidate();
    }

    /// The stored pour, if a fill has been run on this layer.
    pub fn fill_shape(&self) -> Option<(&str, &Shape)> {
        self.fill.as_ref().map(|(n, s)| (n.as_str(), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{area, disc, pt, rect, touches};

    #[test]
    fn test_layer_code_roundtrip() {
        for code in [
            LayerCode::TopPaste,
            LayerCode::TopCopper,
            LayerCode::Inner(2),
            LayerCode::Inner(3),
            LayerCode::BottomPaste,
        ] {
            let s = code.to_string();
            assert_eq!(s.parse::<LayerCode>().unwrap(), code);
        }
        assert!("GXX".parse::<LayerCode>().is_err());
    }

    #[test]
    fn test_stack_ordering() {
        assert!(LayerCode::TopCopper < LayerCode::Inner(2));
        assert!(LayerCode::Inner(2) < LayerCode::Inner(3));
        assert!(LayerCode::Inner(9) < LayerCode::BottomCopper);
        assert!(LayerCode::TopPaste < LayerCode::TopCopper);
    }

    #[test]
    fn test_preview_idempotent() {
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add(rect(0.0, 0.0, 5.0, 5.0));
        layer.add_named(rect(10.0, 0.0, 15.0, 5.0), "GND");
        let a = layer.preview(0.2, &[]);
        let b = layer.preview(0.2, &[]);
        assert!((area(&a) - area(&b)).abs() < 1e-12);
        assert_eq!(a.0.len(), b.0.len());
    }

    #[test]
    fn test_preview_recomputed_on_clearance_change() {
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add_named(rect(0.0, 0.0, 10.0, 2.0), "GND");
        layer.add_named(rect(4.0, 0.5, 6.0, 1.5), "VCC");
        let tight = layer.preview(0.2, &[]);
        let wide = layer.preview(1.0, &[]);
        // A wider clearance carves more out of both nets.
        assert!(area(&wide) < area(&tight));
    }

    #[test]
    fn test_preview_invalidated_by_add() {
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add(rect(0.0, 0.0, 5.0, 5.0));
        let a = layer.preview(0.2, &[]);
        layer.add(rect(20.0, 0.0, 25.0, 5.0));
        let b = layer.preview(0.2, &[]);
        assert!(area(&b) > area(&a) + 1.0);
    }

    #[test]
    fn test_net_isolation_clearance() {
        let clearance = 0.5;
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add_named(rect(0.0, 0.0, 10.0, 2.0), "GND");
        layer.add_named(rect(4.0, 0.5, 6.0, 1.5), "VCC");
        let merged = layer.preview(clearance, &[]);
        // Regions of both nets survive, and the GND side keeps its distance:
        // growing VCC by just under the clearance must still miss GND.
        let vcc = rect(4.0, 0.5, 6.0, 1.5);
        let vcc_grown = geometry::buffer(&vcc, clearance - 0.01);
        let gnd_only = geometry::subtract(&merged, &geometry::buffer(&vcc, 0.01));
        assert!(!touches(&gnd_only, &vcc_grown));
    }

    #[test]
    fn test_unnamed_only_layer_skips_isolation() {
        let mut layer = Layer::new(LayerCode::TopSilk);
        layer.add(disc(pt(1.0, 1.0), 0.5));
        layer.add(disc(pt(5.0, 5.0), 0.5));
        let merged = layer.preview(0.2, &[]);
        assert_eq!(merged.0.len(), 2);
    }

    #[test]
    fn test_keepout_subtracted_from_named() {
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add_named(rect(0.0, 0.0, 10.0, 10.0), "GND");
        layer.add_keepout(rect(4.0, 4.0, 6.0, 6.0));
        let merged = layer.preview(0.2, &[]);
        assert!((area(&merged) - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_fill_avoids_other_net() {
        let clearance = 0.5;
        let mut layer = Layer::new(LayerCode::TopCopper);
        layer.add_named(rect(4.0, 4.0, 6.0, 6.0), "VCC");
        let background = rect(0.0, 0.0, 10.0, 10.0);
        layer.fill(&background, "GND", clearance);
        let (net, pour) = layer.fill_shape().unwrap();
        assert_eq!(net, "GND");
        // Pour stays clear of the VCC island plus clearance.
        let vcc_grown = geometry::buffer(&rect(4.0, 4.0, 6.0, 6.0), clearance - 0.01);
        assert!(!touches(pour, &vcc_grown));
        assert!(area(pour) > 10.0 * 10.0 - 3.0 * 3.0 - 1.0);
    }
}
