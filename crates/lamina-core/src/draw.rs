use geo::Coord;
use thiserror::Error;

use crate::board::{Board, PadRef};
use crate::geometry::{self, Shape};
use crate::layer::{LayerCode, Side};

/// Errors from the turtle command-string interpreter.
///
/// These indicate script bugs and abort the macro at the offending token;
/// everything executed before it has already been applied.
#[derive(Debug, Error)]
pub enum TurtleError {
    #[error("unknown turtle opcode {0:?}")]
    UnknownOpcode(String),
    #[error("opcode {0:?} is missing its argument")]
    MissingArgument(&'static str),
    #[error("bad numeric argument {1:?} for opcode {0:?}")]
    BadNumber(&'static str, String),
    #[error("unknown layer {0:?}")]
    UnknownLayer(String),
    #[error("unknown pad reference {0:?}")]
    UnknownPad(String),
}

const DIR_EPS: f64 = 1e-4;

/// A turtle-style drawing cursor: position, compass heading (0° = board
/// "up", clockwise positive), an accumulated path, and a save/restore
/// stack.
///
/// A `Draw` is a plain value; primitives that emit geometry take the owning
/// [`Board`] explicitly, so any number of cursors can work against the same
/// board canvas in sequence.
///
/// Cursors bound to the bottom side see `left`/`right` and the lateral
/// component of `goxy` mirrored, because the bottom of the board is viewed
/// flipped. That inversion lives in [`Draw::turn`] and [`Draw::goxy`] and
/// nowhere else.
#[derive(Debug, Clone)]
pub struct Draw {
    pub(crate) xy: Coord<f64>,
    pub(crate) dir: f64,
    pub(crate) path: Vec<Coord<f64>>,
    stack: Vec<(Coord<f64>, f64, f64)>,
    pub(crate) width: f64,
    pub(crate) layer: LayerCode,
    pub(crate) name: Option<String>,
    pub(crate) part: Option<String>,
    pub(crate) side: Side,
    /// Height/width of the most recent `rect`, for pad-escape direction.
    rect_h: Option<f64>,
    rect_w: Option<f64>,
    /// Total length of wire committed through this cursor.
    pub(crate) length: f64,
}

impl Draw {
    pub fn new(xy: Coord<f64>, dir: f64, side: Side, width: f64) -> Self {
        Self {
            xy,
            dir: dir.rem_euclid(360.0),
            path: vec![xy],
            stack: Vec::new(),
            width,
            layer: side.copper(),
            name: None,
            part: None,
            side,
            rect_h: None,
            rect_w: None,
            length: 0.0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn position(&self) -> Coord<f64> {
        self.xy
    }

    pub fn heading(&self) -> f64 {
        self.dir
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn layer(&self) -> LayerCode {
        self.layer
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn part_id(&self) -> Option<&str> {
        self.part.as_deref()
    }

    pub fn path(&self) -> &[Coord<f64>] {
        &self.path
    }

    pub fn wired_length(&self) -> f64 {
        self.length
    }

    pub(crate) fn pad_ref(&self) -> PadRef {
        PadRef {
            part: self.part.clone(),
            pad: self.name.clone(),
        }
    }

    // ── State setters (chainable) ────────────────────────────────────

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn set_width(&mut self, width: f64) -> &mut Self {
        self.width = width;
        self
    }

    pub fn set_layer(&mut self, layer: LayerCode) -> &mut Self {
        self.layer = layer;
        self
    }

    pub fn set_part(&mut self, id: &str) -> &mut Self {
        self.part = Some(id.to_string());
        self
    }

    /// Restart the path accumulator at the current position.
    pub fn new_path(&mut self) -> &mut Self {
        self.path.clear();
        self.path.push(self.xy);
        self
    }

    /// Snapshot position, heading, and width.
    pub fn push(&mut self) -> &mut Self {
        self.stack.push((self.xy, self.dir, self.width));
        self
    }

    /// Restore the matching `push`. Unbalanced use is a script bug.
    pub fn pop(&mut self) -> &mut Self {
        let (xy, dir, width) = self
            .stack
            .pop()
            .expect("Draw::pop without matching push");
        self.xy = xy;
        self.dir = dir;
        self.width = width;
        self
    }

    /// A copy of this cursor with a fresh path accumulator. Position,
    /// heading, width, layer, net name, and owning part carry over.
    pub fn fork(&self) -> Draw {
        let mut forked = self.clone();
        forked.stack.clear();
        forked.length = 0.0;
        forked.new_path();
        forked
    }

    // ── Movement ─────────────────────────────────────────────────────

    fn mirror_sign(&self) -> f64 {
        match self.side {
            Side::Top => 1.0,
            Side::Bottom => -1.0,
        }
    }

    /// The single place where the bottom-side mirroring of turns applies.
    fn turn(&mut self, clockwise: f64) {
        self.dir = (self.dir + self.mirror_sign() * clockwise).rem_euclid(360.0);
    }

    pub fn forward(&mut self, d: f64) -> &mut Self {
        let a = self.dir.to_radians();
        self.xy = geometry::pt(self.xy.x + d * a.sin(), self.xy.y + d * a.cos());
        self.path.push(self.xy);
        self
    }

    pub fn right(&mut self, angle: f64) -> &mut Self {
        self.turn(angle);
        self
    }

    pub fn left(&mut self, angle: f64) -> &mut Self {
        self.turn(-angle);
        self
    }

    /// Offset of `other` in this cursor's frame: `(lateral, ahead)`.
    pub fn seek(&self, other: &Draw) -> (f64, f64) {
        let dx = other.xy.x - self.xy.x;
        let dy = other.xy.y - self.xy.y;
        let a = self.dir.to_radians();
        let (s, c) = (a.sin(), a.cos());
        (dx * c - dy * s, dy * c + dx * s)
    }

    /// Move laterally by `x` and ahead by `y` in the cursor frame. The
    /// lateral component mirrors on the bottom side.
    pub fn goxy(&mut self, x: f64, y: f64) -> &mut Self {
        let x = self.mirror_sign() * x;
        self.right(90.0);
        self.forward(x);
        self.left(90.0);
        self.forward(y);
        self
    }

    pub fn goto(&mut self, other: &Draw) -> &mut Self {
        let (x, y) = self.seek(other);
        self.goxy(x, y)
    }

    /// Advance until exactly `d` away from the infinite line along
    /// `other`'s heading. The two headings must be perpendicular.
    pub fn approach(&mut self, d: f64, other: &Draw) -> &mut Self {
        let rel = (self.dir - other.dir).rem_euclid(360.0);
        assert!(
            (rel - 90.0).abs() < DIR_EPS || (rel - 270.0).abs() < DIR_EPS,
            "approach requires perpendicular headings (got {:.3} deg)",
            rel
        );
        let (x0, y0) = (self.xy.x, self.xy.y);
        let (x1, y1) = (other.xy.x, other.xy.y);
        let mut ahead = other.clone();
        ahead.forward(1.0);
        let (x2, y2) = (ahead.xy.x, ahead.xy.y);
        let dist = ((y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1).abs();
        self.forward(dist - d)
    }

    /// Whether `other` lies ahead of this cursor. Headings must match.
    pub fn is_behind(&self, other: &Draw) -> bool {
        let rel = (self.dir - other.dir).rem_euclid(360.0);
        assert!(
            rel < DIR_EPS || (360.0 - rel) < DIR_EPS,
            "is_behind requires equal headings (got {:.3} deg apart)",
            rel
        );
        self.seek(other).1 > 0.0
    }

    pub fn distance(&self, other: &Draw) -> f64 {
        let dx = other.xy.x - self.xy.x;
        let dy = other.xy.y - self.xy.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Bearing from this cursor to `other`, in radians, compass-style.
    pub fn direction(&self, other: &Draw) -> f64 {
        let dx = other.xy.x - self.xy.x;
        let dy = other.xy.y - self.xy.y;
        dx.atan2(dy)
    }

    // ── Path construction ────────────────────────────────────────────

    /// Walk a `w` x `h` rectangle centered on the current position and
    /// heading, leaving the boundary in the path accumulator. The extents
    /// are remembered for later `inside`/`outside` escapes.
    pub fn rect(&mut self, w: f64, h: f64) -> &mut Self {
        self.push();
        self.forward(h / 2.0);
        self.right(90.0);
        self.forward(w / 2.0);
        self.new_path();
        self.right(90.0);
        self.forward(h);
        self.right(90.0);
        self.forward(w);
        self.right(90.0);
        self.forward(h);
        self.right(90.0);
        self.forward(w);
        self.pop();
        self.rect_h = Some(h);
        self.rect_w = Some(w);
        self
    }

    pub fn square(&mut self, s: f64) -> &mut Self {
        self.rect(s, s)
    }

    /// Walk a regular n-gon approximating a circle of radius `r`.
    pub fn n_agon(&mut self, r: f64, n: u32) -> &mut Self {
        let exterior_angle = 360.0 / n as f64;
        let half_edge = r * (std::f64::consts::PI / n as f64).tan();
        self.push();
        self.forward(r);
        self.right(90.0);
        self.new_path();
        for _ in 0..n {
            self.forward(half_edge);
            self.right(exterior_angle);
            self.forward(half_edge);
        }
        self.pop();
        self.rect_h = Some(2.0 * r);
        self.rect_w = Some(2.0 * r);
        self
    }

    /// Four-armed thermal-relief walk used under large pads.
    pub fn thermal(&mut self, d: f64) -> &mut Self {
        for _ in 0..4 {
            self.forward(d);
            self.right(180.0);
            self.forward(d);
            self.right(90.0);
        }
        self
    }

    /// Close the accumulated path into a polygon.
    pub fn poly(&self) -> Shape {
        geometry::polygon(&self.path)
    }

    // ── Escape direction helpers ─────────────────────────────────────

    /// Outward bearing away from the owning part's bounds, if the nearest
    /// edge is unambiguous.
    fn outward_bearing(&self, board: &Board) -> Option<f64> {
        let id = self.part.as_deref()?;
        let bounds = board.find_part(id)?.bounds?;
        let (min, max) = (bounds.min(), bounds.max());
        let edges = [
            (self.xy.y - min.y, 180.0), // below
            (max.y - self.xy.y, 0.0),   // above
            (self.xy.x - min.x, 270.0), // left
            (max.x - self.xy.x, 90.0),  // right
        ];
        let nearest = edges
            .iter()
            .cloned()
            .fold(edges[0], |best, e| if e.0 < best.0 { e } else { best });
        let ties = edges.iter().filter(|e| (e.0 - nearest.0).abs() < 1e-9).count();
        if ties > 1 {
            None
        } else {
            Some(nearest.1)
        }
    }

    /// Point toward the interior of the owning part and step off the pad.
    pub fn inside(&mut self, board: &Board) -> &mut Self {
        match self.outward_bearing(board) {
            Some(bearing) => self.dir = (bearing + 180.0).rem_euclid(360.0),
            None => {
                self.right(180.0);
            }
        }
        let h = self.rect_h.unwrap_or(0.0);
        self.forward(h / 2.0)
    }

    /// Point away from the owning part and step off the pad.
    pub fn outside(&mut self, board: &Board) -> &mut Self {
        if let Some(bearing) = self.outward_bearing(board) {
            self.dir = bearing;
        }
        let h = self.rect_h.unwrap_or(0.0);
        self.forward(h / 2.0)
    }

    // ── Geometry emission ────────────────────────────────────────────

    /// Commit the accumulated path as a trace on the current layer. Paths
    /// with fewer than two points are left untouched (no-op).
    pub fn wire(&mut self, board: &mut Board) -> &mut Self {
        if self.path.len() > 1 {
            self.length += geometry::path_length(&self.path);
            let g = geometry::stroke(&self.path, self.width);
            board.layer_add(self.layer, g, self.name.as_deref());
            self.new_path();
        }
        self
    }

    pub fn wire_with(
        &mut self,
        board: &mut Board,
        layer: Option<LayerCode>,
        width: Option<f64>,
    ) -> &mut Self {
        if let Some(layer) = layer {
            self.layer = layer;
        }
        if let Some(width) = width {
            self.width = width;
        }
        self.wire(board)
    }

    /// Extend the path to `other`'s position and commit the wire.
    pub fn meet(&mut self, other: &Draw, board: &mut Board) -> &mut Self {
        self.path.push(other.xy);
        self.xy = other.xy;
        self.wire(board)
    }

    /// Stamp a through-via at the current position: an annulus on every
    /// copper layer, a drill hit, and (policy permitting) soldermask
    /// relief. `net` tags the copper so pours may connect to it.
    pub fn via(&mut self, board: &mut Board, net: Option<&str>) -> &mut Self {
        let radius = board.rules().via_pad_radius();
        let g = geometry::disc(self.xy, radius);
        for code in board.copper_codes() {
            board.layer_add(code, g.clone(), net);
        }
        if net.is_some() {
            board.layer_connect(self.layer, g.clone());
        }
        let drill = board.rules().via_drill;
        board.add_drill((self.xy.x, self.xy.y), drill);
        if board.rules().mask_vias {
            let relief = geometry::disc(self.xy, radius + board.rules().soldermask_margin);
            board.layer_add(LayerCode::TopMask, relief.clone(), None);
            board.layer_add(LayerCode::BottomMask, relief, None);
        }
        self.new_path();
        self
    }

    /// Commit the wire, drop a via, and continue on `dest`.
    pub fn via_to(&mut self, board: &mut Board, dest: LayerCode) -> &mut Self {
        self.wire(board);
        let net = self.name.clone();
        self.via(board, net.as_deref());
        self.set_layer(dest)
    }

    /// Via to the opposite outer copper layer.
    pub fn through(&mut self, board: &mut Board) -> &mut Self {
        let dest = self
            .layer
            .opposite_copper()
            .expect("through requires an outer copper layer");
        self.via_to(board, dest)
    }

    /// Short jog and via over to `dest`, in the via track width.
    pub fn wvia(&mut self, board: &mut Board, dest: LayerCode) -> &mut Self {
        let hop = board.rules().clearance + board.rules().via_drill;
        let track = board.rules().via_track_width;
        self.forward(hop);
        self.wire_with(board, Some(dest), Some(track));
        let net = self.name.clone();
        self.via(board, net.as_deref());
        self
    }

    /// Fan out three stub traces with vias, for power-pad escapes.
    pub fn fan(&mut self, board: &mut Board, l: f64, net: Option<&str>) -> &mut Self {
        for a in [-45.0, 0.0, 45.0] {
            let mut t = self.fork();
            t.right(a);
            t.forward(l);
            t.wire_with(board, None, Some(0.8));
            t.via(board, net);
        }
        self
    }

    /// Stroke the accumulated path onto this side's silkscreen.
    pub fn silk(&mut self, board: &mut Board) -> &mut Self {
        let g = geometry::stroke(&self.path, board.rules().silk_width);
        board.layer_add(self.side.silk(), g, None);
        self
    }

    /// Stroke the path as a closed ring on this side's silkscreen.
    pub fn silko(&mut self, board: &mut Board) -> &mut Self {
        let g = geometry::ring_stroke(&self.path, board.rules().silk_width);
        board.layer_add(self.side.silk(), g, None);
        self
    }

    /// Small silkscreen position marker.
    pub fn mark(&mut self, board: &mut Board) -> &mut Self {
        board.layer_add(LayerCode::TopSilk, geometry::disc(self.xy, 0.2), None);
        self.push();
        self.new_path();
        self.forward(0.3);
        self.silk(board);
        self.pop();
        self.new_path();
        self
    }

    /// Record the accumulated path as a board outline ring.
    pub fn outline(&mut self, board: &mut Board) -> &mut Self {
        board.outline_ring(self.path.clone());
        self
    }

    /// Register a drill hit at the current position.
    pub fn drill(&mut self, board: &mut Board, diameter: f64) -> &mut Self {
        board.add_drill((self.xy.x, self.xy.y), diameter);
        self
    }

    // ── Turtle macro interpreter ─────────────────────────────────────

    /// Execute a turtle command string against the board.
    ///
    /// Grammar: whitespace-separated tokens, left to right. `f`, `l`, `r`
    /// take one numeric argument (`f 3` or the fused form `F3`); `i`/`o`
    /// pick the pad-escape direction; `.` commits the wire and drops a via
    /// to the layer named by the next token; `>` wires straight to the pad
    /// named `REF-PAD` by the next token.
    pub fn turtle(&mut self, board: &mut Board, commands: &str) -> Result<&mut Self, TurtleError> {
        let tokens = tokenize(commands)?;
        let mut it = tokens.iter();
        while let Some(tok) = it.next() {
            match tok.as_str() {
                "f" | "l" | "r" => {
                    let op: &'static str = match tok.as_str() {
                        "f" => "f",
                        "l" => "l",
                        _ => "r",
                    };
                    let arg = it.next().ok_or(TurtleError::MissingArgument(op))?;
                    let v: f64 = arg
                        .parse()
                        .map_err(|_| TurtleError::BadNumber(op, arg.clone()))?;
                    match op {
                        "f" => self.forward(v),
                        "l" => self.left(v),
                        _ => self.right(v),
                    };
                }
                "i" => {
                    self.inside(board);
                }
                "o" => {
                    self.outside(board);
                }
                "." => {
                    let arg = it.next().ok_or(TurtleError::MissingArgument("."))?;
                    let dest: LayerCode = arg
                        .parse()
                        .map_err(|_| TurtleError::UnknownLayer(arg.clone()))?;
                    self.via_to(board, dest);
                }
                ">" => {
                    let arg = it.next().ok_or(TurtleError::MissingArgument(">"))?;
                    self.jump_to_pad(board, arg)?;
                }
                other => return Err(TurtleError::UnknownOpcode(other.to_string())),
            }
        }
        Ok(self)
    }

    /// Wire a straight connection to another part's pad, `"REF-PAD"` form.
    fn jump_to_pad(&mut self, board: &mut Board, reference: &str) -> Result<(), TurtleError> {
        let (part_id, pad_sel) = reference
            .rsplit_once('-')
            .ok_or_else(|| TurtleError::UnknownPad(reference.to_string()))?;
        let pad = board
            .find_part(part_id)
            .and_then(|p| p.pad(pad_sel))
            .ok_or_else(|| TurtleError::UnknownPad(reference.to_string()))?;
        let target = pad.position();
        let record = (self.pad_ref(), pad.pad_ref());
        self.path.push(target);
        self.xy = target;
        self.wire(board);
        board.add_net_pair(record.0, record.1);
        Ok(())
    }
}

/// Split a macro string into atomic tokens, breaking fused opcode+number
/// tokens (`R90`, `f2.5`) apart. Fused opcode letters are case-insensitive.
fn tokenize(commands: &str) -> Result<Vec<String>, TurtleError> {
    let mut out = Vec::new();
    for raw in commands.split_whitespace() {
        let lower = raw.to_ascii_lowercase();
        if lower.len() > 1 {
            let (op, rest) = lower.split_at(1);
            if matches!(op, "f" | "l" | "r") && rest.parse::<f64>().is_ok() {
                out.push(op.to_string());
                out.push(rest.to_string());
                continue;
            }
        }
        if lower.len() == 1 && lower.chars().all(|c| c.is_ascii_alphabetic()) {
            out.push(lower);
        } else {
            out.push(raw.to_string());
        }
    }
    Ok(out)
}
