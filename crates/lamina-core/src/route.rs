//! Bus routing. A [`Route`] ("river") is a bank of parallel cursors at the
//! channel pitch that bend, sidestep, merge, and change layers as one unit.

use crate::board::{extend, Board};
use crate::draw::Draw;
use crate::geometry;
use crate::layer::LayerCode;

/// A bank of parallel traces moving together at a fixed channel pitch.
#[derive(Debug, Clone)]
pub struct Route {
    tt: Vec<Draw>,
    channel: f64,
}

impl Route {
    pub(crate) fn new(channel: f64, tt: Vec<Draw>) -> Self {
        Self { tt, channel }
    }

    pub fn len(&self) -> usize {
        self.tt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tt.is_empty()
    }

    pub fn members(&self) -> &[Draw] {
        &self.tt
    }

    pub fn into_members(self) -> Vec<Draw> {
        self.tt
    }

    /// Full width of the bank, outer trace to outer trace.
    pub fn r(&self) -> f64 {
        self.channel * (self.tt.len() - 1) as f64
    }

    pub fn forward(&mut self, d: f64) -> &mut Self {
        for t in &mut self.tt {
            t.forward(d);
        }
        self
    }

    /// Rotate every cursor position about the first member by `a` radians.
    fn rpivot(&mut self, a: f64) {
        let (s, c) = a.sin_cos();
        let p0 = self.tt[0].xy;
        for t in &mut self.tt {
            let x = t.xy.x - p0.x;
            let y = t.xy.y - p0.y;
            t.xy = geometry::pt(p0.x + x * c - y * s, p0.y + y * c + x * s);
            t.path.push(t.xy);
        }
    }

    /// Rotate every cursor position about the last member by `a` radians.
    fn lpivot(&mut self, a: f64) {
        let (s, c) = a.sin_cos();
        let p0 = self.tt[self.tt.len() - 1].xy;
        for t in &mut self.tt {
            let x = t.xy.x - p0.x;
            let y = t.xy.y - p0.y;
            t.xy = geometry::pt(p0.x + x * c - y * s, p0.y + y * c + x * s);
            t.path.push(t.xy);
        }
    }

    /// Turn the whole bank clockwise. The turn is substepped about one
    /// degree per pivot so the inner traces sweep smooth arcs, and every
    /// heading snaps to the exact final bearing afterwards.
    pub fn right(&mut self, a: f64) -> &mut Self {
        if a < 0.0 {
            return self.left(-a);
        }
        let fd = (self.tt[0].dir + a).rem_euclid(360.0);
        let n = (a as i64 + 1).max(1);
        let ra = a.to_radians();
        for _ in 0..n {
            self.rpivot(-ra / n as f64);
        }
        for t in &mut self.tt {
            t.dir = fd;
        }
        self
    }

    pub fn left(&mut self, a: f64) -> &mut Self {
        if a < 0.0 {
            return self.right(-a);
        }
        let fd = (self.tt[0].dir - a).rem_euclid(360.0);
        let n = (a as i64 + 1).max(1);
        let ra = a.to_radians();
        for _ in 0..n {
            self.lpivot(ra / n as f64);
        }
        for t in &mut self.tt {
            t.dir = fd;
        }
        self
    }

    /// Sidestep the bank laterally by `d` without changing its heading.
    /// Positive `d` steps to the left. Offsets wider than the bank take a
    /// 90 degree dogleg; narrower ones use the shallowest angle that fits.
    pub fn shimmy(&mut self, d: f64) -> &mut Self {
        if d == 0.0 {
            return self;
        }
        let r = self.r();
        let (a, f) = if d.abs() > r {
            (90.0, d.abs() - r)
        } else {
            ((1.0 - d.abs() / r).acos().to_degrees(), 0.0)
        };
        if d > 0.0 {
            self.left(a);
            self.forward(f);
            self.right(a);
        } else {
            self.right(a);
            self.forward(f);
            self.left(a);
        }
        self
    }

    /// Widen the pitch by `d` per gap, fanning the bank apart.
    pub fn spread(&mut self, d: f64) -> &mut Self {
        let c = self.channel;
        let n = self.tt.len() - 1;
        for (i, t) in self.tt.iter_mut().rev().enumerate() {
            let i_ = (n - i) as f64;
            t.forward(c * i as f64);
            t.left(90.0);
            t.forward(i_ * d);
            t.right(90.0);
            t.forward(c * i_);
        }
        self
    }

    /// Merge two parallel rivers into one. `ratio` splits the lateral
    /// correction between the banks: 0 moves only `other`, 1 only `self`.
    /// The slower bank is extended so both arrive level.
    pub fn join(mut self, mut other: Route, ratio: f64) -> Route {
        assert!((0.0..=1.0).contains(&ratio), "join ratio must be in 0..=1");
        let st = self.tt[self.tt.len() - 1].clone();
        let ot = other.tt[0].clone();

        let (x0, y0) = (ot.xy.x, ot.xy.y);
        let (x1, y1) = (st.xy.x, st.xy.y);
        let mut s2 = st.clone();
        s2.forward(1.0);
        let (x2, y2) = (s2.xy.x, s2.xy.y);
        let mut d = (y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1;
        if d < 0.0 {
            d += self.channel;
        } else {
            d -= self.channel;
        }
        self.shimmy(ratio * -d);
        other.shimmy((1.0 - ratio) * d);

        let st = self.tt[self.tt.len() - 1].clone();
        let ot = other.tt[0].clone();
        if st.is_behind(&ot) {
            extend(&ot, &mut self.tt);
        } else {
            extend(&st, &mut other.tt);
        }
        let mut tt = self.tt;
        tt.extend(other.tt);
        Route::new(self.channel, tt)
    }

    /// Turn toward `other`, line up against it, run the gap, and commit
    /// the wires. The pairwise pad connections are recorded as nets.
    pub fn meet(&mut self, other: &Route, board: &mut Board) {
        let tu = ((other.tt[0].dir + 180.0) - self.tt[0].dir).rem_euclid(360.0);
        if tu < 180.0 {
            self.right(tu);
        } else {
            self.left(360.0 - tu);
        }
        let far = &other.tt[other.tt.len() - 1];
        let (x, _) = self.tt[0].seek(far);
        self.shimmy(-x);
        let d = self.tt[0].distance(&other.tt[other.tt.len() - 1]);
        self.forward(d);
        self.wire(board);
        for (a, b) in self.tt.iter().zip(other.tt.iter().rev()) {
            board.add_net_pair(a.pad_ref(), b.pad_ref());
        }
    }

    /// Split off the first `n` members into their own river.
    pub fn split(self, n: usize) -> (Route, Route) {
        let mut head = self.tt;
        let tail = head.split_off(n);
        (
            Route::new(self.channel, head),
            Route::new(self.channel, tail),
        )
    }

    pub fn wire(&mut self, board: &mut Board) -> &mut Self {
        for t in &mut self.tt {
            t.wire(board);
        }
        self
    }

    pub fn wire_with(
        &mut self,
        board: &mut Board,
        layer: Option<LayerCode>,
        width: Option<f64>,
    ) -> &mut Self {
        for t in &mut self.tt {
            t.wire_with(board, layer, width);
        }
        self
    }

    /// Take the whole river to the opposite outer copper layer through a
    /// staggered field of vias, preserving order and pitch.
    pub fn through(&mut self, board: &mut Board) -> &mut Self {
        let drc = board.rules();
        let h = drc.via_drill + drc.clearance;
        let th = (self.channel / h).acos();
        let d = drc.via_drill / 2.0 + drc.clearance;
        let a = h * th.sin();
        let th_d = th.to_degrees();
        let dst = self.tt[0]
            .layer
            .opposite_copper()
            .expect("through requires an outer copper layer");

        self.forward(d);
        let n = self.tt.len();
        for (i, t) in self.tt.iter_mut().enumerate() {
            t.forward(i as f64 * a);
            t.right(th_d);
            t.forward(d);
            t.wire(board);
            t.via(board, None);
            t.set_layer(dst);
            t.forward(d);
            t.left(th_d);
            t.forward((n - 1 - i) as f64 * a);
        }
        self.forward(d);
        self.wire(board);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerCode;

    fn two_wide(board: &Board, x: f64, y: f64) -> Route {
        // Leader on the east, second member one channel to the west.
        let c = board.drc.channel();
        Route::new(
            c,
            vec![board.draw((x, y), 0.0), board.draw((x - c, y), 0.0)],
        )
    }

    #[test]
    fn test_forward_moves_all_members() {
        let board = Board::new(50.0, 50.0);
        let mut rv = two_wide(&board, 10.0, 10.0);
        rv.forward(5.0);
        for t in rv.members() {
            assert!((t.position().y - 15.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_right_turn_preserves_pitch_and_snaps_heading() {
        let board = Board::new(50.0, 50.0);
        let c = board.drc.channel();
        let mut rv = two_wide(&board, 10.0, 10.0);
        rv.right(90.0);
        let tt = rv.members();
        assert!((tt[0].heading() - 90.0).abs() < 1e-9);
        assert!((tt[1].heading() - 90.0).abs() < 1e-9);
        assert!((tt[0].distance(&tt[1]) - c).abs() < 1e-9);
        // Pivot member stays put.
        assert!((tt[0].position().x - 10.0).abs() < 1e-9);
        assert!((tt[0].position().y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_shimmy_single_trace_translates_laterally() {
        let board = Board::new(50.0, 50.0);
        let mut rv = board.river1(board.draw((10.0, 10.0), 0.0));
        rv.shimmy(2.0);
        let t = &rv.members()[0];
        // Positive shimmy steps left of the heading (west of north).
        assert!((t.position().x - 8.0).abs() < 1e-9);
        assert!(t.heading().abs() < 1e-9);
    }

    #[test]
    fn test_shimmy_small_offset_keeps_heading() {
        let board = Board::new(50.0, 50.0);
        let mut rv = two_wide(&board, 10.0, 10.0);
        let before = rv.members()[0].position();
        rv.shimmy(-0.2);
        let t = &rv.members()[0];
        assert!(t.heading().abs() < 1e-9);
        assert!((t.position().x - (before.x + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn test_spread_widens_pitch() {
        let board = Board::new(50.0, 50.0);
        let c = board.drc.channel();
        let mut rv = two_wide(&board, 10.0, 10.0);
        rv.spread(1.0);
        let tt = rv.members();
        assert!((tt[0].distance(&tt[1]) - (c + 1.0)).abs() < 1e-6);
        assert!(tt[0].heading().abs() < 1e-9);
        assert!(tt[1].heading().abs() < 1e-9);
    }

    #[test]
    fn test_join_preserves_member_count_and_pitch() {
        let board = Board::new(50.0, 50.0);
        let c = board.drc.channel();
        let a = board.river1(board.draw((10.0, 10.0), 0.0));
        let b = board.river1(board.draw((13.0, 14.0), 0.0));
        let joined = a.join(b, 0.0);
        assert_eq!(joined.len(), 2);
        let tt = joined.members();
        assert!((tt[0].distance(&tt[1]) - c).abs() < 1e-6);
        // Both leveled at the farther rank.
        assert!((tt[0].position().y - tt[1].position().y).abs() < 1e-6);
    }

    #[test]
    fn test_split_partitions_members() {
        let board = Board::new(50.0, 50.0);
        let c = board.drc.channel();
        let tt = vec![
            board.draw((10.0, 10.0), 0.0),
            board.draw((10.0 + c, 10.0), 0.0),
            board.draw((10.0 + 2.0 * c, 10.0), 0.0),
        ];
        let rv = Route::new(c, tt);
        let (head, tail) = rv.split(1);
        assert_eq!(head.len(), 1);
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn test_through_swaps_layer_and_drills() {
        let mut board = Board::new(50.0, 50.0);
        let mut rv = two_wide(&board, 25.0, 10.0);
        rv.through(&mut board);
        for t in rv.members() {
            assert_eq!(t.layer(), LayerCode::BottomCopper);
            assert!(t.heading().abs() < 1e-9);
        }
        assert_eq!(board.drills().len(), 2);
        // Wire segments landed on both outer copper layers.
        assert!(board.layer(LayerCode::TopCopper).unwrap().shape_count() > 0);
        assert!(board.layer(LayerCode::BottomCopper).unwrap().shape_count() > 0);
    }

    #[test]
    fn test_wire_commits_on_current_layer() {
        let mut board = Board::new(50.0, 50.0);
        let mut rv = two_wide(&board, 10.0, 10.0);
        rv.forward(5.0);
        rv.wire(&mut board);
        assert_eq!(board.layer(LayerCode::TopCopper).unwrap().shape_count(), 2);
    }
}
