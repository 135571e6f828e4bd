//! Shape helpers over the external planar-geometry engine.
//!
//! Everything stamped onto a board layer is a [`Shape`], a multi-polygon in
//! millimeter coordinates. Boolean set operations and buffering come from
//! the `geo` crate; this module only adds the constructors and small
//! combinators the rest of the crate needs. Empty and degenerate inputs are
//! legitimate everywhere and produce empty results rather than errors.

use geo::algorithm::orient::{Direction, Orient};
use geo::{coord, Area, BooleanOps, BoundingRect, Buffer, Contains, Coord, Intersects};
use geo::{LineString, MultiPolygon, Polygon, Rect};

/// A planar region: zero or more polygons, possibly with holes.
pub type Shape = MultiPolygon<f64>;

/// Number of segments used to approximate a full circle.
const CIRCLE_SEGMENTS: usize = 96;

pub fn pt(x: f64, y: f64) -> Coord<f64> {
    coord! { x: x, y: y }
}

/// The empty region.
pub fn empty() -> Shape {
    MultiPolygon(Vec::new())
}

pub fn is_empty(s: &Shape) -> bool {
    s.0.iter().all(|p| p.exterior().0.len() < 4)
}

/// A single polygon from an open boundary walk; the ring is closed and
/// oriented here. Fewer than three vertices yields the empty region.
pub fn polygon(boundary: &[Coord<f64>]) -> Shape {
    if boundary.len() < 3 {
        return empty();
    }
    let poly = Polygon::new(LineString::new(boundary.to_vec()), Vec::new());
    MultiPolygon(vec![poly]).orient(Direction::Default)
}

/// A polygon with interior holes, e.g. a board substrate with cutouts.
pub fn polygon_with_holes(exterior: &[Coord<f64>], holes: &[Vec<Coord<f64>>]) -> Shape {
    if exterior.len() < 3 {
        return empty();
    }
    let interiors = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| LineString::new(h.clone()))
        .collect();
    let poly = Polygon::new(LineString::new(exterior.to_vec()), interiors);
    MultiPolygon(vec![poly]).orient(Direction::Default)
}

/// A circular disc approximated by a regular polygon.
pub fn disc(center: Coord<f64>, radius: f64) -> Shape {
    if radius <= 0.0 {
        return empty();
    }
    let ring: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let a = 2.0 * std::f64::consts::PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
            pt(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect();
    polygon(&ring)
}

/// An axis-aligned box.
pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
    MultiPolygon(vec![Rect::new(pt(x0, y0), pt(x1, y1)).to_polygon()])
}

pub fn unite(a: &Shape, b: &Shape) -> Shape {
    a.union(b)
}

pub fn subtract(a: &Shape, b: &Shape) -> Shape {
    a.difference(b)
}

pub fn intersect(a: &Shape, b: &Shape) -> Shape {
    a.intersection(b)
}

/// Union of an arbitrary collection of shapes.
pub fn union_all<'a, I>(shapes: I) -> Shape
where
    I: IntoIterator<Item = &'a Shape>,
{
    shapes.into_iter().fold(empty(), |acc, s| acc.union(s))
}

/// Outward (positive) or inward (negative) offset.
pub fn buffer(s: &Shape, distance: f64) -> Shape {
    s.buffer(distance)
}

/// The canonical net-isolation operation: `own` with everything closer than
/// `clearance` to `others` removed. Used by both the layer preview and the
/// copper pour so the two never diverge.
pub fn isolated(own: &Shape, others: &Shape, clearance: f64) -> Shape {
    if is_empty(others) {
        return own.clone();
    }
    own.difference(&others.buffer(clearance))
}

/// Stroke an open polyline with the given total width. Fewer than two
/// points is an empty stroke.
pub fn stroke(path: &[Coord<f64>], width: f64) -> Shape {
    if path.len() < 2 || width <= 0.0 {
        return empty();
    }
    LineString::new(path.to_vec()).buffer(width / 2.0)
}

/// Stroke a boundary walk as a closed ring.
pub fn ring_stroke(path: &[Coord<f64>], width: f64) -> Shape {
    if path.len() < 2 {
        return empty();
    }
    let mut closed = path.to_vec();
    if closed.first() != closed.last() {
        closed.push(closed[0]);
    }
    stroke(&closed, width)
}

pub fn area(s: &Shape) -> f64 {
    s.unsigned_area()
}

pub fn bounds(s: &Shape) -> Option<Rect<f64>> {
    s.bounding_rect()
}

pub fn contains(outer: &Shape, inner: &Shape) -> bool {
    outer.contains(inner)
}

pub fn touches(a: &Shape, b: &Shape) -> bool {
    a.intersects(b)
}

/// Total length of an open polyline.
pub fn path_length(path: &[Coord<f64>]) -> f64 {
    path.windows(2)
        .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_area() {
        let d = disc(pt(3.0, 4.0), 1.0);
        // 96-gon underestimates pi*r^2 by well under 0.3%
        assert!((area(&d) - std::f64::consts::PI).abs() < 0.01);
    }

    #[test]
    fn test_union_and_subtract() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.0, 0.0, 3.0, 2.0);
        let u = unite(&a, &b);
        assert!((area(&u) - 6.0).abs() < 1e-9);
        let d = subtract(&u, &a);
        assert!((area(&d) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_all_of_nothing_is_empty() {
        let shapes: Vec<Shape> = Vec::new();
        assert!(is_empty(&union_all(shapes.iter())));
    }

    #[test]
    fn test_isolated_keeps_clearance() {
        let own = rect(0.0, 0.0, 10.0, 1.0);
        let other = rect(4.0, 0.0, 6.0, 1.0);
        let iso = isolated(&own, &other, 0.5);
        // own loses the other region plus 0.5 on each flank
        assert!(area(&iso) < 10.0 - 2.0 - 0.9);
        assert!(!touches(&iso, &other));
    }

    #[test]
    fn test_stroke_degenerate_is_empty() {
        assert!(is_empty(&stroke(&[pt(0.0, 0.0)], 0.5)));
        assert!(is_empty(&stroke(&[], 0.5)));
    }

    #[test]
    fn test_polygon_with_holes_area() {
        let outer = [pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 10.0), pt(0.0, 10.0)];
        let hole = vec![pt(4.0, 4.0), pt(6.0, 4.0), pt(6.0, 6.0), pt(4.0, 6.0)];
        let s = polygon_with_holes(&outer, &[hole]);
        assert!((area(&s) - 96.0).abs() < 1e-9);
    }
}
