//! SVG preview writer.
//!
//! Renders the merged layer previews in fab-viewer colors, top or bottom
//! reading view, or everything overlaid semi-transparent. Y is flipped so
//! the board reads with its origin at the lower left.

use std::fmt::Write as _;

use lamina_core::geometry::{self, Shape};
use lamina_core::{Board, LayerCode};

const SCALE_FACTOR: f64 = 4.0;

/// Which stack view to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgStyle {
    Top,
    Bottom,
    All,
}

/// (layer code, fill color, line color, fill opacity); `DRL` is the
/// pseudo-layer of drill hits.
type LayerStyle = (&'static str, &'static str, &'static str, f64);

const TOP_STYLE: &[LayerStyle] = &[
    ("GTL", "indianred", "indianred", 1.0),
    ("GTS", "dimgray", "darkgray", 0.3),
    ("GTP", "mintcream", "lightcyan", 0.3),
    ("GTO", "darkkhaki", "darkkhaki", 1.0),
    ("DRL", "black", "black", 1.0),
];

const BOTTOM_STYLE: &[LayerStyle] = &[
    ("GBL", "royalblue", "royalblue", 1.0),
    ("GBS", "dimgray", "darkgray", 0.3),
    ("GBP", "mintcream", "lightcyan", 0.3),
    ("GBO", "darkkhaki", "darkkhaki", 1.0),
    ("DRL", "black", "black", 1.0),
];

const ALL_STYLE: &[LayerStyle] = &[
    ("GBO", "darkkhaki", "darkkhaki", 1.0),
    ("GBS", "dimgray", "darkgray", 0.5),
    ("GBP", "mintcream", "lightcyan", 0.5),
    ("GBL", "royalblue", "royalblue", 0.4),
    ("GP3", "chocolate", "chocolate", 0.4),
    ("GP2", "green", "green", 0.4),
    ("GTL", "indianred", "indianred", 0.4),
    ("GTS", "dimgray", "darkgray", 0.3),
    ("GTP", "mintcream", "lightcyan", 0.3),
    ("GTO", "darkkhaki", "darkkhaki", 1.0),
    ("DRL", "black", "black", 1.0),
];

impl SvgStyle {
    fn layers(self) -> &'static [LayerStyle] {
        match self {
            SvgStyle::Top => TOP_STYLE,
            SvgStyle::Bottom => BOTTOM_STYLE,
            SvgStyle::All => ALL_STYLE,
        }
    }
}

struct Viewport {
    x0: f64,
    y1: f64,
    width: f64,
    height: f64,
}

impl Viewport {
    fn of(block: &Shape) -> Self {
        let r = geometry::bounds(block).unwrap_or_else(|| {
            geo::Rect::new(geometry::pt(0.0, 0.0), geometry::pt(1.0, 1.0))
        });
        Self {
            x0: r.min().x,
            y1: r.max().y,
            width: (r.max().x - r.min().x) * SCALE_FACTOR,
            height: (r.max().y - r.min().y) * SCALE_FACTOR,
        }
    }

    fn tx(&self, x: f64) -> f64 {
        (x - self.x0) * SCALE_FACTOR
    }

    fn ty(&self, y: f64) -> f64 {
        (self.y1 - y) * SCALE_FACTOR
    }
}

fn path_d(shape: &Shape, vp: &Viewport) -> String {
    let mut d = String::new();
    for poly in &shape.0 {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            for (i, c) in ring.0.iter().enumerate() {
                let op = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{}{:.3},{:.3} ", op, vp.tx(c.x), vp.ty(c.y));
            }
            d.push_str("Z ");
        }
    }
    d
}

fn drill_shape(board: &Board) -> Shape {
    let discs: Vec<Shape> = board
        .drills()
        .iter()
        .map(|h| geometry::disc(geometry::pt(h.x, h.y), h.diameter / 2.0))
        .collect();
    geometry::union_all(discs.iter())
}

/// Render the board as an SVG document string.
pub fn svg_write(board: &mut Board, style: SvgStyle) -> String {
    let block = board.substrate();
    let vp = Viewport::of(&block);

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.2}mm" height="{:.2}mm" viewBox="0 0 {:.2} {:.2}">"#,
        vp.width, vp.height, vp.width, vp.height
    );

    // Substrate silhouette.
    let _ = writeln!(
        out,
        r#"<path d="{}" fill="none" stroke="slategray" stroke-width="{:.2}" fill-rule="evenodd"/>"#,
        path_d(&block, &vp),
        0.1 * SCALE_FACTOR
    );

    for &(code, fill, line, opacity) in style.layers() {
        let merged = if code == "DRL" {
            drill_shape(board)
        } else {
            match code.parse::<LayerCode>() {
                Ok(lc) if board.layer(lc).is_some() => board.preview(lc),
                _ => continue,
            }
        };
        if geometry::is_empty(&merged) {
            continue;
        }
        let _ = writeln!(
            out,
            r#"<path d="{}" fill="{}" fill-opacity="{:.2}" fill-rule="evenodd" stroke="{}" stroke-width="0.1" stroke-opacity="{:.2}"/>"#,
            path_d(&merged, &vp),
            fill,
            opacity,
            line,
            opacity
        );
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_board() -> Board {
        let mut board = Board::new(30.0, 20.0);
        board.add_outline();
        let mut dc = board.draw((10.0, 10.0), 90.0);
        dc.forward(8.0);
        dc.wire(&mut board);
        dc.via(&mut board, None);
        board
    }

    #[test]
    fn test_svg_document_structure() {
        let mut board = sample_board();
        let svg = svg_write(&mut board, SvgStyle::Top);
        assert!(svg.starts_with("<svg xmlns="));
        assert!(svg.ends_with("</svg>\n"));
        // board is 30x20 mm at 4x
        assert!(svg.contains(r#"width="120.00mm""#));
        assert!(svg.contains(r#"height="80.00mm""#));
    }

    #[test]
    fn test_top_style_renders_copper_and_drills() {
        let mut board = sample_board();
        let svg = svg_write(&mut board, SvgStyle::Top);
        assert!(svg.contains("indianred"));
        assert!(svg.contains(r#"fill="black""#));
        // bottom copper color only appears in the combined view
        assert!(!svg.contains("royalblue"));
        let all = svg_write(&mut board, SvgStyle::All);
        assert!(all.contains("royalblue"));
    }

    #[test]
    fn test_empty_layers_are_omitted() {
        let mut board = Board::new(10.0, 10.0);
        board.add_outline();
        let svg = svg_write(&mut board, SvgStyle::Top);
        assert!(!svg.contains("indianred"));
        assert!(!svg.contains("mintcream"));
    }
}
