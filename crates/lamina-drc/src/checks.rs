//! Post-layout rule checks over the merged layer previews.

use log::{info, warn};

use lamina_core::geometry::{self, Shape};
use lamina_core::units::microns;
use lamina_core::{Board, LayerCode};

use crate::violation::{DrcViolation, Severity, ViolationType};

/// Measurement slop allowed before a spacing violation is reported.
const SPACING_TOLERANCE_UM: f64 = 1.5;

fn bbox_of(shape: &Shape) -> [f64; 4] {
    match geometry::bounds(shape) {
        Some(r) => [r.min().x, r.min().y, r.max().x, r.max().y],
        None => [0.0; 4],
    }
}

/// Estimate the smallest gap between disjoint copper regions by bisection:
/// grow the image until two regions first merge. The answer is twice the
/// buffer distance at the merge point; gaps beyond 256 microns read as
/// "wide enough" rather than being measured exactly.
pub fn clearance_estimate(merged: &Shape) -> f64 {
    let npoly = |g: &Shape| g.0.len();
    let n0 = npoly(merged);
    let mut p0 = 0.0;
    let mut p1 = microns(256.0);
    while (p1 - p0) > microns(0.25) {
        let p = (p0 + p1) / 2.0;
        if npoly(&geometry::buffer(merged, p)) == n0 {
            p0 = p;
        } else {
            p1 = p;
        }
    }
    2.0 * p0
}

/// Check copper spacing on both outer layers against the clearance rule.
pub fn check_spacing(board: &mut Board) -> Vec<DrcViolation> {
    let clearance = board.rules().clearance;
    let mut violations = Vec::new();
    for code in [LayerCode::TopCopper, LayerCode::BottomCopper] {
        let occupied = board
            .layer(code)
            .map(|l| l.shape_count() > 0)
            .unwrap_or(false);
        if !occupied {
            continue;
        }
        let merged = board.preview(code);
        if merged.0.len() < 2 {
            continue;
        }
        let clr = clearance_estimate(&merged);
        if clr < clearance - microns(SPACING_TOLERANCE_UM) {
            violations.push(DrcViolation {
                violation_type: ViolationType::MinSpacing,
                severity: Severity::Error,
                layer: code.to_string(),
                message: format!(
                    "spacing on layer {}: actual {:.3} mm, expected {:.3} mm",
                    code, clr, clearance
                ),
                bbox: bbox_of(&merged),
            });
        }
    }
    violations
}

/// Check that outer-layer copper stays on the substrate.
pub fn check_copper_on_board(board: &mut Board) -> Vec<DrcViolation> {
    let body = board.body();
    let mut violations = Vec::new();
    for code in [LayerCode::TopCopper, LayerCode::BottomCopper] {
        let merged = board.preview(code);
        if geometry::is_empty(&merged) {
            continue;
        }
        let outside = geometry::subtract(&merged, &body);
        if !geometry::is_empty(&outside) {
            violations.push(DrcViolation {
                violation_type: ViolationType::CopperOutsideBoard,
                severity: Severity::Error,
                layer: code.to_string(),
                message: format!("copper on layer {} extends past the board edge", code),
                bbox: bbox_of(&outside),
            });
        }
    }
    violations
}

/// Run every check and log a summary.
pub fn perform_drc(board: &mut Board) -> Vec<DrcViolation> {
    let mut violations = check_spacing(board);
    violations.extend(check_copper_on_board(board));
    if violations.is_empty() {
        info!("DRC clean");
    } else {
        warn!("DRC found {} violation(s)", violations.len());
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::geometry::rect;

    #[test]
    fn test_clearance_estimate_brackets_gap() {
        let mut g = rect(0.0, 0.0, 5.0, 1.0);
        g.0.extend(rect(5.1, 0.0, 10.0, 1.0).0);
        let clr = clearance_estimate(&g);
        assert!((clr - 0.1).abs() < 0.002, "estimate {}", clr);
    }

    #[test]
    fn test_clearance_estimate_wide_gap_saturates() {
        let mut g = rect(0.0, 0.0, 1.0, 1.0);
        g.0.extend(rect(10.0, 0.0, 11.0, 1.0).0);
        // Beyond measurement range: reads as roughly half a millimeter.
        assert!(clearance_estimate(&g) > 0.4);
    }

    #[test]
    fn test_spacing_violation_reported() {
        let mut board = Board::new(20.0, 20.0);
        // Two traces 0.1 mm apart, well under the 8 mil clearance.
        let mut a = board.draw((5.0, 5.0), 0.0);
        a.forward(5.0);
        a.wire(&mut board);
        let mut b = board.draw((5.0 + board.drc.trace_width + 0.1, 5.0), 0.0);
        b.forward(5.0);
        b.wire(&mut board);
        let violations = check_spacing(&mut board);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::MinSpacing);
        assert_eq!(violations[0].layer, "GTL");
    }

    #[test]
    fn test_spacing_clean_board() {
        let mut board = Board::new(20.0, 20.0);
        let mut a = board.draw((5.0, 5.0), 0.0);
        a.forward(5.0);
        a.wire(&mut board);
        let mut b = board.draw((15.0, 5.0), 0.0);
        b.forward(5.0);
        b.wire(&mut board);
        assert!(check_spacing(&mut board).is_empty());
    }

    #[test]
    fn test_copper_off_board_reported() {
        let mut board = Board::new(20.0, 20.0);
        board.add_outline();
        let mut dc = board.draw((19.0, 10.0), 90.0);
        dc.forward(3.0); // runs past x = 20
        dc.wire(&mut board);
        let violations = check_copper_on_board(&mut board);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].violation_type,
            ViolationType::CopperOutsideBoard
        );
    }

    #[test]
    fn test_perform_drc_aggregates() {
        let mut board = Board::new(20.0, 20.0);
        board.add_outline();
        let mut dc = board.draw((10.0, 5.0), 0.0);
        dc.forward(5.0);
        dc.wire(&mut board);
        assert!(perform_drc(&mut board).is_empty());
    }
}
