//! # Lamina I/O
//!
//! Manufacturing outputs for finished boards: Excellon drill programs,
//! SVG previews, BOM and centroid CSVs, and a JSON board summary. The
//! renderers return strings; [`save_board`] writes the whole fab package
//! to a directory.

use std::fs;
use std::path::Path;

use log::info;
use thiserror::Error;

use lamina_core::Board;

pub mod excellon;
pub mod meta;
pub mod report;
pub mod svg;

pub use excellon::excellon as excellon_program;
pub use meta::BoardMeta;
pub use report::{bom_csv, centroids_csv, pretty_parts};
pub use svg::{svg_write, SvgStyle};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("report is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the complete fab package for a board under `dir`:
/// plated and non-plated drill files, top/bottom/combined SVG previews,
/// BOM and centroid CSVs, and the JSON summary.
pub fn save_board(board: &mut Board, dir: &Path, basename: &str) -> Result<(), ExportError> {
    fs::create_dir_all(dir)?;
    let base = dir.join(basename);
    let path = |suffix: &str| base.with_file_name(format!("{}{}", basename, suffix));

    let plated: Vec<_> = board.drills().iter().filter(|h| h.plated).cloned().collect();
    let npth: Vec<_> = board.drills().iter().filter(|h| !h.plated).cloned().collect();
    fs::write(path("_PTH.DRL"), excellon::excellon(plated.iter()))?;
    fs::write(path("_NPTH.DRL"), excellon::excellon(npth.iter()))?;

    fs::write(
        path("_preview_top.svg"),
        svg::svg_write(board, SvgStyle::Top),
    )?;
    fs::write(
        path("_preview_bot.svg"),
        svg::svg_write(board, SvgStyle::Bottom),
    )?;
    fs::write(
        path("_preview_all.svg"),
        svg::svg_write(board, SvgStyle::All),
    )?;

    fs::write(path("-bom.csv"), report::bom_csv(board)?)?;
    fs::write(path("-centroids.csv"), report::centroids_csv(board)?)?;

    let meta = BoardMeta::from_board(basename, board);
    fs::write(path(".json"), meta.to_json()?)?;

    info!("saved fab package for {} under {}", basename, dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::{ChipDiscrete, ChipSize, Side};

    #[test]
    fn test_save_board_writes_fab_package() {
        let mut board = Board::new(30.0, 20.0);
        board.add_outline();
        board.add_hole((3.0, 3.0), 2.0);
        let r = ChipDiscrete::resistor(ChipSize::I0603, "10k");
        board.add_part((15.0, 10.0), &r, Side::Top);

        let dir = std::env::temp_dir().join(format!("lamina-save-{}", board.id));
        save_board(&mut board, &dir, "demo").unwrap();
        for suffix in [
            "_PTH.DRL",
            "_NPTH.DRL",
            "_preview_top.svg",
            "_preview_bot.svg",
            "_preview_all.svg",
            "-bom.csv",
            "-centroids.csv",
            ".json",
        ] {
            let p = dir.join(format!("demo{}", suffix));
            assert!(p.is_file(), "missing {}", p.display());
        }
        let drl = fs::read_to_string(dir.join("demo_NPTH.DRL")).unwrap();
        assert!(drl.contains("T2C2.000"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
