//! Human-readable board summary, saved as JSON alongside the fab outputs.

use serde::{Deserialize, Serialize};

use lamina_core::{Board, DesignRules};

/// Snapshot of board identity and stack for the fab package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardMeta {
    pub name: String,
    pub board_id: String,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Layer codes in stack order, top to bottom.
    pub layers: Vec<String>,
    pub copper_layers: usize,
    pub rules: DesignRules,
    pub part_count: usize,
    pub drill_count: usize,
}

impl BoardMeta {
    pub fn from_board(name: &str, board: &Board) -> Self {
        Self {
            name: name.to_string(),
            board_id: board.id.to_string(),
            width_mm: board.size.0,
            height_mm: board.size.1,
            layers: board.layer_codes().iter().map(|c| c.to_string()).collect(),
            copper_layers: board.copper_codes().len(),
            rules: board.drc.clone(),
            part_count: board.parts().count(),
            drill_count: board.drills().len(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_roundtrip() {
        let mut board = Board::new(30.0, 20.0);
        board.add_inner_copper_layers(2);
        let meta = BoardMeta::from_board("demo", &board);
        assert_eq!(meta.copper_layers, 4);
        assert_eq!(meta.layers.len(), 10);
        let json = meta.to_json().unwrap();
        let back: BoardMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "demo");
        assert!((back.width_mm - 30.0).abs() < 1e-12);
        assert_eq!(back.layers, meta.layers);
    }
}
