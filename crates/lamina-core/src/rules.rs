use serde::{Deserialize, Serialize};

use crate::units::mils;

/// Design rule parameters for a board, in millimeters.
///
/// The defaults are a conservative 8 mil / 8 mil two-ounce process that any
/// prototype fab accepts; scripts adjust individual fields before placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRules {
    // Copper features
    pub trace_width: f64,
    pub via_drill: f64,
    pub via_annular_ring: f64,
    pub via_track_width: f64,
    // Clearances
    pub clearance: f64,
    pub outline_clearance: f64,
    pub hole_clearance: f64,
    // Soldermask
    pub mask_vias: bool,
    pub mask_holes: bool,
    pub hole_mask: f64,
    pub soldermask_margin: f64,
    // Silkscreen
    pub silk_width: f64,
}

impl Default for DesignRules {
    fn default() -> Self {
        Self {
            trace_width: mils(8.0),
            via_drill: 0.5,
            via_annular_ring: mils(8.0),
            via_track_width: mils(12.0),
            clearance: mils(8.0),
            outline_clearance: mils(20.0),
            hole_clearance: mils(20.0),
            mask_vias: false,
            mask_holes: true,
            hole_mask: mils(16.0),
            soldermask_margin: mils(3.0),
            silk_width: mils(6.0),
        }
    }
}

impl DesignRules {
    /// Center-to-center pitch of adjacent traces in a bus channel.
    pub fn channel(&self) -> f64 {
        self.trace_width + self.clearance
    }

    /// Radius of the copper annulus stamped for a via.
    pub fn via_pad_radius(&self) -> f64 {
        self.via_drill / 2.0 + self.via_annular_ring
    }
}
