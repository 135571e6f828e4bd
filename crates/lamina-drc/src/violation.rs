use serde::{Deserialize, Serialize};

/// Type of design-rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Copper-to-copper spacing below the clearance rule.
    MinSpacing,
    /// Copper extends past the substrate silhouette.
    CopperOutsideBoard,
    Custom(String),
}

/// Severity level of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single violation with location and description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Layer code string, e.g. `GTL`.
    pub layer: String,
    pub message: String,
    /// Bounding box of the violation region: [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
}

impl DrcViolation {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
