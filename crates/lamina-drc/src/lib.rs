//! # Lamina DRC
//!
//! Design-rule checking over finished board layouts: copper spacing by
//! merge-bisection on the layer previews, and substrate containment for
//! the outer copper layers.

pub mod checks;
pub mod violation;

pub use checks::{check_copper_on_board, check_spacing, clearance_estimate, perform_drc};
pub use violation::{DrcViolation, Severity, ViolationType};
