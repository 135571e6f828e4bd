//! # Lamina Core
//!
//! Programmatic PCB layout: a geometric layer model, a turtle-style drawing
//! cursor, bus routing rivers, and a footprint-driven part system.
//!
//! Boards are built by scripts, not by hand: place parts, escape their
//! pads, gather the escapes into rivers, and pour the planes last.

pub mod board;
pub mod draw;
pub mod geometry;
pub mod layer;
pub mod part;
pub mod route;
pub mod rules;
pub mod units;

pub use board::{Board, DrillHit, PadRef};
pub use draw::{Draw, TurtleError};
pub use geometry::Shape;
pub use layer::{Layer, LayerCode, Side};
pub use part::{ChipDiscrete, ChipSize, Footprint, FootprintRegistry, PartInstance, PinHeader};
pub use route::Route;
pub use rules::DesignRules;
pub use units::{degrees, inches, microns, mils};
