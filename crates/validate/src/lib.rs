//! Advisory structural validation of extracted graphs.

pub mod error;
pub mod gate;
pub mod shapes;
pub mod triples;

pub use error::ShapeError;
pub use gate::{COLLISION_RULE, ValidationGate, ValidationReport, Violation};
pub use shapes::{EdgeShape, NodeKind, NodeShape, PropertyShape, ShapeSet};
pub use triples::{TripleGraph, normalize_identifier};
