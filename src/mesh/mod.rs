pub mod topology;
pub mod geometry;
pub mod fields;
pub mod solution;

pub use topology::{CellTopology, ElementBlock, HostElement};
pub use geometry::{HostMesh, NodeSet, WorksetEntry};
pub use fields::{ScalarField, VectorField, FieldData, COORDINATES_FIELD, VOLUME_FIELD};
pub use solution::HostSolution;
