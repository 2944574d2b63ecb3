use serde::{Deserialize, Serialize};

use crate::error::{CouplingError, CouplingResult};

/// Cell topology of an element block.
///
/// Node numbering:
///   Tet4 / Tet10 vertices: 0, 1, 2, 3 at reference (0,0,0), (1,0,0), (0,1,0), (0,0,1)
///   Tet10 edge midpoints:
///     4: edge 0-1
///     5: edge 1-2
///     6: edge 2-0
///     7: edge 0-3
///     8: edge 1-3
///     9: edge 2-3
///   Hex8: counter-clockwise bottom face (z = -1) 0..3, then top face (z = +1) 4..7,
///     on the reference cube [-1, 1]^3
///   Particle: a single node ("sphere" element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellTopology {
    Particle,
    Tet4,
    Tet10,
    Hex8,
}

impl CellTopology {
    /// Number of nodes of one cell
    pub fn node_count(&self) -> usize {
        match self {
            CellTopology::Particle => 1,
            CellTopology::Tet4 => 4,
            CellTopology::Tet10 => 10,
            CellTopology::Hex8 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CellTopology::Particle => "Particle",
            CellTopology::Tet4 => "Tetrahedron_4",
            CellTopology::Tet10 => "Tetrahedron_10",
            CellTopology::Hex8 => "Hexahedron_8",
        }
    }
}

/// A locally-owned host element
#[derive(Debug, Clone)]
pub struct HostElement {
    /// Host global element id (1-based, as the host mesh numbers it)
    pub global_id: u64,
    /// Index of this element in the mesh's per-element fields
    pub local_index: usize,
    /// Local node indices, in topology order
    pub nodes: Vec<usize>,
}

impl HostElement {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Element id normalized to 0-based numbering
    pub fn normalized_id(&self) -> CouplingResult<u64> {
        normalize_id(self.global_id, "element")
    }
}

/// A named element block with its locally-owned elements
#[derive(Debug, Clone)]
pub struct ElementBlock {
    pub name: String,
    /// Block id supplied by the host mesh. When absent it is recovered from a
    /// trailing `_<integer>` suffix of the block name.
    pub block_id: Option<i32>,
    pub topology: CellTopology,
    pub elements: Vec<HostElement>,
}

impl ElementBlock {
    pub fn new(name: &str, block_id: Option<i32>, topology: CellTopology) -> Self {
        Self {
            name: name.to_string(),
            block_id,
            topology,
            elements: Vec::new(),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Block id, explicit or parsed from the name ("block_12" → 12)
    pub fn resolve_block_id(&self) -> CouplingResult<i32> {
        if let Some(id) = self.block_id {
            return Ok(id);
        }

        self.name
            .rsplit_once('_')
            .and_then(|(_, suffix)| suffix.parse::<i32>().ok())
            .ok_or_else(|| {
                CouplingError::Configuration(format!(
                    "invalid block name '{}': no explicit block id and no trailing numeric suffix",
                    self.name
                ))
            })
    }
}

/// Convert a 1-based host id to 0-based numbering
pub fn normalize_id(id: u64, kind: &str) -> CouplingResult<u64> {
    id.checked_sub(1).ok_or_else(|| {
        CouplingError::Configuration(format!("host {} id 0 is not a valid 1-based id", kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_from_suffix() {
        let block = ElementBlock::new("block_12", None, CellTopology::Hex8);
        assert_eq!(block.resolve_block_id().unwrap(), 12);

        let block = ElementBlock::new("left_arm_3", None, CellTopology::Hex8);
        assert_eq!(block.resolve_block_id().unwrap(), 3);
    }

    #[test]
    fn test_explicit_block_id_wins() {
        let block = ElementBlock::new("whatever", Some(40), CellTopology::Tet4);
        assert_eq!(block.resolve_block_id().unwrap(), 40);
    }

    #[test]
    fn test_malformed_block_name() {
        for name in ["block", "block_", "block_x1"] {
            let block = ElementBlock::new(name, None, CellTopology::Tet4);
            assert!(matches!(
                block.resolve_block_id(),
                Err(CouplingError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(1, "node").unwrap(), 0);
        assert_eq!(normalize_id(42, "node").unwrap(), 41);
        assert!(normalize_id(0, "node").is_err());
    }
}
