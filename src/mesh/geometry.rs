use nalgebra::{Point3, Vector3};

use super::fields::{FieldData, COORDINATES_FIELD, VOLUME_FIELD};
use super::topology::{CellTopology, ElementBlock, HostElement};
use crate::error::{CouplingError, CouplingResult};

/// Host nodes visible on this rank
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    /// Host global node id (1-based) per local node index
    pub global_ids: Vec<u64>,
    /// Whether this rank owns the node (shared nodes appear on several ranks)
    pub owned: Vec<bool>,
}

impl NodeSet {
    pub fn len(&self) -> usize {
        self.global_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_ids.is_empty()
    }
}

/// One entry of the host's (workset index, workset-local id) → element table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorksetEntry {
    /// Host global element id (1-based)
    pub element_global_id: u64,
    pub workset: usize,
    pub local_id: usize,
}

/// The rank-local view of the host mesh the coupling consumes.
///
/// Only locally-owned elements are listed in the blocks. The block list itself
/// (names, ids, topologies) is mesh metadata and is the same on every rank.
#[derive(Debug, Clone, Default)]
pub struct HostMesh {
    pub nodes: NodeSet,
    pub blocks: Vec<ElementBlock>,
    /// Per-node fields, indexed by local node index
    pub node_fields: FieldData,
    /// Per-element fields, indexed by `HostElement::local_index`
    pub element_fields: FieldData,
    pub worksets: Vec<WorksetEntry>,
    num_elements: usize,
}

impl HostMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and its coordinates; returns the local node index
    pub fn add_node(&mut self, global_id: u64, x: f64, y: f64, z: f64, owned: bool) -> usize {
        let idx = self.nodes.len();
        self.nodes.global_ids.push(global_id);
        self.nodes.owned.push(owned);
        self.node_fields
            .vector_field_entry(COORDINATES_FIELD)
            .set(idx, Vector3::new(x, y, z));
        idx
    }

    /// Declare an element block; returns its index
    pub fn add_block(&mut self, name: &str, block_id: Option<i32>, topology: CellTopology) -> usize {
        self.blocks.push(ElementBlock::new(name, block_id, topology));
        self.blocks.len() - 1
    }

    /// Add a locally-owned element to a block; returns its local element index
    pub fn add_element(&mut self, block: usize, global_id: u64, nodes: &[usize]) -> usize {
        let local_index = self.num_elements;
        self.num_elements += 1;
        self.blocks[block].elements.push(HostElement {
            global_id,
            local_index,
            nodes: nodes.to_vec(),
        });
        local_index
    }

    /// Set the volume attribute of an element (sphere elements carry their particle volume here)
    pub fn set_element_volume(&mut self, local_index: usize, volume: f64) {
        self.element_fields.field_entry(VOLUME_FIELD).set(local_index, volume);
    }

    /// Record where an element lives in the host's workset layout
    pub fn add_workset_entry(&mut self, element_global_id: u64, workset: usize, local_id: usize) {
        self.worksets.push(WorksetEntry {
            element_global_id,
            workset,
            local_id,
        });
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn block_by_name(&self, name: &str) -> Option<&ElementBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Reference coordinates of a local node
    pub fn coordinates(&self, node: usize) -> CouplingResult<Point3<f64>> {
        let field = self.node_fields.require_vector_field(COORDINATES_FIELD)?;
        field.data.get(node).map(|v| Point3::from(*v)).ok_or_else(|| {
            CouplingError::Configuration(format!(
                "coordinates field has no value for local node {}",
                node
            ))
        })
    }

    /// Host global node id (1-based) of a local node
    pub fn node_global_id(&self, node: usize) -> CouplingResult<u64> {
        self.nodes.global_ids.get(node).copied().ok_or_else(|| {
            CouplingError::Configuration(format!("element references unknown local node {}", node))
        })
    }

    /// Number of local elements that reference each local node
    pub fn node_element_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_nodes()];
        for block in &self.blocks {
            for elem in &block.elements {
                for &node in &elem.nodes {
                    if let Some(count) = counts.get_mut(node) {
                        *count += 1;
                    }
                }
            }
        }
        counts
    }

    /// Iterate all locally-owned elements across blocks
    pub fn elements(&self) -> impl Iterator<Item = (&ElementBlock, &HostElement)> {
        self.blocks
            .iter()
            .flat_map(|block| block.elements.iter().map(move |elem| (block, elem)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mesh() {
        let mut mesh = HostMesh::new();
        let n0 = mesh.add_node(5, 1.0, 2.0, 3.0, true);
        let n1 = mesh.add_node(6, 0.0, 0.0, 0.0, false);
        let b = mesh.add_block("block_1", None, CellTopology::Particle);
        let e0 = mesh.add_element(b, 1, &[n0]);
        let e1 = mesh.add_element(b, 2, &[n1]);
        mesh.set_element_volume(e1, 0.5);

        assert_eq!(mesh.num_nodes(), 2);
        assert_eq!(mesh.num_elements(), 2);
        assert_eq!((e0, e1), (0, 1));
        assert_eq!(mesh.coordinates(n0).unwrap(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.node_global_id(n1).unwrap(), 6);

        // Volume field grows with zeros for elements that were never set
        let volume = mesh.element_fields.get_field(VOLUME_FIELD).unwrap();
        assert_eq!(volume.data, vec![0.0, 0.5]);
        assert_eq!(mesh.node_element_counts(), vec![1, 1]);
    }

    #[test]
    fn test_missing_coordinates_field() {
        let mut mesh = HostMesh::new();
        mesh.add_node(1, 0.0, 0.0, 0.0, true);
        mesh.node_fields.vector_fields.clear();
        assert!(matches!(
            mesh.coordinates(0),
            Err(CouplingError::Configuration(_))
        ));
    }
}
