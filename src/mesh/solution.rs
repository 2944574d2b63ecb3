use std::collections::HashMap;
use nalgebra::Vector3;

use crate::error::{CouplingError, CouplingResult};

/// Number of displacement DOFs per host node
pub const DOFS_PER_NODE: usize = 3;

/// Rank-local slice of the host displacement solution.
///
/// Global DOF numbering is node-major: DOF `3 * node + component`, with `node`
/// the normalized (0-based) host node id. The rank only stores the DOFs it has,
/// so every access goes through the global → local map.
#[derive(Debug, Clone, Default)]
pub struct HostSolution {
    dof_map: HashMap<u64, usize>,
    values: Vec<f64>,
}

impl HostSolution {
    /// Solution over the given nodes, zero-initialized
    ///
    /// # Arguments
    /// * `node_ids` - Normalized (0-based) host node ids, in local storage order
    pub fn zeros(node_ids: &[u64]) -> Self {
        Self::build(node_ids, vec![0.0; DOFS_PER_NODE * node_ids.len()])
    }

    /// Wrap an interleaved local array [ux0, uy0, uz0, ux1, ...]
    pub fn from_interleaved(node_ids: &[u64], values: Vec<f64>) -> CouplingResult<Self> {
        if values.len() != DOFS_PER_NODE * node_ids.len() {
            return Err(CouplingError::Configuration(format!(
                "solution vector has {} entries for {} nodes",
                values.len(),
                node_ids.len()
            )));
        }
        Ok(Self::build(node_ids, values))
    }

    fn build(node_ids: &[u64], values: Vec<f64>) -> Self {
        let mut dof_map = HashMap::with_capacity(values.len());
        for (local_node, &node) in node_ids.iter().enumerate() {
            for c in 0..DOFS_PER_NODE {
                dof_map.insert(
                    Self::global_dof(node, c),
                    DOFS_PER_NODE * local_node + c,
                );
            }
        }

        Self { dof_map, values }
    }

    /// Global DOF index of a node component
    pub fn global_dof(node: u64, component: usize) -> u64 {
        DOFS_PER_NODE as u64 * node + component as u64
    }

    /// Local storage index of a global DOF
    pub fn local_dof(&self, global_dof: u64) -> Option<usize> {
        self.dof_map.get(&global_dof).copied()
    }

    /// Displacement of a node
    pub fn displacement(&self, node: u64) -> CouplingResult<Vector3<f64>> {
        let first = self.local_dof(Self::global_dof(node, 0)).ok_or_else(|| {
            CouplingError::Mapping(format!(
                "host node {} has no displacement DOFs on this rank",
                node
            ))
        })?;
        Ok(Vector3::new(
            self.values[first],
            self.values[first + 1],
            self.values[first + 2],
        ))
    }

    /// Overwrite the displacement of a node
    pub fn set_displacement(&mut self, node: u64, u: Vector3<f64>) -> CouplingResult<()> {
        let first = self.local_dof(Self::global_dof(node, 0)).ok_or_else(|| {
            CouplingError::Mapping(format!(
                "host node {} has no displacement DOFs on this rank",
                node
            ))
        })?;
        self.values[first..first + DOFS_PER_NODE].copy_from_slice(u.as_slice());
        Ok(())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
