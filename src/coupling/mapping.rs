//! Bidirectional tables between host ids, peridynamic ids and workset indices.
//!
//! Built once by the allocator; read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use super::particles::{GlobalId, ParticleMap};
use crate::error::{CouplingError, CouplingResult};
use crate::mesh::WorksetEntry;
use crate::mesh::topology::normalize_id;

#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    block_ids: BTreeMap<String, i32>,
    particles: ParticleMap,
    /// Local id → peridynamic global id
    global_ids: Vec<GlobalId>,
    /// workset index → workset-local element id → normalized host element id
    workset_elements: Vec<Vec<u64>>,
    /// normalized host element id → peridynamic ids of its quadrature points, in point order
    partial_stress_ids: HashMap<u64, Vec<GlobalId>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block_id(&mut self, block: &str, id: i32) {
        self.block_ids.insert(block.to_string(), id);
    }

    pub fn block_id(&self, block: &str) -> Option<i32> {
        self.block_ids.get(block).copied()
    }

    pub fn block_ids(&self) -> &BTreeMap<String, i32> {
        &self.block_ids
    }

    /// Register a particle. Local ids must be handed out densely from 0 and
    /// global ids may be registered once only.
    pub fn insert_particle(&mut self, global_id: GlobalId, local_id: usize) -> CouplingResult<()> {
        debug_assert_eq!(local_id, self.global_ids.len(), "local ids must be dense");
        if let Some(existing) = self.particles.local_id(global_id) {
            return Err(CouplingError::Mapping(format!(
                "peridynamic global id {} already belongs to local id {}",
                global_id, existing
            )));
        }
        self.global_ids.push(global_id);
        self.particles.insert(global_id, local_id);
        Ok(())
    }

    /// Local id of a peridynamic global id; `None` when it was never allocated
    pub fn local_id(&self, global_id: GlobalId) -> Option<usize> {
        self.particles.local_id(global_id)
    }

    /// Local id that must exist; a miss means allocation and synchronization disagree
    pub fn require_local_id(&self, global_id: GlobalId) -> CouplingResult<usize> {
        self.local_id(global_id).ok_or_else(|| {
            CouplingError::Mapping(format!("invalid peridynamic global id {}", global_id))
        })
    }

    pub fn global_id(&self, local_id: usize) -> Option<GlobalId> {
        self.global_ids.get(local_id).copied()
    }

    pub fn num_particles(&self) -> usize {
        self.global_ids.len()
    }

    pub fn particle_map(&self) -> &ParticleMap {
        &self.particles
    }

    /// Build the workset table from the host's entries.
    ///
    /// Entries may arrive in any order, but within each workset the local ids must
    /// cover 0..n without gaps.
    pub fn build_worksets(&mut self, entries: &[WorksetEntry]) -> CouplingResult<()> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|e| (e.workset, e.local_id));

        self.workset_elements.clear();
        for entry in sorted {
            if entry.workset >= self.workset_elements.len() {
                self.workset_elements.resize(entry.workset + 1, Vec::new());
            }
            let elements = &mut self.workset_elements[entry.workset];
            if entry.local_id != elements.len() {
                return Err(CouplingError::Configuration(format!(
                    "unexpected workset local id {} in workset {} (expected {})",
                    entry.local_id,
                    entry.workset,
                    elements.len()
                )));
            }
            elements.push(normalize_id(entry.element_global_id, "element")?);
        }
        Ok(())
    }

    /// Normalized host element id at a workset position
    pub fn workset_element(&self, workset: usize, local_id: usize) -> CouplingResult<u64> {
        self.workset_elements
            .get(workset)
            .and_then(|elements| elements.get(local_id))
            .copied()
            .ok_or_else(|| {
                CouplingError::Mapping(format!(
                    "no host element at workset {} local id {}",
                    workset, local_id
                ))
            })
    }

    pub fn set_partial_stress_ids(&mut self, element: u64, ids: Vec<GlobalId>) {
        self.partial_stress_ids.insert(element, ids);
    }

    /// Peridynamic ids of a partial-stress element's quadrature points
    pub fn partial_stress_ids(&self, element: u64) -> CouplingResult<&[GlobalId]> {
        self.partial_stress_ids
            .get(&element)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                CouplingError::Mapping(format!(
                    "host element {} is not a partial-stress element",
                    element
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(element_global_id: u64, workset: usize, local_id: usize) -> WorksetEntry {
        WorksetEntry { element_global_id, workset, local_id }
    }

    #[test]
    fn test_particle_lookup() {
        let mut store = MappingStore::new();
        store.insert_particle(20, 0).unwrap();
        store.insert_particle(4, 1).unwrap();

        assert_eq!(store.local_id(4), Some(1));
        assert_eq!(store.global_id(0), Some(20));
        assert_eq!(store.local_id(5), None);
        assert!(matches!(store.require_local_id(5), Err(CouplingError::Mapping(_))));
    }

    #[test]
    fn test_duplicate_global_id_rejected() {
        let mut store = MappingStore::new();
        store.insert_particle(4, 0).unwrap();
        assert!(matches!(store.insert_particle(4, 1), Err(CouplingError::Mapping(_))));

        // The first registration stays reachable
        assert_eq!(store.local_id(4), Some(0));
        assert_eq!(store.num_particles(), 1);
    }

    #[test]
    fn test_worksets_out_of_order() {
        let mut store = MappingStore::new();
        store
            .build_worksets(&[entry(9, 1, 0), entry(3, 0, 1), entry(2, 0, 0)])
            .unwrap();

        assert_eq!(store.workset_element(0, 0).unwrap(), 1);
        assert_eq!(store.workset_element(0, 1).unwrap(), 2);
        assert_eq!(store.workset_element(1, 0).unwrap(), 8);
        assert!(store.workset_element(1, 1).is_err());
        assert!(store.workset_element(2, 0).is_err());
    }

    #[test]
    fn test_workset_gap_rejected() {
        let mut store = MappingStore::new();
        let result = store.build_worksets(&[entry(1, 0, 0), entry(2, 0, 2)]);
        assert!(matches!(result, Err(CouplingError::Configuration(_))));
    }

    #[test]
    fn test_partial_stress_ids() {
        let mut store = MappingStore::new();
        store.set_partial_stress_ids(7, vec![100, 101]);
        assert_eq!(store.partial_stress_ids(7).unwrap(), &[100, 101]);
        assert!(store.partial_stress_ids(8).is_err());
    }
}
