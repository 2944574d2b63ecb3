use std::collections::HashMap;
use nalgebra::{Point3, Vector3};

/// Peridynamic global id: unique across all ranks, never reused
pub type GlobalId = u64;

/// Rank-local peridynamic particles, Structure-of-Arrays.
///
/// Local ids are dense indices in discovery order: all sphere particles first,
/// then the partial-stress quadrature points.
#[derive(Debug, Clone, Default)]
pub struct ParticleTable {
    pub global_ids: Vec<GlobalId>,
    /// Interleaved reference positions [x0, y0, z0, x1, ...]
    pub reference_positions: Vec<f64>,
    pub volumes: Vec<f64>,
    pub block_ids: Vec<i32>,
}

impl ParticleTable {
    /// Create a new, empty table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            global_ids: Vec::with_capacity(capacity),
            reference_positions: Vec::with_capacity(3 * capacity),
            volumes: Vec::with_capacity(capacity),
            block_ids: Vec::with_capacity(capacity),
        }
    }

    /// Append a particle; returns its local id
    pub fn push(&mut self, global_id: GlobalId, position: Point3<f64>, volume: f64, block_id: i32) -> usize {
        let local_id = self.global_ids.len();
        self.global_ids.push(global_id);
        self.reference_positions.extend_from_slice(position.coords.as_slice());
        self.volumes.push(volume);
        self.block_ids.push(block_id);
        local_id
    }

    /// Number of particles on this rank
    pub fn len(&self) -> usize {
        self.global_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_ids.is_empty()
    }

    pub fn reference_position(&self, local_id: usize) -> Point3<f64> {
        Point3::from(read_vec3(&self.reference_positions, local_id))
    }
}

/// Global id → local id lookup.
///
/// Used for the coupling's own numbering and by solvers for theirs.
#[derive(Debug, Clone, Default)]
pub struct ParticleMap {
    local_of_global: HashMap<GlobalId, usize>,
}

impl ParticleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map built from a local → global list
    pub fn from_global_ids(global_ids: &[GlobalId]) -> Self {
        Self {
            local_of_global: global_ids
                .iter()
                .enumerate()
                .map(|(local, &global)| (global, local))
                .collect(),
        }
    }

    pub fn insert(&mut self, global_id: GlobalId, local_id: usize) {
        self.local_of_global.insert(global_id, local_id);
    }

    /// Local id of a global id; `None` is the not-found sentinel
    pub fn local_id(&self, global_id: GlobalId) -> Option<usize> {
        self.local_of_global.get(&global_id).copied()
    }

    pub fn len(&self) -> usize {
        self.local_of_global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_of_global.is_empty()
    }
}

/// Read the 3-vector of entry `i` in an interleaved array
pub fn read_vec3(data: &[f64], i: usize) -> Vector3<f64> {
    Vector3::new(data[3 * i], data[3 * i + 1], data[3 * i + 2])
}

/// Write the 3-vector of entry `i` in an interleaved array
pub fn write_vec3(data: &mut [f64], i: usize, v: &Vector3<f64>) {
    data[3 * i..3 * i + 3].copy_from_slice(v.as_slice());
}
