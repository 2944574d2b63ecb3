//! Candidate search between sphere particles and solid elements.
//!
//! Sphere particles get a search radius slightly larger than the largest solid
//! element in the model; every other node gets zero and takes no part in the
//! search. The candidate list is produced and returned, nothing downstream
//! consumes it yet.

use std::collections::HashMap;

use nalgebra::Vector3;
use rayon::prelude::*;

use super::particles::{read_vec3, GlobalId};
use crate::comm::Communicator;
use crate::error::{CouplingError, CouplingResult};
use crate::mesh::topology::normalize_id;
use crate::mesh::{HostElement, HostMesh};

/// Search radius relative to the largest element dimension
pub const SEARCH_RADIUS_FACTOR: f64 = 1.1;

/// Per-point input of a proximity search, interleaved coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInput {
    pub coordinates: Vec<f64>,
    /// Zero excludes a point from searching
    pub radii: Vec<f64>,
    pub global_ids: Vec<GlobalId>,
}

impl SearchInput {
    pub fn len(&self) -> usize {
        self.global_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_ids.is_empty()
    }

    fn validate(&self) -> CouplingResult<()> {
        let n = self.global_ids.len();
        if self.coordinates.len() != 3 * n || self.radii.len() != n {
            return Err(CouplingError::Configuration(format!(
                "proximity search input has {} ids, {} coordinates and {} radii",
                n,
                self.coordinates.len(),
                self.radii.len()
            )));
        }
        Ok(())
    }
}

/// Output of a proximity search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborCandidates {
    /// Every id the neighbor lists refer to, plus the searched points, sorted
    pub overlap_ids: Vec<GlobalId>,
    /// Candidates of input point i at index i, sorted by id
    pub neighbors: Vec<Vec<GlobalId>>,
}

impl NeighborCandidates {
    pub fn num_pairs(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }
}

/// A routine that finds, for each point, the points within its search radius
pub trait ProximitySearch {
    fn search(&self, input: &SearchInput) -> CouplingResult<NeighborCandidates>;
}

/// Uniform binning search over the points of this rank.
///
/// The bin size is the largest radius, so every candidate of a point lies in
/// the 27 bins around it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinnedSearch;

type BinKey = (i64, i64, i64);

fn bin_of(x: &Vector3<f64>, bin_size: f64) -> BinKey {
    (
        (x.x / bin_size).floor() as i64,
        (x.y / bin_size).floor() as i64,
        (x.z / bin_size).floor() as i64,
    )
}

impl ProximitySearch for BinnedSearch {
    fn search(&self, input: &SearchInput) -> CouplingResult<NeighborCandidates> {
        input.validate()?;

        let bin_size = input.radii.iter().cloned().fold(0.0, f64::max);
        if bin_size <= 0.0 {
            let mut overlap_ids = input.global_ids.clone();
            overlap_ids.sort_unstable();
            return Ok(NeighborCandidates {
                overlap_ids,
                neighbors: vec![Vec::new(); input.len()],
            });
        }

        let mut bins: HashMap<BinKey, Vec<usize>> = HashMap::new();
        for i in 0..input.len() {
            let x = read_vec3(&input.coordinates, i);
            bins.entry(bin_of(&x, bin_size)).or_default().push(i);
        }

        let neighbors: Vec<Vec<GlobalId>> = (0..input.len())
            .into_par_iter()
            .map(|i| {
                let radius = input.radii[i];
                if radius <= 0.0 {
                    return Vec::new();
                }
                let x = read_vec3(&input.coordinates, i);
                let (bx, by, bz) = bin_of(&x, bin_size);

                let mut found = Vec::new();
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            let Some(members) = bins.get(&(bx + dx, by + dy, bz + dz)) else {
                                continue;
                            };
                            for &j in members {
                                if j != i
                                    && (read_vec3(&input.coordinates, j) - x).norm() <= radius
                                {
                                    found.push(input.global_ids[j]);
                                }
                            }
                        }
                    }
                }
                found.sort_unstable();
                found
            })
            .collect();

        let mut overlap_ids: Vec<GlobalId> = input
            .global_ids
            .iter()
            .chain(neighbors.iter().flatten())
            .copied()
            .collect();
        overlap_ids.sort_unstable();
        overlap_ids.dedup();

        Ok(NeighborCandidates { overlap_ids, neighbors })
    }
}

fn element_dimension(mesh: &HostMesh, elem: &HostElement) -> CouplingResult<f64> {
    let mut largest_squared: f64 = 0.0;
    for (i, &a) in elem.nodes.iter().enumerate() {
        let pa = mesh.coordinates(a)?;
        for &b in &elem.nodes[i + 1..] {
            largest_squared = largest_squared.max((mesh.coordinates(b)? - pa).norm_squared());
        }
    }
    Ok(largest_squared.sqrt())
}

/// Largest node-to-node distance over the multi-node elements of this rank
pub fn largest_element_dimension(mesh: &HostMesh) -> CouplingResult<f64> {
    let solids: Vec<&HostElement> = mesh
        .elements()
        .map(|(_, elem)| elem)
        .filter(|elem| elem.num_nodes() > 1)
        .collect();

    let results: Vec<CouplingResult<f64>> = solids
        .par_iter()
        .map(|elem| element_dimension(mesh, elem))
        .collect();

    let mut largest: f64 = 0.0;
    for dimension in results {
        largest = largest.max(dimension?);
    }
    Ok(largest)
}

/// Search radius for sphere particles, identical on every rank.
///
/// Collective: one max-reduction.
pub fn estimate_interaction_radius<C: Communicator>(mesh: &HostMesh, comm: &C) -> CouplingResult<f64> {
    let largest = comm.all_reduce_max_f64(largest_element_dimension(mesh)?);
    let radius = SEARCH_RADIUS_FACTOR * largest;
    log::info!(
        "Overlapping element search: largest element dimension {:.6e}, proximity search radius {:.6e}",
        largest,
        radius
    );
    Ok(radius)
}

/// Coordinates, radii and normalized ids of the locally-owned nodes.
///
/// A node is a sphere particle when it belongs to exactly one element and that
/// element has a single node; only those receive `radius`.
pub fn prepare_search_input(mesh: &HostMesh, radius: f64) -> CouplingResult<SearchInput> {
    let attached = mesh.node_element_counts();
    let mut element_size = vec![0usize; mesh.num_nodes()];
    for (_, elem) in mesh.elements() {
        for &node in &elem.nodes {
            if let Some(size) = element_size.get_mut(node) {
                *size = elem.num_nodes();
            }
        }
    }

    let mut input = SearchInput::default();
    for node in 0..mesh.num_nodes() {
        if !mesh.nodes.owned[node] {
            continue;
        }
        let x = mesh.coordinates(node)?;
        input.coordinates.extend_from_slice(x.coords.as_slice());

        let is_sphere = attached[node] == 1 && element_size[node] == 1;
        input.radii.push(if is_sphere { radius } else { 0.0 });
        input
            .global_ids
            .push(normalize_id(mesh.node_global_id(node)?, "node")?);
    }
    Ok(input)
}

/// Run a proximity search on prepared input
pub fn build_candidate_pairs<P: ProximitySearch + ?Sized>(
    search: &P,
    input: &SearchInput,
) -> CouplingResult<NeighborCandidates> {
    let candidates = search.search(input)?;
    log::debug!(
        "Proximity search: {} points, {} candidate pairs",
        input.len(),
        candidates.num_pairs()
    );
    Ok(candidates)
}
