//! Global identifier allocation for peridynamic particles.
//!
//! Sphere particles reuse the host node numbering (normalized node id). Partial-stress
//! quadrature points draw ids from above every host element and node id on every
//! rank, split into consecutive per-rank ranges:
//!
//! ```text
//! first_id(r) = 1 + max_all_ranks(max element id, max node id) + Σ_{q < r} count(q)
//! ```
//!
//! The per-rank counts are gathered with one max-reduction per rank, each carrying
//! a value that is zero everywhere except on the rank being announced. It runs
//! once at setup, so the O(ranks) collectives are acceptable.

use std::collections::BTreeMap;
use nalgebra::Point3;

use super::mapping::MappingStore;
use super::particles::{GlobalId, ParticleTable};
use crate::comm::Communicator;
use crate::config::{MaterialAssignment, MaterialBehavior};
use crate::error::{CouplingError, CouplingResult};
use crate::fem::ElementSampler;
use crate::mesh::{CellTopology, ElementBlock, HostElement, HostMesh, VOLUME_FIELD};
use crate::mesh::topology::normalize_id;

/// A classical element promoted to peridynamic points at its quadrature points
#[derive(Debug, Clone)]
pub struct PartialStressElement {
    /// Normalized (0-based) host element id
    pub host_element_id: u64,
    /// Name of the block, keys the sampler cache
    pub block: String,
    pub topology: CellTopology,
    /// Normalized host node ids, in topology order
    pub host_nodes: Vec<u64>,
    /// Reference node positions, in topology order
    pub initial_positions: Vec<Point3<f64>>,
    /// Peridynamic global id of quadrature point i at index i
    pub peridynamic_ids: Vec<GlobalId>,
}

/// What the allocator found, reported once per rank
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationSummary {
    pub peridynamics_blocks: Vec<String>,
    pub partial_stress_blocks: Vec<String>,
    pub classical_blocks: Vec<String>,
    /// Largest normalized host element id on this rank
    pub max_element_id: u64,
    /// Largest normalized host node id on this rank
    pub max_node_id: u64,
    /// 1 + global max of the two above
    pub lowest_partial_stress_id: GlobalId,
    /// First partial-stress id of this rank's range
    pub first_partial_stress_id: GlobalId,
    pub num_partial_stress_ids: u64,
}

/// Result of numbering: particles, lookup tables and the geometry needed per step
#[derive(Debug, Clone)]
pub struct Allocation {
    pub particles: ParticleTable,
    pub mapping: MappingStore,
    /// Global ids of the sphere particles, in local id order
    pub sphere_ids: Vec<GlobalId>,
    pub partial_stress_elements: Vec<PartialStressElement>,
    /// One evaluation context per partial-stress block
    pub samplers: BTreeMap<String, ElementSampler>,
    pub summary: AllocationSummary,
}

/// Number the peridynamic particles of this rank.
///
/// # Arguments
/// * `mesh` - Rank-local host mesh (locally-owned elements only)
/// * `materials` - Block name → material model lookup
/// * `cubature_degree` - Degree of the partial-stress cubature rule
/// * `comm` - Communicator of all ranks taking part in the run
///
/// # Returns
/// `None` if no block is classified Peridynamics or PartialStress; in that case no
/// collective is issued. The block list is mesh metadata shared by all ranks, so
/// every rank takes the same branch.
pub fn allocate<C: Communicator>(
    mesh: &HostMesh,
    materials: &MaterialAssignment,
    cubature_degree: i32,
    comm: &C,
) -> CouplingResult<Option<Allocation>> {
    let mut summary = AllocationSummary::default();
    let behaviors: Vec<MaterialBehavior> = mesh
        .blocks
        .iter()
        .map(|block| materials.behavior(&block.name))
        .collect();

    for (block, behavior) in mesh.blocks.iter().zip(&behaviors) {
        let names = match behavior {
            MaterialBehavior::Peridynamics => &mut summary.peridynamics_blocks,
            MaterialBehavior::PartialStress => &mut summary.partial_stress_blocks,
            MaterialBehavior::ClassicalContinuum => &mut summary.classical_blocks,
        };
        names.push(block.name.clone());
    }

    if summary.peridynamics_blocks.is_empty() && summary.partial_stress_blocks.is_empty() {
        log::info!(
            "No peridynamics or partial stress blocks (classical: {:?}); peridynamic coupling disabled",
            summary.classical_blocks
        );
        return Ok(None);
    }

    let mut mapping = MappingStore::new();
    let mut block_ids = Vec::with_capacity(mesh.blocks.len());
    for block in &mesh.blocks {
        let id = block.resolve_block_id()?;
        mapping.set_block_id(&block.name, id);
        block_ids.push(id);
    }

    let mut particles = ParticleTable::with_capacity(mesh.num_elements());
    let mut sphere_ids = Vec::new();
    let mut samplers = BTreeMap::new();

    for ((block, behavior), &block_id) in mesh.blocks.iter().zip(&behaviors).zip(&block_ids) {
        match behavior {
            MaterialBehavior::Peridynamics => {
                for elem in &block.elements {
                    let (global_id, position, volume) = sphere_particle(mesh, block, elem)?;
                    let local_id = particles.push(global_id, position, volume, block_id);
                    mapping.insert_particle(global_id, local_id)?;
                    sphere_ids.push(global_id);
                }
            }
            MaterialBehavior::PartialStress => {
                let sampler = ElementSampler::new(block.topology, cubature_degree)?;
                summary.num_partial_stress_ids +=
                    (sampler.num_points() * block.num_elements()) as u64;
                samplers.insert(block.name.clone(), sampler);
            }
            MaterialBehavior::ClassicalContinuum => {}
        }

        for elem in &block.elements {
            summary.max_element_id = summary.max_element_id.max(elem.normalized_id()?);
            for &node in &elem.nodes {
                let node_id = normalize_id(mesh.node_global_id(node)?, "node")?;
                summary.max_node_id = summary.max_node_id.max(node_id);
            }
        }
    }

    // Collective: lowest id no host entity on any rank can have
    summary.lowest_partial_stress_id =
        comm.all_reduce_max_u64(1 + summary.max_element_id.max(summary.max_node_id));

    // Collective: one reduction per rank to learn everyone's partial-stress count
    let rank = comm.rank();
    summary.first_partial_stress_id = summary.lowest_partial_stress_id;
    for announcing in 0..comm.size() {
        let local = if rank == announcing { summary.num_partial_stress_ids } else { 0 };
        let count = comm.all_reduce_max_u64(local);
        if rank > announcing {
            summary.first_partial_stress_id += count;
        }
    }

    let mut partial_stress_elements = Vec::new();
    let mut next_id = summary.first_partial_stress_id;
    for ((block, behavior), &block_id) in mesh.blocks.iter().zip(&behaviors).zip(&block_ids) {
        if *behavior != MaterialBehavior::PartialStress {
            continue;
        }
        let sampler = &samplers[&block.name];

        for elem in &block.elements {
            let element = promote_element(
                mesh,
                block,
                elem,
                sampler,
                cubature_degree,
                &mut next_id,
                |id, pos, vol| {
                    let local_id = particles.push(id, pos, vol, block_id);
                    mapping.insert_particle(id, local_id)
                },
            )?;
            mapping.set_partial_stress_ids(element.host_element_id, element.peridynamic_ids.clone());
            partial_stress_elements.push(element);
        }
    }

    mapping.build_worksets(&mesh.worksets)?;

    log::info!(
        "Peridynamic coupling on rank {}: peridynamics blocks {:?}, partial stress blocks {:?}, \
         classical blocks {:?}, max host element id {}, max host node id {}, \
         first partial stress id {}, {} partial stress material points",
        rank,
        summary.peridynamics_blocks,
        summary.partial_stress_blocks,
        summary.classical_blocks,
        summary.max_element_id,
        summary.max_node_id,
        summary.first_partial_stress_id,
        summary.num_partial_stress_ids
    );

    Ok(Some(Allocation {
        particles,
        mapping,
        sphere_ids,
        partial_stress_elements,
        samplers,
        summary,
    }))
}

/// Id, position and volume of the particle a sphere element stands for
fn sphere_particle(
    mesh: &HostMesh,
    block: &ElementBlock,
    elem: &HostElement,
) -> CouplingResult<(GlobalId, Point3<f64>, f64)> {
    if elem.num_nodes() != 1 {
        return Err(CouplingError::Topology(format!(
            "\"Peridynamics\" material model may be assigned only to sphere elements; \
             element {} of block {} has {} nodes",
            elem.global_id,
            block.name,
            elem.num_nodes()
        )));
    }

    let node = elem.nodes[0];
    let global_id = normalize_id(mesh.node_global_id(node)?, "node")?;
    let position = mesh.coordinates(node)?;
    let volume = mesh
        .element_fields
        .require_field(VOLUME_FIELD)?
        .data
        .get(elem.local_index)
        .copied()
        .ok_or_else(|| {
            CouplingError::Configuration(format!(
                "volume field has no value for element {} of block {}",
                elem.global_id, block.name
            ))
        })?;

    Ok((global_id, position, volume))
}

/// Evaluate a solid element's quadrature points and hand each one an id
fn promote_element<F>(
    mesh: &HostMesh,
    block: &ElementBlock,
    elem: &HostElement,
    sampler: &ElementSampler,
    cubature_degree: i32,
    next_id: &mut GlobalId,
    mut add_particle: F,
) -> CouplingResult<PartialStressElement>
where
    F: FnMut(GlobalId, Point3<f64>, f64) -> CouplingResult<()>,
{
    if elem.num_nodes() != block.topology.node_count() {
        return Err(CouplingError::Topology(format!(
            "element {} of partial stress block {} has {} nodes, {} expects {}",
            elem.global_id,
            block.name,
            elem.num_nodes(),
            block.topology.name(),
            block.topology.node_count()
        )));
    }

    let mut host_nodes = Vec::with_capacity(elem.num_nodes());
    let mut initial_positions = Vec::with_capacity(elem.num_nodes());
    for &node in &elem.nodes {
        host_nodes.push(normalize_id(mesh.node_global_id(node)?, "node")?);
        initial_positions.push(mesh.coordinates(node)?);
    }

    let points = sampler.physical_points(&initial_positions)?;
    let volumes = sampler.weighted_measures(&initial_positions)?;
    if let Some((q, volume)) = volumes.iter().enumerate().find(|(_, v)| **v <= 0.0) {
        return Err(CouplingError::Configuration(format!(
            "cubature degree {} gives quadrature point {} of element {} in partial stress block {} \
             the non-positive volume {:.6e}",
            cubature_degree, q, elem.global_id, block.name, volume
        )));
    }

    let mut peridynamic_ids = Vec::with_capacity(points.len());
    for (point, volume) in points.into_iter().zip(volumes) {
        let id = *next_id;
        *next_id += 1;
        add_particle(id, point, volume)?;
        peridynamic_ids.push(id);
    }

    Ok(PartialStressElement {
        host_element_id: elem.normalized_id()?,
        block: block.name.clone(),
        topology: block.topology,
        host_nodes,
        initial_positions,
        peridynamic_ids,
    })
}
