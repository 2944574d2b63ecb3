#![allow(dead_code)]

use std::thread;

use nalgebra::Vector3;
use peri_coupling::{CellTopology, CouplingConfig, HostMesh, HostSolution, ThreadComm};

/// Host ids reserved per rank, so ranks never share a node or element id
pub const IDS_PER_RANK: u64 = 20;

/// Edge length of the scenario tetrahedra
pub const TET_SIZE: f64 = 0.5;

fn add_tet(mesh: &mut HostMesh, block: usize, element_id: u64, first_node_id: u64, origin: [f64; 3]) {
    let offsets = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let nodes: Vec<usize> = offsets
        .iter()
        .enumerate()
        .map(|(i, o)| {
            mesh.add_node(
                first_node_id + i as u64,
                origin[0] + TET_SIZE * o[0],
                origin[1] + TET_SIZE * o[1],
                origin[2] + TET_SIZE * o[2],
                true,
            )
        })
        .collect();
    mesh.add_element(block, element_id, &nodes);
}

/// Rank-local mesh of the coupling scenario.
///
/// * `block_1`: two sphere elements
/// * `block_2`: one classical Tet4, workset 0
/// * `block_3`: two partial-stress Tet4s, workset 1
///
/// Host ids on rank r are `20 r + 1 ..`; node ids run to `20 r + 14`, element
/// ids to `20 r + 5`.
pub fn scenario_mesh(rank: usize) -> HostMesh {
    let base = IDS_PER_RANK * rank as u64;
    let x0 = 10.0 * rank as f64;
    let mut mesh = HostMesh::new();

    let spheres = mesh.add_block("block_1", None, CellTopology::Particle);
    let classical = mesh.add_block("block_2", None, CellTopology::Tet4);
    let partial = mesh.add_block("block_3", None, CellTopology::Tet4);

    for i in 0..2u64 {
        let n = mesh.add_node(base + 1 + i, x0 + i as f64, 0.0, 0.0, true);
        let e = mesh.add_element(spheres, base + 1 + i, &[n]);
        mesh.set_element_volume(e, 0.5);
    }

    add_tet(&mut mesh, classical, base + 3, base + 3, [x0, 2.0, 0.0]);
    mesh.add_workset_entry(base + 3, 0, 0);

    add_tet(&mut mesh, partial, base + 4, base + 7, [x0, 4.0, 0.0]);
    add_tet(&mut mesh, partial, base + 5, base + 11, [x0 + 1.0, 4.0, 0.0]);
    mesh.add_workset_entry(base + 5, 1, 1);
    mesh.add_workset_entry(base + 4, 1, 0);

    mesh
}

pub fn scenario_config(cubature_degree: i32) -> CouplingConfig {
    CouplingConfig::from_toml_str(&format!(
        r#"
        [discretization]
        cubature_degree = {}

        [materials.block_1]
        model = "Peridynamics"

        [materials.block_2]
        model = "Elastic"

        [materials.block_3]
        model = "Peridynamic Partial Stress"

        [peridynamics.parameters]
        horizon = 1.5

        [peridynamics.output_variables]
        Displacement = true
        Partial_Stress = true
        "#,
        cubature_degree
    ))
    .expect("scenario config parses")
}

/// Normalized ids of every node of the mesh, in local order
pub fn normalized_node_ids(mesh: &HostMesh) -> Vec<u64> {
    mesh.nodes.global_ids.iter().map(|id| id - 1).collect()
}

/// Host displacement `u(x) = scale * (G x + c)` at every node
pub fn affine_displacement(
    mesh: &HostMesh,
    scale: f64,
    field: impl Fn(Vector3<f64>) -> Vector3<f64>,
) -> HostSolution {
    let ids = normalized_node_ids(mesh);
    let mut u = HostSolution::zeros(&ids);
    for (node, &id) in ids.iter().enumerate() {
        let x = mesh.coordinates(node).unwrap().coords;
        u.set_displacement(id, scale * field(x)).unwrap();
    }
    u
}

/// Run `f` once per rank, each on its own thread with its own communicator
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, ThreadComm) -> T + Sync,
{
    let comms = ThreadComm::group(size);
    thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let f = &f;
                s.spawn(move || f(rank, comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}
