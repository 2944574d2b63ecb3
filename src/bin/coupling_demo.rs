use nalgebra::Vector3;
use peri_coupling::{
    BinnedSearch, CellTopology, CouplingConfig, CouplingManager, CouplingResult, HostMesh,
    HostSolution, InMemorySolverBuilder, SerialComm,
};

const CONFIG: &str = r#"
[discretization]
cubature_degree = 2

[materials.block_1]
model = "Peridynamics"

[materials.block_2]
model = "Elastic"

[materials.block_3]
model = "Peridynamic Partial Stress"

[peridynamics.parameters]
horizon = 0.75

[peridynamics.output_variables]
Displacement = true
Velocity = true
Partial_Stress = true
"#;

fn add_tet(mesh: &mut HostMesh, block: usize, element_id: u64, first_node_id: u64, origin: Vector3<f64>) {
    let corners: [Vector3<f64>; 4] = [Vector3::zeros(), Vector3::x(), Vector3::y(), Vector3::z()];
    let nodes: Vec<usize> = corners
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let x = origin + c * 0.5;
            mesh.add_node(first_node_id + i as u64, x.x, x.y, x.z, true)
        })
        .collect();
    mesh.add_element(block, element_id, &nodes);
}

fn build_mesh() -> HostMesh {
    let mut mesh = HostMesh::new();
    let spheres = mesh.add_block("block_1", None, CellTopology::Particle);
    let classical = mesh.add_block("block_2", None, CellTopology::Tet4);
    let partial = mesh.add_block("block_3", None, CellTopology::Tet4);

    for i in 0..4u64 {
        let n = mesh.add_node(1 + i, 0.25 * i as f64, -1.0, 0.0, true);
        let e = mesh.add_element(spheres, 1 + i, &[n]);
        mesh.set_element_volume(e, 0.125);
    }

    add_tet(&mut mesh, classical, 5, 5, Vector3::new(0.0, 1.0, 0.0));
    add_tet(&mut mesh, partial, 6, 9, Vector3::new(0.0, 0.0, 0.0));
    add_tet(&mut mesh, partial, 7, 13, Vector3::new(1.0, 0.0, 0.0));

    mesh.add_workset_entry(5, 0, 0);
    mesh.add_workset_entry(6, 1, 0);
    mesh.add_workset_entry(7, 1, 1);
    mesh
}

/// Uniform stretch along x at rate `strain_rate`
fn stretch(mesh: &HostMesh, strain_rate: f64, time: f64) -> CouplingResult<HostSolution> {
    let ids: Vec<u64> = mesh.nodes.global_ids.iter().map(|id| id - 1).collect();
    let mut u = HostSolution::zeros(&ids);
    for (node, &id) in ids.iter().enumerate() {
        let x = mesh.coordinates(node)?;
        u.set_displacement(id, Vector3::new(strain_rate * time * x.x, 0.0, 0.0))?;
    }
    Ok(u)
}

fn max_norm(values: &[f64]) -> f64 {
    values
        .chunks(3)
        .map(|v| Vector3::from_column_slice(v).norm())
        .fold(0.0, f64::max)
}

fn run() -> CouplingResult<()> {
    println!("=== Mesh / Peridynamic Coupling Demo ===\n");

    let config = CouplingConfig::from_toml_str(CONFIG)?;

    let mesh = build_mesh();
    println!("Host mesh:");
    println!("  Nodes: {}", mesh.num_nodes());
    println!("  Elements: {}", mesh.num_elements());
    for block in &mesh.blocks {
        println!("  {} ({}): {} elements", block.name, block.topology.name(), block.num_elements());
    }

    let comm = SerialComm::new();
    let mut manager = CouplingManager::initialize(&config, &mesh, &comm, &InMemorySolverBuilder)?;

    let Some(allocation) = manager.allocation() else {
        println!("\nPeridynamic coupling disabled");
        return Ok(());
    };

    println!("\nAllocation:");
    println!("  Sphere particles: {:?}", allocation.sphere_ids);
    println!(
        "  Lowest partial stress id: {}",
        allocation.summary.lowest_partial_stress_id
    );
    for element in &allocation.partial_stress_elements {
        println!(
            "  Element {} -> peridynamic ids {:?}",
            element.host_element_id, element.peridynamic_ids
        );
    }
    println!("  Collectives issued: {}", comm.collective_count());

    println!("\nOutput fields:");
    for field in manager.output_fields() {
        println!("  {} ({:?}, {} components)", field.host_name, field.relation, field.length);
    }

    let strain_rate = 0.01;
    let times = [0.0, 0.5, 1.0, 1.5];

    println!("\nTime stepping (strain rate {:.3}):", strain_rate);
    println!("{:>8} {:>10} {:>14} {:>14}", "t", "dt", "max |v|", "max |u|");
    for &time in &times {
        manager.push_state(time, &stretch(&mesh, strain_rate, time)?)?;
        manager.evaluate_internal_force();

        let dt = manager.clock().map(|c| c.time_step).unwrap_or(0.0);
        let (max_v, max_u) = manager
            .solver()
            .map(|s| (max_norm(s.velocities()), max_norm(s.displacements())))
            .unwrap_or((0.0, 0.0));
        println!("{:>8.3} {:>10.3} {:>14.6e} {:>14.6e}", time, dt, max_v, max_u);

        manager.commit_step()?;
        manager.write_sub_model(time);
    }

    if let Some(candidates) = manager.overlapping_element_search(&mesh, &comm, &BinnedSearch)? {
        println!("\nOverlapping element search:");
        println!("  Points searched: {}", candidates.neighbors.len());
        println!("  Candidate pairs: {}", candidates.num_pairs());
    }

    println!("\nDone.");
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
