mod common;

use std::collections::HashSet;

use common::{run_ranks, scenario_config, scenario_mesh, IDS_PER_RANK};
use peri_coupling::{allocate, Allocation, CouplingManager, InMemorySolver, InMemorySolverBuilder, SerialComm};

fn allocate_scenario(size: usize, cubature_degree: i32) -> Vec<(Allocation, usize)> {
    run_ranks(size, |rank, comm| {
        let mesh = scenario_mesh(rank);
        let materials = scenario_config(cubature_degree).material_assignment().unwrap();
        let allocation = allocate(&mesh, &materials, cubature_degree, &comm)
            .unwrap()
            .expect("scenario has peridynamic blocks");
        (allocation, comm.collective_count())
    })
}

#[test]
fn test_two_rank_scenario() {
    let results = allocate_scenario(2, 1);
    let (rank0, rank1) = (&results[0].0, &results[1].0);

    // Sphere ids are host node ids - 1
    assert_eq!(rank0.sphere_ids, vec![0, 1]);
    assert_eq!(rank1.sphere_ids, vec![20, 21]);

    // Highest host ids live on rank 1: node 34, element 25
    assert_eq!(rank0.summary.lowest_partial_stress_id, 34);
    assert_eq!(rank1.summary.lowest_partial_stress_id, 34);

    let ps = |a: &Allocation| -> Vec<u64> {
        a.partial_stress_elements
            .iter()
            .flat_map(|e| e.peridynamic_ids.clone())
            .collect()
    };
    assert_eq!(ps(rank0), vec![34, 35]);
    assert_eq!(ps(rank1), vec![36, 37]);

    // One reduction for the id bound, one per rank for the offsets
    for (_, collectives) in &results {
        assert_eq!(*collectives, 3);
    }
}

#[test]
fn test_ids_unique_across_ranks() {
    let results = allocate_scenario(3, 2);

    let mut seen = HashSet::new();
    for (allocation, _) in &results {
        for &id in &allocation.particles.global_ids {
            assert!(seen.insert(id), "global id {} allocated twice", id);
        }
    }
    // 3 ranks x (2 spheres + 2 elements x 4 points)
    assert_eq!(seen.len(), 30);

    let lowest = 1 + (2 * IDS_PER_RANK + 14 - 1);
    let mut expected_first = lowest;
    for (allocation, _) in &results {
        let summary = &allocation.summary;
        assert_eq!(summary.lowest_partial_stress_id, lowest);
        assert_eq!(summary.first_partial_stress_id, expected_first);
        assert_eq!(summary.num_partial_stress_ids, 8);

        let ids: Vec<u64> = allocation
            .partial_stress_elements
            .iter()
            .flat_map(|e| e.peridynamic_ids.iter().copied())
            .collect();
        let contiguous: Vec<u64> = (expected_first..expected_first + 8).collect();
        assert_eq!(ids, contiguous);
        expected_first += 8;
    }
}

#[test]
fn test_mapping_round_trip() {
    let results = allocate_scenario(2, 2);
    for (allocation, _) in &results {
        let mapping = &allocation.mapping;
        assert_eq!(mapping.num_particles(), allocation.particles.len());
        for local in 0..mapping.num_particles() {
            let global = mapping.global_id(local).unwrap();
            assert_eq!(mapping.local_id(global), Some(local));
            assert_eq!(allocation.particles.global_ids[local], global);
        }
        assert_eq!(mapping.local_id(10_000), None);
    }
}

#[test]
fn test_workset_lookup_reaches_quadrature_ids() {
    let results = allocate_scenario(2, 2);
    for (rank, (allocation, _)) in results.iter().enumerate() {
        let base = IDS_PER_RANK * rank as u64;
        let mapping = &allocation.mapping;

        // Workset 0 holds the classical element: no partial stress ids
        let classical = mapping.workset_element(0, 0).unwrap();
        assert_eq!(classical, base + 2);
        assert!(mapping.partial_stress_ids(classical).is_err());

        let second = mapping.workset_element(1, 1).unwrap();
        assert_eq!(second, base + 4);
        let element = &allocation.partial_stress_elements[1];
        assert_eq!(element.host_element_id, second);
        assert_eq!(mapping.partial_stress_ids(second).unwrap(), element.peridynamic_ids.as_slice());
    }
}

#[test]
fn test_block_ids_and_volumes() {
    let allocation = allocate_scenario(1, 2).remove(0).0;
    assert_eq!(allocation.mapping.block_id("block_2"), Some(2));
    assert_eq!(allocation.particles.block_ids[..2], [1, 1]);
    assert!(allocation.particles.block_ids[2..].iter().all(|&b| b == 3));

    let tet_volume = common::TET_SIZE.powi(3) / 6.0;
    let ps_volume: f64 = allocation.particles.volumes[2..].iter().sum();
    approx::assert_relative_eq!(ps_volume, 2.0 * tet_volume, epsilon = 1e-14);
    assert_eq!(allocation.samplers.len(), 1);
    assert_eq!(allocation.samplers["block_3"].num_points(), 4);
}

#[test]
fn test_manager_on_every_rank() {
    let particle_counts = run_ranks(2, |rank, comm| {
        let mesh = scenario_mesh(rank);
        let manager: CouplingManager<InMemorySolver> =
            CouplingManager::initialize(&scenario_config(2), &mesh, &comm, &InMemorySolverBuilder)
                .unwrap();
        assert!(manager.is_enabled());
        assert_eq!(manager.output_fields().len(), 2);
        manager.solver().unwrap().discretization().num_points()
    });
    assert_eq!(particle_counts, vec![10, 10]);
}

#[test]
fn test_classical_only_mesh_is_disabled() {
    let mut config = scenario_config(2);
    config.materials.clear();

    let comm = SerialComm::new();
    let manager: CouplingManager<InMemorySolver> =
        CouplingManager::initialize(&config, &scenario_mesh(0), &comm, &InMemorySolverBuilder).unwrap();
    assert!(!manager.is_enabled());
    assert_eq!(comm.collective_count(), 0);
    assert_eq!(manager.force(0, 0).unwrap(), 0.0);
}
