//! Coupling context for one simulation run.
//!
//! Constructed once by the host after the mesh is loaded and passed explicitly to
//! every call site. When the run has no peridynamic material the manager is
//! disabled: every operation is a no-op and queries return zero.

use nalgebra::Matrix3;

use super::allocator::{allocate, Allocation};
use super::output::{OutputField, OutputRegistry};
use super::proximity::{
    build_candidate_pairs, estimate_interaction_radius, prepare_search_input, NeighborCandidates,
    ProximitySearch,
};
use super::synchronizer::{self, StepClock};
use crate::comm::Communicator;
use crate::config::CouplingConfig;
use crate::error::CouplingResult;
use crate::mesh::{HostMesh, HostSolution};
use crate::solver::{BlockField, PeridynamicDiscretization, PeridynamicSolver, SolverBuilder};

struct ActiveCoupling<S> {
    allocation: Allocation,
    solver: S,
    /// Converged-step positions, interleaved by coupling local id
    previous_positions: Vec<f64>,
    clock: StepClock,
}

pub struct CouplingManager<S: PeridynamicSolver> {
    active: Option<ActiveCoupling<S>>,
    outputs: OutputRegistry,
}

impl<S: PeridynamicSolver> CouplingManager<S> {
    /// A manager that couples nothing
    pub fn disabled() -> Self {
        Self {
            active: None,
            outputs: OutputRegistry::new(),
        }
    }

    /// Number the particles, build the solver and register output fields.
    ///
    /// Collective over `comm` unless the configuration has no `[peridynamics]`
    /// section or the mesh has no peridynamic block, in which case the manager
    /// is returned disabled without communicating.
    pub fn initialize<C, B>(
        config: &CouplingConfig,
        mesh: &HostMesh,
        comm: &C,
        builder: &B,
    ) -> CouplingResult<Self>
    where
        C: Communicator,
        B: SolverBuilder<Solver = S>,
    {
        let Some(peridynamics) = &config.peridynamics else {
            log::info!("No peridynamics section in configuration; peridynamic coupling disabled");
            return Ok(Self::disabled());
        };

        let mut manager = Self::disabled();
        manager.outputs.register_all(&peridynamics.output_variables)?;

        let materials = config.material_assignment()?;
        let Some(allocation) =
            allocate(mesh, &materials, config.discretization.cubature_degree, comm)?
        else {
            return Ok(manager);
        };

        let particles = &allocation.particles;
        let discretization = PeridynamicDiscretization {
            global_ids: particles.global_ids.clone(),
            reference_positions: particles.reference_positions.clone(),
            volumes: particles.volumes.clone(),
            block_ids: particles.block_ids.clone(),
        };
        let solver = builder.build(discretization, &peridynamics.parameters)?;

        manager.active = Some(ActiveCoupling {
            previous_positions: allocation.particles.reference_positions.clone(),
            allocation,
            solver,
            clock: StepClock::default(),
        });
        Ok(manager)
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Hand the host displacement at `time` to the solver.
    ///
    /// The time step is measured from the last committed step; see
    /// [`synchronizer::FALLBACK_TIME_STEP`] for the non-positive case.
    pub fn push_state(&mut self, time: f64, displacement: &HostSolution) -> CouplingResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let dt = active.clock.advance_to(time);
        log::debug!(
            "Pushing state at t = {:.6e}, dt = {:.6e}, {} particles",
            time,
            dt,
            active.allocation.particles.len()
        );
        synchronizer::push_state(
            &mut active.solver,
            &active.allocation,
            &active.previous_positions,
            dt,
            displacement,
        )
    }

    /// Accept the last pushed step. Must precede the next `push_state`.
    pub fn commit_step(&mut self) -> CouplingResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        synchronizer::snapshot_positions(
            &active.solver,
            &active.allocation,
            &mut active.previous_positions,
        )?;
        active.solver.update_state();
        active.clock.commit();
        Ok(())
    }

    pub fn evaluate_internal_force(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.solver.compute_internal_force();
        }
    }

    /// Internal force component on a normalized host node id; 0.0 when disabled
    pub fn force(&self, host_node: u64, component: usize) -> CouplingResult<f64> {
        match &self.active {
            Some(active) => synchronizer::force(&active.solver, host_node, component),
            None => Ok(0.0),
        }
    }

    /// Partial stress at the quadrature points of a workset element.
    ///
    /// `values` is left untouched when disabled.
    pub fn partial_stress(
        &self,
        block: &str,
        workset: usize,
        workset_local_id: usize,
        values: &mut [Matrix3<f64>],
    ) -> CouplingResult<()> {
        match &self.active {
            Some(active) => synchronizer::partial_stress(
                &active.solver,
                &active.allocation,
                block,
                workset,
                workset_local_id,
                values,
            ),
            None => Ok(()),
        }
    }

    /// Solver field data of a block
    pub fn block_data(&self, block: &str, field: &str) -> Option<BlockField<'_>> {
        self.active.as_ref()?.solver.block_data(block, field)
    }

    pub fn write_sub_model(&mut self, time: f64) {
        if let Some(active) = self.active.as_mut() {
            active.solver.write_sub_model(time);
        }
    }

    /// Register additional output fields by peridynamic name
    pub fn register_output_fields(&mut self, variables: &toml::Table) -> CouplingResult<()> {
        self.outputs.register_all(variables)
    }

    pub fn output_fields(&self) -> &[OutputField] {
        self.outputs.fields()
    }

    /// Candidate sphere/solid pairs on this rank. Collective when enabled.
    pub fn overlapping_element_search<C, P>(
        &self,
        mesh: &HostMesh,
        comm: &C,
        search: &P,
    ) -> CouplingResult<Option<NeighborCandidates>>
    where
        C: Communicator,
        P: ProximitySearch + ?Sized,
    {
        if self.active.is_none() {
            return Ok(None);
        }
        let radius = estimate_interaction_radius(mesh, comm)?;
        let input = prepare_search_input(mesh, radius)?;
        build_candidate_pairs(search, &input).map(Some)
    }

    pub fn solver(&self) -> Option<&S> {
        self.active.as_ref().map(|a| &a.solver)
    }

    pub fn solver_mut(&mut self) -> Option<&mut S> {
        self.active.as_mut().map(|a| &mut a.solver)
    }

    pub fn allocation(&self) -> Option<&Allocation> {
        self.active.as_ref().map(|a| &a.allocation)
    }

    pub fn clock(&self) -> Option<&StepClock> {
        self.active.as_ref().map(|a| &a.clock)
    }

    pub fn previous_positions(&self) -> Option<&[f64]> {
        self.active.as_ref().map(|a| a.previous_positions.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use crate::coupling::proximity::BinnedSearch;
    use crate::error::CouplingError;
    use crate::mesh::CellTopology;
    use crate::solver::{InMemorySolver, InMemorySolverBuilder};

    fn sphere_mesh() -> HostMesh {
        let mut mesh = HostMesh::new();
        let b = mesh.add_block("block_1", None, CellTopology::Particle);
        let n = mesh.add_node(1, 0.0, 0.0, 0.0, true);
        let e = mesh.add_element(b, 1, &[n]);
        mesh.set_element_volume(e, 1.0);
        mesh
    }

    #[test]
    fn test_no_peridynamics_section() {
        let config = CouplingConfig::from_toml_str(
            r#"
            [materials.block_1]
            model = "Peridynamics"
            "#,
        )
        .unwrap();
        let comm = SerialComm::new();
        let manager: CouplingManager<InMemorySolver> =
            CouplingManager::initialize(&config, &sphere_mesh(), &comm, &InMemorySolverBuilder)
                .unwrap();

        assert!(!manager.is_enabled());
        assert_eq!(comm.collective_count(), 0);
    }

    #[test]
    fn test_disabled_queries() {
        let config = CouplingConfig::from_toml_str(
            r#"
            [peridynamics.output_variables]
            Force = true
            "#,
        )
        .unwrap();
        let comm = SerialComm::new();
        let mut manager =
            CouplingManager::initialize(&config, &sphere_mesh(), &comm, &InMemorySolverBuilder)
                .unwrap();

        assert!(!manager.is_enabled());
        assert_eq!(comm.collective_count(), 0);
        assert_eq!(manager.output_fields().len(), 1);

        assert_eq!(manager.force(12345, 2).unwrap(), 0.0);
        let mut values = [Matrix3::identity(); 2];
        manager.partial_stress("block_3", 0, 0, &mut values).unwrap();
        assert_eq!(values, [Matrix3::identity(); 2]);

        manager.push_state(0.0, &HostSolution::zeros(&[0])).unwrap();
        manager.commit_step().unwrap();
        manager.evaluate_internal_force();
        manager.write_sub_model(1.0);
        assert!(manager.block_data("block_1", "Force").is_none());
        assert!(manager
            .overlapping_element_search(&sphere_mesh(), &comm, &BinnedSearch)
            .unwrap()
            .is_none());
        assert_eq!(comm.collective_count(), 0);
    }

    #[test]
    fn test_unknown_output_variable() {
        let config = CouplingConfig::from_toml_str(
            r#"
            [peridynamics.output_variables]
            Damage = true
            "#,
        )
        .unwrap();
        let result: CouplingResult<CouplingManager<InMemorySolver>> = CouplingManager::initialize(
            &config,
            &sphere_mesh(),
            &SerialComm::new(),
            &InMemorySolverBuilder,
        );
        assert!(matches!(result, Err(CouplingError::Configuration(_))));
    }

    #[test]
    fn test_parameters_reach_solver() {
        let config = CouplingConfig::from_toml_str(
            r#"
            [materials.block_1]
            model = "Peridynamics"

            [peridynamics.parameters]
            horizon = 0.25
            "#,
        )
        .unwrap();
        let manager =
            CouplingManager::initialize(&config, &sphere_mesh(), &SerialComm::new(), &InMemorySolverBuilder)
                .unwrap();

        let solver = manager.solver().unwrap();
        assert_eq!(
            solver.parameters().get("horizon").and_then(|v| v.as_float()),
            Some(0.25)
        );
        assert_eq!(solver.discretization().global_ids, vec![0]);
        assert_eq!(manager.previous_positions().unwrap(), &[0.0, 0.0, 0.0]);
    }
}
