//! Seam to the peridynamic solver.
//!
//! The solver owns its position, displacement, velocity and force arrays. The
//! coupling writes and reads them only through `PeridynamicSolver`, addressing
//! entries by the solver's own local numbering.

use std::collections::HashMap;

use crate::coupling::particles::{read_vec3, GlobalId, ParticleMap};
use crate::error::{CouplingError, CouplingResult};
use nalgebra::Vector3;

/// Everything a peridynamic solver needs to build its discretization
#[derive(Debug, Clone, Default)]
pub struct PeridynamicDiscretization {
    pub global_ids: Vec<GlobalId>,
    /// Interleaved reference positions
    pub reference_positions: Vec<f64>,
    pub volumes: Vec<f64>,
    pub block_ids: Vec<i32>,
}

impl PeridynamicDiscretization {
    pub fn num_points(&self) -> usize {
        self.global_ids.len()
    }
}

/// Mutable view of the solver's kinematic state, all arrays interleaved by solver local id
pub struct Kinematics<'a> {
    pub reference: &'a [f64],
    pub current: &'a mut [f64],
    pub displacement: &'a mut [f64],
    pub velocity: &'a mut [f64],
}

/// Named per-block field published by the solver
#[derive(Debug, Clone, Copy)]
pub struct BlockField<'a> {
    pub values: &'a [f64],
    /// Values per point (1, 3 or 9)
    pub components: usize,
    /// Numbering of `values`
    pub map: &'a ParticleMap,
}

impl<'a> BlockField<'a> {
    /// Components of one point, by peridynamic global id
    pub fn point(&self, global_id: GlobalId) -> Option<&'a [f64]> {
        let local = self.map.local_id(global_id)?;
        let start = local * self.components;
        self.values.get(start..start + self.components)
    }
}

/// Driving interface of a peridynamic solver
pub trait PeridynamicSolver {
    /// The solver's global id → solver local id numbering
    fn particle_map(&self) -> &ParticleMap;

    fn set_time_step(&mut self, dt: f64);

    fn kinematics_mut(&mut self) -> Kinematics<'_>;

    /// Interleaved current positions
    fn current_positions(&self) -> &[f64];

    /// Interleaved internal force
    fn force(&self) -> &[f64];

    fn compute_internal_force(&mut self);

    /// Accept the current step as converged
    fn update_state(&mut self);

    /// Field data of one block, if the solver publishes that field
    fn block_data(&self, block: &str, field: &str) -> Option<BlockField<'_>>;

    /// Solver-side output of the peridynamic sub-model
    fn write_sub_model(&mut self, _time: f64) {}
}

/// Constructs the solver once the coupling has numbered its particles
pub trait SolverBuilder {
    type Solver: PeridynamicSolver;

    /// # Arguments
    /// * `discretization` - Particle ids, positions, volumes and block ids
    /// * `parameters` - The configuration's peridynamics parameter bag, unmodified
    fn build(
        &self,
        discretization: PeridynamicDiscretization,
        parameters: &toml::Table,
    ) -> CouplingResult<Self::Solver>;
}

/// Peridynamic state container without a constitutive model.
///
/// Internal force stays whatever was last set through `set_force`; evaluation
/// only counts calls. Used to drive the coupling without an external code.
#[derive(Debug, Clone)]
pub struct InMemorySolver {
    discretization: PeridynamicDiscretization,
    map: ParticleMap,
    parameters: toml::Table,
    time_step: f64,
    current: Vec<f64>,
    displacement: Vec<f64>,
    velocity: Vec<f64>,
    force: Vec<f64>,
    block_fields: HashMap<(String, String), (usize, Vec<f64>)>,
    force_evaluations: usize,
    state_updates: usize,
    sub_model_writes: Vec<f64>,
}

impl InMemorySolver {
    pub fn new(discretization: PeridynamicDiscretization, parameters: toml::Table) -> Self {
        let n = discretization.num_points();
        Self {
            map: ParticleMap::from_global_ids(&discretization.global_ids),
            current: discretization.reference_positions.clone(),
            displacement: vec![0.0; 3 * n],
            velocity: vec![0.0; 3 * n],
            force: vec![0.0; 3 * n],
            discretization,
            parameters,
            time_step: 0.0,
            block_fields: HashMap::new(),
            force_evaluations: 0,
            state_updates: 0,
            sub_model_writes: Vec::new(),
        }
    }

    pub fn discretization(&self) -> &PeridynamicDiscretization {
        &self.discretization
    }

    pub fn parameters(&self) -> &toml::Table {
        &self.parameters
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn displacements(&self) -> &[f64] {
        &self.displacement
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocity
    }

    fn require_local(&self, global_id: GlobalId) -> CouplingResult<usize> {
        self.map.local_id(global_id).ok_or_else(|| {
            CouplingError::Mapping(format!("solver has no point with global id {}", global_id))
        })
    }

    /// Velocity of a point, by global id
    pub fn velocity_of(&self, global_id: GlobalId) -> CouplingResult<Vector3<f64>> {
        Ok(read_vec3(&self.velocity, self.require_local(global_id)?))
    }

    /// Current position of a point, by global id
    pub fn position_of(&self, global_id: GlobalId) -> CouplingResult<Vector3<f64>> {
        Ok(read_vec3(&self.current, self.require_local(global_id)?))
    }

    /// Displacement of a point, by global id
    pub fn displacement_of(&self, global_id: GlobalId) -> CouplingResult<Vector3<f64>> {
        Ok(read_vec3(&self.displacement, self.require_local(global_id)?))
    }

    /// Overwrite the internal force of a point
    pub fn set_force(&mut self, global_id: GlobalId, f: Vector3<f64>) -> CouplingResult<()> {
        let local = self.require_local(global_id)?;
        self.force[3 * local..3 * local + 3].copy_from_slice(f.as_slice());
        Ok(())
    }

    /// Publish a per-block field, laid out by solver local id with `components` values per point
    pub fn set_block_field(&mut self, block: &str, field: &str, components: usize, values: Vec<f64>) {
        self.block_fields
            .insert((block.to_string(), field.to_string()), (components, values));
    }

    pub fn force_evaluations(&self) -> usize {
        self.force_evaluations
    }

    pub fn state_updates(&self) -> usize {
        self.state_updates
    }

    pub fn sub_model_writes(&self) -> &[f64] {
        &self.sub_model_writes
    }
}

impl PeridynamicSolver for InMemorySolver {
    fn particle_map(&self) -> &ParticleMap {
        &self.map
    }

    fn set_time_step(&mut self, dt: f64) {
        self.time_step = dt;
    }

    fn kinematics_mut(&mut self) -> Kinematics<'_> {
        Kinematics {
            reference: &self.discretization.reference_positions,
            current: &mut self.current,
            displacement: &mut self.displacement,
            velocity: &mut self.velocity,
        }
    }

    fn current_positions(&self) -> &[f64] {
        &self.current
    }

    fn force(&self) -> &[f64] {
        &self.force
    }

    fn compute_internal_force(&mut self) {
        self.force_evaluations += 1;
    }

    fn update_state(&mut self) {
        self.state_updates += 1;
    }

    fn block_data(&self, block: &str, field: &str) -> Option<BlockField<'_>> {
        let (components, values) = match field {
            "Displacement" => (3, self.displacement.as_slice()),
            "Velocity" => (3, self.velocity.as_slice()),
            "Force" => (3, self.force.as_slice()),
            "Coordinates" => (3, self.current.as_slice()),
            "Model_Coordinates" => (3, self.discretization.reference_positions.as_slice()),
            "Volume" => (1, self.discretization.volumes.as_slice()),
            _ => {
                let (components, values) = self
                    .block_fields
                    .get(&(block.to_string(), field.to_string()))?;
                (*components, values.as_slice())
            }
        };

        Some(BlockField {
            values,
            components,
            map: &self.map,
        })
    }

    fn write_sub_model(&mut self, time: f64) {
        self.sub_model_writes.push(time);
    }
}

/// Builds an `InMemorySolver`
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemorySolverBuilder;

impl SolverBuilder for InMemorySolverBuilder {
    type Solver = InMemorySolver;

    fn build(
        &self,
        discretization: PeridynamicDiscretization,
        parameters: &toml::Table,
    ) -> CouplingResult<InMemorySolver> {
        Ok(InMemorySolver::new(discretization, parameters.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_points() -> InMemorySolver {
        InMemorySolver::new(
            PeridynamicDiscretization {
                global_ids: vec![8, 3],
                reference_positions: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
                volumes: vec![0.1, 0.2],
                block_ids: vec![1, 1],
            },
            toml::Table::new(),
        )
    }

    #[test]
    fn test_initial_state() {
        let solver = two_points();
        assert_eq!(solver.current_positions(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(solver.particle_map().local_id(3), Some(1));
        assert_eq!(solver.force(), &[0.0; 6]);
    }

    #[test]
    fn test_block_field_lookup() {
        let mut solver = two_points();
        solver.set_block_field("block_3", "Partial_Stress", 9, (0..18).map(|v| v as f64).collect());

        let field = solver.block_data("block_3", "Partial_Stress").unwrap();
        assert_eq!(field.components, 9);
        assert_eq!(field.point(3).unwrap()[0], 9.0);
        assert!(field.point(99).is_none());

        assert!(solver.block_data("block_3", "Damage").is_none());
        assert_eq!(solver.block_data("block_1", "Volume").unwrap().point(8), Some(&[0.1][..]));
    }

    #[test]
    fn test_set_force_unknown_id() {
        let mut solver = two_points();
        assert!(solver.set_force(8, Vector3::new(1.0, 0.0, 0.0)).is_ok());
        assert!(matches!(
            solver.set_force(5, Vector3::zeros()),
            Err(CouplingError::Mapping(_))
        ));
    }
}
