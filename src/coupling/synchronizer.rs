//! Per-step exchange of kinematic state with the peridynamic solver.
//!
//! Pushing a step is done in two phases: gather the target of every particle
//! (displacement for sphere particles, deformed quadrature-point position for
//! partial-stress points) while only reading the solver, then scatter positions,
//! displacements and velocities through one mutable borrow of its arrays.

use nalgebra::{Matrix3, Vector3};

use super::allocator::Allocation;
use super::particles::{read_vec3, write_vec3, GlobalId};
use crate::error::{CouplingError, CouplingResult};
use crate::mesh::HostSolution;
use crate::solver::PeridynamicSolver;

/// Time step used when the step length is not positive, e.g. when forces are
/// evaluated at time zero. A numerical guard against dividing by zero in the
/// velocity estimate, not a physical time step.
pub const FALLBACK_TIME_STEP: f64 = 1.0;

/// Name of the solver field holding the partial stress tensor
pub const PARTIAL_STRESS_FIELD: &str = "Partial_Stress";

/// Times of the last converged step and of the step being attempted
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepClock {
    pub previous_time: f64,
    pub current_time: f64,
    pub time_step: f64,
}

impl StepClock {
    /// Move the attempted step to `time`; returns the time step to use
    pub fn advance_to(&mut self, time: f64) -> f64 {
        self.current_time = time;
        self.time_step = time - self.previous_time;
        if self.time_step <= 0.0 {
            log::debug!(
                "Non-positive time step {:.3e} at t = {:.6e}, using {}",
                self.time_step,
                time,
                FALLBACK_TIME_STEP
            );
            self.time_step = FALLBACK_TIME_STEP;
        }
        self.time_step
    }

    /// Accept the attempted step
    pub fn commit(&mut self) {
        self.previous_time = self.current_time;
    }
}

enum Target {
    Displacement(Vector3<f64>),
    Position(Vector3<f64>),
}

struct PointUpdate {
    solver_local: usize,
    coupling_local: usize,
    target: Target,
}

fn solver_local<S: PeridynamicSolver>(solver: &S, global_id: GlobalId) -> CouplingResult<usize> {
    solver.particle_map().local_id(global_id).ok_or_else(|| {
        CouplingError::Mapping(format!("invalid peridynamic local id for global id {}", global_id))
    })
}

/// Write the host displacement into the solver's position, displacement and velocity fields.
///
/// # Arguments
/// * `solver` - Peridynamic solver, addressed by its own local numbering
/// * `allocation` - Particles and partial-stress elements of this rank
/// * `previous_positions` - Positions at the last converged step, by coupling local id
/// * `time_step` - Step length used for the velocity estimate
/// * `displacement` - Host displacement solution
pub fn push_state<S: PeridynamicSolver>(
    solver: &mut S,
    allocation: &Allocation,
    previous_positions: &[f64],
    time_step: f64,
    displacement: &HostSolution,
) -> CouplingResult<()> {
    let mut updates = Vec::with_capacity(allocation.particles.len());

    // Sphere particles: id is the normalized host node id
    for &global_id in &allocation.sphere_ids {
        updates.push(PointUpdate {
            solver_local: solver_local(solver, global_id)?,
            coupling_local: allocation.mapping.require_local_id(global_id)?,
            target: Target::Displacement(displacement.displacement(global_id)?),
        });
    }

    // Partial-stress points: re-evaluate the quadrature points on the deformed element
    for element in &allocation.partial_stress_elements {
        let sampler = allocation.samplers.get(&element.block).ok_or_else(|| {
            CouplingError::Mapping(format!("no cubature context for block {}", element.block))
        })?;

        let mut deformed = Vec::with_capacity(element.host_nodes.len());
        for (&node, x0) in element.host_nodes.iter().zip(&element.initial_positions) {
            deformed.push(x0 + displacement.displacement(node)?);
        }

        let points = sampler.physical_points(&deformed)?;
        for (&global_id, point) in element.peridynamic_ids.iter().zip(points) {
            updates.push(PointUpdate {
                solver_local: solver_local(solver, global_id)?,
                coupling_local: allocation.mapping.require_local_id(global_id)?,
                target: Target::Position(point.coords),
            });
        }
    }

    solver.set_time_step(time_step);
    let kinematics = solver.kinematics_mut();
    for update in &updates {
        let s = update.solver_local;
        let reference = read_vec3(kinematics.reference, s);
        let (current, u) = match update.target {
            Target::Displacement(u) => (reference + u, u),
            Target::Position(y) => (y, y - reference),
        };
        let velocity = (current - read_vec3(previous_positions, update.coupling_local)) / time_step;

        write_vec3(kinematics.current, s, &current);
        write_vec3(kinematics.displacement, s, &u);
        write_vec3(kinematics.velocity, s, &velocity);
    }

    Ok(())
}

/// Copy the solver's current positions into the converged-step snapshot
pub fn snapshot_positions<S: PeridynamicSolver>(
    solver: &S,
    allocation: &Allocation,
    previous_positions: &mut [f64],
) -> CouplingResult<()> {
    let current = solver.current_positions();
    for (coupling_local, &global_id) in allocation.particles.global_ids.iter().enumerate() {
        let s = solver_local(solver, global_id)?;
        write_vec3(previous_positions, coupling_local, &read_vec3(current, s));
    }
    Ok(())
}

/// Internal force component of the particle standing on a host node
pub fn force<S: PeridynamicSolver>(solver: &S, host_node: u64, component: usize) -> CouplingResult<f64> {
    if component >= 3 {
        return Err(CouplingError::Mapping(format!(
            "force component {} out of range",
            component
        )));
    }
    let s = solver.particle_map().local_id(host_node).ok_or_else(|| {
        CouplingError::Mapping(format!("invalid global id {} in force lookup", host_node))
    })?;
    Ok(solver.force()[3 * s + component])
}

/// Partial stress tensors of one host element, one per quadrature point in allocation order
pub fn partial_stress<S: PeridynamicSolver>(
    solver: &S,
    allocation: &Allocation,
    block: &str,
    workset: usize,
    workset_local_id: usize,
    values: &mut [Matrix3<f64>],
) -> CouplingResult<()> {
    let element = allocation.mapping.workset_element(workset, workset_local_id)?;
    let ids = allocation.mapping.partial_stress_ids(element)?;

    if values.len() < ids.len() {
        return Err(CouplingError::Mapping(format!(
            "element {} has {} quadrature points but only {} output slots",
            element,
            ids.len(),
            values.len()
        )));
    }

    let data = solver.block_data(block, PARTIAL_STRESS_FIELD).ok_or_else(|| {
        CouplingError::Configuration(format!(
            "peridynamic solver publishes no {} field for block {}",
            PARTIAL_STRESS_FIELD, block
        ))
    })?;
    if data.components != 9 {
        return Err(CouplingError::Configuration(format!(
            "{} field of block {} has {} components, expected 9",
            PARTIAL_STRESS_FIELD, block, data.components
        )));
    }

    for (slot, &global_id) in values.iter_mut().zip(ids) {
        let tensor = data.point(global_id).ok_or_else(|| {
            CouplingError::Mapping(format!("invalid global id {} in partial stress lookup", global_id))
        })?;
        *slot = Matrix3::from_row_slice(tensor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_fallback_at_time_zero() {
        let mut clock = StepClock::default();
        assert_eq!(clock.advance_to(0.0), FALLBACK_TIME_STEP);
        assert_eq!(clock.current_time, 0.0);
        clock.commit();
        assert_eq!(clock.advance_to(0.25), 0.25);
    }

    #[test]
    fn test_clock_repeated_attempts() {
        let mut clock = StepClock::default();
        clock.advance_to(1.0);
        clock.commit();
        // A retried step measures from the last converged time, not the last attempt
        assert_eq!(clock.advance_to(1.5), 0.5);
        assert_eq!(clock.advance_to(1.2), 0.19999999999999996);
        assert_eq!(clock.advance_to(0.5), FALLBACK_TIME_STEP);
    }
}
