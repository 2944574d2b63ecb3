//! Quadrature-point geometry of partial-stress elements.
//!
//! An `ElementSampler` is built once per element block. It fixes the cubature rule
//! and tabulates the basis at every integration point, so evaluating an element's
//! physical points (every step, on the deformed nodes) is only a weighted sum.

use nalgebra::{Matrix3, Point3};

use super::basis::{LagrangeBasis, ShapeEvaluation};
use super::quadrature::CubatureRule;
use crate::error::{CouplingError, CouplingResult};
use crate::mesh::CellTopology;

/// Cached evaluation context for one cell topology and cubature degree
#[derive(Debug, Clone)]
pub struct ElementSampler {
    topology: CellTopology,
    rule: CubatureRule,
    shape: Vec<ShapeEvaluation>,
}

impl ElementSampler {
    /// Build the context for a topology at the given cubature degree
    pub fn new(topology: CellTopology, degree: i32) -> CouplingResult<Self> {
        let rule = CubatureRule::for_topology(topology, degree)?;
        let shape = rule
            .points
            .iter()
            .map(|xi| LagrangeBasis::evaluate(topology, xi))
            .collect::<CouplingResult<Vec<_>>>()?;

        Ok(Self {
            topology,
            rule,
            shape,
        })
    }

    pub fn topology(&self) -> CellTopology {
        self.topology
    }

    /// Number of integration points per element
    pub fn num_points(&self) -> usize {
        self.rule.num_points()
    }

    pub fn rule(&self) -> &CubatureRule {
        &self.rule
    }

    fn check_nodes(&self, nodes: &[Point3<f64>]) -> CouplingResult<()> {
        if nodes.len() != self.topology.node_count() {
            return Err(CouplingError::Topology(format!(
                "{} element expects {} nodes, got {}",
                self.topology.name(),
                self.topology.node_count(),
                nodes.len()
            )));
        }
        Ok(())
    }

    /// Map the integration points to the physical frame: x_q = Σ_a N_a(ξ_q) x_a
    ///
    /// # Arguments
    /// * `nodes` - Nodal coordinates of one element, in topology order
    ///
    /// # Returns
    /// One physical point per integration point, in rule order
    pub fn physical_points(&self, nodes: &[Point3<f64>]) -> CouplingResult<Vec<Point3<f64>>> {
        self.check_nodes(nodes)?;

        Ok(self
            .shape
            .iter()
            .map(|eval| {
                let x = eval
                    .values
                    .iter()
                    .zip(nodes)
                    .fold(nalgebra::Vector3::zeros(), |acc, (n, p)| acc + p.coords * *n);
                Point3::from(x)
            })
            .collect())
    }

    /// Jacobian J_ij = ∂x_i/∂ξ_j at each integration point
    #[allow(non_snake_case)]
    pub fn jacobians(&self, nodes: &[Point3<f64>]) -> CouplingResult<Vec<Matrix3<f64>>> {
        self.check_nodes(nodes)?;

        Ok(self
            .shape
            .iter()
            .map(|eval| {
                let mut J = Matrix3::zeros();
                for (grad, p) in eval.gradients.iter().zip(nodes) {
                    J += p.coords * grad.transpose();
                }
                J
            })
            .collect())
    }

    /// Weighted integration measures w_q |det J_q|, the volumes assigned to the
    /// peridynamic points of the element
    pub fn weighted_measures(&self, nodes: &[Point3<f64>]) -> CouplingResult<Vec<f64>> {
        let jacobians = self.jacobians(nodes)?;
        Ok(jacobians
            .iter()
            .zip(self.rule.weights.iter())
            .map(|(j, w)| w * j.determinant().abs())
            .collect())
    }
}
