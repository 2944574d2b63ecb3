use crate::error::{CouplingError, CouplingResult};
use crate::mesh::CellTopology;

/// Cubature rule on a reference cell
#[derive(Debug, Clone, PartialEq)]
pub struct CubatureRule {
    /// Integration point coordinates in the reference frame (r, s, t)
    pub points: Vec<[f64; 3]>,
    /// Integration weights
    pub weights: Vec<f64>,
}

impl CubatureRule {
    /// Rule of the requested polynomial degree for a cell topology
    ///
    /// # Arguments
    /// * `topology` - Cell topology of the element block
    /// * `degree` - Polynomial degree the rule must integrate exactly
    ///
    /// # Returns
    /// Tetrahedra: degree 1 → 1 point, 2 → 4, 3 → 5, 4 → 11.
    /// Hexahedra: tensor Gauss–Legendre, ceil((degree + 1) / 2) points per direction, up to degree 5.
    pub fn for_topology(topology: CellTopology, degree: i32) -> CouplingResult<Self> {
        if degree < 1 {
            return Err(CouplingError::Configuration(format!(
                "cubature degree must be positive, got {}",
                degree
            )));
        }

        let unsupported = || {
            CouplingError::Configuration(format!(
                "no cubature rule of degree {} for {}",
                degree,
                topology.name()
            ))
        };

        match topology {
            CellTopology::Particle => Err(CouplingError::Topology(
                "sphere elements have no cubature rule; partial stress requires solid elements"
                    .to_string(),
            )),
            CellTopology::Tet4 | CellTopology::Tet10 => match degree {
                1 => Ok(Self::tet_1point()),
                2 => Ok(Self::tet_4point()),
                3 => Ok(Self::tet_5point()),
                4 => Ok(Self::tet_11point()),
                _ => Err(unsupported()),
            },
            CellTopology::Hex8 => {
                let n = ((degree + 2) / 2) as usize;
                if n > 3 {
                    return Err(unsupported());
                }
                Ok(Self::hex_gauss(n))
            }
        }
    }

    /// Convert a barycentric tetrahedral rule [L0, L1, L2, L3] to reference (r, s, t) = (L1, L2, L3)
    fn from_barycentric(points: &[[f64; 4]], weights: Vec<f64>) -> Self {
        Self {
            points: points.iter().map(|l| [l[1], l[2], l[3]]).collect(),
            weights,
        }
    }

    /// 1-point quadrature (degree 1 exactness) - centroid rule
    pub fn tet_1point() -> Self {
        Self::from_barycentric(
            &[[0.25, 0.25, 0.25, 0.25]],
            vec![1.0 / 6.0], // Volume of reference tet
        )
    }

    /// 4-point quadrature (degree 2 exactness)
    pub fn tet_4point() -> Self {
        let a = 0.5854101966249685; // (5 + √5) / 20
        let b = 0.1381966011250105; // (5 - √5) / 20
        let w = 1.0 / 24.0;

        Self::from_barycentric(
            &[[a, b, b, b], [b, a, b, b], [b, b, a, b], [b, b, b, a]],
            vec![w, w, w, w],
        )
    }

    /// 5-point quadrature (degree 3 exactness), negative centroid weight
    pub fn tet_5point() -> Self {
        let a = 0.25;
        let b = 1.0 / 6.0;
        let c = 0.5;

        Self::from_barycentric(
            &[
                [a, a, a, a],
                [b, b, b, c],
                [b, b, c, b],
                [b, c, b, b],
                [c, b, b, b],
            ],
            vec![-2.0 / 15.0, 3.0 / 40.0, 3.0 / 40.0, 3.0 / 40.0, 3.0 / 40.0],
        )
    }

    /// 11-point quadrature (degree 4 exactness)
    pub fn tet_11point() -> Self {
        let a1 = 0.25;
        let a2 = 0.0714285714285714;
        let b2 = 0.7857142857142857;
        let a3 = 0.3994035761667992;
        let b3 = 0.1005964238332008;

        Self::from_barycentric(
            &[
                [a1, a1, a1, a1],
                [a2, a2, a2, b2],
                [a2, a2, b2, a2],
                [a2, b2, a2, a2],
                [b2, a2, a2, a2],
                [a3, a3, b3, b3],
                [a3, b3, a3, b3],
                [a3, b3, b3, a3],
                [b3, a3, a3, b3],
                [b3, a3, b3, a3],
                [b3, b3, a3, a3],
            ],
            vec![
                -0.01315555555555556,
                0.007622222222222222,
                0.007622222222222222,
                0.007622222222222222,
                0.007622222222222222,
                0.024888888888888888,
                0.024888888888888888,
                0.024888888888888888,
                0.024888888888888888,
                0.024888888888888888,
                0.024888888888888888,
            ],
        )
    }

    /// Tensor-product Gauss–Legendre rule on [-1, 1]^3 with `n` points per direction
    ///
    /// Points are ordered with r varying fastest.
    pub fn hex_gauss(n: usize) -> Self {
        let (abscissae, weights_1d) = gauss_legendre(n);

        let mut points = Vec::with_capacity(n * n * n);
        let mut weights = Vec::with_capacity(n * n * n);
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    points.push([abscissae[i], abscissae[j], abscissae[k]]);
                    weights.push(weights_1d[i] * weights_1d[j] * weights_1d[k]);
                }
            }
        }

        Self { points, weights }
    }

    /// Get the number of integration points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

/// 1D Gauss–Legendre abscissae and weights on [-1, 1]
fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    match n {
        1 => (vec![0.0], vec![2.0]),
        2 => {
            let a = 1.0 / 3.0_f64.sqrt();
            (vec![-a, a], vec![1.0, 1.0])
        }
        3 => {
            let a = (3.0_f64 / 5.0).sqrt();
            (vec![-a, 0.0, a], vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0])
        }
        _ => unreachable!("Gauss-Legendre rules are tabulated for 1..=3 points"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum() {
        // Weights should sum to volume of reference tetrahedron (1/6)
        for degree in 1..=4 {
            let rule = CubatureRule::for_topology(CellTopology::Tet4, degree).unwrap();
            let sum: f64 = rule.weights.iter().sum();
            assert_relative_eq!(sum, 1.0 / 6.0, epsilon = 1e-14);
        }

        // ... and to the volume of the reference cube (8)
        for degree in 1..=5 {
            let rule = CubatureRule::for_topology(CellTopology::Hex8, degree).unwrap();
            let sum: f64 = rule.weights.iter().sum();
            assert_relative_eq!(sum, 8.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_point_counts() {
        let count = |t, d| CubatureRule::for_topology(t, d).unwrap().num_points();
        assert_eq!(count(CellTopology::Tet10, 1), 1);
        assert_eq!(count(CellTopology::Tet10, 2), 4);
        assert_eq!(count(CellTopology::Tet4, 3), 5);
        assert_eq!(count(CellTopology::Tet4, 4), 11);
        assert_eq!(count(CellTopology::Hex8, 1), 1);
        assert_eq!(count(CellTopology::Hex8, 2), 8);
        assert_eq!(count(CellTopology::Hex8, 3), 8);
        assert_eq!(count(CellTopology::Hex8, 4), 27);
    }

    #[test]
    fn test_unsupported_rules() {
        assert!(matches!(
            CubatureRule::for_topology(CellTopology::Tet4, 0),
            Err(CouplingError::Configuration(_))
        ));
        assert!(matches!(
            CubatureRule::for_topology(CellTopology::Tet4, 5),
            Err(CouplingError::Configuration(_))
        ));
        assert!(matches!(
            CubatureRule::for_topology(CellTopology::Hex8, 6),
            Err(CouplingError::Configuration(_))
        ));
        assert!(matches!(
            CubatureRule::for_topology(CellTopology::Particle, 2),
            Err(CouplingError::Topology(_))
        ));
    }

    #[test]
    fn test_polynomial_exactness() {
        // ∫∫∫ r^2 dV over reference tet = 1/60
        let rule = CubatureRule::tet_4point();
        let integral: f64 = rule
            .points
            .iter()
            .zip(rule.weights.iter())
            .map(|(p, w)| p[0] * p[0] * w)
            .sum();
        assert_relative_eq!(integral, 1.0 / 60.0, epsilon = 1e-14);

        // ∫ r^2 s^2 t^2 over [-1,1]^3 = (2/3)^3, exact for 2 points per direction
        let rule = CubatureRule::hex_gauss(2);
        let integral: f64 = rule
            .points
            .iter()
            .zip(rule.weights.iter())
            .map(|(p, w)| (p[0] * p[1] * p[2]).powi(2) * w)
            .sum();
        assert_relative_eq!(integral, 8.0 / 27.0, epsilon = 1e-14);
    }
}
