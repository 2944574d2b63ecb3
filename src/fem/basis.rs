use nalgebra::Vector3;

use crate::error::{CouplingError, CouplingResult};
use crate::mesh::CellTopology;

/// Shape function values and reference-frame gradients at one point
#[derive(Debug, Clone)]
pub struct ShapeEvaluation {
    /// N_a(ξ) for each node a
    pub values: Vec<f64>,
    /// ∂N_a/∂ξ for each node a
    pub gradients: Vec<Vector3<f64>>,
}

/// Lagrange basis functions of the supported cell topologies
pub struct LagrangeBasis;

impl LagrangeBasis {
    /// Evaluate all shape functions of a topology at reference coordinates (r, s, t)
    pub fn evaluate(topology: CellTopology, xi: &[f64; 3]) -> CouplingResult<ShapeEvaluation> {
        match topology {
            CellTopology::Tet4 => Ok(Self::tet4(xi)),
            CellTopology::Tet10 => Ok(Self::tet10(xi)),
            CellTopology::Hex8 => Ok(Self::hex8(xi)),
            CellTopology::Particle => Err(CouplingError::Topology(
                "sphere elements have no interpolation basis".to_string(),
            )),
        }
    }

    /// Barycentric coordinates (L0, L1, L2, L3) of a reference tetrahedron point
    pub fn barycentric(xi: &[f64; 3]) -> [f64; 4] {
        [1.0 - xi[0] - xi[1] - xi[2], xi[0], xi[1], xi[2]]
    }

    /// Linear tetrahedron: N = L
    fn tet4(xi: &[f64; 3]) -> ShapeEvaluation {
        let l = Self::barycentric(xi);
        ShapeEvaluation {
            values: l.to_vec(),
            gradients: vec![
                Vector3::new(-1.0, -1.0, -1.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
        }
    }

    /// Quadratic tetrahedron
    ///
    /// Vertices:
    ///   N_i = L_i (2 L_i - 1)  for i = 0,1,2,3
    ///
    /// Edge midpoints:
    ///   N_4 = 4 L_0 L_1, N_5 = 4 L_1 L_2, N_6 = 4 L_2 L_0,
    ///   N_7 = 4 L_0 L_3, N_8 = 4 L_1 L_3, N_9 = 4 L_2 L_3
    ///
    /// Reference gradients use L1, L2, L3 as the independent variables, so
    /// ∂N/∂ξ_k = ∂N/∂L_k - ∂N/∂L_0.
    #[allow(non_snake_case)]
    fn tet10(xi: &[f64; 3]) -> ShapeEvaluation {
        let [L0, L1, L2, L3] = Self::barycentric(xi);

        let values = vec![
            L0 * (2.0 * L0 - 1.0),
            L1 * (2.0 * L1 - 1.0),
            L2 * (2.0 * L2 - 1.0),
            L3 * (2.0 * L3 - 1.0),
            4.0 * L0 * L1,
            4.0 * L1 * L2,
            4.0 * L2 * L0,
            4.0 * L0 * L3,
            4.0 * L1 * L3,
            4.0 * L2 * L3,
        ];

        // [∂N/∂L0, ∂N/∂L1, ∂N/∂L2, ∂N/∂L3] per node
        let dN_dL: [[f64; 4]; 10] = [
            [4.0 * L0 - 1.0, 0.0, 0.0, 0.0],
            [0.0, 4.0 * L1 - 1.0, 0.0, 0.0],
            [0.0, 0.0, 4.0 * L2 - 1.0, 0.0],
            [0.0, 0.0, 0.0, 4.0 * L3 - 1.0],
            [4.0 * L1, 4.0 * L0, 0.0, 0.0],
            [0.0, 4.0 * L2, 4.0 * L1, 0.0],
            [4.0 * L2, 0.0, 4.0 * L0, 0.0],
            [4.0 * L3, 0.0, 0.0, 4.0 * L0],
            [0.0, 4.0 * L3, 0.0, 4.0 * L1],
            [0.0, 0.0, 4.0 * L3, 4.0 * L2],
        ];

        let gradients = dN_dL
            .iter()
            .map(|d| Vector3::new(d[1] - d[0], d[2] - d[0], d[3] - d[0]))
            .collect();

        ShapeEvaluation { values, gradients }
    }

    /// Trilinear hexahedron on [-1, 1]^3: N_a = (1 + r r_a)(1 + s s_a)(1 + t t_a) / 8
    fn hex8(xi: &[f64; 3]) -> ShapeEvaluation {
        const CORNERS: [[f64; 3]; 8] = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];

        let mut values = Vec::with_capacity(8);
        let mut gradients = Vec::with_capacity(8);
        for c in &CORNERS {
            let fr = 1.0 + xi[0] * c[0];
            let fs = 1.0 + xi[1] * c[1];
            let ft = 1.0 + xi[2] * c[2];
            values.push(0.125 * fr * fs * ft);
            gradients.push(Vector3::new(
                0.125 * c[0] * fs * ft,
                0.125 * fr * c[1] * ft,
                0.125 * fr * fs * c[2],
            ));
        }

        ShapeEvaluation { values, gradients }
    }
}
