pub mod basis;
pub mod quadrature;
pub mod sampler;

pub use basis::{LagrangeBasis, ShapeEvaluation};
pub use quadrature::CubatureRule;
pub use sampler::ElementSampler;
