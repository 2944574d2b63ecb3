pub mod error;
pub mod config;
pub mod comm;
pub mod mesh;
pub mod fem;
pub mod solver;
pub mod coupling;

pub use error::{CouplingError, CouplingResult};
pub use config::{CouplingConfig, MaterialAssignment, MaterialBehavior, PARTIAL_STRESS_MODEL, PERIDYNAMICS_MODEL};
pub use comm::{Communicator, SerialComm, ThreadComm};
pub use mesh::{CellTopology, ElementBlock, HostElement, HostMesh, HostSolution, WorksetEntry};
pub use fem::{CubatureRule, ElementSampler, LagrangeBasis};
pub use solver::{BlockField, InMemorySolver, InMemorySolverBuilder, Kinematics, PeridynamicDiscretization, PeridynamicSolver, SolverBuilder};
pub use coupling::{
    allocate, Allocation, BinnedSearch, CouplingManager, GlobalId, MappingStore, NeighborCandidates,
    OutputField, OutputRegistry, ProximitySearch, SearchInput, StepClock,
};
