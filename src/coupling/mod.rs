pub mod particles;
pub mod mapping;
pub mod allocator;
pub mod synchronizer;
pub mod output;
pub mod proximity;
pub mod manager;

pub use particles::{GlobalId, ParticleMap, ParticleTable};
pub use mapping::MappingStore;
pub use allocator::{allocate, Allocation, AllocationSummary, PartialStressElement};
pub use synchronizer::{StepClock, FALLBACK_TIME_STEP, PARTIAL_STRESS_FIELD};
pub use output::{FieldInitType, FieldRelation, OutputField, OutputRegistry};
pub use proximity::{BinnedSearch, NeighborCandidates, ProximitySearch, SearchInput};
pub use manager::CouplingManager;
