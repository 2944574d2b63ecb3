//! Error types for the coupling layer.
//!
//! Every failure here is a configuration or consistency violation; callers are
//! expected to abort the run with the message rather than recover.

use thiserror::Error;

/// Unified error type for the mesh / peridynamic coupling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CouplingError {
    /// Bad or missing required field, unresolvable name, malformed block name,
    /// unknown output field, unreadable configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A block's elements do not match the topology its material behavior requires.
    #[error("Topology error: {0}")]
    Topology(String),

    /// An id was not found in a lookup table at query time.
    #[error("Mapping error: {0}")]
    Mapping(String),
}

/// Convenience alias for `Result<T, CouplingError>`.
pub type CouplingResult<T> = Result<T, CouplingError>;
