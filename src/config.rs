//! Configuration of the mesh / peridynamic coupling
//!
//! Reads TOML and provides the cubature degree, the per-block material assignment
//! and the (optional) peridynamics section that switches the subsystem on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CouplingError, CouplingResult};

/// Material model name that turns a block of sphere elements into peridynamic particles
pub const PERIDYNAMICS_MODEL: &str = "Peridynamics";

/// Material model name that promotes a solid block's quadrature points to peridynamic points
pub const PARTIAL_STRESS_MODEL: &str = "Peridynamic Partial Stress";

/// Main coupling configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CouplingConfig {
    #[serde(default)]
    pub discretization: DiscretizationConfig,
    /// Inline material assignment, keyed by element block name
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialEntry>,
    /// External material database with the same `[materials]` schema
    #[serde(default)]
    pub material_db: Option<PathBuf>,
    /// Present iff the run couples to a peridynamic solver
    #[serde(default)]
    pub peridynamics: Option<PeridynamicsConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscretizationConfig {
    /// Polynomial degree of the cubature used for partial-stress elements
    #[serde(default = "default_cubature_degree")]
    pub cubature_degree: i32,
}

fn default_cubature_degree() -> i32 { 2 }

impl Default for DiscretizationConfig {
    fn default() -> Self {
        Self {
            cubature_degree: default_cubature_degree(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MaterialEntry {
    /// Material model name, e.g. "Peridynamics"
    pub model: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PeridynamicsConfig {
    /// Passed to the peridynamic solver unmodified
    #[serde(default)]
    pub parameters: toml::Table,
    /// Names of the peridynamic fields to round-trip for output; values are ignored
    #[serde(default)]
    pub output_variables: toml::Table,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MaterialDatabase {
    #[serde(default)]
    materials: BTreeMap<String, MaterialEntry>,
}

/// Behavior a material model gives to an element block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialBehavior {
    Peridynamics,
    PartialStress,
    ClassicalContinuum,
}

impl MaterialBehavior {
    /// Classify a material model name; anything unrecognized is classical continuum
    pub fn from_model_name(name: &str) -> Self {
        match name {
            PERIDYNAMICS_MODEL => MaterialBehavior::Peridynamics,
            PARTIAL_STRESS_MODEL => MaterialBehavior::PartialStress,
            _ => MaterialBehavior::ClassicalContinuum,
        }
    }
}

/// Block name → material model name lookup
#[derive(Debug, Clone, Default)]
pub struct MaterialAssignment {
    models: BTreeMap<String, String>,
}

impl MaterialAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, block: &str, model: &str) {
        self.models.insert(block.to_string(), model.to_string());
    }

    /// Material model name of a block, if any
    pub fn model_name(&self, block: &str) -> Option<&str> {
        self.models.get(block).map(String::as_str)
    }

    /// Behavior of a block; blocks without an entry are classical continuum
    pub fn behavior(&self, block: &str) -> MaterialBehavior {
        self.model_name(block)
            .map(MaterialBehavior::from_model_name)
            .unwrap_or(MaterialBehavior::ClassicalContinuum)
    }
}

impl CouplingConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CouplingResult<Self> {
        let contents = read(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> CouplingResult<Self> {
        toml::from_str(contents).map_err(|e| {
            CouplingError::Configuration(format!("failed to parse coupling config: {}", e))
        })
    }

    /// Whether the run couples to a peridynamic solver at all
    pub fn has_peridynamics(&self) -> bool {
        self.peridynamics.is_some()
    }

    /// Merge the material database file (if any) with the inline table; inline entries win
    pub fn material_assignment(&self) -> CouplingResult<MaterialAssignment> {
        let mut assignment = MaterialAssignment::new();

        if let Some(path) = &self.material_db {
            let contents = read(path)?;
            let db: MaterialDatabase = toml::from_str(&contents).map_err(|e| {
                CouplingError::Configuration(format!(
                    "failed to parse material database {}: {}",
                    path.display(),
                    e
                ))
            })?;
            for (block, entry) in &db.materials {
                assignment.assign(block, &entry.model);
            }
        }

        for (block, entry) in &self.materials {
            assignment.assign(block, &entry.model);
        }

        Ok(assignment)
    }
}

fn read(path: &Path) -> CouplingResult<String> {
    fs::read_to_string(path).map_err(|e| {
        CouplingError::Configuration(format!("failed to read {}: {}", path.display(), e))
    })
}
