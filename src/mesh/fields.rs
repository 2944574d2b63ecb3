use std::collections::HashMap;
use nalgebra::Vector3;

use crate::error::{CouplingError, CouplingResult};

/// Name of the per-node coordinate field the host mesh must provide
pub const COORDINATES_FIELD: &str = "coordinates";

/// Name of the per-element volume field (required for sphere elements only)
pub const VOLUME_FIELD: &str = "volume";

/// Scalar field data, one value per mesh entity
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub name: String,
    pub data: Vec<f64>,
}

impl ScalarField {
    pub fn new(name: &str, data: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at an entity index, growing the field with zeros if needed
    pub fn set(&mut self, index: usize, value: f64) {
        if index >= self.data.len() {
            self.data.resize(index + 1, 0.0);
        }
        self.data[index] = value;
    }
}

/// Vector field data (3 components per entity)
#[derive(Debug, Clone)]
pub struct VectorField {
    pub name: String,
    pub data: Vec<Vector3<f64>>,
}

impl VectorField {
    pub fn new(name: &str, data: Vec<Vector3<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn set(&mut self, index: usize, value: Vector3<f64>) {
        if index >= self.data.len() {
            self.data.resize(index + 1, Vector3::zeros());
        }
        self.data[index] = value;
    }
}

/// Collection of named scalar and vector fields over one entity rank (nodes or elements)
#[derive(Debug, Clone, Default)]
pub struct FieldData {
    pub scalar_fields: HashMap<String, ScalarField>,
    pub vector_fields: HashMap<String, VectorField>,
}

impl FieldData {
    /// Get a scalar field by name
    pub fn get_field(&self, name: &str) -> Option<&ScalarField> {
        self.scalar_fields.get(name)
    }

    /// Get a vector field by name
    pub fn get_vector_field(&self, name: &str) -> Option<&VectorField> {
        self.vector_fields.get(name)
    }

    /// Scalar field by name, created empty if absent
    pub fn field_entry(&mut self, name: &str) -> &mut ScalarField {
        self.scalar_fields
            .entry(name.to_string())
            .or_insert_with(|| ScalarField::new(name, Vec::new()))
    }

    /// Vector field by name, created empty if absent
    pub fn vector_field_entry(&mut self, name: &str) -> &mut VectorField {
        self.vector_fields
            .entry(name.to_string())
            .or_insert_with(|| VectorField::new(name, Vec::new()))
    }

    /// Scalar field that the coupling cannot run without
    pub fn require_field(&self, name: &str) -> CouplingResult<&ScalarField> {
        self.get_field(name).ok_or_else(|| {
            CouplingError::Configuration(format!("unable to access required field '{}'", name))
        })
    }

    /// Vector field that the coupling cannot run without
    pub fn require_vector_field(&self, name: &str) -> CouplingResult<&VectorField> {
        self.get_vector_field(name).ok_or_else(|| {
            CouplingError::Configuration(format!("unable to access required field '{}'", name))
        })
    }

    /// Check if empty (no fields at all)
    pub fn is_empty(&self) -> bool {
        self.scalar_fields.is_empty() && self.vector_fields.is_empty()
    }
}
