//! Peridynamic fields the host writes alongside its own results.

use crate::error::{CouplingError, CouplingResult};

/// Prefix of the host-facing name of every peridynamic output field
pub const HOST_NAME_PREFIX: &str = "Peridynamics_";

/// Mesh entity a field lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRelation {
    Node,
    Element,
}

/// How the host allocates storage for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInitType {
    Scalar,
}

/// A field the host result writer should create
#[derive(Debug, Clone)]
pub struct OutputField {
    pub host_name: String,
    pub peridynamic_name: String,
    pub relation: FieldRelation,
    pub init_type: FieldInitType,
    /// Components per entity: 1, 3 or 9
    pub length: usize,
}

impl PartialEq for OutputField {
    fn eq(&self, other: &Self) -> bool {
        self.host_name == other.host_name && self.peridynamic_name == other.peridynamic_name
    }
}

impl Eq for OutputField {}

/// Every field the peridynamic solver can export: (name, relation, length)
static FIELD_TAXONOMY: &[(&str, FieldRelation, usize)] = &[
    ("Dilatation", FieldRelation::Element, 1),
    ("Weighted_Volume", FieldRelation::Element, 1),
    ("Radius", FieldRelation::Element, 1),
    ("Number_Of_Neighbors", FieldRelation::Element, 1),
    ("Horizon", FieldRelation::Element, 1),
    ("Volume", FieldRelation::Element, 1),
    ("Model_Coordinates", FieldRelation::Node, 3),
    ("Coordinates", FieldRelation::Node, 3),
    ("Displacement", FieldRelation::Node, 3),
    ("Velocity", FieldRelation::Node, 3),
    ("Force", FieldRelation::Node, 3),
    ("Deformation_Gradient", FieldRelation::Element, 9),
    ("Unrotated_Rate_Of_Deformation", FieldRelation::Element, 9),
    ("Cauchy_Stress", FieldRelation::Element, 9),
    ("Partial_Stress", FieldRelation::Element, 9),
];

/// Classify a peridynamic field name
pub fn describe_field(name: &str) -> CouplingResult<OutputField> {
    let (_, relation, length) = FIELD_TAXONOMY
        .iter()
        .find(|(known, _, _)| *known == name)
        .ok_or_else(|| {
            CouplingError::Configuration(format!("unknown peridynamic output variable {}", name))
        })?;

    Ok(OutputField {
        host_name: format!("{}{}", HOST_NAME_PREFIX, name),
        peridynamic_name: name.to_string(),
        relation: *relation,
        init_type: FieldInitType::Scalar,
        length: *length,
    })
}

/// Ordered, duplicate-free list of requested output fields
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    fields: Vec<OutputField>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field by peridynamic name. Returns false if it was already registered.
    pub fn register(&mut self, name: &str) -> CouplingResult<bool> {
        let field = describe_field(name)?;
        if self.fields.contains(&field) {
            return Ok(false);
        }
        self.fields.push(field);
        Ok(true)
    }

    /// Register every key of a configuration table; values are ignored.
    ///
    /// All names are classified before any is added, so an unknown name leaves
    /// the registry unchanged.
    pub fn register_all(&mut self, variables: &toml::Table) -> CouplingResult<()> {
        let described = variables
            .keys()
            .map(|name| describe_field(name))
            .collect::<CouplingResult<Vec<_>>>()?;

        for field in described {
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        let stress = describe_field("Partial_Stress").unwrap();
        assert_eq!(stress.host_name, "Peridynamics_Partial_Stress");
        assert_eq!(stress.relation, FieldRelation::Element);
        assert_eq!(stress.length, 9);

        let force = describe_field("Force").unwrap();
        assert_eq!(force.relation, FieldRelation::Node);
        assert_eq!(force.length, 3);

        assert_eq!(describe_field("Horizon").unwrap().length, 1);
    }

    #[test]
    fn test_register_twice() {
        let mut registry = OutputRegistry::new();
        assert!(registry.register("Displacement").unwrap());
        assert!(!registry.register("Displacement").unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_name_leaves_registry_unchanged() {
        let mut registry = OutputRegistry::new();
        registry.register("Velocity").unwrap();

        let variables: toml::Table = toml::from_str(
            r#"
            Dilatation = true
            Damage = true
            "#,
        )
        .unwrap();

        match registry.register_all(&variables) {
            Err(CouplingError::Configuration(msg)) => assert!(msg.contains("Damage")),
            other => panic!("expected configuration error, got {:?}", other),
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.fields()[0].peridynamic_name, "Velocity");
    }
}
