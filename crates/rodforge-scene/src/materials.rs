//! Materials table.
//!
//! Maps a material name to its bulk properties. The table is constructed once
//! (built-in data or a YAML file) and handed to the resolver explicitly; it is
//! never mutated afterwards.
//!
//! The `rubber` entry doubles as the fallback for unknown material names, so
//! every table is required to carry one.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the entry used when a rod names an unknown material.
pub const FALLBACK_MATERIAL: &str = "rubber";

/// Errors that can occur when loading a materials table.
#[derive(Debug, Error)]
pub enum MaterialsError {
    /// Failed to read the materials file.
    #[error("failed to read materials file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the materials YAML.
    #[error("failed to parse materials YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A property is outside its physical range.
    #[error("material '{material}': {property} = {value} is out of range ({expected})")]
    InvalidProperty {
        material: String,
        property: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// The fallback entry is missing.
    #[error("materials table has no '{FALLBACK_MATERIAL}' entry to fall back on")]
    MissingFallback,
}

/// Bulk properties of a named material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique name (table key)
    pub name: String,
    /// Density in kg/m³
    pub density: f64,
    /// Young's modulus in Pa
    pub youngs_modulus: f64,
    /// Poisson ratio (dimensionless)
    pub poisson_ratio: f64,
}

/// On-disk form of a table entry; the name is the map key.
#[derive(Debug, Clone, Deserialize)]
struct MaterialProperties {
    density: f64,
    youngs_modulus: f64,
    poisson_ratio: f64,
}

impl Material {
    fn new(name: &str, density: f64, youngs_modulus: f64, poisson_ratio: f64) -> Self {
        Self {
            name: name.to_string(),
            density,
            youngs_modulus,
            poisson_ratio,
        }
    }

    fn validate(&self) -> Result<(), MaterialsError> {
        let invalid = |property, value, expected| MaterialsError::InvalidProperty {
            material: self.name.clone(),
            property,
            value,
            expected,
        };
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(invalid("density", self.density, "> 0"));
        }
        if !(self.youngs_modulus.is_finite() && self.youngs_modulus > 0.0) {
            return Err(invalid("youngs_modulus", self.youngs_modulus, "> 0"));
        }
        // 0.5 is admitted: the incompressible limit is what rubber is tabulated at.
        if !(self.poisson_ratio > 0.0 && self.poisson_ratio <= 0.5) {
            return Err(invalid("poisson_ratio", self.poisson_ratio, "0 < nu <= 0.5"));
        }
        Ok(())
    }
}

/// Immutable, ordered material lookup.
#[derive(Debug, Clone)]
pub struct MaterialsTable {
    entries: IndexMap<String, Material>,
    fallback: Material,
}

impl MaterialsTable {
    /// The built-in table of common rod materials.
    pub fn builtin() -> Self {
        let materials = [
            Material::new("rubber", 1100.0, 0.01e9, 0.5),
            Material::new("steel", 7850.0, 200e9, 0.3),
            Material::new("copper", 8960.0, 120e9, 0.34),
            Material::new("aluminum", 2700.0, 69e9, 0.33),
            Material::new("soft_biological_tissue", 1000.0, 10e3, 0.5),
        ];
        let fallback = materials[0].clone();
        let entries = materials
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { entries, fallback }
    }

    /// Builds a table from materials, validating each entry.
    pub fn from_materials(
        materials: impl IntoIterator<Item = Material>,
    ) -> Result<Self, MaterialsError> {
        let mut entries = IndexMap::new();
        for material in materials {
            material.validate()?;
            entries.insert(material.name.clone(), material);
        }
        let fallback = entries
            .get(FALLBACK_MATERIAL)
            .cloned()
            .ok_or(MaterialsError::MissingFallback)?;
        Ok(Self { entries, fallback })
    }

    /// Parse a table from YAML of the form `name: {density, youngs_modulus, poisson_ratio}`.
    pub fn from_yaml(yaml: &str) -> Result<Self, MaterialsError> {
        let raw: IndexMap<String, MaterialProperties> = serde_yaml::from_str(yaml)?;
        Self::from_materials(raw.into_iter().map(|(name, props)| Material {
            name,
            density: props.density,
            youngs_modulus: props.youngs_modulus,
            poisson_ratio: props.poisson_ratio,
        }))
    }

    /// Load a table from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MaterialsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.entries.get(name)
    }

    /// The entry unknown names resolve to.
    pub fn fallback(&self) -> &Material {
        &self.fallback
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the table as the bullet list embedded in generation prompts.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|m| {
                format!(
                    "- {} (E={:.2} GPa, rho={} kg/m^3)",
                    m.name,
                    m.youngs_modulus / 1e9,
                    m.density
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for MaterialsTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_fallback_first() {
        let table = MaterialsTable::builtin();
        assert_eq!(table.fallback().name, "rubber");
        assert_eq!(table.iter().next().map(|m| m.name.as_str()), Some("rubber"));
        assert_eq!(table.len(), 5);
        assert_eq!(table.get("steel").map(|m| m.youngs_modulus), Some(200e9));
    }

    #[test]
    fn lookup_is_exact() {
        let table = MaterialsTable::builtin();
        assert!(table.get("Steel").is_none());
        assert!(table.get("steel ").is_none());
    }

    #[test]
    fn yaml_table_preserves_order() {
        let yaml = r#"
rubber:
  density: 1100.0
  youngs_modulus: 1.0e7
  poisson_ratio: 0.5
titanium:
  density: 4500.0
  youngs_modulus: 1.16e11
  poisson_ratio: 0.32
"#;
        let table = MaterialsTable::from_yaml(yaml).unwrap();
        let names: Vec<_> = table.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["rubber", "titanium"]);
    }

    #[test]
    fn yaml_table_without_rubber_is_rejected() {
        let yaml = r#"
steel:
  density: 7850.0
  youngs_modulus: 2.0e11
  poisson_ratio: 0.3
"#;
        assert!(matches!(
            MaterialsTable::from_yaml(yaml),
            Err(MaterialsError::MissingFallback)
        ));
    }

    #[test]
    fn out_of_range_properties_are_rejected() {
        let yaml = r#"
rubber:
  density: -1.0
  youngs_modulus: 1.0e7
  poisson_ratio: 0.5
"#;
        let err = MaterialsTable::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("density"), "got: {err}");
    }

    #[test]
    fn describe_lists_every_material() {
        let text = MaterialsTable::builtin().describe();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("- steel (E=200.00 GPa, rho=7850 kg/m^3)"));
        assert!(text.contains("- rubber (E=0.01 GPa, rho=1100 kg/m^3)"));
    }
}
