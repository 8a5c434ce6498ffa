//! Raw scene document schema.
//!
//! These types mirror the JSON produced by the upstream scene generator as
//! closely as possible: every field is optional, numbers are `f64` even where
//! an integer is meant, and tags are plain strings. Nothing here is
//! validated; [`DefaultResolver`](crate::DefaultResolver) turns a
//! [`SceneDocument`] into a checked [`SceneModel`](crate::SceneModel).
//!
//! Field names follow the generator's snake_case schema. The camelCase names
//! used in the data model documentation are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Top-level scene document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Bodies; list position is identity for connections.
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,

    /// Rod-to-rod joints.
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,

    /// Duration and frame rate.
    #[serde(default)]
    pub render: Option<RenderEntry>,
}

impl SceneDocument {
    /// Parse a scene document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize back to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One body in the scene. Only rods exist today.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f64; 3]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[serde(
        default,
        alias = "elementCount",
        alias = "element_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub n_elem: Option<f64>,

    #[serde(default, alias = "initialVelocity", skip_serializing_if = "Option::is_none")]
    pub velocity: Option<[f64; 3]>,
    #[serde(
        default,
        alias = "initialAngularVelocity",
        skip_serializing_if = "Option::is_none"
    )]
    pub omega: Option<[f64; 3]>,
    #[serde(default, alias = "dampingCoefficient", skip_serializing_if = "Option::is_none")]
    pub nu: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forces: Vec<ForceEntry>,
}

/// A force as written by the generator.
///
/// Older documents name the force with a bare string (`"gravity"`); newer
/// ones use an object with a `type` tag and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForceEntry {
    Name(String),
    Spec(ForceFields),
}

impl ForceEntry {
    /// The force's tag.
    pub fn tag(&self) -> &str {
        match self {
            ForceEntry::Name(name) => name,
            ForceEntry::Spec(fields) => &fields.kind,
        }
    }

    /// Parameters, or an empty set for the bare-string form.
    pub fn fields(&self) -> ForceFields {
        match self {
            ForceEntry::Name(name) => ForceFields {
                kind: name.clone(),
                ..ForceFields::default()
            },
            ForceEntry::Spec(fields) => fields.clone(),
        }
    }
}

/// Union of every force variant's parameters; the resolver picks by `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceFields {
    #[serde(rename = "type")]
    pub kind: String,

    // gravity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<[f64; 3]>,

    // endpoint_force
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<[f64; 3]>,

    // endpoint_force, muscle_activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp: Option<f64>,

    // muscle_activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    #[serde(default, alias = "waveLength", skip_serializing_if = "Option::is_none")]
    pub wave_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,

    // anisotropic_friction
    #[serde(default, alias = "staticFriction", skip_serializing_if = "Option::is_none")]
    pub static_friction: Option<[f64; 3]>,
    #[serde(default, alias = "kineticFriction", skip_serializing_if = "Option::is_none")]
    pub kinetic_friction: Option<[f64; 3]>,
    #[serde(default, alias = "planeNormal", skip_serializing_if = "Option::is_none")]
    pub plane_normal: Option<[f64; 3]>,
    #[serde(default, alias = "planeOrigin", skip_serializing_if = "Option::is_none")]
    pub plane_origin: Option<[f64; 3]>,
}

/// A joint between two rods, addressed by object-list position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    #[serde(default, alias = "rodAIndex", skip_serializing_if = "Option::is_none")]
    pub rod_a_index: Option<f64>,
    #[serde(default, alias = "rodBIndex", skip_serializing_if = "Option::is_none")]
    pub rod_b_index: Option<f64>,

    #[serde(default, alias = "offsetA", skip_serializing_if = "Option::is_none")]
    pub offset_a: Option<String>,
    #[serde(default, alias = "offsetB", skip_serializing_if = "Option::is_none")]
    pub offset_b: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Hinge axis; ignored for other joint types.
    #[serde(default, alias = "hingeNormal", skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
}
