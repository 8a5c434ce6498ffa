//! Validated scene model.
//!
//! A [`SceneModel`] is what the resolver hands to the compiler: every
//! optional field has a concrete value, every tag is a closed enum and every
//! connection indexes an existing rod. Object-list position is the rod's
//! identity; connections refer to rods by that position.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::materials::Material;

/// Cartesian 3-vector.
pub type Vec3 = [f64; 3];

/// Fully resolved scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    pub objects: Vec<RodSpec>,
    pub connections: Vec<ConnectionSpec>,
    pub render: RenderSettings,
}

/// A straight elastic rod before simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RodSpec {
    pub start: Vec3,
    /// Axis direction; not required to be unit length.
    pub direction: Vec3,
    /// Must be perpendicular to `direction`. Not checked here.
    pub normal: Vec3,
    pub length: f64,
    pub radius: f64,
    pub material: Material,
    pub element_count: usize,
    pub initial_velocity: Vec3,
    pub initial_angular_velocity: Vec3,
    /// Zero disables damping.
    pub damping_coefficient: f64,
    /// Ordered, without duplicates.
    pub constraints: Vec<Constraint>,
    /// Emission order follows list order.
    pub forces: Vec<ForceSpec>,
}

impl RodSpec {
    /// Discretization length `length / element_count`.
    pub fn element_length(&self) -> f64 {
        self.length / self.element_count as f64
    }

    /// Index of the node an end selector names. A rod of `n` elements has
    /// `n + 1` nodes.
    pub fn node_index(&self, end: RodEnd) -> usize {
        match end {
            RodEnd::Start => 0,
            RodEnd::End => self.element_count,
        }
    }
}

/// Boundary condition applied to a rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Fix position and orientation of the first node
    ClampedStart,
    /// Fix position and orientation of the last node
    ClampedEnd,
    /// No boundary condition
    Free,
}

impl Constraint {
    pub const ALL: [Constraint; 3] = [
        Constraint::ClampedStart,
        Constraint::ClampedEnd,
        Constraint::Free,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Constraint::ClampedStart => "clamped_start",
            Constraint::ClampedEnd => "clamped_end",
            Constraint::Free => "free",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

/// External or internal loading on a rod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceSpec {
    Gravity {
        acc: Vec3,
    },
    EndpointForce {
        force: Vec3,
        ramp: f64,
    },
    /// Traveling torque wave. `amplitude` is a spatial curvature amplitude in
    /// meters, not a torque.
    MuscleActivity {
        amplitude: f64,
        wave_length: f64,
        frequency: f64,
        phase: f64,
        ramp: f64,
    },
    AnisotropicFriction {
        static_friction: Vec3,
        kinetic_friction: Vec3,
        plane_normal: Vec3,
        plane_origin: Vec3,
    },
}

impl ForceSpec {
    pub const TAGS: [&'static str; 4] = [
        "gravity",
        "endpoint_force",
        "muscle_activity",
        "anisotropic_friction",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ForceSpec::Gravity { .. } => Self::TAGS[0],
            ForceSpec::EndpointForce { .. } => Self::TAGS[1],
            ForceSpec::MuscleActivity { .. } => Self::TAGS[2],
            ForceSpec::AnisotropicFriction { .. } => Self::TAGS[3],
        }
    }
}

/// Which end of a rod a joint attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RodEnd {
    Start,
    End,
}

impl RodEnd {
    pub fn tag(self) -> &'static str {
        match self {
            RodEnd::Start => "start",
            RodEnd::End => "end",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "start" => Some(RodEnd::Start),
            "end" => Some(RodEnd::End),
            _ => None,
        }
    }
}

impl fmt::Display for RodEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Rotational freedom of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Fixed,
    Spherical,
    Hinge,
}

impl JointKind {
    pub const ALL: [JointKind; 3] = [JointKind::Fixed, JointKind::Spherical, JointKind::Hinge];

    pub fn tag(self) -> &'static str {
        match self {
            JointKind::Fixed => "fixed_joint",
            JointKind::Spherical => "spherical_joint",
            JointKind::Hinge => "hinge_joint",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.tag() == tag)
    }
}

/// Joint between the ends of two rods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub rod_a: usize,
    pub rod_b: usize,
    pub offset_a: RodEnd,
    pub offset_b: RodEnd,
    pub joint: JointKind,
    /// Only meaningful for hinge joints.
    pub hinge_normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Simulated time in seconds
    pub duration: f64,
    pub fps: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            duration: 10.0,
            fps: 60,
        }
    }
}
