//! Instruction IR.
//!
//! A [`Program`] is the compiled form of a scene: an ordered list of
//! [`Instruction`]s against the rod engine's capability surface plus the
//! [`DerivedParameters`] they were built with. Back ends render a program to
//! a concrete target without reinterpreting the scene.
//!
//! Every instruction belongs to a [`Phase`]. Later phases reference handles
//! created by earlier ones, so a well-formed program never goes back to an
//! earlier phase.

use std::fmt;

use rodforge_scene::{RodEnd, Vec3};
use serde::{Deserialize, Serialize};

use crate::derive::DerivedParameters;

/// Trajectory artifact written by the persist instruction, relative to the
/// engine's working directory.
pub const TRAJECTORY_FILE: &str = "simulation_data.pkl";

/// Index of a node along a rod (`0..=element_count`).
pub type NodeIndex = usize;

/// Handle of a constructed rod; the rod's position in the scene object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RodId(pub usize);

impl fmt::Display for RodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rod_{}", self.0)
    }
}

/// Emission phase. Ordering of variants is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Simulator creation
    Setup,
    /// Rod construction and damping
    Construct,
    /// Constraints and forces
    Interact,
    /// Joints between rods
    Couple,
    /// Diagnostics recorders
    Observe,
    /// Finalize and time-step
    Integrate,
    /// Trajectory serialization
    Persist,
}

impl Phase {
    pub fn title(self) -> &'static str {
        match self {
            Phase::Setup => "Setup simulator",
            Phase::Construct => "Create rods",
            Phase::Interact => "Constraints and forces",
            Phase::Couple => "Connections",
            Phase::Observe => "Diagnostics",
            Phase::Integrate => "Run simulation",
            Phase::Persist => "Save results",
        }
    }
}

/// Everything needed to build a straight rod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RodConstruction {
    pub material: String,
    pub element_count: usize,
    pub length: f64,
    pub radius: f64,
    pub density: f64,
    pub youngs_modulus: f64,
    pub shear_modulus: f64,
    pub start: Vec3,
    pub direction: Vec3,
    pub normal: Vec3,
    pub velocity: Vec3,
    pub omega: Vec3,
}

/// Traveling torque wave. The torque amplitude is
/// `mean_bending_stiffness * wave_number^2 * amplitude`; the stiffness comes
/// from the live rod, so back ends emit the product as an engine expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueAmplitude {
    /// `2 * pi / wave_length`
    pub wave_number: f64,
    /// Clamped curvature amplitude in meters
    pub amplitude: f64,
}

/// Force construction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForceCall {
    Gravity {
        acc: Vec3,
    },
    EndpointForce {
        force: Vec3,
        ramp: f64,
    },
    MuscleTorque {
        torque: TorqueAmplitude,
        wave_length: f64,
        frequency: f64,
        phase: f64,
        ramp: f64,
        /// Torque axis
        direction: Vec3,
    },
    AnisotropicFriction {
        static_friction: Vec3,
        kinetic_friction: Vec3,
        plane_normal: Vec3,
        plane_origin: Vec3,
    },
}

/// Joint construction call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JointCall {
    Fixed,
    Spherical,
    Hinge { axis: Vec3 },
}

impl JointCall {
    pub fn name(&self) -> &'static str {
        match self {
            JointCall::Fixed => "fixed",
            JointCall::Spherical => "spherical",
            JointCall::Hinge { .. } => "hinge",
        }
    }
}

/// One call against the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    CreateSimulator,
    CreateRod {
        rod: RodId,
        spec: RodConstruction,
    },
    AttachDamping {
        rod: RodId,
        coefficient: f64,
        time_step: f64,
    },
    /// Fix position and orientation of one node.
    Constrain {
        rod: RodId,
        end: RodEnd,
        node: NodeIndex,
    },
    ApplyForce {
        rod: RodId,
        force: ForceCall,
    },
    Connect {
        rod_a: RodId,
        rod_b: RodId,
        offset_a: RodEnd,
        offset_b: RodEnd,
        node_a: NodeIndex,
        node_b: NodeIndex,
        joint: JointCall,
    },
    AttachDiagnostics {
        rod: RodId,
        stride: u32,
    },
    Integrate {
        duration: f64,
        total_steps: u64,
    },
    /// Serialize every recorded history, in rod order, with render metadata.
    Persist {
        rods: Vec<RodId>,
        fps: u32,
        path: String,
    },
}

impl Instruction {
    pub fn phase(&self) -> Phase {
        match self {
            Instruction::CreateSimulator => Phase::Setup,
            Instruction::CreateRod { .. } | Instruction::AttachDamping { .. } => Phase::Construct,
            Instruction::Constrain { .. } | Instruction::ApplyForce { .. } => Phase::Interact,
            Instruction::Connect { .. } => Phase::Couple,
            Instruction::AttachDiagnostics { .. } => Phase::Observe,
            Instruction::Integrate { .. } => Phase::Integrate,
            Instruction::Persist { .. } => Phase::Persist,
        }
    }
}

/// A compiled scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub params: DerivedParameters,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of rods the program constructs.
    pub fn rod_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::CreateRod { .. }))
            .count()
    }

    /// True when phases never decrease along the instruction list.
    pub fn is_phase_ordered(&self) -> bool {
        self.instructions
            .windows(2)
            .all(|pair| pair[0].phase() <= pair[1].phase())
    }

    /// Instructions of a single phase, in order.
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().filter(move |i| i.phase() == phase)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rod_id_display() {
        assert_eq!(RodId(3).to_string(), "rod_3");
    }

    #[test]
    fn phases_are_ordered_by_execution() {
        assert!(Phase::Setup < Phase::Construct);
        assert!(Phase::Construct < Phase::Interact);
        assert!(Phase::Interact < Phase::Couple);
        assert!(Phase::Couple < Phase::Observe);
        assert!(Phase::Observe < Phase::Integrate);
        assert!(Phase::Integrate < Phase::Persist);
    }

    #[test]
    fn instructions_serialize_with_op_tag() {
        let json = serde_json::to_value(Instruction::AttachDiagnostics {
            rod: RodId(1),
            stride: 200,
        })
        .unwrap();
        assert_eq!(json["op"], "attach_diagnostics");
        assert_eq!(json["rod"], 1);
    }
}
