//! Human-readable instruction listing.

use crate::backend::{float, vector, Backend};
use crate::ir::{ForceCall, Instruction, Program};

/// One line per instruction, prefixed with its index and phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingBackend;

impl Backend for ListingBackend {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn emit(&self, program: &Program) -> String {
        let mut out = format!(
            "; dt={} steps={} duration={} fps={}\n",
            float(program.params.time_step),
            program.params.total_steps,
            float(program.params.duration),
            program.params.fps
        );
        for (index, instruction) in program.instructions().iter().enumerate() {
            out.push_str(&format!(
                "{index:04} {:<9} {}\n",
                format!("{:?}", instruction.phase()).to_lowercase(),
                describe(instruction)
            ));
        }
        out
    }
}

fn describe(instruction: &Instruction) -> String {
    match instruction {
        Instruction::CreateSimulator => "create_simulator".to_string(),
        Instruction::CreateRod { rod, spec } => format!(
            "create_rod {rod} material={} n_elem={} length={} radius={}",
            spec.material,
            spec.element_count,
            float(spec.length),
            float(spec.radius)
        ),
        Instruction::AttachDamping {
            rod, coefficient, ..
        } => format!("damp {rod} nu={}", float(*coefficient)),
        Instruction::Constrain { rod, end, node } => format!("clamp {rod} {end} node={node}"),
        Instruction::ApplyForce { rod, force } => match force {
            ForceCall::Gravity { acc } => format!("force {rod} gravity acc={}", vector(acc)),
            ForceCall::EndpointForce { force, ramp } => format!(
                "force {rod} endpoint force={} ramp={}",
                vector(force),
                float(*ramp)
            ),
            ForceCall::MuscleTorque { torque, .. } => format!(
                "force {rod} muscle k={} amplitude={}",
                float(torque.wave_number),
                float(torque.amplitude)
            ),
            ForceCall::AnisotropicFriction { plane_normal, .. } => {
                format!("force {rod} friction plane_normal={}", vector(plane_normal))
            }
        },
        Instruction::Connect {
            rod_a,
            rod_b,
            node_a,
            node_b,
            joint,
            ..
        } => format!(
            "connect {rod_a}[{node_a}] {rod_b}[{node_b}] {}",
            joint.name()
        ),
        Instruction::AttachDiagnostics { rod, stride } => format!("record {rod} every={stride}"),
        Instruction::Integrate {
            duration,
            total_steps,
        } => format!("integrate duration={} steps={total_steps}", float(*duration)),
        Instruction::Persist { rods, fps, path } => {
            format!("persist rods={} fps={fps} path={path}", rods.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{JointCall, RodId};
    use rodforge_scene::RodEnd;

    #[test]
    fn connect_line_names_nodes() {
        let line = describe(&Instruction::Connect {
            rod_a: RodId(0),
            rod_b: RodId(1),
            offset_a: RodEnd::End,
            offset_b: RodEnd::Start,
            node_a: 50,
            node_b: 0,
            joint: JointCall::Hinge {
                axis: [0.0, 1.0, 0.0],
            },
        });
        assert_eq!(line, "connect rod_0[50] rod_1[0] hinge");
    }
}
