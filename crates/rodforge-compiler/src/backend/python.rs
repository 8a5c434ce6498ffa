//! PyElastica script back end.
//!
//! Output is a standalone Python script: a fixed prelude of helper routines
//! (`prelude.py`) followed by a generated `main()` with one statement per
//! instruction, grouped under a comment header for each phase.

use crate::backend::{float, vector, Backend};
use crate::ir::{ForceCall, Instruction, JointCall, NodeIndex, Program, RodId};
use rodforge_scene::RodEnd;

const PRELUDE: &str = include_str!("prelude.py");

const INDENT: &str = "    ";

/// Renders programs as PyElastica scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonBackend;

impl Backend for PythonBackend {
    fn name(&self) -> &'static str {
        "python"
    }

    fn emit(&self, program: &Program) -> String {
        let mut out = Script::default();
        out.raw(PRELUDE.trim_end());
        out.blank();
        out.blank();
        out.raw("def main():");

        let mut current = None;
        for instruction in program.instructions() {
            let phase = instruction.phase();
            if current != Some(phase) {
                if current.is_some() {
                    out.blank();
                }
                out.line(&format!("# {}", phase.title()));
                current = Some(phase);
            }
            emit_instruction(&mut out, program, instruction);
        }

        out.blank();
        out.blank();
        out.raw("if __name__ == \"__main__\":");
        out.line("main()");
        out.finish()
    }
}

#[derive(Default)]
struct Script {
    lines: Vec<String>,
}

impl Script {
    fn raw(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    /// One statement inside `main()`.
    fn line(&mut self, text: &str) {
        self.lines.push(format!("{INDENT}{text}"));
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

fn emit_instruction(out: &mut Script, program: &Program, instruction: &Instruction) {
    match instruction {
        Instruction::CreateSimulator => {
            out.line("sim = create_simulator()");
            out.line(&format!("dt = {}", float(program.params.time_step)));
            out.line(&format!("total_steps = {}", program.params.total_steps));
        }
        Instruction::CreateRod { rod, spec } => {
            out.line(&format!("# {rod} ({})", spec.material));
            out.line(&format!("{rod} = make_rod("));
            out.line(&format!("{INDENT}sim,"));
            for (key, value) in [
                ("n_elem", spec.element_count.to_string()),
                ("length", float(spec.length)),
                ("radius", float(spec.radius)),
                ("density", float(spec.density)),
                ("youngs_modulus", float(spec.youngs_modulus)),
                ("shear_modulus", float(spec.shear_modulus)),
                ("start", vector(&spec.start)),
                ("direction", vector(&spec.direction)),
                ("normal", vector(&spec.normal)),
                ("velocity", vector(&spec.velocity)),
                ("omega", vector(&spec.omega)),
            ] {
                out.line(&format!("{INDENT}{key}={value},"));
            }
            out.line(")");
        }
        Instruction::AttachDamping {
            rod,
            coefficient,
            time_step,
        } => out.line(&format!(
            "add_damping(sim, {rod}, damping_constant={}, time_step={})",
            float(*coefficient),
            float(*time_step)
        )),
        Instruction::Constrain { rod, node, .. } => {
            out.line(&format!("clamp_node(sim, {rod}, {node})"))
        }
        Instruction::ApplyForce { rod, force } => out.line(&force_statement(*rod, force)),
        Instruction::Connect {
            rod_a,
            rod_b,
            offset_a,
            offset_b,
            node_a,
            node_b,
            joint,
        } => {
            out.line(&format!(
                "# {rod_a} ({offset_a}) -> {rod_b} ({offset_b}), {}",
                joint.name()
            ));
            let args = format!(
                "sim, {rod_a}, {rod_b}, index_one={}, index_two={}",
                joint_index(*offset_a, *node_a),
                joint_index(*offset_b, *node_b)
            );
            out.line(&match joint {
                JointCall::Fixed => format!("connect_fixed({args})"),
                JointCall::Spherical => format!("connect_spherical({args})"),
                JointCall::Hinge { axis } => {
                    format!("connect_hinge({args}, normal={})", vector(axis))
                }
            });
        }
        Instruction::AttachDiagnostics { rod, stride } => out.line(&format!(
            "history_{} = record_history(sim, {rod}, step_skip={stride})",
            rod.0
        )),
        Instruction::Integrate { duration, .. } => {
            out.line(&format!(
                "print(\"Running simulation for {}s ({{}} steps)\".format(total_steps))",
                float(*duration)
            ));
            out.line(&format!(
                "finalize_and_integrate(sim, final_time={}, total_steps=total_steps)",
                float(*duration)
            ));
        }
        Instruction::Persist { rods, fps, path } => {
            let histories = rods
                .iter()
                .map(|rod| format!("history_{}", rod.0))
                .collect::<Vec<_>>()
                .join(", ");
            out.line(&format!(
                "save_trajectory([{histories}], fps={}, path={path:?})",
                float(f64::from(*fps))
            ));
        }
    }
}

/// Joints index the rod's directors as well as its nodes, so the last node is
/// addressed as `-1` rather than `n_elem`.
fn joint_index(offset: RodEnd, node: NodeIndex) -> String {
    match offset {
        RodEnd::Start => node.to_string(),
        RodEnd::End => "-1".to_string(),
    }
}

fn force_statement(rod: RodId, force: &ForceCall) -> String {
    match force {
        ForceCall::Gravity { acc } => format!("add_gravity(sim, {rod}, acc={})", vector(acc)),
        ForceCall::EndpointForce { force, ramp } => format!(
            "add_endpoint_force(sim, {rod}, force={}, ramp_up_time={})",
            vector(force),
            float(*ramp)
        ),
        ForceCall::MuscleTorque {
            torque,
            wave_length,
            frequency,
            phase,
            ramp,
            direction,
        } => format!(
            "add_muscle_activity(sim, {rod}, torque_amplitude=mean_bending_stiffness({rod}) * {}**2 * {}, \
             wave_length={}, frequency={}, phase={}, ramp={}, direction={})",
            float(torque.wave_number),
            float(torque.amplitude),
            float(*wave_length),
            float(*frequency),
            float(*phase),
            float(*ramp),
            vector(direction)
        ),
        ForceCall::AnisotropicFriction {
            static_friction,
            kinetic_friction,
            plane_normal,
            plane_origin,
        } => format!(
            "add_anisotropic_friction(sim, {rod}, static_friction={}, kinetic_friction={}, \
             plane_normal={}, plane_origin={})",
            vector(static_friction),
            vector(kinetic_friction),
            vector(plane_normal),
            vector(plane_origin)
        ),
    }
}
