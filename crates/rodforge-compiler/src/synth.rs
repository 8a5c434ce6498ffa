//! Program synthesis.
//!
//! Walks a resolved [`SceneModel`] and emits the instruction sequence in
//! fixed phase order:
//!
//! 1. simulator setup
//! 2. rods, each followed by its damping
//! 3. constraints then forces, rod by rod
//! 4. connections
//! 5. diagnostics recorders
//! 6. integration
//! 7. persistence
//!
//! Synthesis is infallible: everything that can be wrong with a scene has
//! already been rejected by the resolver.

use rodforge_scene::{
    ConnectionSpec, Constraint, ForceSpec, JointKind, RodEnd, RodSpec, SceneModel,
};
use tracing::debug;

use crate::derive::{
    clamp_muscle_amplitude, shear_modulus, wave_number, DerivedParameters, DIAGNOSTIC_STRIDE,
};
use crate::ir::{
    ForceCall, Instruction, JointCall, Program, RodConstruction, RodId, TorqueAmplitude,
    TRAJECTORY_FILE,
};

/// Axis of the muscle torque wave; the rod normal for rods laid along z.
pub const MUSCLE_TORQUE_AXIS: [f64; 3] = [0.0, 1.0, 0.0];

struct Synthesizer<'a> {
    scene: &'a SceneModel,
    params: DerivedParameters,
    instructions: Vec<Instruction>,
}

impl<'a> Synthesizer<'a> {
    fn new(scene: &'a SceneModel, params: DerivedParameters) -> Self {
        Self {
            scene,
            params,
            instructions: Vec::new(),
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn rods(&self) -> impl Iterator<Item = (RodId, &'a RodSpec)> {
        let scene: &'a SceneModel = self.scene;
        scene
            .objects
            .iter()
            .enumerate()
            .map(|(i, rod)| (RodId(i), rod))
    }

    fn setup(&mut self) {
        self.emit(Instruction::CreateSimulator);
    }

    fn construct(&mut self) {
        for (id, rod) in self.rods() {
            self.emit(Instruction::CreateRod {
                rod: id,
                spec: RodConstruction {
                    material: rod.material.name.clone(),
                    element_count: rod.element_count,
                    length: rod.length,
                    radius: rod.radius,
                    density: rod.material.density,
                    youngs_modulus: rod.material.youngs_modulus,
                    shear_modulus: shear_modulus(&rod.material),
                    start: rod.start,
                    direction: rod.direction,
                    normal: rod.normal,
                    velocity: rod.initial_velocity,
                    omega: rod.initial_angular_velocity,
                },
            });
            if rod.damping_coefficient > 0.0 {
                self.emit(Instruction::AttachDamping {
                    rod: id,
                    coefficient: rod.damping_coefficient,
                    time_step: self.params.time_step,
                });
            }
        }
    }

    fn interact(&mut self) {
        for (id, rod) in self.rods() {
            for constraint in &rod.constraints {
                let end = match constraint {
                    Constraint::ClampedStart => RodEnd::Start,
                    Constraint::ClampedEnd => RodEnd::End,
                    Constraint::Free => continue,
                };
                self.emit(Instruction::Constrain {
                    rod: id,
                    end,
                    node: rod.node_index(end),
                });
            }
            for force in &rod.forces {
                self.emit(Instruction::ApplyForce {
                    rod: id,
                    force: force_call(force),
                });
            }
        }
    }

    fn couple(&mut self) {
        let scene = self.scene;
        for connection in &scene.connections {
            let instruction = self.connect(connection);
            self.emit(instruction);
        }
    }

    fn connect(&self, connection: &ConnectionSpec) -> Instruction {
        let rod_a = &self.scene.objects[connection.rod_a];
        let rod_b = &self.scene.objects[connection.rod_b];
        Instruction::Connect {
            rod_a: RodId(connection.rod_a),
            rod_b: RodId(connection.rod_b),
            offset_a: connection.offset_a,
            offset_b: connection.offset_b,
            node_a: rod_a.node_index(connection.offset_a),
            node_b: rod_b.node_index(connection.offset_b),
            joint: match connection.joint {
                JointKind::Fixed => JointCall::Fixed,
                JointKind::Spherical => JointCall::Spherical,
                JointKind::Hinge => JointCall::Hinge {
                    axis: connection.hinge_normal,
                },
            },
        }
    }

    fn observe(&mut self) {
        for (id, _) in self.rods() {
            self.emit(Instruction::AttachDiagnostics {
                rod: id,
                stride: DIAGNOSTIC_STRIDE,
            });
        }
    }

    fn integrate(&mut self) {
        self.emit(Instruction::Integrate {
            duration: self.params.duration,
            total_steps: self.params.total_steps,
        });
    }

    fn persist(&mut self) {
        let rods = self.rods().map(|(id, _)| id).collect();
        self.emit(Instruction::Persist {
            rods,
            fps: self.params.fps,
            path: TRAJECTORY_FILE.to_string(),
        });
    }

    fn finish(self) -> Program {
        Program {
            params: self.params,
            instructions: self.instructions,
        }
    }
}

fn force_call(force: &ForceSpec) -> ForceCall {
    match *force {
        ForceSpec::Gravity { acc } => ForceCall::Gravity { acc },
        ForceSpec::EndpointForce { force, ramp } => ForceCall::EndpointForce { force, ramp },
        ForceSpec::MuscleActivity {
            amplitude,
            wave_length,
            frequency,
            phase,
            ramp,
        } => ForceCall::MuscleTorque {
            torque: TorqueAmplitude {
                wave_number: wave_number(wave_length),
                amplitude: clamp_muscle_amplitude(amplitude),
            },
            wave_length,
            frequency,
            phase,
            ramp,
            direction: MUSCLE_TORQUE_AXIS,
        },
        ForceSpec::AnisotropicFriction {
            static_friction,
            kinetic_friction,
            plane_normal,
            plane_origin,
        } => ForceCall::AnisotropicFriction {
            static_friction,
            kinetic_friction,
            plane_normal,
            plane_origin,
        },
    }
}

/// Emit the program for a resolved scene.
pub fn synthesize(scene: &SceneModel, params: DerivedParameters) -> Program {
    let mut synth = Synthesizer::new(scene, params);
    synth.setup();
    synth.construct();
    synth.interact();
    synth.couple();
    synth.observe();
    synth.integrate();
    synth.persist();

    let program = synth.finish();
    debug!(
        instructions = program.instructions.len(),
        rods = scene.objects.len(),
        total_steps = program.params.total_steps,
        "program synthesized"
    );
    program
}
