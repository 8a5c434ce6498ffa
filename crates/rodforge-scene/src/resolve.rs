//! Default resolution and validation.
//!
//! [`DefaultResolver`] turns a raw [`SceneDocument`] into a [`SceneModel`]:
//! absent optional fields get their defaults, material names are looked up in
//! the [`MaterialsTable`], tags become closed enums, and geometry and
//! connection indices are checked.
//!
//! Resolution does not stop at the first problem. All diagnostics for the
//! document are collected so a single failed job reports everything that is
//! wrong with the generated scene.
//!
//! # Unknown materials
//!
//! An unknown or absent material name resolves to the table's fallback
//! (`rubber`). This is reported as a warning, or as an error when
//! [`ResolveOptions::strict_materials`] is set.

use tracing::{debug, warn};

use crate::document::{ConnectionEntry, ForceEntry, ObjectEntry, RenderEntry, SceneDocument};
use crate::error::{has_errors, CompileError, ErrorKind};
use crate::materials::{MaterialsTable, FALLBACK_MATERIAL};
use crate::model::{
    ConnectionSpec, Constraint, ForceSpec, JointKind, RenderSettings, RodEnd, RodSpec,
    SceneModel, Vec3,
};

pub const DEFAULT_START: Vec3 = [0.0, 0.0, 0.0];
pub const DEFAULT_DIRECTION: Vec3 = [0.0, 0.0, 1.0];
pub const DEFAULT_NORMAL: Vec3 = [0.0, 1.0, 0.0];
pub const DEFAULT_LENGTH: f64 = 1.0;
pub const DEFAULT_RADIUS: f64 = 0.025;
pub const DEFAULT_ELEMENT_COUNT: usize = 50;
pub const DEFAULT_DAMPING: f64 = 1e-4;
pub const DEFAULT_GRAVITY: Vec3 = [0.0, 0.0, -9.81];
pub const DEFAULT_ENDPOINT_FORCE: Vec3 = [0.1, 0.0, 0.0];
pub const DEFAULT_ENDPOINT_RAMP: f64 = 0.1;
pub const DEFAULT_PLANE_ORIGIN: Vec3 = [0.0, -0.025, 0.0];

/// Resolver policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Reject unknown material names instead of falling back to rubber.
    pub strict_materials: bool,
}

/// A resolved scene and any warnings raised along the way.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub scene: SceneModel,
    pub warnings: Vec<CompileError>,
}

/// Fills defaults and validates a scene document.
pub struct DefaultResolver<'a> {
    materials: &'a MaterialsTable,
    options: ResolveOptions,
}

impl<'a> DefaultResolver<'a> {
    pub fn new(materials: &'a MaterialsTable) -> Self {
        Self {
            materials,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve a document.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution)` - the scene plus warnings (never errors)
    /// * `Err(Vec<CompileError>)` - every diagnostic, at least one of them an error
    pub fn resolve(&self, doc: &SceneDocument) -> Result<Resolution, Vec<CompileError>> {
        let mut diagnostics = Vec::new();

        let objects: Vec<Option<RodSpec>> = doc
            .objects
            .iter()
            .enumerate()
            .map(|(index, entry)| self.resolve_rod(index, entry, &mut diagnostics))
            .collect();

        let connections: Vec<Option<ConnectionSpec>> = doc
            .connections
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                resolve_connection(index, entry, doc.objects.len(), &mut diagnostics)
            })
            .collect();

        let render = resolve_render(doc.render.as_ref(), &mut diagnostics);

        if has_errors(&diagnostics) {
            debug!(
                diagnostics = diagnostics.len(),
                "scene document rejected by resolver"
            );
            return Err(diagnostics);
        }

        // No errors means every entry resolved.
        let scene = SceneModel {
            objects: objects.into_iter().flatten().collect(),
            connections: connections.into_iter().flatten().collect(),
            render,
        };
        debug!(
            rods = scene.objects.len(),
            connections = scene.connections.len(),
            warnings = diagnostics.len(),
            "scene resolved"
        );
        Ok(Resolution {
            scene,
            warnings: diagnostics,
        })
    }

    fn resolve_rod(
        &self,
        index: usize,
        entry: &ObjectEntry,
        diagnostics: &mut Vec<CompileError>,
    ) -> Option<RodSpec> {
        let at = |field: &str| format!("objects[{index}].{field}");
        let errors_before = error_count(diagnostics);

        if let Some(kind) = entry.kind.as_deref() {
            if kind != "rod" {
                diagnostics.push(
                    CompileError::new(
                        ErrorKind::UnknownTag,
                        at("type"),
                        format!("unknown object type '{kind}'"),
                    )
                    .with_note("expected one of: rod"),
                );
            }
        }

        let start = vector(at("start"), entry.start, DEFAULT_START, diagnostics);
        let direction = vector(at("direction"), entry.direction, DEFAULT_DIRECTION, diagnostics);
        let normal = vector(at("normal"), entry.normal, DEFAULT_NORMAL, diagnostics);
        let initial_velocity = vector(at("velocity"), entry.velocity, [0.0; 3], diagnostics);
        let initial_angular_velocity = vector(at("omega"), entry.omega, [0.0; 3], diagnostics);

        let length = positive_extent(
            at("length"),
            "length",
            entry.length,
            DEFAULT_LENGTH,
            diagnostics,
        );
        let radius = positive_extent(
            at("radius"),
            "radius",
            entry.radius,
            DEFAULT_RADIUS,
            diagnostics,
        );

        let element_count = match entry.n_elem {
            None => DEFAULT_ELEMENT_COUNT,
            Some(value) => match as_index(value) {
                Some(n) if n > 0 => n,
                _ => {
                    diagnostics.push(CompileError::new(
                        ErrorKind::InvalidGeometry,
                        at("n_elem"),
                        format!("element count must be a positive integer, got {value}"),
                    ));
                    DEFAULT_ELEMENT_COUNT
                }
            },
        };

        let damping_coefficient = non_negative(
            at("nu"),
            "damping coefficient",
            entry.nu,
            DEFAULT_DAMPING,
            diagnostics,
        );

        let requested = entry
            .material
            .as_deref()
            .map(|name| (name, self.materials.get(name)));
        let material = match requested {
            Some((_, Some(material))) => material.clone(),
            requested => {
                let name = requested.map(|(name, _)| name);
                let message = match name {
                    Some(name) => format!("unknown material '{name}', using '{FALLBACK_MATERIAL}'"),
                    None => format!("no material given, using '{FALLBACK_MATERIAL}'"),
                };
                // An absent material is ordinary defaulting, not a lookup miss.
                if name.is_some() {
                    let diagnostic = if self.options.strict_materials {
                        CompileError::new(ErrorKind::UnknownMaterial, at("material"), message)
                    } else {
                        warn!(
                            rod = index,
                            material = ?name,
                            "falling back to {FALLBACK_MATERIAL}"
                        );
                        CompileError::warning(ErrorKind::UnknownMaterial, at("material"), message)
                    };
                    diagnostics.push(diagnostic.with_note(format!(
                        "available materials: {}",
                        self.materials
                            .iter()
                            .map(|m| m.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )));
                }
                self.materials.fallback().clone()
            }
        };

        let mut constraints = Vec::new();
        for (position, tag) in entry.constraints.iter().enumerate() {
            match Constraint::from_tag(tag) {
                Some(constraint) if !constraints.contains(&constraint) => {
                    constraints.push(constraint)
                }
                Some(_) => {}
                None => diagnostics.push(
                    CompileError::new(
                        ErrorKind::UnknownTag,
                        at(&format!("constraints[{position}]")),
                        format!("unknown constraint '{tag}'"),
                    )
                    .with_note("expected one of: clamped_start, clamped_end, free"),
                ),
            }
        }

        let forces = entry
            .forces
            .iter()
            .enumerate()
            .filter_map(|(position, force)| {
                resolve_force(at(&format!("forces[{position}]")), force, diagnostics)
            })
            .collect();

        if error_count(diagnostics) > errors_before {
            return None;
        }

        Some(RodSpec {
            start,
            direction,
            normal,
            length,
            radius,
            material,
            element_count,
            initial_velocity,
            initial_angular_velocity,
            damping_coefficient,
            constraints,
            forces,
        })
    }
}

fn resolve_force(
    location: String,
    entry: &ForceEntry,
    diagnostics: &mut Vec<CompileError>,
) -> Option<ForceSpec> {
    let fields = entry.fields();
    let at = |field: &str| format!("{location}.{field}");

    let force = match fields.kind.as_str() {
        "gravity" => ForceSpec::Gravity {
            acc: vector(at("acc"), fields.acc, DEFAULT_GRAVITY, diagnostics),
        },
        "endpoint_force" => ForceSpec::EndpointForce {
            force: vector(at("force"), fields.force, DEFAULT_ENDPOINT_FORCE, diagnostics),
            ramp: non_negative(
                at("ramp"),
                "ramp",
                fields.ramp,
                DEFAULT_ENDPOINT_RAMP,
                diagnostics,
            ),
        },
        "muscle_activity" => ForceSpec::MuscleActivity {
            amplitude: finite(at("amplitude"), fields.amplitude, 0.0, diagnostics),
            wave_length: positive(
                at("wave_length"),
                "wave length",
                fields.wave_length,
                1.0,
                diagnostics,
            ),
            frequency: finite(at("frequency"), fields.frequency, 1.0, diagnostics),
            phase: finite(at("phase"), fields.phase, 0.0, diagnostics),
            ramp: non_negative(at("ramp"), "ramp", fields.ramp, 0.0, diagnostics),
        },
        "anisotropic_friction" => ForceSpec::AnisotropicFriction {
            static_friction: vector(
                at("static_friction"),
                fields.static_friction,
                [0.0; 3],
                diagnostics,
            ),
            kinetic_friction: vector(
                at("kinetic_friction"),
                fields.kinetic_friction,
                [0.0; 3],
                diagnostics,
            ),
            plane_normal: vector(
                at("plane_normal"),
                fields.plane_normal,
                DEFAULT_NORMAL,
                diagnostics,
            ),
            plane_origin: vector(
                at("plane_origin"),
                fields.plane_origin,
                DEFAULT_PLANE_ORIGIN,
                diagnostics,
            ),
        },
        other => {
            diagnostics.push(
                CompileError::new(
                    ErrorKind::UnknownTag,
                    location,
                    format!("unknown force '{other}'"),
                )
                .with_note(format!("expected one of: {}", ForceSpec::TAGS.join(", "))),
            );
            return None;
        }
    };
    Some(force)
}

fn resolve_connection(
    index: usize,
    entry: &ConnectionEntry,
    object_count: usize,
    diagnostics: &mut Vec<CompileError>,
) -> Option<ConnectionSpec> {
    let at = |field: &str| format!("connections[{index}].{field}");
    let errors_before = error_count(diagnostics);

    let mut rod = |field: &str, value: Option<f64>| -> usize {
        let resolved = value.and_then(as_index).filter(|&i| i < object_count);
        if resolved.is_none() {
            let message = match value {
                Some(v) => format!("rod index {v} is out of range for {object_count} objects"),
                None => format!("connection does not name its {field}"),
            };
            diagnostics.push(CompileError::new(
                ErrorKind::DanglingConnection,
                at(field),
                message,
            ));
        }
        resolved.unwrap_or_default()
    };
    let rod_a = rod("rod_a_index", entry.rod_a_index);
    let rod_b = rod("rod_b_index", entry.rod_b_index);

    let mut offset = |field: &str, tag: Option<&str>, default: RodEnd| -> RodEnd {
        match tag {
            None => default,
            Some(tag) => RodEnd::from_tag(tag).unwrap_or_else(|| {
                diagnostics.push(
                    CompileError::new(
                        ErrorKind::UnknownTag,
                        at(field),
                        format!("unknown offset '{tag}'"),
                    )
                    .with_note("expected one of: start, end"),
                );
                default
            }),
        }
    };
    let offset_a = offset("offset_a", entry.offset_a.as_deref(), RodEnd::End);
    let offset_b = offset("offset_b", entry.offset_b.as_deref(), RodEnd::Start);

    let joint = match entry.kind.as_deref() {
        None => JointKind::Fixed,
        Some(tag) => JointKind::from_tag(tag).unwrap_or_else(|| {
            diagnostics.push(
                CompileError::new(
                    ErrorKind::UnknownTag,
                    at("type"),
                    format!("unknown joint type '{tag}'"),
                )
                .with_note("expected one of: fixed_joint, spherical_joint, hinge_joint"),
            );
            JointKind::Fixed
        }),
    };

    let hinge_normal = vector(at("normal"), entry.normal, DEFAULT_NORMAL, diagnostics);

    (error_count(diagnostics) == errors_before).then_some(ConnectionSpec {
        rod_a,
        rod_b,
        offset_a,
        offset_b,
        joint,
        hinge_normal,
    })
}

fn resolve_render(
    entry: Option<&RenderEntry>,
    diagnostics: &mut Vec<CompileError>,
) -> RenderSettings {
    let defaults = RenderSettings::default();
    let Some(entry) = entry else {
        return defaults;
    };

    let duration = positive(
        "render.duration".to_string(),
        "duration",
        entry.duration,
        defaults.duration,
        diagnostics,
    );
    let fps = match entry.fps {
        None => defaults.fps,
        Some(value) => match as_index(value).and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n > 0 => n,
            _ => {
                diagnostics.push(CompileError::new(
                    ErrorKind::InvalidParameter,
                    "render.fps",
                    format!("frame rate must be a positive integer, got {value}"),
                ));
                defaults.fps
            }
        },
    };
    RenderSettings { duration, fps }
}

fn error_count(diagnostics: &[CompileError]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

/// Integral, non-negative float to index. Generated documents write every
/// number as a float, including counts and indices.
fn as_index(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64)
        .then_some(value as usize)
}

fn vector(
    location: String,
    value: Option<Vec3>,
    default: Vec3,
    diagnostics: &mut Vec<CompileError>,
) -> Vec3 {
    match value {
        None => default,
        Some(v) if v.iter().all(|c| c.is_finite()) => v,
        Some(v) => {
            diagnostics.push(CompileError::new(
                ErrorKind::InvalidParameter,
                location,
                format!("vector components must be finite, got {v:?}"),
            ));
            default
        }
    }
}

fn finite(
    location: String,
    value: Option<f64>,
    default: f64,
    diagnostics: &mut Vec<CompileError>,
) -> f64 {
    match value {
        None => default,
        Some(v) if v.is_finite() => v,
        Some(v) => {
            diagnostics.push(CompileError::new(
                ErrorKind::InvalidParameter,
                location,
                format!("value must be finite, got {v}"),
            ));
            default
        }
    }
}

/// Acceptance rule for a scalar field.
struct Bound {
    kind: ErrorKind,
    accept: fn(f64) -> bool,
    requirement: &'static str,
}

const POSITIVE: Bound = Bound {
    kind: ErrorKind::InvalidParameter,
    accept: |v| v > 0.0,
    requirement: "positive",
};

const POSITIVE_EXTENT: Bound = Bound {
    kind: ErrorKind::InvalidGeometry,
    accept: |v| v > 0.0,
    requirement: "positive",
};

const NON_NEGATIVE: Bound = Bound {
    kind: ErrorKind::InvalidParameter,
    accept: |v| v >= 0.0,
    requirement: "non-negative",
};

fn positive(
    location: String,
    what: &str,
    value: Option<f64>,
    default: f64,
    diagnostics: &mut Vec<CompileError>,
) -> f64 {
    checked(&POSITIVE, location, what, value, diagnostics).unwrap_or(default)
}

fn positive_extent(
    location: String,
    what: &str,
    value: Option<f64>,
    default: f64,
    diagnostics: &mut Vec<CompileError>,
) -> f64 {
    checked(&POSITIVE_EXTENT, location, what, value, diagnostics).unwrap_or(default)
}

fn non_negative(
    location: String,
    what: &str,
    value: Option<f64>,
    default: f64,
    diagnostics: &mut Vec<CompileError>,
) -> f64 {
    checked(&NON_NEGATIVE, location, what, value, diagnostics).unwrap_or(default)
}

/// The value if present and within `bound`. A rejected value is reported and
/// yields `None`, as does an absent one.
fn checked(
    bound: &Bound,
    location: String,
    what: &str,
    value: Option<f64>,
    diagnostics: &mut Vec<CompileError>,
) -> Option<f64> {
    let v = value?;
    if v.is_finite() && (bound.accept)(v) {
        return Some(v);
    }
    diagnostics.push(CompileError::new(
        bound.kind,
        location,
        format!("{what} must be {}, got {v}", bound.requirement),
    ));
    None
}
