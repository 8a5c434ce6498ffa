//! Scene documents for rod simulations.
//!
//! This crate owns everything between a generated JSON scene and a validated
//! [`SceneModel`]:
//!
//! - [`document`] - the raw, permissive JSON schema
//! - [`materials`] - named material properties with a rubber fallback
//! - [`resolve`] - default filling and validation
//! - [`model`] - the checked scene handed to the compiler
//! - [`error`] - located diagnostics

pub mod document;
pub mod error;
pub mod materials;
pub mod model;
pub mod resolve;

pub use document::SceneDocument;
pub use error::{format_errors, has_errors, CompileError, ErrorKind, Severity};
pub use materials::{Material, MaterialsError, MaterialsTable, FALLBACK_MATERIAL};
pub use model::{
    ConnectionSpec, Constraint, ForceSpec, JointKind, RenderSettings, RodEnd, RodSpec, SceneModel,
    Vec3,
};
pub use resolve::{DefaultResolver, Resolution, ResolveOptions};
