//! Rodforge Compiler
//!
//! Turns a scene document into an executable simulation program:
//!
//! 1. **Resolve**: defaults and validation ([`rodforge_scene::DefaultResolver`]).
//! 2. **Derive**: time step, step count and other engine-only quantities.
//! 3. **Synthesize**: ordered instruction IR ([`ir::Program`]).
//! 4. **Emit**: render the IR through a [`backend::Backend`].
//!
//! Compilation is deterministic: the same document and materials table
//! always produce byte-identical output.

pub mod backend;
pub mod derive;
pub mod ir;
pub mod synth;

use std::sync::Arc;

use rodforge_scene::{
    CompileError, DefaultResolver, ErrorKind, MaterialsTable, ResolveOptions, SceneDocument,
    SceneModel,
};
use tracing::{debug, warn};

pub use backend::{Backend, ListingBackend, PythonBackend};
pub use derive::{DerivedParameters, ParameterDeriver};
pub use ir::{Instruction, Phase, Program, RodId, TRAJECTORY_FILE};
pub use synth::synthesize;

/// A scene lowered to IR.
#[derive(Debug, Clone)]
pub struct Lowered {
    pub scene: SceneModel,
    pub program: Program,
    /// Non-fatal diagnostics raised during resolution
    pub warnings: Vec<CompileError>,
}

/// A scene compiled all the way to target source.
#[derive(Debug, Clone)]
pub struct CompiledScene {
    pub program: Program,
    /// Back end output
    pub source: String,
    pub warnings: Vec<CompileError>,
}

/// Compiler configured with a materials table, resolver policy and back end.
#[derive(Clone)]
pub struct SceneCompiler {
    materials: Arc<MaterialsTable>,
    options: ResolveOptions,
    backend: Arc<dyn Backend>,
}

impl SceneCompiler {
    /// A compiler emitting PyElastica scripts with lenient material lookup.
    pub fn new(materials: Arc<MaterialsTable>) -> Self {
        Self {
            materials,
            options: ResolveOptions::default(),
            backend: Arc::new(PythonBackend),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn materials(&self) -> &MaterialsTable {
        &self.materials
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Resolve, derive and synthesize, stopping short of emission.
    ///
    /// # Returns
    ///
    /// * `Ok(Lowered)` - the program and any warnings
    /// * `Err(Vec<CompileError>)` - every diagnostic; no program is produced
    pub fn lower(&self, doc: &SceneDocument) -> Result<Lowered, Vec<CompileError>> {
        let resolution = DefaultResolver::new(&self.materials)
            .with_options(self.options)
            .resolve(doc)?;
        for warning in &resolution.warnings {
            warn!("{warning}");
        }

        let params = ParameterDeriver.derive(&resolution.scene);
        debug!(
            dt = params.time_step,
            total_steps = params.total_steps,
            "derived parameters"
        );
        let program = synthesize(&resolution.scene, params);
        Ok(Lowered {
            scene: resolution.scene,
            program,
            warnings: resolution.warnings,
        })
    }

    /// Compile a parsed document to target source.
    pub fn compile(&self, doc: &SceneDocument) -> Result<CompiledScene, Vec<CompileError>> {
        let lowered = self.lower(doc)?;
        let source = self.backend.emit(&lowered.program);
        debug!(
            backend = self.backend.name(),
            bytes = source.len(),
            "program emitted"
        );
        Ok(CompiledScene {
            program: lowered.program,
            source,
            warnings: lowered.warnings,
        })
    }

    /// Parse and compile document text. A parse failure is reported as a
    /// single `Malformed` diagnostic.
    pub fn compile_str(&self, json: &str) -> Result<CompiledScene, Vec<CompileError>> {
        let doc = SceneDocument::from_json(json).map_err(|e| {
            vec![CompileError::new(
                ErrorKind::Malformed,
                format!("line {}, column {}", e.line(), e.column()),
                e.to_string(),
            )]
        })?;
        self.compile(&doc)
    }
}

impl Default for SceneCompiler {
    fn default() -> Self {
        Self::new(Arc::new(MaterialsTable::builtin()))
    }
}

impl std::fmt::Debug for SceneCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneCompiler")
            .field("materials", &self.materials.len())
            .field("options", &self.options)
            .field("backend", &self.backend.name())
            .finish()
    }
}
