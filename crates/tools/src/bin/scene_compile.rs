//!
//! Compile a scene document into a simulation script.
//!
//! Usage: `scene-compile <scene.json> [--emit python|listing|json] [--output FILE]`

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use rodforge_compiler::{ListingBackend, PythonBackend, SceneCompiler};
use rodforge_scene::{format_errors, MaterialsTable, ResolveOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Emit {
    /// Runnable PyElastica script
    Python,
    /// One line per instruction
    Listing,
    /// Instruction IR as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "scene-compile")]
#[command(about = "Compile a scene document into a rod simulation")]
struct Args {
    /// Scene document (JSON); `-` reads stdin
    scene: PathBuf,

    /// What to emit
    #[arg(long, value_enum, default_value = "python")]
    emit: Emit,

    /// YAML materials table replacing the built-in one
    #[arg(long)]
    materials: Option<PathBuf>,

    /// Reject unknown material names instead of falling back to rubber
    #[arg(long)]
    strict: bool,

    /// Write output here instead of stdout
    #[arg(long = "output", short = 'o')]
    output: Option<PathBuf>,
}

fn main() {
    rodforge_tools::init_logging();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{err:#}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the scene was rejected (diagnostics already
/// reported).
fn run(args: &Args) -> anyhow::Result<bool> {
    let text = if args.scene.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        text
    } else {
        fs::read_to_string(&args.scene)
            .with_context(|| format!("failed to read {}", args.scene.display()))?
    };

    let materials = match &args.materials {
        Some(path) => MaterialsTable::load(path)
            .with_context(|| format!("failed to load materials from {}", path.display()))?,
        None => MaterialsTable::builtin(),
    };
    let compiler = SceneCompiler::new(Arc::new(materials)).with_options(ResolveOptions {
        strict_materials: args.strict,
    });
    let compiler = match args.emit {
        Emit::Listing => compiler.with_backend(ListingBackend),
        Emit::Python | Emit::Json => compiler.with_backend(PythonBackend),
    };

    let compiled = match compiler.compile_str(&text) {
        Ok(compiled) => compiled,
        Err(errors) => {
            error!("{}", format_errors(&errors).trim_end());
            return Ok(false);
        }
    };
    if !compiled.warnings.is_empty() {
        warn!("{}", format_errors(&compiled.warnings).trim_end());
    }

    let output = match args.emit {
        Emit::Json => compiled
            .program
            .to_json_pretty()
            .context("failed to serialize program")?,
        Emit::Python | Emit::Listing => compiled.source,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "Compiled {} rods, {} steps (dt = {:e}) -> {}",
                compiled.program.rod_count(),
                compiled.program.params.total_steps,
                compiled.program.params.time_step,
                path.display()
            );
        }
        None => print!("{output}"),
    }
    Ok(true)
}
