//! BIM Assembly CLI
//!
//! Compile presets from a preset pack and evaluate slot formulas.

use bim_assembly::expression::{evaluate, extract_variables, Variables};
use bim_assembly::{
    export_json, load_preset_pack, solve_layout, AssemblyCompiler, AssemblyKind, CompilerConfig,
    ObjectType,
};
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bim-assembly")]
#[command(author, version, about = "Compile BIM presets into assemblies", long_about = None)]
struct Cli {
    /// Log traversal detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one preset into an assembly and print it as JSON
    Compile {
        /// Path to preset pack (ZIP or directory)
        #[arg(short, long)]
        pack: PathBuf,

        /// Root preset key
        #[arg(short, long)]
        key: String,

        /// Overall scale for the part layout, as x,y,z
        #[arg(short, long, value_parser = parse_scale, default_value = "1,1,1")]
        scale: Vec3,

        /// Maximum preset nesting depth
        #[arg(long, default_value = "64")]
        max_depth: usize,

        /// Output file path (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the presets in a pack
    List {
        /// Path to preset pack (ZIP or directory)
        #[arg(short, long)]
        pack: PathBuf,

        /// Only list presets of this object type (e.g., "Door")
        #[arg(short = 't', long)]
        object_type: Option<String>,
    },

    /// Evaluate a formula
    Eval {
        /// Formula text (e.g., "2Width + 1")
        formula: String,

        /// Variable bindings as name=value pairs
        #[arg(long = "var", value_parser = parse_variable)]
        vars: Vec<(String, f32)>,
    },

    /// Print the variables a formula references
    Vars {
        /// Formula text
        formula: String,
    },
}

fn parse_variable(s: &str) -> Result<(String, f32), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid variable format: '{}'. Use name=value", s));
    }
    let value = parts[1]
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("Invalid value for {}: {}", parts[0], e))?;
    Ok((parts[0].trim().to_string(), value))
}

fn parse_scale(s: &str) -> Result<Vec3, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid scale '{}': {}", s, e))?;
    match values.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        [uniform] => Ok(Vec3::splat(*uniform)),
        _ => Err(format!("Invalid scale '{}'. Use x,y,z", s)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            pack,
            key,
            scale,
            max_depth,
            output,
        } => {
            compile(&pack, &key, scale, max_depth, output.as_ref())?;
        }
        Commands::List { pack, object_type } => {
            list_presets(&pack, object_type.as_deref())?;
        }
        Commands::Eval { formula, vars } => {
            let vars: Variables = vars.into_iter().collect();
            println!("{}", evaluate(&vars, &formula)?);
        }
        Commands::Vars { formula } => {
            for name in extract_variables(&formula) {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn compile(
    pack_path: &PathBuf,
    key: &str,
    scale: Vec3,
    max_depth: usize,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Loading preset pack from {:?}...", pack_path);
    let pack = load_preset_pack(pack_path)?;
    eprintln!(
        "Loaded {} presets, {} meshes, {} materials",
        pack.presets.preset_count(),
        pack.database.mesh_count(),
        pack.database.material_count()
    );

    let config = CompilerConfig::default().with_max_depth(max_depth);
    let compiler = AssemblyCompiler::with_config(&pack.presets, &pack.database, config);
    let spec = compiler.compile(key)?;

    let layout = match spec.object_type.assembly_kind() {
        Some(AssemblyKind::Rigged) | Some(AssemblyKind::Cabinet) if !spec.parts.is_empty() => {
            Some(solve_layout(&spec, scale)?)
        }
        _ => None,
    };

    let json = export_json(&spec, layout.as_ref(), true)?;
    match output {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!("Exported {} ({} bytes) to {:?}", spec.name(), json.len(), path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn list_presets(
    pack_path: &PathBuf,
    object_type: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pack = load_preset_pack(pack_path)?;

    let filter: Option<ObjectType> = object_type
        .map(|t| serde_json::from_value(serde_json::Value::String(t.to_string())))
        .transpose()
        .map_err(|_| format!("Unknown object type '{}'", object_type.unwrap_or_default()))?;

    for preset in pack.presets.iter() {
        if filter.map_or(true, |t| preset.object_type == t) {
            println!("{:<40} {:<12} {:?}", preset.key, preset.scope.as_str(), preset.object_type);
        }
    }

    let problems = pack.schema.validate(&pack.presets);
    for problem in &problems {
        tracing::warn!("{}", problem);
    }

    Ok(())
}
