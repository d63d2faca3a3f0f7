use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use funcini::{CancelFlag, DwarfProgram, FunctionDefinition, FunctionExporter};
use log::{debug, info, warn};
use std::path::PathBuf;

/// funcini - export function definitions of a binary to an INI file
#[derive(Parser)]
#[command(name = "funcini")]
#[command(version)]
#[command(about = "export function signatures from binaries with DWARF debug info to INI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// suppress informational messages (warnings and errors only)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// verbose logging to console (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// write one [name] section per function of the binary
    Export {
        /// path to the binary (.so, .dylib, .o, executable or dSYM)
        library: PathBuf,

        /// file to write, replaced if it exists
        #[arg(short, long, env = "FUNCINI_EXPORT_TO")]
        output: PathBuf,

        /// export all functions (including internal/hidden ones)
        #[arg(long)]
        all: bool,
    },

    /// print the definitions of an exported INI file
    Show {
        /// path to the INI file
        ini: PathBuf,

        /// skip definitions with placeholder (undefined*) types
        #[arg(long)]
        typed_only: bool,

        /// only the first fully typed definition of each name, in the given order
        #[arg(long = "name", value_name = "NAME")]
        names: Vec<String>,

        /// output JSON instead of C declarations
        #[arg(short = 'j', long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose, cli.quiet);

    match cli.command {
        Command::Export {
            library,
            output,
            all,
        } => export(library, output, !all),
        Command::Show {
            ini,
            typed_only,
            names,
            json,
        } => show(ini, typed_only, &names, json),
    }
}

fn export(library: PathBuf, output: PathBuf, exported_only: bool) -> Result<()> {
    info!("library: {}", library.display());
    info!(
        "mode: {}",
        if exported_only {
            "exported only"
        } else {
            "all functions"
        }
    );

    let cancel = CancelFlag::new();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, cancel.shared())
            .with_context(|| format!("failed to register handler for signal {}", signal))?;
    }

    debug!("load library file: {}", library.display());
    let program = DwarfProgram::from_file(&library, exported_only)?;

    if program.is_empty() {
        warn!(
            "no functions found in the library. maybe you compiled without debug info, or stripped the binary?"
        );
    }

    let summary = FunctionExporter::new(output).export(&program, cancel.as_predicate())?;

    if summary.cancelled {
        warn!(
            "export interrupted, {} of {} functions written to {}",
            summary.functions,
            program.len(),
            summary.path.display()
        );
    } else {
        info!(
            "{} functions ({} lines) written to {}",
            summary.functions,
            summary.lines,
            summary.path.display()
        );
    }

    Ok(())
}

fn show(ini: PathBuf, typed_only: bool, names: &[String], json: bool) -> Result<()> {
    let definitions = funcini::load_definitions(&ini)?;
    info!("{} definitions in {}", definitions.len(), ini.display());

    let selected: Vec<&FunctionDefinition> = if names.is_empty() {
        definitions
            .iter()
            .filter(|def| !typed_only || def.is_fully_typed())
            .collect()
    } else {
        funcini::select_exported(&definitions, names)
    };

    if selected.len() < definitions.len() {
        debug!("{} definitions filtered out", definitions.len() - selected.len());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else {
        for def in &selected {
            println!("{};", def.signature);
        }
    }

    Ok(())
}

fn init_logger(verbose: u8, quiet: bool) {
    let log_level = if quiet {
        log::LevelFilter::Warn
    } else {
        match verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}
