//! CLI entry point for the basic computer assembler binary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use basic_asm::{assemble_file, AssembleError, Assembly, OpcodeTables};
use clap::{Args, Parser, Subcommand};
use indexmap as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "basic-asm", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assemble source to a text listing of address/word pairs
    Build(BuildArgs),
    /// Assemble source and compare against an expected listing
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Memory-reference opcode table
    #[arg(long, default_value = "mri.txt")]
    mri: PathBuf,

    /// Register-reference opcode table
    #[arg(long, default_value = "rri.txt")]
    rri: PathBuf,

    /// Input/output opcode table
    #[arg(long, default_value = "ioi.txt")]
    ioi: PathBuf,
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Assembly source file (.asm or .S)
    input: PathBuf,

    /// Output file (default: input stem + .mc)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    tables: TableArgs,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Assembly source file (.asm or .S)
    input: PathBuf,

    /// Expected output listing
    expected: PathBuf,

    #[command(flatten)]
    tables: TableArgs,
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");

    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    parent.join(format!("{stem}.mc"))
}

fn assemble_with(input: &Path, tables: &TableArgs) -> Result<Assembly, AssembleError> {
    let tables = OpcodeTables::load(&tables.mri, &tables.rri, &tables.ioi)?;
    tracing::info!("Assembling {}...", input.display());
    assemble_file(input, &tables)
}

fn report_assemble_error(input: &Path, e: &AssembleError) {
    match e {
        AssembleError::Symbol(_) | AssembleError::Encode(_) => {
            tracing::error!("{}: {e}", input.display());
        }
        AssembleError::Source(_) | AssembleError::Table(_) => tracing::error!("{e}"),
    }
}

fn run_build(args: &BuildArgs) -> Result<(), ()> {
    let assembly = assemble_with(&args.input, &args.tables)
        .map_err(|e| report_assemble_error(&args.input, &e))?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    fs::write(&output_path, assembly.program.render())
        .map_err(|e| {
            tracing::error!("failed to write output: {e}");
        })?;

    println!(
        "Assembled {} ({} words) -> {}",
        args.input.display(),
        assembly.program.len(),
        output_path.display()
    );

    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<(), ()> {
    let assembly = assemble_with(&args.input, &args.tables)
        .map_err(|e| report_assemble_error(&args.input, &e))?;

    let expected = fs::read_to_string(&args.expected).map_err(|e| {
        tracing::error!("cannot read `{}`: {e}", args.expected.display());
    })?;

    let mismatches = assembly.program.compare(&expected);
    if mismatches.is_empty() {
        println!("TEST PASSED");
        return Ok(());
    }

    println!("TEST FAILED");
    for mismatch in &mismatches {
        println!("  {mismatch}");
    }
    Err(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    let result = match &cli.command {
        Command::Build(args) => run_build(args),
        Command::Check(args) => run_check(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}
