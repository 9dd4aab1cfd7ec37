// Command-line entry point for the AST dump tool.

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use std::io::{self, BufWriter, IsTerminal};
use std::path::PathBuf;
use tracing::Level;

use ast_dump_tool::domain::error::DumpError;
use ast_dump_tool::infrastructure::batch::dump_to_dir;
use ast_dump_tool::infrastructure::concurrency::build_thread_pool;
use ast_dump_tool::infrastructure::expander::expand_crate;
use ast_dump_tool::infrastructure::{
    dump_unit, make_sink, DumpConfig, OutputFormat, ProjectLoader, SourceUnit,
};

/// Exit status when at least one unit produced no dump.
const EXIT_UNIT_FAILED: i32 = 1;
/// Exit status for configuration errors, nothing was dumped.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(true)
        .args(["files", "workspace", "expand"])
))]
struct Cli {
    /// Source files, each dumped as its own translation unit
    files: Vec<PathBuf>,

    /// Workspace Cargo.toml: dump every source file of every member
    #[arg(long, value_name = "CARGO_TOML")]
    workspace: Option<PathBuf>,

    /// Crate Cargo.toml: dump the `cargo expand` output as one unit
    #[arg(long, value_name = "CARGO_TOML")]
    expand: Option<PathBuf>,

    /// Write `<dir>/<unit>.ast` files instead of printing to stdout
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Crate name prefixed to identifiers of loose files
    #[arg(long)]
    crate_name: Option<String>,

    /// Leave out declaration records
    #[arg(long)]
    no_declarations: bool,

    /// Leave out statement records
    #[arg(long)]
    no_statements: bool,

    /// Leave out synthesized declarations
    #[arg(long)]
    no_implicit: bool,

    /// Worker threads for --output-dir (default: half the cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Config file (default: ./ast-dump.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// File values first, then flags on top.
    fn merge(&self, mut config: DumpConfig) -> DumpConfig {
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.crate_name.is_some() {
            config.crate_name = self.crate_name.clone();
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.no_declarations {
            config.filter.declarations = false;
        }
        if self.no_statements {
            config.filter.statements = false;
        }
        if self.no_implicit {
            config.filter.implicit = false;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

/// Returns the exit status; `Err` only for failures that stop everything.
fn run(cli: &Cli) -> Result<i32> {
    let config = cli.merge(DumpConfig::discover(cli.config.as_deref())?);
    let mut failures = 0usize;

    let mut units = Vec::new();
    for path in &cli.files {
        match SourceUnit::read(path) {
            Ok(unit) => match &config.crate_name {
                Some(name) => units.push(unit.with_crate(name.clone())),
                None => units.push(unit),
            },
            Err(e) => {
                tracing::warn!("{:#}", e);
                failures += 1;
            }
        }
    }
    if let Some(manifest) = &cli.workspace {
        units.extend(ProjectLoader::load_workspace(manifest)?);
    }
    if let Some(manifest) = &cli.expand {
        units.push(expand_crate(manifest)?);
    }
    tracing::info!("{} translation unit(s) to dump", units.len());

    match &cli.output_dir {
        Some(dir) => {
            let pool = build_thread_pool(config.jobs)?;
            let report = dump_to_dir(&units, dir, config.format, config.filter, &pool)?;
            if !report.is_success() {
                failures += report.failed.len();
            }
        }
        None => failures += dump_to_stdout(&units, &config)?,
    }

    if failures > 0 {
        tracing::warn!("{} unit(s) could not be dumped", failures);
        return Ok(EXIT_UNIT_FAILED);
    }
    Ok(0)
}

/// Streams every unit to stdout in order; returns how many units failed to parse.
fn dump_to_stdout(units: &[SourceUnit], config: &DumpConfig) -> Result<usize> {
    let stdout = io::stdout();
    let mut sink = make_sink(config.format, config.filter, BufWriter::new(stdout.lock()));
    let mut failures = 0;

    for unit in units {
        match dump_unit(unit, &mut *sink) {
            Ok(_) => {}
            Err(e) if e.is_broken_pipe() => {
                tracing::debug!("stdout closed, stopping");
                return Ok(failures);
            }
            Err(e @ DumpError::Parse { .. }) => {
                tracing::error!("{}", e);
                failures += 1;
            }
            Err(e) => return Err(e).context("Cannot write dump to stdout"),
        }
    }
    Ok(failures)
}
