//! cppscan - Extract requirement traceability from C++ test sources
//!
//! Scans C++ files and directories for GoogleTest-style test declarations,
//! their `@requirement`-style annotation tags and inline `lobster-trace:`
//! markers, and reports them as text or JSON.

pub mod config;
pub mod output;

use clap::Parser;
use config::{Config, DEFAULT_CONFIG_PATH};
use cppscan_core::{Extraction, PathSources, Sources, Vocabulary, WalkSources};
use eyre::{Result, WrapErr};
use output::{OutputFormat, Theme, render, render_diagnostics};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::PathBuf;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "cppscan", version, about)]
pub struct Args {
    /// Files or directories to scan
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to config file (default: .config/cppscan/config.styx)
    #[arg(short, long, env = "CPPSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fail (exit 1) when any diagnostic is reported
    #[arg(long)]
    pub strict: bool,

    /// Additional include glob (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Additional exclude glob (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,
}

/// Scan every path: directories are walked, anything else is read as a file
pub fn extract(args: &Args, config: &Config, vocab: &Vocabulary) -> Result<Extraction> {
    let include: Vec<String> = config.include.iter().chain(&args.include).cloned().collect();
    let exclude: Vec<String> = config.exclude.iter().chain(&args.exclude).cloned().collect();

    let (dirs, files): (Vec<&PathBuf>, Vec<&PathBuf>) =
        args.paths.iter().partition(|p| p.is_dir());

    let mut extraction = PathSources::new(files.into_iter().cloned()).extract(vocab)?;
    for dir in dirs {
        let walked = WalkSources::new(dir)
            .include(include.iter().cloned())
            .exclude(exclude.iter().cloned())
            .extract(vocab)
            .wrap_err_with(|| format!("Failed to scan {}", dir.display()))?;
        extraction = extraction.merge(walked);
    }
    Ok(extraction)
}

/// Run the CLI; returns whether the run passed the diagnostics policy
pub fn run(args: Args) -> Result<bool> {
    let (config_path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let config = Config::load(&config_path, required)?;
    let vocab = config.vocabulary()?;

    if Vocabulary::install(vocab).is_err() {
        tracing::debug!("vocabulary already installed, keeping the existing one");
    }
    let vocab = Vocabulary::global();

    let extraction = extract(&args, &config, vocab)?;
    tracing::info!(
        files = extraction.files.len(),
        declarations = extraction.declaration_count(),
        markers = extraction.marker_count(),
        diagnostics = extraction.diagnostic_count(),
        "extraction finished"
    );

    let stderr_theme = Theme::new(std::io::stderr().is_terminal());
    eprint!("{}", render_diagnostics(&extraction, stderr_theme));

    match &args.output {
        Some(path) => {
            let report = render(&extraction, args.format, Theme::plain())?;
            std::fs::write(path, &report)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote report to {}",
                "OK".green().bold(),
                path.display()
            );
        }
        None => {
            let theme = Theme::new(std::io::stdout().is_terminal());
            print!("{}", render(&extraction, args.format, theme)?);
        }
    }

    let failed = args.strict && extraction.has_diagnostics();
    if failed {
        eprintln!(
            "{} {} diagnostics reported (--strict)",
            "!".red().bold(),
            extraction.diagnostic_count()
        );
    }
    Ok(!failed)
}
