//! pcd - maintenance CLI for Profilarr custom format databases
//!
//! Main entry point. Running `pcd` without a subcommand validates the
//! repository in the current directory.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Load `.pcd-tools.yaml` and `PCD_*` overrides ([`ConfigManager`])
//! 3. Initialize logging (stderr, optional rotating file)
//! 4. Run the subcommand against the resolved [`RepoLayout`]
//! 5. Log run metrics and map the outcome to an exit code
//!
//! # Exit Codes
//!
//! - `0`: success, no problems found
//! - `1`: problems were found (diagnostics, uncovered patterns)
//! - `2`: fatal error (unreadable data directory, invalid settings)

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use pcd_tools::services::{PatternMaintainer, Validator, convert_directory, import_json};
use pcd_tools::{APP_NAME, ConfigManager, RepoLayout, RunMetrics, VERSION, ValidationReport};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pcd", version, about = "Validate and convert Profilarr custom format databases")]
struct Cli {
    /// Repository root containing custom_formats/ and profiles/
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate custom formats, profiles and the manifest (default)
    Validate {
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },
    /// Only check that every document parses
    Syntax {
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },
    /// Convert TRaSH custom formats to the Dictionarry layout
    Convert {
        /// Defaults to the custom formats directory
        #[arg(long)]
        source: Option<Utf8PathBuf>,
        /// Defaults to the custom formats directory
        #[arg(long)]
        target: Option<Utf8PathBuf>,
    },
    /// Copy TRaSH JSON exports to YAML unchanged
    Import {
        /// Defaults to ops/custom_formats
        #[arg(long)]
        source: Option<Utf8PathBuf>,
        /// Defaults to the custom formats directory
        #[arg(long)]
        target: Option<Utf8PathBuf>,
    },
    /// Write regex pattern records for patterns used by custom formats
    GeneratePatterns,
    /// Rename numbered or '#'-prefixed regex pattern files
    NormalizePatterns,
    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Validate { .. } => "validate",
            Command::Syntax { .. } => "syntax",
            Command::Convert { .. } => "convert",
            Command::Import { .. } => "import",
            Command::GeneratePatterns => "generate-patterns",
            Command::NormalizePatterns => "normalize-patterns",
            Command::Config => "config",
        }
    }
}

/// Validation is the default when no subcommand is given.
fn command_or_default(command: Option<Command>) -> Command {
    command.unwrap_or(Command::Validate {
        format: ReportFormat::Text,
    })
}

/// `0` when clean, `1` when problems were reported, `2` on a fatal error.
fn exit_status(outcome: &Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = run(cli);
    if let Err(e) = &outcome {
        tracing::error!("{:#}", e);
        eprintln!("error: {:#}", e);
    }
    ExitCode::from(exit_status(&outcome))
}

/// Run the selected command. `Ok(false)` means problems were reported.
fn run(cli: Cli) -> Result<bool> {
    let manager = ConfigManager::new(&cli.root);
    let (config, layout) = manager.layout()?;
    let _guard = pcd_tools::logging::init_logging(&config.logging, cli.verbose)?;

    let command = command_or_default(cli.command);
    tracing::info!("Starting {} v{} {} in {}", APP_NAME, VERSION, command.name(), layout.root);

    let metrics = RunMetrics::new();
    let name = command.name();
    let clean = match command {
        Command::Validate { format } => {
            let report = Validator::new(layout).validate(&metrics)?;
            print_report(&report, format)?
        }
        Command::Syntax { format } => {
            let report = Validator::new(layout).check_syntax(&metrics)?;
            print_report(&report, format)?
        }
        Command::Convert { source, target } => {
            let source = source.unwrap_or_else(|| layout.custom_formats.clone());
            let target = target.unwrap_or_else(|| layout.custom_formats.clone());
            let summary = convert_directory(&source, &target, &metrics)?;
            for diagnostic in &summary.diagnostics {
                println!("{diagnostic}");
            }
            println!(
                "Converted {} custom format(s) into {} ({} unchanged, {} skipped, {} failed).",
                summary.written.len(),
                target,
                summary.unchanged.len(),
                summary.skipped.len(),
                summary.diagnostics.len()
            );
            summary.diagnostics.is_empty()
        }
        Command::Import { source, target } => {
            let source = source.unwrap_or_else(|| layout.trash_source.clone());
            let target = target.unwrap_or_else(|| layout.custom_formats.clone());
            let summary = import_json(&source, &target, &metrics)?;
            for diagnostic in &summary.diagnostics {
                println!("{diagnostic}");
            }
            println!(
                "Imported {} document(s) into {} ({} failed).",
                summary.written.len(),
                target,
                summary.diagnostics.len()
            );
            summary.diagnostics.is_empty()
        }
        Command::GeneratePatterns => generate_patterns(&layout, &metrics)?,
        Command::NormalizePatterns => {
            let summary =
                PatternMaintainer::new().normalize_pattern_names(&layout.regex_patterns, &metrics)?;
            for diagnostic in &summary.diagnostics {
                println!("{diagnostic}");
            }
            for rename in &summary.renamed {
                println!("Renamed {} -> {}", rename.from, rename.to);
            }
            println!("Renamed {} pattern file(s).", summary.renamed.len());
            summary.diagnostics.is_empty()
        }
        Command::Config => {
            print!("{}", ConfigManager::render(&config)?);
            true
        }
    };

    metrics.log_summary(name);
    Ok(clean)
}

fn generate_patterns(layout: &RepoLayout, metrics: &RunMetrics) -> Result<bool> {
    let summary = PatternMaintainer::new().generate_missing_patterns(
        &layout.custom_formats,
        &layout.regex_patterns,
        metrics,
    )?;
    for diagnostic in &summary.diagnostics {
        println!("{diagnostic}");
    }
    for path in &summary.created {
        println!("Created {path}");
    }
    for pattern in &summary.still_missing {
        println!("Still missing: {pattern}");
    }
    println!(
        "Created {} pattern record(s); {} pattern(s) still missing.",
        summary.created.len(),
        summary.still_missing.len()
    );
    Ok(summary.diagnostics.is_empty() && summary.still_missing.is_empty())
}

fn print_report(report: &ValidationReport, format: ReportFormat) -> Result<bool> {
    match format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(report.is_clean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(true)), 0);
        assert_eq!(exit_status(&Ok(false)), 1);
        assert_eq!(exit_status(&Err(anyhow!("profiles directory missing"))), 2);
    }

    #[test]
    fn test_no_subcommand_validates() {
        let cli = Cli::parse_from(["pcd"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.root, Utf8PathBuf::from("."));
        let command = command_or_default(cli.command);
        assert!(matches!(
            command,
            Command::Validate {
                format: ReportFormat::Text
            }
        ));
    }

    #[test]
    fn test_subcommand_and_global_flags() {
        let cli = Cli::parse_from(["pcd", "convert", "--root", "repo", "-v", "--target", "out"]);
        assert!(cli.verbose);
        assert_eq!(cli.root, Utf8PathBuf::from("repo"));
        let command = command_or_default(cli.command);
        assert_eq!(command.name(), "convert");
        assert!(matches!(
            command,
            Command::Convert { source: None, target: Some(ref t) } if t.as_str() == "out"
        ));
    }
}
