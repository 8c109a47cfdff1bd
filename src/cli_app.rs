//! Top-level CLI definition and dispatch.

use std::collections::BTreeSet;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use android_plugin_fixer::core::config::Config;
use android_plugin_fixer::core::errors::ApfError;
use android_plugin_fixer::core::paths::display_path;
use android_plugin_fixer::manifest::sdk::{ApplyReport, ManifestSurvey, WriteOutcome};
use android_plugin_fixer::project::session::{ProjectScan, Session};
use android_plugin_fixer::scanner::classifier::{ConflictReport, parse_file_name};
use android_plugin_fixer::scanner::patterns::ArtifactKind;
use android_plugin_fixer::scanner::walker::ArtifactFile;

/// Android Plugin Fixer: finds clashing Android plugin artifacts and aligns
/// minSdkVersion across manifests.
#[derive(Debug, Parser)]
#[command(
    name = "apf",
    author,
    version,
    about = "Android Plugin Fixer - plugin conflict and minSdkVersion checks",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List archives, libraries and manifests under a project root.
    Scan(ScanArgs),
    /// Report misplaced and duplicate archives or libraries.
    CheckConflicts(CheckConflictsArgs),
    /// Rewrite every manifest's minSdkVersion to one value.
    NormalizeSdk(NormalizeSdkArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Project root to scan.
    #[arg(value_name = "ROOT")]
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConflictKind {
    Archives,
    Libraries,
}

impl From<ConflictKind> for ArtifactKind {
    fn from(kind: ConflictKind) -> Self {
        match kind {
            ConflictKind::Archives => Self::Archive,
            ConflictKind::Libraries => Self::Library,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CheckConflictsArgs {
    /// Artifact family to check.
    #[arg(value_enum)]
    kind: ConflictKind,
    /// Project root to scan.
    #[arg(long, default_value = ".", value_name = "ROOT")]
    root: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct NormalizeSdkArgs {
    /// Project root to scan.
    #[arg(value_name = "ROOT")]
    root: PathBuf,
    /// Value to write instead of the highest one found.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    target: Option<u32>,
    /// Report what would change without writing.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Filesystem or manifest failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<ApfError> for CliError {
    fn from(err: ApfError) -> Self {
        match err {
            ApfError::InvalidConfig { .. }
            | ApfError::MissingConfig { .. }
            | ApfError::ConfigParse { .. }
            | ApfError::InvalidPattern { .. } => Self::User(err.to_string()),
            ApfError::Serialization { .. } | ApfError::NoScan => Self::Internal(err.to_string()),
            ApfError::MalformedManifest { .. }
            | ApfError::Parse { .. }
            | ApfError::NotADirectory { .. }
            | ApfError::Io { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::CheckConflicts(args) => run_check_conflicts(cli, args),
        Command::NormalizeSdk(args) => run_normalize_sdk(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn open_session(cli: &Cli) -> Result<Session, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    note(cli, &format!("config: {}", config.paths.config_file.display()));
    Ok(Session::new(config))
}

fn scan_with_notes<'s>(
    cli: &Cli,
    session: &'s mut Session,
    root: &Path,
) -> Result<&'s ProjectScan, CliError> {
    note(cli, &format!("scanning {}", root.display()));
    let scan = session.scan_project(root)?;
    if scan.is_empty() {
        warn(
            cli,
            &format!("no Android plugin files found under {}", root.display()),
        );
    } else {
        note(
            cli,
            &format!(
                "found {} files: {} archives, {} libraries, {} manifests",
                scan.len(),
                scan.archives.len(),
                scan.libraries.len(),
                scan.manifests.len()
            ),
        );
    }
    Ok(scan)
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let mut session = open_session(cli)?;
    let scan = scan_with_notes(cli, &mut session, &args.root)?.clone();
    let survey = session.read_manifests()?;

    match output_mode(cli) {
        OutputMode::Human => {
            print_file_list("Archives", &scan.archives);
            print_file_list("Libraries", &scan.libraries);

            println!("Manifests ({})", scan.manifests.len());
            for reading in &survey.readings {
                let value = match &reading.result {
                    Ok(Some(min_sdk)) => min_sdk.to_string(),
                    Ok(None) => "-".to_string(),
                    Err(_) => "?".to_string(),
                };
                println!(
                    "  {}  minSdkVersion {value}",
                    display_path(&reading.path).display()
                );
            }
            println!();
            println!("Highest minSdkVersion: {}", survey.highest);
            report_survey_failures(cli, &survey);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "scan",
                "root": scan.root.to_string_lossy(),
                "archives": files_json(&scan.archives),
                "libraries": files_json(&scan.libraries),
                "manifests": manifests_json(&scan.manifests, &survey),
                "highest_min_sdk": survey.highest,
            });
            write_json_line(&payload)?;
        }
    }

    fail_on_fatal(survey.failures())
}

fn print_file_list(title: &str, files: &[ArtifactFile]) {
    println!("{title} ({})", files.len());
    for file in files {
        println!(
            "  {}  {}",
            display_path(&file.path).display(),
            format_bytes(file.size_bytes)
        );
    }
    println!();
}

fn files_json(files: &[ArtifactFile]) -> Vec<Value> {
    files
        .iter()
        .map(|file| {
            let parsed = parse_file_name(&file.file_name, &file.extension);
            json!({
                "path": file.path.to_string_lossy(),
                "display_path": display_path(&file.path).to_string_lossy(),
                "size_bytes": file.size_bytes,
                "logical_name": parsed.logical_name,
                "version": parsed.qualifier,
            })
        })
        .collect()
}

fn manifests_json(manifests: &[ArtifactFile], survey: &ManifestSurvey) -> Vec<Value> {
    manifests
        .iter()
        .zip(&survey.readings)
        .map(|(file, reading)| {
            let mut entry = json!({
                "path": file.path.to_string_lossy(),
                "display_path": display_path(&file.path).to_string_lossy(),
                "size_bytes": file.size_bytes,
                "min_sdk": reading.result.as_ref().ok().copied().flatten(),
            });
            if let Err(err) = &reading.result {
                entry["error"] = error_json(err);
            }
            entry
        })
        .collect()
}

// ---------------------------------------------------------------------------
// check-conflicts
// ---------------------------------------------------------------------------

fn run_check_conflicts(cli: &Cli, args: &CheckConflictsArgs) -> Result<(), CliError> {
    let kind = ArtifactKind::from(args.kind);
    let mut session = open_session(cli)?;
    let root = scan_with_notes(cli, &mut session, &args.root)?.root.clone();
    let report = session.check_conflicts(kind)?;

    for warning in &report.warnings {
        warn(cli, &warning.to_string());
    }
    for duplicate in &report.errors {
        error_line(&duplicate.to_string());
    }

    match output_mode(cli) {
        OutputMode::Human => {
            for (logical_name, file) in &report.groups {
                println!("{logical_name}  {}", display_path(&file.path).display());
            }
            note(
                cli,
                &format!(
                    "{} {kind}: {} excluded, {} duplicate",
                    report.groups.len(),
                    report.warnings.len(),
                    report.errors.len()
                ),
            );
        }
        OutputMode::Json => {
            let payload = conflict_report_json(kind, &root, &report);
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn conflict_report_json(kind: ArtifactKind, root: &Path, report: &ConflictReport) -> Value {
    let groups: Vec<Value> = report
        .groups
        .iter()
        .map(|(logical_name, file)| {
            json!({
                "logical_name": logical_name,
                "path": file.path.to_string_lossy(),
                "size_bytes": file.size_bytes,
            })
        })
        .collect();
    json!({
        "command": "check-conflicts",
        "kind": kind.label(),
        "root": root.to_string_lossy(),
        "clean": report.is_clean(),
        "excluded": report.warnings.len(),
        "duplicates": report.errors.len(),
        "groups": groups,
    })
}

// ---------------------------------------------------------------------------
// normalize-sdk
// ---------------------------------------------------------------------------

fn run_normalize_sdk(cli: &Cli, args: &NormalizeSdkArgs) -> Result<(), CliError> {
    let mut session = open_session(cli)?;
    let root = scan_with_notes(cli, &mut session, &args.root)?.root.clone();
    let survey = session.read_manifests()?;
    note(cli, &format!("highest minSdkVersion found: {}", survey.highest));

    if let Some(target) = args.target {
        session.set_target_sdk_version(target);
    }
    let report = session.apply_target_sdk_version(args.dry_run)?;

    match output_mode(cli) {
        OutputMode::Human => {
            report_survey_failures(cli, &survey);
            print_apply_report(cli, &report);
        }
        OutputMode::Json => {
            let payload = apply_report_json(&root, &survey, &report);
            write_json_line(&payload)?;
        }
    }

    fail_on_fatal(survey.failures().chain(report.failures()))
}

fn print_apply_report(cli: &Cli, report: &ApplyReport) {
    let verb = if report.dry_run { "would rewrite" } else { "rewrote" };
    for write in &report.writes {
        let shown = display_path(&write.path);
        match &write.result {
            Ok(WriteOutcome::Rewritten { previous }) => {
                println!("{}  {previous} -> {}", shown.display(), report.target);
            }
            Ok(WriteOutcome::Unchanged) => {
                note(cli, &format!("{} already at {}", shown.display(), report.target));
            }
            Ok(WriteOutcome::Absent) => {
                note(cli, &format!("{} declares no minSdkVersion", shown.display()));
            }
            Err(err) if err.is_fatal() => error_line(&err.to_string()),
            Err(err) => warn(cli, &err.to_string()),
        }
    }
    println!(
        "minSdkVersion {}: {verb} {} of {} manifests",
        report.target,
        report.rewritten(),
        report.writes.len()
    );
}

fn apply_report_json(root: &Path, survey: &ManifestSurvey, report: &ApplyReport) -> Value {
    let manifests: Vec<Value> = report
        .writes
        .iter()
        .zip(&survey.readings)
        .map(|(write, reading)| {
            let mut entry = json!({
                "path": write.path.to_string_lossy(),
                "min_sdk": reading.result.as_ref().ok().copied().flatten(),
            });
            match &write.result {
                Ok(outcome) => entry["write"] = serde_json::to_value(outcome).unwrap_or(Value::Null),
                Err(err) => entry["error"] = error_json(err),
            }
            if let Err(err) = &reading.result {
                entry["read_error"] = error_json(err);
            }
            entry
        })
        .collect();

    json!({
        "command": "normalize-sdk",
        "root": root.to_string_lossy(),
        "highest_min_sdk": survey.highest,
        "target": report.target,
        "dry_run": report.dry_run,
        "rewritten": report.rewritten(),
        "manifests": manifests,
    })
}

fn report_survey_failures(cli: &Cli, survey: &ManifestSurvey) {
    for (_, err) in survey.failures() {
        if err.is_fatal() {
            error_line(&err.to_string());
        } else {
            warn(cli, &err.to_string());
        }
    }
}

/// Turn per-manifest filesystem or malformed-XML failures into a non-zero
/// exit. `Parse` failures stay advisory.
fn fail_on_fatal<'a>(
    failures: impl Iterator<Item = (&'a Path, &'a ApfError)>,
) -> Result<(), CliError> {
    let fatal: BTreeSet<&Path> = failures
        .filter(|(_, err)| err.is_fatal())
        .map(|(path, _)| path)
        .collect();
    if fatal.is_empty() {
        Ok(())
    } else {
        Err(CliError::Runtime(format!(
            "{} manifest(s) could not be processed",
            fatal.len()
        )))
    }
}

fn error_json(err: &ApfError) -> Value {
    json!({
        "code": err.code(),
        "message": err.to_string(),
    })
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        error_line(&format!("configuration is invalid: {e}"));
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": error_json(&e),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::from(e))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn warn(cli: &Cli, message: &str) {
    if !cli.quiet {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }
}

fn error_line(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}

fn note(cli: &Cli, message: &str) {
    if cli.verbose {
        eprintln!("{} {message}", "note:".cyan());
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    if bytes >= GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("APF_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
