//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use filesystem_feed::core::config::{
    OneOrMany, RawConfig, RawOptions, ScanConfig, ScanOptions, parse_recursion,
    parse_retrieve_list,
};
use filesystem_feed::core::errors::FeedError;
use filesystem_feed::logger::{JsonlConfig, JsonlWriter, TracingSink};
use filesystem_feed::scanner::entry::{Entry, EntryKind};
use filesystem_feed::scanner::walker::TreeScanner;

/// Filesystem feed: list files, directories, and symlinks as feed entries.
#[derive(Debug, Parser)]
#[command(
    name = "fsfeed",
    author,
    version,
    about = "Filesystem feed - turn directory trees into feed entries",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (TOML, or JSON when the extension is .json).
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
    /// Also append scan events to this JSONL file.
    #[arg(long, global = true, value_name = "PATH")]
    log_jsonl: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan directory trees and print one entry per match.
    Scan(ScanArgs),
    /// Inspect the effective scan configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    /// Roots to scan (replace the paths from the config file).
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Shell-style mask matched against the full path, e.g. `*.mkv`.
    #[arg(long, value_name = "MASK")]
    mask: Option<String>,
    /// Regular expression matched from the start of the full path.
    #[arg(long, value_name = "REGEX", conflicts_with = "mask")]
    regexp: Option<String>,
    /// `true` (unbounded), `false` (children only), or a depth.
    #[arg(long, value_name = "true|false|N")]
    recursion: Option<String>,
    /// Comma-separated object types: files, dirs, symlinks.
    #[arg(long, value_name = "TYPES")]
    retrieve: Option<String>,
    /// Also report every produced entry on the diagnostics channel.
    #[arg(long)]
    test: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the normalized scan configuration.
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
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Some roots could not be scanned.
    #[error("{0}")]
    Partial(String),
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
            Self::Partial(_) => 4,
        }
    }
}

impl From<FeedError> for CliError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Serialization { .. } => Self::Internal(err.to_string()),
            FeedError::Io { .. } => Self::Runtime(err.to_string()),
            _ => Self::User(err.to_string()),
        }
    }
}

/// Install the stderr `tracing` subscriber.
///
/// `-v`/`-q` win over `FSFEED_LOG`, which wins over the `info` default.
pub fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env("FSFEED_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(!cli.no_color && io::stderr().is_terminal()),
        )
        .try_init();
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Config file, then `FSFEED_*` environment overrides.
fn load_raw_options(cli: &Cli) -> Result<RawOptions, CliError> {
    let mut options = match &cli.config {
        Some(path) => RawOptions::from(RawConfig::load(path)?),
        None => RawOptions::default(),
    };
    options.apply_env_overrides()?;
    Ok(options)
}

/// Command-line flags override both the config file and the environment.
fn apply_scan_args(options: &mut RawOptions, args: &ScanArgs) -> Result<(), CliError> {
    if !args.paths.is_empty() {
        options.path = Some(OneOrMany::Many(args.paths.clone()));
    }
    if let Some(mask) = &args.mask {
        options.mask = Some(mask.clone());
    }
    if let Some(regexp) = &args.regexp {
        // A configured mask would otherwise shadow the explicit regexp.
        options.mask = None;
        options.regexp = Some(regexp.clone());
    }
    if let Some(raw) = &args.recursion {
        options.recursion = Some(parse_recursion("--recursion", raw)?);
    }
    if let Some(raw) = &args.retrieve {
        options.retrieve = Some(OneOrMany::Many(parse_retrieve_list("--retrieve", raw)?));
    }
    Ok(())
}

fn diagnostics_sink(cli: &Cli) -> (TracingSink, Option<JsonlWriter>) {
    let jsonl = cli
        .log_jsonl
        .as_ref()
        .map(|path| JsonlWriter::open(JsonlConfig::new(path.clone())));
    (TracingSink, jsonl)
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let mut raw = load_raw_options(cli)?;
    apply_scan_args(&mut raw, args)?;
    let config = ScanConfig::from_raw(raw)?;
    let options = ScanOptions {
        test_mode: args.test,
    };
    let start = std::time::Instant::now();
    let mode = output_mode(cli);

    let mut scanner = TreeScanner::with_sink(config, options, diagnostics_sink(cli));

    match mode {
        OutputMode::Human => {
            println!(
                "  {:<7}  {:<32}  {:<20}  {}",
                "Kind".bold(),
                "Title".bold(),
                "Modified".bold(),
                "Location".bold()
            );
            println!("  {}", "-".repeat(90));
            for entry in scanner.by_ref() {
                print_entry_row(&entry);
            }
        }
        OutputMode::Json => {
            for entry in scanner.by_ref() {
                write_json_line(&entry.to_json()?)?;
            }
        }
    }

    let stats = scanner.stats();
    let elapsed = start.elapsed();

    match mode {
        OutputMode::Human => {
            println!();
            println!(
                "  {} entries from {} objects in {:.2}s",
                stats.emitted,
                stats.visited,
                elapsed.as_secs_f64()
            );
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "scan",
                "summary": {
                    "roots": stats.roots,
                    "failed_roots": stats.failed_roots,
                    "visited": stats.visited,
                    "emitted": stats.emitted,
                    "elapsed_ms": u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                },
            }))?;
        }
    }

    if stats.failed_roots > 0 {
        return Err(CliError::Partial(format!(
            "{} of {} roots could not be scanned",
            stats.failed_roots, stats.roots
        )));
    }
    Ok(())
}

fn print_entry_row(entry: &Entry) {
    let kind = match entry.kind {
        EntryKind::File => entry.kind.as_str().normal(),
        EntryKind::Directory => entry.kind.as_str().blue(),
        EntryKind::Symlink => entry.kind.as_str().cyan(),
    };
    let modified = entry.timestamp.map_or_else(
        || "-".dimmed().to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    println!(
        "  {:<7}  {:<32}  {:<20}  {}",
        kind,
        truncate(&entry.title, 32),
        modified,
        entry.location.display()
    );
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let command = args.command.unwrap_or(ConfigCommand::Show);
    let normalized = load_raw_options(cli).and_then(|raw| Ok(ScanConfig::from_raw(raw)?));

    match command {
        ConfigCommand::Show => {
            let config = normalized?;
            match output_mode(cli) {
                OutputMode::Human => print_config(&config),
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        ConfigCommand::Validate => match normalized {
            Ok(_) => {
                match output_mode(cli) {
                    OutputMode::Human => println!("Configuration is valid."),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": true,
                    }))?,
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => eprintln!("Configuration is INVALID: {e}"),
                    OutputMode::Json => write_json_line(&json!({
                        "command": "config validate",
                        "valid": false,
                        "error": e.to_string(),
                    }))?,
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

fn print_config(config: &ScanConfig) {
    let roots: Vec<String> = config
        .roots
        .iter()
        .map(|root| root.display().to_string())
        .collect();
    let matcher = match config.matcher.source() {
        Some(source) => format!("{source} ({})", config.matcher.as_str()),
        None => "any path".to_string(),
    };
    let retrieve = config.retrieve;
    let kinds: Vec<&str> = [
        ("files", retrieve.files),
        ("dirs", retrieve.dirs),
        ("symlinks", retrieve.symlinks),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();

    println!("{:<10} {}", "roots:".bold(), roots.join(", "));
    println!("{:<10} {matcher}", "matcher:".bold());
    println!("{:<10} {}", "recursion:".bold(), config.recursion);
    println!("{:<10} {}", "retrieve:".bold(), kinds.join(", "));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FSFEED_OUTPUT_FORMAT").ok();
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

#[cfg(test)]
mod tests {
    use super::*;
    use filesystem_feed::core::config::{RawRecursion, RetrievalOption};

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        match cli.command {
            Command::Scan(args) => args,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn parses_global_flags_before_and_after_subcommand() {
        let before = Cli::try_parse_from([
            "fsfeed",
            "--config",
            "/tmp/fsfeed.toml",
            "--json",
            "--no-color",
            "-v",
            "scan",
            "/data",
        ]);
        assert!(before.is_ok());

        let after = Cli::try_parse_from(["fsfeed", "scan", "/data", "--json", "--no-color", "-q"]);
        assert!(after.is_ok());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["fsfeed", "-v", "-q", "scan"]).is_err());
    }

    #[test]
    fn mask_and_regexp_conflict() {
        let parsed = Cli::try_parse_from(["fsfeed", "scan", "--mask", "*.avi", "--regexp", "x"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cases = [
            vec!["fsfeed", "scan", "/a", "/b", "--recursion", "2", "--test"],
            vec!["fsfeed", "scan", "--retrieve", "files,dirs"],
            vec!["fsfeed", "config"],
            vec!["fsfeed", "config", "show"],
            vec!["fsfeed", "config", "validate"],
            vec!["fsfeed", "--log-jsonl", "/tmp/scan.jsonl", "scan", "/a"],
        ];
        for case in cases {
            let parsed = Cli::try_parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse case: {case:?}");
        }
    }

    #[test]
    fn completions_support_bash_zsh_and_fish() {
        for shell in ["bash", "zsh", "fish"] {
            let parsed = Cli::try_parse_from(["fsfeed", "completions", shell]);
            assert!(parsed.is_ok(), "failed shell parse for {shell}");
        }
    }

    #[test]
    fn scan_flags_override_config_values() {
        let mut options = RawOptions {
            path: Some(OneOrMany::One(PathBuf::from("/from/config"))),
            mask: Some("*.avi".to_string()),
            ..RawOptions::default()
        };
        let args = scan_args(&[
            "fsfeed",
            "scan",
            "/from/cli",
            "--regexp",
            "/from/cli/.*",
            "--recursion",
            "true",
            "--retrieve",
            "files",
        ]);
        apply_scan_args(&mut options, &args).unwrap();

        assert_eq!(
            options.path,
            Some(OneOrMany::Many(vec![PathBuf::from("/from/cli")]))
        );
        assert!(options.mask.is_none());
        assert_eq!(options.regexp.as_deref(), Some("/from/cli/.*"));
        assert_eq!(options.recursion, Some(RawRecursion::Enabled(true)));
        assert_eq!(
            options.retrieve,
            Some(OneOrMany::Many(vec![RetrievalOption::Files]))
        );
    }

    #[test]
    fn bad_recursion_flag_is_a_user_error() {
        let mut options = RawOptions::default();
        let args = scan_args(&["fsfeed", "scan", "--recursion", "deep"]);
        let err = apply_scan_args(&mut options, &args).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn feed_errors_map_to_exit_codes() {
        let config: CliError = FeedError::InvalidConfig {
            details: "path is required".to_string(),
        }
        .into();
        assert_eq!(config.exit_code(), 1);

        let io: CliError = FeedError::io("/x", io::Error::other("boom")).into();
        assert_eq!(io.exit_code(), 2);

        let serialization: CliError = FeedError::Serialization {
            context: "entry",
            details: "key must be a string".to_string(),
        }
        .into();
        assert_eq!(serialization.exit_code(), 3);
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(
            resolve_output_mode(false, Some("auto"), true),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
    }

    #[test]
    fn truncate_keeps_short_titles() {
        assert_eq!(truncate("movie", 32), "movie");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }
}
