mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use pomfold_core::FsProjectSource;
use pomfold_core::adapters::FsWritePort;
use pomfold_core::pipeline::{
    ToolError, run_all, run_inject, run_patch, run_restore, run_sync, write_report,
};
use pomfold_types::outcome::{InjectionStatus, RuleStatus};
use pomfold_types::report::{RunReport, ToolInfo};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pomfold",
    version,
    about = "Fold downloaded Maven projects into one multi-module build."
)]
struct Cli {
    /// Config file (default: ./pomfold.toml when present).
    #[arg(long, global = true, env = "POMFOLD_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Raise log verbosity to debug.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the workspace and module list from the source directory.
    Sync(SyncArgs),
    /// Apply the configured patch rules to the aggregator's module list.
    Patch(PatchArgs),
    /// Add the build plugin to the given descriptors.
    Inject(InjectArgs),
    /// Sync, then patch.
    Run(SyncArgs),
    /// Copy the aggregator backup back over the aggregator.
    Restore(RestoreArgs),
    /// List the configured patch rules.
    Rules(RulesArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Aggregator POM (default: from config, else multi-module-project/pom.xml).
    #[arg(long)]
    aggregator: Option<Utf8PathBuf>,

    /// Do not write `.bak` backups.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct SyncArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory of project trees (default: from config, else downloaded_sources).
    #[arg(long)]
    source_dir: Option<Utf8PathBuf>,

    /// Workspace subdirectory to keep across the rebuild (repeatable).
    #[arg(long = "keep-dir")]
    keep_dirs: Vec<String>,
}

#[derive(Debug, Args)]
struct PatchArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Print the resulting diff instead of writing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct InjectArgs {
    /// Descriptors to instrument.
    #[arg(required = true, num_args = 1..)]
    descriptors: Vec<Utf8PathBuf>,

    /// Do not write `.bak` backups.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Print the resulting diffs instead of writing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct RestoreArgs {
    /// Aggregator POM (default: from config, else multi-module-project/pom.xml).
    #[arg(long)]
    aggregator: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct RulesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_of(&e))
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_of(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ToolError>()
        .map(ToolError::exit_code)
        .unwrap_or(1)
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    let file_config = config::load_or_default(cli.config.as_deref(), Utf8Path::new("."))
        .context("load pomfold.toml config")?;
    let merger = ConfigMerger::new(file_config);

    match cli.cmd {
        Command::Sync(args) => cmd_sync(&merger, args),
        Command::Patch(args) => cmd_patch(&merger, args),
        Command::Inject(args) => cmd_inject(&merger, args),
        Command::Run(args) => cmd_run(&merger, args),
        Command::Restore(args) => cmd_restore(&merger, args),
        Command::Rules(args) => cmd_rules(&merger, args),
    }
}

fn sync_overrides(args: &SyncArgs) -> CliOverrides {
    CliOverrides {
        aggregator: args.common.aggregator.clone(),
        source_dir: args.source_dir.clone(),
        keep_dirs: args.keep_dirs.clone(),
        no_backup: args.common.no_backup,
        dry_run: false,
    }
}

fn cmd_sync(merger: &ConfigMerger, args: SyncArgs) -> anyhow::Result<u8> {
    let settings = merger.sync_settings(&sync_overrides(&args));
    let source = FsProjectSource::new(settings.source_dir.clone());

    let report = run_sync(&settings, &source, tool_info())?;
    print_sync(&report);
    finish(&report, args.common.report.as_deref())?;
    Ok(0)
}

fn cmd_patch(merger: &ConfigMerger, args: PatchArgs) -> anyhow::Result<u8> {
    let overrides = CliOverrides {
        aggregator: args.common.aggregator.clone(),
        no_backup: args.common.no_backup,
        dry_run: args.dry_run,
        ..CliOverrides::default()
    };
    let settings = merger.patch_settings(&overrides);

    let report = run_patch(&settings, tool_info())?;
    print_patch(&report);
    finish(&report, args.common.report.as_deref())?;
    Ok(0)
}

fn cmd_run(merger: &ConfigMerger, args: SyncArgs) -> anyhow::Result<u8> {
    let overrides = sync_overrides(&args);
    let sync = merger.sync_settings(&overrides);
    let patch = merger.patch_settings(&overrides);
    let source = FsProjectSource::new(sync.source_dir.clone());

    let report = run_all(&sync, &patch, &source, tool_info())?;
    print_sync(&report);
    print_patch(&report);
    finish(&report, args.common.report.as_deref())?;
    Ok(0)
}

fn cmd_inject(merger: &ConfigMerger, args: InjectArgs) -> anyhow::Result<u8> {
    let overrides = CliOverrides {
        no_backup: args.no_backup,
        dry_run: args.dry_run,
        ..CliOverrides::default()
    };
    let settings = merger.inject_settings(&overrides, args.descriptors);

    let report = run_inject(&settings, tool_info())?;
    for outcome in &report.inject {
        println!("{:<16} {}", status_label(&outcome.status), outcome.path);
        if let Some(diff) = &outcome.diff {
            print!("{diff}");
        }
    }
    finish(&report, args.report.as_deref())?;

    // Explicitly named descriptors that could not be instrumented fail the command.
    Ok(if report.summary.injection_failures > 0 { 2 } else { 0 })
}

fn cmd_restore(merger: &ConfigMerger, args: RestoreArgs) -> anyhow::Result<u8> {
    let overrides = CliOverrides {
        aggregator: args.aggregator,
        ..CliOverrides::default()
    };
    let settings = merger.patch_settings(&overrides);
    let backup = run_restore(&settings.aggregator, &settings.backup_suffix)?;
    println!("restored {} from {}", settings.aggregator, backup);
    Ok(0)
}

fn cmd_rules(merger: &ConfigMerger, args: RulesArgs) -> anyhow::Result<u8> {
    let rules = &merger.config().patch;
    match args.format {
        OutputFormat::Text => {
            if rules.is_empty() {
                println!("No patch rules configured.");
                return Ok(0);
            }
            println!("Patch rules (applied in order):\n");
            println!("  {:<4} {:<10} {:<24} RESULT", "#", "ACTION", "MATCH");
            for (i, rule) in rules.iter().enumerate() {
                println!(
                    "  {:<4} {:<10} {:<24} {}",
                    i + 1,
                    rule.action.label(),
                    rule.target,
                    rule.rewritten()
                        .unwrap_or_else(|| "(commented out)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rules)?);
        }
    }
    Ok(0)
}

fn print_sync(report: &RunReport) {
    let Some(sync) = &report.sync else {
        return;
    };
    for module in &sync.modules {
        println!("{:<16} {}", status_label(&module.injection), module.name);
    }
    println!(
        "synced {} module(s) into {} ({} injected, {} already present, {} without descriptor, {} failed)",
        report.summary.modules,
        sync.descriptor,
        report.summary.injected,
        report.summary.already_present,
        report.summary.no_descriptor,
        report.summary.injection_failures
    );
}

fn print_patch(report: &RunReport) {
    let Some(patch) = &report.patch else {
        return;
    };
    for outcome in &patch.rules {
        let status = match &outcome.status {
            RuleStatus::Rewritten { to, .. } => format!("-> {to}"),
            RuleStatus::Disabled { .. } => "disabled".to_string(),
            RuleStatus::Unmatched => "unmatched".to_string(),
        };
        println!("{:<32} {}", outcome.rule.to_string(), status);
    }
    if let Some(diff) = &patch.diff {
        println!("dry-run: no changes written");
        print!("{diff}");
    } else {
        println!(
            "patched {} ({} applied, {} unmatched)",
            patch.descriptor,
            patch.applied(),
            patch.unmatched()
        );
    }
}

fn status_label(status: &InjectionStatus) -> &'static str {
    match status {
        InjectionStatus::Injected => "injected",
        InjectionStatus::AlreadyPresent => "already-present",
        InjectionStatus::NoDescriptor => "no-descriptor",
        InjectionStatus::Failed { .. } => "failed",
    }
}

fn finish(report: &RunReport, path: Option<&Utf8Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        write_report(report, path, &FsWritePort)
            .with_context(|| format!("write report {}", path))?;
    }
    info!(run_id = %report.run.run_id, command = %report.command, "done");
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "pomfold".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
