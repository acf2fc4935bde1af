//! autocut - automated edit planning and rendering for AI-generated clips.
//!
//! Command surface:
//! - default: analyze, plan, confirm, render
//! - `--analyze-only`: produce and persist the edit plan without rendering
//! - `--execute`: render from the saved plan without re-analysis

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use autocut_core::config::{
    load_profile, resolve, ConfigManager, StyleConstraints, StyleOverrides,
};
use autocut_core::logging::LogCallback;
use autocut_core::models::EditPlan;
use autocut_core::orchestrator::{ConfirmCallback, RunMode, RunProcessor, RunRequest};
use autocut_core::render::OutputPreset;

#[derive(Parser, Debug)]
#[command(
    name = "autocut",
    version,
    about = "Automated edit planning and rendering for AI-generated clips"
)]
struct Cli {
    /// Directory containing the raw clips.
    clip_dir: PathBuf,

    /// Analyze and persist the edit plan without rendering.
    #[arg(long, conflicts_with = "execute")]
    analyze_only: bool,

    /// Render from the previously saved plan without re-analysis.
    #[arg(long)]
    execute: bool,

    /// Target output duration in seconds.
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Style profile: a name looked up in the style directories, or a YAML
    /// file path.
    #[arg(long)]
    style: Option<String>,

    /// Cap the total output duration, overriding style and defaults.
    #[arg(long, value_name = "SECS")]
    max_duration: Option<f64>,

    /// Disable speed ramps regardless of what the style says.
    #[arg(long)]
    no_speed_ramp: bool,

    /// Output preset.
    #[arg(long, default_value = "douyin")]
    preset: OutputPreset,

    /// Output file name, placed in the clip directory.
    #[arg(short, long, default_value = "output.mp4")]
    output: String,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    yes: bool,

    /// Reduce console output.
    #[arg(short, long)]
    quiet: bool,

    /// Settings file (defaults to <clip_dir>/.autocut/settings.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !cli.clip_dir.is_dir() {
        bail!("clip directory does not exist: {}", cli.clip_dir.display());
    }

    // Settings
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.clip_dir.join(".autocut").join("settings.toml"));
    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    let settings = config.settings().clone();

    // Style constraints: overrides > profile > defaults
    let mut style_dirs: Vec<PathBuf> = settings
        .paths
        .style_dirs
        .iter()
        .map(PathBuf::from)
        .collect();
    style_dirs.push(cli.clip_dir.join("styles"));
    style_dirs.push(PathBuf::from("styles"));

    let profile = match &cli.style {
        Some(style) => Some(
            load_profile(style, &style_dirs)
                .with_context(|| format!("loading style '{}'", style))?,
        ),
        None => None,
    };

    let overrides = StyleOverrides {
        platform_max_secs: cli.max_duration,
        speed_ramp_enabled: cli.no_speed_ramp.then_some(false),
        ..Default::default()
    };

    let constraints = resolve(StyleConstraints::default(), profile.as_ref(), &overrides)
        .context("resolving style constraints")?;

    if !cli.quiet {
        println!("Style: {}", constraints.style_name);
    }

    // Run request
    let mode = if cli.execute {
        RunMode::ExecuteOnly
    } else if cli.analyze_only {
        RunMode::AnalyzeOnly
    } else {
        RunMode::Full
    };

    let request = RunRequest {
        clip_dir: cli.clip_dir.clone(),
        mode,
        target_duration_secs: cli.duration,
        style: cli.style.clone(),
        preset: cli.preset,
        output_name: cli.output.clone(),
        skip_confirmation: cli.yes,
    };

    let log_sink: Option<LogCallback> = if cli.quiet {
        None
    } else {
        Some(Box::new(|line: &str| println!("{}", line)))
    };

    let confirm: Option<ConfirmCallback> = if cli.yes || mode == RunMode::AnalyzeOnly {
        None
    } else {
        Some(Box::new(prompt_for_confirmation))
    };

    let processor = RunProcessor::new(settings, constraints);
    let report = processor.process(request, log_sink, None, confirm);

    if report.aborted {
        println!("Cancelled.");
        return Ok(());
    }

    if !report.success {
        bail!(report
            .error
            .unwrap_or_else(|| "run failed for an unknown reason".to_string()));
    }

    match mode {
        RunMode::AnalyzeOnly => {
            if let Some(plan_path) = &report.plan_path {
                println!("Plan saved to {}", plan_path.display());
                println!("Run again with --execute to render it.");
            }
        }
        _ => {
            if let Some(output) = &report.output_path {
                println!("Output: {}", output.display());
            }
        }
    }

    Ok(())
}

/// Interactive confirmation prompt for the drafted plan.
fn prompt_for_confirmation(plan: &EditPlan) -> bool {
    let prompt = format!(
        "Render this plan? ({} segments, {:.1}s planned)",
        plan.segment_count(),
        plan.total_output_ms as f64 / 1000.0
    );

    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}
