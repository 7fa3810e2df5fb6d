//! Preprocess command implementation
//!
//! Implements `slidekit preprocess`: rewrites a deck so every diagram block
//! and QR marker links a cached image.

use anyhow::Result;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use slidekit_core::cache::{CacheStats, ImageFormat, Variant};
use slidekit_core::document::{self, FailurePolicy, MarkerFailure, ResolvedMarker};
use slidekit_core::io::Output;

use super::{command_cache, GlobalArgs};
use crate::cli::OutputFormat;

/// Preprocess command arguments
#[derive(Debug, Clone)]
pub struct PreprocessArgs {
    pub global: GlobalArgs,
    pub input: PathBuf,
    pub output: PathBuf,
    pub theme: Option<Variant>,
    pub on_error: Option<FailurePolicy>,
    pub image_format: Option<ImageFormat>,
    pub output_format: OutputFormat,
}

/// Machine-readable result of a preprocess run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub theme: Option<Variant>,
    pub resolved: Vec<ResolvedMarker>,
    pub failures: Vec<MarkerFailure>,
    pub stats: CacheStats,
    /// Share of lookups served from the cache, 0.0 to 1.0
    pub hit_rate: f64,
}

/// One-line text summary, e.g. `3 artifacts resolved (2 rendered, 1 cached), 0 failed`
pub fn summary_line(resolved: usize, stats: &CacheStats, failed: usize) -> String {
    format!(
        "{} artifacts resolved ({} rendered, {} cached), {} failed",
        resolved, stats.renders, stats.hits, failed
    )
}

/// Execute the preprocess command
pub async fn execute_preprocess(args: PreprocessArgs) -> Result<()> {
    let config = args.global.load_config()?;
    let mut options = config.preprocess_options(args.theme.clone());
    if let Some(policy) = args.on_error {
        options.policy = policy;
    }
    if let Some(format) = args.image_format {
        options.image_format = format;
    }

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        policy = %options.policy,
        "Starting preprocess"
    );

    let mut cache = command_cache(&config)?;
    let report = document::preprocess_file(&mut cache, &args.input, &args.output, &options).await?;
    info!(
        hits = cache.stats().hits,
        renders = cache.stats().renders,
        hit_rate = cache.stats().hit_rate(),
        "Cache usage"
    );

    let mut output = Output::stdout();
    match args.output_format {
        OutputFormat::Json => {
            let summary = PreprocessSummary {
                input: args.input,
                output: args.output,
                theme: args.theme,
                resolved: report.resolved,
                failures: report.failures,
                stats: cache.stats().clone(),
                hit_rate: cache.stats().hit_rate(),
            };
            output.write_json(&summary)?;
        }
        OutputFormat::Text => {
            let line = summary_line(report.resolved.len(), cache.stats(), report.failures.len());
            if report.failures.is_empty() {
                output.write_line(&format!("{} {}", style("✓").green(), line))?;
            } else {
                output.write_line(&format!("{} {}", style("!").yellow(), line))?;
                for failure in &report.failures {
                    output.write_line(&format!(
                        "  line {}: {} `{}`: {}",
                        failure.line, failure.kind, failure.excerpt, failure.message
                    ))?;
                }
            }
            output.write_line(&format!("Wrote {}", args.output.display()))?;
        }
    }

    Ok(())
}
