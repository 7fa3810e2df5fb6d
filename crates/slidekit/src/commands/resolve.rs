//! Resolve command implementation
//!
//! Implements `slidekit resolve`: look up (or render) one artifact and print
//! where it lives. Useful for warming the cache from scripts.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use slidekit_core::cache::{ArtifactKind, ArtifactPaths, Variant};
use slidekit_core::io::Output;

use super::{command_cache, GlobalArgs};
use crate::cli::OutputFormat;

/// Resolve command arguments
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    pub global: GlobalArgs,
    pub kind: ArtifactKind,
    pub content: Option<String>,
    pub file: Option<PathBuf>,
    pub theme: Option<Variant>,
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveResult {
    kind: ArtifactKind,
    cache_root: PathBuf,
    paths: ArtifactPaths,
    cached: bool,
}

/// Execute the resolve command
pub async fn execute_resolve(args: ResolveArgs) -> Result<()> {
    let content = match (&args.content, &args.file) {
        (Some(content), _) => content.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => anyhow::bail!("either --content or --file is required"),
    };
    // Same normalisation as document scanning, so both share cache entries
    let content = content.trim().to_string();

    let config = args.global.load_config()?;
    let mut cache = command_cache(&config)?;
    let paths = cache
        .resolve(args.kind, &content, args.theme.as_ref())
        .await?;
    let cached = cache.stats().hits > 0;

    let mut output = Output::stdout();
    match args.output_format {
        OutputFormat::Json => output.write_json(&ResolveResult {
            kind: args.kind,
            cache_root: cache.root().to_path_buf(),
            paths,
            cached,
        })?,
        OutputFormat::Text => {
            output.write_line(&cache.root().join(&paths.primary).display().to_string())?;
        }
    }

    Ok(())
}
