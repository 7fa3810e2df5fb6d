//! Bundle command implementation
//!
//! Implements `slidekit bundle`: a themed deck plus every image it links,
//! copied into one directory with theme subdirectories flattened.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use slidekit_core::bundle::{self, BundleOptions};
use slidekit_core::cache::{ImageFormat, Variant};
use slidekit_core::document::FailurePolicy;
use slidekit_core::io::Output;

use super::{command_cache, GlobalArgs};
use crate::cli::OutputFormat;

/// Bundle command arguments
#[derive(Debug, Clone)]
pub struct BundleArgs {
    pub global: GlobalArgs,
    pub input: PathBuf,
    pub theme: Variant,
    pub out: PathBuf,
    pub on_error: Option<FailurePolicy>,
    pub image_format: Option<ImageFormat>,
    pub output_format: OutputFormat,
}

/// Execute the bundle command
pub async fn execute_bundle(args: BundleArgs) -> Result<()> {
    let config = args.global.load_config()?;
    let options = BundleOptions {
        out_dir: args.out.clone(),
        theme: args.theme.clone(),
        image_format: args.image_format.unwrap_or(config.image_format),
        link_prefix: config.link_prefix.clone(),
        policy: args.on_error.unwrap_or(config.on_error),
    };

    info!(
        input = %args.input.display(),
        theme = %args.theme,
        out = %args.out.display(),
        "Starting bundle export"
    );

    let mut cache = command_cache(&config)?;
    let manifest = bundle::export(&mut cache, &args.input, &options).await?;

    let mut output = Output::stdout();
    match args.output_format {
        OutputFormat::Json => output.write_json(&manifest)?,
        OutputFormat::Text => {
            output.write_line(&format!(
                "Bundled {} ({} theme): {} files, {}",
                args.out.display(),
                manifest.theme,
                manifest.artifacts.len() + 1,
                manifest.total_size()
            ))?;
            if manifest.failures > 0 {
                output.write_line(&format!(
                    "{} blocks failed to render and were left in place",
                    manifest.failures
                ))?;
            }
        }
    }

    Ok(())
}
