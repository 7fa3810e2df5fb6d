//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod bundle;
pub mod preprocess;
pub mod resolve;

use anyhow::Result;
use slidekit_core::cache::ArtifactCache;
use slidekit_core::config::{ConfigLoader, SlidekitConfig};
use slidekit_core::render::CommandRenderer;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub cache_root: Option<PathBuf>,
}

impl GlobalArgs {
    /// Load `slidekit.toml` and apply command-line overrides
    pub fn load_config(&self) -> Result<SlidekitConfig> {
        let mut config = ConfigLoader::load(self.config.as_deref(), Path::new("."))?;
        if let Some(cache_root) = &self.cache_root {
            config.cache_root = cache_root.clone();
        }
        debug!(cache_root = %config.cache_root.display(), "Effective configuration loaded");
        Ok(config)
    }
}

/// Artifact cache driven by the configured external renderers
pub fn command_cache(config: &SlidekitConfig) -> Result<ArtifactCache<CommandRenderer>> {
    Ok(ArtifactCache::new(
        config.cache_settings(),
        config.command_renderer()?,
    ))
}
