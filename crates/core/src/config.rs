//! Configuration loading
//!
//! Settings live in an optional `slidekit.toml` next to the deck (or at an
//! explicit path). Every key has a default, so a missing file yields the
//! stock pipeline: Mermaid CLI and `qrencode` rendering into
//! `slides/images`, linked as `images/...`.
//!
//! ```toml
//! cache_root = "slides/images"
//! link_prefix = "images"
//! image_format = "svg"
//! render_timeout_secs = 60
//! on_error = "placeholder"
//!
//! [renderers.qr]
//! program = "qrencode"
//! args = ["-t", "{format}", "-o", "{output}", "{content}"]
//!
//! [themes.ocean.colors]
//! "#e1f5ff" = "#0b3d91"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::cache::{
    ArtifactKind, CacheSettings, ImageFormat, Variant, DEFAULT_CACHE_ROOT, DEFAULT_RENDER_TIMEOUT,
};
use crate::document::{FailurePolicy, PreprocessOptions, DEFAULT_LINK_PREFIX};
use crate::errors::{ConfigError, Result, SlidekitError};
use crate::render::{CommandRenderer, CommandSpec};
use crate::theme::{Palette, ThemeRegistry};

/// Conventional configuration file name
pub const CONFIG_FILE_NAME: &str = "slidekit.toml";

const KNOWN_KEYS: [&str; 7] = [
    "cache_root",
    "link_prefix",
    "image_format",
    "render_timeout_secs",
    "on_error",
    "renderers",
    "themes",
];

/// External commands per artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "CommandSpec::mermaid_cli")]
    pub diagram: CommandSpec,
    #[serde(default = "CommandSpec::qrencode")]
    pub qr: CommandSpec,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            diagram: CommandSpec::mermaid_cli(),
            qr: CommandSpec::qrencode(),
        }
    }
}

/// A user-defined diagram palette
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Source colour to theme colour, both `#rrggbb`
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

/// Top-level `slidekit.toml` contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidekitConfig {
    pub cache_root: PathBuf,
    pub link_prefix: String,
    pub image_format: ImageFormat,
    pub render_timeout_secs: u64,
    pub on_error: FailurePolicy,
    pub renderers: RendererConfig,
    pub themes: BTreeMap<String, ThemeConfig>,
}

impl Default for SlidekitConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            link_prefix: DEFAULT_LINK_PREFIX.to_string(),
            image_format: ImageFormat::Svg,
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT.as_secs(),
            on_error: FailurePolicy::Placeholder,
            renderers: RendererConfig::default(),
            themes: BTreeMap::new(),
        }
    }
}

impl SlidekitConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::new(&self.cache_root).with_render_timeout(self.render_timeout())
    }

    /// Built-in palettes overlaid with the configured ones
    pub fn theme_registry(&self) -> Result<ThemeRegistry> {
        let mut registry = ThemeRegistry::builtin();
        for (name, theme) in &self.themes {
            let palette = Palette::new(&theme.colors).map_err(|message| {
                ConfigError::Validation {
                    message: format!("theme '{}': {}", name, message),
                }
            })?;
            registry.insert(name.clone(), palette);
        }
        Ok(registry)
    }

    pub fn command_renderer(&self) -> Result<CommandRenderer> {
        Ok(CommandRenderer::new(
            self.renderers.diagram.clone(),
            self.renderers.qr.clone(),
        )
        .with_themes(self.theme_registry()?))
    }

    /// Preprocessing options for an optional theme
    pub fn preprocess_options(&self, variant: Option<Variant>) -> PreprocessOptions {
        PreprocessOptions {
            variant,
            image_format: self.image_format,
            link_prefix: self.link_prefix.clone(),
            policy: self.on_error,
        }
    }
}

/// Configuration loader for `slidekit.toml`
pub struct ConfigLoader;

impl ConfigLoader {
    /// Locate the configuration file for a working directory
    ///
    /// Returns `None` when `{dir}/slidekit.toml` does not exist.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        debug!("Checking for configuration at {}", candidate.display());
        candidate.is_file().then_some(candidate)
    }

    /// Load configuration from an explicit path, or discover it under `dir`
    ///
    /// An explicit path must exist; a missing discovered file yields defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<SlidekitConfig> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => match Self::discover(dir) {
                Some(path) => Self::load_from_path(&path),
                None => {
                    debug!("No {} found; using defaults", CONFIG_FILE_NAME);
                    Ok(SlidekitConfig::default())
                }
            },
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_path(path: &Path) -> Result<SlidekitConfig> {
        debug!("Loading configuration from {}", path.display());

        if !path.exists() {
            return Err(SlidekitError::Config(ConfigError::NotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            debug!("Failed to read configuration file: {}", e);
            SlidekitError::Config(ConfigError::Io(e))
        })?;

        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| {
            SlidekitError::Config(ConfigError::Parsing {
                message: e.message().to_string(),
            })
        })?;

        Self::log_unknown_keys(&table);

        let config: SlidekitConfig =
            toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| {
                    debug!("Failed to deserialize configuration: {}", e);
                    SlidekitError::Config(ConfigError::Validation {
                        message: e.message().to_string(),
                    })
                })?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn log_unknown_keys(table: &toml::Table) {
        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!("Unknown configuration key '{}' - will be ignored", key);
            }
        }
    }

    /// Reject settings that would fail later in a confusing way
    pub fn validate(config: &SlidekitConfig) -> Result<()> {
        let invalid = |message: String| SlidekitError::Config(ConfigError::Validation { message });

        if config.cache_root.as_os_str().is_empty() {
            return Err(invalid("'cache_root' must not be empty".to_string()));
        }
        if config.render_timeout_secs == 0 {
            return Err(invalid(
                "'render_timeout_secs' must be greater than zero".to_string(),
            ));
        }
        if config.link_prefix.starts_with('/') || config.link_prefix.ends_with('/') {
            return Err(invalid(format!(
                "'link_prefix' must be a relative path without leading or trailing '/': '{}'",
                config.link_prefix
            )));
        }

        for kind in [ArtifactKind::Diagram, ArtifactKind::QrCode] {
            let spec = match kind {
                ArtifactKind::Diagram => &config.renderers.diagram,
                ArtifactKind::QrCode => &config.renderers.qr,
            };
            if spec.program.trim().is_empty() {
                return Err(invalid(format!("{} renderer program must not be empty", kind)));
            }
            if !spec.args.iter().any(|arg| arg.contains("{output}")) {
                return Err(invalid(format!(
                    "{} renderer arguments must reference {{output}}",
                    kind
                )));
            }
        }

        for name in config.themes.keys() {
            Variant::new(name.as_str())
                .map_err(|e| invalid(format!("theme name '{}': {}", name, e)))?;
        }
        config.theme_registry()?;

        Ok(())
    }
}
