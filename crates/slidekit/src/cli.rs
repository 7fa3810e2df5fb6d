use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use slidekit_core::cache::{ArtifactKind, ImageFormat, Variant};
use slidekit_core::document::FailurePolicy;
use std::path::PathBuf;

use crate::commands::{
    bundle::{execute_bundle, BundleArgs},
    preprocess::{execute_preprocess, PreprocessArgs},
    resolve::{execute_resolve, ResolveArgs},
    GlobalArgs,
};

/// Default deck location, relative to the working directory
pub const DEFAULT_INPUT: &str = "slides/presentation.md";
/// Default location of the rewritten deck
pub const DEFAULT_OUTPUT: &str = "slides/presentation.processed.md";

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

/// What to do when an artifact fails to render
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OnError {
    /// Leave the original block in the document
    Keep,
    /// Leave the block and prepend a visible HTML comment
    Placeholder,
    /// Fail the whole command
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Keep => FailurePolicy::KeepSource,
            OnError::Placeholder => FailurePolicy::Placeholder,
            OnError::Abort => FailurePolicy::Abort,
        }
    }
}

/// Image format referenced by rewritten links
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ImageFormatArg {
    Svg,
    Png,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(value: ImageFormatArg) -> Self {
        match value {
            ImageFormatArg::Svg => ImageFormat::Svg,
            ImageFormatArg::Png => ImageFormat::Png,
        }
    }
}

/// Artifact kind for the `resolve` command
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum KindArg {
    /// Mermaid diagram source
    Diagram,
    /// URL to encode as a QR code
    Qr,
}

impl From<KindArg> for ArtifactKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Diagram => ArtifactKind::Diagram,
            KindArg::Qr => ArtifactKind::QrCode,
        }
    }
}

fn parse_variant(raw: &str) -> std::result::Result<Variant, String> {
    Variant::new(raw).map_err(|e| e.to_string())
}

/// slidekit subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replace diagram blocks and QR markers with cached image references
    Preprocess {
        /// Deck to preprocess
        #[arg(value_name = "INPUT", default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Where to write the rewritten deck
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Theme used to partition and recolour diagrams
        #[arg(long, value_parser = parse_variant)]
        theme: Option<Variant>,

        /// Behaviour for blocks that fail to render (overrides config)
        #[arg(long, value_enum)]
        on_error: Option<OnError>,

        /// Image format referenced by rewritten links (overrides config)
        #[arg(long, value_enum)]
        image_format: Option<ImageFormatArg>,

        /// Summary format on stdout
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Export a themed, self-contained copy of the deck and its images
    Bundle {
        /// Deck to export
        #[arg(value_name = "INPUT", default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Theme written into the deck and used for diagrams
        #[arg(long, value_parser = parse_variant)]
        theme: Variant,

        /// Bundle directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Behaviour for blocks that fail to render (overrides config)
        #[arg(long, value_enum)]
        on_error: Option<OnError>,

        /// Image format referenced by rewritten links (overrides config)
        #[arg(long, value_enum)]
        image_format: Option<ImageFormatArg>,

        /// Summary format on stdout
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Resolve a single artifact and print its cached location
    Resolve {
        /// Artifact kind
        #[arg(value_enum)]
        kind: KindArg,

        /// Artifact content (diagram source or URL)
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,

        /// Read artifact content from a file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Theme partition
        #[arg(long, value_parser = parse_variant)]
        theme: Option<Variant>,

        /// Output format on stdout
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Slide deck preprocessor",
    long_about = "Slide deck preprocessor\n\nRenders Mermaid diagrams and QR codes referenced by a Markdown deck into a content-addressed image cache and rewrites the deck to link them.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via SLIDEKIT_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Configuration file path (defaults to ./slidekit.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Artifact cache directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        // Initialize logging based on global options
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = match self.log_level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        // Set environment variable for log level before initializing logging
        if std::env::var_os(slidekit_core::logging::LOG_FILTER_ENV).is_none()
            && std::env::var_os("RUST_LOG").is_none()
        {
            std::env::set_var(
                "RUST_LOG",
                format!("slidekit={},slidekit_core={}", log_level, log_level),
            );
        }
        slidekit_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let global = GlobalArgs {
            config: self.config,
            cache_root: self.cache_root,
        };

        match self.command {
            Commands::Preprocess {
                input,
                output,
                theme,
                on_error,
                image_format,
                output_format,
            } => {
                execute_preprocess(PreprocessArgs {
                    global,
                    input,
                    output,
                    theme,
                    on_error: on_error.map(Into::into),
                    image_format: image_format.map(Into::into),
                    output_format,
                })
                .await
            }
            Commands::Bundle {
                input,
                theme,
                out,
                on_error,
                image_format,
                output_format,
            } => {
                execute_bundle(BundleArgs {
                    global,
                    input,
                    theme,
                    out,
                    on_error: on_error.map(Into::into),
                    image_format: image_format.map(Into::into),
                    output_format,
                })
                .await
            }
            Commands::Resolve {
                kind,
                content,
                file,
                theme,
                output_format,
            } => {
                execute_resolve(ResolveArgs {
                    global,
                    kind: kind.into(),
                    content,
                    file,
                    theme,
                    output_format,
                })
                .await
            }
        }
    }
}
