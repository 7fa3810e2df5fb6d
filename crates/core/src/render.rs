//! Renderer capability consumed by the artifact cache
//!
//! The cache never knows how an artifact is produced. It hands a
//! [`RenderJob`] to a [`Renderer`] and expects every requested output path
//! to be written. [`CommandRenderer`] is the stock implementation: it runs
//! a configurable external command per output format.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, Instrument};

use crate::cache::{ArtifactKind, ImageFormat, Variant};
use crate::errors::RenderError;
use crate::observability::render_invoke_span;
use crate::theme::ThemeRegistry;

/// One output the renderer must produce
#[derive(Debug, Clone, Copy)]
pub struct RenderOutput<'a> {
    pub format: ImageFormat,
    pub path: &'a Path,
}

/// A single render request handed over by the cache
#[derive(Debug, Clone)]
pub struct RenderJob<'a> {
    pub kind: ArtifactKind,
    pub content: &'a str,
    pub variant: Option<&'a Variant>,
    pub outputs: Vec<RenderOutput<'a>>,
}

/// Produces artifact files for render jobs
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `job.content` into every path listed in `job.outputs`
    async fn render(&self, job: &RenderJob<'_>) -> Result<(), RenderError>;
}

/// External command template
///
/// Arguments may contain the placeholders `{input}` (scratch file holding
/// the content), `{content}` (the raw content), `{output}` (the output
/// path) and `{format}` (`svg` or `png`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Mermaid CLI at slide resolution with a transparent background
    pub fn mermaid_cli() -> Self {
        Self::new(
            "npx",
            &[
                "-y",
                "mmdc",
                "-i",
                "{input}",
                "-o",
                "{output}",
                "-t",
                "default",
                "-b",
                "transparent",
                "-w",
                "1920",
                "-H",
                "1080",
                "-s",
                "2",
                "-q",
            ],
        )
    }

    /// `qrencode` with high error correction and a one-module margin
    pub fn qrencode() -> Self {
        Self::new(
            "qrencode",
            &[
                "-t", "{format}", "-l", "H", "-m", "1", "-s", "10", "-o", "{output}", "{content}",
            ],
        )
    }

    /// Default command for an artifact kind
    pub fn default_for(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Diagram => Self::mermaid_cli(),
            ArtifactKind::QrCode => Self::qrencode(),
        }
    }

    fn expand(&self, input: &Path, content: &str, output: &RenderOutput<'_>) -> Vec<String> {
        let input = input.to_string_lossy();
        let output_path = output.path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output_path)
                    .replace("{format}", output.format.extension())
                    .replace("{content}", content)
            })
            .collect()
    }
}

/// Renderer that shells out to one external command per artifact kind
///
/// Diagram content is recoloured with the variant's palette, when one is
/// registered, before it is written to the scratch input file.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    diagram: CommandSpec,
    qr: CommandSpec,
    themes: ThemeRegistry,
}

impl CommandRenderer {
    pub fn new(diagram: CommandSpec, qr: CommandSpec) -> Self {
        Self {
            diagram,
            qr,
            themes: ThemeRegistry::builtin(),
        }
    }

    pub fn with_themes(mut self, themes: ThemeRegistry) -> Self {
        self.themes = themes;
        self
    }

    pub fn spec(&self, kind: ArtifactKind) -> &CommandSpec {
        match kind {
            ArtifactKind::Diagram => &self.diagram,
            ArtifactKind::QrCode => &self.qr,
        }
    }

    /// Content as it is handed to the external tool
    pub fn prepare_content<'a>(&self, job: &RenderJob<'a>) -> Cow<'a, str> {
        match (job.kind, job.variant) {
            (ArtifactKind::Diagram, Some(variant)) => match self.themes.get(variant) {
                Some(palette) => Cow::Owned(palette.apply(job.content)),
                None => {
                    debug!(variant = %variant, "No palette registered; using source colours");
                    Cow::Borrowed(job.content)
                }
            },
            _ => Cow::Borrowed(job.content),
        }
    }
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new(CommandSpec::mermaid_cli(), CommandSpec::qrencode())
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, job: &RenderJob<'_>) -> Result<(), RenderError> {
        let variant = job.variant.map(Variant::as_str);
        let span = render_invoke_span(job.kind, variant, job.outputs.len());
        self.render_outputs(job).instrument(span).await
    }
}

impl CommandRenderer {
    async fn render_outputs(&self, job: &RenderJob<'_>) -> Result<(), RenderError> {
        let content = self.prepare_content(job);

        let mut input = tempfile::Builder::new()
            .prefix("slidekit-")
            .suffix(job.kind.source_extension())
            .tempfile()?;
        input.write_all(content.as_bytes())?;
        input.flush()?;

        let spec = self.spec(job.kind);
        for output in &job.outputs {
            let args = spec.expand(input.path(), &content, output);
            run_command(&spec.program, &args).await?;
        }
        Ok(())
    }
}

/// Run one renderer command to completion
///
/// The child is killed if the returned future is dropped, which is how the
/// cache's render timeout stops a hung tool.
async fn run_command(program: &str, args: &[String]) -> Result<(), RenderError> {
    debug!(program, ?args, "Invoking renderer");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RenderError::NotInstalled {
                program: program.to_string(),
            },
            _ => RenderError::Io(e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(RenderError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(())
}
