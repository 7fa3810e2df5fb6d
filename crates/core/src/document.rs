//! Document rewriting
//!
//! A single scan over the deck source finds fenced Mermaid blocks and `qr:`
//! image markers; each span is resolved through the [`ArtifactCache`] in
//! document order and replaced by a plain Markdown image reference. Text
//! outside the matched spans is copied through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::cache::{ArtifactCache, ArtifactKind, ArtifactPaths, ImageFormat, Variant};
use crate::errors::{first_line, CacheError, DocumentError};
use crate::observability::{document_preprocess_span, record_duration};
use crate::render::Renderer;

const FENCE: &str = "```";
const DIAGRAM_INFO: &str = "mermaid";

static QR_MARKDOWN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(qr:([^)]+)\)").expect("valid QR marker regex"));

static QR_HTML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<img\s+src=["']qr:([^"']+)["'][^>]*>"#).expect("valid QR img regex")
});

/// Default directory prefix of rewritten image links
pub const DEFAULT_LINK_PREFIX: &str = "images";

/// What to do with a span whose artifact could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the original span in place
    #[serde(rename = "keep")]
    KeepSource,
    /// Emit a visible HTML comment followed by the original span
    #[default]
    Placeholder,
    /// Stop the whole document
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::KeepSource => write!(f, "keep"),
            FailurePolicy::Placeholder => write!(f, "placeholder"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(FailurePolicy::KeepSource),
            "placeholder" => Ok(FailurePolicy::Placeholder),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Options for one preprocessing run
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    /// Partition key passed to the cache for themed kinds (typically the theme)
    pub variant: Option<Variant>,
    /// Which output the rewritten links point at
    pub image_format: ImageFormat,
    /// Prefix joined in front of cache-relative paths, e.g. `images`
    pub link_prefix: String,
    pub policy: FailurePolicy,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            variant: None,
            image_format: ImageFormat::Svg,
            link_prefix: DEFAULT_LINK_PREFIX.to_string(),
            policy: FailurePolicy::default(),
        }
    }
}

impl PreprocessOptions {
    /// Document link for a cache-relative path
    pub fn link_for(&self, relative: &str) -> String {
        if self.link_prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.link_prefix, relative)
        }
    }
}

/// A recognised diagram block or QR marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: ArtifactKind,
    /// Byte range of the whole span in the source
    pub range: Range<usize>,
    /// 1-based line of the span start
    pub line: usize,
    /// Text handed to the cache (trimmed diagram body, or URL)
    pub content: String,
    /// Alt text of the replacement image reference
    pub alt: String,
}

/// A span that was replaced by an image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMarker {
    pub kind: ArtifactKind,
    pub line: usize,
    pub paths: ArtifactPaths,
    pub link: String,
    /// Byte range of `link` in the rewritten document
    #[serde(skip)]
    pub link_range: Range<usize>,
}

/// A span that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerFailure {
    pub kind: ArtifactKind,
    pub line: usize,
    pub excerpt: String,
    pub message: String,
}

/// Outcome of a preprocessing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreprocessReport {
    /// The rewritten document
    #[serde(skip)]
    pub document: String,
    pub resolved: Vec<ResolvedMarker>,
    pub failures: Vec<MarkerFailure>,
}

impl PreprocessReport {
    /// Distinct artifacts referenced by the rewritten document
    pub fn artifacts(&self) -> Vec<(ArtifactKind, &ArtifactPaths)> {
        let mut seen: Vec<(ArtifactKind, &ArtifactPaths)> = Vec::new();
        for marker in &self.resolved {
            if !seen.iter().any(|(_, paths)| *paths == &marker.paths) {
                seen.push((marker.kind, &marker.paths));
            }
        }
        seen
    }
}

/// Find every diagram block and QR marker, in document order
///
/// Spans never overlap: a marker inside a diagram block belongs to the
/// block and is not reported separately.
pub fn scan(source: &str) -> Vec<Marker> {
    let mut found: Vec<(ArtifactKind, Range<usize>, String, String)> = Vec::new();

    for (range, content) in diagram_blocks(source) {
        found.push((
            ArtifactKind::Diagram,
            range,
            content,
            ArtifactKind::Diagram.alt_text().to_string(),
        ));
    }

    for caps in QR_MARKDOWN.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        found.push((
            ArtifactKind::QrCode,
            whole.range(),
            caps[2].trim().to_string(),
            caps[1].to_string(),
        ));
    }

    for caps in QR_HTML.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        found.push((
            ArtifactKind::QrCode,
            whole.range(),
            caps[1].trim().to_string(),
            ArtifactKind::QrCode.alt_text().to_string(),
        ));
    }

    found.sort_by_key(|(_, range, _, _)| range.start);

    let mut markers = Vec::with_capacity(found.len());
    let mut last_end = 0;
    let mut line = 1;
    let mut counted_to = 0;
    for (kind, range, content, alt) in found {
        if range.start < last_end {
            continue;
        }
        line += source[counted_to..range.start].matches('\n').count();
        counted_to = range.start;
        last_end = range.end;
        markers.push(Marker {
            kind,
            range,
            line,
            content,
            alt,
        });
    }
    markers
}

/// Fenced diagram blocks as (span, trimmed body)
///
/// Fences are recognised at the start of a line only. A block is closed by
/// the next bare fence line; reaching another opening fence or the end of
/// the document first leaves the block unterminated and it is not reported.
fn diagram_blocks(source: &str) -> Vec<(Range<usize>, String)> {
    let mut blocks = Vec::new();
    // (span start, body start) of the currently open diagram fence
    let mut open: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\n', '\r']);
        let Some(info) = text.strip_prefix(FENCE) else {
            continue;
        };
        let info = info.trim_end_matches([' ', '\t']);

        match open.take() {
            Some((span_start, body_start)) if info.is_empty() => {
                let body = source[body_start..start].trim().to_string();
                blocks.push((span_start..start + text.len(), body));
            }
            Some(_) | None if info == DIAGRAM_INFO => open = Some((start, offset)),
            Some((span_start, _)) => {
                debug!(offset = span_start, "Skipping unterminated diagram block");
            }
            None => {}
        }
    }
    blocks
}

/// Rewrite a document, resolving every marker through `cache`
pub async fn preprocess<R: Renderer>(
    cache: &mut ArtifactCache<R>,
    source: &str,
    options: &PreprocessOptions,
) -> Result<PreprocessReport, DocumentError> {
    let markers = scan(source);
    debug!(markers = markers.len(), "Scanned document");

    let mut report = PreprocessReport::default();
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for marker in markers {
        out.push_str(&source[cursor..marker.range.start]);
        let original = &source[marker.range.clone()];

        let variant = options.variant.as_ref().filter(|_| marker.kind.is_themed());
        match cache.resolve(marker.kind, &marker.content, variant).await {
            Ok(paths) => {
                let link = options.link_for(paths.get(options.image_format));
                out.push_str("![");
                out.push_str(&marker.alt);
                out.push_str("](");
                let link_start = out.len();
                out.push_str(&link);
                let link_range = link_start..out.len();
                out.push(')');
                report.resolved.push(ResolvedMarker {
                    kind: marker.kind,
                    line: marker.line,
                    paths,
                    link,
                    link_range,
                });
            }
            Err(e) => {
                warn!(
                    kind = %marker.kind,
                    line = marker.line,
                    excerpt = first_line(&marker.content),
                    error = %e,
                    "Failed to resolve {}",
                    marker.kind
                );
                report.failures.push(MarkerFailure {
                    kind: marker.kind,
                    line: marker.line,
                    excerpt: first_line(&marker.content).to_string(),
                    message: e.to_string(),
                });

                match options.policy {
                    FailurePolicy::Abort => {
                        return Err(DocumentError::Aborted {
                            kind: marker.kind,
                            line: marker.line,
                            source: e,
                        })
                    }
                    FailurePolicy::KeepSource => out.push_str(original),
                    FailurePolicy::Placeholder => {
                        out.push_str(&placeholder(marker.kind, &e));
                        out.push_str(original);
                    }
                }
            }
        }

        cursor = marker.range.end;
    }
    out.push_str(&source[cursor..]);

    report.document = out;
    Ok(report)
}

/// Read `input`, rewrite it and write the result to `output`
pub async fn preprocess_file<R: Renderer>(
    cache: &mut ArtifactCache<R>,
    input: &Path,
    output: &Path,
    options: &PreprocessOptions,
) -> Result<PreprocessReport, DocumentError> {
    let variant = options.variant.as_ref().map(Variant::as_str);
    let span = document_preprocess_span(input, variant);
    let started = Instant::now();

    let report = async {
        let source = read_document(input)?;
        let report = preprocess(cache, &source, options).await?;
        write_document(output, &report.document)?;
        info!(
            output = %output.display(),
            resolved = report.resolved.len(),
            failed = report.failures.len(),
            "Preprocessed document"
        );
        Ok::<_, DocumentError>(report)
    }
    .instrument(span.clone())
    .await?;

    record_duration(&span, started);
    Ok(report)
}

/// Read a deck source as UTF-8
pub fn read_document(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a rewritten deck, creating the parent directory when needed
pub fn write_document(path: &Path, content: &str) -> Result<(), DocumentError> {
    let write_error = |source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, content).map_err(write_error)
}

fn placeholder(kind: ArtifactKind, error: &CacheError) -> String {
    let message = error
        .to_string()
        .replace("-->", "->")
        .replace(['\r', '\n'], " ");
    format!("<!-- slidekit: {} rendering failed: {} -->\n", kind, message)
}
