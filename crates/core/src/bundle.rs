//! Self-contained export bundles
//!
//! A bundle is one themed deck plus copies of every artifact it references,
//! laid out so the deck's links resolve relative to the bundle directory.
//! Variant subdirectories are flattened away: inside a bundle there is only
//! one theme, so `images/mermaid/<theme>/x.svg` becomes `images/mermaid/x.svg`.

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache::{ArtifactCache, ArtifactKind, ImageFormat, Variant};
use crate::document::{self, FailurePolicy, PreprocessOptions, PreprocessReport};
use crate::errors::{BundleError, DocumentError, Result};
use crate::observability::{bundle_assemble_span, TimedSpan};
use crate::render::Renderer;
use crate::theme::{has_theme_directive, set_theme_directive};

/// File name of the deck inside a bundle
pub const BUNDLE_DOCUMENT: &str = "presentation.md";
/// File name of the bundle manifest
pub const BUNDLE_MANIFEST: &str = "manifest.json";

/// Options for exporting one themed bundle
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub out_dir: PathBuf,
    pub theme: Variant,
    pub image_format: ImageFormat,
    pub link_prefix: String,
    pub policy: FailurePolicy,
}

/// One artifact copied into a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundledArtifact {
    pub kind: ArtifactKind,
    /// Path relative to the bundle directory
    pub path: String,
    pub bytes: u64,
}

/// Description of a written bundle
#[derive(Debug, Clone, Serialize)]
pub struct BundleManifest {
    pub document: String,
    pub theme: Variant,
    pub artifacts: Vec<BundledArtifact>,
    pub failures: usize,
    pub total_bytes: u64,
    pub generated_at: DateTime<Utc>,
}

impl BundleManifest {
    /// Human-readable total size, e.g. `12.3 KiB`
    pub fn total_size(&self) -> String {
        ByteSize::b(self.total_bytes).to_string()
    }
}

/// The report's document with the variant segment stripped from each
/// rewritten link
///
/// Only the link spans recorded in `report.resolved` are touched; author
/// text that happens to look like an artifact path is copied as is.
pub fn flatten_variant_paths(report: &PreprocessReport, variant: &Variant) -> String {
    let document = &report.document;
    let mut flattened = String::with_capacity(document.len());
    let mut cursor = 0;
    for marker in &report.resolved {
        let range = marker.link_range.clone();
        flattened.push_str(&document[cursor..range.start]);
        flattened.push_str(&flatten_path(&document[range.clone()], marker.kind, variant));
        cursor = range.end;
    }
    flattened.push_str(&document[cursor..]);
    flattened
}

/// Drop `variant` from a `.../{kindDir}/{variant}/{file}` path
fn flatten_path(path: &str, kind: ArtifactKind, variant: &Variant) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    let n = segments.len();
    if n >= 3 && segments[n - 2] == variant.as_str() && segments[n - 3] == kind.dir_name() {
        segments.remove(n - 2);
    }
    segments.join("/")
}

fn join_prefix(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

/// Write a preprocessed report and its artifacts into `options.out_dir`
///
/// A missing primary output is an error; a missing raster only warns since
/// the deck may link the primary alone.
pub fn assemble(
    report: &PreprocessReport,
    cache_root: &Path,
    options: &BundleOptions,
) -> std::result::Result<BundleManifest, BundleError> {
    let timed = TimedSpan::new(bundle_assemble_span(
        &options.out_dir,
        Some(options.theme.as_str()),
    ));

    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BundleError::Io { path, source }
    };

    fs::create_dir_all(&options.out_dir).map_err(io_error(&options.out_dir))?;

    let mut artifacts = Vec::new();
    let mut total_bytes = 0;
    for (kind, paths) in report.artifacts() {
        let outputs = [(paths.primary.as_str(), true), (paths.raster.as_str(), false)];
        for (relative, required) in outputs {
            let source = cache_root.join(relative);
            if !source.is_file() {
                if required {
                    return Err(BundleError::MissingArtifact { path: source });
                }
                warn!(path = %source.display(), "Raster output missing; skipping");
                continue;
            }

            let bundled = join_prefix(
                &options.link_prefix,
                &flatten_path(relative, kind, &options.theme),
            );
            let target = options.out_dir.join(&bundled);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            let bytes = fs::copy(&source, &target).map_err(io_error(&target))?;
            total_bytes += bytes;
            artifacts.push(BundledArtifact {
                kind,
                path: bundled,
                bytes,
            });
        }
    }

    let document = flatten_variant_paths(report, &options.theme);
    let document_path = options.out_dir.join(BUNDLE_DOCUMENT);
    fs::write(&document_path, &document).map_err(io_error(&document_path))?;
    total_bytes += document.len() as u64;

    let manifest = BundleManifest {
        document: BUNDLE_DOCUMENT.to_string(),
        theme: options.theme.clone(),
        artifacts,
        failures: report.failures.len(),
        total_bytes,
        generated_at: Utc::now(),
    };

    let manifest_path = options.out_dir.join(BUNDLE_MANIFEST);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        .map_err(io_error(&manifest_path))?;
    fs::write(&manifest_path, json).map_err(io_error(&manifest_path))?;

    info!(
        out_dir = %options.out_dir.display(),
        artifacts = manifest.artifacts.len(),
        size = %ByteSize::b(total_bytes),
        "Assembled bundle"
    );
    timed.complete();
    Ok(manifest)
}

/// Theme a deck, render it against `cache` and assemble a bundle
pub async fn export<R: Renderer>(
    cache: &mut ArtifactCache<R>,
    input: &Path,
    options: &BundleOptions,
) -> Result<BundleManifest> {
    let source = document::read_document(input)?;
    let themed = set_theme_directive(&source, options.theme.as_str())?;

    // QR codes stay in the shared unthemed partition
    let preprocess_options = PreprocessOptions {
        variant: Some(options.theme.clone()),
        image_format: options.image_format,
        link_prefix: options.link_prefix.clone(),
        policy: options.policy,
    };
    let report = document::preprocess(cache, &themed, &preprocess_options).await?;

    if !has_theme_directive(&report.document, options.theme.as_str()) {
        return Err(DocumentError::ThemeLost {
            expected: options.theme.to_string(),
        }
        .into());
    }

    Ok(assemble(&report, cache.root(), options)?)
}
