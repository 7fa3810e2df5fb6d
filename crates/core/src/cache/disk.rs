//! Disk-backed artifact cache with write-then-publish semantics

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::{Builder, TempPath};
use tracing::{debug, info, warn, Instrument};

use super::{ArtifactKind, ArtifactPaths, CacheKey, CacheStats, ImageFormat, Variant};
use crate::errors::{CacheError, RenderError};
use crate::observability::cache_resolve_span;
use crate::render::{RenderJob, RenderOutput, Renderer};

/// Default cache root, relative to the working directory
pub const DEFAULT_CACHE_ROOT: &str = "slides/images";

/// Default upper bound for a single render call
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Construction parameters for [`ArtifactCache`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Directory under which all artifacts are stored
    pub root: PathBuf,
    /// Upper bound for one renderer invocation
    pub render_timeout: Duration,
}

impl CacheSettings {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_render_timeout(mut self, render_timeout: Duration) -> Self {
        self.render_timeout = render_timeout;
        self
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ROOT)
    }
}

/// Content-addressed cache of rendered artifacts
///
/// Each distinct `(kind, content, variant)` is rendered at most once per
/// cache root. Outputs are rendered into hidden temporary files next to
/// their final location and renamed into place only after the renderer
/// succeeded, raster first and primary last, so a present primary file
/// always denotes a complete entry.
pub struct ArtifactCache<R: Renderer> {
    settings: CacheSettings,
    renderer: R,
    stats: CacheStats,
}

impl<R: Renderer> ArtifactCache<R> {
    /// Create a cache over `settings.root`; nothing is touched on disk yet
    pub fn new(settings: CacheSettings, renderer: R) -> Self {
        Self {
            settings,
            renderer,
            stats: CacheStats::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Absolute location of one output of `key`
    pub fn locate(&self, key: &CacheKey, format: ImageFormat) -> PathBuf {
        self.settings.root.join(key.relative_path(format))
    }

    /// Whether the primary output of `key` is present
    pub fn contains(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let primary = self.locate(key, ImageFormat::Svg);
        primary
            .try_exists()
            .map_err(|source| CacheError::CacheIo {
                path: primary,
                source,
            })
    }

    /// Return the relative paths of a ready artifact, rendering it on a miss
    ///
    /// A hit is decided by existence of the primary output alone; its
    /// content is not re-validated.
    pub async fn resolve(
        &mut self,
        kind: ArtifactKind,
        content: &str,
        variant: Option<&Variant>,
    ) -> Result<ArtifactPaths, CacheError> {
        if content.trim().is_empty() {
            return Err(CacheError::InvalidInput {
                message: format!("{} content must not be empty", kind),
            });
        }

        let key = CacheKey::new(kind, content, variant.cloned());
        let span = cache_resolve_span(&key);
        self.resolve_key(&key).instrument(span).await
    }

    async fn resolve_key(&mut self, key: &CacheKey) -> Result<ArtifactPaths, CacheError> {
        let paths = ArtifactPaths::for_key(key);

        if self.contains(key)? {
            self.stats.hits += 1;
            debug!(path = %paths.primary, "Artifact cache hit");
            return Ok(paths);
        }

        self.stats.misses += 1;
        debug!(path = %paths.primary, "Artifact cache miss");

        let started = Instant::now();
        match self.render_and_publish(key).await {
            Ok(()) => {
                self.stats.renders += 1;
                info!(
                    path = %paths.primary,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Rendered {}",
                    key.kind
                );
                Ok(paths)
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(path = %paths.primary, error = %e, "Artifact render failed");
                Err(e)
            }
        }
    }

    async fn render_and_publish(&self, key: &CacheKey) -> Result<(), CacheError> {
        let dir = self.settings.root.join(key.relative_dir());
        fs::create_dir_all(&dir).map_err(|source| CacheError::CacheIo {
            path: dir.clone(),
            source,
        })?;

        let primary = stage(&dir, key, ImageFormat::Svg)?;
        let raster = stage(&dir, key, ImageFormat::Png)?;

        let job = RenderJob {
            kind: key.kind,
            content: &key.content,
            variant: key.variant.as_ref(),
            outputs: vec![
                RenderOutput {
                    format: ImageFormat::Svg,
                    path: &primary,
                },
                RenderOutput {
                    format: ImageFormat::Png,
                    path: &raster,
                },
            ],
        };

        let render_failure = |source| CacheError::RenderFailure {
            kind: key.kind,
            content: key.content.clone(),
            source,
        };

        let timeout = self.settings.render_timeout;
        let rendered = match tokio::time::timeout(timeout, self.renderer.render(&job)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::TimedOut { timeout }),
        };
        rendered.map_err(render_failure)?;

        for output in &job.outputs {
            ensure_non_empty(output.path).map_err(render_failure)?;
        }
        drop(job);

        // The primary goes last: its presence is what marks the entry cached.
        publish(raster, &self.locate(key, ImageFormat::Png))?;
        publish(primary, &self.locate(key, ImageFormat::Svg))?;
        Ok(())
    }
}

/// Create an empty hidden temporary file for one output; removed on drop
fn stage(dir: &Path, key: &CacheKey, format: ImageFormat) -> Result<TempPath, CacheError> {
    Builder::new()
        .prefix(&format!(".{}.", key.stem()))
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)
        .map(|file| file.into_temp_path())
        .map_err(|source| CacheError::CacheIo {
            path: dir.to_path_buf(),
            source,
        })
}

fn ensure_non_empty(path: &Path) -> Result<(), RenderError> {
    if fs::metadata(path)?.len() == 0 {
        return Err(RenderError::EmptyOutput {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn publish(staged: TempPath, target: &Path) -> Result<(), CacheError> {
    staged.persist(target).map_err(|e| CacheError::CacheIo {
        path: target.to_path_buf(),
        source: e.error,
    })
}
