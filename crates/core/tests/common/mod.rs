//! Shared test helpers for core integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use slidekit_core::errors::RenderError;
use slidekit_core::render::{RenderJob, Renderer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Renderer that writes the job content into every output and counts calls
///
/// Contents starting with `fail_prefix` are rejected.
#[derive(Clone, Default)]
pub struct SpyRenderer {
    calls: Arc<AtomicUsize>,
    fail_prefix: Option<String>,
}

impl SpyRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(prefix: &str) -> Self {
        Self {
            calls: Arc::default(),
            fail_prefix: Some(prefix.to_string()),
        }
    }

    /// Shared counter, still readable after the renderer moved into a cache
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for SpyRenderer {
    async fn render(&self, job: &RenderJob<'_>) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(prefix) = &self.fail_prefix {
            if job.content.starts_with(prefix.as_str()) {
                for output in &job.outputs {
                    std::fs::write(output.path, "partial")?;
                }
                return Err(RenderError::Failed {
                    program: "spy".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: format!("cannot render {}", job.content),
                });
            }
        }

        for output in &job.outputs {
            let body = format!(
                "{}|{}|{}",
                output.format,
                job.variant.map(|v| v.as_str()).unwrap_or("-"),
                job.content
            );
            std::fs::write(output.path, body)?;
        }
        Ok(())
    }
}

/// Targets of every `![alt](target)` image reference in a document
pub fn image_links(document: &str) -> Vec<String> {
    let re = regex::Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").unwrap();
    re.captures_iter(document)
        .map(|caps| caps[1].to_string())
        .collect()
}
