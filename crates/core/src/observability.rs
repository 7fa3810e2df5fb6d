//! Observability utilities for standardized tracing spans and structured fields
//!
//! Spans follow a small canonical taxonomy so text and JSON logs can be
//! correlated across the preprocess, bundle and render workflows.

use std::path::Path;
use std::time::Instant;
use tracing::{span, Span};

use crate::cache::{ArtifactKind, CacheKey};

/// Canonical span names for core workflows
pub mod spans {
    pub const CACHE_RESOLVE: &str = "cache.resolve";
    pub const DOCUMENT_PREPROCESS: &str = "document.preprocess";
    pub const BUNDLE_ASSEMBLE: &str = "bundle.assemble";
    pub const RENDER_INVOKE: &str = "render.invoke";
}

/// Common field names for structured logging
pub mod fields {
    pub const DURATION_MS: &str = "duration_ms";
}

/// Start a span for resolving one artifact
pub fn cache_resolve_span(key: &CacheKey) -> Span {
    span!(
        target: "slidekit_core::observability",
        tracing::Level::INFO,
        spans::CACHE_RESOLVE,
        kind = %key.kind,
        digest = %key.digest(),
        variant = key.variant.as_ref().map(|v| v.as_str()).unwrap_or("")
    )
}

/// Start a span for rewriting one document
pub fn document_preprocess_span(document: &Path, variant: Option<&str>) -> Span {
    span!(
        target: "slidekit_core::observability",
        tracing::Level::INFO,
        spans::DOCUMENT_PREPROCESS,
        duration_ms = tracing::field::Empty,
        document = %document.display(),
        variant = variant.unwrap_or("")
    )
}

/// Start a span for assembling an export bundle
pub fn bundle_assemble_span(out_dir: &Path, variant: Option<&str>) -> Span {
    span!(
        target: "slidekit_core::observability",
        tracing::Level::INFO,
        spans::BUNDLE_ASSEMBLE,
        duration_ms = tracing::field::Empty,
        document = %out_dir.display(),
        variant = variant.unwrap_or("")
    )
}

/// Start a span around one renderer invocation
pub fn render_invoke_span(kind: ArtifactKind, variant: Option<&str>, outputs: usize) -> Span {
    span!(
        target: "slidekit_core::observability",
        tracing::Level::DEBUG,
        spans::RENDER_INVOKE,
        kind = %kind,
        variant = variant.unwrap_or(""),
        outputs
    )
}

/// Helper for recording duration on span completion
pub struct TimedSpan {
    span: Span,
    start_time: Instant,
    // Keep the span entered for the lifetime of TimedSpan
    _entered: tracing::span::EnteredSpan,
}

impl TimedSpan {
    /// Create a new timed span from an existing span
    pub fn new(span: Span) -> Self {
        let entered = span.clone().entered();
        Self {
            span,
            start_time: Instant::now(),
            _entered: entered,
        }
    }

    /// Complete the span and record duration
    pub fn complete(self) {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        self.span.record(fields::DURATION_MS, duration_ms);
    }

    /// Get the underlying span for recording additional fields
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Record elapsed time on a span that is not held entered (async workflows)
pub fn record_duration(span: &Span, started: Instant) {
    span.record(fields::DURATION_MS, started.elapsed().as_millis() as u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Variant;

    #[test]
    fn test_span_creation() {
        let key = CacheKey::new(
            ArtifactKind::Diagram,
            "graph TD",
            Some(Variant::new("dark").unwrap()),
        );
        let _span = cache_resolve_span(&key);
        let _span = document_preprocess_span(Path::new("slides/presentation.md"), None);
        let _span = bundle_assemble_span(Path::new("dist"), Some("dark"));
        let _span = render_invoke_span(ArtifactKind::QrCode, None, 2);
    }

    #[test]
    fn test_span_names_are_dotted() {
        for name in [
            spans::CACHE_RESOLVE,
            spans::DOCUMENT_PREPROCESS,
            spans::BUNDLE_ASSEMBLE,
            spans::RENDER_INVOKE,
        ] {
            assert_eq!(name.split('.').count(), 2, "{name}");
        }
        assert_eq!(spans::RENDER_INVOKE, "render.invoke");
    }

    #[test]
    fn test_timed_span() {
        let span = document_preprocess_span(Path::new("deck.md"), Some("light"));
        let timed = TimedSpan::new(span);
        let _ = timed.span();
        timed.complete();
    }

    #[test]
    fn test_record_duration() {
        let span = bundle_assemble_span(Path::new("dist"), None);
        record_duration(&span, Instant::now());
    }
}
