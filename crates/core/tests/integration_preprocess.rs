//! Integration tests for document preprocessing against a spy renderer.

mod common;

use common::{image_links, SpyRenderer};
use slidekit_core::cache::{ArtifactCache, CacheSettings, ImageFormat, Variant};
use slidekit_core::document::{self, FailurePolicy, PreprocessOptions};
use slidekit_core::errors::DocumentError;
use std::fs;
use tempfile::TempDir;

const DECK: &str = r#"---
marp: true
theme: rose-pine-dawn
---

# Architecture

```mermaid
graph TD
  A[Client] --> B[Server]
```

---

# Same diagram again

```mermaid
graph TD
  A[Client] --> B[Server]
```

---

# Find us

![Project page](qr:https://example.com/project)
"#;

#[tokio::test]
async fn test_identical_diagrams_share_one_render() {
    let temp_dir = TempDir::new().unwrap();
    let spy = SpyRenderer::new();
    let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), spy.clone());

    let report = document::preprocess(&mut cache, DECK, &PreprocessOptions::default())
        .await
        .unwrap();

    let links = image_links(&report.document);
    assert_eq!(links.len(), 3);
    assert_eq!(links[0], links[1]);
    assert_ne!(links[0], links[2]);
    assert!(links[0].starts_with("images/mermaid/mermaid-"));
    assert!(links[2].starts_with("images/qr/qr-"));
    assert_eq!(spy.calls(), 2);

    assert_eq!(report.resolved.len(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(report.artifacts().len(), 2);
    assert!(!report.document.contains("```mermaid"));
    assert!(report.document.contains("![Project page](images/qr/"));
    assert!(report.document.contains("theme: rose-pine-dawn"));
}

#[tokio::test]
async fn test_second_run_renders_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let spy = SpyRenderer::new();
    let options = PreprocessOptions::default();

    let first = {
        let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), spy.clone());
        document::preprocess(&mut cache, DECK, &options).await.unwrap()
    };
    let second = {
        let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), spy.clone());
        document::preprocess(&mut cache, DECK, &options).await.unwrap()
    };

    assert_eq!(first.document, second.document);
    assert_eq!(spy.calls(), 2);
}

#[tokio::test]
async fn test_variant_and_raster_links() {
    let temp_dir = TempDir::new().unwrap();
    let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), SpyRenderer::new());
    let options = PreprocessOptions {
        variant: Some(Variant::new("rose-pine-moon").unwrap()),
        image_format: ImageFormat::Png,
        ..PreprocessOptions::default()
    };

    let report = document::preprocess(&mut cache, DECK, &options).await.unwrap();
    let links = image_links(&report.document);

    assert!(links[0].starts_with("images/mermaid/rose-pine-moon/mermaid-"));
    assert!(links[0].ends_with(".png"));
    assert!(links[2].starts_with("images/qr/qr-"));
}

#[tokio::test]
async fn test_unterminated_diagram_leaves_document_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let spy = SpyRenderer::new();
    let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), spy.clone());
    let source = "# Slide\n\nUse ```mermaid inline.\n\n```mermaid\ngraph TD\n\n# Next slide\n\n```rust\nfn main() {}\n```\n";

    let report = document::preprocess(&mut cache, source, &PreprocessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.document, source);
    assert!(report.resolved.is_empty());
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_document_without_markers_is_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let spy = SpyRenderer::new();
    let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), spy.clone());
    let source = "# Plain\r\n\r\n```rust\nfn main() {}\n```\n![logo](images/logo.png)";

    let report = document::preprocess(&mut cache, source, &PreprocessOptions::default())
        .await
        .unwrap();

    assert_eq!(report.document, source);
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_failure_policies() {
    let source = "before\n```mermaid\ngraph BROKEN\n```\nafter ![QR](qr:https://ok.example)\n";
    let broken = "```mermaid\ngraph BROKEN\n```";

    for policy in [FailurePolicy::KeepSource, FailurePolicy::Placeholder] {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ArtifactCache::new(
            CacheSettings::new(temp_dir.path()),
            SpyRenderer::failing_on("graph BROKEN"),
        );
        let options = PreprocessOptions {
            policy,
            ..PreprocessOptions::default()
        };

        let report = document::preprocess(&mut cache, source, &options).await.unwrap();

        assert!(report.document.contains(broken));
        assert!(report.document.starts_with("before\n"));
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 2);
        assert_eq!(report.failures[0].excerpt, "graph BROKEN");

        let has_comment = report
            .document
            .contains("<!-- slidekit: diagram rendering failed:");
        assert_eq!(has_comment, policy == FailurePolicy::Placeholder);
    }
}

#[tokio::test]
async fn test_abort_policy_stops_document() {
    let temp_dir = TempDir::new().unwrap();
    let mut cache = ArtifactCache::new(
        CacheSettings::new(temp_dir.path()),
        SpyRenderer::failing_on("graph BROKEN"),
    );
    let options = PreprocessOptions {
        policy: FailurePolicy::Abort,
        ..PreprocessOptions::default()
    };
    let source = "# Slide\n\n```mermaid\ngraph BROKEN\n```\n";

    let err = document::preprocess(&mut cache, source, &options)
        .await
        .unwrap_err();
    match err {
        DocumentError::Aborted { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_preprocess_file_writes_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("slides/presentation.md");
    let output = temp_dir.path().join("out/nested/presentation.processed.md");
    fs::create_dir_all(input.parent().unwrap()).unwrap();
    fs::write(&input, DECK).unwrap();

    let mut cache = ArtifactCache::new(
        CacheSettings::new(temp_dir.path().join("slides/images")),
        SpyRenderer::new(),
    );
    let options = PreprocessOptions::default();
    let report = document::preprocess_file(&mut cache, &input, &output, &options)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), report.document);
    assert_eq!(fs::read_to_string(&input).unwrap(), DECK);
}

#[tokio::test]
async fn test_preprocess_file_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let mut cache = ArtifactCache::new(CacheSettings::new(temp_dir.path()), SpyRenderer::new());

    let err = document::preprocess_file(
        &mut cache,
        &temp_dir.path().join("missing.md"),
        &temp_dir.path().join("out.md"),
        &PreprocessOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DocumentError::Read { .. }));
}
