//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Renderers that copy the diagram source and write the QR URL verbatim
pub const FAKE_RENDERERS: &str = r#"
cache_root = "cache"

[renderers.diagram]
program = "sh"
args = ["-c", 'cp "$0" "$1"', "{input}", "{output}"]

[renderers.qr]
program = "sh"
args = ["-c", 'printf %s "$0" > "$1"', "{content}", "{output}"]
"#;

/// Diagram renderer that always fails; QR rendering still works
pub const FAILING_DIAGRAMS: &str = r#"
cache_root = "cache"

[renderers.diagram]
program = "sh"
args = ["-c", 'echo "Parse error on line 1" >&2; exit 1', "{output}"]

[renderers.qr]
program = "sh"
args = ["-c", 'printf %s "$0" > "$1"', "{content}", "{output}"]
"#;

pub const DECK: &str = r#"---
marp: true
theme: rose-pine-dawn
---

# Flow

```mermaid
graph TD
  A --> B
  style A fill:#e1f5ff
```

---

```mermaid
graph TD
  A --> B
  style A fill:#e1f5ff
```

![Repo](qr:https://example.com/repo)
"#;

/// Workspace with `slidekit.toml` and `slides/presentation.md`
pub fn workspace(config: &str, deck: &str) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write(temp_dir.path(), "slidekit.toml", config);
    write(temp_dir.path(), "slides/presentation.md", deck);
    temp_dir
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

/// Number of regular files below `dir`, recursively
pub fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| {
            let path = entry.expect("Failed to read entry").path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
