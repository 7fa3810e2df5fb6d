//! Theme palettes for diagram recolouring and theme directive handling
//!
//! Diagram sources style their nodes with a small set of literal fill
//! colours. A [`Palette`] maps those colours to theme-specific ones; it is
//! applied to `style`, `classDef` and `linkStyle` lines only.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

use crate::cache::Variant;
use crate::errors::DocumentError;

/// Fill colours recognised in diagram sources
pub const SOURCE_FILLS: [&str; 6] = [
    "#e1f5ff", // blue
    "#fff4e1", // orange
    "#e8f5e9", // green
    "#fce4ec", // pink
    "#f3e5f5", // purple
    "#ffebee", // red
];

/// Built-in light theme name
pub const ROSE_PINE_DAWN: &str = "rose-pine-dawn";
/// Built-in dark theme name
pub const ROSE_PINE_MOON: &str = "rose-pine-moon";

const DAWN_FILLS: [&str; 6] = [
    "#d7e6ea", "#f6e3c8", "#d6e5e0", "#f2d9d7", "#e4dcea", "#efd3da",
];
const MOON_FILLS: [&str; 6] = [
    "#3e8fb0", "#f6c177", "#9ccfd8", "#ea9a97", "#c4a7e7", "#eb6f92",
];

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[0-9A-Fa-f]{6}\b").expect("valid hex colour regex"));

static THEME_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*(?:<!--[ \t]*)?theme:[ \t]*)([A-Za-z0-9._-]+)")
        .expect("valid theme directive regex")
});

const STYLE_DIRECTIVES: [&str; 3] = ["style", "classDef", "linkStyle"];

/// Colour substitution table for one theme
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: BTreeMap<String, String>,
}

impl Palette {
    /// Build a palette; keys and values must be `#rrggbb`
    pub fn new<I, K, V>(colors: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (from, to) in colors {
            let (from, to) = (from.as_ref(), to.as_ref());
            for color in [from, to] {
                if !is_hex_color(color) {
                    return Err(format!("'{}' is not a #rrggbb colour", color));
                }
            }
            map.insert(from.to_ascii_lowercase(), to.to_string());
        }
        Ok(Self { colors: map })
    }

    fn from_table(targets: [&str; 6]) -> Self {
        let colors = SOURCE_FILLS
            .iter()
            .zip(targets.iter())
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self { colors }
    }

    pub fn rose_pine_dawn() -> Self {
        Self::from_table(DAWN_FILLS)
    }

    pub fn rose_pine_moon() -> Self {
        Self::from_table(MOON_FILLS)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Recolour style directives of a diagram source
    ///
    /// Lines are preserved byte for byte unless they are style directives
    /// containing a known colour; matching is case-insensitive.
    pub fn apply(&self, source: &str) -> String {
        source
            .split_inclusive('\n')
            .map(|line| {
                if is_style_line(line) {
                    HEX_COLOR
                        .replace_all(line, |caps: &Captures<'_>| {
                            let found = &caps[0];
                            self.colors
                                .get(&found.to_ascii_lowercase())
                                .cloned()
                                .unwrap_or_else(|| found.to_string())
                        })
                        .into_owned()
                } else {
                    line.to_string()
                }
            })
            .collect()
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_style_line(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .map(|first| STYLE_DIRECTIVES.contains(&first))
        .unwrap_or(false)
}

/// Palettes by variant name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeRegistry {
    palettes: BTreeMap<String, Palette>,
}

impl ThemeRegistry {
    /// Registry holding the built-in light and dark palettes
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(ROSE_PINE_DAWN, Palette::rose_pine_dawn());
        registry.insert(ROSE_PINE_MOON, Palette::rose_pine_moon());
        registry
    }

    /// Register or replace a palette
    pub fn insert(&mut self, name: impl Into<String>, palette: Palette) {
        self.palettes.insert(name.into(), palette);
    }

    pub fn get(&self, variant: &Variant) -> Option<&Palette> {
        self.palettes.get(variant.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }
}

/// Point the first `theme:` directive of a deck at `theme`
///
/// Both front-matter (`theme: x`) and comment (`<!-- theme: x -->`)
/// directives are recognised.
pub fn set_theme_directive(document: &str, theme: &str) -> Result<String, DocumentError> {
    if !THEME_DIRECTIVE.is_match(document) {
        return Err(DocumentError::ThemeDirectiveMissing);
    }
    let rewritten = THEME_DIRECTIVE
        .replace(document, |caps: &Captures<'_>| format!("{}{}", &caps[1], theme))
        .into_owned();

    if !has_theme_directive(&rewritten, theme) {
        return Err(DocumentError::ThemeLost {
            expected: theme.to_string(),
        });
    }
    Ok(rewritten)
}

/// Whether the first `theme:` directive names `theme`
pub fn has_theme_directive(document: &str, theme: &str) -> bool {
    THEME_DIRECTIVE
        .captures(document)
        .map(|caps| &caps[2] == theme)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_rewrites_style_lines_only() {
        let source = "graph TD\n    A[#e1f5ff label] --> B\n    style A fill:#E1F5FF,stroke:#333333\n    classDef warm fill:#fff4e1\n";
        let recoloured = Palette::rose_pine_moon().apply(source);

        assert_eq!(
            recoloured,
            "graph TD\n    A[#e1f5ff label] --> B\n    style A fill:#3e8fb0,stroke:#333333\n    classDef warm fill:#f6c177\n"
        );
    }

    #[test]
    fn test_apply_preserves_source_without_trailing_newline() {
        let source = "flowchart LR\n  style X fill:#e8f5e9";
        let recoloured = Palette::rose_pine_dawn().apply(source);
        assert_eq!(recoloured, "flowchart LR\n  style X fill:#d6e5e0");
    }

    #[test]
    fn test_palette_validation() {
        assert!(Palette::new([("#e1f5ff", "#000000")]).is_ok());
        assert!(Palette::new([("blue", "#000000")]).is_err());
        assert!(Palette::new([("#e1f5ff", "#00000")]).is_err());
    }

    #[test]
    fn test_custom_palette_keys_are_case_insensitive() {
        let palette = Palette::new([("#ABCDEF", "#123456")]).unwrap();
        assert_eq!(palette.apply("style A fill:#abcdef"), "style A fill:#123456");
    }

    #[test]
    fn test_registry_builtin() {
        let registry = ThemeRegistry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec![ROSE_PINE_DAWN, ROSE_PINE_MOON]);

        let moon = Variant::new(ROSE_PINE_MOON).unwrap();
        assert_eq!(registry.get(&moon).map(Palette::len), Some(SOURCE_FILLS.len()));
    }

    #[test]
    fn test_set_theme_directive_front_matter() {
        let deck = "---\nmarp: true\ntheme: rose-pine-dawn\n---\n\n# Title\n";
        let themed = set_theme_directive(deck, ROSE_PINE_MOON).unwrap();

        assert_eq!(themed, "---\nmarp: true\ntheme: rose-pine-moon\n---\n\n# Title\n");
        assert!(has_theme_directive(&themed, ROSE_PINE_MOON));
        assert!(!has_theme_directive(&themed, ROSE_PINE_DAWN));
    }

    #[test]
    fn test_set_theme_directive_comment_form() {
        let deck = "<!-- theme: default -->\n# Slide\n";
        let themed = set_theme_directive(deck, "gaia").unwrap();
        assert_eq!(themed, "<!-- theme: gaia -->\n# Slide\n");
    }

    #[test]
    fn test_set_theme_directive_only_first() {
        let deck = "theme: a\n\ntheme: b\n";
        assert_eq!(set_theme_directive(deck, "c").unwrap(), "theme: c\n\ntheme: b\n");
    }

    #[test]
    fn test_set_theme_directive_missing() {
        let err = set_theme_directive("# No front matter\n", "gaia").unwrap_err();
        assert!(matches!(err, DocumentError::ThemeDirectiveMissing));
    }
}
