//! Cache key types: artifact kinds, variants and on-disk naming

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fingerprint;
use crate::errors::CacheError;

/// Kind of generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Mermaid diagram rendered from a fenced block
    Diagram,
    /// QR code rendered from a URL
    #[serde(rename = "qr")]
    QrCode,
}

impl ArtifactKind {
    /// Subdirectory of the cache root holding this kind
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Diagram => "mermaid",
            ArtifactKind::QrCode => "qr",
        }
    }

    /// Filename prefix of every artifact of this kind
    pub fn file_prefix(self) -> &'static str {
        self.dir_name()
    }

    /// Alt text used when rewriting a span into an image reference
    pub fn alt_text(self) -> &'static str {
        match self {
            ArtifactKind::Diagram => "Mermaid diagram",
            ArtifactKind::QrCode => "QR Code",
        }
    }

    /// Whether rendered output depends on the theme variant
    ///
    /// QR codes encode only their URL, so document runs share one
    /// unpartitioned entry across themes.
    pub fn is_themed(self) -> bool {
        matches!(self, ArtifactKind::Diagram)
    }

    /// Extension of the scratch file handed to command renderers
    pub fn source_extension(self) -> &'static str {
        match self {
            ArtifactKind::Diagram => ".mmd",
            ArtifactKind::QrCode => ".txt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Diagram => write!(f, "diagram"),
            ArtifactKind::QrCode => write!(f, "QR code"),
        }
    }
}

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Scalable primary output
    #[default]
    Svg,
    /// Raster fallback output
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(ImageFormat::Svg),
            "png" => Ok(ImageFormat::Png),
            other => Err(format!("unknown image format '{}'", other)),
        }
    }
}

/// Opaque partition key (typically a theme name) used as a path segment
///
/// Only ASCII alphanumerics, `-`, `_` and `.` are accepted and the name may
/// not start with `.`, so a variant can never escape its kind directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    pub fn new(name: impl Into<String>) -> Result<Self, CacheError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CacheError::InvalidInput {
                message: "variant name must not be empty".to_string(),
            });
        }
        if name.starts_with('.') {
            return Err(CacheError::InvalidInput {
                message: format!("variant name '{}' must not start with '.'", name),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(CacheError::InvalidInput {
                message: format!("variant name '{}' contains invalid character {:?}", name, bad),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Variant {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::new(s)
    }
}

impl<'de> Deserialize<'de> for Variant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Variant::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Identity of one artifact: what is rendered, from what, for which variant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ArtifactKind,
    pub content: String,
    pub variant: Option<Variant>,
}

impl CacheKey {
    pub fn new(kind: ArtifactKind, content: impl Into<String>, variant: Option<Variant>) -> Self {
        Self {
            kind,
            content: content.into(),
            variant,
        }
    }

    /// Content fingerprint shared by every output of this artifact
    pub fn digest(&self) -> String {
        fingerprint(&self.content)
    }

    /// Filename stem, e.g. `mermaid-3f2a9c01d4e5b6a7`
    pub fn stem(&self) -> String {
        format!("{}-{}", self.kind.file_prefix(), self.digest())
    }

    /// Directory relative to the cache root, `/`-separated
    pub fn relative_dir(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}/{}", self.kind.dir_name(), variant),
            None => self.kind.dir_name().to_string(),
        }
    }

    /// Path of one output relative to the cache root, `/`-separated
    pub fn relative_path(&self, format: ImageFormat) -> String {
        format!(
            "{}/{}.{}",
            self.relative_dir(),
            self.stem(),
            format.extension()
        )
    }
}

/// Relative locations of the outputs of one resolved artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Scalable output; its presence marks the entry as cached
    pub primary: String,
    /// Raster fallback produced from the same source
    pub raster: String,
}

impl ArtifactPaths {
    pub fn for_key(key: &CacheKey) -> Self {
        Self {
            primary: key.relative_path(ImageFormat::Svg),
            raster: key.relative_path(ImageFormat::Png),
        }
    }

    /// Path of the output in the requested format
    pub fn get(&self, format: ImageFormat) -> &str {
        match format {
            ImageFormat::Svg => &self.primary,
            ImageFormat::Png => &self.raster,
        }
    }
}
