use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Where the data of a font comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSource {
    /// A bundled asset, relative to the configured assets directory.
    Asset(PathBuf),
    /// A `file`, `http` or `https` URI.
    Uri(Url),
}

impl FromStr for FontSource {
    type Err = ParseFontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseFontError::MissingSource);
        }
        if s.contains("://") {
            let url = s.parse().map_err(ParseFontError::InvalidUri)?;
            Ok(Self::Uri(url))
        } else {
            Ok(Self::Asset(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(path) => write!(f, "{}", path.display()),
            Self::Uri(url) => write!(f, "{url}"),
        }
    }
}

/// How text is rendered while its font is not available yet.
///
/// This mirrors the CSS `font-display` descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
    #[default]
    Auto,
    Block,
    Swap,
    Fallback,
    Optional,
}

impl FontDisplay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Block => "block",
            Self::Swap => "swap",
            Self::Fallback => "fallback",
            Self::Optional => "optional",
        }
    }
}

impl FromStr for FontDisplay {
    type Err = ParseFontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "auto" => Self::Auto,
            "block" => Self::Block,
            "swap" => Self::Swap,
            "fallback" => Self::Fallback,
            "optional" => Self::Optional,
            other => return Err(ParseFontError::InvalidDisplay(other.to_owned())),
        })
    }
}

impl fmt::Display for FontDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to load a font family.
///
/// All fields are load parameters, and are all part of the cache key derived from the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontRequest {
    pub family: String,
    pub src: FontSource,
    #[serde(default)]
    pub display: FontDisplay,
}

impl FontRequest {
    pub fn new(family: impl Into<String>, src: FontSource) -> Self {
        Self {
            family: family.into(),
            src,
            display: FontDisplay::default(),
        }
    }
}

/// Parses `FAMILY=SOURCE` or `FAMILY/DISPLAY=SOURCE`.
impl FromStr for FontRequest {
    type Err = ParseFontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, src) = s.split_once('=').ok_or(ParseFontError::MissingSource)?;
        let (family, display) = match family.split_once('/') {
            Some((family, display)) => (family, display.parse()?),
            None => (family, FontDisplay::default()),
        };
        if family.is_empty() {
            return Err(ParseFontError::MissingFamily);
        }

        Ok(Self {
            family: family.to_owned(),
            src: src.parse()?,
            display,
        })
    }
}

impl fmt::Display for FontRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}={}", self.family, self.display, self.src)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFontError {
    #[error("missing font family, expected `FAMILY=SOURCE`")]
    MissingFamily,
    #[error("missing font source, expected `FAMILY=SOURCE`")]
    MissingSource,
    #[error("invalid font uri: {0}")]
    InvalidUri(url::ParseError),
    #[error("invalid font display `{0}`")]
    InvalidDisplay(String),
}

/// The container format of a font file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    TrueType,
    OpenType,
    Collection,
    Woff,
    Woff2,
}

impl FontFormat {
    /// Detects the format from the signature at the start of the file.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let signature: [u8; 4] = data.get(..4)?.try_into().ok()?;
        Some(match &signature {
            b"\x00\x01\x00\x00" | b"true" => Self::TrueType,
            b"OTTO" => Self::OpenType,
            b"ttcf" => Self::Collection,
            b"wOFF" => Self::Woff,
            b"wOF2" => Self::Woff2,
            _ => return None,
        })
    }

    /// The conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TrueType => "ttf",
            Self::OpenType => "otf",
            Self::Collection => "ttc",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
        }
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The data of a successfully loaded font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFont {
    pub family: String,
    pub format: FontFormat,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request: FontRequest = "Inter=fonts/Inter-Regular.ttf".parse().unwrap();
        assert_eq!(
            request,
            FontRequest::new("Inter", FontSource::Asset("fonts/Inter-Regular.ttf".into()))
        );

        let request: FontRequest = "Inter/swap=https://example.com/Inter.woff2?v=2"
            .parse()
            .unwrap();
        assert_eq!(request.display, FontDisplay::Swap);
        assert_eq!(
            request.src,
            FontSource::Uri("https://example.com/Inter.woff2?v=2".parse().unwrap())
        );
        assert_eq!(
            request.to_string(),
            "Inter/swap=https://example.com/Inter.woff2?v=2"
        );
    }

    #[test]
    fn test_parse_request_errors() {
        assert_eq!(
            "Inter".parse::<FontRequest>(),
            Err(ParseFontError::MissingSource)
        );
        assert_eq!(
            "=Inter.ttf".parse::<FontRequest>(),
            Err(ParseFontError::MissingFamily)
        );
        assert_eq!(
            "Inter=".parse::<FontRequest>(),
            Err(ParseFontError::MissingSource)
        );
        assert_eq!(
            "Inter/italic=Inter.ttf".parse::<FontRequest>(),
            Err(ParseFontError::InvalidDisplay("italic".into()))
        );
        assert!(matches!(
            "Inter=http://[::1".parse::<FontRequest>(),
            Err(ParseFontError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_sniff() {
        assert_eq!(
            FontFormat::sniff(b"\x00\x01\x00\x00\x00\x0c"),
            Some(FontFormat::TrueType)
        );
        assert_eq!(FontFormat::sniff(b"OTTO...."), Some(FontFormat::OpenType));
        assert_eq!(FontFormat::sniff(b"wOF2"), Some(FontFormat::Woff2));
        assert_eq!(FontFormat::sniff(b"<html>"), None);
        assert_eq!(FontFormat::sniff(b"OT"), None);
    }
}
