//! Loads font data from bundled assets and remote font servers.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use suspense_cache::{InvalidKeyDerivation, Read, SuspendingCache};
use thiserror::Error;
use tokio::runtime::Handle;
use url::Url;

use crate::config::Fonts;
use crate::fonts::{FontFormat, FontRequest, FontSource, LoadedFont};

/// The user agent sent along with font downloads.
pub const USER_AGENT: &str = concat!("fontloader/", env!("CARGO_PKG_VERSION"));

/// The cache shared by everything that renders with fonts.
pub type FontCache = SuspendingCache<Arc<LoadedFont>, FontError>;

/// Creates the [`FontCache`] for a session, loading fonts on `runtime`.
pub fn font_cache(runtime: Handle) -> FontCache {
    FontCache::new("fonts", runtime)
}

/// The reason a font could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontError {
    /// The font does not exist at its source.
    #[error("not found")]
    NotFound,
    /// The source refused access to the font.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Downloading the font took too long.
    #[error("download timed out after {0:?}")]
    Timeout(Duration),
    /// Downloading the font failed for another reason, like a 5xx response or connection loss.
    #[error("download failed: {0}")]
    Download(String),
    /// The data is not a font in any supported format.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The font source can not be loaded from.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Reading a local font failed.
    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for FontError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Loads [`FontRequest`]s from their sources.
///
/// This is the loader behind the [`FontCache`]; use [`read`](Self::read) to go through the cache.
#[derive(Debug, Clone)]
pub struct FontLoader {
    client: Client,
    assets_dir: PathBuf,
    download_timeout: Duration,
}

impl FontLoader {
    pub fn new(config: &Fonts) -> Result<Self, reqwest::Error> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.download_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            assets_dir: config.assets_dir.clone().unwrap_or_default(),
            download_timeout: config.download_timeout,
        })
    }

    /// Reads the requested font from `cache`, loading it with this loader on first use.
    ///
    /// The cache key is derived from the complete request.
    pub fn read(
        &self,
        cache: &FontCache,
        request: &FontRequest,
    ) -> Result<Read<Arc<LoadedFont>, FontError>, InvalidKeyDerivation> {
        cache.read_with(request, || {
            let loader = self.clone();
            let request = request.clone();
            async move { loader.load(&request).await.map(Arc::new) }
        })
    }

    /// Loads the requested font, bypassing any cache.
    pub async fn load(&self, request: &FontRequest) -> Result<LoadedFont, FontError> {
        tracing::debug!(
            family = %request.family,
            src = %request.src,
            "Loading font",
        );

        let result = match &request.src {
            FontSource::Asset(path) => self.read_file(&self.assets_dir.join(path)).await,
            FontSource::Uri(url) => self.fetch(url).await,
        };

        let font = result.and_then(|data| {
            let format = FontFormat::sniff(&data)
                .ok_or_else(|| FontError::Malformed("unknown font signature".into()))?;
            Ok(LoadedFont {
                family: request.family.clone(),
                format,
                data,
            })
        });

        match &font {
            Ok(font) => tracing::debug!(
                family = %request.family,
                format = %font.format,
                size = font.data.len(),
                "Loaded font",
            ),
            Err(err) => tracing::debug!(
                error = err as &dyn std::error::Error,
                family = %request.family,
                src = %request.src,
                "Failed to load font",
            ),
        }

        font
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FontError> {
        match url.scheme() {
            "http" | "https" => self.download(url).await,
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FontError::Unsupported(format!("file uri `{url}`")))?;
                self.read_file(&path).await
            }
            scheme => Err(FontError::Unsupported(format!("uri scheme `{scheme}`"))),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes, FontError> {
        tracing::trace!("Reading font file {}", path.display());
        let data = tokio::fs::read(path).await?;
        Ok(data.into())
    }

    async fn download(&self, url: &Url) -> Result<Bytes, FontError> {
        tracing::debug!("Fetching font from `{}`", url);

        let response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|err| self.request_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(url, status));
        }

        response.bytes().await.map_err(|err| self.request_error(err))
    }

    fn request_error(&self, err: reqwest::Error) -> FontError {
        if err.is_timeout() {
            FontError::Timeout(self.download_timeout)
        } else {
            FontError::Download(err.to_string())
        }
    }
}

/// Infers the [`FontError`] from an unsuccessful HTTP status code.
fn status_error(url: &Url, status: StatusCode) -> FontError {
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED) {
        tracing::debug!("Insufficient permissions to download `{url}`: {status}");
        FontError::PermissionDenied(status.to_string())
    } else if status.is_client_error() {
        // If it's a client error, chances are it's a 404.
        tracing::debug!("Unexpected client error status code from `{url}`: {status}");
        FontError::NotFound
    } else {
        tracing::debug!("Unexpected status code from `{url}`: {status}");
        FontError::Download(status.to_string())
    }
}
