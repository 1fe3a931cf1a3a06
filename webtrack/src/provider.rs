//! Remote tile retrieval.
//!
//! The [`TileStore`](crate::TileStore) asks a [`TileProvider`] for tiles it
//! cannot find locally. The provider returns the raw payload together with
//! its [`RasterFormat`]; GeoTIFF payloads go through a [`RasterConverter`]
//! before they are cached.
//!
//! With the `download` feature, [`HttpTileProvider`] fetches zipped tiles
//! from the NASA Earthdata servers. Earthdata answers with a chain of
//! redirects through its login host, and credentials must only travel along
//! that chain (see [`keep_auth_header`]).

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::dataset::{Dataset, RasterFormat};
use crate::error::{Result, WebTrackError};
use crate::tilename::TileKey;

/// Host of the Earthdata login service.
pub const EARTHDATA_AUTH_HOST: &str = "urs.earthdata.nasa.gov";

/// A payload returned by a [`TileProvider`].
#[derive(Debug, Clone)]
pub struct FetchedTile {
    /// Unpacked payload.
    pub bytes: Vec<u8>,
    /// How `bytes` is encoded.
    pub format: RasterFormat,
}

/// Source of tiles missing from the local disk cache.
pub trait TileProvider: Send + Sync {
    /// Fetch the tile identified by `key` from `dataset`.
    ///
    /// Returns [`WebTrackError::TileNotFound`] when the server definitively
    /// has no such tile (e.g. an ocean cell).
    fn fetch(&self, key: &TileKey, dataset: Dataset) -> Result<FetchedTile>;
}

/// Converts a GeoTIFF payload into a raw big-endian 16-bit grid.
pub trait RasterConverter: Send + Sync {
    fn convert(&self, key: &TileKey, geotiff: &[u8]) -> Result<Vec<u8>>;
}

/// Whether the `Authorization` header survives a redirect.
///
/// Credentials are kept when the redirect targets the login host, comes from
/// the login host, or stays on the same host.
///
/// # Examples
///
/// ```
/// use webtrack::provider::{keep_auth_header, EARTHDATA_AUTH_HOST};
///
/// assert!(keep_auth_header("e4ftl01.cr.usgs.gov", EARTHDATA_AUTH_HOST, EARTHDATA_AUTH_HOST));
/// assert!(!keep_auth_header("e4ftl01.cr.usgs.gov", "example.com", EARTHDATA_AUTH_HOST));
/// ```
pub fn keep_auth_header(original_host: &str, redirect_host: &str, auth_host: &str) -> bool {
    redirect_host == auth_host || original_host == auth_host || original_host == redirect_host
}

/// Unpack the first entry of a zip archive held in memory.
pub fn extract_first_entry(data: &[u8], file_name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    if archive.len() == 0 {
        return Err(WebTrackError::DownloadFailed {
            file_name: file_name.to_string(),
            reason: "empty ZIP archive".to_string(),
        });
    }

    let mut entry = archive.by_index(0)?;
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut contents)?;
    Ok(contents)
}

#[cfg(feature = "download")]
pub use http::{Credentials, DownloadConfig, HttpTileProvider};

#[cfg(feature = "download")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::{Client, Response};
    use reqwest::header::LOCATION;
    use reqwest::{redirect, StatusCode, Url};
    use tracing::{debug, info};

    use super::*;

    /// Default timeout for HTTP requests in seconds.
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Earthdata sends three hops; anything much longer is a loop.
    const DEFAULT_MAX_REDIRECTS: usize = 10;

    /// Earthdata account.
    #[derive(Clone)]
    pub struct Credentials {
        pub username: String,
        pub password: String,
    }

    impl std::fmt::Debug for Credentials {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Credentials")
                .field("username", &self.username)
                .finish_non_exhaustive()
        }
    }

    /// Configuration for [`HttpTileProvider`].
    #[derive(Debug, Clone)]
    pub struct DownloadConfig {
        /// Earthdata account, sent as HTTP basic auth.
        pub credentials: Option<Credentials>,
        /// Request timeout in seconds.
        pub timeout_secs: u64,
        /// Longest redirect chain followed.
        pub max_redirects: usize,
    }

    impl Default for DownloadConfig {
        fn default() -> Self {
            Self {
                credentials: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                max_redirects: DEFAULT_MAX_REDIRECTS,
            }
        }
    }

    impl DownloadConfig {
        /// Configuration authenticating against NASA Earthdata.
        ///
        /// Requires an account: <https://urs.earthdata.nasa.gov/>
        pub fn earthdata(username: impl Into<String>, password: impl Into<String>) -> Self {
            Self {
                credentials: Some(Credentials {
                    username: username.into(),
                    password: password.into(),
                }),
                ..Default::default()
            }
        }

        /// Set the request timeout.
        pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
            self.timeout_secs = timeout_secs;
            self
        }
    }

    /// Blocking HTTP provider for the Earthdata-hosted datasets.
    ///
    /// Redirects are followed by hand so that [`keep_auth_header`] decides
    /// at every hop whether credentials are forwarded. Cookies set by the
    /// login host are kept for the rest of the chain. There are no retries.
    pub struct HttpTileProvider {
        client: Client,
        config: DownloadConfig,
    }

    impl HttpTileProvider {
        /// Create a new provider with the given configuration.
        pub fn new(config: DownloadConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .redirect(redirect::Policy::none())
                .cookie_store(true)
                .build()
                .map_err(|e| WebTrackError::DownloadFailed {
                    file_name: String::new(),
                    reason: format!("Failed to create HTTP client: {}", e),
                })?;

            Ok(Self { client, config })
        }

        fn get(&self, url: &str, file_name: &str) -> Result<Response> {
            let failed = |reason: String| WebTrackError::DownloadFailed {
                file_name: file_name.to_string(),
                reason,
            };

            let mut url = Url::parse(url).map_err(|e| failed(e.to_string()))?;
            let mut send_auth = true;

            for _ in 0..=self.config.max_redirects {
                let mut request = self.client.get(url.clone());
                if let (true, Some(credentials)) = (send_auth, &self.config.credentials) {
                    request =
                        request.basic_auth(&credentials.username, Some(&credentials.password));
                }

                let response = request.send()?;
                if !response.status().is_redirection() {
                    return Ok(response);
                }

                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| failed("redirect without Location header".to_string()))?;
                let next = url.join(location).map_err(|e| failed(e.to_string()))?;

                send_auth = send_auth
                    && keep_auth_header(
                        url.host_str().unwrap_or_default(),
                        next.host_str().unwrap_or_default(),
                        EARTHDATA_AUTH_HOST,
                    );
                debug!(from = %url, to = %next, send_auth, "following redirect");
                url = next;
            }

            Err(failed(format!(
                "more than {} redirects",
                self.config.max_redirects
            )))
        }
    }

    impl TileProvider for HttpTileProvider {
        fn fetch(&self, key: &TileKey, dataset: Dataset) -> Result<FetchedTile> {
            let file_name = key.file_name();
            let url = dataset
                .url(key.name())
                .ok_or_else(|| WebTrackError::DownloadFailed {
                    file_name: file_name.clone(),
                    reason: format!("{} is not served remotely", dataset),
                })?;

            info!(%url, "downloading tile");
            let response = self.get(&url, &file_name)?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::NOT_FOUND => return Err(WebTrackError::TileNotFound { file_name }),
                status => {
                    return Err(WebTrackError::DownloadFailed {
                        file_name,
                        reason: format!("HTTP {}", status),
                    })
                }
            }

            let bytes = response.bytes()?;
            Ok(FetchedTile {
                bytes: extract_first_entry(&bytes, &file_name)?,
                format: dataset.raster_format(),
            })
        }
    }

}
