use crate::configuration::Settings;
use crate::models::manifest::{join_segments, ROOT_MANIFEST};
use crate::models::{ComicManifest, RootManifest};
use anyhow::Context;
use log::debug;
use reqwest::header::CACHE_CONTROL;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use resolve_path::PathResolveExt;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Where manifests are fetched from. Paths are relative to the site root.
#[allow(async_fn_in_trait)]
pub trait ManifestSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

pub async fn fetch_json<S, T>(source: &S, path: &str) -> Result<T, FetchError>
where
    S: ManifestSource,
    T: DeserializeOwned,
{
    let body = source.fetch(path).await?;
    Ok(serde_json::from_slice(&body)?)
}

pub async fn load_root_manifest<S: ManifestSource>(
    source: &S,
) -> Result<RootManifest, FetchError> {
    fetch_json(source, ROOT_MANIFEST).await
}

pub async fn load_comic_manifest<S: ManifestSource>(
    source: &S,
    comic_dir: &str,
) -> Result<ComicManifest, FetchError> {
    fetch_json(source, &comic_manifest_path(comic_dir)).await
}

pub fn comic_manifest_path(comic_dir: &str) -> String {
    join_segments(&[comic_dir, ROOT_MANIFEST])
}

pub struct HttpSource {
    base: Url,
    client: ClientWithMiddleware,
}

impl HttpSource {
    pub fn new(base: Url, retries: u32) -> Self {
        Self::with_client(base, reqwest::Client::new(), retries)
    }

    pub fn with_client(base: Url, client: reqwest::Client, retries: u32) -> Self {
        let mut builder = ClientBuilder::new(client);
        if retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }
        Self {
            base: directory_url(base),
            client: builder.build(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl ManifestSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.base.join(path.trim_start_matches('/'))?;
        debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Serves a site that lives in a local directory.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ManifestSource for DirSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let file = self.root.join(path.trim_start_matches('/'));
        debug!("Reading {}", file.display());
        match tokio::fs::read(&file).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::Status(404)),
            Err(e) => Err(e.into()),
        }
    }
}

/// The configured site, either remote or on disk.
pub enum SiteSource {
    Http(HttpSource),
    Dir(DirSource),
}

impl SiteSource {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let site = settings.site.as_str();
        if site.starts_with("http://") || site.starts_with("https://") {
            let base = Url::parse(site).with_context(|| format!("Invalid site URL {}", site))?;
            return Ok(SiteSource::Http(HttpSource::new(base, settings.fetch_retries)));
        }
        let path = settings.site.resolve().into_owned();
        let root = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(SiteSource::Dir(DirSource::new(root)))
    }

    /// URL of a page of the site, e.g. `index.html` or `reader.html`.
    pub fn page_url(&self, page: &str) -> anyhow::Result<Url> {
        match self {
            SiteSource::Http(http) => Ok(http.base().join(page)?),
            SiteSource::Dir(dir) => Url::from_file_path(dir.root.join(page))
                .map_err(|_| anyhow::anyhow!("{} is not an absolute path", dir.root.display())),
        }
    }
}

impl ManifestSource for SiteSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            SiteSource::Http(http) => http.fetch(path).await,
            SiteSource::Dir(dir) => dir.fetch(path).await,
        }
    }
}

fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
