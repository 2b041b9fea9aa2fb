use crate::models::ComicManifest;
use crate::reader::{demo_comic, ComicLookup, Viewport};
use config::{Config, ConfigError};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Settings {
    /// Site root: an `http(s)://` base URL or a local directory.
    pub site: String,
    pub fetch_retries: u32,
    #[serde(default)]
    pub reader: ReaderSettings,
    #[serde(default)]
    pub viewport: ViewportSettings,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReaderMode {
    #[default]
    Manifest,
    Static,
}

#[derive(Deserialize, Debug, Default)]
pub struct ReaderSettings {
    #[serde(default)]
    pub mode: ReaderMode,
    #[serde(default)]
    pub comics: Vec<ComicManifest>,
}

impl ReaderSettings {
    pub fn lookup(&self) -> ComicLookup {
        match self.mode {
            ReaderMode::Manifest => ComicLookup::Manifest,
            ReaderMode::Static if self.comics.is_empty() => ComicLookup::Static(vec![demo_comic()]),
            ReaderMode::Static => ComicLookup::Static(self.comics.clone()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ViewportSettings {
    pub width: f64,
    pub height: f64,
    pub topbar_height: Option<f64>,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
            topbar_height: None,
        }
    }
}

impl From<ViewportSettings> for Viewport {
    fn from(v: ViewportSettings) -> Self {
        let viewport = Viewport::new(v.width, v.height);
        match v.topbar_height {
            Some(h) => viewport.with_topbar(h),
            None => viewport,
        }
    }
}

impl Settings {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("fetch_retries", 0)?
            .add_source(config::File::with_name(config_file))
            .build()?;
        builder.try_deserialize()
    }
}
