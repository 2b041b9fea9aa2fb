use serde::{Deserialize, Serialize};
use url::Url;

pub const ROOT_MANIFEST: &str = "manifest.json";
pub const DEFAULT_COVER: &str = "cover.png";
/// Page height divided by page width.
pub const DEFAULT_ASPECT: f64 = 1.5;

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
pub struct RootManifest {
    #[serde(default)]
    pub comics: Vec<ComicEntry>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ComicEntry {
    pub id: String,
    pub path: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ComicManifest {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub cover: Option<String>,
    pub pages: Option<Vec<PageEntry>>,
    #[serde(rename = "pageDir", alias = "pagedir", alias = "page_dir")]
    pub page_dir: Option<String>,
    pub aspect: Option<f64>,
    pub theme: Option<String>,
}

/// A page is either a bare file name or an object carrying a caption.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PageEntry {
    File(String),
    Detailed {
        src: String,
        headline: Option<String>,
    },
}

impl PageEntry {
    pub fn src(&self) -> &str {
        match self {
            PageEntry::File(src) => src,
            PageEntry::Detailed { src, .. } => src,
        }
    }

    pub fn headline(&self) -> Option<&str> {
        match self {
            PageEntry::File(_) => None,
            PageEntry::Detailed { headline, .. } => headline.as_deref(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

impl ComicManifest {
    /// Fills the fields a comic manifest may leave to its rack entry.
    pub fn with_defaults(mut self, entry_id: &str) -> Self {
        if self.id.is_empty() {
            self.id = entry_id.to_string();
        }
        if self.cover.as_deref().map_or(true, str::is_empty) {
            self.cover = Some(DEFAULT_COVER.to_string());
        }
        self
    }

    pub fn aspect(&self) -> f64 {
        match self.aspect {
            Some(a) if a.is_finite() && a > 0.0 => a,
            _ => DEFAULT_ASPECT,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.as_ref().map_or(0, Vec::len)
    }

    pub fn cover_url(&self, comic_dir: &str) -> String {
        join_segments(&[comic_dir, self.cover.as_deref().unwrap_or(DEFAULT_COVER)])
    }

    /// Resolves every page to a root-absolute URL under `comic_dir` and `pageDir`.
    pub fn resolve_pages(&self, comic_dir: &str) -> Vec<ResolvedPage> {
        let page_dir = self.page_dir.as_deref().unwrap_or("");
        self.pages
            .iter()
            .flatten()
            .map(|page| ResolvedPage {
                url: resolve_page_url(comic_dir, page_dir, page.src()),
                headline: page.headline().map(str::to_string),
            })
            .collect()
    }
}

fn resolve_page_url(comic_dir: &str, page_dir: &str, src: &str) -> String {
    if is_absolute_url(src) {
        return src.to_string();
    }
    if src.starts_with('/') {
        return format!("/{}", join_segments(&[src]));
    }
    format!("/{}", join_segments(&[comic_dir, page_dir, src]))
}

fn is_absolute_url(src: &str) -> bool {
    if src.starts_with("//") {
        return true;
    }
    Url::parse(src).map_or(false, |u| matches!(u.scheme(), "http" | "https" | "data"))
}

/// Joins path segments with a single `/`, dropping empty and `.` parts.
pub fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
