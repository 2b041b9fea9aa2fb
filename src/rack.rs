use crate::html::{el, text, Element, Node};
use crate::manifest_client::{load_comic_manifest, load_root_manifest, ManifestSource};
use crate::models::{ComicEntry, ComicManifest};
use crate::reader::COMIC_PARAM;
use futures::future::join_all;
use log::{debug, error, info, warn};
use url::form_urlencoded;
use url::Url;

pub const READER_PAGE: &str = "reader.html";
pub const RACK_FAILED: &str = "Failed to load rack.";
pub const RACK_EMPTY: &str = "No comics in manifest.";
const PLACEHOLDER_COVER: &str =
    "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='400' height='600'/%3E";

/// How a card was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation<'a> {
    Click,
    /// A key name as reported by the keyboard event, e.g. `"Enter"` or `" "`.
    Key(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub cover: Option<String>,
    pub available: bool,
}

impl Card {
    /// A comic manifest without a page list cannot be opened.
    pub fn from_manifest(entry: &ComicEntry, manifest: ComicManifest) -> Self {
        let manifest = manifest.with_defaults(&entry.id);
        let available = manifest.pages.is_some();
        Self {
            cover: available.then(|| manifest.cover_url(&entry.path)),
            id: manifest.id,
            title: Some(manifest.title),
            subtitle: manifest.subtitle,
            available,
        }
    }

    pub fn unavailable(entry: &ComicEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: None,
            subtitle: None,
            cover: None,
            available: false,
        }
    }

    /// Reader link relative to the rack page.
    pub fn href(&self) -> Option<String> {
        if !self.available {
            return None;
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(COMIC_PARAM, &self.id)
            .finish();
        Some(format!("{}?{}", READER_PAGE, query))
    }

    /// Where the browser goes when the card is activated, if anywhere.
    pub fn activate(&self, location: &Url, activation: Activation<'_>) -> Option<Url> {
        match activation {
            Activation::Click | Activation::Key("Enter") | Activation::Key(" ") => {}
            Activation::Key(_) => return None,
        }
        location.join(&self.href()?).ok()
    }

    pub fn to_element(&self) -> Element {
        let title = self.title.as_deref();
        let (class, label, subtitle) = if self.available {
            (
                "card",
                format!("Open {}", title.unwrap_or("Comic")),
                self.subtitle.clone().unwrap_or_default(),
            )
        } else {
            (
                "card card-unavailable",
                format!("Unavailable: {}", title.unwrap_or("Comic")),
                self.subtitle
                    .clone()
                    .unwrap_or_else(|| "Failed to load".to_string()),
            )
        };
        let href = self.href();

        let mut attrs = vec![
            ("class", class),
            ("role", "button"),
            ("tabindex", "0"),
            ("aria-label", label.as_str()),
        ];
        if let Some(href) = href.as_deref() {
            attrs.push(("data-href", href));
        }

        let alt = format!("{} cover", title.unwrap_or("Comic"));
        let cover = self.cover.as_deref().unwrap_or(PLACEHOLDER_COVER);

        el(
            "article",
            &attrs,
            vec![
                el(
                    "img",
                    &[("class", "cover"), ("src", cover), ("alt", alt.as_str()), ("loading", "lazy")],
                    vec![],
                )
                .into(),
                el(
                    "div",
                    &[("class", "card-meta")],
                    vec![
                        el(
                            "div",
                            &[("class", "card-title")],
                            vec![text(title.unwrap_or("Unavailable"))],
                        )
                        .into(),
                        el("div", &[("class", "card-sub")], vec![text(subtitle)]).into(),
                    ],
                )
                .into(),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RackView {
    /// The root manifest could not be loaded; offer a retry.
    Failed,
    Empty,
    Grid(Vec<Card>),
}

impl RackView {
    pub fn cards(&self) -> &[Card] {
        match self {
            RackView::Grid(cards) => cards,
            _ => &[],
        }
    }

    pub fn to_element(&self) -> Element {
        let children: Vec<Node> = match self {
            RackView::Failed => vec![el(
                "div",
                &[("class", "reader-error")],
                vec![
                    el("p", &[], vec![text(RACK_FAILED)]).into(),
                    el(
                        "button",
                        &[("class", "btn"), ("type", "button")],
                        vec![text("Retry")],
                    )
                    .into(),
                ],
            )
            .into()],
            RackView::Empty => {
                vec![el("p", &[("class", "reader-loading")], vec![text(RACK_EMPTY)]).into()]
            }
            RackView::Grid(cards) => cards.iter().map(|c| Node::from(c.to_element())).collect(),
        };
        el("section", &[("id", "rackGrid"), ("class", "rack-grid")], children)
    }

    pub fn render(&self) -> String {
        self.to_element().render()
    }
}

pub struct Rack<S> {
    source: S,
}

impl<S: ManifestSource> Rack<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Loads the whole rack. Calling it again is the retry.
    pub async fn init(&self) -> RackView {
        let root = match load_root_manifest(&self.source).await {
            Ok(root) => root,
            Err(e) => {
                error!("Failed to load root manifest: {}", e);
                return RackView::Failed;
            }
        };

        if root.comics.is_empty() {
            info!("Root manifest lists no comics");
            return RackView::Empty;
        }

        info!("Loading {} comics", root.comics.len());
        let manifests = join_all(
            root.comics
                .iter()
                .map(|entry| load_comic_manifest(&self.source, &entry.path)),
        )
        .await;

        let cards = root
            .comics
            .iter()
            .zip(manifests)
            .map(|(entry, result)| match result {
                Ok(manifest) => {
                    debug!("Loaded {} from {}", entry.id, entry.path);
                    Card::from_manifest(entry, manifest)
                }
                Err(e) => {
                    warn!("Comic {} unavailable: {}", entry.id, e);
                    Card::unavailable(entry)
                }
            })
            .collect();

        RackView::Grid(cards)
    }
}
