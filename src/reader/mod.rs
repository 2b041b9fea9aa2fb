pub mod flipbook;
pub mod layout;
pub mod resize;

pub use flipbook::{
    BuildError, FlipBook, FlipBookFactory, FlipOptions, HeadlessBook, HeadlessFactory,
};
pub use layout::{compute_size, BookSize, Viewport};
pub use resize::{ResizeDebouncer, RESIZE_DEBOUNCE, RESIZE_THRESHOLD};

use crate::html::{el, text, Element};
use crate::manifest_client::{load_comic_manifest, ManifestSource};
use crate::models::manifest::join_segments;
use crate::models::{ComicManifest, PageEntry, ResolvedPage};
use log::{debug, error, info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use url::Url;

pub const RACK_PAGE: &str = "index.html";
pub const COMIC_PARAM: &str = "comic";
pub const COMICS_DIR: &str = "comics";
pub const DEFAULT_COMIC_ID: &str = "demo";

/// How the reader turns `?comic=<id>` into a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum ComicLookup {
    /// Fetch `comics/<id>/manifest.json`. The id is required.
    Manifest,
    /// Pick from comics configured up front. The id defaults to `demo` and
    /// unknown ids fall back to the first comic.
    Static(Vec<ComicManifest>),
}

/// The comic bundled with the static reader when nothing else is configured.
pub fn demo_comic() -> ComicManifest {
    ComicManifest {
        id: DEFAULT_COMIC_ID.to_string(),
        title: "Demo Comic".to_string(),
        subtitle: None,
        cover: Some("comics/demo/cover.png".to_string()),
        pages: Some(
            ["01.png", "02.png", "03.png", "04.png", "05.png"]
                .into_iter()
                .map(|p| PageEntry::File(p.to_string()))
                .collect(),
        ),
        page_dir: Some("comics/demo/pages".to_string()),
        aspect: None,
        theme: None,
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Missing comic ID")]
    MissingId,
    #[error("Comic not found: {0}")]
    NotFound(String),
    #[error("Failed to load comic ({0})")]
    Fetch(String),
    #[error("This comic has no pages.")]
    NoPages,
    #[error("Failed to build reader: {0}")]
    Build(String),
}

impl ReaderError {
    pub fn to_element(&self) -> Element {
        el(
            "div",
            &[("class", "reader-error")],
            vec![
                el("p", &[], vec![text(self.to_string())]).into(),
                el(
                    "a",
                    &[("class", "btn"), ("href", RACK_PAGE)],
                    vec![text("Back to rack")],
                )
                .into(),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderState {
    Loading,
    Error(ReaderError),
    Ready,
}

/// What the reader chrome shows around the book.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ReaderUi {
    pub comic_name: String,
    pub comic_meta: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub caption: Option<String>,
    pub hint_visible: bool,
    pub frame: Option<BookSize>,
    pub theme: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ReaderSnapshot<'a> {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comic: Option<&'a str>,
    pub ui: &'a ReaderUi,
    pub pages: &'a [ResolvedPage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'a FlipOptions>,
    pub rebuilds: usize,
}

struct LoadedComic {
    id: String,
    manifest: ComicManifest,
    pages: Vec<ResolvedPage>,
}

pub struct Reader<S, F: FlipBookFactory> {
    source: S,
    factory: F,
    lookup: ComicLookup,
    state: ReaderState,
    comic: Option<LoadedComic>,
    book: Option<F::Book>,
    options: Option<FlipOptions>,
    ui: ReaderUi,
    resize: ResizeDebouncer,
    rebuilds: usize,
}

/// The non-empty `comic` query parameter of a reader URL.
pub fn comic_id(location: &Url) -> Option<String> {
    location
        .query_pairs()
        .find(|(k, _)| k == COMIC_PARAM)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Ids name a single directory under `comics/`
fn is_plain_id(id: &str) -> bool {
    id != "." && id != ".." && !id.contains(['/', '\\'])
}

impl<S, F> Reader<S, F>
where
    S: ManifestSource,
    F: FlipBookFactory,
{
    pub fn new(source: S, factory: F, lookup: ComicLookup) -> Self {
        Self {
            source,
            factory,
            lookup,
            state: ReaderState::Loading,
            comic: None,
            book: None,
            options: None,
            ui: ReaderUi::default(),
            resize: ResizeDebouncer::new(0.0),
            rebuilds: 0,
        }
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ReaderState::Ready)
    }

    pub fn ui(&self) -> &ReaderUi {
        &self.ui
    }

    pub fn pages(&self) -> &[ResolvedPage] {
        self.comic.as_ref().map_or(&[][..], |c| c.pages.as_slice())
    }

    pub fn book(&self) -> Option<&F::Book> {
        self.book.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Number of rebuilds caused by viewport changes.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub async fn open(&mut self, location: &Url, viewport: Viewport) -> &ReaderState {
        self.state = ReaderState::Loading;
        self.teardown();
        self.comic = None;
        self.options = None;
        info!("Opening {}", location);

        match self.resolve(location).await {
            Ok(comic) => {
                info!(
                    "Loaded \"{}\" ({} pages)",
                    comic.manifest.title,
                    comic.pages.len()
                );
                self.ui = ReaderUi {
                    comic_name: comic.manifest.title.clone(),
                    comic_meta: format!("{} pages", comic.pages.len()),
                    hint_visible: true,
                    theme: comic.manifest.theme.clone(),
                    ..Default::default()
                };
                self.comic = Some(comic);
                self.resize = ResizeDebouncer::new(viewport.width);
                match self.build(viewport) {
                    Ok(()) => self.state = ReaderState::Ready,
                    Err(e) => self.fail(e),
                }
            }
            Err(e) => self.fail(e),
        }

        &self.state
    }

    async fn resolve(&self, location: &Url) -> Result<LoadedComic, ReaderError> {
        let requested = comic_id(location);

        let (id, manifest, comic_dir) = match &self.lookup {
            ComicLookup::Manifest => {
                let id = requested.ok_or(ReaderError::MissingId)?;
                if !is_plain_id(&id) {
                    warn!("Rejecting comic id {:?}", id);
                    return Err(ReaderError::NotFound(id));
                }
                let comic_dir = join_segments(&[COMICS_DIR, &id]);
                let manifest = load_comic_manifest(&self.source, &comic_dir)
                    .await
                    .map_err(|e| {
                        if e.is_not_found() {
                            ReaderError::NotFound(id.clone())
                        } else {
                            ReaderError::Fetch(e.to_string())
                        }
                    })?;
                let manifest = manifest.with_defaults(&id);
                (id, manifest, comic_dir)
            }
            ComicLookup::Static(comics) => {
                let id = requested.unwrap_or_else(|| DEFAULT_COMIC_ID.to_string());
                let manifest = comics
                    .iter()
                    .find(|c| c.id == id)
                    .or_else(|| comics.first())
                    .cloned()
                    .ok_or_else(|| ReaderError::NotFound(id.clone()))?
                    .with_defaults(&id);
                (manifest.id.clone(), manifest, String::new())
            }
        };

        if manifest.page_count() == 0 {
            return Err(ReaderError::NoPages);
        }
        let pages = manifest.resolve_pages(&comic_dir);
        debug!("Comic {} resolved {} page URLs", id, pages.len());

        Ok(LoadedComic {
            id,
            manifest,
            pages,
        })
    }

    fn fail(&mut self, err: ReaderError) {
        error!("Reader error: {}", err);
        self.teardown();
        self.state = ReaderState::Error(err);
    }

    fn teardown(&mut self) {
        if let Some(mut book) = self.book.take() {
            if let Err(e) = book.destroy() {
                warn!("Failed to destroy book: {}", e);
            }
        }
    }

    /// Builds a fresh book sized for `viewport`, replacing any existing one.
    fn build(&mut self, viewport: Viewport) -> Result<(), ReaderError> {
        let Some(comic) = &self.comic else {
            return Err(ReaderError::Build("no comic loaded".into()));
        };
        let size = compute_size(&viewport, comic.manifest.aspect());
        let urls: Vec<String> = comic.pages.iter().map(|p| p.url.clone()).collect();

        self.teardown();

        let options = FlipOptions::fixed(size);
        let mut book = self
            .factory
            .create(&options)
            .map_err(|e| ReaderError::Build(e.to_string()))?;
        book.load_from_images(&urls);

        self.book = Some(book);
        self.options = Some(options);
        self.ui.frame = Some(size);
        self.sync_nav();
        Ok(())
    }

    fn sync_nav(&mut self) {
        let (Some(book), Some(comic)) = (&self.book, &self.comic) else {
            return;
        };
        let count = book.page_count().unwrap_or(comic.pages.len());
        let index = book.current_page_index().unwrap_or(0);

        self.ui.prev_enabled = index > 0;
        self.ui.next_enabled = index + 1 < count;
        self.ui.comic_meta = format!("Page {} / {}", index + 1, count);
        self.ui.caption = comic.pages.get(index).and_then(|p| p.headline.clone());
    }

    pub fn flip_next(&mut self) {
        if let Some(book) = self.book.as_mut() {
            book.flip_next();
        }
        self.on_flip();
    }

    pub fn flip_prev(&mut self) {
        if let Some(book) = self.book.as_mut() {
            book.flip_prev();
        }
        self.on_flip();
    }

    /// Called whenever the book turns a page, including swipes.
    pub fn on_flip(&mut self) {
        self.sync_nav();
    }

    pub fn pointer_down(&mut self) {
        self.ui.hint_visible = false;
    }

    /// Feeds a viewport change into the debouncer. Returns whether it was accepted.
    pub fn on_resize(&mut self, viewport: Viewport, now: Instant) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.resize.observe(viewport, now)
    }

    /// Rebuilds the book if a debounced resize is due.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        let Some(viewport) = self.resize.fire(now) else {
            return false;
        };
        if !self.is_ready() {
            return false;
        }
        info!("Rebuilding book for {}px viewport", viewport.width);
        match self.build(viewport) {
            Ok(()) => {
                self.rebuilds += 1;
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Drives resizes from a stream of viewport events until the sender is dropped.
    pub async fn run_resizes(&mut self, mut events: mpsc::Receiver<Viewport>) {
        loop {
            let deadline = self.resize.deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(viewport) => {
                        self.on_resize(viewport, Instant::now());
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.poll_resize(Instant::now());
                }
            }
        }

        if let Some(deadline) = self.resize.deadline() {
            sleep_until(deadline).await;
            self.poll_resize(Instant::now());
        }
    }

    pub fn snapshot(&self) -> ReaderSnapshot<'_> {
        let (state, error) = match &self.state {
            ReaderState::Loading => ("loading", None),
            ReaderState::Error(e) => ("error", Some(e.to_string())),
            ReaderState::Ready => ("ready", None),
        };
        ReaderSnapshot {
            state,
            error,
            comic: self.comic.as_ref().map(|c| c.id.as_str()),
            ui: &self.ui,
            pages: self.pages(),
            options: self.options.as_ref(),
            rebuilds: self.rebuilds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySource;
    use std::time::Duration;

    const MOTHS: &str = r#"{
        "title": "Moths",
        "pageDir": "pages",
        "theme": "night",
        "pages": ["01.png", {"src": "02.png", "headline": "The porch light"}, "03.png"]
    }"#;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn reader(source: MemorySource) -> Reader<MemorySource, HeadlessFactory> {
        Reader::new(source, HeadlessFactory::default(), ComicLookup::Manifest)
    }

    async fn ready_reader(width: f64) -> Reader<MemorySource, HeadlessFactory> {
        let source = MemorySource::default().with("comics/moths/manifest.json", MOTHS);
        let mut r = reader(source);
        r.open(
            &url("https://example.com/reader.html?comic=moths"),
            Viewport::new(width, 1000.0),
        )
        .await;
        assert!(r.is_ready());
        r
    }

    struct BrokenFactory;

    impl FlipBookFactory for BrokenFactory {
        type Book = HeadlessBook;

        fn create(&self, _: &FlipOptions) -> Result<HeadlessBook, BuildError> {
            Err(BuildError::Widget("canvas unavailable".into()))
        }
    }

    // A book that never knows its page count or position
    struct QuietBook;

    impl FlipBook for QuietBook {
        fn load_from_images(&mut self, _: &[String]) {}

        fn page_count(&self) -> Option<usize> {
            None
        }

        fn current_page_index(&self) -> Option<usize> {
            None
        }

        fn flip_next(&mut self) {}

        fn flip_prev(&mut self) {}

        fn destroy(&mut self) -> Result<(), BuildError> {
            Ok(())
        }
    }

    struct QuietFactory;

    impl FlipBookFactory for QuietFactory {
        type Book = QuietBook;

        fn create(&self, _: &FlipOptions) -> Result<QuietBook, BuildError> {
            Ok(QuietBook)
        }
    }

    #[test]
    fn reads_comic_id_from_query() {
        assert_eq!(
            Some("moths".to_string()),
            comic_id(&url("https://x.test/reader.html?page=2&comic=moths"))
        );
        assert_eq!(None, comic_id(&url("https://x.test/reader.html?comic=")));
        assert_eq!(None, comic_id(&url("https://x.test/reader.html")));
    }

    #[tokio::test]
    async fn missing_id_never_fetches() {
        let mut r = reader(MemorySource::default());
        let state = r
            .open(&url("https://example.com/reader.html"), Viewport::new(400.0, 800.0))
            .await;
        assert_eq!(&ReaderState::Error(ReaderError::MissingId), state);
        assert!(r.source.requests().is_empty());
        assert_eq!(0, r.factory().built());
    }

    #[tokio::test]
    async fn unknown_comic_is_not_found() {
        let mut r = reader(MemorySource::default());
        r.open(
            &url("https://example.com/reader.html?comic=ghost"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        assert_eq!(
            &ReaderState::Error(ReaderError::NotFound("ghost".into())),
            r.state()
        );
        assert_eq!(vec!["comics/ghost/manifest.json"], r.source.requests());
    }

    #[tokio::test]
    async fn path_like_ids_are_not_found_without_fetching() {
        for id in ["..", "../../secret", "a/b", "a%5Cb"] {
            let mut r = reader(MemorySource::default());
            let location = url(&format!("https://example.com/reader.html?comic={}", id));
            r.open(&location, Viewport::new(400.0, 800.0)).await;
            match r.state() {
                ReaderState::Error(ReaderError::NotFound(_)) => {}
                other => panic!("unexpected state {:?} for {}", other, id),
            }
            assert!(r.source.requests().is_empty());
        }
    }

    #[tokio::test]
    async fn server_error_reports_status() {
        let source = MemorySource::default().failing("comics/moths/manifest.json", 500);
        let mut r = reader(source);
        r.open(
            &url("https://example.com/reader.html?comic=moths"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        match r.state() {
            ReaderState::Error(e) => assert_eq!("Failed to load comic (HTTP 500)", e.to_string()),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn comic_without_pages_is_an_error() {
        for body in [r#"{"title": "Blank", "pages": []}"#, r#"{"title": "Blank"}"#] {
            let source = MemorySource::default().with("comics/blank/manifest.json", body);
            let mut r = reader(source);
            r.open(
                &url("https://example.com/reader.html?comic=blank"),
                Viewport::new(400.0, 800.0),
            )
            .await;
            assert_eq!(&ReaderState::Error(ReaderError::NoPages), r.state());
            assert!(r.book().is_none());
        }
    }

    #[tokio::test]
    async fn widget_failure_is_a_build_error() {
        let source = MemorySource::default().with("comics/moths/manifest.json", MOTHS);
        let mut r = Reader::new(source, BrokenFactory, ComicLookup::Manifest);
        r.open(
            &url("https://example.com/reader.html?comic=moths"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        assert_eq!(
            &ReaderState::Error(ReaderError::Build("canvas unavailable".into())),
            r.state()
        );
        assert_eq!("3 pages", r.ui().comic_meta);
        assert_eq!("Moths", r.ui().comic_name);
    }

    #[tokio::test]
    async fn navigation_falls_back_when_book_cannot_report() {
        let source = MemorySource::default().with("comics/moths/manifest.json", MOTHS);
        let mut r = Reader::new(source, QuietFactory, ComicLookup::Manifest);
        r.open(
            &url("https://example.com/reader.html?comic=moths"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        assert!(r.is_ready());

        let ui = r.ui();
        assert_eq!("Page 1 / 3", ui.comic_meta);
        assert!(!ui.prev_enabled);
        assert!(ui.next_enabled);
        assert_eq!(None, ui.caption);

        r.flip_next();
        assert_eq!("Page 1 / 3", r.ui().comic_meta);
    }

    #[tokio::test]
    async fn ready_reader_syncs_navigation() {
        let mut r = ready_reader(1000.0).await;

        let pages: Vec<&str> = r.pages().iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            vec![
                "/comics/moths/pages/01.png",
                "/comics/moths/pages/02.png",
                "/comics/moths/pages/03.png"
            ],
            pages
        );
        assert_eq!(3, r.book().unwrap().pages().len());

        let ui = r.ui();
        assert_eq!("Moths", ui.comic_name);
        assert_eq!("Page 1 / 3", ui.comic_meta);
        assert!(!ui.prev_enabled);
        assert!(ui.next_enabled);
        assert_eq!(None, ui.caption);
        assert_eq!(Some("night".to_string()), ui.theme);
        assert_eq!(Some(BookSize { width: 520, height: 780 }), ui.frame);

        r.flip_next();
        assert_eq!("Page 2 / 3", r.ui().comic_meta);
        assert_eq!(Some("The porch light".to_string()), r.ui().caption);
        assert!(r.ui().prev_enabled);

        r.flip_next();
        assert!(!r.ui().next_enabled);
        r.flip_next();
        assert_eq!("Page 3 / 3", r.ui().comic_meta);

        r.flip_prev();
        assert_eq!("Page 2 / 3", r.ui().comic_meta);
    }

    #[tokio::test]
    async fn hint_hides_on_first_pointer_down() {
        let mut r = ready_reader(400.0).await;
        assert!(r.ui().hint_visible);
        r.pointer_down();
        assert!(!r.ui().hint_visible);
    }

    #[tokio::test]
    async fn static_lookup_defaults_to_demo() {
        let mut r = Reader::new(
            MemorySource::default(),
            HeadlessFactory::default(),
            ComicLookup::Static(vec![demo_comic()]),
        );
        r.open(&url("https://example.com/reader.html"), Viewport::new(400.0, 800.0))
            .await;
        assert!(r.is_ready());
        assert_eq!("Demo Comic", r.ui().comic_name);
        assert_eq!("/comics/demo/pages/01.png", r.pages()[0].url);
        assert!(r.source.requests().is_empty());
    }

    #[tokio::test]
    async fn static_lookup_falls_back_to_first_comic() {
        let mut other = demo_comic();
        other.id = "other".into();
        other.title = "Other".into();
        let mut r = Reader::new(
            MemorySource::default(),
            HeadlessFactory::default(),
            ComicLookup::Static(vec![demo_comic(), other]),
        );

        r.open(
            &url("https://example.com/reader.html?comic=other"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        assert_eq!("Other", r.ui().comic_name);

        r.open(
            &url("https://example.com/reader.html?comic=nope"),
            Viewport::new(400.0, 800.0),
        )
        .await;
        assert_eq!("Demo Comic", r.ui().comic_name);
        assert_eq!(Some("demo"), r.snapshot().comic);
    }

    #[tokio::test]
    async fn small_resize_does_not_rebuild() {
        let mut r = ready_reader(400.0).await;
        let now = Instant::now();
        assert!(!r.on_resize(Viewport::new(409.0, 1000.0), now));
        assert!(!r.poll_resize(now + Duration::from_secs(1)));
        assert_eq!(0, r.rebuilds());
        assert_eq!(1, r.factory().built());
    }

    #[tokio::test]
    async fn debounced_resize_rebuilds_once_with_last_width() {
        let mut r = ready_reader(400.0).await;
        let now = Instant::now();
        assert!(r.on_resize(Viewport::new(450.0, 1000.0), now));
        assert!(r.on_resize(
            Viewport::new(480.0, 1000.0),
            now + Duration::from_millis(50)
        ));
        assert!(!r.poll_resize(now + Duration::from_millis(150)));
        assert!(r.poll_resize(now + Duration::from_millis(200)));

        assert_eq!(1, r.rebuilds());
        assert_eq!(2, r.factory().built());
        assert_eq!(Some(BookSize { width: 456, height: 684 }), r.ui().frame);
        assert!(r.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn resize_loop_collapses_bursts() {
        let mut r = ready_reader(400.0).await;
        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            for width in [405.0, 450.0, 480.0] {
                tx.send(Viewport::new(width, 1000.0)).await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(Viewport::new(700.0, 1000.0)).await.unwrap();
        });

        r.run_resizes(rx).await;

        assert_eq!(2, r.rebuilds());
        assert_eq!(Some(BookSize { width: 520, height: 780 }), r.ui().frame);
        assert_eq!("Page 1 / 3", r.ui().comic_meta);
    }

    #[tokio::test]
    async fn rebuild_resets_to_fresh_book() {
        let mut r = ready_reader(400.0).await;
        r.flip_next();
        let now = Instant::now();
        r.on_resize(Viewport::new(600.0, 1000.0), now);
        assert!(r.poll_resize(now + RESIZE_DEBOUNCE));
        assert_eq!("Page 1 / 3", r.ui().comic_meta);
        assert!(!r.book().unwrap().is_destroyed());
    }

    #[test]
    fn error_view_links_back_to_rack() {
        let html = ReaderError::NotFound("ghost".into()).to_element().render();
        assert_eq!(
            r#"<div class="reader-error"><p>Comic not found: ghost</p><a class="btn" href="index.html">Back to rack</a></div>"#,
            html
        );
    }

    #[tokio::test]
    async fn snapshot_serializes_state() {
        let r = ready_reader(1000.0).await;
        let json = serde_json::to_value(r.snapshot()).unwrap();
        assert_eq!("ready", json["state"]);
        assert_eq!("moths", json["comic"]);
        assert_eq!(520, json["options"]["width"]);
        assert_eq!("Page 1 / 3", json["ui"]["comic_meta"]);
        assert!(json.get("error").is_none());
    }
}
