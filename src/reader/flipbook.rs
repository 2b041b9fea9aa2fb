use super::layout::BookSize;
use log::debug;
use serde::Serialize;
use std::cell::Cell;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid book size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("{0}")]
    Widget(String),
}

/// Options in the shape the page-flip widget expects them.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlipOptions {
    pub width: u32,
    pub height: u32,
    pub size: &'static str,
    pub use_portrait: bool,
    pub show_cover: bool,
    pub mobile_scroll_support: bool,
    pub max_shadow_opacity: f32,
    pub flipping_time: u32,
    pub swipe_distance: u32,
    pub click_event_forward: bool,
    pub disable_flip_by_click: bool,
}

impl FlipOptions {
    pub fn fixed(size: BookSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            size: "fixed",
            use_portrait: true,
            show_cover: true,
            mobile_scroll_support: false,
            max_shadow_opacity: 0.35,
            flipping_time: 450,
            swipe_distance: 20,
            click_event_forward: true,
            disable_flip_by_click: false,
        }
    }
}

pub trait FlipBook {
    fn load_from_images(&mut self, urls: &[String]);

    /// `None` when the widget cannot report it yet.
    fn page_count(&self) -> Option<usize>;

    fn current_page_index(&self) -> Option<usize>;

    fn flip_next(&mut self);

    fn flip_prev(&mut self);

    fn destroy(&mut self) -> Result<(), BuildError>;
}

pub trait FlipBookFactory {
    type Book: FlipBook;

    fn create(&self, options: &FlipOptions) -> Result<Self::Book, BuildError>;
}

#[derive(Debug, Default)]
pub struct HeadlessBook {
    pages: Vec<String>,
    index: usize,
    destroyed: bool,
}

impl HeadlessBook {
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl FlipBook for HeadlessBook {
    fn load_from_images(&mut self, urls: &[String]) {
        self.pages = urls.to_vec();
        self.index = 0;
    }

    fn page_count(&self) -> Option<usize> {
        if self.pages.is_empty() {
            None
        } else {
            Some(self.pages.len())
        }
    }

    fn current_page_index(&self) -> Option<usize> {
        self.page_count().map(|_| self.index)
    }

    fn flip_next(&mut self) {
        if self.index + 1 < self.pages.len() {
            self.index += 1;
        }
    }

    fn flip_prev(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    fn destroy(&mut self) -> Result<(), BuildError> {
        if self.destroyed {
            return Err(BuildError::Widget("book already destroyed".into()));
        }
        self.destroyed = true;
        self.pages.clear();
        Ok(())
    }
}

/// Creates [`HeadlessBook`]s and counts how many were built.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    built: Cell<usize>,
}

impl HeadlessFactory {
    pub fn built(&self) -> usize {
        self.built.get()
    }
}

impl FlipBookFactory for HeadlessFactory {
    type Book = HeadlessBook;

    fn create(&self, options: &FlipOptions) -> Result<HeadlessBook, BuildError> {
        if options.width == 0 || options.height == 0 {
            return Err(BuildError::InvalidSize {
                width: options.width,
                height: options.height,
            });
        }
        self.built.set(self.built.get() + 1);
        debug!("Building book {}x{}", options.width, options.height);
        Ok(HeadlessBook::default())
    }
}
