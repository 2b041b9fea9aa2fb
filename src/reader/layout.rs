use serde::Serialize;
use std::str::FromStr;

pub const MAX_BOOK_WIDTH: f64 = 520.0;
pub const MIN_BOOK_WIDTH: f64 = 280.0;
pub const HORIZONTAL_PADDING: f64 = 24.0;
pub const VERTICAL_PADDING: f64 = 18.0;
/// Used when the reader's top bar has not been measured.
pub const DEFAULT_TOPBAR_HEIGHT: f64 = 64.0;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Visual viewport height, smaller than `height` while a mobile toolbar is shown.
    pub visual_height: Option<f64>,
    pub topbar_height: Option<f64>,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            visual_height: None,
            topbar_height: None,
        }
    }

    pub fn with_topbar(mut self, height: f64) -> Self {
        self.topbar_height = Some(height);
        self
    }

    pub fn with_visual_height(mut self, height: f64) -> Self {
        self.visual_height = Some(height);
        self
    }

    /// Vertical space left for the book under the top bar.
    pub fn available_height(&self) -> f64 {
        let vh = self.visual_height.unwrap_or(self.height);
        vh - self.topbar_height.unwrap_or(DEFAULT_TOPBAR_HEIGHT) - VERTICAL_PADDING
    }
}

impl FromStr for Viewport {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `390x844`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n > 0.0)
                .ok_or_else(|| format!("invalid dimension {:?} in {:?}", v, s))
        };
        Ok(Viewport::new(parse(w)?, parse(h)?))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSize {
    pub width: u32,
    pub height: u32,
}

/// Largest book that fits the viewport at the given aspect (height / width).
pub fn compute_size(viewport: &Viewport, aspect: f64) -> BookSize {
    let max_w = (viewport.width - HORIZONTAL_PADDING).min(MAX_BOOK_WIDTH);
    let max_h = viewport.available_height();

    let mut w = max_w.floor();
    let h = (w * aspect).floor();

    if h > max_h {
        w = (max_h.floor() / aspect).floor();
    }

    let w = w.max(MIN_BOOK_WIDTH);
    let h = (w * aspect).floor();

    BookSize {
        width: w as u32,
        height: h as u32,
    }
}
