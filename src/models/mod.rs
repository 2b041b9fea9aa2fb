pub mod cli;
pub mod manifest;

pub use cli::{Cli, Command};
pub use manifest::{ComicEntry, ComicManifest, PageEntry, ResolvedPage, RootManifest};
