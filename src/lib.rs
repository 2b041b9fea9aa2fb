pub mod configuration;
pub mod html;
pub mod manifest_client;
pub mod models;
pub mod rack;
pub mod reader;
pub mod run;

#[cfg(test)]
mod test_support;

pub use configuration::Settings;
pub use models::{Cli, Command};
pub use run::run;
