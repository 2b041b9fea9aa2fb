use crate::reader::Viewport;
use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(about = "Headless rack and reader for static comic sites")]
pub struct Cli {
    #[arg(short, long, default_value = "comic-rack.json")]
    pub config_file: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Render the rack grid for every comic in the root manifest
    Rack,
    /// Open one comic in the reader and print its state as JSON
    Reader {
        /// Comic id passed as `?comic=`
        #[arg(long)]
        comic: Option<String>,

        /// Initial viewport, e.g. `390x844`
        #[arg(long)]
        viewport: Option<Viewport>,

        /// Viewport changes to replay after the book is built
        #[arg(long = "resize")]
        resizes: Vec<Viewport>,
    },
}

impl Cli {
    pub fn new() -> Self {
        Cli::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
