use crate::configuration::{Settings, ViewportSettings};
use crate::manifest_client::SiteSource;
use crate::models::Command;
use crate::rack::{Rack, RackView, READER_PAGE};
use crate::reader::{HeadlessFactory, Reader, Viewport, COMIC_PARAM, RACK_PAGE};
use log::{debug, info, warn};
use tokio::sync::mpsc;

pub async fn run(settings: Settings, command: Command) -> anyhow::Result<()> {
    info!("Site: {}", settings.site);
    let source = SiteSource::from_settings(&settings)?;

    match command {
        Command::Rack => {
            let location = source.page_url(RACK_PAGE)?;
            debug!("Rack page {}", location);
            let view = Rack::new(source).init().await;
            if view == RackView::Failed {
                warn!("Rack could not be loaded; run again to retry");
            }
            println!("{}", view.render());
        }
        Command::Reader {
            comic,
            viewport,
            resizes,
        } => {
            let mut location = source.page_url(READER_PAGE)?;
            if let Some(id) = comic {
                location.query_pairs_mut().append_pair(COMIC_PARAM, &id);
            }
            let viewport = initial_viewport(viewport, settings.viewport);

            let mut reader = Reader::new(source, HeadlessFactory::default(), settings.reader.lookup());
            reader.open(&location, viewport).await;

            if reader.is_ready() && !resizes.is_empty() {
                let (tx, rx) = mpsc::channel(resizes.len());
                for mut resize in resizes {
                    resize.topbar_height = resize.topbar_height.or(viewport.topbar_height);
                    tx.send(resize).await?;
                }
                drop(tx);
                reader.run_resizes(rx).await;
            }

            println!("{}", serde_json::to_string_pretty(&reader.snapshot())?);
        }
    }

    info!("Finished!");
    Ok(())
}

// A viewport given on the command line still uses the configured top bar
fn initial_viewport(requested: Option<Viewport>, configured: ViewportSettings) -> Viewport {
    match requested {
        Some(mut viewport) => {
            viewport.topbar_height = viewport.topbar_height.or(configured.topbar_height);
            viewport
        }
        None => configured.into(),
    }
}
