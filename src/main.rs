use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod app;
mod config;
mod conversation;
mod handler;
mod knowledge;
mod responder;
mod storage;
mod tui;
mod ui;

use app::App;
use config::Config;
use storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let storage = match &config.data_dir {
        Some(dir) => Storage::at(dir.clone())?,
        None => Storage::new()?,
    };

    // The terminal owns stderr, so logs go to a file in the data directory
    init_logging(storage.dir())?;

    let mut app = App::new(config, storage).await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut tui::EventHandler) -> Result<()> {
    tracing::info!(conversations = app.store.len(), "session started");

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    tracing::info!("session ended");
    Ok(())
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("gptsim.log"))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gptsim=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .with(filter)
        .init();

    Ok(())
}
