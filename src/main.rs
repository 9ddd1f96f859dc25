mod app;
mod handler;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use codehelper_core::{Config, Conversation};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::tui::EventHandler;

const LOG_ENV: &str = "CODEHELPER_LOG";

/// Log to a file under the config directory; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    let log_path = dir.join("codehelper.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Could not open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(app.conversation.subscribe());

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Config::load()?;
    let client = config.completion_client()?;
    let model_uri = client.model_uri().to_string();
    info!(model = %model_uri, "starting codehelper");

    let conversation = Conversation::with_budget(Arc::new(client), config.token_budget);
    let mut app = App::new(conversation, config.attachment_policy(), model_uri);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        error!(error = %e, "codehelper exited with an error");
    }
    if let Some(pending) = app.pending.take() {
        pending.cancel();
    }
    result
}
