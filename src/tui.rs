use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use codehelper_core::ConversationState;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Drives the "Thinking..." animation
const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
    /// The conversation published a new snapshot
    StateChanged(ConversationState),
}

/// Merges terminal input, ticks and conversation updates into one queue
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new(state_rx: watch::Receiver<ConversationState>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        spawn_terminal_reader(tx.clone());
        spawn_state_forwarder(state_rx, tx.clone());
        spawn_ticker(tx);

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

fn spawn_terminal_reader(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(evt) = reader.next().await {
            let Ok(evt) = evt else { continue };
            let app_event = match evt {
                // Only handle key press events, not release
                Event::Key(key) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                Event::Mouse(mouse) => AppEvent::Mouse(mouse),
                Event::Resize(w, h) => AppEvent::Resize(w, h),
                _ => continue,
            };
            if tx.send(app_event).is_err() {
                break;
            }
        }
    });
}

/// Wake the draw loop on every conversation snapshot
fn spawn_state_forwarder(
    mut state_rx: watch::Receiver<ConversationState>,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let snapshot = state_rx.borrow_and_update().clone();
            if tx.send(AppEvent::StateChanged(snapshot)).is_err() {
                break;
            }
        }
    });
}

fn spawn_ticker(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_RATE);
        loop {
            interval.tick().await;
            if tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        default_hook(panic_info);
    }));
}
