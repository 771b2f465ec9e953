//! Interactive TUI for the export wizard.
//!
//! Shows the wizard pages with their navigation buttons and drives a
//! simulated device and export backend from function keys.

mod app;
mod input;
mod ui;

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::adapters;
use crate::config::AppConfig;
use crate::core::SystemClock;

use app::TuiApp;

/// Upper bound on how long to wait for input before redrawing.
const MAX_IDLE: Duration = Duration::from_millis(250);

/// Run the TUI on a session built from `config`.
pub fn run(config: &AppConfig) -> Result<()> {
    let mut session = adapters::simulated_session(config, Box::new(SystemClock::new()));
    session.start();
    let mut app = TuiApp::new(session);

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut TuiApp) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake up in time for the next simulator timer.
        let timeout = app
            .session
            .until_next_timer()
            .map_or(MAX_IDLE, |due| due.min(MAX_IDLE));

        if event::poll(timeout)? {
            let event = event::read()?;
            if let Some(action) = input::handle_event(event, app.accepts_text()) {
                app.handle_action(action);
            }
        }

        if !app.running {
            break;
        }
    }

    Ok(())
}
