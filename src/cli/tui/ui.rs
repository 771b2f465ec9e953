//! UI rendering for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::adapters::SimulatorAction;
use crate::core::{DeviceState, ExportStatus, VisualCategory, WizardStep};

use super::app::{ButtonSlot, TuiApp};

/// Main render function.
pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(8),     // Steps + page
            Constraint::Length(3),  // Buttons
            Constraint::Length(10), // Notifications
            Constraint::Length(3),  // Footer/help
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(0)])
        .split(chunks[1]);
    render_steps(frame, app, body[0]);
    render_page(frame, app, body[1]);

    render_buttons(frame, app, chunks[2]);
    render_log(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let step = app.session.current_step();
    let title = format!(
        "Export wizard  {}/{}  {}  Device: {}  Export: {}  [SIM]",
        step.rank() + 1,
        WizardStep::ALL.len(),
        step.title(),
        app.session.device_state(),
        app.session.export_status()
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(block, area);
}

fn render_steps(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let current = app.session.current_step();

    let items: Vec<ListItem> = WizardStep::ALL
        .iter()
        .map(|step| {
            let mark = if app.session.is_step_satisfied(*step) {
                "✓"
            } else {
                " "
            };
            let style = if *step == current {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", mark), Style::default().fg(Color::Green)),
                Span::styled(step.title(), style),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title("Steps")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(list, area);
}

fn render_page(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let session = &app.session;
    let device = session.device_state();
    let step = session.current_step();

    let mut lines: Vec<Line> = Vec::new();
    match step {
        WizardStep::Start => {
            lines.push(Line::from(
                "Please be aware that exporting files carries some risks.",
            ));
            lines.push(Line::from(
                "Only export to devices you trust, encrypted with LUKS or VeraCrypt.",
            ));
        }
        WizardStep::InsertDevice => {
            if device.is_present() {
                lines.push(Line::from("USB device found, feel free to change it if needed."));
            } else {
                lines.push(Line::from("Insert an encrypted USB device to continue."));
                lines.push(Line::from(Span::styled(
                    "The USB device must be encrypted with LUKS or VeraCrypt.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        WizardStep::UnlockDevice => match device {
            DeviceState::Unlocked => lines.push(Line::from("USB device unlocked.")),
            DeviceState::Unlocking => lines.push(Line::from("Unlocking USB device...")),
            _ => {
                let masked = "*".repeat(app.passphrase.chars().count());
                lines.push(Line::from("Enter the passphrase of the USB device."));
                lines.push(Line::from(vec![
                    Span::raw("Passphrase: "),
                    Span::styled(
                        format!("{}_", masked),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]));
                if session.unlock_failed() {
                    lines.push(Line::from(Span::styled(
                        "Unlocking failed, check the passphrase and try again.",
                        Style::default().fg(Color::Red),
                    )));
                }
            }
        },
        WizardStep::ReviewData => {
            lines.push(Line::from("The selected files will be exported to the device."));
            lines.push(Line::from("Press NEXT to start the export."));
        }
        WizardStep::Export => {
            let (text, color) = match session.export_status() {
                ExportStatus::Idle => ("Ready to export.", Color::White),
                ExportStatus::Started => ("Exporting data...", Color::Yellow),
                ExportStatus::Succeeded => ("Your files were exported successfully.", Color::Green),
                ExportStatus::Failed => (
                    "The export failed. Press EXPORT to try again.",
                    Color::Red,
                ),
            };
            lines.push(Line::from(Span::styled(text, Style::default().fg(color))));
            if let Some(id) = session.export().id() {
                lines.push(Line::from(Span::styled(
                    format!("Export {}", id),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    if let Some(err) = &app.error {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", err),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(step.title())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(paragraph, area);
}

fn render_buttons(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let constraints = vec![Constraint::Ratio(1, app.buttons.len() as u32); app.buttons.len()];
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (slot, chunk) in app.buttons.iter().zip(chunks.iter()) {
        slot.area.set(*chunk);
        render_button(frame, slot, *chunk);
    }
}

fn render_button(frame: &mut Frame, slot: &ButtonSlot, area: Rect) {
    let style = button_style(slot.state.current_visual_category());
    let paragraph = Paragraph::new(slot.id.label())
        .style(style)
        .centered()
        .block(Block::default().borders(Borders::ALL).border_style(style));
    frame.render_widget(paragraph, area);
}

fn button_style(category: VisualCategory) -> Style {
    match category {
        VisualCategory::Enabled => Style::default().fg(Color::White),
        VisualCategory::Hover => Style::default().fg(Color::Cyan),
        VisualCategory::Focus => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        VisualCategory::Pressed => Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        VisualCategory::Disabled => Style::default().fg(Color::DarkGray),
    }
}

fn render_log(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let items: Vec<ListItem> = app
        .log
        .iter()
        .map(|line| ListItem::new(format!("  {}", line)))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title("Notifications")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(list, area);
}

fn render_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let mut spans = vec![Span::raw(" Tab: focus  Enter: press  Esc: quit ")];

    let available = SimulatorAction::available(app.session.device_state());
    for (key, action) in function_keys() {
        if available.contains(&action) {
            spans.push(Span::styled(
                format!(" {}: {} ", key, action.label()),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    if app.session.export_status() == ExportStatus::Started {
        spans.push(Span::styled(
            " F7/F8: finish export ",
            Style::default().fg(Color::Cyan),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn function_keys() -> [(&'static str, SimulatorAction); 6] {
    [
        ("F1", SimulatorAction::InsertLocked),
        ("F2", SimulatorAction::InsertUnlocked),
        ("F3", SimulatorAction::Remove),
        ("F4", SimulatorAction::Lock),
        ("F5", SimulatorAction::Unlock),
        ("F6", SimulatorAction::FailUnlock),
    ]
}
