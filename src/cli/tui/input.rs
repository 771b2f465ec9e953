//! Input handling for the TUI.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use super::app::Action;
use crate::adapters::SimulatorAction;

/// Convert a crossterm key event to an Action. While `typing`, printable
/// characters go to the passphrase field instead of acting as shortcuts.
pub fn handle_key_event(key: KeyEvent, typing: bool) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Tab | KeyCode::Right => Some(Action::FocusNext),
        KeyCode::BackTab | KeyCode::Left => Some(Action::FocusPrevious),
        KeyCode::Enter => Some(Action::Activate),
        KeyCode::Backspace if typing => Some(Action::Erase),
        KeyCode::Char(c) if typing => Some(Action::Type(c)),
        KeyCode::Char(' ') => Some(Action::Activate),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::F(1) => Some(Action::Simulate(SimulatorAction::InsertLocked)),
        KeyCode::F(2) => Some(Action::Simulate(SimulatorAction::InsertUnlocked)),
        KeyCode::F(3) => Some(Action::Simulate(SimulatorAction::Remove)),
        KeyCode::F(4) => Some(Action::Simulate(SimulatorAction::Lock)),
        KeyCode::F(5) => Some(Action::Simulate(SimulatorAction::Unlock)),
        KeyCode::F(6) => Some(Action::Simulate(SimulatorAction::FailUnlock)),
        KeyCode::F(7) => Some(Action::SimulateExport { succeed: true }),
        KeyCode::F(8) => Some(Action::SimulateExport { succeed: false }),
        _ => None,
    }
}

pub fn handle_mouse_event(mouse: MouseEvent) -> Option<Action> {
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
            Some(Action::PointerMoved { column, row })
        }
        MouseEventKind::Down(MouseButton::Left) => Some(Action::PointerDown { column, row }),
        MouseEventKind::Up(MouseButton::Left) => Some(Action::PointerUp { column, row }),
        _ => None,
    }
}

/// Convert a crossterm Event to an Action.
pub fn handle_event(event: Event, typing: bool) -> Option<Action> {
    match event {
        Event::Key(key) => handle_key_event(key, typing),
        Event::Mouse(mouse) => handle_mouse_event(mouse),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn letters_are_shortcuts_unless_typing() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), false),
            Some(Action::Quit)
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), true),
            Some(Action::Type('q'))
        );
    }

    #[test]
    fn function_keys_drive_the_simulator() {
        assert_eq!(
            handle_key_event(key(KeyCode::F(1)), false),
            Some(Action::Simulate(SimulatorAction::InsertLocked))
        );
        assert_eq!(
            handle_key_event(key(KeyCode::F(8)), true),
            Some(Action::SimulateExport { succeed: false })
        );
    }

    #[test]
    fn mouse_left_button_maps_to_pointer_actions() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 7,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(
            handle_mouse_event(mouse),
            Some(Action::PointerDown { column: 4, row: 7 })
        );
    }
}
