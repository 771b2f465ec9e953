//! TUI application state and logic.
//!
//! The app only reads session state and forwards user intent. Button looks
//! come from [`PushButtonState`], fed by pointer and focus events.

use std::cell::Cell;

use ratatui::layout::{Position, Rect};

use crate::adapters::SimulatorAction;
use crate::core::button::ButtonEvent;
use crate::core::{
    DeviceState, ExportStatus, NotificationLog, Passphrase, PushButtonState, Session, WizardStep,
};

const LOG_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Back,
    Next,
    Unlock,
    Export,
    Restart,
}

impl ButtonId {
    pub const ALL: [ButtonId; 5] = [
        ButtonId::Back,
        ButtonId::Next,
        ButtonId::Unlock,
        ButtonId::Export,
        ButtonId::Restart,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ButtonId::Back => "BACK",
            ButtonId::Next => "NEXT",
            ButtonId::Unlock => "UNLOCK",
            ButtonId::Export => "EXPORT",
            ButtonId::Restart => "RESTART",
        }
    }
}

pub struct ButtonSlot {
    pub id: ButtonId,
    pub state: PushButtonState,
    /// Where the button was last drawn, for pointer hit-testing.
    pub area: Cell<Rect>,
}

/// Actions that can be triggered by user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusNext,
    FocusPrevious,
    /// Press and release the focused button.
    Activate,
    PointerMoved { column: u16, row: u16 },
    PointerDown { column: u16, row: u16 },
    PointerUp { column: u16, row: u16 },
    Type(char),
    Erase,
    Simulate(SimulatorAction),
    SimulateExport { succeed: bool },
}

/// Main TUI application state.
pub struct TuiApp {
    pub session: Session,
    pub buttons: Vec<ButtonSlot>,
    pub focused: Option<usize>,
    pub passphrase: String,
    pub log: Vec<String>,
    pub running: bool,
    pub error: Option<String>,
    notifications: NotificationLog,
}

impl TuiApp {
    pub fn new(mut session: Session) -> Self {
        let notifications = NotificationLog::new();
        session.subscribe(notifications.clone());

        let buttons = ButtonId::ALL
            .into_iter()
            .map(|id| ButtonSlot {
                id,
                state: PushButtonState::new(false),
                area: Cell::new(Rect::default()),
            })
            .collect();

        let mut app = Self {
            session,
            buttons,
            focused: None,
            passphrase: String::new(),
            log: Vec::new(),
            running: true,
            error: None,
            notifications,
        };
        app.sync();
        app
    }

    /// Run due timers and bring buttons and the log up to date.
    pub fn tick(&mut self) {
        self.session.pump();
        self.sync();
    }

    pub fn is_enabled(&self, id: ButtonId) -> bool {
        let session = &self.session;
        let step = session.current_step();
        match id {
            ButtonId::Back => session.can_retreat(),
            ButtonId::Next => session.can_advance(),
            ButtonId::Unlock => {
                step == WizardStep::UnlockDevice && session.device_state() == DeviceState::Locked
            }
            ButtonId::Export => {
                step == WizardStep::Export
                    && session.device_state() == DeviceState::Unlocked
                    && matches!(
                        session.export_status(),
                        ExportStatus::Idle | ExportStatus::Failed
                    )
            }
            ButtonId::Restart => step != WizardStep::Start,
        }
    }

    pub fn accepts_text(&self) -> bool {
        self.session.current_step() == WizardStep::UnlockDevice
            && self.session.device_state() == DeviceState::Locked
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::FocusNext => self.move_focus(true),
            Action::FocusPrevious => self.move_focus(false),
            Action::Activate => self.activate_focused(),
            Action::PointerMoved { column, row } => self.pointer_moved(Position::new(column, row)),
            Action::PointerDown { column, row } => self.pointer_down(Position::new(column, row)),
            Action::PointerUp { column, row } => self.pointer_up(Position::new(column, row)),
            Action::Type(c) => {
                if self.accepts_text() {
                    self.passphrase.push(c);
                }
            }
            Action::Erase => {
                self.passphrase.pop();
            }
            Action::Simulate(action) => {
                let result = self.session.signal(action.signal());
                self.record(result);
            }
            Action::SimulateExport { succeed } => {
                let result = if succeed {
                    self.session.succeed_export()
                } else {
                    self.session.fail_export()
                };
                self.record(result);
            }
        }
        self.sync();
    }

    fn click(&mut self, id: ButtonId) {
        self.error = None;
        let result = match id {
            ButtonId::Back => self.session.retreat(),
            ButtonId::Next => self.session.advance(),
            ButtonId::Unlock => {
                let passphrase = Passphrase::new(std::mem::take(&mut self.passphrase));
                self.session.attempt_unlock(passphrase)
            }
            ButtonId::Export => self.session.start_export(),
            ButtonId::Restart => self.session.restart(),
        };
        self.record(result);
    }

    fn record(&mut self, result: crate::Result<()>) {
        if let Err(err) = result {
            self.error = Some(err.to_string());
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let count = self.buttons.len();
        let start = self.focused.unwrap_or(if forward { count - 1 } else { 0 });

        let candidate = (1..=count)
            .map(|offset| {
                if forward {
                    (start + offset) % count
                } else {
                    (start + count - offset) % count
                }
            })
            .find(|index| self.buttons[*index].state.is_enabled());

        if let Some(index) = candidate {
            self.set_focus(Some(index));
        }
    }

    fn set_focus(&mut self, index: Option<usize>) {
        if self.focused == index {
            return;
        }
        if let Some(old) = self.focused {
            self.buttons[old].state.handle(ButtonEvent::FocusLeave);
        }
        if let Some(new) = index {
            self.buttons[new].state.handle(ButtonEvent::FocusEnter);
        }
        self.focused = index;
    }

    fn activate_focused(&mut self) {
        let Some(index) = self.focused else { return };
        let button = &mut self.buttons[index].state;
        if button.handle(ButtonEvent::Press) && button.handle(ButtonEvent::Release) {
            let id = self.buttons[index].id;
            self.click(id);
        }
    }

    fn hit(&self, position: Position) -> Option<usize> {
        self.buttons
            .iter()
            .position(|slot| slot.area.get().contains(position))
    }

    fn pointer_moved(&mut self, position: Position) {
        let hit = self.hit(position);
        for (index, slot) in self.buttons.iter_mut().enumerate() {
            let event = if Some(index) == hit {
                ButtonEvent::HoverEnter
            } else {
                ButtonEvent::HoverLeave
            };
            slot.state.handle(event);
        }
    }

    fn pointer_down(&mut self, position: Position) {
        self.pointer_moved(position);
        if let Some(index) = self.hit(position) {
            self.buttons[index].state.handle(ButtonEvent::Press);
        }
    }

    fn pointer_up(&mut self, position: Position) {
        let hit = self.hit(position);
        let Some(index) = self.buttons.iter().position(|slot| slot.state.is_pressed()) else {
            return;
        };

        self.buttons[index].state.handle(ButtonEvent::Release);
        // A pointer press leaves the button focused.
        if let Some(old) = self.focused.filter(|old| *old != index) {
            self.buttons[old].state.handle(ButtonEvent::FocusLeave);
        }
        self.focused = Some(index);

        if hit == Some(index) {
            let id = self.buttons[index].id;
            self.click(id);
        } else {
            self.pointer_moved(position);
        }
    }

    fn sync(&mut self) {
        for index in 0..self.buttons.len() {
            let enabled = self.is_enabled(self.buttons[index].id);
            self.buttons[index].state.set_enabled(enabled);
            if !enabled && self.focused == Some(index) {
                self.focused = None;
            }
        }

        for note in self.notifications.take() {
            self.log.push(note.to_string());
        }
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SimulatedDevice, SimulatedExport};
    use crate::core::button::VisualCategory;
    use crate::core::{DeviceSignal, ManualClock, SessionOptions};

    fn app() -> TuiApp {
        let session = Session::new(
            Box::new(ManualClock::new()),
            Box::new(SimulatedDevice::manual()),
            Box::new(SimulatedExport::manual()),
            SessionOptions::default(),
        );
        TuiApp::new(session)
    }

    fn place(app: &TuiApp, id: ButtonId, x: u16) {
        let slot = app.buttons.iter().find(|slot| slot.id == id).unwrap();
        slot.area.set(Rect::new(x, 0, 10, 3));
    }

    fn category(app: &TuiApp, id: ButtonId) -> VisualCategory {
        let slot = app.buttons.iter().find(|slot| slot.id == id).unwrap();
        slot.state.current_visual_category()
    }

    #[test]
    fn buttons_follow_session_state() {
        let app = app();
        assert_eq!(category(&app, ButtonId::Back), VisualCategory::Disabled);
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Enabled);
        assert_eq!(category(&app, ButtonId::Unlock), VisualCategory::Disabled);
    }

    #[test]
    fn keyboard_activation_advances() {
        let mut app = app();
        app.handle_action(Action::FocusNext);
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Focus);

        app.handle_action(Action::Activate);
        assert_eq!(app.session.current_step(), WizardStep::InsertDevice);
        // Next is disabled until a device shows up, which drops focus.
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Disabled);
        assert_eq!(app.focused, None);
    }

    #[test]
    fn pointer_click_advances_and_focuses() {
        let mut app = app();
        place(&app, ButtonId::Next, 20);

        app.handle_action(Action::PointerMoved { column: 22, row: 1 });
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Hover);

        app.handle_action(Action::PointerDown { column: 22, row: 1 });
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Pressed);

        app.handle_action(Action::Simulate(SimulatorAction::InsertLocked));
        app.handle_action(Action::PointerUp { column: 22, row: 1 });
        assert_eq!(app.session.current_step(), WizardStep::InsertDevice);
    }

    #[test]
    fn release_outside_does_not_click() {
        let mut app = app();
        place(&app, ButtonId::Next, 20);

        app.handle_action(Action::PointerDown { column: 22, row: 1 });
        app.handle_action(Action::PointerUp { column: 50, row: 1 });
        assert_eq!(app.session.current_step(), WizardStep::Start);
        assert_eq!(category(&app, ButtonId::Next), VisualCategory::Focus);
    }

    #[test]
    fn passphrase_goes_to_the_device_service() {
        let mut app = app();
        app.session.signal(DeviceSignal::FoundLocked).unwrap();
        app.session.advance().unwrap();
        app.session.advance().unwrap();
        app.tick();

        assert!(app.accepts_text());
        for c in "hunter2".chars() {
            app.handle_action(Action::Type(c));
        }
        app.handle_action(Action::Erase);
        assert_eq!(app.passphrase, "hunter");

        app.focused = None;
        app.handle_action(Action::FocusNext);
        while app.buttons[app.focused.unwrap()].id != ButtonId::Unlock {
            app.handle_action(Action::FocusNext);
        }
        app.handle_action(Action::Activate);

        assert_eq!(app.session.device_state(), DeviceState::Unlocking);
        assert!(app.passphrase.is_empty());
        assert!(!app.accepts_text());
    }

    #[test]
    fn errors_are_shown() {
        let mut app = app();
        app.handle_action(Action::SimulateExport { succeed: true });
        assert!(app.error.is_some());
    }

    #[test]
    fn log_keeps_recent_notifications() {
        let mut app = app();
        app.handle_action(Action::Simulate(SimulatorAction::InsertLocked));
        assert!(app.log.iter().any(|line| line == "device is locked"));

        for _ in 0..10 {
            app.handle_action(Action::Simulate(SimulatorAction::Remove));
            app.handle_action(Action::Simulate(SimulatorAction::InsertLocked));
        }
        assert_eq!(app.log.len(), LOG_CAPACITY);
    }
}
