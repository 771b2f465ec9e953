//! Interaction state of a clickable control, independent of how it is drawn.
//!
//! Availability (enabled/disabled) overrides everything else. While enabled
//! the control tracks hover, focus and press. Pressing requires hover or
//! focus, and a pointer press leaves the control focused once released.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Where a press came from, which decides the state after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressOrigin {
    Hover,
    Focus,
    HoverAndFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Resting,
    Hover { focused: bool },
    Focus,
    Pressed(PressOrigin),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Enabled(Interaction),
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonEvent {
    Enable,
    Disable,
    HoverEnter,
    HoverLeave,
    FocusEnter,
    FocusLeave,
    Press,
    Release,
}

/// What the view layer needs to pick a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualCategory {
    Enabled,
    Hover,
    Focus,
    Pressed,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct PushButtonState {
    state: ButtonState,
}

impl Default for PushButtonState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PushButtonState {
    pub fn new(initially_enabled: bool) -> Self {
        let state = if initially_enabled {
            ButtonState::Enabled(Interaction::Resting)
        } else {
            ButtonState::Disabled
        };
        Self { state }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, ButtonState::Enabled(_))
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, ButtonState::Enabled(Interaction::Pressed(_)))
    }

    pub fn current_visual_category(&self) -> VisualCategory {
        match self.state {
            ButtonState::Disabled => VisualCategory::Disabled,
            ButtonState::Enabled(Interaction::Resting) => VisualCategory::Enabled,
            ButtonState::Enabled(Interaction::Hover { .. }) => VisualCategory::Hover,
            ButtonState::Enabled(Interaction::Focus) => VisualCategory::Focus,
            ButtonState::Enabled(Interaction::Pressed(_)) => VisualCategory::Pressed,
        }
    }

    /// Sync availability with an external flag. Returns true when it changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let event = if enabled {
            ButtonEvent::Enable
        } else {
            ButtonEvent::Disable
        };
        self.handle(event)
    }

    /// Feed an event. Returns true when the state changed; events that do
    /// not apply are ignored.
    pub fn handle(&mut self, event: ButtonEvent) -> bool {
        let next = Self::transition(self.state, event);
        match next {
            Some(next) if next != self.state => {
                trace!(from = ?self.state, to = ?next, ?event, "Button state changed");
                self.state = next;
                true
            }
            _ => false,
        }
    }

    fn transition(state: ButtonState, event: ButtonEvent) -> Option<ButtonState> {
        use ButtonEvent as E;
        use Interaction::*;

        let interaction = match (state, event) {
            (ButtonState::Disabled, E::Enable) => return Some(ButtonState::Enabled(Resting)),
            (ButtonState::Disabled, _) => return None,
            (ButtonState::Enabled(_), E::Disable) => return Some(ButtonState::Disabled),
            (ButtonState::Enabled(_), E::Enable) => return None,
            (ButtonState::Enabled(interaction), _) => interaction,
        };

        let next = match (interaction, event) {
            (Resting, E::HoverEnter) => Hover { focused: false },
            (Resting, E::FocusEnter) => Focus,

            (Hover { focused }, E::HoverLeave) => {
                if focused {
                    Focus
                } else {
                    Resting
                }
            }
            (Hover { focused: false }, E::FocusEnter) => Hover { focused: true },
            (Hover { focused: true }, E::FocusLeave) => Hover { focused: false },
            (Hover { focused: false }, E::Press) => Pressed(PressOrigin::Hover),
            (Hover { focused: true }, E::Press) => Pressed(PressOrigin::HoverAndFocus),

            (Focus, E::FocusLeave) => Resting,
            (Focus, E::HoverEnter) => Hover { focused: true },
            (Focus, E::Press) => Pressed(PressOrigin::Focus),

            (Pressed(PressOrigin::Hover | PressOrigin::HoverAndFocus), E::Release) => {
                Hover { focused: true }
            }
            (Pressed(PressOrigin::Focus), E::Release) => Focus,

            _ => return None,
        };

        Some(ButtonState::Enabled(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_after(events: &[ButtonEvent]) -> PushButtonState {
        let mut button = PushButtonState::default();
        for event in events {
            button.handle(*event);
        }
        button
    }

    #[test]
    fn initial_state_follows_flag() {
        assert_eq!(
            PushButtonState::new(true).current_visual_category(),
            VisualCategory::Enabled
        );
        assert_eq!(
            PushButtonState::new(false).current_visual_category(),
            VisualCategory::Disabled
        );
    }

    #[test]
    fn press_requires_hover_or_focus() {
        let mut button = PushButtonState::default();
        assert!(!button.handle(ButtonEvent::Press));
        assert_eq!(button.current_visual_category(), VisualCategory::Enabled);
    }

    #[test]
    fn pointer_click_leaves_focus_behind() {
        let mut button = button_after(&[ButtonEvent::HoverEnter, ButtonEvent::Press]);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Pressed(PressOrigin::Hover))
        );
        button.handle(ButtonEvent::Release);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Hover { focused: true })
        );
        button.handle(ButtonEvent::HoverLeave);
        assert_eq!(button.current_visual_category(), VisualCategory::Focus);
    }

    #[test]
    fn keyboard_press_from_focus() {
        let button = button_after(&[ButtonEvent::FocusEnter, ButtonEvent::Press]);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Pressed(PressOrigin::Focus))
        );
        let button = button_after(&[
            ButtonEvent::FocusEnter,
            ButtonEvent::Press,
            ButtonEvent::Release,
        ]);
        assert_eq!(button.current_visual_category(), VisualCategory::Focus);
    }

    #[test]
    fn hover_over_focus_then_press() {
        let button = button_after(&[
            ButtonEvent::FocusEnter,
            ButtonEvent::HoverEnter,
            ButtonEvent::Press,
        ]);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Pressed(PressOrigin::HoverAndFocus))
        );
    }

    #[test]
    fn focus_arriving_while_hovered_is_remembered() {
        let mut button = button_after(&[ButtonEvent::HoverEnter, ButtonEvent::FocusEnter]);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Hover { focused: true })
        );
        button.handle(ButtonEvent::Press);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Pressed(PressOrigin::HoverAndFocus))
        );
    }

    #[test]
    fn focus_out_while_hovered_keeps_hover() {
        let button = button_after(&[
            ButtonEvent::FocusEnter,
            ButtonEvent::HoverEnter,
            ButtonEvent::FocusLeave,
        ]);
        assert_eq!(
            button.state(),
            ButtonState::Enabled(Interaction::Hover { focused: false })
        );
    }

    #[test]
    fn events_ignored_while_pressed() {
        let mut button = button_after(&[ButtonEvent::HoverEnter, ButtonEvent::Press]);
        assert!(!button.handle(ButtonEvent::HoverLeave));
        assert!(!button.handle(ButtonEvent::Press));
        assert!(button.is_pressed());
    }

    #[test]
    fn disable_overrides_and_forgets() {
        let mut button = button_after(&[
            ButtonEvent::FocusEnter,
            ButtonEvent::HoverEnter,
            ButtonEvent::Press,
        ]);
        assert!(button.set_enabled(false));
        assert_eq!(button.current_visual_category(), VisualCategory::Disabled);

        assert!(!button.handle(ButtonEvent::HoverEnter));
        assert!(!button.handle(ButtonEvent::Press));
        assert_eq!(button.state(), ButtonState::Disabled);

        assert!(button.set_enabled(true));
        assert_eq!(button.state(), ButtonState::Enabled(Interaction::Resting));
    }

    #[test]
    fn redundant_enable_is_not_a_change() {
        let mut button = button_after(&[ButtonEvent::HoverEnter]);
        assert!(!button.set_enabled(true));
        assert_eq!(button.current_visual_category(), VisualCategory::Hover);
    }
}
