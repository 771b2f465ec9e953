use thiserror::Error;

use crate::core::wizard::WizardStep;

/// Recoverable conditions surfaced to the caller of a session operation.
///
/// None of these are fatal. Device events that do not apply to the current
/// device state are not errors at all; they are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The operation was requested while its component could not accept it.
    #[error("cannot {operation} while {state}")]
    InvalidOperation {
        operation: &'static str,
        state: String,
    },

    /// `advance` was requested before the current step was satisfied.
    #[error("step {0} is not ready")]
    StepNotReady(WizardStep),

    /// A console line that does not name any known command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl Error {
    pub(crate) fn invalid(operation: &'static str, state: impl std::fmt::Display) -> Self {
        Error::InvalidOperation {
            operation,
            state: state.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
