use std::fmt;

use strum::Display;

use super::state::UiState;
use crate::dispatch::DispatchError;

/// A user-triggered device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Command {
    #[strum(serialize = "turn-on")]
    TurnOn,
    #[strum(serialize = "turn-off")]
    TurnOff,
}

impl Command {
    /// The webhook this command fires, as currently shown in `state`.
    pub fn url(self, state: &UiState) -> &str {
        match self {
            Command::TurnOn => &state.url_on,
            Command::TurnOff => &state.url_off,
        }
    }
}

/// User-visible notices placed in `UiState::pending_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Sending(Command),
    Sent(Command),
    Failed(Command, DispatchError),
    Saved,
    SaveFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Sending(command) => write!(f, "Sending {command} command..."),
            Notice::Sent(command) => write!(f, "The {command} command was sent successfully!"),
            Notice::Failed(command, DispatchError::EmptyUrl) => {
                write!(f, "No {command} URL is set. Add one in the settings.")
            }
            Notice::Failed(command, DispatchError::Network(reason)) => {
                write!(f, "Could not send the {command} command: {reason}")
            }
            Notice::Failed(command, DispatchError::Status(status)) => {
                write!(f, "The {command} command was rejected with HTTP status {status}.")
            }
            Notice::Saved => write!(f, "Settings saved!"),
            Notice::SaveFailed => write!(f, "Settings could not be saved."),
        }
    }
}
