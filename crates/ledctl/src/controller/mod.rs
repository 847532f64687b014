mod command;
// Private module - allowed by clippy.toml allow-private-module-inception
#[allow(clippy::module_inception)]
mod controller;
mod state;

pub use command::Command;
pub use command::Notice;
pub use controller::Controller;
pub use state::UiState;
