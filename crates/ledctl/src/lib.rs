pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod logging;
pub mod settings;

pub use config::Config;
pub use config::LogLevel;
pub use controller::Command;
pub use controller::Controller;
pub use controller::UiState;
pub use dispatch::CommandOutcome;
pub use dispatch::DispatchError;
pub use dispatch::Dispatcher;
pub use settings::PersistenceError;
pub use settings::Settings;
pub use settings::SettingsStore;
