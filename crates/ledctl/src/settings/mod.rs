//! Durable user settings: the two webhook URLs and the device name.
//!
//! The store keeps a last-known-good copy of the record and pushes every change to its
//! subscribers; the backend decides where the record actually lives.

mod backend;
mod model;
mod store;

pub use backend::FileBackend;
pub use backend::MemoryBackend;
pub use backend::PersistenceError;
pub use backend::SettingsBackend;
pub use model::Settings;
pub use model::SettingsKey;
pub use model::DEFAULT_DEVICE_NAME;
pub use store::SettingsStore;
pub use store::Subscription;
