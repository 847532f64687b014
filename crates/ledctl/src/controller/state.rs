use serde::Serialize;

use crate::settings::Settings;

/// Snapshot of everything the presentation layer renders.
///
/// Only the controller produces new snapshots; `url_on`, `url_off` and `device_name` mirror the
/// settings store, while `is_busy` and `pending_message` are controller-local.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UiState {
    pub url_on: String,
    pub url_off: String,
    pub device_name: String,

    /// A command is in flight; new commands are dropped until it resolves.
    pub is_busy: bool,

    /// Notice awaiting acknowledgment.
    pub pending_message: Option<String>,
}

impl UiState {
    /// Copy the stored fields in. Returns whether anything changed.
    pub(crate) fn merge_settings(&mut self, settings: Settings) -> bool {
        let changed = self.url_on != settings.url_on
            || self.url_off != settings.url_off
            || self.device_name != settings.device_name;

        self.url_on = settings.url_on;
        self.url_off = settings.url_off;
        self.device_name = settings.device_name;
        changed
    }
}
