//! Production wiring: file-backed settings, reqwest transport, controller.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::controller::Controller;
use crate::dispatch::Dispatcher;
use crate::dispatch::ReqwestTransport;
use crate::settings::FileBackend;
use crate::settings::SettingsStore;

/// The controller type `open` produces.
pub type AppController = Controller<ReqwestTransport, FileBackend>;

/// Build the controller described by `config`. Must be called inside a tokio runtime.
pub async fn open(config: &Config) -> anyhow::Result<AppController> {
    let transport = ReqwestTransport::new(
        config.dispatch.timeout(),
        config.dispatch.user_agent.as_deref(),
    )
    .context("Failed to create HTTP client")?;

    info!(
        "Opening settings at {} (request timeout {}s)",
        config.storage.path.display(),
        config.dispatch.timeout_secs
    );
    let store = SettingsStore::open(FileBackend::new(&config.storage.path)).await;

    Ok(Controller::new(Arc::new(store), Dispatcher::new(transport)))
}
