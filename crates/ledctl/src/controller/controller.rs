use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::command::Command;
use super::command::Notice;
use super::state::UiState;
use crate::dispatch::CommandOutcome;
use crate::dispatch::Dispatcher;
use crate::dispatch::Transport;
use crate::settings::Settings;
use crate::settings::SettingsBackend;
use crate::settings::SettingsStore;

/// Application state controller
///
/// Owns the `UiState` cell and is its only writer. Every transition runs inside the cell's
/// exclusive lock and watchers are woken only after it is released, so a watcher reacting to a
/// change by calling back into the controller cannot deadlock, and two concurrent resolutions
/// cannot interleave.
///
/// Must be created inside a tokio runtime. Dropping the controller aborts its background tasks;
/// the result of a command still in flight at that point is discarded.
pub struct Controller<T, B> {
    inner: Arc<Inner<T, B>>,

    /// Settings forwarder and in-flight command tasks
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner<T, B> {
    state: watch::Sender<UiState>,
    dispatcher: Dispatcher<T>,
    store: Arc<SettingsStore<B>>,
}

impl<T, B> Controller<T, B>
where
    T: Transport + 'static,
    B: SettingsBackend + 'static,
{
    /// Create a controller and start mirroring the store into `UiState`.
    pub fn new(store: Arc<SettingsStore<B>>, dispatcher: Dispatcher<T>) -> Self {
        let mut subscription = store.subscribe();
        let (state, _) = watch::channel(UiState::default());
        let inner = Arc::new(Inner {
            state,
            dispatcher,
            store,
        });

        // The subscription already holds the current record; apply it now so the very first
        // snapshot shows stored settings.
        if let Some(settings) = subscription.try_recv() {
            inner.merge_settings(settings);
        }

        let forwarder = tokio::spawn({
            let inner = inner.clone();
            async move {
                while let Some(settings) = subscription.recv().await {
                    inner.merge_settings(settings);
                }
                debug!("Settings subscription closed");
            }
        });

        info!("Controller started");
        Self {
            inner,
            handles: Mutex::new(vec![forwarder]),
        }
    }

    /// Latest state snapshot.
    pub fn state(&self) -> UiState {
        self.inner.state.borrow().clone()
    }

    /// Receiver woken on every published transition.
    pub fn watch_state(&self) -> watch::Receiver<UiState> {
        self.inner.state.subscribe()
    }

    pub fn store(&self) -> &Arc<SettingsStore<B>> {
        &self.inner.store
    }

    /// Fire the turn-on webhook. Returns `false` if the intent was dropped because another
    /// command is in flight.
    pub fn turn_on(&self) -> bool {
        self.start(Command::TurnOn)
    }

    /// Fire the turn-off webhook. Returns `false` if the intent was dropped because another
    /// command is in flight.
    pub fn turn_off(&self) -> bool {
        self.start(Command::TurnOff)
    }

    /// Clear the pending notice. Returns whether there was one.
    pub fn acknowledge_message(&self) -> bool {
        self.inner
            .state
            .send_if_modified(|state| state.pending_message.take().is_some())
    }

    /// Persist new settings and report the result through `pending_message`.
    ///
    /// The new values reach `UiState` through the store subscription, which may happen after
    /// this returns. `is_busy` is left alone.
    pub async fn save_settings(
        &self,
        url_on: impl Into<String>,
        url_off: impl Into<String>,
        device_name: impl Into<String>,
    ) {
        let settings = Settings::new(url_on, url_off, device_name);

        let notice = match self.inner.store.write(settings).await {
            Ok(()) => Notice::Saved,
            Err(e) => {
                warn!("Saving settings failed: {}", e);
                Notice::SaveFailed
            }
        };

        self.inner.set_notice(notice);
    }

    fn start(&self, command: Command) -> bool {
        let mut url = None;
        self.inner.state.send_if_modified(|state| {
            if state.is_busy {
                return false;
            }
            state.is_busy = true;
            state.pending_message = Some(Notice::Sending(command).to_string());
            url = Some(command.url(state).to_string());
            true
        });

        let Some(url) = url else {
            info!("Dropping {} command: another command is in flight", command);
            return false;
        };

        info!("Accepted {} command", command);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let outcome = inner.dispatcher.dispatch(&url).await;
            inner.finish(command, outcome);
        });
        self.track(handle);
        true
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

impl<T: Transport, B> Inner<T, B> {
    fn merge_settings(&self, settings: Settings) {
        self.state
            .send_if_modified(|state| state.merge_settings(settings));
    }

    fn finish(&self, command: Command, outcome: CommandOutcome) {
        let notice = match outcome {
            CommandOutcome::Success => Notice::Sent(command),
            CommandOutcome::Failure(e) => Notice::Failed(command, e),
        };
        info!("{} command finished: {}", command, notice);

        self.state.send_modify(|state| {
            state.is_busy = false;
            state.pending_message = Some(notice.to_string());
        });
    }

    fn set_notice(&self, notice: Notice) {
        self.state.send_modify(|state| {
            state.pending_message = Some(notice.to_string());
        });
    }
}

impl<T, B> Drop for Controller<T, B> {
    fn drop(&mut self) {
        let handles = self.handles.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in handles.drain(..) {
            handle.abort();
        }
        debug!("Controller shut down");
    }
}
