use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::backend::PersistenceError;
use super::backend::SettingsBackend;
use super::model::Settings;
use super::model::SettingsKey;

/// Settings store with change notifications.
///
/// Owns the backend and a last-known-good copy of the record. Readers never see an error: when
/// the backend fails they get the last-known-good value (the defaults if nothing was ever loaded).
/// Writes are serialized, and each successful write is pushed to every live subscription in the
/// order the writes completed.
pub struct SettingsStore<B> {
    backend: B,

    /// Last-known-good record (readers load the Arc, the publisher stores a new one)
    current: ArcSwap<Settings>,

    /// One queue per live subscription
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Settings>>>,

    /// Held across persist + publish so notifications follow write order
    write_lock: tokio::sync::Mutex<()>,
}

impl<B: SettingsBackend> SettingsStore<B> {
    /// Open the store, loading the persisted record once.
    pub async fn open(backend: B) -> Self {
        let initial = match backend.load().await {
            Ok(Some(settings)) => {
                info!("Loaded settings for device '{}'", settings.device_name);
                settings
            }
            Ok(None) => {
                info!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };

        Self {
            backend,
            current: ArcSwap::from_pointee(initial),
            subscribers: Mutex::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Last-known-good record without touching the backend.
    pub fn current(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Read the durable record.
    ///
    /// A record that differs from the last-known-good one (edited behind our back) is published to
    /// subscribers like any other change.
    pub async fn read(&self) -> Settings {
        let _guard = self.write_lock.lock().await;

        match self.backend.load().await {
            Ok(loaded) => {
                let settings = loaded.unwrap_or_default();
                if *self.current.load_full() != settings {
                    debug!("Stored settings changed externally");
                    self.publish(settings.clone());
                }
                settings
            }
            Err(e) => {
                warn!("Failed to read settings, serving last known value: {}", e);
                Settings::clone(&self.current.load())
            }
        }
    }

    /// Persist all three fields as a unit.
    pub async fn write(&self, settings: Settings) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.persist(settings).await
    }

    /// Overwrite a single field, keeping the others as they are in durable storage.
    ///
    /// If the backend cannot be read the other fields come from the last-known-good record.
    pub async fn write_field(&self, key: SettingsKey, value: String) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let mut settings = match self.backend.load().await {
            Ok(loaded) => loaded.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read settings before updating {}: {}", key, e);
                Settings::clone(&self.current.load())
            }
        };
        settings.set(key, value);
        self.persist(settings).await
    }

    /// Subscribe to changes.
    ///
    /// The subscription yields the current record immediately, then every later change.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        // Under the subscribers lock no publish can land between the snapshot and registration.
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(Settings::clone(&self.current.load()));
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.push(tx);

        Subscription { rx }
    }

    /// Number of subscriptions that have not been dropped.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Caller must hold `write_lock`.
    async fn persist(&self, settings: Settings) -> Result<(), PersistenceError> {
        if let Err(e) = self.backend.store(&settings).await {
            warn!("Failed to persist settings: {}", e);
            return Err(e);
        }

        info!("Saved settings for device '{}'", settings.device_name);
        self.publish(settings);
        Ok(())
    }

    fn publish(&self, settings: Settings) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.current.store(Arc::new(settings.clone()));
        subscribers.retain(|tx| tx.send(settings.clone()).is_ok());
        debug!("Notified {} settings subscriber(s)", subscribers.len());
    }
}

/// Handle to a stream of settings changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Settings>,
}

impl Subscription {
    /// Wait for the next change. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Settings> {
        self.rx.recv().await
    }

    /// Take the next queued change without waiting.
    pub fn try_recv(&mut self) -> Option<Settings> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}
