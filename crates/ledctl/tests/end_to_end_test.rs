use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use ledctl::controller::Notice;
use ledctl::dispatch::Transport;
use ledctl::dispatch::TransportError;
use ledctl::settings::FileBackend;
use ledctl::Command;
use ledctl::Config;
use ledctl::Controller;
use ledctl::Dispatcher;
use ledctl::SettingsStore;
use ledctl::UiState;
use tempfile::TempDir;
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Answers every request with a fixed status and remembers the URLs it was asked for.
#[derive(Default)]
struct FakeTransport {
    status: u16,
    calls: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        Ok(self.status)
    }
}

async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<UiState>,
    predicate: impl FnMut(&UiState) -> bool,
) -> UiState {
    tokio::time::timeout(TIMEOUT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_fresh_store_save_then_turn_on() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    let store = Arc::new(SettingsStore::open(FileBackend::new(&path)).await);
    let transport = Arc::new(FakeTransport {
        status: 200,
        ..FakeTransport::default()
    });
    let controller = Controller::new(store.clone(), Dispatcher::from_shared(transport.clone()));
    let mut rx = controller.watch_state();

    let state = controller.state();
    assert_eq!(state.device_name, "Akıllı LED");
    assert_eq!(state.url_on, "");
    assert_eq!(state.url_off, "");
    assert!(!state.is_busy);
    assert_eq!(state.pending_message, None);

    controller.save_settings("http://a", "http://b", "Lamp").await;
    let state = wait_for(&mut rx, |s| s.device_name == "Lamp").await;
    assert_eq!(state.url_on, "http://a");
    assert_eq!(state.url_off, "http://b");
    assert_eq!(state.pending_message, Some(Notice::Saved.to_string()));
    assert!(controller.acknowledge_message());

    rx.borrow_and_update();
    assert!(controller.turn_on());
    assert!(rx.borrow_and_update().is_busy);

    let state = wait_for(&mut rx, |s| !s.is_busy).await;
    assert_eq!(
        state.pending_message,
        Some(Notice::Sent(Command::TurnOn).to_string())
    );
    assert_eq!(*transport.calls.lock().unwrap(), ["http://a"]);

    // The record survives on disk.
    let reopened = SettingsStore::open(FileBackend::new(&path)).await;
    assert_eq!(
        reopened.read().await,
        ledctl::Settings::new("http://a", "http://b", "Lamp")
    );
}

#[tokio::test]
async fn test_bootstrap_against_loopback_device() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/on",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }),
        )
        .route("/off", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let temp_dir = TempDir::new().unwrap();
    let config = Config::from_toml(&format!(
        "[storage]\npath = {:?}\n\n[dispatch]\ntimeout_secs = 2\n",
        temp_dir.path().join("settings.json")
    ))
    .unwrap();

    let controller = ledctl::bootstrap::open(&config).await.unwrap();
    let mut rx = controller.watch_state();
    controller
        .save_settings(
            format!("http://{addr}/on"),
            format!("http://{addr}/off"),
            "Porch",
        )
        .await;
    wait_for(&mut rx, |s| s.device_name == "Porch").await;

    assert!(controller.turn_on());
    let state = wait_for(&mut rx, |s| !s.is_busy).await;
    assert_eq!(
        state.pending_message,
        Some(Notice::Sent(Command::TurnOn).to_string())
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert!(controller.turn_off());
    let state = wait_for(&mut rx, |s| !s.is_busy).await;
    assert_eq!(
        state.pending_message,
        Some(Notice::Failed(Command::TurnOff, ledctl::DispatchError::Status(503)).to_string())
    );
}
