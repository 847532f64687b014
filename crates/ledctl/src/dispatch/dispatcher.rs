use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::transport::Transport;

/// Why a dispatch did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No URL configured for the command
    #[error("no URL configured")]
    EmptyUrl,

    /// The request never produced an HTTP response (DNS, refused connection, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived with a status outside 200-299
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Result of a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure(DispatchError),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

/// Fires one GET per call and classifies the answer.
///
/// Holds no per-call state: clones share the transport and calls never wait on each other.
pub struct Dispatcher<T> {
    transport: Arc<T>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
        }
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Issue the request for `url`. Blank URLs fail without touching the network.
    pub async fn dispatch(&self, url: &str) -> CommandOutcome {
        if url.trim().is_empty() {
            debug!("Refusing to dispatch: URL is empty");
            return CommandOutcome::Failure(DispatchError::EmptyUrl);
        }

        info!("Dispatching GET {}", url);
        match self.transport.get(url).await {
            Ok(status) if (200..=299).contains(&status) => {
                info!("GET {} succeeded with status {}", url, status);
                CommandOutcome::Success
            }
            Ok(status) => {
                warn!("GET {} returned status {}", url, status);
                CommandOutcome::Failure(DispatchError::Status(status))
            }
            Err(e) => {
                warn!("GET {} failed: {}", url, e);
                CommandOutcome::Failure(DispatchError::Network(e.to_string()))
            }
        }
    }
}
