use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Transport-level failure: no HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("{0}")]
    Other(String),
}

/// Trait for the outbound HTTP call
///
/// This trait allows for mocking the HTTP client for testing purposes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET to `url` and return the response status code.
    ///
    /// The response body is not read.
    async fn get(&self, url: &str) -> Result<u16, TransportError>;
}

/// Mock transport for testing
///
/// Responses are popped from a queue (200 once the queue is empty). With a gate installed every
/// call parks until the test hands out a permit, which keeps a command in flight for as long as
/// a test needs.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<u16, TransportError>>>,
    calls: std::sync::Mutex<Vec<String>>,
    gate: Option<std::sync::Arc<tokio::sync::Semaphore>>,
    in_flight: std::sync::atomic::AtomicUsize,
    max_in_flight: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        use std::sync::atomic::Ordering;

        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(200))
    }
}

#[cfg(test)]
impl MockTransport {
    /// Create a new mock transport answering 200 to everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: u16) -> Self {
        let mock = Self::new();
        mock.push_response(Ok(status));
        mock
    }

    pub fn with_error(error: TransportError) -> Self {
        let mock = Self::new();
        mock.push_response(Err(error));
        mock
    }

    /// Park every call until a permit is added to the returned semaphore
    pub fn gated(mut self) -> (Self, std::sync::Arc<tokio::sync::Semaphore>) {
        let gate = std::sync::Arc::new(tokio::sync::Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn push_response(&self, response: Result<u16, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Real transport implementation using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout.
    ///
    /// Redirects are not followed: one command is exactly one request, and a 3xx answer counts
    /// as a failure.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none());

        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        debug!("GET {} -> {}", url, status);
        Ok(status)
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() || e.is_request() {
        TransportError::Request(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::header;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn test_router() -> Router {
        Router::new()
            .route("/on", get(|| async { StatusCode::NO_CONTENT }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/moved",
                get(|| async { (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/on")]) }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    StatusCode::OK
                }),
            )
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_status() {
        let addr = serve(test_router()).await;
        let transport = ReqwestTransport::new(Duration::from_secs(5), Some("ledctl-test")).unwrap();

        assert_eq!(transport.get(&format!("http://{addr}/on")).await, Ok(204));
        assert_eq!(transport.get(&format!("http://{addr}/broken")).await, Ok(500));
        assert_eq!(transport.get(&format!("http://{addr}/nowhere")).await, Ok(404));
    }

    #[tokio::test]
    async fn test_reqwest_transport_does_not_follow_redirects() {
        let addr = serve(test_router()).await;
        let transport = ReqwestTransport::new(Duration::from_secs(5), None).unwrap();

        assert_eq!(transport.get(&format!("http://{addr}/moved")).await, Ok(301));
    }

    #[tokio::test]
    async fn test_reqwest_transport_timeout() {
        let addr = serve(test_router()).await;
        let transport = ReqwestTransport::new(Duration::from_millis(100), None).unwrap();

        let err = transport
            .get(&format!("http://{addr}/slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5), None).unwrap();
        let err = transport.get(&format!("http://{addr}/on")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_reqwest_transport_invalid_url() {
        let transport = ReqwestTransport::new(Duration::from_secs(5), None).unwrap();
        let err = transport.get("not a url").await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)), "got {err:?}");
    }
}
