//! A recording stand-in for the upstream HTTP client.
use crate::client::HttpClient;
use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockHttpClient {
    pub requests: Arc<Mutex<Vec<MockRequest>>>,
    response_builder: Arc<dyn Fn() -> MockOutcome + Send + Sync>,
    delay: Option<Duration>,
}

enum MockOutcome {
    Respond(axum::response::Response),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockHttpClient {
    pub fn new(status: StatusCode, body: &str) -> Self {
        let body = body.to_string();
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_builder: Arc::new(move || {
                MockOutcome::Respond(
                    axum::response::Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(axum::body::Body::from(body.clone()))
                        .unwrap(),
                )
            }),
            delay: None,
        }
    }

    /// A client whose every request fails at the transport level.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_builder: Arc::new(move || MockOutcome::Fail(message.clone())),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl std::fmt::Debug for MockHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHttpClient")
            .field("requests", &self.requests)
            .field("response_builder", &"<closure>")
            .field("delay", &self.delay)
            .finish()
    }
}

impl Clone for MockHttpClient {
    fn clone(&self) -> Self {
        Self {
            requests: Arc::clone(&self.requests),
            response_builder: Arc::clone(&self.response_builder),
            delay: self.delay,
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(
        &self,
        req: axum::extract::Request,
    ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let headers = req
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = axum::body::to_bytes(req.into_body(), usize::MAX)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
            .to_vec();

        self.requests.lock().unwrap().push(MockRequest {
            method,
            uri,
            headers,
            body,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match (self.response_builder)() {
            MockOutcome::Respond(response) => Ok(response),
            MockOutcome::Fail(message) => Err(message.into()),
        }
    }
}
