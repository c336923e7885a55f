//! The request forwarder: validate, build the upstream URL, issue one GET, relay the JSON.
use crate::client::HttpClient;
use crate::endpoint::{EndpointSpec, build_endpoint};
use crate::errors::{RelayError, TransportError};
use crate::schema::validate;
use axum::{body::Body, http::StatusCode};
use bon::Builder;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A decoded upstream reply. The status is the upstream's own, error statuses included.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Builder)]
pub struct Forwarder<T: HttpClient> {
    client: T,
    base_url: Url,
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
}

impl<T: HttpClient> Forwarder<T> {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Validates `params` against `spec`, then forwards to the built endpoint.
    ///
    /// `params` should list path captures before query pairs; the first occurrence of a name
    /// wins. Nothing is sent upstream when validation fails.
    #[instrument(skip(self, spec, params), fields(endpoint = spec.name))]
    pub async fn relay(
        &self,
        spec: &'static EndpointSpec,
        params: &[(String, String)],
    ) -> Result<Relayed, RelayError> {
        let validated = validate(spec.params, params).inspect_err(|err| {
            debug!(fields = ?err.fields.keys().collect::<Vec<_>>(), "Rejected request");
        })?;
        let endpoint = build_endpoint(&self.base_url, spec.path, &validated)?;
        Ok(self.forward(&endpoint).await?)
    }

    /// Issues a single GET to `endpoint` and decodes the body as JSON.
    #[instrument(skip(self))]
    pub async fn forward(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        let req = axum::http::Request::builder()
            .method("GET")
            .uri(endpoint)
            .body(Body::empty())
            .map_err(|e| TransportError::Unreachable(Box::new(e)))?;

        let exchange = async {
            let response = self
                .client
                .request(req)
                .await
                .map_err(TransportError::Unreachable)?;
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .map_err(TransportError::Body)?;
            Ok::<_, TransportError>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        // An empty body (204, bare 200) is relayed as `null`.
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|source| TransportError::MalformedJson { status, source })?
        };

        info!("Upstream answered {} for {}", status, endpoint);
        Ok(Relayed { status, body })
    }
}
