//! HTTP transport used by the pricing client.

use reqwest::blocking::Client;
use serde_json::Value;
use tierwatch_core::{config::ApiConfig, ApiError, Error, Result, TransportKind};

/// Raw HTTP response: status plus body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON POST and returns whatever came back.
///
/// Implementations report only transport failures as errors; HTTP status
/// handling is left to the caller.
pub trait Transport {
    fn post_json(&self, url: &str, body: &Value) -> std::result::Result<HttpResponse, ApiError>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client with the configured request timeout.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: &Value) -> std::result::Result<HttpResponse, ApiError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else {
        TransportKind::Other
    };
    ApiError::Transport {
        kind,
        message: err.to_string(),
    }
}
