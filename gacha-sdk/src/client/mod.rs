//! HTTP client for the bet API.
//!
//! Gated behind the `client` cargo feature so crates that only need the
//! shared types do not pull in `reqwest`.

use reqwest::{Client, StatusCode};
use url::Url;

use crate::objects::{BetStatusResponse, ErrorResponse, PlaceBetRequest, PlaceBetResponse};

/// Errors produced by [`BetClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status. `message` is the `error`
    /// field of the payload when it could be parsed.
    #[error("api error: status {status}, message: {message}")]
    Api { status: StatusCode, message: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed HTTP client for the bet API.
#[derive(Debug, Clone)]
pub struct BetClient {
    http: Client,
    base_url: Url,
}

impl BetClient {
    /// Create a new `BetClient` for a server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/bet` – place a bet and get its correlation id.
    pub async fn place_bet(
        &self,
        multiplier: u8,
        amount: impl Into<String>,
    ) -> Result<PlaceBetResponse, ClientError> {
        let url = self.base_url.join("/api/bet")?;
        let body = PlaceBetRequest {
            multiplier,
            amount: amount.into(),
        };

        let resp = self.http.post(url).json(&body).send().await?;

        parse_response(resp).await
    }

    /// `GET /api/bet/{correlation_id}/status` – poll the resolution of a bet.
    ///
    /// Both the pending (`202`) and resolved (`200`) answers are successes.
    pub async fn bet_status(&self, correlation_id: &str) -> Result<BetStatusResponse, ClientError> {
        let path = format!(
            "/api/bet/{}/status",
            urlencoding::encode(correlation_id)
        );
        let url = self.base_url.join(&path)?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(ClientError::Api { status, message });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
