use std::env;
use std::fmt;

use anyhow::Context;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

// Environment variable override for the suggestion API key
const API_KEY_ENV: &str = "KIBITZ_API_KEY";

/// Get the effective API key. The environment variable wins over the
/// configured value; checked fresh on each call to pick up runtime changes.
pub fn effective_api_key(configured: &str) -> String {
    if let Ok(env_key) = env::var(API_KEY_ENV) {
        let trimmed = env_key.trim();
        if !trimmed.is_empty() {
            debug!("Using API key from environment variable {}", API_KEY_ENV);
            return trimmed.to_string();
        }
    }
    configured.trim().to_string()
}

/// Why a suggestion fetch produced nothing. The responder loop logs these
/// and keeps the previous suggestion; they never propagate further.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    Request(reqwest::Error),
    /// The server answered with a non-success status
    Status(reqwest::StatusCode),
    /// The response body did not carry a usable suggestion
    MalformedResponse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "request failed: {}", e),
            Self::Status(status) => write!(f, "API returned status {}", status),
            Self::MalformedResponse(detail) => {
                write!(f, "malformed API response: {}", detail)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SuggestionRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    text: Option<SuggestionText>,
}

#[derive(Debug, Deserialize)]
struct SuggestionText {
    #[serde(default)]
    choices: Vec<SuggestionChoice>,
}

#[derive(Debug, Deserialize)]
struct SuggestionChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_content(body: SuggestionResponse) -> Option<String> {
    body.text?
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|content| !content.is_empty())
}

/// Client for the suggestion API: one POST per fetch cycle carrying the
/// transcript, answered with a chat-completion shaped body.
pub struct SuggestionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SuggestionClient {
    pub fn new(endpoint: impl Into<String>, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(api_key).context("Invalid API key header value")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Fetch one suggestion for the given transcript snapshot. Any network,
    /// status, or body-shape problem is a `FetchError`.
    pub async fn fetch_suggestion(&self, transcript: &str) -> Result<String, FetchError> {
        debug!("Requesting suggestion from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&SuggestionRequest {
                question: transcript,
            })
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body: SuggestionResponse = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        extract_content(body).ok_or_else(|| {
            FetchError::MalformedResponse(
                "missing text.choices[0].message.content".to_string(),
            )
        })
    }
}
