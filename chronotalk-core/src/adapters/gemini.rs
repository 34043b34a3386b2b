//! Gemini API client
//!
//! Handles a single `generateContent` call against the Google generative
//! language REST API. No streaming, no retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::TextGenerator;

/// Default REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini API client
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Gemini response body (only the fields we read)
#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, `None` if blank
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    /// Create a client; fails fast when the API key is missing
    pub fn new(api_key: &str, model: &str, endpoint: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key not found".to_string()));
        }
        if model.trim().is_empty() {
            return Err(Error::Config("Model name is empty".to_string()));
        }

        let parsed = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid assistant endpoint: {}", e)))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(Error::Config(
                "Assistant endpoint must use HTTP(S)".to_string(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::assistant("Connection to the Gemini API timed out")
        } else if error.is_connect() {
            Error::assistant("Unable to connect to the Gemini API")
        } else {
            Error::assistant(format!("Gemini request failed: {}", error))
        }
    }

    /// Turn a non-success status into an error, using the API's message
    fn status_error(status: u16, body: &str) -> Error {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_default();

        match status {
            400 => Error::assistant(format!("Gemini rejected the request: {}", detail)),
            401 | 403 => Error::assistant(
                "Gemini authentication failed. Check CHRONOTALK_API_KEY.",
            ),
            404 => Error::assistant(format!("Gemini model not found: {}", detail)),
            429 => Error::assistant("Gemini rate limit exceeded. Try again later."),
            500..=599 => Error::assistant(format!(
                "Gemini service is temporarily unavailable (HTTP {})",
                status
            )),
            _ => Error::assistant(format!("Gemini returned HTTP {}: {}", status, detail)),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), &text));
        }

        let data: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::assistant(format!("Failed to parse Gemini response: {}", e)))?;

        Ok(data.text())
    }
}
