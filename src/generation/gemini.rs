//! HTTP client for the Gemini `generateContent` endpoint
//!
//! Every call is a single `POST` carrying the prompt as one user turn. For
//! structured requests the body also carries a response schema asking for an
//! array of question objects. The first candidate's first text part is
//! returned to the caller.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::skip_serializing_none;

use super::{Error, Format, Generator, Request};
use crate::config::Config;

/// Request body of `generateContent`
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The conversation turns, here a single user turn
    pub contents: Vec<Content>,
    /// Output shaping for structured requests
    pub generation_config: Option<GenerationConfig>,
}

/// One conversation turn
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// Author of the turn
    pub role: Option<String>,
    /// Parts of the turn
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of a turn
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    /// Text content of the part
    pub text: Option<String>,
}

/// Output shaping directives
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// MIME type of the response text
    pub response_mime_type: String,
    /// Schema the response text must follow
    pub response_schema: Value,
}

/// Response body of `generateContent`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    /// Generated candidates, best first
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// A generated candidate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// Content of the candidate
    pub content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Schema of a generated question array
fn question_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "text": { "type": "STRING", "description": "The question text." },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Array of 4 answer options."
                },
                "correctAnswer": {
                    "type": "STRING",
                    "description": "The correct answer from the options."
                },
                "explanation": {
                    "type": "STRING",
                    "description": "A brief explanation for the correct answer."
                }
            },
            "required": ["text", "options", "correctAnswer", "explanation"]
        }
    })
}

impl GenerateContentRequest {
    /// Builds the request body for a generation request
    pub fn new(request: &Request) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_owned()),
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: match request.format {
                Format::Text => None,
                Format::Questions => Some(GenerationConfig {
                    response_mime_type: "application/json".to_owned(),
                    response_schema: question_schema(),
                }),
            },
        }
    }
}

impl GenerateContentResponse {
    /// Returns the first candidate's first text part
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingContent` when there is no candidate, no content,
    /// no part or no text.
    pub fn into_text(self) -> Result<String, Error> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(Error::MissingContent)
    }
}

/// Extracts the service's error message from a failed response body
fn error_message(body: &str, reason: Option<&str>) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
        .and_then(|detail| detail.message)
        .or_else(|| reason.map(str::to_owned))
        .unwrap_or_default()
}

/// Gemini-backed [`Generator`]
#[derive(Debug, Clone)]
pub struct Gemini {
    client: reqwest::Client,
    config: Config,
}

impl Gemini {
    /// Creates a client with a default HTTP client
    pub fn new(config: Config) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a client reusing an existing HTTP client
    pub fn with_client(client: reqwest::Client, config: Config) -> Self {
        Self { client, config }
    }

    /// Returns the configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Generator for Gemini {
    async fn complete(&self, request: &Request) -> Result<String, Error> {
        debug!(
            "sending {:?} generation request to {}",
            request.format,
            self.config.model
        );

        let response = self
            .client
            .post(self.config.url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateContentRequest::new(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, status.canonical_reason());
            warn!("generation request failed with status {status}: {message}");
            return Err(Error::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<GenerateContentResponse>().await?.into_text()
    }
}
