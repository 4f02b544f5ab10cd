//! Remote text generation
//!
//! This module defines the seam between the quiz engine and a generative
//! text service. A [`Generator`] issues exactly one request per call and
//! returns the raw text of the first candidate; the helpers in this module
//! turn that text into question records or keep it as free text.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use crate::question::GeneratedQuestion;

pub mod gemini;

/// How the service should shape its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
    /// Free text
    Text,
    /// A JSON array of question records
    Questions,
}

/// A single generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    /// The natural-language instruction sent to the service
    pub prompt: String,
    /// Whether the response must be structured question data
    pub format: Format,
}

impl Request {
    /// Creates a free text request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: Format::Text,
        }
    }

    /// Creates a structured question-array request
    pub fn questions(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: Format::Questions,
        }
    }
}

/// Errors raised by a single generation call
#[derive(Error, Debug)]
pub enum Error {
    /// The service answered with a non-success status
    #[error("API request failed with status {status}: {message}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// The service's error message, or the status reason
        message: String,
    },
    /// The request could not be sent or the body could not be read
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// The response did not contain a candidate text part
    #[error("Failed to get valid content from API response.")]
    MissingContent,
    /// The returned text was not the expected JSON
    #[error("malformed JSON in API response: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// A generative text service
///
/// Implementations send exactly one request per call, with no retries and
/// no caching, and resolve to the text of the first candidate.
pub trait Generator {
    /// Sends `request` and returns the first candidate's text
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the call fails or the response carries no
    /// text.
    fn complete(&self, request: &Request) -> impl Future<Output = Result<String, Error>> + Send;
}

/// Requests a question array and parses the returned JSON
///
/// # Errors
///
/// Propagates the generator's error, or `Error::MalformedJson` when the text
/// is not an array of question-shaped objects.
pub async fn questions<G: Generator>(
    generator: &G,
    prompt: &str,
) -> Result<Vec<GeneratedQuestion>, Error> {
    let text = generator.complete(&Request::questions(prompt)).await?;

    Ok(serde_json::from_str(&text)?)
}

/// Requests free text
///
/// # Errors
///
/// Propagates the generator's error.
pub async fn text<G: Generator>(generator: &G, prompt: &str) -> Result<String, Error> {
    generator.complete(&Request::text(prompt)).await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use super::{Error, Generator, Request};

    /// Generator that replays canned responses and records requests
    #[derive(Default)]
    pub struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, Error>>>,
        pub requests: Mutex<Vec<Request>>,
    }

    impl ScriptedGenerator {
        pub fn new(responses: impl IntoIterator<Item = Result<String, Error>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::default(),
            }
        }

        pub fn replying(text: impl Into<String>) -> Self {
            Self::new([Ok(text.into())])
        }

        pub fn failing(error: Error) -> Self {
            Self::new([Err(error)])
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Generator for ScriptedGenerator {
        async fn complete(&self, request: &Request) -> Result<String, Error> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(Error::MissingContent))
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;

    #[tokio::test]
    async fn test_questions_parses_array() {
        let generator = ScriptedGenerator::replying(
            r#"[{"text":"Q","options":["a","b","c","d"],"correctAnswer":"a","explanation":"e"}]"#,
        );

        let parsed = questions(&generator, "prompt").await.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].correct_answer, "a");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].format, Format::Questions);
        assert_eq!(requests[0].prompt, "prompt");
    }

    #[tokio::test]
    async fn test_questions_rejects_non_array() {
        let generator = ScriptedGenerator::replying(r#"{"questions": []}"#);
        assert!(matches!(
            questions(&generator, "prompt").await,
            Err(Error::MalformedJson(_))
        ));
    }

    #[tokio::test]
    async fn test_questions_rejects_garbage() {
        let generator = ScriptedGenerator::replying("Sure! Here are your questions:");
        assert!(matches!(
            questions(&generator, "prompt").await,
            Err(Error::MalformedJson(_))
        ));
    }

    #[tokio::test]
    async fn test_text_passes_through() {
        let generator = ScriptedGenerator::replying("A longer explanation.");
        assert_eq!(
            text(&generator, "explain").await.unwrap(),
            "A longer explanation."
        );
        assert_eq!(generator.requests.lock().unwrap()[0].format, Format::Text);
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let generator = ScriptedGenerator::failing(Error::Status {
            status: 503,
            message: "overloaded".to_string(),
        });
        let error = text(&generator, "explain").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "API request failed with status 503: overloaded"
        );
    }
}
