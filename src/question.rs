//! Question records and their identifiers
//!
//! A [`Question`] is immutable once created. Questions either come from the
//! built-in sample set or from a [`GeneratedQuestion`] returned by the remote
//! service, which must pass validation before it is given a fresh
//! [`QuestionId`].

use std::{convert::Infallible, fmt::Display, str::FromStr};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

/// An opaque, unique identifier for a question
///
/// Sample questions use short fixed identifiers (`q1`, `q2`, ...), while
/// generated questions receive a freshly minted identifier carrying their
/// position in the batch and a random UUID.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates an identifier from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a new identifier for the generated question at `position` (1-based)
    pub fn generated(position: usize) -> Self {
        Self(format!("gq{position}-{}", Uuid::new_v4().simple()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for QuestionId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// A multiple-choice question with exactly four options
///
/// Only built from the sample fixture or from a validated
/// [`GeneratedQuestion`], so it is serialized but never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier of the question
    id: QuestionId,
    /// The prompt shown to the user
    text: String,
    /// The answer options, in display order
    options: Vec<String>,
    /// The correct option, always one of `options`
    correct_answer: String,
    /// Short explanation revealed with the feedback
    explanation: String,
}

impl Question {
    /// Builds a question from trusted parts (the built-in fixture)
    pub(crate) fn from_parts(
        id: &str,
        text: &str,
        options: [&str; crate::constants::question::OPTION_COUNT],
        correct_answer: &str,
        explanation: &str,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            text: text.to_owned(),
            options: options.iter().map(|&o| o.to_owned()).collect_vec(),
            correct_answer: correct_answer.to_owned(),
            explanation: explanation.to_owned(),
        }
    }

    /// Returns the question identifier
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    /// Returns the prompt text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the answer options in display order
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Returns the correct option
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Returns the stored explanation
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Checks whether `option` is one of this question's options
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Checks whether `answer` is the correct option
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

type ValidationResult = garde::Result;

fn not_blank(value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

fn distinct(options: &[String]) -> ValidationResult {
    if options.iter().all_unique() {
        Ok(())
    } else {
        Err(garde::Error::new("options must be distinct"))
    }
}

/// A question as returned by the remote generation service
///
/// Missing fields deserialize as empty values so that an incomplete record
/// fails validation instead of failing the whole JSON parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedQuestion {
    /// The question text
    #[garde(custom(|v, _| not_blank(v)))]
    pub text: String,
    /// Exactly four distinct answer options
    #[garde(
        length(equal = crate::constants::question::OPTION_COUNT),
        inner(custom(|v, _| not_blank(v))),
        custom(|v, _| distinct(v))
    )]
    pub options: Vec<String>,
    /// The correct answer, which must be one of `options`
    #[garde(custom(|v, _| not_blank(v)))]
    pub correct_answer: String,
    /// A brief explanation of the correct answer
    #[garde(custom(|v, _| not_blank(v)))]
    pub explanation: String,
}

/// Reasons a generated question is rejected
#[derive(Error, Debug)]
pub enum InvalidQuestion {
    /// One or more fields failed validation
    #[error("{0}")]
    Fields(garde::Report),
    /// The correct answer does not match any option
    #[error("correct answer {0:?} is not one of the options")]
    AnswerNotAnOption(String),
}

impl GeneratedQuestion {
    /// Validates the record without consuming it
    ///
    /// # Errors
    ///
    /// * `InvalidQuestion::Fields` - a field is blank, or the options are not
    ///   exactly four distinct strings
    /// * `InvalidQuestion::AnswerNotAnOption` - the correct answer is not listed
    pub fn check(&self) -> Result<(), InvalidQuestion> {
        self.validate().map_err(InvalidQuestion::Fields)?;

        if self.options.contains(&self.correct_answer) {
            Ok(())
        } else {
            Err(InvalidQuestion::AnswerNotAnOption(
                self.correct_answer.clone(),
            ))
        }
    }

    /// Validates the record and turns it into a [`Question`] with the given id
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`GeneratedQuestion::check`].
    pub fn into_question(self, id: QuestionId) -> Result<Question, InvalidQuestion> {
        self.check()?;

        Ok(Question {
            id,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
        })
    }
}
