//! Question sources
//!
//! Questions come either from the built-in sample set, re-shuffled on every
//! load, or from the remote generator. A generated batch is accepted only if
//! every record in it is valid; otherwise the caller falls back to the sample
//! set.

use log::{debug, warn};
use thiserror::Error;

use crate::{
    constants,
    generation::{self, Generator},
    question::{InvalidQuestion, Question, QuestionId},
};

/// The built-in fallback questions, in fixture order
pub fn sample_questions() -> Vec<Question> {
    vec![
        Question::from_parts(
            "q1",
            "What is the capital of France?",
            ["Berlin", "Madrid", "Paris", "Rome"],
            "Paris",
            "Paris is the capital and most populous city of France.",
        ),
        Question::from_parts(
            "q2",
            "Which HTML tag is used to define an internal style sheet?",
            ["<script>", "<css>", "<style>", "<link>"],
            "<style>",
            "The <style> tag is used to define style information (CSS) for an HTML document.",
        ),
        Question::from_parts(
            "q3",
            "What is the largest ocean on Earth?",
            [
                "Atlantic Ocean",
                "Indian Ocean",
                "Arctic Ocean",
                "Pacific Ocean",
            ],
            "Pacific Ocean",
            "The Pacific Ocean is the largest and deepest of Earth's five oceanic divisions.",
        ),
    ]
}

/// Returns the sample set in a fresh random order
pub fn load_sample(rng: &mut fastrand::Rng) -> Vec<Question> {
    let mut questions = sample_questions();
    rng.shuffle(&mut questions);
    questions
}

/// Reasons a topic is refused before any request is made
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicError {
    /// The topic is empty or only whitespace
    #[error("Please enter a topic.")]
    Empty,
    /// The trimmed topic exceeds the maximum length
    #[error("topic is too long")]
    TooLong,
}

/// A validated, trimmed quiz topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Trims and validates user input
    ///
    /// The subject itself is not filtered; any topic may be quizzed on.
    ///
    /// # Errors
    ///
    /// * `TopicError::Empty` - input is empty after trimming whitespace
    /// * `TopicError::TooLong` - the trimmed input exceeds the maximum topic length
    pub fn parse(input: &str) -> Result<Self, TopicError> {
        let topic = rustrict::trim_whitespace(input);
        if topic.is_empty() {
            return Err(TopicError::Empty);
        }
        if topic.len() > constants::generation::MAX_TOPIC_LENGTH {
            return Err(TopicError::TooLong);
        }
        Ok(Self(topic.to_owned()))
    }

    /// Returns the topic text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Instruction asking for a batch of questions about `topic`
pub fn generation_prompt(topic: &Topic) -> String {
    format!(
        "Generate {count} multiple-choice quiz questions about \"{topic}\". \
         Each question should have {options} options, one correct answer, and a brief explanation. \
         Ensure options are distinct and plausible.",
        count = constants::generation::QUESTION_COUNT,
        topic = topic.as_str(),
        options = constants::question::OPTION_COUNT,
    )
}

/// Instruction asking for a longer explanation of `question`'s answer
pub fn elaboration_prompt(question: &Question) -> String {
    format!(
        "The question was: \"{text}\". The correct answer is \"{answer}\". \
         The current explanation is: \"{explanation}\". \
         Please provide a more detailed and elaborate explanation for why \"{answer}\" is correct, \
         possibly including more context or related information.",
        text = question.text(),
        answer = question.correct_answer(),
        explanation = question.explanation(),
    )
}

/// Reasons a generated batch is not used
#[derive(Error, Debug)]
pub enum Error {
    /// The topic was refused
    #[error(transparent)]
    Topic(#[from] TopicError),
    /// The remote call failed
    #[error(transparent)]
    Remote(#[from] generation::Error),
    /// The batch did not contain the expected number of questions
    #[error("Received invalid question format from API.")]
    WrongCount {
        /// Number of questions requested
        expected: usize,
        /// Number of questions received
        actual: usize,
    },
    /// A question in the batch failed validation
    #[error("Received invalid question format from API.")]
    Invalid {
        /// Zero-based position of the first invalid question
        index: usize,
        /// Why it was rejected
        reason: InvalidQuestion,
    },
}

/// Generates a validated batch of questions about `topic`
///
/// # Errors
///
/// * `Error::Remote` - the request failed or returned malformed JSON
/// * `Error::WrongCount` - the batch does not hold exactly the expected count
/// * `Error::Invalid` - any record fails validation; the whole batch is dropped
pub async fn generate<G: Generator>(generator: &G, topic: &Topic) -> Result<Vec<Question>, Error> {
    let generated = generation::questions(generator, &generation_prompt(topic)).await?;

    let expected = constants::generation::QUESTION_COUNT;
    if generated.len() != expected {
        warn!(
            "generated batch has {} questions, expected {expected}",
            generated.len()
        );
        return Err(Error::WrongCount {
            expected,
            actual: generated.len(),
        });
    }

    let questions = generated
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            question
                .into_question(QuestionId::generated(index + 1))
                .map_err(|reason| {
                    warn!("generated question {index} rejected: {reason}");
                    Error::Invalid { index, reason }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("accepted generated batch about {:?}", topic.as_str());

    Ok(questions)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::generation::{Format, testing::ScriptedGenerator};

    fn generated_batch(count: usize) -> serde_json::Value {
        serde_json::Value::Array(
            (0..count)
                .map(|i| {
                    json!({
                        "text": format!("Question {i}?"),
                        "options": ["A", "B", "C", "D"],
                        "correctAnswer": "B",
                        "explanation": format!("Because of {i}."),
                    })
                })
                .collect(),
        )
    }

    fn ids(questions: &[Question]) -> HashSet<String> {
        questions
            .iter()
            .map(|q| q.id().as_str().to_owned())
            .collect()
    }

    #[test]
    fn test_sample_questions_are_valid() {
        for question in sample_questions() {
            let generated = crate::question::GeneratedQuestion {
                text: question.text().to_owned(),
                options: question.options().to_vec(),
                correct_answer: question.correct_answer().to_owned(),
                explanation: question.explanation().to_owned(),
            };
            assert!(generated.check().is_ok(), "{}", question.id());
        }
    }

    #[test]
    fn test_load_sample_is_a_permutation() {
        let mut rng = fastrand::Rng::new();
        for _ in 0..10 {
            let loaded = load_sample(&mut rng);
            assert_eq!(loaded.len(), 3);
            assert_eq!(ids(&loaded), ids(&sample_questions()));
        }
    }

    #[test]
    fn test_load_sample_is_deterministic_with_seed() {
        let first = load_sample(&mut fastrand::Rng::with_seed(7));
        let second = load_sample(&mut fastrand::Rng::with_seed(7));
        assert_eq!(first, second);
    }

    #[test]
    fn test_topic_parse() {
        assert_eq!(Topic::parse("  Solar System ").unwrap().as_str(), "Solar System");
        assert_eq!(Topic::parse("   "), Err(TopicError::Empty));
        assert_eq!(Topic::parse(""), Err(TopicError::Empty));
        assert_eq!(
            Topic::parse(&"a".repeat(constants::generation::MAX_TOPIC_LENGTH + 1)),
            Err(TopicError::TooLong)
        );
    }

    #[test]
    fn test_topic_length_measured_after_trim() {
        let max = constants::generation::MAX_TOPIC_LENGTH;
        let padded = format!("{:>width$}", "b".repeat(max - 5), width = max + 5);
        assert_eq!(Topic::parse(&padded).unwrap().as_str().len(), max - 5);

        let exact = format!("  {}  ", "c".repeat(max));
        assert_eq!(Topic::parse(&exact).unwrap().as_str().len(), max);
    }

    #[test]
    fn test_sensitive_subjects_are_accepted() {
        for subject in [
            "Nazi Germany",
            "Sexual reproduction in plants",
            "The Holocaust",
            "Breast cancer awareness",
            "Slavery in America",
            "Dick Van Dyke films",
        ] {
            assert_eq!(Topic::parse(subject).unwrap().as_str(), subject);
        }
    }

    #[test]
    fn test_empty_topic_message() {
        assert_eq!(TopicError::Empty.to_string(), "Please enter a topic.");
    }

    #[test]
    fn test_prompts_mention_inputs() {
        let topic = Topic::parse("Volcanoes").unwrap();
        let prompt = generation_prompt(&topic);
        assert!(prompt.contains("\"Volcanoes\""));
        assert!(prompt.contains("Generate 5"));
        assert!(prompt.contains("4 options"));

        let question = &sample_questions()[0];
        let prompt = elaboration_prompt(question);
        assert!(prompt.contains(question.text()));
        assert!(prompt.contains("\"Paris\""));
        assert!(prompt.contains(question.explanation()));
    }

    #[tokio::test]
    async fn test_generate_accepts_valid_batch() {
        let generator = ScriptedGenerator::replying(generated_batch(5).to_string());
        let topic = Topic::parse("Letters").unwrap();

        let questions = generate(&generator, &topic).await.unwrap();
        assert_eq!(questions.len(), 5);
        assert_eq!(ids(&questions).len(), 5);
        assert!(questions.iter().all(|q| q.id().as_str().starts_with("gq")));
        assert_eq!(questions[2].text(), "Question 2?");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format, Format::Questions);
        assert!(requests[0].prompt.contains("\"Letters\""));
    }

    #[tokio::test]
    async fn test_generate_mints_new_ids_each_batch() {
        let generator = ScriptedGenerator::new([
            Ok(generated_batch(5).to_string()),
            Ok(generated_batch(5).to_string()),
        ]);
        let topic = Topic::parse("Letters").unwrap();

        let first = generate(&generator, &topic).await.unwrap();
        let second = generate(&generator, &topic).await.unwrap();
        assert!(ids(&first).is_disjoint(&ids(&second)));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_array() {
        let generator = ScriptedGenerator::replying("[]");
        let topic = Topic::parse("Letters").unwrap();

        assert!(matches!(
            generate(&generator, &topic).await,
            Err(Error::WrongCount {
                expected: 5,
                actual: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_generate_rejects_whole_batch_on_one_bad_item() {
        let mut batch = generated_batch(5);
        batch[3]["options"] = json!(["A", "B", "C"]);
        let generator = ScriptedGenerator::replying(batch.to_string());
        let topic = Topic::parse("Letters").unwrap();

        let error = generate(&generator, &topic).await.unwrap_err();
        assert!(matches!(error, Error::Invalid { index: 3, .. }));
        assert_eq!(
            error.to_string(),
            "Received invalid question format from API."
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_answer_outside_options() {
        let mut batch = generated_batch(5);
        batch[0]["correctAnswer"] = json!("E");
        let generator = ScriptedGenerator::replying(batch.to_string());
        let topic = Topic::parse("Letters").unwrap();

        assert!(matches!(
            generate(&generator, &topic).await,
            Err(Error::Invalid {
                index: 0,
                reason: InvalidQuestion::AnswerNotAnOption(_)
            })
        ));
    }

    #[tokio::test]
    async fn test_generate_surfaces_remote_failure() {
        let generator = ScriptedGenerator::failing(generation::Error::MissingContent);
        let topic = Topic::parse("Letters").unwrap();

        let error = generate(&generator, &topic).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Remote(generation::Error::MissingContent)
        ));
        assert_eq!(
            error.to_string(),
            "Failed to get valid content from API response."
        );
    }
}
