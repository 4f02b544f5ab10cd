//! Quiz lifecycle and answer tracking
//!
//! This module contains the [`Quiz`] session: the only stateful part of the
//! engine. It owns the question sequence, the current position, the answer
//! map and the lifecycle state, and it pushes view messages through a
//! [`Tunnel`] after every transition.
//!
//! Two operations suspend on the remote service: question generation and
//! elaboration. Each is split into a `begin_*` half that marks the request
//! as pending and a `finish_*` half that applies the result, so an event loop
//! can keep the session while the request is in flight. The async
//! [`Quiz::generate`] and [`Quiz::elaborate`] wrap both halves.

use std::collections::hash_map::Entry;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    constants,
    generation::{self, Generator},
    question::{Question, QuestionId},
    score::{AnswerMap, Summary},
    session::Tunnel,
    source::{self, Topic},
};

/// Lifecycle state of a quiz session
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    /// Waiting for the user to start or generate a quiz
    #[default]
    #[display("not-started")]
    NotStarted,
    /// A generation request is in flight
    #[display("generating")]
    Generating,
    /// Questions are being answered
    #[display("in-progress")]
    InProgress,
    /// Every question was visited and the score is final
    #[display("completed")]
    Completed,
}

/// Errors for transitions the quiz refuses
#[derive(Error, Debug)]
pub enum Error {
    /// The transition is not available in the current state
    #[error("quiz is {actual}, expected {expected}")]
    WrongState {
        /// State the transition requires
        expected: State,
        /// State the quiz is in
        actual: State,
    },
    /// The current question already has an answer
    #[error("question already answered")]
    AlreadyAnswered,
    /// The current question has not been answered yet
    #[error("current question has not been answered")]
    NoFeedback,
    /// The option is not offered by the current question
    #[error("option is not offered by the current question")]
    UnknownOption,
    /// There are no questions to play
    #[error("no questions loaded")]
    NoQuestions,
    /// A request of the same kind is already in flight
    #[error("a request is already pending")]
    RequestPending,
    /// The elaboration result belongs to a question that is no longer shown
    #[error("elaboration no longer applies to the current question")]
    StaleElaboration,
    /// Question generation failed and the sample set was restored
    #[error(transparent)]
    Generation(#[from] source::Error),
    /// The elaboration request failed
    #[error(transparent)]
    Elaboration(#[from] generation::Error),
}

/// Feedback revealed once the current question is answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// The option the user picked
    pub selected: String,
    /// Whether the pick was correct
    pub correct: bool,
    /// The correct option
    pub correct_answer: String,
    /// The stored explanation
    pub explanation: String,
}

/// Extended explanation for the current question
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Elaboration {
    /// The elaborated text, once received
    pub text: Option<String>,
    /// The failure message, if the request failed
    pub error: Option<String>,
    /// Whether a request is in flight
    pub pending: bool,
}

/// Handle for an in-flight elaboration request
#[derive(Debug, Clone)]
pub struct ElaborationTicket {
    question_id: QuestionId,
    epoch: u64,
    /// The instruction to send to the generator
    pub prompt: String,
}

/// Events produced by user input
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// The topic input changed
    SetTopic(String),
    /// Start the quiz with the loaded questions
    Start,
    /// Answer selected by option index
    IndexAnswer(usize),
    /// Advance to the next question or finish
    Next,
    /// Return to the start screen after completion
    Restart,
}

/// Update messages describing a single change to the view
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The start screen changed
    Welcome {
        /// Current topic input
        topic: String,
        /// Generation failure or topic message
        error: Option<String>,
        /// Number of loaded questions
        count: usize,
        /// Whether generation is in flight
        generating: bool,
    },
    /// A question is now displayed
    QuestionAnnouncement {
        /// Index of the question (0-based)
        index: usize,
        /// Total number of questions
        count: usize,
        /// The question text
        question: String,
        /// The answer options
        options: Vec<String>,
    },
    /// The current question was answered
    Feedback(Feedback),
    /// The elaboration slot changed
    Elaboration(Elaboration),
    /// The quiz is finished
    Summary(Summary),
}

/// Sync messages carrying everything needed to render the current screen
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// The start screen
    Welcome {
        /// Current topic input
        topic: String,
        /// Generation failure or topic message
        error: Option<String>,
        /// Number of loaded questions
        count: usize,
        /// Whether generation is in flight
        generating: bool,
    },
    /// A question screen
    Question {
        /// Index of the question (0-based)
        index: usize,
        /// Total number of questions
        count: usize,
        /// The question text
        question: String,
        /// The answer options
        options: Vec<String>,
        /// Feedback, once answered
        feedback: Option<Feedback>,
        /// Elaboration slot
        elaboration: Elaboration,
    },
    /// The results screen
    Summary(Summary),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A single-user quiz session
#[derive(Debug)]
pub struct Quiz {
    /// The active question sequence
    questions: Vec<Question>,
    /// Index of the displayed question
    current: usize,
    /// The selected option per answered question
    answers: AnswerMap,
    /// Current lifecycle state
    state: State,
    /// Whether feedback is showing for the current question
    feedback_shown: bool,
    /// Final score, set on completion
    score: usize,
    /// Raw topic input
    topic: String,
    /// Last generation failure or topic message
    generation_error: Option<String>,
    /// Elaboration slot for the current question
    elaboration: Elaboration,
    /// Bumped whenever the elaboration slot is cleared
    elaboration_epoch: u64,
    /// Random source for shuffling the sample set
    rng: fastrand::Rng,
}

impl Default for Quiz {
    fn default() -> Self {
        Self::new()
    }
}

// Accessors
impl Quiz {
    /// Returns the lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the loaded question sequence
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the index of the displayed question
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Returns the displayed question, if any
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Returns the recorded answers
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Returns the final score; zero until the quiz is completed
    pub fn score(&self) -> usize {
        self.score
    }

    /// Whether feedback is showing for the current question
    pub fn is_feedback_shown(&self) -> bool {
        self.feedback_shown
    }

    /// Returns the raw topic input
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the last generation failure message
    pub fn generation_error(&self) -> Option<&str> {
        self.generation_error.as_deref()
    }

    /// Returns the elaboration slot
    pub fn elaboration(&self) -> &Elaboration {
        &self.elaboration
    }

    /// Returns the result summary once the quiz is completed
    pub fn summary(&self) -> Option<Summary> {
        matches!(self.state, State::Completed)
            .then(|| Summary::new(&self.questions, &self.answers))
    }

    /// Feedback for the current question, if it is showing
    pub fn feedback(&self) -> Option<Feedback> {
        if !self.feedback_shown {
            return None;
        }
        let question = self.current_question()?;
        let selected = self.answers.get(question.id())?;

        Some(Feedback {
            selected: selected.clone(),
            correct: question.is_correct(selected),
            correct_answer: question.correct_answer().to_owned(),
            explanation: question.explanation().to_owned(),
        })
    }
}

// Convenience methods
impl Quiz {
    fn expect_state(&self, expected: State) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::WrongState {
                expected,
                actual: self.state,
            })
        }
    }

    fn clear_elaboration(&mut self) {
        self.elaboration = Elaboration::default();
        self.elaboration_epoch = self.elaboration_epoch.wrapping_add(1);
    }

    /// Resets progress and enters `in-progress` with the loaded questions
    fn begin_round(&mut self) {
        self.current = 0;
        self.answers.clear();
        self.score = 0;
        self.feedback_shown = false;
        self.clear_elaboration();
        self.state = State::InProgress;
    }

    fn welcome_message(&self) -> UpdateMessage {
        UpdateMessage::Welcome {
            topic: self.topic.clone(),
            error: self.generation_error.clone(),
            count: self.questions.len(),
            generating: matches!(self.state, State::Generating),
        }
    }

    fn question_message(&self) -> Option<UpdateMessage> {
        let question = self.current_question()?;

        Some(UpdateMessage::QuestionAnnouncement {
            index: self.current,
            count: self.questions.len(),
            question: question.text().to_owned(),
            options: question.options().to_vec(),
        })
    }

    fn announce_question<T: Tunnel>(&self, tunnel: &T) {
        if let Some(message) = self.question_message() {
            tunnel.send_message(&message);
        }
    }
}

impl Quiz {
    /// Creates a session with a freshly shuffled sample set
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Creates a session shuffling with the given random source
    ///
    /// Seeding the source makes sample ordering reproducible.
    pub fn with_rng(mut rng: fastrand::Rng) -> Self {
        Self {
            questions: source::load_sample(&mut rng),
            current: 0,
            answers: AnswerMap::new(),
            state: State::NotStarted,
            feedback_shown: false,
            score: 0,
            topic: String::new(),
            generation_error: None,
            elaboration: Elaboration::default(),
            elaboration_epoch: 0,
            rng,
        }
    }

    /// Stores the topic input
    ///
    /// # Errors
    ///
    /// `Error::WrongState` unless the quiz is `not-started`.
    pub fn set_topic(&mut self, topic: impl Into<String>) -> Result<(), Error> {
        self.expect_state(State::NotStarted)?;
        self.topic = topic.into();
        Ok(())
    }

    /// Starts the quiz with the loaded question set
    ///
    /// # Errors
    ///
    /// * `Error::WrongState` - the quiz is not `not-started`
    /// * `Error::NoQuestions` - the question set is empty
    pub fn start<T: Tunnel>(&mut self, tunnel: &T) -> Result<(), Error> {
        self.expect_state(State::NotStarted)?;
        if self.questions.is_empty() {
            return Err(Error::NoQuestions);
        }

        self.begin_round();
        debug!("quiz started with {} questions", self.questions.len());
        self.announce_question(tunnel);

        Ok(())
    }

    /// Records `option` as the answer to the current question
    ///
    /// Reveals feedback and clears any elaboration. A question accepts one
    /// answer only; later attempts leave the stored answer untouched.
    ///
    /// # Errors
    ///
    /// * `Error::WrongState` - the quiz is not `in-progress`
    /// * `Error::AlreadyAnswered` - feedback is already showing
    /// * `Error::UnknownOption` - `option` is not one of the current options
    pub fn select_answer<T: Tunnel>(&mut self, option: &str, tunnel: &T) -> Result<(), Error> {
        self.expect_state(State::InProgress)?;
        if self.feedback_shown {
            return Err(Error::AlreadyAnswered);
        }
        let question = self.current_question().ok_or(Error::NoQuestions)?;
        if !question.has_option(option) {
            return Err(Error::UnknownOption);
        }
        let id = question.id().clone();

        match self.answers.entry(id) {
            Entry::Occupied(_) => return Err(Error::AlreadyAnswered),
            Entry::Vacant(v) => {
                v.insert(option.to_owned());
            }
        }

        self.feedback_shown = true;
        self.clear_elaboration();

        if let Some(feedback) = self.feedback() {
            tunnel.send_message(&UpdateMessage::Feedback(feedback));
        }

        Ok(())
    }

    /// Records the option at `index` as the answer to the current question
    ///
    /// # Errors
    ///
    /// Same as [`Quiz::select_answer`]; an out-of-range index is
    /// `Error::UnknownOption`.
    pub fn select_index<T: Tunnel>(&mut self, index: usize, tunnel: &T) -> Result<(), Error> {
        self.expect_state(State::InProgress)?;
        let option = self
            .current_question()
            .and_then(|question| question.options().get(index))
            .cloned()
            .ok_or(Error::UnknownOption)?;

        self.select_answer(&option, tunnel)
    }

    /// Moves to the next question, or completes the quiz after the last one
    ///
    /// # Errors
    ///
    /// * `Error::WrongState` - the quiz is not `in-progress`
    /// * `Error::NoFeedback` - the current question is unanswered
    pub fn next<T: Tunnel>(&mut self, tunnel: &T) -> Result<(), Error> {
        self.expect_state(State::InProgress)?;
        if !self.feedback_shown {
            return Err(Error::NoFeedback);
        }

        self.feedback_shown = false;
        self.clear_elaboration();

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.announce_question(tunnel);
        } else {
            self.complete(tunnel);
        }

        Ok(())
    }

    fn complete<T: Tunnel>(&mut self, tunnel: &T) {
        let summary = Summary::new(&self.questions, &self.answers);
        self.score = summary.score;
        self.state = State::Completed;

        info!("quiz completed with {}/{}", summary.score, summary.total);
        tunnel.send_message(&UpdateMessage::Summary(summary));
    }

    /// Returns to the start screen with a freshly shuffled sample set
    ///
    /// Clears the topic, the answers, the score and any generation message.
    ///
    /// # Errors
    ///
    /// `Error::WrongState` unless the quiz is `completed`.
    pub fn restart<T: Tunnel>(&mut self, tunnel: &T) -> Result<(), Error> {
        self.expect_state(State::Completed)?;

        self.questions = source::load_sample(&mut self.rng);
        self.topic.clear();
        self.current = 0;
        self.answers.clear();
        self.score = 0;
        self.feedback_shown = false;
        self.generation_error = None;
        self.clear_elaboration();
        self.state = State::NotStarted;

        tunnel.send_message(&self.welcome_message());

        Ok(())
    }

    /// Validates the topic and enters `generating`
    ///
    /// An invalid topic keeps the quiz `not-started` and stores the topic
    /// message as the generation error.
    ///
    /// # Errors
    ///
    /// * `Error::RequestPending` - a generation is already in flight
    /// * `Error::WrongState` - the quiz is not `not-started`
    /// * `Error::Generation` - the topic was refused
    pub fn begin_generation<T: Tunnel>(&mut self, tunnel: &T) -> Result<Topic, Error> {
        if matches!(self.state, State::Generating) {
            return Err(Error::RequestPending);
        }
        self.expect_state(State::NotStarted)?;

        let topic = match Topic::parse(&self.topic) {
            Ok(topic) => topic,
            Err(e) => {
                self.generation_error = Some(e.to_string());
                tunnel.send_message(&self.welcome_message());
                return Err(source::Error::from(e).into());
            }
        };

        self.generation_error = None;
        self.state = State::Generating;
        info!("generating quiz about {:?}", topic.as_str());
        tunnel.send_message(&self.welcome_message());

        Ok(topic)
    }

    /// Applies the outcome of a generation request
    ///
    /// On success the new questions replace the set and the quiz starts. On
    /// failure the sample set is reloaded and the quiz returns to
    /// `not-started` with a message; it does not start on its own.
    ///
    /// # Errors
    ///
    /// * `Error::WrongState` - no generation is in flight
    /// * `Error::Generation` - the outcome was a failure (already handled)
    pub fn finish_generation<T: Tunnel>(
        &mut self,
        outcome: Result<Vec<Question>, source::Error>,
        tunnel: &T,
    ) -> Result<(), Error> {
        self.expect_state(State::Generating)?;

        let outcome = outcome.and_then(|questions| {
            if questions.is_empty() {
                Err(source::Error::WrongCount {
                    expected: constants::generation::QUESTION_COUNT,
                    actual: 0,
                })
            } else {
                Ok(questions)
            }
        });

        match outcome {
            Ok(questions) => {
                self.questions = questions;
                self.begin_round();
                info!("generated quiz started with {} questions", self.questions.len());
                self.announce_question(tunnel);
                Ok(())
            }
            Err(e) => {
                warn!("quiz generation failed: {e}");
                self.generation_error = Some(format!(
                    "Failed to generate quiz: {}. Please try again or use the sample quiz.",
                    e.to_string().trim_end_matches('.')
                ));
                self.questions = source::load_sample(&mut self.rng);
                self.state = State::NotStarted;
                tunnel.send_message(&self.welcome_message());
                Err(e.into())
            }
        }
    }

    /// Generates a quiz about the stored topic and starts it
    ///
    /// # Errors
    ///
    /// See [`Quiz::begin_generation`] and [`Quiz::finish_generation`].
    pub async fn generate<G: Generator, T: Tunnel>(
        &mut self,
        generator: &G,
        tunnel: &T,
    ) -> Result<(), Error> {
        let topic = self.begin_generation(tunnel)?;
        let outcome = source::generate(generator, &topic).await;
        self.finish_generation(outcome, tunnel)
    }

    /// Marks an elaboration of the current question as pending
    ///
    /// # Errors
    ///
    /// * `Error::WrongState` - the quiz is not `in-progress`
    /// * `Error::NoFeedback` - the current question is unanswered
    /// * `Error::RequestPending` - an elaboration is already in flight
    pub fn begin_elaboration<T: Tunnel>(&mut self, tunnel: &T) -> Result<ElaborationTicket, Error> {
        self.expect_state(State::InProgress)?;
        if !self.feedback_shown {
            return Err(Error::NoFeedback);
        }
        if self.elaboration.pending {
            return Err(Error::RequestPending);
        }
        let question = self.current_question().ok_or(Error::NoQuestions)?;
        let ticket = ElaborationTicket {
            question_id: question.id().clone(),
            epoch: self.elaboration_epoch,
            prompt: source::elaboration_prompt(question),
        };

        self.elaboration.pending = true;
        self.elaboration.error = None;
        tunnel.send_message(&UpdateMessage::Elaboration(self.elaboration.clone()));

        Ok(ticket)
    }

    /// Applies the outcome of an elaboration request
    ///
    /// # Errors
    ///
    /// * `Error::StaleElaboration` - the question changed or was re-answered
    ///   since the ticket was issued; the result is dropped
    /// * `Error::Elaboration` - the request failed; the message is stored
    pub fn finish_elaboration<T: Tunnel>(
        &mut self,
        ticket: ElaborationTicket,
        result: Result<String, generation::Error>,
        tunnel: &T,
    ) -> Result<(), Error> {
        let current = self.current_question().map(Question::id);
        if ticket.epoch != self.elaboration_epoch
            || !matches!(self.state, State::InProgress)
            || current != Some(&ticket.question_id)
        {
            debug!("dropping elaboration for {}", ticket.question_id);
            return Err(Error::StaleElaboration);
        }

        self.elaboration.pending = false;
        let outcome = match result {
            Ok(text) => {
                self.elaboration.text = Some(text);
                self.elaboration.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("elaboration failed: {e}");
                self.elaboration.text = None;
                self.elaboration.error = Some(format!("Failed to get elaboration: {e}"));
                Err(e.into())
            }
        };

        tunnel.send_message(&UpdateMessage::Elaboration(self.elaboration.clone()));

        outcome
    }

    /// Fetches an elaborated explanation for the current question
    ///
    /// # Errors
    ///
    /// See [`Quiz::begin_elaboration`] and [`Quiz::finish_elaboration`].
    pub async fn elaborate<G: Generator, T: Tunnel>(
        &mut self,
        generator: &G,
        tunnel: &T,
    ) -> Result<(), Error> {
        let ticket = self.begin_elaboration(tunnel)?;
        let result = generation::text(generator, &ticket.prompt).await;
        self.finish_elaboration(ticket, result, tunnel)
    }

    /// Handles a synchronous user event
    ///
    /// Events that are not valid in the current state are ignored, the same
    /// way a disabled control ignores clicks.
    pub fn receive_message<T: Tunnel>(&mut self, message: IncomingMessage, tunnel: &T) {
        let result = match message {
            IncomingMessage::SetTopic(topic) => self.set_topic(topic),
            IncomingMessage::Start => self.start(tunnel),
            IncomingMessage::IndexAnswer(index) => self.select_index(index, tunnel),
            IncomingMessage::Next => self.next(tunnel),
            IncomingMessage::Restart => self.restart(tunnel),
        };

        if let Err(e) = result {
            debug!("ignoring event: {e}");
        }
    }

    /// Returns the message necessary to render the current screen
    pub fn state_message(&self) -> SyncMessage {
        match self.state {
            State::NotStarted | State::Generating => SyncMessage::Welcome {
                topic: self.topic.clone(),
                error: self.generation_error.clone(),
                count: self.questions.len(),
                generating: matches!(self.state, State::Generating),
            },
            State::InProgress => match self.current_question() {
                Some(question) => SyncMessage::Question {
                    index: self.current,
                    count: self.questions.len(),
                    question: question.text().to_owned(),
                    options: question.options().to_vec(),
                    feedback: self.feedback(),
                    elaboration: self.elaboration.clone(),
                },
                None => SyncMessage::Welcome {
                    topic: self.topic.clone(),
                    error: None,
                    count: 0,
                    generating: false,
                },
            },
            State::Completed => {
                SyncMessage::Summary(Summary::new(&self.questions, &self.answers))
            }
        }
    }

    /// Sends the current screen to the view
    pub fn sync<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_state(&self.state_message());
    }
}
