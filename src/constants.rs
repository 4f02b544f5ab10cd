//! Configuration constants for the quiz engine
//!
//! This module contains the limits and thresholds used throughout the
//! engine to validate questions, topics and scores.

/// Question shape constants
pub mod question {
    /// Number of answer options every question carries
    pub const OPTION_COUNT: usize = 4;
}

/// Remote generation constants
pub mod generation {
    /// Number of questions a generated batch must contain
    pub const QUESTION_COUNT: usize = 5;
    /// Maximum length of a topic in bytes
    pub const MAX_TOPIC_LENGTH: usize = 200;
    /// Default model used for generation requests
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
    /// Default base URL of the generation service
    pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
}

/// Score feedback thresholds
pub mod score {
    /// Minimum percentage for the top feedback tier
    pub const EXCELLENT_PERCENTAGE: u32 = 80;
    /// Minimum percentage for a passing result
    pub const PASSING_PERCENTAGE: u32 = 50;
}
