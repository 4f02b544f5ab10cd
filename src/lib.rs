//! # MCQ Quiz Library
//!
//! This library provides the engine behind a single-user multiple-choice
//! quiz. It handles the quiz lifecycle, answer tracking and scoring, the
//! built-in sample question set, and the optional generation of question
//! sets and extended explanations through a remote text-generation service.
//!
//! Rendering is left to the caller: the [`quiz::Quiz`] session pushes
//! serializable view messages through a [`session::Tunnel`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod constants;
pub mod generation;
pub mod question;
pub mod quiz;
pub mod score;
pub mod session;
pub mod source;
