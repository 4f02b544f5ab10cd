//! View communication
//!
//! This module defines the trait through which the quiz engine pushes view
//! data to whatever renders it. The engine never draws anything itself: every
//! transition emits serializable messages and the tunnel decides how they
//! reach the screen (a terminal, a web socket, a test recorder, ...).

use crate::quiz::{SyncMessage, UpdateMessage};

/// Trait for sending messages to the presentation layer
pub trait Tunnel {
    /// Sends an update message to the view
    ///
    /// Update messages describe a single change, such as a new question being
    /// shown or feedback being revealed.
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full state synchronization message to the view
    ///
    /// Sync messages carry everything needed to render the current screen,
    /// typically when the view first connects or reconnects.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);
}

/// A tunnel that drops every message, for headless use
impl Tunnel for () {
    fn send_message(&self, _message: &UpdateMessage) {}

    fn send_state(&self, _state: &SyncMessage) {}
}
