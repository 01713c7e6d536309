//! IRC transport: connection, registration and the wire format.
//!
//! The [`client::IrcClient`] owns the socket and surfaces inbound lines as
//! [`Event`]s; the rest of the bot never sees raw IRC. Outbound traffic goes
//! through the [`Outbound`] trait so the dispatch pipeline can be exercised
//! without a server.

pub mod client;
pub mod message;

pub use client::IrcClient;

use crate::commands::Response;

/// An inbound event surfaced to the bot loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Registration completed and the configured channels were joined.
    Ready,
    /// A channel or private message.
    Privmsg {
        /// Nick of the sender.
        sender: String,
        /// Channel name, or the bot's own nick for a private message.
        target: String,
        /// Message text.
        text: String,
    },
}

/// Sink for outbound responses.
///
/// Delivery is fire-and-forget: implementations queue the response and
/// report transport problems through their own logging.
pub trait Outbound: Send + Sync {
    /// Queues one response for sending.
    fn deliver(&self, response: &Response);
}
