//! Command dispatch pipeline.
//!
//! This module holds the complete path from an inbound chat line to outbound
//! responses:
//!
//! 1. **Parsing** - [`argspec`] compiles free text into structured arguments
//! 2. **Resolution** - [`registry`] maps a token to exactly one command
//! 3. **Dispatch** - [`dispatcher`] gates permissions, invokes the handler
//!    and contains failures
//! 4. **Handlers** - [`handlers`] implement the individual commands
//!
//! # Flow
//!
//! ```text
//! Inbound line → Dispatcher → Registry (resolve) → ArgSpec (parse)
//!              → handler → Lexicon (render) → Responses
//! ```

pub mod argspec;
pub mod dispatcher;
pub mod handlers;
pub mod registry;

use std::sync::Arc;

use mockall::automock;

/// Lazily evaluated per-channel privilege levels for a user.
///
/// The dispatcher asks for a level only when the resolved command requires
/// one, so the lookup cost is not paid for ordinary chat lines.
#[automock]
pub trait PrivilegeSource: Send + Sync {
    /// Returns the privilege level of `user` in `channel` (0 if unknown).
    fn level(&self, user: &str, channel: &str) -> u8;
}

/// How an outbound response is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// A regular message to a channel or nick.
    Message,
    /// An IRC notice.
    Notice,
}

/// A single outbound response ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Channel name or nick to send to.
    pub target: String,
    /// Delivery mode.
    pub mode: SendMode,
    /// Line of text to send. Splitting over-long lines is a transport
    /// concern, not handled here.
    pub text: String,
}

/// What a handler produced.
#[derive(Debug)]
pub enum Reply {
    /// No output.
    None,
    /// One response.
    One(Response),
    /// An ordered sequence of responses; only honoured when the input was
    /// marked multiline by the handler.
    Many(Vec<Response>),
}

/// A single inbound line wrapped with its context.
///
/// Constructed fresh per line and discarded after the responses are sent.
/// Handlers may mutate the output-mode flags (for example setting
/// `multiline`) but nothing else observes an `Input` after dispatch.
pub struct Input {
    /// Raw line text as received.
    pub raw: String,
    /// Nick of the sender.
    pub sender: String,
    /// Channel the line arrived in; equals the sender nick for private
    /// messages.
    pub channel: String,
    /// The line arrived as a private message.
    pub private: bool,
    /// The handler wants its output as notices.
    pub notice: bool,
    /// The handler opted into an ordered multi-response reply.
    pub multiline: bool,
    /// Text following the command token; filled by the dispatcher before a
    /// handler runs, empty otherwise.
    pub args_text: String,
    privileges: Arc<dyn PrivilegeSource>,
}

impl Input {
    /// Wraps an inbound line.
    ///
    /// # Arguments
    ///
    /// * `raw` - The line text
    /// * `sender` - The sending nick
    /// * `channel` - Channel name, or the sender nick for private messages
    /// * `privileges` - Lazy privilege lookup for permission checks
    pub fn new(
        raw: impl Into<String>,
        sender: impl Into<String>,
        channel: impl Into<String>,
        privileges: Arc<dyn PrivilegeSource>,
    ) -> Self {
        let sender = sender.into();
        let channel = channel.into();
        let private = !channel.starts_with('#');

        Input {
            raw: raw.into(),
            sender,
            channel,
            private,
            notice: false,
            multiline: false,
            args_text: String::new(),
            privileges,
        }
    }

    /// Returns the sender's privilege level in a channel, evaluated lazily.
    pub fn privilege_for(&self, channel: &str) -> u8 {
        self.privileges.level(&self.sender, channel)
    }

    /// Where replies to this line go: the channel, or the sender for
    /// private messages.
    pub fn reply_target(&self) -> &str {
        if self.private {
            &self.sender
        } else {
            &self.channel
        }
    }

    /// Builds a response to the requester honouring the notice flag.
    pub fn reply(&self, text: impl Into<String>) -> Response {
        Response {
            target: self.reply_target().to_owned(),
            mode: if self.notice {
                SendMode::Notice
            } else {
                SendMode::Message
            },
            text: text.into(),
        }
    }

    /// Builds a private notice to the sender, used for deliveries that
    /// should not be broadcast to the channel.
    pub fn private_notice(&self, text: impl Into<String>) -> Response {
        Response {
            target: self.sender.clone(),
            mode: SendMode::Notice,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_privileges() -> Arc<dyn PrivilegeSource> {
        let mut mock = MockPrivilegeSource::new();
        mock.expect_level().return_const(0u8);
        Arc::new(mock)
    }

    #[test]
    fn test_input_channel_line() {
        let input = Input::new(".seen bob", "alice", "#chat", no_privileges());
        assert!(!input.private);
        assert_eq!(input.reply_target(), "#chat");
    }

    #[test]
    fn test_input_private_line_replies_to_sender() {
        let input = Input::new("hello", "alice", "alice", no_privileges());
        assert!(input.private);
        assert_eq!(input.reply_target(), "alice");
    }

    #[test]
    fn test_reply_honours_notice_flag() {
        let mut input = Input::new("x", "alice", "#chat", no_privileges());
        assert_eq!(input.reply("hi").mode, SendMode::Message);
        input.notice = true;
        assert_eq!(input.reply("hi").mode, SendMode::Notice);
    }

    #[test]
    fn test_private_notice_targets_sender() {
        let input = Input::new("x", "alice", "#chat", no_privileges());
        let response = input.private_notice("psst");
        assert_eq!(response.target, "alice");
        assert_eq!(response.mode, SendMode::Notice);
    }

    #[test]
    fn test_privilege_lookup_is_delegated() {
        let mut mock = MockPrivilegeSource::new();
        mock.expect_level()
            .withf(|user, channel| user == "alice" && channel == "#ops")
            .return_const(4u8);
        let input = Input::new("x", "alice", "#chat", Arc::new(mock));
        assert_eq!(input.privilege_for("#ops"), 4);
    }
}
