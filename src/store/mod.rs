//! Durable state owned by the bot.
//!
//! All persistent entities (tells, alerts, memos, quotes, subscriptions,
//! restricted topics and the message log) are owned by the
//! [`NotificationStore`]; command handlers and the dispatcher only touch them
//! through its operations.

mod notification_store;

pub use notification_store::NotificationStore;

use chrono::{DateTime, Utc};

/// A stored message awaiting delivery to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Tell {
    /// Row id, used for atomic fetch-then-delete.
    pub id: i64,
    /// Nick that sent the message.
    pub sender: String,
    /// Nick the message is waiting for.
    pub recipient: String,
    /// Topic the tell was addressed to, when it arrived through a fan-out.
    pub topic: Option<String>,
    /// Message body.
    pub text: String,
    /// When the tell was stored.
    pub created_at: DateTime<Utc>,
}

/// A reminder scheduled for delivery no earlier than its due time.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Row id, used for atomic fetch-then-delete.
    pub id: i64,
    /// Nick the reminder belongs to.
    pub user: String,
    /// Earliest moment the reminder may be delivered.
    pub due: DateTime<Utc>,
    /// Reminder body.
    pub text: String,
    /// When the reminder was created.
    pub created_at: DateTime<Utc>,
}

/// A single persistent note for a (user, channel) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Memo {
    pub user: String,
    pub channel: String,
    pub text: String,
}

/// An appended, indexable saved line attributed to a user in a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// 1-based position within the user's quotes for the channel.
    pub index: i64,
    pub user: String,
    pub channel: String,
    pub time: DateTime<Utc>,
    pub text: String,
}

/// The most recent logged line of a user.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenEntry {
    pub user: String,
    pub channel: String,
    pub time: DateTime<Utc>,
    pub text: String,
}

/// Where a tell is addressed: a single nick or a topic's subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Nick(String),
    Topic(String),
}

impl Recipient {
    /// Parses a recipient token; a leading `@` marks a topic.
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('@') {
            Some(topic) => Recipient::Topic(topic.to_owned()),
            None => Recipient::Nick(token.to_owned()),
        }
    }
}

/// Outcome of storing a tell.
#[derive(Debug, Clone, PartialEq)]
pub enum TellOutcome {
    /// One row was written per resolved recipient.
    Stored { recipients: usize },
    /// The addressed topic has no subscribers; nothing was written.
    NoSubscribers,
}

/// Typed outcome of a uniqueness-guarded write.
///
/// Distinguished from dispatch errors so handlers can phrase
/// "already exists" and "not found" as normal responses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteOutcome {
    Done,
    AlreadyExists,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_parse_nick() {
        assert_eq!(Recipient::parse("bob"), Recipient::Nick("bob".to_owned()));
    }

    #[test]
    fn test_recipient_parse_topic() {
        assert_eq!(
            Recipient::parse("@infra"),
            Recipient::Topic("infra".to_owned())
        );
    }
}
