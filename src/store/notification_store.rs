//! SQLite-backed persistence for tells, alerts, memos, quotes and
//! subscriptions.
//!
//! Delivery of queued tells and due alerts uses a fetch-then-delete wrapped
//! in a single transaction, so a message is never delivered twice to two
//! near-simultaneous activity events and never left half-delivered. Rows are
//! keyed by lowercased nick/channel/topic so lookups are case-insensitive.

use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::store::{Alert, Memo, Quote, Recipient, SeenEntry, Tell, TellOutcome, WriteOutcome};

/// Owner of all durable bot state.
///
/// The store serializes access through an internal mutex; every public
/// operation is a single atomic unit from the caller's point of view.
///
/// # Examples
///
/// ```no_run
/// # use ratatosk::store::{NotificationStore, Recipient};
/// # use chrono::Utc;
/// # fn example() -> Result<(), anyhow::Error> {
/// let store = NotificationStore::new("/var/lib/ratatosk/store.db")?;
/// store.store_tell("alice", &Recipient::Nick("bob".into()), "hello", Utc::now())?;
/// let delivered = store.take_tells("bob")?;
/// assert_eq!(delivered.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct NotificationStore {
    conn: Mutex<Connection>,
}

impl NotificationStore {
    /// Opens (or creates) the store at the given path.
    ///
    /// Enables WAL mode and creates the schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn new(path: &str) -> Result<Self, anyhow::Error> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("failed to set store pragmas")?;

        let store = NotificationStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;

        info!("opened notification store at {}", path);

        Ok(store)
    }

    /// Creates an in-memory store, used by tests.
    pub fn in_memory() -> Result<Self, anyhow::Error> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        let store = NotificationStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), anyhow::Error> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tells (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                topic TEXT,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tells_recipient ON tells(recipient);

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                due INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user, due);

            CREATE TABLE IF NOT EXISTS messages (
                user TEXT NOT NULL,
                channel TEXT NOT NULL,
                time INTEGER NOT NULL,
                text TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user, time);

            CREATE TABLE IF NOT EXISTS memos (
                user TEXT NOT NULL,
                channel TEXT NOT NULL,
                text TEXT NOT NULL,
                PRIMARY KEY (user, channel)
            );

            CREATE TABLE IF NOT EXISTS quotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                channel TEXT NOT NULL,
                time INTEGER NOT NULL,
                text TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_quotes_user ON quotes(user, channel);

            CREATE TABLE IF NOT EXISTS subscribers (
                user TEXT NOT NULL,
                topic TEXT NOT NULL,
                PRIMARY KEY (user, topic)
            );

            CREATE TABLE IF NOT EXISTS restricted (
                topic TEXT PRIMARY KEY
            );
            "#,
        )
        .context("failed to create store schema")?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, anyhow::Error> {
        self.conn.lock().map_err(|_| anyhow!("store lock poisoned"))
    }

    fn timestamp(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    // ----- tells -------------------------------------------------------

    /// Stores a tell for a nick, or fans a topic tell out to the topic's
    /// current subscriber snapshot.
    ///
    /// A later unsubscribe does not retract copies queued by the snapshot.
    ///
    /// # Returns
    ///
    /// * `TellOutcome::Stored` with the number of rows written
    /// * `TellOutcome::NoSubscribers` if a topic resolved to nobody; no row
    ///   is written in that case
    pub fn store_tell(
        &self,
        sender: &str,
        recipient: &Recipient,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<TellOutcome, anyhow::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let written = match recipient {
            Recipient::Nick(nick) => {
                tx.execute(
                    "INSERT INTO tells (sender, recipient, topic, text, created_at)
                     VALUES (?1, ?2, NULL, ?3, ?4)",
                    params![sender, nick.to_lowercase(), text, now.timestamp()],
                )?;
                1
            }
            Recipient::Topic(topic) => {
                let topic_key = topic.to_lowercase();
                let subscribers: Vec<String> = {
                    let mut stmt = tx.prepare(
                        "SELECT user FROM subscribers WHERE topic = ?1 ORDER BY user",
                    )?;
                    let rows = stmt.query_map(params![topic_key], |row| row.get(0))?;
                    rows.collect::<Result<_, _>>()?
                };

                if subscribers.is_empty() {
                    debug!("tell to @{} dropped, no subscribers", topic_key);
                    return Ok(TellOutcome::NoSubscribers);
                }

                for user in &subscribers {
                    tx.execute(
                        "INSERT INTO tells (sender, recipient, topic, text, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![sender, user, topic_key, text, now.timestamp()],
                    )?;
                }
                subscribers.len()
            }
        };

        tx.commit()?;
        debug!("stored tell from {} for {} recipients", sender, written);

        Ok(TellOutcome::Stored { recipients: written })
    }

    /// Atomically reads and deletes every pending tell for a user.
    ///
    /// The select and delete share one transaction, so a tell is delivered
    /// at most once and a tell stored concurrently with the delivery is
    /// kept for the next activity event.
    pub fn take_tells(&self, user: &str) -> Result<Vec<Tell>, anyhow::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_key = user.to_lowercase();

        let tells: Vec<Tell> = {
            let mut stmt = tx.prepare(
                "SELECT id, sender, recipient, topic, text, created_at
                 FROM tells WHERE recipient = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![user_key], |row| {
                Ok(Tell {
                    id: row.get(0)?,
                    sender: row.get(1)?,
                    recipient: row.get(2)?,
                    topic: row.get(3)?,
                    text: row.get(4)?,
                    created_at: Self::timestamp(row.get(5)?),
                })
            })?;
            rows.collect::<Result<_, _>>()?
        };

        if let Some(last) = tells.last() {
            // Bounded by the highest fetched id: rows inserted after the
            // select stay pending.
            tx.execute(
                "DELETE FROM tells WHERE recipient = ?1 AND id <= ?2",
                params![user_key, last.id],
            )?;
        }

        tx.commit()?;

        Ok(tells)
    }

    // ----- alerts ------------------------------------------------------

    /// Schedules a reminder for a user.
    pub fn add_alert(
        &self,
        user: &str,
        due: DateTime<Utc>,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO alerts (user, due, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.to_lowercase(), due.timestamp(), text, now.timestamp()],
        )?;
        Ok(())
    }

    /// Atomically reads and deletes every alert for a user that is due at
    /// `now` or earlier. Alerts not yet due remain untouched.
    pub fn take_due_alerts(
        &self,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, anyhow::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_key = user.to_lowercase();

        let alerts: Vec<Alert> = {
            let mut stmt = tx.prepare(
                "SELECT id, user, due, text, created_at
                 FROM alerts WHERE user = ?1 AND due <= ?2 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![user_key, now.timestamp()], |row| {
                Ok(Alert {
                    id: row.get(0)?,
                    user: row.get(1)?,
                    due: Self::timestamp(row.get(2)?),
                    text: row.get(3)?,
                    created_at: Self::timestamp(row.get(4)?),
                })
            })?;
            rows.collect::<Result<_, _>>()?
        };

        if let Some(last) = alerts.last() {
            tx.execute(
                "DELETE FROM alerts WHERE user = ?1 AND due <= ?2 AND id <= ?3",
                params![user_key, now.timestamp(), last.id],
            )?;
        }

        tx.commit()?;

        Ok(alerts)
    }

    // ----- message log -------------------------------------------------

    /// Records an observed channel line.
    pub fn log_message(
        &self,
        user: &str,
        channel: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (user, channel, time, text) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.to_lowercase(),
                channel.to_lowercase(),
                now.timestamp(),
                text
            ],
        )?;
        Ok(())
    }

    /// Returns the most recent logged line of a user, if any.
    pub fn last_seen(&self, user: &str) -> Result<Option<SeenEntry>, anyhow::Error> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                "SELECT user, channel, time, text FROM messages
                 WHERE user = ?1 ORDER BY time DESC, rowid DESC LIMIT 1",
                params![user.to_lowercase()],
                |row| {
                    Ok(SeenEntry {
                        user: row.get(0)?,
                        channel: row.get(1)?,
                        time: Self::timestamp(row.get(2)?),
                        text: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    // ----- memos -------------------------------------------------------

    /// Adds a memo for a (user, channel) pair.
    ///
    /// At most one memo may exist per pair; a duplicate add is rejected
    /// with [`WriteOutcome::AlreadyExists`] and the stored memo is kept.
    pub fn memo_add(
        &self,
        user: &str,
        channel: &str,
        text: &str,
    ) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO memos (user, channel, text) VALUES (?1, ?2, ?3)
             ON CONFLICT (user, channel) DO NOTHING",
            params![user.to_lowercase(), channel.to_lowercase(), text],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::AlreadyExists)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Returns the memo for a (user, channel) pair, if any.
    pub fn memo_get(&self, user: &str, channel: &str) -> Result<Option<Memo>, anyhow::Error> {
        let conn = self.lock()?;
        let memo = conn
            .query_row(
                "SELECT user, channel, text FROM memos WHERE user = ?1 AND channel = ?2",
                params![user.to_lowercase(), channel.to_lowercase()],
                |row| {
                    Ok(Memo {
                        user: row.get(0)?,
                        channel: row.get(1)?,
                        text: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(memo)
    }

    /// Appends text to an existing memo.
    pub fn memo_append(
        &self,
        user: &str,
        channel: &str,
        text: &str,
    ) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE memos SET text = text || ' | ' || ?3
             WHERE user = ?1 AND channel = ?2",
            params![user.to_lowercase(), channel.to_lowercase(), text],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Deletes the memo for a (user, channel) pair.
    pub fn memo_delete(&self, user: &str, channel: &str) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM memos WHERE user = ?1 AND channel = ?2",
            params![user.to_lowercase(), channel.to_lowercase()],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    // ----- quotes ------------------------------------------------------

    /// Appends a quote for a (user, channel) pair.
    ///
    /// The same text may not be saved twice for one pair.
    pub fn quote_add(
        &self,
        user: &str,
        channel: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, anyhow::Error> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let user_key = user.to_lowercase();
        let channel_key = channel.to_lowercase();

        let duplicate: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM quotes WHERE user = ?1 AND channel = ?2 AND text = ?3)",
            params![user_key, channel_key, text],
            |row| row.get(0),
        )?;
        if duplicate {
            return Ok(WriteOutcome::AlreadyExists);
        }

        tx.execute(
            "INSERT INTO quotes (user, channel, time, text) VALUES (?1, ?2, ?3, ?4)",
            params![user_key, channel_key, now.timestamp(), text],
        )?;
        tx.commit()?;

        Ok(WriteOutcome::Done)
    }

    /// Returns one quote: by 1-based index, or uniformly at random when no
    /// index is given.
    pub fn quote_get(
        &self,
        user: &str,
        channel: &str,
        index: Option<i64>,
    ) -> Result<Option<Quote>, anyhow::Error> {
        let conn = self.lock()?;
        let (order, offset) = match index {
            Some(i) if i >= 1 => ("q.id", i - 1),
            Some(_) => return Ok(None),
            None => ("RANDOM()", 0),
        };

        let sql = format!(
            "SELECT (SELECT COUNT(*) FROM quotes q2
                     WHERE q2.user = q.user AND q2.channel = q.channel AND q2.id <= q.id),
                    q.user, q.channel, q.time, q.text
             FROM quotes q WHERE q.user = ?1 AND q.channel = ?2
             ORDER BY {} LIMIT 1 OFFSET ?3",
            order
        );

        let quote = conn
            .query_row(
                &sql,
                params![user.to_lowercase(), channel.to_lowercase(), offset],
                |row| {
                    Ok(Quote {
                        index: row.get(0)?,
                        user: row.get(1)?,
                        channel: row.get(2)?,
                        time: Self::timestamp(row.get(3)?),
                        text: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(quote)
    }

    /// Returns every quote for a (user, channel) pair in insertion order.
    pub fn quote_list(&self, user: &str, channel: &str) -> Result<Vec<Quote>, anyhow::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT (SELECT COUNT(*) FROM quotes q2
                     WHERE q2.user = q.user AND q2.channel = q.channel AND q2.id <= q.id),
                    q.user, q.channel, q.time, q.text
             FROM quotes q WHERE q.user = ?1 AND q.channel = ?2 ORDER BY q.id",
        )?;
        let rows = stmt.query_map(
            params![user.to_lowercase(), channel.to_lowercase()],
            |row| {
                Ok(Quote {
                    index: row.get(0)?,
                    user: row.get(1)?,
                    channel: row.get(2)?,
                    time: Self::timestamp(row.get(3)?),
                    text: row.get(4)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns the number of quotes stored for a (user, channel) pair.
    pub fn quote_count(&self, user: &str, channel: &str) -> Result<i64, anyhow::Error> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM quotes WHERE user = ?1 AND channel = ?2",
            params![user.to_lowercase(), channel.to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Deletes the quote at a 1-based index.
    pub fn quote_delete(
        &self,
        user: &str,
        channel: &str,
        index: i64,
    ) -> Result<WriteOutcome, anyhow::Error> {
        if index < 1 {
            return Ok(WriteOutcome::NotFound);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let id: Option<i64> = tx
            .query_row(
                "SELECT id FROM quotes WHERE user = ?1 AND channel = ?2
                 ORDER BY id LIMIT 1 OFFSET ?3",
                params![user.to_lowercase(), channel.to_lowercase(), index - 1],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            return Ok(WriteOutcome::NotFound);
        };

        tx.execute("DELETE FROM quotes WHERE id = ?1", params![id])?;
        tx.commit()?;

        Ok(WriteOutcome::Done)
    }

    // ----- subscriptions -----------------------------------------------

    /// Subscribes a user to a topic.
    pub fn subscribe(&self, user: &str, topic: &str) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO subscribers (user, topic) VALUES (?1, ?2)
             ON CONFLICT (user, topic) DO NOTHING",
            params![user.to_lowercase(), topic.to_lowercase()],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::AlreadyExists)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Removes a user's subscription to a topic.
    pub fn unsubscribe(&self, user: &str, topic: &str) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM subscribers WHERE user = ?1 AND topic = ?2",
            params![user.to_lowercase(), topic.to_lowercase()],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Returns the current subscribers of a topic.
    pub fn subscribers(&self, topic: &str) -> Result<Vec<String>, anyhow::Error> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT user FROM subscribers WHERE topic = ?1 ORDER BY user")?;
        let rows = stmt.query_map(params![topic.to_lowercase()], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Returns the topics a user is subscribed to.
    pub fn subscriptions(&self, user: &str) -> Result<Vec<String>, anyhow::Error> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT topic FROM subscribers WHERE user = ?1 ORDER BY topic")?;
        let rows = stmt.query_map(params![user.to_lowercase()], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    // ----- restricted topics -------------------------------------------

    /// Marks a topic as restricted.
    pub fn restrict(&self, topic: &str) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO restricted (topic) VALUES (?1) ON CONFLICT (topic) DO NOTHING",
            params![topic.to_lowercase()],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::AlreadyExists)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Removes the restriction on a topic.
    pub fn unrestrict(&self, topic: &str) -> Result<WriteOutcome, anyhow::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM restricted WHERE topic = ?1",
            params![topic.to_lowercase()],
        )?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Done)
        }
    }

    /// Returns whether a topic is restricted.
    pub fn is_restricted(&self, topic: &str) -> Result<bool, anyhow::Error> {
        let conn = self.lock()?;
        let restricted = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM restricted WHERE topic = ?1)",
            params![topic.to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(restricted)
    }
}
