//! Command handlers, one file per command family.
//!
//! Every handler is a plain function matching the registry's `Handler` type.
//! Handlers resolve all user-facing text through the lexicon and report
//! domain outcomes (already exists, not found, ...) as ordinary replies; a
//! returned error means the handler itself broke.

mod admin;
mod alert;
mod help;
mod memo;
mod quote;
mod seen;
mod subscribe;
mod tell;

use crate::commands::argspec::ArgSpec;
use crate::commands::registry::{Command, Registry};

/// Builds the registry holding every shipped command.
///
/// # Errors
///
/// Fails when two commands collide on a name or alias, which aborts startup.
pub fn register_all() -> Result<Registry, anyhow::Error> {
    let mut registry = Registry::new();

    registry.register(Command::new(
        "help",
        "list commands or describe one",
        help::run,
    ))?;

    registry.register(
        Command::new("tell", "leave a message for a nick or @topic", tell::run).spec(
            ArgSpec::new("tell <nick|@topic> <text>")
                .positional("recipient", true)
                .rest("text", true),
        ),
    )?;

    registry.register(
        Command::new("alert", "schedule a reminder (10m, 2h, 1d)", alert::run).spec(
            ArgSpec::new(alert::USAGE)
                .positional("delay", true)
                .pattern(r"^\d+[mhd]$")
                .rest("text", true),
        ),
    )?;

    registry.register(
        Command::new("seen", "report when a nick last spoke", seen::run)
            .spec(ArgSpec::new("seen <nick>").positional("nick", true)),
    )?;

    registry.register(
        Command::new("memo", "manage per-channel memos", memo::run).spec(
            ArgSpec::new(memo::USAGE)
                .positional("mode", true)
                .positional("nick", true)
                .rest("text", false),
        ),
    )?;

    registry.register(
        Command::new("quote", "save and recall quotes", quote::run).spec(
            ArgSpec::new(quote::USAGE)
                .positional("mode", true)
                .positional("nick", true)
                .rest("arg", false),
        ),
    )?;

    registry.register(
        Command::new("subscribe", "subscribe to a tell topic", subscribe::run)
            .alias("sub")
            .spec(ArgSpec::new("subscribe <topic>").positional("topic", true)),
    )?;

    registry.register(
        Command::new(
            "unsubscribe",
            "drop a tell topic subscription",
            subscribe::run_unsubscribe,
        )
        .alias("unsub")
        .spec(ArgSpec::new("unsubscribe <topic>").positional("topic", true)),
    )?;

    registry.register(
        Command::new("restrict", "restrict a topic to the admin channel", admin::restrict)
            .level(4)
            .spec(
                ArgSpec::new("restrict [-d|--drop] <topic>")
                    .flag("drop", Some('d'))
                    .positional("topic", true),
            ),
    )?;

    registry.register(
        Command::new("set", "change a channel setting", admin::set)
            .level(4)
            .spec(
                ArgSpec::new("set <key> <value>")
                    .positional("key", true)
                    .positional("value", true),
            ),
    )?;

    Ok(registry)
}

#[cfg(test)]
pub(crate) mod support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::commands::dispatcher::Context;
    use crate::commands::{Input, MockPrivilegeSource, Reply, Response};
    use crate::config::Settings;
    use crate::lexicon::Phrasebook;
    use crate::store::NotificationStore;

    pub fn context() -> Context {
        Context {
            store: Arc::new(NotificationStore::in_memory().unwrap()),
            lexicon: Arc::new(Phrasebook::new()),
            settings: Arc::new(Settings::new(HashMap::new())),
            admin_channel: "#admin".to_owned(),
            trigger: '.',
            help: Vec::new(),
        }
    }

    pub fn input(sender: &str, channel: &str) -> Input {
        input_with_level(sender, channel, 0)
    }

    pub fn input_with_level(sender: &str, channel: &str, level: u8) -> Input {
        let mut mock = MockPrivilegeSource::new();
        mock.expect_level().return_const(level);
        Input::new("", sender, channel, Arc::new(mock))
    }

    /// Unwraps a single-response reply.
    pub fn one(reply: Reply) -> Response {
        match reply {
            Reply::One(response) => response,
            other => panic!("expected a single response, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry::Resolution;

    #[test]
    fn test_register_all_builds_without_collisions() {
        let registry = register_all().unwrap();
        for name in [
            "help",
            "tell",
            "alert",
            "seen",
            "memo",
            "quote",
            "subscribe",
            "unsubscribe",
            "restrict",
            "set",
        ] {
            assert!(
                matches!(registry.resolve(name), Resolution::Match(_)),
                "{} not registered",
                name
            );
        }
    }

    #[test]
    fn test_aliases_resolve() {
        let registry = register_all().unwrap();
        match registry.resolve("sub") {
            Resolution::Match(command) => assert_eq!(command.name, "subscribe"),
            _ => panic!("alias sub did not resolve"),
        }
        match registry.resolve("unsub") {
            Resolution::Match(command) => assert_eq!(command.name, "unsubscribe"),
            _ => panic!("alias unsub did not resolve"),
        }
    }

    #[test]
    fn test_admin_commands_require_level() {
        let registry = register_all().unwrap();
        for name in ["restrict", "set"] {
            match registry.resolve(name) {
                Resolution::Match(command) => assert_eq!(command.level, 4),
                _ => panic!("{} not registered", name),
            }
        }
    }
}
