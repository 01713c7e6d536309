//! Bot wiring and main loop.
//!
//! [`Bot::new`] assembles the durable store, the phrasebook, the runtime
//! settings and the command registry into a [`Dispatcher`]; [`Bot::start`]
//! connects to IRC and feeds every PRIVMSG through it, sequentially. One
//! line is fully processed (passive deliveries plus command) before the
//! next is read, which is what makes the at-most-once delivery guarantees
//! of the store hold without further coordination.

use std::sync::Arc;

use log::{info, warn};

use crate::commands::dispatcher::{Context, Dispatcher};
use crate::commands::{handlers, Input, PrivilegeSource};
use crate::config::{Config, ConfigPrivileges, Settings};
use crate::irc::{Event, IrcClient, Outbound};
use crate::lexicon::Phrasebook;
use crate::store::NotificationStore;
use crate::utils::get_path;
use crate::Args;

/// The assembled bot, ready to connect.
pub struct Bot {
    config: Config,
    dispatcher: Dispatcher,
    privileges: Arc<dyn PrivilegeSource>,
}

impl Bot {
    /// Assembles the bot from its configuration.
    ///
    /// Opens (or creates) the store database under the data directory,
    /// builds the command registry and wires the dispatcher.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `args` - Command-line arguments carrying the data directory
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be opened or two commands
    /// collide on a name, both of which abort startup.
    pub fn new(config: Config, args: &Args) -> Result<Self, anyhow::Error> {
        let store = NotificationStore::new(&get_path(&args.data, "store.db"))?;
        let registry = handlers::register_all()?;
        let help = registry.help_entries();

        // An operator-provided phrases.json in the data directory overrides
        // the embedded wording.
        let mut phrasebook = Phrasebook::new();
        let overrides = get_path(&args.data, "phrases.json");
        if let Ok(json) = std::fs::read_to_string(&overrides) {
            match phrasebook.merge_json(&json) {
                Ok(()) => info!("applied phrase overrides from {}", overrides),
                Err(e) => warn!("ignoring phrase overrides in {}: {:#}", overrides, e),
            }
        }

        let context = Context {
            store: Arc::new(store),
            lexicon: Arc::new(phrasebook),
            settings: Arc::new(Settings::new(config.channels.clone())),
            admin_channel: config.admin_channel.clone(),
            trigger: config.irc.trigger,
            help,
        };
        let dispatcher = Dispatcher::new(registry, context);
        let privileges: Arc<dyn PrivilegeSource> =
            Arc::new(ConfigPrivileges::new(config.privileges.clone()));

        Ok(Bot {
            config,
            dispatcher,
            privileges,
        })
    }

    /// Connects to the IRC server and runs the dispatch loop until the
    /// connection closes.
    ///
    /// Lines are processed strictly in arrival order; the responses of one
    /// line are queued before the next line is dispatched.
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let mut client = IrcClient::connect(&self.config.irc).await?;
        let own_nick = client.nick().to_owned();

        while let Some(event) = client.next_event().await {
            match event {
                Event::Ready => {
                    info!("ready in {} channels", self.config.irc.channels.len());
                }
                Event::Privmsg {
                    sender,
                    target,
                    text,
                } => {
                    // Never react to our own lines.
                    if sender.eq_ignore_ascii_case(&own_nick) {
                        continue;
                    }
                    let channel = conversation_target(&own_nick, &sender, &target);
                    let mut input =
                        Input::new(text, sender, channel, Arc::clone(&self.privileges));
                    for response in self.dispatcher.dispatch(&mut input) {
                        client.deliver(&response);
                    }
                }
            }
        }

        warn!("connection closed, shutting down");
        Ok(())
    }
}

/// Maps a PRIVMSG target to the conversation it belongs to: the channel for
/// channel traffic, the sender for messages addressed to the bot itself.
fn conversation_target(own_nick: &str, sender: &str, target: &str) -> String {
    if target.eq_ignore_ascii_case(own_nick) {
        sender.to_owned()
    } else {
        target.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_target_channel() {
        assert_eq!(
            conversation_target("ratatosk", "alice", "#treetop"),
            "#treetop"
        );
    }

    #[test]
    fn test_conversation_target_private() {
        assert_eq!(conversation_target("ratatosk", "alice", "ratatosk"), "alice");
        assert_eq!(conversation_target("ratatosk", "alice", "Ratatosk"), "alice");
    }
}
