//! Configuration file structures for the Ratatosk bot.
//!
//! Configuration is a YAML file loaded through figment, with every value
//! overridable from `RATATOSK_`-prefixed environment variables
//! (`RATATOSK_IRC__NICK`, `RATATOSK_ADMIN_CHANNEL`, ...).
//!
//! # Configuration File Format
//!
//! ```yaml
//! irc:
//!   server: "irc.libera.chat"
//!   port: 6667
//!   nick: "ratatosk"
//!   trigger: "."
//!   channels:
//!     - "#treetop"
//!
//! admin_channel: "#ratatosk-admin"
//!
//! privileges:
//!   "#treetop":
//!     alice: 5
//!
//! channels:
//!   "#treetop":
//!     memos: auto
//!     keeplogs: true
//!     lcratings: false
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;

use crate::commands::PrivilegeSource;

/// Root configuration structure for the bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// IRC connection settings.
    pub irc: Irc,
    /// Channel where restricted topics may be subscribed to by anyone.
    #[serde(default = "default_admin_channel")]
    pub admin_channel: String,
    /// Privilege levels: channel -> nick -> level.
    #[serde(default)]
    pub privileges: HashMap<String, HashMap<String, u8>>,
    /// Per-channel settings, keyed by channel name.
    #[serde(default)]
    pub channels: HashMap<String, ChannelSettings>,
}

/// IRC connection settings.
#[derive(Debug, Deserialize)]
pub struct Irc {
    /// Server host name.
    pub server: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nick the bot connects as; also its USER name.
    pub nick: String,
    /// Leading character marking a line as a command.
    #[serde(default = "default_trigger")]
    pub trigger: char,
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
}

fn default_port() -> u16 {
    6667
}

fn default_trigger() -> char {
    '.'
}

fn default_admin_channel() -> String {
    "#ratatosk-admin".to_owned()
}

/// How memos behave in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoMode {
    /// Memo commands are disabled.
    Off,
    /// Memo commands work; no passive recall.
    On,
    /// Memo commands work and `?nick` recalls a memo passively.
    Auto,
}

/// Settings for one channel. Enumerated named fields only; handlers never
/// look up arbitrary attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Memo behaviour.
    pub memos: MemoMode,
    /// Lowercase author names on stat pages fed from this channel.
    pub lcratings: bool,
    /// Record observed lines into the message log.
    pub keeplogs: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        ChannelSettings {
            memos: MemoMode::On,
            lcratings: false,
            keeplogs: true,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file with environment overrides.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or a field fails to
    /// deserialize.
    pub fn load(path: &str) -> Result<Config, anyhow::Error> {
        let config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("RATATOSK_").split("__"))
            .extract()?;
        Ok(config)
    }
}

/// Runtime view of per-channel settings.
///
/// Read by many handlers on every line and written rarely by the privileged
/// `set` command; each read or write is a single atomic map operation.
pub struct Settings {
    channels: Mutex<HashMap<String, ChannelSettings>>,
}

impl Settings {
    /// Builds the runtime settings from the configured per-channel map.
    pub fn new(channels: HashMap<String, ChannelSettings>) -> Self {
        let channels = channels
            .into_iter()
            .map(|(channel, settings)| (channel.to_lowercase(), settings))
            .collect();
        Settings {
            channels: Mutex::new(channels),
        }
    }

    /// Returns the settings of a channel (defaults if never configured).
    pub fn channel(&self, channel: &str) -> ChannelSettings {
        self.channels
            .lock()
            .map(|map| {
                map.get(&channel.to_lowercase())
                    .copied()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Updates one named setting of a channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - Channel to update
    /// * `key` - One of `memos`, `lcratings`, `keeplogs`
    /// * `value` - `off`/`on`/`auto` for `memos`, `on`/`off` for the flags
    ///
    /// # Errors
    ///
    /// Returns an error naming the problem when the key or value is not
    /// recognized.
    pub fn set(&self, channel: &str, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let mut map = self
            .channels
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        let settings = map.entry(channel.to_lowercase()).or_default();

        match key {
            "memos" => {
                settings.memos = match value {
                    "off" => MemoMode::Off,
                    "on" => MemoMode::On,
                    "auto" => MemoMode::Auto,
                    _ => return Err(anyhow!("bad memos value '{}'", value)),
                }
            }
            "lcratings" => settings.lcratings = parse_switch(value)?,
            "keeplogs" => settings.keeplogs = parse_switch(value)?,
            _ => return Err(anyhow!("unknown setting '{}'", key)),
        }

        Ok(())
    }
}

fn parse_switch(value: &str) -> Result<bool, anyhow::Error> {
    match value {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        _ => Err(anyhow!("bad switch value '{}'", value)),
    }
}

/// [`PrivilegeSource`] backed by the configured privilege map.
pub struct ConfigPrivileges {
    /// channel -> nick -> level, all keys lowercased.
    levels: HashMap<String, HashMap<String, u8>>,
}

impl ConfigPrivileges {
    /// Builds the lookup from the configured map.
    pub fn new(privileges: HashMap<String, HashMap<String, u8>>) -> Self {
        let levels = privileges
            .into_iter()
            .map(|(channel, users)| {
                let users = users
                    .into_iter()
                    .map(|(nick, level)| (nick.to_lowercase(), level))
                    .collect();
                (channel.to_lowercase(), users)
            })
            .collect();
        ConfigPrivileges { levels }
    }
}

impl PrivilegeSource for ConfigPrivileges {
    fn level(&self, user: &str, channel: &str) -> u8 {
        self.levels
            .get(&channel.to_lowercase())
            .and_then(|users| users.get(&user.to_lowercase()))
            .copied()
            .unwrap_or(0)
    }
}
