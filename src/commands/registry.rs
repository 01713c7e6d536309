//! Command registration and name resolution.
//!
//! Every command, its aliases, its permission level and its argument spec
//! are registered once at process start. Primary names and aliases share one
//! case-insensitive namespace; a collision is rejected at registration time.
//! Resolution is exact-match first, then unambiguous prefix completion.

use std::collections::HashMap;

use anyhow::bail;

use crate::commands::{argspec::ArgSpec, dispatcher::Context, Input, Reply};
use crate::commands::argspec::ParsedArgs;

/// A command handler.
///
/// Handlers are plain functions so the registry stays `'static` and
/// read-only after startup. A returned error is a handler fault: the
/// dispatcher logs it and answers with the generic error phrase.
pub type Handler = fn(&mut Input, &ParsedArgs, &Context) -> Result<Reply, anyhow::Error>;

/// A registered command. Immutable once registered.
pub struct Command {
    /// Primary name, unique across the registry.
    pub name: String,
    /// Alternative names, unique across the whole registry.
    pub aliases: Vec<String>,
    /// Minimum privilege level required in the channel of invocation.
    pub level: u8,
    /// Argument spec; commands that accept no input register without one.
    pub spec: Option<ArgSpec>,
    /// One-line description shown by `help`.
    pub summary: String,
    /// The handler invoked with parsed arguments.
    pub handler: Handler,
}

impl Command {
    /// Creates a command with default level 0 and no spec.
    pub fn new(name: &str, summary: &str, handler: Handler) -> Self {
        Command {
            name: name.to_owned(),
            aliases: Vec::new(),
            level: 0,
            spec: None,
            summary: summary.to_owned(),
            handler,
        }
    }

    /// Adds an alias.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    /// Sets the required privilege level.
    pub fn level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Attaches an argument spec.
    pub fn spec(mut self, spec: ArgSpec) -> Self {
        self.spec = Some(spec);
        self
    }
}

/// Result of resolving a token against a set of names.
#[derive(Debug, PartialEq)]
pub enum NameMatch {
    /// Exactly one name matched.
    One(String),
    /// Nothing matched.
    None,
    /// Several names matched the prefix; the caller must disambiguate.
    Many(Vec<String>),
}

/// Resolves a token against candidate names: exact match wins immediately,
/// otherwise an unambiguous prefix completes.
///
/// Shared by the registry and by subcommand-mode dispatch, so both follow
/// the same rule.
pub fn match_name(token: &str, names: &[&str]) -> NameMatch {
    let token = token.to_lowercase();

    if let Some(exact) = names.iter().find(|name| name.to_lowercase() == token) {
        return NameMatch::One((*exact).to_owned());
    }

    let mut matches: Vec<String> = names
        .iter()
        .filter(|name| name.to_lowercase().starts_with(&token))
        .map(|name| (*name).to_owned())
        .collect();

    match matches.len() {
        0 => NameMatch::None,
        1 => NameMatch::One(matches.remove(0)),
        _ => {
            matches.sort();
            NameMatch::Many(matches)
        }
    }
}

/// Result of resolving a token against the registry.
pub enum Resolution<'a> {
    /// Exactly one command matched.
    Match(&'a Command),
    /// Not a command; ignored silently upstream.
    None,
    /// Several commands matched; their primary names, sorted.
    Ambiguous(Vec<String>),
}

/// Holds every registered command and resolves tokens to them.
///
/// Read-only after startup; no synchronization is required to share it.
#[derive(Default)]
pub struct Registry {
    commands: Vec<Command>,
    /// Lowercased name/alias -> index into `commands`.
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Fails if the primary name or any alias collides with an existing
    /// name or alias; names and aliases share one namespace.
    pub fn register(&mut self, command: Command) -> Result<(), anyhow::Error> {
        let slot = self.commands.len();
        let mut keys = vec![command.name.to_lowercase()];
        keys.extend(command.aliases.iter().map(|alias| alias.to_lowercase()));

        for key in &keys {
            if self.index.contains_key(key) {
                bail!("command name or alias '{}' is already registered", key);
            }
        }
        // Collision-free, commit the keys.
        for key in keys {
            self.index.insert(key, slot);
        }
        self.commands.push(command);

        Ok(())
    }

    /// Resolves a token to a command.
    ///
    /// Exact match on a name or alias wins immediately. Otherwise the set
    /// of commands with a matching name/alias prefix decides: one match
    /// auto-completes, several are surfaced for disambiguation, none means
    /// the token is not a command.
    pub fn resolve(&self, token: &str) -> Resolution<'_> {
        let token = token.to_lowercase();

        if let Some(slot) = self.index.get(&token) {
            return Resolution::Match(&self.commands[*slot]);
        }

        let mut slots: Vec<usize> = self
            .index
            .iter()
            .filter(|(key, _)| key.starts_with(&token))
            .map(|(_, slot)| *slot)
            .collect();
        // A command may match through both its name and an alias.
        slots.sort_unstable();
        slots.dedup();

        match slots.len() {
            0 => Resolution::None,
            1 => Resolution::Match(&self.commands[slots[0]]),
            _ => {
                let mut names: Vec<String> = slots
                    .iter()
                    .map(|slot| self.commands[*slot].name.clone())
                    .collect();
                names.sort();
                Resolution::Ambiguous(names)
            }
        }
    }

    /// Returns `(name, summary, usage)` for every command, sorted by name.
    /// Used by the `help` command.
    pub fn help_entries(&self) -> Vec<(String, String, Option<String>)> {
        let mut entries: Vec<(String, String, Option<String>)> = self
            .commands
            .iter()
            .map(|command| {
                (
                    command.name.clone(),
                    command.summary.clone(),
                    command.spec.as_ref().map(|spec| spec.usage().to_owned()),
                )
            })
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Input, _: &ParsedArgs, _: &Context) -> Result<Reply, anyhow::Error> {
        Ok(Reply::None)
    }

    fn registry_with(names: &[(&str, &[&str])]) -> Registry {
        let mut registry = Registry::new();
        for (name, aliases) in names {
            let mut command = Command::new(name, "test command", noop);
            for alias in *aliases {
                command = command.alias(alias);
            }
            registry.register(command).unwrap();
        }
        registry
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut registry = registry_with(&[("seen", &[])]);
        let result = registry.register(Command::new("seen", "dup", noop));
        assert!(result.is_err());
    }

    #[test]
    fn test_register_rejects_alias_colliding_with_name() {
        let mut registry = registry_with(&[("seen", &[])]);
        let result = registry.register(Command::new("lastseen", "dup", noop).alias("seen"));
        assert!(result.is_err());
    }

    #[test]
    fn test_register_rejects_name_colliding_with_alias() {
        let mut registry = registry_with(&[("subscribe", &["sub"])]);
        let result = registry.register(Command::new("sub", "dup", noop));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_exact_match_wins_over_prefix() {
        // "sub" is both an exact alias and a prefix of "subscribers".
        let registry = registry_with(&[("subscribe", &["sub"]), ("subscribers", &[])]);
        match registry.resolve("sub") {
            Resolution::Match(command) => assert_eq!(command.name, "subscribe"),
            _ => panic!("expected exact match"),
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = registry_with(&[("seen", &[])]);
        assert!(matches!(registry.resolve("SeEn"), Resolution::Match(_)));
    }

    #[test]
    fn test_resolve_unique_prefix_completes() {
        let registry = registry_with(&[("memo", &[]), ("quote", &[])]);
        match registry.resolve("me") {
            Resolution::Match(command) => assert_eq!(command.name, "memo"),
            _ => panic!("expected prefix completion"),
        }
    }

    #[test]
    fn test_resolve_ambiguous_prefix_lists_both() {
        let registry = registry_with(&[("seen", &[]), ("search", &[])]);
        match registry.resolve("se") {
            Resolution::Ambiguous(names) => {
                assert_eq!(names, vec!["search".to_owned(), "seen".to_owned()])
            }
            _ => panic!("expected ambiguity"),
        }
    }

    #[test]
    fn test_resolve_dedupes_name_and_alias_of_same_command() {
        let registry = registry_with(&[("tell", &["te"])]);
        // Prefix "t" matches both "tell" and "te" but only one command.
        assert!(matches!(registry.resolve("t"), Resolution::Match(_)));
    }

    #[test]
    fn test_resolve_unknown_token_is_none() {
        let registry = registry_with(&[("seen", &[])]);
        assert!(matches!(registry.resolve("zzz"), Resolution::None));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let registry = registry_with(&[("seen", &[]), ("search", &[])]);
        for _ in 0..3 {
            match registry.resolve("se") {
                Resolution::Ambiguous(names) => {
                    assert_eq!(names, vec!["search".to_owned(), "seen".to_owned()])
                }
                _ => panic!("expected stable ambiguous set"),
            }
        }
    }

    #[test]
    fn test_match_name_exact_then_prefix() {
        let modes = ["add", "append", "delete", "get"];
        assert_eq!(match_name("add", &modes), NameMatch::One("add".to_owned()));
        assert_eq!(match_name("g", &modes), NameMatch::One("get".to_owned()));
        assert_eq!(
            match_name("a", &modes),
            NameMatch::Many(vec!["add".to_owned(), "append".to_owned()])
        );
        assert_eq!(match_name("x", &modes), NameMatch::None);
    }

    #[test]
    fn test_help_entries_sorted_with_usage() {
        let mut registry = registry_with(&[("quote", &[])]);
        registry
            .register(
                Command::new("seen", "last sighting", noop).spec(ArgSpec::new("seen <nick>")),
            )
            .unwrap();

        let entries = registry.help_entries();
        assert_eq!(entries[0].0, "quote");
        assert_eq!(entries[1].0, "seen");
        assert_eq!(entries[1].2.as_deref(), Some("seen <nick>"));
    }
}
