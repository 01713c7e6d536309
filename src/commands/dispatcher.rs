//! Line dispatch: passive observation plus command execution.
//!
//! Every inbound line flows through [`Dispatcher::dispatch`] exactly once.
//! The line is first fanned out to the passive listeners (message logging,
//! tell/alert delivery, memo auto-recall) and then, when it starts with the
//! trigger character, resolved and executed as a command.
//!
//! The dispatcher is the containment boundary for failures: a handler error
//! is logged with its context and turned into one fixed generic response;
//! nothing a single command does can take the dispatch loop down.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error};
use regex::Regex;

use crate::commands::{
    argspec::ParsedArgs,
    registry::{Registry, Resolution},
    Input, Reply, Response,
};
use crate::config::{MemoMode, Settings};
use crate::lexicon::{param, Lexicon};
use crate::store::NotificationStore;
use crate::utils::humanize_elapsed;

/// Shared collaborators handed to every handler.
pub struct Context {
    /// Owner of all durable state.
    pub store: Arc<NotificationStore>,
    /// Response text resolver.
    pub lexicon: Arc<dyn Lexicon>,
    /// Mutable per-channel settings.
    pub settings: Arc<Settings>,
    /// Channel where restricted topics are open to everyone.
    pub admin_channel: String,
    /// The trigger character, for help output.
    pub trigger: char,
    /// `(name, summary, usage)` snapshot of the registry, for help output.
    pub help: Vec<(String, String, Option<String>)>,
}

/// The entry point for every inbound line.
pub struct Dispatcher {
    registry: Registry,
    context: Context,
    trigger: char,
    memo_recall: Regex,
}

impl Dispatcher {
    /// Creates a dispatcher over a fully registered command set.
    pub fn new(registry: Registry, context: Context) -> Self {
        let trigger = context.trigger;
        Dispatcher {
            registry,
            context,
            trigger,
            // A line that is exactly "?nick" recalls that nick's memo.
            memo_recall: Regex::new(r"^\?(\S+)$").unwrap_or_else(|e| panic!("bad pattern: {}", e)),
        }
    }

    /// Processes one inbound line and returns the responses to send, in
    /// order: passive deliveries first, then the command output.
    ///
    /// Lines without the leading trigger character reach only the passive
    /// listeners and never invoke a command.
    pub fn dispatch(&self, input: &mut Input) -> Vec<Response> {
        let mut responses = self.observe(input);

        let raw = input.raw.clone();
        if let Some(stripped) = raw.strip_prefix(self.trigger) {
            let stripped = stripped.trim();
            if !stripped.is_empty() {
                responses.extend(self.run_command(input, stripped));
            }
        }

        responses
    }

    /// Passive per-line observation: message logging, tell and alert
    /// delivery, memo auto-recall. Runs exactly once per line.
    ///
    /// Store failures on this path are logged and swallowed; ordinary chat
    /// must never bounce.
    fn observe(&self, input: &Input) -> Vec<Response> {
        let mut responses = Vec::new();
        let now = Utc::now();
        let lexicon = &self.context.lexicon;
        let settings = self.context.settings.channel(&input.channel);

        if !input.private && settings.keeplogs {
            if let Err(e) =
                self.context
                    .store
                    .log_message(&input.sender, &input.channel, &input.raw, now)
            {
                error!("failed to log line from {}: {:#}", input.sender, e);
            }
        }

        match self.context.store.take_tells(&input.sender) {
            Ok(tells) if !tells.is_empty() => {
                responses.push(input.private_notice(lexicon.resolve(
                    "tell.pending",
                    &[param("count", tells.len().to_string())],
                )));
                for tell in tells {
                    responses.push(input.private_notice(lexicon.resolve(
                        "tell.delivered",
                        &[
                            param("sender", tell.sender),
                            param("elapsed", humanize_elapsed(tell.created_at, now)),
                            param("text", tell.text),
                        ],
                    )));
                }
            }
            Ok(_) => {}
            Err(e) => error!("tell delivery for {} failed: {:#}", input.sender, e),
        }

        match self.context.store.take_due_alerts(&input.sender, now) {
            Ok(alerts) => {
                for alert in alerts {
                    responses.push(input.private_notice(lexicon.resolve(
                        "alert.delivered",
                        &[
                            param("text", alert.text),
                            param("elapsed", humanize_elapsed(alert.created_at, now)),
                        ],
                    )));
                }
            }
            Err(e) => error!("alert delivery for {} failed: {:#}", input.sender, e),
        }

        if !input.private && settings.memos == MemoMode::Auto {
            if let Some(captures) = self.memo_recall.captures(input.raw.trim()) {
                let nick = &captures[1];
                match self.context.store.memo_get(nick, &input.channel) {
                    Ok(Some(memo)) => responses.push(input.reply(lexicon.resolve(
                        "memo.recall",
                        &[param("who", nick), param("text", memo.text)],
                    ))),
                    Ok(None) => debug!("no memo to recall for {} in {}", nick, input.channel),
                    Err(e) => error!("memo recall in {} failed: {:#}", input.channel, e),
                }
            }
        }

        responses
    }

    /// Resolves and runs one command line (trigger already stripped).
    fn run_command(&self, input: &mut Input, line: &str) -> Vec<Response> {
        let lexicon = Arc::clone(&self.context.lexicon);
        let (token, remainder) = match line.split_once(char::is_whitespace) {
            Some((token, remainder)) => (token, remainder.trim()),
            None => (line, ""),
        };

        let command = match self.registry.resolve(token) {
            Resolution::Match(command) => command,
            // Not a command, stay silent.
            Resolution::None => return Vec::new(),
            Resolution::Ambiguous(names) => {
                return vec![input.reply(lexicon.resolve(
                    "dispatch.ambiguous",
                    &[param("options", names.join(", "))],
                ))];
            }
        };

        if input.privilege_for(&input.channel.clone()) < command.level {
            debug!(
                "denied '{}' for {} in {}",
                command.name, input.sender, input.channel
            );
            return vec![input.reply(lexicon.resolve("dispatch.denied", &[]))];
        }

        input.args_text = remainder.to_owned();
        let parsed = match &command.spec {
            Some(spec) => match spec.parse(remainder) {
                Ok(parsed) => parsed,
                Err(usage) => return vec![input.reply(usage.usage)],
            },
            None => ParsedArgs::default(),
        };

        match (command.handler)(input, &parsed, &self.context) {
            Ok(Reply::None) => Vec::new(),
            Ok(Reply::One(response)) => vec![response],
            Ok(Reply::Many(responses)) => {
                if input.multiline {
                    responses
                } else {
                    // Sequences are only honoured when the handler opted in.
                    responses.into_iter().take(1).collect()
                }
            }
            Err(e) => {
                error!(
                    "command '{}' from {} in {} failed: {:#}",
                    command.name, input.sender, input.channel, e
                );
                vec![input.reply(lexicon.resolve("dispatch.error", &[]))]
            }
        }
    }
}
