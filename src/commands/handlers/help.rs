//! The `help` command: command list and per-command usage.

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::registry::{match_name, NameMatch};
use crate::commands::{Input, Reply};
use crate::lexicon::param;

/// Without an argument, lists every command. With one, shows that command's
/// summary and usage line. Registered without a spec so the bare form works.
pub fn run(
    input: &mut Input,
    _args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let wanted = input.args_text.trim().to_owned();
    let names: Vec<&str> = context
        .help
        .iter()
        .map(|(name, _, _)| name.as_str())
        .collect();

    if wanted.is_empty() {
        return Ok(Reply::One(input.reply(context.lexicon.resolve(
            "help.intro",
            &[
                param("commands", names.join(", ")),
                param("trigger", context.trigger.to_string()),
            ],
        ))));
    }

    let resolved = match match_name(&wanted, &names) {
        NameMatch::One(name) => name,
        NameMatch::None | NameMatch::Many(_) => {
            return Ok(Reply::One(input.reply(
                context
                    .lexicon
                    .resolve("help.unknown", &[param("name", wanted)]),
            )));
        }
    };

    let entry = context.help.iter().find(|(name, _, _)| *name == resolved);
    let text = match entry {
        Some((name, summary, Some(usage))) => format!("{} - {} (usage: {})", name, summary, usage),
        Some((name, summary, None)) => format!("{} - {}", name, summary),
        None => context
            .lexicon
            .resolve("help.unknown", &[param("name", resolved)]),
    };

    Ok(Reply::One(input.reply(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handlers::support::{context, input, one};

    fn context_with_entries() -> Context {
        let mut context = context();
        context.help = vec![
            ("seen".to_owned(), "last sighting".to_owned(), Some("seen <nick>".to_owned())),
            ("help".to_owned(), "this".to_owned(), None),
        ];
        context
    }

    #[test]
    fn test_bare_help_lists_commands() {
        let context = context_with_entries();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &ParsedArgs::default(), &context).unwrap());
        assert!(response.text.contains("seen"));
        assert!(response.text.contains("help"));
        assert!(response.text.contains('.'));
    }

    #[test]
    fn test_help_for_one_command_shows_usage() {
        let context = context_with_entries();
        let mut line = input("alice", "#chat");
        line.args_text = "seen".to_owned();
        let response = one(run(&mut line, &ParsedArgs::default(), &context).unwrap());
        assert_eq!(response.text, "seen - last sighting (usage: seen <nick>)");
    }

    #[test]
    fn test_help_completes_unambiguous_prefix() {
        let context = context_with_entries();
        let mut line = input("alice", "#chat");
        line.args_text = "se".to_owned();
        let response = one(run(&mut line, &ParsedArgs::default(), &context).unwrap());
        assert!(response.text.starts_with("seen"));
    }

    #[test]
    fn test_help_unknown_command() {
        let context = context_with_entries();
        let mut line = input("alice", "#chat");
        line.args_text = "zzz".to_owned();
        let response = one(run(&mut line, &ParsedArgs::default(), &context).unwrap());
        assert_eq!(response.text, "No such command: zzz.");
    }
}
