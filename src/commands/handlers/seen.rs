//! The `seen` command: reports a nick's most recent logged line.

use chrono::Utc;

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::{Input, Reply};
use crate::lexicon::param;
use crate::utils::humanize_elapsed;

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let nick = args.value("nick").unwrap_or_default();

    let reply = match context.store.last_seen(nick)? {
        Some(entry) => context.lexicon.resolve(
            "seen.last",
            &[
                param("who", nick),
                param("channel", entry.channel),
                param("elapsed", humanize_elapsed(entry.time, Utc::now())),
                param("text", entry.text),
            ],
        ),
        None => context
            .lexicon
            .resolve("seen.notfound", &[param("who", nick)]),
    };

    Ok(Reply::One(input.reply(reply)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handlers::support::{context, input, one};

    fn parsed(nick: &str) -> ParsedArgs {
        crate::commands::argspec::ArgSpec::new("seen <nick>")
            .positional("nick", true)
            .parse(nick)
            .unwrap()
    }

    #[test]
    fn test_seen_reports_last_line() {
        let context = context();
        let earlier = Utc::now() - chrono::Duration::minutes(5);
        context
            .store
            .log_message("bob", "#chat", "old line", earlier)
            .unwrap();
        context
            .store
            .log_message("bob", "#chat", "latest line", Utc::now())
            .unwrap();

        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("bob"), &context).unwrap());
        assert!(response.text.contains("bob was last seen in #chat"));
        assert!(response.text.contains("latest line"));
        assert!(!response.text.contains("old line"));
    }

    #[test]
    fn test_seen_unknown_nick() {
        let context = context();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("ghost"), &context).unwrap());
        assert_eq!(response.text, "I have never seen ghost speak.");
    }

    #[test]
    fn test_seen_is_case_insensitive() {
        let context = context();
        context
            .store
            .log_message("Bob", "#chat", "hi", Utc::now())
            .unwrap();

        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("BOB"), &context).unwrap());
        assert!(response.text.contains("last seen"));
    }
}
