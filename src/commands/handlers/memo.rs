//! The `memo` command family: one persistent note per (nick, channel).

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::registry::{match_name, NameMatch};
use crate::commands::{Input, Reply};
use crate::config::MemoMode;
use crate::lexicon::param;
use crate::store::WriteOutcome;

pub const USAGE: &str = "memo <add|get|append|delete> <nick> [text]";

const MODES: &[&str] = &["add", "append", "delete", "get"];

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    if context.settings.channel(&input.channel).memos == MemoMode::Off {
        return Ok(Reply::One(
            input.reply(context.lexicon.resolve("memo.disabled", &[])),
        ));
    }

    let mode_token = args.value("mode").unwrap_or_default();
    let nick = args.value("nick").unwrap_or_default().to_owned();
    let text = args.value("text");

    let mode = match match_name(mode_token, MODES) {
        NameMatch::One(mode) => mode,
        NameMatch::None => return Ok(usage(input)),
        NameMatch::Many(options) => {
            return Ok(Reply::One(input.reply(context.lexicon.resolve(
                "dispatch.ambiguous",
                &[param("options", options.join(", "))],
            ))));
        }
    };

    let store = &context.store;
    let channel = input.channel.clone();
    let who = &[param("who", nick.as_str())];

    let reply = match mode.as_str() {
        "add" => {
            let Some(text) = text else {
                return Ok(usage(input));
            };
            match store.memo_add(&nick, &channel, text)? {
                WriteOutcome::Done => context.lexicon.resolve("memo.added", who),
                _ => context.lexicon.resolve("memo.exists", who),
            }
        }
        "get" => match store.memo_get(&nick, &channel)? {
            Some(memo) => context.lexicon.resolve(
                "memo.recall",
                &[param("who", nick.as_str()), param("text", memo.text)],
            ),
            None => context.lexicon.resolve("memo.notfound", who),
        },
        "append" => {
            let Some(text) = text else {
                return Ok(usage(input));
            };
            match store.memo_append(&nick, &channel, text)? {
                WriteOutcome::Done => context.lexicon.resolve("memo.appended", who),
                _ => context.lexicon.resolve("memo.notfound", who),
            }
        }
        "delete" => match store.memo_delete(&nick, &channel)? {
            WriteOutcome::Done => context.lexicon.resolve("memo.deleted", who),
            _ => context.lexicon.resolve("memo.notfound", who),
        },
        _ => return Ok(usage(input)),
    };

    Ok(Reply::One(input.reply(reply)))
}

fn usage(input: &Input) -> Reply {
    Reply::One(input.reply(format!("usage: {}", USAGE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handlers::support::{context, input, one};

    fn parsed(line: &str) -> ParsedArgs {
        crate::commands::argspec::ArgSpec::new(USAGE)
            .positional("mode", true)
            .positional("nick", true)
            .rest("text", false)
            .parse(line)
            .unwrap()
    }

    #[test]
    fn test_memo_add_and_get() {
        let context = context();
        let mut line = input("alice", "#chat");

        let response = one(run(&mut line, &parsed("add bob gone fishing"), &context).unwrap());
        assert_eq!(response.text, "Memo saved for bob.");

        let response = one(run(&mut line, &parsed("get bob"), &context).unwrap());
        assert_eq!(response.text, "memo for bob: gone fishing");
    }

    #[test]
    fn test_memo_add_duplicate_keeps_original() {
        let context = context();
        let mut line = input("alice", "#chat");
        one(run(&mut line, &parsed("add bob first"), &context).unwrap());

        let response = one(run(&mut line, &parsed("add bob second"), &context).unwrap());
        assert!(response.text.contains("already has a memo"));

        let response = one(run(&mut line, &parsed("get bob"), &context).unwrap());
        assert!(response.text.contains("first"));
    }

    #[test]
    fn test_memo_append_and_delete() {
        let context = context();
        let mut line = input("alice", "#chat");
        one(run(&mut line, &parsed("add bob first"), &context).unwrap());

        let response = one(run(&mut line, &parsed("append bob second"), &context).unwrap());
        assert_eq!(response.text, "Memo for bob extended.");

        let response = one(run(&mut line, &parsed("get bob"), &context).unwrap());
        assert!(response.text.contains("first | second"));

        let response = one(run(&mut line, &parsed("delete bob"), &context).unwrap());
        assert_eq!(response.text, "Memo for bob removed.");

        let response = one(run(&mut line, &parsed("get bob"), &context).unwrap());
        assert_eq!(response.text, "No memo for bob here.");
    }

    #[test]
    fn test_memo_append_without_existing_memo() {
        let context = context();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("append bob text"), &context).unwrap());
        assert_eq!(response.text, "No memo for bob here.");
    }

    #[test]
    fn test_memo_mode_prefix_completion() {
        let context = context();
        let mut line = input("alice", "#chat");
        one(run(&mut line, &parsed("add bob note"), &context).unwrap());

        // "g" completes to "get"; "a" is ambiguous between add and append.
        let response = one(run(&mut line, &parsed("g bob"), &context).unwrap());
        assert!(response.text.contains("note"));

        let response = one(run(&mut line, &parsed("a bob more"), &context).unwrap());
        assert!(response.text.contains("add"));
        assert!(response.text.contains("append"));
    }

    #[test]
    fn test_memo_add_without_text_is_usage() {
        let context = context();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("add bob"), &context).unwrap());
        assert_eq!(response.text, format!("usage: {}", USAGE));
    }

    #[test]
    fn test_memo_disabled_channel() {
        let context = context();
        context.settings.set("#chat", "memos", "off").unwrap();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("add bob note"), &context).unwrap());
        assert_eq!(response.text, "Memos are switched off in this channel.");
        assert!(context.store.memo_get("bob", "#chat").unwrap().is_none());
    }

    #[test]
    fn test_memos_are_scoped_per_channel() {
        let context = context();
        let mut here = input("alice", "#chat");
        one(run(&mut here, &parsed("add bob here-note"), &context).unwrap());

        let mut there = input("alice", "#other");
        let response = one(run(&mut there, &parsed("get bob"), &context).unwrap());
        assert_eq!(response.text, "No memo for bob here.");
    }
}
