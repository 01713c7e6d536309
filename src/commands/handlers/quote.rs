//! The `quote` command family: saved lines attributed to a nick, per
//! channel, addressable by 1-based index.

use chrono::Utc;

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::registry::{match_name, NameMatch};
use crate::commands::{Input, Reply};
use crate::lexicon::param;
use crate::store::WriteOutcome;

pub const USAGE: &str = "quote <add|get|list|count|delete> <nick> [text|index]";

const MODES: &[&str] = &["add", "count", "delete", "get", "list"];

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let mode_token = args.value("mode").unwrap_or_default();
    let nick = args.value("nick").unwrap_or_default().to_owned();
    let arg = args.value("arg");

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
            let Some(text) = arg else {
                return Ok(usage(input));
            };
            match store.quote_add(&nick, &channel, text, Utc::now())? {
                WriteOutcome::Done => {
                    let index = store.quote_count(&nick, &channel)?;
                    context.lexicon.resolve(
                        "quote.added",
                        &[param("index", index.to_string()), param("who", nick.as_str())],
                    )
                }
                _ => context.lexicon.resolve("quote.exists", who),
            }
        }
        "get" => {
            let index = match arg {
                Some(raw) => match raw.parse::<i64>() {
                    Ok(index) => Some(index),
                    Err(_) => return Ok(usage(input)),
                },
                None => None,
            };
            match store.quote_get(&nick, &channel, index)? {
                Some(quote) => render_line(context, &quote),
                None => context.lexicon.resolve("quote.notfound", who),
            }
        }
        "list" => {
            let quotes = store.quote_list(&nick, &channel)?;
            if quotes.is_empty() {
                context.lexicon.resolve("quote.notfound", who)
            } else {
                input.multiline = true;
                let lines = quotes
                    .iter()
                    .map(|quote| input.reply(render_line(context, quote)))
                    .collect();
                return Ok(Reply::Many(lines));
            }
        }
        "count" => {
            let count = store.quote_count(&nick, &channel)?;
            context.lexicon.resolve(
                "quote.count",
                &[param("who", nick.as_str()), param("count", count.to_string())],
            )
        }
        "delete" => {
            let index = match arg.map(str::parse::<i64>) {
                Some(Ok(index)) => index,
                _ => return Ok(usage(input)),
            };
            match store.quote_delete(&nick, &channel, index)? {
                WriteOutcome::Done => context.lexicon.resolve("quote.deleted", who),
                _ => context.lexicon.resolve("quote.notfound", who),
            }
        }
        _ => return Ok(usage(input)),
    };

    Ok(Reply::One(input.reply(reply)))
}

fn render_line(context: &Context, quote: &crate::store::Quote) -> String {
    context.lexicon.resolve(
        "quote.line",
        &[
            param("index", quote.index.to_string()),
            param("who", quote.user.as_str()),
            param("text", quote.text.as_str()),
        ],
    )
}

fn usage(input: &Input) -> Reply {
    Reply::One(input.reply(format!("usage: {}", USAGE)))
}
