//! Privileged commands: topic restriction and channel settings.

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::{Input, Reply};
use crate::lexicon::param;

/// `restrict <topic>` marks a topic as restricted; `restrict -d <topic>`
/// drops the restriction. Both forms are idempotent.
pub fn restrict(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let raw = args.value("topic").unwrap_or_default();
    let topic = raw.strip_prefix('@').unwrap_or(raw);
    let shown = format!("@{}", topic);

    let reply = if args.flag("drop") {
        context.store.unrestrict(topic)?;
        context
            .lexicon
            .resolve("restrict.removed", &[param("topic", shown)])
    } else {
        context.store.restrict(topic)?;
        context
            .lexicon
            .resolve("restrict.added", &[param("topic", shown)])
    };

    Ok(Reply::One(input.reply(reply)))
}

/// `set <key> <value>` flips a setting of the channel of invocation.
pub fn set(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let key = args.value("key").unwrap_or_default();
    let value = args.value("value").unwrap_or_default();

    let reply = match context.settings.set(&input.channel, key, value) {
        Ok(()) => context.lexicon.resolve(
            "set.done",
            &[
                param("key", key),
                param("value", value),
                param("channel", input.channel.as_str()),
            ],
        ),
        Err(_) => context
            .lexicon
            .resolve("set.unknown", &[param("key", key)]),
    };

    Ok(Reply::One(input.reply(reply)))
}
