//! The `subscribe` / `unsubscribe` commands: membership in tell topics.

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::{Input, Reply};
use crate::lexicon::param;
use crate::store::WriteOutcome;

/// Privilege level that may join restricted topics anywhere.
const RESTRICTED_LEVEL: u8 = 4;

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let topic = topic_token(args);
    let shown = format!("@{}", topic);

    // Restricted topics may only be joined from the admin channel, unless
    // the requester holds the required level in the channel of invocation.
    if context.store.is_restricted(topic)?
        && input.privilege_for(&input.channel.clone()) < RESTRICTED_LEVEL
        && !input.channel.eq_ignore_ascii_case(&context.admin_channel)
    {
        return Ok(Reply::One(input.reply(
            context
                .lexicon
                .resolve("sub.restricted", &[param("topic", shown)]),
        )));
    }

    let reply = match context.store.subscribe(&input.sender, topic)? {
        WriteOutcome::Done => context
            .lexicon
            .resolve("sub.added", &[param("topic", shown)]),
        _ => context
            .lexicon
            .resolve("sub.exists", &[param("topic", shown)]),
    };

    Ok(Reply::One(input.reply(reply)))
}

pub fn run_unsubscribe(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let topic = topic_token(args);
    let shown = format!("@{}", topic);

    let reply = match context.store.unsubscribe(&input.sender, topic)? {
        WriteOutcome::Done => context
            .lexicon
            .resolve("sub.removed", &[param("topic", shown)]),
        _ => context
            .lexicon
            .resolve("sub.notfound", &[param("topic", shown)]),
    };

    Ok(Reply::One(input.reply(reply)))
}

/// Accepts the topic with or without the `@` used when addressing tells.
fn topic_token(args: &ParsedArgs) -> &str {
    let raw = args.value("topic").unwrap_or_default();
    raw.strip_prefix('@').unwrap_or(raw)
}
