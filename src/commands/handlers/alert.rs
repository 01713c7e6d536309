//! The `alert` command: reminders delivered on the sender's next activity
//! after the delay has passed.

use chrono::{Duration, Utc};

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::{Input, Reply};
use crate::lexicon::param;
use crate::utils::parse_delay;

pub const USAGE: &str = "alert <delay> <text>";

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let delay_token = args.value("delay").unwrap_or_default();
    let text = args.value("text").unwrap_or_default();

    // The argument pattern constrains the token to <digits><m|h|d>, but the
    // value may still be too large to represent; that is a usage problem,
    // not a fault.
    let now = Utc::now();
    let due = parse_delay(delay_token)
        .and_then(Duration::try_seconds)
        .and_then(|delay| now.checked_add_signed(delay));
    let Some(due) = due else {
        return Ok(Reply::One(input.reply(format!("usage: {}", USAGE))));
    };

    context.store.add_alert(&input.sender, due, text, now)?;

    Ok(Reply::One(input.reply(context.lexicon.resolve(
        "alert.stored",
        &[param("delay", delay_token)],
    ))))
}
