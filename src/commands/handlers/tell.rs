//! The `tell` command: deferred messages for a nick or a topic's
//! subscribers.

use chrono::Utc;

use crate::commands::argspec::ParsedArgs;
use crate::commands::dispatcher::Context;
use crate::commands::{Input, Reply};
use crate::lexicon::param;
use crate::store::{Recipient, TellOutcome};

pub fn run(
    input: &mut Input,
    args: &ParsedArgs,
    context: &Context,
) -> Result<Reply, anyhow::Error> {
    let token = args.value("recipient").unwrap_or_default();
    let text = args.value("text").unwrap_or_default();
    let recipient = Recipient::parse(token);

    let outcome = context
        .store
        .store_tell(&input.sender, &recipient, text, Utc::now())?;

    let reply = match outcome {
        TellOutcome::Stored { recipients } => match &recipient {
            Recipient::Nick(nick) => context
                .lexicon
                .resolve("tell.stored", &[param("recipient", nick.as_str())]),
            Recipient::Topic(topic) => context.lexicon.resolve(
                "tell.fanout",
                &[
                    param("count", recipients.to_string()),
                    param("topic", format!("@{}", topic)),
                ],
            ),
        },
        TellOutcome::NoSubscribers => {
            let topic = match &recipient {
                Recipient::Topic(topic) => format!("@{}", topic),
                Recipient::Nick(nick) => nick.clone(),
            };
            context
                .lexicon
                .resolve("tell.nosubscribers", &[param("topic", topic)])
        }
    };

    Ok(Reply::One(input.reply(reply)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handlers::support::{context, input, one};

    fn parsed(recipient: &str, text: &str) -> ParsedArgs {
        crate::commands::argspec::ArgSpec::new("tell <nick|@topic> <text>")
            .positional("recipient", true)
            .rest("text", true)
            .parse(&format!("{} {}", recipient, text))
            .unwrap()
    }

    #[test]
    fn test_tell_nick_stores_and_confirms() {
        let context = context();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("bob", "hello there"), &context).unwrap());
        assert_eq!(response.text, "I will pass that on to bob.");

        let pending = context.store.take_tells("bob").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, "hello there");
        assert_eq!(pending[0].sender, "alice");
    }

    #[test]
    fn test_tell_topic_fans_out() {
        let context = context();
        context.store.subscribe("bob", "infra").unwrap();
        context.store.subscribe("carol", "infra").unwrap();

        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("@infra", "deploy done"), &context).unwrap());
        assert_eq!(response.text, "Queued for 2 subscribers of @infra.");

        assert_eq!(context.store.take_tells("bob").unwrap().len(), 1);
        assert_eq!(context.store.take_tells("carol").unwrap().len(), 1);
    }

    #[test]
    fn test_tell_topic_without_subscribers() {
        let context = context();
        let mut line = input("alice", "#chat");
        let response = one(run(&mut line, &parsed("@ghost", "anyone?"), &context).unwrap());
        assert_eq!(response.text, "Nobody is subscribed to @ghost.");
    }
}
