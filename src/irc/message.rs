//! Parsing and rendering of the IRC line format.
//!
//! A line is `[:prefix] COMMAND params [:trailing]`, terminated by CRLF.
//! Only the pieces the bot acts on are modelled; unknown commands still parse
//! and are ignored upstream.

/// One parsed IRC line.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Sender prefix without the leading `:`, if present.
    pub prefix: Option<String>,
    /// Command name or numeric reply code.
    pub command: String,
    /// Parameters in order; a trailing parameter keeps its spaces.
    pub params: Vec<String>,
}

impl Message {
    /// Parses one line (without the CRLF terminator).
    ///
    /// # Returns
    ///
    /// * `Some(Message)` - The line had a command
    /// * `None` - The line was empty or held only a prefix
    pub fn parse(line: &str) -> Option<Message> {
        let mut remainder = line.trim_end_matches(['\r', '\n']);

        let prefix = match remainder.strip_prefix(':') {
            Some(rest) => {
                let (prefix, rest) = rest.split_once(' ')?;
                remainder = rest.trim_start();
                Some(prefix.to_owned())
            }
            None => None,
        };

        let mut params = Vec::new();
        let command = match remainder.split_once(' ') {
            Some((command, rest)) => {
                let mut rest = rest.trim_start();
                while !rest.is_empty() {
                    if let Some(trailing) = rest.strip_prefix(':') {
                        params.push(trailing.to_owned());
                        break;
                    }
                    match rest.split_once(' ') {
                        Some((param, next)) => {
                            params.push(param.to_owned());
                            rest = next.trim_start();
                        }
                        None => {
                            params.push(rest.to_owned());
                            break;
                        }
                    }
                }
                command
            }
            None => remainder,
        };

        if command.is_empty() {
            return None;
        }

        Some(Message {
            prefix,
            command: command.to_owned(),
            params,
        })
    }

    /// Returns the nick part of the prefix (`nick!user@host`), if any.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }
}

/// Renders a PRIVMSG line.
pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {} :{}", target, text)
}

/// Renders a NOTICE line.
pub fn notice(target: &str, text: &str) -> String {
    format!("NOTICE {} :{}", target, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_with_trailing() {
        let message = Message::parse(":alice!u@host PRIVMSG #chat :hello there\r\n").unwrap();
        assert_eq!(message.prefix.as_deref(), Some("alice!u@host"));
        assert_eq!(message.command, "PRIVMSG");
        assert_eq!(message.params, vec!["#chat", "hello there"]);
        assert_eq!(message.nick(), Some("alice"));
    }

    #[test]
    fn test_parse_ping_without_prefix() {
        let message = Message::parse("PING :irc.example.net").unwrap();
        assert_eq!(message.prefix, None);
        assert_eq!(message.command, "PING");
        assert_eq!(message.params, vec!["irc.example.net"]);
    }

    #[test]
    fn test_parse_numeric_reply() {
        let message = Message::parse(":irc.example.net 001 ratatosk :Welcome").unwrap();
        assert_eq!(message.command, "001");
        assert_eq!(message.params, vec!["ratatosk", "Welcome"]);
    }

    #[test]
    fn test_parse_params_without_trailing() {
        let message = Message::parse("JOIN #chat").unwrap();
        assert_eq!(message.params, vec!["#chat"]);
    }

    #[test]
    fn test_parse_trailing_keeps_colons() {
        let message = Message::parse("PRIVMSG #chat :note: see :this:").unwrap();
        assert_eq!(message.params[1], "note: see :this:");
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("\r\n"), None);
    }

    #[test]
    fn test_nick_from_bare_prefix() {
        let message = Message::parse(":irc.example.net NOTICE * :hi").unwrap();
        assert_eq!(message.nick(), Some("irc.example.net"));
    }

    #[test]
    fn test_render_privmsg_and_notice() {
        assert_eq!(privmsg("#chat", "hi"), "PRIVMSG #chat :hi");
        assert_eq!(notice("alice", "psst"), "NOTICE alice :psst");
    }
}
