//! Async IRC connection: registration, keepalive and line traffic.
//!
//! The client owns two tasks: a reader that turns server lines into
//! [`Event`]s and answers PING, and a writer that drains the outbound queue.
//! Everything else talks to the connection through the queue, so sending
//! never blocks dispatch.

use anyhow::Context as _;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::commands::{Response, SendMode};
use crate::config::Irc;
use crate::irc::message::{notice, privmsg, Message};
use crate::irc::{Event, Outbound};

/// A live IRC connection.
pub struct IrcClient {
    nick: String,
    outbound: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl IrcClient {
    /// Connects, registers and starts the reader and writer tasks.
    ///
    /// The configured channels are joined once the server confirms the
    /// registration, after which [`Event::Ready`] is surfaced.
    ///
    /// # Errors
    ///
    /// Returns an error when the TCP connection cannot be established.
    /// Later transport failures end the tasks and close the event stream.
    pub async fn connect(config: &Irc) -> Result<Self, anyhow::Error> {
        let stream = TcpStream::connect((config.server.as_str(), config.port))
            .await
            .with_context(|| format!("failed to connect to {}:{}", config.server, config.port))?;
        info!("connected to {}:{}", config.server, config.port);

        let (reader, mut writer) = stream.into_split();
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                debug!("-> {}", line);
                if let Err(e) = writer.write_all(format!("{}\r\n", line).as_bytes()).await {
                    error!("write failed: {}", e);
                    break;
                }
            }
        });

        let _ = line_tx.send(format!("NICK {}", config.nick));
        let _ = line_tx.send(format!("USER {} 0 * :{}", config.nick, config.nick));

        let nick = config.nick.clone();
        let channels = config.channels.clone();
        let writer_queue = line_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        debug!("<- {}", line);
                        let Some(message) = Message::parse(&line) else {
                            continue;
                        };
                        match message.command.as_str() {
                            "PING" => {
                                let token =
                                    message.params.first().map(String::as_str).unwrap_or("");
                                let _ = writer_queue.send(format!("PONG :{}", token));
                            }
                            "001" => {
                                info!("registered as {}", nick);
                                for channel in &channels {
                                    let _ = writer_queue.send(format!("JOIN {}", channel));
                                }
                                if event_tx.send(Event::Ready).is_err() {
                                    break;
                                }
                            }
                            "PRIVMSG" => {
                                let Some(sender) = message.nick() else {
                                    continue;
                                };
                                if message.params.len() < 2 {
                                    continue;
                                }
                                let event = Event::Privmsg {
                                    sender: sender.to_owned(),
                                    target: message.params[0].clone(),
                                    text: message.params[1].clone(),
                                };
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    Ok(None) => {
                        warn!("server closed the connection");
                        break;
                    }
                    Err(e) => {
                        error!("read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(IrcClient {
            nick: config.nick.clone(),
            outbound: line_tx,
            events: event_rx,
        })
    }

    /// Receives the next inbound event; `None` when the connection is gone.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// The nick the bot registered with.
    pub fn nick(&self) -> &str {
        &self.nick
    }
}

impl Outbound for IrcClient {
    fn deliver(&self, response: &Response) {
        let line = match response.mode {
            SendMode::Message => privmsg(&response.target, &response.text),
            SendMode::Notice => notice(&response.target, &response.text),
        };
        if self.outbound.send(line).is_err() {
            warn!("dropping response to {}, connection is gone", response.target);
        }
    }
}
