//! Chat line protocol
//!
//! Outbound lines are `<VERB> <args...>\r\n`. Only the handful of verbs the
//! bridge needs are modelled; everything else coming from the server is
//! treated as opaque traffic.

use std::fmt;

/// Line terminator for outbound protocol lines
pub const LINE_END: &str = "\r\n";

/// Keyword that opens a keepalive challenge
pub const PING: &str = "PING";

/// Commands the bridge sends to the chat server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Register the bridge identity
    Nick { nick: String },
    /// Register the user record (username and realname both set to the nick)
    User { nick: String },
    /// Join a channel (name without `#`)
    Join { channel: String },
    /// Message to a channel (name without `#`)
    Privmsg { channel: String, text: String },
    /// Keepalive reply
    Pong { payload: String },
    /// Disconnect
    Quit,
}

impl ChatCommand {
    /// Header every channel message starts with, up to and including the `:`
    pub fn privmsg_prefix(channel: &str) -> String {
        format!("PRIVMSG #{} :", channel)
    }

    /// Encode into a terminated protocol line
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatCommand::Nick { nick } => write!(f, "NICK {}{}", nick, LINE_END),
            ChatCommand::User { nick } => write!(f, "USER {} wump 0 :{}{}", nick, nick, LINE_END),
            ChatCommand::Join { channel } => write!(f, "JOIN #{}{}", channel, LINE_END),
            ChatCommand::Privmsg { channel, text } => {
                write!(f, "{}{}{}", Self::privmsg_prefix(channel), text, LINE_END)
            }
            ChatCommand::Pong { payload } => write!(f, "PONG :{}{}", payload, LINE_END),
            ChatCommand::Quit => write!(f, "QUIT{}", LINE_END),
        }
    }
}

/// Payload of a keepalive challenge, or `None` if the line is not one.
///
/// `"PING :abc123\r\n"` yields `"abc123"`.
pub fn ping_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(PING)?;
    let rest = rest.trim_end_matches(['\r', '\n']);
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with(':')) {
        return None;
    }
    let rest = rest.trim_start_matches(' ');
    Some(rest.strip_prefix(':').unwrap_or(rest))
}

/// Free text of a channel message addressed to `nick`, i.e. everything after
/// `PRIVMSG #<channel> :<nick>:` (line terminator included).
pub fn addressed_text<'a>(line: &'a str, channel: &str, nick: &str) -> Option<&'a str> {
    let marker = format!("{}{}:", ChatCommand::privmsg_prefix(channel), nick);
    line.find(&marker).map(|index| &line[index + marker.len()..])
}
