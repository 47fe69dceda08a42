//! Game commands and the chat command sanitizer
//!
//! Chat text is the only untrusted input that reaches the game's stdin, so it
//! is reduced to `<m|s> <target>` or replaced with a rejection.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r"^[,:]? ([ms]) ([0-9]{1,2})$").expect("Invalid command regex")
    })
}

/// A line written to the game's stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    /// Move to the given room, digits as typed
    Move(String),
    /// Shoot an arrow through the given number of rooms, digits as typed
    Shoot(String),
    /// Chat input that failed sanitizing
    Unrecognized,
    /// Answer to a yes/no prompt
    Answer(bool),
    /// Leave the game
    Quit,
}

impl GameCommand {
    /// Encode into a newline-terminated line
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameCommand::Move(target) => writeln!(f, "m {}", target),
            GameCommand::Shoot(target) => writeln!(f, "s {}", target),
            GameCommand::Unrecognized => writeln!(f, "wtf"),
            GameCommand::Answer(true) => writeln!(f, "y"),
            GameCommand::Answer(false) => writeln!(f, "n"),
            GameCommand::Quit => writeln!(f, "q"),
        }
    }
}

/// Translate the text after the address marker into a game command.
///
/// Accepts an optional `,` or `:`, a space, `m` or `s`, a space and one or
/// two ASCII digits. Trailing whitespace (the protocol line end) is ignored.
/// The digits are passed through untouched. Anything else becomes
/// [`GameCommand::Unrecognized`].
pub fn sanitize(text: &str) -> GameCommand {
    let text = text.trim_end();
    let Some(caps) = command_regex().captures(text) else {
        return GameCommand::Unrecognized;
    };
    let target = caps[2].to_string();
    match &caps[1] {
        "m" => GameCommand::Move(target),
        "s" => GameCommand::Shoot(target),
        _ => GameCommand::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_grammar() {
        assert_eq!(sanitize(", m 12").encode(), "m 12\n");
        assert_eq!(sanitize(": s 3").encode(), "s 3\n");
        assert_eq!(sanitize(" m 7\r\n").encode(), "m 7\n");
        assert_eq!(sanitize(" s 9"), GameCommand::Shoot("9".into()));
    }

    #[test]
    fn test_sanitize_keeps_digits_as_typed() {
        assert_eq!(sanitize(" m 05").encode(), "m 05\n");
        assert_eq!(sanitize(", s 00").encode(), "s 00\n");
    }

    #[test]
    fn test_sanitize_rejects_everything_else() {
        assert_eq!(sanitize("shoot the wumpus").encode(), "wtf\n");
        assert_eq!(sanitize("m 123").encode(), "wtf\n");
        assert_eq!(sanitize(" m 123").encode(), "wtf\n");
        assert_eq!(sanitize(" x 1"), GameCommand::Unrecognized);
        assert_eq!(sanitize(" m 1; q"), GameCommand::Unrecognized);
        assert_eq!(sanitize(" m 1\nq"), GameCommand::Unrecognized);
        assert_eq!(sanitize(""), GameCommand::Unrecognized);
    }

    #[test]
    fn test_sanitize_ascii_digits_only() {
        // Arabic-Indic digits match \d but must not reach the game
        assert_eq!(sanitize(" m \u{0661}\u{0662}"), GameCommand::Unrecognized);
    }

    #[test]
    fn test_fixed_commands() {
        assert_eq!(GameCommand::Answer(true).encode(), "y\n");
        assert_eq!(GameCommand::Answer(false).encode(), "n\n");
        assert_eq!(GameCommand::Quit.encode(), "q\n");
    }
}
