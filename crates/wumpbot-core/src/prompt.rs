//! Prompt auto-responder
//!
//! The game blocks on a few interactive questions. This state machine
//! watches the token stream, swallows the prompt text and decides on a canned
//! answer, so the channel only ever sees game prose. The move-or-shoot
//! question is swallowed without an answer; players answer it themselves.

use crate::command::GameCommand;

/// Token that opens the instructions question
pub const INSTRUCTIONS_START: &str = "Instructions? ";
/// Token that closes the instructions question
pub const INSTRUCTIONS_END: &str = "(y-n) ";
/// Token that opens the move-or-shoot question
pub const MOVE_START: &str = "Move ";
/// Marker closing the move-or-shoot question
pub const MOVE_END: &str = "(m-s)";
/// Token that opens the play-again question
pub const CARE_START: &str = "Care ";
/// Marker closing both yes/no questions of the play-again sequence
pub const YES_NO: &str = "(y-n)";

/// Which prompt, if any, is being consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptState {
    /// Tokens are relayed to the channel
    #[default]
    Relay,
    AwaitingInstructionsConfirm,
    AwaitingMoveOrShoot,
    AwaitingPlayAgain,
    AwaitingSameCave,
}

/// Canned answer emitted when a prompt closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    DeclineInstructions,
    PlayAgain,
    /// Second half of the play-again sequence; the game restarts after it
    NewCave,
}

impl PromptReply {
    pub fn command(&self) -> GameCommand {
        match self {
            PromptReply::DeclineInstructions => GameCommand::Answer(false),
            PromptReply::PlayAgain => GameCommand::Answer(true),
            PromptReply::NewCave => GameCommand::Answer(false),
        }
    }
}

/// Result of feeding one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: PromptState,
    pub reply: Option<PromptReply>,
    /// Token must not reach the channel
    pub suppressed: bool,
}

impl Transition {
    fn relay() -> Self {
        Self {
            next: PromptState::Relay,
            reply: None,
            suppressed: false,
        }
    }

    fn swallow(next: PromptState, reply: Option<PromptReply>) -> Self {
        Self {
            next,
            reply,
            suppressed: true,
        }
    }
}

impl PromptState {
    /// Feed one token and get the next state
    pub fn step(self, token: &str) -> Transition {
        use PromptState::*;

        match self {
            Relay => match token {
                INSTRUCTIONS_START => Transition::swallow(AwaitingInstructionsConfirm, None),
                MOVE_START => Transition::swallow(AwaitingMoveOrShoot, None),
                CARE_START => Transition::swallow(AwaitingPlayAgain, None),
                _ => Transition::relay(),
            },
            AwaitingInstructionsConfirm if token == INSTRUCTIONS_END => {
                Transition::swallow(Relay, Some(PromptReply::DeclineInstructions))
            }
            AwaitingMoveOrShoot if token.contains(MOVE_END) => Transition::swallow(Relay, None),
            AwaitingPlayAgain if token.contains(YES_NO) => {
                Transition::swallow(AwaitingSameCave, Some(PromptReply::PlayAgain))
            }
            AwaitingSameCave if token.contains(YES_NO) => {
                Transition::swallow(Relay, Some(PromptReply::NewCave))
            }
            waiting => Transition::swallow(waiting, None),
        }
    }

    pub fn is_relaying(&self) -> bool {
        matches!(self, PromptState::Relay)
    }
}
