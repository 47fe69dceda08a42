//! Connection handshake state machine
//!
//! Every non-keepalive line received from the server moves the handshake one
//! step forward until it is ready. The server's own replies are not
//! inspected; the bridge only paces its registration lines on them.

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handshake {
    #[default]
    NotRegistered,
    NickSent,
    UserSent,
    Joined,
    Ready,
}

/// Side effect of a handshake step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    SendNick,
    SendUser,
    SendJoin,
    /// Start relaying game output into the channel
    StartRelay,
}

impl Handshake {
    /// Advance on one received line
    pub fn advance(self) -> (Handshake, Option<HandshakeStep>) {
        match self {
            Handshake::NotRegistered => (Handshake::NickSent, Some(HandshakeStep::SendNick)),
            Handshake::NickSent => (Handshake::UserSent, Some(HandshakeStep::SendUser)),
            Handshake::UserSent => (Handshake::Joined, Some(HandshakeStep::SendJoin)),
            Handshake::Joined => (Handshake::Ready, Some(HandshakeStep::StartRelay)),
            Handshake::Ready => (Handshake::Ready, None),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Handshake::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_progression() {
        let mut state = Handshake::default();
        let mut steps = Vec::new();
        for _ in 0..8 {
            let (next, step) = state.advance();
            steps.push(step);
            state = next;
        }

        assert_eq!(
            steps,
            vec![
                Some(HandshakeStep::SendNick),
                Some(HandshakeStep::SendUser),
                Some(HandshakeStep::SendJoin),
                Some(HandshakeStep::StartRelay),
                None,
                None,
                None,
                None,
            ]
        );
        assert!(state.is_ready());
    }

    #[test]
    fn test_first_line_sends_nick_only() {
        let (next, step) = Handshake::NotRegistered.advance();
        assert_eq!(next, Handshake::NickSent);
        assert_eq!(step, Some(HandshakeStep::SendNick));
    }
}
