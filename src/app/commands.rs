//! Inbound commands carried on the subscribed topics.

/// Action requested by an inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
    Reset,
    /// Anything that is not exactly one of the three literals.
    Unknown,
}

impl Command {
    /// Classify a raw payload by exact, case-sensitive match of the whole
    /// byte string.  No trimming, no prefix matching.
    pub fn parse(payload: &[u8]) -> Self {
        match payload {
            b"ON" => Self::TurnOn,
            b"OFF" => Self::TurnOff,
            b"RESET" => Self::Reset,
            _ => Self::Unknown,
        }
    }
}
