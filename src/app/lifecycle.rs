//! Process lifecycle phases.
//!
//! ```text
//! Init ──▶ Connecting ──▶ Subscribing ──▶ Running ──▶ Restarting
//! ```
//!
//! Only the dispatch loop stopping enters `Restarting`.  A `RESET`
//! command restarts the board directly and leaves the phase alone.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Connecting,
    Subscribing,
    Running,
    Restarting,
}

impl Phase {
    /// Whether `self → next` is a legal transition.
    pub const fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Init, Phase::Connecting)
                | (Phase::Connecting, Phase::Subscribing)
                | (Phase::Subscribing, Phase::Running)
                | (Phase::Running, Phase::Restarting)
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Connecting => "connecting",
            Phase::Subscribing => "subscribing",
            Phase::Running => "running",
            Phase::Restarting => "restarting",
        }
    }
}
