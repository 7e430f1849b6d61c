/// Poll state machine states.
///
/// `Init → WaitingBefore → Polling → (Found | TimedOut)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Nothing has happened yet
    Init,
    /// Sleeping `before` once
    WaitingBefore,
    /// Capturing and matching until found or out of time
    Polling,
    /// Matched before the deadline; `after` has been slept
    Found,
    /// Deadline passed; the last attempt's result is returned as-is
    TimedOut,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Found | PollState::TimedOut)
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollState::Init => write!(f, "Init"),
            PollState::WaitingBefore => write!(f, "Waiting before"),
            PollState::Polling => write!(f, "Polling"),
            PollState::Found => write!(f, "Found"),
            PollState::TimedOut => write!(f, "Timed out"),
        }
    }
}
