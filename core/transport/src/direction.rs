/// Playback direction of a reader, and therefore of every sample counter
/// driven by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayDirection {
    #[default]
    Forward,
    Reverse,
}

impl PlayDirection {
    pub const fn from_forward(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Reverse
        }
    }

    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    /// +1 when playing forward, -1 in reverse.
    pub const fn signum(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}
