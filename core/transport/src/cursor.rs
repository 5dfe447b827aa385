use crate::direction::PlayDirection;

/// Read progress through a trimmed region, in output samples.
///
/// `read` is signed and moves with the play direction: forward reads add to
/// it, reverse reads subtract. `total` is the length of the region. What is
/// "left" depends on the direction, so every consumer asks through
/// [`SampleCursor::left`] instead of assuming monotonic growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleCursor {
    read: i64,
    total: i64,
}

impl SampleCursor {
    pub const fn new(total: i64) -> Self {
        Self { read: 0, total }
    }

    pub const fn read(&self) -> i64 {
        self.read
    }

    pub const fn total(&self) -> i64 {
        self.total
    }

    pub fn set_read(&mut self, read: i64) {
        self.read = read;
    }

    pub fn set_total(&mut self, total: i64) {
        self.total = total;
    }

    /// Moves the read position without regard to direction.
    pub fn shift(&mut self, delta: i64) {
        self.read += delta;
    }

    /// Accounts for `count` samples consumed in `direction`.
    pub fn advance(&mut self, count: usize, direction: PlayDirection) {
        self.read += count as i64 * direction.signum();
    }

    /// Samples remaining before the region boundary in `direction`: the end
    /// when playing forward, position 0 in reverse.
    pub fn left(&self, direction: PlayDirection) -> usize {
        match direction {
            PlayDirection::Forward => {
                if self.total > self.read {
                    (self.total - self.read) as usize
                } else {
                    0
                }
            }
            PlayDirection::Reverse => {
                if self.read > self.total || self.read < 0 {
                    0
                } else {
                    self.read as usize
                }
            }
        }
    }
}
