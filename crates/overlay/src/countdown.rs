//! Timer-mode countdown

/// Outcome of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Show this numeral
    Show(u32),
    /// Reached zero; the numeral must disappear before the frame grab
    Finished,
}

/// Counts `N, N-1, ..., 1` then finishes. Never goes past zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    /// `None` for a zero-length countdown
    pub fn new(seconds: u32) -> Option<Self> {
        (seconds > 0).then_some(Self { remaining: seconds })
    }

    /// Numeral currently on screen
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn tick(&mut self) -> CountdownStep {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            CountdownStep::Show(self.remaining)
        } else {
            CountdownStep::Finished
        }
    }
}
