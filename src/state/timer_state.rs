//! Countdown state and its per-tick transition

use serde::{Deserialize, Serialize};

/// State of one countdown run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub seconds_remaining: u64,
    /// The low-time warning has fired
    pub warned: bool,
    /// Expiry has fired; no further ticks apply
    pub expired: bool,
}

/// What a single tick produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub seconds_remaining: u64,
    /// At or under the warning threshold
    pub low_time: bool,
    /// The warning fires on this tick
    pub warn: bool,
    /// Expiry fires on this tick
    pub expire: bool,
}

impl TimerState {
    /// Create a fresh timer state with the given time left
    pub fn new(seconds_remaining: u64) -> Self {
        Self {
            seconds_remaining,
            warned: false,
            expired: false,
        }
    }

    /// Check if the countdown is still running
    pub fn is_active(&self) -> bool {
        !self.expired
    }

    /// Advance by one second.
    ///
    /// The warning fires only on the exact threshold second, and only once.
    /// Expired state never changes again.
    pub fn tick(&mut self, warning_threshold: u64) -> TickEvents {
        if self.expired {
            return TickEvents::default();
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);

        let warn = !self.warned && self.seconds_remaining == warning_threshold;
        if warn {
            self.warned = true;
        }

        let expire = self.seconds_remaining == 0;
        if expire {
            self.expired = true;
        }

        TickEvents {
            seconds_remaining: self.seconds_remaining,
            low_time: self.seconds_remaining <= warning_threshold,
            warn,
            expire,
        }
    }

    /// Force expiry without a tick. Returns false if already expired.
    pub fn expire(&mut self) -> bool {
        if self.expired {
            return false;
        }
        self.seconds_remaining = 0;
        self.expired = true;
        true
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_decrement_until_expiry() {
        let mut state = TimerState::new(3);

        assert_eq!(state.tick(0).seconds_remaining, 2);
        assert_eq!(state.tick(0).seconds_remaining, 1);
        let last = state.tick(0);
        assert!(last.expire);
        assert!(state.expired);

        assert_eq!(state.tick(0), TickEvents::default());
        assert_eq!(state.seconds_remaining, 0);
    }

    #[test]
    fn warning_fires_once_on_exact_threshold() {
        let mut state = TimerState::new(5);
        let warnings: Vec<bool> = (0..5).map(|_| state.tick(3).warn).collect();
        assert_eq!(warnings, vec![false, true, false, false, false]);
        assert!(state.warned);
    }

    #[test]
    fn warning_is_skipped_when_resuming_below_threshold() {
        let mut state = TimerState::new(2);
        assert!(!state.tick(10).warn);
        assert!(state.tick(10).low_time);
        assert!(!state.warned);
    }

    #[test]
    fn forced_expiry_happens_once() {
        let mut state = TimerState::new(30);
        assert!(state.expire());
        assert!(!state.expire());
        assert_eq!(state.seconds_remaining, 0);
        assert!(!state.is_active());
    }
}
