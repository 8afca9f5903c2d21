// Playback position and tempo configuration. The sequencer owns one of these
// and hands out copies through `Sequencer::snapshot`.

use std::collections::VecDeque;

use crate::sequencer::timing::{Meter, Subdivision};
use crate::shared::{DEFAULT_BPM, DEFAULT_DENOMINATOR, DEFAULT_NUMERATOR, NO_COLUMN, TransportStatus};

#[derive(Clone, Debug, PartialEq)]
pub struct TransportState {
    pub status: TransportStatus,
    pub bpm: f64,
    pub numerator: u32,
    pub denominator: u32,
    pub subdivision: Subdivision,
    pub looping: bool,

    pub current_column: i64,
    // deadline of the column after `current_column`
    pub next_deadline: f64,
    // time left until `next_deadline` when paused
    pub resume_offset: f64,
    // dispatched columns whose deadline hasn't arrived yet, oldest first
    pub upcoming: VecDeque<(i64, f64)>,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            status: TransportStatus::Stopped,
            bpm: DEFAULT_BPM,
            numerator: DEFAULT_NUMERATOR,
            denominator: DEFAULT_DENOMINATOR,
            subdivision: Subdivision::default(),
            looping: true,
            current_column: NO_COLUMN,
            next_deadline: 0.0,
            resume_offset: 0.0,
            upcoming: VecDeque::new(),
        }
    }
}

impl TransportState {
    pub fn meter(&self) -> Meter {
        Meter {
            bpm: self.bpm,
            numerator: self.numerator,
            denominator: self.denominator,
            subdivision: self.subdivision,
        }
    }

    /// Back to "before column 0" with nothing pending.
    pub fn reset_position(&mut self) {
        self.current_column = NO_COLUMN;
        self.resume_offset = 0.0;
        self.upcoming.clear();
    }

    // forget columns that have started sounding
    pub fn retire_started(&mut self, now: f64) {
        while self.upcoming.front().is_some_and(|(_, deadline)| *deadline <= now) {
            self.upcoming.pop_front();
        }
    }

    /// Rewind the column pointer to the earliest column that was dispatched
    /// but hasn't reached its deadline, so resuming dispatches it again.
    /// Returns that column's deadline. `next_deadline` is left alone.
    pub fn rewind_unstarted(&mut self, now: f64) -> f64 {
        self.retire_started(now);
        let resume_at = match self.upcoming.front().copied() {
            Some((column, deadline)) => {
                // -1 + 1 = 0 also covers a column 0 reached by wrapping
                self.current_column = column - 1;
                deadline
            }
            None => self.next_deadline,
        };
        self.upcoming.clear();
        resume_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_returns_to_first_unstarted_column() {
        let mut t = TransportState::default();
        t.current_column = 3;
        t.next_deadline = 2.0;
        t.upcoming.extend([(1, 1.25), (2, 1.5), (3, 1.75)]);

        let resume_at = t.rewind_unstarted(1.3);
        assert_eq!(resume_at, 1.5);
        assert_eq!(t.current_column, 1);
        assert_eq!(t.next_deadline, 2.0);
        assert!(t.upcoming.is_empty());
    }

    #[test]
    fn rewind_with_nothing_pending_keeps_position() {
        let mut t = TransportState::default();
        t.current_column = 5;
        t.next_deadline = 3.0;
        t.upcoming.push_back((5, 2.5));
        assert_eq!(t.rewind_unstarted(2.6), 3.0);
        assert_eq!(t.current_column, 5);
    }

    #[test]
    fn rewind_over_a_wrapped_column_zero() {
        let mut t = TransportState::default();
        t.current_column = 0;
        t.next_deadline = 4.125;
        t.upcoming.push_back((0, 4.0));
        assert_eq!(t.rewind_unstarted(3.95), 4.0);
        assert_eq!(t.current_column, NO_COLUMN);
        assert_eq!(t.next_deadline, 4.125);
    }
}
