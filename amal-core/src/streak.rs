//! Consecutive-day run lengths over daily qualification flags.

use serde::{Deserialize, Serialize};

/// Current and best run lengths over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    /// Run ending at the newest day of the window.
    pub current: u32,
    /// Longest run anywhere in the window.
    pub best: u32,
}

impl Streaks {
    /// Computes both streaks from flags ordered oldest to newest.
    pub fn from_chronological(flags: &[bool]) -> Self {
        Self {
            current: current_streak(flags.iter().rev().copied()),
            best: best_streak(flags.iter().copied()),
        }
    }
}

/// Counts qualifying days from the newest day backwards, stopping at the
/// first day that does not qualify.
pub fn current_streak<I>(newest_first: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    newest_first
        .into_iter()
        .take_while(|qualifies| *qualifies)
        .count() as u32
}

/// Longest run of qualifying days, scanning oldest to newest.
pub fn best_streak<I>(chronological: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    let mut best = 0;
    let mut chain = 0;
    for qualifies in chronological {
        if qualifies {
            chain += 1;
            best = best.max(chain);
        } else {
            chain = 0;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_flags() {
        let streaks = Streaks::from_chronological(&[true, true, false, true]);
        assert_eq!(streaks.best, 2);
        assert_eq!(streaks.current, 1);
    }

    #[test]
    fn test_all_true() {
        let flags = vec![true; 9];
        let streaks = Streaks::from_chronological(&flags);
        assert_eq!(streaks, Streaks { current: 9, best: 9 });
    }

    #[test]
    fn test_all_false_and_empty() {
        assert_eq!(Streaks::from_chronological(&[false; 5]), Streaks::default());
        assert_eq!(Streaks::from_chronological(&[]), Streaks::default());
    }

    #[test]
    fn test_current_streak_broken_by_newest_day() {
        let streaks = Streaks::from_chronological(&[true, true, true, false]);
        assert_eq!(streaks.current, 0);
        assert_eq!(streaks.best, 3);
    }

    #[test]
    fn test_current_streak_newest_first() {
        assert_eq!(current_streak([true, true, false, true]), 2);
        assert_eq!(current_streak(std::iter::empty()), 0);
    }
}
