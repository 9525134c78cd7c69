use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Challenges completed on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedDay {
    pub date: NaiveDate,
    pub challenge_ids: BTreeSet<String>,
    pub total_xp: i64,
}

impl CompletedDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            challenge_ids: BTreeSet::new(),
            total_xp: 0,
        }
    }

    pub fn with_challenges<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.challenge_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_total_xp(mut self, total_xp: i64) -> Self {
        self.total_xp = total_xp;
        self
    }

    pub fn task_count(&self) -> usize {
        self.challenge_ids.len()
    }

    /// A day counts towards the task streak once anything was completed.
    pub fn has_tasks(&self) -> bool {
        !self.challenge_ids.is_empty()
    }
}
