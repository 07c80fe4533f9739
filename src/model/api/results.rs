use std::cmp::Reverse;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Aggregate poll results, ordered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResults {
    /// Per-option vote counts, most popular first. Options with equal counts
    /// appear in their configured order.
    pub tally: Vec<OptionTally>,
    /// Total number of votes cast.
    pub total: u64,
}

/// The number of votes for a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub option: String,
    pub votes: u64,
}

impl PollResults {
    /// Assemble displayable results from raw per-option counts.
    ///
    /// Every configured option appears exactly once, zero-filled if nobody
    /// has voted for it. Counts keyed by strings outside the option set are
    /// ignored; the ledger cannot produce them.
    pub fn new(options: &[String], mut counts: HashMap<String, u64>) -> Self {
        let mut tally = options
            .iter()
            .map(|option| OptionTally {
                option: option.clone(),
                votes: counts.remove(option).unwrap_or(0),
            })
            .collect::<Vec<_>>();
        // The sort is stable, so equal counts keep the configured order.
        tally.sort_by_key(|entry| Reverse(entry.votes));
        let total = tally.iter().map(|entry| entry.votes).sum();

        Self { tally, total }
    }
}
