// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Status transition table

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Status;
use crate::error::InvalidTransition;

/// Allowed successors of one status, as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: Status,
    pub to: Vec<Status>,
}

/// Fixed directed graph of legal status changes.
///
/// Any pair not listed is rejected. A self-transition is always accepted as a
/// no-op and never needs to appear in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TransitionRule>", into = "Vec<TransitionRule>")]
pub struct TransitionTable {
    allowed: BTreeMap<Status, BTreeSet<Status>>,
}

impl TransitionTable {
    pub fn new(rules: impl IntoIterator<Item = TransitionRule>) -> Self {
        let mut allowed: BTreeMap<Status, BTreeSet<Status>> = BTreeMap::new();
        for rule in rules {
            allowed.entry(rule.from).or_default().extend(rule.to);
        }
        Self { allowed }
    }

    /// Legal successors of `from`, excluding the implicit self-transition
    pub fn successors(&self, from: Status) -> Vec<Status> {
        self.allowed
            .get(&from)
            .map(|set| set.iter().copied().filter(|s| *s != from).collect())
            .unwrap_or_default()
    }

    pub fn allows(&self, from: Status, to: Status) -> bool {
        from == to
            || self
                .allowed
                .get(&from)
                .is_some_and(|set| set.contains(&to))
    }

    /// Check a requested change against the table and return the resulting status
    pub fn validate_transition(
        &self,
        current: Status,
        requested: Status,
    ) -> Result<Status, InvalidTransition> {
        if self.allows(current, requested) {
            Ok(requested)
        } else {
            Err(InvalidTransition {
                from: current,
                to: requested,
            })
        }
    }

    /// Commit `requested` into `status` only if the table allows it
    pub fn apply_transition(
        &self,
        status: &mut Status,
        requested: Status,
    ) -> Result<Status, InvalidTransition> {
        let next = self.validate_transition(*status, requested)?;
        *status = next;
        Ok(next)
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        use Status::*;

        Self::new([
            TransitionRule { from: Started, to: vec![Running, Shutdown] },
            TransitionRule { from: Running, to: vec![Paused, Completed, Shutdown] },
            TransitionRule { from: Paused, to: vec![Running, Shutdown] },
            TransitionRule { from: Completed, to: vec![Started, Shutdown] },
            TransitionRule { from: Shutdown, to: vec![Started] },
        ])
    }
}

impl From<Vec<TransitionRule>> for TransitionTable {
    fn from(rules: Vec<TransitionRule>) -> Self {
        Self::new(rules)
    }
}

impl From<TransitionTable> for Vec<TransitionRule> {
    fn from(table: TransitionTable) -> Self {
        table
            .allowed
            .into_iter()
            .map(|(from, to)| TransitionRule {
                from,
                to: to.into_iter().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Status::*;

    const LEGAL: [(Status, Status); 10] = [
        (Started, Running),
        (Started, Shutdown),
        (Running, Paused),
        (Running, Completed),
        (Running, Shutdown),
        (Paused, Running),
        (Paused, Shutdown),
        (Completed, Started),
        (Completed, Shutdown),
        (Shutdown, Started),
    ];

    #[test]
    fn test_every_pair_follows_table() {
        let table = TransitionTable::default();

        for from in Status::ALL {
            for to in Status::ALL {
                let result = table.validate_transition(from, to);
                if from == to || LEGAL.contains(&(from, to)) {
                    assert_eq!(result, Ok(to), "{from} -> {to} should be legal");
                } else {
                    assert_eq!(result, Err(InvalidTransition { from, to }));
                }
            }
        }
    }

    #[test]
    fn test_completed_to_paused_rejected_with_both_endpoints() {
        let table = TransitionTable::default();
        let err = table.validate_transition(Completed, Paused).unwrap_err();
        assert_eq!(err.to_string(), "Invalid status transition from COMPLETED to PAUSED");
    }

    #[test]
    fn test_apply_only_commits_on_success() {
        let table = TransitionTable::default();
        let mut status = Running;

        assert!(table.apply_transition(&mut status, Started).is_err());
        assert_eq!(status, Running);

        assert_eq!(table.apply_transition(&mut status, Paused), Ok(Paused));
        assert_eq!(status, Paused);
    }

    #[test]
    fn test_successors_exclude_self() {
        let table = TransitionTable::new([TransitionRule { from: Paused, to: vec![Paused, Running] }]);
        assert_eq!(table.successors(Paused), vec![Running]);
        assert!(table.successors(Shutdown).is_empty());
    }

    #[test]
    fn test_table_round_trips_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            transitions: TransitionTable,
        }

        let text = toml::to_string(&Wrapper { transitions: TransitionTable::default() }).unwrap();
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.transitions, TransitionTable::default());
    }
}
