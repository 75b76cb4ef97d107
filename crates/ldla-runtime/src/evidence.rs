#![forbid(unsafe_code)]

//! Bounded FIFO evidence ledger for the per-pivot decisions of an elimination sweep.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::mode::RuntimeMode;

/// Which branch of the pivot optimisation produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotCase {
    /// Unconstrained optimum was feasible; no perturbation at this pivot.
    Interior,
    /// The pivot had no off-diagonal history (`alpha = 0`); `d` is a clamp of the diagonal.
    NoHistory,
    /// Optimum on the boundary of the feasible region.
    Boundary,
}

/// Complete record of a single elimination step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotEvidenceEntry {
    pub step: usize,
    pub pivot: usize,
    pub d: f64,
    pub omega: f64,
    pub penalty: f64,
    pub case: PivotCase,
    /// Number of pivot candidates the solver was evaluated for at this step.
    pub candidates_scanned: usize,
    pub mode: RuntimeMode,
}

/// Bounded FIFO evidence buffer recording elimination steps.
///
/// Capacity is enforced via `capacity.max(1)`. When full, the oldest entry is
/// evicted before a new entry is appended; `total_recorded` keeps counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotEvidenceLedger {
    capacity: usize,
    entries: VecDeque<PivotEvidenceEntry>,
    total_recorded: usize,
}

impl PivotEvidenceLedger {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            total_recorded: 0,
        }
    }

    /// Append an entry, evicting the oldest if at capacity.
    pub fn record(&mut self, entry: PivotEvidenceEntry) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_recorded += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently recorded entry.
    #[must_use]
    pub fn latest(&self) -> Option<&PivotEvidenceEntry> {
        self.entries.back()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn total_recorded(&self) -> usize {
        self.total_recorded
    }

    pub fn iter(&self) -> impl Iterator<Item = &PivotEvidenceEntry> {
        self.entries.iter()
    }

    /// Sum of the per-pivot penalties still held by the ledger.
    #[must_use]
    pub fn retained_penalty(&self) -> f64 {
        self.entries.iter().map(|entry| entry.penalty).sum()
    }

    /// Number of retained steps that had to perturb the matrix.
    #[must_use]
    pub fn perturbed_steps(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.penalty > 0.0)
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serialize the retained entries to JSONL for an audit trail.
    #[must_use]
    pub fn serialize_jsonl(&self) -> String {
        self.entries
            .iter()
            .filter_map(|entry| serde_json::to_string(entry).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for PivotEvidenceLedger {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step: usize, penalty: f64) -> PivotEvidenceEntry {
        PivotEvidenceEntry {
            step,
            pivot: step,
            d: 1.0,
            omega: 1.0,
            penalty,
            case: if penalty == 0.0 {
                PivotCase::Interior
            } else {
                PivotCase::Boundary
            },
            candidates_scanned: 1,
            mode: RuntimeMode::Strict,
        }
    }

    #[test]
    fn ledger_is_bounded() {
        let mut ledger = PivotEvidenceLedger::new(2);
        for step in 0..4 {
            ledger.record(entry(step, 0.0));
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total_recorded(), 4);
        assert_eq!(ledger.latest().map(|e| e.step), Some(3));
        assert_eq!(ledger.iter().next().map(|e| e.step), Some(2));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut ledger = PivotEvidenceLedger::new(0);
        assert_eq!(ledger.capacity(), 1);
        ledger.record(entry(0, 0.0));
        ledger.record(entry(1, 0.5));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn penalty_summaries() {
        let mut ledger = PivotEvidenceLedger::new(8);
        ledger.record(entry(0, 0.0));
        ledger.record(entry(1, 0.25));
        ledger.record(entry(2, 0.5));
        assert_eq!(ledger.perturbed_steps(), 2);
        assert!((ledger.retained_penalty() - 0.75).abs() < 1e-15);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_recorded(), 3);
    }

    #[test]
    fn jsonl_serialization() {
        let mut ledger = PivotEvidenceLedger::new(4);
        ledger.record(entry(0, 0.0));
        ledger.record(entry(1, 2.0));
        let jsonl = ledger.serialize_jsonl();
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).expect("valid JSON");
        assert_eq!(parsed["step"], 1);
        assert_eq!(parsed["case"], "boundary");
        assert_eq!(parsed["mode"], "Strict");
    }
}
