// Staircase sequences and convergence helpers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of trailing values averaged into a sequence estimate
pub const ESTIMATE_WINDOW: usize = 5;

/// The two interleaved sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceName {
    /// Starts above the suggested value
    Swiss,
    /// Starts below the suggested value
    Dutch,
}

impl SequenceName {
    pub const BOTH: [SequenceName; 2] = [SequenceName::Swiss, SequenceName::Dutch];
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceName::Swiss => f.write_str("swiss"),
            SequenceName::Dutch => f.write_str("dutch"),
        }
    }
}

/// Append-only list of contrast values, each clamped to `[0, gamma]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseSequence {
    name: SequenceName,
    values: Vec<f64>,
}

impl StaircaseSequence {
    pub fn new(name: SequenceName, start: f64, gamma: f64) -> Self {
        let mut sequence = Self {
            name,
            values: Vec::new(),
        };
        sequence.push_clamped(start, gamma);
        sequence
    }

    pub fn name(&self) -> SequenceName {
        self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value presented on the next trial of this sequence
    pub fn current(&self) -> f64 {
        self.values.last().copied().unwrap_or_default()
    }

    pub fn push_clamped(&mut self, value: f64, gamma: f64) -> f64 {
        let clamped = value.clamp(0.0, gamma);
        self.values.push(clamped);
        clamped
    }

    pub fn reversal_count(&self) -> usize {
        count_reversals(&self.values)
    }

    /// Threshold estimate once enough lag-2 repeats have accumulated
    pub fn estimate(&self, n_reversals: usize) -> Option<f64> {
        if self.values.len() <= n_reversals {
            return None;
        }
        if self.reversal_count() < n_reversals {
            return None;
        }
        Some(mean_of_last(&self.values, ESTIMATE_WINDOW))
    }
}

/// Count indices `i` with `values[i] == values[i + 2]`
///
/// Equality is exact. `(x + inc) - inc` does not always round back to `x`,
/// so some up/down pairs are not counted; the exact rule is kept on purpose.
pub fn count_reversals(values: &[f64]) -> usize {
    values
        .windows(3)
        .filter(|window| window[0] == window[2])
        .count()
}

/// Mean of the last `window` values, or of all values when fewer exist
pub fn mean_of_last(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}
