use serde::{Deserialize, Serialize};

/// Most recent API usage reported by the upstream provider.
///
/// Snapshots are never patched in place; every successful usage lookup
/// produces a new one that replaces the previous value wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub total: f64,
    pub remaining: f64,
    pub percentage_used: f64,
}

impl QuotaSnapshot {
    pub fn new(total: f64, remaining: f64) -> Self {
        let percentage_used = if total > 0.0 {
            (total - remaining) / total * 100.0
        } else {
            0.0
        };

        Self {
            total,
            remaining,
            percentage_used,
        }
    }

    pub fn used(&self) -> f64 {
        self.total - self.remaining
    }

    /// Whether quota-consuming calls may be made.
    pub fn is_available(&self) -> bool {
        self.remaining > 0.0
    }
}
