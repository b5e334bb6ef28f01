use serde::{Deserialize, Serialize};

/// Extremes of one wall's signed clearance sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WallSummary {
    /// Smallest positive clearance, the closest safe approach.
    pub shortest_positive: Option<f64>,
    /// Most negative clearance, the deepest breach.
    pub longest_negative: Option<f64>,
}

impl WallSummary {
    pub fn has_breach(&self) -> bool {
        self.longest_negative.is_some()
    }
}

/// Reduces a clearance sequence, ignoring the first `skip` samples and all
/// samples without a wall hit. Exact zeros count as neither clear nor breach.
pub fn summarize(signed: &[Option<f64>], skip: usize) -> WallSummary {
    let mut summary = WallSummary::default();

    for value in signed.iter().skip(skip).flatten().copied() {
        if value > 0.0 {
            summary.shortest_positive = Some(summary.shortest_positive.map_or(value, |m| m.min(value)));
        } else if value < 0.0 {
            summary.longest_negative = Some(summary.longest_negative.map_or(value, |m| m.min(value)));
        }
    }

    summary
}
