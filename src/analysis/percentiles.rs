//! Nearest-rank percentiles over per-message average latencies.
//!
//! Values are fixed point: hundredths of a millisecond.

const PERCENT_DIVISOR: u64 = 100;
const X100: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub avg_x100: i64,
    pub p15_x100: i64,
    pub p25_x100: i64,
    pub p50_x100: i64,
    pub p75_x100: i64,
    pub p90_x100: i64,
    pub p95_x100: i64,
    pub p99_x100: i64,
}

impl LatencyStats {
    /// Computes the stats of `samples`. An empty input yields all zeros.
    #[must_use]
    pub fn from_samples(mut samples: Vec<i64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();
        Self {
            avg_x100: mean(&samples),
            p15_x100: nearest_rank(&samples, 15),
            p25_x100: nearest_rank(&samples, 25),
            p50_x100: nearest_rank(&samples, 50),
            p75_x100: nearest_rank(&samples, 75),
            p90_x100: nearest_rank(&samples, 90),
            p95_x100: nearest_rank(&samples, 95),
            p99_x100: nearest_rank(&samples, 99),
        }
    }
}

/// Element at zero-based index `floor(percentile * n / 100)` of sorted
/// `values`, without interpolation.
#[must_use]
pub fn nearest_rank(values: &[i64], percentile: u64) -> i64 {
    let len = u64::try_from(values.len()).unwrap_or(u64::MAX);
    let index = percentile
        .saturating_mul(len)
        .checked_div(PERCENT_DIVISOR)
        .unwrap_or(0);
    let idx = usize::try_from(index).unwrap_or_else(|_| values.len().saturating_sub(1));
    values
        .get(idx)
        .or_else(|| values.last())
        .copied()
        .unwrap_or(0)
}

/// Mean of `values`, truncated toward zero.
#[must_use]
pub fn mean(values: &[i64]) -> i64 {
    let count = i64::try_from(values.len()).unwrap_or(i64::MAX);
    let sum = values
        .iter()
        .fold(0_i64, |acc, value| acc.saturating_add(*value));
    sum.checked_div(count).unwrap_or(0)
}

/// Mean of whole-millisecond `latencies` in hundredths of a millisecond.
#[must_use]
pub fn mean_x100(latencies_ms: &[i64]) -> i64 {
    let count = i64::try_from(latencies_ms.len()).unwrap_or(i64::MAX);
    let sum = latencies_ms
        .iter()
        .fold(0_i64, |acc, value| acc.saturating_add(*value));
    sum.saturating_mul(X100).checked_div(count).unwrap_or(0)
}

/// Renders a fixed-point value with two decimals.
#[must_use]
pub fn format_x100(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
