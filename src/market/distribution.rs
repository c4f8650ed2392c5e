/// Holder distribution statistics
///
/// Pure functions over balances; nothing here awaits or fails.
use crate::types::{DistributionMetrics, HolderRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Concentration buckets reported in `DistributionMetrics`
pub const TOP_K: [usize; 3] = [10, 50, 100];

/// Gini coefficient of `balances`
///
/// Uses the sorted form `Σ (2i - n - 1) x_i / (n² · mean)` (1-based i over
/// ascending balances), equal to `Σ Σ |x_i - x_j| / (2 n² mean)` but O(n log n).
/// Returns 0 for an empty list or a non-positive mean.
pub fn gini_coefficient(balances: &[f64]) -> f64 {
    let n = balances.len();
    if n == 0 {
        return 0.0;
    }

    let total: f64 = balances.iter().sum();
    let mean = total / n as f64;
    if !(mean > 0.0) {
        return 0.0;
    }

    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n_f = n as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, x)| (2.0 * (idx as f64 + 1.0) - n_f - 1.0) * x)
        .sum();

    (weighted / (n_f * n_f * mean)).clamp(0.0, 1.0)
}

/// Share (percent) of `total` held by the first `k` balances of a descending list
pub fn top_k_concentration(sorted_desc: &[f64], k: usize, total: f64) -> f64 {
    if !(total > 0.0) {
        return 0.0;
    }
    let top: f64 = sorted_desc.iter().take(k).sum();
    (top / total) * 100.0
}

/// Distribution section of the market metrics
pub fn distribution_metrics(holders: &[HolderRecord]) -> DistributionMetrics {
    let mut balances: Vec<f64> = holders
        .iter()
        .map(|h| h.balance)
        .filter(|b| *b > 0.0)
        .collect();
    balances.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let total: f64 = balances.iter().sum();

    let mut holders_by_class = BTreeMap::new();
    for holder in holders.iter().filter(|h| h.balance > 0.0) {
        *holders_by_class.entry(holder.classification).or_insert(0) += 1;
    }

    DistributionMetrics {
        holder_count: balances.len(),
        gini_coefficient: gini_coefficient(&balances),
        top_10_concentration: top_k_concentration(&balances, TOP_K[0], total),
        top_50_concentration: top_k_concentration(&balances, TOP_K[1], total),
        top_100_concentration: top_k_concentration(&balances, TOP_K[2], total),
        holders_by_class,
    }
}
