/// Request batching helpers
use std::collections::HashSet;

/// Split `items` into consecutive chunks of at most `batch_size`, preserving order
///
/// A batch size of 0 is treated as 1.
pub fn partition<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Drop duplicates, keeping the first occurrence of each id
pub fn dedupe<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .map(|id| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sizes() {
        let ids: Vec<String> = (0..250).map(|i| format!("token-{}", i)).collect();
        let batches = partition(&ids, 100);

        assert_eq!(
            batches.iter().map(|b| b.len()).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
        assert_eq!(batches[0][0], "token-0");
        assert_eq!(batches[2][49], "token-249");
        assert_eq!(batches.concat(), ids);
    }

    #[test]
    fn test_partition_edge_cases() {
        let empty: Vec<u32> = Vec::new();
        assert!(partition(&empty, 10).is_empty());
        assert_eq!(partition(&[1, 2, 3], 0), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(partition(&[1, 2], 5), vec![vec![1, 2]]);
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        assert_eq!(
            dedupe(&["SOL", "BONK", "SOL", "USDC", "BONK"]),
            vec!["SOL", "BONK", "USDC"]
        );
    }
}
