//! Splitting records into store-acceptable batches.

use std::collections::HashMap;

use super::types::StoreRecord;

/// Groups records by partition key and splits each group into chunks of at
/// most `max_batch_size`.
///
/// Partitions appear in the order their first record appears, and records
/// keep their relative order within a partition. Every returned batch holds
/// a single partition key.
pub fn partition_batches(records: Vec<StoreRecord>, max_batch_size: usize) -> Vec<Vec<StoreRecord>> {
    let max_batch_size = max_batch_size.max(1);
    let mut order: Vec<Vec<StoreRecord>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.partition_key) {
            Some(&position) => order[position].push(record),
            None => {
                index.insert(record.partition_key.clone(), order.len());
                order.push(vec![record]);
            }
        }
    }

    let mut batches = Vec::new();
    for group in order {
        let mut group = group.into_iter().peekable();
        while group.peek().is_some() {
            batches.push(group.by_ref().take(max_batch_size).collect());
        }
    }
    batches
}

/// Returns true if every record in `records` shares one partition key.
pub fn is_single_partition(records: &[StoreRecord]) -> bool {
    match records.first() {
        Some(first) => records
            .iter()
            .all(|record| record.partition_key == first.partition_key),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pk: &str, rk: usize) -> StoreRecord {
        StoreRecord::new(pk, rk.to_string())
    }

    #[test]
    fn test_groups_by_partition_in_first_seen_order() {
        let records = vec![record("b", 1), record("a", 2), record("b", 3), record("a", 4)];
        let batches = partition_batches(records, 100);

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|batch| is_single_partition(batch)));
        assert_eq!(batches[0][0].partition_key, "b");
        let rows: Vec<&str> = batches[0].iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(rows, vec!["1", "3"]);
    }

    #[test]
    fn test_splits_large_partitions() {
        let records: Vec<StoreRecord> = (0..250).map(|i| record("p", i)).collect();
        let batches = partition_batches(records, 100);

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches[2][0].row_key, "200");
    }

    #[test]
    fn test_empty_input() {
        assert!(partition_batches(Vec::new(), 100).is_empty());
        assert!(is_single_partition(&[]));
    }

    #[test]
    fn test_mixed_partitions_detected() {
        assert!(!is_single_partition(&[record("a", 1), record("b", 1)]));
    }
}
