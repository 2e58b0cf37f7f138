//! Three-way diff of two dumps by task identity
//!
//! Typical use is comparing two dumps of the same process taken some time
//! apart: tasks only in the first have exited, tasks in both are long-lived
//! (possibly stuck), tasks only in the second are new.

use crate::dump::TaskDump;
use crate::record::TaskRecord;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Result of [`diff`]; every collection is ordered by identity
#[derive(Debug, Clone, Default)]
pub struct DumpDiff {
    /// Identities present only in the left dump
    pub left_only: TaskDump,
    /// Identities present in both; holds the right dump's tasks
    pub common: TaskDump,
    /// Identities present only in the right dump
    pub right_only: TaskDump,
}

/// Partition `left` and `right` by identity
///
/// The three outputs share task instances with the inputs.
pub fn diff(left: &TaskDump, right: &TaskDump) -> DumpDiff {
    let left_ids: HashSet<u64> = left.iter().map(TaskRecord::id).collect();
    let right_ids: HashSet<u64> = right.iter().map(TaskRecord::id).collect();

    let mut left_only = BTreeMap::new();
    for task in left.shared() {
        if !right_ids.contains(&task.id()) {
            left_only.insert(task.id(), Arc::clone(task));
        }
    }

    let mut common = BTreeMap::new();
    let mut right_only = BTreeMap::new();
    for task in right.shared() {
        let target = if left_ids.contains(&task.id()) {
            &mut common
        } else {
            &mut right_only
        };
        target.insert(task.id(), Arc::clone(task));
    }

    tracing::debug!(
        left_only = left_only.len(),
        common = common.len(),
        right_only = right_only.len(),
        "diffed dumps"
    );

    DumpDiff {
        left_only: TaskDump::from_id_map(left_only),
        common: TaskDump::from_id_map(common),
        right_only: TaskDump::from_id_map(right_only),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(ids: &[u64]) -> TaskDump {
        TaskDump::from_records(ids.iter().map(|id| {
            let mut t = TaskRecord::parse(&format!("goroutine {} [running]:", id)).unwrap();
            t.add_line(&format!("main.worker{}()", id));
            t
        }))
    }

    #[test]
    fn test_partition() {
        let left = dump(&[5, 1, 3, 9]);
        let right = dump(&[3, 4, 1, 2]);

        let result = diff(&left, &right);
        assert_eq!(result.left_only.ids(), vec![5, 9]);
        assert_eq!(result.common.ids(), vec![1, 3]);
        assert_eq!(result.right_only.ids(), vec![2, 4]);
    }

    #[test]
    fn test_common_holds_right_task() {
        let left = dump(&[1]);
        let mut right = TaskDump::new();
        let mut t = TaskRecord::parse("goroutine 1 [chan send]:").unwrap();
        t.add_line("main.producer()");
        right.add(t);

        let result = left.diff(&right);
        assert_eq!(result.common.get(1).unwrap().state(), "chan send");
    }

    #[test]
    fn test_symmetry() {
        let left = dump(&[1, 2, 3]);
        let right = dump(&[2, 3, 4, 5]);

        let lr = diff(&left, &right);
        let rl = diff(&right, &left);
        assert_eq!(lr.left_only.ids(), rl.right_only.ids());
        assert_eq!(lr.right_only.ids(), rl.left_only.ids());
        assert_eq!(lr.common.ids(), rl.common.ids());
    }

    #[test]
    fn test_empty_sides() {
        let result = diff(&TaskDump::new(), &dump(&[7]));
        assert!(result.left_only.is_empty());
        assert!(result.common.is_empty());
        assert_eq!(result.right_only.ids(), vec![7]);

        let result = diff(&TaskDump::new(), &TaskDump::new());
        assert!(result.right_only.is_empty());
    }

    #[test]
    fn test_shares_task_instances() {
        let left = dump(&[1, 2]);
        let right = dump(&[2]);
        let result = diff(&left, &right);

        let original = left.shared().next().unwrap();
        let shared = result.left_only.shared().next().unwrap();
        assert!(Arc::ptr_eq(original, shared));
    }
}
