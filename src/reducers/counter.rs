use crate::model::{OpType, Operation};
use crate::walker::Reducer;
use std::collections::BTreeMap;

/// Counts matching operations by type.
#[derive(Debug, Default, Clone)]
pub struct OperationCounter {
    counts: BTreeMap<OpType, usize>,
    total: usize,
}

impl OperationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, op_type: OpType) -> usize {
        self.counts.get(&op_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[async_trait::async_trait]
impl Reducer for OperationCounter {
    async fn process(&mut self, op: &Operation) {
        if let Some(op_type) = op.op_type() {
            *self.counts.entry(op_type).or_default() += 1;
        }
        self.total += 1;
    }

    async fn done(&mut self) {
        debug_assert_eq!(
            self.counts.values().sum::<usize>(),
            self.total,
            "operation type counts must sum to the total"
        );
    }
}
