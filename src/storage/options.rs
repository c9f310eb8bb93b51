use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::address::MAX_PARTITION;
use crate::storage::metrics::StorageMetrics;
use crate::storage::remote::PartitionRouter;
use crate::storage::schema::Schema;
use crate::types::{GraphError, PartitionId, Result};

/// Bound of the per-kind queue of retired container shells.
pub const MAX_REUSE_QUEUE_SIZE: usize = 80;
/// Bound of the per-kind recency list.
pub const MAX_LRU_QUEUE_SIZE: usize = 200;
/// Pause between two reclamation passes of a worker.
pub const RECLAIM_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration options supplied when opening a [`super::PartialGraph`].
#[derive(Clone)]
pub struct StorageOptions {
    /// Directory holding the container and meta files.
    pub dir: PathBuf,
    /// Partition served by this process.
    pub partition: PartitionId,
    /// Pause between reclamation passes.
    pub reclaim_interval: Duration,
    /// Retired shells kept per kind.
    pub reuse_queue_limit: usize,
    /// Recently used containers kept pinned per kind.
    pub recency_limit: usize,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn StorageMetrics>>,
    /// Type system used to validate class ids and find incidence semantics.
    pub schema: Option<Arc<dyn Schema>>,
    /// Forwarding target for ids of other partitions.
    pub router: Option<Arc<dyn PartitionRouter>>,
}

impl StorageOptions {
    /// Options for a partial graph stored under `dir`, serving partition 0.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            partition: PartitionId(0),
            reclaim_interval: RECLAIM_INTERVAL,
            reuse_queue_limit: MAX_REUSE_QUEUE_SIZE,
            recency_limit: MAX_LRU_QUEUE_SIZE,
            metrics: None,
            schema: None,
            router: None,
        }
    }

    /// Sets the local partition id.
    pub fn partition(mut self, partition: PartitionId) -> Self {
        self.partition = partition;
        self
    }

    /// Sets the pause between reclamation passes.
    pub fn reclaim_interval(mut self, interval: Duration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    /// Sets how many retired shells each kind keeps.
    pub fn reuse_queue_limit(mut self, limit: usize) -> Self {
        self.reuse_queue_limit = limit;
        self
    }

    /// Sets how many recently used containers each kind keeps pinned.
    pub fn recency_limit(mut self, limit: usize) -> Self {
        self.recency_limit = limit;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn StorageMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the schema.
    pub fn schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the partition router.
    pub fn router(mut self, router: Arc<dyn PartitionRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.partition.0 > MAX_PARTITION {
            return Err(GraphError::Invalid("partition id exceeds 31 bits"));
        }
        if self.recency_limit == 0 {
            return Err(GraphError::Invalid("recency limit must be positive"));
        }
        if self.reclaim_interval.is_zero() {
            return Err(GraphError::Invalid("reclaim interval must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_constants() {
        let opts = StorageOptions::new("/tmp/unused");
        assert_eq!(opts.reuse_queue_limit, MAX_REUSE_QUEUE_SIZE);
        assert_eq!(opts.recency_limit, MAX_LRU_QUEUE_SIZE);
        assert_eq!(opts.reclaim_interval, RECLAIM_INTERVAL);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_oversized_partition() {
        let opts = StorageOptions::new("/tmp/unused").partition(PartitionId(MAX_PARTITION + 1));
        assert!(matches!(opts.validate(), Err(GraphError::Invalid(_))));
        let opts = StorageOptions::new("/tmp/unused").recency_limit(0);
        assert!(opts.validate().is_err());
    }
}
