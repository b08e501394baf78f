use crate::clustering::types::{Cluster, ClusteringOptions, Student};

/// A partitioning pass that turns a roster into raw clusters.
///
/// Implementations only partition. Dropping and merging by size happens afterwards in
/// [`optimize_clusters`](crate::clustering::optimize::optimize_clusters), whichever
/// strategy ran. A custom strategy can read `options.custom_criteria`.
pub trait PartitionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn partition(&self, students: &[Student], options: &ClusteringOptions) -> Vec<Cluster>;
}
