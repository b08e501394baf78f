use tracing::{debug, info};

use crate::clustering::gpa_interests::GpaInterestsStrategy;
use crate::clustering::major_level::MajorLevelStrategy;
use crate::clustering::optimize::optimize_clusters;
use crate::clustering::strategy::PartitionStrategy;
use crate::clustering::summary::summarize;
use crate::clustering::types::{ClusteringOptions, ClusteringResult, ClusteringStrategy, Student};
use crate::TARGET_CLUSTERING;

/// Runs a clustering pass with the built-in strategies.
///
/// `custom` falls through to `major_level` because nothing is plugged in; use
/// [`ClusteringEngine::with_custom_strategy`] to supply one.
pub fn cluster(students: &[Student], options: &ClusteringOptions) -> ClusteringResult {
    ClusteringEngine::new().cluster(students, options)
}

/// Clustering entry point, optionally carrying a pluggable `custom` strategy.
///
/// Each call is independent and side-effect free, so one engine can serve concurrent
/// callers.
#[derive(Default)]
pub struct ClusteringEngine {
    custom: Option<Box<dyn PartitionStrategy>>,
}

impl ClusteringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_strategy(mut self, strategy: Box<dyn PartitionStrategy>) -> Self {
        self.custom = Some(strategy);
        self
    }

    fn strategy_for(&self, strategy: ClusteringStrategy) -> &dyn PartitionStrategy {
        match strategy {
            ClusteringStrategy::MajorLevel => &MajorLevelStrategy,
            ClusteringStrategy::GpaInterests => &GpaInterestsStrategy,
            ClusteringStrategy::Custom => match &self.custom {
                Some(custom) => custom.as_ref(),
                None => &MajorLevelStrategy,
            },
        }
    }

    /// Partitions `students`, enforces the size bounds and summarises the run.
    ///
    /// An empty roster yields an empty result with a zeroed summary.
    pub fn cluster(&self, students: &[Student], options: &ClusteringOptions) -> ClusteringResult {
        if students.is_empty() {
            return ClusteringResult::default();
        }

        let strategy = self.strategy_for(options.strategy);
        let raw = strategy.partition(students, options);
        debug!(
            target: TARGET_CLUSTERING,
            "Strategy {} produced {} raw clusters from {} students",
            strategy.name(),
            raw.len(),
            students.len()
        );

        let clusters = optimize_clusters(raw, students, options);
        let summary = summarize(&clusters, students.len());

        info!(
            target: TARGET_CLUSTERING,
            "Clustered {} students into {} clusters using {} (average size {:.1}, {} ungrouped)",
            summary.total_students,
            summary.total_clusters,
            strategy.name(),
            summary.average_cluster_size,
            summary.ungrouped_students
        );

        ClusteringResult { clusters, summary }
    }
}
