//! Rule-based student clustering.
//!
//! A run partitions a roster with one strategy, then enforces the size bounds:
//!
//! ```text
//! roster -> strategy (major_level | gpa_interests | custom) -> optimize -> summary
//! ```

pub mod characteristics;
pub mod engine;
pub mod gpa_interests;
pub mod major_level;
pub mod optimize;
pub mod split;
pub mod strategy;
pub mod summary;
#[cfg(test)]
mod tests;
pub mod types;
pub mod util;

pub use types::*;

pub use characteristics::calculate_characteristics;
pub use engine::{cluster, ClusteringEngine};
pub use gpa_interests::GpaInterestsStrategy;
pub use major_level::MajorLevelStrategy;
pub use optimize::optimize_clusters;
pub use strategy::PartitionStrategy;
pub use summary::{summarize, ungrouped_advisory};
