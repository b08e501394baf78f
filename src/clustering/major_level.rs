use tracing::debug;

use crate::clustering::split::split_balanced;
use crate::clustering::strategy::PartitionStrategy;
use crate::clustering::types::{
    AcademicLevel, Cluster, ClusterCriteria, ClusteringOptions, Student,
};
use crate::clustering::util::{build_cluster, group_in_order};
use crate::TARGET_CLUSTERING;

/// Groups students by exact `(major, academic level)` pair
#[derive(Debug, Default, Clone, Copy)]
pub struct MajorLevelStrategy;

impl PartitionStrategy for MajorLevelStrategy {
    fn name(&self) -> &str {
        "major_level"
    }

    fn partition(&self, students: &[Student], options: &ClusteringOptions) -> Vec<Cluster> {
        cluster_by_major_and_level(students, options)
    }
}

fn base_name(major: &str, level: AcademicLevel) -> String {
    format!("{} {}s", major, level)
}

/// Partitions by `(major, level)`.
///
/// Oversized groups are split into GPA-balanced sub-groups named `"(Group N)"`, groups
/// within bounds become one cluster, and undersized groups produce nothing.
pub fn cluster_by_major_and_level(
    students: &[Student],
    options: &ClusteringOptions,
) -> Vec<Cluster> {
    let refs: Vec<&Student> = students.iter().collect();
    let groups = group_in_order(&refs, |s: &Student| (s.major.clone(), s.academic_level));

    let mut clusters = Vec::new();

    for ((major, level), members) in groups {
        let size = members.len();

        if size > options.max_cluster_size {
            let sub_groups = split_balanced(&members, options.max_cluster_size);
            let total = sub_groups.len();
            debug!(
                target: TARGET_CLUSTERING,
                "Splitting {} {} ({} students) into {} groups", major, level, size, total
            );

            for (i, sub_group) in sub_groups.iter().enumerate() {
                let group = i + 1;
                clusters.push(build_cluster(
                    format!("{} (Group {})", base_name(&major, level), group),
                    format!(
                        "{} students majoring in {} (group {} of {}, balanced by GPA)",
                        level, major, group, total
                    ),
                    sub_group,
                    ClusterCriteria {
                        major: Some(major.clone()),
                        academic_level: Some(level),
                        group: Some(group),
                        ..Default::default()
                    },
                ));
            }
        } else if size >= options.min_cluster_size {
            clusters.push(build_cluster(
                base_name(&major, level),
                format!("{} students majoring in {}", level, major),
                &members,
                ClusterCriteria {
                    major: Some(major.clone()),
                    academic_level: Some(level),
                    ..Default::default()
                },
            ));
        } else {
            debug!(
                target: TARGET_CLUSTERING,
                "Skipping {} {}: {} students is below the minimum of {}",
                major,
                level,
                size,
                options.min_cluster_size
            );
        }
    }

    clusters
}
