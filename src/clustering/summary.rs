use crate::clustering::types::{Cluster, ClusteringSummary};

/// Builds the run summary for the final clusters of a roster of `total_students`
pub fn summarize(clusters: &[Cluster], total_students: usize) -> ClusteringSummary {
    let clustered: usize = clusters.iter().map(Cluster::size).sum();

    let average_cluster_size = if clusters.is_empty() {
        0.0
    } else {
        clustered as f64 / clusters.len() as f64
    };

    ClusteringSummary {
        total_clusters: clusters.len(),
        total_students,
        average_cluster_size,
        ungrouped_students: total_students.saturating_sub(clustered),
    }
}

/// Advisory for the end user when some students could not be placed
pub fn ungrouped_advisory(summary: &ClusteringSummary) -> Option<String> {
    match summary.ungrouped_students {
        0 => None,
        1 => Some("1 student could not be grouped".to_string()),
        n => Some(format!("{} students could not be grouped", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::characteristics::calculate_characteristics;
    use crate::clustering::types::ClusterCriteria;

    fn cluster_with(n: usize) -> Cluster {
        Cluster {
            name: String::new(),
            description: String::new(),
            characteristics: calculate_characteristics(&[]),
            student_ids: (0..n).map(|i| i.to_string()).collect(),
            criteria: ClusterCriteria::default(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = summarize(&[cluster_with(4), cluster_with(6)], 13);
        assert_eq!(summary.total_clusters, 2);
        assert_eq!(summary.total_students, 13);
        assert_eq!(summary.average_cluster_size, 5.0);
        assert_eq!(summary.ungrouped_students, 3);
        assert_eq!(
            ungrouped_advisory(&summary).as_deref(),
            Some("3 students could not be grouped")
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], 0);
        assert_eq!(summary, ClusteringSummary::default());
        assert_eq!(ungrouped_advisory(&summary), None);
    }
}
