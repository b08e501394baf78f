use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::clustering::characteristics::calculate_characteristics;
use crate::clustering::split::split_balanced;
use crate::clustering::types::{Cluster, ClusteringOptions, Student};
use crate::TARGET_CLUSTERING;

/// Merge key used for clusters without a dominant major
pub const GENERAL_MERGE_KEY: &str = "general";

/// Post-processes raw clusters so they respect the size bounds.
///
/// 0. Each roster id is kept in the first cluster that lists it; repeats and ids
///    missing from the roster are removed, and clusters emptied that way are dropped.
/// 1. Clusters above `max_cluster_size` are split into GPA-balanced sub-groups.
/// 2. Clusters below `min_cluster_size` are dropped; their students become ungrouped.
/// 3. Clusters sharing a dominant major are merged into the first one seen for that
///    major, as long as the combined size stays within `max_cluster_size`. Those that
///    don't fit are kept apart and labelled `"(Group N)"`.
///
/// The merge step only looks at the dominant major, so it can recombine clusters a
/// strategy kept apart on purpose (different GPA bands, for instance).
pub fn optimize_clusters(
    clusters: Vec<Cluster>,
    all_students: &[Student],
    options: &ClusteringOptions,
) -> Vec<Cluster> {
    let lookup: HashMap<&str, &Student> =
        all_students.iter().map(|s| (s.id.as_str(), s)).collect();

    let sized: Vec<Cluster> = assign_once(clusters, &lookup)
        .into_iter()
        .flat_map(|cluster| split_oversized(cluster, &lookup, options.max_cluster_size))
        .filter(|cluster| {
            let keep = cluster.size() >= options.min_cluster_size;
            if !keep {
                debug!(
                    target: TARGET_CLUSTERING,
                    "Dropping cluster '{}': {} students is below the minimum of {}",
                    cluster.name,
                    cluster.size(),
                    options.min_cluster_size
                );
            }
            keep
        })
        .collect();

    sized
        .into_iter()
        .fold(MergeState::default(), |state, cluster| {
            state.absorb(cluster, &lookup, options.max_cluster_size)
        })
        .clusters
}

/// Keeps every roster id in at most one cluster, first listing wins
fn assign_once(clusters: Vec<Cluster>, lookup: &HashMap<&str, &Student>) -> Vec<Cluster> {
    let mut assigned: HashSet<String> = HashSet::new();

    clusters
        .into_iter()
        .filter_map(|mut cluster| {
            let listed = cluster.student_ids.len();
            cluster
                .student_ids
                .retain(|id| lookup.contains_key(id.as_str()) && assigned.insert(id.clone()));

            if cluster.student_ids.len() == listed {
                return Some(cluster);
            }

            debug!(
                target: TARGET_CLUSTERING,
                "Removed {} duplicate or unknown students from '{}'",
                listed - cluster.student_ids.len(),
                cluster.name
            );
            if cluster.student_ids.is_empty() {
                return None;
            }
            cluster.characteristics =
                calculate_characteristics(&members_of(&cluster.student_ids, lookup));
            Some(cluster)
        })
        .collect()
}

fn members_of<'a>(student_ids: &[String], lookup: &HashMap<&str, &'a Student>) -> Vec<&'a Student> {
    student_ids
        .iter()
        .filter_map(|id| lookup.get(id.as_str()).copied())
        .collect()
}

fn split_oversized(
    cluster: Cluster,
    lookup: &HashMap<&str, &Student>,
    max_size: usize,
) -> Vec<Cluster> {
    if cluster.size() <= max_size {
        return vec![cluster];
    }

    let members = members_of(&cluster.student_ids, lookup);
    let sub_groups = split_balanced(&members, max_size);
    debug!(
        target: TARGET_CLUSTERING,
        "Splitting oversized cluster '{}' ({} students) into {} groups",
        cluster.name,
        cluster.size(),
        sub_groups.len()
    );

    sub_groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let mut criteria = cluster.criteria.clone();
            criteria.group = Some(i + 1);
            Cluster {
                name: format!("{} (Group {})", cluster.name, i + 1),
                description: cluster.description.clone(),
                characteristics: calculate_characteristics(group),
                student_ids: group.iter().map(|s| s.id.clone()).collect(),
                criteria,
            }
        })
        .collect()
}

/// Removes a trailing `" (Group N)"` label so a new one can replace it
pub fn strip_group_suffix(name: &str) -> &str {
    if let Some(start) = name.rfind(" (Group ") {
        let tail = &name[start + " (Group ".len()..];
        if let Some(number) = tail.strip_suffix(')') {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                return &name[..start];
            }
        }
    }
    name
}

/// Accumulated output of the merge fold
#[derive(Default)]
struct MergeState {
    clusters: Vec<Cluster>,
    /// Merge key to the index of its accumulator in `clusters`
    accumulators: HashMap<String, usize>,
    /// Merge key to the number of clusters seen with it
    seen: HashMap<String, usize>,
}

impl MergeState {
    fn absorb(
        mut self,
        mut cluster: Cluster,
        lookup: &HashMap<&str, &Student>,
        max_size: usize,
    ) -> Self {
        let key = cluster
            .characteristics
            .dominant_major
            .clone()
            .unwrap_or_else(|| GENERAL_MERGE_KEY.to_string());

        let count = {
            let seen = self.seen.entry(key.clone()).or_insert(0);
            *seen += 1;
            *seen
        };

        let Some(index) = self.accumulators.get(&key).copied() else {
            self.accumulators.insert(key, self.clusters.len());
            self.clusters.push(cluster);
            return self;
        };

        if self.clusters[index].size() + cluster.size() <= max_size {
            let accumulator = &mut self.clusters[index];
            debug!(
                target: TARGET_CLUSTERING,
                "Merging '{}' into '{}'", cluster.name, accumulator.name
            );
            accumulator.student_ids.extend(cluster.student_ids);
            accumulator.name = format!("{} Mixed Group", key);
            accumulator.description =
                format!("Combined group of students whose dominant major is {}", key);
            accumulator.characteristics =
                calculate_characteristics(&members_of(&accumulator.student_ids, lookup));
        } else {
            cluster.name = format!("{} (Group {})", strip_group_suffix(&cluster.name), count);
            self.clusters.push(cluster);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::types::{AcademicLevel, ClusterCriteria, ClusteringStrategy};
    use crate::clustering::util::build_cluster;

    fn roster(prefix: &str, major: &str, n: usize) -> Vec<Student> {
        (0..n)
            .map(|i| {
                Student::new(&format!("{}{}", prefix, i), major, AcademicLevel::Junior)
                    .with_gpa(2.0 + (i % 5) as f64 * 0.4)
            })
            .collect()
    }

    fn cluster_of(name: &str, students: &[Student]) -> Cluster {
        let refs: Vec<&Student> = students.iter().collect();
        build_cluster(
            name.to_string(),
            String::new(),
            &refs,
            ClusterCriteria::default(),
        )
    }

    fn options(min: usize, max: usize) -> ClusteringOptions {
        ClusteringOptions::new(ClusteringStrategy::MajorLevel, min, max)
    }

    #[test]
    fn test_strip_group_suffix() {
        assert_eq!(strip_group_suffix("Art Juniors (Group 2)"), "Art Juniors");
        assert_eq!(strip_group_suffix("Art Juniors"), "Art Juniors");
        assert_eq!(strip_group_suffix("Art (Group x)"), "Art (Group x)");
        assert_eq!(strip_group_suffix("Art (Group 12) extra"), "Art (Group 12) extra");
    }

    #[test]
    fn test_undersized_clusters_are_dropped() {
        let small = roster("h", "History", 2);
        let big = roster("b", "Biology", 4);
        let mut all = small.clone();
        all.extend(big.clone());

        let out = optimize_clusters(
            vec![cluster_of("History", &small), cluster_of("Biology", &big)],
            &all,
            &options(3, 10),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Biology");
    }

    #[test]
    fn test_same_major_merges_when_it_fits() {
        let a = roster("a", "Finance", 3);
        let b = roster("b", "Finance", 4);
        let mut all = a.clone();
        all.extend(b.clone());

        let out = optimize_clusters(
            vec![cluster_of("Finance Juniors", &a), cluster_of("Finance Seniors", &b)],
            &all,
            &options(1, 10),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Finance Mixed Group");
        assert_eq!(out[0].size(), 7);

        let refs: Vec<&Student> = all.iter().collect();
        assert_eq!(out[0].characteristics, calculate_characteristics(&refs));
    }

    #[test]
    fn test_overflowing_merge_keeps_cluster_separate() {
        let a = roster("a", "Art", 6);
        let b = roster("b", "Art", 6);
        let c = roster("c", "Art", 3);
        let mut all = a.clone();
        all.extend(b.clone());
        all.extend(c.clone());

        let out = optimize_clusters(
            vec![
                cluster_of("Art Juniors (Group 1)", &a),
                cluster_of("Art Juniors (Group 2)", &b),
                cluster_of("Art Seniors", &c),
            ],
            &all,
            &options(1, 10),
        );

        // b does not fit beside a; c does
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Art Mixed Group");
        assert_eq!(out[0].size(), 9);
        assert_eq!(out[1].name, "Art Juniors (Group 2)");
        assert_eq!(out[1].size(), 6);
        assert!(out.iter().all(|c| c.size() <= 10));
    }

    #[test]
    fn test_oversized_input_is_split() {
        let students = roster("s", "Economics", 12);
        let out = optimize_clusters(
            vec![cluster_of("Economics Strong - Policy", &students)],
            &students,
            &options(1, 5),
        );
        // 12 -> 3 groups of 4/4/4; the first absorbs nothing else (4 + 4 > 5)
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.size() == 4));
        assert_eq!(out[0].name, "Economics Strong - Policy (Group 1)");
        assert_eq!(out[1].name, "Economics Strong - Policy (Group 2)");
        assert_eq!(out[2].name, "Economics Strong - Policy (Group 3)");
        assert_eq!(out[2].criteria.group, Some(3));
    }

    #[test]
    fn test_repeated_and_unknown_ids_are_removed() {
        let students = roster("s", "Physics", 4);
        let first = cluster_of("First", &students[..3]);
        let mut second = cluster_of("Second", &students);
        second.student_ids.push("ghost".to_string());
        let stale = second.characteristics.clone();

        let out = optimize_clusters(vec![first, second], &students, &options(1, 10));

        // First keeps s0..s2; Second is left with s3 and merges into First
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].student_ids, vec!["s0", "s1", "s2", "s3"]);

        let out = optimize_clusters(
            vec![
                cluster_of("First", &students[..3]),
                cluster_of("Second", &students),
                cluster_of("Third", &students[..2]),
            ],
            &students,
            &options(1, 3),
        );
        let ids: Vec<&String> = out.iter().flat_map(|c| &c.student_ids).collect();
        let unique: HashSet<&String> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(unique.len(), 4);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].student_ids, vec!["s3"]);
        assert_ne!(out[1].characteristics, stale);
        assert_eq!(
            out[1].characteristics,
            calculate_characteristics(&[&students[3]])
        );
    }

    #[test]
    fn test_clusters_without_major_share_general_key() {
        let empty = Cluster {
            name: "Empty".to_string(),
            description: String::new(),
            characteristics: calculate_characteristics(&[]),
            student_ids: Vec::new(),
            criteria: ClusterCriteria::default(),
        };
        let out = optimize_clusters(vec![empty.clone(), empty], &[], &options(0, 10));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "general Mixed Group");
    }
}
