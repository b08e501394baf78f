use tracing::debug;

use crate::clustering::characteristics::most_frequent;
use crate::clustering::strategy::PartitionStrategy;
use crate::clustering::types::{Cluster, ClusterCriteria, ClusteringOptions, GpaBand, Student};
use crate::clustering::util::{build_cluster, group_in_order};
use crate::TARGET_CLUSTERING;

/// Number of leading interests each GPA band is subdivided by
pub const TOP_INTERESTS_PER_BAND: usize = 3;

/// Groups students by major, then GPA band, then shared career interest
#[derive(Debug, Default, Clone, Copy)]
pub struct GpaInterestsStrategy;

impl PartitionStrategy for GpaInterestsStrategy {
    fn name(&self) -> &str {
        "gpa_interests"
    }

    fn partition(&self, students: &[Student], options: &ClusteringOptions) -> Vec<Cluster> {
        cluster_by_gpa_and_interests(students, options)
    }
}

/// Partitions each major into GPA bands and each band by its top interests.
///
/// A major with fewer than `min_cluster_size` students is skipped outright. Students
/// without a usable GPA never land in a band. `gpa_weight` and `interest_weight` are not
/// consulted.
pub fn cluster_by_gpa_and_interests(
    students: &[Student],
    options: &ClusteringOptions,
) -> Vec<Cluster> {
    let refs: Vec<&Student> = students.iter().collect();
    let cohorts = group_in_order(&refs, |s: &Student| s.major.clone());

    let mut clusters = Vec::new();

    for (major, cohort) in cohorts {
        if cohort.len() < options.min_cluster_size {
            debug!(
                target: TARGET_CLUSTERING,
                "Skipping major {}: {} students is below the minimum of {}",
                major,
                cohort.len(),
                options.min_cluster_size
            );
            continue;
        }

        for band in GpaBand::ALL {
            let members: Vec<&Student> = cohort
                .iter()
                .copied()
                .filter(|s| s.known_gpa().and_then(GpaBand::for_gpa) == Some(band))
                .collect();

            if members.is_empty() || members.len() < options.min_cluster_size {
                continue;
            }

            for (interest, group) in split_by_interests(&members) {
                if group.len() < options.min_cluster_size {
                    debug!(
                        target: TARGET_CLUSTERING,
                        "Discarding {} {} / {}: {} students",
                        major,
                        band,
                        interest.unwrap_or("General"),
                        group.len()
                    );
                    continue;
                }

                let (name, description) = match interest {
                    Some(interest) => (
                        format!("{} {} - {}", major, band, interest),
                        format!(
                            "{} ({} GPA) {} students interested in {}",
                            band,
                            band.range_label(),
                            major,
                            interest
                        ),
                    ),
                    None => (
                        format!("{} {} - General", major, band),
                        format!("{} ({} GPA) {} students", band, band.range_label(), major),
                    ),
                };

                clusters.push(build_cluster(
                    name,
                    description,
                    &group,
                    ClusterCriteria {
                        major: Some(major.clone()),
                        gpa_band: Some(band),
                        interest: interest.map(str::to_string),
                        ..Default::default()
                    },
                ));
            }
        }
    }

    clusters
}

/// Splits a band by its most frequent interests.
///
/// Each student joins the highest-ranked top interest they list. Students matching none
/// are folded into the largest sub-group, or form a single `None` ("General") group when
/// no sub-group exists.
fn split_by_interests<'a>(members: &[&'a Student]) -> Vec<(Option<&'a str>, Vec<&'a Student>)> {
    let top = most_frequent(
        members
            .iter()
            .copied()
            .flat_map(|s: &'a Student| s.career_interests.iter().map(String::as_str)),
        TOP_INTERESTS_PER_BAND,
    );

    let mut groups: Vec<(&'a str, Vec<&'a Student>)> = top.iter().map(|&i| (i, Vec::new())).collect();
    let mut unmatched: Vec<&'a Student> = Vec::new();

    for &student in members {
        let rank = top
            .iter()
            .position(|t| student.career_interests.iter().any(|i| i == t));
        match rank {
            Some(rank) => groups[rank].1.push(student),
            None => unmatched.push(student),
        }
    }

    groups.retain(|(_, g)| !g.is_empty());

    if groups.is_empty() {
        return vec![(None, unmatched)];
    }

    if !unmatched.is_empty() {
        let largest = groups
            .iter()
            .enumerate()
            .fold(0, |best, (i, (_, g))| {
                if g.len() > groups[best].1.len() {
                    i
                } else {
                    best
                }
            });
        groups[largest].1.extend(unmatched);
    }

    groups
        .into_iter()
        .map(|(interest, group)| (Some(interest), group))
        .collect()
}
