use std::collections::HashSet;

use crate::clustering::{
    calculate_characteristics, cluster, AcademicLevel, ClusteringOptions, ClusteringResult,
    ClusteringStrategy, ClusteringSummary, GpaBand, Student,
};

const MAJORS: [&str; 5] = [
    "Computer Science",
    "Marketing",
    "Biology",
    "Finance",
    "History",
];

const INTERESTS: [&str; 6] = [
    "Data Analysis",
    "Software Engineering",
    "Brand Strategy",
    "Clinical Research",
    "Teaching",
    "Consulting",
];

/// Deterministic mixed roster; every 7th student has no GPA
fn mixed_roster(n: usize) -> Vec<Student> {
    (0..n)
        .map(|i| {
            let major = MAJORS[(i * 7 + i / 3) % MAJORS.len()];
            let level = AcademicLevel::ALL[(i * 3 + 1) % AcademicLevel::ALL.len()];
            let mut student = Student::new(&format!("stu-{:03}", i), major, level);
            if i % 7 != 0 {
                student.gpa = Some(((i * 37) % 41) as f64 / 10.0);
            }
            student.career_interests = (0..(i % 3) + 1)
                .map(|k| INTERESTS[(i + k * 4) % INTERESTS.len()].to_string())
                .collect();
            student
        })
        .collect()
}

fn same_pair_roster(n: usize, major: &str, level: AcademicLevel) -> Vec<Student> {
    (0..n)
        .map(|i| {
            Student::new(&format!("{}-{}", major, i), major, level)
                .with_gpa(1.8 + (i % 12) as f64 * 0.18)
                .with_interests(&["Software Engineering"])
        })
        .collect()
}

fn assert_partition(result: &ClusteringResult, students: &[Student]) {
    let roster: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let mut seen = HashSet::new();
    for cluster in &result.clusters {
        assert!(!cluster.student_ids.is_empty(), "empty cluster {}", cluster.name);
        for id in &cluster.student_ids {
            assert!(roster.contains(id.as_str()), "unknown student {}", id);
            assert!(seen.insert(id.clone()), "student {} in two clusters", id);
        }
    }
    assert_eq!(
        seen.len() + result.summary.ungrouped_students,
        result.summary.total_students
    );
    assert_eq!(result.summary.total_students, students.len());
    assert_eq!(result.summary.total_clusters, result.clusters.len());
}

#[test]
fn test_every_student_in_at_most_one_cluster() {
    let students = mixed_roster(120);
    for strategy in [
        ClusteringStrategy::MajorLevel,
        ClusteringStrategy::GpaInterests,
        ClusteringStrategy::Custom,
    ] {
        for (min, max) in [(1, 3), (2, 5), (3, 8), (5, 15), (1, 100)] {
            let options = ClusteringOptions::new(strategy, min, max);
            let result = cluster(&students, &options);
            assert_partition(&result, &students);
        }
    }
}

#[test]
fn test_cluster_sizes_stay_within_bounds() {
    let students = mixed_roster(150);
    for strategy in [ClusteringStrategy::MajorLevel, ClusteringStrategy::GpaInterests] {
        for (min, max) in [(1, 2), (2, 4), (3, 10), (4, 6), (5, 15)] {
            let options = ClusteringOptions::new(strategy, min, max);
            for c in cluster(&students, &options).clusters {
                assert!(
                    c.size() >= min && c.size() <= max,
                    "{} has {} students with bounds {}..={}",
                    c.name,
                    c.size(),
                    min,
                    max
                );
            }
        }
    }
}

#[test]
fn test_characteristics_match_membership() {
    let students = mixed_roster(80);
    let options = ClusteringOptions::new(ClusteringStrategy::GpaInterests, 2, 12);
    for c in cluster(&students, &options).clusters {
        let members: Vec<&Student> = c
            .student_ids
            .iter()
            .map(|id| students.iter().find(|s| &s.id == id).unwrap())
            .collect();
        assert_eq!(c.characteristics, calculate_characteristics(&members));
    }
}

#[test]
fn test_empty_roster() {
    for strategy in [
        ClusteringStrategy::MajorLevel,
        ClusteringStrategy::GpaInterests,
        ClusteringStrategy::Custom,
    ] {
        let result = cluster(&[], &ClusteringOptions::new(strategy, 1, 10));
        assert!(result.clusters.is_empty());
        assert_eq!(
            result.summary,
            ClusteringSummary {
                total_clusters: 0,
                total_students: 0,
                average_cluster_size: 0.0,
                ungrouped_students: 0,
            }
        );
    }
}

#[test]
fn test_runs_are_deterministic() {
    let students = mixed_roster(90);
    let options = ClusteringOptions::new(ClusteringStrategy::GpaInterests, 2, 9);
    assert_eq!(cluster(&students, &options), cluster(&students, &options));
}

#[test]
fn test_oversized_major_level_group_splits_in_two() {
    let students = same_pair_roster(20, "Computer Science", AcademicLevel::Junior);
    let options = ClusteringOptions::new(ClusteringStrategy::MajorLevel, 5, 15);
    let result = cluster(&students, &options);

    let names: Vec<&str> = result.clusters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Computer Science Juniors (Group 1)",
            "Computer Science Juniors (Group 2)"
        ]
    );
    assert_eq!(result.clusters.iter().map(|c| c.size()).sum::<usize>(), 20);
    assert!(result
        .clusters
        .iter()
        .all(|c| (5..=15).contains(&c.size())));
    assert_eq!(result.summary.ungrouped_students, 0);
    assert_eq!(result.summary.average_cluster_size, 10.0);
}

#[test]
fn test_undersized_pair_leaves_everyone_ungrouped() {
    let students = same_pair_roster(4, "Art", AcademicLevel::Sophomore);
    let options = ClusteringOptions::new(ClusteringStrategy::MajorLevel, 5, 15);
    let result = cluster(&students, &options);

    assert!(result.clusters.is_empty());
    assert_eq!(result.summary.ungrouped_students, 4);
    assert_eq!(result.summary.total_students, 4);
    assert_eq!(result.summary.average_cluster_size, 0.0);
}

fn banded_roster() -> Vec<Student> {
    vec![
        Student::new("hi-1", "Biology", AcademicLevel::Senior).with_gpa(3.9),
        Student::new("hi-2", "Biology", AcademicLevel::Senior).with_gpa(3.6),
        Student::new("risk-1", "Biology", AcademicLevel::Senior).with_gpa(2.2),
    ]
}

#[test]
fn test_gpa_bands_stay_separate_when_merge_would_overflow() {
    let students = banded_roster();
    let options = ClusteringOptions::new(ClusteringStrategy::GpaInterests, 1, 2);
    let result = cluster(&students, &options);

    assert_eq!(result.clusters.len(), 2);
    for c in &result.clusters {
        let band = c.criteria.gpa_band.expect("gpa band recorded");
        for id in &c.student_ids {
            let student = students.iter().find(|s| &s.id == id).unwrap();
            assert_eq!(GpaBand::for_gpa(student.gpa.unwrap()), Some(band));
        }
    }
    assert_eq!(result.clusters[0].criteria.gpa_band, Some(GpaBand::HighPerformers));
    assert_eq!(result.clusters[1].criteria.gpa_band, Some(GpaBand::AtRisk));
    assert_eq!(result.clusters[1].name, "Biology At-Risk - General (Group 2)");
}

#[test]
fn test_same_major_bands_merge_into_mixed_group() {
    let students = banded_roster();
    let options = ClusteringOptions::new(ClusteringStrategy::GpaInterests, 1, 10);
    let result = cluster(&students, &options);

    assert_eq!(result.clusters.len(), 1);
    let merged = &result.clusters[0];
    assert_eq!(merged.name, "Biology Mixed Group");
    assert_eq!(merged.student_ids, vec!["hi-1", "hi-2", "risk-1"]);

    let union: Vec<&Student> = students.iter().collect();
    assert_eq!(merged.characteristics, calculate_characteristics(&union));
    assert!((merged.characteristics.average_gpa - 3.2333).abs() < 1e-3);
}

#[test]
fn test_small_groups_rescued_only_by_existing_clusters() {
    // Finance Juniors fit alone; Finance Seniors (2) fall below the minimum of 3 and are
    // dropped before the merge pass, so they are not rescued.
    let mut students = same_pair_roster(4, "Finance", AcademicLevel::Junior);
    students.extend(same_pair_roster(2, "Finance", AcademicLevel::Senior).into_iter().map(
        |mut s| {
            s.id = format!("sr-{}", s.id);
            s
        },
    ));
    let options = ClusteringOptions::new(ClusteringStrategy::MajorLevel, 3, 10);
    let result = cluster(&students, &options);

    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].name, "Finance Juniors");
    assert_eq!(result.summary.ungrouped_students, 2);
}
