use std::collections::{BTreeMap, HashMap};

use crate::clustering::types::{ClusterCharacteristics, LearningStyle, Student};

/// Maximum number of interests reported in `common_interests`
pub const MAX_COMMON_INTERESTS: usize = 5;

const QUANTITATIVE_MAJORS: [&str; 6] = [
    "Finance",
    "Economics",
    "Mathematics",
    "Statistics",
    "Computer Science",
    "Engineering",
];

const CREATIVE_MAJORS: [&str; 4] = ["Marketing", "Art", "English", "Communications"];

const ANALYTICAL_KEYWORDS: [&str; 3] = ["analysis", "research", "data"];

/// Counts labels, returning `(label, count)` pairs in first-seen order
pub(crate) fn count_in_order<'a, I>(labels: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label, counts.len());
                counts.push((label, 1));
            }
        }
    }

    counts
}

/// Most frequent labels, highest count first. Equal counts keep first-seen order.
pub(crate) fn most_frequent<'a, I>(labels: I, limit: usize) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = count_in_order(labels);
    // sort_by is stable, which preserves first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(limit).map(|(label, _)| label).collect()
}

/// Computes the aggregate characteristics of a group of students.
///
/// Students without a usable GPA are left out of `average_gpa`, which is `0.0` when no
/// member has one. Ties in interest frequency and in the dominant major resolve to the
/// label encountered first in `students` order.
pub fn calculate_characteristics(students: &[&Student]) -> ClusterCharacteristics {
    let known_gpas: Vec<f64> = students.iter().filter_map(|s| s.known_gpa()).collect();
    let average_gpa = if known_gpas.is_empty() {
        0.0
    } else {
        known_gpas.iter().sum::<f64>() / known_gpas.len() as f64
    };

    let common_interests: Vec<String> = most_frequent(
        students
            .iter()
            .flat_map(|s| s.career_interests.iter().map(String::as_str)),
        MAX_COMMON_INTERESTS,
    )
    .into_iter()
    .map(str::to_string)
    .collect();

    let major_counts = count_in_order(students.iter().map(|s| s.major.as_str()));

    // Strictly greater keeps the earliest major on ties
    let dominant_major = major_counts
        .iter()
        .fold(None::<(&str, usize)>, |best, &(major, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((major, count)),
        })
        .map(|(major, _)| major.to_string());

    let major_distribution: BTreeMap<String, usize> = major_counts
        .iter()
        .map(|&(major, count)| (major.to_string(), count))
        .collect();

    let learning_style = determine_learning_style(students, &common_interests);

    ClusterCharacteristics {
        average_gpa,
        common_interests,
        major_distribution,
        dominant_major,
        learning_style,
    }
}

fn major_in(major: &str, set: &[&str]) -> bool {
    set.iter().any(|m| m.eq_ignore_ascii_case(major.trim()))
}

/// Derives the learning style from member majors and the common interests.
///
/// Rules are checked in priority order and the first match wins.
pub fn determine_learning_style(students: &[&Student], common_interests: &[String]) -> LearningStyle {
    let has_quantitative = students
        .iter()
        .any(|s| major_in(&s.major, &QUANTITATIVE_MAJORS));
    let has_creative = students
        .iter()
        .any(|s| major_in(&s.major, &CREATIVE_MAJORS));
    let has_analytical = common_interests.iter().any(|interest| {
        let interest = interest.to_lowercase();
        ANALYTICAL_KEYWORDS.iter().any(|k| interest.contains(k))
    });

    if has_quantitative && has_analytical {
        LearningStyle::Analytical
    } else if has_creative {
        LearningStyle::Creative
    } else if has_quantitative {
        LearningStyle::Quantitative
    } else if has_analytical {
        LearningStyle::ResearchOriented
    } else {
        LearningStyle::Practical
    }
}
