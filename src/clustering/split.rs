use std::cmp::Ordering;

use crate::clustering::types::Student;

/// Number of sub-groups needed so none exceeds `max_size`
pub fn sub_group_count(size: usize, max_size: usize) -> usize {
    let max_size = max_size.max(1);
    size.div_ceil(max_size)
}

/// Orders students by GPA, highest first. Unknown GPAs go last, keeping input order.
pub fn sort_by_gpa_desc(students: &mut [&Student]) {
    students.sort_by(|a, b| match (a.known_gpa(), b.known_gpa()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Splits an oversized group into `ceil(len / max_size)` GPA-balanced sub-groups.
///
/// Students are sorted by GPA and dealt round-robin, so each sub-group gets a spread of
/// GPAs rather than a contiguous band.
pub fn split_balanced<'a>(students: &[&'a Student], max_size: usize) -> Vec<Vec<&'a Student>> {
    let groups = sub_group_count(students.len(), max_size);
    if groups <= 1 {
        return vec![students.to_vec()];
    }

    let mut sorted = students.to_vec();
    sort_by_gpa_desc(&mut sorted);

    let mut buckets: Vec<Vec<&Student>> = vec![Vec::new(); groups];
    for (i, student) in sorted.into_iter().enumerate() {
        buckets[i % groups].push(student);
    }

    buckets
}
