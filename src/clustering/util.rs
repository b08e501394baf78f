use std::collections::HashMap;
use std::hash::Hash;

use crate::clustering::characteristics::calculate_characteristics;
use crate::clustering::types::{Cluster, ClusterCriteria, Student};

/// Groups items by key, keeping groups (and members within them) in first-seen order
pub fn group_in_order<'a, T, K, F>(items: &[&'a T], key: F) -> Vec<(K, Vec<&'a T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();

    for &item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}

/// Builds a cluster from its members, computing characteristics from them
pub fn build_cluster(
    name: String,
    description: String,
    members: &[&Student],
    criteria: ClusterCriteria,
) -> Cluster {
    Cluster {
        name,
        description,
        characteristics: calculate_characteristics(members),
        student_ids: members.iter().map(|s| s.id.clone()).collect(),
        criteria,
    }
}
