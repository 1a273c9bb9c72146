use crate::domain::models::Item;
use std::collections::HashMap;

/// Stored ids that no longer resolve are dropped. Items the stored order does
/// not mention follow in their canonical order. The result is always a
/// permutation of `canonical`, even when two sources share an id.
pub fn project(canonical: &[Item], stored_order: &[String]) -> Vec<Item> {
    let mut by_id: HashMap<&str, Vec<usize>> = HashMap::with_capacity(canonical.len());
    for (index, item) in canonical.iter().enumerate() {
        by_id.entry(item.id.as_str()).or_default().push(index);
    }

    let mut placed = vec![false; canonical.len()];
    let mut projected = Vec::with_capacity(canonical.len());

    for id in stored_order {
        let Some(indices) = by_id.get(id.as_str()) else {
            continue;
        };
        for &index in indices {
            if !placed[index] {
                placed[index] = true;
                projected.push(canonical[index].clone());
            }
        }
    }

    for (index, item) in canonical.iter().enumerate() {
        if !placed[index] {
            projected.push(item.clone());
        }
    }
    projected
}

/// `displayed` must be the ids of the sequence currently shown, so gesture
/// indices line up with stored positions.
pub fn reorder(displayed: &[String], from: usize, to: usize) -> Result<Vec<String>, String> {
    if from >= displayed.len() || to >= displayed.len() {
        return Err(format!(
            "reorder indices out of range: from={from} to={to} len={}",
            displayed.len()
        ));
    }
    let mut next = displayed.to_vec();
    let moved = next.remove(from);
    next.insert(to, moved);
    Ok(next)
}

pub fn item_ids(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

pub fn decode_order(raw: Option<&[u8]>) -> Vec<String> {
    let Some(raw) = raw.filter(|bytes| !bytes.is_empty()) else {
        return Vec::new();
    };
    serde_json::from_slice(raw).unwrap_or_else(|error| {
        log::warn!("manual order is malformed, falling back to canonical order: {error}");
        Vec::new()
    })
}

pub fn encode_order(ids: &[String]) -> Vec<u8> {
    serde_json::to_vec(ids).unwrap_or_else(|_| b"[]".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| Item::task(*id, id.to_uppercase(), "list", None))
            .collect()
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn projected_ids(projected: &[Item]) -> Vec<&str> {
        projected.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn stored_order_first_then_newcomers() {
        let canonical = items(&["x", "y", "z"]);
        let projected = project(&canonical, &strings(&["z", "x"]));
        assert_eq!(projected_ids(&projected), vec!["z", "x", "y"]);
    }

    #[test]
    fn stale_and_duplicate_ids_are_ignored() {
        let canonical = items(&["a", "b"]);
        let projected = project(&canonical, &strings(&["gone", "b", "b", "a"]));
        assert_eq!(projected_ids(&projected), vec!["b", "a"]);
    }

    #[test]
    fn shared_ids_across_sources_are_all_kept() {
        let canonical = vec![
            Item::task("dup", "Work copy", "work", None),
            Item::task("solo", "Solo", "work", None),
            Item::task("dup", "Home copy", "home", None),
        ];
        let projected = project(&canonical, &strings(&["solo", "dup"]));

        let placed: Vec<(&str, &str)> = projected
            .iter()
            .map(|item| (item.id.as_str(), item.source_id.as_str()))
            .collect();
        assert_eq!(placed, vec![("solo", "work"), ("dup", "work"), ("dup", "home")]);
    }

    #[test]
    fn empty_stored_order_is_canonical() {
        let canonical = items(&["a", "b", "c"]);
        assert_eq!(project(&canonical, &[]), canonical);
    }

    #[test]
    fn reorder_moves_to_final_index() {
        let displayed = strings(&["a", "b", "c", "d"]);
        assert_eq!(reorder(&displayed, 0, 2).expect("valid move"), strings(&["b", "c", "a", "d"]));
        assert_eq!(reorder(&displayed, 3, 0).expect("valid move"), strings(&["d", "a", "b", "c"]));
        assert!(reorder(&displayed, 4, 0).is_err());
        assert!(reorder(&displayed, 0, 4).is_err());
    }

    #[test]
    fn malformed_order_decodes_to_empty() {
        assert!(decode_order(Some(b"{not json")).is_empty());
        assert!(decode_order(None).is_empty());
        let ids = strings(&["a", "b"]);
        assert_eq!(decode_order(Some(&encode_order(&ids))), ids);
    }

    fn canonical_and_order() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
        (
            proptest::collection::hash_set("[a-p]", 0..6),
            proptest::collection::vec("[a-t]", 0..10),
        )
            .prop_map(|(canonical, stored)| (canonical.into_iter().collect(), stored))
    }

    // Property: projection is a permutation of the canonical input
    proptest! {
        #[test]
        fn property_project_is_permutation((canonical_ids, stored) in canonical_and_order()) {
            let canonical: Vec<Item> = canonical_ids
                .iter()
                .map(|id| Item::task(id.clone(), "t", "list", None))
                .collect();
            let projected = project(&canonical, &stored);

            let mut expected = canonical_ids.clone();
            let mut actual = item_ids(&projected);
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);

            // newcomers keep their canonical relative order at the tail
            let tail: Vec<String> = item_ids(&projected)
                .into_iter()
                .filter(|id| !stored.contains(id))
                .collect();
            let canonical_tail: Vec<String> = canonical_ids
                .iter()
                .filter(|id| !stored.contains(id))
                .cloned()
                .collect();
            prop_assert_eq!(tail, canonical_tail);
        }
    }

    // Property: repeated ids still project to a permutation
    proptest! {
        #[test]
        fn property_project_keeps_repeated_ids(
            canonical_ids in proptest::collection::vec("[a-d]", 0..8),
            stored in proptest::collection::vec("[a-f]", 0..6)
        ) {
            let canonical: Vec<Item> = canonical_ids
                .iter()
                .enumerate()
                .map(|(index, id)| Item::task(id.clone(), index.to_string(), "list", None))
                .collect();
            let projected = project(&canonical, &stored);

            let mut expected: Vec<String> = canonical.iter().map(|item| item.title.clone()).collect();
            let mut actual: Vec<String> = projected.iter().map(|item| item.title.clone()).collect();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }
    }

    // Property: after a reorder the moved item sits at the target index
    proptest! {
        #[test]
        fn property_reorder_round_trip(
            (canonical_ids, stored) in canonical_and_order(),
            from_seed in any::<usize>(),
            to_seed in any::<usize>()
        ) {
            prop_assume!(canonical_ids.len() >= 2);
            let canonical: Vec<Item> = canonical_ids
                .iter()
                .map(|id| Item::task(id.clone(), "t", "list", None))
                .collect();
            let displayed = item_ids(&project(&canonical, &stored));
            let from = from_seed % displayed.len();
            let to = to_seed % displayed.len();
            prop_assume!(from != to);

            let next_order = reorder(&displayed, from, to).expect("indices in range");
            let reprojected = project(&canonical, &next_order);
            prop_assert_eq!(&reprojected[to].id, &displayed[from]);
        }
    }
}
