/*
    Representation tests

    Tests covering:
    1. First add picks indexed iff the split threshold is positive
    2. Existing groups keep their representation under any threshold
    3. Same logical member set, same results in both representations
    4. Both representations present: one is ignored, never merged
    5. Indexed lists stay balanced past the split threshold
    6. Ids that look like store bookkeeping names work in both representations
*/

use super::manager_over;
use crate::core_members::provider::provider_for;
use crate::core_members::reference::weak_reference;
use crate::core_members::types::{N_MEMBERS, P_MEMBERS};
use crate::core_members::{Authorizable, Representation};
use crate::core_sequence::BTreeSequence;
use crate::core_store::{MemoryNodeStore, NodeStore, PropertyValue};
use std::collections::HashSet;
use std::sync::Arc;

fn ids(set: &HashSet<Authorizable>) -> HashSet<String> {
    set.iter().map(|a| a.id().to_string()).collect()
}

#[test]
fn test_threshold_boundary_on_first_add() {
    for (threshold, indexed) in [(0, false), (2, true), (10, true)] {
        let store = Arc::new(MemoryNodeStore::new("default"));
        let mgr = manager_over(store.clone(), threshold);
        let g = mgr.create_group("g", None).unwrap();
        let u = mgr.create_user("u", None).unwrap();
        g.add_member(&u).unwrap();

        let node = g.authorizable().node();
        assert_eq!(store.has_child(node, N_MEMBERS).unwrap(), indexed, "threshold {threshold}");
        assert_eq!(store.has_property(node, P_MEMBERS).unwrap(), !indexed, "threshold {threshold}");
    }
}

#[test]
fn test_existing_group_keeps_representation() {
    let store = Arc::new(MemoryNodeStore::new("default"));

    let flat_mgr = manager_over(store.clone(), 0);
    let flat = flat_mgr.create_group("flat", None).unwrap();
    let u1 = flat_mgr.create_user("u1", None).unwrap();
    flat.add_member(&u1).unwrap();

    let indexed_mgr = manager_over(store.clone(), 4);
    let indexed = indexed_mgr.create_group("indexed", None).unwrap();
    indexed.add_member(&u1).unwrap();

    // swap configurations and keep adding
    let u2 = flat_mgr.create_user("u2", None).unwrap();
    let flat = indexed_mgr.get_group("flat").unwrap().unwrap();
    let indexed = flat_mgr.get_group("indexed").unwrap().unwrap();
    flat.add_member(&u2).unwrap();
    indexed.add_member(&u2).unwrap();

    assert!(store.has_property(flat.authorizable().node(), P_MEMBERS).unwrap());
    assert!(!store.has_child(flat.authorizable().node(), N_MEMBERS).unwrap());
    assert!(store.has_child(indexed.authorizable().node(), N_MEMBERS).unwrap());
    assert!(!store.has_property(indexed.authorizable().node(), P_MEMBERS).unwrap());

    assert_eq!(ids(&flat.members().unwrap()).len(), 2);
    assert_eq!(ids(&indexed.members().unwrap()).len(), 2);
}

#[test]
fn test_results_independent_of_representation() {
    let mut results = Vec::new();
    for threshold in [0, 3] {
        let mgr = manager_over(Arc::new(MemoryNodeStore::new("default")), threshold);
        let top = mgr.create_group("top", None).unwrap();
        let sub = mgr.create_group("sub", None).unwrap();
        top.add_member(sub.authorizable()).unwrap();
        for i in 0..20 {
            let u = mgr.create_user(&format!("user{i:02}"), None).unwrap();
            if i % 2 == 0 {
                top.add_member(&u).unwrap();
            } else {
                sub.add_member(&u).unwrap();
            }
        }
        results.push((ids(&top.declared_members().unwrap()), ids(&top.members().unwrap())));
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].0.len(), 11);
    assert_eq!(results[0].1.len(), 21);
}

#[test]
fn test_conflicting_representations_resolve_to_one() {
    for (threshold, expected) in [(0, Representation::Flat), (4, Representation::Indexed)] {
        let store = Arc::new(MemoryNodeStore::new("default"));
        let mgr = manager_over(store.clone(), 4);
        let g = mgr.create_group("g", None).unwrap();
        let in_index = mgr.create_user("in-index", None).unwrap();
        let in_property = mgr.create_user("in-property", None).unwrap();
        g.add_member(&in_index).unwrap();

        // a flat list next to the index
        store
            .set_property(
                g.authorizable().node(),
                P_MEMBERS,
                PropertyValue::Multiple(vec![weak_reference(in_property.node())]),
            )
            .unwrap();

        let mgr = manager_over(store.clone(), threshold);
        let g = mgr.get_group("g").unwrap().unwrap();
        let provider = provider_for(mgr.context(), g.authorizable()).unwrap();
        assert_eq!(provider.representation(), expected);

        let members = ids(&g.members().unwrap());
        let expected_id = match expected {
            Representation::Flat => "in-property",
            Representation::Indexed => "in-index",
        };
        assert_eq!(members, HashSet::from([expected_id.to_string()]));
    }
}

#[test]
fn test_indexed_list_splits_and_shrinks() {
    let store = Arc::new(MemoryNodeStore::new("default"));
    let mgr = manager_over(store.clone(), 4);
    let g = mgr.create_group("g", None).unwrap();
    let users: Vec<_> = (0..40)
        .map(|i| mgr.create_user(&format!("member-{i:03}"), None).unwrap())
        .collect();
    for u in &users {
        assert!(g.add_member(u).unwrap());
    }

    let container = store.child(g.authorizable().node(), N_MEMBERS).unwrap().unwrap();
    let sequence = BTreeSequence::new(store.as_ref(), container, 2, 4)
        .unwrap()
        .ignoring_bookkeeping();
    assert_eq!(sequence.len().unwrap(), 40);
    assert!(sequence.depth().unwrap() > 1);
    assert!(store.children(sequence.root()).unwrap().len() <= 4);

    for u in &users {
        assert!(g.remove_member(u).unwrap());
    }
    assert!(!store.has_child(g.authorizable().node(), N_MEMBERS).unwrap());
}

#[test]
fn test_bookkeeping_like_ids_are_ordinary_members() {
    for threshold in [0, 4] {
        let store = Arc::new(MemoryNodeStore::new("default"));
        let mgr = manager_over(store.clone(), threshold);
        let g = mgr.create_group("g", None).unwrap();
        let created = mgr.create_user("created", None).unwrap();
        let created_by = mgr.create_group("createdBy", None).unwrap();

        assert!(g.add_member(&created).unwrap(), "threshold {threshold}");
        assert!(g.add_member(created_by.authorizable()).unwrap(), "threshold {threshold}");
        assert!(!g.add_member(&created).unwrap(), "threshold {threshold}");

        let expected: HashSet<String> = ["created", "createdBy"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids(&g.declared_members().unwrap()), expected, "threshold {threshold}");
        let holders: Vec<String> = mgr
            .member_of(&created, false)
            .unwrap()
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(holders, ["g"], "threshold {threshold}");

        assert!(g.remove_member(&created).unwrap(), "threshold {threshold}");
        assert!(g.remove_member(created_by.authorizable()).unwrap(), "threshold {threshold}");
        assert!(g.declared_members().unwrap().is_empty(), "threshold {threshold}");
        assert!(!store.has_child(g.authorizable().node(), N_MEMBERS).unwrap());
    }
}
