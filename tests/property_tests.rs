//! Property-based tests for the bitemporal graph store.
//!
//! Uses proptest to check invariants 1-4 and 9 against arbitrary sequences
//! of create/add/delete-observation/delete-entity operations:
//! - at-most-one-current (invariant 1)
//! - closed-history (invariant 2)
//! - observation-set, no duplicates (invariant 3)
//! - relation-endpoints-current (invariant 4)
//! - cascade-delete (invariant 9)

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chronograph::graph::{BitemporalGraphStore, EntityInput, ObservationDelta, RelationInput};
use chronograph::storage::graph::InMemoryGraphBackend;
use proptest::prelude::*;

fn store() -> BitemporalGraphStore<InMemoryGraphBackend> {
    BitemporalGraphStore::new(InMemoryGraphBackend::new())
}

#[derive(Debug, Clone)]
enum ObsOp {
    Add(Vec<String>),
    Delete(Vec<String>),
}

fn obs_op() -> impl Strategy<Value = ObsOp> {
    prop_oneof![
        prop::collection::vec("[a-z]{1,8}", 0..4).prop_map(ObsOp::Add),
        prop::collection::vec("[a-z]{1,8}", 0..4).prop_map(ObsOp::Delete),
    ]
}

proptest! {
    /// Invariant 1: after any sequence of observation edits, exactly one
    /// history row for the name has `valid_time.end == None`.
    #[test]
    fn prop_at_most_one_current(ops in prop::collection::vec(obs_op(), 0..20)) {
        let store = store();
        store
            .create_entities(vec![EntityInput { name: "n".into(), entity_type: "t".into(), observations: vec![] }])
            .expect("create");

        for op in ops {
            match op {
                ObsOp::Add(observations) => {
                    store.add_observations(vec![ObservationDelta { name: "n".into(), observations }]).expect("add");
                }
                ObsOp::Delete(observations) => {
                    store.delete_observations(vec![ObservationDelta { name: "n".into(), observations }]).expect("delete");
                }
            }
        }

        let history = store.get_entity_history("n").expect("history");
        let current = history.iter().filter(|e| e.valid_time.end.is_none()).count();
        prop_assert_eq!(current, 1);
    }

    /// Invariant 2: consecutive versions of the same name, ordered by
    /// `validFrom`, close exactly where the next one opens.
    #[test]
    fn prop_closed_history(ops in prop::collection::vec(obs_op(), 0..20)) {
        let store = store();
        store
            .create_entities(vec![EntityInput { name: "n".into(), entity_type: "t".into(), observations: vec![] }])
            .expect("create");

        for op in ops {
            match op {
                ObsOp::Add(observations) => {
                    store.add_observations(vec![ObservationDelta { name: "n".into(), observations }]).expect("add");
                }
                ObsOp::Delete(observations) => {
                    store.delete_observations(vec![ObservationDelta { name: "n".into(), observations }]).expect("delete");
                }
            }
        }

        let mut history = store.get_entity_history("n").expect("history");
        history.sort_by_key(|e| e.valid_time.start.unwrap_or(i64::MIN));
        for pair in history.windows(2) {
            prop_assert_eq!(pair[0].valid_time.end, pair[1].valid_time.start);
        }
    }

    /// Invariant 3: a current entity's observations never contain
    /// duplicates, even when the same observation is added repeatedly.
    #[test]
    fn prop_observation_set_dedup(adds in prop::collection::vec(prop::collection::vec("[a-z]{1,6}", 0..5), 0..15)) {
        let store = store();
        store
            .create_entities(vec![EntityInput { name: "n".into(), entity_type: "t".into(), observations: vec![] }])
            .expect("create");

        for observations in adds {
            store.add_observations(vec![ObservationDelta { name: "n".into(), observations }]).expect("add");
        }

        let current = store.get_entity("n").expect("get").expect("current row");
        let unique: std::collections::HashSet<_> = current.observations.iter().collect();
        prop_assert_eq!(unique.len(), current.observations.len());
    }

    /// Invariant 4: a relation can only be created once both of its
    /// endpoints have current entity rows.
    #[test]
    fn prop_relation_requires_current_endpoints(create_to in any::<bool>()) {
        let store = store();
        store
            .create_entities(vec![EntityInput { name: "a".into(), entity_type: "t".into(), observations: vec![] }])
            .expect("create a");
        if create_to {
            store
                .create_entities(vec![EntityInput { name: "b".into(), entity_type: "t".into(), observations: vec![] }])
                .expect("create b");
        }

        let created = store
            .create_relations(vec![RelationInput {
                from: "a".into(),
                to: "b".into(),
                relation_type: "knows".into(),
                strength: None,
                confidence: None,
                metadata: Default::default(),
            }])
            .expect("create_relations does not error on a missing endpoint");

        prop_assert_eq!(created.len(), usize::from(create_to));
    }

    /// Invariant 9: deleting an entity removes every relation, current or
    /// historical, that references it.
    #[test]
    fn prop_cascade_delete(relation_count in 1usize..4) {
        let store = store();
        store
            .create_entities(vec![
                EntityInput { name: "a".into(), entity_type: "t".into(), observations: vec![] },
                EntityInput { name: "b".into(), entity_type: "t".into(), observations: vec![] },
            ])
            .expect("create");

        for i in 0..relation_count {
            store
                .create_relations(vec![RelationInput {
                    from: "a".into(),
                    to: "b".into(),
                    relation_type: format!("rel{i}"),
                    strength: None,
                    confidence: None,
                    metadata: Default::default(),
                }])
                .expect("create relation");
        }

        store.delete_entities(&["a".to_string()]).expect("delete a");

        for i in 0..relation_count {
            let history = store.get_relation_history("a", "b", &format!("rel{i}")).expect("history");
            prop_assert!(history.is_empty());
        }
    }
}
