//! Generated edit sequences: references stay among siblings, names stay
//! unique, and ownership stays a forest whatever the clone policy.

use proptest::prelude::*;
use proptest::sample::Index;

use proptree::domain::{DecodePolicy, Model, NodeId, Owner, ReferencePolicy, Value};
use proptree::util::testing::demo_model;

/// Keeps repeated clones from growing the tree without bound.
const MAX_NODES: usize = 120;

/// One edit; the indices select among whatever nodes exist when it is applied.
#[derive(Debug, Clone)]
enum Edit {
    Insert {
        owner: Index,
        at_container: bool,
        kind: Index,
    },
    Clone {
        node: Index,
    },
    Remove {
        node: Index,
    },
    Retarget {
        node: Index,
        target: Index,
    },
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        5 => (any::<Index>(), any::<bool>(), any::<Index>()).prop_map(
            |(owner, at_container, kind)| Edit::Insert {
                owner,
                at_container,
                kind,
            }
        ),
        2 => any::<Index>().prop_map(|node| Edit::Clone { node }),
        1 => any::<Index>().prop_map(|node| Edit::Remove { node }),
        2 => (any::<Index>(), any::<Index>())
            .prop_map(|(node, target)| Edit::Retarget { node, target }),
    ]
}

fn arb_policy() -> impl Strategy<Value = ReferencePolicy> {
    prop_oneof![
        Just(ReferencePolicy::PreserveOriginal),
        Just(ReferencePolicy::RebindToClone),
    ]
}

fn all_nodes(model: &Model) -> Vec<NodeId> {
    model.tree().iter().map(|(id, _)| id).collect()
}

fn pick(nodes: &[NodeId], index: &Index) -> Option<NodeId> {
    if nodes.is_empty() {
        None
    } else {
        Some(nodes[index.index(nodes.len())])
    }
}

fn apply_edit(model: &mut Model, edit: &Edit) {
    let nodes = all_nodes(model);
    match edit {
        Edit::Insert {
            owner,
            at_container,
            kind,
        } => {
            let owner = match pick(&nodes, owner) {
                Some(id) if !at_container => Owner::Node(id),
                _ => Owner::Container,
            };
            let kinds = model.insertable_kinds(owner).unwrap();
            if !kinds.is_empty() {
                let kind = kinds[kind.index(kinds.len())].clone();
                model.insert(owner, &kind).unwrap();
            }
        }
        Edit::Clone { node } => {
            if let Some(id) = pick(&nodes, node) {
                if model.tree().len() < MAX_NODES {
                    model.clone_node(id).unwrap();
                }
            }
        }
        Edit::Remove { node } => {
            if let Some(id) = pick(&nodes, node) {
                model.remove(id).unwrap();
            }
        }
        Edit::Retarget { node, target } => {
            let Some(id) = pick(&nodes, node) else {
                return;
            };
            let refs: Vec<String> = model
                .node(id)
                .unwrap()
                .properties
                .iter()
                .filter(|(_, cell)| cell.as_object_ref().is_some())
                .map(|(name, _)| name.to_string())
                .collect();
            for name in refs {
                let targets = model.potential_targets(id, &name).unwrap();
                // One extra slot stands for "no reference"
                let chosen = targets.get(target.index(targets.len() + 1)).copied();
                model.set(id, &name, Value::Reference(chosen)).unwrap();
            }
        }
    }
}

fn assert_invariants(model: &Model) {
    model.validate().unwrap();

    // Every live node is reachable exactly once from the roots
    let reachable = all_nodes(model);
    assert_eq!(reachable.len(), model.tree().len());

    for id in reachable {
        let node = model.node(id).unwrap();
        for (name, cell) in node.properties.iter() {
            let Some(r) = cell.as_object_ref() else {
                continue;
            };
            assert_eq!(r.owner(), Some(node.owner), "{name} bound to a foreign owner");
            if let Value::Reference(Some(target)) = model.get(id, name).unwrap() {
                let target_node = model.node(target).unwrap();
                assert_eq!(target_node.owner, node.owner, "{name} points outside siblings");
                assert_eq!(target_node.kind.id(), r.target_kind());
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn given_random_edits_when_applied_then_invariants_hold(
        policy in arb_policy(),
        edits in prop::collection::vec(arb_edit(), 0..200),
    ) {
        let mut model = demo_model(policy, DecodePolicy::Discard);
        for edit in &edits {
            apply_edit(&mut model, edit);
            assert_invariants(&model);
        }
    }

    #[test]
    fn given_random_model_when_round_tripped_then_encoding_is_stable(
        policy in arb_policy(),
        edits in prop::collection::vec(arb_edit(), 0..120),
    ) {
        let mut model = demo_model(policy, DecodePolicy::Discard);
        for edit in &edits {
            apply_edit(&mut model, edit);
        }
        let once = model.encode_all().unwrap();

        let mut copy = demo_model(policy, DecodePolicy::Discard);
        copy.decode_all(&once).unwrap();
        let twice = copy.encode_all().unwrap();

        let mut again = demo_model(policy, DecodePolicy::Discard);
        again.decode_all(&twice).unwrap();

        // Forward references may be dropped once; after that the encoding is a fixed point
        prop_assert_eq!(again.encode_all().unwrap(), twice);
        prop_assert_eq!(copy.tree().len(), model.tree().len());
        assert_invariants(&copy);
    }
}
