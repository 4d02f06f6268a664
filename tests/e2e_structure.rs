//! End-to-end tests for DAG structure: node/edge mutation, cycle rejection,
//! ordering and ancestry queries.
//!
//! Each test drives the public `Network` API against `MemoryBackend`.

use baynet::parameters::node_name;
use baynet::{Domain, Edge, Error, Network, NetworkKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Helper: the classic sprinkler DAG
//
//   Cloudy -> Sprinkler -> WetGrass
//   Cloudy -> Rain      -> WetGrass
// ============================================================================

fn sprinkler() -> Network {
    let mut net = Network::new();
    for name in ["Cloudy", "Sprinkler", "Rain", "WetGrass"] {
        net.add_node(name, Domain::binary()).unwrap();
    }
    net.add_edge("Cloudy", "Sprinkler").unwrap();
    net.add_edge("Cloudy", "Rain").unwrap();
    net.add_edge("Rain", "WetGrass").unwrap();
    net.add_edge("Sprinkler", "WetGrass").unwrap();
    net
}

// ============================================================================
// 1. Queries on a built network
// ============================================================================

#[test]
fn test_topological_order_is_deterministic() {
    let a = sprinkler();
    let b = sprinkler();
    assert_eq!(a.topological_order().unwrap(), vec!["Cloudy", "Sprinkler", "Rain", "WetGrass"]);
    assert_eq!(a.topological_order().unwrap(), b.topological_order().unwrap());
}

#[test]
fn test_parents_follow_insertion_not_edge_order() {
    let net = sprinkler();
    // Rain -> WetGrass was added before Sprinkler -> WetGrass.
    assert_eq!(net.parents("WetGrass").unwrap(), vec!["Sprinkler", "Rain"]);
    assert_eq!(net.children("Cloudy").unwrap(), vec!["Sprinkler", "Rain"]);
}

#[test]
fn test_ancestors_and_descendants() {
    let net = sprinkler();
    assert_eq!(net.ancestors("WetGrass").unwrap(), vec!["Cloudy", "Sprinkler", "Rain"]);
    assert_eq!(net.descendants("Cloudy").unwrap(), vec!["Sprinkler", "Rain", "WetGrass"]);
    assert!(net.ancestors("Cloudy").unwrap().is_empty());
    assert!(net.has_path("Cloudy", "WetGrass").unwrap());
    assert!(!net.has_path("WetGrass", "Cloudy").unwrap());
    assert!(net.are_neighbours("WetGrass", "Rain").unwrap());
    assert!(!net.are_neighbours("Sprinkler", "Rain").unwrap());
}

#[test]
fn test_edges_grouped_by_child() {
    let net = sprinkler();
    assert_eq!(
        net.edges(),
        vec![
            Edge::new("Cloudy", "Sprinkler"),
            Edge::new("Cloudy", "Rain"),
            Edge::new("Sprinkler", "WetGrass"),
            Edge::new("Rain", "WetGrass"),
        ]
    );
    assert_eq!(net.edge_count(), 4);
}

#[test]
fn test_v_structures_of_sprinkler() {
    let net = sprinkler();
    assert_eq!(
        net.v_structures(false),
        vec![("Rain".to_string(), "WetGrass".to_string(), "Sprinkler".to_string())]
    );
    assert_eq!(net.kind(), NetworkKind::Discrete);
}

// ============================================================================
// 2. Rejections leave the network untouched
// ============================================================================

#[test]
fn test_cycle_rejected_without_side_effects() {
    let mut net = sprinkler();
    let before = net.edges();
    let err = net.add_edge("WetGrass", "Cloudy").unwrap_err();
    assert!(matches!(err, Error::CycleError { ref parent, ref child } if parent == "WetGrass" && child == "Cloudy"));
    assert_eq!(net.edges(), before);
    assert!(net.add_edge("Rain", "Rain").is_err());
    assert_eq!(net.edges(), before);
}

#[test]
fn test_unknown_identity() {
    let mut net = sprinkler();
    assert!(matches!(net.parents("Fog"), Err(Error::UnknownIdentity(_))));
    assert!(matches!(net.remove_node("Fog"), Err(Error::UnknownIdentity(_))));
    assert!(matches!(net.add_edge("Fog", "Rain"), Err(Error::UnknownIdentity(_))));
    assert!(matches!(net.remove_edge("Rain", "Cloudy"), Err(Error::UnknownEdge { .. })));
}

// ============================================================================
// 3. Removal
// ============================================================================

#[test]
fn test_remove_node_keeps_order_of_survivors() {
    let mut net = sprinkler();
    net.remove_node("Cloudy").unwrap();
    assert_eq!(net.node_names(), vec!["Sprinkler", "Rain", "WetGrass"]);
    assert_eq!(net.topological_order().unwrap(), vec!["Sprinkler", "Rain", "WetGrass"]);
    // name can be reused and ranks last
    net.add_node("Cloudy", Domain::binary()).unwrap();
    net.add_edge("Cloudy", "Rain").unwrap();
    assert_eq!(net.topological_order().unwrap(), vec!["Sprinkler", "Cloudy", "Rain", "WetGrass"]);
}

// ============================================================================
// 4. Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_random_insertions_stay_acyclic(
        n in 2usize..9,
        pairs in prop::collection::vec((0usize..9, 0usize..9), 0..40),
    ) {
        let names: Vec<String> = (0..n).map(node_name).collect();
        let mut net = Network::new();
        for name in &names {
            net.add_node(name.as_str(), Domain::binary()).unwrap();
        }

        for (a, b) in pairs {
            let (a, b) = (a % n, b % n);
            let before = net.edges();
            match net.add_edge(&names[a], &names[b]) {
                Ok(()) => prop_assert!(!net.has_path(&names[b], &names[a]).unwrap()),
                Err(Error::CycleError { .. }) | Err(Error::DuplicateEdge { .. }) => {
                    prop_assert_eq!(net.edges(), before);
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        let order = net.topological_order().unwrap();
        prop_assert_eq!(order.len(), n);
        let rank = |name: &str| order.iter().position(|x| *x == name);
        for edge in net.edges() {
            prop_assert!(rank(&edge.parent) < rank(&edge.child));
        }
    }

    #[test]
    fn prop_edges_then_removal_restores_edge_set(
        pairs in prop::collection::vec((0usize..6, 0usize..6), 1..20),
    ) {
        let names: Vec<String> = (0..6).map(node_name).collect();
        let mut net = Network::new();
        for name in &names {
            net.add_node(name.as_str(), Domain::Continuous).unwrap();
        }
        let mut added: Vec<(usize, usize)> = Vec::new();
        for (a, b) in pairs {
            if net.add_edge(&names[a], &names[b]).is_ok() {
                added.push((a, b));
            }
        }
        for (a, b) in added.into_iter().rev() {
            net.remove_edge(&names[a], &names[b]).unwrap();
        }
        prop_assert_eq!(net.edge_count(), 0);
    }
}
