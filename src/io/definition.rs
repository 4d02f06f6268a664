//! JSON network definitions.
//!
//! A definition carries everything needed to rebuild a network: nodes with
//! their domains and optional distributions, plus the edge list.
//!
//! ```json
//! {
//!   "nodes": [
//!     { "name": "Cloudy", "domain": { "kind": "discrete", "levels": ["0", "1"] },
//!       "distribution": { "kind": "discrete", "policy": "strict",
//!                         "rows": [ { "parents": [], "probabilities": [0.5, 0.5] } ] } }
//!   ],
//!   "edges": [ { "parent": "Cloudy", "child": "Rain" } ]
//! }
//! ```
//!
//! Loading replays `add_node`, `add_edge` and `attach_distribution` in that
//! order, so a definition is subject to every check the API performs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::FallbackPolicy;
use crate::distribution::{Cpt, Distribution, LinearGaussian};
use crate::model::{Domain, Edge};
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDefinition {
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub domain: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionDefinition {
    /// Table shaped by the node's and its parents' domains.
    Discrete {
        #[serde(default)]
        policy: FallbackPolicy,
        rows: Vec<CptRow>,
    },
    Gaussian {
        intercept: f64,
        coefficients: Vec<f64>,
        variance: f64,
    },
}

/// One CPT row: parent levels (network parent order) and the probabilities
/// over the node's own levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CptRow {
    pub parents: Vec<String>,
    pub probabilities: Vec<f64>,
}

// ============================================================================
// Network → definition
// ============================================================================

/// Capture a network. Nodes keep insertion order; CPT rows are emitted in
/// mixed-radix assignment order (first parent slowest).
pub fn to_definition<B: GraphBackend>(network: &Network<Distribution, B>) -> NetworkDefinition {
    let nodes = network
        .nodes()
        .map(|node| NodeDefinition {
            name: node.name.clone(),
            domain: node.domain.clone(),
            distribution: node.distribution().map(describe),
        })
        .collect();
    NetworkDefinition { nodes, edges: network.edges() }
}

fn describe(distribution: &Distribution) -> DistributionDefinition {
    match distribution {
        Distribution::Discrete(cpt) => DistributionDefinition::Discrete {
            policy: cpt.policy(),
            rows: cpt
                .sorted_rows()
                .into_iter()
                .map(|(assignment, probabilities)| CptRow {
                    parents: cpt.labels_of(assignment).into_iter().map(String::from).collect(),
                    probabilities: probabilities.to_vec(),
                })
                .collect(),
        },
        Distribution::Gaussian(g) => DistributionDefinition::Gaussian {
            intercept: g.intercept(),
            coefficients: g.coefficients().to_vec(),
            variance: g.variance(),
        },
    }
}

// ============================================================================
// Definition → network
// ============================================================================

/// Rebuild a network on a fresh backend.
pub fn from_definition<B: GraphBackend + Default>(definition: &NetworkDefinition) -> Result<Network<Distribution, B>> {
    let mut network = Network::with_backend(B::default())?;
    for node in &definition.nodes {
        network.add_node(node.name.as_str(), node.domain.clone())?;
    }
    for edge in &definition.edges {
        network.add_edge(&edge.parent, &edge.child)?;
    }
    for node in &definition.nodes {
        let Some(params) = &node.distribution else { continue };
        let distribution = build(&network, &node.name, params)?;
        network.attach_distribution(&node.name, distribution)?;
    }
    Ok(network)
}

fn build<B: GraphBackend>(
    network: &Network<Distribution, B>,
    name: &str,
    params: &DistributionDefinition,
) -> Result<Distribution> {
    match params {
        DistributionDefinition::Discrete { policy, rows } => {
            let schema = network.schema(name)?;
            let mut cpt = Cpt::from_schema(&schema)?.with_policy(*policy);
            for row in rows {
                let labels: Vec<&str> = row.parents.iter().map(String::as_str).collect();
                cpt.set_row(&labels, row.probabilities.clone()).map_err(|e| e.at_node(name))?;
            }
            Ok(cpt.into())
        }
        DistributionDefinition::Gaussian { intercept, coefficients, variance } => {
            Ok(LinearGaussian::new(*intercept, coefficients.clone(), *variance)?.into())
        }
    }
}

// ============================================================================
// JSON & files
// ============================================================================

pub fn to_json<B: GraphBackend>(network: &Network<Distribution, B>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_definition(network))?)
}

pub fn from_json(json: &str) -> Result<Network> {
    let definition: NetworkDefinition = serde_json::from_str(json)?;
    from_definition(&definition)
}

/// Write a network's JSON definition to `path`.
pub fn dump<B: GraphBackend>(network: &Network<Distribution, B>, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, to_json(network)?)?;
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Network> {
    from_json(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn weather() -> Network {
        let mut net = Network::new();
        net.add_node("Cloudy", Domain::binary()).unwrap();
        net.add_node("Rain", Domain::discrete(["dry", "wet"])).unwrap();
        net.add_node("Temp", Domain::Continuous).unwrap();
        net.add_edge("Cloudy", "Rain").unwrap();

        let mut cloudy = Cpt::new(vec!["0".into(), "1".into()], vec![]).unwrap();
        cloudy.set_row(&[], vec![0.4, 0.6]).unwrap();
        net.attach_distribution("Cloudy", cloudy.into()).unwrap();

        let mut rain = Cpt::new(vec!["dry".into(), "wet".into()], vec![vec!["0".into(), "1".into()]]).unwrap();
        rain.set_row(&["1"], vec![0.3, 0.7]).unwrap();
        rain.set_row(&["0"], vec![0.9, 0.1]).unwrap();
        net.attach_distribution("Rain", rain.into()).unwrap();

        net.attach_distribution("Temp", LinearGaussian::new(12.5, vec![], 4.0).unwrap().into()).unwrap();
        net
    }

    #[test]
    fn test_rows_in_assignment_order() {
        let def = to_definition(&weather());
        let Some(DistributionDefinition::Discrete { rows, .. }) = &def.nodes[1].distribution else {
            panic!("Rain should be discrete");
        };
        assert_eq!(rows[0].parents, vec!["0"]);
        assert_eq!(rows[1].parents, vec!["1"]);
    }

    #[test]
    fn test_dump_load_dump_identical() {
        let first = to_json(&weather()).unwrap();
        let reloaded = from_json(&first).unwrap();
        assert_eq!(to_json(&reloaded).unwrap(), first);
        assert!(reloaded.is_fully_fitted());
    }

    #[test]
    fn test_structure_only_definition() {
        let json = r#"{
            "nodes": [
                {"name": "A", "domain": {"kind": "continuous"}},
                {"name": "B", "domain": {"kind": "continuous"}}
            ],
            "edges": [{"parent": "A", "child": "B"}]
        }"#;
        let net = from_json(json).unwrap();
        assert_eq!(net.parents("B").unwrap(), vec!["A"]);
        assert_eq!(net.unfitted_nodes(), vec!["A", "B"]);
    }

    #[test]
    fn test_load_applies_api_checks() {
        let cyclic = r#"{
            "nodes": [
                {"name": "A", "domain": {"kind": "continuous"}},
                {"name": "B", "domain": {"kind": "continuous"}}
            ],
            "edges": [{"parent": "A", "child": "B"}, {"parent": "B", "child": "A"}]
        }"#;
        assert!(matches!(from_json(cyclic), Err(Error::CycleError { .. })));

        let bad_shape = r#"{
            "nodes": [{"name": "A", "domain": {"kind": "continuous"},
                       "distribution": {"kind": "gaussian", "intercept": 0.0, "coefficients": [1.0], "variance": 1.0}}]
        }"#;
        assert!(matches!(from_json(bad_shape), Err(Error::ShapeMismatch { .. })));

        assert!(matches!(from_json("{"), Err(Error::Serialization(_))));
    }
}
