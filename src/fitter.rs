//! # Parameter Estimation
//!
//! Fits every node's distribution from a dataset, visiting nodes in
//! topological order. The first failing node stops the run: nodes fitted
//! before it keep their new distributions, the failing node is left without
//! one and its name is recorded as the network's fit failure until the node
//! is repaired or a later fit succeeds.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::FitConfig;
use crate::dataset::Dataset;
use crate::distribution::Distribution;
use crate::model::{Domain, NodeId, Value};
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// Outcome of a successful [`fit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitReport {
    /// Node names in the order they were fitted (topological).
    pub nodes_fitted: Vec<String>,
    /// Rows consumed per node.
    pub rows: usize,
}

#[tracing::instrument(skip(network, data, config), fields(rows = data.len(), nodes = network.len()))]
pub fn fit<B: GraphBackend>(
    network: &mut Network<Distribution, B>,
    data: &Dataset,
    config: &FitConfig,
) -> Result<FitReport> {
    config.validate()?;
    if config.infer_levels {
        infer_levels(network, data)?;
    }
    let order = network.topological_ids()?;
    let mut report = FitReport { nodes_fitted: Vec::with_capacity(order.len()), rows: data.len() };

    for id in order {
        let name = network.node_by_id(id)?.name.clone();
        match fit_node(network, id, data, config) {
            Ok(distribution) => {
                trace!(node = %name, kind = distribution.kind_name(), "node fitted");
                network.store_distribution(id, Some(distribution));
                report.nodes_fitted.push(name);
            }
            Err(e) => {
                debug!(node = %name, error = %e, "fit aborted");
                network.store_distribution(id, None);
                network.set_fit_failure(Some(name));
                return Err(e);
            }
        }
    }

    network.set_fit_failure(None);
    info!(nodes = report.nodes_fitted.len(), rows = report.rows, "fit complete");
    Ok(report)
}

fn fit_node<B: GraphBackend>(
    network: &Network<Distribution, B>,
    id: NodeId,
    data: &Dataset,
    config: &FitConfig,
) -> Result<Distribution> {
    let schema = network.schema_of(id)?;
    let own_idx = column(data, schema.name)?;
    let parent_idx = schema
        .parents
        .iter()
        .map(|(name, _)| column(data, name))
        .collect::<Result<Vec<_>>>()?;

    let rows = data.raw_rows();
    let own: Vec<&Value> = rows.iter().map(|r| &r[own_idx]).collect();
    let parent_rows: Vec<Vec<&Value>> = rows
        .iter()
        .map(|r| parent_idx.iter().map(|&i| &r[i]).collect())
        .collect();

    Distribution::fit(&schema, &parent_rows, &own, config)
}

/// Give every discrete node the sorted distinct labels of its column as
/// levels. All domains are derived before any is replaced, so a failure
/// leaves the network untouched.
fn infer_levels<B: GraphBackend>(network: &mut Network<Distribution, B>, data: &Dataset) -> Result<()> {
    let mut inferred = Vec::new();
    for id in network.vertex_ids() {
        let node = network.node_by_id(id)?;
        if !node.domain.is_discrete() {
            continue;
        }
        let idx = column(data, &node.name)?;
        let mut labels: Vec<&str> = Vec::new();
        for row in data.raw_rows() {
            let label = row[idx].as_level().ok_or_else(|| Error::InvalidValue {
                node: node.name.clone(),
                value: row[idx].to_string(),
                expected: "a level label".into(),
            })?;
            labels.push(label);
        }
        labels.sort_unstable();
        labels.dedup();
        if labels.is_empty() {
            return Err(Error::InsufficientData {
                node: node.name.clone(),
                message: "no rows to infer levels from".into(),
            });
        }
        inferred.push((id, Domain::discrete(labels)));
    }

    for (id, domain) in inferred {
        trace!(node = %id, levels = ?domain.levels(), "levels inferred");
        network.set_domain_of(id, domain)?;
    }
    Ok(())
}

fn column(data: &Dataset, name: &str) -> Result<usize> {
    data.column_index(name).ok_or_else(|| Error::MissingColumn(name.to_string()))
}
