//! # Ancestral Sampling
//!
//! Rows are drawn by visiting nodes in topological order, so every parent
//! value exists before its children are drawn. The visit plan (topological
//! order, column positions, parent columns) is computed once per call.
//!
//! ```text
//! plan:   topo order → [(column, parent columns, distribution)]
//! row:    for step in plan: row[column] = sample(row[parents])
//! output: columns in node insertion order
//! ```

use smallvec::SmallVec;
use hashbrown::HashMap;
use rand::Rng;

use crate::dataset::Dataset;
use crate::distribution::{domain_label, Conditional};
use crate::model::{Domain, NodeId, Value};
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::{Error, Result};

struct Step<'a, D> {
    name: &'a str,
    domain: &'a Domain,
    column: usize,
    parents: SmallVec<[usize; 4]>,
    distribution: &'a D,
}

/// Draw `n_rows` rows from a fully fitted network. The same RNG state always
/// yields the same dataset.
#[tracing::instrument(skip(network, rng), fields(nodes = network.len()))]
pub fn sample<D, B, R>(network: &Network<D, B>, n_rows: usize, rng: &mut R) -> Result<Dataset>
where
    D: Conditional,
    B: GraphBackend,
    R: Rng + ?Sized,
{
    let (columns, steps) = plan(network)?;
    let width = columns.len();
    let mut dataset = Dataset::with_capacity(columns, n_rows);
    for _ in 0..n_rows {
        dataset.push_unchecked(draw_row(&steps, width, rng)?);
    }
    Ok(dataset)
}

/// Split `n_rows` into `chunks` contiguous blocks sampled in parallel. A
/// master `StdRng::seed_from_u64(seed)` draws one 64-bit seed per block, so
/// the output depends only on `(seed, chunks)` and neighbouring seeds do not
/// share block streams.
#[cfg(feature = "parallel")]
#[tracing::instrument(skip(network), fields(nodes = network.len()))]
pub fn sample_parallel<D, B>(network: &Network<D, B>, n_rows: usize, seed: u64, chunks: usize) -> Result<Dataset>
where
    D: Conditional + Sync,
    B: GraphBackend + Sync,
{
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use rayon::prelude::*;

    if chunks == 0 {
        return Err(Error::InvalidParameters("sample_parallel needs at least one chunk".into()));
    }
    let (columns, steps) = plan(network)?;
    let width = columns.len();

    let base = n_rows / chunks;
    let extra = n_rows % chunks;
    let mut master = StdRng::seed_from_u64(seed);
    let jobs: Vec<(usize, u64)> = (0..chunks)
        .map(|i| (base + usize::from(i < extra), master.next_u64()))
        .collect();

    let blocks: Vec<Result<Vec<Vec<Value>>>> = jobs
        .par_iter()
        .map(|&(size, block_seed)| {
            let mut rng = StdRng::seed_from_u64(block_seed);
            (0..size).map(|_| draw_row(&steps, width, &mut rng)).collect()
        })
        .collect();

    let mut dataset = Dataset::with_capacity(columns, n_rows);
    for block in blocks {
        for row in block? {
            dataset.push_unchecked(row);
        }
    }
    Ok(dataset)
}

// ============================================================================
// Plan
// ============================================================================

fn plan<D, B>(network: &Network<D, B>) -> Result<(Vec<String>, Vec<Step<'_, D>>)>
where
    D: Conditional,
    B: GraphBackend,
{
    let mut missing: Vec<String> = network.unfitted_nodes().into_iter().map(String::from).collect();
    if let Some(failed) = network.fit_failure() {
        if !missing.iter().any(|m| m == failed) {
            missing.push(failed.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(Error::UnfittedNetwork(missing));
    }

    let order = network.vertex_ids();
    let column_of: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut columns = Vec::with_capacity(order.len());
    for &id in &order {
        columns.push(network.node_by_id(id)?.name.clone());
    }

    let mut steps = Vec::with_capacity(order.len());
    for id in network.topological_ids()? {
        let node = network.node_by_id(id)?;
        let distribution = node
            .distribution()
            .ok_or_else(|| Error::UnfittedNetwork(vec![node.name.clone()]))?;
        let parents: SmallVec<[usize; 4]> = network
            .parent_ids(id)
            .iter()
            .map(|p| column_of.get(p).copied().ok_or_else(|| Error::Internal(format!("parent {p} has no column"))))
            .collect::<Result<_>>()?;
        let column = column_of
            .get(&id)
            .copied()
            .ok_or_else(|| Error::Internal(format!("vertex {id} has no column")))?;
        steps.push(Step { name: &node.name, domain: &node.domain, column, parents, distribution });
    }
    Ok((columns, steps))
}

fn draw_row<D, R>(steps: &[Step<'_, D>], width: usize, rng: &mut R) -> Result<Vec<Value>>
where
    D: Conditional,
    R: Rng + ?Sized,
{
    let mut row: Vec<Option<Value>> = vec![None; width];
    for step in steps {
        // Parent borrows into `row` must end before the column is written.
        let value = {
            let parents = step
                .parents
                .iter()
                .map(|&i| {
                    row[i]
                        .as_ref()
                        .ok_or_else(|| Error::Internal(format!("parent column {i} of '{}' not yet drawn", step.name)))
                })
                .collect::<Result<SmallVec<[&Value; 4]>>>()?;
            step.distribution.sample(&parents, rng).map_err(|e| e.at_node(step.name))?
        };
        if !step.domain.admits(&value) {
            return Err(Error::InvalidValue {
                node: step.name.to_string(),
                value: value.to_string(),
                expected: domain_label(step.domain).into(),
            });
        }
        row[step.column] = Some(value);
    }
    row.into_iter()
        .map(|v| v.ok_or_else(|| Error::Internal("row column left empty".into())))
        .collect()
}
