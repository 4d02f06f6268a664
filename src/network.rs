//! # Network
//!
//! The DAG of variables. Owns the nodes (with their distributions) and a
//! [`GraphBackend`] holding the arcs, and guards the two structural
//! invariants:
//!
//! - the arc set is acyclic at all times (checked before every insertion)
//! - an attached distribution always matches the node's current parent set
//!   (any change to the parent set drops it)
//!
//! Every query that returns several nodes returns them in insertion order.

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::distribution::{domain_label, Conditional, Distribution, NodeSchema};
use crate::model::{Domain, Edge, Node, NodeId, Value};
use crate::storage::{GraphBackend, MemoryBackend};
use crate::{Error, Result};

/// Most edges `equivalence_class` will try in both orientations.
const MAX_FLIPPABLE_EDGES: usize = 20;

/// Variable types present in a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Discrete,
    Continuous,
    Mixed,
    Empty,
}

/// A Bayesian network over a pluggable graph backend.
///
/// `D` is the per-node distribution type; production code uses
/// [`Distribution`], tests may substitute any [`Conditional`].
#[derive(Debug, Clone)]
pub struct Network<D = Distribution, B = MemoryBackend> {
    backend: B,
    nodes: HashMap<NodeId, Node<D>>,
    ids: HashMap<String, NodeId>,
    /// Node whose fit failed in the last `fit` call.
    fit_failure: Option<String>,
}

impl Network {
    /// Empty network on the in-memory backend.
    pub fn new() -> Self {
        Self {
            backend: MemoryBackend::new(),
            nodes: HashMap::new(),
            ids: HashMap::new(),
            fit_failure: None,
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Structure
// ============================================================================

impl<D, B: GraphBackend> Network<D, B> {
    /// Network on a caller-supplied backend. The backend must be empty.
    pub fn with_backend(backend: B) -> Result<Self> {
        if !backend.vertices().is_empty() {
            return Err(Error::InvalidParameters("backend already holds vertices".into()));
        }
        Ok(Self {
            backend,
            nodes: HashMap::new(),
            ids: HashMap::new(),
            fit_failure: None,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn add_node(&mut self, name: impl Into<String>, domain: Domain) -> Result<NodeId> {
        let name = name.into();
        if self.ids.contains_key(&name) {
            debug!(node = %name, "add_node rejected: duplicate identity");
            return Err(Error::DuplicateIdentity(name));
        }
        domain.validate(&name)?;
        let id = self.backend.add_vertex();
        self.ids.insert(name.clone(), id);
        self.nodes.insert(id, Node::new(id, name, domain));
        Ok(id)
    }

    /// Insert `parent -> child`, rejecting duplicates and cycles before any
    /// state changes. Drops the child's distribution.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.id_of(parent)?;
        let c = self.id_of(child)?;
        if self.backend.has_arc(p, c) {
            debug!(parent, child, "add_edge rejected: duplicate edge");
            return Err(Error::DuplicateEdge { parent: parent.to_string(), child: child.to_string() });
        }
        // A self-loop is the trivial path c -> c.
        if self.backend.has_path(c, p) {
            debug!(parent, child, "add_edge rejected: would close a directed cycle");
            return Err(Error::CycleError { parent: parent.to_string(), child: child.to_string() });
        }
        self.backend.add_arc(p, c)?;
        self.invalidate(c, "edge added");
        Ok(())
    }

    /// Remove `parent -> child`. Drops the child's distribution.
    pub fn remove_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.id_of(parent)?;
        let c = self.id_of(child)?;
        if !self.backend.remove_arc(p, c) {
            return Err(Error::UnknownEdge { parent: parent.to_string(), child: child.to_string() });
        }
        self.invalidate(c, "edge removed");
        Ok(())
    }

    /// Remove a node and its incident edges, returning it. Every former child
    /// loses its distribution.
    pub fn remove_node(&mut self, name: &str) -> Result<Node<D>> {
        let id = self.id_of(name)?;
        let children = self.backend.children(id);
        self.backend.remove_vertex(id);
        for child in children {
            self.invalidate(child, "parent removed");
        }
        self.ids.remove(name);
        if self.fit_failure.as_deref() == Some(name) {
            self.fit_failure = None;
        }
        self.nodes
            .remove(&id)
            .ok_or_else(|| Error::Internal(format!("node '{name}' indexed but not stored")))
    }

    /// Replace a node's domain. The node and its children lose their
    /// distributions, since both are shaped by these levels.
    pub fn set_domain(&mut self, name: &str, domain: Domain) -> Result<()> {
        self.set_domain_of(self.id_of(name)?, domain)
    }

    pub(crate) fn set_domain_of(&mut self, id: NodeId, domain: Domain) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::Internal(format!("vertex {id} has no node")))?;
        domain.validate(&node.name)?;
        if node.domain == domain {
            return Ok(());
        }
        node.domain = domain;
        self.invalidate(id, "domain changed");
        for child in self.backend.children(id) {
            self.invalidate(child, "parent domain changed");
        }
        Ok(())
    }

    fn invalidate(&mut self, id: NodeId, reason: &'static str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.distribution.take().is_some() {
                debug!(node = %node.name, reason, "distribution dropped");
            }
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn contains(&self, name: &str) -> bool { self.ids.contains_key(name) }

    pub fn node(&self, name: &str) -> Option<&Node<D>> {
        self.ids.get(name).and_then(|id| self.nodes.get(id))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<D>> + '_ {
        self.backend.vertices().into_iter().filter_map(move |id| self.nodes.get(&id))
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes().map(|n| n.name.as_str()).collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Kahn's algorithm, ties broken by insertion order.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        Ok(self.names(self.backend.topological_order()?))
    }

    pub fn parents(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.names(self.backend.parents(self.id_of(name)?)))
    }

    pub fn children(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.names(self.backend.children(self.id_of(name)?)))
    }

    pub fn ancestors(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.names(self.backend.ancestors(self.id_of(name)?)))
    }

    pub fn descendants(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.names(self.backend.descendants(self.id_of(name)?)))
    }

    /// Whether a directed path leads from `from` to `to`.
    pub fn has_path(&self, from: &str, to: &str) -> Result<bool> {
        Ok(self.backend.has_path(self.id_of(from)?, self.id_of(to)?))
    }

    /// Whether an edge joins `a` and `b` in either direction.
    pub fn are_neighbours(&self, a: &str, b: &str) -> Result<bool> {
        let (a, b) = (self.id_of(a)?, self.id_of(b)?);
        Ok(self.backend.has_arc(a, b) || self.backend.has_arc(b, a))
    }

    pub fn edge_count(&self) -> usize {
        self.backend.arc_count()
    }

    /// Every edge, grouped by child, parents in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.backend
            .arcs()
            .into_iter()
            .filter_map(|(p, c)| Some(Edge::new(self.name_of(p)?, self.name_of(c)?)))
            .collect()
    }

    /// Undirected edges, endpoints sorted by name, list sorted.
    pub fn skeleton_edges(&self) -> Vec<(String, String)> {
        let mut out: Vec<_> = self.edges().iter().map(Edge::undirected).collect();
        out.sort();
        out.dedup();
        out
    }

    /// `(a, b, c)` for every `a -> b <- c` with `a < c` by name. Unless
    /// `include_shielded`, only pairs of parents that are not adjacent count.
    pub fn v_structures(&self, include_shielded: bool) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for b in self.backend.vertices() {
            let Some(b_name) = self.name_of(b) else { continue };
            let parents = self.backend.parents(b);
            for (i, &x) in parents.iter().enumerate() {
                for &y in &parents[i + 1..] {
                    if !include_shielded && (self.backend.has_arc(x, y) || self.backend.has_arc(y, x)) {
                        continue;
                    }
                    let (Some(xn), Some(yn)) = (self.name_of(x), self.name_of(y)) else { continue };
                    let (a, c) = if xn <= yn { (xn, yn) } else { (yn, xn) };
                    out.push((a.to_string(), b_name.to_string(), c.to_string()));
                }
            }
        }
        out.sort();
        out
    }

    pub fn kind(&self) -> NetworkKind {
        let discrete = self.nodes.values().filter(|n| n.domain.is_discrete()).count();
        match (discrete, self.nodes.len()) {
            (_, 0) => NetworkKind::Empty,
            (d, n) if d == n => NetworkKind::Discrete,
            (0, _) => NetworkKind::Continuous,
            _ => NetworkKind::Mixed,
        }
    }

    /// `m[i][j]` is true when node `i` is a parent of node `j` (insertion
    /// order indices). With `skeleton` the matrix is symmetrised.
    pub fn adjacency_matrix(&self, skeleton: bool) -> Vec<Vec<bool>> {
        let order = self.backend.vertices();
        let position: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut matrix = vec![vec![false; order.len()]; order.len()];
        for (p, c) in self.backend.arcs() {
            if let (Some(&i), Some(&j)) = (position.get(&p), position.get(&c)) {
                matrix[i][j] = true;
                if skeleton {
                    matrix[j][i] = true;
                }
            }
        }
        matrix
    }

    // ========================================================================
    // Distributions & fit status
    // ========================================================================

    pub fn distribution(&self, name: &str) -> Result<Option<&D>> {
        let id = self.id_of(name)?;
        Ok(self.nodes.get(&id).and_then(|n| n.distribution.as_ref()))
    }

    pub fn detach_distribution(&mut self, name: &str) -> Result<Option<D>> {
        let id = self.id_of(name)?;
        Ok(self.nodes.get_mut(&id).and_then(|n| n.distribution.take()))
    }

    /// The node's domain plus its parents' domains, parents in insertion
    /// order.
    pub fn schema(&self, name: &str) -> Result<NodeSchema<'_>> {
        self.schema_of(self.id_of(name)?)
    }

    /// Nodes without a distribution, insertion order.
    pub fn unfitted_nodes(&self) -> Vec<&str> {
        self.nodes().filter(|n| !n.is_fitted()).map(|n| n.name.as_str()).collect()
    }

    /// Node whose fit failed during the last `fit` call, if the network has
    /// not been repaired since.
    pub fn fit_failure(&self) -> Option<&str> {
        self.fit_failure.as_deref()
    }

    pub fn is_fully_fitted(&self) -> bool {
        self.fit_failure.is_none() && self.nodes.values().all(Node::is_fitted)
    }

    // ========================================================================
    // Crate-internal access for the sampler and fitter
    // ========================================================================

    pub(crate) fn id_of(&self, name: &str) -> Result<NodeId> {
        self.ids.get(name).copied().ok_or_else(|| Error::UnknownIdentity(name.to_string()))
    }

    pub(crate) fn name_of(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    pub(crate) fn node_by_id(&self, id: NodeId) -> Result<&Node<D>> {
        self.nodes.get(&id).ok_or_else(|| Error::Internal(format!("vertex {id} has no node")))
    }

    pub(crate) fn vertex_ids(&self) -> Vec<NodeId> {
        self.backend.vertices()
    }

    pub(crate) fn topological_ids(&self) -> Result<Vec<NodeId>> {
        self.backend.topological_order()
    }

    pub(crate) fn parent_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.backend.parents(id)
    }

    pub(crate) fn schema_of(&self, id: NodeId) -> Result<NodeSchema<'_>> {
        let node = self.node_by_id(id)?;
        let mut schema = NodeSchema::new(&node.name, &node.domain);
        for parent in self.backend.parents(id) {
            let p = self.node_by_id(parent)?;
            schema = schema.with_parent(&p.name, &p.domain);
        }
        Ok(schema)
    }

    /// Store (or clear) a distribution that has already been shaped against
    /// the node's schema.
    pub(crate) fn store_distribution(&mut self, id: NodeId, distribution: Option<D>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.distribution = distribution;
        }
    }

    pub(crate) fn set_fit_failure(&mut self, node: Option<String>) {
        self.fit_failure = node;
    }

    fn names(&self, ids: Vec<NodeId>) -> Vec<&str> {
        ids.into_iter().filter_map(|id| self.name_of(id)).collect()
    }
}

// ============================================================================
// Construction from structure
// ============================================================================

impl<D, B: GraphBackend + Default> Network<D, B> {
    /// Nodes (sorted by name, all with `domain`) and edges taken from an
    /// edge list.
    pub fn from_edges<I, E>(edges: I, domain: Domain) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Edge>,
    {
        let edges: Vec<Edge> = edges.into_iter().map(Into::into).collect();
        let mut names: Vec<&str> = edges
            .iter()
            .flat_map(|e| [e.parent.as_str(), e.child.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();
        Self::from_parts(&names, &edges, domain)
    }

    /// Build from a square adjacency matrix (`m[i][j]` = edge `i -> j`).
    /// Without `names`, nodes are called `A`, `B`, … `Z`, `AA`, ….
    pub fn from_adjacency(matrix: &[Vec<bool>], names: Option<&[&str]>, domain: Domain) -> Result<Self> {
        let n = matrix.len();
        if let Some(row) = matrix.iter().find(|row| row.len() != n) {
            return Err(Error::InvalidParameters(format!(
                "adjacency matrix is not square: {n} rows but a row of {}",
                row.len()
            )));
        }
        let generated: Vec<String>;
        let names: Vec<&str> = match names {
            Some(given) if given.len() == n => given.to_vec(),
            Some(given) => {
                return Err(Error::InvalidParameters(format!(
                    "{} names for a {n}x{n} adjacency matrix",
                    given.len()
                )));
            }
            None => {
                generated = (0..n).map(crate::parameters::node_name).collect();
                generated.iter().map(String::as_str).collect()
            }
        };
        let mut edges = Vec::new();
        for (i, row) in matrix.iter().enumerate() {
            for (j, &set) in row.iter().enumerate() {
                if set {
                    edges.push(Edge::new(names[i], names[j]));
                }
            }
        }
        Self::from_parts(&names, &edges, domain)
    }

    /// Parse a modelstring such as `[A][B|A][C|A:B]`. Nodes are added sorted
    /// by name.
    pub fn from_modelstring(modelstring: &str, domain: Domain) -> Result<Self> {
        let parsed = crate::io::modelstring::parse(modelstring)?;
        let names: Vec<&str> = parsed.nodes.iter().map(String::as_str).collect();
        Self::from_parts(&names, &parsed.edges, domain)
    }

    /// Every DAG Markov-equivalent to this one: same skeleton, same
    /// unshielded v-structures. Edges inside a v-structure are kept; every
    /// other edge is tried in both orientations and orientations that close
    /// a cycle or create a new v-structure are skipped. With
    /// `include_shielded`, edges of shielded v-structures are kept too.
    ///
    /// Members carry this network's nodes and domains in the same order but
    /// no distributions. The first member has every free edge in its
    /// original orientation, so it always equals this structure.
    pub fn equivalence_class(&self, include_shielded: bool) -> Result<Vec<Self>> {
        let mut fixed: Vec<Edge> = Vec::new();
        for (a, b, c) in self.v_structures(include_shielded) {
            for edge in [Edge::new(a, b.as_str()), Edge::new(c, b)] {
                if !fixed.contains(&edge) {
                    fixed.push(edge);
                }
            }
        }
        let free: Vec<Edge> = self.edges().into_iter().filter(|e| !fixed.contains(e)).collect();
        if free.len() > MAX_FLIPPABLE_EDGES {
            return Err(Error::InvalidParameters(format!(
                "equivalence class over {} reversible edges exceeds the limit of {MAX_FLIPPABLE_EDGES}",
                free.len()
            )));
        }

        let reference = self.v_structures(false);
        let mut members = Vec::new();
        'orientations: for mask in 0..(1u32 << free.len()) {
            let mut member = Self::with_backend(B::default())?;
            for node in self.nodes() {
                member.add_node(node.name.as_str(), node.domain.clone())?;
            }
            for edge in &fixed {
                member.add_edge(&edge.parent, &edge.child)?;
            }
            for (bit, edge) in free.iter().enumerate() {
                let (parent, child) = if mask & (1 << bit) == 0 {
                    (&edge.parent, &edge.child)
                } else {
                    (&edge.child, &edge.parent)
                };
                match member.add_edge(parent, child) {
                    Ok(()) => {}
                    Err(Error::CycleError { .. }) => continue 'orientations,
                    Err(e) => return Err(e),
                }
            }
            if member.v_structures(false) == reference {
                members.push(member);
            }
        }
        debug!(members = members.len(), free = free.len(), "equivalence class enumerated");
        Ok(members)
    }

    fn from_parts(names: &[&str], edges: &[Edge], domain: Domain) -> Result<Self> {
        let mut network = Self::with_backend(B::default())?;
        for name in names {
            network.add_node(*name, domain.clone())?;
        }
        for edge in edges {
            network.add_edge(&edge.parent, &edge.child)?;
        }
        Ok(network)
    }
}

impl<D, B: GraphBackend> Network<D, B> {
    /// Render as a modelstring, nodes and parent lists sorted by name.
    pub fn to_modelstring(&self) -> String {
        crate::io::modelstring::render(self)
    }
}

// ============================================================================
// Attaching & sampling
// ============================================================================

impl<D: Conditional, B: GraphBackend> Network<D, B> {
    /// Attach `distribution` after checking its shape against the node's
    /// domain and current parents. Clears the partial-fit flag when it names
    /// this node.
    pub fn attach_distribution(&mut self, name: &str, distribution: D) -> Result<()> {
        let id = self.id_of(name)?;
        distribution.validate(&self.schema_of(id)?)?;
        self.store_distribution(id, Some(distribution));
        if self.fit_failure.as_deref() == Some(name) {
            self.fit_failure = None;
        }
        Ok(())
    }

    /// Draw `n_rows` rows by ancestral sampling.
    pub fn sample<R: Rng + ?Sized>(&self, n_rows: usize, rng: &mut R) -> Result<Dataset> {
        crate::sampler::sample(self, n_rows, rng)
    }
}

impl<B: GraphBackend + Clone> Network<Distribution, B> {
    /// Estimate every node's distribution from `data`.
    pub fn fit(&mut self, data: &Dataset, config: &crate::config::FitConfig) -> Result<crate::fitter::FitReport> {
        crate::fitter::fit(self, data, config)
    }

    /// Copy of the network with `name` forced to `value`: incoming edges are
    /// cut and the node's distribution becomes a point mass. Every other
    /// node keeps its distribution.
    pub fn intervene(&self, name: &str, value: &Value) -> Result<Self> {
        let id = self.id_of(name)?;
        let node = self.node_by_id(id)?;
        if !node.domain.admits(value) {
            return Err(Error::InvalidValue {
                node: name.to_string(),
                value: value.to_string(),
                expected: domain_label(&node.domain).into(),
            });
        }
        let point = Distribution::point_mass(&node.domain, value).map_err(|e| e.at_node(name))?;

        let mut out = self.clone();
        for parent in out.backend.parents(id) {
            out.backend.remove_arc(parent, id);
        }
        out.store_distribution(id, Some(point));
        if out.fit_failure.as_deref() == Some(name) {
            out.fit_failure = None;
        }
        debug!(node = name, %value, "intervention applied");
        Ok(out)
    }
}
