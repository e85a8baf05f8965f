//! Canonical, order-independent structural fingerprint for flow graphs.
//!
//! Used by `wayfare-cache`'s typed solve-result wrapper to derive cache
//! keys (`solve:<algorithm>:<graph-hash>`) that are stable across node/edge
//! reordering but change with any scalar field — capacity, cost, topology.
//!
//! Derived from a SHA-256 over the sorted canonical records: sort
//! node/edge collections, feed them to the hasher, hex-encode.

use sha2::{Digest, Sha256};

/// A graph node as seen by the hash: identity plus a free-form type tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HashNode {
    pub id: String,
    pub node_type: String,
}

impl HashNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self { id: id.into(), node_type: node_type.into() }
    }
}

/// A graph edge as seen by the hash. Capacity, cost, and length are carried
/// as their canonical string representation so the hash is stable across
/// float formatting and doesn't require `Eq`/`Ord` on `f64`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HashEdge {
    pub from: String,
    pub to: String,
    pub capacity: String,
    pub cost: String,
    pub length: String,
    pub road_type: String,
}

#[allow(clippy::too_many_arguments)]
impl HashEdge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        capacity: f64,
        cost: f64,
        length: f64,
        road_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            capacity: canonical_float(capacity),
            cost: canonical_float(cost),
            length: canonical_float(length),
            road_type: road_type.into(),
        }
    }
}

/// Canonical decimal rendering of a float: fixed precision, so `1.0` and
/// `1.00` never diverge and a change as small as capacity going from `10`
/// to `10.0001` is still observable.
fn canonical_float(v: f64) -> String {
    format!("{v:.6}")
}

/// A flow graph as seen by the hash. Node/edge iteration order is
/// irrelevant — both collections are sorted before hashing.
#[derive(Debug, Clone, Default)]
pub struct ResidualGraph {
    pub nodes: Vec<HashNode>,
    pub edges: Vec<HashEdge>,
    pub source_id: String,
    pub sink_id: String,
}

impl ResidualGraph {
    pub fn new(source_id: impl Into<String>, sink_id: impl Into<String>) -> Self {
        Self { nodes: Vec::new(), edges: Vec::new(), source_id: source_id.into(), sink_id: sink_id.into() }
    }

    pub fn with_node(mut self, node: HashNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: HashEdge) -> Self {
        self.edges.push(edge);
        self
    }
}

/// Hex-encoded SHA-256 digest of a graph. Order-independent: node/edge
/// reordering never changes the result. A `None` graph hashes to the empty
/// string, matching §4.10's null-input guarantee.
pub fn hash_graph(graph: Option<&ResidualGraph>) -> String {
    let Some(graph) = graph else {
        return String::new();
    };

    let mut nodes = graph.nodes.clone();
    nodes.sort();
    let mut edges = graph.edges.clone();
    edges.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"source:");
    hasher.update(graph.source_id.as_bytes());
    hasher.update(b"\nsink:");
    hasher.update(graph.sink_id.as_bytes());
    hasher.update(b"\nnodes:");
    for node in &nodes {
        hasher.update(node.id.as_bytes());
        hasher.update(b"|");
        hasher.update(node.node_type.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"\nedges:");
    for edge in &edges {
        hasher.update(edge.from.as_bytes());
        hasher.update(b"|");
        hasher.update(edge.to.as_bytes());
        hasher.update(b"|");
        hasher.update(edge.capacity.as_bytes());
        hasher.update(b"|");
        hasher.update(edge.cost.as_bytes());
        hasher.update(b"|");
        hasher.update(edge.length.as_bytes());
        hasher.update(b"|");
        hasher.update(edge.road_type.as_bytes());
        hasher.update(b";");
    }

    hex::encode(hasher.finalize())
}

/// First 16 hex characters of [`hash_graph`] — a compact form for
/// cache-key suffixes and log lines.
pub fn short_hash(graph: Option<&ResidualGraph>) -> String {
    let full = hash_graph(graph);
    full.chars().take(16).collect()
}
