//! Explaining graph IR
//!
//! Nodes, edges and clusters live in an arena keyed by stable ids. Each
//! container (the root or a cluster) keeps its ordered child items; edges may
//! connect nodes owned by different containers. Owner and adjacency indexes
//! are kept up to date by every mutation so the optimizer can look up
//! neighbours without walking the tree.

use std::collections::HashMap;
use std::fmt;

/// Id of the root graph
pub const GRAPH_ID: &str = "explaining_graph";

/// Node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

/// Cluster (subgraph) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==================== Id Counter ====================

/// Monotonic id source, passed by value through lowering and optimization.
///
/// Nodes, edges and clusters share one id space. It is `u64` while part ids
/// are `u32`, so a counter started past any part id cannot wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn new(first: u64) -> Self {
        Self(first)
    }

    /// The id the next `take` will hand out
    pub fn peek(self) -> u64 {
        self.0
    }

    pub fn take(self) -> (u64, IdCounter) {
        (self.0, IdCounter(self.0 + 1))
    }

    pub fn node(self) -> (NodeId, IdCounter) {
        let (id, next) = self.take();
        (NodeId(id), next)
    }

    pub fn edge(self) -> (EdgeId, IdCounter) {
        let (id, next) = self.take();
        (EdgeId(id), next)
    }

    pub fn cluster(self) -> (ClusterId, IdCounter) {
        let (id, next) = self.take();
        (ClusterId(id), next)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self(1)
    }
}

// ==================== Nodes ====================

/// Node type tag, used by the optimizer to pick rewrite candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Begin,
    End,
    /// Unlabeled structural junction
    Point,
    Text { case_sensitive: bool },
    Assert,
    Charflag,
    Backreference,
    Call,
    CharacterClass,
    Range,
    OptionCase,
}

impl NodeKind {
    /// Name written to the `comment` attribute
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Begin => "Begin",
            NodeKind::End => "End",
            NodeKind::Point => "Point",
            NodeKind::Text { .. } => "Text",
            NodeKind::Assert => "Assert",
            NodeKind::Charflag => "Charflag",
            NodeKind::Backreference => "Backreference",
            NodeKind::Call => "SubexpressionCall",
            NodeKind::CharacterClass => "CharacterClass",
            NodeKind::Range => "Range",
            NodeKind::OptionCase => "OptionCaseSensitivity",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, NodeKind::Text { .. })
    }
}

/// Graph node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub tooltip: String,
    pub shape: String,
    pub color: String,
    pub fillcolor: String,
    pub style: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            tooltip: String::new(),
            shape: "ellipse".to_string(),
            color: "black".to_string(),
            fillcolor: String::new(),
            style: String::new(),
            kind,
        }
    }

    /// Unlabeled junction node
    pub fn point(id: NodeId) -> Self {
        let mut node = Self::new(id, NodeKind::Point, "");
        node.shape = "point".to_string();
        node
    }

    /// Strip the node down to a bare junction, keeping its id and edges
    pub fn demote_to_point(&mut self) {
        *self = Self::point(self.id);
    }
}

// ==================== Edges ====================

/// Directed edge between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    source: NodeId,
    destination: NodeId,
    pub label: String,
    pub tooltip: String,
    pub color: String,
    pub style: String,
    pub arrowhead: String,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, destination: NodeId) -> Self {
        Self {
            id,
            source,
            destination,
            label: String::new(),
            tooltip: String::new(),
            color: String::new(),
            style: String::new(),
            arrowhead: String::new(),
        }
    }

    pub fn labeled(id: EdgeId, source: NodeId, destination: NodeId, label: &str) -> Self {
        let mut edge = Self::new(id, source, destination);
        edge.label = label.to_string();
        edge.tooltip = label.to_string();
        edge
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Add text to the label and tooltip, one entry per line
    pub fn append_text(&mut self, label: &str, tooltip: &str) {
        join_into(&mut self.label, label);
        join_into(&mut self.tooltip, tooltip);
    }
}

fn join_into(target: &mut String, extra: &str) {
    if extra.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(extra);
}

// ==================== Clusters ====================

/// Nested subgraph, rendered as a `cluster_<id>` box
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub label: String,
    pub tooltip: String,
    pub bgcolor: String,
    pub color: String,
    pub style: String,
    /// `node [...]` defaults for everything inside
    pub node_defaults: Vec<(String, String)>,
    /// `edge [...]` defaults for everything inside
    pub edge_defaults: Vec<(String, String)>,
    items: Vec<Item>,
}

impl Cluster {
    pub fn new(id: ClusterId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            tooltip: String::new(),
            bgcolor: String::new(),
            color: String::new(),
            style: String::new(),
            node_defaults: Vec::new(),
            edge_defaults: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }
}

/// A child of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    Node(NodeId),
    Edge(EdgeId),
    Cluster(ClusterId),
}

/// The root graph or one of its clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerId {
    Root,
    Cluster(ClusterId),
}

// ==================== Graph ====================

/// The explaining graph
#[derive(Debug, Clone)]
pub struct Graph {
    pub id: String,
    pub bgcolor: String,
    pub rankdir: String,
    pub compound: bool,
    root: Vec<Item>,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    clusters: HashMap<ClusterId, Cluster>,
    owners: HashMap<Item, ContainerId>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            bgcolor: "white".to_string(),
            rankdir: "LR".to_string(),
            compound: true,
            root: Vec::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            clusters: HashMap::new(),
            owners: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    // ---------- construction ----------

    /// Store a node; it belongs to no container until placed
    pub fn add_node(&mut self, node: Node) -> Item {
        let id = node.id;
        self.nodes.insert(id, node);
        Item::Node(id)
    }

    /// Store an edge and index it under both endpoints
    pub fn add_edge(&mut self, edge: Edge) -> Item {
        let id = edge.id;
        self.outgoing.entry(edge.source).or_default().push(id);
        self.incoming.entry(edge.destination).or_default().push(id);
        self.edges.insert(id, edge);
        Item::Edge(id)
    }

    /// Store a cluster and place `items` inside it
    pub fn add_cluster(&mut self, cluster: Cluster, items: Vec<Item>) -> Item {
        let id = cluster.id;
        self.clusters.insert(id, cluster);
        self.place(ContainerId::Cluster(id), items);
        Item::Cluster(id)
    }

    /// Append `items` to a container
    pub fn place(&mut self, container: ContainerId, items: Vec<Item>) {
        for item in &items {
            self.owners.insert(*item, container);
        }
        if let Some(children) = self.items_mut(container) {
            children.extend(items);
        }
    }

    // ---------- lookup ----------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(&id)
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut Cluster> {
        self.clusters.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Ordered children of a container
    pub fn items(&self, container: ContainerId) -> &[Item] {
        match container {
            ContainerId::Root => &self.root,
            ContainerId::Cluster(id) => self.clusters.get(&id).map(|c| c.items.as_slice()).unwrap_or(&[]),
        }
    }

    fn items_mut(&mut self, container: ContainerId) -> Option<&mut Vec<Item>> {
        match container {
            ContainerId::Root => Some(&mut self.root),
            ContainerId::Cluster(id) => self.clusters.get_mut(&id).map(|c| &mut c.items),
        }
    }

    /// Nodes placed directly in a container, in order
    pub fn child_nodes(&self, container: ContainerId) -> Vec<NodeId> {
        self.items(container)
            .iter()
            .filter_map(|item| match item {
                Item::Node(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn owner(&self, item: Item) -> Option<ContainerId> {
        self.owners.get(&item).copied()
    }

    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        self.incoming.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Destination of the unique outgoing edge of `node`
    pub fn successor(&self, node: NodeId) -> Option<NodeId> {
        match self.outgoing(node) {
            [edge] => self.edge(*edge).map(Edge::destination),
            _ => None,
        }
    }

    /// Source of the unique incoming edge of `node`
    pub fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        match self.incoming(node) {
            [edge] => self.edge(*edge).map(Edge::source),
            _ => None,
        }
    }

    /// Root first, then every cluster in pre-order
    pub fn containers_top_down(&self) -> Vec<ContainerId> {
        let mut order = Vec::new();
        let mut stack = vec![ContainerId::Root];
        while let Some(container) = stack.pop() {
            order.push(container);
            let nested: Vec<ContainerId> = self
                .items(container)
                .iter()
                .filter_map(|item| match item {
                    Item::Cluster(id) => Some(ContainerId::Cluster(*id)),
                    _ => None,
                })
                .collect();
            stack.extend(nested.into_iter().rev());
        }
        order
    }

    // ---------- mutation ----------

    pub fn set_source(&mut self, edge: EdgeId, source: NodeId) {
        let Some(old) = self.edges.get(&edge).map(Edge::source) else {
            return;
        };
        unlink(&mut self.outgoing, old, edge);
        self.outgoing.entry(source).or_default().push(edge);
        if let Some(e) = self.edges.get_mut(&edge) {
            e.source = source;
        }
    }

    pub fn set_destination(&mut self, edge: EdgeId, destination: NodeId) {
        let Some(old) = self.edges.get(&edge).map(Edge::destination) else {
            return;
        };
        unlink(&mut self.incoming, old, edge);
        self.incoming.entry(destination).or_default().push(edge);
        if let Some(e) = self.edges.get_mut(&edge) {
            e.destination = destination;
        }
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        unlink(&mut self.outgoing, edge.source, id);
        unlink(&mut self.incoming, edge.destination, id);
        self.detach(Item::Edge(id));
        Some(edge)
    }

    /// Remove a node together with any edges still attached to it
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let attached: Vec<EdgeId> = self
            .outgoing(id)
            .iter()
            .chain(self.incoming(id).iter())
            .copied()
            .collect();
        for edge in attached {
            self.remove_edge(edge);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        let node = self.nodes.remove(&id)?;
        self.detach(Item::Node(id));
        Some(node)
    }

    fn detach(&mut self, item: Item) {
        if let Some(container) = self.owners.remove(&item) {
            if let Some(children) = self.items_mut(container) {
                children.retain(|child| *child != item);
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GRAPH_ID)
    }
}

fn unlink(index: &mut HashMap<NodeId, Vec<EdgeId>>, node: NodeId, edge: EdgeId) {
    if let Some(edges) = index.get_mut(&node) {
        edges.retain(|e| *e != edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        // 1 -> 2 -> 3, node 3 inside cluster 10
        let mut graph = Graph::default();
        let n1 = graph.add_node(Node::new(NodeId(1), NodeKind::Begin, "begin"));
        let n2 = graph.add_node(Node::point(NodeId(2)));
        let n3 = graph.add_node(Node::new(NodeId(3), NodeKind::End, "end"));
        let e4 = graph.add_edge(Edge::new(EdgeId(4), NodeId(1), NodeId(2)));
        let e5 = graph.add_edge(Edge::new(EdgeId(5), NodeId(2), NodeId(3)));
        let c10 = graph.add_cluster(Cluster::new(ClusterId(10), "inner"), vec![n3]);
        graph.place(ContainerId::Root, vec![n1, n2, c10, e4, e5]);
        graph
    }

    #[test]
    fn test_id_counter_threads_by_value() {
        let ids = IdCounter::new(5);
        let (a, ids) = ids.node();
        let (b, ids) = ids.edge();
        let (c, ids) = ids.cluster();
        assert_eq!((a.0, b.0, c.0), (5, 6, 7));
        assert_eq!(ids.peek(), 8);
    }

    #[test]
    fn test_neighbours_and_owners() {
        let graph = line_graph();
        assert_eq!(graph.successor(NodeId(1)), Some(NodeId(2)));
        assert_eq!(graph.predecessor(NodeId(3)), Some(NodeId(2)));
        assert_eq!(graph.successor(NodeId(3)), None);
        assert_eq!(graph.owner(Item::Node(NodeId(2))), Some(ContainerId::Root));
        assert_eq!(
            graph.owner(Item::Node(NodeId(3))),
            Some(ContainerId::Cluster(ClusterId(10)))
        );
        assert_eq!(
            graph.containers_top_down(),
            vec![ContainerId::Root, ContainerId::Cluster(ClusterId(10))]
        );
    }

    #[test]
    fn test_rewire_and_remove() {
        let mut graph = line_graph();
        graph.set_destination(EdgeId(4), NodeId(3));
        graph.remove_node(NodeId(2));

        assert_eq!(graph.successor(NodeId(1)), Some(NodeId(3)));
        assert_eq!(graph.incoming(NodeId(3)), &[EdgeId(4)]);
        assert!(graph.edge(EdgeId(5)).is_none());
        assert_eq!(
            graph.items(ContainerId::Root),
            &[
                Item::Node(NodeId(1)),
                Item::Cluster(ClusterId(10)),
                Item::Edge(EdgeId(4))
            ]
        );
    }

    #[test]
    fn test_append_text_joins_lines() {
        let mut edge = Edge::labeled(EdgeId(1), NodeId(2), NodeId(3), "true");
        edge.append_text("word boundary", "word boundary");
        edge.append_text("", "");
        assert_eq!(edge.label, "true\nword boundary");
    }
}
