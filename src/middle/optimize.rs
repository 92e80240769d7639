//! Graph optimizer for explaining graphs
//!
//! Implements the rewrite passes that shrink a freshly lowered graph.

use log::{debug, trace};

use crate::middle::graph::*;

/// Optimization pass trait
pub trait OptimizationPass {
    /// Name of the optimization pass
    fn name(&self) -> &'static str;

    /// Run the pass on every container, root first, then clusters top-down
    fn run_on_graph(&mut self, graph: &mut Graph, ids: IdCounter) -> (bool, IdCounter) {
        let mut changed = false;
        let mut ids = ids;
        for container in graph.containers_top_down() {
            let (container_changed, next) = self.run_on_container(graph, container, ids);
            changed |= container_changed;
            ids = next;
        }
        (changed, ids)
    }

    /// Rewrite one container's direct children until nothing changes
    fn run_on_container(
        &mut self,
        graph: &mut Graph,
        container: ContainerId,
        ids: IdCounter,
    ) -> (bool, IdCounter);
}

/// The optimizer - runs optimization passes
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl Optimizer {
    pub fn new() -> Self {
        let mut opt = Self { passes: Vec::new() };
        // Register default passes
        opt.add_pass(Box::new(TextMerge::new()));
        opt.add_pass(Box::new(AssertionFold::new()));
        opt.add_pass(Box::new(CaseOptionCleanup::new()));
        opt
    }

    /// Add an optimization pass
    pub fn add_pass(&mut self, pass: Box<dyn OptimizationPass>) {
        self.passes.push(pass);
    }

    /// Run every pass once, in order; each pass reaches its own fixpoint
    pub fn optimize(&mut self, graph: &mut Graph, ids: IdCounter) -> IdCounter {
        let mut ids = ids;
        for pass in &mut self.passes {
            let (changed, next) = pass.run_on_graph(graph, ids);
            debug!("pass {}: changed={}", pass.name(), changed);
            ids = next;
        }
        ids
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `x` by a direct edge: `incoming` now ends where `outgoing` ended,
/// carrying the node's text and the outgoing edge's label.
fn splice_out(graph: &mut Graph, x: NodeId, incoming: EdgeId, outgoing: EdgeId, label: &str, tooltip: &str) {
    let Some(out) = graph.edge(outgoing).cloned() else {
        return;
    };
    if let Some(edge) = graph.edge_mut(incoming) {
        edge.append_text(label, tooltip);
        edge.append_text(&out.label, &out.tooltip);
    }
    graph.set_destination(incoming, out.destination());
    graph.remove_edge(outgoing);
    graph.remove_node(x);
}

// ==================== Text Merge ====================

/// Concatenates chains of text nodes living in the same container
pub struct TextMerge;

impl TextMerge {
    pub fn new() -> Self {
        Self
    }

    /// First `(a, b, edge)` where `b` is text that can be folded into `a`
    fn find_pair(graph: &Graph, container: ContainerId) -> Option<(NodeId, NodeId, EdgeId)> {
        for a in graph.child_nodes(container) {
            let Some(kind) = graph.node(a).map(|n| n.kind) else {
                continue;
            };
            if !kind.is_text() {
                continue;
            }
            let [edge] = graph.outgoing(a) else {
                continue;
            };
            let Some(link) = graph.edge(*edge) else {
                continue;
            };
            let b = link.destination();
            if b == a || !link.label.is_empty() {
                continue;
            }
            let same_kind = graph.node(b).map_or(false, |n| n.kind == kind);
            let same_owner = graph.owner(Item::Node(b)) == Some(container);
            let only_entry = graph.incoming(b) == [*edge];
            if same_kind && same_owner && only_entry {
                return Some((a, b, *edge));
            }
        }
        None
    }

    fn merge(graph: &mut Graph, a: NodeId, b: NodeId, edge: EdgeId) {
        let Some(tail) = graph.node(b).cloned() else {
            return;
        };
        trace!("text merge: {} <- {}", a, b);
        if let Some(head) = graph.node_mut(a) {
            head.label.push_str(&tail.label);
            head.tooltip.push_str(&tail.tooltip);
        }
        graph.remove_edge(edge);
        let leaving: Vec<EdgeId> = graph.outgoing(b).to_vec();
        for e in leaving {
            graph.set_source(e, a);
        }
        graph.remove_node(b);
    }
}

impl OptimizationPass for TextMerge {
    fn name(&self) -> &'static str {
        "text-merge"
    }

    fn run_on_container(
        &mut self,
        graph: &mut Graph,
        container: ContainerId,
        ids: IdCounter,
    ) -> (bool, IdCounter) {
        let mut changed = false;
        while let Some((a, b, edge)) = Self::find_pair(graph, container) {
            Self::merge(graph, a, b, edge);
            changed = true;
        }
        (changed, ids)
    }
}

impl Default for TextMerge {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Assertion Fold ====================

/// Moves zero-width assertions from nodes onto edge labels
pub struct AssertionFold;

/// Where an assertion's neighbours live relative to its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Both neighbours are siblings: remove the node entirely
    Both,
    /// Only the left neighbour is a sibling
    LeftOnly,
    /// Only the right neighbour is a sibling
    RightOnly,
    /// Neither neighbour is a sibling
    Neither,
}

impl AssertionFold {
    pub fn new() -> Self {
        Self
    }

    /// Assertion nodes with at most one edge on each side
    fn find_candidate(graph: &Graph, container: ContainerId) -> Option<NodeId> {
        graph.child_nodes(container).into_iter().find(|id| {
            graph.node(*id).map_or(false, |n| n.kind == NodeKind::Assert)
                && graph.incoming(*id).len() <= 1
                && graph.outgoing(*id).len() <= 1
        })
    }

    fn fold(graph: &mut Graph, container: ContainerId, x: NodeId, ids: IdCounter) -> IdCounter {
        let Some(node) = graph.node(x).cloned() else {
            return ids;
        };
        let incoming = graph.incoming(x).first().copied();
        let outgoing = graph.outgoing(x).first().copied();
        let left = incoming.and_then(|e| graph.edge(e)).map(Edge::source);
        let right = outgoing.and_then(|e| graph.edge(e)).map(Edge::destination);
        let here = |n: Option<NodeId>| {
            n.map_or(false, |n| graph.owner(Item::Node(n)) == Some(container))
        };

        let placement = match (here(left), here(right)) {
            (true, true) => Placement::Both,
            (true, false) => Placement::LeftOnly,
            (false, true) => Placement::RightOnly,
            (false, false) => Placement::Neither,
        };
        trace!("assertion fold: {} ({:?})", x, placement);

        match (placement, incoming, outgoing) {
            (Placement::Both, Some(i), Some(o)) => {
                splice_out(graph, x, i, o, &node.label, &node.tooltip);
                ids
            }
            (Placement::LeftOnly, Some(i), _) => {
                Self::fold_onto(graph, x, i, &node);
                ids
            }
            (Placement::RightOnly, _, Some(o)) => {
                Self::fold_onto(graph, x, o, &node);
                ids
            }
            (Placement::Neither, Some(i), Some(o)) => {
                splice_out(graph, x, i, o, &node.label, &node.tooltip);
                ids
            }
            (Placement::Neither, None, Some(o)) => {
                Self::fold_onto(graph, x, o, &node);
                ids
            }
            _ => Self::trail(graph, container, x, &node, ids),
        }
    }

    /// Move the label onto `edge` and leave a bare point behind
    fn fold_onto(graph: &mut Graph, x: NodeId, edge: EdgeId, node: &Node) {
        if let Some(e) = graph.edge_mut(edge) {
            e.append_text(&node.label, &node.tooltip);
        }
        if let Some(n) = graph.node_mut(x) {
            n.demote_to_point();
        }
    }

    /// End of a branch: the label goes onto a new edge to a new trailing point
    fn trail(graph: &mut Graph, container: ContainerId, x: NodeId, node: &Node, ids: IdCounter) -> IdCounter {
        let (tail, ids) = ids.node();
        let (edge, ids) = ids.edge();
        let mut link = Edge::new(edge, x, tail);
        link.append_text(&node.label, &node.tooltip);

        if let Some(n) = graph.node_mut(x) {
            n.demote_to_point();
        }
        let tail_item = graph.add_node(Node::point(tail));
        let edge_item = graph.add_edge(link);
        graph.place(container, vec![tail_item, edge_item]);
        ids
    }
}

impl OptimizationPass for AssertionFold {
    fn name(&self) -> &'static str {
        "assertion-fold"
    }

    fn run_on_container(
        &mut self,
        graph: &mut Graph,
        container: ContainerId,
        ids: IdCounter,
    ) -> (bool, IdCounter) {
        let mut changed = false;
        let mut ids = ids;
        while let Some(x) = Self::find_candidate(graph, container) {
            ids = Self::fold(graph, container, x, ids);
            changed = true;
        }
        (changed, ids)
    }
}

impl Default for AssertionFold {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Case Option Cleanup ====================

/// Removes any case-switch node that reached the graph
pub struct CaseOptionCleanup;

impl CaseOptionCleanup {
    pub fn new() -> Self {
        Self
    }

    fn remove(graph: &mut Graph, x: NodeId) {
        let ins: Vec<EdgeId> = graph.incoming(x).to_vec();
        let outs: Vec<EdgeId> = graph.outgoing(x).to_vec();
        trace!("case option cleanup: {}", x);
        match (ins.as_slice(), outs.as_slice()) {
            ([i], [o]) => splice_out(graph, x, *i, *o, "", ""),
            (_, [o]) => {
                if let Some(out) = graph.edge(*o).cloned() {
                    for i in &ins {
                        if let Some(edge) = graph.edge_mut(*i) {
                            edge.append_text(&out.label, &out.tooltip);
                        }
                        graph.set_destination(*i, out.destination());
                    }
                }
                graph.remove_node(x);
            }
            ([i], _) => {
                if let Some(inc) = graph.edge(*i).cloned() {
                    for o in &outs {
                        if let Some(edge) = graph.edge_mut(*o) {
                            let label = std::mem::take(&mut edge.label);
                            let tooltip = std::mem::take(&mut edge.tooltip);
                            edge.append_text(&inc.label, &inc.tooltip);
                            edge.append_text(&label, &tooltip);
                        }
                        graph.set_source(*o, inc.source());
                    }
                }
                graph.remove_node(x);
            }
            _ => {
                graph.remove_node(x);
            }
        }
    }
}

impl OptimizationPass for CaseOptionCleanup {
    fn name(&self) -> &'static str {
        "case-option-cleanup"
    }

    fn run_on_container(
        &mut self,
        graph: &mut Graph,
        container: ContainerId,
        ids: IdCounter,
    ) -> (bool, IdCounter) {
        let leftovers: Vec<NodeId> = graph
            .child_nodes(container)
            .into_iter()
            .filter(|id| graph.node(*id).map_or(false, |n| n.kind == NodeKind::OptionCase))
            .collect();
        for x in &leftovers {
            Self::remove(graph, *x);
        }
        (!leftovers.is_empty(), ids)
    }
}

impl Default for CaseOptionCleanup {
    fn default() -> Self {
        Self::new()
    }
}
