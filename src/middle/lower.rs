//! Lowering - regex AST to explaining graph
//!
//! Every part lowers to a fragment with exactly one entry and one exit node.
//! The id counter is passed in and handed back by every call, and siblings
//! are lowered left to right, so ids depend only on the tree and the start
//! value.

use log::{debug, trace};

use crate::frontend::ast::{
    AssertComplex, AssertKind, Branches, CallTarget, ConditionalSubexpression, Part, Pattern,
    Quantifier, Subexpression,
};
use crate::frontend::case::CaseTable;
use crate::middle::graph::{
    Cluster, ClusterId, ContainerId, Edge, Graph, IdCounter, Item, Node, NodeId, NodeKind,
    GRAPH_ID,
};

/// Lowered piece of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Top-level items, not yet placed in a container
    pub items: Vec<Item>,
    pub entry: NodeId,
    pub exit: NodeId,
}

/// Lower a whole pattern into a fresh graph.
///
/// In exact mode the pattern is bracketed by start/end-of-string assertions
/// around a synthetic wrapper group, and the background is tinted.
pub fn lower_pattern(
    pattern: &Pattern,
    case: &CaseTable<'_>,
    exact: bool,
    ids: IdCounter,
) -> (Graph, IdCounter) {
    let mut graph = Graph::new(GRAPH_ID);
    let mut lowerer = Lowerer::new(&mut graph, case);

    let (begin, ids) = ids.node();
    let (end, ids) = ids.node();
    let begin_item = lowerer.graph.add_node(terminal_node(begin, NodeKind::Begin, "begin"));
    let end_item = lowerer.graph.add_node(terminal_node(end, NodeKind::End, "end"));

    let (body, ids) = if exact {
        lowerer.lower_exact(&pattern.branches, ids)
    } else {
        lowerer.lower_branches(&pattern.branches, ids)
    };

    let mut items = vec![begin_item, end_item];
    items.extend(body.items);
    let ids = lowerer.connect(&mut items, begin, body.entry, ids);
    let ids = lowerer.connect(&mut items, body.exit, end, ids);
    graph.place(ContainerId::Root, items);

    if exact {
        graph.bgcolor = "lightblue".to_string();
    }
    debug!(
        "lowered pattern: {} nodes, {} edges, {} clusters",
        graph.node_count(),
        graph.edge_count(),
        graph.cluster_count()
    );
    (graph, ids)
}

fn terminal_node(id: NodeId, kind: NodeKind, label: &str) -> Node {
    let mut node = Node::new(id, kind, label);
    node.tooltip = label.to_string();
    node.shape = "rect".to_string();
    node.color = "purple".to_string();
    node.fillcolor = "purple".to_string();
    node.style = "filled".to_string();
    node
}

/// Lowers parts into an arena graph
pub struct Lowerer<'g, 'a> {
    graph: &'g mut Graph,
    case: &'g CaseTable<'a>,
}

impl<'g, 'a> Lowerer<'g, 'a> {
    pub fn new(graph: &'g mut Graph, case: &'g CaseTable<'a>) -> Self {
        Self { graph, case }
    }

    /// Lower one part
    pub fn lower(&mut self, part: &Part, ids: IdCounter) -> (Fragment, IdCounter) {
        trace!("lowering {} at id {}", part.kind_name(), ids.peek());
        match part {
            Part::Quantifier(q) => self.lower_quantifier(q, ids),
            Part::Subexpression(sub) => self.lower_subexpression(sub, ids),
            Part::AssertComplex(assert) => self.lower_assert_complex(assert, ids),
            Part::ConditionalSubexpression(cond) => self.lower_conditional(cond, ids),
            _ => self.lower_leaf(part, ids),
        }
    }

    /// Lower alternatives: one branch is a chain, several fan out from a
    /// start point and back into a finish point.
    pub fn lower_branches(&mut self, branches: &Branches, ids: IdCounter) -> (Fragment, IdCounter) {
        let all = branches.as_slice();
        if all.len() <= 1 {
            let parts = all.first().map(Vec::as_slice).unwrap_or(&[]);
            return self.lower_sequence(parts, ids);
        }

        let (start, ids) = ids.node();
        let (finish, ids) = ids.node();
        let mut items = vec![self.graph.add_node(Node::point(start))];
        let mut ids = ids;
        for branch in all {
            let (fragment, next) = self.lower_sequence(branch, ids);
            items.extend(fragment.items);
            let next = self.connect(&mut items, start, fragment.entry, next);
            ids = self.connect(&mut items, fragment.exit, finish, next);
        }
        items.push(self.graph.add_node(Node::point(finish)));

        (Fragment { items, entry: start, exit: finish }, ids)
    }

    /// Lower a single branch, chaining each part's exit to the next entry
    pub fn lower_sequence(&mut self, parts: &[Part], ids: IdCounter) -> (Fragment, IdCounter) {
        let mut chained: Option<Fragment> = None;
        let mut ids = ids;
        // case switches were consumed by the case pass
        for part in parts.iter().filter(|p| !matches!(p, Part::OptionCaseSensitivity(_))) {
            let (fragment, next) = self.lower(part, ids);
            ids = next;
            chained = Some(match chained {
                None => fragment,
                Some(mut acc) => {
                    acc.items.extend(fragment.items);
                    ids = self.connect(&mut acc.items, acc.exit, fragment.entry, ids);
                    Fragment { items: acc.items, entry: acc.entry, exit: fragment.exit }
                }
            });
        }
        match chained {
            Some(fragment) => (fragment, ids),
            None => self.point_fragment(ids),
        }
    }

    fn lower_exact(&mut self, branches: &Branches, ids: IdCounter) -> (Fragment, IdCounter) {
        let (start, ids) = self.assert_fragment(AssertKind::StartOfString, ids);
        let (cluster, ids) = ids.cluster();
        let (wrapper, ids) = self.lower_group(cluster, None, true, branches, ids);
        let (end, ids) = self.assert_fragment(AssertKind::EndOfString, ids);

        let mut items = start.items;
        items.extend(wrapper.items);
        items.extend(end.items);
        let ids = self.connect(&mut items, start.exit, wrapper.entry, ids);
        let ids = self.connect(&mut items, wrapper.exit, end.entry, ids);
        (Fragment { items, entry: start.entry, exit: end.exit }, ids)
    }

    // ---------- containers ----------

    fn lower_quantifier(&mut self, q: &Quantifier, ids: IdCounter) -> (Fragment, IdCounter) {
        let (cluster_id, ids) = cluster_id(q.id, ids);
        let (inner, ids) = self.lower_branches(&q.branches, ids);

        let mut cluster = Cluster::new(cluster_id, quantifier_label(q.min(), q.max()));
        cluster.tooltip = format!(
            "{}, {}",
            cluster.label,
            if q.greedy { "greedy" } else { "lazy" }
        );
        cluster.color = "blue".to_string();
        let item = self.graph.add_cluster(cluster, inner.items);

        (Fragment { items: vec![item], entry: inner.entry, exit: inner.exit }, ids)
    }

    fn lower_subexpression(&mut self, sub: &Subexpression, ids: IdCounter) -> (Fragment, IdCounter) {
        let (cluster_id, ids) = cluster_id(sub.id, ids);
        self.lower_group(cluster_id, sub.number, sub.wrapper, &sub.branches, ids)
    }

    fn lower_group(
        &mut self,
        cluster_id: ClusterId,
        number: Option<u32>,
        wrapper: bool,
        branches: &Branches,
        ids: IdCounter,
    ) -> (Fragment, IdCounter) {
        let (inner, ids) = self.lower_branches(branches, ids);

        let label = number.map(|n| format!("subexpression #{}", n)).unwrap_or_default();
        let mut cluster = Cluster::new(cluster_id, label);
        cluster.tooltip = match number {
            Some(_) => cluster.label.clone(),
            None if wrapper => "whole pattern".to_string(),
            None => "group".to_string(),
        };
        cluster.color = if wrapper { "purple" } else { "black" }.to_string();
        let item = self.graph.add_cluster(cluster, inner.items);

        (Fragment { items: vec![item], entry: inner.entry, exit: inner.exit }, ids)
    }

    /// The assertion body hangs off a pass-through cluster: flow goes
    /// `before -> after`, and a colored edge leads from `before` into the
    /// assertion. The body's exit is left unconnected.
    fn lower_assert_complex(&mut self, assert: &AssertComplex, ids: IdCounter) -> (Fragment, IdCounter) {
        let (outer_id, ids) = cluster_id(assert.id, ids);
        let (inner_id, ids) = ids.cluster();
        let (before, ids) = ids.node();
        let (after, ids) = ids.node();
        let (body, ids) = self.lower_branches(&assert.branches, ids);

        let description = assert.kind.description();
        let mut inner = Cluster::new(inner_id, description);
        inner.tooltip = description.to_string();
        inner.bgcolor = "lightgrey".to_string();
        inner.color = "grey".to_string();
        inner.node_defaults.push(("style".to_string(), "dotted".to_string()));
        inner.edge_defaults.push(("style".to_string(), "dashed".to_string()));
        let inner_item = self.graph.add_cluster(inner, body.items);

        let before_item = self.graph.add_node(Node::point(before));
        let after_item = self.graph.add_node(Node::point(after));
        let mut items = vec![before_item, inner_item, after_item];

        let (into_id, ids) = ids.edge();
        let mut into = Edge::new(into_id, before, body.entry);
        into.color = if assert.kind.is_lookahead() { "green" } else { "red" }.to_string();
        into.tooltip = description.to_string();
        items.push(self.graph.add_edge(into));
        let ids = self.connect(&mut items, before, after, ids);

        let mut outer = Cluster::new(outer_id, "");
        outer.color = "transparent".to_string();
        let outer_item = self.graph.add_cluster(outer, items);

        (Fragment { items: vec![outer_item], entry: before, exit: after }, ids)
    }

    fn lower_conditional(
        &mut self,
        cond: &ConditionalSubexpression,
        ids: IdCounter,
    ) -> (Fragment, IdCounter) {
        let (cluster_id, ids) = cluster_id(cond.id, ids);
        let (condition, ids) = self.lower(cond.condition(), ids);
        let mut cluster = Cluster::new(cluster_id, "condition");
        cluster.tooltip = "condition".to_string();
        cluster.color = "darkorange".to_string();
        let condition_item = self.graph.add_cluster(cluster, condition.items);

        let (start, ids) = ids.node();
        let (end, ids) = ids.node();
        let mut items = vec![condition_item, self.graph.add_node(Node::point(start))];
        let ids = self.connect(&mut items, condition.exit, start, ids);

        let ids = self.lower_outcome(&mut items, &cond.branch_true, "true", start, end, ids);
        let ids = self.lower_outcome(&mut items, &cond.branch_false, "false", start, end, ids);
        items.push(self.graph.add_node(Node::point(end)));

        (Fragment { items, entry: condition.entry, exit: end }, ids)
    }

    /// One side of a conditional, reached from `start` by an edge carrying
    /// `label`; an empty side is just the labeled edge to `end`.
    fn lower_outcome(
        &mut self,
        items: &mut Vec<Item>,
        parts: &[Part],
        label: &str,
        start: NodeId,
        end: NodeId,
        ids: IdCounter,
    ) -> IdCounter {
        let lowerable = parts.iter().any(|p| !matches!(p, Part::OptionCaseSensitivity(_)));
        if !lowerable {
            let (edge, ids) = ids.edge();
            items.push(self.graph.add_edge(Edge::labeled(edge, start, end, label)));
            return ids;
        }

        let (fragment, ids) = self.lower_sequence(parts, ids);
        items.extend(fragment.items);
        let (edge, ids) = ids.edge();
        items.push(self.graph.add_edge(Edge::labeled(edge, start, fragment.entry, label)));
        self.connect(items, fragment.exit, end, ids)
    }

    // ---------- leaves ----------

    fn lower_leaf(&mut self, part: &Part, ids: IdCounter) -> (Fragment, IdCounter) {
        let (id, ids) = node_id(part.id(), ids);
        let node = self.leaf_node(part, id);
        let item = self.graph.add_node(node);
        (Fragment { items: vec![item], entry: id, exit: id }, ids)
    }

    fn leaf_node(&self, part: &Part, id: NodeId) -> Node {
        let sensitive = self.case.is_case_sensitive(part);
        let mut node = match part {
            Part::Text(text) => {
                let mut node = Node::new(id, NodeKind::Text { case_sensitive: sensitive }, &text.text);
                node.tooltip = text.text.clone();
                node.shape = "box".to_string();
                node
            }
            Part::Assert(assert) => assert_node(id, assert.kind),
            Part::Charflag(flag) => {
                leaf(id, NodeKind::Charflag, flag.description(), "character class", "blue")
            }
            Part::Backreference(back) => leaf(
                id,
                NodeKind::Backreference,
                format!("backreference #{}", back.number),
                "backreference",
                "darkgreen",
            ),
            Part::SubexpressionCall(call) => {
                let target = match &call.target {
                    Some(CallTarget::Number(n)) => format!("call #{}", n),
                    Some(CallTarget::Name(name)) => format!("call {}", name),
                    None => "call whole pattern".to_string(),
                };
                let label = if call.recursive { format!("recursive {}", target) } else { target };
                leaf(id, NodeKind::Call, label, "subexpression call", "brown")
            }
            Part::CharacterClass(class) => leaf(
                id,
                NodeKind::CharacterClass,
                class.description(),
                "character class",
                "darkcyan",
            ),
            Part::Range(range) => {
                leaf(id, NodeKind::Range, range.description(), "character range", "darkcyan")
            }
            Part::OptionCaseSensitivity(option) => {
                let label = if option.positive { "ignore case" } else { "match case" };
                leaf(id, NodeKind::OptionCase, label, "case option", "grey")
            }
            Part::Quantifier(_)
            | Part::Subexpression(_)
            | Part::AssertComplex(_)
            | Part::ConditionalSubexpression(_) => {
                unreachable!("containers are lowered by their own rules")
            }
        };

        if part.is_case_aware() && !sensitive {
            node.style = "filled".to_string();
            node.fillcolor = "lightyellow".to_string();
            if !node.kind.is_text() {
                node.tooltip.push_str(" (ignore case)");
            }
        }
        node
    }

    // ---------- helpers ----------

    fn assert_fragment(&mut self, kind: AssertKind, ids: IdCounter) -> (Fragment, IdCounter) {
        let (id, ids) = ids.node();
        let item = self.graph.add_node(assert_node(id, kind));
        (Fragment { items: vec![item], entry: id, exit: id }, ids)
    }

    fn point_fragment(&mut self, ids: IdCounter) -> (Fragment, IdCounter) {
        let (id, ids) = ids.node();
        let item = self.graph.add_node(Node::point(id));
        (Fragment { items: vec![item], entry: id, exit: id }, ids)
    }

    /// Add a plain edge `source -> destination` to `items`
    fn connect(
        &mut self,
        items: &mut Vec<Item>,
        source: NodeId,
        destination: NodeId,
        ids: IdCounter,
    ) -> IdCounter {
        let (edge, ids) = ids.edge();
        items.push(self.graph.add_edge(Edge::new(edge, source, destination)));
        ids
    }
}

fn quantifier_label(min: u32, max: Option<u32>) -> String {
    match max {
        Some(max) => format!("from {} to {}", min, max),
        None => format!("from {} to infinity", min),
    }
}

fn assert_node(id: NodeId, kind: AssertKind) -> Node {
    let mut node = leaf(id, NodeKind::Assert, kind.description(), kind.description(), "orange");
    node.shape = "diamond".to_string();
    node
}

fn leaf(id: NodeId, kind: NodeKind, label: impl Into<String>, tooltip: &str, color: &str) -> Node {
    let mut node = Node::new(id, kind, label);
    node.tooltip = tooltip.to_string();
    node.shape = "box".to_string();
    node.color = color.to_string();
    node
}

fn node_id(explicit: Option<u32>, ids: IdCounter) -> (NodeId, IdCounter) {
    match explicit {
        Some(id) => (NodeId(u64::from(id)), ids),
        None => ids.node(),
    }
}

fn cluster_id(explicit: Option<u32>, ids: IdCounter) -> (ClusterId, IdCounter) {
    match explicit {
        Some(id) => (ClusterId(u64::from(id)), ids),
        None => ids.cluster(),
    }
}
