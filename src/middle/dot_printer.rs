//! DOT Printer - emit an explaining graph as Graphviz text
//!
//! Node names are `nd_<id>`, clusters `cluster_<id>`, and every element gets
//! an `id="graphid_<id>"` attribute so renderers can map SVG back to the graph.

use crate::middle::graph::*;

/// Pretty printer for explaining graphs
pub struct DotPrinter {
    output: String,
    indent: usize,
}

impl DotPrinter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    /// Print a graph to string
    pub fn print_graph(&mut self, graph: &Graph) -> String {
        self.output.clear();
        self.indent = 0;

        self.line(&format!("digraph \"{}\" {{", escape(&graph.id)));
        self.indent += 1;
        if !graph.bgcolor.is_empty() {
            self.line(&format!("bgcolor=\"{}\";", escape(&graph.bgcolor)));
        }
        self.line(&format!("compound={};", graph.compound));
        self.line(&format!("rankdir={};", graph.rankdir));
        self.line(&format!("id=\"graphid_{}\";", escape(&graph.id)));

        self.print_items(graph, graph.items(ContainerId::Root));

        self.indent -= 1;
        self.line("}");
        std::mem::take(&mut self.output)
    }

    fn print_items(&mut self, graph: &Graph, items: &[Item]) {
        for item in items {
            match item {
                Item::Node(id) => {
                    if let Some(node) = graph.node(*id) {
                        self.print_node(node);
                    }
                }
                Item::Edge(id) => {
                    if let Some(edge) = graph.edge(*id) {
                        self.print_edge(edge);
                    }
                }
                Item::Cluster(id) => {
                    if let Some(cluster) = graph.cluster(*id) {
                        self.print_cluster(graph, cluster);
                    }
                }
            }
        }
    }

    /// Print a node statement
    fn print_node(&mut self, node: &Node) {
        let id = format!("graphid_{}", node.id);
        let attrs = attr_list(&[
            ("id", id.as_str()),
            ("label", node.label.as_str()),
            ("tooltip", node.tooltip.as_str()),
            ("shape", node.shape.as_str()),
            ("color", node.color.as_str()),
            ("fillcolor", node.fillcolor.as_str()),
            ("style", node.style.as_str()),
            ("comment", node.kind.tag()),
        ]);
        self.line(&format!("\"nd_{}\" [{}];", node.id, attrs));
    }

    /// Print an edge statement
    fn print_edge(&mut self, edge: &Edge) {
        let id = format!("graphid_{}", edge.id);
        let attrs = attr_list(&[
            ("id", id.as_str()),
            ("label", edge.label.as_str()),
            ("tooltip", edge.tooltip.as_str()),
            ("color", edge.color.as_str()),
            ("style", edge.style.as_str()),
            ("arrowhead", edge.arrowhead.as_str()),
        ]);
        self.line(&format!(
            "\"nd_{}\" -> \"nd_{}\" [{}];",
            edge.source(),
            edge.destination(),
            attrs
        ));
    }

    /// Print a subgraph block
    fn print_cluster(&mut self, graph: &Graph, cluster: &Cluster) {
        self.line(&format!("subgraph \"cluster_{}\" {{", cluster.id));
        self.indent += 1;

        let id = format!("graphid_{}", cluster.id);
        for (key, value) in [
            ("id", id.as_str()),
            ("label", cluster.label.as_str()),
            ("tooltip", cluster.tooltip.as_str()),
            ("bgcolor", cluster.bgcolor.as_str()),
            ("color", cluster.color.as_str()),
            ("style", cluster.style.as_str()),
        ] {
            if !value.is_empty() {
                self.line(&format!("{}=\"{}\";", key, escape(value)));
            }
        }
        self.print_defaults("node", &cluster.node_defaults);
        self.print_defaults("edge", &cluster.edge_defaults);

        self.print_items(graph, cluster.items());

        self.indent -= 1;
        self.line("}");
    }

    fn print_defaults(&mut self, target: &str, defaults: &[(String, String)]) {
        let pairs: Vec<(&str, &str)> = defaults
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let attrs = attr_list(&pairs);
        if !attrs.is_empty() {
            self.line(&format!("{} [{}];", target, attrs));
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }
}

impl Default for DotPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// `key="value"` pairs, skipping empty values
fn attr_list(attrs: &[(&str, &str)]) -> String {
    attrs
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}=\"{}\"", key, escape(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape a value for a double-quoted DOT string
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

/// Convenience function to print a graph
pub fn print_dot(graph: &Graph) -> String {
    let mut printer = DotPrinter::new();
    printer.print_graph(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_graph() -> Graph {
        let mut graph = Graph::default();
        let mut begin = Node::new(NodeId(1), NodeKind::Begin, "begin");
        begin.shape = "rect".to_string();
        let begin = graph.add_node(begin);
        let text = graph.add_node(Node::new(NodeId(2), NodeKind::Text { case_sensitive: true }, "say \"hi\""));
        let mut cluster = Cluster::new(ClusterId(3), "from 0 to 1");
        cluster.node_defaults.push(("style".to_string(), "dotted".to_string()));
        let cluster = graph.add_cluster(cluster, vec![text]);
        let edge = graph.add_edge(Edge::labeled(EdgeId(4), NodeId(1), NodeId(2), "a\\b\nc"));
        graph.place(ContainerId::Root, vec![begin, cluster, edge]);
        graph
    }

    #[test]
    fn test_print_small_graph() {
        let dot = print_dot(&small_graph());
        let expected = r#"digraph "explaining_graph" {
    bgcolor="white";
    compound=true;
    rankdir=LR;
    id="graphid_explaining_graph";
    "nd_1" [id="graphid_1", label="begin", shape="rect", color="black", comment="Begin"];
    subgraph "cluster_3" {
        id="graphid_3";
        label="from 0 to 1";
        node [style="dotted"];
        "nd_2" [id="graphid_2", label="say \"hi\"", shape="ellipse", color="black", comment="Text"];
    }
    "nd_1" -> "nd_2" [id="graphid_4", label="a\\b\nc", tooltip="a\\b\nc"];
}
"#;
        assert_eq!(dot, expected);
    }

    #[test]
    fn test_braces_balance_and_empty_attrs_skipped() {
        let dot = print_dot(&small_graph());
        assert_eq!(dot.matches('{').count(), dot.matches('}').count());
        assert!(!dot.contains("=\"\""));
        assert!(!dot.contains("edge ["));
    }

    #[test]
    fn test_printer_is_reusable() {
        let graph = small_graph();
        let mut printer = DotPrinter::new();
        let first = printer.print_graph(&graph);
        let second = printer.print_graph(&graph);
        assert_eq!(first, second);
    }
}
