//! Compilation pipeline: validate, resolve case, lower, optimize, print

use log::debug;
use std::fs;
use std::path::Path;

use crate::feedback::GraphStats;
use crate::frontend::ast::Pattern;
use crate::frontend::case::resolve_case;
use crate::middle::dot_printer::print_dot;
use crate::middle::graph::{Graph, IdCounter};
use crate::middle::lower::lower_pattern;
use crate::middle::optimize::Optimizer;
use crate::utils::{Error, Result};

/// Compilation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Global case-insensitive default
    pub ignore_case: bool,
    /// Wrap the pattern in start/end-of-string assertions
    pub exact: bool,
    /// Run the optimizer passes
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            exact: false,
            optimize: true,
        }
    }
}

/// A compiled graph together with its bookkeeping
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub graph: Graph,
    pub lowered: GraphStats,
    pub optimized: Option<GraphStats>,
    /// First id not used by the graph
    pub next_id: IdCounter,
}

/// Read and validate a JSON syntax tree from disk
pub fn load_pattern(path: &Path) -> Result<Pattern> {
    let source = fs::read_to_string(path)
        .map_err(|err| Error::Io(format!("{}: {}", path.display(), err)))?;
    Pattern::from_json(&source)
}

/// Build the explaining graph for `pattern`. The pattern is only borrowed.
pub fn compile_graph(pattern: &Pattern, options: &CompileOptions) -> Result<CompiledGraph> {
    pattern.validate()?;

    let case = resolve_case(pattern, options.ignore_case);
    debug!("case table: {} case-aware parts", case.len());

    let first = pattern.max_part_id().map_or(1, |max| u64::from(max) + 1);
    let (mut graph, ids) = lower_pattern(pattern, &case, options.exact, IdCounter::new(first));
    let lowered = GraphStats::of(&graph);

    let (optimized, next_id) = if options.optimize {
        let ids = Optimizer::new().optimize(&mut graph, ids);
        (Some(GraphStats::of(&graph)), ids)
    } else {
        (None, ids)
    };
    debug!("compiled graph, next id {}", next_id.peek());

    Ok(CompiledGraph {
        graph,
        lowered,
        optimized,
        next_id,
    })
}

/// Compile `pattern` and print it as DOT text
pub fn explain(pattern: &Pattern, options: &CompileOptions) -> Result<String> {
    let compiled = compile_graph(pattern, options)?;
    Ok(print_dot(&compiled.graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use std::collections::HashSet;

    use crate::frontend::ast::*;
    use crate::middle::graph::NodeKind;

    const WORD: &str = r#"{"branches": [[
        {"type": "assert", "kind": "word_boundary"},
        {"type": "text", "text": "ca"},
        {"type": "text", "text": "t"},
        {"type": "quantifier", "min": 2, "max": 5, "branches": [[{"type": "text", "text": "s"}]]}
    ]]}"#;

    fn semantic_labels(graph: &Graph) -> Vec<String> {
        let mut labels: Vec<String> = graph
            .nodes()
            .filter(|n| !matches!(n.kind, NodeKind::Point | NodeKind::Begin | NodeKind::End))
            .map(|n| n.label.clone())
            .collect();
        labels.sort();
        labels
    }

    #[test]
    fn test_explain_is_deterministic() {
        let pattern = Pattern::from_json(WORD).unwrap();
        let options = CompileOptions::default();
        let first = explain(&pattern, &options).unwrap();
        let second = explain(&pattern, &options).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("digraph \"explaining_graph\" {\n"));
        assert!(first.ends_with("}\n"));
        assert!(first.contains("label=\"from 2 to 5\""));
        assert!(first.contains("label=\"cat\""));
    }

    #[test]
    fn test_word_boundary_folds_into_edge() {
        let pattern = Pattern::from_json(WORD).unwrap();
        let compiled = compile_graph(&pattern, &CompileOptions::default()).unwrap();
        assert_eq!(semantic_labels(&compiled.graph), vec!["cat", "s"]);
        assert!(compiled.graph.edges().any(|e| e.label == "word boundary"));
        assert!(compiled.optimized.is_some());
    }

    #[test]
    fn test_no_optimize_keeps_lowered_graph() {
        let pattern = Pattern::from_json(WORD).unwrap();
        let options = CompileOptions { optimize: false, ..CompileOptions::default() };
        let compiled = compile_graph(&pattern, &options).unwrap();
        assert_eq!(compiled.optimized, None);
        assert_eq!(compiled.lowered, GraphStats::of(&compiled.graph));
        assert_eq!(semantic_labels(&compiled.graph), vec!["ca", "s", "t", "word boundary"]);
    }

    #[test]
    fn test_pattern_unchanged_by_compilation() {
        let mut branches = Branches::new();
        branches.push(Text::new("a"));
        branches.push(OptionCaseSensitivity::new(true));
        branches.push(Text::new("b"));
        let pattern = Pattern::with_branches(branches);
        let before = pattern.clone();

        for ignore_case in [false, true] {
            let options = CompileOptions { ignore_case, exact: true, optimize: true };
            explain(&pattern, &options).unwrap();
        }
        assert_eq!(pattern, before);
    }

    #[test]
    fn test_ids_start_after_explicit_ids() {
        let mut text = Text::new("x");
        text.id = Some(10);
        let pattern = Pattern::with_branches(Branches::single(vec![text.into()]));
        let options = CompileOptions { optimize: false, ..CompileOptions::default() };
        let compiled = compile_graph(&pattern, &options).unwrap();

        let mut ids: Vec<u64> = compiled.graph.nodes().map(|n| n.id.0).collect();
        ids.sort();
        assert_eq!(ids, vec![10, 11, 12]);
        assert!(compiled.next_id.peek() > 12);
    }

    #[test]
    fn test_exact_mode_in_output() {
        let pattern = Pattern::from_json(r#"{"branches": [[{"type": "text", "text": "a"}]]}"#).unwrap();
        let options = CompileOptions { exact: true, ..CompileOptions::default() };
        let dot = explain(&pattern, &options).unwrap();
        assert!(dot.contains("bgcolor=\"lightblue\";"));
        assert!(dot.contains("start of string"));
        assert!(dot.contains("end of string"));
    }

    #[test]
    fn test_invalid_tree_is_rejected() {
        let json = r#"{"branches": [[{"type": "text", "id": 1, "text": "a"}, {"type": "text", "id": 1, "text": "b"}]]}"#;
        let pattern: Pattern = serde_json::from_str(json).unwrap();
        assert_eq!(
            explain(&pattern, &CompileOptions::default()).unwrap_err(),
            Error::DuplicatePartId(1)
        );
    }

    #[test]
    fn test_explicit_id_at_top_of_part_range() {
        let json = r#"{"branches": [[{"type": "text", "id": 4294967295, "text": "a"}]]}"#;
        let pattern = Pattern::from_json(json).unwrap();
        let compiled = compile_graph(&pattern, &CompileOptions::default()).unwrap();

        let text = compiled.graph.nodes().find(|n| n.label == "a").unwrap();
        assert_eq!(text.id.0, u64::from(u32::MAX));
        assert!(compiled.graph.nodes().all(|n| n.id.0 <= u64::from(u32::MAX) + 2));
        assert!(compiled.next_id.peek() > u64::from(u32::MAX) + 1);
        assert!(explain(&pattern, &CompileOptions::default()).is_ok());
    }

    #[test]
    fn test_ids_unique_after_optimization() {
        // the assertion is the whole lookahead body, so folding it adds a trailing point
        let mut lead = Text::new("a");
        lead.id = Some(5);
        let mut body = Assert::new(AssertKind::EndOfString);
        body.id = Some(9);
        let mut look = AssertComplex::new(LookKind::PositiveLookahead, Branches::single(vec![body.into()]));
        look.id = Some(7);
        let pattern = Pattern::with_branches(Branches::single(vec![lead.into(), look.into()]));

        let lowered = compile_graph(&pattern, &CompileOptions { optimize: false, ..CompileOptions::default() })
            .unwrap();
        let compiled = compile_graph(&pattern, &CompileOptions::default()).unwrap();
        let graph = &compiled.graph;
        assert_eq!(graph.node_count(), lowered.graph.node_count() + 1);
        assert!(compiled.next_id.peek() > lowered.next_id.peek());
        assert!(graph.edges().any(|e| e.label == "end of string"));

        let mut seen = HashSet::new();
        for id in graph
            .nodes()
            .map(|n| n.id.0)
            .chain(graph.edges().map(|e| e.id.0))
            .chain(graph.clusters().map(|c| c.id.0))
        {
            assert!(seen.insert(id), "id {} used twice", id);
        }
        assert!(seen.iter().all(|id| *id < compiled.next_id.peek()));
    }

    #[test]
    fn test_load_pattern_reports_io_errors() {
        let missing = std::env::temp_dir().join("regviz-missing-tree.json");
        let err = load_pattern(&missing).unwrap_err();
        assert!(matches!(err, Error::Io(ref message) if message.contains("regviz-missing-tree.json")));
        assert_eq!(err.code(), "E0100");
    }

    #[test]
    fn test_load_pattern_reads_tree() {
        let path = std::env::temp_dir().join(format!("regviz-tree-{}.json", std::process::id()));
        fs::write(&path, WORD).unwrap();
        let pattern = load_pattern(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(pattern, Pattern::from_json(WORD).unwrap());
    }
}
