//! regviz
//!
//! Turns a regular-expression syntax tree into an explaining graph and
//! prints it as Graphviz DOT.

pub mod feedback;
pub mod frontend;
pub mod middle;
pub mod pipeline;
pub mod utils;

pub use frontend::ast::Pattern;
pub use pipeline::{compile_graph, explain, CompileOptions, CompiledGraph};
pub use utils::{Error, Result};
