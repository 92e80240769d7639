//! Frontend module - regex AST and pre-passes

pub mod ast;
pub mod case;
