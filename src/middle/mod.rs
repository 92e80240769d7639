//! Middle-end module - explaining graph, lowering and optimization

pub mod dot_printer;
pub mod graph;
pub mod lower;
pub mod optimize;
