pub mod graph;

pub use graph::{Category, Edge, GraphResult, Node};
