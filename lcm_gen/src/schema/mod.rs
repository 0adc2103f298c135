pub mod error;
pub mod registry;
pub mod struct_graph;
pub mod types;
