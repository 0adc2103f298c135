//! LCM Type Graph Definitions
//!
//! This crate contains the type graph handed over by the schema front end:
//! structs, their ordered members, array dimensions and constants. It provides
//! pure data structures without any layout, hashing or code generation logic.

pub mod schema;
pub mod types;

// Re-export commonly used types at the crate root
pub use schema::*;
pub use types::*;
