//! Backend of the LCM schema compiler.
//!
//! Takes a validated type graph, plans the wire layout of every struct,
//! computes schema fingerprints and produces a language independent
//! [`codegen::shared::plan::CodecPlan`] that renderers turn into source.

pub mod cmds;
pub mod codegen;
pub mod config;
pub mod fingerprint;
pub mod layout;
pub mod schema;

pub use codegen::shared::builder::PlanBuilder;
pub use codegen::shared::plan::CodecPlan;
pub use fingerprint::FingerprintEngine;
pub use layout::LayoutPlanner;
pub use schema::error::SchemaError;
pub use schema::registry::{StructId, StructRegistry};
