// Re-export from lcm_types so the generator can name the data model locally
pub use lcm_types::{
    Constant, Dimension, Member, PrimitiveType, SchemaFile, SchemaType, StructDef, StructRefType,
};
