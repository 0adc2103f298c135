pub mod functions;
pub mod helpers;
pub mod runtime;
pub mod types;

/* Re-export main public functions */
pub use functions::{accessor_name, emit_functions};
pub use runtime::emit_runtime;
pub use types::{emit_constants, emit_type};
