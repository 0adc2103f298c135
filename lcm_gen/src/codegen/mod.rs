pub mod plan_json;
pub mod renderer;
pub mod rust;
pub mod rust_gen;
pub mod shared;

pub use renderer::{Language, RenderError, RenderedUnit, Renderer, renderers_for};
