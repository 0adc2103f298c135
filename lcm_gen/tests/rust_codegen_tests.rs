/* Rust Code Generation Tests
 *
 * These tests check the generated Rust source for the shapes every codec
 * relies on: struct fields, fingerprint constants, derived size accessors
 * and the loop nests of size, encode, decode and copy.
 */

use lcm_gen::codegen::renderer::Renderer;
use lcm_gen::codegen::rust::{RustRenderer, RustRendererOptions};
use lcm_gen::codegen::shared::plan::CodecPlan;
use lcm_gen::schema::types::{Constant, Dimension, Member, PrimitiveType, SchemaType, StructDef};
use lcm_gen::{PlanBuilder, StructRegistry};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn plan_for(structs: Vec<StructDef>) -> CodecPlan {
  let registry = StructRegistry::build(structs).expect("valid registry");
  PlanBuilder::new(&registry).build_all().expect("plan builds")
}

fn render_types(structs: Vec<StructDef>) -> String {
  let renderer = RustRenderer::new(RustRendererOptions::default());
  renderer.emit_types(&plan_for(structs)).expect("render types")
}

fn point() -> StructDef {
  StructDef::new(
    "Point",
    0x8000_0000_0000_0001,
    vec![
      Member::primitive("x", PrimitiveType::Int32),
      Member::primitive("y", PrimitiveType::Int32),
    ],
  )
}

fn polyline() -> StructDef {
  StructDef::new(
    "Polyline",
    0x10,
    vec![
      Member::primitive("n", PrimitiveType::Int32),
      Member::array("points", SchemaType::struct_ref("Point"), vec![Dimension::FieldRef("n".into())]),
      Member::array(
        "weights",
        SchemaType::Primitive(PrimitiveType::Double),
        vec![Dimension::FieldRef("n".into())],
      ),
    ],
  )
}

fn msg() -> StructDef {
  StructDef::new(
    "Msg",
    0x10,
    vec![
      Member::primitive("n", PrimitiveType::Int32),
      Member::array("points", SchemaType::struct_ref("Point"), vec![Dimension::FieldRef("n".into())]),
    ],
  )
}

fn empty_bag() -> Vec<StructDef> {
  vec![
    StructDef::new("Empty", 0x80, Vec::new()),
    StructDef::new(
      "Bag",
      0x90,
      vec![
        Member::primitive("n", PrimitiveType::Int32),
        Member::array("items", SchemaType::struct_ref("Empty"), vec![Dimension::FieldRef("n".into())]),
      ],
    ),
  ]
}

fn image() -> StructDef {
  StructDef::new(
    "Image",
    0x20,
    vec![
      Member::primitive("height", PrimitiveType::Int16),
      Member::primitive("label", PrimitiveType::String),
      Member::array(
        "pixels",
        SchemaType::Primitive(PrimitiveType::Byte),
        vec![Dimension::FieldRef("height".into()), Dimension::Constant(3)],
      ),
    ],
  )
}

#[test]
fn fixed_struct_has_plain_fields_and_fingerprint() {
  let source = render_types(vec![point()]);
  assert!(source.contains("use super::lcm_runtime::*;"));
  assert!(source.contains("pub struct Point {\n    pub x: i32,\n    pub y: i32,\n}"));
  assert!(source.contains("pub const BASE_HASH: u64 = 0x8000000000000001;"));
  assert!(source.contains("pub const FINGERPRINT: u64 = 0x0000000000000003;"));
  assert!(source.contains("        size += 4;\n        size += 4;\n"));
  assert!(source.contains("write_i32(out, self.x);"));
  assert!(source.contains("let m_y = reader.read_i32()?;"));
}

#[test]
fn derived_size_member_is_not_stored() {
  let source = render_types(vec![point(), polyline()]);
  assert!(source.contains(
    "pub struct Polyline {\n    pub points: Vec<Point>,\n    pub weights: Vec<f64>,\n}"
  ));
  assert!(source.contains("pub fn n(&self) -> Result<i32, CodecError> {"));
  assert!(source.contains("observe_len(&mut observed, \"n\", \"points\", self.points.len())?;"));
  assert!(source.contains("observe_len(&mut observed, \"n\", \"weights\", self.weights.len())?;"));
}

#[test]
fn encode_recomputes_size_before_writing_it() {
  let source = render_types(vec![point(), polyline()]);
  let derive = source.find("let derived_n = self.n()?;").expect("derive statement");
  let write = source.find("write_i32(out, derived_n);").expect("size write");
  assert!(derive < write);
  assert!(source.contains("for i0 in 0..derived_n as usize {\n            self.points[i0].write_payload(out)?;"));
  assert!(source.contains("write_f64(out, self.weights[i0]);"));
}

#[test]
fn fixed_width_loops_do_not_bind_the_index() {
  let source = render_types(vec![point(), polyline()]);
  assert!(source.contains("for _ in 0..derived_n as usize {\n            size += 8;"));
  assert!(source.contains("size += self.points[i0].size()?;"));
}

#[test]
fn decode_checks_lengths_and_bounds_preallocation() {
  let source = render_types(vec![point(), polyline()]);
  assert!(source.contains("let len_n = checked_len(\"n\", i64::from(reader.read_i32()?))?;"));
  assert!(source.contains("reader.check_count(len_n, 8)?;\n"));
  assert!(source.contains("let mut v0 = Vec::with_capacity(len_n.min(reader.remaining()));"));
  assert!(source.contains("v0.push(Point::read_payload(reader)?);"));
  assert!(source.contains("check_fingerprint(data, Self::FINGERPRINT)?;"));
}

#[test]
fn mixed_dimensions_nest_vec_and_fixed_arrays() {
  let source = render_types(vec![image()]);
  assert!(source.contains("pub pixels: Vec<[u8; 3]>,"));
  assert!(source.contains("pub label: String,"));
  assert!(source.contains("size += string_size(&self.label);"));
  assert!(source.contains("v0.push(into_array::<_, 3>(v1)?);"));
  assert!(source.contains("write_u8(out, self.pixels[i0][i1]);"));
  assert!(source.contains("std::array::from_fn(|i1| self.pixels[i0][i1])"));
}

#[test]
fn nested_fingerprint_calls_children_with_path() {
  let source = render_types(vec![point(), polyline()]);
  assert!(source.contains("hash = hash.wrapping_add(Point::fingerprint_with_path(path));"));
  assert!(source.contains("if path.contains(&Self::BASE_HASH) {"));
}

#[test]
fn constants_become_associated_consts() {
  let mut def = point();
  def.constants.push(Constant {
    name: "ORIGIN_X".into(),
    primitive: PrimitiveType::Int32,
    value: "0".into(),
    comment: Some("Origin column".into()),
  });
  def.constants.push(Constant {
    name: "SCALE".into(),
    primitive: PrimitiveType::Double,
    value: "2".into(),
    comment: None,
  });
  let source = render_types(vec![def]);
  assert!(source.contains("    /// Origin column\n    pub const ORIGIN_X: i32 = 0;"));
  assert!(source.contains("pub const SCALE: f64 = 2.0;"));
}

#[test]
fn reserved_member_names_get_escaped_accessors() {
  let def = StructDef::new(
    "Blob",
    0x30,
    vec![
      Member::primitive("size", PrimitiveType::Int64),
      Member::array("type", SchemaType::Primitive(PrimitiveType::Byte), vec![Dimension::FieldRef("size".into())]),
    ],
  );
  let source = render_types(vec![def]);
  assert!(source.contains("pub fn size_value(&self) -> Result<i64, CodecError> {"));
  assert!(source.contains("pub r#type: Vec<u8>,"));
  assert!(source.contains("let derived_size = self.size_value()?;"));
}

#[test]
fn comments_can_be_disabled() {
  let mut def = point();
  def.comment = Some("A point on the grid".into());
  let renderer = RustRenderer::new(RustRendererOptions {
    runtime_module: "wire".into(),
    emit_comments: false,
  });
  let source = renderer.emit_types(&plan_for(vec![def])).unwrap();
  assert!(source.starts_with("use super::wire::*;"));
  assert!(!source.contains("///"));
}

#[test]
fn render_produces_runtime_and_types_units() {
  let renderer = RustRenderer::new(RustRendererOptions::default());
  let units = renderer.render(&plan_for(vec![point()])).unwrap();
  let names: Vec<_> = units.iter().map(|unit| unit.name.as_str()).collect();
  assert_eq!(names, vec!["lcm_runtime", "types"]);
  let runtime = &units[0].source;
  assert!(runtime.contains("pub enum CodecError"));
  assert!(runtime.contains("pub fn check_fingerprint"));
  assert!(runtime.contains("pub fn write_string"));
  assert!(runtime.contains("pub fn check_count(&self, count: usize, min_width: usize)"));
  assert!(runtime.contains("return Err(CodecError::MissingTerminator);"));
}

#[test]
fn empty_element_loops_bound_count_by_remaining_bytes() {
  let source = render_types(empty_bag());
  assert!(source.contains("pub struct Empty;"));
  assert!(source.contains("reader.check_count(len_n, 0)?;"));
}

/* Driver compiled next to the generated units. Exits non-zero on any failed
   assertion. */
const DRIVER: &str = r#"mod lcm_runtime;
mod types;

use lcm_runtime::CodecError;
use types::*;

fn main() {
    let point = Point { x: 3, y: -4 };
    assert_eq!(Point::fingerprint(), 3);
    assert_eq!(point.size().unwrap(), 8);
    let bytes = point.encode().unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 3, 0xFF, 0xFF, 0xFF, 0xFC]);
    assert_eq!(Point::decode(&bytes).unwrap(), point);

    let msg = Msg { points: vec![Point { x: 1, y: 2 }, point.clone()] };
    assert_eq!(msg.n().unwrap(), 2);
    assert_eq!(msg.size().unwrap(), 20);
    let bytes = msg.encode().unwrap();
    assert_eq!(bytes.len(), 28);
    assert_eq!(&bytes[8..12], &[0, 0, 0, 2]);
    assert_eq!(&bytes[12..20], &[0, 0, 0, 1, 0, 0, 0, 2]);
    assert_eq!(Msg::decode(&bytes).unwrap(), msg);
    assert_eq!(msg.deep_copy(), msg);

    let bag = Bag { items: vec![Empty, Empty] };
    let bytes = bag.encode().unwrap();
    assert_eq!(&bytes[8..], &[0, 0, 0, 2]);
    assert_eq!(Bag::decode(&bytes).unwrap(), bag);

    let mut forged = Bag::fingerprint().to_be_bytes().to_vec();
    forged.extend_from_slice(&[2, 0, 0, 0]);
    assert!(matches!(Bag::decode(&forged), Err(CodecError::ImplausibleCount { .. })));

    let label = Label { name: "lcm".to_string() };
    let bytes = label.encode().unwrap();
    assert_eq!(&bytes[8..], &[0, 0, 0, 4, b'l', b'c', b'm', 0]);
    assert_eq!(Label::decode(&bytes).unwrap(), label);
    let mut unterminated = bytes.clone();
    unterminated[15] = b'!';
    assert_eq!(Label::decode(&unterminated), Err(CodecError::MissingTerminator));

    let mut truncated = Msg::fingerprint().to_be_bytes().to_vec();
    truncated.extend_from_slice(&i32::MAX.to_be_bytes());
    assert!(matches!(Msg::decode(&truncated), Err(CodecError::TooShort { .. })));
}
"#;

/* Write the rendered units into a throwaway binary crate, then build and run it */
fn run_generated(structs: Vec<StructDef>) -> Result<(), String> {
  let renderer = RustRenderer::new(RustRendererOptions::default());
  let units = renderer.render(&plan_for(structs)).map_err(|e| format!("render failed: {e}"))?;

  let project = TempDir::new().map_err(|e| format!("Failed to create temp dir: {e}"))?;
  let src_dir = project.path().join("src");
  fs::create_dir_all(&src_dir).map_err(|e| format!("Failed to create src: {e}"))?;

  let cargo_toml = r#"[package]
name = "generated_codec_check"
version = "0.1.0"
edition = "2021"

[workspace]
"#;
  fs::write(project.path().join("Cargo.toml"), cargo_toml)
    .map_err(|e| format!("Failed to write Cargo.toml: {e}"))?;
  for unit in &units {
    let contents = format!("#![allow(dead_code, unused)]\n\n{}", unit.source);
    fs::write(src_dir.join(format!("{}.rs", unit.name)), contents)
      .map_err(|e| format!("Failed to write {}.rs: {e}", unit.name))?;
  }
  fs::write(src_dir.join("main.rs"), DRIVER).map_err(|e| format!("Failed to write main.rs: {e}"))?;

  let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
  let output = Command::new(cargo)
    .arg("run")
    .arg("--quiet")
    .arg("--manifest-path")
    .arg(project.path().join("Cargo.toml"))
    .env("CARGO_TARGET_DIR", project.path().join("target"))
    .output()
    .map_err(|e| format!("Failed to run cargo: {e}"))?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    return Err(format!("Generated code failed to build or run:\n{stderr}"));
  }
  Ok(())
}

#[test]
fn generated_code_compiles_and_matches_wire_bytes() {
  let label = StructDef::new("Label", 0x40, vec![Member::primitive("name", PrimitiveType::String)]);
  let mut structs = vec![point(), msg(), label];
  structs.extend(empty_bag());
  if let Err(message) = run_generated(structs) {
    panic!("{message}");
  }
}
