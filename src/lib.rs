//! Composable shader node graphs compiled to GLSL or WGSL source text.
//!
//! A [`Graph`] records typed expression nodes as Rust code builds them:
//! literals, uniforms and attributes, math, control flow traced from
//! closures, and reusable functions. The same graph then emits a complete
//! shader for either backend, along with a [`BindingManifest`] describing
//! the host-side layout.
//!
//! ```
//! use shader_forge::{Graph, EmitOptions};
//!
//! let g = Graph::new();
//! let tint = g.uniform("u_tint", [1.0f32, 0.5, 0.2])?;
//! let color = g.vec4((tint, 1.0f32))?;
//! let glsl = g.emit_fragment(&color, &EmitOptions::glsl())?;
//! assert!(glsl.contains("uniform vec3 u_tint;"));
//! # Ok::<(), shader_forge::ShaderError>(())
//! ```
//!
//! Emission is deterministic: the same graph and options produce the same
//! bytes every time.

pub mod addons;
mod bindings;
mod emit;
mod error;
mod func;
mod graph;
mod scope;
mod types;
mod value;
pub mod validation;

pub use bindings::{extract_bindings, BindingEntry, BindingKind, BindingManifest};
pub use emit::{
    compile_program, EmitOptions, GlslVersion, Program, ShaderSource, Target,
};
pub use error::{Result, ShaderError};
pub use func::GraphFn;
pub use graph::{Builtin, Expr, ExprArgs, Graph, IntoExpr, StructType};
pub use scope::{IfChain, SwitchChain};
pub use types::{MatrixSize, ScalarKind, StructDef, Type, VectorSize, BOOL, FLOAT, INT, UINT};
pub use value::Value;
