//! Code generation.
//!
//! One shared walker turns the node graph into expression and statement
//! text; `glsl` and `wgsl` assemble complete shader sources around it.
//! Emission is deterministic: the same graph object and options always
//! produce byte-identical text, and nothing here ever iterates a hash map
//! into the output.

mod glsl;
mod wgsl;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::bindings::{extract_bindings, BindingKind, BindingManifest};
use crate::error::{Result, ShaderError};
use crate::graph::{
    Builtin, Expr, Graph, GraphInner, MathFn, NodeId, NodeKind,
};
use crate::scope::{pruned_root_scope, Scope, Stmt};
use crate::types::{BinaryOp, ScalarKind, StructDef, Type, UnaryOp};
use crate::value::{format_f32, Value};

/// Output shading language.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Target {
    Glsl,
    Wgsl,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Glsl => "GLSL",
            Target::Wgsl => "WGSL",
        })
    }
}

/// GLSL profile; ES 3.00 unless the caller targets legacy WebGL 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlslVersion {
    Es300,
    Es100,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Stage {
    Vertex,
    Fragment,
    Compute,
}

#[derive(Clone, Debug)]
pub struct EmitOptions {
    pub target: Target,
    pub glsl_version: GlslVersion,
    /// `@workgroup_size` for compute entry points.
    pub workgroup_size: u32,
}

impl EmitOptions {
    pub fn glsl() -> Self {
        EmitOptions {
            target: Target::Glsl,
            glsl_version: GlslVersion::Es300,
            workgroup_size: 32,
        }
    }

    pub fn glsl_es100() -> Self {
        EmitOptions {
            glsl_version: GlslVersion::Es100,
            ..Self::glsl()
        }
    }

    pub fn wgsl() -> Self {
        EmitOptions {
            target: Target::Wgsl,
            ..Self::glsl()
        }
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self::glsl()
    }
}

/// A stage's source: a traced graph expression, or hand-written text that
/// bypasses the graph and is returned verbatim, unvalidated.
#[derive(Clone)]
pub enum ShaderSource {
    Expr(Expr),
    Raw(String),
}

impl From<Expr> for ShaderSource {
    fn from(expr: Expr) -> Self {
        ShaderSource::Expr(expr)
    }
}

impl From<&Expr> for ShaderSource {
    fn from(expr: &Expr) -> Self {
        ShaderSource::Expr(expr.clone())
    }
}

impl From<String> for ShaderSource {
    fn from(text: String) -> Self {
        ShaderSource::Raw(text)
    }
}

impl From<&str> for ShaderSource {
    fn from(text: &str) -> Self {
        ShaderSource::Raw(text.to_string())
    }
}

/// A compiled vertex/fragment pair plus its binding manifest.
#[derive(Clone, Debug)]
pub struct Program {
    pub vertex: String,
    pub fragment: String,
    pub manifest: BindingManifest,
}

/// A vertex-to-fragment interpolated value discovered during emission.
#[derive(Clone, Debug)]
pub(crate) struct VaryingInfo {
    pub name: String,
    pub ty: Type,
    pub source: NodeId,
}

impl Graph {
    fn check_emittable(&self) -> Result<()> {
        let inner = self.inner.borrow();
        if let Some(detail) = &inner.poisoned {
            return Err(ShaderError::ScopeImbalance(detail.clone()));
        }
        if inner.scopes.len() != 1 {
            return Err(ShaderError::ScopeImbalance(
                "a control-flow trace was left open".into(),
            ));
        }
        Ok(())
    }

    /// Emit a fragment shader whose output color is `color` (a `vec4`).
    pub fn emit_fragment(&self, color: &Expr, opts: &EmitOptions) -> Result<String> {
        self.check_emittable()?;
        require_vec4(color, "fragment color")?;
        let inner = self.inner.borrow();
        match opts.target {
            Target::Glsl => glsl::fragment(&inner, color.id, opts).map(|(text, _)| text),
            Target::Wgsl => wgsl::fragment(&inner, color.id, opts).map(|(text, _)| text),
        }
    }

    /// Emit a vertex shader whose clip-space position is `position` (a
    /// `vec4`). Varyings are only wired up by [`compile_program`], which
    /// knows what the fragment stage consumes.
    pub fn emit_vertex(&self, position: &Expr, opts: &EmitOptions) -> Result<String> {
        self.check_emittable()?;
        require_vec4(position, "vertex position")?;
        let inner = self.inner.borrow();
        match opts.target {
            Target::Glsl => glsl::vertex(&inner, position.id, &[], opts),
            Target::Wgsl => wgsl::vertex(&inner, position.id, &[], opts),
        }
    }

    /// Emit a compute shader from the root scope's statements. WGSL only.
    pub fn emit_compute(&self, opts: &EmitOptions) -> Result<String> {
        self.check_emittable()?;
        match opts.target {
            Target::Glsl => Err(ShaderError::UnsupportedBuiltin {
                name: "compute entry point".into(),
                target: Target::Glsl,
            }),
            Target::Wgsl => {
                let inner = self.inner.borrow();
                wgsl::compute(&inner, opts)
            }
        }
    }
}

fn require_vec4(expr: &Expr, what: &'static str) -> Result<()> {
    if expr.ty() == Type::vec4() {
        Ok(())
    } else {
        Err(ShaderError::Type {
            op: what,
            lhs: expr.ty().to_string(),
            rhs: Type::vec4().to_string(),
        })
    }
}

/// Compile a full render program: fragment first (discovering the varyings
/// it consumes), then the vertex stage wired to feed them, plus the
/// manifest covering both stages.
///
/// Raw sources pass through byte-for-byte and contribute nothing to the
/// manifest.
pub fn compile_program(
    vertex: &ShaderSource,
    fragment: &ShaderSource,
    opts: &EmitOptions,
) -> Result<Program> {
    let fragment_expr = match fragment {
        ShaderSource::Expr(e) => Some(e),
        ShaderSource::Raw(_) => None,
    };
    let vertex_expr = match vertex {
        ShaderSource::Expr(e) => Some(e),
        ShaderSource::Raw(_) => None,
    };
    if let (Some(v), Some(f)) = (vertex_expr, fragment_expr) {
        if !Rc::ptr_eq(&v.graph().inner, &f.graph().inner) {
            return Err(ShaderError::MixedGraphs);
        }
    }
    if let Some(e) = fragment_expr {
        e.graph().check_emittable()?;
        require_vec4(e, "fragment color")?;
    }
    if let Some(e) = vertex_expr {
        e.graph().check_emittable()?;
        require_vec4(e, "vertex position")?;
    }

    let (fragment_text, varyings) = match fragment {
        ShaderSource::Raw(text) => (text.clone(), Vec::new()),
        ShaderSource::Expr(e) => {
            let inner = e.graph().inner.borrow();
            match opts.target {
                Target::Glsl => glsl::fragment(&inner, e.id(), opts)?,
                Target::Wgsl => wgsl::fragment(&inner, e.id(), opts)?,
            }
        }
    };

    let vertex_text = match vertex {
        ShaderSource::Raw(text) => text.clone(),
        ShaderSource::Expr(e) => {
            let inner = e.graph().inner.borrow();
            match opts.target {
                Target::Glsl => glsl::vertex(&inner, e.id(), &varyings, opts)?,
                Target::Wgsl => wgsl::vertex(&inner, e.id(), &varyings, opts)?,
            }
        }
    };

    let manifest = match (vertex_expr, fragment_expr) {
        (Some(v), Some(f)) => extract_bindings(v.graph(), &[v, f]),
        (Some(v), None) => extract_bindings(v.graph(), &[v]),
        (None, Some(f)) => extract_bindings(f.graph(), &[f]),
        (None, None) => BindingManifest::default(),
    };

    Ok(Program {
        vertex: vertex_text,
        fragment: fragment_text,
        manifest,
    })
}

/// Per-kind WGSL binding indices, assigned over all declared bindings in
/// declaration order so the vertex and fragment stages of one graph always
/// agree on group layout.
struct WgslSlots {
    uniform: HashMap<usize, u32>,
    texture: HashMap<usize, u32>,
    storage: HashMap<usize, u32>,
    /// `@location` for vertex inputs (attributes and instance attributes).
    attribute: HashMap<usize, u32>,
}

impl WgslSlots {
    fn new(inner: &GraphInner) -> Self {
        let mut slots = WgslSlots {
            uniform: HashMap::new(),
            texture: HashMap::new(),
            storage: HashMap::new(),
            attribute: HashMap::new(),
        };
        let (mut u, mut t, mut s, mut a) = (0, 0, 0, 0);
        for (i, decl) in inner.bindings.iter().enumerate() {
            match decl.kind {
                BindingKind::Uniform => {
                    slots.uniform.insert(i, u);
                    u += 1;
                }
                BindingKind::Texture => {
                    slots.texture.insert(i, t);
                    t += 1;
                }
                BindingKind::Storage => {
                    slots.storage.insert(i, s);
                    s += 1;
                }
                BindingKind::Attribute | BindingKind::Instance => {
                    slots.attribute.insert(i, a);
                    a += 1;
                }
                BindingKind::Constant => {}
            }
        }
        slots
    }
}

/// The shared walker: formats expressions and statements for one stage and
/// target, accumulating header declarations (uniforms, structs, functions)
/// in first-reference order.
pub(crate) struct Emitter<'a> {
    inner: &'a GraphInner,
    target: Target,
    version: GlslVersion,
    stage: Stage,
    headers: Vec<(String, String)>,
    header_keys: HashSet<String>,
    emitted_fns: HashSet<usize>,
    in_function: bool,
    /// Varyings referenced by the fragment stage, in reference order.
    pub varyings: Vec<VaryingInfo>,
    /// Builtins referenced, in reference order (drives WGSL input structs).
    pub used_builtins: Vec<Builtin>,
    /// Vertex-input bindings referenced, in reference order.
    pub used_attributes: Vec<usize>,
    slots: WgslSlots,
}

impl<'a> Emitter<'a> {
    pub fn new(inner: &'a GraphInner, stage: Stage, opts: &EmitOptions) -> Self {
        Emitter {
            inner,
            target: opts.target,
            version: opts.glsl_version,
            stage,
            headers: Vec::new(),
            header_keys: HashSet::new(),
            emitted_fns: HashSet::new(),
            in_function: false,
            varyings: Vec::new(),
            used_builtins: Vec::new(),
            used_attributes: Vec::new(),
            slots: WgslSlots::new(inner),
        }
    }

    pub fn pruned_root(&self, roots: &[NodeId]) -> Scope {
        pruned_root_scope(self.inner, roots)
    }

    pub fn headers_text(&self) -> String {
        let mut out = String::new();
        for (_, text) in &self.headers {
            out.push_str(text);
            out.push('\n');
        }
        out
    }

    fn header(&mut self, key: String, text: String) {
        if self.header_keys.insert(key.clone()) {
            self.headers.push((key, text));
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        match self.target {
            Target::Glsl => ty.glsl(),
            Target::Wgsl => ty.wgsl(),
        }
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Float(v) => format_f32(*v),
            Value::Int(v) => format!("{v}"),
            Value::Uint(v) => format!("{v}u"),
            Value::Bool(v) => format!("{v}"),
            other => {
                let parts: Vec<String> =
                    other.components().iter().map(|c| format_f32(*c)).collect();
                format!("{}({})", self.type_name(&other.ty()), parts.join(", "))
            }
        }
    }

    // ---- expressions ---------------------------------------------------

    /// Text for a node reference: its declared name if it has one, else
    /// its inline definition.
    pub fn expr(&mut self, id: NodeId) -> Result<String> {
        if let Some(name) = &self.inner.node(id).var_name {
            return Ok(name.clone());
        }
        self.expr_def(id)
    }

    /// Text for a node's defining expression, ignoring its declared name.
    pub fn expr_def(&mut self, id: NodeId) -> Result<String> {
        let node = self.inner.node(id);
        match &node.kind {
            NodeKind::Literal(value) => Ok(self.literal(value)),
            NodeKind::Binding(index) => self.binding_ref(*index),
            NodeKind::Builtin(builtin) => self.builtin_ref(*builtin),
            NodeKind::Local => Ok(node
                .var_name
                .clone()
                .unwrap_or_else(|| "_".to_string())),
            NodeKind::Swizzle { base, pattern } => {
                let base = self.expr(*base)?;
                Ok(format!("{base}.{pattern}"))
            }
            NodeKind::Unary { op, expr } => {
                let token = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                };
                let operand = self.expr(*expr)?;
                Ok(format!("({token}{operand})"))
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let ty = self.inner.node(*lhs).ty.clone();
                let a = self.expr(*lhs)?;
                let b = self.expr(*rhs)?;
                if *op == BinaryOp::Mod
                    && ty.is_float_based()
                    && self.target == Target::Glsl
                {
                    return Ok(format!("mod({a}, {b})"));
                }
                Ok(format!("({a} {} {b})", op.token()))
            }
            NodeKind::Math { func, args } => self.math_call(*func, args.clone()),
            NodeKind::Call { func, args } => {
                let name = self.function_def(*func)?;
                let args = args.clone();
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.expr(arg)?);
                }
                Ok(format!("{name}({})", parts.join(", ")))
            }
            NodeKind::Construct { args } => {
                let ty = node.ty.clone();
                let args = args.clone();
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.expr(arg)?);
                }
                Ok(format!("{}({})", self.type_name(&ty), parts.join(", ")))
            }
            NodeKind::Index { base, index } => {
                let base = self.expr(*base)?;
                let index = self.expr(*index)?;
                Ok(format!("{base}[{index}]"))
            }
            NodeKind::Member { base, field } => {
                let field = field.clone();
                let base = self.expr(*base)?;
                Ok(format!("{base}.{field}"))
            }
            NodeKind::StructInit { args } => {
                let ty = node.ty.clone();
                if let Type::Struct(def) = &ty {
                    self.declare_struct(def)?;
                }
                let args = args.clone();
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.expr(arg)?);
                }
                Ok(format!("{}({})", self.type_name(&ty), parts.join(", ")))
            }
            NodeKind::Sample { tex, coords, lod } => self.sample(*tex, *coords, *lod),
            NodeKind::Select {
                cond,
                if_true,
                if_false,
            } => {
                let c = self.expr(*cond)?;
                let a = self.expr(*if_true)?;
                let b = self.expr(*if_false)?;
                match self.target {
                    Target::Glsl => Ok(format!("({c} ? {a} : {b})")),
                    Target::Wgsl => Ok(format!("select({b}, {a}, {c})")),
                }
            }
            NodeKind::Varying { name, source } => {
                let (name, source) = (name.clone(), *source);
                self.varying_ref(&name, &node.ty.clone(), source)
            }
        }
    }

    fn varying_ref(&mut self, name: &str, ty: &Type, source: NodeId) -> Result<String> {
        match self.stage {
            Stage::Vertex => self.expr(source),
            Stage::Compute => Err(ShaderError::MisplacedStatement {
                keyword: "varying",
                context: "render pipeline stage",
            }),
            Stage::Fragment => {
                if self.in_function && self.target == Target::Wgsl {
                    return Err(ShaderError::UnsupportedBuiltin {
                        name: format!("varying `{name}` inside a function body"),
                        target: Target::Wgsl,
                    });
                }
                if !self.varyings.iter().any(|v| v.name == name) {
                    self.varyings.push(VaryingInfo {
                        name: name.to_string(),
                        ty: ty.clone(),
                        source,
                    });
                }
                match self.target {
                    Target::Glsl => {
                        let keyword = match self.version {
                            GlslVersion::Es300 => "in",
                            GlslVersion::Es100 => "varying",
                        };
                        self.header(
                            format!("varying:{name}"),
                            format!("{keyword} {} {name};", ty.glsl()),
                        );
                        Ok(name.to_string())
                    }
                    Target::Wgsl => Ok(format!("input.{name}")),
                }
            }
        }
    }

    fn binding_ref(&mut self, index: usize) -> Result<String> {
        let decl = self.inner.binding(index);
        let name = decl.name.clone();
        let kind = decl.kind;
        let ty = decl.ty.clone();
        let value = decl.value.clone();
        let array_len = decl.array_len;

        match kind {
            BindingKind::Attribute | BindingKind::Instance => {
                if self.stage != Stage::Vertex {
                    return Err(ShaderError::MisplacedStatement {
                        keyword: "attribute",
                        context: "vertex stage",
                    });
                }
                if self.in_function && self.target == Target::Wgsl {
                    return Err(ShaderError::UnsupportedBuiltin {
                        name: format!("attribute `{name}` inside a function body"),
                        target: Target::Wgsl,
                    });
                }
            }
            BindingKind::Storage => {
                if self.target == Target::Glsl {
                    return Err(ShaderError::UnsupportedBuiltin {
                        name: format!("storage buffer `{name}`"),
                        target: Target::Glsl,
                    });
                }
            }
            _ => {}
        }

        match (self.target, kind) {
            (Target::Glsl, BindingKind::Uniform) => {
                self.header(
                    format!("binding:{name}"),
                    format!("uniform {} {name};", ty.glsl()),
                );
                Ok(name)
            }
            (Target::Glsl, BindingKind::Texture) => {
                self.header(
                    format!("binding:{name}"),
                    format!("uniform sampler2D {name};"),
                );
                Ok(name)
            }
            (Target::Glsl, BindingKind::Attribute | BindingKind::Instance) => {
                let keyword = match self.version {
                    GlslVersion::Es300 => "in",
                    GlslVersion::Es100 => "attribute",
                };
                self.header(
                    format!("binding:{name}"),
                    format!("{keyword} {} {name};", ty.glsl()),
                );
                Ok(name)
            }
            (Target::Glsl, BindingKind::Constant) => {
                let value = value.unwrap_or(Value::Float(0.0));
                self.header(
                    format!("binding:{name}"),
                    format!("const {} {name} = {};", ty.glsl(), self.literal(&value)),
                );
                Ok(name)
            }
            (Target::Glsl, BindingKind::Storage) => unreachable!("rejected above"),
            (Target::Wgsl, BindingKind::Uniform) => {
                let slot = self.slots.uniform[&index];
                self.header(
                    format!("binding:{name}"),
                    format!(
                        "@group(0) @binding({slot}) var<uniform> {name}: {};",
                        ty.wgsl()
                    ),
                );
                Ok(name)
            }
            (Target::Wgsl, BindingKind::Texture) => {
                let slot = self.slots.texture[&index];
                self.header(
                    format!("binding:{name}"),
                    format!(
                        "@group(1) @binding({}) var {name}: texture_2d<f32>;\n@group(1) @binding({}) var {name}_sampler: sampler;",
                        2 * slot,
                        2 * slot + 1
                    ),
                );
                Ok(name)
            }
            (Target::Wgsl, BindingKind::Storage) => {
                let slot = self.slots.storage[&index];
                let array = Type::Array(Box::new(ty), array_len);
                self.header(
                    format!("binding:{name}"),
                    format!(
                        "@group(2) @binding({slot}) var<storage, read_write> {name}: {};",
                        array.wgsl()
                    ),
                );
                Ok(name)
            }
            (Target::Wgsl, BindingKind::Attribute | BindingKind::Instance) => {
                if !self.used_attributes.contains(&index) {
                    self.used_attributes.push(index);
                }
                Ok(format!("input.{name}"))
            }
            (Target::Wgsl, BindingKind::Constant) => {
                let value = value.unwrap_or(Value::Float(0.0));
                self.header(
                    format!("binding:{name}"),
                    format!("const {name}: {} = {};", ty.wgsl(), self.literal(&value)),
                );
                Ok(name)
            }
        }
    }

    fn builtin_ref(&mut self, builtin: Builtin) -> Result<String> {
        match (builtin, self.target) {
            (Builtin::PointCoord, Target::Wgsl) => {
                return Err(ShaderError::UnsupportedBuiltin {
                    name: "gl_PointCoord".into(),
                    target: Target::Wgsl,
                });
            }
            (Builtin::GlobalInvocationId, Target::Glsl) => {
                return Err(ShaderError::UnsupportedBuiltin {
                    name: "global_invocation_id".into(),
                    target: Target::Glsl,
                });
            }
            _ => {}
        }

        let (required, context) = match builtin {
            Builtin::FragCoord | Builtin::FrontFacing | Builtin::PointCoord => {
                (Stage::Fragment, "fragment stage")
            }
            Builtin::VertexIndex | Builtin::InstanceIndex => (Stage::Vertex, "vertex stage"),
            Builtin::GlobalInvocationId => (Stage::Compute, "compute stage"),
        };
        if self.stage != required {
            return Err(ShaderError::MisplacedStatement {
                keyword: builtin.name(),
                context,
            });
        }

        match self.target {
            Target::Glsl => match builtin {
                Builtin::FragCoord => Ok("gl_FragCoord".into()),
                Builtin::FrontFacing => Ok("gl_FrontFacing".into()),
                Builtin::PointCoord => Ok("gl_PointCoord".into()),
                Builtin::VertexIndex | Builtin::InstanceIndex => {
                    if self.version == GlslVersion::Es100 {
                        return Err(ShaderError::UnsupportedBuiltin {
                            name: builtin.name().into(),
                            target: Target::Glsl,
                        });
                    }
                    Ok(match builtin {
                        Builtin::VertexIndex => "uint(gl_VertexID)".into(),
                        _ => "uint(gl_InstanceID)".into(),
                    })
                }
                Builtin::GlobalInvocationId => unreachable!("rejected above"),
            },
            Target::Wgsl => {
                if self.in_function {
                    return Err(ShaderError::UnsupportedBuiltin {
                        name: format!("{} inside a function body", builtin.name()),
                        target: Target::Wgsl,
                    });
                }
                if !self.used_builtins.contains(&builtin) {
                    self.used_builtins.push(builtin);
                }
                Ok(format!("input.{}", builtin.name()))
            }
        }
    }

    fn math_call(&mut self, func: MathFn, args: Vec<NodeId>) -> Result<String> {
        if func == MathFn::ArrayLength && self.target == Target::Glsl {
            return Err(ShaderError::UnsupportedBuiltin {
                name: "arrayLength".into(),
                target: Target::Glsl,
            });
        }
        if matches!(func, MathFn::Dfdx | MathFn::Dfdy | MathFn::Fwidth)
            && self.stage != Stage::Fragment
        {
            return Err(ShaderError::MisplacedStatement {
                keyword: func.glsl_name(),
                context: "fragment stage",
            });
        }

        let name = match self.target {
            Target::Glsl => func.glsl_name(),
            Target::Wgsl => func.wgsl_name(),
        };
        if func == MathFn::ArrayLength {
            let buffer = self.expr(args[0])?;
            return Ok(format!("{name}(&{buffer})"));
        }
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.expr(arg)?);
        }
        Ok(format!("{name}({})", parts.join(", ")))
    }

    fn sample(&mut self, tex: NodeId, coords: NodeId, lod: Option<NodeId>) -> Result<String> {
        let tex_name = self.expr(tex)?;
        let uv = self.expr(coords)?;
        match self.target {
            Target::Glsl => match (self.version, lod) {
                (GlslVersion::Es300, None) => Ok(format!("texture({tex_name}, {uv})")),
                (GlslVersion::Es300, Some(lod)) => {
                    let lod = self.expr(lod)?;
                    Ok(format!("textureLod({tex_name}, {uv}, {lod})"))
                }
                (GlslVersion::Es100, None) => Ok(format!("texture2D({tex_name}, {uv})")),
                (GlslVersion::Es100, Some(_)) => Err(ShaderError::UnsupportedBuiltin {
                    name: "textureLod".into(),
                    target: Target::Glsl,
                }),
            },
            Target::Wgsl => match lod {
                None => {
                    if self.stage != Stage::Fragment {
                        // Implicit-derivative sampling needs a fragment
                        // invocation; other stages must fix the level.
                        return Err(ShaderError::MisplacedStatement {
                            keyword: "sample",
                            context: "fragment stage",
                        });
                    }
                    Ok(format!("textureSample({tex_name}, {tex_name}_sampler, {uv})"))
                }
                Some(lod) => {
                    let lod = self.expr(lod)?;
                    Ok(format!(
                        "textureSampleLevel({tex_name}, {tex_name}_sampler, {uv}, {lod})"
                    ))
                }
            },
        }
    }

    fn declare_struct(&mut self, def: &StructDef) -> Result<()> {
        if self.header_keys.contains(&format!("struct:{}", def.name)) {
            return Ok(());
        }
        // Field structs first so the header list stays dependency-ordered.
        for (_, ty) in &def.fields {
            if let Type::Struct(nested) = ty {
                self.declare_struct(nested)?;
            }
        }
        let mut text = format!("struct {} {{\n", def.name);
        for (field, ty) in &def.fields {
            match self.target {
                Target::Glsl => text.push_str(&format!("  {} {field};\n", ty.glsl())),
                Target::Wgsl => text.push_str(&format!("  {field}: {},\n", ty.wgsl())),
            }
        }
        match self.target {
            Target::Glsl => text.push_str("};"),
            Target::Wgsl => text.push_str("}"),
        }
        self.header(format!("struct:{}", def.name), text);
        Ok(())
    }

    /// Emit a registered function's definition (once) and return its name.
    fn function_def(&mut self, index: usize) -> Result<String> {
        let name = self.inner.functions[index].name.clone();
        if self.emitted_fns.contains(&index) {
            return Ok(name);
        }
        self.emitted_fns.insert(index);

        let function = self.inner.functions[index].clone();
        if let Type::Struct(def) = &function.ret {
            self.declare_struct(def)?;
        }
        for param in &function.params {
            if let Type::Struct(def) = &self.inner.node(*param).ty {
                let def = def.clone();
                self.declare_struct(&def)?;
            }
        }

        let was_in_function = self.in_function;
        self.in_function = true;
        let mut body = String::new();
        let result = self.scope_stmts(&function.body, 1, &mut body);
        self.in_function = was_in_function;
        result?;

        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            let node = self.inner.node(*param);
            let pname = node.var_name.clone().unwrap_or_default();
            match self.target {
                Target::Glsl => params.push(format!("{} {pname}", node.ty.glsl())),
                Target::Wgsl => params.push(format!("{pname}: {}", node.ty.wgsl())),
            }
        }
        let signature = match self.target {
            Target::Glsl => format!("{} {name}({})", function.ret.glsl(), params.join(", ")),
            Target::Wgsl => format!(
                "fn {name}({}) -> {}",
                params.join(", "),
                function.ret.wgsl()
            ),
        };
        self.header(format!("fn:{index}"), format!("{signature} {{\n{body}}}"));
        Ok(name)
    }

    // ---- statements ----------------------------------------------------

    pub fn scope_stmts(&mut self, scope: &Scope, indent: usize, out: &mut String) -> Result<()> {
        for stmt in &scope.stmts {
            self.stmt(stmt, indent, out)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt, indent: usize, out: &mut String) -> Result<()> {
        let pad = "  ".repeat(indent);
        match stmt {
            Stmt::Decl { node } => {
                let n = self.inner.node(*node);
                let ty = n.ty.clone();
                let name = n.var_name.clone().unwrap_or_default();
                if let Type::Struct(def) = &ty {
                    let def = def.clone();
                    self.declare_struct(&def)?;
                }
                let init = self.expr_def(*node)?;
                match self.target {
                    Target::Glsl => {
                        out.push_str(&format!("{pad}{} {name} = {init};\n", ty.glsl()))
                    }
                    Target::Wgsl => {
                        out.push_str(&format!("{pad}var {name}: {} = {init};\n", ty.wgsl()))
                    }
                }
            }
            Stmt::Assign { target, value } => {
                let target = self.expr(*target)?;
                let value = self.expr(*value)?;
                out.push_str(&format!("{pad}{target} = {value};\n"));
            }
            Stmt::If {
                cond,
                then,
                elifs,
                else_,
            } => {
                let cond = self.expr(*cond)?;
                out.push_str(&format!("{pad}if ({cond}) {{\n"));
                self.scope_stmts(then, indent + 1, out)?;
                for (cond, scope) in elifs {
                    let cond = self.expr(*cond)?;
                    out.push_str(&format!("{pad}}} else if ({cond}) {{\n"));
                    self.scope_stmts(scope, indent + 1, out)?;
                }
                if let Some(scope) = else_ {
                    out.push_str(&format!("{pad}}} else {{\n"));
                    self.scope_stmts(scope, indent + 1, out)?;
                }
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Loop { count, index, body } => {
                let index_node = self.inner.node(*index);
                let name = index_node.var_name.clone().unwrap_or_default();
                let unsigned = index_node.ty.scalar_kind() == Some(ScalarKind::Uint);
                let count = self.expr(*count)?;
                match (self.target, unsigned) {
                    (Target::Glsl, false) => out.push_str(&format!(
                        "{pad}for (int {name} = 0; {name} < {count}; {name}++) {{\n"
                    )),
                    (Target::Glsl, true) => out.push_str(&format!(
                        "{pad}for (uint {name} = 0u; {name} < {count}; {name}++) {{\n"
                    )),
                    (Target::Wgsl, false) => out.push_str(&format!(
                        "{pad}for (var {name}: i32 = 0; {name} < {count}; {name}++) {{\n"
                    )),
                    (Target::Wgsl, true) => out.push_str(&format!(
                        "{pad}for (var {name}: u32 = 0u; {name} < {count}; {name}++) {{\n"
                    )),
                }
                self.scope_stmts(body, indent + 1, out)?;
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Switch {
                value,
                cases,
                default,
            } => {
                if self.target == Target::Glsl && self.version == GlslVersion::Es100 {
                    return Err(ShaderError::UnsupportedBuiltin {
                        name: "switch".into(),
                        target: Target::Glsl,
                    });
                }
                let unsigned =
                    self.inner.node(*value).ty.scalar_kind() == Some(ScalarKind::Uint);
                let suffix = if unsigned { "u" } else { "" };
                let value = self.expr(*value)?;
                out.push_str(&format!("{pad}switch ({value}) {{\n"));
                for (label, scope) in cases {
                    out.push_str(&format!("{pad}  case {label}{suffix}: {{\n"));
                    self.scope_stmts(scope, indent + 2, out)?;
                    if self.target == Target::Glsl {
                        out.push_str(&format!("{pad}    break;\n"));
                    }
                    out.push_str(&format!("{pad}  }}\n"));
                }
                match default {
                    Some(scope) => {
                        out.push_str(&format!("{pad}  default: {{\n"));
                        self.scope_stmts(scope, indent + 2, out)?;
                        if self.target == Target::Glsl {
                            out.push_str(&format!("{pad}    break;\n"));
                        }
                        out.push_str(&format!("{pad}  }}\n"));
                    }
                    // WGSL requires a default clause on every switch.
                    None if self.target == Target::Wgsl => {
                        out.push_str(&format!("{pad}  default: {{\n{pad}  }}\n"));
                    }
                    None => {}
                }
                out.push_str(&format!("{pad}}}\n"));
            }
            Stmt::Return(value) => match value {
                Some(value) => {
                    let value = self.expr(*value)?;
                    out.push_str(&format!("{pad}return {value};\n"));
                }
                None => out.push_str(&format!("{pad}return;\n")),
            },
            Stmt::Break => out.push_str(&format!("{pad}break;\n")),
            Stmt::Continue => out.push_str(&format!("{pad}continue;\n")),
        }
        Ok(())
    }
}

impl Expr {
    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }
}
