//! The expression-node arena and the builder handles over it.
//!
//! A [`Graph`] owns an arena of immutable typed nodes. Public [`Expr`]
//! handles are cheap (graph reference + index) and expose the builder
//! methods — operators, math calls, swizzles, casts, `to_var` — that
//! allocate further nodes. Shared subexpressions are shared by index, so
//! the arena forms a DAG rather than a tree.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::bindings::BindingKind;
use crate::error::{Result, ShaderError};
use crate::func::Function;
use crate::scope::{Scope, Stmt};
use crate::types::{
    self, BinaryOp, ScalarKind, StructDef, Type, UnaryOp, VectorSize, resolve_binary,
    resolve_unary,
};
use crate::value::Value;

/// Index of a node in the graph's arena.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shader builtin variables.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Builtin {
    /// Fragment coordinate (`gl_FragCoord` / `@builtin(position)`).
    FragCoord,
    VertexIndex,
    InstanceIndex,
    FrontFacing,
    /// GLSL only: `gl_PointCoord`.
    PointCoord,
    /// WGSL only: compute-shader invocation id.
    GlobalInvocationId,
}

impl Builtin {
    pub(crate) fn ty(self) -> Type {
        match self {
            Builtin::FragCoord => Type::vec4(),
            Builtin::VertexIndex | Builtin::InstanceIndex => types::UINT,
            Builtin::FrontFacing => types::BOOL,
            Builtin::PointCoord => Type::vec2(),
            Builtin::GlobalInvocationId => Type::vec(ScalarKind::Uint, VectorSize::N3),
        }
    }

    /// The spelling used in WGSL `@builtin(...)` attributes and diagnostics.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Builtin::FragCoord => "position",
            Builtin::VertexIndex => "vertex_index",
            Builtin::InstanceIndex => "instance_index",
            Builtin::FrontFacing => "front_facing",
            Builtin::PointCoord => "point_coord",
            Builtin::GlobalInvocationId => "global_invocation_id",
        }
    }
}

/// Builtin math functions with portable semantics (plus a few that only one
/// backend accepts, rejected at emission time on the other).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MathFn {
    Abs,
    Acos,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Clamp,
    Cos,
    Cosh,
    Cross,
    Degrees,
    Dfdx,
    Dfdy,
    Distance,
    Dot,
    Exp,
    Exp2,
    Floor,
    Fract,
    Fwidth,
    InverseSqrt,
    Length,
    Log,
    Log2,
    Max,
    Min,
    Mix,
    Normalize,
    Pow,
    Radians,
    Reflect,
    Refract,
    Round,
    Sign,
    Sin,
    Sinh,
    Smoothstep,
    Sqrt,
    Step,
    Tan,
    Tanh,
    Trunc,
    /// WGSL only: runtime length of a storage array.
    ArrayLength,
}

impl MathFn {
    pub(crate) fn glsl_name(self) -> &'static str {
        match self {
            MathFn::Atan2 => "atan",
            MathFn::InverseSqrt => "inversesqrt",
            MathFn::Dfdx => "dFdx",
            MathFn::Dfdy => "dFdy",
            MathFn::ArrayLength => "arrayLength",
            other => other.common_name(),
        }
    }

    pub(crate) fn wgsl_name(self) -> &'static str {
        match self {
            MathFn::Atan2 => "atan2",
            MathFn::InverseSqrt => "inverseSqrt",
            MathFn::Dfdx => "dpdx",
            MathFn::Dfdy => "dpdy",
            MathFn::ArrayLength => "arrayLength",
            other => other.common_name(),
        }
    }

    fn common_name(self) -> &'static str {
        match self {
            MathFn::Abs => "abs",
            MathFn::Acos => "acos",
            MathFn::Asin => "asin",
            MathFn::Atan => "atan",
            MathFn::Ceil => "ceil",
            MathFn::Clamp => "clamp",
            MathFn::Cos => "cos",
            MathFn::Cosh => "cosh",
            MathFn::Cross => "cross",
            MathFn::Degrees => "degrees",
            MathFn::Distance => "distance",
            MathFn::Dot => "dot",
            MathFn::Exp => "exp",
            MathFn::Exp2 => "exp2",
            MathFn::Floor => "floor",
            MathFn::Fract => "fract",
            MathFn::Fwidth => "fwidth",
            MathFn::Length => "length",
            MathFn::Log => "log",
            MathFn::Log2 => "log2",
            MathFn::Max => "max",
            MathFn::Min => "min",
            MathFn::Mix => "mix",
            MathFn::Normalize => "normalize",
            MathFn::Pow => "pow",
            MathFn::Radians => "radians",
            MathFn::Reflect => "reflect",
            MathFn::Refract => "refract",
            MathFn::Round => "round",
            MathFn::Sign => "sign",
            MathFn::Sin => "sin",
            MathFn::Sinh => "sinh",
            MathFn::Smoothstep => "smoothstep",
            MathFn::Sqrt => "sqrt",
            MathFn::Step => "step",
            MathFn::Tan => "tan",
            MathFn::Tanh => "tanh",
            MathFn::Trunc => "trunc",
            MathFn::Atan2
            | MathFn::InverseSqrt
            | MathFn::Dfdx
            | MathFn::Dfdy
            | MathFn::ArrayLength => unreachable!("spelled per target"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Literal(Value),
    /// Index into [`GraphInner::bindings`].
    Binding(usize),
    Builtin(Builtin),
    /// A named local introduced by the tracer (function parameter, loop
    /// index). The name lives in the node's `var_name` slot.
    Local,
    Swizzle {
        base: NodeId,
        pattern: String,
    },
    Unary {
        op: UnaryOp,
        expr: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Math {
        func: MathFn,
        args: Vec<NodeId>,
    },
    /// Call into a registered [`Function`].
    Call {
        func: usize,
        args: Vec<NodeId>,
    },
    /// Type constructor / explicit cast: `vec4(uv, 0.0, 1.0)`.
    Construct {
        args: Vec<NodeId>,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    Member {
        base: NodeId,
        field: String,
    },
    StructInit {
        args: Vec<NodeId>,
    },
    Sample {
        tex: NodeId,
        coords: NodeId,
        lod: Option<NodeId>,
    },
    Select {
        cond: NodeId,
        if_true: NodeId,
        if_false: NodeId,
    },
    /// Vertex-stage value consumed by the fragment stage.
    Varying {
        name: String,
        source: NodeId,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    /// Declared-name slot set by `to_var`; also holds the names of
    /// tracer-introduced locals.
    pub var_name: Option<String>,
}

/// A declared external input (uniform/attribute/instance/storage/texture)
/// or baked constant.
#[derive(Clone, Debug)]
pub(crate) struct BindingDecl {
    pub name: String,
    pub kind: BindingKind,
    /// Value type; element type for storage buffers.
    pub ty: Type,
    pub value: Option<Value>,
    /// Storage length in elements, 0 = runtime-sized.
    pub array_len: u32,
    pub node: NodeId,
}

pub(crate) struct GraphInner {
    pub nodes: Vec<Node>,
    /// Scope stack; index 0 is the root scope and must be the only frame
    /// left when source text is requested.
    pub scopes: Vec<Scope>,
    pub functions: Vec<Function>,
    pub bindings: Vec<BindingDecl>,
    binding_index: HashMap<String, usize>,
    used_names: HashSet<String>,
    next_local: u32,
    next_fn: u32,
    pub loop_depth: u32,
    pub fn_depth: u32,
    /// Set when a trace body fails; emission refuses to run afterwards.
    pub poisoned: Option<String>,
}

impl GraphInner {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn binding(&self, index: usize) -> &BindingDecl {
        &self.bindings[index]
    }

    pub fn current_scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    pub fn alloc_name(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while !self.used_names.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        candidate
    }

    pub fn alloc_local_name(&mut self) -> String {
        loop {
            let candidate = format!("v{}", self.next_local);
            self.next_local += 1;
            if self.used_names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn alloc_fn_name(&mut self) -> String {
        loop {
            let candidate = format!("fn{}", self.next_fn);
            self.next_fn += 1;
            if self.used_names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// A shader graph under construction.
///
/// Cloning a `Graph` clones the handle, not the arena; all clones share
/// one single-threaded construction session.
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Rc<RefCell<GraphInner>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: Rc::new(RefCell::new(GraphInner {
                nodes: Vec::new(),
                scopes: vec![Scope::default()],
                functions: Vec::new(),
                bindings: Vec::new(),
                binding_index: HashMap::new(),
                used_names: HashSet::new(),
                next_local: 0,
                next_fn: 0,
                loop_depth: 0,
                fn_depth: 0,
                poisoned: None,
            })),
        }
    }

    pub(crate) fn push_node(&self, kind: NodeKind, ty: Type) -> Expr {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len() as u32);
        inner.nodes.push(Node {
            kind,
            ty,
            var_name: None,
        });
        Expr {
            graph: self.clone(),
            id,
        }
    }

    pub(crate) fn ty_of(&self, id: NodeId) -> Type {
        self.inner.borrow().node(id).ty.clone()
    }

    // ---- literals ------------------------------------------------------

    /// A literal node; the value's shape fixes its type.
    pub fn lit(&self, value: impl Into<Value>) -> Expr {
        let value = value.into();
        // Bad literals surface when emission is requested.
        if let Err(err) = value.check_finite() {
            self.poison(&err.to_string());
        }
        let ty = value.ty();
        self.push_node(NodeKind::Literal(value), ty)
    }

    pub fn float(&self, v: f32) -> Expr {
        self.lit(v)
    }

    pub fn int(&self, v: i32) -> Expr {
        self.lit(v)
    }

    pub fn uint(&self, v: u32) -> Expr {
        self.lit(v)
    }

    pub fn boolean(&self, v: bool) -> Expr {
        self.lit(v)
    }

    // ---- constructors --------------------------------------------------

    /// Core constructor/cast node: builds `ty(args...)`, checking component
    /// counts and constructor legality.
    pub fn construct(&self, ty: Type, args: Vec<Expr>) -> Result<Expr> {
        let arg_tys: Vec<Type> = args.iter().map(Expr::ty).collect();
        check_construct(&ty, &arg_tys)?;
        let ids = args.iter().map(|a| a.id).collect();
        Ok(self.push_node(NodeKind::Construct { args: ids }, ty))
    }

    pub fn vec2(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::vec2(), args.into_exprs(self))
    }

    pub fn vec3(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::vec3(), args.into_exprs(self))
    }

    pub fn vec4(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::vec4(), args.into_exprs(self))
    }

    pub fn ivec2(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(
            Type::vec(ScalarKind::Int, VectorSize::N2),
            args.into_exprs(self),
        )
    }

    pub fn ivec3(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(
            Type::vec(ScalarKind::Int, VectorSize::N3),
            args.into_exprs(self),
        )
    }

    pub fn uvec2(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(
            Type::vec(ScalarKind::Uint, VectorSize::N2),
            args.into_exprs(self),
        )
    }

    pub fn uvec3(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(
            Type::vec(ScalarKind::Uint, VectorSize::N3),
            args.into_exprs(self),
        )
    }

    pub fn mat2(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::mat2(), args.into_exprs(self))
    }

    pub fn mat3(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::mat3(), args.into_exprs(self))
    }

    pub fn mat4(&self, args: impl ExprArgs) -> Result<Expr> {
        self.construct(Type::mat4(), args.into_exprs(self))
    }

    // ---- bindings ------------------------------------------------------

    fn declare_binding(
        &self,
        name: &str,
        kind: BindingKind,
        ty: Type,
        node_ty: Type,
        value: Option<Value>,
        array_len: u32,
    ) -> Result<Expr> {
        if let Some(v) = &value {
            v.check_finite()?;
        }
        {
            let inner = self.inner.borrow();
            if let Some(&idx) = inner.binding_index.get(name) {
                let existing = inner.binding(idx);
                if existing.kind == kind && existing.ty == ty {
                    // Redeclaration with an identical shape is memoized.
                    return Ok(Expr {
                        graph: self.clone(),
                        id: existing.node,
                    });
                }
                return Err(ShaderError::DuplicateBinding {
                    name: name.to_string(),
                    existing: existing.ty.to_string(),
                    requested: ty.to_string(),
                });
            }
        }
        let mut inner = self.inner.borrow_mut();
        inner.used_names.insert(name.to_string());
        let index = inner.bindings.len();
        let id = NodeId(inner.nodes.len() as u32);
        inner.nodes.push(Node {
            kind: NodeKind::Binding(index),
            ty: node_ty,
            var_name: None,
        });
        inner.bindings.push(BindingDecl {
            name: name.to_string(),
            kind,
            ty,
            value,
            array_len,
            node: id,
        });
        inner.binding_index.insert(name.to_string(), index);
        Ok(Expr {
            graph: self.clone(),
            id,
        })
    }

    /// A host-settable uniform with an initial value.
    pub fn uniform(&self, name: &str, value: impl Into<Value>) -> Result<Expr> {
        let value = value.into();
        let ty = value.ty();
        self.declare_binding(name, BindingKind::Uniform, ty.clone(), ty, Some(value), 0)
    }

    /// Update the host-side value of a declared uniform.
    pub fn set_uniform(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        value.check_finite()?;
        let mut inner = self.inner.borrow_mut();
        let Some(&idx) = inner.binding_index.get(name) else {
            return Err(ShaderError::UnknownBinding(name.to_string()));
        };
        let decl = &inner.bindings[idx];
        if decl.kind != BindingKind::Uniform || decl.ty != value.ty() {
            return Err(ShaderError::DuplicateBinding {
                name: name.to_string(),
                existing: decl.ty.to_string(),
                requested: value.ty().to_string(),
            });
        }
        inner.bindings[idx].value = Some(value);
        Ok(())
    }

    /// A per-vertex attribute of the given type.
    pub fn attribute(&self, name: &str, ty: Type) -> Result<Expr> {
        self.declare_binding(name, BindingKind::Attribute, ty.clone(), ty, None, 0)
    }

    /// A per-instance attribute of the given type.
    pub fn instance_attribute(&self, name: &str, ty: Type) -> Result<Expr> {
        self.declare_binding(name, BindingKind::Instance, ty.clone(), ty, None, 0)
    }

    /// A read/write storage buffer of `len` elements (0 = runtime-sized).
    pub fn storage(&self, name: &str, element: Type, len: u32) -> Result<Expr> {
        let node_ty = Type::Array(Box::new(element.clone()), len);
        self.declare_binding(name, BindingKind::Storage, element, node_ty, None, len)
    }

    /// A 2D texture binding (sampler pair on WGSL).
    pub fn texture(&self, name: &str) -> Result<Expr> {
        self.declare_binding(
            name,
            BindingKind::Texture,
            Type::Texture2D,
            Type::Texture2D,
            None,
            0,
        )
    }

    /// A compile-time constant baked into the emitted source.
    pub fn constant(&self, name: &str, value: impl Into<Value>) -> Result<Expr> {
        let value = value.into();
        let ty = value.ty();
        self.declare_binding(name, BindingKind::Constant, ty.clone(), ty, Some(value), 0)
    }

    pub fn builtin(&self, builtin: Builtin) -> Expr {
        self.push_node(NodeKind::Builtin(builtin), builtin.ty())
    }

    /// Mark an expression as computed in the vertex stage and interpolated
    /// into the fragment stage.
    pub fn vertex_stage(&self, source: &Expr, name: &str) -> Result<Expr> {
        let ty = source.ty();
        if !matches!(ty, Type::Scalar(_) | Type::Vector(..)) {
            return Err(ShaderError::Type {
                op: "vertex_stage",
                lhs: ty.to_string(),
                rhs: "()".into(),
            });
        }
        let name = self.inner.borrow_mut().alloc_name(name);
        Ok(self.push_node(
            NodeKind::Varying {
                name,
                source: source.id,
            },
            ty,
        ))
    }

    /// Define a named struct type usable for locals and function values.
    pub fn struct_def(&self, name: &str, fields: Vec<(String, Type)>) -> StructType {
        let name = self.inner.borrow_mut().alloc_name(name);
        StructType {
            graph: self.clone(),
            def: StructDef { name, fields },
        }
    }

    pub(crate) fn poison(&self, detail: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.poisoned.is_none() {
            inner.poisoned = Some(detail.to_string());
        }
    }
}

/// A struct type handle; `init` builds instances.
#[derive(Clone)]
pub struct StructType {
    graph: Graph,
    def: StructDef,
}

impl StructType {
    pub fn ty(&self) -> Type {
        Type::Struct(Box::new(self.def.clone()))
    }

    /// Construct an instance from ordered field initializers.
    pub fn init(&self, args: impl ExprArgs) -> Result<Expr> {
        let args = args.into_exprs(&self.graph);
        if args.len() != self.def.fields.len() {
            return Err(ShaderError::ComponentCount {
                ty: self.def.name.clone(),
                expected: self.def.fields.len() as u32,
                found: args.len() as u32,
            });
        }
        for (arg, (field, field_ty)) in args.iter().zip(&self.def.fields) {
            if &arg.ty() != field_ty {
                return Err(ShaderError::Type {
                    op: "struct field",
                    lhs: field_ty.to_string(),
                    rhs: format!("{} (field `{field}`)", arg.ty()),
                });
            }
        }
        let ids = args.iter().map(|a| a.id).collect();
        Ok(self
            .graph
            .push_node(NodeKind::StructInit { args: ids }, self.ty()))
    }
}

fn check_construct(target: &Type, args: &[Type]) -> Result<()> {
    let expected = target.component_count();
    let found: u32 = args.iter().map(Type::component_count).sum();
    let mismatch = || ShaderError::ComponentCount {
        ty: target.to_string(),
        expected,
        found,
    };
    match target {
        Type::Scalar(_) => {
            if args.len() == 1 && args[0].is_scalar() {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
        Type::Vector(_, n) => {
            // A single scalar splats; a same-arity vector converts kinds;
            // otherwise components must add up exactly. Narrowing a wider
            // vector takes a swizzle, never a constructor.
            if args.len() == 1 {
                return match &args[0] {
                    Type::Scalar(_) => Ok(()),
                    Type::Vector(_, m) if m == n => Ok(()),
                    _ => Err(mismatch()),
                };
            }
            if args.is_empty() || found != n.count() {
                return Err(mismatch());
            }
            if args
                .iter()
                .all(|a| matches!(a, Type::Scalar(_) | Type::Vector(..)))
            {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
        Type::Matrix(m) => {
            let columns_ok = args.len() == m.dim() as usize
                && args
                    .iter()
                    .all(|a| matches!(a, Type::Vector(ScalarKind::Float, n) if *n == m.vector()));
            let scalars_ok = found == expected
                && !args.is_empty()
                && args
                    .iter()
                    .all(|a| matches!(a, Type::Scalar(ScalarKind::Float)));
            if columns_ok || scalars_ok {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
        _ => Err(mismatch()),
    }
}

/// Conversion into an [`Expr`] on a given graph, so builder methods accept
/// plain numbers alongside expression handles.
pub trait IntoExpr {
    fn into_expr(self, graph: &Graph) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self, graph: &Graph) -> Expr {
        debug_assert!(Rc::ptr_eq(&self.graph.inner, &graph.inner));
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self, graph: &Graph) -> Expr {
        debug_assert!(Rc::ptr_eq(&self.graph.inner, &graph.inner));
        self.clone()
    }
}

impl IntoExpr for f32 {
    fn into_expr(self, graph: &Graph) -> Expr {
        graph.lit(self)
    }
}

impl IntoExpr for i32 {
    fn into_expr(self, graph: &Graph) -> Expr {
        graph.lit(self)
    }
}

impl IntoExpr for u32 {
    fn into_expr(self, graph: &Graph) -> Expr {
        graph.lit(self)
    }
}

impl IntoExpr for bool {
    fn into_expr(self, graph: &Graph) -> Expr {
        graph.lit(self)
    }
}

/// Argument tuples for constructor calls (`g.vec4((uv, 0.0, 1.0))`).
pub trait ExprArgs {
    fn into_exprs(self, graph: &Graph) -> Vec<Expr>;
}

impl<A: IntoExpr> ExprArgs for (A,) {
    fn into_exprs(self, g: &Graph) -> Vec<Expr> {
        vec![self.0.into_expr(g)]
    }
}

impl<A: IntoExpr, B: IntoExpr> ExprArgs for (A, B) {
    fn into_exprs(self, g: &Graph) -> Vec<Expr> {
        vec![self.0.into_expr(g), self.1.into_expr(g)]
    }
}

impl<A: IntoExpr, B: IntoExpr, C: IntoExpr> ExprArgs for (A, B, C) {
    fn into_exprs(self, g: &Graph) -> Vec<Expr> {
        vec![
            self.0.into_expr(g),
            self.1.into_expr(g),
            self.2.into_expr(g),
        ]
    }
}

impl<A: IntoExpr, B: IntoExpr, C: IntoExpr, D: IntoExpr> ExprArgs for (A, B, C, D) {
    fn into_exprs(self, g: &Graph) -> Vec<Expr> {
        vec![
            self.0.into_expr(g),
            self.1.into_expr(g),
            self.2.into_expr(g),
            self.3.into_expr(g),
        ]
    }
}

impl ExprArgs for Vec<Expr> {
    fn into_exprs(self, _g: &Graph) -> Vec<Expr> {
        self
    }
}

/// A handle to one node in a [`Graph`].
#[derive(Clone)]
pub struct Expr {
    pub(crate) graph: Graph,
    pub(crate) id: NodeId,
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expr").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Expr {
    pub fn ty(&self) -> Type {
        self.graph.ty_of(self.id)
    }

    fn binary(&self, op: BinaryOp, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        let ty = resolve_binary(op, &self.ty(), &rhs.ty())?;
        Ok(self.graph.push_node(
            NodeKind::Binary {
                op,
                lhs: self.id,
                rhs: rhs.id,
            },
            ty,
        ))
    }

    pub fn add(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Div, rhs)
    }

    /// Remainder; emitted as `mod()` for floats on GLSL, `%` otherwise.
    ///
    /// The two spellings agree for non-negative operands only: GLSL `mod()`
    /// is floor-based while WGSL `%` truncates, so a negative operand yields
    /// a differently signed result per target. Callers needing one behavior
    /// everywhere should normalize operands first (e.g. via [`Expr::abs`]
    /// or [`Expr::fract`]).
    pub fn rem(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Mod, rhs)
    }

    pub fn eq(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Ne, rhs)
    }

    pub fn lt(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn le(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Le, rhs)
    }

    pub fn gt(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn ge(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Ge, rhs)
    }

    pub fn and(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn bit_and(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::BitAnd, rhs)
    }

    pub fn bit_or(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::BitOr, rhs)
    }

    pub fn bit_xor(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::BitXor, rhs)
    }

    pub fn shl(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Shl, rhs)
    }

    pub fn shr(&self, rhs: impl IntoExpr) -> Result<Expr> {
        self.binary(BinaryOp::Shr, rhs)
    }

    fn unary(&self, op: UnaryOp) -> Result<Expr> {
        let ty = resolve_unary(op, &self.ty())?;
        Ok(self
            .graph
            .push_node(NodeKind::Unary { op, expr: self.id }, ty))
    }

    pub fn neg(&self) -> Result<Expr> {
        self.unary(UnaryOp::Neg)
    }

    pub fn not(&self) -> Result<Expr> {
        self.unary(UnaryOp::Not)
    }

    pub fn bit_not(&self) -> Result<Expr> {
        self.unary(UnaryOp::BitNot)
    }

    // ---- math builtins -------------------------------------------------

    fn math(&self, func: MathFn, rest: Vec<Expr>) -> Result<Expr> {
        let mut args = vec![self.clone()];
        args.extend(rest);
        let tys: Vec<Type> = args.iter().map(Expr::ty).collect();
        let ty = math_return_type(func, &tys)?;
        let ids = args.iter().map(|a| a.id).collect();
        Ok(self.graph.push_node(NodeKind::Math { func, args: ids }, ty))
    }

    pub fn abs(&self) -> Result<Expr> {
        self.math(MathFn::Abs, vec![])
    }

    pub fn acos(&self) -> Result<Expr> {
        self.math(MathFn::Acos, vec![])
    }

    pub fn asin(&self) -> Result<Expr> {
        self.math(MathFn::Asin, vec![])
    }

    pub fn atan(&self) -> Result<Expr> {
        self.math(MathFn::Atan, vec![])
    }

    /// `atan2(self, x)`; GLSL spells it `atan(y, x)`.
    pub fn atan2(&self, x: impl IntoExpr) -> Result<Expr> {
        let x = x.into_expr(&self.graph);
        self.math(MathFn::Atan2, vec![x])
    }

    pub fn ceil(&self) -> Result<Expr> {
        self.math(MathFn::Ceil, vec![])
    }

    pub fn clamp(&self, lo: impl IntoExpr, hi: impl IntoExpr) -> Result<Expr> {
        let lo = lo.into_expr(&self.graph);
        let hi = hi.into_expr(&self.graph);
        self.math(MathFn::Clamp, vec![lo, hi])
    }

    pub fn cos(&self) -> Result<Expr> {
        self.math(MathFn::Cos, vec![])
    }

    pub fn cosh(&self) -> Result<Expr> {
        self.math(MathFn::Cosh, vec![])
    }

    pub fn cross(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Cross, vec![rhs])
    }

    pub fn degrees(&self) -> Result<Expr> {
        self.math(MathFn::Degrees, vec![])
    }

    /// Fragment-stage derivative with respect to window x.
    pub fn dfdx(&self) -> Result<Expr> {
        self.math(MathFn::Dfdx, vec![])
    }

    /// Fragment-stage derivative with respect to window y.
    pub fn dfdy(&self) -> Result<Expr> {
        self.math(MathFn::Dfdy, vec![])
    }

    pub fn distance(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Distance, vec![rhs])
    }

    pub fn dot(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Dot, vec![rhs])
    }

    pub fn exp(&self) -> Result<Expr> {
        self.math(MathFn::Exp, vec![])
    }

    pub fn exp2(&self) -> Result<Expr> {
        self.math(MathFn::Exp2, vec![])
    }

    pub fn floor(&self) -> Result<Expr> {
        self.math(MathFn::Floor, vec![])
    }

    pub fn fract(&self) -> Result<Expr> {
        self.math(MathFn::Fract, vec![])
    }

    pub fn fwidth(&self) -> Result<Expr> {
        self.math(MathFn::Fwidth, vec![])
    }

    pub fn inverse_sqrt(&self) -> Result<Expr> {
        self.math(MathFn::InverseSqrt, vec![])
    }

    pub fn length(&self) -> Result<Expr> {
        self.math(MathFn::Length, vec![])
    }

    pub fn log(&self) -> Result<Expr> {
        self.math(MathFn::Log, vec![])
    }

    pub fn log2(&self) -> Result<Expr> {
        self.math(MathFn::Log2, vec![])
    }

    pub fn max(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Max, vec![rhs])
    }

    pub fn min(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Min, vec![rhs])
    }

    pub fn mix(&self, rhs: impl IntoExpr, t: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        let t = t.into_expr(&self.graph);
        self.math(MathFn::Mix, vec![rhs, t])
    }

    pub fn normalize(&self) -> Result<Expr> {
        self.math(MathFn::Normalize, vec![])
    }

    pub fn pow(&self, rhs: impl IntoExpr) -> Result<Expr> {
        let rhs = rhs.into_expr(&self.graph);
        self.math(MathFn::Pow, vec![rhs])
    }

    pub fn radians(&self) -> Result<Expr> {
        self.math(MathFn::Radians, vec![])
    }

    pub fn reflect(&self, normal: impl IntoExpr) -> Result<Expr> {
        let normal = normal.into_expr(&self.graph);
        self.math(MathFn::Reflect, vec![normal])
    }

    pub fn refract(&self, normal: impl IntoExpr, eta: impl IntoExpr) -> Result<Expr> {
        let normal = normal.into_expr(&self.graph);
        let eta = eta.into_expr(&self.graph);
        self.math(MathFn::Refract, vec![normal, eta])
    }

    pub fn round(&self) -> Result<Expr> {
        self.math(MathFn::Round, vec![])
    }

    pub fn sign(&self) -> Result<Expr> {
        self.math(MathFn::Sign, vec![])
    }

    pub fn sin(&self) -> Result<Expr> {
        self.math(MathFn::Sin, vec![])
    }

    pub fn sinh(&self) -> Result<Expr> {
        self.math(MathFn::Sinh, vec![])
    }

    /// `smoothstep(self, edge1, x)`.
    pub fn smoothstep(&self, edge1: impl IntoExpr, x: impl IntoExpr) -> Result<Expr> {
        let edge1 = edge1.into_expr(&self.graph);
        let x = x.into_expr(&self.graph);
        self.math(MathFn::Smoothstep, vec![edge1, x])
    }

    pub fn sqrt(&self) -> Result<Expr> {
        self.math(MathFn::Sqrt, vec![])
    }

    /// `step(self, x)`: 0.0 where `x < self`, else 1.0.
    pub fn step(&self, x: impl IntoExpr) -> Result<Expr> {
        let x = x.into_expr(&self.graph);
        self.math(MathFn::Step, vec![x])
    }

    pub fn tan(&self) -> Result<Expr> {
        self.math(MathFn::Tan, vec![])
    }

    pub fn tanh(&self) -> Result<Expr> {
        self.math(MathFn::Tanh, vec![])
    }

    pub fn trunc(&self) -> Result<Expr> {
        self.math(MathFn::Trunc, vec![])
    }

    /// Runtime element count of a storage array (WGSL only).
    pub fn array_length(&self) -> Result<Expr> {
        self.math(MathFn::ArrayLength, vec![])
    }

    // Sugar expanded into plain arithmetic, matching its emitted form.

    /// `1.0 - self`.
    pub fn one_minus(&self) -> Result<Expr> {
        self.graph.lit(1.0f32).sub(self)
    }

    /// `1.0 / self`.
    pub fn reciprocal(&self) -> Result<Expr> {
        self.graph.lit(1.0f32).div(self)
    }

    /// `clamp(self, 0.0, 1.0)`.
    pub fn saturate(&self) -> Result<Expr> {
        self.clamp(0.0f32, 1.0f32)
    }

    // ---- swizzles ------------------------------------------------------

    /// Component selection by pattern (`"xy"`, `"rgb"`, `"wzyx"`, ...).
    pub fn swizzle(&self, pattern: &str) -> Result<Expr> {
        let base_ty = self.ty();
        let invalid = || ShaderError::Swizzle {
            pattern: pattern.to_string(),
            base: base_ty.to_string(),
        };
        let arity = match &base_ty {
            Type::Vector(_, n) => n.count(),
            _ => return Err(invalid()),
        };
        if pattern.is_empty() || pattern.len() > 4 {
            return Err(invalid());
        }
        let mut normalized = String::with_capacity(pattern.len());
        for ch in pattern.chars() {
            let component = match ch {
                'x' | 'r' | 's' => 0,
                'y' | 'g' | 't' => 1,
                'z' | 'b' | 'p' => 2,
                'w' | 'a' | 'q' => 3,
                _ => return Err(invalid()),
            };
            if component >= arity {
                return Err(invalid());
            }
            normalized.push(['x', 'y', 'z', 'w'][component as usize]);
        }
        let kind = match base_ty.scalar_kind() {
            Some(kind) => kind,
            None => return Err(invalid()),
        };
        let ty = match normalized.len() as u32 {
            1 => Type::Scalar(kind),
            n => match VectorSize::from_count(n) {
                Some(size) => Type::Vector(kind, size),
                None => return Err(invalid()),
            },
        };
        Ok(self.graph.push_node(
            NodeKind::Swizzle {
                base: self.id,
                pattern: normalized,
            },
            ty,
        ))
    }

    pub fn x(&self) -> Result<Expr> {
        self.swizzle("x")
    }

    pub fn y(&self) -> Result<Expr> {
        self.swizzle("y")
    }

    pub fn z(&self) -> Result<Expr> {
        self.swizzle("z")
    }

    pub fn w(&self) -> Result<Expr> {
        self.swizzle("w")
    }

    pub fn xy(&self) -> Result<Expr> {
        self.swizzle("xy")
    }

    pub fn xyz(&self) -> Result<Expr> {
        self.swizzle("xyz")
    }

    // ---- casts ---------------------------------------------------------

    /// Explicit cast/constructor to `ty` with `self` as the only argument.
    pub fn cast(&self, ty: Type) -> Result<Expr> {
        self.graph.construct(ty, vec![self.clone()])
    }

    pub fn to_float(&self) -> Result<Expr> {
        self.cast(types::FLOAT)
    }

    pub fn to_int(&self) -> Result<Expr> {
        self.cast(types::INT)
    }

    pub fn to_uint(&self) -> Result<Expr> {
        self.cast(types::UINT)
    }

    pub fn to_bool(&self) -> Result<Expr> {
        self.cast(types::BOOL)
    }

    /// Splat (from a scalar) or component-kind conversion (from a `vec2`).
    pub fn to_vec2(&self) -> Result<Expr> {
        self.cast(Type::vec2())
    }

    pub fn to_vec3(&self) -> Result<Expr> {
        self.cast(Type::vec3())
    }

    pub fn to_vec4(&self) -> Result<Expr> {
        self.cast(Type::vec4())
    }

    // ---- structured access ---------------------------------------------

    /// `self[index]` on arrays, storage buffers, vectors, and matrices.
    pub fn element(&self, index: impl IntoExpr) -> Result<Expr> {
        let index = index.into_expr(&self.graph);
        let index_ty = index.ty();
        if !matches!(index_ty, Type::Scalar(ScalarKind::Int | ScalarKind::Uint)) {
            return Err(ShaderError::Type {
                op: "[]",
                lhs: self.ty().to_string(),
                rhs: index_ty.to_string(),
            });
        }
        let ty = match self.ty() {
            Type::Array(elem, _) => *elem,
            Type::Vector(kind, _) => Type::Scalar(kind),
            Type::Matrix(m) => Type::Vector(ScalarKind::Float, m.vector()),
            other => {
                return Err(ShaderError::Type {
                    op: "[]",
                    lhs: other.to_string(),
                    rhs: index_ty.to_string(),
                });
            }
        };
        Ok(self.graph.push_node(
            NodeKind::Index {
                base: self.id,
                index: index.id,
            },
            ty,
        ))
    }

    /// Struct member access.
    pub fn member(&self, field: &str) -> Result<Expr> {
        let ty = self.ty();
        let Type::Struct(def) = &ty else {
            return Err(ShaderError::UnknownMember {
                strukt: ty.to_string(),
                member: field.to_string(),
            });
        };
        let Some((_, field_ty)) = def.fields.iter().find(|(name, _)| name == field) else {
            return Err(ShaderError::UnknownMember {
                strukt: def.name.clone(),
                member: field.to_string(),
            });
        };
        let field_ty = field_ty.clone();
        Ok(self.graph.push_node(
            NodeKind::Member {
                base: self.id,
                field: field.to_string(),
            },
            field_ty,
        ))
    }

    /// Sample a 2D texture at `coords`.
    pub fn sample(&self, coords: impl IntoExpr) -> Result<Expr> {
        self.sample_impl(coords, None)
    }

    /// Sample a 2D texture at an explicit mip level.
    pub fn sample_level(&self, coords: impl IntoExpr, lod: impl IntoExpr) -> Result<Expr> {
        let lod = lod.into_expr(&self.graph);
        self.sample_impl(coords, Some(lod))
    }

    fn sample_impl(&self, coords: impl IntoExpr, lod: Option<Expr>) -> Result<Expr> {
        let coords = coords.into_expr(&self.graph);
        if self.ty() != Type::Texture2D || coords.ty() != Type::vec2() {
            return Err(ShaderError::Type {
                op: "sample",
                lhs: self.ty().to_string(),
                rhs: coords.ty().to_string(),
            });
        }
        if let Some(lod) = &lod {
            if lod.ty() != types::FLOAT {
                return Err(ShaderError::Type {
                    op: "sample_level",
                    lhs: self.ty().to_string(),
                    rhs: lod.ty().to_string(),
                });
            }
        }
        Ok(self.graph.push_node(
            NodeKind::Sample {
                tex: self.id,
                coords: coords.id,
                lod: lod.map(|l| l.id),
            },
            Type::vec4(),
        ))
    }

    /// Ternary on a boolean condition: `self ? if_true : if_false`.
    pub fn select(&self, if_true: impl IntoExpr, if_false: impl IntoExpr) -> Result<Expr> {
        let if_true = if_true.into_expr(&self.graph);
        let if_false = if_false.into_expr(&self.graph);
        if self.ty() != types::BOOL || if_true.ty() != if_false.ty() {
            return Err(ShaderError::Type {
                op: "select",
                lhs: if_true.ty().to_string(),
                rhs: if_false.ty().to_string(),
            });
        }
        let ty = if_true.ty();
        Ok(self.graph.push_node(
            NodeKind::Select {
                cond: self.id,
                if_true: if_true.id,
                if_false: if_false.id,
            },
            ty,
        ))
    }

    // ---- variables -----------------------------------------------------

    /// Name this node and declare it once as a local variable; further
    /// references use the name. Returns the same node, not a copy.
    pub fn to_var(&self) -> Expr {
        let name = self.graph.inner.borrow_mut().alloc_local_name();
        self.to_var_with(name)
    }

    /// Like [`Expr::to_var`] with a caller-chosen name (uniquified if
    /// already taken).
    pub fn to_var_named(&self, name: &str) -> Expr {
        let name = self.graph.inner.borrow_mut().alloc_name(name);
        self.to_var_with(name)
    }

    fn to_var_with(&self, name: String) -> Expr {
        let mut inner = self.graph.inner.borrow_mut();
        let node = &mut inner.nodes[self.id.index()];
        if node.var_name.is_some() {
            // Already declared; naming is idempotent.
            return self.clone();
        }
        node.var_name = Some(name);
        let id = self.id;
        inner.current_scope_mut().stmts.push(Stmt::Decl { node: id });
        drop(inner);
        self.clone()
    }
}

/// Push the node ids a kind refers to directly.
pub(crate) fn node_operands(kind: &NodeKind, out: &mut Vec<NodeId>) {
    match kind {
        NodeKind::Literal(_) | NodeKind::Binding(_) | NodeKind::Builtin(_) | NodeKind::Local => {}
        NodeKind::Swizzle { base, .. } | NodeKind::Member { base, .. } => out.push(*base),
        NodeKind::Unary { expr, .. } => out.push(*expr),
        NodeKind::Binary { lhs, rhs, .. } => {
            out.push(*lhs);
            out.push(*rhs);
        }
        NodeKind::Math { args, .. }
        | NodeKind::Call { args, .. }
        | NodeKind::Construct { args }
        | NodeKind::StructInit { args } => out.extend(args.iter().copied()),
        NodeKind::Index { base, index } => {
            out.push(*base);
            out.push(*index);
        }
        NodeKind::Sample { tex, coords, lod } => {
            out.push(*tex);
            out.push(*coords);
            if let Some(lod) = lod {
                out.push(*lod);
            }
        }
        NodeKind::Select {
            cond,
            if_true,
            if_false,
        } => {
            out.push(*cond);
            out.push(*if_true);
            out.push(*if_false);
        }
        NodeKind::Varying { source, .. } => out.push(*source),
    }
}

pub(crate) fn math_return_type(func: MathFn, args: &[Type]) -> Result<Type> {
    use MathFn::*;
    let err = || ShaderError::Type {
        op: func.glsl_name(),
        lhs: args
            .first()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "()".into()),
        rhs: args
            .get(1)
            .map(|t| t.to_string())
            .unwrap_or_else(|| "()".into()),
    };
    let first = args.first().ok_or_else(err)?;

    // Trailing arguments match the first exactly or broadcast from a
    // scalar of the same kind.
    let trailing_match = |expected: &Type| {
        args.iter()
            .skip(1)
            .all(|a| a == expected || (a.is_scalar() && a.scalar_kind() == expected.scalar_kind()))
    };

    let arg_count_ok = match func {
        Atan2 | Cross | Distance | Dot | Max | Min | Pow | Reflect | Step => args.len() == 2,
        Clamp | Mix | Refract | Smoothstep => args.len() == 3,
        _ => args.len() == 1,
    };
    if !arg_count_ok {
        return Err(err());
    }

    match func {
        Abs | Sign => {
            if first.is_numeric() && !matches!(first, Type::Matrix(_)) {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
        Min | Max | Clamp => {
            if first.is_numeric() && !matches!(first, Type::Matrix(_)) && trailing_match(first) {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
        Length => match first {
            Type::Vector(ScalarKind::Float, _) | Type::Scalar(ScalarKind::Float) => {
                Ok(types::FLOAT)
            }
            _ => Err(err()),
        },
        Distance | Dot => match first {
            Type::Vector(ScalarKind::Float, _) if args[1] == *first => Ok(types::FLOAT),
            _ => Err(err()),
        },
        Cross => {
            if *first == Type::vec3() && args[1] == Type::vec3() {
                Ok(Type::vec3())
            } else {
                Err(err())
            }
        }
        Step => {
            // step(edge, x): the stepped value fixes the result type.
            let x = &args[1];
            if x.is_float_based() && (first == x || (first.is_scalar() && first.is_float_based()))
            {
                Ok(x.clone())
            } else {
                Err(err())
            }
        }
        Smoothstep => {
            let x = &args[2];
            let edges_ok = [first, &args[1]]
                .iter()
                .all(|e| **e == *x || (e.is_scalar() && e.is_float_based()));
            if x.is_float_based() && !matches!(x, Type::Matrix(_)) && edges_ok {
                Ok(x.clone())
            } else {
                Err(err())
            }
        }
        Mix => {
            if first.is_float_based()
                && !matches!(first, Type::Matrix(_))
                && args[1] == *first
                && (args[2] == *first || args[2] == types::FLOAT)
            {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
        Refract => {
            if first.is_float_based() && args[1] == *first && args[2] == types::FLOAT {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
        ArrayLength => match first {
            Type::Array(..) => Ok(types::UINT),
            _ => Err(err()),
        },
        Normalize => match first {
            Type::Vector(ScalarKind::Float, _) => Ok(first.clone()),
            _ => Err(err()),
        },
        Atan2 | Pow | Reflect => {
            if first.is_float_based() && !matches!(first, Type::Matrix(_)) && args[1] == *first {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
        // Component-wise float functions.
        _ => {
            if first.is_float_based() && !matches!(first, Type::Matrix(_)) {
                Ok(first.clone())
            } else {
                Err(err())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_resolve_types_at_construction() {
        let g = Graph::new();
        let a = g.vec3((1.0f32, 2.0f32, 3.0f32)).unwrap();
        let b = a.mul(2.0f32).unwrap();
        assert_eq!(b.ty(), Type::vec3());
        assert!(a.add(g.int(1)).is_err());
    }

    #[test]
    fn swizzle_out_of_range_fails() {
        let g = Graph::new();
        let uv = g.vec2((0.5f32, 0.5f32)).unwrap();
        assert!(uv.swizzle("xyz").is_err());
        assert!(uv.z().is_err());
        assert_eq!(uv.swizzle("yx").unwrap().ty(), Type::vec2());
        assert_eq!(uv.swizzle("rg").unwrap().ty(), Type::vec2());
    }

    #[test]
    fn vec4_component_count_is_checked() {
        let g = Graph::new();
        let uv = g.vec2((0.0f32, 0.0f32)).unwrap();
        assert!(g.vec4((&uv, 0.0f32, 1.0f32)).is_ok());
        assert!(g.vec4((&uv, 0.0f32)).is_err());
        assert!(g.vec4((&uv, &uv, 1.0f32)).is_err());
    }

    #[test]
    fn narrowing_requires_a_swizzle() {
        let g = Graph::new();
        let v = g.vec4((1.0f32, 2.0f32, 3.0f32, 4.0f32)).unwrap();
        assert!(v.to_vec3().is_err());
        assert!(v.xyz().is_ok());
    }

    #[test]
    fn duplicate_binding_names_conflict() {
        let g = Graph::new();
        g.uniform("u_time", 0.0f32).unwrap();
        // Same shape memoizes to the same node.
        let again = g.uniform("u_time", 1.0f32).unwrap();
        assert_eq!(again.ty(), types::FLOAT);
        assert!(g.uniform("u_time", [0.0f32, 0.0]).is_err());
    }

    #[test]
    fn to_var_names_the_same_node() {
        let g = Graph::new();
        let a = g.float(1.0).add(2.0f32).unwrap();
        let named = a.to_var_named("sum");
        assert_eq!(named.id, a.id);
    }

    #[test]
    fn struct_member_access() {
        let g = Graph::new();
        let light = g.struct_def(
            "Light",
            vec![
                ("dir".into(), Type::vec3()),
                ("intensity".into(), types::FLOAT),
            ],
        );
        let dir = g.vec3((0.0f32, 1.0f32, 0.0f32)).unwrap();
        let inst = light.init((dir, 2.0f32)).unwrap();
        assert_eq!(inst.member("dir").unwrap().ty(), Type::vec3());
        assert!(inst.member("color").is_err());
    }

    #[test]
    fn math_return_types() {
        let g = Graph::new();
        let v = g.vec3((1.0f32, 0.0f32, 0.0f32)).unwrap();
        assert_eq!(v.length().unwrap().ty(), types::FLOAT);
        assert_eq!(v.dot(&v).unwrap().ty(), types::FLOAT);
        assert_eq!(v.cross(&v).unwrap().ty(), Type::vec3());
        assert_eq!(v.clamp(0.0f32, 1.0f32).unwrap().ty(), Type::vec3());
        assert!(g.int(1).sin().is_err());
    }
}
