//! Error types for graph construction and code emission.

use crate::emit::Target;

/// Errors raised while building a shader graph or emitting source text.
///
/// Graph-construction errors (type errors, bad swizzles, bad shapes) are
/// raised at the offending call site; emission errors (unsupported builtins,
/// unbalanced traces) are raised when source text is requested.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShaderError {
    /// Operand types are not coercible for a binary or unary operator.
    #[error("type error: cannot apply `{op}` to `{lhs}` and `{rhs}`")]
    Type {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    /// A swizzle requests a component outside the operand's arity.
    #[error("swizzle `{pattern}` out of range for `{base}`")]
    Swizzle { pattern: String, base: String },

    /// A constructor was given the wrong number of components.
    #[error("`{ty}` constructor expects {expected} components, got {found}")]
    ComponentCount {
        ty: String,
        expected: u32,
        found: u32,
    },

    /// A literal value has a shape that maps to no shader type.
    #[error("ambiguous literal shape: {0}")]
    AmbiguousShape(String),

    /// A control-flow trace body failed, leaving the graph unusable.
    #[error("scope trace failed, shader cannot be emitted: {0}")]
    ScopeImbalance(String),

    /// A builtin or feature was emitted against a target that lacks it.
    #[error("`{name}` is not supported on the {target} target")]
    UnsupportedBuiltin { name: String, target: Target },

    /// A function body's return type disagrees with its declared layout.
    #[error("function `{function}`: layout declares `{declared}` but body returns `{found}`")]
    LayoutMismatch {
        function: String,
        declared: String,
        found: String,
    },

    /// A function body referenced an expression node traced outside it.
    #[error(
        "function `{function}` captures an expression node from an outer scope; \
         pass it as an argument instead"
    )]
    CapturedExternal { function: String },

    /// A function (transitively) calls itself while being traced.
    #[error("function `{function}` is recursive; shader functions cannot recurse")]
    RecursiveFunction { function: String },

    /// A binding name was declared twice with different types.
    #[error("binding `{name}` already declared as `{existing}`, redeclared as `{requested}`")]
    DuplicateBinding {
        name: String,
        existing: String,
        requested: String,
    },

    /// A named binding does not exist on this graph.
    #[error("no binding named `{0}` on this graph")]
    UnknownBinding(String),

    /// `Return`/`Break`/`Continue` used outside the construct that owns it.
    #[error("`{keyword}` used outside of a {context}")]
    MisplacedStatement {
        keyword: &'static str,
        context: &'static str,
    },

    /// The target of an `assign` is not an l-value.
    #[error("cannot assign to this expression; only declared variables, storage elements, and their members are assignable")]
    NotAssignable,

    /// A struct member access names no field of the struct.
    #[error("struct `{strukt}` has no member `{member}`")]
    UnknownMember { strukt: String, member: String },

    /// Chained `else_if`/`else_then`/`case` without an open chain head.
    #[error("`{0}` does not follow a matching `if_then`")]
    DanglingElse(&'static str),

    /// Program stages were built on two different graphs.
    #[error("vertex and fragment expressions belong to different graphs")]
    MixedGraphs,
}

/// Crate-wide result alias.
pub type Result<T, E = ShaderError> = std::result::Result<T, E>;
