//! Type vocabulary and promotion rules for the node graph.
//!
//! Every node carries exactly one resolved [`Type`] from construction time
//! onward. [`resolve_binary`] is the single authority on which operand
//! combinations are legal: it applies scalar broadcast and matrix algebra,
//! and rejects everything that would need an implicit conversion.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ShaderError};

/// The kind of a scalar component.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
}

/// Number of components in a vector.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum VectorSize {
    N2 = 2,
    N3 = 3,
    N4 = 4,
}

impl VectorSize {
    pub fn count(self) -> u32 {
        self as u32
    }

    pub fn from_count(n: u32) -> Option<Self> {
        match n {
            2 => Some(Self::N2),
            3 => Some(Self::N3),
            4 => Some(Self::N4),
            _ => None,
        }
    }
}

/// Square matrix dimension (matrices are always float, column-major).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MatrixSize {
    M2 = 2,
    M3 = 3,
    M4 = 4,
}

impl MatrixSize {
    pub fn dim(self) -> u32 {
        self as u32
    }

    pub fn vector(self) -> VectorSize {
        match self {
            Self::M2 => VectorSize::N2,
            Self::M3 => VectorSize::N3,
            Self::M4 => VectorSize::N4,
        }
    }
}

/// A named struct type: an ordered field list.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

/// A shader-side type.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Scalar(ScalarKind),
    Vector(ScalarKind, VectorSize),
    Matrix(MatrixSize),
    Struct(Box<StructDef>),
    /// Element type plus length; length 0 means runtime-sized.
    Array(Box<Type>, u32),
    Texture2D,
}

pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);
pub const INT: Type = Type::Scalar(ScalarKind::Int);
pub const UINT: Type = Type::Scalar(ScalarKind::Uint);
pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);

impl Type {
    pub fn vec(kind: ScalarKind, n: VectorSize) -> Self {
        Type::Vector(kind, n)
    }

    pub fn vec2() -> Self {
        Type::Vector(ScalarKind::Float, VectorSize::N2)
    }

    pub fn vec3() -> Self {
        Type::Vector(ScalarKind::Float, VectorSize::N3)
    }

    pub fn vec4() -> Self {
        Type::Vector(ScalarKind::Float, VectorSize::N4)
    }

    pub fn mat2() -> Self {
        Type::Matrix(MatrixSize::M2)
    }

    pub fn mat3() -> Self {
        Type::Matrix(MatrixSize::M3)
    }

    pub fn mat4() -> Self {
        Type::Matrix(MatrixSize::M4)
    }

    /// The scalar kind of this type's components, if it has components.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(k) | Type::Vector(k, _) => Some(*k),
            Type::Matrix(_) => Some(ScalarKind::Float),
            _ => None,
        }
    }

    /// Number of scalar components (structs/arrays sum their contents).
    pub fn component_count(&self) -> u32 {
        match self {
            Type::Scalar(_) => 1,
            Type::Vector(_, n) => n.count(),
            Type::Matrix(m) => m.dim() * m.dim(),
            Type::Struct(def) => def.fields.iter().map(|(_, t)| t.component_count()).sum(),
            Type::Array(elem, len) => elem.component_count() * len,
            Type::Texture2D => 0,
        }
    }

    /// Tightly packed byte size: one 32-bit word per component.
    pub fn byte_size(&self) -> u32 {
        self.component_count() * 4
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.scalar_kind(),
            Some(ScalarKind::Int | ScalarKind::Uint | ScalarKind::Float)
        )
    }

    pub fn is_float_based(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Float)
    }

    pub fn is_integer_based(&self) -> bool {
        matches!(self.scalar_kind(), Some(ScalarKind::Int | ScalarKind::Uint))
    }

    /// GLSL spelling of this type.
    pub fn glsl(&self) -> String {
        match self {
            Type::Scalar(ScalarKind::Bool) => "bool".into(),
            Type::Scalar(ScalarKind::Int) => "int".into(),
            Type::Scalar(ScalarKind::Uint) => "uint".into(),
            Type::Scalar(ScalarKind::Float) => "float".into(),
            Type::Vector(kind, n) => {
                let prefix = match kind {
                    ScalarKind::Bool => "bvec",
                    ScalarKind::Int => "ivec",
                    ScalarKind::Uint => "uvec",
                    ScalarKind::Float => "vec",
                };
                format!("{}{}", prefix, n.count())
            }
            Type::Matrix(m) => format!("mat{}", m.dim()),
            Type::Struct(def) => def.name.clone(),
            Type::Array(elem, len) => format!("{}[{}]", elem.glsl(), len),
            Type::Texture2D => "sampler2D".into(),
        }
    }

    /// WGSL spelling of this type.
    pub fn wgsl(&self) -> String {
        match self {
            Type::Scalar(ScalarKind::Bool) => "bool".into(),
            Type::Scalar(ScalarKind::Int) => "i32".into(),
            Type::Scalar(ScalarKind::Uint) => "u32".into(),
            Type::Scalar(ScalarKind::Float) => "f32".into(),
            Type::Vector(ScalarKind::Bool, n) => format!("vec{}<bool>", n.count()),
            Type::Vector(ScalarKind::Int, n) => format!("vec{}i", n.count()),
            Type::Vector(ScalarKind::Uint, n) => format!("vec{}u", n.count()),
            Type::Vector(ScalarKind::Float, n) => format!("vec{}f", n.count()),
            Type::Matrix(m) => format!("mat{0}x{0}f", m.dim()),
            Type::Struct(def) => def.name.clone(),
            Type::Array(elem, 0) => format!("array<{}>", elem.wgsl()),
            Type::Array(elem, len) => format!("array<{}, {}>", elem.wgsl(), len),
            Type::Texture2D => "texture_2d<f32>".into(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glsl())
    }
}

/// Binary operators available on expression nodes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::BitAnd | Self::BitOr | Self::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

fn type_error(op: BinaryOp, lhs: &Type, rhs: &Type) -> ShaderError {
    ShaderError::Type {
        op: op.token(),
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    }
}

/// Result type of `lhs op rhs`, or a type error when the operands are not
/// coercible.
///
/// Coercion is limited to scalar broadcast: a scalar operand of the same
/// scalar kind adapts to the other operand's vector or matrix shape. There
/// is no implicit int/float conversion and no narrowing in either
/// direction.
pub fn resolve_binary(op: BinaryOp, lhs: &Type, rhs: &Type) -> Result<Type> {
    if op.is_logical() {
        return match (lhs, rhs) {
            (Type::Scalar(ScalarKind::Bool), Type::Scalar(ScalarKind::Bool)) => Ok(BOOL),
            _ => Err(type_error(op, lhs, rhs)),
        };
    }

    if op.is_comparison() {
        // Scalar-only: vector comparisons would need per-target builtins
        // (GLSL lessThan etc.) and fall outside the portable subset.
        let ok = match (lhs, rhs) {
            (Type::Scalar(a), Type::Scalar(b)) if a == b => match op {
                BinaryOp::Eq | BinaryOp::Ne => true,
                _ => *a != ScalarKind::Bool,
            },
            _ => false,
        };
        return if ok {
            Ok(BOOL)
        } else {
            Err(type_error(op, lhs, rhs))
        };
    }

    if op.is_bitwise() || op.is_shift() {
        if !lhs.is_integer_based() || !rhs.is_integer_based() {
            return Err(type_error(op, lhs, rhs));
        }
        if op.is_shift() {
            // Shift amount is a u32 (scalar or matching vector) on WGSL;
            // requiring that keeps both emitted forms valid.
            let amount_ok = match (lhs, rhs) {
                (_, Type::Scalar(ScalarKind::Uint)) => true,
                (Type::Vector(_, n), Type::Vector(ScalarKind::Uint, m)) => n == m,
                _ => false,
            };
            return if amount_ok {
                Ok(lhs.clone())
            } else {
                Err(type_error(op, lhs, rhs))
            };
        }
        return match (lhs, rhs) {
            (a, b) if a == b => Ok(a.clone()),
            (Type::Scalar(a), Type::Vector(b, _)) if a == b => Ok(rhs.clone()),
            (Type::Vector(a, _), Type::Scalar(b)) if a == b => Ok(lhs.clone()),
            _ => Err(type_error(op, lhs, rhs)),
        };
    }

    // Arithmetic.
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return Err(type_error(op, lhs, rhs));
    }
    match (lhs, rhs) {
        (a, b) if a == b && !matches!(a, Type::Matrix(_)) => Ok(a.clone()),

        // Scalar broadcast, same scalar kind only.
        (Type::Scalar(a), Type::Vector(b, _)) if a == b => Ok(rhs.clone()),
        (Type::Vector(a, _), Type::Scalar(b)) if a == b => Ok(lhs.clone()),
        (Type::Scalar(ScalarKind::Float), Type::Matrix(_)) if op.is_arithmetic() => {
            matrix_scalar(op, lhs, rhs, rhs)
        }
        (Type::Matrix(_), Type::Scalar(ScalarKind::Float)) if op.is_arithmetic() => {
            matrix_scalar(op, lhs, rhs, lhs)
        }

        // Matrix algebra, multiplication only.
        (Type::Matrix(m), Type::Vector(ScalarKind::Float, n))
            if op == BinaryOp::Mul && m.vector() == *n =>
        {
            Ok(rhs.clone())
        }
        (Type::Vector(ScalarKind::Float, n), Type::Matrix(m))
            if op == BinaryOp::Mul && m.vector() == *n =>
        {
            Ok(lhs.clone())
        }
        (Type::Matrix(a), Type::Matrix(b)) if a == b => match op {
            BinaryOp::Mul | BinaryOp::Add | BinaryOp::Sub => Ok(lhs.clone()),
            _ => Err(type_error(op, lhs, rhs)),
        },

        _ => Err(type_error(op, lhs, rhs)),
    }
}

fn matrix_scalar(op: BinaryOp, lhs: &Type, rhs: &Type, mat: &Type) -> Result<Type> {
    match op {
        BinaryOp::Mul | BinaryOp::Div => Ok(mat.clone()),
        _ => Err(type_error(op, lhs, rhs)),
    }
}

/// Result type of a unary operator application.
pub fn resolve_unary(op: UnaryOp, operand: &Type) -> Result<Type> {
    let ok = match op {
        UnaryOp::Neg => {
            matches!(
                operand.scalar_kind(),
                Some(ScalarKind::Int | ScalarKind::Float)
            )
        }
        UnaryOp::Not => *operand == BOOL,
        UnaryOp::BitNot => operand.is_integer_based(),
    };
    if ok {
        Ok(operand.clone())
    } else {
        Err(ShaderError::Type {
            op: match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
                UnaryOp::BitNot => "~",
            },
            lhs: operand.to_string(),
            rhs: "()".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scalar_broadcast_to_vector() {
        let out = resolve_binary(BinaryOp::Mul, &FLOAT, &Type::vec3()).unwrap();
        assert_eq!(out, Type::vec3());
        let out = resolve_binary(BinaryOp::Add, &Type::vec2(), &FLOAT).unwrap();
        assert_eq!(out, Type::vec2());
    }

    #[test]
    fn mismatched_arities_fail() {
        let err = resolve_binary(BinaryOp::Add, &Type::vec2(), &Type::vec3()).unwrap_err();
        assert!(matches!(err, ShaderError::Type { .. }));
    }

    #[test]
    fn no_implicit_int_float_mixing() {
        assert!(resolve_binary(BinaryOp::Add, &FLOAT, &INT).is_err());
        assert!(resolve_binary(BinaryOp::Mul, &Type::vec3(), &INT).is_err());
        assert!(
            resolve_binary(
                BinaryOp::Mul,
                &Type::vec(ScalarKind::Int, VectorSize::N2),
                &FLOAT
            )
            .is_err()
        );
    }

    #[test]
    fn matrix_vector_multiplication() {
        let out = resolve_binary(BinaryOp::Mul, &Type::mat3(), &Type::vec3()).unwrap();
        assert_eq!(out, Type::vec3());
        assert!(resolve_binary(BinaryOp::Mul, &Type::mat3(), &Type::vec4()).is_err());
        assert!(resolve_binary(BinaryOp::Add, &Type::mat3(), &Type::vec3()).is_err());
    }

    #[test]
    fn integer_division_stays_integer() {
        let out = resolve_binary(BinaryOp::Div, &INT, &INT).unwrap();
        assert_eq!(out, INT);
    }

    #[test]
    fn comparisons_are_scalar_bool() {
        assert_eq!(resolve_binary(BinaryOp::Lt, &FLOAT, &FLOAT).unwrap(), BOOL);
        assert!(resolve_binary(BinaryOp::Lt, &Type::vec2(), &Type::vec2()).is_err());
        assert!(resolve_binary(BinaryOp::Lt, &BOOL, &BOOL).is_err());
        assert_eq!(resolve_binary(BinaryOp::Eq, &BOOL, &BOOL).unwrap(), BOOL);
    }

    #[test]
    fn shift_amount_must_be_uint() {
        assert!(resolve_binary(BinaryOp::Shl, &INT, &UINT).is_ok());
        assert!(resolve_binary(BinaryOp::Shl, &INT, &INT).is_err());
    }

    #[test]
    fn byte_sizes_are_component_count_times_four() {
        assert_eq!(FLOAT.byte_size(), 4);
        assert_eq!(Type::vec3().byte_size(), 12);
        assert_eq!(Type::mat4().byte_size(), 64);
        assert_eq!(Type::Array(Box::new(Type::vec2()), 8).byte_size(), 64);
    }

    fn arb_simple_type() -> impl Strategy<Value = Type> {
        prop_oneof![
            Just(FLOAT),
            Just(INT),
            Just(UINT),
            Just(Type::vec2()),
            Just(Type::vec3()),
            Just(Type::vec4()),
            Just(Type::vec(ScalarKind::Int, VectorSize::N2)),
            Just(Type::vec(ScalarKind::Uint, VectorSize::N3)),
        ]
    }

    proptest! {
        // Commutative operators resolve identically with swapped operands.
        #[test]
        fn add_resolution_is_symmetric(a in arb_simple_type(), b in arb_simple_type()) {
            let forward = resolve_binary(BinaryOp::Add, &a, &b).ok();
            let backward = resolve_binary(BinaryOp::Add, &b, &a).ok();
            prop_assert_eq!(forward, backward);
        }

        // A successful arithmetic resolution never changes the scalar kind.
        #[test]
        fn arithmetic_preserves_scalar_kind(a in arb_simple_type(), b in arb_simple_type()) {
            if let Ok(out) = resolve_binary(BinaryOp::Mul, &a, &b) {
                prop_assert_eq!(out.scalar_kind(), a.scalar_kind());
            }
        }
    }
}
