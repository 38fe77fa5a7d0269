//! Host-side values for literals, uniforms, and constants.
//!
//! A [`Value`] is shape-tagged at construction: plain numbers become
//! scalars, fixed-size arrays become vectors or matrices by length.
//! Ambiguous shapes are rejected rather than guessed.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShaderError};
use crate::types::{self, MatrixSize, ScalarKind, Type, VectorSize};

/// A concrete host value with a fixed shader type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f32),
    Int(i32),
    Uint(u32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major, 4/9/16 floats.
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl Value {
    /// The shader type this value carries.
    pub fn ty(&self) -> Type {
        match self {
            Value::Float(_) => types::FLOAT,
            Value::Int(_) => types::INT,
            Value::Uint(_) => types::UINT,
            Value::Bool(_) => types::BOOL,
            Value::Vec2(_) => Type::Vector(ScalarKind::Float, VectorSize::N2),
            Value::Vec3(_) => Type::Vector(ScalarKind::Float, VectorSize::N3),
            Value::Vec4(_) => Type::Vector(ScalarKind::Float, VectorSize::N4),
            Value::Mat2(_) => Type::Matrix(MatrixSize::M2),
            Value::Mat3(_) => Type::Matrix(MatrixSize::M3),
            Value::Mat4(_) => Type::Matrix(MatrixSize::M4),
        }
    }

    /// Flat component list, column-major for matrices.
    pub fn components(&self) -> Vec<f32> {
        match self {
            Value::Float(v) => vec![*v],
            Value::Int(v) => vec![*v as f32],
            Value::Uint(v) => vec![*v as f32],
            Value::Bool(v) => vec![if *v { 1.0 } else { 0.0 }],
            Value::Vec2(v) => v.to_vec(),
            Value::Vec3(v) => v.to_vec(),
            Value::Vec4(v) => v.to_vec(),
            Value::Mat2(v) => v.to_vec(),
            Value::Mat3(v) => v.to_vec(),
            Value::Mat4(v) => v.to_vec(),
        }
    }

    /// Reject values with no shader literal spelling. `inf` and `NaN` parse
    /// on neither target.
    pub fn check_finite(&self) -> Result<()> {
        if self.components().iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(ShaderError::AmbiguousShape(
                "non-finite float has no literal form".into(),
            ))
        }
    }

    /// Build a float-based value from a flat slice, inferring the type from
    /// its length (1/2/3/4 components, or 4/9/16 for matrices — matrix wins
    /// only for 9 and 16; length 4 is a `vec4`).
    pub fn from_slice(components: &[f32]) -> Result<Self> {
        match components.len() {
            1 => Ok(Value::Float(components[0])),
            2 => Ok(Value::Vec2([components[0], components[1]])),
            3 => Ok(Value::Vec3([components[0], components[1], components[2]])),
            4 => Ok(Value::Vec4([
                components[0],
                components[1],
                components[2],
                components[3],
            ])),
            9 => {
                let mut m = [0.0; 9];
                m.copy_from_slice(components);
                Ok(Value::Mat3(m))
            }
            16 => {
                let mut m = [0.0; 16];
                m.copy_from_slice(components);
                Ok(Value::Mat4(m))
            }
            n => Err(ShaderError::AmbiguousShape(format!(
                "{n} components map to no scalar, vector, or matrix type"
            ))),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<[f32; 2]> for Value {
    fn from(v: [f32; 2]) -> Self {
        Value::Vec2(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Value::Vec3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Value::Vec4(v)
    }
}

impl From<[f32; 9]> for Value {
    fn from(v: [f32; 9]) -> Self {
        Value::Mat3(v)
    }
}

impl From<[f32; 16]> for Value {
    fn from(v: [f32; 16]) -> Self {
        Value::Mat4(v)
    }
}

/// Format one float the way both shading languages expect: always with a
/// decimal point or exponent so it parses as a float literal.
pub(crate) fn format_f32(v: f32) -> String {
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_shapes() {
        assert_eq!(Value::from_slice(&[1.0]).unwrap().ty(), types::FLOAT);
        assert_eq!(
            Value::from_slice(&[0.0; 4]).unwrap().ty(),
            Type::Vector(ScalarKind::Float, VectorSize::N4)
        );
        assert_eq!(
            Value::from_slice(&[0.0; 9]).unwrap().ty(),
            Type::Matrix(MatrixSize::M3)
        );
        assert!(Value::from_slice(&[]).is_err());
        assert!(Value::from_slice(&[0.0; 7]).is_err());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(Value::Float(1.0).check_finite().is_ok());
        assert!(Value::Float(f32::NAN).check_finite().is_err());
        assert!(Value::Vec3([0.0, f32::INFINITY, 0.0]).check_finite().is_err());
        assert!(Value::Int(i32::MIN).check_finite().is_ok());
    }

    #[test]
    fn float_formatting_keeps_a_decimal_point() {
        assert_eq!(format_f32(1.0), "1.0");
        assert_eq!(format_f32(0.5), "0.5");
        assert_eq!(format_f32(-3.0), "-3.0");
    }
}
