// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic values.
//!
//! [`Value`] carries data described by a runtime type (see
//! [`marshal::write_value`](crate::marshal::write_value)) when no Rust type
//! exists for it, e.g. on a dynamically configured client or service.

use crate::boxed::TypedBox;
use std::collections::HashMap;

/// A dynamic value matching a [`TypeKind`](crate::types::TypeKind).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Result of a void function
    #[default]
    Void,

    // Primitives
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),

    // Composites
    Struct(HashMap<String, Value>),
    /// Unbounded, fixed and two-dimensional (row-major array of rows) arrays
    Array(Vec<Value>),
    Enum(i64),
    /// Nullable pointer
    Pointer(Option<Box<Value>>),
}

impl Value {
    /// Build a struct value from `(member, value)` pairs
    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of any integer, boolean or enum value
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::U8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I64(v) | Self::Enum(v) => Some(v),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::Bool(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Struct member by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Variant name used in error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "boolean",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F32(_) => "float",
            Self::F64(_) => "double",
            Self::String(_) => "string",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Enum(_) => "enum",
            Self::Pointer(_) => "pointer",
        }
    }
}

impl From<TypedBox> for Value {
    fn from(b: TypedBox) -> Self {
        match b {
            TypedBox::Empty => Self::Void,
            TypedBox::I8(v) => Self::I8(v),
            TypedBox::U8(v) => Self::U8(v),
            TypedBox::I16(v) => Self::I16(v),
            TypedBox::U16(v) => Self::U16(v),
            TypedBox::I32(v) => Self::I32(v),
            TypedBox::U32(v) => Self::U32(v),
            TypedBox::I64(v) => Self::I64(v),
            TypedBox::U64(v) => Self::U64(v),
            TypedBox::F32(v) => Self::F32(v),
            TypedBox::F64(v) => Self::F64(v),
            TypedBox::Bool(v) => Self::Bool(v),
            TypedBox::String(s) => Self::String(s),
            // addresses have no meaning on the wire
            TypedBox::VoidPtr(p) => Self::U64(p.0 as u64),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let v = Value::structure([("x", Value::I32(-4)), ("name", "pt".into())]);
        assert_eq!(v.field("x").and_then(Value::as_i64), Some(-4));
        assert_eq!(v.field("name").and_then(Value::as_str), Some("pt"));
        assert!(v.field("missing").is_none());
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::F32(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_from_typed_box() {
        assert_eq!(Value::from(TypedBox::U16(7)), Value::U16(7));
        assert_eq!(
            Value::from(TypedBox::String("s".into())),
            Value::String("s".into())
        );
        assert!(Value::from(TypedBox::Empty).is_void());
    }

    #[test]
    fn test_from_vec() {
        let v: Value = vec![1u8, 2, 3].into();
        assert_eq!(v.as_array().map(<[Value]>::len), Some(3));
    }
}
