// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Boxed scalar values.
//!
//! - [`RawBox`]: untagged 64-bit cell, the caller tracks what it holds.
//! - [`TypedBox`]: tagged carrier for any primitive, an owned string or an
//!   opaque pointer; equality and hashing dispatch on the tag first.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque native address. Never dereferenced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VoidPtr(pub usize);

impl VoidPtr {
    pub const NULL: VoidPtr = VoidPtr(0);

    #[must_use]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Tag of a [`TypedBox`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoxType {
    Empty = 0,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    String,
    VoidPtr,
}

impl BoxType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Bool => "boolean",
            Self::String => "string",
            Self::VoidPtr => "void*",
        }
    }
}

/// Scalars storable in a [`RawBox`] and extractable from a [`TypedBox`].
pub trait BoxScalar: Copy + Sized {
    const TYPE: BoxType;

    fn to_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
    fn into_typed(self) -> TypedBox;
    fn from_typed(value: &TypedBox) -> Option<Self>;
}

macro_rules! impl_box_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl BoxScalar for $ty {
                const TYPE: BoxType = BoxType::$variant;

                #[inline]
                fn to_bits(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_bits(bits: u64) -> Self {
                    bits as $ty
                }

                fn into_typed(self) -> TypedBox {
                    TypedBox::$variant(self)
                }

                fn from_typed(value: &TypedBox) -> Option<Self> {
                    match value {
                        TypedBox::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for TypedBox {
                fn from(v: $ty) -> Self {
                    TypedBox::$variant(v)
                }
            }
        )*
    };
}

impl_box_int!(
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
);

impl BoxScalar for f32 {
    const TYPE: BoxType = BoxType::F32;

    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }

    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }

    fn into_typed(self) -> TypedBox {
        TypedBox::F32(self)
    }

    fn from_typed(value: &TypedBox) -> Option<Self> {
        match value {
            TypedBox::F32(v) => Some(*v),
            _ => None,
        }
    }
}

impl BoxScalar for f64 {
    const TYPE: BoxType = BoxType::F64;

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    fn into_typed(self) -> TypedBox {
        TypedBox::F64(self)
    }

    fn from_typed(value: &TypedBox) -> Option<Self> {
        match value {
            TypedBox::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl BoxScalar for bool {
    const TYPE: BoxType = BoxType::Bool;

    fn to_bits(self) -> u64 {
        u64::from(self)
    }

    fn from_bits(bits: u64) -> Self {
        bits != 0
    }

    fn into_typed(self) -> TypedBox {
        TypedBox::Bool(self)
    }

    fn from_typed(value: &TypedBox) -> Option<Self> {
        match value {
            TypedBox::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl BoxScalar for VoidPtr {
    const TYPE: BoxType = BoxType::VoidPtr;

    fn to_bits(self) -> u64 {
        self.0 as u64
    }

    fn from_bits(bits: u64) -> Self {
        VoidPtr(bits as usize)
    }

    fn into_typed(self) -> TypedBox {
        TypedBox::VoidPtr(self)
    }

    fn from_typed(value: &TypedBox) -> Option<Self> {
        match value {
            TypedBox::VoidPtr(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f32> for TypedBox {
    fn from(v: f32) -> Self {
        TypedBox::F32(v)
    }
}

impl From<f64> for TypedBox {
    fn from(v: f64) -> Self {
        TypedBox::F64(v)
    }
}

impl From<bool> for TypedBox {
    fn from(v: bool) -> Self {
        TypedBox::Bool(v)
    }
}

impl From<VoidPtr> for TypedBox {
    fn from(v: VoidPtr) -> Self {
        TypedBox::VoidPtr(v)
    }
}

impl From<String> for TypedBox {
    fn from(v: String) -> Self {
        TypedBox::String(v)
    }
}

impl From<&str> for TypedBox {
    fn from(v: &str) -> Self {
        TypedBox::String(v.to_string())
    }
}

/// Untagged 64-bit scalar cell.
///
/// Reading with a different type than the last write reinterprets the bits
/// (truncating or zero-extending), it never reads uninitialized memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawBox {
    bits: u64,
}

impl RawBox {
    pub fn new<T: BoxScalar>(value: T) -> Self {
        Self {
            bits: value.to_bits(),
        }
    }

    #[inline]
    pub fn get<T: BoxScalar>(&self) -> T {
        T::from_bits(self.bits)
    }

    #[inline]
    pub fn set<T: BoxScalar>(&mut self, value: T) {
        self.bits = value.to_bits();
    }

    /// Attach a tag
    pub fn typed<T: BoxScalar>(&self) -> TypedBox {
        self.get::<T>().into_typed()
    }
}

/// Tagged scalar, string or pointer value.
///
/// `Clone` deep-copies the string variant.
#[derive(Debug, Clone, Default)]
pub enum TypedBox {
    #[default]
    Empty,
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
    Bool(bool),
    String(String),
    VoidPtr(VoidPtr),
}

impl TypedBox {
    pub fn box_type(&self) -> BoxType {
        match self {
            Self::Empty => BoxType::Empty,
            Self::I8(_) => BoxType::I8,
            Self::U8(_) => BoxType::U8,
            Self::I16(_) => BoxType::I16,
            Self::U16(_) => BoxType::U16,
            Self::I32(_) => BoxType::I32,
            Self::U32(_) => BoxType::U32,
            Self::I64(_) => BoxType::I64,
            Self::U64(_) => BoxType::U64,
            Self::F32(_) => BoxType::F32,
            Self::F64(_) => BoxType::F64,
            Self::Bool(_) => BoxType::Bool,
            Self::String(_) => BoxType::String,
            Self::VoidPtr(_) => BoxType::VoidPtr,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Extract a scalar if the tag matches exactly
    pub fn get<T: BoxScalar>(&self) -> Option<T> {
        T::from_typed(self)
    }

    pub fn set(&mut self, value: impl Into<TypedBox>) {
        *self = value.into();
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reset to `Empty`, releasing an owned string
    pub fn clear(&mut self) {
        *self = Self::Empty;
    }

    /// Integer view of any integer or boolean payload
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::U8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I64(v) => Some(v.into()),
            Self::U64(v) => Some(v.into()),
            Self::Bool(v) => Some(v.into()),
            _ => None,
        }
    }

    fn payload_bits(&self) -> u64 {
        match *self {
            Self::Empty | Self::String(_) => 0,
            Self::I8(v) => v.to_bits(),
            Self::U8(v) => v.to_bits(),
            Self::I16(v) => v.to_bits(),
            Self::U16(v) => v.to_bits(),
            Self::I32(v) => v.to_bits(),
            Self::U32(v) => v.to_bits(),
            Self::I64(v) => v.to_bits(),
            Self::U64(v) => v,
            Self::F32(v) => BoxScalar::to_bits(v),
            Self::F64(v) => BoxScalar::to_bits(v),
            Self::Bool(v) => v.to_bits(),
            Self::VoidPtr(v) => v.to_bits(),
        }
    }
}

// Floats compare by bit pattern so that Eq and Hash agree (NaN == NaN).
impl PartialEq for TypedBox {
    fn eq(&self, other: &Self) -> bool {
        if self.box_type() != other.box_type() {
            return false;
        }
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            _ => self.payload_bits() == other.payload_bits(),
        }
    }
}

impl Eq for TypedBox {}

impl Hash for TypedBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.box_type() as u8).hash(state);
        match self {
            Self::Empty => {}
            Self::String(s) => s.as_bytes().hash(state),
            _ => self.payload_bits().hash(state),
        }
    }
}

impl fmt::Display for TypedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::I8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{:?}", s),
            Self::VoidPtr(p) => write!(f, "{:#x}", p.0),
        }
    }
}
