// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-driven marshaling of dynamic [`Value`]s.
//!
//! The wire form matches the native path: pointers are arrays of 0 or 1
//! elements, enums are `i32`, string-like opaque types are strings, and an
//! encrypted type is a binary stream holding its sealed element.

use super::{Marshaler, MAX_PREALLOCATED_ELEMENTS};
use crate::error::{Error, Result};
use crate::types::{PrimitiveKind, TypeKind, TypeRef, World};
use crate::value::Value;
use std::collections::HashMap;

/// Structural depth at which marshaling gives up (guards self-recursive data).
const MAX_DEPTH: usize = 256;

/// Write `value` as an instance of `ty`.
pub fn write_value(m: &mut Marshaler<'_>, world: &World, ty: TypeRef, value: &Value) -> Result<()> {
    write_at(m, world, ty, value, 0)
}

/// Read an instance of `ty`.
pub fn read_value(m: &mut Marshaler<'_>, world: &World, ty: TypeRef) -> Result<Value> {
    read_at(m, world, ty, 0)
}

fn mismatch(world: &World, ty: TypeRef, value: &Value) -> Error {
    Error::InvalidType(format!(
        "{} value does not match type {}",
        value.variant_name(),
        world.type_name(ty)
    ))
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::InvalidValue(format!(
            "value nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

/// Integer view wide enough for every integer width
fn integer(value: &Value) -> Option<i128> {
    match *value {
        Value::U64(v) => Some(v.into()),
        _ => value.as_i64().map(Into::into),
    }
}

fn narrow<T: TryFrom<i128>>(world: &World, ty: TypeRef, value: &Value) -> Result<T> {
    let wide = integer(value).ok_or_else(|| mismatch(world, ty, value))?;
    T::try_from(wide).map_err(|_| {
        Error::InvalidValue(format!("{} is out of range for {}", wide, world.type_name(ty)))
    })
}

// =======================================================================
// Writer
// =======================================================================

fn write_at(
    m: &mut Marshaler<'_>,
    world: &World,
    ty: TypeRef,
    value: &Value,
    depth: usize,
) -> Result<()> {
    check_depth(depth)?;
    let ty = world.resolve(ty)?;

    match world.kind(ty)? {
        TypeKind::Void => match value {
            Value::Void => Ok(()),
            other => Err(mismatch(world, ty, other)),
        },
        TypeKind::Primitive(kind) => write_primitive(m, world, ty, *kind, value),
        // literal types carry no data
        TypeKind::PrimitiveValue(_) => Ok(()),
        TypeKind::Enum { constants, .. } => {
            let v = integer(value).ok_or_else(|| mismatch(world, ty, value))?;
            if !constants.iter().any(|c| i128::from(c.value) == v) {
                return Err(Error::InvalidValue(format!(
                    "{} is not a constant of {}",
                    v,
                    world.type_name(ty)
                )));
            }
            let v = narrow::<i32>(world, ty, value)?;
            m.message().write_i32(v)
        }
        TypeKind::Pointer { element } => match value {
            Value::Pointer(None) => {
                m.message().write_array_begin(0)?;
                m.message().write_array_end()
            }
            Value::Pointer(Some(target)) => {
                m.message().write_array_begin(1)?;
                write_at(m, world, *element, target, depth + 1)?;
                m.message().write_array_end()
            }
            other => Err(mismatch(world, ty, other)),
        },
        TypeKind::Reference { element } => write_at(m, world, *element, value, depth + 1),
        TypeKind::Array { element } => {
            let items = value.as_array().ok_or_else(|| mismatch(world, ty, value))?;
            write_items(m, world, *element, items, depth)
        }
        TypeKind::FixedArray { element, size } => {
            let items = value.as_array().ok_or_else(|| mismatch(world, ty, value))?;
            check_len(world, ty, items.len(), *size)?;
            write_items(m, world, *element, items, depth)
        }
        TypeKind::FixedArray2D {
            element,
            rows,
            cols,
        } => {
            let items = value.as_array().ok_or_else(|| mismatch(world, ty, value))?;
            check_len(world, ty, items.len(), *rows)?;
            m.message().write_array_begin(*rows)?;
            for row in items {
                let cells = row.as_array().ok_or_else(|| mismatch(world, ty, row))?;
                check_len(world, ty, cells.len(), *cols)?;
                write_items(m, world, *element, cells, depth + 1)?;
            }
            m.message().write_array_end()
        }
        TypeKind::Struct { name, members } => {
            let Value::Struct(fields) = value else {
                return Err(mismatch(world, ty, value));
            };
            m.message().write_struct_begin(name)?;
            for member in members {
                let field = fields.get(&member.name).ok_or_else(|| {
                    Error::InvalidValue(format!("{} value lacks member '{}'", name, member.name))
                })?;
                m.message().write_field_begin(&member.name)?;
                write_at(m, world, member.ty, field, depth + 1)?;
                m.message().write_field_end()?;
            }
            m.message().write_struct_end()
        }
        TypeKind::Opaque { api, .. } if api.is_string_like() => match value {
            Value::String(s) => m.message().write_string(s),
            other => Err(mismatch(world, ty, other)),
        },
        TypeKind::Encrypted { element, key_name } => {
            let element = *element;
            m.seal(key_name, |inner| write_at(inner, world, element, value, depth + 1))
        }
        other => Err(Error::InvalidType(format!(
            "{} types cannot be marshaled ({})",
            other.kind_name(),
            world.type_name(ty)
        ))),
    }
}

fn write_items(
    m: &mut Marshaler<'_>,
    world: &World,
    element: TypeRef,
    items: &[Value],
    depth: usize,
) -> Result<()> {
    m.message().write_array_begin(items.len())?;
    for item in items {
        write_at(m, world, element, item, depth + 1)?;
    }
    m.message().write_array_end()
}

fn check_len(world: &World, ty: TypeRef, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::InvalidValue(format!(
            "{} needs {} elements, got {}",
            world.type_name(ty),
            expected,
            got
        )));
    }
    Ok(())
}

fn write_primitive(
    m: &mut Marshaler<'_>,
    world: &World,
    ty: TypeRef,
    kind: PrimitiveKind,
    value: &Value,
) -> Result<()> {
    let msg = m.message();
    match kind {
        PrimitiveKind::Bool => match value.as_bool() {
            Some(b) => msg.write_bool(b),
            None => Err(mismatch(world, ty, value)),
        },
        PrimitiveKind::I8 => msg.write_i8(narrow(world, ty, value)?),
        PrimitiveKind::U8 => msg.write_u8(narrow(world, ty, value)?),
        PrimitiveKind::I16 => msg.write_i16(narrow(world, ty, value)?),
        PrimitiveKind::U16 => msg.write_u16(narrow(world, ty, value)?),
        PrimitiveKind::I32 => msg.write_i32(narrow(world, ty, value)?),
        PrimitiveKind::U32 => msg.write_u32(narrow(world, ty, value)?),
        PrimitiveKind::I64 => msg.write_i64(narrow(world, ty, value)?),
        PrimitiveKind::U64 => msg.write_u64(narrow(world, ty, value)?),
        PrimitiveKind::F32 => match value.as_f64() {
            Some(v) => msg.write_f32(v as f32),
            None => Err(mismatch(world, ty, value)),
        },
        PrimitiveKind::F64 => match value.as_f64() {
            Some(v) => msg.write_f64(v),
            None => Err(mismatch(world, ty, value)),
        },
        PrimitiveKind::String => match value.as_str() {
            Some(s) => msg.write_string(s),
            None => Err(mismatch(world, ty, value)),
        },
    }
}

// =======================================================================
// Reader
// =======================================================================

fn read_at(m: &mut Marshaler<'_>, world: &World, ty: TypeRef, depth: usize) -> Result<Value> {
    check_depth(depth)?;
    let ty = world.resolve(ty)?;

    match world.kind(ty)? {
        TypeKind::Void => Ok(Value::Void),
        TypeKind::Primitive(kind) => read_primitive(m, *kind),
        TypeKind::PrimitiveValue(literal) => Ok(Value::from(literal.clone())),
        TypeKind::Enum { constants, .. } => {
            let v = m.message().read_i32()?;
            if !constants.iter().any(|c| c.value == i64::from(v)) {
                return Err(Error::Input(format!(
                    "{} is not a constant of {}",
                    v,
                    world.type_name(ty)
                )));
            }
            Ok(Value::Enum(v.into()))
        }
        TypeKind::Pointer { element } => {
            let len = m.read_array_begin(wire_empty(world, *element, depth))?;
            let target = match len {
                0 => None,
                1 => Some(Box::new(read_at(m, world, *element, depth + 1)?)),
                n => return Err(Error::Input(format!("pointer encoded with {} elements", n))),
            };
            m.message().read_array_end()?;
            Ok(Value::Pointer(target))
        }
        TypeKind::Reference { element } => read_at(m, world, *element, depth + 1),
        TypeKind::Array { element } => read_items(m, world, *element, None, depth),
        TypeKind::FixedArray { element, size } => {
            read_items(m, world, *element, Some(*size), depth)
        }
        TypeKind::FixedArray2D {
            element,
            rows,
            cols,
        } => {
            // each row carries its own element count
            let len = m.read_array_begin(false)?;
            expect_len(world, ty, len, *rows)?;
            let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED_ELEMENTS));
            for _ in 0..len {
                items.push(read_items(m, world, *element, Some(*cols), depth + 1)?);
            }
            m.message().read_array_end()?;
            Ok(Value::Array(items))
        }
        TypeKind::Struct { name, members } => {
            m.message().read_struct_begin(name)?;
            let mut fields = HashMap::with_capacity(members.len());
            for member in members {
                m.message().read_field_begin(&member.name)?;
                let v = read_at(m, world, member.ty, depth + 1)?;
                m.message().read_field_end()?;
                fields.insert(member.name.clone(), v);
            }
            m.message().read_struct_end()?;
            Ok(Value::Struct(fields))
        }
        TypeKind::Opaque { api, .. } if api.is_string_like() => {
            m.message().read_string().map(Value::String)
        }
        TypeKind::Encrypted { element, key_name } => {
            let element = *element;
            m.open(key_name, |inner| read_at(inner, world, element, depth + 1))
        }
        other => Err(Error::InvalidType(format!(
            "{} types cannot be marshaled ({})",
            other.kind_name(),
            world.type_name(ty)
        ))),
    }
}

fn read_items(
    m: &mut Marshaler<'_>,
    world: &World,
    element: TypeRef,
    expected: Option<usize>,
    depth: usize,
) -> Result<Value> {
    let len = m.read_array_begin(wire_empty(world, element, depth))?;
    if let Some(n) = expected {
        expect_len(world, element, len, n)?;
    }
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED_ELEMENTS));
    for _ in 0..len {
        items.push(read_at(m, world, element, depth + 1)?);
    }
    m.message().read_array_end()?;
    Ok(Value::Array(items))
}

/// Instances of `ty` encode to no bytes at all.
fn wire_empty(world: &World, ty: TypeRef, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    let Ok(ty) = world.resolve(ty) else {
        return false;
    };
    match world.kind(ty) {
        Ok(TypeKind::Void | TypeKind::PrimitiveValue(_)) => true,
        Ok(TypeKind::Reference { element }) => wire_empty(world, *element, depth + 1),
        Ok(TypeKind::Struct { members, .. }) => members
            .iter()
            .all(|member| wire_empty(world, member.ty, depth + 1)),
        _ => false,
    }
}

fn expect_len(world: &World, ty: TypeRef, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::Input(format!(
            "expected {} elements of {}, received {}",
            expected,
            world.type_name(ty),
            got
        )));
    }
    Ok(())
}

fn read_primitive(m: &mut Marshaler<'_>, kind: PrimitiveKind) -> Result<Value> {
    let msg = m.message();
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(msg.read_bool()?),
        PrimitiveKind::I8 => Value::I8(msg.read_i8()?),
        PrimitiveKind::U8 => Value::U8(msg.read_u8()?),
        PrimitiveKind::I16 => Value::I16(msg.read_i16()?),
        PrimitiveKind::U16 => Value::U16(msg.read_u16()?),
        PrimitiveKind::I32 => Value::I32(msg.read_i32()?),
        PrimitiveKind::U32 => Value::U32(msg.read_u32()?),
        PrimitiveKind::I64 => Value::I64(msg.read_i64()?),
        PrimitiveKind::U64 => Value::U64(msg.read_u64()?),
        PrimitiveKind::F32 => Value::F32(msg.read_f32()?),
        PrimitiveKind::F64 => Value::F64(msg.read_f64()?),
        PrimitiveKind::String => Value::String(msg.read_string()?),
    })
}
