// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable type names and structure dumps.

use super::kind::{TypeKind, TypeRef};
use super::world::World;
use std::fmt::Write;

const MAX_NAME_DEPTH: usize = 16;

impl World {
    /// Short name of a type, e.g. `i32`, `Node*`, `double[4][4]`
    pub fn type_name(&self, t: TypeRef) -> String {
        self.name_at(t, 0)
    }

    fn name_at(&self, t: TypeRef, depth: usize) -> String {
        if depth > MAX_NAME_DEPTH {
            return "...".to_string();
        }
        let Some(kind) = self.get(t) else {
            return format!("<dead {}>", t);
        };
        let elem = |e: TypeRef| self.name_at(e, depth + 1);
        match kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Any => "any".to_string(),
            TypeKind::Unresolved { name } if name.is_empty() => "unresolved_symbol".to_string(),
            TypeKind::Unresolved { name } => format!("?{}", name),
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::PrimitiveValue(v) => format!("{}({})", v.box_type().name(), v),
            TypeKind::Pointer { element } => format!("{}*", elem(*element)),
            TypeKind::Reference { element } => format!("{}&", elem(*element)),
            TypeKind::Array { element } => format!("{}[]", elem(*element)),
            TypeKind::FixedArray { element, size } => format!("{}[{}]", elem(*element), size),
            TypeKind::FixedArray2D {
                element,
                rows,
                cols,
            } => format!("{}[{}][{}]", elem(*element), rows, cols),
            TypeKind::Encrypted { element, .. } => format!("encrypted<{}>", elem(*element)),
            TypeKind::Function { name, args, result } if name.is_empty() => {
                let args: Vec<String> = args.iter().map(|a| elem(a.ty)).collect();
                format!("{}({})", elem(*result), args.join(", "))
            }
            TypeKind::Typedef { name, .. }
            | TypeKind::Struct { name, .. }
            | TypeKind::Function { name, .. }
            | TypeKind::Service { name, .. }
            | TypeKind::Enum { name, .. }
            | TypeKind::Opaque { name, .. } => name.clone(),
        }
    }

    /// Kind name plus kind-specific structure.
    pub fn dump(&self, t: TypeRef) -> String {
        let Some(kind) = self.get(t) else {
            return format!("<dead {}>", t);
        };
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.dump_into(&mut out, kind);
        out
    }

    fn dump_into(&self, out: &mut String, kind: &TypeKind) -> std::fmt::Result {
        let kind_name = kind.kind_name();
        match kind {
            TypeKind::Struct { name, members } => {
                writeln!(out, "{} {} {{", kind_name, name)?;
                for m in members {
                    write!(out, "  {} : {} @{}", m.name, self.type_name(m.ty), m.offset)?;
                    if let Some(main) = &m.main_name {
                        write!(out, " (of {})", main)?;
                    }
                    out.push('\n');
                }
                out.push('}');
            }
            TypeKind::Function { name, args, result } => {
                write!(out, "{} {}(", kind_name, name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{}: {}", a.name, self.type_name(a.ty))?;
                }
                write!(out, ") -> {}", self.type_name(*result))?;
            }
            TypeKind::Service { name, methods } => {
                writeln!(out, "{} {} {{", kind_name, name)?;
                for m in methods {
                    writeln!(out, "  {} = {}", m.name, self.type_name(m.function))?;
                }
                out.push('}');
            }
            TypeKind::Enum { name, constants } => {
                write!(out, "{} {} {{", kind_name, name)?;
                for (i, c) in constants.iter().enumerate() {
                    out.push_str(if i > 0 { ", " } else { " " });
                    write!(out, "{} = {}", c.name, c.value)?;
                }
                out.push_str(" }");
            }
            TypeKind::Encrypted { element, key_name } => {
                write!(
                    out,
                    "{} of {} (key \"{}\")",
                    kind_name,
                    self.type_name(*element),
                    key_name
                )?;
            }
            TypeKind::FixedArray { element, size } => {
                write!(out, "{}[{}] of {}", kind_name, size, self.type_name(*element))?;
            }
            TypeKind::FixedArray2D {
                element,
                rows,
                cols,
            } => {
                write!(
                    out,
                    "{}[{}][{}] of {}",
                    kind_name,
                    rows,
                    cols,
                    self.type_name(*element)
                )?;
            }
            TypeKind::Pointer { element }
            | TypeKind::Reference { element }
            | TypeKind::Array { element } => {
                write!(out, "{} of {}", kind_name, self.type_name(*element))?;
            }
            TypeKind::Typedef { name, target } => {
                write!(out, "{} {} = {}", kind_name, name, self.type_name(*target))?;
            }
            TypeKind::Opaque { name, api } => {
                write!(out, "{} {}", kind_name, name)?;
                let caps = [
                    (api.get_cstring, "GetCString"),
                    (api.set_cstring, "SetCString"),
                    (api.get_generic_error, "GetGenericError"),
                    (api.set_generic_error, "SetGenericError"),
                    (api.allocate_type, "AllocateType"),
                    (api.deallocate_type, "DeallocateType"),
                ];
                let names: Vec<&str> = caps.iter().filter(|c| c.0).map(|c| c.1).collect();
                if !names.is_empty() {
                    write!(out, " [{}]", names.join(", "))?;
                }
            }
            TypeKind::Primitive(p) => write!(out, "{} {}", kind_name, p.name())?,
            TypeKind::PrimitiveValue(v) => {
                write!(out, "{} {} = {}", kind_name, v.box_type().name(), v)?
            }
            TypeKind::Unresolved { name } => write!(out, "{} {}", kind_name, name)?,
            TypeKind::Void | TypeKind::Any => out.push_str(kind_name),
        }
        Ok(())
    }
}
