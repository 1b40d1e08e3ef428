// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Begin/end pairing shared by all message backends.
//!
//! Every check is split from its commit so a backend can validate, perform
//! its own fallible work, and only then record the new state. A rejected
//! call leaves the tracker untouched.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Struct,
    Field,
    Array,
}

impl Scope {
    fn name(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Field => "field",
            Self::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    scope: Scope,
    values: usize,
    /// Declared element count of an array
    expected: Option<usize>,
}

/// Stack of open scopes.
///
/// Rules: a field opens only directly inside a struct; a value (scalar,
/// struct or array) never sits directly inside a struct; a field holds at
/// most one value; an array holds exactly its declared element count.
#[derive(Debug, Clone, Default)]
pub struct NestingTracker {
    stack: Vec<Frame>,
}

impl NestingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn current(&self) -> Option<Scope> {
        self.stack.last().map(|f| f.scope)
    }

    pub fn reset(&mut self) {
        self.stack.clear();
    }

    /// May a value (scalar or opening struct/array) be placed now?
    pub fn check_value(&self, op: &str) -> Result<()> {
        match self.stack.last() {
            None => Ok(()),
            Some(Frame {
                scope: Scope::Struct,
                ..
            }) => Err(Error::InvalidOperation(format!(
                "{}: value outside of a field",
                op
            ))),
            Some(Frame {
                scope: Scope::Field,
                values,
                ..
            }) if *values > 0 => Err(Error::InvalidOperation(format!(
                "{}: field already holds a value",
                op
            ))),
            Some(Frame {
                scope: Scope::Array,
                values,
                expected: Some(n),
            }) if values >= n => Err(Error::InvalidOperation(format!(
                "{}: array declared with {} elements",
                op, n
            ))),
            Some(_) => Ok(()),
        }
    }

    pub fn count_value(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            top.values += 1;
        }
    }

    pub fn check_begin(&self, scope: Scope, op: &str) -> Result<()> {
        match scope {
            Scope::Field => match self.current() {
                Some(Scope::Struct) => Ok(()),
                _ => Err(Error::InvalidOperation(format!(
                    "{}: field outside of a struct",
                    op
                ))),
            },
            Scope::Struct | Scope::Array => self.check_value(op),
        }
    }

    /// Record an opened scope (counts as a value of its parent).
    pub fn push(&mut self, scope: Scope, expected: Option<usize>) {
        if scope != Scope::Field {
            self.count_value();
        }
        self.stack.push(Frame {
            scope,
            values: 0,
            expected,
        });
    }

    pub fn check_end(&self, scope: Scope, op: &str) -> Result<()> {
        match self.stack.last() {
            Some(top) if top.scope == scope => match top.expected {
                Some(n) if top.values != n => Err(Error::InvalidOperation(format!(
                    "{}: array declared with {} elements, got {}",
                    op, n, top.values
                ))),
                _ => Ok(()),
            },
            Some(top) => Err(Error::InvalidOperation(format!(
                "{} inside an open {}",
                op,
                top.scope.name()
            ))),
            None => Err(Error::InvalidOperation(format!(
                "{} without matching begin",
                op
            ))),
        }
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Called before the message is finalized
    pub fn check_balanced(&self) -> Result<()> {
        match self.current() {
            None => Ok(()),
            Some(scope) => Err(Error::InvalidOperation(format!(
                "message finished with an open {} ({} levels)",
                scope.name(),
                self.depth()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;

    #[test]
    fn test_balanced_struct() {
        let mut t = NestingTracker::new();
        t.check_begin(Scope::Struct, "struct_begin").unwrap();
        t.push(Scope::Struct, None);
        t.check_begin(Scope::Field, "field_begin").unwrap();
        t.push(Scope::Field, None);
        t.check_value("write_i32").unwrap();
        t.count_value();
        assert!(t.check_value("write_i32").is_err());
        t.check_end(Scope::Field, "field_end").unwrap();
        t.pop();
        t.check_end(Scope::Struct, "struct_end").unwrap();
        t.pop();
        assert!(t.is_balanced());
    }

    #[test]
    fn test_end_without_begin() {
        let t = NestingTracker::new();
        let err = t.check_end(Scope::Array, "write_array_end").unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidOperation);
        assert!(t.check_end(Scope::Field, "read_field_end").is_err());
    }

    #[test]
    fn test_mismatched_end() {
        let mut t = NestingTracker::new();
        t.push(Scope::Array, Some(0));
        assert!(t.check_end(Scope::Struct, "struct_end").is_err());
        assert_eq!(t.depth(), 1);
        t.check_end(Scope::Array, "array_end").unwrap();
    }

    #[test]
    fn test_field_needs_struct() {
        let mut t = NestingTracker::new();
        assert!(t.check_begin(Scope::Field, "field_begin").is_err());
        t.push(Scope::Struct, None);
        assert!(t.check_value("write_u8").is_err());
        t.check_begin(Scope::Field, "field_begin").unwrap();
    }

    #[test]
    fn test_array_count_enforced() {
        let mut t = NestingTracker::new();
        t.push(Scope::Array, Some(2));
        t.count_value();
        assert!(t.check_end(Scope::Array, "array_end").is_err());
        t.count_value();
        assert!(t.check_value("write_u8").is_err());
        t.check_end(Scope::Array, "array_end").unwrap();
        t.pop();
        t.check_balanced().unwrap();
    }
}
