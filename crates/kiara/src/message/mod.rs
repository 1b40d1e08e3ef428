// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol-independent message contract.
//!
//! A [`Message`] is a cursor into one request or response. Writers and
//! readers are symmetric state machines: struct, field and array scopes
//! must nest (see [`NestingTracker`]), scalars are written and read one at
//! a time, and `read_array_begin` reports the element count.
//!
//! Backends:
//! - [`tbp::TbpMessage`]: compact binary encoding (always available, also
//!   used as the scratch encoding for encrypted streams)
//! - [`jsonrpc::JsonRpcMessage`]: JSON-RPC 2.0 (feature `jsonrpc`)
//!
//! Native string-like and exception types take part through the
//! [`UserString`] and [`GenericError`] capability traits, so a backend never
//! sees their representation.

mod nesting;
pub mod tbp;

#[cfg(feature = "jsonrpc")]
pub mod jsonrpc;

pub use nesting::{NestingTracker, Scope};

use crate::cdt::DynString;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    /// A response carrying a generic error
    Exception,
    /// Header-less body used for nested encodings
    Scratch,
}

// =======================================================================
// Native Adapters
// =======================================================================

/// Native string type accessed through get/set accessors.
pub trait UserString {
    fn get_cstring(&self) -> &str;
    fn set_cstring(&mut self, value: &str) -> Result<()>;
}

impl UserString for String {
    fn get_cstring(&self) -> &str {
        self
    }

    fn set_cstring(&mut self, value: &str) -> Result<()> {
        self.clear();
        self.push_str(value);
        Ok(())
    }
}

impl UserString for DynString {
    fn get_cstring(&self) -> &str {
        self.as_str()
    }

    fn set_cstring(&mut self, value: &str) -> Result<()> {
        self.assign_str(value)
    }
}

/// Native exception type accessed through get/set accessors.
pub trait GenericError {
    fn get_generic_error(&self) -> (i32, Option<String>);
    fn set_generic_error(&mut self, code: i32, message: Option<&str>);
}

/// Error reported by a remote service: a code plus optional text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteError {
    pub code: i32,
    pub message: Option<String>,
}

impl RemoteError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }
}

impl GenericError for RemoteError {
    fn get_generic_error(&self) -> (i32, Option<String>) {
        (self.code, self.message.clone())
    }

    fn set_generic_error(&mut self, code: i32, message: Option<&str>) {
        self.code = code;
        self.message = message.map(str::to_string);
    }
}

impl From<Error> for RemoteError {
    fn from(e: Error) -> Self {
        e.get_generic_error().into()
    }
}

impl From<(i32, Option<String>)> for RemoteError {
    fn from((code, message): (i32, Option<String>)) -> Self {
        Self { code, message }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote {
            code: e.code,
            message: e.message,
        }
    }
}

impl GenericError for Error {
    fn get_generic_error(&self) -> (i32, Option<String>) {
        match self {
            Error::Remote { code, message } => (*code, message.clone()),
            other => (other.code() as i32, Some(other.to_string())),
        }
    }

    fn set_generic_error(&mut self, code: i32, message: Option<&str>) {
        *self = Error::Remote {
            code,
            message: message.map(str::to_string),
        };
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(m) => write!(f, "remote error {}: {}", self.code, m),
            None => write!(f, "remote error {}", self.code),
        }
    }
}

impl std::error::Error for RemoteError {}

// =======================================================================
// Message
// =======================================================================

/// One wire message, written or read through a nesting-checked cursor.
///
/// Every call returns an error instead of corrupting the cursor: a failed
/// call leaves the message as it was, and the caller aborts the whole call.
pub trait Message {
    /// Registry name of the backend, e.g. `"tbp"`
    fn protocol_name(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    fn kind(&self) -> MessageKind;
    /// Method of a request
    fn method_name(&self) -> Option<&str>;

    /// Empty response addressed to this request
    fn new_response(&self) -> Box<dyn Message>;

    /// Encoded bytes. Fails while a scope is still open.
    fn finish(&mut self) -> Result<Vec<u8>>;

    fn is_error_response(&self) -> bool {
        self.kind() == MessageKind::Exception
    }

    // ===================================================================
    // Writer
    // ===================================================================

    fn write_struct_begin(&mut self, name: &str) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;
    fn write_field_begin(&mut self, name: &str) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_array_begin(&mut self, len: usize) -> Result<()>;
    fn write_array_end(&mut self) -> Result<()>;

    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_i8(&mut self, value: i8) -> Result<()>;
    fn write_u8(&mut self, value: u8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_u16(&mut self, value: u16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_u32(&mut self, value: u32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_u64(&mut self, value: u64) -> Result<()>;
    fn write_f32(&mut self, value: f32) -> Result<()>;
    fn write_f64(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary_stream(&mut self, data: &[u8]) -> Result<()>;

    /// Turn this response into an error response.
    ///
    /// Anything written before is discarded.
    fn write_generic_error(&mut self, code: i32, message: Option<&str>) -> Result<()>;

    fn write_user_string(&mut self, value: &dyn UserString) -> Result<()> {
        self.write_string(value.get_cstring())
    }

    fn write_exception(&mut self, error: &dyn GenericError) -> Result<()> {
        let (code, message) = error.get_generic_error();
        self.write_generic_error(code, message.as_deref())
    }

    // ===================================================================
    // Reader
    // ===================================================================

    fn read_struct_begin(&mut self, name: &str) -> Result<()>;
    fn read_struct_end(&mut self) -> Result<()>;
    fn read_field_begin(&mut self, name: &str) -> Result<()>;
    fn read_field_end(&mut self) -> Result<()>;
    /// Opens an array and returns its element count
    fn read_array_begin(&mut self) -> Result<usize>;
    /// Element count of the array at the read position, left unopened, plus
    /// the encoded bytes after its header when the backend can tell.
    fn peek_array_len(&self) -> Result<(usize, Option<usize>)>;
    fn read_array_end(&mut self) -> Result<()>;

    fn read_bool(&mut self) -> Result<bool>;
    fn read_i8(&mut self) -> Result<i8>;
    fn read_u8(&mut self) -> Result<u8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_u64(&mut self) -> Result<u64>;
    fn read_f32(&mut self) -> Result<f32>;
    fn read_f64(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary_stream(&mut self) -> Result<Vec<u8>>;

    /// Code and message of an error response
    fn read_generic_error(&mut self) -> Result<(i32, Option<String>)>;

    fn read_user_string(&mut self, target: &mut dyn UserString) -> Result<()> {
        let value = self.read_string()?;
        target.set_cstring(&value)
    }

    fn read_exception(&mut self, target: &mut dyn GenericError) -> Result<()> {
        let (code, message) = self.read_generic_error()?;
        target.set_generic_error(code, message.as_deref());
        Ok(())
    }
}
