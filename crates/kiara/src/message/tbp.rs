// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trivial Binary Protocol.
//!
//! # Wire Format
//!
//! ```text
//! header    : kind (i8: 1 = request, 2 = response, 3 = exception)
//!             request only: method name (string)
//! scalars   : little-endian, fixed width; boolean is one byte (0/1)
//! string    : length (LEB128 u64) + UTF-8 bytes
//! binary    : length (LEB128 u64) + bytes
//! array     : element count (u64 LE) + elements
//! struct    : members in declaration order, no framing
//! exception : code (i32) + message (string, empty when absent)
//! ```
//!
//! Scratch messages have no header; they carry the plaintext of
//! encrypted streams.

use super::{Message, MessageKind, NestingTracker, Scope};
use crate::cdt::DynBuffer;
use crate::error::{Error, Result};

pub const PROTOCOL_NAME: &str = "tbp";
pub const MIME_TYPE: &str = "application/octet-stream";

const KIND_REQUEST: i8 = 1;
const KIND_RESPONSE: i8 = 2;
const KIND_EXCEPTION: i8 = 3;

/// A LEB128 u64 never takes more than 10 bytes.
const MAX_VARINT_LEN: usize = 10;

/// Generate fixed-width little-endian writers.
///
/// Each generated method validates nesting first, then appends the bytes,
/// then records the value.
macro_rules! impl_write_le {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            fn $name(&mut self, value: $type) -> Result<()> {
                self.nesting.check_value(stringify!($name))?;
                self.put(&[&value.to_le_bytes()])?;
                self.nesting.count_value();
                Ok(())
            }
        )*
    };
}

/// Generate fixed-width little-endian readers.
macro_rules! impl_read_le {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            fn $name(&mut self) -> Result<$type> {
                self.nesting.check_value(stringify!($name))?;
                let mut bytes = [0u8; std::mem::size_of::<$type>()];
                bytes.copy_from_slice(self.peek(std::mem::size_of::<$type>(), stringify!($name))?);
                self.pos += bytes.len();
                self.nesting.count_value();
                Ok(<$type>::from_le_bytes(bytes))
            }
        )*
    };
}

/// Binary message (request, response or scratch).
#[derive(Debug, Clone)]
pub struct TbpMessage {
    kind: MessageKind,
    method: Option<String>,
    buf: DynBuffer,
    /// Read position
    pos: usize,
    /// Start of the body (after the header)
    body: usize,
    nesting: NestingTracker,
}

impl TbpMessage {
    fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            method: None,
            buf: DynBuffer::new(),
            pos: 0,
            body: 0,
            nesting: NestingTracker::new(),
        }
    }

    pub fn request(method: &str) -> Result<Self> {
        let mut msg = Self::empty(MessageKind::Request);
        msg.put(&[&KIND_REQUEST.to_le_bytes()])?;
        msg.put_str(method)?;
        msg.method = Some(method.to_string());
        msg.body = msg.buf.size();
        Ok(msg)
    }

    pub fn response() -> Result<Self> {
        let mut msg = Self::empty(MessageKind::Response);
        msg.put(&[&KIND_RESPONSE.to_le_bytes()])?;
        msg.body = msg.buf.size();
        Ok(msg)
    }

    /// Header-less message for nested encodings
    pub fn scratch() -> Self {
        Self::empty(MessageKind::Scratch)
    }

    /// Read back a scratch body
    pub fn from_scratch(bytes: &[u8]) -> Result<Self> {
        let mut msg = Self::scratch();
        msg.buf.copy_mem(bytes)?;
        Ok(msg)
    }

    /// Parse an incoming request
    pub fn parse_request(bytes: &[u8]) -> Result<Self> {
        let msg = Self::parse(bytes).map_err(|e| Error::Request(e.to_string()))?;
        if msg.kind != MessageKind::Request {
            return Err(Error::Request(format!(
                "expected a request, got {:?}",
                msg.kind
            )));
        }
        Ok(msg)
    }

    /// Parse an incoming response or exception
    pub fn parse_response(bytes: &[u8]) -> Result<Self> {
        let msg = Self::parse(bytes).map_err(|e| Error::InvalidResponse(e.to_string()))?;
        if msg.kind == MessageKind::Request {
            return Err(Error::InvalidResponse(
                "expected a response, got a request".into(),
            ));
        }
        Ok(msg)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut msg = Self::scratch();
        msg.buf.copy_mem(bytes)?;

        let kind = msg.take(1, "header")?[0] as i8;
        msg.kind = match kind {
            KIND_REQUEST => MessageKind::Request,
            KIND_RESPONSE => MessageKind::Response,
            KIND_EXCEPTION => MessageKind::Exception,
            other => return Err(Error::Input(format!("unknown message kind {}", other))),
        };
        if msg.kind == MessageKind::Request {
            msg.method = Some(msg.take_str("method name")?);
        }
        msg.body = msg.pos;
        log::trace!(
            "[tbp] Parsed {:?} ({} bytes, method {:?})",
            msg.kind,
            bytes.len(),
            msg.method
        );
        Ok(msg)
    }

    /// Encoded bytes so far
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Bytes after the read position
    pub fn unread_len(&self) -> usize {
        self.remaining()
    }

    /// Overwrite the encoded bytes with zeros.
    pub(crate) fn wipe(&mut self) {
        #[cfg(feature = "security")]
        zeroize::Zeroize::zeroize(self.buf.as_mut_slice());
    }

    // ===================================================================
    // Raw Encoding
    // ===================================================================

    /// Append all parts or nothing.
    fn put(&mut self, parts: &[&[u8]]) -> Result<()> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let required = self
            .buf
            .size()
            .checked_add(total)
            .ok_or_else(|| Error::Output("message too large".into()))?;
        self.buf
            .ensure_capacity(required, true)
            .map_err(|e| Error::Output(e.to_string()))?;
        for part in parts {
            self.buf
                .append_mem(part)
                .map_err(|e| Error::Output(e.to_string()))?;
        }
        Ok(())
    }

    fn put_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut len = [0u8; MAX_VARINT_LEN];
        let n = encode_varint(data.len() as u64, &mut len);
        self.put(&[&len[..n], data])
    }

    fn put_str(&mut self, s: &str) -> Result<()> {
        self.put_bytes(s.as_bytes())
    }

    fn remaining(&self) -> usize {
        self.buf.size().saturating_sub(self.pos)
    }

    fn peek(&self, n: usize, what: &str) -> Result<&[u8]> {
        if n > self.remaining() {
            return Err(Error::Input(format!(
                "{}: need {} bytes at offset {}, {} left",
                what,
                n,
                self.pos,
                self.remaining()
            )));
        }
        Ok(&self.buf.as_slice()[self.pos..self.pos + n])
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&[u8]> {
        let start = self.pos;
        self.peek(n, what)?;
        self.pos += n;
        Ok(&self.buf.as_slice()[start..start + n])
    }

    fn peek_varint(&self, what: &str) -> Result<(u64, usize)> {
        let bytes = &self.buf.as_slice()[self.pos.min(self.buf.size())..];
        decode_varint(bytes).ok_or_else(|| {
            Error::Input(format!("{}: malformed length at offset {}", what, self.pos))
        })
    }

    /// Length-prefixed bytes; the cursor only moves when the whole item is present.
    fn take_bytes(&mut self, what: &str) -> Result<Vec<u8>> {
        let (len, header) = self.peek_varint(what)?;
        let len = usize::try_from(len)
            .map_err(|_| Error::Input(format!("{}: length {} too large", what, len)))?;
        if header.saturating_add(len) > self.remaining() {
            return Err(Error::Input(format!(
                "{}: {} bytes announced, {} left",
                what,
                len,
                self.remaining().saturating_sub(header)
            )));
        }
        let start = self.pos + header;
        self.pos = start + len;
        Ok(self.buf.as_slice()[start..start + len].to_vec())
    }

    fn take_str(&mut self, what: &str) -> Result<String> {
        let start = self.pos;
        let bytes = self.take_bytes(what)?;
        String::from_utf8(bytes).map_err(|_| {
            self.pos = start;
            Error::Input(format!("{}: invalid UTF-8", what))
        })
    }

    fn rewind_body(&mut self) {
        self.pos = self.body;
        self.nesting.reset();
    }
}

impl Message for TbpMessage {
    fn protocol_name(&self) -> &'static str {
        PROTOCOL_NAME
    }

    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn kind(&self) -> MessageKind {
        self.kind
    }

    fn method_name(&self) -> Option<&str> {
        self.method.as_deref()
    }

    fn new_response(&self) -> Box<dyn Message> {
        match Self::response() {
            Ok(msg) => Box::new(msg),
            // header allocation failed; the first write reports it again
            Err(_) => Box::new(Self::empty(MessageKind::Response)),
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.nesting.check_balanced()?;
        Ok(self.buf.as_slice().to_vec())
    }

    // ===================================================================
    // Writer
    // ===================================================================

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.nesting.check_begin(Scope::Struct, "write_struct_begin")?;
        self.nesting.push(Scope::Struct, None);
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Struct, "write_struct_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn write_field_begin(&mut self, _name: &str) -> Result<()> {
        self.nesting.check_begin(Scope::Field, "write_field_begin")?;
        self.nesting.push(Scope::Field, None);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Field, "write_field_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn write_array_begin(&mut self, len: usize) -> Result<()> {
        self.nesting.check_begin(Scope::Array, "write_array_begin")?;
        self.put(&[&(len as u64).to_le_bytes()])?;
        self.nesting.push(Scope::Array, Some(len));
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Array, "write_array_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    impl_write_le! {
        write_i8: i8,
        write_u8: u8,
        write_i16: i16,
        write_u16: u16,
        write_i32: i32,
        write_u32: u32,
        write_i64: i64,
        write_u64: u64,
        write_f32: f32,
        write_f64: f64,
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.nesting.check_value("write_string")?;
        self.put_str(value)?;
        self.nesting.count_value();
        Ok(())
    }

    fn write_binary_stream(&mut self, data: &[u8]) -> Result<()> {
        self.nesting.check_value("write_binary_stream")?;
        self.put_bytes(data)?;
        self.nesting.count_value();
        Ok(())
    }

    fn write_generic_error(&mut self, code: i32, message: Option<&str>) -> Result<()> {
        if matches!(self.kind, MessageKind::Request | MessageKind::Scratch) {
            return Err(Error::InvalidOperation(
                "generic error written to a non-response message".into(),
            ));
        }
        let mut next = Self::empty(MessageKind::Exception);
        next.put(&[&KIND_EXCEPTION.to_le_bytes()])?;
        next.body = next.buf.size();
        next.put(&[&code.to_le_bytes()])?;
        next.put_str(message.unwrap_or_default())?;
        *self = next;
        Ok(())
    }

    // ===================================================================
    // Reader
    // ===================================================================

    fn read_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.nesting.check_begin(Scope::Struct, "read_struct_begin")?;
        self.nesting.push(Scope::Struct, None);
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Struct, "read_struct_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn read_field_begin(&mut self, _name: &str) -> Result<()> {
        self.nesting.check_begin(Scope::Field, "read_field_begin")?;
        self.nesting.push(Scope::Field, None);
        Ok(())
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Field, "read_field_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn read_array_begin(&mut self) -> Result<usize> {
        self.nesting.check_begin(Scope::Array, "read_array_begin")?;
        let (len, _) = self.peek_array_len()?;
        self.pos += 8;
        self.nesting.push(Scope::Array, Some(len));
        Ok(len)
    }

    fn peek_array_len(&self) -> Result<(usize, Option<usize>)> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.peek(8, "read_array_begin")?);
        let len = usize::try_from(u64::from_le_bytes(bytes))
            .map_err(|_| Error::Input("array length does not fit in memory".into()))?;
        Ok((len, Some(self.remaining() - 8)))
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.nesting.check_end(Scope::Array, "read_array_end")?;
        self.nesting.pop();
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.nesting.check_value("read_bool")?;
        let value = match self.peek(1, "read_bool")?[0] {
            0 => false,
            1 => true,
            other => return Err(Error::Input(format!("invalid boolean byte {}", other))),
        };
        self.pos += 1;
        self.nesting.count_value();
        Ok(value)
    }

    impl_read_le! {
        read_i8: i8,
        read_u8: u8,
        read_i16: i16,
        read_u16: u16,
        read_i32: i32,
        read_u32: u32,
        read_i64: i64,
        read_u64: u64,
        read_f32: f32,
        read_f64: f64,
    }

    fn read_string(&mut self) -> Result<String> {
        self.nesting.check_value("read_string")?;
        let value = self.take_str("read_string")?;
        self.nesting.count_value();
        Ok(value)
    }

    fn read_binary_stream(&mut self) -> Result<Vec<u8>> {
        self.nesting.check_value("read_binary_stream")?;
        let value = self.take_bytes("read_binary_stream")?;
        self.nesting.count_value();
        Ok(value)
    }

    fn read_generic_error(&mut self) -> Result<(i32, Option<String>)> {
        if self.kind != MessageKind::Exception {
            return Err(Error::Response("message is not an error response".into()));
        }
        self.rewind_body();
        let truncated = |e: Error| Error::InvalidResponse(format!("exception body: {}", e));

        let mut code = [0u8; 4];
        code.copy_from_slice(self.take(4, "code").map_err(truncated)?);
        let message = self.take_str("message").map_err(truncated)?;
        let message = (!message.is_empty()).then_some(message);
        Ok((i32::from_le_bytes(code), message))
    }
}

// =======================================================================
// LEB128
// =======================================================================

fn encode_varint(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut n = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out[n] = byte;
            return n + 1;
        }
        out[n] = byte | 0x80;
        n += 1;
    }
}

/// Value and encoded length, `None` when truncated or overlong
fn decode_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        let payload = u64::from(byte & 0x7f);
        let shift = 7 * i as u32;
        if i == MAX_VARINT_LEN - 1 && payload > 1 {
            return None;
        }
        value |= payload << shift;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
