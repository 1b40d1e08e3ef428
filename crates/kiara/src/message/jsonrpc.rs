// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON-RPC 2.0 messages.
//!
//! ```text
//! request  {"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}
//! response {"jsonrpc":"2.0","result":3,"id":1}
//! error    {"jsonrpc":"2.0","error":{"code":15,"message":"..."},"id":1}
//! ```
//!
//! Structs map to objects, fields to keys, arrays to JSON arrays and binary
//! streams to base64 strings. Non-finite floats are written as the strings
//! `"NaN"`, `"Infinity"` and `"-Infinity"`.

use super::{Message, MessageKind, NestingTracker, Scope};
use crate::cdt::base64;
use crate::config::DEFAULT_BASE64_LINE_SIZE;
use crate::error::{Error, Result};
use serde_json::{json, Map, Value as Json};

pub const PROTOCOL_NAME: &str = "jsonrpc";
pub const MIME_TYPE: &str = "application/json";

const VERSION: &str = "2.0";

enum WriteFrame {
    Struct(Map<String, Json>),
    Field(String, Option<Json>),
    Array(Vec<Json>),
}

enum ReadFrame {
    Struct(Map<String, Json>),
    Field(Option<Json>),
    Array(std::vec::IntoIter<Json>),
}

/// Generate integer readers with a range check for the target width.
macro_rules! impl_read_int {
    ($($name:ident: $type:ty => $wide:ident),* $(,)?) => {
        $(
            fn $name(&mut self) -> Result<$type> {
                self.read_scalar(stringify!($name), |value| {
                    value
                        .$wide()
                        .and_then(|v| <$type>::try_from(v).ok())
                        .ok_or_else(|| {
                            Error::Input(format!(
                                "{}: {} is not a valid {}",
                                stringify!($name),
                                value,
                                stringify!($type)
                            ))
                        })
                })
            }
        )*
    };
}

/// Generate integer writers.
macro_rules! impl_write_int {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            fn $name(&mut self, value: $type) -> Result<()> {
                self.write_scalar(stringify!($name), Json::from(value))
            }
        )*
    };
}

/// JSON-RPC request or response.
pub struct JsonRpcMessage {
    kind: MessageKind,
    method: Option<String>,
    id: Json,
    base64_line_size: usize,

    // writer side
    nesting: NestingTracker,
    frames: Vec<WriteFrame>,
    params: Vec<Json>,
    result: Option<Json>,
    error: Option<(i32, Option<String>)>,

    // reader side
    read_nesting: NestingTracker,
    read_frames: Vec<ReadFrame>,
    read_params: std::vec::IntoIter<Json>,
    read_result: Option<Json>,
}

impl JsonRpcMessage {
    fn empty(kind: MessageKind, id: Json) -> Self {
        Self {
            kind,
            method: None,
            id,
            base64_line_size: DEFAULT_BASE64_LINE_SIZE,
            nesting: NestingTracker::new(),
            frames: Vec::new(),
            params: Vec::new(),
            result: None,
            error: None,
            read_nesting: NestingTracker::new(),
            read_frames: Vec::new(),
            read_params: Vec::new().into_iter(),
            read_result: None,
        }
    }

    pub fn request(method: &str, id: i64) -> Self {
        let mut msg = Self::empty(MessageKind::Request, Json::from(id));
        msg.method = Some(method.to_string());
        msg
    }

    /// Empty response carrying `id`
    pub fn response(id: Json) -> Self {
        Self::empty(MessageKind::Response, id)
    }

    /// Wrap base64 output of binary streams every `line_size` characters
    pub fn with_base64_line_size(mut self, line_size: usize) -> Self {
        self.base64_line_size = line_size;
        self
    }

    pub fn id(&self) -> &Json {
        &self.id
    }

    pub fn parse_request(bytes: &[u8]) -> Result<Self> {
        let doc: Json = serde_json::from_slice(bytes)
            .map_err(|e| Error::Request(format!("invalid JSON: {}", e)))?;
        let Json::Object(mut obj) = doc else {
            return Err(Error::Request("request is not a JSON object".into()));
        };
        let method = match obj.remove("method") {
            Some(Json::String(m)) => m,
            _ => return Err(Error::Request("request has no method".into())),
        };
        let params = match obj.remove("params") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items,
            // named parameters are passed as a single struct argument
            Some(other @ Json::Object(_)) => vec![other],
            Some(other) => {
                return Err(Error::Request(format!(
                    "params must be an array, got {}",
                    other
                )))
            }
        };

        let mut msg = Self::empty(
            MessageKind::Request,
            obj.remove("id").unwrap_or(Json::Null),
        );
        msg.method = Some(method);
        msg.read_params = params.into_iter();
        log::trace!("[jsonrpc] Parsed request {:?}", msg.method);
        Ok(msg)
    }

    pub fn parse_response(bytes: &[u8]) -> Result<Self> {
        let doc: Json = serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidResponse(format!("invalid JSON: {}", e)))?;
        let Json::Object(mut obj) = doc else {
            return Err(Error::InvalidResponse("response is not a JSON object".into()));
        };
        let id = obj.remove("id").unwrap_or(Json::Null);

        if let Some(error) = obj.remove("error") {
            let mut msg = Self::empty(MessageKind::Exception, id);
            msg.error = Some(parse_error_object(error)?);
            return Ok(msg);
        }
        match obj.remove("result") {
            Some(result) => {
                let mut msg = Self::empty(MessageKind::Response, id);
                msg.read_result = Some(result);
                Ok(msg)
            }
            None => Err(Error::InvalidResponse(
                "response has neither result nor error".into(),
            )),
        }
    }

    // ===================================================================
    // Writer Cursor
    // ===================================================================

    /// A response holds exactly one top-level value.
    fn check_top_level(&self, op: &str) -> Result<()> {
        if self.frames.is_empty() {
            match self.kind {
                MessageKind::Response if self.result.is_some() => {
                    return Err(Error::InvalidOperation(format!(
                        "{}: response already has a result",
                        op
                    )))
                }
                MessageKind::Exception => {
                    return Err(Error::InvalidOperation(format!(
                        "{}: message is an error response",
                        op
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn place(&mut self, value: Json) {
        match self.frames.last_mut() {
            Some(WriteFrame::Array(items)) => items.push(value),
            Some(WriteFrame::Field(_, slot)) => *slot = Some(value),
            // rejected by the nesting tracker
            Some(WriteFrame::Struct(_)) => {}
            None => match self.kind {
                MessageKind::Response => self.result = Some(value),
                _ => self.params.push(value),
            },
        }
    }

    fn write_scalar(&mut self, op: &str, value: Json) -> Result<()> {
        self.nesting.check_value(op)?;
        self.check_top_level(op)?;
        self.place(value);
        self.nesting.count_value();
        Ok(())
    }

    fn write_float(&mut self, op: &str, value: f64) -> Result<()> {
        let json = match serde_json::Number::from_f64(value) {
            Some(n) => Json::Number(n),
            None if value.is_nan() => Json::from("NaN"),
            None if value > 0.0 => Json::from("Infinity"),
            None => Json::from("-Infinity"),
        };
        self.write_scalar(op, json)
    }

    fn begin(&mut self, scope: Scope, op: &str, expected: Option<usize>) -> Result<()> {
        self.nesting.check_begin(scope, op)?;
        if scope != Scope::Field {
            self.check_top_level(op)?;
        }
        self.nesting.push(scope, expected);
        Ok(())
    }

    fn end(&mut self, scope: Scope, op: &str) -> Result<Option<WriteFrame>> {
        self.nesting.check_end(scope, op)?;
        self.nesting.pop();
        Ok(self.frames.pop())
    }

    // ===================================================================
    // Reader Cursor
    // ===================================================================

    /// Value at the current position, left in place.
    fn peek_value(&self, op: &str) -> Result<&Json> {
        let missing = || Error::Input(format!("{}: no value left", op));
        match self.read_frames.last() {
            Some(ReadFrame::Field(slot)) => slot.as_ref().ok_or_else(missing),
            Some(ReadFrame::Array(items)) => items.as_slice().first().ok_or_else(missing),
            Some(ReadFrame::Struct(_)) => Err(Error::InvalidOperation(format!(
                "{}: value outside of a field",
                op
            ))),
            None => match self.kind {
                MessageKind::Request => self.read_params.as_slice().first().ok_or_else(missing),
                MessageKind::Response => self.read_result.as_ref().ok_or_else(missing),
                _ => Err(Error::Response(format!("{}: message has no result", op))),
            },
        }
    }

    /// Take the value `peek_value` just returned.
    fn take_value(&mut self) -> Json {
        let taken = match self.read_frames.last_mut() {
            Some(ReadFrame::Field(slot)) => slot.take(),
            Some(ReadFrame::Array(items)) => items.next(),
            Some(ReadFrame::Struct(_)) => None,
            None => match self.kind {
                MessageKind::Request => self.read_params.next(),
                MessageKind::Response => self.read_result.take(),
                _ => None,
            },
        };
        taken.unwrap_or(Json::Null)
    }

    /// Decode the next value and advance only when `decode` succeeds.
    fn read_scalar<T>(
        &mut self,
        op: &str,
        decode: impl FnOnce(&Json) -> Result<T>,
    ) -> Result<T> {
        self.read_nesting.check_value(op)?;
        let value = decode(self.peek_value(op)?)?;
        self.take_value();
        self.read_nesting.count_value();
        Ok(value)
    }

    fn read_float(&mut self, op: &str) -> Result<f64> {
        self.read_scalar(op, |value| {
            as_float(value)
                .ok_or_else(|| Error::Input(format!("{}: {} is not a number", op, value)))
        })
    }

    fn read_end(&mut self, scope: Scope, op: &str) -> Result<()> {
        self.read_nesting.check_end(scope, op)?;
        self.read_nesting.pop();
        self.read_frames.pop();
        Ok(())
    }
}

/// Number, or one of the strings written for non-finite floats
fn as_float(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn parse_error_object(error: Json) -> Result<(i32, Option<String>)> {
    let Json::Object(mut obj) = error else {
        return Err(Error::InvalidResponse("error is not an object".into()));
    };
    let code = obj
        .get("code")
        .and_then(Json::as_i64)
        .and_then(|c| i32::try_from(c).ok())
        .ok_or_else(|| Error::InvalidResponse("error without integer code".into()))?;
    let message = match obj.remove("message") {
        Some(Json::String(m)) => Some(m),
        _ => None,
    };
    Ok((code, message))
}

impl Message for JsonRpcMessage {
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
        Box::new(Self::response(self.id.clone()).with_base64_line_size(self.base64_line_size))
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.nesting.check_balanced()?;
        let doc = match (self.kind, &self.error) {
            (MessageKind::Request, _) => json!({
                "jsonrpc": VERSION,
                "method": self.method.as_deref().unwrap_or_default(),
                "params": Json::Array(self.params.clone()),
                "id": self.id.clone(),
            }),
            (_, Some((code, message))) => {
                let mut error = Map::new();
                error.insert("code".into(), Json::from(*code));
                if let Some(m) = message {
                    error.insert("message".into(), Json::from(m.as_str()));
                }
                json!({ "jsonrpc": VERSION, "error": error, "id": self.id.clone() })
            }
            _ => json!({
                "jsonrpc": VERSION,
                "result": self.result.clone().unwrap_or(Json::Null),
                "id": self.id.clone(),
            }),
        };
        serde_json::to_vec(&doc).map_err(|e| Error::Output(e.to_string()))
    }

    // ===================================================================
    // Writer
    // ===================================================================

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.begin(Scope::Struct, "write_struct_begin", None)?;
        self.frames.push(WriteFrame::Struct(Map::new()));
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        if let Some(WriteFrame::Struct(map)) = self.end(Scope::Struct, "write_struct_end")? {
            self.place(Json::Object(map));
        }
        Ok(())
    }

    fn write_field_begin(&mut self, name: &str) -> Result<()> {
        self.begin(Scope::Field, "write_field_begin", None)?;
        self.frames.push(WriteFrame::Field(name.to_string(), None));
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<()> {
        if let Some(WriteFrame::Field(name, value)) = self.end(Scope::Field, "write_field_end")? {
            if let Some(WriteFrame::Struct(map)) = self.frames.last_mut() {
                map.insert(name, value.unwrap_or(Json::Null));
            }
        }
        Ok(())
    }

    fn write_array_begin(&mut self, len: usize) -> Result<()> {
        self.begin(Scope::Array, "write_array_begin", Some(len))?;
        self.frames.push(WriteFrame::Array(Vec::with_capacity(len.min(4096))));
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        if let Some(WriteFrame::Array(items)) = self.end(Scope::Array, "write_array_end")? {
            self.place(Json::Array(items));
        }
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_scalar("write_bool", Json::Bool(value))
    }

    impl_write_int! {
        write_i8: i8,
        write_u8: u8,
        write_i16: i16,
        write_u16: u16,
        write_i32: i32,
        write_u32: u32,
        write_i64: i64,
        write_u64: u64,
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_float("write_f32", f64::from(value))
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_float("write_f64", value)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_scalar("write_string", Json::from(value))
    }

    fn write_binary_stream(&mut self, data: &[u8]) -> Result<()> {
        let encoded = base64::encode(data, self.base64_line_size);
        self.write_scalar("write_binary_stream", Json::String(encoded))
    }

    fn write_generic_error(&mut self, code: i32, message: Option<&str>) -> Result<()> {
        if self.kind == MessageKind::Request {
            return Err(Error::InvalidOperation(
                "generic error written to a request".into(),
            ));
        }
        self.kind = MessageKind::Exception;
        self.nesting.reset();
        self.frames.clear();
        self.result = None;
        self.error = Some((code, message.map(str::to_string)));
        Ok(())
    }

    // ===================================================================
    // Reader
    // ===================================================================

    fn read_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.read_nesting.check_begin(Scope::Struct, "read_struct_begin")?;
        match self.peek_value("read_struct_begin")? {
            Json::Object(_) => {}
            other => return Err(Error::Input(format!("expected an object, got {}", other))),
        }
        let Json::Object(map) = self.take_value() else {
            return Err(Error::Input("read_struct_begin: no value left".into()));
        };
        self.read_nesting.push(Scope::Struct, None);
        self.read_frames.push(ReadFrame::Struct(map));
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.read_end(Scope::Struct, "read_struct_end")
    }

    fn read_field_begin(&mut self, name: &str) -> Result<()> {
        self.read_nesting.check_begin(Scope::Field, "read_field_begin")?;
        let Some(ReadFrame::Struct(map)) = self.read_frames.last_mut() else {
            return Err(Error::InvalidOperation("read_field_begin outside of a struct".into()));
        };
        let value = map
            .remove(name)
            .ok_or_else(|| Error::Input(format!("missing field '{}'", name)))?;
        self.read_nesting.push(Scope::Field, None);
        self.read_frames.push(ReadFrame::Field(Some(value)));
        Ok(())
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.read_end(Scope::Field, "read_field_end")
    }

    fn read_array_begin(&mut self) -> Result<usize> {
        self.read_nesting.check_begin(Scope::Array, "read_array_begin")?;
        match self.peek_value("read_array_begin")? {
            Json::Array(_) => {}
            other => return Err(Error::Input(format!("expected an array, got {}", other))),
        }
        let Json::Array(items) = self.take_value() else {
            return Err(Error::Input("read_array_begin: no value left".into()));
        };
        let len = items.len();
        self.read_nesting.push(Scope::Array, Some(len));
        self.read_frames.push(ReadFrame::Array(items.into_iter()));
        Ok(len)
    }

    fn peek_array_len(&self) -> Result<(usize, Option<usize>)> {
        match self.peek_value("read_array_begin")? {
            Json::Array(items) => Ok((items.len(), None)),
            other => Err(Error::Input(format!("expected an array, got {}", other))),
        }
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.read_end(Scope::Array, "read_array_end")
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.read_scalar("read_bool", |value| match value {
            Json::Bool(b) => Ok(*b),
            other => Err(Error::Input(format!("expected a boolean, got {}", other))),
        })
    }

    impl_read_int! {
        read_i8: i8 => as_i64,
        read_u8: u8 => as_u64,
        read_i16: i16 => as_i64,
        read_u16: u16 => as_u64,
        read_i32: i32 => as_i64,
        read_u32: u32 => as_u64,
        read_i64: i64 => as_i64,
        read_u64: u64 => as_u64,
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.read_scalar("read_f32", |value| {
            match as_float(value) {
                // finite values beyond f32::MAX would narrow to infinity
                Some(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => Err(Error::Input(
                    format!("read_f32: {} is out of range for f32", value),
                )),
                Some(v) => Ok(v as f32),
                None => Err(Error::Input(format!("read_f32: {} is not a number", value))),
            }
        })
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.read_float("read_f64")
    }

    fn read_string(&mut self) -> Result<String> {
        self.read_scalar("read_string", |value| match value {
            Json::String(s) => Ok(s.clone()),
            other => Err(Error::Input(format!("expected a string, got {}", other))),
        })
    }

    fn read_binary_stream(&mut self) -> Result<Vec<u8>> {
        self.read_scalar("read_binary_stream", |value| match value {
            Json::String(s) => base64::decode(s),
            other => Err(Error::Input(format!(
                "expected a base64 string, got {}",
                other
            ))),
        })
    }

    fn read_generic_error(&mut self) -> Result<(i32, Option<String>)> {
        self.error
            .clone()
            .ok_or_else(|| Error::Response("message is not an error response".into()))
    }
}
