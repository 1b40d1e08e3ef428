// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Marshaling values into and out of [`Message`]s.
//!
//! Two paths share one [`Marshaler`]:
//!
//! - **Native**: Rust types implementing [`Marshal`] (primitives, strings,
//!   containers, `#[derive(Kiara)]` structs)
//! - **Dynamic**: a [`Value`](crate::value::Value) driven by its runtime
//!   [`TypeRef`](crate::types::TypeRef), see [`write_value`] / [`read_value`]
//!
//! Both produce the same wire form for the same description, so a native
//! client can talk to a dynamically configured service and back.
//!
//! # Example
//!
//! ```
//! use kiara::marshal::Marshaler;
//! use kiara::message::{tbp::TbpMessage, Message};
//!
//! let mut msg = TbpMessage::scratch();
//! Marshaler::new(&mut msg).write(&vec![1u32, 2, 3])?;
//! let bytes = msg.finish()?;
//!
//! let mut back = TbpMessage::from_scratch(&bytes)?;
//! let v: Vec<u32> = Marshaler::new(&mut back).read()?;
//! assert_eq!(v, [1, 2, 3]);
//! # Ok::<(), kiara::Error>(())
//! ```

mod dynamic;
mod encrypted;
mod native;

#[cfg(all(test, feature = "jsonrpc"))]
mod tests;

pub use dynamic::{read_value, write_value};
pub use encrypted::Encrypted;
pub use native::MarshalArgs;

use crate::config::{RuntimeConfig, DEFAULT_MAX_MESSAGE_ELEMENTS};
use crate::error::{Error, Result};
use crate::message::Message;

/// Upper bound on capacity reserved up front for a received array.
///
/// The element count comes off the wire, so larger arrays grow as their
/// elements actually arrive.
pub(crate) const MAX_PREALLOCATED_ELEMENTS: usize = 4096;

/// A Rust type with a wire form.
pub trait Marshal: Sized {
    /// Encodes to no bytes at all (`()`, structs of such members).
    const WIRE_EMPTY: bool = false;

    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()>;
    fn read_from(m: &mut Marshaler<'_>) -> Result<Self>;
}

/// Cursor over one message plus the key store used by encrypted values.
///
/// Reading also spends an element budget: every array opened through the
/// marshaler counts its announced length against it.
pub struct Marshaler<'a> {
    msg: &'a mut dyn Message,
    keys: Option<&'a RuntimeConfig>,
    elements_left: usize,
}

impl<'a> Marshaler<'a> {
    pub fn new(msg: &'a mut dyn Message) -> Self {
        Self {
            msg,
            keys: None,
            elements_left: DEFAULT_MAX_MESSAGE_ELEMENTS,
        }
    }

    /// Marshaler able to seal and open encrypted values with `config`'s keys
    pub fn with_keys(msg: &'a mut dyn Message, config: &'a RuntimeConfig) -> Self {
        Self {
            msg,
            keys: Some(config),
            elements_left: config.settings().max_message_elements,
        }
    }

    pub fn message(&mut self) -> &mut (dyn Message + 'a) {
        &mut *self.msg
    }

    pub fn keys(&self) -> Option<&'a RuntimeConfig> {
        self.keys
    }

    pub fn write<T: Marshal>(&mut self, value: &T) -> Result<()> {
        value.write_to(self)
    }

    pub fn read<T: Marshal>(&mut self) -> Result<T> {
        T::read_from(self)
    }

    /// Write `value` as the field `name` of the open struct
    pub fn write_field<T: Marshal>(&mut self, name: &str, value: &T) -> Result<()> {
        self.msg.write_field_begin(name)?;
        value.write_to(self)?;
        self.msg.write_field_end()
    }

    pub fn read_field<T: Marshal>(&mut self, name: &str) -> Result<T> {
        self.msg.read_field_begin(name)?;
        let value = T::read_from(self)?;
        self.msg.read_field_end()?;
        Ok(value)
    }

    /// Write `items` as one array.
    pub(crate) fn write_seq<'v, T: Marshal + 'v>(
        &mut self,
        items: impl ExactSizeIterator<Item = &'v T>,
    ) -> Result<()> {
        self.msg.write_array_begin(items.len())?;
        for item in items {
            item.write_to(self)?;
        }
        self.msg.write_array_end()
    }

    /// Open an array whose announced length fits the input and the budget.
    ///
    /// Unless the elements are `wire_empty`, each needs at least one byte,
    /// so a backend that knows its unread bytes bounds the count by them.
    pub(crate) fn read_array_begin(&mut self, wire_empty: bool) -> Result<usize> {
        let (len, bytes_left) = self.msg.peek_array_len()?;
        if let Some(left) = bytes_left.filter(|&left| !wire_empty && len > left) {
            return Err(Error::Input(format!(
                "array of {} elements announced, {} bytes left",
                len, left
            )));
        }
        if len > self.elements_left {
            return Err(Error::Input(format!(
                "array of {} elements exceeds the message budget ({} left)",
                len, self.elements_left
            )));
        }
        let len = self.msg.read_array_begin()?;
        self.elements_left -= len;
        Ok(len)
    }

    /// Read one array, element by element.
    pub(crate) fn read_seq<T: Marshal>(&mut self) -> Result<Vec<T>> {
        let len = self.read_array_begin(T::WIRE_EMPTY)?;
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED_ELEMENTS));
        for _ in 0..len {
            items.push(T::read_from(self)?);
        }
        self.msg.read_array_end()?;
        Ok(items)
    }

    /// Marshaler over another message sharing this one's keys and budget
    pub(crate) fn nested<'b>(&self, msg: &'b mut dyn Message) -> Marshaler<'b>
    where
        'a: 'b,
    {
        Marshaler {
            msg,
            keys: self.keys,
            elements_left: self.elements_left,
        }
    }
}
