// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable NUL-terminated string on top of [`DynBuffer`].
//!
//! After every successful mutation the byte after the contents is `0`
//! whenever storage is allocated, and `len()` never counts it. Contents are
//! always valid UTF-8 since every mutator takes `&str` or `char`.

use super::DynBuffer;
use crate::error::Result;
use std::fmt;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct DynString {
    buf: DynBuffer,
}

impl DynString {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: DynBuffer::new(),
        }
    }

    pub fn from_text(s: &str) -> Result<Self> {
        let mut out = Self::new();
        out.assign_str(s)?;
        Ok(out)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.size()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Characters that fit without reallocating (terminator excluded)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity().saturating_sub(1)
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.buf.is_allocated()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Contents plus terminator, `None` when nothing is allocated.
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> Option<&[u8]> {
        self.buf.storage().get(..=self.len())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Room for `capacity` characters plus the terminator
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.buf.reserve(capacity.saturating_add(1))?;
        self.terminate();
        Ok(())
    }

    pub fn assign_str(&mut self, s: &str) -> Result<()> {
        self.buf.ensure_capacity(s.len().saturating_add(1), false)?;
        self.buf.copy_mem(s.as_bytes())?;
        self.terminate();
        Ok(())
    }

    pub fn append_str(&mut self, s: &str) -> Result<()> {
        self.append_bytes(s.as_bytes())
    }

    /// Append at most `n` bytes of `s`, cut back to a character boundary.
    pub fn append_strn(&mut self, s: &str, n: usize) -> Result<()> {
        let mut end = n.min(s.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.append_bytes(&s.as_bytes()[..end])
    }

    pub fn append_char(&mut self, ch: char) -> Result<()> {
        let mut tmp = [0u8; 4];
        self.append_bytes(ch.encode_utf8(&mut tmp).as_bytes())
    }

    pub fn assign(&mut self, other: &DynString) -> Result<()> {
        self.assign_str(other.as_str())
    }

    pub fn append(&mut self, other: &DynString) -> Result<()> {
        self.append_bytes(other.as_bytes())
    }

    pub fn move_from(&mut self, other: &mut DynString) {
        self.buf.move_from(&mut other.buf);
    }

    pub fn swap(&mut self, other: &mut DynString) {
        self.buf.swap(&mut other.buf);
    }

    /// Hand out the contents; the string becomes empty and unallocated.
    pub fn release(&mut self) -> String {
        let bytes = self.buf.release();
        String::from_utf8(bytes).unwrap_or_default()
    }

    /// Empty the string, keep capacity
    pub fn clear(&mut self) {
        self.buf.clear();
        self.terminate();
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let required = self.len().saturating_add(bytes.len()).saturating_add(1);
        self.buf.ensure_capacity(required, true)?;
        self.buf.append_mem(bytes)?;
        self.terminate();
        Ok(())
    }

    // Capacity for the terminator is reserved by every caller.
    fn terminate(&mut self) {
        let len = self.len();
        if let Some(slot) = self.buf.storage_mut().get_mut(len) {
            *slot = 0;
        }
    }
}

impl fmt::Display for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DynString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynString")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("value", &self.as_str())
            .finish()
    }
}

impl PartialEq<str> for DynString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for DynString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_terminated(s: &DynString) {
        let with_nul = s.as_bytes_with_nul().expect("allocated");
        assert_eq!(with_nul.len(), s.len() + 1);
        assert_eq!(with_nul[s.len()], 0);
    }

    #[test]
    fn test_assign_and_append() {
        let mut s = DynString::new();
        assert!(s.as_bytes_with_nul().is_none());

        s.assign_str("Hello").unwrap();
        assert_terminated(&s);
        s.append_char(',').unwrap();
        assert_terminated(&s);
        s.append_str(" World").unwrap();
        assert_terminated(&s);
        assert_eq!(s, "Hello, World");
        assert_eq!(s.len(), 12);
    }

    #[test]
    fn test_append_strn_respects_char_boundary() {
        let mut s = DynString::new();
        s.append_strn("abcdef", 3).unwrap();
        assert_eq!(s.as_str(), "abc");
        // 'é' is two bytes; cutting inside it backs off
        s.append_strn("xé", 2).unwrap();
        assert_eq!(s.as_str(), "abcx");
        s.append_strn("yz", 10).unwrap();
        assert_eq!(s.as_str(), "abcxyz");
        assert_terminated(&s);
    }

    #[test]
    fn test_clear_preserves_capacity() {
        let mut s = DynString::from_text("some text").unwrap();
        let cap = s.capacity();
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), cap);
        assert_terminated(&s);
    }

    #[test]
    fn test_transfer() {
        let mut a = DynString::from_text("left").unwrap();
        let mut b = DynString::from_text("right").unwrap();
        a.swap(&mut b);
        assert_eq!(a, "right");
        a.append(&b).unwrap();
        assert_eq!(a, "rightleft");
        assert_terminated(&a);

        b.move_from(&mut a);
        assert_eq!(b, "rightleft");
        assert!(!a.is_allocated());

        a.assign(&b).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.release(), "rightleft");
        assert!(b.is_empty());
    }

    #[test]
    fn test_reserve_keeps_terminator() {
        let mut s = DynString::from_text("abc").unwrap();
        s.reserve(100).unwrap();
        assert!(s.capacity() >= 100);
        assert_eq!(s, "abc");
        assert_terminated(&s);
    }

    #[test]
    fn test_random_mutations_stay_terminated() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut s = DynString::new();
        let mut model = String::new();
        for _ in 0..500 {
            match rng.u8(0..4) {
                0 => {
                    let piece: String =
                        (0..rng.usize(0..12)).map(|_| rng.alphanumeric()).collect();
                    s.append_str(&piece).unwrap();
                    model.push_str(&piece);
                }
                1 => {
                    let ch = rng.alphanumeric();
                    s.append_char(ch).unwrap();
                    model.push(ch);
                }
                2 => {
                    let piece: String = (0..rng.usize(0..8)).map(|_| rng.lowercase()).collect();
                    s.assign_str(&piece).unwrap();
                    model = piece;
                }
                _ => {
                    if rng.u8(0..10) == 0 {
                        s.clear();
                        model.clear();
                    }
                }
            }
            if s.is_allocated() {
                assert_terminated(&s);
            }
            assert_eq!(s.as_str(), model);
        }
    }
}
