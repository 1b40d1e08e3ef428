// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable byte buffer with amortized doubling growth.
//!
//! `DynBuffer` tracks its logical `size` separately from its allocated
//! `capacity`. Growth triggered by an append or resize reallocates to
//! `max(capacity * 2, required)`; [`DynBuffer::reserve`] grows to exactly the
//! requested capacity. Every fallible operation leaves the buffer untouched
//! when allocation fails.

use crate::error::{Error, Result};
use std::fmt;

/// Growable byte buffer.
///
/// Invariants: `size() <= capacity()`, and there is no backing allocation
/// iff `capacity() == 0`.
#[derive(Clone, Default)]
pub struct DynBuffer {
    /// Backing storage; `storage.len()` is the capacity
    storage: Vec<u8>,
    size: usize,
}

impl DynBuffer {
    /// Create an empty buffer (no allocation)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: Vec::new(),
            size: 0,
        }
    }

    /// Create an empty buffer with exactly `capacity` bytes allocated
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Self::new();
        buf.reserve(capacity)?;
        Ok(buf)
    }

    /// Take ownership of `storage`; its full length becomes the capacity and
    /// the first `size` bytes the contents.
    pub fn from_storage(storage: Vec<u8>, size: usize) -> Result<Self> {
        let mut buf = Self::new();
        buf.set(storage, size)?;
        Ok(buf)
    }

    /// Replace the buffer with externally owned storage.
    pub fn set(&mut self, storage: Vec<u8>, size: usize) -> Result<()> {
        if size > storage.len() {
            return Err(Error::InvalidArgument(format!(
                "buffer size {} exceeds storage length {}",
                size,
                storage.len()
            )));
        }
        self.storage = storage;
        self.size = size;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// True when backing storage is allocated (`capacity() > 0`)
    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Contents (`size()` bytes)
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.size]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[..self.size]
    }

    /// Grow to exactly `capacity` bytes.
    ///
    /// No-op when the buffer is already large enough. Fails without
    /// modifying the buffer when `capacity < size()`.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.size {
            return Err(Error::InvalidArgument(format!(
                "cannot reserve {} bytes below current size {}",
                capacity, self.size
            )));
        }
        if capacity <= self.capacity() {
            return Ok(());
        }
        self.realloc(capacity, true)
    }

    /// Set the size, keeping existing contents across reallocation.
    ///
    /// Bytes beyond the previous size are unspecified.
    pub fn resize(&mut self, new_size: usize) -> Result<()> {
        self.ensure_capacity(new_size, true)?;
        self.size = new_size;
        Ok(())
    }

    /// Set the size; contents are dropped if a reallocation is needed.
    ///
    /// For callers about to overwrite the whole buffer.
    pub fn resize_nocopy(&mut self, new_size: usize) -> Result<()> {
        self.ensure_capacity(new_size, false)?;
        self.size = new_size;
        Ok(())
    }

    /// Replace contents with `src`
    pub fn copy_mem(&mut self, src: &[u8]) -> Result<()> {
        self.resize_nocopy(src.len())?;
        self.storage[..src.len()].copy_from_slice(src);
        Ok(())
    }

    pub fn append_mem(&mut self, src: &[u8]) -> Result<()> {
        let start = self.size;
        let end = start
            .checked_add(src.len())
            .ok_or(Error::AllocationFailed { requested: usize::MAX })?;
        self.resize(end)?;
        self.storage[start..end].copy_from_slice(src);
        Ok(())
    }

    pub fn append_byte(&mut self, byte: u8) -> Result<()> {
        self.append_mem(&[byte])
    }

    /// Replace contents with a copy of `other`'s
    pub fn assign(&mut self, other: &DynBuffer) -> Result<()> {
        self.copy_mem(other.as_slice())
    }

    pub fn append(&mut self, other: &DynBuffer) -> Result<()> {
        self.append_mem(other.as_slice())
    }

    /// Take `other`'s storage, leaving `other` empty and unallocated.
    pub fn move_from(&mut self, other: &mut DynBuffer) {
        self.storage = std::mem::take(&mut other.storage);
        self.size = std::mem::replace(&mut other.size, 0);
    }

    pub fn swap(&mut self, other: &mut DynBuffer) {
        std::mem::swap(self, other);
    }

    /// Hand the storage to the caller, truncated to the contents.
    ///
    /// The buffer becomes empty and unallocated.
    pub fn release(&mut self) -> Vec<u8> {
        let mut storage = std::mem::take(&mut self.storage);
        storage.truncate(self.size);
        self.size = 0;
        storage
    }

    /// Ensure a NUL byte follows the contents; `size()` does not change.
    pub fn make_cstr(&mut self) -> Result<()> {
        let required = self
            .size
            .checked_add(1)
            .ok_or(Error::AllocationFailed { requested: usize::MAX })?;
        self.ensure_capacity(required, true)?;
        self.storage[self.size] = 0;
        Ok(())
    }

    /// Drop contents, keep capacity
    pub fn clear(&mut self) {
        self.size = 0;
    }

    /// Grow with the amortized policy until `required` bytes fit.
    pub(crate) fn ensure_capacity(&mut self, required: usize, keep: bool) -> Result<()> {
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(());
        }
        let new_capacity = capacity.saturating_mul(2).max(required);
        self.realloc(new_capacity, keep)
    }

    /// Full backing storage, spare capacity included.
    pub(crate) fn storage(&self) -> &[u8] {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    fn realloc(&mut self, new_capacity: usize, keep: bool) -> Result<()> {
        let failed = |_| Error::AllocationFailed {
            requested: new_capacity,
        };
        if keep {
            let additional = new_capacity - self.storage.len();
            self.storage.try_reserve_exact(additional).map_err(failed)?;
            self.storage.resize(new_capacity, 0);
        } else {
            let mut storage = Vec::new();
            storage.try_reserve_exact(new_capacity).map_err(failed)?;
            storage.resize(new_capacity, 0);
            self.storage = storage;
        }
        Ok(())
    }
}

// Contents only; spare capacity does not take part.
impl PartialEq for DynBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for DynBuffer {}

impl AsRef<[u8]> for DynBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for DynBuffer {
    fn from(storage: Vec<u8>) -> Self {
        let size = storage.len();
        Self { storage, size }
    }
}

impl From<&[u8]> for DynBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl std::io::Write for DynBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append_mem(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::OutOfMemory, e.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for DynBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynBuffer")
            .field("size", &self.size)
            .field("capacity", &self.capacity())
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(buf: &DynBuffer) {
        assert!(buf.size() <= buf.capacity());
        assert_eq!(buf.is_allocated(), buf.capacity() > 0);
    }

    #[test]
    fn test_append_doubles_capacity() {
        let mut buf = DynBuffer::new();
        assert!(!buf.is_allocated());

        buf.append_mem(b"abcd").unwrap();
        assert_eq!(buf.capacity(), 4);

        buf.append_byte(b'e').unwrap();
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.as_slice(), b"abcde");

        // Large append jumps straight to the required size
        buf.append_mem(&[0u8; 100]).unwrap();
        assert_eq!(buf.capacity(), 105);
        check_invariants(&buf);
    }

    #[test]
    fn test_reserve_is_exact() {
        let mut buf = DynBuffer::new();
        buf.reserve(13).unwrap();
        assert_eq!(buf.capacity(), 13);
        assert_eq!(buf.size(), 0);

        // Already large enough
        buf.reserve(5).unwrap();
        assert_eq!(buf.capacity(), 13);
    }

    #[test]
    fn test_reserve_below_size_fails_without_change() {
        let mut buf = DynBuffer::from(b"hello".to_vec());
        let err = buf.reserve(2).unwrap_err();
        assert_eq!(err.code(), crate::ResultCode::InvalidArgument);
        assert_eq!(buf.as_slice(), b"hello");
        assert_eq!(buf.capacity(), 5);
    }

    #[test]
    fn test_allocation_failure_leaves_buffer_intact() {
        let mut buf = DynBuffer::from(b"keep".to_vec());
        let err = buf.reserve(usize::MAX).unwrap_err();
        assert!(matches!(err, Error::AllocationFailed { .. }));
        assert_eq!(buf.as_slice(), b"keep");
        check_invariants(&buf);

        assert!(buf.resize_nocopy(usize::MAX).is_err());
        assert_eq!(buf.as_slice(), b"keep");
    }

    #[test]
    fn test_resize_preserves_contents() {
        let mut buf = DynBuffer::new();
        buf.copy_mem(b"0123").unwrap();
        buf.resize(64).unwrap();
        assert_eq!(&buf.as_slice()[..4], b"0123");
        buf.resize(2).unwrap();
        assert_eq!(buf.as_slice(), b"01");
        assert_eq!(buf.capacity(), 64);
    }

    #[test]
    fn test_resize_nocopy_drops_on_realloc() {
        let mut buf = DynBuffer::new();
        buf.copy_mem(b"abcd").unwrap();
        buf.resize_nocopy(3).unwrap();
        // No reallocation: bytes stay
        assert_eq!(buf.as_slice(), b"abc");
        buf.resize_nocopy(100).unwrap();
        assert_eq!(buf.size(), 100);
        assert!(buf.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_make_cstr_does_not_count_terminator() {
        let mut buf = DynBuffer::new();
        buf.copy_mem(b"xyz").unwrap();
        buf.make_cstr().unwrap();
        assert_eq!(buf.size(), 3);
        assert_eq!(buf.storage()[3], 0);
        assert!(buf.capacity() >= 4);
    }

    #[test]
    fn test_transfer_ops() {
        let mut a = DynBuffer::from(b"aa".to_vec());
        let mut b = DynBuffer::from(b"bbb".to_vec());

        a.append(&b).unwrap();
        assert_eq!(a.as_slice(), b"aabbb");

        a.swap(&mut b);
        assert_eq!(a.as_slice(), b"bbb");
        assert_eq!(b.as_slice(), b"aabbb");

        a.move_from(&mut b);
        assert_eq!(a.as_slice(), b"aabbb");
        assert!(!b.is_allocated());
        assert_eq!(b.size(), 0);

        b.assign(&a).unwrap();
        assert_eq!(b, a);

        let raw = a.release();
        assert_eq!(raw, b"aabbb");
        assert_eq!(a.capacity(), 0);
        check_invariants(&a);
    }

    #[test]
    fn test_set_rejects_oversized() {
        let mut buf = DynBuffer::new();
        assert!(buf.set(vec![0; 2], 3).is_err());
        buf.set(vec![1, 2, 3, 4], 2).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2]);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf = DynBuffer::from(vec![7; 32]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 32);
    }

    #[test]
    fn test_random_sequence_preserves_invariants() {
        let mut rng = fastrand::Rng::with_seed(0x6b69_6172);
        let mut buf = DynBuffer::new();
        let mut model: Vec<u8> = Vec::new();

        for _ in 0..2000 {
            match rng.u8(0..4) {
                0 => {
                    let chunk: Vec<u8> = (0..rng.usize(0..40)).map(|_| rng.u8(..)).collect();
                    buf.append_mem(&chunk).unwrap();
                    model.extend_from_slice(&chunk);
                }
                1 => {
                    let new_size = rng.usize(0..300);
                    let old = buf.size();
                    buf.resize(new_size).unwrap();
                    let keep = old.min(new_size);
                    model.truncate(keep);
                    model.extend_from_slice(&buf.as_slice()[keep..]);
                }
                2 => {
                    let cap = buf.size() + rng.usize(0..100);
                    buf.reserve(cap).unwrap();
                    assert!(buf.capacity() >= cap);
                }
                _ => {
                    let byte = rng.u8(..);
                    buf.append_byte(byte).unwrap();
                    model.push(byte);
                }
            }
            check_invariants(&buf);
            assert_eq!(buf.as_slice(), model.as_slice());
        }
    }
}
