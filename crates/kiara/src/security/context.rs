// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-direction cipher state.

use super::{Cipher, SymmetricKey, IV_LEN, NONCE_LEN};
use crate::cdt::DynBuffer;
use crate::error::{Error, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

struct Bound {
    direction: Direction,
    cipher: Cipher,
    key: LessSafeKey,
    iv: [u8; IV_LEN],
}

/// Encrypts or decrypts buffers with one key.
///
/// Created empty, then bound for one direction with
/// [`init_encryption`](Self::init_encryption) or
/// [`init_decryption`](Self::init_decryption).
pub struct CipherContext {
    bound: Option<Bound>,
    rng: SystemRandom,
}

impl CipherContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bound: None,
            rng: SystemRandom::new(),
        }
    }

    pub fn init_encryption(&mut self, key: &SymmetricKey) -> Result<()> {
        self.bind(key, Direction::Encrypt)
    }

    pub fn init_decryption(&mut self, key: &SymmetricKey) -> Result<()> {
        self.bind(key, Direction::Decrypt)
    }

    fn bind(&mut self, key: &SymmetricKey, direction: Direction) -> Result<()> {
        let unbound = UnboundKey::new(key.cipher().algorithm(), key.key_bytes()).map_err(|_| {
            Error::SymmetricKeyInit(format!("{} rejected the key", key.cipher()))
        })?;
        self.bound = Some(Bound {
            direction,
            cipher: key.cipher(),
            key: LessSafeKey::new(unbound),
            iv: *key.iv(),
        });
        Ok(())
    }

    fn bound_for(&self, direction: Direction) -> Result<&Bound> {
        match &self.bound {
            Some(b) if b.direction == direction => Ok(b),
            Some(_) => Err(Error::InvalidOperation(format!(
                "cipher context is not initialized for {:?}",
                direction
            ))),
            None => Err(Error::InvalidOperation("cipher context is not initialized".into())),
        }
    }

    /// Seal `src` into `dst`, which is resized to the ciphertext length.
    pub fn encrypt(&self, dst: &mut DynBuffer, src: &[u8]) -> Result<()> {
        let bound = self.bound_for(Direction::Encrypt)?;
        let tag_len = bound.key.algorithm().tag_len();
        let total = NONCE_LEN + src.len() + tag_len;
        dst.resize_nocopy(total)?;

        let out = dst.as_mut_slice();
        let (nonce_bytes, rest) = out.split_at_mut(NONCE_LEN);
        let (body, tag_slot) = rest.split_at_mut(src.len());

        self.rng
            .fill(nonce_bytes)
            .map_err(|_| Error::Encryption("system random source failed".into()))?;
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| Error::Encryption("invalid nonce".into()))?;

        body.copy_from_slice(src);
        let tag = bound
            .key
            .seal_in_place_separate_tag(nonce, Aad::from(bound.iv), body)
            .map_err(|_| Error::Encryption(format!("{} seal failed", bound.cipher)))?;
        tag_slot.copy_from_slice(tag.as_ref());
        Ok(())
    }

    /// Open `src` into `dst`, which is resized to the plaintext length.
    pub fn decrypt(&self, dst: &mut DynBuffer, src: &[u8]) -> Result<()> {
        let bound = self.bound_for(Direction::Decrypt)?;
        let tag_len = bound.key.algorithm().tag_len();
        if src.len() < NONCE_LEN + tag_len {
            return Err(Error::Decryption(format!(
                "ciphertext of {} bytes is shorter than nonce and tag",
                src.len()
            )));
        }

        let nonce = Nonce::try_assume_unique_for_key(&src[..NONCE_LEN])
            .map_err(|_| Error::Decryption("invalid nonce".into()))?;
        dst.copy_mem(&src[NONCE_LEN..])?;
        let plain_len = bound
            .key
            .open_in_place(nonce, Aad::from(bound.iv), dst.as_mut_slice())
            .map_err(|_| {
                Error::Decryption("authentication failed (wrong key or tampered data)".into())
            })?
            .len();
        dst.resize(plain_len)
    }
}

impl Default for CipherContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Bound {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}
