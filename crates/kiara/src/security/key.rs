// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Passphrase-derived symmetric keys.

use super::{Cipher, IV_LEN, KEY_LEN};
use crate::config::{KEY_DERIVATION_ROUNDS, KEY_DERIVATION_SALT};
use crate::error::{Error, Result};
use ring::pbkdf2;
use std::num::NonZeroU32;
use zeroize::Zeroize;

/// Key and IV derived from a passphrase.
///
/// Derivation is PBKDF2-HMAC-SHA1 over the fixed
/// [`KEY_DERIVATION_SALT`](crate::config::KEY_DERIVATION_SALT), so the same
/// passphrase gives the same key in every process. Material is wiped on drop.
pub struct SymmetricKey {
    cipher: Cipher,
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl SymmetricKey {
    pub fn from_text(cipher: Cipher, passphrase: &str) -> Result<Self> {
        let rounds = NonZeroU32::new(KEY_DERIVATION_ROUNDS).ok_or_else(|| {
            Error::SymmetricKeyInit("key derivation needs at least one round".into())
        })?;

        let mut material = [0u8; KEY_LEN + IV_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA1,
            rounds,
            &KEY_DERIVATION_SALT,
            passphrase.as_bytes(),
            &mut material,
        );

        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        key.copy_from_slice(&material[..KEY_LEN]);
        iv.copy_from_slice(&material[KEY_LEN..]);
        material.zeroize();

        log::trace!("[security] Derived {} key", cipher);
        Ok(Self { cipher, key, iv })
    }

    /// Build a key from raw material
    pub fn from_bytes(cipher: Cipher, key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { cipher, key, iv }
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub(crate) fn key_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub(crate) fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}
