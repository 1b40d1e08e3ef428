// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Symmetric encryption for `Encrypted` values
//!
//! Keys are derived from passphrases registered in the
//! [`RuntimeConfig`](crate::config::RuntimeConfig) key store. Ciphers are
//! AEAD constructions from `ring`.
//!
//! # Ciphertext Layout
//!
//! ```text
//! +-------------+------------------------+-----------+
//! | nonce (12)  | ciphertext (plaintext) | tag (16)  |
//! +-------------+------------------------+-----------+
//! ```
//!
//! A fresh random nonce is drawn for every encryption. The IV derived
//! together with the key is bound as associated data, so a ciphertext only
//! opens with the exact passphrase it was produced from.
//!
//! # Example
//!
//! ```
//! use kiara::cdt::DynBuffer;
//! use kiara::security::{Cipher, CipherContext, SymmetricKey};
//!
//! let key = SymmetricKey::from_text(Cipher::default(), "shared secret")?;
//!
//! let mut sealer = CipherContext::new();
//! sealer.init_encryption(&key)?;
//! let mut sealed = DynBuffer::new();
//! sealer.encrypt(&mut sealed, b"payload")?;
//!
//! let mut opener = CipherContext::new();
//! opener.init_decryption(&key)?;
//! let mut opened = DynBuffer::new();
//! opener.decrypt(&mut opened, sealed.as_slice())?;
//! assert_eq!(opened.as_slice(), b"payload");
//! # Ok::<(), kiara::Error>(())
//! ```

mod context;
mod key;

pub use context::CipherContext;
pub use key::SymmetricKey;

use crate::error::{Error, Result};
use ring::aead;

/// Key length of every supported cipher
pub const KEY_LEN: usize = 32;
/// Length of the IV derived together with the key
pub const IV_LEN: usize = 16;
pub const NONCE_LEN: usize = aead::NONCE_LEN;
pub const TAG_LEN: usize = 16;

/// Cipher algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cipher {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl Cipher {
    pub fn name(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }

    /// Parse a cipher name as used in [`Settings`](crate::config::Settings)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" | "chacha20poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(Error::UnsupportedFeature(format!("unknown cipher '{}'", other))),
        }
    }

    pub(crate) fn algorithm(self) -> &'static aead::Algorithm {
        match self {
            Self::Aes256Gcm => &aead::AES_256_GCM,
            Self::ChaCha20Poly1305 => &aead::CHACHA20_POLY1305,
        }
    }

    /// Bytes added to a plaintext by [`CipherContext::encrypt`]
    pub fn overhead(self) -> usize {
        NONCE_LEN + self.algorithm().tag_len()
    }
}

impl std::fmt::Display for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_names() {
        for c in [Cipher::Aes256Gcm, Cipher::ChaCha20Poly1305] {
            assert_eq!(Cipher::from_name(c.name()).unwrap(), c);
            assert_eq!(c.overhead(), NONCE_LEN + TAG_LEN);
        }
        assert_eq!(Cipher::default().name(), crate::config::DEFAULT_CIPHER);
        assert!(Cipher::from_name("rot13").is_err());
    }
}
