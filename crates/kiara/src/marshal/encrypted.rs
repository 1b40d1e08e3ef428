// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encrypted values.
//!
//! On write the value is marshaled into a TBP scratch message, the scratch
//! bytes are sealed with the named secret key, and the ciphertext goes on
//! the wire as one binary stream. Reading reverses the steps and marshals
//! the value back out of the opened scratch bytes. The outer protocol only
//! ever sees an opaque blob.

use super::{Marshal, Marshaler};
use crate::config::DEFAULT_SECRET_KEY_NAME;
use crate::error::{Error, Result};
use crate::message::tbp::TbpMessage;
use crate::message::Message;
use crate::types::{Declare, TypeRef, World};
use std::ops::{Deref, DerefMut};

/// A value sealed with the default secret key on the wire.
///
/// Use `#[kiara(encrypted = "name")]` on a struct field to pick another key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Encrypted<T>(pub T);

impl<T> Encrypted<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Encrypted<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Encrypted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Encrypted<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Declare> Declare for Encrypted<T> {
    fn declare(world: &mut World) -> TypeRef {
        let element = world.type_of::<T>();
        world.encrypted(element, DEFAULT_SECRET_KEY_NAME)
    }
}

impl<T: Marshal> Marshal for Encrypted<T> {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        m.write_encrypted(DEFAULT_SECRET_KEY_NAME, &self.0)
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        m.read_encrypted(DEFAULT_SECRET_KEY_NAME).map(Self)
    }
}

impl Marshaler<'_> {
    /// Write `value` sealed with the secret key `key_name`
    pub fn write_encrypted<T: Marshal>(&mut self, key_name: &str, value: &T) -> Result<()> {
        self.seal(key_name, |inner| value.write_to(inner))
    }

    /// Read a value sealed with the secret key `key_name`
    pub fn read_encrypted<T: Marshal>(&mut self, key_name: &str) -> Result<T> {
        self.open(key_name, |inner| T::read_from(inner))
    }

    /// Marshal through `body` into a scratch message and write it sealed.
    pub(crate) fn seal(
        &mut self,
        key_name: &str,
        body: impl FnOnce(&mut Marshaler<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut scratch = TbpMessage::scratch();
        let written = body(&mut self.nested(&mut scratch));
        let plain = written.and_then(|()| scratch.finish());
        scratch.wipe();
        let sealed = sealing::seal(self.keys(), key_name, plain?)?;
        self.message().write_binary_stream(&sealed)
    }

    /// Read a sealed stream and marshal its opened contents through `body`.
    ///
    /// The opened bytes must hold exactly one value.
    pub(crate) fn open<T>(
        &mut self,
        key_name: &str,
        body: impl FnOnce(&mut Marshaler<'_>) -> Result<T>,
    ) -> Result<T> {
        let sealed = self.message().read_binary_stream()?;
        let plain = sealing::open(self.keys(), key_name, &sealed)?;
        let mut scratch = TbpMessage::from_scratch(&plain)?;
        let (value, elements_left) = {
            let mut inner = self.nested(&mut scratch);
            let value = body(&mut inner);
            (value, inner.elements_left)
        };
        self.elements_left = elements_left;
        let trailing = scratch.unread_len();
        scratch.wipe();

        let value = value?;
        if trailing != 0 {
            return Err(Error::Input(format!(
                "{} bytes left over in value sealed with key '{}'",
                trailing, key_name
            )));
        }
        Ok(value)
    }
}

#[cfg(feature = "security")]
mod sealing {
    use crate::cdt::DynBuffer;
    use crate::config::RuntimeConfig;
    use crate::error::{Error, Result};
    use crate::security::{Cipher, CipherContext, SymmetricKey};
    use zeroize::{Zeroize, Zeroizing};

    fn key(keys: Option<&RuntimeConfig>, key_name: &str) -> Result<SymmetricKey> {
        let config = keys.ok_or_else(|| {
            Error::SymmetricKeyInit(format!(
                "no key store available for secret key '{}'",
                key_name
            ))
        })?;
        let passphrase = config
            .secret_key(key_name)
            .ok_or_else(|| Error::SymmetricKeyInit(format!("unknown secret key '{}'", key_name)))?;
        let cipher = Cipher::from_name(&config.settings().cipher)?;
        SymmetricKey::from_text(cipher, &passphrase)
    }

    pub(super) fn seal(
        keys: Option<&RuntimeConfig>,
        key_name: &str,
        mut plain: Vec<u8>,
    ) -> Result<Vec<u8>> {
        let mut ctx = CipherContext::new();
        ctx.init_encryption(&key(keys, key_name)?)?;
        let mut sealed = DynBuffer::new();
        let result = ctx.encrypt(&mut sealed, &plain);
        plain.zeroize();
        result?;
        log::trace!("[marshal] Sealed {} bytes with key '{}'", sealed.size(), key_name);
        Ok(sealed.release())
    }

    pub(super) fn open(
        keys: Option<&RuntimeConfig>,
        key_name: &str,
        sealed: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut ctx = CipherContext::new();
        ctx.init_decryption(&key(keys, key_name)?)?;
        let mut plain = DynBuffer::new();
        let result = ctx.decrypt(&mut plain, sealed);
        let plain = Zeroizing::new(plain.release());
        result?;
        Ok(plain)
    }
}

#[cfg(not(feature = "security"))]
mod sealing {
    use crate::config::RuntimeConfig;
    use crate::error::{Error, Result};

    fn unsupported(key_name: &str) -> Error {
        Error::UnsupportedFeature(format!(
            "encrypted value (key '{}') needs the `security` feature",
            key_name
        ))
    }

    pub(super) fn seal(_: Option<&RuntimeConfig>, key_name: &str, _: Vec<u8>) -> Result<Vec<u8>> {
        Err(unsupported(key_name))
    }

    pub(super) fn open(_: Option<&RuntimeConfig>, key_name: &str, _: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(key_name))
    }
}
