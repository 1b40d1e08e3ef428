// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::cast_sign_loss)] // Test data conversions
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::too_many_lines)] // Example/test code
#![allow(clippy::wildcard_imports)] // Test utility imports
#![allow(clippy::similar_names)] // Test variable naming
#![allow(clippy::needless_pass_by_value)] // Test functions
#![cfg(feature = "security")]

//! Encrypted fields through the full marshaling path.

use kiara::config::{RuntimeConfig, DEFAULT_SECRET_KEY_NAME};
use kiara::message::tbp::TbpMessage;
use kiara::message::Message;
use kiara::types::TypeKind;
use kiara::{Encrypted, Kiara, Marshaler, ResultCode, World};

#[derive(Kiara, Debug, Clone, PartialEq)]
struct Credentials {
    user: String,
    password: Encrypted<String>,
    #[kiara(encrypted = "session")]
    pin: u32,
    #[kiara(encrypted = "session")]
    history: Vec<String>,
}

fn keys() -> RuntimeConfig {
    let config = RuntimeConfig::new();
    config.set_secret_key(DEFAULT_SECRET_KEY_NAME, "long-term secret");
    config.set_secret_key("session", "ephemeral secret");
    config
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        user: "alice".into(),
        password: Encrypted(password.to_string()),
        pin: 4711,
        history: vec!["hunter1".into(), String::new()],
    }
}

fn seal(config: &RuntimeConfig, value: &Credentials) -> Vec<u8> {
    let mut msg = TbpMessage::scratch();
    Marshaler::with_keys(&mut msg, config).write(value).unwrap();
    msg.finish().unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn test_encrypted_fields_round_trip() {
    let config = keys();
    for password in ["", "p", "correct horse battery staple"] {
        let value = credentials(password);
        let bytes = seal(&config, &value);
        let mut back = TbpMessage::from_scratch(&bytes).unwrap();
        let got: Credentials = Marshaler::with_keys(&mut back, &config).read().unwrap();
        assert_eq!(got, value);
    }
}

#[test]
fn test_wire_hides_plaintext() {
    let config = keys();
    let bytes = seal(&config, &credentials("correct horse battery staple"));
    assert!(contains(&bytes, b"alice"));
    assert!(!contains(&bytes, b"correct horse"));
    assert!(!contains(&bytes, b"hunter1"));

    // Fresh nonces: sealing twice never yields the same bytes
    let again = seal(&config, &credentials("correct horse battery staple"));
    assert_ne!(bytes, again);
}

#[test]
fn test_wrong_or_missing_key() {
    let config = keys();
    let bytes = seal(&config, &credentials("pw"));

    let other = keys();
    other.set_secret_key("session", "not the session secret");
    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    let err = Marshaler::with_keys(&mut back, &other)
        .read::<Credentials>()
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::DecryptionFailed);

    let partial = RuntimeConfig::new();
    partial.set_secret_key(DEFAULT_SECRET_KEY_NAME, "long-term secret");
    let mut msg = TbpMessage::scratch();
    let err = Marshaler::with_keys(&mut msg, &partial)
        .write(&credentials("pw"))
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::SymmetricKeyInitFailed);
}

#[test]
fn test_tampered_ciphertext_rejected() {
    let config = keys();
    let mut bytes = seal(&config, &credentials("pw"));
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    let err = Marshaler::with_keys(&mut back, &config)
        .read::<Credentials>()
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::DecryptionFailed);
}

#[test]
fn test_declared_members_carry_key_names() {
    let mut world = World::new();
    let ty = world.type_of::<Credentials>();
    let TypeKind::Struct { members, .. } = world.kind(ty).unwrap() else {
        panic!("Credentials is not a struct");
    };
    let keys: Vec<Option<String>> = members
        .iter()
        .map(|m| match world.kind(m.ty).unwrap() {
            TypeKind::Encrypted { key_name, .. } => Some(key_name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        keys,
        [
            None,
            Some(DEFAULT_SECRET_KEY_NAME.to_string()),
            Some("session".to_string()),
            Some("session".to_string()),
        ]
    );
}

#[test]
fn test_sealed_value_must_be_consumed_entirely() {
    let config = keys();
    let mut msg = TbpMessage::scratch();
    Marshaler::with_keys(&mut msg, &config)
        .write_encrypted("session", &0x0102_0304_0506_0708u64)
        .unwrap();
    let bytes = msg.finish().unwrap();

    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    let err = Marshaler::with_keys(&mut back, &config)
        .read_encrypted::<u32>("session")
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InputError);
    assert!(err.to_string().contains("left over"));

    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    let value: u64 = Marshaler::with_keys(&mut back, &config)
        .read_encrypted("session")
        .unwrap();
    assert_eq!(value, 0x0102_0304_0506_0708);
}
