// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Result codes and the crate-wide error type.
//!
//! Every public entry point returns [`Result`]. Each [`Error`] maps onto a
//! C-compatible [`ResultCode`] so that results can cross an FFI boundary
//! unchanged, and [`error_name`] turns a raw code back into a short label.

use std::fmt;

/// Result type for KIARA operations
pub type Result<T> = std::result::Result<T, Error>;

/// C-compatible result codes.
///
/// Discriminants are stable and part of the wire contract for generic
/// errors: a remote service reports one of these in the `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    GenericError = 1,
    InputError = 2,
    OutputError = 3,
    ConnectionError = 4,
    ApiError = 5,
    InitError = 6,
    FiniError = 7,
    InvalidValue = 8,
    InvalidType = 9,
    InvalidOperation = 10,
    InvalidArgument = 11,
    UnsupportedFeature = 12,
    ConfigError = 13,
    NetworkError = 14,
    RequestError = 15,
    ResponseError = 16,
    InvalidResponse = 17,
    Exception = 18,
    SymmetricKeyInitFailed = 100,
    EncryptionFailed = 101,
    DecryptionFailed = 102,
    AllocationFailed = 200,
}

impl ResultCode {
    /// Every defined code, in discriminant order.
    pub const ALL: [ResultCode; 23] = [
        Self::Success,
        Self::GenericError,
        Self::InputError,
        Self::OutputError,
        Self::ConnectionError,
        Self::ApiError,
        Self::InitError,
        Self::FiniError,
        Self::InvalidValue,
        Self::InvalidType,
        Self::InvalidOperation,
        Self::InvalidArgument,
        Self::UnsupportedFeature,
        Self::ConfigError,
        Self::NetworkError,
        Self::RequestError,
        Self::ResponseError,
        Self::InvalidResponse,
        Self::Exception,
        Self::SymmetricKeyInitFailed,
        Self::EncryptionFailed,
        Self::DecryptionFailed,
        Self::AllocationFailed,
    ];

    /// Convert from raw i32 value
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| *c as i32 == value)
    }

    /// Short human-readable label
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "no error",
            Self::GenericError => "generic error",
            Self::InputError => "input error",
            Self::OutputError => "output error",
            Self::ConnectionError => "connection error",
            Self::ApiError => "API error",
            Self::InitError => "initialization error",
            Self::FiniError => "finalization error",
            Self::InvalidValue => "invalid value",
            Self::InvalidType => "invalid type",
            Self::InvalidOperation => "invalid operation",
            Self::InvalidArgument => "invalid argument",
            Self::UnsupportedFeature => "unsupported feature",
            Self::ConfigError => "config error",
            Self::NetworkError => "network error",
            Self::RequestError => "request error",
            Self::ResponseError => "response error",
            Self::InvalidResponse => "invalid response",
            Self::Exception => "exception response",
            Self::SymmetricKeyInitFailed => "symmetric key initialization failed",
            Self::EncryptionFailed => "encryption failed",
            Self::DecryptionFailed => "decryption failed",
            Self::AllocationFailed => "allocation failed",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw result code to its label.
///
/// Unknown codes yield `"<unknown error code>"`.
pub fn error_name(code: i32) -> &'static str {
    ResultCode::from_i32(code).map_or("<unknown error code>", ResultCode::name)
}

/// Errors produced by the KIARA core.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    // ========================================================================
    // Memory
    // ========================================================================
    /// Buffer or string growth could not allocate
    AllocationFailed { requested: usize },

    // ========================================================================
    // Wire Errors
    // ========================================================================
    /// Malformed wire data on read
    Input(String),

    /// Write to the message failed
    Output(String),

    // ========================================================================
    // Programmer Errors (caught at marshaling boundaries)
    // ========================================================================
    /// Type cannot be marshaled or does not match the value
    InvalidType(String),

    /// Argument rejected (wrong arity, bad name, ...)
    InvalidArgument(String),

    /// Call made in the wrong state (unbalanced begin/end, ...)
    InvalidOperation(String),

    /// Value outside the representable range
    InvalidValue(String),

    /// Feature compiled out or not provided by a backend
    UnsupportedFeature(String),

    // ========================================================================
    // Transport and Protocol
    // ========================================================================
    /// Connection could not be established or was lost
    Connection(String),

    /// Network-level failure reported by the transport
    Network(String),

    /// Request could not be built or was rejected locally
    Request(String),

    /// Response does not belong to the request
    Response(String),

    /// Response could not be decoded
    InvalidResponse(String),

    /// The remote service answered with a generic error
    Remote { code: i32, message: Option<String> },

    // ========================================================================
    // Configuration and Lifecycle
    // ========================================================================
    /// Invalid or unreadable configuration
    Config(String),

    /// Initialization failed
    Init(String),

    // ========================================================================
    // Security
    // ========================================================================
    /// Key material could not be derived or loaded
    SymmetricKeyInit(String),

    /// Encryption failed
    Encryption(String),

    /// Decryption or authentication failed
    Decryption(String),

    /// Anything else
    Generic(String),
}

impl Error {
    /// Result code for this error
    pub fn code(&self) -> ResultCode {
        match self {
            Self::AllocationFailed { .. } => ResultCode::AllocationFailed,
            Self::Input(_) => ResultCode::InputError,
            Self::Output(_) => ResultCode::OutputError,
            Self::InvalidType(_) => ResultCode::InvalidType,
            Self::InvalidArgument(_) => ResultCode::InvalidArgument,
            Self::InvalidOperation(_) => ResultCode::InvalidOperation,
            Self::InvalidValue(_) => ResultCode::InvalidValue,
            Self::UnsupportedFeature(_) => ResultCode::UnsupportedFeature,
            Self::Connection(_) => ResultCode::ConnectionError,
            Self::Network(_) => ResultCode::NetworkError,
            Self::Request(_) => ResultCode::RequestError,
            Self::Response(_) => ResultCode::ResponseError,
            Self::InvalidResponse(_) => ResultCode::InvalidResponse,
            Self::Remote { .. } => ResultCode::Exception,
            Self::Config(_) => ResultCode::ConfigError,
            Self::Init(_) => ResultCode::InitError,
            Self::SymmetricKeyInit(_) => ResultCode::SymmetricKeyInitFailed,
            Self::Encryption(_) => ResultCode::EncryptionFailed,
            Self::Decryption(_) => ResultCode::DecryptionFailed,
            Self::Generic(_) => ResultCode::GenericError,
        }
    }

    /// Create a remote error with a message
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: Some(message.into()),
        }
    }

    /// True when the remote side declined the call (as opposed to a local
    /// or transport failure).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { requested } => {
                write!(f, "allocation of {} bytes failed", requested)
            }
            Self::Input(msg) => write!(f, "input error: {}", msg),
            Self::Output(msg) => write!(f, "output error: {}", msg),
            Self::InvalidType(msg) => write!(f, "invalid type: {}", msg),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
            Self::InvalidValue(msg) => write!(f, "invalid value: {}", msg),
            Self::UnsupportedFeature(msg) => write!(f, "unsupported feature: {}", msg),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Request(msg) => write!(f, "request error: {}", msg),
            Self::Response(msg) => write!(f, "response error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {}", msg),
            Self::Remote { code, message } => {
                write!(f, "remote exception {} ({})", code, error_name(*code))?;
                if let Some(msg) = message {
                    write!(f, ": {}", msg)?;
                }
                Ok(())
            }
            Self::Config(msg) => write!(f, "config error: {}", msg),
            Self::Init(msg) => write!(f, "initialization error: {}", msg),
            Self::SymmetricKeyInit(msg) => write!(f, "symmetric key init failed: {}", msg),
            Self::Encryption(msg) => write!(f, "encryption failed: {}", msg),
            Self::Decryption(msg) => write!(f, "decryption failed: {}", msg),
            Self::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::AllocationFailed { requested: 0 }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
