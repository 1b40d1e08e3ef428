// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! [`Marshal`] for built-in Rust types.
//!
//! | Rust type        | Wire form                         |
//! |------------------|-----------------------------------|
//! | scalars, `bool`  | scalar                            |
//! | `String`         | string                            |
//! | `DynString`      | user string                       |
//! | `Vec<T>`         | array                             |
//! | `[T; N]`         | array of exactly `N` elements     |
//! | `Option<Box<T>>` | array of 0 or 1 elements (pointer)|
//! | `()`             | nothing                           |

use super::{Marshal, Marshaler};
use crate::cdt::DynString;
use crate::error::{Error, Result};

macro_rules! impl_marshal_scalar {
    ($($type:ty => $write:ident, $read:ident);* $(;)?) => {
        $(
            impl Marshal for $type {
                #[inline]
                fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
                    m.message().$write(*self)
                }

                #[inline]
                fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
                    m.message().$read()
                }
            }
        )*
    };
}

impl_marshal_scalar! {
    bool => write_bool, read_bool;
    i8 => write_i8, read_i8;
    u8 => write_u8, read_u8;
    i16 => write_i16, read_i16;
    u16 => write_u16, read_u16;
    i32 => write_i32, read_i32;
    u32 => write_u32, read_u32;
    i64 => write_i64, read_i64;
    u64 => write_u64, read_u64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl Marshal for String {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        m.message().write_string(self)
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        m.message().read_string()
    }
}

impl Marshal for DynString {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        m.message().write_user_string(self)
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        let mut s = DynString::new();
        m.message().read_user_string(&mut s)?;
        Ok(s)
    }
}

impl Marshal for () {
    const WIRE_EMPTY: bool = true;

    fn write_to(&self, _m: &mut Marshaler<'_>) -> Result<()> {
        Ok(())
    }

    fn read_from(_m: &mut Marshaler<'_>) -> Result<Self> {
        Ok(())
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        m.write_seq(self.iter())
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        m.read_seq()
    }
}

impl<T: Marshal, const N: usize> Marshal for [T; N] {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        m.write_seq(self.iter())
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        let items: Vec<T> = m.read_seq()?;
        let len = items.len();
        items.try_into().map_err(|_| {
            Error::Input(format!("fixed array of {} elements received {}", N, len))
        })
    }
}

impl<T: Marshal> Marshal for Option<Box<T>> {
    fn write_to(&self, m: &mut Marshaler<'_>) -> Result<()> {
        match self {
            Some(value) => m.write_seq(std::iter::once(value.as_ref())),
            None => m.write_seq(std::iter::empty::<&T>()),
        }
    }

    fn read_from(m: &mut Marshaler<'_>) -> Result<Self> {
        let mut items: Vec<T> = m.read_seq()?;
        match items.len() {
            0 => Ok(None),
            1 => Ok(items.pop().map(Box::new)),
            n => Err(Error::Input(format!("pointer encoded with {} elements", n))),
        }
    }
}

// =======================================================================
// Call Arguments
// =======================================================================

/// Positional call arguments, each written as one top-level value.
pub trait MarshalArgs: Sized {
    const ARITY: usize;

    fn write_args(&self, m: &mut Marshaler<'_>) -> Result<()>;
    fn read_args(m: &mut Marshaler<'_>) -> Result<Self>;
}

impl MarshalArgs for () {
    const ARITY: usize = 0;

    fn write_args(&self, _m: &mut Marshaler<'_>) -> Result<()> {
        Ok(())
    }

    fn read_args(_m: &mut Marshaler<'_>) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_marshal_args {
    ($arity:expr; $($name:ident: $idx:tt),+) => {
        impl<$($name: Marshal),+> MarshalArgs for ($($name,)+) {
            const ARITY: usize = $arity;

            fn write_args(&self, m: &mut Marshaler<'_>) -> Result<()> {
                $( self.$idx.write_to(m)?; )+
                Ok(())
            }

            fn read_args(m: &mut Marshaler<'_>) -> Result<Self> {
                Ok(($( $name::read_from(m)?, )+))
            }
        }
    };
}

impl_marshal_args!(1; A: 0);
impl_marshal_args!(2; A: 0, B: 1);
impl_marshal_args!(3; A: 0, B: 1, C: 2);
impl_marshal_args!(4; A: 0, B: 1, C: 2, D: 3);
impl_marshal_args!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
