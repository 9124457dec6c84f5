// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error handling for the value container, conversion graph and wire codecs.
//!
//! Errors fall into five families:
//!
//! - **type errors**: wrong or missing type on `expose`/`extract`/`set`,
//!   non-comparable operands;
//! - **immutability errors**: writes refused by an immutable container;
//! - **conversion errors**: no route, no exact route, empty source, or a
//!   user converter failing mid-chain;
//! - **registry errors**: ambiguous user aliases, duplicate registrations
//!   (the latter are logged, never raised);
//! - **wire-format errors**: header mismatches, premature EOF, malformed
//!   elements, declared-size disagreements.
//!
//! Always create errors through the static constructor functions rather
//! than the enum variants: the constructors honor the
//! `PROTEAN_PANIC_ON_ERROR` compile-time toggle, which turns every error
//! construction site into a panic with a full backtrace for debugging.

use std::borrow::Cow;

use thiserror::Error;

use crate::types::CastWarning;

/// Set `PROTEAN_PANIC_ON_ERROR=1` at compile time to panic at the exact
/// location an error is created instead of propagating it.
pub const PANIC_ON_ERROR: bool = option_env!("PROTEAN_PANIC_ON_ERROR").is_some();

macro_rules! maybe_panic {
    ($err:expr) => {{
        let err = $err;
        if PANIC_ON_ERROR {
            panic!("PROTEAN_PANIC_ON_ERROR: {}", err);
        }
        err
    }};
}

/// Error type for all container, conversion and serialization operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The container holds a different type than the operation expects.
    #[error("type mismatch: expected {expected}, container holds {found}")]
    TypeMismatch {
        expected: Cow<'static, str>,
        found: Cow<'static, str>,
    },

    /// A typed operation was attempted on an empty container.
    #[error("container is empty: {0}")]
    EmptyContainer(Cow<'static, str>),

    /// A write was refused by an immutable container.
    #[error("container is immutable: {0}")]
    Immutable(Cow<'static, str>),

    /// The two operands cannot be compared, even through the conversion graph.
    #[error("values are not comparable: {0}")]
    NotComparable(Cow<'static, str>),

    /// A conversion was requested from an empty container.
    #[error("conversion source is empty")]
    EmptySource,

    /// No conversion route exists between the two types.
    #[error("no conversion route from {from} to {to}")]
    NoRoute {
        from: Cow<'static, str>,
        to: Cow<'static, str>,
    },

    /// A route exists, but no all-exact route, and exactness was mandatory.
    #[error("no exact conversion route from {from} to {to}")]
    NoExactRoute {
        from: Cow<'static, str>,
        to: Cow<'static, str>,
    },

    /// A user-registered converter failed while executing a conversion
    /// chain. `index` is the zero-based position of the failing edge.
    #[error("conversion function at step {index} failed: {source}")]
    CastFailed {
        index: usize,
        source: anyhow::Error,
    },

    /// A conversion produced a warning while warnings are escalated.
    #[error("conversion warning escalated to error: {0:?}")]
    CastWarning(CastWarning),

    /// A conversion edge with identical source and destination was registered.
    #[error("self-loop conversion registered for {0}; identity casts are implicit")]
    SelfLoop(Cow<'static, str>),

    /// Two registered identities share the requested name.
    #[error("type name {0:?} is ambiguous: shared by more than one registered type")]
    AmbiguousName(Cow<'static, str>),

    /// The type is not present in the registry.
    #[error("unknown type: {0}")]
    UnknownType(Cow<'static, str>),

    /// A record's POD flag disagrees with the registered type.
    #[error("POD flag disagrees with registered type {0}")]
    PodFlagMismatch(Cow<'static, str>),

    /// A POD record's declared length disagrees with the registered size.
    #[error("POD size disagrees with registered type size: expected {expected}, found {found}")]
    PodSizeMismatch { expected: usize, found: usize },

    /// A composite record carries fewer children than the type requires.
    #[error("record has too few child records: expected {expected}, found {found}")]
    MissingChildren { expected: usize, found: usize },

    /// The stream does not begin with the serialization magic marker.
    #[error("bad stream marker: {0}")]
    BadMarker(Cow<'static, str>),

    /// The stream was written by an incompatible format version.
    #[error("format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },

    /// The stream's endianness byte is invalid or names the other endianness.
    #[error("endian flag error: {0}")]
    EndianFlag(Cow<'static, str>),

    /// The stream's size-width byte disagrees with this platform.
    #[error("size_t width mismatch: expected {expected} bytes, found {found}")]
    WidthMismatch { expected: u8, found: u8 },

    /// The stream ended in the middle of a POD payload.
    #[error("EOF in middle of POD data")]
    EofInPod,

    /// The stream ended in the middle of an inline type definition.
    #[error("EOF during type definition")]
    EofInTypeDef,

    /// The stream ended while child records of a container were pending.
    #[error("EOF in middle of container")]
    EofInContainer,

    /// Clean end of stream where a record was requested.
    #[error("end of stream")]
    Eof,

    /// A read or write went past a buffer boundary.
    #[error("buffer out of bound: {0} + {1} > {2}")]
    BufferOutOfBound(usize, usize, usize),

    /// A structurally invalid element, attribute or payload was encountered.
    #[error("{0}")]
    Malformed(Cow<'static, str>),

    /// A hex payload carried an odd number of digits.
    #[error("hex payload has an odd number of digits: partial byte")]
    PartialHexByte,

    /// A hex payload carried a character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit {0:?} in payload")]
    BadHexDigit(char),

    /// A quoted text payload was never closed.
    #[error("unterminated quoted string")]
    UnterminatedString,

    /// Text remained after a POD payload was fully parsed.
    #[error("trailing characters after value: {0:?}")]
    TrailingText(Cow<'static, str>),

    /// A textual payload could not be parsed as the target type.
    #[error("parse error: {0}")]
    ParseError(Cow<'static, str>),

    /// The stream was never successfully opened.
    #[error("stream was never opened")]
    NotOpen,

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Underlying XML parse failure.
    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl Error {
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_mismatch<E, F>(expected: E, found: F) -> Self
    where
        E: Into<Cow<'static, str>>,
        F: Into<Cow<'static, str>>,
    {
        maybe_panic!(Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn empty_container<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::EmptyContainer(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn immutable<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::Immutable(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn not_comparable<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::NotComparable(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn empty_source() -> Self {
        maybe_panic!(Error::EmptySource)
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn no_route<F, T>(from: F, to: T) -> Self
    where
        F: Into<Cow<'static, str>>,
        T: Into<Cow<'static, str>>,
    {
        maybe_panic!(Error::NoRoute {
            from: from.into(),
            to: to.into(),
        })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn no_exact_route<F, T>(from: F, to: T) -> Self
    where
        F: Into<Cow<'static, str>>,
        T: Into<Cow<'static, str>>,
    {
        maybe_panic!(Error::NoExactRoute {
            from: from.into(),
            to: to.into(),
        })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn cast_failed(index: usize, source: anyhow::Error) -> Self {
        maybe_panic!(Error::CastFailed { index, source })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn cast_warning(warning: CastWarning) -> Self {
        maybe_panic!(Error::CastWarning(warning))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn self_loop<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::SelfLoop(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn ambiguous_name<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::AmbiguousName(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn unknown_type<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::UnknownType(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn pod_flag_mismatch<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::PodFlagMismatch(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn pod_size_mismatch(expected: usize, found: usize) -> Self {
        maybe_panic!(Error::PodSizeMismatch { expected, found })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn missing_children(expected: usize, found: usize) -> Self {
        maybe_panic!(Error::MissingChildren { expected, found })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn bad_marker<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::BadMarker(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn version_mismatch(expected: u8, found: u8) -> Self {
        maybe_panic!(Error::VersionMismatch { expected, found })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn endian_flag<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::EndianFlag(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn width_mismatch(expected: u8, found: u8) -> Self {
        maybe_panic!(Error::WidthMismatch { expected, found })
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn buffer_out_of_bound(offset: usize, length: usize, capacity: usize) -> Self {
        maybe_panic!(Error::BufferOutOfBound(offset, length, capacity))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn malformed<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::Malformed(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn trailing_text<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::TrailingText(s.into()))
    }

    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn parse_error<S: Into<Cow<'static, str>>>(s: S) -> Self {
        maybe_panic!(Error::ParseError(s.into()))
    }
}

/// Ensures a condition holds; otherwise returns the given [`enum@Error`].
///
/// ```
/// use protean_core::ensure;
/// use protean_core::error::Error;
///
/// fn check(n: i32) -> Result<(), Error> {
///     ensure!(n > 0, Error::malformed("value must be positive"));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

/// Returns early with a [`Error::Malformed`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($msg:literal) => {
        return Err($crate::error::Error::malformed($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::malformed(format!($fmt, $($arg)*)))
    };
}
