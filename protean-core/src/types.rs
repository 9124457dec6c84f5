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

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;

/// Wire key assigned to each registered type, in registration order.
pub type TypeKey = u64;

/// Reserved wire key for the [`Nothing`] type. Always available, never
/// carried by an inline type definition.
pub const NOTHING_KEY: TypeKey = 0;

/// The type held by an empty container. Serializes as key 0 with an empty
/// payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Nothing;

/// Magic marker opening every binary stream.
pub const MAGIC: [u8; 4] = *b"PRTN";

/// Version byte written after the magic marker.
pub const FORMAT_VERSION: u8 = 1;

/// Width of the platform size type, asserted in the binary header.
pub const SIZE_WIDTH: u8 = std::mem::size_of::<usize>() as u8;

/// Marker printed for values whose type has no registered printer.
pub const NON_PRINTABLE: &str = "<non-printable object>";

/// Endianness byte carried in stream headers. The two values are bitwise
/// complements so a flipped byte still decodes to a recognized marker and
/// is reported as a mismatch rather than garbage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum EndianMark {
    Little = 0xE4,
    Big = 0x1B,
}

impl EndianMark {
    /// The marker for the running platform.
    pub fn native() -> EndianMark {
        if cfg!(target_endian = "little") {
            EndianMark::Little
        } else {
            EndianMark::Big
        }
    }

    /// Lowercase hex rendering used by the text codec (`"e4"` / `"1b"`).
    pub fn as_hex(self) -> &'static str {
        match self {
            EndianMark::Little => "e4",
            EndianMark::Big => "1b",
        }
    }

    /// Parses the text codec rendering of a marker.
    pub fn from_hex(s: &str) -> Result<EndianMark, Error> {
        match s {
            "e4" | "E4" => Ok(EndianMark::Little),
            "1b" | "1B" => Ok(EndianMark::Big),
            other => Err(Error::endian_flag(format!(
                "invalid endian attribute {other:?}"
            ))),
        }
    }
}

/// Tag byte preceding each binary record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RecordTag {
    /// The record's type key was defined earlier in this stream.
    Known = 0,
    /// An inline type definition precedes the record body.
    Define = 1,
}

/// Non-fatal conditions reported by numeric conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastWarning {
    /// The source value was outside the destination range; the destination
    /// was clamped to its nearest bound.
    OutOfRange,
    /// A fractional part was discarded converting to an integer type.
    Truncated,
}

/// Status-code form of extraction/conversion outcomes, for callers that
/// prefer codes over `Result`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastStatus {
    Ok,
    EmptySource,
    NoRoute,
    NoExactRoute,
    /// Zero-based index of the failing edge in the chosen path.
    CastFailed(usize),
    TypeMismatch,
    Other,
}

impl CastStatus {
    pub fn is_ok(self) -> bool {
        self == CastStatus::Ok
    }
}

impl From<&Error> for CastStatus {
    fn from(err: &Error) -> CastStatus {
        match err {
            Error::EmptySource | Error::EmptyContainer(_) => CastStatus::EmptySource,
            Error::NoRoute { .. } => CastStatus::NoRoute,
            Error::NoExactRoute { .. } => CastStatus::NoExactRoute,
            Error::CastFailed { index, .. } => CastStatus::CastFailed(*index),
            Error::TypeMismatch { .. } => CastStatus::TypeMismatch,
            _ => CastStatus::Other,
        }
    }
}
