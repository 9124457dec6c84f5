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

//! Wire-format readers and writers.
//!
//! Two codecs linearize the [`Record`](crate::record::Record) tree: a
//! binary stream with a self-describing header and inline type
//! definitions, and a text/XML stream. Both track a four-valued status
//! word after every operation; the error-returning entry points are the
//! `read`/`write` methods themselves.

pub mod binary;
pub mod xml;

use bitflags::bitflags;

use crate::error::Error;

bitflags! {
    /// iostream-style stream state. `good` is the absence of every flag;
    /// `fail` marks logical failures (including out-of-range seeks and
    /// operations on never-opened streams), `bad` marks I/O-level loss of
    /// integrity, `eof` marks end of data.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct StreamStatus: u8 {
        const FAIL = 1;
        const BAD = 2;
        const EOF = 4;
    }
}

impl StreamStatus {
    pub fn good(self) -> bool {
        self.is_empty()
    }

    pub fn failed(self) -> bool {
        self.contains(StreamStatus::FAIL)
    }

    pub fn bad(self) -> bool {
        self.contains(StreamStatus::BAD)
    }

    pub fn eof(self) -> bool {
        self.contains(StreamStatus::EOF)
    }

    pub(crate) fn from_error(err: &Error) -> StreamStatus {
        match err {
            // Out-of-range seeks surface as InvalidInput and are logical
            // failures, not stream corruption.
            Error::Io(io) if io.kind() == std::io::ErrorKind::InvalidInput => StreamStatus::FAIL,
            Error::Io(_) => StreamStatus::BAD | StreamStatus::FAIL,
            Error::Eof | Error::EofInPod | Error::EofInTypeDef | Error::EofInContainer => {
                StreamStatus::EOF | StreamStatus::FAIL
            }
            _ => StreamStatus::FAIL,
        }
    }
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>, Error> {
    let text = text.trim();
    if let Some(c) = text.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(Error::BadHexDigit(c));
    }
    if text.len() % 2 != 0 {
        return Err(Error::PartialHexByte);
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| Error::PartialHexByte))
        .collect()
}
