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

//! Text-like PODs: `String` travels as its UTF-8 bytes (variable length),
//! `char` as its 4-byte code point. The textual rendering of both is a
//! double-quoted, backslash-escaped form so embedded whitespace and
//! quotes survive the text codec.

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::serializer::PodSerial;

/// Renders `s` as a double-quoted string with backslash escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Parses a double-quoted string, requiring full consumption of `text`
/// apart from surrounding whitespace.
pub fn unquote(text: &str) -> Result<String, Error> {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    if chars.next() != Some('"') {
        return Err(Error::parse_error(format!(
            "expected opening quote in {trimmed:?}"
        )));
    }
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(Error::UnterminatedString),
            Some('"') => break,
            Some('\\') => match chars.next() {
                None => return Err(Error::UnterminatedString),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    return Err(Error::parse_error(format!(
                        "unknown escape sequence \\{other}"
                    )))
                }
            },
            Some(c) => out.push(c),
        }
    }
    let rest: String = chars.collect();
    if !rest.is_empty() {
        return Err(Error::trailing_text(rest));
    }
    Ok(out)
}

impl PodSerial for String {
    const BYTE_LEN: Option<usize> = None;

    fn pod_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::malformed(format!("string payload is not UTF-8: {e}")))
    }

    fn pod_text(&self) -> String {
        quote(self)
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        unquote(text)
    }
}

impl PodSerial for char {
    const BYTE_LEN: Option<usize> = Some(4);

    fn pod_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_u32(*self as u32);
        writer.dump()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let code = Reader::new(bytes).read_u32()?;
        char::from_u32(code)
            .ok_or_else(|| Error::malformed(format!("invalid char code point {code:#x}")))
    }

    fn pod_text(&self) -> String {
        quote(&self.to_string())
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        let s = unquote(text)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::parse_error(format!(
                "expected exactly one character, found {s:?}"
            ))),
        }
    }
}
