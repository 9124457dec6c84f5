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

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::serializer::PodSerial;

macro_rules! impl_pod_numeric {
    ($ty:ty, $len:expr, $write:ident, $read:ident) => {
        impl PodSerial for $ty {
            const BYTE_LEN: Option<usize> = Some($len);

            fn pod_bytes(&self) -> Vec<u8> {
                let mut writer = Writer::new();
                writer.$write(*self);
                writer.dump()
            }

            fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
                Reader::new(bytes).$read()
            }

            fn pod_text(&self) -> String {
                self.to_string()
            }

            fn from_pod_text(text: &str) -> Result<Self, Error> {
                text.trim().parse::<$ty>().map_err(|e| {
                    Error::parse_error(format!(
                        "invalid {} literal {:?}: {}",
                        stringify!($ty),
                        text,
                        e
                    ))
                })
            }
        }
    };
}

impl_pod_numeric!(i8, 1, write_i8, read_i8);
impl_pod_numeric!(i16, 2, write_i16, read_i16);
impl_pod_numeric!(i32, 4, write_i32, read_i32);
impl_pod_numeric!(i64, 8, write_i64, read_i64);
impl_pod_numeric!(u8, 1, write_u8, read_u8);
impl_pod_numeric!(u16, 2, write_u16, read_u16);
impl_pod_numeric!(u32, 4, write_u32, read_u32);
impl_pod_numeric!(u64, 8, write_u64, read_u64);
impl_pod_numeric!(f32, 4, write_f32, read_f32);
impl_pod_numeric!(f64, 8, write_f64, read_f64);

// The pointer-width integers travel as their 8-byte fixed forms so blobs
// stay portable; decoding checks the value still fits the local width.
impl PodSerial for isize {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_i64(*self as i64);
        writer.dump()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let wide = Reader::new(bytes).read_i64()?;
        isize::try_from(wide)
            .map_err(|_| Error::malformed(format!("isize value {wide} out of platform range")))
    }

    fn pod_text(&self) -> String {
        self.to_string()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        text.trim()
            .parse::<isize>()
            .map_err(|e| Error::parse_error(format!("invalid isize literal {text:?}: {e}")))
    }
}

impl PodSerial for usize {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_u64(*self as u64);
        writer.dump()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let wide = Reader::new(bytes).read_u64()?;
        usize::try_from(wide)
            .map_err(|_| Error::malformed(format!("usize value {wide} out of platform range")))
    }

    fn pod_text(&self) -> String {
        self.to_string()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        text.trim()
            .parse::<usize>()
            .map_err(|e| Error::parse_error(format!("invalid usize literal {text:?}: {e}")))
    }
}
