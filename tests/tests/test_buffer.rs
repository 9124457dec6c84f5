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

use protean::buffer::{Reader, Writer};
use protean::Error;

#[test]
fn test_write_read_round_trip() {
    let mut writer = Writer::new();
    writer.write_u8(0xAB);
    writer.write_i32(-12345);
    writer.write_u64(u64::MAX);
    writer.write_f64(2.5);
    writer.write_bytes(b"tail");
    let bytes = writer.dump();

    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_u8().unwrap(), 0xAB);
    assert_eq!(reader.read_i32().unwrap(), -12345);
    assert_eq!(reader.read_u64().unwrap(), u64::MAX);
    assert_eq!(reader.read_f64().unwrap(), 2.5);
    assert_eq!(reader.read_bytes(4).unwrap(), b"tail");
    assert!(reader.is_exhausted());
}

#[test]
fn test_pod_blobs_are_little_endian() {
    let mut writer = Writer::new();
    writer.write_u32(0x0102_0304);
    assert_eq!(writer.dump(), vec![0x04, 0x03, 0x02, 0x01]);
}

#[test]
fn test_read_past_end_is_an_error() {
    let bytes = [1u8, 2];
    let mut reader = Reader::new(&bytes);
    assert!(matches!(
        reader.read_u32(),
        Err(Error::BufferOutOfBound(0, 4, 2))
    ));
    // The failed read does not consume anything.
    assert_eq!(reader.remaining(), 2);
    assert_eq!(reader.read_u16().unwrap(), 0x0201);
}
