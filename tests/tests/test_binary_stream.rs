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

use std::io::{Cursor, SeekFrom};

use protean::binary::{BinaryIStream, BinaryOStream};
use protean::{Any, Error, TypeRegistry};

fn write_all(registry: &TypeRegistry, values: &[Any]) -> Vec<u8> {
    let mut out = BinaryOStream::from_sink(Cursor::new(Vec::new()));
    for value in values {
        out.write(registry, value).unwrap();
        assert!(out.status().good());
    }
    let mut sink = out.into_inner().unwrap();
    std::mem::take(sink.get_mut())
}

#[test]
fn test_round_trip_in_memory() {
    let registry = TypeRegistry::default();
    let bytes = write_all(
        &registry,
        &[
            Any::new(42i32),
            Any::empty(),
            Any::new("stream me".to_string()),
            Any::new(vec![1.5f64, -2.5]),
        ],
    );

    let mut input = BinaryIStream::from_source(Cursor::new(bytes));
    assert_eq!(input.read(&registry).unwrap(), 42i32);
    assert!(input.read(&registry).unwrap().is_empty());
    assert_eq!(input.read(&registry).unwrap(), "stream me".to_string());
    assert_eq!(input.read(&registry).unwrap(), vec![1.5f64, -2.5]);
    assert!(input.status().good());

    // Clean end of stream.
    let err = input.read(&registry).unwrap_err();
    assert!(matches!(err, Error::Eof));
    assert!(input.status().eof() && input.status().failed() && !input.status().bad());
}

#[test]
fn test_every_builtin_pod_round_trips() {
    let registry = TypeRegistry::default();
    let values = vec![
        Any::new(true),
        Any::new(i8::MIN),
        Any::new(i16::MAX),
        Any::new(7i32),
        Any::new(i32::MIN),
        Any::new(i64::MAX),
        Any::new(isize::MIN),
        Any::new(u8::MAX),
        Any::new(u16::MAX),
        Any::new(u32::MAX),
        Any::new(u64::MAX),
        Any::new(usize::MAX),
        Any::new(-1.5f32),
        Any::new(f64::MAX),
        Any::new('\u{10FFFF}'),
        Any::new("representative".to_string()),
        Any::new(String::new()),
        Any::new(chrono::NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()),
        Any::new(
            chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap(),
        ),
    ];

    let bytes = write_all(&registry, &values);
    let mut input = BinaryIStream::from_source(Cursor::new(bytes));
    for expected in &values {
        let got = input.read(&registry).unwrap();
        assert!(got == *expected, "mismatch for {}", expected.type_name());
    }
    assert!(matches!(input.read(&registry), Err(Error::Eof)));
}

#[test]
fn test_file_round_trip_and_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    let registry = TypeRegistry::default();

    let mut out = BinaryOStream::create(&path).unwrap();
    out.write(&registry, &Any::new(1i64)).unwrap();
    out.close().unwrap();

    let mut out = BinaryOStream::append(&path).unwrap();
    out.write(&registry, &Any::new(2i64)).unwrap();
    out.close().unwrap();

    let mut input = BinaryIStream::open_path(&path).unwrap();
    assert_eq!(input.read(&registry).unwrap(), 1i64);
    assert_eq!(input.read(&registry).unwrap(), 2i64);
    assert!(matches!(input.read(&registry), Err(Error::Eof)));
}

#[test]
fn test_never_opened_stream_fails_not_bad() {
    let registry = TypeRegistry::default();

    let mut out = BinaryOStream::new();
    let err = out.write(&registry, &Any::new(1i32)).unwrap_err();
    assert!(matches!(err, Error::NotOpen));
    assert!(out.status().failed() && !out.status().bad());

    let mut input = BinaryIStream::new();
    assert!(matches!(input.read(&registry), Err(Error::NotOpen)));
    assert!(input.status().failed() && !input.status().bad());
}

#[test]
fn test_out_of_range_seek_sets_fail_not_bad() {
    let registry = TypeRegistry::default();
    let bytes = write_all(&registry, &[Any::new(1i32)]);
    let mut input = BinaryIStream::from_source(Cursor::new(bytes));
    let err = input.seek(SeekFrom::Current(-1000)).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(input.status().failed() && !input.status().bad());
}

#[test]
#[cfg(target_endian = "little")]
fn test_header_validation() {
    let registry = TypeRegistry::default();
    let good = write_all(&registry, &[Any::new(7i32)]);

    // Bad magic marker.
    let mut corrupt = good.clone();
    corrupt[0] ^= 0xFF;
    let mut input = BinaryIStream::from_source(Cursor::new(corrupt));
    assert!(matches!(input.read(&registry), Err(Error::BadMarker(_))));

    // Version mismatch.
    let mut corrupt = good.clone();
    corrupt[4] = 99;
    let mut input = BinaryIStream::from_source(Cursor::new(corrupt));
    assert!(matches!(
        input.read(&registry),
        Err(Error::VersionMismatch {
            expected: 1,
            found: 99
        })
    ));

    // Endian byte flipped to its complement: recognized as the other
    // endianness and refused, rather than silently mis-decoding.
    let mut corrupt = good.clone();
    assert_eq!(corrupt[5], 0xE4);
    corrupt[5] = !corrupt[5];
    let mut input = BinaryIStream::from_source(Cursor::new(corrupt));
    assert!(matches!(input.read(&registry), Err(Error::EndianFlag(_))));

    // Endian byte that is neither marker.
    let mut corrupt = good.clone();
    corrupt[5] = 0x42;
    let mut input = BinaryIStream::from_source(Cursor::new(corrupt));
    assert!(matches!(input.read(&registry), Err(Error::EndianFlag(_))));

    // size_t width mismatch.
    let mut corrupt = good;
    corrupt[6] = 2;
    let mut input = BinaryIStream::from_source(Cursor::new(corrupt));
    assert!(matches!(
        input.read(&registry),
        Err(Error::WidthMismatch { .. })
    ));
}

#[test]
fn test_eof_in_middle_of_pod() {
    let registry = TypeRegistry::default();
    let mut bytes = write_all(&registry, &[Any::new(7i32)]);
    bytes.truncate(bytes.len() - 2);
    let mut input = BinaryIStream::from_source(Cursor::new(bytes));
    assert!(matches!(input.read(&registry), Err(Error::EofInPod)));
    assert!(input.status().eof());
}

#[test]
fn test_eof_during_type_definition() {
    let registry = TypeRegistry::default();
    let bytes = write_all(&registry, &[Any::new(7i32)]);
    // Header is 7 bytes; the first record starts with tag(1) + key(8),
    // then the inline definition. Cutting 13 bytes in lands inside the
    // definition's name-length word.
    let mut truncated = bytes;
    truncated.truncate(7 + 13);
    let mut input = BinaryIStream::from_source(Cursor::new(truncated));
    assert!(matches!(input.read(&registry), Err(Error::EofInTypeDef)));
}

#[test]
fn test_eof_in_middle_of_container() {
    let registry = TypeRegistry::default();
    // Two streams that differ only in the trailing second element: the
    // shorter one's length cuts the longer exactly before child two.
    let one = write_all(&registry, &[Any::new(vec![1i32])]);
    let two = write_all(&registry, &[Any::new(vec![1i32, 2i32])]);
    let mut truncated = two;
    truncated.truncate(one.len());
    let mut input = BinaryIStream::from_source(Cursor::new(truncated));
    assert!(matches!(input.read(&registry), Err(Error::EofInContainer)));
}

#[test]
fn test_reader_resolves_types_by_name() {
    use protean::serializer::PodSerial;

    #[derive(Clone, Debug, PartialEq)]
    struct Inches(f64);
    #[derive(Clone, Debug, PartialEq)]
    struct Yards(f64);

    macro_rules! delegate_pod {
        ($ty:ty) => {
            impl PodSerial for $ty {
                const BYTE_LEN: Option<usize> = Some(8);

                fn pod_bytes(&self) -> Vec<u8> {
                    self.0.pod_bytes()
                }

                fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
                    f64::from_pod_bytes(bytes).map(Self)
                }

                fn pod_text(&self) -> String {
                    self.0.pod_text()
                }

                fn from_pod_text(text: &str) -> Result<Self, Error> {
                    f64::from_pod_text(text).map(Self)
                }
            }
        };
    }
    delegate_pod!(Inches);
    delegate_pod!(Yards);

    // Registration order differs, so the two registries assign the two
    // types different keys; inline definitions reconcile them by name.
    let mut writer_registry = TypeRegistry::default();
    writer_registry.register_pod::<Inches>("Inches").unwrap();
    writer_registry.register_pod::<Yards>("Yards").unwrap();
    let mut reader_registry = TypeRegistry::default();
    reader_registry.register_pod::<Yards>("Yards").unwrap();
    reader_registry.register_pod::<Inches>("Inches").unwrap();

    let writer_key = writer_registry.get_by_name("Inches").unwrap().key();
    let reader_key = reader_registry.get_by_name("Inches").unwrap().key();
    assert_ne!(writer_key, reader_key);

    let bytes = write_all(&writer_registry, &[Any::new(Inches(12.0))]);
    let mut input = BinaryIStream::from_source(Cursor::new(bytes));
    let value = input.read(&reader_registry).unwrap();
    assert_eq!(*value.peek::<Inches>().unwrap(), Inches(12.0));
}
