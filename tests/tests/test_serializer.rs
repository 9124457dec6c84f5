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

use std::collections::HashMap;

use chrono::NaiveDate;
use protean::serializer::{
    deserialize, from_record, require_children, serialize, to_record, ObjectSerial, PodSerial,
};
use protean::{Any, AnyValue, Error, Record, TypeRegistry};

fn round_trip<T: AnyValue>(registry: &TypeRegistry, value: T) {
    let record = serialize(registry, &Any::new(value.clone())).unwrap();
    let back = deserialize(registry, &record).unwrap();
    assert_eq!(*back.peek::<T>().unwrap(), value);
}

#[test]
fn test_pod_round_trips() {
    let registry = TypeRegistry::default();

    round_trip(&registry, true);
    round_trip(&registry, false);
    round_trip(&registry, 42i32);
    round_trip(&registry, i32::MAX);
    round_trip(&registry, i32::MIN);
    round_trip(&registry, i64::MIN);
    round_trip(&registry, u64::MAX);
    round_trip(&registry, -1.5f32);
    round_trip(&registry, f64::MAX);
    round_trip(&registry, 'λ');
    round_trip(&registry, String::new());
    round_trip(&registry, "line one\nline \"two\"\\".to_string());
    round_trip(
        &registry,
        NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
    );
    round_trip(
        &registry,
        NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 123_456)
            .unwrap(),
    );
}

#[test]
fn test_composite_round_trips() {
    let registry = TypeRegistry::default();

    round_trip(&registry, vec![1i32, -2, i32::MAX]);
    round_trip(&registry, Vec::<i32>::new());
    round_trip(&registry, vec!["a".to_string(), String::new()]);
    round_trip(&registry, vec![1.5f64, f64::MIN]);

    let mut map = HashMap::new();
    map.insert("answer".to_string(), 42i64);
    map.insert("zero".to_string(), 0i64);
    round_trip(&registry, map);
}

#[test]
fn test_nothing_round_trip() {
    let registry = TypeRegistry::default();
    let record = serialize(&registry, &Any::empty()).unwrap();
    assert_eq!(record, Record::Nothing);
    assert_eq!(record.key(), 0);
    let back = deserialize(&registry, &record).unwrap();
    assert!(back.is_empty());
}

#[test]
fn test_unknown_type_fails() {
    #[derive(Clone, Debug, PartialEq)]
    struct Unregistered;

    let registry = TypeRegistry::default();
    let err = serialize(&registry, &Any::new(Unregistered)).unwrap_err();
    assert!(matches!(err, Error::UnknownType(_)));
}

#[test]
fn test_pod_flag_and_size_validation() {
    let registry = TypeRegistry::default();
    let i32_key = registry.get_by_name("i32").unwrap().key();
    let vec_key = registry.get_by_name("Vec<i32>").unwrap().key();

    // POD record naming a composite type.
    let err = deserialize(
        &registry,
        &Record::Pod {
            key: vec_key,
            bytes: vec![0; 4],
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::PodFlagMismatch(_)));

    // Composite record naming a POD type.
    let err = deserialize(
        &registry,
        &Record::Object {
            key: i32_key,
            children: vec![],
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::PodFlagMismatch(_)));

    // Declared length disagrees with the fixed size.
    let err = deserialize(
        &registry,
        &Record::Pod {
            key: i32_key,
            bytes: vec![0; 2],
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::PodSizeMismatch {
            expected: 4,
            found: 2
        }
    ));
}

#[derive(Clone, Debug, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl ObjectSerial for Point {
    fn to_records(&self, registry: &TypeRegistry) -> Result<Vec<Record>, Error> {
        Ok(vec![
            to_record(registry, &self.x)?,
            to_record(registry, &self.y)?,
        ])
    }

    fn from_records(children: &[Record], registry: &TypeRegistry) -> Result<Self, Error> {
        require_children(children, 2)?;
        Ok(Point {
            x: from_record(registry, &children[0])?,
            y: from_record(registry, &children[1])?,
        })
    }
}

#[test]
fn test_custom_object_type() {
    let mut registry = TypeRegistry::default();
    registry.register_object::<Point>("Point").unwrap();

    round_trip(&registry, Point { x: 1.5, y: -2.5 });

    // Fewer children than the type requires.
    let point_key = registry.get_by_name("Point").unwrap().key();
    let only_x = to_record(&registry, &1.5f64).unwrap();
    let err = deserialize(
        &registry,
        &Record::Object {
            key: point_key,
            children: vec![only_x],
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingChildren {
            expected: 2,
            found: 1
        }
    ));
}

#[derive(Clone, Debug, PartialEq)]
struct Meters(f64);

impl PodSerial for Meters {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        self.0.pod_bytes()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        f64::from_pod_bytes(bytes).map(Meters)
    }

    fn pod_text(&self) -> String {
        self.0.pod_text()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        f64::from_pod_text(text).map(Meters)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Feet(f64);

impl PodSerial for Feet {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        self.0.pod_bytes()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        f64::from_pod_bytes(bytes).map(Feet)
    }

    fn pod_text(&self) -> String {
        self.0.pod_text()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        f64::from_pod_text(text).map(Feet)
    }
}

#[test]
fn test_ambiguous_alias_fails_serialization_for_both() {
    let mut registry = TypeRegistry::default();
    registry.register_pod::<Meters>("Length").unwrap();
    registry.register_pod::<Feet>("Length").unwrap();

    let err = serialize(&registry, &Any::new(Meters(1.0))).unwrap_err();
    assert!(matches!(err, Error::AmbiguousName(_)));
    let err = serialize(&registry, &Any::new(Feet(1.0))).unwrap_err();
    assert!(matches!(err, Error::AmbiguousName(_)));
}
