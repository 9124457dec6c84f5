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

use std::any::TypeId;

use protean::serializer::PodSerial;
use protean::{Any, Error, TypeRegistry};

#[derive(Clone, Debug, PartialEq)]
struct Celsius(f64);

impl PodSerial for Celsius {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        self.0.pod_bytes()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        f64::from_pod_bytes(bytes).map(Celsius)
    }

    fn pod_text(&self) -> String {
        self.0.pod_text()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        f64::from_pod_text(text).map(Celsius)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Fahrenheit(f64);

impl PodSerial for Fahrenheit {
    const BYTE_LEN: Option<usize> = Some(8);

    fn pod_bytes(&self) -> Vec<u8> {
        self.0.pod_bytes()
    }

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error> {
        f64::from_pod_bytes(bytes).map(Fahrenheit)
    }

    fn pod_text(&self) -> String {
        self.0.pod_text()
    }

    fn from_pod_text(text: &str) -> Result<Self, Error> {
        f64::from_pod_text(text).map(Fahrenheit)
    }
}

#[test]
fn test_builtin_lookup() {
    let registry = TypeRegistry::default();

    let by_name = registry.get_by_name("i32").unwrap();
    assert_eq!(by_name.type_id(), TypeId::of::<i32>());
    assert!(by_name.is_pod());
    assert_eq!(by_name.byte_len(), Some(4));

    let by_identity = registry.get_by_identity(TypeId::of::<i32>()).unwrap();
    assert_eq!(by_identity.key(), by_name.key());

    let by_key = registry.get_by_key(by_name.key()).unwrap();
    assert_eq!(by_key.wire_name(), "i32");

    // Variable-length POD.
    let string_info = registry.get_by_name("String").unwrap();
    assert!(string_info.is_pod());
    assert_eq!(string_info.byte_len(), None);

    // Composite.
    let vec_info = registry.get_by_name("Vec<i32>").unwrap();
    assert!(!vec_info.is_pod());

    // The reserved empty type sits at key 0.
    let nothing = registry.get_by_key(0).unwrap();
    assert_eq!(nothing.wire_name(), "Nothing");
    assert_eq!(nothing.byte_len(), Some(0));
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let mut registry = TypeRegistry::default();
    let first = registry.register_pod::<Celsius>("Celsius").unwrap();
    let second = registry.register_pod::<Celsius>("DegreesC").unwrap();
    assert_eq!(first, second);

    assert_eq!(registry.get_by_name("Celsius").unwrap().key(), first);
    // The discarded registration's alias was never indexed.
    assert!(matches!(
        registry.get_by_name("DegreesC"),
        Err(Error::UnknownType(_))
    ));
}

#[test]
fn test_ambiguous_alias_poisons_name() {
    let mut registry = TypeRegistry::default();
    let celsius_key = registry.register_pod::<Celsius>("Temperature").unwrap();
    let fahrenheit_key = registry.register_pod::<Fahrenheit>("Temperature").unwrap();

    // By-name operations fail for either identity.
    assert!(matches!(
        registry.get_by_name("Temperature"),
        Err(Error::AmbiguousName(_))
    ));

    // By-key and by-identity operations are unaffected.
    assert_eq!(registry.get_by_key(celsius_key).unwrap().alias(), Some("Temperature"));
    assert_eq!(
        registry
            .get_by_identity(TypeId::of::<Fahrenheit>())
            .unwrap()
            .key(),
        fahrenheit_key
    );
}

#[test]
fn test_ensure_creates_minimal_entry() {
    #[derive(Clone, Debug, PartialEq)]
    struct Opaque(u8);

    let mut registry = TypeRegistry::default();
    let key = registry.ensure::<Opaque>();
    assert_eq!(registry.ensure::<Opaque>(), key);

    let info = registry.get_by_key(key).unwrap();
    assert!(!info.is_pod());
    assert!(info.alias().is_none());

    // A minimal entry cannot serialize.
    let err = protean::serializer::serialize(&registry, &Any::new(Opaque(3))).unwrap_err();
    assert!(matches!(err, Error::UnknownType(_)));
}

#[test]
fn test_register_ordering() {
    let mut registry = TypeRegistry::default();
    registry.register_pod::<Celsius>("Celsius").unwrap();
    let before = registry.get_by_identity(TypeId::of::<Celsius>()).unwrap();
    assert!(before.harness().order.is_none());

    registry.register_ordering::<Celsius>().unwrap();
    let after = registry.get_by_identity(TypeId::of::<Celsius>()).unwrap();
    assert!(after.harness().order.is_some());
    assert_eq!(after.key(), before.key());
}

impl PartialOrd for Celsius {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}
