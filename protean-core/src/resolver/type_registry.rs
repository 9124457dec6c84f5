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

//! The process-wide table of registered types.
//!
//! Each entry maps a runtime type identity to a wire key, a display name,
//! an optional user alias, the POD flag and byte length, and a [`Harness`]
//! of function pointers for everything dispatched by runtime identity:
//! POD encode/decode, text print/parse, composite serialize/deserialize,
//! and ordering. Registration is idempotent per identity — the first
//! caller wins, later attempts are logged and discarded.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::any::{AnyType, AnyValue};
use crate::error::Error;
use crate::record::Record;
use crate::serializer::{MapKey, ObjectSerial, PodSerial};
use crate::types::{Nothing, TypeKey, NOTHING_KEY};

pub type PodEncodeFn = fn(&dyn AnyType) -> Result<Vec<u8>, Error>;
pub type PodDecodeFn = fn(&[u8]) -> Result<Box<dyn AnyType>, Error>;
pub type PrintFn = fn(&dyn AnyType) -> Result<String, Error>;
pub type ParseFn = fn(&str) -> Result<Box<dyn AnyType>, Error>;
pub type ObjectEncodeFn = fn(&dyn AnyType, &TypeRegistry) -> Result<Vec<Record>, Error>;
pub type ObjectDecodeFn = fn(&[Record], &TypeRegistry) -> Result<Box<dyn AnyType>, Error>;
pub type OrderFn = fn(&dyn AnyType, &dyn AnyType) -> Option<Ordering>;

/// Capability table attached to each registered type. Every field is a
/// plain function pointer so harnesses are freely copyable and sharable
/// across threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct Harness {
    pub pod_encode: Option<PodEncodeFn>,
    pub pod_decode: Option<PodDecodeFn>,
    pub print: Option<PrintFn>,
    pub parse: Option<ParseFn>,
    pub object_encode: Option<ObjectEncodeFn>,
    pub object_decode: Option<ObjectDecodeFn>,
    pub order: Option<OrderFn>,
}

impl Harness {
    fn pod<T: PodSerial>() -> Harness {
        Harness {
            pod_encode: Some(pod_encode_impl::<T>),
            pod_decode: Some(pod_decode_impl::<T>),
            print: Some(print_impl::<T>),
            parse: Some(parse_impl::<T>),
            object_encode: None,
            object_decode: None,
            order: None,
        }
    }

    fn object<T: ObjectSerial>() -> Harness {
        Harness {
            pod_encode: None,
            pod_decode: None,
            print: None,
            parse: None,
            object_encode: Some(object_encode_impl::<T>),
            object_decode: Some(object_decode_impl::<T>),
            order: None,
        }
    }
}

/// One registry entry.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    key: TypeKey,
    type_id: TypeId,
    name: String,
    alias: Option<String>,
    is_pod: bool,
    byte_len: Option<usize>,
    harness: Harness,
}

impl TypeInfo {
    #[inline(always)]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline(always)]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The display name derived from the Rust type path.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The user-supplied alias, if one was given at registration.
    #[inline(always)]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name written to the wire: the alias when present, the display
    /// name otherwise.
    #[inline(always)]
    pub fn wire_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    #[inline(always)]
    pub fn is_pod(&self) -> bool {
        self.is_pod
    }

    /// Fixed byte length of the POD form, `None` for variable-length PODs
    /// and composites.
    #[inline(always)]
    pub fn byte_len(&self) -> Option<usize> {
        self.byte_len
    }

    #[inline(always)]
    pub fn harness(&self) -> &Harness {
        &self.harness
    }
}

#[derive(Clone, Copy, Debug)]
enum NameSlot {
    Unique(TypeKey),
    Ambiguous,
}

/// Registry of type identities, names and capability harnesses.
pub struct TypeRegistry {
    by_identity: HashMap<TypeId, Arc<TypeInfo>>,
    by_key: HashMap<TypeKey, Arc<TypeInfo>>,
    by_name: HashMap<String, NameSlot>,
    next_key: TypeKey,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = TypeRegistry {
            by_identity: HashMap::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            next_key: NOTHING_KEY + 1,
        };
        registry.register_builtins().unwrap();
        registry
    }
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    /// Registers a POD type under a user alias. Idempotent per identity:
    /// a second registration of the same type keeps the first entry and
    /// logs the discarded attempt.
    pub fn register_pod<T: PodSerial>(&mut self, alias: &str) -> Result<TypeKey, Error> {
        self.insert::<T>(alias, T::BYTE_LEN, true, Harness::pod::<T>())
    }

    /// Registers a composite type whose serialized form is a list of
    /// child records.
    pub fn register_object<T: ObjectSerial>(&mut self, alias: &str) -> Result<TypeKey, Error> {
        self.insert::<T>(alias, None, false, Harness::object::<T>())
    }

    /// Registers `Vec<T>` for an already-known element type.
    pub fn register_sequence<T: AnyValue>(&mut self, alias: &str) -> Result<TypeKey, Error> {
        self.register_object::<Vec<T>>(alias)
    }

    /// Registers `HashMap<K, V>` for already-known key/value types.
    pub fn register_map<K, V>(&mut self, alias: &str) -> Result<TypeKey, Error>
    where
        K: MapKey,
        V: AnyValue,
    {
        self.register_object::<std::collections::HashMap<K, V>>(alias)
    }

    /// Creates a minimal, non-serializable entry for `T` if none exists.
    /// Used when a type first flows through the system without an
    /// explicit registration.
    pub fn ensure<T: AnyValue>(&mut self) -> TypeKey {
        if let Some(info) = self.by_identity.get(&TypeId::of::<T>()) {
            return info.key();
        }
        self.insert_unchecked::<T>("", None, false, Harness::default())
    }

    /// Attaches an ordering capability to `T`'s entry, creating a minimal
    /// entry when the type was never registered.
    pub fn register_ordering<T: AnyValue + PartialOrd>(&mut self) -> Result<(), Error> {
        self.ensure::<T>();
        self.update_harness(TypeId::of::<T>(), |harness| {
            harness.order = Some(order_impl::<T>);
        })
    }

    pub fn get_by_identity(&self, type_id: TypeId) -> Option<Arc<TypeInfo>> {
        self.by_identity.get(&type_id).cloned()
    }

    pub fn get_by_key(&self, key: TypeKey) -> Option<Arc<TypeInfo>> {
        self.by_key.get(&key).cloned()
    }

    /// Looks a type up by name or alias. An ambiguous name — one shared
    /// by two registered identities — fails for either identity.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<TypeInfo>, Error> {
        match self.by_name.get(name) {
            Some(NameSlot::Unique(key)) => self
                .by_key
                .get(key)
                .cloned()
                .ok_or_else(|| Error::unknown_type(name.to_owned())),
            Some(NameSlot::Ambiguous) => Err(Error::ambiguous_name(name.to_owned())),
            None => Err(Error::unknown_type(name.to_owned())),
        }
    }

    /// The name this entry would carry on the wire, failing when the name
    /// is currently shared by another identity.
    pub fn checked_wire_name<'a>(&self, info: &'a TypeInfo) -> Result<&'a str, Error> {
        let name = info.wire_name();
        match self.by_name.get(name) {
            Some(NameSlot::Ambiguous) => Err(Error::ambiguous_name(name.to_owned())),
            _ => Ok(name),
        }
    }

    fn insert<T: AnyValue>(
        &mut self,
        alias: &str,
        byte_len: Option<usize>,
        is_pod: bool,
        harness: Harness,
    ) -> Result<TypeKey, Error> {
        if let Some(existing) = self.by_identity.get(&TypeId::of::<T>()) {
            log::warn!(
                "type {} already registered as {:?} (key {}); discarding re-registration as {:?}",
                existing.name(),
                existing.wire_name(),
                existing.key(),
                alias
            );
            return Ok(existing.key());
        }
        Ok(self.insert_unchecked::<T>(alias, byte_len, is_pod, harness))
    }

    fn insert_unchecked<T: AnyValue>(
        &mut self,
        alias: &str,
        byte_len: Option<usize>,
        is_pod: bool,
        harness: Harness,
    ) -> TypeKey {
        let key = self.next_key;
        self.next_key += 1;
        let info = TypeInfo {
            key,
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>().to_owned(),
            alias: if alias.is_empty() {
                None
            } else {
                Some(alias.to_owned())
            },
            is_pod,
            byte_len,
            harness,
        };
        self.index_names(&info);
        let info = Arc::new(info);
        self.by_identity.insert(info.type_id(), info.clone());
        self.by_key.insert(key, info);
        key
    }

    fn index_names(&mut self, info: &TypeInfo) {
        self.claim_name(info.name.clone(), info.key);
        if let Some(alias) = &info.alias {
            if *alias != info.name {
                self.claim_name(alias.clone(), info.key);
            }
        }
    }

    fn claim_name(&mut self, name: String, key: TypeKey) {
        use std::collections::hash_map::Entry;
        match self.by_name.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(NameSlot::Unique(key));
            }
            Entry::Occupied(mut slot) => {
                if !matches!(slot.get(), NameSlot::Unique(existing) if *existing == key) {
                    log::warn!(
                        "type name {:?} is now shared by multiple identities; \
                         by-name operations on it will fail",
                        slot.key()
                    );
                    slot.insert(NameSlot::Ambiguous);
                }
            }
        }
    }

    fn update_harness(
        &mut self,
        type_id: TypeId,
        apply: impl FnOnce(&mut Harness),
    ) -> Result<(), Error> {
        let info = self
            .by_identity
            .get(&type_id)
            .ok_or_else(|| Error::unknown_type(format!("{type_id:?}")))?;
        let mut updated = (**info).clone();
        apply(&mut updated.harness);
        let updated = Arc::new(updated);
        self.by_key.insert(updated.key(), updated.clone());
        self.by_identity.insert(type_id, updated);
        Ok(())
    }

    fn register_nothing(&mut self) {
        let info = TypeInfo {
            key: NOTHING_KEY,
            type_id: TypeId::of::<Nothing>(),
            name: std::any::type_name::<Nothing>().to_owned(),
            alias: Some("Nothing".to_owned()),
            is_pod: true,
            byte_len: Some(0),
            harness: Harness::default(),
        };
        self.index_names(&info);
        let info = Arc::new(info);
        self.by_identity.insert(info.type_id(), info.clone());
        self.by_key.insert(NOTHING_KEY, info);
    }

    fn register_scalar<T: PodSerial + PartialOrd>(&mut self, alias: &str) -> Result<(), Error> {
        self.register_pod::<T>(alias)?;
        self.register_ordering::<T>()
    }

    fn register_builtins(&mut self) -> Result<(), Error> {
        self.register_nothing();

        self.register_scalar::<bool>("bool")?;
        self.register_scalar::<i8>("i8")?;
        self.register_scalar::<i16>("i16")?;
        self.register_scalar::<i32>("i32")?;
        self.register_scalar::<i64>("i64")?;
        self.register_scalar::<isize>("isize")?;
        self.register_scalar::<u8>("u8")?;
        self.register_scalar::<u16>("u16")?;
        self.register_scalar::<u32>("u32")?;
        self.register_scalar::<u64>("u64")?;
        self.register_scalar::<usize>("usize")?;
        self.register_scalar::<f32>("f32")?;
        self.register_scalar::<f64>("f64")?;
        self.register_scalar::<char>("char")?;
        self.register_scalar::<String>("String")?;
        self.register_scalar::<NaiveDate>("NaiveDate")?;
        self.register_scalar::<NaiveDateTime>("NaiveDateTime")?;

        self.register_sequence::<bool>("Vec<bool>")?;
        self.register_sequence::<i8>("Vec<i8>")?;
        self.register_sequence::<i16>("Vec<i16>")?;
        self.register_sequence::<i32>("Vec<i32>")?;
        self.register_sequence::<i64>("Vec<i64>")?;
        self.register_sequence::<u8>("Vec<u8>")?;
        self.register_sequence::<u16>("Vec<u16>")?;
        self.register_sequence::<u32>("Vec<u32>")?;
        self.register_sequence::<u64>("Vec<u64>")?;
        self.register_sequence::<f32>("Vec<f32>")?;
        self.register_sequence::<f64>("Vec<f64>")?;
        self.register_sequence::<String>("Vec<String>")?;

        self.register_map::<String, String>("HashMap<String,String>")?;
        self.register_map::<String, i64>("HashMap<String,i64>")?;

        Ok(())
    }
}

fn downcast<T: AnyValue>(v: &dyn AnyType) -> Result<&T, Error> {
    v.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::type_mismatch(std::any::type_name::<T>(), v.type_name().to_owned())
    })
}

fn pod_encode_impl<T: PodSerial>(v: &dyn AnyType) -> Result<Vec<u8>, Error> {
    Ok(downcast::<T>(v)?.pod_bytes())
}

fn pod_decode_impl<T: PodSerial>(bytes: &[u8]) -> Result<Box<dyn AnyType>, Error> {
    Ok(Box::new(T::from_pod_bytes(bytes)?))
}

fn print_impl<T: PodSerial>(v: &dyn AnyType) -> Result<String, Error> {
    Ok(downcast::<T>(v)?.pod_text())
}

fn parse_impl<T: PodSerial>(text: &str) -> Result<Box<dyn AnyType>, Error> {
    Ok(Box::new(T::from_pod_text(text)?))
}

fn object_encode_impl<T: ObjectSerial>(
    v: &dyn AnyType,
    registry: &TypeRegistry,
) -> Result<Vec<Record>, Error> {
    downcast::<T>(v)?.to_records(registry)
}

fn object_decode_impl<T: ObjectSerial>(
    children: &[Record],
    registry: &TypeRegistry,
) -> Result<Box<dyn AnyType>, Error> {
    Ok(Box::new(T::from_records(children, registry)?))
}

fn order_impl<T: AnyValue + PartialOrd>(a: &dyn AnyType, b: &dyn AnyType) -> Option<Ordering> {
    let a = a.as_any().downcast_ref::<T>()?;
    let b = b.as_any().downcast_ref::<T>()?;
    a.partial_cmp(b)
}
