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

//! The serialization engine: walks a container to and from the
//! wire-neutral [`Record`] tree, dispatching through the type registry.
//!
//! POD types implement [`PodSerial`] (flat byte blob plus a textual
//! rendering); composites implement [`ObjectSerial`] (an ordered list of
//! child records). Both are registered into a [`TypeRegistry`], which is
//! the only source of dispatch at serialization time.

mod bool;
mod datetime;
mod map;
mod numeric;
mod sequence;
mod string;

pub use map::MapKey;
pub use string::{quote, unquote};

use std::any::TypeId;

use crate::any::{Any, AnyValue};
use crate::ensure;
use crate::error::Error;
use crate::record::Record;
use crate::resolver::type_registry::{TypeInfo, TypeRegistry};
use crate::types::NOTHING_KEY;

/// A type whose serialized form is a flat, possibly fixed-length byte
/// blob, with a textual rendering for the text codec.
pub trait PodSerial: AnyValue {
    /// Fixed byte length of the blob, or `None` for variable-length PODs.
    const BYTE_LEN: Option<usize>;

    fn pod_bytes(&self) -> Vec<u8>;

    fn from_pod_bytes(bytes: &[u8]) -> Result<Self, Error>;

    /// Textual form written by the text codec. Must be fully consumed by
    /// [`PodSerial::from_pod_text`].
    fn pod_text(&self) -> String;

    fn from_pod_text(text: &str) -> Result<Self, Error>;
}

/// A composite type serialized as an ordered list of child records.
pub trait ObjectSerial: AnyValue {
    fn to_records(&self, registry: &TypeRegistry) -> Result<Vec<Record>, Error>;

    fn from_records(children: &[Record], registry: &TypeRegistry) -> Result<Self, Error>;
}

/// Serializes the value held by `value` into a record tree.
///
/// Fails for types missing from the registry, for registered types
/// without a serializer harness, and for types whose effective wire name
/// is currently ambiguous.
pub fn serialize(registry: &TypeRegistry, value: &Any) -> Result<Record, Error> {
    if value.is_empty() {
        return Ok(Record::Nothing);
    }
    let info = registry.get_by_identity(value.type_id()).ok_or_else(|| {
        Error::unknown_type(format!("cannot serialize unknown type {}", value.type_name()))
    })?;
    registry.checked_wire_name(&info)?;
    if info.is_pod() {
        let encode = require_pod_encode(&info)?;
        let bytes = value.with_value(|v| encode(v))??;
        check_pod_len(&info, bytes.len())?;
        Ok(Record::Pod {
            key: info.key(),
            bytes,
        })
    } else {
        let encode = require_object_encode(&info)?;
        let children = value.with_value(|v| encode(v, registry))??;
        Ok(Record::Object {
            key: info.key(),
            children,
        })
    }
}

/// Reconstructs a container from a record tree. Key 0 always yields an
/// empty container.
pub fn deserialize(registry: &TypeRegistry, record: &Record) -> Result<Any, Error> {
    match record {
        Record::Nothing => Ok(Any::empty()),
        Record::Pod { key, bytes } => {
            if *key == NOTHING_KEY {
                ensure!(
                    bytes.is_empty(),
                    Error::pod_size_mismatch(0, bytes.len())
                );
                return Ok(Any::empty());
            }
            let info = lookup(registry, *key)?;
            registry.checked_wire_name(&info)?;
            if !info.is_pod() {
                return Err(Error::pod_flag_mismatch(info.name().to_owned()));
            }
            check_pod_len(&info, bytes.len())?;
            let decode = info.harness().pod_decode.ok_or_else(|| {
                Error::unknown_type(format!("type {} has no registered deserializer", info.name()))
            })?;
            Ok(Any::from_boxed(decode(bytes)?))
        }
        Record::Object { key, children } => {
            let info = lookup(registry, *key)?;
            registry.checked_wire_name(&info)?;
            if info.is_pod() {
                return Err(Error::pod_flag_mismatch(info.name().to_owned()));
            }
            let decode = info.harness().object_decode.ok_or_else(|| {
                Error::unknown_type(format!("type {} has no registered deserializer", info.name()))
            })?;
            Ok(Any::from_boxed(decode(children, registry)?))
        }
    }
}

/// Serializes a typed value directly, without boxing it into a container.
/// Used by [`ObjectSerial`] implementations for their children.
pub fn to_record<T: AnyValue>(registry: &TypeRegistry, value: &T) -> Result<Record, Error> {
    let info = registry.get_by_identity(TypeId::of::<T>()).ok_or_else(|| {
        Error::unknown_type(format!(
            "cannot serialize unknown type {}",
            std::any::type_name::<T>()
        ))
    })?;
    registry.checked_wire_name(&info)?;
    if info.is_pod() {
        let encode = require_pod_encode(&info)?;
        let bytes = encode(value)?;
        check_pod_len(&info, bytes.len())?;
        Ok(Record::Pod {
            key: info.key(),
            bytes,
        })
    } else {
        let encode = require_object_encode(&info)?;
        Ok(Record::Object {
            key: info.key(),
            children: encode(value, registry)?,
        })
    }
}

/// Typed counterpart of [`deserialize`], for child records.
pub fn from_record<T: AnyValue>(registry: &TypeRegistry, record: &Record) -> Result<T, Error> {
    let value = deserialize(registry, record)?;
    if value.is_empty() {
        return Err(Error::type_mismatch(
            std::any::type_name::<T>(),
            "Nothing",
        ));
    }
    let guard = value.peek::<T>()?;
    Ok((*guard).clone())
}

/// Validates that a composite record carries at least `expected` children.
pub fn require_children(children: &[Record], expected: usize) -> Result<(), Error> {
    if children.len() < expected {
        return Err(Error::missing_children(expected, children.len()));
    }
    Ok(())
}

fn lookup(registry: &TypeRegistry, key: u64) -> Result<std::sync::Arc<TypeInfo>, Error> {
    registry
        .get_by_key(key)
        .ok_or_else(|| Error::unknown_type(format!("no type registered under key {key}")))
}

fn check_pod_len(info: &TypeInfo, found: usize) -> Result<(), Error> {
    if let Some(expected) = info.byte_len() {
        if found != expected {
            return Err(Error::pod_size_mismatch(expected, found));
        }
    }
    Ok(())
}

fn require_pod_encode(
    info: &TypeInfo,
) -> Result<crate::resolver::type_registry::PodEncodeFn, Error> {
    info.harness().pod_encode.ok_or_else(|| {
        Error::unknown_type(format!("type {} has no registered serializer", info.name()))
    })
}

fn require_object_encode(
    info: &TypeInfo,
) -> Result<crate::resolver::type_registry::ObjectEncodeFn, Error> {
    info.harness().object_encode.ok_or_else(|| {
        Error::unknown_type(format!("type {} has no registered serializer", info.name()))
    })
}
