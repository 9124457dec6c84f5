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
use std::hash::Hash;

use crate::any::AnyValue;
use crate::error::Error;
use crate::record::Record;
use crate::resolver::type_registry::TypeRegistry;
use crate::serializer::{from_record, to_record, ObjectSerial};

/// Bound for map key types.
pub trait MapKey: AnyValue + Eq + Hash {}

impl<T: AnyValue + Eq + Hash> MapKey for T {}

/// A map serializes as alternating key and value child records. Entry
/// order on the wire follows map iteration order and is not stable
/// between runs; equal maps may produce differently-ordered records.
impl<K: MapKey, V: AnyValue> ObjectSerial for HashMap<K, V> {
    fn to_records(&self, registry: &TypeRegistry) -> Result<Vec<Record>, Error> {
        let mut records = Vec::with_capacity(self.len() * 2);
        for (key, value) in self {
            records.push(to_record(registry, key)?);
            records.push(to_record(registry, value)?);
        }
        Ok(records)
    }

    fn from_records(children: &[Record], registry: &TypeRegistry) -> Result<Self, Error> {
        if children.len() % 2 != 0 {
            return Err(Error::missing_children(children.len() + 1, children.len()));
        }
        let mut map = HashMap::with_capacity(children.len() / 2);
        for pair in children.chunks_exact(2) {
            let key = from_record::<K>(registry, &pair[0])?;
            let value = from_record::<V>(registry, &pair[1])?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
