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

//! The wire-neutral intermediate representation of one serialized value.
//!
//! Both stream codecs linearize this tree; the serialization engine
//! produces and consumes it. Type keys always refer to the registry the
//! record was built against — readers resolve wire keys to local keys
//! before constructing records.

use crate::types::{TypeKey, NOTHING_KEY};

/// One serialized value: a type key plus either a flat POD payload or an
/// ordered list of child records.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// The reserved empty value, wire key 0.
    Nothing,
    /// A flat byte blob of a POD type.
    Pod { key: TypeKey, bytes: Vec<u8> },
    /// A composite value whose fields/elements are child records.
    Object { key: TypeKey, children: Vec<Record> },
}

impl Record {
    pub fn key(&self) -> TypeKey {
        match self {
            Record::Nothing => NOTHING_KEY,
            Record::Pod { key, .. } => *key,
            Record::Object { key, .. } => *key,
        }
    }

    pub fn is_pod(&self) -> bool {
        matches!(self, Record::Nothing | Record::Pod { .. })
    }

    /// Payload length for POD records, child count for composites.
    pub fn len(&self) -> usize {
        match self {
            Record::Nothing => 0,
            Record::Pod { bytes, .. } => bytes.len(),
            Record::Object { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
