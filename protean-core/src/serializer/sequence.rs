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

use crate::any::AnyValue;
use crate::error::Error;
use crate::record::Record;
use crate::resolver::type_registry::TypeRegistry;
use crate::serializer::{from_record, to_record, ObjectSerial};

/// A sequence serializes as one child record per element. The element
/// type must itself be registered.
impl<T: AnyValue> ObjectSerial for Vec<T> {
    fn to_records(&self, registry: &TypeRegistry) -> Result<Vec<Record>, Error> {
        self.iter().map(|elem| to_record(registry, elem)).collect()
    }

    fn from_records(children: &[Record], registry: &TypeRegistry) -> Result<Self, Error> {
        children
            .iter()
            .map(|child| from_record::<T>(registry, child))
            .collect()
    }
}
