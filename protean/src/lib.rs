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

//! # Protean
//!
//! Runtime type-erasure, conversion and self-describing serialization.
//!
//! Protean lets a program hold arbitrary typed values behind a uniform
//! handle, discover and apply conversions between type pairs through a
//! registered conversion graph, and serialize registered types to a
//! portable, versioned wire format — binary or XML — without compile-time
//! knowledge of the concrete types involved.
//!
//! ## Holding and converting values
//!
//! ```rust
//! use protean::Any;
//!
//! let value = Any::new(3.75f64);
//! // Numeric narrowing goes through the conversion graph; truncation is
//! // reported as a warning, not silently discarded.
//! let truncated: i32 = value.extract().unwrap();
//! assert_eq!(truncated, 3);
//! ```
//!
//! ## Reference modes
//!
//! ```rust
//! use protean::Any;
//!
//! let mut owner = Any::new(3i32);
//! let alias = owner.share_ref().unwrap();
//! owner.set(4i32).unwrap();
//! assert_eq!(alias.extract::<i32>().unwrap(), 4);
//! ```
//!
//! ## Serialization
//!
//! ```rust
//! use protean::{Any, TypeRegistry};
//! use protean::serializer::{serialize, deserialize};
//!
//! let registry = TypeRegistry::default();
//! let record = serialize(&registry, &Any::new(42i64)).unwrap();
//! let back = deserialize(&registry, &record).unwrap();
//! assert_eq!(back.extract::<i64>().unwrap(), 42);
//! ```

pub use protean_core::any::{self, Any, AnyValue};
pub use protean_core::buffer;
pub use protean_core::error::{self, Error};
pub use protean_core::record::{self, Record};
pub use protean_core::resolver::{
    self, global_manager, global_registry, with_manager, with_manager_mut, with_registry,
    with_registry_mut,
};
pub use protean_core::serializer;
pub use protean_core::stream::{self, binary, xml, StreamStatus};
pub use protean_core::types::{self, CastStatus, CastWarning, Nothing, TypeKey};
pub use protean_core::{TypeManager, TypeRegistry};
