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

//! # Protean Core
//!
//! Core implementation of the protean runtime type-erasure, conversion
//! and serialization toolkit.
//!
//! ## Architecture
//!
//! - **`any`**: the type-erased value container with owned, mutable- and
//!   immutable-reference ownership modes
//! - **`resolver`**: the type registry (capability table keyed by runtime
//!   identity) and the conversion graph, plus their process-wide defaults
//! - **`serializer`**: the engine walking containers to and from the
//!   wire-neutral record tree, with the built-in POD and composite codecs
//! - **`record`**: the wire-neutral record tree itself
//! - **`stream`**: binary and text/XML wire codecs with versioned,
//!   endian-checked headers
//! - **`buffer`**: little-endian byte buffers backing POD payloads
//! - **`types`**: wire constants and small shared enums
//! - **`error`**: the error taxonomy shared by every layer
//!
//! ## Example
//!
//! ```rust
//! use protean_core::any::Any;
//!
//! let holder = Any::new(42i32);
//! assert!(holder.is_type::<i32>());
//! assert_eq!(holder.extract::<i64>().unwrap(), 42);
//!
//! let alias = holder.share_ref().unwrap();
//! *alias.expose::<i32>().unwrap() = 7;
//! assert_eq!(holder.extract::<i32>().unwrap(), 7);
//! ```

pub mod any;
pub mod buffer;
pub mod error;
pub mod record;
pub mod resolver;
pub mod serializer;
pub mod stream;
pub mod types;

pub use any::{Any, AnyValue};
pub use error::Error;
pub use record::Record;
pub use resolver::type_manager::TypeManager;
pub use resolver::type_registry::TypeRegistry;
pub use types::{CastStatus, CastWarning, Nothing, TypeKey};
