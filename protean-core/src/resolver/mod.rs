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

//! Type resolution: the registry of registered types and the conversion
//! graph, plus the process-wide default instance of each.
//!
//! The defaults are created on first use and live for the process
//! lifetime. The `RwLock` wrappers exist to satisfy `Sync` for the
//! statics; the subsystem itself is single-threaded per instance, and
//! concurrent registration requires external coordination. Tests that
//! need isolation construct private [`TypeRegistry`]/[`TypeManager`]
//! instances instead of touching the defaults.

pub mod type_manager;
pub mod type_registry;

use std::sync::{OnceLock, RwLock};

use type_manager::TypeManager;
use type_registry::TypeRegistry;

static GLOBAL_REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
static GLOBAL_MANAGER: OnceLock<RwLock<TypeManager>> = OnceLock::new();

/// The process-wide default type registry.
pub fn global_registry() -> &'static RwLock<TypeRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(TypeRegistry::default()))
}

/// The process-wide default conversion graph.
pub fn global_manager() -> &'static RwLock<TypeManager> {
    GLOBAL_MANAGER.get_or_init(|| RwLock::new(TypeManager::default()))
}

/// Runs `f` against the default registry, read-locked.
pub fn with_registry<R>(f: impl FnOnce(&TypeRegistry) -> R) -> R {
    f(&global_registry()
        .read()
        .expect("default type registry lock poisoned"))
}

/// Runs `f` against the default registry, write-locked.
pub fn with_registry_mut<R>(f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
    f(&mut global_registry()
        .write()
        .expect("default type registry lock poisoned"))
}

/// Runs `f` against the default conversion graph, read-locked.
pub fn with_manager<R>(f: impl FnOnce(&TypeManager) -> R) -> R {
    f(&global_manager()
        .read()
        .expect("default type manager lock poisoned"))
}

/// Runs `f` against the default conversion graph, write-locked.
pub fn with_manager_mut<R>(f: impl FnOnce(&mut TypeManager) -> R) -> R {
    f(&mut global_manager()
        .write()
        .expect("default type manager lock poisoned"))
}
