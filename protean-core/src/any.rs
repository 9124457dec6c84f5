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

//! The type-erased value container.
//!
//! An [`Any`] holds at most one value behind one of three ownership
//! disciplines: owned, mutable reference, or immutable reference. The
//! value itself lives in a small reference-counted cell; referencing
//! containers share a handle to the owner's cell, so mutation through any
//! handle is visible through every other. A reference container never
//! controls the lifetime of the cell it points at.
//!
//! Deep copy and same-type equality ride the erased value's vtable and
//! need no registration. Ordering, printing and parsing are capabilities
//! looked up in the process-wide [`TypeRegistry`](crate::resolver::type_registry::TypeRegistry);
//! cross-type comparison consults the process-wide
//! [`TypeManager`](crate::resolver::type_manager::TypeManager).

use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::Error;
use crate::resolver;
use crate::types::{CastStatus, Nothing, TypeKey, NON_PRINTABLE, NOTHING_KEY};

/// Bound satisfied by every type a container can hold.
///
/// Blanket-implemented; user types only need `Clone + PartialEq + Debug`.
pub trait AnyValue: std::any::Any + Clone + PartialEq + fmt::Debug {}

impl<T: std::any::Any + Clone + PartialEq + fmt::Debug> AnyValue for T {}

/// Object-safe view of a held value: downcasting, deep copy and
/// same-type equality without knowing the concrete type.
pub trait AnyType: fmt::Debug {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
    fn clone_boxed(&self) -> Box<dyn AnyType>;
    fn eq_dyn(&self, other: &dyn AnyType) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T: AnyValue> AnyType for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn AnyType> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn AnyType) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|o| self == o)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// The shared storage cell. Owns the value exactly once; every container
/// referencing the value holds an `Rc` handle to the same cell. The held
/// type is fixed for the cell's lifetime, so the identity can be cached
/// outside the `RefCell`.
#[derive(Debug)]
pub(crate) struct Cell {
    type_id: TypeId,
    type_name: &'static str,
    value: RefCell<Box<dyn AnyType>>,
}

impl Cell {
    fn new<T: AnyValue>(v: T) -> Cell {
        Cell {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            value: RefCell::new(Box::new(v)),
        }
    }

    fn from_boxed(v: Box<dyn AnyType>) -> Cell {
        Cell {
            type_id: v.as_any().type_id(),
            type_name: v.type_name(),
            value: RefCell::new(v),
        }
    }

    fn deep_copy(&self) -> Cell {
        Cell {
            type_id: self.type_id,
            type_name: self.type_name,
            value: RefCell::new(self.value.borrow().clone_boxed()),
        }
    }
}

/// Shared read guard returned by [`Any::peek`].
pub struct Exposed<'a, T> {
    guard: Ref<'a, T>,
}

impl<T> Deref for Exposed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

/// Mutable guard returned by [`Any::expose`].
pub struct ExposedMut<'a, T> {
    guard: RefMut<'a, T>,
}

impl<T> Deref for ExposedMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for ExposedMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// A type-erased holder of one value.
#[derive(Debug, Default)]
pub struct Any {
    cell: Option<Rc<Cell>>,
    is_ref: bool,
    immutable: bool,
}

impl Any {
    /// Creates an empty container.
    pub fn empty() -> Any {
        Any::default()
    }

    /// Creates an owned container holding `v`.
    pub fn new<T: AnyValue>(v: T) -> Any {
        Any {
            cell: Some(Rc::new(Cell::new(v))),
            is_ref: false,
            immutable: false,
        }
    }

    /// Creates an owned container holding `v` that refuses later writes
    /// which would change its type.
    pub fn immutable<T: AnyValue>(v: T) -> Any {
        Any {
            cell: Some(Rc::new(Cell::new(v))),
            is_ref: false,
            immutable: true,
        }
    }

    pub(crate) fn from_boxed(v: Box<dyn AnyType>) -> Any {
        Any {
            cell: Some(Rc::new(Cell::from_boxed(v))),
            is_ref: false,
            immutable: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cell.is_none()
    }

    pub fn is_reference(&self) -> bool {
        self.is_ref
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Runtime identity of the held value; the [`Nothing`] identity when
    /// the container is empty.
    pub fn type_id(&self) -> TypeId {
        match &self.cell {
            Some(cell) => cell.type_id,
            None => TypeId::of::<Nothing>(),
        }
    }

    /// Human-readable name of the held type.
    pub fn type_name(&self) -> &'static str {
        match &self.cell {
            Some(cell) => cell.type_name,
            None => std::any::type_name::<Nothing>(),
        }
    }

    /// Wire key of the held type in the process-wide registry, if the type
    /// is registered. Empty containers report the reserved [`NOTHING_KEY`].
    pub fn type_key(&self) -> Option<TypeKey> {
        if self.is_empty() {
            return Some(NOTHING_KEY);
        }
        let tid = self.type_id();
        resolver::with_registry(|reg| reg.get_by_identity(tid).map(|info| info.key()))
    }

    /// True when the container holds a value of exactly `T`. An empty
    /// container is of no type at all, not even [`Nothing`].
    pub fn is_type<T: AnyValue>(&self) -> bool {
        match &self.cell {
            Some(cell) => cell.type_id == TypeId::of::<T>(),
            None => false,
        }
    }

    /// Replaces the held value.
    ///
    /// A same-type `set` writes into the held storage, so the new value
    /// is visible through every container sharing that storage — this is
    /// also the one write path an immutable reference allows. A
    /// type-changing `set` rebinds an owned mutable container to a fresh
    /// owned value, and is a type-mismatch error on any reference or
    /// immutable container. An empty container (immutable included)
    /// takes a fresh owned value.
    pub fn set<T: AnyValue>(&mut self, v: T) -> Result<(), Error> {
        if let Some(cell) = &self.cell {
            if cell.type_id == TypeId::of::<T>() {
                *cell.value.borrow_mut() = Box::new(v);
                return Ok(());
            }
            if self.immutable || self.is_ref {
                return Err(Error::type_mismatch(
                    std::any::type_name::<T>(),
                    cell.type_name,
                ));
            }
        }
        self.cell = Some(Rc::new(Cell::new(v)));
        self.is_ref = false;
        Ok(())
    }

    pub(crate) fn set_boxed(&mut self, v: Box<dyn AnyType>) -> Result<(), Error> {
        if let Some(cell) = &self.cell {
            if cell.type_id == v.as_any().type_id() {
                *cell.value.borrow_mut() = v;
                return Ok(());
            }
            if self.immutable || self.is_ref {
                return Err(Error::type_mismatch(v.type_name(), cell.type_name));
            }
        }
        self.cell = Some(Rc::new(Cell::from_boxed(v)));
        self.is_ref = false;
        Ok(())
    }

    /// Rebinds this container to reference `other`'s storage.
    ///
    /// An already-immutable container cannot become a plain mutable
    /// reference to different storage, and an immutable container's
    /// storage can only be referenced immutably.
    pub fn bind_to(&mut self, other: &Any, immutable: bool) -> Result<(), Error> {
        let cell = other
            .cell
            .clone()
            .ok_or_else(|| Error::empty_container("cannot reference an empty container"))?;
        let identity = self
            .cell
            .as_ref()
            .is_some_and(|own| Rc::ptr_eq(own, &cell));
        if self.immutable && !immutable && !identity {
            return Err(Error::immutable(
                "an immutable container cannot become a plain mutable reference",
            ));
        }
        if other.immutable && !immutable {
            return Err(Error::immutable(
                "cannot take a mutable reference to an immutable container",
            ));
        }
        self.immutable = immutable || (identity && self.immutable);
        self.cell = Some(cell);
        self.is_ref = true;
        Ok(())
    }

    /// Creates a container mutably referencing this container's storage.
    pub fn share_ref(&self) -> Result<Any, Error> {
        let cell = self
            .cell
            .clone()
            .ok_or_else(|| Error::empty_container("cannot reference an empty container"))?;
        if self.immutable {
            return Err(Error::immutable(
                "cannot take a mutable reference to an immutable container",
            ));
        }
        Ok(Any {
            cell: Some(cell),
            is_ref: true,
            immutable: false,
        })
    }

    /// Creates a container immutably referencing this container's storage.
    pub fn share_const_ref(&self) -> Result<Any, Error> {
        let cell = self
            .cell
            .clone()
            .ok_or_else(|| Error::empty_container("cannot reference an empty container"))?;
        Ok(Any {
            cell: Some(cell),
            is_ref: true,
            immutable: true,
        })
    }

    /// Drops the held value or reference. The immutability mark survives.
    pub fn clear(&mut self) {
        self.cell = None;
        self.is_ref = false;
    }

    /// Mutable access to the held value of exact type `T`. Only legal on
    /// owned or mutable-reference containers.
    pub fn expose<T: AnyValue>(&self) -> Result<ExposedMut<'_, T>, Error> {
        if self.immutable {
            return Err(Error::immutable("expose on an immutable container"));
        }
        let cell = self
            .cell
            .as_ref()
            .ok_or_else(|| Error::empty_container("expose on an empty container"))?;
        if cell.type_id != TypeId::of::<T>() {
            return Err(Error::type_mismatch(
                std::any::type_name::<T>(),
                cell.type_name,
            ));
        }
        let guard = RefMut::map(cell.value.borrow_mut(), |b| {
            b.as_any_mut()
                .downcast_mut::<T>()
                .expect("identity verified before downcast")
        });
        Ok(ExposedMut { guard })
    }

    /// Shared access to the held value of exact type `T`.
    pub fn peek<T: AnyValue>(&self) -> Result<Exposed<'_, T>, Error> {
        let cell = self
            .cell
            .as_ref()
            .ok_or_else(|| Error::empty_container("peek on an empty container"))?;
        if cell.type_id != TypeId::of::<T>() {
            return Err(Error::type_mismatch(
                std::any::type_name::<T>(),
                cell.type_name,
            ));
        }
        let guard = Ref::map(cell.value.borrow(), |b| {
            b.as_any()
                .downcast_ref::<T>()
                .expect("identity verified before downcast")
        });
        Ok(Exposed { guard })
    }

    /// Copies the held value out as a `T`, converting through the
    /// process-wide conversion graph when the held type differs.
    pub fn extract<T: AnyValue>(&self) -> Result<T, Error> {
        resolver::with_manager(|mgr| self.extract_with(mgr))
    }

    /// Like [`Any::extract`], against an explicit manager instance.
    pub fn extract_with<T: AnyValue>(
        &self,
        manager: &crate::resolver::type_manager::TypeManager,
    ) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::empty_source());
        }
        if self.is_type::<T>() {
            let guard = self.peek::<T>()?;
            return Ok((*guard).clone());
        }
        manager.cast_to::<T>(self)
    }

    /// Status-code form of [`Any::extract`]: writes into `out` on success
    /// and never returns an error value.
    pub fn extract_into<T: AnyValue>(&self, out: &mut T) -> CastStatus {
        match self.extract::<T>() {
            Ok(v) => {
                *out = v;
                CastStatus::Ok
            }
            Err(err) => CastStatus::from(&err),
        }
    }

    /// Deep-copies the held value into a fresh owned, mutable container,
    /// regardless of this container's mode.
    pub fn clone_value(&self) -> Any {
        match &self.cell {
            Some(cell) => Any {
                cell: Some(Rc::new(cell.deep_copy())),
                is_ref: false,
                immutable: false,
            },
            None => Any::empty(),
        }
    }

    /// Parses `input` into the container using the held type's registered
    /// parser. Fails for empty containers and for types without a parser.
    pub fn read_from_str(&mut self, input: &str) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::empty_container(
                "cannot parse into an empty container: no target type",
            ));
        }
        let tid = self.type_id();
        let parse = resolver::with_registry(|reg| {
            reg.get_by_identity(tid).and_then(|info| info.harness().parse)
        })
        .ok_or_else(|| {
            Error::parse_error(format!("no parser registered for {}", self.type_name()))
        })?;
        let boxed = parse(input)?;
        self.set_boxed(boxed)
    }

    /// Structural equality with full error reporting: cross-type operands
    /// are reconciled through the conversion graph before comparing, and
    /// truly incomparable operands are an error rather than `false`.
    pub fn try_eq(&self, other: &Any) -> Result<bool, Error> {
        match (&self.cell, &other.cell) {
            (None, None) => Ok(true),
            (None, Some(_)) | (Some(_), None) => Ok(false),
            (Some(a), Some(b)) => {
                if a.type_id == b.type_id {
                    let lhs = a.value.borrow();
                    let rhs = b.value.borrow();
                    return Ok(lhs.eq_dyn(rhs.as_ref()));
                }
                resolver::with_manager(|mgr| {
                    if mgr.castable(a.type_id, b.type_id, false) {
                        let converted = mgr.convert(self, b.type_id)?;
                        converted.value.try_eq(other)
                    } else if mgr.castable(b.type_id, a.type_id, false) {
                        let converted = mgr.convert(other, a.type_id)?;
                        self.try_eq(&converted.value)
                    } else {
                        Err(Error::not_comparable(format!(
                            "{} vs {}",
                            a.type_name, b.type_name
                        )))
                    }
                })
            }
        }
    }

    /// Ordering with full error reporting. Requires an ordering capability
    /// registered for the (reconciled) operand type.
    pub fn try_cmp(&self, other: &Any) -> Result<Ordering, Error> {
        match (&self.cell, &other.cell) {
            (None, None) => Ok(Ordering::Equal),
            (None, Some(_)) | (Some(_), None) => {
                Err(Error::not_comparable("cannot order an empty container"))
            }
            (Some(a), Some(b)) => {
                if a.type_id == b.type_id {
                    let order = resolver::with_registry(|reg| {
                        reg.get_by_identity(a.type_id)
                            .and_then(|info| info.harness().order)
                    })
                    .ok_or_else(|| {
                        Error::not_comparable(format!("no ordering registered for {}", a.type_name))
                    })?;
                    let lhs = a.value.borrow();
                    let rhs = b.value.borrow();
                    return order(lhs.as_ref(), rhs.as_ref()).ok_or_else(|| {
                        Error::not_comparable(format!("{} values do not order", a.type_name))
                    });
                }
                resolver::with_manager(|mgr| {
                    if mgr.castable(a.type_id, b.type_id, false) {
                        let converted = mgr.convert(self, b.type_id)?;
                        converted.value.try_cmp(other)
                    } else if mgr.castable(b.type_id, a.type_id, false) {
                        let converted = mgr.convert(other, a.type_id)?;
                        self.try_cmp(&converted.value)
                    } else {
                        Err(Error::not_comparable(format!(
                            "{} vs {}",
                            a.type_name, b.type_name
                        )))
                    }
                })
            }
        }
    }

    pub(crate) fn with_value<R>(&self, f: impl FnOnce(&dyn AnyType) -> R) -> Result<R, Error> {
        let cell = self
            .cell
            .as_ref()
            .ok_or_else(|| Error::empty_container("value access on an empty container"))?;
        let guard = cell.value.borrow();
        Ok(f(guard.as_ref()))
    }
}

impl Clone for Any {
    /// Reference containers share the underlying storage; owned
    /// containers are deep-copied. Use [`Any::clone_value`] to detach a
    /// reference into an owned copy.
    fn clone(&self) -> Any {
        if self.is_ref {
            Any {
                cell: self.cell.clone(),
                is_ref: true,
                immutable: self.immutable,
            }
        } else {
            let mut copy = self.clone_value();
            copy.immutable = self.immutable;
            copy
        }
    }
}

impl Any {
    /// Compares the held value against a typed value, reconciling
    /// differing types through the conversion graph.
    pub fn eq_value<T: AnyValue>(&self, other: &T) -> bool {
        if self.is_type::<T>() {
            return self.peek::<T>().map(|v| *v == *other).unwrap_or(false);
        }
        self.try_eq(&Any::new(other.clone())).unwrap_or(false)
    }
}

impl PartialEq for Any {
    fn eq(&self, other: &Any) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

// A generic `PartialEq<T> for Any` would collide with the container
// comparison above (`Any` itself satisfies the value bound), so the
// typed comparisons are spelled out for the value shapes that occur in
// practice.
macro_rules! impl_typed_eq {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq<$ty> for Any {
                fn eq(&self, other: &$ty) -> bool {
                    self.eq_value(other)
                }
            }
        )+
    };
}

impl_typed_eq!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char, String
);

impl PartialEq<&str> for Any {
    fn eq(&self, other: &&str) -> bool {
        self.peek::<String>().map(|v| *v == **other).unwrap_or(false)
    }
}

impl<T: AnyValue> PartialEq<Vec<T>> for Any {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.eq_value(other)
    }
}

impl<K, V> PartialEq<std::collections::HashMap<K, V>> for Any
where
    K: AnyValue + Eq + std::hash::Hash,
    V: AnyValue,
{
    fn eq(&self, other: &std::collections::HashMap<K, V>) -> bool {
        self.eq_value(other)
    }
}

impl PartialOrd for Any {
    fn partial_cmp(&self, other: &Any) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<empty>");
        }
        let tid = self.type_id();
        let printer = resolver::with_registry(|reg| {
            reg.get_by_identity(tid).and_then(|info| info.harness().print)
        });
        match printer {
            Some(print) => match self.with_value(print) {
                Ok(Ok(text)) => f.write_str(&text),
                _ => f.write_str(NON_PRINTABLE),
            },
            None => f.write_str(NON_PRINTABLE),
        }
    }
}
