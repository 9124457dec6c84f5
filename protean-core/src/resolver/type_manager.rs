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

//! The conversion graph.
//!
//! Registered pairwise converters form a directed graph over runtime type
//! identities. Conversion between two types resolves to the cheapest
//! all-exact path when one exists, then to the cheapest path of any
//! exactness unless exactness is mandatory. Equal-cost candidates resolve
//! deterministically for a given registration order, but callers must not
//! depend on which of several equal-cost routes wins.
//!
//! The identity conversion is implicit, exact and free; registering a
//! self-loop is an error.

use std::any::TypeId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use crate::any::{Any, AnyType, AnyValue};
use crate::ensure;
use crate::error::Error;
use crate::types::CastWarning;

type EdgeFn =
    Arc<dyn Fn(&dyn AnyType) -> anyhow::Result<(Box<dyn AnyType>, Option<CastWarning>)> + Send + Sync>;

struct Edge {
    dst: TypeId,
    cost: u32,
    exact: bool,
    func: EdgeFn,
}

/// Shape of a resolved conversion route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastPath {
    /// Sum of edge costs; 0 for the identity conversion.
    pub cost: u32,
    /// Number of edges; 0 for the identity conversion.
    pub hops: usize,
    /// Whether every edge on the route is exact.
    pub exact: bool,
}

/// A successful conversion: the produced value plus any warnings raised
/// along the route.
#[derive(Debug)]
pub struct CastOutcome {
    pub value: Any,
    pub warnings: Vec<CastWarning>,
}

/// Directed graph of registered conversions between type identities.
pub struct TypeManager {
    edges: HashMap<TypeId, Vec<Edge>>,
    names: HashMap<TypeId, &'static str>,
    require_exact: bool,
    warn_as_error: bool,
}

impl Default for TypeManager {
    fn default() -> Self {
        let mut manager = TypeManager::bare();
        manager.install_default_casts().unwrap();
        manager
    }
}

impl TypeManager {
    /// A manager with no edges at all, not even the default numeric ones.
    pub fn bare() -> TypeManager {
        TypeManager {
            edges: HashMap::new(),
            names: HashMap::new(),
            require_exact: false,
            warn_as_error: false,
        }
    }

    /// Globally disallow inexact routes: every search behaves as if
    /// exactness were mandatory.
    pub fn set_require_exact(&mut self, on: bool) {
        self.require_exact = on;
    }

    /// Escalate numeric range/truncation warnings to hard errors.
    pub fn set_warn_as_error(&mut self, on: bool) {
        self.warn_as_error = on;
    }

    /// Registers a conversion edge with cost 1.
    pub fn register_cast<S, D, F>(&mut self, exact: bool, f: F) -> Result<(), Error>
    where
        S: AnyValue,
        D: AnyValue,
        F: Fn(&S) -> anyhow::Result<D> + Send + Sync + 'static,
    {
        self.register_cast_warn::<S, D, _>(exact, 1, move |v| f(v).map(|d| (d, None)))
    }

    /// Registers a conversion edge with an explicit cost; larger costs
    /// de-prioritize a route.
    pub fn register_cast_with_cost<S, D, F>(
        &mut self,
        exact: bool,
        cost: u32,
        f: F,
    ) -> Result<(), Error>
    where
        S: AnyValue,
        D: AnyValue,
        F: Fn(&S) -> anyhow::Result<D> + Send + Sync + 'static,
    {
        self.register_cast_warn::<S, D, _>(exact, cost, move |v| f(v).map(|d| (d, None)))
    }

    /// Registers a conversion edge whose converter may report a
    /// [`CastWarning`] alongside its result.
    pub fn register_cast_warn<S, D, F>(&mut self, exact: bool, cost: u32, f: F) -> Result<(), Error>
    where
        S: AnyValue,
        D: AnyValue,
        F: Fn(&S) -> anyhow::Result<(D, Option<CastWarning>)> + Send + Sync + 'static,
    {
        let src = TypeId::of::<S>();
        let dst = TypeId::of::<D>();
        if src == dst {
            return Err(Error::self_loop(std::any::type_name::<S>()));
        }
        ensure!(
            cost > 0,
            Error::malformed("conversion edge cost must be positive")
        );
        self.names.insert(src, std::any::type_name::<S>());
        self.names.insert(dst, std::any::type_name::<D>());
        let func: EdgeFn = Arc::new(move |v: &dyn AnyType| {
            let s = v
                .as_any()
                .downcast_ref::<S>()
                .ok_or_else(|| anyhow::anyhow!("converter input is not {}", std::any::type_name::<S>()))?;
            let (d, warning) = f(s)?;
            Ok((Box::new(d) as Box<dyn AnyType>, warning))
        });
        self.edges.entry(src).or_default().push(Edge {
            dst,
            cost,
            exact,
            func,
        });
        Ok(())
    }

    /// True when a route exists from `src` to `dst`, honoring
    /// `want_exact` and the instance's exactness configuration.
    pub fn castable(&self, src: TypeId, dst: TypeId, want_exact: bool) -> bool {
        self.cast_path(src, dst, want_exact).is_some()
    }

    /// Shape of the route [`TypeManager::convert`] would take, if any.
    pub fn cast_path(&self, src: TypeId, dst: TypeId, want_exact: bool) -> Option<CastPath> {
        if src == dst {
            return Some(CastPath {
                cost: 0,
                hops: 0,
                exact: true,
            });
        }
        if let Some(path) = self.search(src, dst, true) {
            return Some(CastPath {
                cost: path.iter().map(|e| e.cost).sum(),
                hops: path.len(),
                exact: true,
            });
        }
        if want_exact || self.require_exact {
            return None;
        }
        self.search(src, dst, false).map(|path| CastPath {
            cost: path.iter().map(|e| e.cost).sum(),
            hops: path.len(),
            exact: false,
        })
    }

    /// Converts the value held by `src` to the destination identity,
    /// executing the best available route edge by edge.
    pub fn convert(&self, src: &Any, dst: TypeId) -> Result<CastOutcome, Error> {
        if src.is_empty() {
            return Err(Error::empty_source());
        }
        let src_id = src.type_id();
        if src_id == dst {
            return Ok(CastOutcome {
                value: src.clone_value(),
                warnings: Vec::new(),
            });
        }
        let path = self.resolve(src_id, dst)?;
        log::debug!(
            "converting {} -> {} over {} edge(s)",
            self.name_of(src_id),
            self.name_of(dst),
            path.len()
        );
        let mut current: Box<dyn AnyType> = src.with_value(|v| v.clone_boxed())?;
        let mut warnings = Vec::new();
        for (index, edge) in path.iter().enumerate() {
            match (edge.func)(current.as_ref()) {
                Ok((next, warning)) => {
                    current = next;
                    if let Some(w) = warning {
                        warnings.push(w);
                    }
                }
                Err(err) => return Err(Error::cast_failed(index, err)),
            }
        }
        if self.warn_as_error {
            if let Some(&first) = warnings.first() {
                return Err(Error::cast_warning(first));
            }
        }
        Ok(CastOutcome {
            value: Any::from_boxed(current),
            warnings,
        })
    }

    /// Typed front-end to [`TypeManager::convert`].
    pub fn cast_to<D: AnyValue>(&self, src: &Any) -> Result<D, Error> {
        let outcome = self.convert(src, TypeId::of::<D>())?;
        let guard = outcome.value.peek::<D>()?;
        Ok((*guard).clone())
    }

    fn resolve(&self, src: TypeId, dst: TypeId) -> Result<Vec<&Edge>, Error> {
        if let Some(path) = self.search(src, dst, true) {
            return Ok(path);
        }
        if self.require_exact {
            return Err(Error::no_exact_route(self.name_of(src), self.name_of(dst)));
        }
        self.search(src, dst, false)
            .ok_or_else(|| Error::no_route(self.name_of(src), self.name_of(dst)))
    }

    /// Lowest-cost path search. Equal-cost candidates resolve to the one
    /// discovered first under edge registration order.
    fn search(&self, src: TypeId, dst: TypeId, exact_only: bool) -> Option<Vec<&Edge>> {
        let mut best: HashMap<TypeId, u32> = HashMap::new();
        let mut prev: HashMap<TypeId, (TypeId, &Edge)> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(u32, u64, TypeId)>> = BinaryHeap::new();
        let mut order: u64 = 0;

        best.insert(src, 0);
        heap.push(Reverse((0, 0, src)));
        while let Some(Reverse((cost, _, node))) = heap.pop() {
            if node == dst {
                let mut path = Vec::new();
                let mut cursor = dst;
                while cursor != src {
                    let (from, edge) = prev[&cursor];
                    path.push(edge);
                    cursor = from;
                }
                path.reverse();
                return Some(path);
            }
            if best.get(&node).is_some_and(|&b| cost > b) {
                continue;
            }
            let Some(edges) = self.edges.get(&node) else {
                continue;
            };
            for edge in edges {
                if exact_only && !edge.exact {
                    continue;
                }
                let next_cost = cost + edge.cost;
                if best.get(&edge.dst).map_or(true, |&b| next_cost < b) {
                    best.insert(edge.dst, next_cost);
                    prev.insert(edge.dst, (node, edge));
                    order += 1;
                    heap.push(Reverse((next_cost, order, edge.dst)));
                }
            }
        }
        None
    }

    fn name_of(&self, type_id: TypeId) -> String {
        match self.names.get(&type_id) {
            Some(name) => (*name).to_owned(),
            None => format!("{type_id:?}"),
        }
    }

    /// Registers the exact boxing edge from a scalar to the one-element
    /// sequence of the same type.
    pub fn register_boxing<T: AnyValue>(&mut self) -> Result<(), Error> {
        self.register_cast::<T, Vec<T>, _>(true, |v| Ok(vec![v.clone()]))
    }

    fn install_default_casts(&mut self) -> Result<(), Error> {
        macro_rules! int_to_int {
            ($S:ty => $D:ty, $exact:expr) => {
                self.register_cast_warn::<$S, $D, _>($exact, 1, |v: &$S| {
                    let wide = *v as i128;
                    if wide < <$D>::MIN as i128 {
                        Ok((<$D>::MIN, Some(CastWarning::OutOfRange)))
                    } else if wide > <$D>::MAX as i128 {
                        Ok((<$D>::MAX, Some(CastWarning::OutOfRange)))
                    } else {
                        Ok((wide as $D, None))
                    }
                })?;
            };
        }
        macro_rules! int_to_float {
            ($S:ty => $D:ty, $exact:expr) => {
                self.register_cast_warn::<$S, $D, _>($exact, 1, |v: &$S| Ok((*v as $D, None)))?;
            };
        }
        macro_rules! float_to_int {
            ($S:ty => $D:ty) => {
                self.register_cast_warn::<$S, $D, _>(false, 1, |v: &$S| {
                    let f = *v as f64;
                    if !f.is_finite() {
                        return Ok((0 as $D, Some(CastWarning::OutOfRange)));
                    }
                    if f < <$D>::MIN as f64 {
                        Ok((<$D>::MIN, Some(CastWarning::OutOfRange)))
                    } else if f > <$D>::MAX as f64 {
                        Ok((<$D>::MAX, Some(CastWarning::OutOfRange)))
                    } else {
                        let truncated = f.trunc();
                        let warning = if truncated != f {
                            Some(CastWarning::Truncated)
                        } else {
                            None
                        };
                        Ok((truncated as $D, warning))
                    }
                })?;
            };
        }
        macro_rules! floats_from {
            ($S:ty) => {
                float_to_int!($S => i8);
                float_to_int!($S => i16);
                float_to_int!($S => i32);
                float_to_int!($S => i64);
                float_to_int!($S => u8);
                float_to_int!($S => u16);
                float_to_int!($S => u32);
                float_to_int!($S => u64);
            };
        }

        // Signed sources. Widening along the same signedness is exact;
        // everything crossing signedness or narrowing is range-checked.
        int_to_int!(i8 => i16, true);
        int_to_int!(i8 => i32, true);
        int_to_int!(i8 => i64, true);
        int_to_int!(i8 => u8, false);
        int_to_int!(i8 => u16, false);
        int_to_int!(i8 => u32, false);
        int_to_int!(i8 => u64, false);
        int_to_float!(i8 => f32, true);
        int_to_float!(i8 => f64, true);

        int_to_int!(i16 => i8, false);
        int_to_int!(i16 => i32, true);
        int_to_int!(i16 => i64, true);
        int_to_int!(i16 => u8, false);
        int_to_int!(i16 => u16, false);
        int_to_int!(i16 => u32, false);
        int_to_int!(i16 => u64, false);
        int_to_float!(i16 => f32, true);
        int_to_float!(i16 => f64, true);

        int_to_int!(i32 => i8, false);
        int_to_int!(i32 => i16, false);
        int_to_int!(i32 => i64, true);
        int_to_int!(i32 => u8, false);
        int_to_int!(i32 => u16, false);
        int_to_int!(i32 => u32, false);
        int_to_int!(i32 => u64, false);
        int_to_float!(i32 => f32, false);
        int_to_float!(i32 => f64, true);

        int_to_int!(i64 => i8, false);
        int_to_int!(i64 => i16, false);
        int_to_int!(i64 => i32, false);
        int_to_int!(i64 => u8, false);
        int_to_int!(i64 => u16, false);
        int_to_int!(i64 => u32, false);
        int_to_int!(i64 => u64, false);
        int_to_float!(i64 => f32, false);
        int_to_float!(i64 => f64, false);

        // Unsigned sources.
        int_to_int!(u8 => i8, false);
        int_to_int!(u8 => i16, true);
        int_to_int!(u8 => i32, true);
        int_to_int!(u8 => i64, true);
        int_to_int!(u8 => u16, true);
        int_to_int!(u8 => u32, true);
        int_to_int!(u8 => u64, true);
        int_to_float!(u8 => f32, true);
        int_to_float!(u8 => f64, true);

        int_to_int!(u16 => i8, false);
        int_to_int!(u16 => i16, false);
        int_to_int!(u16 => i32, true);
        int_to_int!(u16 => i64, true);
        int_to_int!(u16 => u8, false);
        int_to_int!(u16 => u32, true);
        int_to_int!(u16 => u64, true);
        int_to_float!(u16 => f32, true);
        int_to_float!(u16 => f64, true);

        int_to_int!(u32 => i8, false);
        int_to_int!(u32 => i16, false);
        int_to_int!(u32 => i32, false);
        int_to_int!(u32 => i64, true);
        int_to_int!(u32 => u8, false);
        int_to_int!(u32 => u16, false);
        int_to_int!(u32 => u64, true);
        int_to_float!(u32 => f32, false);
        int_to_float!(u32 => f64, true);

        int_to_int!(u64 => i8, false);
        int_to_int!(u64 => i16, false);
        int_to_int!(u64 => i32, false);
        int_to_int!(u64 => i64, false);
        int_to_int!(u64 => u8, false);
        int_to_int!(u64 => u16, false);
        int_to_int!(u64 => u32, false);
        int_to_float!(u64 => f32, false);
        int_to_float!(u64 => f64, false);

        // Floating sources.
        floats_from!(f32);
        floats_from!(f64);
        self.register_cast_warn::<f32, f64, _>(true, 1, |v| Ok((*v as f64, None)))?;
        self.register_cast_warn::<f64, f32, _>(false, 1, |v| {
            let narrowed = *v as f32;
            if narrowed.is_infinite() && v.is_finite() {
                Ok((narrowed, Some(CastWarning::OutOfRange)))
            } else {
                Ok((narrowed, None))
            }
        })?;

        // Scalar to one-element sequence boxing.
        self.register_boxing::<bool>()?;
        self.register_boxing::<i8>()?;
        self.register_boxing::<i16>()?;
        self.register_boxing::<i32>()?;
        self.register_boxing::<i64>()?;
        self.register_boxing::<u8>()?;
        self.register_boxing::<u16>()?;
        self.register_boxing::<u32>()?;
        self.register_boxing::<u64>()?;
        self.register_boxing::<f32>()?;
        self.register_boxing::<f64>()?;
        self.register_boxing::<String>()?;

        // A one-element bit-vector collapses back to its boolean.
        self.register_cast::<Vec<bool>, bool, _>(true, |v| {
            if v.len() == 1 {
                Ok(v[0])
            } else {
                Err(anyhow::anyhow!(
                    "bit-vector of length {} does not collapse to bool",
                    v.len()
                ))
            }
        })?;

        self.register_cast::<char, String, _>(true, |c| Ok(c.to_string()))?;
        self.register_cast::<String, char, _>(true, |s| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(anyhow::anyhow!("string {s:?} is not a single character")),
            }
        })?;

        Ok(())
    }
}
