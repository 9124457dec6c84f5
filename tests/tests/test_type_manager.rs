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

use std::any::TypeId;

use protean::{Any, CastWarning, Error, TypeManager};

#[derive(Clone, Debug, PartialEq)]
struct A(i32);
#[derive(Clone, Debug, PartialEq)]
struct B(i32);
#[derive(Clone, Debug, PartialEq)]
struct C(i32);

fn a() -> TypeId {
    TypeId::of::<A>()
}
fn b() -> TypeId {
    TypeId::of::<B>()
}
fn c() -> TypeId {
    TypeId::of::<C>()
}

#[test]
fn test_exactness_tiers() {
    let mut graph = TypeManager::bare();
    graph.register_cast::<A, B, _>(true, |v| Ok(B(v.0))).unwrap();
    graph.register_cast::<B, C, _>(false, |v| Ok(C(v.0))).unwrap();

    // Inexact two-hop route exists; no exact route.
    assert!(graph.castable(a(), c(), false));
    let path = graph.cast_path(a(), c(), false).unwrap();
    assert_eq!(path.hops, 2);
    assert!(!path.exact);
    assert!(!graph.castable(a(), c(), true));

    // A direct exact edge takes over for exact requests.
    graph.register_cast::<A, C, _>(true, |v| Ok(C(v.0))).unwrap();
    assert!(graph.castable(a(), c(), true));
    let path = graph.cast_path(a(), c(), true).unwrap();
    assert_eq!(path.hops, 1);
    assert!(path.exact);
}

#[test]
fn test_identity_conversion_is_free() {
    let graph = TypeManager::bare();
    assert!(graph.castable(a(), a(), true));
    let path = graph.cast_path(a(), a(), true).unwrap();
    assert_eq!((path.cost, path.hops, path.exact), (0, 0, true));

    let outcome = graph.convert(&Any::new(A(7)), a()).unwrap();
    assert_eq!(outcome.value.extract_with::<A>(&graph).unwrap(), A(7));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_self_loop_rejected() {
    let mut graph = TypeManager::bare();
    let err = graph
        .register_cast::<A, A, _>(true, |v| Ok(v.clone()))
        .unwrap_err();
    assert!(matches!(err, Error::SelfLoop(_)));
}

#[test]
fn test_edge_cost_deprioritizes_route() {
    let mut graph = TypeManager::bare();
    // Expensive direct edge against a cheap two-hop chain.
    graph
        .register_cast_with_cost::<A, C, _>(true, 5, |v| Ok(C(v.0 + 1000)))
        .unwrap();
    graph.register_cast::<A, B, _>(true, |v| Ok(B(v.0))).unwrap();
    graph.register_cast::<B, C, _>(true, |v| Ok(C(v.0))).unwrap();

    let path = graph.cast_path(a(), c(), true).unwrap();
    assert_eq!((path.cost, path.hops), (2, 2));
    let got = graph.cast_to::<C>(&Any::new(A(1))).unwrap();
    assert_eq!(got, C(1));
}

#[test]
fn test_converter_failure_reports_step_index() {
    let mut graph = TypeManager::bare();
    graph.register_cast::<A, B, _>(true, |v| Ok(B(v.0))).unwrap();
    graph
        .register_cast::<B, C, _>(true, |_| Err(anyhow::anyhow!("converter exploded")))
        .unwrap();

    let err = graph.convert(&Any::new(A(1)), c()).unwrap_err();
    match err {
        Error::CastFailed { index, .. } => assert_eq!(index, 1),
        other => panic!("expected CastFailed, got {other:?}"),
    }
}

#[test]
fn test_error_taxonomy() {
    let graph = TypeManager::bare();
    assert!(matches!(
        graph.convert(&Any::empty(), a()),
        Err(Error::EmptySource)
    ));
    assert!(matches!(
        graph.convert(&Any::new(A(1)), b()),
        Err(Error::NoRoute { .. })
    ));

    let mut strict = TypeManager::bare();
    strict
        .register_cast::<A, B, _>(false, |v| Ok(B(v.0)))
        .unwrap();
    strict.set_require_exact(true);
    assert!(matches!(
        strict.convert(&Any::new(A(1)), b()),
        Err(Error::NoExactRoute { .. })
    ));
    assert!(!strict.castable(a(), b(), false));
}

#[test]
fn test_numeric_truncation_warning() {
    let graph = TypeManager::default();
    let outcome = graph
        .convert(&Any::new(3.75f64), TypeId::of::<i32>())
        .unwrap();
    assert_eq!(outcome.value.extract_with::<i32>(&graph).unwrap(), 3);
    assert_eq!(outcome.warnings, vec![CastWarning::Truncated]);

    // A whole-valued float converts silently.
    let outcome = graph
        .convert(&Any::new(4.0f64), TypeId::of::<i32>())
        .unwrap();
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_numeric_out_of_range_clamps() {
    let graph = TypeManager::default();
    let outcome = graph
        .convert(&Any::new(400i32), TypeId::of::<u8>())
        .unwrap();
    assert_eq!(outcome.value.extract_with::<u8>(&graph).unwrap(), u8::MAX);
    assert_eq!(outcome.warnings, vec![CastWarning::OutOfRange]);

    let outcome = graph
        .convert(&Any::new(-1i32), TypeId::of::<u8>())
        .unwrap();
    assert_eq!(outcome.value.extract_with::<u8>(&graph).unwrap(), 0);
    assert_eq!(outcome.warnings, vec![CastWarning::OutOfRange]);
}

#[test]
fn test_warnings_escalate_to_errors() {
    let mut graph = TypeManager::default();
    graph.set_warn_as_error(true);
    let err = graph
        .convert(&Any::new(3.75f64), TypeId::of::<i32>())
        .unwrap_err();
    assert!(matches!(err, Error::CastWarning(CastWarning::Truncated)));

    // Exact conversions are unaffected.
    assert!(graph.convert(&Any::new(3i32), TypeId::of::<i64>()).is_ok());
}

#[test]
fn test_widening_is_exact_narrowing_is_not() {
    let graph = TypeManager::default();
    assert!(graph.castable(TypeId::of::<i8>(), TypeId::of::<i64>(), true));
    assert!(graph.castable(TypeId::of::<u16>(), TypeId::of::<i32>(), true));
    assert!(!graph.castable(TypeId::of::<i64>(), TypeId::of::<i8>(), true));
    assert!(graph.castable(TypeId::of::<i64>(), TypeId::of::<i8>(), false));
    assert!(!graph.castable(TypeId::of::<f64>(), TypeId::of::<i32>(), true));
}

#[test]
fn test_sequence_boxing() {
    let graph = TypeManager::default();
    let boxed = graph.cast_to::<Vec<i32>>(&Any::new(5i32)).unwrap();
    assert_eq!(boxed, vec![5]);

    let bit = graph.cast_to::<bool>(&Any::new(vec![true])).unwrap();
    assert!(bit);
    let err = graph
        .cast_to::<bool>(&Any::new(vec![true, false]))
        .unwrap_err();
    assert!(matches!(err, Error::CastFailed { index: 0, .. }));
}

#[test]
fn test_char_string_casts() {
    let graph = TypeManager::default();
    assert_eq!(graph.cast_to::<String>(&Any::new('x')).unwrap(), "x");
    assert_eq!(graph.cast_to::<char>(&Any::new("y".to_string())).unwrap(), 'y');
    assert!(graph
        .cast_to::<char>(&Any::new("too long".to_string()))
        .is_err());
}
