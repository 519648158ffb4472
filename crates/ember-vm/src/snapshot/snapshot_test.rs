// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for snapshot serialization and the restore round trip.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ember_abi::opcodes::{op, op1, op3, small_lit};
use ember_abi::type_code::TypeCode;

use crate::testing::{Code, ImageBuilder, Ref};
use crate::value::Value;
use crate::vm::Vm;

#[test]
fn idle_snapshot_is_byte_equal_to_the_source_image() {
    let mut b = ImageBuilder::new();
    b.add_global(Ref::Raw(Value::int14(11).raw()));
    // Initial heap content: one boxed int32 referenced by a global
    let boxed = b.heap_alloc(TypeCode::Int32, &123_456_i32.to_le_bytes());
    b.add_global(Ref::Raw(boxed));
    let original = b.finish();

    let vm = Vm::restore(original.clone(), |_| None).unwrap();
    let snapshot = vm.create_snapshot();
    assert_eq!(snapshot, original);
}

#[test]
fn snapshot_captures_mutated_globals() {
    let mut b = ImageBuilder::new();
    b.add_global(Ref::Raw(Value::UNDEFINED.raw()));
    let mut vm = Vm::restore(b.finish(), |_| None).unwrap();

    vm.globals[0] = Value::int14(77);
    let snapshot = vm.create_snapshot();

    let vm2 = Vm::restore(snapshot, |_| None).unwrap();
    assert_eq!(vm2.globals[0], Value::int14(77));
}

#[test]
fn snapshot_captures_heap_values_reachable_from_globals() {
    let mut b = ImageBuilder::new();
    b.add_global(Ref::Raw(Value::UNDEFINED.raw()));
    let mut vm = Vm::restore(b.finish(), |_| None).unwrap();

    let boxed = vm.new_int32(1_000_000);
    vm.globals[0] = boxed;
    vm.run_gc(true);

    let snapshot = vm.create_snapshot();
    drop(vm);

    let vm2 = Vm::restore(snapshot, |_| None).unwrap();
    assert_eq!(vm2.to_int32(vm2.globals[0]), 1_000_000);
}

/// Scenario: create `{x: 1, y: "hi"}` in a global, snapshot, restore, and
/// read `global.x + global.y` through a fresh VM.
#[test]
fn snapshot_restore_round_trip_with_a_live_object() {
    let mut b = ImageBuilder::new();
    let slot = b.add_global(Ref::Raw(Value::UNDEFINED.raw()));
    let x = b.add_interned_string("x");
    let y = b.add_interned_string("y");
    let hi = b.add_interned_string("hi");

    let setup = b.add_function(
        8,
        Code::new()
            .ex1(op1::OBJECT_NEW)
            .op(op::LOAD_VAR_1, 0)
            .load_literal_ref(x)
            .op(op::LOAD_SMALL_LITERAL, small_lit::INT_1)
            .ex1(op1::OBJECT_SET_1)
            .op(op::LOAD_VAR_1, 0)
            .load_literal_ref(y)
            .load_literal_ref(hi)
            .ex1(op1::OBJECT_SET_1)
            .ex3(op3::STORE_GLOBAL_3, slot)
            .op(op::LOAD_SMALL_LITERAL, small_lit::UNDEFINED)
            .ret(),
    );
    b.add_export(1, setup);

    let getter = b.add_function(
        8,
        Code::new()
            .ex3(op3::LOAD_GLOBAL_3, slot)
            .load_literal_ref(x)
            .ex1(op1::OBJECT_GET_1)
            .ex3(op3::LOAD_GLOBAL_3, slot)
            .load_literal_ref(y)
            .ex1(op1::OBJECT_GET_1)
            .ex1(op1::ADD)
            .ret(),
    );
    b.add_export(2, getter);

    let mut vm = Vm::restore(b.finish(), |_| None).unwrap();
    let setup = vm.resolve_export(1).unwrap();
    vm.call(setup, &[]).unwrap();
    vm.run_gc(true);

    let snapshot = vm.create_snapshot();
    drop(vm);

    let mut vm = Vm::restore(snapshot, |_| None).unwrap();
    let getter = vm.resolve_export(2).unwrap();
    let result = vm.call(getter, &[]).unwrap();
    assert_eq!(vm.string_bytes(result).unwrap(), b"1hi");
}

#[test]
fn snapshots_chain_across_generations() {
    let mut b = ImageBuilder::new();
    b.add_global(Ref::Raw(Value::int14(0).raw()));
    let mut vm = Vm::restore(b.finish(), |_| None).unwrap();

    for generation in 1..=3 {
        vm.globals[0] = Value::int14(generation);
        let snapshot = vm.create_snapshot();
        vm = Vm::restore(snapshot, |_| None).unwrap();
        assert_eq!(vm.globals[0], Value::int14(generation));
    }
}
