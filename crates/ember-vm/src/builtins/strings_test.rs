// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for string allocation, formatting, and interning.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ember_abi::image::Builtin;
use ember_abi::type_code::TypeCode;

use super::strings::{
    convert_to_string, int_to_str, new_string, ram_string_is_nonnegative_integer,
    to_interned_string,
};
use crate::error::Error;
use crate::testing::{minimal_vm, vm_with_intern_chain, ImageBuilder, Ref};
use crate::value::Value;
use crate::vm::Vm;

#[test]
fn new_string_round_trips() {
    let mut vm = minimal_vm();
    let s = new_string(&mut vm, b"hello");
    assert_eq!(vm.deep_type_of(s), TypeCode::String);
    assert_eq!(vm.string_bytes(s).unwrap(), b"hello");
    // The allocation includes the trailing NUL
    assert_eq!(vm.heap.size_of(crate::types::ShortPtr::from_value(s)), 6);
}

#[test]
fn string_bytes_rejects_non_strings() {
    let vm = minimal_vm();
    assert_eq!(vm.string_bytes(Value::int14(1)), Err(Error::TypeError));
}

#[test]
fn int_to_str_formats_base_10() {
    let mut vm = minimal_vm();
    let cases: [(i32, &[u8]); 6] = [
        (0, b"0"),
        (7, b"7"),
        (-1, b"-1"),
        (123_456, b"123456"),
        (i32::MAX, b"2147483647"),
        (i32::MIN, b"-2147483648"),
    ];
    for (n, expected) in cases {
        let s = int_to_str(&mut vm, n);
        assert_eq!(vm.string_bytes(s).unwrap(), expected, "formatting {n}");
    }
}

#[test]
fn primitive_constants_have_fixed_literals() {
    let mut vm = minimal_vm();
    let cases: [(Value, &[u8]); 6] = [
        (Value::UNDEFINED, b"undefined"),
        (Value::NULL, b"null"),
        (Value::TRUE, b"true"),
        (Value::FALSE, b"false"),
        (Value::NAN, b"NaN"),
        (Value::NEG_ZERO, b"0"),
    ];
    for (v, expected) in cases {
        let s = convert_to_string(&mut vm, v).unwrap();
        assert_eq!(vm.string_bytes(s).unwrap(), expected);
    }
}

#[test]
fn objects_do_not_stringify() {
    let mut vm = minimal_vm();
    let object = crate::heap::allocate(&mut vm, 4, TypeCode::PropertyList);
    vm.heap.write_u16(object.offset(), Value::NULL.raw());
    vm.heap.write_u16(object.offset() + 2, Value::NULL.raw());
    assert_eq!(
        convert_to_string(&mut vm, object.to_value()),
        Err(Error::NotImplemented)
    );
}

#[cfg(feature = "float")]
#[test]
fn boxed_floats_do_not_stringify() {
    let mut vm = minimal_vm();
    let f = vm.new_number(0.5);
    assert_eq!(convert_to_string(&mut vm, f), Err(Error::NotImplemented));
}

#[test]
fn digit_detection_for_key_rejection() {
    let mut vm = minimal_vm();
    let digits = new_string(&mut vm, b"123");
    assert!(ram_string_is_nonnegative_integer(&vm, digits));
    let empty = new_string(&mut vm, b"");
    assert!(!ram_string_is_nonnegative_integer(&vm, empty));
    let mixed = new_string(&mut vm, b"12a");
    assert!(!ram_string_is_nonnegative_integer(&vm, mixed));
}

#[test]
fn canonical_names_intern_to_wellknown_values() {
    let mut vm = vm_with_intern_chain();
    let length = new_string(&mut vm, b"length");
    assert_eq!(to_interned_string(&mut vm, length), Value::STR_LENGTH);
    let proto = new_string(&mut vm, b"__proto__");
    assert_eq!(to_interned_string(&mut vm, proto), Value::STR_PROTO);
}

#[test]
fn rom_strings_intern_by_binary_search() {
    let mut b = ImageBuilder::new();
    let slot = b.add_global(Ref::Raw(Value::NULL.raw()));
    b.set_builtin(Builtin::InternedStrings, Ref::Global(slot));
    b.add_interned_string("apple");
    b.add_interned_string("banana");
    b.add_interned_string("cherry");
    let mut vm = Vm::restore(b.finish(), |_| None).unwrap();

    for name in ["apple", "banana", "cherry"] {
        let s = new_string(&mut vm, name.as_bytes());
        let interned = to_interned_string(&mut vm, s);
        assert!(interned.is_bytecode_mapped(), "{name} should resolve to ROM");
        assert_eq!(vm.string_bytes(interned).unwrap(), name.as_bytes());
    }
}

#[test]
fn ram_interning_reuses_the_chain() {
    let mut vm = vm_with_intern_chain();
    let first = new_string(&mut vm, b"greeting");
    let first = to_interned_string(&mut vm, first);
    assert_eq!(vm.deep_type_of(first), TypeCode::InternedString);

    let second = new_string(&mut vm, b"greeting");
    let second = to_interned_string(&mut vm, second);
    assert_eq!(first, second);

    let other = new_string(&mut vm, b"farewell");
    let other = to_interned_string(&mut vm, other);
    assert_ne!(first, other);
}

#[test]
fn interned_strings_survive_collection() {
    let mut vm = vm_with_intern_chain();
    let s = new_string(&mut vm, b"keepsake");
    let interned = to_interned_string(&mut vm, s);
    let root = vm.create_handle(interned);

    vm.run_gc(false);

    // The chain was traced through the builtin's global handle, so a
    // fresh intern of the same content still hits it
    let again = new_string(&mut vm, b"keepsake");
    let again = to_interned_string(&mut vm, again);
    assert_eq!(again, vm.handle_get(&root).unwrap());
}
