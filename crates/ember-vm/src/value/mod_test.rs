// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for the value encoding wrapper.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use super::Value;

#[test]
fn wellknown_constants_are_wellknown() {
    for v in [
        Value::UNDEFINED,
        Value::NULL,
        Value::TRUE,
        Value::FALSE,
        Value::NAN,
        Value::NEG_ZERO,
        Value::DELETED,
        Value::STR_LENGTH,
        Value::STR_PROTO,
    ] {
        assert!(v.is_wellknown(), "{v:?}");
        assert!(!v.is_short_ptr());
        assert!(!v.is_int14());
        assert!(!v.is_bytecode_mapped());
    }
}

#[test]
fn int14_encodes_in_the_top_bits() {
    assert_eq!(Value::int14(0).raw(), 0x0003);
    assert_eq!(Value::int14(1).raw(), 0x0007);
    assert_eq!(Value::int14(-1).raw(), 0xFFFF);
}

#[test]
fn bool_maps_to_the_canonical_values() {
    assert_eq!(Value::bool(true), Value::TRUE);
    assert_eq!(Value::bool(false), Value::FALSE);
}

#[test]
fn uint12_classification() {
    assert!(Value::int14(0).is_virtual_uint12());
    assert!(Value::int14(0xFFF).is_virtual_uint12());
    assert!(!Value::int14(0x1000).is_virtual_uint12());
    assert!(!Value::int14(-1).is_virtual_uint12());
    assert!(!Value::UNDEFINED.is_virtual_uint12());
}

proptest! {
    #[test]
    fn int14_round_trips(n in -0x2000i16..=0x1FFF) {
        let v = Value::int14(n);
        prop_assert!(v.is_int14());
        prop_assert_eq!(v.int14_value(), n);
    }

    #[test]
    fn every_raw_value_has_exactly_one_class(raw: u16) {
        let v = Value::from_raw(raw);
        let classes = [
            v.is_short_ptr(),
            v.is_int14(),
            v.is_bytecode_mapped(),
            v.is_wellknown(),
        ];
        prop_assert_eq!(classes.iter().filter(|c| **c).count(), 1);
    }

    #[test]
    fn uint12_pairs_add_without_overflow(a in 0i16..=0xFFF, b in 0i16..=0xFFF) {
        let left = Value::int14(a);
        let right = Value::int14(b);
        prop_assert!(left.is_virtual_uint12() && right.is_virtual_uint12());
        // The identity the interpreter's ADD fast path relies on
        let sum = Value::from_raw(left.raw() + right.raw() - Value::int14(0).raw());
        prop_assert!(sum.is_int14());
        prop_assert_eq!(sum.int14_value(), a + b);
    }
}
