// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for the bucketed heap and bump allocator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use ember_abi::type_code::{self, TypeCode};

use super::Heap;
use crate::heap;
use crate::port;
use crate::testing::minimal_vm;
use crate::value::Value;

#[test]
fn empty_heap_has_no_size() {
    let heap = Heap::new();
    assert_eq!(heap.used_size(), 0);
    assert_eq!(heap.capacity(), 0);
    assert_eq!(heap.bucket_count(), 0);
}

#[test]
fn bump_allocates_past_the_header() {
    let mut heap = Heap::new();
    heap.add_bucket(64);

    let a = heap.try_bump(4, TypeCode::Int32).unwrap();
    assert_eq!(a.offset(), 2);
    assert_eq!(heap.header_of(a), type_code::make_header(TypeCode::Int32, 4));
    assert_eq!(heap.size_of(a), 4);
    assert_eq!(heap.type_code_of(a), TypeCode::Int32);

    let b = heap.try_bump(2, TypeCode::String).unwrap();
    assert_eq!(b.offset(), 8); // 2 + 4 payload + next header
    assert_eq!(heap.used_size(), 10);
}

#[test]
fn odd_payloads_round_up_to_even_totals() {
    let mut heap = Heap::new();
    heap.add_bucket(64);

    let a = heap.try_bump(3, TypeCode::String).unwrap();
    assert_eq!(heap.size_of(a), 3);
    // Total is header + 4 bytes
    let b = heap.try_bump(2, TypeCode::Int32).unwrap();
    assert_eq!(b.offset(), a.offset() + 4 + 2);
}

#[test]
fn bump_fails_when_the_bucket_is_full() {
    let mut heap = Heap::new();
    heap.add_bucket(8);

    assert!(heap.try_bump(6, TypeCode::String).is_some());
    assert!(heap.try_bump(2, TypeCode::String).is_none());
}

#[test]
fn new_buckets_continue_the_logical_address_space() {
    let mut heap = Heap::new();
    heap.add_bucket(8);
    let a = heap.try_bump(6, TypeCode::String).unwrap();

    heap.add_bucket(16);
    let b = heap.try_bump(4, TypeCode::Int32).unwrap();
    assert_eq!(b.offset(), 10); // bucket 1 starts at offset 8

    // Reads resolve across buckets
    heap.write_u16(b.offset(), 0x1234);
    assert_eq!(heap.read_u16(b.offset()), 0x1234);
    assert_eq!(heap.header_of(a), type_code::make_header(TypeCode::String, 6));
}

#[test]
fn words_read_back_little_endian() {
    let mut heap = Heap::new();
    heap.add_bucket(16);
    let a = heap.try_bump(4, TypeCode::Int32).unwrap();
    heap.write_u16(a.offset(), 0xABCD);
    assert_eq!(heap.read_u8(a.offset()), 0xCD);
    assert_eq!(heap.read_u8(a.offset() + 1), 0xAB);
}

#[test]
fn allocations_iterates_in_address_order() {
    let mut heap = Heap::new();
    heap.add_bucket(32);
    let a = heap.try_bump(4, TypeCode::Int32).unwrap();
    let b = heap.try_bump(5, TypeCode::String).unwrap();
    heap.add_bucket(32);
    let c = heap.try_bump(2, TypeCode::FixedLengthArray).unwrap();

    let seen: alloc::vec::Vec<_> = heap.allocations().map(|(p, _)| p).collect();
    assert_eq!(seen, alloc::vec![a, b, c]);
}

#[test]
fn allocate_grows_the_heap_with_buckets() {
    let mut vm = minimal_vm();
    let first = heap::allocate(&mut vm, 4, TypeCode::Int32);
    assert_eq!(first.offset(), 2);
    assert_eq!(vm.heap.bucket_count(), 1);

    // Larger than the default bucket: gets a bucket of its own
    let big = heap::allocate(&mut vm, 0x400, TypeCode::String);
    assert_eq!(vm.heap.type_code_of(big), TypeCode::String);
    assert_eq!(vm.heap.bucket_count(), 2);
}

#[test]
fn allocate_filled_initializes_every_slot() {
    let mut vm = minimal_vm();
    let arr = heap::allocate_filled(&mut vm, 8, TypeCode::FixedLengthArray, Value::DELETED);
    for i in 0..4 {
        assert_eq!(vm.heap.read_u16(arr.offset() + i * 2), Value::DELETED.raw());
    }
}

#[test]
fn unreachable_garbage_cannot_exceed_the_heap_cap() {
    let mut vm = minimal_vm();
    // Far more garbage than MAX_HEAP_SIZE; collections keep it bounded
    for _ in 0..128 {
        let _ = heap::allocate(&mut vm, 0xF00, TypeCode::String);
    }
    assert!(vm.heap.used_size() <= port::MAX_HEAP_SIZE);
    assert!(vm.heap.high_water_mark() <= port::MAX_HEAP_SIZE);
}
