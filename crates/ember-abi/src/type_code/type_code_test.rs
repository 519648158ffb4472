// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for type codes and the allocation header word.

use super::*;

#[test]
fn header_round_trip() {
    let header = make_header(TypeCode::String, 6);
    assert_eq!(header_size(header), 6);
    assert_eq!(header_type_code(header), TypeCode::String);
}

#[test]
fn header_max_size() {
    let header = make_header(TypeCode::FixedLengthArray, MAX_ALLOCATION_SIZE);
    assert_eq!(header_size(header), MAX_ALLOCATION_SIZE);
    assert_eq!(header_type_code(header), TypeCode::FixedLengthArray);
}

#[test]
fn container_divider() {
    // 0..=8 non-container, 9..=15 container
    for tc in 0..=8u8 {
        assert!(!TypeCode::from_header_nibble(tc).is_container(), "tc {tc}");
    }
    for tc in 9..=15u8 {
        assert!(TypeCode::from_header_nibble(tc).is_container(), "tc {tc}");
    }
}

#[test]
fn header_is_container_matches_type_code() {
    for tc in 0..=15u8 {
        for size in [0u16, 2, 0xFFF] {
            let header = make_header(TypeCode::from_header_nibble(tc), size);
            assert_eq!(
                header_is_container(header),
                header_type_code(header).is_container(),
                "tc {tc} size {size}"
            );
        }
    }
}

#[test]
fn tombstone_header_shape() {
    assert_eq!(header_type_code(TOMBSTONE_HEADER), TypeCode::Tombstone);
    assert_eq!(header_size(TOMBSTONE_HEADER), 2);
}

#[test]
fn from_header_nibble_is_identity_on_raw_value() {
    for tc in 0..=15u8 {
        assert_eq!(TypeCode::from_header_nibble(tc) as u8, tc);
    }
}
