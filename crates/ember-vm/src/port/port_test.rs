// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for the port layer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{crc16_ccitt, fatal_error, self_test};
use crate::error::Error;
use crate::image::Image;
use crate::testing::minimal_image;

#[test]
fn crc16_ccitt_check_value() {
    // The standard check input for CRC-16/CCITT-FALSE
    assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
}

#[test]
fn crc16_of_empty_input_is_the_initial_value() {
    assert_eq!(crc16_ccitt(&[]), 0xFFFF);
}

#[test]
fn crc16_detects_single_bit_flips() {
    let mut data = *b"snapshot image bytes";
    let reference = crc16_ccitt(&data);
    data[3] ^= 0x01;
    assert_ne!(crc16_ccitt(&data), reference);
}

#[test]
fn self_test_passes_on_a_valid_image() {
    let image = Image::new(minimal_image());
    self_test(&image).unwrap();
}

#[test]
#[should_panic(expected = "fatal VM error")]
fn fatal_error_diverges() {
    fatal_error(Error::OutOfMemory);
}
