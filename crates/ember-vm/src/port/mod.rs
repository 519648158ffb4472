// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The port layer: build-time memory parameters, CRC, the pointer-model
//! self-test, and the fatal-error path.
//!
//! The original engine family delegates these concerns to a per-target
//! port header. Here they are compile-time constants and small functions;
//! a target that needs different sizes adjusts them in one place.

#[cfg(test)]
mod port_test;

use crate::error::Error;
use crate::image::Image;

/// Heap cap: growing the bucket chain beyond this triggers a collection,
/// and a fatal out-of-memory error if the allocation still doesn't fit.
pub const MAX_HEAP_SIZE: u16 = 0xE000;

/// Size of the activation stack in bytes, allocated when the VM is first
/// entered from the host and freed when control fully returns.
pub const STACK_SIZE: u16 = 0x1000;

/// Ideal capacity of a freshly created heap bucket.
pub const BUCKET_SIZE: u16 = 256;

/// CRC-16-CCITT (polynomial 0x1021, initial value 0xFFFF), the checksum
/// carried in the image header.
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Self-test run at restore: verifies that image reads round-trip through
/// the accessor layer exactly as the header declares.
///
/// The original engine uses this to validate the port file's long-pointer
/// macros against both RAM and ROM address spaces; the equivalent hazard
/// here is an image accessor that disagrees with the little-endian,
/// 16-bit-aligned layout contract.
pub fn self_test(image: &Image) -> Result<(), Error> {
    use ember_abi::image as layout;

    let bytes = image.bytes();
    if image.read_u8(layout::OFF_BYTECODE_VERSION) != bytes[0] {
        return Err(Error::PortFileMacroTestFailure);
    }
    let first_word = u16::from_le_bytes([bytes[0], bytes[1]]);
    if image.read_u16(0) != first_word {
        return Err(Error::PortFileMacroTestFailure);
    }
    if image.read_u8(layout::OFF_REQUIRED_ENGINE_VERSION) != bytes[2] {
        return Err(Error::PortFileMacroTestFailure);
    }
    let size_field = u16::from_le_bytes([bytes[layout::OFF_BYTECODE_SIZE], bytes[layout::OFF_BYTECODE_SIZE + 1]]);
    if image.read_u16(layout::OFF_BYTECODE_SIZE) != size_field {
        return Err(Error::PortFileMacroTestFailure);
    }
    Ok(())
}

/// The fatal-error path. Resource exhaustion and invariant violations end
/// here; the VM is not usable afterwards.
///
/// Diverges by panicking with the error code. Embedded builds map panics
/// to abort/reset through their panic handler; hosted test builds can
/// observe the payload.
pub fn fatal_error(error: Error) -> ! {
    panic!("fatal VM error: {error:?}");
}
