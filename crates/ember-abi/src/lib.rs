// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Wire-format definitions shared between the Ember engine and the
//! ahead-of-time compiler.
//!
//! This crate defines the contract a bytecode image must satisfy:
//! - The 16-bit value encoding (discriminator bits, well-known values,
//!   virtual int14)
//! - Allocation type codes and the allocation header word
//! - The instruction set (nibble-pair opcodes and sub-operation tables)
//! - The image header layout, section order, and builtin slots
//!
//! # Design Principles
//!
//! - **No dependencies**: pure constants and `const fn`s, 100% host-testable
//! - **Little-endian, 16-bit aligned**: everything in an image is
//!   addressable with 16-bit loads
//!
//! The engine (`ember-vm`) builds its runtime types on top of these
//! definitions; a compiler emits images against them.

#![no_std]

pub mod encoding;
pub mod image;
pub mod opcodes;
pub mod type_code;

pub use image::{Builtin, Section};
pub use type_code::TypeCode;

/// Version of the bytecode format this ABI describes.
///
/// An image's first byte must equal this value.
pub const BYTECODE_VERSION: u8 = 4;

/// Version of the engine-visible behavior. An image's
/// `required_engine_version` must not exceed this.
pub const ENGINE_VERSION: u8 = 3;
