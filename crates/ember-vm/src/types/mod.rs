// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Core address types for the engine.
//!
//! This module provides type-safe wrappers for the two address spaces a
//! value can point into. Using newtypes prevents mixing incompatible
//! offsets (e.g. passing an image offset where a heap offset is expected).


mod address;

pub use address::{BytecodeAddr, LongPtr, ShortPtr};
