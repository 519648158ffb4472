// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! # Ember VM
//!
//! A snapshotting bytecode virtual machine for resource-constrained
//! microcontrollers.
//!
//! This crate provides:
//! - A 16-bit tagged value representation (`value`)
//! - A bucketed heap with a Cheney-style semi-space collector (`heap`)
//! - The instruction interpreter and activation stack (`vm`)
//! - Bytecode image restore and validation (`image`)
//! - Snapshot serialization back to a flash-able image (`snapshot`)
//! - A host API for calling exports, registering GC handles, and
//!   converting values
//!
//! A VM is produced by [`Vm::restore`] from a bytecode image (typically
//! compiled ahead of time and placed in flash). All heap state round-trips
//! through [`Vm::create_snapshot`], so a device can power down mid-session
//! and resume from the last snapshot.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod builtins;
pub mod error;
pub mod heap;
pub mod image;
pub mod port;
#[cfg(feature = "snapshot")]
pub mod snapshot;
pub mod types;
pub mod value;
pub mod vm;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types at crate root
pub use error::Error;
pub use types::{BytecodeAddr, LongPtr, ShortPtr};
pub use value::Value;
pub use vm::{Handle, HostFunction, HostFunctionId, MemoryStats, Type, Vm};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
