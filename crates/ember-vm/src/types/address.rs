// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Address newtypes: heap offsets, image offsets, and the long pointer
//! that unifies them.

use core::fmt;

use crate::value::Value;

/// A 16-bit pointer into the live GC heap.
///
/// The payload offset is relative to the start of the logical heap address
/// space (bucket 0 starts at offset 0) and is resolved to bytes by walking
/// the bucket chain. It is always even and nonzero (the first possible
/// payload sits behind a header word), which is what lets the low bit serve
/// as the value-encoding discriminator.
///
/// This is the only value encoding the garbage collector traces and
/// rewrites, and it is identical to the serialized pointer form used in
/// snapshot images.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShortPtr(u16);

impl ShortPtr {
    /// Wrap a payload offset. The offset must be even and nonzero.
    #[inline]
    #[must_use]
    pub const fn new(offset: u16) -> Self {
        debug_assert!(offset != 0);
        debug_assert!(offset & 1 == 0);
        Self(offset)
    }

    /// The payload offset within the logical heap address space.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u16 {
        self.0
    }

    /// The offset of this allocation's header word.
    #[inline]
    #[must_use]
    pub const fn header_offset(self) -> u16 {
        self.0 - 2
    }

    /// Reinterpret a value known to be a short pointer.
    #[inline]
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        debug_assert!(value.is_short_ptr());
        Self::new(value.raw())
    }

    /// The value encoding of this pointer.
    #[inline]
    #[must_use]
    pub const fn to_value(self) -> Value {
        Value::from_raw(self.0)
    }

    /// Offset `delta` bytes into the allocation.
    #[inline]
    #[must_use]
    pub const fn add(self, delta: u16) -> Self {
        Self(self.0 + delta)
    }
}

impl fmt::Debug for ShortPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortPtr({:#06x})", self.0)
    }
}

/// A 16-bit offset into the bytecode image.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BytecodeAddr(u16);

impl BytecodeAddr {
    /// Wrap an image offset.
    #[inline]
    #[must_use]
    pub const fn new(offset: u16) -> Self {
        Self(offset)
    }

    /// The byte offset into the image.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u16 {
        self.0
    }

    /// Offset `delta` bytes further into the image.
    #[inline]
    #[must_use]
    pub const fn add(self, delta: u16) -> Self {
        Self(self.0.wrapping_add(delta))
    }
}

impl fmt::Debug for BytecodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BytecodeAddr({:#06x})", self.0)
    }
}

/// An abstract pointer capable of addressing either the GC heap (RAM) or
/// the bytecode image (typically ROM).
///
/// Resolution to bytes requires the VM, which owns both address spaces.
/// Writes are only possible through the [`LongPtr::Heap`] variant; a write
/// through a [`LongPtr::Rom`] pointer is a bytecode defect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LongPtr {
    /// Points into the GC heap.
    Heap(ShortPtr),
    /// Points into the bytecode image.
    Rom(BytecodeAddr),
}

impl LongPtr {
    /// Offset `delta` bytes forward.
    #[inline]
    #[must_use]
    pub const fn add(self, delta: u16) -> Self {
        match self {
            Self::Heap(p) => Self::Heap(p.add(delta)),
            Self::Rom(a) => Self::Rom(a.add(delta)),
        }
    }

    /// The heap pointer, if this address is in RAM.
    ///
    /// This is the "truncation" check: only RAM addresses can be written
    /// through.
    #[inline]
    #[must_use]
    pub const fn as_heap(self) -> Option<ShortPtr> {
        match self {
            Self::Heap(p) => Some(p),
            Self::Rom(_) => None,
        }
    }
}
