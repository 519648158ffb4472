// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Bytecode image layout.
//!
//! An image is little-endian throughout and 16-bit aligned. It starts with
//! a fixed header followed by eight sections in a fixed order; a section's
//! size is the distance to the next section's offset (the last section runs
//! to the end of the image).
//!
//! ```text
//! offset  size  field
//!      0     1  bytecode version (== BYTECODE_VERSION)
//!      1     1  header size
//!      2     1  required engine version
//!      3     1  reserved (0)
//!      4     2  total bytecode size
//!      6     2  CRC-16-CCITT of bytes [8, size)
//!      8     4  required feature flags
//!     12    16  section offsets (8 x u16, in Section order)
//! ```


/// Byte offset of the bytecode version field.
pub const OFF_BYTECODE_VERSION: usize = 0;

/// Byte offset of the header size field.
pub const OFF_HEADER_SIZE: usize = 1;

/// Byte offset of the required engine version field.
pub const OFF_REQUIRED_ENGINE_VERSION: usize = 2;

/// Byte offset of the reserved byte (must be 0).
pub const OFF_RESERVED: usize = 3;

/// Byte offset of the total bytecode size field (u16).
pub const OFF_BYTECODE_SIZE: usize = 4;

/// Byte offset of the CRC field (u16).
pub const OFF_CRC: usize = 6;

/// First byte covered by the CRC (everything after the CRC field).
pub const CRC_START: usize = 8;

/// Byte offset of the required feature flags field (u32).
pub const OFF_REQUIRED_FEATURE_FLAGS: usize = 8;

/// Byte offset of the section offset array (u16 per section).
pub const OFF_SECTION_OFFSETS: usize = 12;

/// Total header size in bytes.
pub const HEADER_SIZE: usize = OFF_SECTION_OFFSETS + Section::COUNT * 2;

/// Smallest well-formed image: the header plus the mandatory builtins
/// section (all other sections may be empty).
pub const MIN_IMAGE_SIZE: usize = HEADER_SIZE + Builtin::COUNT * 2;

/// Feature flag bit: the image requires float64 support from the engine.
pub const FEATURE_FLAG_FLOAT_SUPPORT: u32 = 1 << 0;

/// Image sections, in the order their offsets appear in the header and the
/// order their contents appear in the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Section {
    /// `{ u16 host_function_id }` per import.
    ImportTable = 0,
    /// `{ u16 export_id, u16 value }` per export.
    ExportTable = 1,
    /// `{ u8 target_low, u8 target_high, u8 arg_count }` per entry. The
    /// reassembled 16-bit target with its low bit set is a host import
    /// index; with the low bit clear it is a bytecode offset.
    ShortCallTable = 2,
    /// One value per [`Builtin`].
    Builtins = 3,
    /// Sorted array of values referencing ROM interned strings, for binary
    /// search during interning.
    StringTable = 4,
    /// ROM allocations, each preceded by an allocation header word.
    Rom = 5,
    /// Initial values of the global slots.
    Globals = 6,
    /// Initial heap contents, copied into RAM on restore.
    Heap = 7,
}

impl Section {
    /// Number of sections.
    pub const COUNT: usize = 8;

    /// All sections in layout order.
    pub const ALL: [Section; Section::COUNT] = [
        Section::ImportTable,
        Section::ExportTable,
        Section::ShortCallTable,
        Section::Builtins,
        Section::StringTable,
        Section::Rom,
        Section::Globals,
        Section::Heap,
    ];

    /// Byte offset within the header of this section's offset field.
    #[inline]
    #[must_use]
    pub const fn header_field_offset(self) -> usize {
        OFF_SECTION_OFFSETS + (self as usize) * 2
    }
}

/// Builtin slots, indexing the [`Section::Builtins`] section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Builtin {
    /// Head of the RAM interned-string chain (a handle through a global
    /// slot so the engine can write it).
    InternedStrings = 0,
    /// Prototype object for arrays, or null when not configured.
    ArrayProto = 1,
}

impl Builtin {
    /// Number of builtin slots.
    pub const COUNT: usize = 2;
}
