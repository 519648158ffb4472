// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Bytecode image access and validation.
//!
//! An [`Image`] wraps the raw bytes of a bytecode image and provides the
//! section accessors the engine reads through. Everything is little-endian
//! and 16-bit aligned; a section's size is the distance to the next
//! section's offset (the heap section runs to the end of the image).
//!
//! [`Image::validate`] performs the restore-time integrity checks: size
//! and version fields, CRC, feature flags, and section-table sanity.
//! After validation, the accessors here may index without further checks.


use alloc::boxed::Box;

use ember_abi::image::{
    Builtin, FEATURE_FLAG_FLOAT_SUPPORT, HEADER_SIZE, MIN_IMAGE_SIZE, OFF_BYTECODE_SIZE,
    OFF_BYTECODE_VERSION, OFF_CRC, OFF_REQUIRED_ENGINE_VERSION, OFF_REQUIRED_FEATURE_FLAGS,
    Section, CRC_START,
};
use ember_abi::{BYTECODE_VERSION, ENGINE_VERSION};

use crate::error::Error;
use crate::port;
use crate::value::Value;

/// A validated bytecode image.
pub struct Image {
    bytes: Box<[u8]>,
}

impl Image {
    /// Wrap image bytes without validating them. Call [`Image::validate`]
    /// before handing the image to the engine.
    #[must_use]
    pub fn new(bytes: Box<[u8]>) -> Self {
        Self { bytes }
    }

    /// The raw image bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total image size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u16 {
        self.bytes.len() as u16
    }

    /// Read one byte.
    #[inline]
    #[must_use]
    pub fn read_u8(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    /// Read a little-endian 16-bit word.
    #[inline]
    #[must_use]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// Read a little-endian 32-bit word.
    #[inline]
    #[must_use]
    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }

    /// Byte offset of a section within the image.
    #[inline]
    #[must_use]
    pub fn section_offset(&self, section: Section) -> u16 {
        self.read_u16(section.header_field_offset())
    }

    /// End offset of a section: the next section's offset, or the image
    /// size for the final (heap) section.
    #[must_use]
    pub fn section_end(&self, section: Section) -> u16 {
        match section {
            Section::Heap => self.size(),
            _ => self.read_u16(section.header_field_offset() + 2),
        }
    }

    /// Size of a section in bytes.
    #[must_use]
    pub fn section_size(&self, section: Section) -> u16 {
        self.section_end(section) - self.section_offset(section)
    }

    /// Validate the header, CRC, versions, feature flags, and section
    /// table.
    pub fn validate(&self) -> Result<(), Error> {
        if self.bytes.len() < MIN_IMAGE_SIZE || self.bytes.len() > usize::from(u16::MAX) {
            return Err(Error::InvalidBytecode);
        }

        // The size field must agree with the actual byte count; the medium
        // the image came from is authoritative, not the header.
        if usize::from(self.read_u16(OFF_BYTECODE_SIZE)) != self.bytes.len() {
            return Err(Error::InvalidBytecode);
        }

        let expected_crc = self.read_u16(OFF_CRC);
        if port::crc16_ccitt(&self.bytes[CRC_START..]) != expected_crc {
            return Err(Error::BytecodeCrcFail);
        }

        if self.read_u8(OFF_BYTECODE_VERSION) != BYTECODE_VERSION {
            return Err(Error::InvalidBytecode);
        }
        if self.read_u8(OFF_REQUIRED_ENGINE_VERSION) > ENGINE_VERSION {
            return Err(Error::RequiresLaterEngine);
        }

        let feature_flags = self.read_u32(OFF_REQUIRED_FEATURE_FLAGS);
        let requires_float = feature_flags & FEATURE_FLAG_FLOAT_SUPPORT != 0;
        // The value semantics differ between float and integer-only
        // builds, so the image's flag must match the engine exactly.
        if requires_float != cfg!(feature = "float") {
            return Err(Error::BytecodeRequiresFloatSupport);
        }

        // Section offsets must ascend, stay 16-bit aligned, and stay
        // within the image.
        let mut prev = HEADER_SIZE as u16;
        for section in Section::ALL {
            let offset = self.section_offset(section);
            if offset < prev || offset & 1 != 0 || usize::from(offset) > self.bytes.len() {
                return Err(Error::InvalidBytecode);
            }
            prev = offset;
        }

        Ok(())
    }

    // --- Table accessors ---

    /// Number of entries in the import table.
    #[must_use]
    pub fn import_count(&self) -> u16 {
        self.section_size(Section::ImportTable) / 2
    }

    /// Host function ID of an import-table entry.
    #[must_use]
    pub fn import_host_id(&self, index: u16) -> u16 {
        let offset = self.section_offset(Section::ImportTable) + index * 2;
        self.read_u16(offset.into())
    }

    /// Look up an export by ID, returning its value.
    #[must_use]
    pub fn find_export(&self, export_id: u16) -> Option<Value> {
        let mut at = usize::from(self.section_offset(Section::ExportTable));
        let end = usize::from(self.section_end(Section::ExportTable));
        while at < end {
            if self.read_u16(at) == export_id {
                return Some(Value::from_raw(self.read_u16(at + 2)));
            }
            at += 4;
        }
        None
    }

    /// A short-call table entry: the 16-bit target and argument count.
    ///
    /// A target with its low bit set is a host import index (shifted left
    /// by one); with the low bit clear it is a bytecode offset.
    #[must_use]
    pub fn short_call_entry(&self, index: u8) -> (u16, u8) {
        let at = usize::from(self.section_offset(Section::ShortCallTable)) + usize::from(index) * 3;
        debug_assert!(at + 3 <= usize::from(self.section_end(Section::ShortCallTable)));
        let target = u16::from_le_bytes([self.bytes[at], self.bytes[at + 1]]);
        (target, self.bytes[at + 2])
    }

    /// Read a builtin slot. The result may be an indirection through a
    /// global (see `Vm::get_builtin`).
    #[must_use]
    pub fn builtin_slot(&self, builtin: Builtin) -> Value {
        let offset = self.section_offset(Section::Builtins) + (builtin as u16) * 2;
        Value::from_raw(self.read_u16(offset.into()))
    }

    /// Number of entries in the sorted interned-string table.
    #[must_use]
    pub fn string_table_count(&self) -> u16 {
        self.section_size(Section::StringTable) / 2
    }

    /// An interned-string table entry (a value referencing a ROM string).
    #[must_use]
    pub fn string_table_entry(&self, index: u16) -> Value {
        let offset = self.section_offset(Section::StringTable) + index * 2;
        Value::from_raw(self.read_u16(offset.into()))
    }
}
