// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Error codes of the engine.
//!
//! Errors fall into a few families:
//! - Bytecode integrity errors, returned from restore
//!   (`InvalidBytecode`, `BytecodeCrcFail`, `RequiresLaterEngine`, ...)
//! - Script-level errors, returned from `call` with the VM left usable
//!   (`TypeError`, `RangeError`, `TdzError`, ...)
//! - Resource exhaustion, routed through the diverging fatal path in
//!   `port` (`OutOfMemory`, `AllocationTooLarge`, ...)
//!
//! `Float64`, `NanValue`, and `NegZero` are internal signals of the
//! numeric conversion path and never escape the public API.

use core::fmt;

/// Engine error code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Internal invariant violation.
    Unexpected,
    /// The host allocator failed.
    MallocFail,
    /// A single allocation would exceed the maximum allocation size.
    AllocationTooLarge,
    /// A pointer value did not decode to a valid address.
    InvalidAddress,
    /// Lookup of a function that does not exist.
    FunctionNotFound,
    /// A handle was released twice or never registered.
    InvalidHandle,
    /// The activation stack is exhausted.
    StackOverflow,
    /// The import resolver returned no function for an import.
    UnresolvedImport,
    /// The bytecode attempted to write into the image.
    AttemptToWriteToRom,
    /// Invalid arguments to a host API function.
    InvalidArguments,
    /// Operation applied to a value of the wrong type.
    TypeError,
    /// Call target is not a function or closure.
    TargetNotCallable,
    /// A host function returned an error.
    HostError,
    /// Operation is defined by the language but not provided by this
    /// engine.
    NotImplemented,
    /// A debug assertion failed.
    AssertionFailed,
    /// The image failed structural validation.
    InvalidBytecode,
    /// Export ID not present in the export table.
    UnresolvedExport,
    /// Numeric value out of the supported range.
    RangeError,
    /// Internal signal: the value is a boxed float64.
    Float64,
    /// Internal signal: the conversion result is NaN.
    NanValue,
    /// Internal signal: the conversion result is negative zero.
    NegZero,
    /// The operation needs float64 support, which this build lacks.
    OperationRequiresFloatSupport,
    /// The image CRC does not match its contents.
    BytecodeCrcFail,
    /// The image requires float64 support.
    BytecodeRequiresFloatSupport,
    /// `__proto__` is not writable.
    ProtoIsReadonly,
    /// The snapshot would exceed the 64 KiB image limit.
    SnapshotTooLarge,
    /// An array would exceed the maximum backing allocation.
    ArrayTooLong,
    /// Growing the heap would exceed the configured heap cap.
    OutOfMemory,
    /// More than 254 arguments passed to `call`.
    TooManyArguments,
    /// The image was produced for a newer engine.
    RequiresLaterEngine,
    /// The pointer-model self-test failed at restore.
    PortFileMacroTestFailure,
    /// A variable was accessed inside its temporal dead zone.
    TdzError,
    /// Array index outside the supported range.
    InvalidArrayIndex,
    /// The script threw a value that nothing caught. The value is
    /// available from `Vm::last_exception`.
    UncaughtException,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
