//! Low-level primitives for building the storage engine.
//!
//! Includes byte utilities and positioned file I/O.

/// Byte-level utilities and encoding/decoding.
///
/// Big-endian word arrays, varints and a parsing cursor used by every
/// on-disk format.
pub mod bytes;

/// I/O abstractions and utilities.
///
/// Interfaces for reading/writing data and file operations.
pub mod io;
