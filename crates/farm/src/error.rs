// Errors produced while decoding a FARM file.
//
// Every fatal variant carries the byte offset where the bad field starts so that a corrupt
// file can be inspected with a hex editor. VersionMismatch is never returned from a decode;
// the assembler only logs it.

use crate::model::{Enumerant, Version};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FarmError {
    /// The source ran out in the middle of a field.
    #[error("unexpected end of data at offset {offset}: needed {requested} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// The first two bytes were neither `01 00` (little-endian) nor `00 00` (big-endian).
    #[error("invalid byte-order marker {found:02x?} at offset {offset}; expected [01, 00] or [00, 00]")]
    InvalidByteOrderMarker { offset: usize, found: [u8; 2] },

    #[error("invalid geometry discriminant {found} at offset {offset}; expected 0..=3")]
    InvalidGeometryDiscriminant { offset: usize, found: i32 },

    #[error("unsupported data kind {found} at offset {offset}")]
    UnsupportedDataKind { offset: usize, found: i32 },

    #[error("invalid attribute units {found} at offset {offset}")]
    InvalidUnits { offset: usize, found: i32 },

    /// An enumeration default that is not part of its own valid set.
    #[error("enumeration default {default} at offset {offset} is not in the valid set")]
    InvalidEnumDefault { offset: usize, default: Enumerant },

    #[error("invalid count {found} at offset {offset}")]
    InvalidCount { offset: usize, found: i32 },

    #[error("invalid index {found} at offset {offset}")]
    InvalidIndex { offset: usize, found: i32 },

    #[error("string at offset {offset} is not valid UTF-8: {source}")]
    InvalidString {
        offset: usize,
        source: std::str::Utf8Error,
    },

    /// Non-fatal. Logged by the assembler, decoding continues.
    #[error("file version {found} differs from supported version {expected}")]
    VersionMismatch { found: Version, expected: Version },

    #[error("unable to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, FarmError>;
