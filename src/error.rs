// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read of {count} bytes at offset {offset} exceeds source length {len}")]
    OutOfBounds { offset: u64, count: usize, len: u64 },

    #[error("cannot seek backwards to {requested} on a forward-only source at position {position}")]
    UnsupportedSeek { requested: u64, position: u64 },

    #[error("unknown directory entry type code {0}")]
    UnknownType(u16),

    #[error("unrecognized maker note format")]
    UnrecognizedMakerNote,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
