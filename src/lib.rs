// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

pub mod error;
pub mod exif;
pub mod ifd;
pub mod makernote;
pub mod reader;
pub mod tags_impl;
pub mod util;

pub use error::{ Error, Result };
pub use ifd::{ IfdLayout, IfdReader, Profile, TiffHeader };
pub use reader::{ ByteReader, Endian, StreamReader };
pub use tags_impl::{ Directory, GetWithType, GroupId, Metadata, Rational, Tag, TagValue };

/// Parses a standalone TIFF/Exif block starting at its byte order marker.
pub fn parse(data: &[u8]) -> Result<Metadata> {
    exif::parse(data)
}
