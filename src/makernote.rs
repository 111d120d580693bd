// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use crate::reader::Endian;
use crate::tags_impl::GroupId;

/// What resolved value offsets inside a maker note count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBase {
    /// The surrounding TIFF header, the standard TIFF rule.
    TiffHeader,
    /// The first byte of the maker note payload itself.
    BlockStart,
}

/// Layout profile of one recognized proprietary maker note format.
#[derive(Debug, Clone)]
pub struct MakerNote {
    pub kind: GroupId,
    /// Vendor header bytes to skip before the entry table.
    pub header_skip: u64,
    pub base: OffsetBase,
    /// Byte order override; `None` inherits the parent parse.
    pub order: Option<Endian>,
    /// Whether the vendor directory carries a trailing next-directory offset.
    pub chained: bool,
    /// A complete TIFF header follows the prefix and owns order and offsets.
    pub embedded_tiff: bool,
}

impl MakerNote {
    fn plain(kind: GroupId, header_skip: u64, base: OffsetBase) -> Self {
        Self { kind, header_skip, base, order: None, chained: false, embedded_tiff: false }
    }
}

/// Picks a maker note profile from the first payload bytes and the camera
/// make resolved earlier in the parse. Pure function of its inputs.
/// `None` means no known format matched and the block stays an opaque blob.
pub fn classify(prefix: &[u8], make: Option<&str>) -> Option<MakerNote> {
    if prefix.starts_with(b"OLYMPUS\0") {
        // newer Olympus, offsets count from the note itself
        return Some(MakerNote::plain(GroupId::MakerOlympus, 12, OffsetBase::BlockStart));
    }
    if prefix.starts_with(b"OLYMP\0") {
        return Some(MakerNote::plain(GroupId::MakerOlympus, 8, OffsetBase::TiffHeader));
    }
    if prefix.starts_with(b"Nikon\0") {
        if prefix.get(6) == Some(&0x02) {
            // format 2 embeds a complete TIFF header after the 10-byte prefix
            return Some(MakerNote { embedded_tiff: true, ..MakerNote::plain(GroupId::MakerNikon, 10, OffsetBase::BlockStart) });
        }
        return Some(MakerNote::plain(GroupId::MakerNikon, 8, OffsetBase::TiffHeader));
    }
    if prefix.starts_with(b"FUJIFILM") {
        // always little-endian regardless of the surrounding file
        return Some(MakerNote { order: Some(Endian::Little), ..MakerNote::plain(GroupId::MakerFujifilm, 12, OffsetBase::BlockStart) });
    }
    if prefix.starts_with(b"Panasonic\0") {
        return Some(MakerNote::plain(GroupId::MakerPanasonic, 12, OffsetBase::TiffHeader));
    }
    if prefix.starts_with(b"SONY DSC \0\0\0") || prefix.starts_with(b"SONY CAM \0\0\0") {
        return Some(MakerNote::plain(GroupId::MakerSony, 12, OffsetBase::TiffHeader));
    }
    match make {
        // headerless notes, the entry table starts right away
        Some(m) if m.eq_ignore_ascii_case("Canon")              => Some(MakerNote::plain(GroupId::MakerCanon, 0, OffsetBase::TiffHeader)),
        Some(m) if m.to_ascii_uppercase().starts_with("NIKON")  => Some(MakerNote::plain(GroupId::MakerNikon, 0, OffsetBase::TiffHeader)),
        _ => None,
    }
}
