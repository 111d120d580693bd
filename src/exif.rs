// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use crate::error::Result;
use crate::ifd::{ IfdLayout, IfdReader, Profile, TiffHeader };
use crate::reader::{ ByteReader, Endian };
use crate::tags_impl::{ GroupId, Metadata };

// Tags the walking engine itself needs. Anything else is a caller concern.
pub const TAG_MAKE:         u16 = 0x010F;
pub const TAG_MODEL:        u16 = 0x0110;
pub const TAG_SUB_IFDS:     u16 = 0x014A;
pub const TAG_EXIF_SUB_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD:      u16 = 0x8825;
pub const TAG_MAKER_NOTE:   u16 = 0x927C;
pub const TAG_INTEROP:      u16 = 0xA005;

/// The standard Exif walking profile: classic TIFF entry layout, IFD chaining
/// (the chained directory is the thumbnail) and the well-known pointer tags.
pub fn profile() -> Profile {
    Profile {
        kind: GroupId::Ifd0,
        chain_kind: Some(GroupId::Thumbnail),
        layout: IfdLayout::TIFF,
        pointer_tags: vec![
            (TAG_EXIF_SUB_IFD, GroupId::ExifSubIfd),
            (TAG_GPS_IFD,      GroupId::GpsIfd),
            (TAG_INTEROP,      GroupId::Interop),
            (TAG_SUB_IFDS,     GroupId::SubIfd),
        ],
        makernote_tag: Some(TAG_MAKER_NOTE),
        make_tag: Some(TAG_MAKE),
    }
}

/// Parses one Exif/TIFF block. `data` must start at the TIFF header (the
/// byte order marker). An unreadable header is the only hard failure;
/// everything past it accumulates inside the returned bag.
pub fn parse(data: &[u8]) -> Result<Metadata> {
    let mut reader = ByteReader::new(data, Endian::Big);
    let header = TiffHeader::parse(&reader, 0)?;
    log::debug!("TIFF header: {:?} order, first IFD at {}", header.order, header.first_ifd_offset);
    reader.set_order(header.order);
    Ok(IfdReader::new(reader).parse(header.first_ifd_offset, 0, &profile()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tags_impl::{ Rational, TagValue };
    use byteorder::{ LittleEndian, WriteBytesExt };

    fn entry(tag: u16, typ: u16, count: u32, value: [u8; 4]) -> Vec<u8> {
        let mut e = Vec::new();
        e.write_u16::<LittleEndian>(tag).unwrap();
        e.write_u16::<LittleEndian>(typ).unwrap();
        e.write_u32::<LittleEndian>(count).unwrap();
        e.extend_from_slice(&value);
        e
    }

    fn dir(entries: &[Vec<u8>], next: u32) -> Vec<u8> {
        let mut d = Vec::new();
        d.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
        for e in entries {
            d.extend_from_slice(e);
        }
        d.write_u32::<LittleEndian>(next).unwrap();
        d
    }

    /// Little-endian Exif block: IFD0 (make, width, Exif and GPS pointers),
    /// Exif SubIFD (exposure, ISO, a Fujifilm maker note), a thumbnail IFD
    /// chained behind IFD0.
    fn sample_exif() -> Vec<u8> {
        let mut data = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        data.extend_from_slice(&dir(&[
            entry(0x010F, 2, 6,  [62, 0, 0, 0]),       // Make -> "Canon"
            entry(0x0100, 3, 1,  [0x00, 0x04, 0, 0]),  // ImageWidth = 1024
            entry(0x8769, 4, 1,  [68, 0, 0, 0]),       // Exif SubIFD
            entry(0x8825, 4, 1,  [144, 0, 0, 0]),      // GPS
        ], 162));
        assert_eq!(data.len(), 62);
        data.extend_from_slice(b"Canon\0");
        assert_eq!(data.len(), 68);
        data.extend_from_slice(&dir(&[
            entry(0x829A, 5, 1,  [110, 0, 0, 0]),      // ExposureTime 1/250
            entry(0x8827, 3, 1,  [100, 0, 0, 0]),      // ISO
            entry(0x927C, 7, 26, [118, 0, 0, 0]),      // MakerNote
        ], 0));
        assert_eq!(data.len(), 110);
        data.write_u32::<LittleEndian>(1).unwrap();
        data.write_u32::<LittleEndian>(250).unwrap();
        assert_eq!(data.len(), 118);
        // Fujifilm note: prefix, note-relative IFD offset, entries at +12
        data.extend_from_slice(b"FUJIFILM");
        data.write_u32::<LittleEndian>(12).unwrap();
        data.write_u16::<LittleEndian>(1).unwrap();
        data.extend_from_slice(&entry(0x1000, 3, 1, [2, 0, 0, 0]));
        assert_eq!(data.len(), 144);
        data.extend_from_slice(&dir(&[
            entry(0x0000, 1, 4, [2, 3, 0, 0]),         // GPSVersionID
        ], 0));
        assert_eq!(data.len(), 162);
        data.extend_from_slice(&dir(&[
            entry(0x0103, 3, 1, [6, 0, 0, 0]),         // thumbnail Compression
        ], 0));
        assert_eq!(data.len(), 180);
        data
    }

    #[test]
    fn full_walk_discovery_order() {
        let md = parse(&sample_exif()).unwrap();
        let kinds: Vec<&GroupId> = md.directories().map(|d| d.kind()).collect();
        assert_eq!(kinds, [
            &GroupId::Ifd0,
            &GroupId::ExifSubIfd,
            &GroupId::MakerFujifilm,
            &GroupId::GpsIfd,
            &GroupId::Thumbnail,
        ]);
        assert!(!md.has_errors());
    }

    #[test]
    fn values_across_directories() {
        let md = parse(&sample_exif()).unwrap();
        let ifd0 = md.first_of_kind(&GroupId::Ifd0).unwrap();
        assert_eq!(ifd0.get_string(TAG_MAKE).as_deref(), Some("Canon"));
        assert_eq!(ifd0.get_u32(0x0100), Some(1024));

        let exif = md.first_of_kind(&GroupId::ExifSubIfd).unwrap();
        assert_eq!(exif.get_urational(0x829A), Some(Rational { num: 1, den: 250 }));
        assert_eq!(exif.get_f64(0x829A), Some(0.004));
        assert_eq!(exif.get_u32(0x8827), Some(100));
        assert_eq!(exif.get_bytes(TAG_MAKER_NOTE).map(|b| b.len()), Some(26));

        let gps = md.first_of_kind(&GroupId::GpsIfd).unwrap();
        assert_eq!(gps.get_u32_array(0x0000), Some(vec![2, 3, 0, 0]));

        let thumb = md.first_of_kind(&GroupId::Thumbnail).unwrap();
        assert_eq!(thumb.get_u32(0x0103), Some(6));
        assert_eq!(thumb.parent(), None);
    }

    #[test]
    fn maker_note_is_walked_as_child() {
        let md = parse(&sample_exif()).unwrap();
        let exif_idx = md.directories().position(|d| d.kind() == &GroupId::ExifSubIfd).unwrap();
        let maker = md.first_of_kind(&GroupId::MakerFujifilm).unwrap();
        assert_eq!(maker.parent(), Some(exif_idx));
        assert_eq!(maker.get_u32(0x1000), Some(2));
        assert_eq!(maker.offset(), 130);
    }

    #[test]
    fn unrecognized_maker_note_stays_opaque() {
        let mut data = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        data.extend_from_slice(&dir(&[
            entry(0x010F, 2, 5, [38, 0, 0, 0]),
            entry(0x8769, 4, 1, [43, 0, 0, 0]),
        ], 0));
        assert_eq!(data.len(), 38);
        data.extend_from_slice(b"Acme\0");
        assert_eq!(data.len(), 43);
        data.extend_from_slice(&dir(&[
            entry(0x927C, 7, 8, [61, 0, 0, 0]),
        ], 0));
        assert_eq!(data.len(), 61);
        data.extend_from_slice(b"WHOKNOWS");

        let md = parse(&data).unwrap();
        assert_eq!(md.len(), 2);
        let exif = md.first_of_kind(&GroupId::ExifSubIfd).unwrap();
        assert!(matches!(exif.get(TAG_MAKER_NOTE), Some(TagValue::Unknown(_))));
        assert_eq!(exif.get_bytes(TAG_MAKER_NOTE), Some(&b"WHOKNOWS"[..]));
        assert_eq!(exif.errors().len(), 1);
        assert_eq!(exif.errors()[0].0, Some(TAG_MAKER_NOTE));
    }

    #[test]
    fn header_failures_are_hard_errors() {
        assert!(matches!(parse(b"XXXX"), Err(Error::InvalidHeader(_)) | Err(Error::OutOfBounds { .. })));
        assert!(matches!(parse(&[0x49, 0x49, 0x2B, 0x00, 8, 0, 0, 0]), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn unreadable_first_directory_still_returns_a_bag() {
        // valid header, but the directory it points at is past the end
        let md = parse(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]).unwrap();
        assert_eq!(md.len(), 1);
        let d = md.get(0).unwrap();
        assert_eq!(d.tag_count(), 0);
        assert_eq!(d.errors().len(), 1);
        assert!(md.has_errors());
    }
}
