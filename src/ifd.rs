// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use std::collections::BTreeSet;
use std::io::Cursor;

use byteorder::{ BigEndian, LittleEndian, ReadBytesExt };

use crate::error::{ Error, Result };
use crate::makernote::{ self, OffsetBase };
use crate::reader::{ ByteReader, Endian };
use crate::tags_impl::*;

pub const TIFF_MAGIC: u16 = 0x002A;

/// Byte order marker and first directory offset of a TIFF-derived block.
#[derive(Debug, Clone, Copy)]
pub struct TiffHeader {
    pub order: Endian,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Reads the `II`/`MM` marker and magic at `offset`. The returned first
    /// directory offset is relative to `offset`.
    pub fn parse(reader: &ByteReader, offset: u64) -> Result<TiffHeader> {
        let marker = reader.read_bytes(offset, 2)?;
        let order = match marker {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => return Err(Error::InvalidHeader(format!("unknown byte order marker {:02x} {:02x}", marker[0], marker[1]))),
        };
        let mut r = reader.clone();
        r.set_order(order);
        let magic = r.read_u16(offset + 2)?;
        if magic != TIFF_MAGIC {
            return Err(Error::InvalidHeader(format!("unexpected magic 0x{magic:04x}")));
        }
        Ok(TiffHeader { order, first_ifd_offset: r.read_u32(offset + 4)? as u64 })
    }
}

/// Geometry of one directory: how wide its fields are and whether a trailing
/// next-directory offset follows the entries.
#[derive(Debug, Clone, Copy)]
pub struct IfdLayout {
    pub count_width: u8,
    pub entry_stride: u8,
    /// Width of the inline value field. Values up to this size live inside
    /// the entry, larger ones behind an absolute offset.
    pub value_width: u8,
    pub chained: bool,
}

impl IfdLayout {
    /// Classic TIFF: u16 count, 12-byte entries, 4-byte inline values, chained.
    pub const TIFF: IfdLayout = IfdLayout { count_width: 2, entry_stride: 12, value_width: 4, chained: true };
}

/// Declarative walking profile for one top-level format: which directory kind
/// the walk starts in, which tags point at nested directories and what kind
/// those produce, and where maker notes and the camera make live.
#[derive(Clone)]
pub struct Profile {
    pub kind: GroupId,
    /// Kind assigned to the second and further directories of the top chain.
    pub chain_kind: Option<GroupId>,
    pub layout: IfdLayout,
    pub pointer_tags: Vec<(u16, GroupId)>,
    pub makernote_tag: Option<u16>,
    pub make_tag: Option<u16>,
}

impl Profile {
    pub fn new(kind: GroupId, layout: IfdLayout) -> Self {
        Self { kind, chain_kind: None, layout, pointer_tags: Vec::new(), makernote_tag: None, make_tag: None }
    }
    pub fn pointer_kind(&self, id: u16) -> Option<&GroupId> {
        self.pointer_tags.iter().find(|(t, _)| *t == id).map(|(_, k)| k)
    }
}

// TIFF value types: 1 BYTE, 2 ASCII, 3 SHORT, 4 LONG, 5 RATIONAL, 6 SBYTE,
// 7 UNDEFINED, 8 SSHORT, 9 SLONG, 10 SRATIONAL, 11 FLOAT, 12 DOUBLE
fn type_width(code: u16) -> Option<usize> {
    match code {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8         => Some(2),
        4 | 9 | 11    => Some(4),
        5 | 10 | 12   => Some(8),
        _ => None,
    }
}

fn parse_list<T>(d: &mut Cursor<&[u8]>, f: impl Fn(&mut Cursor<&[u8]>) -> std::io::Result<T>) -> std::io::Result<Vec<T>> {
    let count = d.get_ref().len() / std::mem::size_of::<T>().max(1);
    (0..count).map(|_| f(d)).collect()
}

fn parse_ascii(d: &mut Cursor<&[u8]>) -> std::io::Result<String> {
    let data = *d.get_ref();
    let end = memchr::memchr(0, data).unwrap_or(data.len());
    Ok(String::from_utf8_lossy(&data[..end]).trim_end().to_string())
}

/// Decodes one entry's payload into a typed value. `raw` holds exactly the
/// declared count × type width bytes; the element count falls out of its length.
pub(crate) fn decode_value(type_code: u16, order: Endian, raw: &[u8]) -> TagValue {
    macro_rules! types {
        ($($code:literal => ($t:ident, $be:expr, $le:expr)),*,) => {
            match type_code {
                $($code => {
                    paste::paste! {
                        if raw.len() == std::mem::size_of::<$t>() {
                            match order {
                                Endian::Big    => TagValue::$t(ValueType::new($be, |v| format!("{}", v), raw.to_vec())),
                                Endian::Little => TagValue::$t(ValueType::new($le, |v| format!("{}", v), raw.to_vec())),
                            }
                        } else {
                            match order {
                                Endian::Big    => TagValue::[<Vec_ $t>](ValueType::new(|d| parse_list(d, $be), |v| format!("{:?}", v), raw.to_vec())),
                                Endian::Little => TagValue::[<Vec_ $t>](ValueType::new(|d| parse_list(d, $le), |v| format!("{:?}", v), raw.to_vec())),
                            }
                        }
                    }
                },)*
                _ => TagValue::Unknown(ValueType::new(|_| Ok(()), |_| "".into(), raw.to_vec()))
            }
        };
    }

    match type_code {
        2 => TagValue::String(ValueType::new(parse_ascii, |v| v.clone(), raw.to_vec())),
        7 => TagValue::Unknown(ValueType::new(|_| Ok(()), |_| "".into(), raw.to_vec())),
        5 => {
            if raw.len() == 8 {
                match order {
                    Endian::Big    => TagValue::URational(ValueType::new(|d| Ok(Rational { num: d.read_u32::<BigEndian>()?,    den: d.read_u32::<BigEndian>()? }),    |v| v.to_string(), raw.to_vec())),
                    Endian::Little => TagValue::URational(ValueType::new(|d| Ok(Rational { num: d.read_u32::<LittleEndian>()?, den: d.read_u32::<LittleEndian>()? }), |v| v.to_string(), raw.to_vec())),
                }
            } else {
                match order {
                    Endian::Big    => TagValue::Vec_URational(ValueType::new(|d| parse_list(d, |d| Ok(Rational { num: d.read_u32::<BigEndian>()?,    den: d.read_u32::<BigEndian>()? })),    |v| format!("{:?}", v), raw.to_vec())),
                    Endian::Little => TagValue::Vec_URational(ValueType::new(|d| parse_list(d, |d| Ok(Rational { num: d.read_u32::<LittleEndian>()?, den: d.read_u32::<LittleEndian>()? })), |v| format!("{:?}", v), raw.to_vec())),
                }
            }
        },
        10 => {
            if raw.len() == 8 {
                match order {
                    Endian::Big    => TagValue::SRational(ValueType::new(|d| Ok(Rational { num: d.read_i32::<BigEndian>()?,    den: d.read_i32::<BigEndian>()? }),    |v| v.to_string(), raw.to_vec())),
                    Endian::Little => TagValue::SRational(ValueType::new(|d| Ok(Rational { num: d.read_i32::<LittleEndian>()?, den: d.read_i32::<LittleEndian>()? }), |v| v.to_string(), raw.to_vec())),
                }
            } else {
                match order {
                    Endian::Big    => TagValue::Vec_SRational(ValueType::new(|d| parse_list(d, |d| Ok(Rational { num: d.read_i32::<BigEndian>()?,    den: d.read_i32::<BigEndian>()? })),    |v| format!("{:?}", v), raw.to_vec())),
                    Endian::Little => TagValue::Vec_SRational(ValueType::new(|d| parse_list(d, |d| Ok(Rational { num: d.read_i32::<LittleEndian>()?, den: d.read_i32::<LittleEndian>()? })), |v| format!("{:?}", v), raw.to_vec())),
                }
            }
        },
        _ => types! {
            1  => (u8,  |d| d.read_u8(),  |d| d.read_u8()),
            3  => (u16, |d| d.read_u16::<BigEndian>(), |d| d.read_u16::<LittleEndian>()),
            4  => (u32, |d| d.read_u32::<BigEndian>(), |d| d.read_u32::<LittleEndian>()),
            6  => (i8,  |d| d.read_i8(),  |d| d.read_i8()),
            8  => (i16, |d| d.read_i16::<BigEndian>(), |d| d.read_i16::<LittleEndian>()),
            9  => (i32, |d| d.read_i32::<BigEndian>(), |d| d.read_i32::<LittleEndian>()),
            11 => (f32, |d| d.read_f32::<BigEndian>(), |d| d.read_f32::<LittleEndian>()),
            12 => (f64, |d| d.read_f64::<BigEndian>(), |d| d.read_f64::<LittleEndian>()),
        },
    }
}

/// Walks pointer-chased directory structures over one byte source.
///
/// One malformed entry never aborts its directory, one unreadable directory
/// never aborts the parse: everything recoverable degrades to error entries
/// on the affected directory. Offsets already walked are never walked again.
pub struct IfdReader<'a> {
    reader: ByteReader<'a>,
    visited: BTreeSet<(u64, GroupId)>,
    make: Option<String>,
}

impl<'a> IfdReader<'a> {
    pub fn new(reader: ByteReader<'a>) -> Self {
        Self { reader, visited: BTreeSet::new(), make: None }
    }

    /// Walks the whole directory graph starting at `offset` (relative to
    /// `base`). Always produces a bag, possibly error-laden.
    pub fn parse(mut self, offset: u64, base: u64, profile: &Profile) -> Metadata {
        let mut meta = Metadata::new();
        self.walk_chain(&mut meta, offset, base, profile.kind.clone(), None, profile, true);
        meta
    }

    fn walk_chain(&mut self, meta: &mut Metadata, offset: u64, base: u64, kind: GroupId, parent: Option<usize>, profile: &Profile, top: bool) {
        let mut offset = offset;
        let mut kind = kind;
        while let Some(next) = self.walk_one(meta, offset, base, kind.clone(), parent, profile) {
            offset = next;
            if top {
                if let Some(ck) = &profile.chain_kind {
                    kind = ck.clone();
                }
            }
        }
    }

    /// Parses one directory, returns the next chained offset if there is one.
    fn walk_one(&mut self, meta: &mut Metadata, offset: u64, base: u64, kind: GroupId, parent: Option<usize>, profile: &Profile) -> Option<u64> {
        let abs = base.checked_add(offset)?;
        if !self.visited.insert((abs, kind.clone())) {
            log::debug!("Directory at {abs} already walked, skipping");
            return None;
        }
        let layout = &profile.layout;
        let count = match self.read_count(abs, layout) {
            Ok(c) => c,
            Err(e) => {
                let mut dir = Directory::new(kind, abs, parent);
                dir.add_error(None, format!("could not read directory entry count: {e}"));
                meta.add_directory(dir);
                return None;
            }
        };
        log::debug!("{kind} at {abs}: {count} entries");
        let idx = meta.add_directory(Directory::new(kind, abs, parent));

        for i in 0..count {
            let entry_offset = abs + layout.count_width as u64 + i * layout.entry_stride as u64;
            if let Err(e) = self.parse_entry(meta, idx, entry_offset, base, profile) {
                // The entry header itself ran off the end, so the remaining entries can't be there either
                meta.dir_mut(idx).add_error(None, format!("directory truncated at entry {i} of {count}: {e}"));
                return None;
            }
        }

        if layout.chained {
            let next_pos = abs + layout.count_width as u64 + count * layout.entry_stride as u64;
            let next = match layout.value_width {
                8 => self.reader.read_u64(next_pos),
                _ => self.reader.read_u32(next_pos).map(|v| v as u64),
            };
            match next {
                Ok(0) | Err(_) => {}
                Ok(next) => {
                    if base.checked_add(next).is_some_and(|abs| abs < self.reader.len()) {
                        return Some(next);
                    }
                    log::debug!("Next directory offset {next} out of bounds, ignoring");
                }
            }
        }
        None
    }

    /// Resolves one entry. `Err` means the fixed entry header itself was
    /// unreadable; every failure past that is contained in the directory.
    fn parse_entry(&mut self, meta: &mut Metadata, idx: usize, entry_offset: u64, base: u64, profile: &Profile) -> Result<()> {
        let layout = &profile.layout;
        let tag_id = self.reader.read_u16(entry_offset)?;
        let type_code = self.reader.read_u16(entry_offset + 2)?;
        let count = self.reader.read_u32(entry_offset + 4)? as u64;
        let value_pos = entry_offset + 8;
        let value_field = self.reader.read_bytes(value_pos, layout.value_width as usize)?;

        let width = match type_width(type_code) {
            Some(w) => w,
            None => {
                log::warn!("Unknown type code {type_code} for tag 0x{tag_id:04x}: {}", pretty_hex::pretty_hex(&value_field));
                let dir = meta.dir_mut(idx);
                dir.set_tag(Tag { id: tag_id, type_code, value: TagValue::Unknown(ValueType::new(|_| Ok(()), |_| "".into(), value_field.to_vec())) });
                dir.add_error(Some(tag_id), format!("{}, value kept as raw bytes", Error::UnknownType(type_code)));
                return Ok(());
            }
        };

        let total = count.saturating_mul(width as u64);
        if total > self.reader.len() {
            meta.dir_mut(idx).add_error(Some(tag_id), format!("tag 0x{tag_id:04x} declares {total} bytes, source has {}", self.reader.len()));
            return Ok(());
        }

        let (raw, data_offset) = if total <= layout.value_width as u64 {
            (&value_field[..total as usize], None)
        } else {
            let rel = match layout.value_width {
                8 => self.reader.read_u64(value_pos)?,
                _ => self.reader.read_u32(value_pos)? as u64,
            };
            let Some(data_abs) = base.checked_add(rel) else {
                meta.dir_mut(idx).add_error(Some(tag_id), format!("tag 0x{tag_id:04x} value offset overflows"));
                return Ok(());
            };
            // validate before dereferencing; a bad offset skips this entry only
            match self.reader.read_bytes(data_abs, total as usize) {
                Ok(b) => (b, Some(data_abs)),
                Err(e) => {
                    meta.dir_mut(idx).add_error(Some(tag_id), format!("tag 0x{tag_id:04x} value out of bounds: {e}"));
                    return Ok(());
                }
            }
        };

        let value = decode_value(type_code, self.reader.order(), raw);

        // Camera make, kept as a hint for maker note classification
        if Some(tag_id) == profile.make_tag {
            if let TagValue::String(s) = &value {
                self.make = Some(s.get().clone());
            }
        }

        let pointer_kind = profile.pointer_kind(tag_id).cloned();
        let is_makernote = Some(tag_id) == profile.makernote_tag;

        meta.dir_mut(idx).set_tag(Tag { id: tag_id, type_code, value });

        if let Some(child_kind) = pointer_kind {
            let targets = meta.get(idx).and_then(|d| d.get(tag_id)).map(pointer_values).unwrap_or_default();
            for target in targets {
                self.walk_chain(meta, target, base, child_kind.clone(), Some(idx), profile, false);
            }
        } else if is_makernote {
            self.process_makernote(meta, idx, tag_id, base, data_offset, total);
        }
        Ok(())
    }

    fn process_makernote(&mut self, meta: &mut Metadata, idx: usize, tag_id: u16, base: u64, data_offset: Option<u64>, total: u64) {
        let Some(start) = data_offset else {
            return; // inline payloads are too small to contain a directory
        };
        let prefix = self.reader.read_bytes(start, total.min(16) as usize).unwrap_or(&[]);
        let Some(mn) = makernote::classify(prefix, self.make.as_deref()) else {
            log::warn!("Unrecognized maker note (make: {:?}): {}", self.make, pretty_hex::pretty_hex(&prefix));
            meta.dir_mut(idx).add_error(Some(tag_id), format!("{}, kept as raw bytes", Error::UnrecognizedMakerNote));
            return;
        };

        let saved_order = self.reader.order();
        let sub_profile = Profile::new(mn.kind.clone(), IfdLayout { chained: mn.chained, ..IfdLayout::TIFF });

        if mn.embedded_tiff {
            // A complete TIFF header follows the vendor prefix and owns the
            // byte order and offsets of the note
            let header_at = start + mn.header_skip;
            match TiffHeader::parse(&self.reader, header_at) {
                Ok(h) => {
                    self.reader.set_order(h.order);
                    self.walk_chain(meta, h.first_ifd_offset, header_at, mn.kind, Some(idx), &sub_profile, false);
                }
                Err(e) => {
                    meta.dir_mut(idx).add_error(Some(tag_id), format!("maker note header invalid: {e}"));
                }
            }
        } else {
            if let Some(order) = mn.order {
                self.reader.set_order(order);
            }
            let sub_base = match mn.base {
                OffsetBase::TiffHeader => base,
                OffsetBase::BlockStart => start,
            };
            let first = (start + mn.header_skip).saturating_sub(sub_base);
            self.walk_chain(meta, first, sub_base, mn.kind, Some(idx), &sub_profile, false);
        }
        self.reader.set_order(saved_order);
    }

    fn read_count(&self, abs: u64, layout: &IfdLayout) -> Result<u64> {
        match layout.count_width {
            8 => self.reader.read_u64(abs),
            4 => Ok(self.reader.read_u32(abs)? as u64),
            _ => Ok(self.reader.read_u16(abs)? as u64),
        }
    }
}

fn pointer_values(value: &TagValue) -> Vec<u64> {
    match value {
        TagValue::u16(t) => vec![*t.get() as u64],
        TagValue::u32(t) => vec![*t.get() as u64],
        TagValue::Vec_u16(t) => t.get().iter().map(|&v| v as u64).collect(),
        TagValue::Vec_u32(t) => t.get().iter().map(|&v| v as u64).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn entry(tag: u16, typ: u16, count: u32, value: [u8; 4]) -> Vec<u8> {
        let mut e = Vec::new();
        e.write_u16::<BigEndian>(tag).unwrap();
        e.write_u16::<BigEndian>(typ).unwrap();
        e.write_u32::<BigEndian>(count).unwrap();
        e.extend_from_slice(&value);
        e
    }

    fn dir(entries: &[Vec<u8>], next: u32) -> Vec<u8> {
        let mut d = Vec::new();
        d.write_u16::<BigEndian>(entries.len() as u16).unwrap();
        for e in entries {
            d.extend_from_slice(e);
        }
        d.write_u32::<BigEndian>(next).unwrap();
        d
    }

    fn test_profile() -> Profile {
        let mut p = Profile::new(GroupId::Ifd0, IfdLayout::TIFF);
        p.chain_kind = Some(GroupId::Thumbnail);
        p.pointer_tags = vec![(0x014A, GroupId::SubIfd)];
        p
    }

    fn walk(data: &[u8]) -> Metadata {
        IfdReader::new(ByteReader::new(data, Endian::Big)).parse(0, 0, &test_profile())
    }

    #[test]
    fn tiff_header_both_orders() {
        let le = hex_literal::hex!("49 49 2A 00 08 00 00 00");
        let h = TiffHeader::parse(&ByteReader::new(&le, Endian::Big), 0).unwrap();
        assert_eq!(h.order, Endian::Little);
        assert_eq!(h.first_ifd_offset, 8);

        let be = hex_literal::hex!("4D 4D 00 2A 00 00 00 08");
        let h = TiffHeader::parse(&ByteReader::new(&be, Endian::Big), 0).unwrap();
        assert_eq!(h.order, Endian::Big);
        assert_eq!(h.first_ifd_offset, 8);
    }

    #[test]
    fn tiff_header_rejects_garbage() {
        let bad_marker = hex_literal::hex!("00 00 2A 00 08 00 00 00");
        assert!(matches!(TiffHeader::parse(&ByteReader::new(&bad_marker, Endian::Big), 0), Err(Error::InvalidHeader(_))));
        let bad_magic = hex_literal::hex!("49 49 2B 00 08 00 00 00");
        assert!(matches!(TiffHeader::parse(&ByteReader::new(&bad_magic, Endian::Big), 0), Err(Error::InvalidHeader(_))));
        assert!(matches!(TiffHeader::parse(&ByteReader::new(&[0x49], Endian::Big), 0), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn inline_short_value() {
        let data = dir(&[entry(0x0100, 3, 1, [0, 10, 0, 0])], 0);
        let md = walk(&data);
        assert_eq!(md.len(), 1);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_u32(0x0100), Some(10));
        assert!(!d.has_errors());
    }

    #[test]
    fn out_of_bounds_entry_is_skipped_and_reported() {
        // entry A inline, entry B points 20 ASCII bytes at offset 200 of a 150-byte source
        let mut data = dir(&[
            entry(0x0100, 3, 1, [0, 10, 0, 0]),
            entry(0x0132, 2, 20, [0, 0, 0, 200]),
        ], 0);
        data.resize(150, 0);
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_u32(0x0100), Some(10));
        assert!(d.get(0x0132).is_none());
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].0, Some(0x0132));
        assert!(d.has_errors());
        assert_eq!(d.tag_count(), 1);
    }

    #[test]
    fn oversized_declaration_is_skipped_before_dereference() {
        let data = dir(&[entry(0x0111, 4, 0xFFFF_FFFF, [0, 0, 0, 8])], 0);
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert!(d.get(0x0111).is_none());
        assert_eq!(d.errors().len(), 1);
    }

    #[test]
    fn duplicate_tag_last_wins_in_scan_order() {
        let data = dir(&[
            entry(0x0100, 3, 1, [0, 10, 0, 0]),
            entry(0x0100, 3, 1, [0, 20, 0, 0]),
        ], 0);
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_u32(0x0100), Some(20));
        assert_eq!(d.tag_count(), 1);
        assert!(!d.has_errors());
    }

    #[test]
    fn inline_and_indirect_decode_identically() {
        // "abc" fits inline as count 4; count 5 forces the same text through an offset
        let mut data = dir(&[
            entry(0x0001, 2, 4, *b"abc\0"),
            entry(0x0002, 2, 5, [0, 0, 0, 30]),
        ], 0);
        assert_eq!(data.len(), 30);
        data.extend_from_slice(b"abc\0\0");
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_string(0x0001), d.get_string(0x0002));
        assert_eq!(d.get_string(0x0001).as_deref(), Some("abc"));
    }

    #[test]
    fn unknown_type_code_keeps_raw_bytes() {
        let data = dir(&[entry(0x9999, 200, 1, [1, 2, 3, 4])], 0);
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_bytes(0x9999), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(d.errors().len(), 1);
        assert_eq!(d.errors()[0].0, Some(0x9999));
    }

    #[test]
    fn indirect_values_decode() {
        // three SHORTs and one RATIONAL, both past the inline field
        let mut data = dir(&[
            entry(0x0102, 3, 3, [0, 0, 0, 30]),
            entry(0x011A, 5, 1, [0, 0, 0, 36]),
        ], 0);
        assert_eq!(data.len(), 30);
        data.write_u16::<BigEndian>(8).unwrap();
        data.write_u16::<BigEndian>(8).unwrap();
        data.write_u16::<BigEndian>(8).unwrap();
        data.write_u32::<BigEndian>(72).unwrap();
        data.write_u32::<BigEndian>(1).unwrap();
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_u32_array(0x0102), Some(vec![8, 8, 8]));
        assert_eq!(d.get_urational(0x011A), Some(Rational { num: 72, den: 1 }));
        assert!(!d.has_errors());
    }

    #[test]
    fn sub_directory_and_cycle_break() {
        // root at 0 points at 40; the directory at 40 points back at itself
        let mut data = dir(&[entry(0x014A, 4, 1, [0, 0, 0, 40])], 0);
        data.resize(40, 0);
        data.extend_from_slice(&dir(&[entry(0x014A, 4, 1, [0, 0, 0, 40])], 0));
        let md = walk(&data);
        assert_eq!(md.len(), 2);
        let child = md.get(1).unwrap();
        assert_eq!(child.kind(), &GroupId::SubIfd);
        assert_eq!(child.parent(), Some(0));
        assert_eq!(child.offset(), 40);
        // the second encounter of offset 40 is dropped silently
        assert!(!child.has_errors());
        assert_eq!(md.children_of(0).count(), 1);
    }

    #[test]
    fn sibling_chain_and_chain_cycle() {
        // 0 chains to 40, 40 chains to itself; the walk terminates
        let mut data = dir(&[entry(0x0100, 3, 1, [0, 1, 0, 0])], 40);
        data.resize(40, 0);
        data.extend_from_slice(&dir(&[entry(0x0100, 3, 1, [0, 2, 0, 0])], 40));
        let md = walk(&data);
        assert_eq!(md.len(), 2);
        assert_eq!(md.get(0).unwrap().kind(), &GroupId::Ifd0);
        assert_eq!(md.get(0).unwrap().parent(), None);
        assert_eq!(md.get(1).unwrap().kind(), &GroupId::Thumbnail);
        assert_eq!(md.get(1).unwrap().parent(), None);
        assert_eq!(md.get(1).unwrap().get_u32(0x0100), Some(2));
    }

    #[test]
    fn unreadable_child_header_leaves_parent_intact() {
        // pointer target is in bounds but too close to the end to hold a count
        let mut data = dir(&[
            entry(0x0100, 3, 1, [0, 10, 0, 0]),
            entry(0x014A, 4, 1, [0, 0, 0, 49]),
        ], 0);
        data.resize(50, 0);
        let md = walk(&data);
        assert_eq!(md.len(), 2);
        let parent = md.get(0).unwrap();
        assert_eq!(parent.get_u32(0x0100), Some(10));
        assert!(!parent.has_errors());
        let child = md.get(1).unwrap();
        assert_eq!(child.tag_count(), 0);
        assert_eq!(child.errors().len(), 1);
    }

    #[test]
    fn truncated_entry_table() {
        // declares 64 entries, the buffer holds one
        let mut data = dir(&[entry(0x0100, 3, 1, [0, 10, 0, 0])], 0);
        data[1] = 64;
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.get_u32(0x0100), Some(10));
        assert_eq!(d.errors().len(), 1);
        assert!(d.errors()[0].1.contains("truncated"));
    }

    #[test]
    fn empty_directory() {
        let data = dir(&[], 0);
        let md = walk(&data);
        let d = md.get(0).unwrap();
        assert_eq!(d.tag_count(), 0);
        assert!(!d.has_errors());
    }

    #[test]
    fn little_endian_walk() {
        let mut data = Vec::new();
        data.write_u16::<LittleEndian>(1).unwrap();
        data.write_u16::<LittleEndian>(0x0100).unwrap();
        data.write_u16::<LittleEndian>(3).unwrap();
        data.write_u32::<LittleEndian>(1).unwrap();
        data.extend_from_slice(&[0x00, 0x04, 0, 0]); // 1024 LE
        data.write_u32::<LittleEndian>(0).unwrap();
        let md = IfdReader::new(ByteReader::new(&data, Endian::Little)).parse(0, 0, &test_profile());
        assert_eq!(md.get(0).unwrap().get_u32(0x0100), Some(1024));
    }

    #[test]
    fn multiple_sub_ifd_offsets() {
        // a single pointer tag carrying two offsets produces two children
        let mut data = dir(&[entry(0x014A, 4, 2, [0, 0, 0, 18])], 0);
        assert_eq!(data.len(), 18);
        data.write_u32::<BigEndian>(40).unwrap();
        data.write_u32::<BigEndian>(60).unwrap();
        data.resize(40, 0);
        data.extend_from_slice(&dir(&[entry(0x0100, 3, 1, [0, 1, 0, 0])], 0));
        data.resize(60, 0);
        data.extend_from_slice(&dir(&[entry(0x0100, 3, 1, [0, 2, 0, 0])], 0));
        let md = walk(&data);
        assert_eq!(md.len(), 3);
        assert_eq!(md.children_of(0).count(), 2);
        assert_eq!(md.get(1).unwrap().get_u32(0x0100), Some(1));
        assert_eq!(md.get(2).unwrap().get_u32(0x0100), Some(2));
    }
}
