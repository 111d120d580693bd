// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use std::io::Read;

use byteorder::{ BigEndian, ByteOrder as _, LittleEndian, ReadBytesExt };
use serde::Serialize;

use crate::error::{ Error, Result };
use crate::tags_impl::Rational;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Big,
    Little,
}

/// Random-access, bounds-checked view over an in-memory byte buffer.
/// Every multi-byte read honors the active byte order at the time of the call.
#[derive(Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    order: Endian,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], order: Endian) -> Self {
        Self { data, order }
    }
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn order(&self) -> Endian {
        self.order
    }
    /// Affects only subsequent multi-byte reads.
    pub fn set_order(&mut self, order: Endian) {
        self.order = order;
    }

    fn slice(&self, offset: u64, count: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(count as u64).ok_or(Error::OutOfBounds { offset, count, len: self.len() })?;
        if end > self.len() {
            return Err(Error::OutOfBounds { offset, count, len: self.len() });
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }
    pub fn read_i8(&self, offset: u64) -> Result<i8> {
        Ok(self.slice(offset, 1)?[0] as i8)
    }
    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        let b = self.slice(offset, 2)?;
        Ok(match self.order { Endian::Big => BigEndian::read_u16(b), Endian::Little => LittleEndian::read_u16(b) })
    }
    pub fn read_i16(&self, offset: u64) -> Result<i16> {
        Ok(self.read_u16(offset)? as i16)
    }
    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        let b = self.slice(offset, 4)?;
        Ok(match self.order { Endian::Big => BigEndian::read_u32(b), Endian::Little => LittleEndian::read_u32(b) })
    }
    pub fn read_i32(&self, offset: u64) -> Result<i32> {
        Ok(self.read_u32(offset)? as i32)
    }
    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        let b = self.slice(offset, 8)?;
        Ok(match self.order { Endian::Big => BigEndian::read_u64(b), Endian::Little => LittleEndian::read_u64(b) })
    }
    pub fn read_urational(&self, offset: u64) -> Result<Rational<u32>> {
        Ok(Rational { num: self.read_u32(offset)?, den: self.read_u32(offset + 4)? })
    }
    pub fn read_srational(&self, offset: u64) -> Result<Rational<i32>> {
        Ok(Rational { num: self.read_i32(offset)?, den: self.read_i32(offset + 4)? })
    }

    /// Exactly `count` bytes or `OutOfBounds`, never a short read.
    pub fn read_bytes(&self, offset: u64, count: usize) -> Result<&'a [u8]> {
        self.slice(offset, count)
    }

    /// Scans forward from `offset` until a NUL terminator or `max_len` bytes.
    /// Reaching the end of the source before either bound is `OutOfBounds`.
    pub fn read_string(&self, offset: u64, max_len: usize) -> Result<String> {
        let avail = (self.len().saturating_sub(offset) as usize).min(max_len);
        let window = self.slice(offset, avail)?;
        match memchr::memchr(0, window) {
            Some(end) => Ok(String::from_utf8_lossy(&window[..end]).into_owned()),
            None if avail == max_len => Ok(String::from_utf8_lossy(window).into_owned()),
            None => Err(Error::OutOfBounds { offset, count: max_len, len: self.len() }),
        }
    }
}

/// Forward-only source. Reads consume the cursor; going backwards is refused
/// with `UnsupportedSeek`. Use `into_buffer` first when random access is needed.
pub struct StreamReader<R: Read> {
    inner: R,
    pos: u64,
    order: Endian,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R, order: Endian) -> Self {
        Self { inner, pos: 0, order }
    }
    pub fn position(&self) -> u64 {
        self.pos
    }
    pub fn order(&self) -> Endian {
        self.order
    }
    pub fn set_order(&mut self, order: Endian) {
        self.order = order;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.inner.read_u8()?;
        self.pos += 1;
        Ok(v)
    }
    pub fn read_u16(&mut self) -> Result<u16> {
        let v = match self.order {
            Endian::Big    => self.inner.read_u16::<BigEndian>()?,
            Endian::Little => self.inner.read_u16::<LittleEndian>()?,
        };
        self.pos += 2;
        Ok(v)
    }
    pub fn read_u32(&mut self) -> Result<u32> {
        let v = match self.order {
            Endian::Big    => self.inner.read_u32::<BigEndian>()?,
            Endian::Little => self.inner.read_u32::<LittleEndian>()?,
        };
        self.pos += 4;
        Ok(v)
    }
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.inner.read_exact(&mut buf)?;
        self.pos += count as u64;
        Ok(buf)
    }

    /// Moves the cursor forward to `offset`. Backwards is `UnsupportedSeek`.
    pub fn skip_to(&mut self, offset: u64) -> Result<()> {
        if offset < self.pos {
            return Err(Error::UnsupportedSeek { requested: offset, position: self.pos });
        }
        let skip = offset - self.pos;
        let copied = std::io::copy(&mut self.inner.by_ref().take(skip), &mut std::io::sink())?;
        self.pos += copied;
        if copied < skip {
            return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(())
    }

    /// Drains the remaining stream so the caller can build a `ByteReader` over it.
    pub fn into_buffer(mut self) -> Result<(Vec<u8>, Endian)> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok((buf, self.order))
    }
}
