// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use memchr::memmem;

pub fn to_hex(data: &[u8]) -> String {
    let mut ret = String::with_capacity(data.len() * 3);
    for b in data {
        ret.push_str(&format!("{:02x} ", b));
    }
    ret
}

/// Locates the TIFF header of an Exif block inside a larger buffer.
/// JPEG APP1 segments carry `Exif\0\0` immediately before it.
pub fn find_exif_block(buffer: &[u8]) -> Option<usize> {
    memmem::find(buffer, b"Exif\0\0").map(|pos| pos + 6)
}
