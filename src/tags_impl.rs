// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2025 Adrian <adrian.eddy at gmail>

use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::*;

macro_rules! declare_groups {
    ($($field:ident => $name:literal),*,) => {
        /// Identifies which tag namespace a directory belongs to.
        #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
        pub enum GroupId {
            $($field,)*
            Custom(String),
        }
        impl Serialize for GroupId {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
                match self {
                    GroupId::Custom(x)  => s.serialize_str(x),
                    $(GroupId::$field   => s.serialize_str($name),)*
                }
            }
        }
        impl std::fmt::Display for GroupId {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    GroupId::Custom(x)  => f.write_str(x),
                    $(GroupId::$field   => f.write_str($name),)*
                }
            }
        }
        impl std::str::FromStr for GroupId {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $($name => GroupId::$field,)*
                    _ => GroupId::Custom(s.to_string())
                })
            }
        }
    }
}

declare_groups! {
    Ifd0           => "Exif IFD0",
    Thumbnail      => "Exif Thumbnail",
    ExifSubIfd     => "Exif SubIFD",
    GpsIfd         => "GPS",
    Interop        => "Interoperability",
    SubIfd         => "Sub IFD",
    MakerOlympus   => "Maker Note: Olympus",
    MakerNikon     => "Maker Note: Nikon",
    MakerCanon     => "Maker Note: Canon",
    MakerFujifilm  => "Maker Note: Fujifilm",
    MakerPanasonic => "Maker Note: Panasonic",
    MakerSony      => "Maker Note: Sony",
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Rational<T> {
    pub num: T,
    pub den: T,
}
impl<T: Copy + Into<f64>> Rational<T> {
    pub fn to_f64(&self) -> Option<f64> {
        let den: f64 = self.den.into();
        if den == 0.0 {
            return None;
        }
        Some(self.num.into() / den)
    }
}
impl<T: std::fmt::Display> std::fmt::Display for Rational<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

macro_rules! declare_types {
    ($($field:ident : $type:ty),*,) => {
        #[allow(non_camel_case_types)]
        #[derive(Clone)]
        pub enum TagValue {
            $($field(ValueType<$type>),)*
            Unknown(ValueType<()>),
        }
        impl ToString for TagValue {
            fn to_string(&self) -> String {
                match &self {
                    $(TagValue::$field(t) => (t.format_fn)(t.get()),)*
                    TagValue::Unknown(t) => format!("{} bytes: {}", t.raw_data.len(), crate::util::to_hex(&t.raw_data[..t.raw_data.len().min(64)])),
                }
            }
        }
        impl Serialize for TagValue {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
                match &self {
                    $(TagValue::$field(t) => serde::Serialize::serialize(t.get(), s),)*
                    TagValue::Unknown(t) => s.serialize_bytes(&t.raw_data),
                }
            }
        }
        impl TagValue {
            /// The undecoded payload bytes this value was built from.
            pub fn raw_bytes(&self) -> &[u8] {
                match &self {
                    $(TagValue::$field(t) => &t.raw_data,)*
                    TagValue::Unknown(t) => &t.raw_data,
                }
            }
        }
        pub trait GetWithType<T> { fn get_t(&self, id: u16) -> Option<&T>; }
        $(
            impl GetWithType<$type> for Directory {
                fn get_t(&self, id: u16) -> Option<&$type> {
                    if let Some(tag) = self.tags.get(&id) {
                        if let TagValue::$field(v) = &tag.value {
                            return Some(v.get());
                        }
                    }
                    None
                }
            }
        )*
        impl std::fmt::Debug for TagValue {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match &self {
                    $(TagValue::$field(t) => f.write_fmt(format_args!("TagValue(\n\tType: {}\n\tValue: {:?}\n\tFormatted value: {}\n)", stringify!($field), &t.get(), self.to_string())),)*
                    TagValue::Unknown(_)  => f.write_fmt(format_args!("TagValue(\n\tType: Unknown\n\tValue: {}\n)", self.to_string()))
                }
            }
        }
    };
}

declare_types! {
    u8:  u8,
    u16: u16,
    u32: u32,
    i8:  i8,
    i16: i16,
    i32: i32,
    f32: f32,
    f64: f64,
    Vec_u8:  Vec<u8>,
    Vec_u16: Vec<u16>,
    Vec_u32: Vec<u32>,
    Vec_i8:  Vec<i8>,
    Vec_i16: Vec<i16>,
    Vec_i32: Vec<i32>,
    Vec_f32: Vec<f32>,
    Vec_f64: Vec<f64>,
    URational: Rational<u32>,
    SRational: Rational<i32>,
    Vec_URational: Vec<Rational<u32>>,
    Vec_SRational: Vec<Rational<i32>>,
    String: String,
}

type ParseFn<T> = fn(&mut std::io::Cursor<&[u8]>) -> std::io::Result<T>;

#[derive(Clone)]
pub struct ValueType<T> {
    parse_fn: Option<ParseFn<T>>,
    format_fn: fn(&T) -> String,
    parsed_value: OnceCell<T>,
    pub raw_data: Vec<u8>
}
impl<T> ValueType<T> {
    pub fn new(parse_fn: ParseFn<T>, format_fn: fn(&T) -> String, raw_data: Vec<u8>) -> ValueType<T> {
        ValueType {
            parse_fn: Some(parse_fn),
            format_fn,
            raw_data,
            parsed_value: OnceCell::new()
        }
    }
    pub fn new_parsed(format_fn: fn(&T) -> String, parsed_value: T, raw_data: Vec<u8>) -> ValueType<T> {
        let v = OnceCell::new();
        let _ = v.set(parsed_value);
        ValueType {
            parse_fn: None,
            format_fn,
            raw_data,
            parsed_value: v
        }
    }
    pub fn get(&self) -> &T {
        self.parsed_value.get_or_init(|| {
            let mut tag_slice = std::io::Cursor::new(&self.raw_data[..]);
            (self.parse_fn.expect("value not parsed"))(&mut tag_slice).unwrap()
        })
    }
}

/// One decoded directory entry.
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: u16,
    pub type_code: u16,
    pub value: TagValue,
}

/// One parsed directory: tag id → value, plus the errors hit while parsing it.
/// Entries that could not be resolved in-bounds are absent, never truncated.
pub struct Directory {
    kind: GroupId,
    offset: u64,
    parent: Option<usize>,
    tags: BTreeMap<u16, Tag>,
    errors: Vec<(Option<u16>, String)>,
}

impl Directory {
    pub fn new(kind: GroupId, offset: u64, parent: Option<usize>) -> Self {
        Self { kind, offset, parent, tags: BTreeMap::new(), errors: Vec::new() }
    }
    pub fn kind(&self) -> &GroupId {
        &self.kind
    }
    /// Absolute offset in the byte source where this directory was found.
    pub fn offset(&self) -> u64 {
        self.offset
    }
    /// Index of the directory whose pointer tag led here, within the owning `Metadata`.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
    /// Duplicate ids inside one directory resolve last-wins.
    pub fn set_tag(&mut self, tag: Tag) {
        self.tags.insert(tag.id, tag);
    }
    pub fn tag(&self, id: u16) -> Option<&Tag> {
        self.tags.get(&id)
    }
    pub fn get(&self, id: u16) -> Option<&TagValue> {
        self.tags.get(&id).map(|t| &t.value)
    }
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
    pub fn add_error(&mut self, id: Option<u16>, message: impl Into<String>) {
        self.errors.push((id, message.into()));
    }
    pub fn errors(&self) -> &[(Option<u16>, String)] {
        &self.errors
    }
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    // Best-effort coercions. A miss is absent, never a new error.

    pub fn get_u32(&self, id: u16) -> Option<u32> {
        macro_rules! first_of { ($t:expr) => {{ let v = $t.get(); if v.len() == 1 { Some(v[0]) } else { None } }} }
        match self.get(id)? {
            TagValue::u8(t)  => Some(*t.get() as u32),
            TagValue::u16(t) => Some(*t.get() as u32),
            TagValue::u32(t) => Some(*t.get()),
            TagValue::i8(t)  => u32::try_from(*t.get() as i64).ok(),
            TagValue::i16(t) => u32::try_from(*t.get() as i64).ok(),
            TagValue::i32(t) => u32::try_from(*t.get() as i64).ok(),
            TagValue::f32(t) => { let v = *t.get(); (v >= 0.0).then(|| v as u32) },
            TagValue::f64(t) => { let v = *t.get(); (v >= 0.0).then(|| v as u32) },
            TagValue::URational(t) => t.get().to_f64().map(|v| v as u32),
            TagValue::Vec_u8(t)  => first_of!(t).map(|v| v as u32),
            TagValue::Vec_u16(t) => first_of!(t).map(|v| v as u32),
            TagValue::Vec_u32(t) => first_of!(t),
            TagValue::Vec_i16(t) => first_of!(t).and_then(|v| u32::try_from(v as i64).ok()),
            TagValue::Vec_i32(t) => first_of!(t).and_then(|v| u32::try_from(v as i64).ok()),
            TagValue::String(t)  => t.get().trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_f64(&self, id: u16) -> Option<f64> {
        macro_rules! first_of { ($t:expr) => {{ let v = $t.get(); if v.len() == 1 { Some(v[0]) } else { None } }} }
        match self.get(id)? {
            TagValue::u8(t)  => Some(*t.get() as f64),
            TagValue::u16(t) => Some(*t.get() as f64),
            TagValue::u32(t) => Some(*t.get() as f64),
            TagValue::i8(t)  => Some(*t.get() as f64),
            TagValue::i16(t) => Some(*t.get() as f64),
            TagValue::i32(t) => Some(*t.get() as f64),
            TagValue::f32(t) => Some(*t.get() as f64),
            TagValue::f64(t) => Some(*t.get()),
            TagValue::URational(t) => t.get().to_f64(),
            TagValue::SRational(t) => t.get().to_f64(),
            TagValue::Vec_f32(t) => first_of!(t).map(|v| v as f64),
            TagValue::Vec_f64(t) => first_of!(t),
            TagValue::Vec_u16(t) => first_of!(t).map(|v| v as f64),
            TagValue::Vec_u32(t) => first_of!(t).map(|v| v as f64),
            TagValue::Vec_URational(t) => first_of!(t).and_then(|v| v.to_f64()),
            TagValue::Vec_SRational(t) => first_of!(t).and_then(|v| v.to_f64()),
            TagValue::String(t)  => t.get().trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_string(&self, id: u16) -> Option<String> {
        match self.get(id)? {
            TagValue::Unknown(_) => None,
            v => Some(v.to_string()),
        }
    }

    pub fn get_urational(&self, id: u16) -> Option<Rational<u32>> {
        match self.get(id)? {
            TagValue::URational(t) => Some(*t.get()),
            TagValue::Vec_URational(t) => { let v = t.get(); if v.len() == 1 { Some(v[0]) } else { None } },
            TagValue::u8(t)  => Some(Rational { num: *t.get() as u32, den: 1 }),
            TagValue::u16(t) => Some(Rational { num: *t.get() as u32, den: 1 }),
            TagValue::u32(t) => Some(Rational { num: *t.get(), den: 1 }),
            _ => None,
        }
    }

    pub fn get_u32_array(&self, id: u16) -> Option<Vec<u32>> {
        match self.get(id)? {
            TagValue::Vec_u8(t)  => Some(t.get().iter().map(|&v| v as u32).collect()),
            TagValue::Vec_u16(t) => Some(t.get().iter().map(|&v| v as u32).collect()),
            TagValue::Vec_u32(t) => Some(t.get().clone()),
            TagValue::u8(t)  => Some(vec![*t.get() as u32]),
            TagValue::u16(t) => Some(vec![*t.get() as u32]),
            TagValue::u32(t) => Some(vec![*t.get()]),
            _ => None,
        }
    }

    pub fn get_bytes(&self, id: u16) -> Option<&[u8]> {
        match self.get(id)? {
            TagValue::Unknown(t) => Some(&t.raw_data),
            TagValue::Vec_u8(t)  => Some(t.get().as_slice()),
            _ => None,
        }
    }

    /// Exif date strings are "YYYY:MM:DD HH:MM:SS".
    pub fn get_date(&self, id: u16) -> Option<chrono::NaiveDateTime> {
        let s = match self.get(id)? {
            TagValue::String(t) => t.get().clone(),
            _ => return None,
        };
        let s = s.trim();
        chrono::NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S").ok()
            .or_else(|| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
    }
}

impl Serialize for Directory {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
        use serde::ser::{ SerializeMap, SerializeStruct };

        struct SerTags<'a>(&'a BTreeMap<u16, Tag>);
        impl Serialize for SerTags<'_> {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
                let mut m = s.serialize_map(Some(self.0.len()))?;
                for (id, tag) in self.0 {
                    m.serialize_entry(&format!("0x{id:04x}"), &tag.value)?;
                }
                m.end()
            }
        }

        let mut st = s.serialize_struct("Directory", 3)?;
        st.serialize_field("kind", &self.kind)?;
        st.serialize_field("tags", &SerTags(&self.tags))?;
        st.serialize_field("errors", &self.errors)?;
        st.end()
    }
}

/// All directories produced by one parse, in discovery order.
/// Directories are appended during traversal and referenced by index, so
/// parent links stay valid as the collection grows.
#[derive(Default, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    directories: Vec<Directory>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_directory(&mut self, dir: Directory) -> usize {
        self.directories.push(dir);
        self.directories.len() - 1
    }
    pub fn len(&self) -> usize {
        self.directories.len()
    }
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&Directory> {
        self.directories.get(index)
    }
    pub(crate) fn dir_mut(&mut self, index: usize) -> &mut Directory {
        &mut self.directories[index]
    }
    /// Late-discovered errors (cross-reference checks) may still be appended
    /// after a directory is sealed.
    pub fn add_error(&mut self, index: usize, id: Option<u16>, message: impl Into<String>) {
        if let Some(d) = self.directories.get_mut(index) {
            d.add_error(id, message);
        }
    }
    pub fn directories(&self) -> impl Iterator<Item = &Directory> {
        self.directories.iter()
    }
    pub fn directories_of_kind<'a, 'b>(&'a self, kind: &'b GroupId) -> impl Iterator<Item = &'a Directory> {
        self.directories.iter().filter(move |d| d.kind() == kind)
    }
    pub fn first_of_kind(&self, kind: &GroupId) -> Option<&Directory> {
        self.directories_of_kind(kind).next()
    }
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &Directory> {
        self.directories.iter().filter(move |d| d.parent() == Some(index))
    }
    pub fn has_errors(&self) -> bool {
        self.directories.iter().any(|d| d.has_errors())
    }
}
