//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mapiprobe.
//
// Mapiprobe is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mapiprobe is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mapiprobe. If not, see <http://www.gnu.org/licenses/>.

//! Property types, tags, and the address book encoding of property values.
//!
//! The address book flavour of the MS-OXCDATA property value encoding uses
//! 32-bit counts everywhere, a one-byte boolean, and no length prefix on
//! strings (they are NUL-terminated).

use std::fmt;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::wire::*;

macro_rules! property_types {
    ($($variant:ident = $value:literal,)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum PropertyType {
            $($variant = $value,)*
        }

        impl PropertyType {
            pub fn from_u16(raw: u16) -> Option<Self> {
                match raw {
                    $($value => Some(PropertyType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

property_types! {
    Unspecified = 0x0000,
    Null = 0x0001,
    Integer16 = 0x0002,
    Integer32 = 0x0003,
    Floating32 = 0x0004,
    Floating64 = 0x0005,
    Currency = 0x0006,
    FloatingTime = 0x0007,
    ErrorCode = 0x000A,
    Boolean = 0x000B,
    Integer64 = 0x0014,
    String8 = 0x001E,
    String = 0x001F,
    Time = 0x0040,
    Guid = 0x0048,
    Binary = 0x0102,
    MultipleInteger16 = 0x1002,
    MultipleInteger32 = 0x1003,
    MultipleFloating32 = 0x1004,
    MultipleFloating64 = 0x1005,
    MultipleCurrency = 0x1006,
    MultipleFloatingTime = 0x1007,
    MultipleInteger64 = 0x1014,
    MultipleString8 = 0x101E,
    MultipleString = 0x101F,
    MultipleTime = 0x1040,
    MultipleGuid = 0x1048,
    MultipleBinary = 0x1102,
}

impl PropertyType {
    /// Whether values of this type are preceded by a `HasValue` byte in
    /// address book encodings.
    pub fn has_value_discriminator(self) -> bool {
        match self {
            PropertyType::String8
            | PropertyType::String
            | PropertyType::Binary => true,
            other => other.is_multiple(),
        }
    }

    pub fn is_multiple(self) -> bool {
        0 != (self as u16) & 0x1000
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let raw = d.u16()?;
        PropertyType::from_u16(raw)
            .ok_or(DecodeError::UnsupportedPropertyType(raw))
    }

    pub fn encode<W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self as u16)
    }
}

/// A property tag: the property type in the low 16 bits and the property ID
/// in the high 16 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyTag {
    pub property_type: PropertyType,
    pub property_id: u16,
}

impl PropertyTag {
    pub const fn new(property_id: u16, property_type: PropertyType) -> Self {
        PropertyTag {
            property_type,
            property_id,
        }
    }

    pub fn from_u32(raw: u32) -> Result<Self, DecodeError> {
        let raw_type = (raw & 0xFFFF) as u16;
        Ok(PropertyTag {
            property_type: PropertyType::from_u16(raw_type)
                .ok_or(DecodeError::UnsupportedPropertyType(raw_type))?,
            property_id: (raw >> 16) as u16,
        })
    }

    pub fn as_u32(self) -> u32 {
        (u32::from(self.property_id) << 16) | (self.property_type as u32)
    }

    pub const DISPLAY_NAME: Self = Self::new(0x3001, PropertyType::String);
    pub const DISPLAY_NAME_STRING8: Self =
        Self::new(0x3001, PropertyType::String8);
    pub const EMAIL_ADDRESS: Self = Self::new(0x3003, PropertyType::String);
    pub const ENTRY_ID: Self = Self::new(0x0FFF, PropertyType::Binary);
    pub const OBJECT_TYPE: Self = Self::new(0x0FFE, PropertyType::Integer32);
    pub const DISPLAY_TYPE: Self = Self::new(0x3900, PropertyType::Integer32);
    pub const SMTP_ADDRESS: Self = Self::new(0x39FE, PropertyType::String);
    pub const ACCOUNT: Self = Self::new(0x3A00, PropertyType::String);
    pub const INSTANCE_KEY: Self = Self::new(0x0FF6, PropertyType::Binary);
    pub const CONTAINER_FLAGS: Self =
        Self::new(0x3600, PropertyType::Integer32);
    pub const DEPTH: Self = Self::new(0x3005, PropertyType::Integer32);
    pub const ADDRESS_BOOK_CONTAINER_ID: Self =
        Self::new(0xFFFD, PropertyType::Integer32);
    pub const ADDRESS_BOOK_MEMBER: Self =
        Self::new(0x8009, PropertyType::Binary);
}

impl fmt::Debug for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:08X}({:?})", self.as_u32(), self.property_type)
    }
}

impl Wire for PropertyTag {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let property_type = PropertyType::decode(d)?;
        let property_id = d.u16()?;
        Ok(PropertyTag {
            property_type,
            property_id,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.property_type.encode(w)?;
        w.write_u16::<LittleEndian>(self.property_id)
    }
}

/// The largest `PropertyTagCount` a `LargePropertyTagArray` may carry.
pub const MAX_PROPERTY_TAGS: u32 = 100_000;

/// A 32-bit count of property tags followed by the tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LargePropertyTagArray(pub Vec<PropertyTag>);

impl Wire for LargePropertyTagArray {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let offset = d.position();
        let count = d.u32()?;
        if count > MAX_PROPERTY_TAGS {
            return Err(DecodeError::TooManyPropertyTags(count));
        }
        if count as usize * 4 > d.remaining() {
            return Err(DecodeError::Truncated {
                offset,
                needed: count as usize * 4 - d.remaining(),
            });
        }

        (0..count)
            .map(|_| PropertyTag::decode(d))
            .collect::<Result<Vec<_>, _>>()
            .map(LargePropertyTagArray)
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.0.len() > MAX_PROPERTY_TAGS as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} property tags exceeds the limit", self.0.len()),
            ));
        }

        write_count(w, self.0.len())?;
        self.0.iter().try_for_each(|tag| tag.encode(w))
    }
}

/// A decoded property value.
///
/// `Time` values are FILETIMEs (100ns intervals since 1601-01-01).
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Null,
    Integer16(i16),
    Integer32(i32),
    Floating32(f32),
    Floating64(f64),
    Currency(i64),
    FloatingTime(f64),
    ErrorCode(u32),
    Boolean(bool),
    Integer64(i64),
    String8(String),
    String(String),
    Time(u64),
    Guid(Guid),
    Binary(Vec<u8>),
    MultipleInteger16(Vec<i16>),
    MultipleInteger32(Vec<i32>),
    MultipleFloating32(Vec<f32>),
    MultipleFloating64(Vec<f64>),
    MultipleCurrency(Vec<i64>),
    MultipleFloatingTime(Vec<f64>),
    MultipleInteger64(Vec<i64>),
    MultipleString8(Vec<String>),
    MultipleString(Vec<String>),
    MultipleTime(Vec<u64>),
    MultipleGuid(Vec<Guid>),
    MultipleBinary(Vec<Vec<u8>>),
}

fn multiple<'a, T>(
    d: &mut Decoder<'a>,
    min_element_size: usize,
    mut read: impl FnMut(&mut Decoder<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let count = d.count(min_element_size)?;
    (0..count).map(|_| read(d)).collect()
}

fn write_multiple<W: Write, T>(
    w: &mut W,
    values: &[T],
    mut write: impl FnMut(&mut W, &T) -> io::Result<()>,
) -> io::Result<()> {
    write_count(w, values.len())?;
    values.iter().try_for_each(|v| write(w, v))
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        use self::PropertyValue as V;
        use self::PropertyType as T;

        match *self {
            V::Null => T::Null,
            V::Integer16(..) => T::Integer16,
            V::Integer32(..) => T::Integer32,
            V::Floating32(..) => T::Floating32,
            V::Floating64(..) => T::Floating64,
            V::Currency(..) => T::Currency,
            V::FloatingTime(..) => T::FloatingTime,
            V::ErrorCode(..) => T::ErrorCode,
            V::Boolean(..) => T::Boolean,
            V::Integer64(..) => T::Integer64,
            V::String8(..) => T::String8,
            V::String(..) => T::String,
            V::Time(..) => T::Time,
            V::Guid(..) => T::Guid,
            V::Binary(..) => T::Binary,
            V::MultipleInteger16(..) => T::MultipleInteger16,
            V::MultipleInteger32(..) => T::MultipleInteger32,
            V::MultipleFloating32(..) => T::MultipleFloating32,
            V::MultipleFloating64(..) => T::MultipleFloating64,
            V::MultipleCurrency(..) => T::MultipleCurrency,
            V::MultipleFloatingTime(..) => T::MultipleFloatingTime,
            V::MultipleInteger64(..) => T::MultipleInteger64,
            V::MultipleString8(..) => T::MultipleString8,
            V::MultipleString(..) => T::MultipleString,
            V::MultipleTime(..) => T::MultipleTime,
            V::MultipleGuid(..) => T::MultipleGuid,
            V::MultipleBinary(..) => T::MultipleBinary,
        }
    }

    /// Decode the bare value of `property_type`, without any `HasValue`
    /// discriminator.
    pub fn decode(
        d: &mut Decoder<'_>,
        property_type: PropertyType,
    ) -> Result<Self, DecodeError> {
        use self::PropertyValue as V;
        use self::PropertyType as T;

        Ok(match property_type {
            T::Unspecified => {
                return Err(DecodeError::UnsupportedPropertyType(
                    T::Unspecified as u16,
                ))
            }
            T::Null => V::Null,
            T::Integer16 => V::Integer16(d.i16()?),
            T::Integer32 => V::Integer32(d.i32()?),
            T::Floating32 => V::Floating32(d.f32()?),
            T::Floating64 => V::Floating64(d.f64()?),
            T::Currency => V::Currency(d.i64()?),
            T::FloatingTime => V::FloatingTime(d.f64()?),
            T::ErrorCode => V::ErrorCode(d.u32()?),
            T::Boolean => V::Boolean(0 != d.u8()?),
            T::Integer64 => V::Integer64(d.i64()?),
            T::String8 => V::String8(d.ascii_z()?),
            T::String => V::String(d.unicode_z()?),
            T::Time => V::Time(d.u64()?),
            T::Guid => V::Guid(d.guid()?),
            T::Binary => V::Binary(d.counted_bytes()?),
            T::MultipleInteger16 => {
                V::MultipleInteger16(multiple(d, 2, |d| d.i16())?)
            }
            T::MultipleInteger32 => {
                V::MultipleInteger32(multiple(d, 4, |d| d.i32())?)
            }
            T::MultipleFloating32 => {
                V::MultipleFloating32(multiple(d, 4, |d| d.f32())?)
            }
            T::MultipleFloating64 => {
                V::MultipleFloating64(multiple(d, 8, |d| d.f64())?)
            }
            T::MultipleCurrency => {
                V::MultipleCurrency(multiple(d, 8, |d| d.i64())?)
            }
            T::MultipleFloatingTime => {
                V::MultipleFloatingTime(multiple(d, 8, |d| d.f64())?)
            }
            T::MultipleInteger64 => {
                V::MultipleInteger64(multiple(d, 8, |d| d.i64())?)
            }
            T::MultipleString8 => {
                V::MultipleString8(multiple(d, 1, |d| d.ascii_z())?)
            }
            T::MultipleString => {
                V::MultipleString(multiple(d, 2, |d| d.unicode_z())?)
            }
            T::MultipleTime => V::MultipleTime(multiple(d, 8, |d| d.u64())?),
            T::MultipleGuid => V::MultipleGuid(multiple(d, 16, |d| d.guid())?),
            T::MultipleBinary => {
                V::MultipleBinary(multiple(d, 4, |d| d.counted_bytes())?)
            }
        })
    }

    /// Encode the bare value, without any type prefix or `HasValue`
    /// discriminator.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        use self::PropertyValue as V;
        type E = LittleEndian;

        match *self {
            V::Null => Ok(()),
            V::Integer16(v) => w.write_i16::<E>(v),
            V::Integer32(v) => w.write_i32::<E>(v),
            V::Floating32(v) => w.write_f32::<E>(v),
            V::Floating64(v) | V::FloatingTime(v) => w.write_f64::<E>(v),
            V::Currency(v) | V::Integer64(v) => w.write_i64::<E>(v),
            V::ErrorCode(v) => w.write_u32::<E>(v),
            V::Boolean(v) => w.write_u8(v as u8),
            V::String8(ref v) => write_ascii_z(w, v),
            V::String(ref v) => write_unicode_z(w, v),
            V::Time(v) => w.write_u64::<E>(v),
            V::Guid(ref v) => v.encode(w),
            V::Binary(ref v) => write_counted_bytes(w, v),
            V::MultipleInteger16(ref v) => {
                write_multiple(w, v, |w, &n| w.write_i16::<E>(n))
            }
            V::MultipleInteger32(ref v) => {
                write_multiple(w, v, |w, &n| w.write_i32::<E>(n))
            }
            V::MultipleFloating32(ref v) => {
                write_multiple(w, v, |w, &n| w.write_f32::<E>(n))
            }
            V::MultipleFloating64(ref v) | V::MultipleFloatingTime(ref v) => {
                write_multiple(w, v, |w, &n| w.write_f64::<E>(n))
            }
            V::MultipleCurrency(ref v) | V::MultipleInteger64(ref v) => {
                write_multiple(w, v, |w, &n| w.write_i64::<E>(n))
            }
            V::MultipleString8(ref v) => {
                write_multiple(w, v, |w, s| write_ascii_z(w, s))
            }
            V::MultipleString(ref v) => {
                write_multiple(w, v, |w, s| write_unicode_z(w, s))
            }
            V::MultipleTime(ref v) => {
                write_multiple(w, v, |w, &n| w.write_u64::<E>(n))
            }
            V::MultipleGuid(ref v) => write_multiple(w, v, |w, g| g.encode(w)),
            V::MultipleBinary(ref v) => {
                write_multiple(w, v, |w, b| write_counted_bytes(w, b))
            }
        }
    }

    /// The value as text, for display purposes.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            PropertyValue::String8(ref s) | PropertyValue::String(ref s) => {
                Some(s)
            }
            _ => None,
        }
    }
}
