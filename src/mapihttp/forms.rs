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

//! Field encodings usable in `wire_struct!` definitions.
//!
//! Each submodule has a `decode` and an `encode` function for one on-the-wire
//! representation of a Rust type. Several forms can map to the same Rust type
//! (e.g. `ascii` and `unicode` both produce `String`), which is why the form is
//! named explicitly in each field declaration rather than inferred.

macro_rules! form {
    ($(#[$meta:meta])* $name:ident: $ty:ty,
     |$d:ident| $decode:expr,
     |$w:ident, $v:ident| $encode:expr) => {
        $(#[$meta])*
        pub mod $name {
            #[allow(unused_imports)]
            use byteorder::{LittleEndian, WriteBytesExt};
            use std::io::{self, Write};

            #[allow(unused_imports)]
            use crate::mapihttp::wire::*;

            pub fn decode($d: &mut Decoder<'_>) -> Result<$ty, DecodeError> {
                $decode
            }

            #[allow(clippy::ptr_arg)]
            pub fn encode<W: Write>($w: &mut W, $v: &$ty) -> io::Result<()> {
                $encode
            }
        }
    };
}

form!(byte: u8, |d| d.u8(), |w, v| w.write_u8(*v));
form!(uint16: u16, |d| d.u16(), |w, v| w.write_u16::<LittleEndian>(*v));
form!(uint32: u32, |d| d.u32(), |w, v| w.write_u32::<LittleEndian>(*v));
form!(int32: i32, |d| d.i32(), |w, v| w.write_i32::<LittleEndian>(*v));
form!(
    /// A one-byte boolean; any nonzero value is true.
    boolean: bool,
    |d| d.u8().map(|b| 0 != b),
    |w, v| w.write_u8(*v as u8)
);
form!(
    /// NUL-terminated Windows-1252 string.
    ascii: String,
    |d| d.ascii_z(),
    |w, v| write_ascii_z(w, v)
);
form!(
    /// NUL-terminated UTF-16LE string.
    unicode: String,
    |d| d.unicode_z(),
    |w, v| write_unicode_z(w, v)
);
form!(
    /// 32-bit byte count followed by the bytes.
    binary: Vec<u8>,
    |d| d.counted_bytes(),
    |w, v| write_counted_bytes(w, v)
);
form!(
    /// `AuxiliaryBufferSize` followed by `AuxiliaryBuffer`.
    ///
    /// The size is never stored separately, so the buffer length always
    /// agrees with it.
    aux: Vec<u8>,
    |d| d.counted_bytes(),
    |w, v| write_counted_bytes(w, v)
);
form!(
    /// 32-bit count followed by that many 32-bit integers.
    uint32_array: Vec<u32>,
    |d| {
        let count = d.count(4)?;
        (0..count).map(|_| d.u32()).collect()
    },
    |w, v| {
        write_count(w, v.len())?;
        v.iter().try_for_each(|&n| w.write_u32::<LittleEndian>(n))
    }
);
form!(
    /// 32-bit count followed by NUL-terminated 8-bit strings.
    ascii_array: Vec<String>,
    |d| {
        let count = d.count(1)?;
        (0..count).map(|_| d.ascii_z()).collect()
    },
    |w, v| {
        write_count(w, v.len())?;
        v.iter().try_for_each(|s| write_ascii_z(w, s))
    }
);
form!(
    /// 32-bit count followed by NUL-terminated UTF-16LE strings.
    unicode_array: Vec<String>,
    |d| {
        let count = d.count(2)?;
        (0..count).map(|_| d.unicode_z()).collect()
    },
    |w, v| {
        write_count(w, v.len())?;
        v.iter().try_for_each(|s| write_unicode_z(w, s))
    }
);
form!(
    /// 32-bit count followed by that many counted byte arrays.
    binary_array: Vec<Vec<u8>>,
    |d| {
        let count = d.count(4)?;
        (0..count).map(|_| d.counted_bytes()).collect()
    },
    |w, v| {
        write_count(w, v.len())?;
        v.iter().try_for_each(|b| write_counted_bytes(w, b))
    }
);

/// Any type implementing `Wire`.
pub mod wire {
    use std::io::{self, Write};

    use crate::mapihttp::wire::{DecodeError, Decoder, Wire};

    pub fn decode<T: Wire>(d: &mut Decoder<'_>) -> Result<T, DecodeError> {
        T::decode(d)
    }

    pub fn encode<W: Write, T: Wire>(w: &mut W, v: &T) -> io::Result<()> {
        v.encode(w)
    }
}

/// 32-bit count followed by that many `Wire` values.
pub mod wire_array {
    use std::io::{self, Write};

    use crate::mapihttp::wire::{write_count, DecodeError, Decoder, Wire};

    pub fn decode<T: Wire>(d: &mut Decoder<'_>) -> Result<Vec<T>, DecodeError> {
        let count = d.count(1)?;
        (0..count).map(|_| T::decode(d)).collect()
    }

    #[allow(clippy::ptr_arg)]
    pub fn encode<W: Write, T: Wire>(w: &mut W, v: &Vec<T>) -> io::Result<()> {
        write_count(w, v.len())?;
        v.iter().try_for_each(|item| item.encode(w))
    }
}
