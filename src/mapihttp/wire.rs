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

//! Primitive little-endian codec shared by every MAPI/HTTP body.
//!
//! All integers on the wire are little-endian. Strings come in two flavours:
//! 8-bit strings terminated by a single NUL byte (interpreted with the
//! Windows-1252 code page) and UTF-16LE strings terminated by a NUL code unit.
//! Byte arrays and most arrays are prefixed with a 32-bit element count.
//!
//! Optional fields are always preceded by a one-byte `Has*` flag. Any nonzero
//! flag means the field is present; we always write `0x01` for presence.

use std::fmt;
use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::WINDOWS_1252;
use thiserror::Error;

use super::request_type::RequestType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated data at offset {offset}: {needed} more byte(s) needed")]
    Truncated { offset: usize, needed: usize },
    #[error("String starting at offset {0} has no terminator")]
    MissingTerminator(usize),
    #[error("String starting at offset {0} is not valid UTF-16")]
    BadUtf16(usize),
    #[error("Invalid HasValue discriminator 0x{0:02X}")]
    BadHasValue(u8),
    #[error("Invalid flagged property value flag 0x{0:02X}")]
    BadPropertyFlag(u8),
    #[error("Property tag count {0} exceeds the limit of 100000")]
    TooManyPropertyTags(u32),
    #[error("Unsupported property type 0x{0:04X}")]
    UnsupportedPropertyType(u16),
    #[error("Unsupported restriction type 0x{0:02X}")]
    UnsupportedRestriction(u8),
    #[error("Invalid relational operator 0x{0:02X}")]
    BadRelop(u8),
    #[error("Restriction nested too deeply")]
    RestrictionTooDeep,
    #[error("Element count {count} cannot fit in the {remaining} remaining bytes")]
    ImpossibleCount { count: u32, remaining: usize },
    #[error("{0} unexpected byte(s) after end of body")]
    TrailingBytes(usize),
    #[error("Expected a meta-tag, got {0:?}")]
    BadMetaTag(String),
    #[error("Meta-tag stream ended without DONE")]
    MissingDone,
    #[error("Malformed additional header line {0:?}")]
    BadAdditionalHeader(String),
    #[error("Malformed {name} header: {value:?}")]
    BadHeader { name: &'static str, value: String },
    #[error("{request_type} body is {actual} bytes, at least {min} required")]
    BodyTooShort {
        request_type: RequestType,
        min: usize,
        actual: usize,
    },
    #[error("Success body parser given nonzero StatusCode {0}")]
    UnexpectedStatus(u32),
    #[error("{0} response carries an unexpected {1}-byte body")]
    UnexpectedBody(RequestType, usize),
    #[error("Compressed extended buffers are not supported")]
    CompressedBuffer,
    #[error("Malformed extended buffer: {0}")]
    BadExtendedBuffer(&'static str),
}

/// Reads primitives out of a borrowed buffer, tracking the offset for error
/// reporting.
///
/// A failed read never consumes anything.
pub struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        0 == self.remaining()
    }

    fn need(&self, n: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if remaining < n {
            Err(DecodeError::Truncated {
                offset: self.position(),
                needed: n - remaining,
            })
        } else {
            Ok(())
        }
    }

    fn fixed<T>(
        &mut self,
        n: usize,
        read: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> Result<T, DecodeError> {
        self.need(n)?;
        let offset = self.position();
        read(&mut self.cursor)
            .map_err(|_| DecodeError::Truncated { offset, needed: n })
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        self.fixed(1, |c| c.read_u8())
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        self.fixed(2, |c| c.read_u16::<LittleEndian>())
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        self.fixed(2, |c| c.read_i16::<LittleEndian>())
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.fixed(4, |c| c.read_u32::<LittleEndian>())
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.fixed(4, |c| c.read_i32::<LittleEndian>())
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        self.fixed(8, |c| c.read_u64::<LittleEndian>())
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        self.fixed(8, |c| c.read_i64::<LittleEndian>())
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        self.fixed(4, |c| c.read_f32::<LittleEndian>())
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        self.fixed(8, |c| c.read_f64::<LittleEndian>())
    }

    /// Borrow the next `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.need(n)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + n) as u64);
        Ok(&data[start..start + n])
    }

    fn rest(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.cursor.get_ref();
        &data[self.position()..]
    }

    pub fn guid(&mut self) -> Result<Guid, DecodeError> {
        let mut g = [0u8; 16];
        g.copy_from_slice(self.bytes(16)?);
        Ok(Guid(g))
    }

    /// Read a 32-bit element count, verifying that `count` elements of at
    /// least `min_element_size` bytes each could still follow.
    pub fn count(
        &mut self,
        min_element_size: usize,
    ) -> Result<usize, DecodeError> {
        let count = self.u32()?;
        let remaining = self.remaining();
        if (count as u64) * (min_element_size as u64) > remaining as u64 {
            return Err(DecodeError::ImpossibleCount { count, remaining });
        }

        Ok(count as usize)
    }

    /// Read a 32-bit byte count followed by that many bytes.
    pub fn counted_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let offset = self.position();
        let len = self.u32()? as usize;
        self.bytes(len).map(<[u8]>::to_vec).map_err(|e| match e {
            DecodeError::Truncated { needed, .. } => {
                DecodeError::Truncated { offset, needed }
            }
            e => e,
        })
    }

    /// Read a NUL-terminated 8-bit string.
    pub fn ascii_z(&mut self) -> Result<String, DecodeError> {
        let start = self.position();
        let rest = self.rest();
        let end = memchr::memchr(0, rest)
            .ok_or(DecodeError::MissingTerminator(start))?;
        let raw = self.bytes(end + 1)?;
        let (text, _) =
            WINDOWS_1252.decode_without_bom_handling(&raw[..end]);
        Ok(text.into_owned())
    }

    /// Read a NUL-terminated UTF-16LE string.
    pub fn unicode_z(&mut self) -> Result<String, DecodeError> {
        let start = self.position();
        let rest = self.rest();
        let end = rest
            .chunks_exact(2)
            .position(|unit| unit[0] == 0 && unit[1] == 0)
            .ok_or(DecodeError::MissingTerminator(start))?;
        let raw = self.bytes(end * 2 + 2)?;
        let units = raw[..end * 2]
            .chunks_exact(2)
            .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
            .collect::<Vec<_>>();
        String::from_utf16(&units).map_err(|_| DecodeError::BadUtf16(start))
    }

    /// Fail unless the whole input has been consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

fn invalid_input(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Write a 32-bit count, failing if `len` does not fit.
pub fn write_count<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    if len > u32::MAX as usize {
        return Err(invalid_input(format!("Count {} too large", len)));
    }

    w.write_u32::<LittleEndian>(len as u32)
}

pub fn write_counted_bytes<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    write_count(w, data.len())?;
    w.write_all(data)
}

pub fn write_ascii_z<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    if s.contains('\0') {
        return Err(invalid_input(format!("NUL in string {:?}", s)));
    }

    let (encoded, _, unmappable) = WINDOWS_1252.encode(s);
    if unmappable {
        return Err(invalid_input(format!(
            "{:?} cannot be represented in Windows-1252",
            s
        )));
    }

    w.write_all(&encoded)?;
    w.write_u8(0)
}

pub fn write_unicode_z<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    if s.contains('\0') {
        return Err(invalid_input(format!("NUL in string {:?}", s)));
    }

    for unit in s.encode_utf16() {
        w.write_u16::<LittleEndian>(unit)?;
    }
    w.write_u16::<LittleEndian>(0)
}

/// A type with a self-contained wire representation.
pub trait Wire: Sized {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError>;
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

/// Read a `Has*` flag and, if it is nonzero, the value it gates.
pub fn read_optional<'a, T>(
    d: &mut Decoder<'a>,
    read: impl FnOnce(&mut Decoder<'a>) -> Result<T, DecodeError>,
) -> Result<Option<T>, DecodeError> {
    if 0 != d.u8()? {
        read(d).map(Some)
    } else {
        Ok(None)
    }
}

/// Write the `Has*` flag for `value` and, if present, the value itself.
pub fn write_optional<W: Write, T: ?Sized>(
    w: &mut W,
    value: Option<&T>,
    write: impl FnOnce(&mut W, &T) -> io::Result<()>,
) -> io::Result<()> {
    match value {
        Some(value) => {
            w.write_u8(1)?;
            write(w, value)
        }
        None => w.write_u8(0),
    }
}

/// A GUID in its on-the-wire (mixed-endian) byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Generate a random (version 4) GUID.
    pub fn random() -> Self {
        let mut g: [u8; 16] = rand::random();
        // Data3 is little-endian, so its high nybble lives in byte 7
        g[7] = (g[7] & 0x0F) | 0x40;
        g[8] = (g[8] & 0x3F) | 0x80;
        Guid(g)
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let g = &self.0;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-",
            u32::from_le_bytes([g[0], g[1], g[2], g[3]]),
            u16::from_le_bytes([g[4], g[5]]),
            u16::from_le_bytes([g[6], g[7]]),
        )?;
        for b in &g[8..10] {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "-")?;
        for b in &g[10..] {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Wire for Guid {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        d.guid()
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.0)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF];
        let mut d = Decoder::new(&data);
        assert_eq!(0x0201, d.u16().unwrap());
        assert_eq!(2, d.position());
        assert_matches!(
            Err(DecodeError::Truncated {
                offset: 2,
                needed: 1
            }),
            d.u32()
        );
        // Failed read leaves the position alone
        assert_eq!(2, d.position());
        assert_eq!(0x0403, d.u16().unwrap());
        assert_eq!(0xFF, d.u8().unwrap());
        assert!(d.finish().is_ok());
    }

    #[test]
    fn ascii_string_requires_terminator() {
        let mut d = Decoder::new(b"/o=First Organization\0x");
        assert_eq!("/o=First Organization", d.ascii_z().unwrap());
        assert_eq!(1, d.remaining());

        let mut d = Decoder::new(b"abc");
        assert_matches!(Err(DecodeError::MissingTerminator(0)), d.ascii_z());
    }

    #[test]
    fn ascii_string_uses_windows_1252() {
        let mut d = Decoder::new(b"caf\xE9\0");
        assert_eq!("café", d.ascii_z().unwrap());

        let mut out = Vec::new();
        write_ascii_z(&mut out, "café").unwrap();
        assert_eq!(b"caf\xE9\0".to_vec(), out);

        assert!(write_ascii_z(&mut Vec::new(), "日本").is_err());
    }

    #[test]
    fn unicode_string_decoding() {
        let mut d = Decoder::new(b"h\0i\0\0\0");
        assert_eq!("hi", d.unicode_z().unwrap());
        assert!(d.finish().is_ok());

        let mut d = Decoder::new(b"h\0i\0");
        assert_matches!(Err(DecodeError::MissingTerminator(0)), d.unicode_z());

        // A zero byte pair straddling two code units is not a terminator
        let mut d = Decoder::new(b"h\0\0");
        assert_matches!(Err(DecodeError::MissingTerminator(0)), d.unicode_z());
        let mut d = Decoder::new(b"\0h\0\0");
        assert_eq!("\u{6800}", d.unicode_z().unwrap());

        // Unpaired surrogate
        let mut d = Decoder::new(b"\x00\xD8\0\0");
        assert_matches!(Err(DecodeError::BadUtf16(0)), d.unicode_z());
    }

    #[test]
    fn counted_bytes_must_all_be_present() {
        let mut d = Decoder::new(&[3, 0, 0, 0, 1, 2]);
        assert_matches!(
            Err(DecodeError::Truncated {
                offset: 0,
                needed: 1
            }),
            d.counted_bytes()
        );
    }

    #[test]
    fn impossible_counts_rejected_before_allocating() {
        let mut d = Decoder::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0]);
        assert_matches!(
            Err(DecodeError::ImpossibleCount {
                count: 0xFFFF_FFFF,
                remaining: 2
            }),
            d.count(4)
        );
    }

    #[test]
    fn optional_flag_accepts_any_nonzero_value() {
        let mut d = Decoder::new(&[0x7F, 42, 0, 0, 0, 0x00]);
        assert_eq!(Some(42), read_optional(&mut d, |d| d.u32()).unwrap());
        assert_eq!(None, read_optional(&mut d, |d| d.u32()).unwrap());
        assert!(d.finish().is_ok());

        let mut out = Vec::new();
        write_optional(&mut out, Some(&42u32), |w, v| {
            w.write_u32::<LittleEndian>(*v)
        })
        .unwrap();
        write_optional::<_, u32>(&mut out, None, |w, v| {
            w.write_u32::<LittleEndian>(*v)
        })
        .unwrap();
        assert_eq!(vec![1, 42, 0, 0, 0, 0], out);
    }

    #[test]
    fn guid_formatting() {
        let g = Guid([
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA,
            0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
        ]);
        assert_eq!("{00112233-4455-6677-8899-AABBCCDDEEFF}", g.to_string());

        let r = Guid::random();
        assert_eq!(0x40, r.0[7] & 0xF0);
        assert_ne!(r, Guid::random());
    }

    proptest! {
        #[test]
        fn unicode_strings_round_trip(s in "\\PC*") {
            let s = s.replace('\0', "");
            let mut out = Vec::new();
            write_unicode_z(&mut out, &s).unwrap();
            let mut d = Decoder::new(&out);
            prop_assert_eq!(&s, &d.unicode_z().unwrap());
            prop_assert!(d.finish().is_ok());
        }

        #[test]
        fn decoder_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let mut d = Decoder::new(&data);
            let _ = d.ascii_z();
            let _ = d.unicode_z();
            let _ = d.counted_bytes();
            let _ = d.count(1);
        }
    }
}
