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

//! Extended buffers, the framing used for `RopBuffer` and `AuxiliaryBuffer`.
//!
//! An extended buffer is a sequence of segments, each of which is:
//!
//! ```text
//! Version:u16 Flags:u16 Size:u16 SizeActual:u16 Payload:[u8; Size]
//! ```
//!
//! The `Last` flag marks the final segment. `XorMagic` means every payload
//! byte was XORed with `0xA5`. `Compressed` means the payload is LZ77
//! compressed and expands to `SizeActual` bytes; we never request
//! compression, so such segments are rejected.
//!
//! The payload of an auxiliary buffer is itself a sequence of blocks, each
//! starting with an `AUX_HEADER` (`Size:u16 Version:u8 Type:u8`) where `Size`
//! includes the header.

use std::io::{self, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, WriteBytesExt};

use super::wire::{DecodeError, Decoder};

bitflags! {
    pub struct ExtendedBufferFlags: u16 {
        const COMPRESSED = 0x0001;
        const XOR_MAGIC = 0x0002;
        const LAST = 0x0004;
    }
}

const XOR_MAGIC: u8 = 0xA5;
const HEADER_SIZE: usize = 8;
const AUX_HEADER_SIZE: usize = 4;

/// Decode all segments of an extended buffer, concatenating their payloads.
///
/// An empty input is an empty payload.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut d = Decoder::new(data);
    let mut payload = Vec::new();
    if d.is_empty() {
        return Ok(payload);
    }

    loop {
        let version = d.u16()?;
        if 0 != version {
            return Err(DecodeError::BadExtendedBuffer("unknown version"));
        }

        let flags = ExtendedBufferFlags::from_bits(d.u16()?)
            .ok_or(DecodeError::BadExtendedBuffer("unknown flags"))?;
        let size = d.u16()? as usize;
        let size_actual = d.u16()? as usize;
        let segment = d.bytes(size)?;

        if flags.contains(ExtendedBufferFlags::COMPRESSED) {
            return Err(DecodeError::CompressedBuffer);
        }
        if size != size_actual {
            return Err(DecodeError::BadExtendedBuffer(
                "size differs from actual size in uncompressed segment",
            ));
        }

        if flags.contains(ExtendedBufferFlags::XOR_MAGIC) {
            payload.extend(segment.iter().map(|b| b ^ XOR_MAGIC));
        } else {
            payload.extend_from_slice(segment);
        }

        if flags.contains(ExtendedBufferFlags::LAST) {
            break;
        }
    }

    d.finish()?;
    Ok(payload)
}

/// Frame `payload` as a single uncompressed segment.
pub fn encode<W: Write>(
    w: &mut W,
    payload: &[u8],
    obfuscate: bool,
) -> io::Result<()> {
    if payload.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{}-byte payload too large for one segment", payload.len()),
        ));
    }

    let mut flags = ExtendedBufferFlags::LAST;
    if obfuscate {
        flags |= ExtendedBufferFlags::XOR_MAGIC;
    }

    w.write_u16::<LittleEndian>(0)?;
    w.write_u16::<LittleEndian>(flags.bits())?;
    w.write_u16::<LittleEndian>(payload.len() as u16)?;
    w.write_u16::<LittleEndian>(payload.len() as u16)?;
    if obfuscate {
        let obfuscated =
            payload.iter().map(|b| b ^ XOR_MAGIC).collect::<Vec<_>>();
        w.write_all(&obfuscated)
    } else {
        w.write_all(payload)
    }
}

/// Convenience for `encode` into a fresh vector.
pub fn wrap(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    encode(&mut out, payload, false)?;
    Ok(out)
}

/// One block of an auxiliary buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuxiliaryBlock {
    pub version: u8,
    pub block_type: u8,
    pub payload: Vec<u8>,
}

impl AuxiliaryBlock {
    /// The name of the block type, for the types a server may send.
    pub fn type_name(&self) -> Option<&'static str> {
        Some(match self.block_type {
            0x01 => "AUX_TYPE_PERF_REQUESTID",
            0x02 => "AUX_TYPE_PERF_CLIENTDINFO",
            0x03 => "AUX_TYPE_PERF_SERVERINFO",
            0x04 => "AUX_TYPE_PERF_SESSIONINFO",
            0x05 => "AUX_TYPE_PERF_DEFMDB_SUCCESS",
            0x06 => "AUX_TYPE_PERF_DEFGC_SUCCESS",
            0x07 => "AUX_TYPE_PERF_MDB_SUCCESS",
            0x08 => "AUX_TYPE_PERF_GC_SUCCESS",
            0x09 => "AUX_TYPE_PERF_FAILURE",
            0x0A => "AUX_TYPE_CLIENT_CONTROL",
            0x0B => "AUX_TYPE_PERF_PROCESSINFO",
            0x0C => "AUX_TYPE_PERF_BG_DEFMDB_SUCCESS",
            0x0D => "AUX_TYPE_PERF_BG_DEFGC_SUCCESS",
            0x0E => "AUX_TYPE_PERF_BG_MDB_SUCCESS",
            0x0F => "AUX_TYPE_PERF_BG_GC_SUCCESS",
            0x10 => "AUX_TYPE_PERF_BG_FAILURE",
            0x11 => "AUX_TYPE_PERF_FG_DEFMDB_SUCCESS",
            0x12 => "AUX_TYPE_PERF_FG_DEFGC_SUCCESS",
            0x13 => "AUX_TYPE_PERF_FG_MDB_SUCCESS",
            0x14 => "AUX_TYPE_PERF_FG_GC_SUCCESS",
            0x15 => "AUX_TYPE_PERF_FG_FAILURE",
            0x16 => "AUX_TYPE_OSVERSIONINFO",
            0x17 => "AUX_TYPE_EXORGINFO",
            0x18 => "AUX_TYPE_PERF_ACCOUNTINFO",
            0x19 => "AUX_TYPE_ENDPOINT_CAPABILITIES",
            0x1A => "AUX_CLIENT_CONNECTION_INFO",
            0x1B => "AUX_SERVER_SESSION_INFO",
            0x4B => "AUX_PROTOCOL_DEVICE_IDENTIFICATION",
            _ => return None,
        })
    }
}

/// Split the (already unframed) payload of an auxiliary buffer into blocks.
pub fn parse_auxiliary_blocks(
    payload: &[u8],
) -> Result<Vec<AuxiliaryBlock>, DecodeError> {
    let mut d = Decoder::new(payload);
    let mut blocks = Vec::new();
    while !d.is_empty() {
        let size = d.u16()? as usize;
        let version = d.u8()?;
        let block_type = d.u8()?;
        if size < AUX_HEADER_SIZE {
            return Err(DecodeError::BadExtendedBuffer(
                "auxiliary block smaller than its header",
            ));
        }

        blocks.push(AuxiliaryBlock {
            version,
            block_type,
            payload: d.bytes(size - AUX_HEADER_SIZE)?.to_vec(),
        });
    }

    Ok(blocks)
}

/// Decode a whole `AuxiliaryBuffer` into its blocks.
pub fn decode_auxiliary_buffer(
    data: &[u8],
) -> Result<Vec<AuxiliaryBlock>, DecodeError> {
    parse_auxiliary_blocks(&decode(data)?)
}
