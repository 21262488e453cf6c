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

//! Request and response bodies for every request type.
//!
//! Every request body ends with `AuxiliaryBufferSize` and `AuxiliaryBuffer`.
//! Every response body starts with a 32-bit `StatusCode`. When that is zero,
//! the rest is the request-type-specific success body, starting with
//! `ErrorCode` and ending with the auxiliary buffer. Otherwise, the body is a
//! `FailureResponseBody` of the same shape for all request types.
//!
//! The success structs here do not contain `StatusCode`, since it is always
//! zero; `ResponseBody::parse` and `ResponseBody::serialize` take care of it.

use std::io;

use byteorder::{LittleEndian, WriteBytesExt};

use super::request_type::RequestType;
use super::wire::*;

/// A request body for a particular request type.
pub trait RequestBody: Wire {
    const REQUEST_TYPE: RequestType;
    type Response: ResponseBody;

    fn serialize(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Parse a complete request body; trailing bytes are an error.
    fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut d = Decoder::new(data);
        let body = Self::decode(&mut d)?;
        d.finish()?;
        Ok(body)
    }
}

/// The success response body for a particular request type.
pub trait ResponseBody: Wire {
    const REQUEST_TYPE: RequestType;
    /// The size of the smallest well-formed body, including `StatusCode`.
    const MIN_LEN: usize;

    fn error_code(&self) -> u32;
    fn auxiliary_buffer(&self) -> &[u8];

    /// Parse a complete success body, including its leading `StatusCode`.
    fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        check_min_len(Self::REQUEST_TYPE, Self::MIN_LEN, data)?;
        let mut d = Decoder::new(data);
        let status = d.u32()?;
        if 0 != status {
            return Err(DecodeError::UnexpectedStatus(status));
        }

        let body = Self::decode(&mut d)?;
        d.finish()?;
        Ok(body)
    }

    fn serialize(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(0)?;
        self.encode(&mut out)?;
        Ok(out)
    }
}

fn check_min_len(
    request_type: RequestType,
    min: usize,
    data: &[u8],
) -> Result<(), DecodeError> {
    if data.len() < min {
        Err(DecodeError::BodyTooShort {
            request_type,
            min,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

wire_struct! {
    /// The body returned for any request type when `StatusCode` is nonzero.
    pub struct FailureResponseBody {
        pub status_code: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

impl FailureResponseBody {
    pub const MIN_LEN: usize = 8;

    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut d = Decoder::new(data);
        let body = Self::decode(&mut d)?;
        d.finish()?;
        Ok(body)
    }

    pub fn serialize(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// The result of dispatching a response body on its `StatusCode`.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody<B> {
    Success(B),
    Failure(FailureResponseBody),
}

/// Parse `data` as either the success body `B` or a failure body, depending
/// on the leading `StatusCode`.
pub fn parse_response_body<B: ResponseBody>(
    data: &[u8],
) -> Result<ParsedBody<B>, DecodeError> {
    let status = Decoder::new(data).u32().map_err(|_| {
        DecodeError::BodyTooShort {
            request_type: B::REQUEST_TYPE,
            min: B::MIN_LEN.min(FailureResponseBody::MIN_LEN),
            actual: data.len(),
        }
    })?;

    if 0 == status {
        B::parse(data).map(ParsedBody::Success)
    } else {
        check_min_len(B::REQUEST_TYPE, FailureResponseBody::MIN_LEN, data)?;
        FailureResponseBody::parse(data).map(ParsedBody::Failure)
    }
}

macro_rules! request_body {
    ($name:ident, $request_type:ident, $response:ident) => {
        impl $crate::mapihttp::body::RequestBody for $name {
            const REQUEST_TYPE: $crate::mapihttp::request_type::RequestType =
                $crate::mapihttp::request_type::RequestType::$request_type;
            type Response = $response;
        }
    };
}

macro_rules! response_body {
    ($name:ident, $request_type:ident, $min_len:expr) => {
        impl $crate::mapihttp::body::ResponseBody for $name {
            const REQUEST_TYPE: $crate::mapihttp::request_type::RequestType =
                $crate::mapihttp::request_type::RequestType::$request_type;
            const MIN_LEN: usize = $min_len;

            fn error_code(&self) -> u32 {
                self.error_code
            }

            fn auxiliary_buffer(&self) -> &[u8] {
                &self.auxiliary_buffer
            }
        }
    };
}

pub mod address_book;
pub mod address_book_table;
pub mod mailbox;

pub use self::address_book::*;
pub use self::address_book_table::*;
pub use self::mailbox::*;
