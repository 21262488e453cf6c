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

//! Client side of MAPI over HTTP.
//!
//! The layers, bottom-up:
//!
//! - `wire`, `forms`, and the `wire_struct!` macro: the little-endian
//!   primitive codec.
//! - `property`, `row`, `stat`, `restriction`: address book value types.
//! - `body`: the request and response body of every request type.
//! - `envelope`: the meta-tag and additional-header wrapper around responses.
//! - `extended_buffer`: the framing inside ROP and auxiliary buffers.
//! - `headers`, `cookies`, `transport`, `session`: driving a Session Context
//!   over HTTP.
//! - `autodiscover`: finding the endpoints.
//! - `conformance`: checking responses against the header contract.

#[macro_use]
mod macros;

pub mod autodiscover;
pub mod body;
pub mod conformance;
pub mod cookies;
pub mod envelope;
pub mod extended_buffer;
pub mod forms;
pub mod headers;
pub mod property;
pub mod request_type;
pub mod restriction;
pub mod row;
pub mod session;
pub mod stat;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod session_tests;
