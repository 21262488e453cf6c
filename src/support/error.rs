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

use std::io;

use thiserror::Error;

use super::sysexits::*;
use crate::mapihttp::request_type::{RequestType, ServerEndpoint};
use crate::mapihttp::wire::DecodeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Autodiscover failed: {0}")]
    Autodiscover(String),
    #[error("{0} requires an active session")]
    NoSession(RequestType),
    #[error("{request_type} is not served by the {endpoint} endpoint")]
    WrongEndpoint {
        request_type: RequestType,
        endpoint: ServerEndpoint,
    },
    #[error("{request_type} failed: {detail}")]
    RequestFailed {
        request_type: RequestType,
        detail: String,
    },
    #[error("Malformed {name} response header: {value:?}")]
    BadResponseHeader { name: &'static str, value: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// The `sysexits.h` code the CLI reports when this error ends the run.
    pub fn exit_code(&self) -> Sysexit {
        match *self {
            Error::HttpStatus { .. } | Error::Http(..) => EX_UNAVAILABLE,
            Error::Autodiscover(..) => EX_NOHOST,
            Error::NoSession(..) | Error::WrongEndpoint { .. } => EX_SOFTWARE,
            Error::RequestFailed { .. }
            | Error::BadResponseHeader { .. }
            | Error::Decode(..)
            | Error::Xml(..) => EX_PROTOCOL,
            Error::Io(..) => EX_IOERR,
            Error::Config(..) => EX_CONFIG,
        }
    }
}
