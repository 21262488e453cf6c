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

//! The common response format wrapped around every response body.
//!
//! ```text
//! PROCESSING\r\n
//! PENDING\r\n            (zero or more keep-alives)
//! DONE\r\n
//! X-ElapsedTime: 42\r\n  (additional headers)
//! X-StartTime: ...\r\n
//! \r\n
//! <binary response body>
//! ```
//!
//! The stream always starts with a meta-tag, though not necessarily
//! `PROCESSING`; a server that answers immediately may send `DONE` directly.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use memchr::memchr;

use super::wire::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaTag {
    Processing,
    Pending,
    Done,
}

impl MetaTag {
    pub fn as_str(self) -> &'static str {
        match self {
            MetaTag::Processing => "PROCESSING",
            MetaTag::Pending => "PENDING",
            MetaTag::Done => "DONE",
        }
    }

    fn from_line(line: &[u8]) -> Option<Self> {
        match line {
            b"PROCESSING" => Some(MetaTag::Processing),
            b"PENDING" => Some(MetaTag::Pending),
            b"DONE" => Some(MetaTag::Done),
            _ => None,
        }
    }
}

impl fmt::Display for MetaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully reassembled response, split into its parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Every meta-tag seen, in order. Ends with `Done` unless the response
    /// was not a meta-tag stream at all.
    pub meta_tags: Vec<MetaTag>,
    /// Additional headers following `DONE`, keyed by name as sent.
    pub additional_headers: BTreeMap<String, String>,
    /// The effective response code: the `X-ResponseCode` additional header
    /// if present, else the HTTP header.
    pub response_code: u32,
    /// The binary response body. Always empty when `response_code` is
    /// nonzero.
    pub body: Vec<u8>,
    /// When `response_code` is nonzero, whatever the server sent in place of
    /// a body, as text.
    pub failure_text: Option<String>,
}

impl ResponseEnvelope {
    /// Split `raw` into meta-tags, additional headers, and body.
    ///
    /// `header_code` is the response code from the HTTP `X-ResponseCode`
    /// header.
    pub fn parse(raw: &[u8], header_code: u32) -> Result<Self, DecodeError> {
        let mut envelope = ResponseEnvelope {
            response_code: header_code,
            ..ResponseEnvelope::default()
        };

        // Failures reported before the response starts streaming come back
        // as a plain error page rather than a meta-tag stream.
        if 0 != header_code && !starts_with_meta_tag(raw) {
            envelope.failure_text = lossy_text(raw);
            return Ok(envelope);
        }

        let mut lines = Lines { data: raw };
        loop {
            let line = lines.next().ok_or(DecodeError::MissingDone)?;
            let tag = MetaTag::from_line(line).ok_or_else(|| {
                DecodeError::BadMetaTag(
                    String::from_utf8_lossy(line).into_owned(),
                )
            })?;
            envelope.meta_tags.push(tag);
            if MetaTag::Done == tag {
                break;
            }
        }

        loop {
            if lines.data.is_empty() {
                break;
            }

            let line = lines.next().ok_or_else(|| {
                DecodeError::BadAdditionalHeader(
                    String::from_utf8_lossy(lines.data).into_owned(),
                )
            })?;
            if line.is_empty() {
                break;
            }

            let (name, value) = split_header(line)?;
            if name.eq_ignore_ascii_case("X-ResponseCode") {
                envelope.response_code = parse_response_code(&value)?;
            }
            envelope.additional_headers.insert(name, value);
        }

        if 0 == envelope.response_code {
            envelope.body = lines.data.to_vec();
        } else {
            envelope.failure_text = lossy_text(lines.data);
        }

        Ok(envelope)
    }

    /// Look up an additional header, ignoring ASCII case.
    pub fn additional_header(&self, name: &str) -> Option<&str> {
        self.additional_headers
            .iter()
            .find(|&(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v as &str)
    }

    pub fn is_success(&self) -> bool {
        0 == self.response_code
    }

    /// Write the envelope back out in the common response format.
    ///
    /// `failure_text` is not written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for tag in &self.meta_tags {
            write!(w, "{}\r\n", tag)?;
        }
        for (name, value) in &self.additional_headers {
            write!(w, "{}: {}\r\n", name, value)?;
        }
        w.write_all(b"\r\n")?;
        w.write_all(&self.body)
    }
}

/// Parse a response code header value.
///
/// A server which appends the header on each retry may produce a
/// comma-separated list; the last value is the one that applies.
pub fn parse_response_code(value: &str) -> Result<u32, DecodeError> {
    value
        .rsplit(',')
        .next()
        .map(str::trim)
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| DecodeError::BadHeader {
            name: "X-ResponseCode",
            value: value.to_owned(),
        })
}

/// Splits on CRLF, tolerating a bare LF.
struct Lines<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let lf = memchr(b'\n', self.data)?;
        let mut line = &self.data[..lf];
        self.data = &self.data[lf + 1..];
        if line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
        Some(line)
    }
}

fn starts_with_meta_tag(raw: &[u8]) -> bool {
    Lines { data: raw }
        .next()
        .and_then(MetaTag::from_line)
        .is_some()
}

fn split_header(line: &[u8]) -> Result<(String, String), DecodeError> {
    let bad = || {
        DecodeError::BadAdditionalHeader(
            String::from_utf8_lossy(line).into_owned(),
        )
    };

    let line = std::str::from_utf8(line).map_err(|_| bad())?;
    let colon = line.find(':').ok_or_else(bad)?;
    let name = line[..colon].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(bad());
    }

    Ok((name.to_owned(), line[colon + 1..].trim().to_owned()))
}

fn lossy_text(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(data).into_owned())
    }
}
