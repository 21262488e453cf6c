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

//! Checks of the response header contract.
//!
//! Nothing here is fatal. Every problem found is reported as a `Deviation`
//! so a probe run can list all of them rather than stopping at the first.

use std::fmt;

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

use super::envelope::ResponseEnvelope;
use super::headers::*;
use super::request_type::{CookiePolicy, RequestType};

lazy_static! {
    static ref RX_SERVER_APPLICATION: Regex =
        Regex::new(r"^Exchange/15\.\d{2}\.\d{4}\.\d{3}$").unwrap();
}

/// One way in which a response differs from what the protocol requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deviation {
    pub header: &'static str,
    pub problem: String,
}

impl Deviation {
    fn new(header: &'static str, problem: impl Into<String>) -> Self {
        Deviation {
            header,
            problem: problem.into(),
        }
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.header, self.problem)
    }
}

/// Check the HTTP headers of a response to `request_type`, and the
/// additional headers of its envelope if it was parsed.
pub fn check_response(
    request_type: RequestType,
    headers: &Headers,
    envelope: Option<&ResponseEnvelope>,
) -> Vec<Deviation> {
    let mut deviations = Vec::new();

    let response_code = match headers.get(X_RESPONSE_CODE) {
        None => {
            deviations.push(Deviation::new(X_RESPONSE_CODE, "missing"));
            None
        }
        Some(v) => match super::envelope::parse_response_code(v) {
            Ok(code) => Some(code),
            Err(_) => {
                deviations.push(Deviation::new(
                    X_RESPONSE_CODE,
                    format!("not an integer: {:?}", v),
                ));
                None
            }
        },
    };

    let expected_content_type = if Some(0) == response_code {
        MAPI_HTTP_CONTENT_TYPE
    } else {
        FAILURE_CONTENT_TYPE
    };
    match headers.get(CONTENT_TYPE) {
        None => deviations.push(Deviation::new(CONTENT_TYPE, "missing")),
        Some(ct) if !media_type_is(ct, expected_content_type) => {
            deviations.push(Deviation::new(
                CONTENT_TYPE,
                format!("expected {}, got {:?}", expected_content_type, ct),
            ))
        }
        Some(_) => (),
    }

    match headers.get(X_SERVER_APPLICATION) {
        None => deviations.push(Deviation::new(X_SERVER_APPLICATION, "missing")),
        Some(sa) if !RX_SERVER_APPLICATION.is_match(sa) => {
            deviations.push(Deviation::new(
                X_SERVER_APPLICATION,
                format!("{:?} is not Exchange/15.xx.xxxx.xxx", sa),
            ))
        }
        Some(_) => (),
    }

    if let Some(pp) = headers.get(X_PENDING_PERIOD) {
        if pp.trim().parse::<u32>().is_err() {
            deviations.push(Deviation::new(
                X_PENDING_PERIOD,
                format!("not an integer: {:?}", pp),
            ));
        }
    }

    if !headers.contains(X_EXPIRATION_INFO) {
        deviations.push(Deviation::new(X_EXPIRATION_INFO, "missing"));
    }

    match headers.get(X_REQUEST_TYPE) {
        Some(rt) if rt.trim() == request_type.as_str() => (),
        Some(rt) => deviations.push(Deviation::new(
            X_REQUEST_TYPE,
            format!("echoed {:?} for {}", rt, request_type),
        )),
        None => deviations.push(Deviation::new(X_REQUEST_TYPE, "missing")),
    }

    if CookiePolicy::Establish == request_type.cookie_policy()
        && Some(0) == response_code
        && !headers.contains(SET_COOKIE)
    {
        deviations.push(Deviation::new(
            SET_COOKIE,
            format!("missing from {} response", request_type),
        ));
    }

    if headers.contains(X_DEVICE_INFO) {
        deviations.push(Deviation::new(
            X_DEVICE_INFO,
            "must not be sent by the server",
        ));
    }

    if let Some(envelope) = envelope.filter(|e| e.is_success()) {
        check_additional_headers(envelope, &mut deviations);
    }

    deviations
}

fn check_additional_headers(
    envelope: &ResponseEnvelope,
    deviations: &mut Vec<Deviation>,
) {
    match envelope.additional_header(X_ELAPSED_TIME) {
        None => deviations.push(Deviation::new(X_ELAPSED_TIME, "missing")),
        Some(et) if et.parse::<u64>().is_err() => {
            deviations.push(Deviation::new(
                X_ELAPSED_TIME,
                format!("not an integer: {:?}", et),
            ))
        }
        Some(_) => (),
    }

    match envelope.additional_header(X_START_TIME) {
        None => deviations.push(Deviation::new(X_START_TIME, "missing")),
        Some(st) if !is_date(st) => deviations.push(Deviation::new(
            X_START_TIME,
            format!("not a date: {:?}", st),
        )),
        Some(_) => (),
    }
}

/// The pending period the server announced, or the default.
pub fn pending_period_ms(headers: &Headers) -> u32 {
    headers
        .get(X_PENDING_PERIOD)
        .and_then(|pp| pp.trim().parse().ok())
        .unwrap_or(DEFAULT_PENDING_PERIOD_MS)
}

fn media_type_is(content_type: &str, expected: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map_or(false, |mt| mt.trim().eq_ignore_ascii_case(expected))
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc2822(s).is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
}
