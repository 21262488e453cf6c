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

//! The Session Context cookies of one session.
//!
//! The server identifies a Session Context purely by the cookies it hands out
//! on Connect/Bind; they are opaque to us. Each session owns its own jar.

use std::collections::BTreeMap;

use log::warn;

use super::headers::{Headers, SET_COOKIE};
use super::request_type::CookiePolicy;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v as &str)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Apply the `Set-Cookie` headers of `response` to this jar, according to
    /// the cookie handling of the request type which produced it.
    pub fn apply(&mut self, policy: CookiePolicy, response: &Headers) {
        match policy {
            CookiePolicy::Establish => {
                self.clear();
                self.merge(response);
            }
            CookiePolicy::Refresh => self.merge(response),
            CookiePolicy::Invalidate => self.clear(),
            CookiePolicy::Untouched => (),
        }
    }

    /// Add or replace cookies from every `Set-Cookie` header in `response`.
    ///
    /// A cookie with a non-positive `Max-Age` is removed instead.
    pub fn merge(&mut self, response: &Headers) {
        for set_cookie in response.get_all(SET_COOKIE) {
            match parse_set_cookie(set_cookie) {
                Some((name, value, expired)) => {
                    if expired {
                        self.cookies.remove(name);
                    } else {
                        self.cookies.insert(name.to_owned(), value.to_owned());
                    }
                }
                None => warn!("Ignoring malformed Set-Cookie {:?}", set_cookie),
            }
        }
    }

    /// The value for the `Cookie` request header, if there are any cookies.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

fn parse_set_cookie(header: &str) -> Option<(&str, &str, bool)> {
    let mut parts = header.split(';');
    let (name, value) = split_pair(parts.next()?)?;
    if name.is_empty() {
        return None;
    }

    let expired = parts.filter_map(split_pair).any(|(k, v)| {
        k.eq_ignore_ascii_case("Max-Age")
            && v.parse::<i64>().map_or(false, |age| age <= 0)
    });
    Some((name, value, expired))
}

fn split_pair(s: &str) -> Option<(&str, &str)> {
    let eq = s.find('=')?;
    Some((s[..eq].trim(), s[eq + 1..].trim()))
}
