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

use std::fmt;

use super::wire::Guid;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const COOKIE: &str = "Cookie";
pub const SET_COOKIE: &str = "Set-Cookie";
pub const X_REQUEST_TYPE: &str = "X-RequestType";
pub const X_CLIENT_INFO: &str = "X-ClientInfo";
pub const X_REQUEST_ID: &str = "X-RequestId";
pub const X_CLIENT_APPLICATION: &str = "X-ClientApplication";
pub const X_RESPONSE_CODE: &str = "X-ResponseCode";
pub const X_SERVER_APPLICATION: &str = "X-ServerApplication";
pub const X_PENDING_PERIOD: &str = "X-PendingPeriod";
pub const X_EXPIRATION_INFO: &str = "X-ExpirationInfo";
pub const X_DEVICE_INFO: &str = "X-DeviceInfo";
pub const X_ELAPSED_TIME: &str = "X-ElapsedTime";
pub const X_START_TIME: &str = "X-StartTime";

pub const MAPI_HTTP_CONTENT_TYPE: &str = "application/mapi-http";
pub const FAILURE_CONTENT_TYPE: &str = "text/html";
pub const DEFAULT_CLIENT_APPLICATION: &str = "Outlook/15.00.0856.000";
/// Milliseconds between PENDING keep-alives when `X-PendingPeriod` is absent.
pub const DEFAULT_PENDING_PERIOD_MS: u32 = 15_000;

/// An ordered list of HTTP headers, looked up without regard to ASCII case.
///
/// Unlike a map, this keeps repeated headers (notably `Set-Cookie`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Replace every header called `name` with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.push(name, value);
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|&(ref k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// The first value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|&(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v as &str)
    }

    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |&(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v as &str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k as &str, v as &str))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> std::iter::FromIterator<(N, V)>
    for Headers
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(it: I) -> Self {
        Headers(it.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Identifies one client instance to the server.
///
/// `X-ClientInfo` and `X-RequestId` are both `{GUID}:counter`; the GUID is
/// fixed for the lifetime of the instance and the counter increases with
/// every request, starting at 1.
#[derive(Clone, Debug)]
pub struct ClientInstance {
    guid: Guid,
    counter: u64,
}

impl ClientInstance {
    pub fn new() -> Self {
        Self::with_guid(Guid::random())
    }

    pub fn with_guid(guid: Guid) -> Self {
        ClientInstance { guid, counter: 0 }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// The counter of the most recent request, or 0 if none was made.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Advance the counter and return the identifier of the new request.
    pub fn next_request_id(&mut self) -> RequestId {
        self.counter += 1;
        RequestId {
            guid: self.guid,
            counter: self.counter,
        }
    }
}

impl Default for ClientInstance {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId {
    pub guid: Guid,
    pub counter: u64,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guid, self.counter)
    }
}
