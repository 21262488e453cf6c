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

//! The HTTP layer underneath sessions and Autodiscover.
//!
//! Everything above this module sees a request as a complete byte buffer and
//! a response as its status, headers, and fully reassembled body. Chunked
//! transfer encoding and PENDING keep-alives are therefore invisible here;
//! the request timeout bounds the whole exchange including keep-alives.

use std::time::Duration;

use log::trace;

use super::headers::Headers;
use crate::support::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Something that can POST a request and wait for the whole response.
pub trait Transport {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        (**self).post(request)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// The real transport, over HTTPS with basic authentication.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    pub fn new(
        timeout: Duration,
        accept_invalid_certs: bool,
        credentials: Option<Credentials>,
    ) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(HttpTransport {
            client,
            credentials,
        })
    }
}

impl Transport for HttpTransport {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        trace!(
            "POST {} ({} bytes) {:?}",
            request.url,
            request.body.len(),
            request.headers
        );

        let mut builder = self.client.post(&request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(ref credentials) = self.credentials {
            builder =
                builder.basic_auth(&credentials.user, Some(&credentials.password));
        }

        let response = builder.body(request.body.clone()).send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect::<Headers>();
        let body = response.bytes()?.to_vec();

        trace!(
            "Response {} ({} bytes) {:?}",
            status,
            body.len(),
            headers
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// A transport which plays back canned responses and records requests.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedTransport {
    pub responses: std::collections::VecDeque<HttpResponse>,
    pub requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, response: HttpResponse) {
        self.responses.push_back(response);
    }
}

#[cfg(test)]
impl Transport for ScriptedTransport {
    fn post(&mut self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.requests.push(request.clone());
        self.responses.pop_front().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "script exhausted",
            ))
        })
    }
}
