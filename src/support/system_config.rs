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

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::mapihttp::autodiscover::{DEFAULT_URL_FORMAT, EndpointUrls};
use crate::mapihttp::headers::DEFAULT_CLIENT_APPLICATION;

/// The configuration for a probe run.
///
/// This is stored in a file named `mapiprobe.toml`, by default in the
/// current directory.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// The system under test and the account to use on it.
    pub server: ServerConfig,

    /// Behaviour of the HTTP client.
    #[serde(default)]
    pub client: ClientConfig,

    /// Values sent in the Connect request.
    ///
    /// The defaults are what Outlook sends for a US English client.
    #[serde(default)]
    pub connect: ConnectConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// The host name of the system under test.
    ///
    /// This replaces `[ServerName]` in `autodiscover_url_format`.
    pub sut_computer_name: String,
    /// The domain of the user, e.g. `contoso.com`.
    pub domain: String,
    /// The user name, without domain.
    pub user: String,
    /// The user's password.
    ///
    /// If not given, the password is prompted for on the terminal.
    #[serde(default)]
    pub password: Option<String>,
    /// The distinguished name of the user, as sent in Connect.
    ///
    /// If not given, it is looked up in the address book by resolving the
    /// user's name before connecting to the mailbox.
    #[serde(default)]
    pub user_dn: Option<String>,
    /// The URL of the Autodiscover service.
    #[serde(default = "default_autodiscover_url_format")]
    pub autodiscover_url_format: String,
    /// If set together with `address_book_url`, skip Autodiscover and use
    /// these endpoint URLs directly.
    #[serde(default)]
    pub mailbox_url: Option<String>,
    #[serde(default)]
    pub address_book_url: Option<String>,
}

impl ServerConfig {
    pub fn email(&self) -> String {
        format!("{}@{}", self.user, self.domain)
    }

    /// The endpoint URLs fixed by configuration, if both are set.
    pub fn static_endpoints(&self) -> Option<EndpointUrls> {
        match (&self.mailbox_url, &self.address_book_url) {
            (&Some(ref mailbox), &Some(ref address_book)) => Some(EndpointUrls {
                mailbox: mailbox.clone(),
                address_book: address_book.clone(),
            }),
            _ => None,
        }
    }
}

fn default_autodiscover_url_format() -> String {
    DEFAULT_URL_FORMAT.to_owned()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The hard limit on a single request, in milliseconds, including any
    /// time spent receiving PENDING keep-alives.
    ///
    /// NotificationWait can legitimately take several minutes, so this
    /// should be well above the server's notification timeout.
    pub request_timeout_ms: u64,

    /// If true, accept any TLS certificate from the server.
    ///
    /// Test deployments commonly use self-signed certificates.
    pub accept_invalid_certs: bool,

    /// The value of `X-ClientApplication`.
    pub client_application: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: 600_000,
            accept_invalid_certs: false,
            client_application: DEFAULT_CLIENT_APPLICATION.to_owned(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    pub flags: u32,
    pub code_page: u32,
    pub lcid_sort: u32,
    pub lcid_string: u32,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            flags: 0x0000_0001,
            code_page: 1252,
            lcid_sort: 0x0409,
            lcid_string: 0x0409,
        }
    }
}

impl ProbeConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = fs::read(path)?;
        Ok(toml::from_slice(&data)?)
    }
}
