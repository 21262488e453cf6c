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
use std::str::FromStr;

/// The two logical endpoints of a MAPI/HTTP server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerEndpoint {
    /// The `emsmdb` endpoint.
    Mailbox,
    /// The `nspi` endpoint.
    AddressBook,
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ServerEndpoint::Mailbox => write!(f, "mailbox"),
            ServerEndpoint::AddressBook => write!(f, "address-book"),
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "mailbox" | "emsmdb" => Ok(ServerEndpoint::Mailbox),
            "address-book" | "addressbook" | "nspi" => {
                Ok(ServerEndpoint::AddressBook)
            }
            _ => Err(format!("Unknown endpoint: {}", s)),
        }
    }
}

/// What a successful request does to the session cookie jar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookiePolicy {
    /// Start a new Session Context; the jar is replaced by `Set-Cookie`.
    Establish,
    /// Send the jar and merge any refreshed cookies back in.
    Refresh,
    /// Send the jar; on success the Session Context is gone.
    Invalidate,
    /// Send the jar but never modify it.
    Untouched,
}

macro_rules! request_types {
    ($($variant:ident = $name:literal, $endpoint:ident, $cookies:ident;)*) => {
        /// Every request type defined by MAPI/HTTP.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RequestType {
            $($variant,)*
        }

        impl RequestType {
            pub const ALL: &'static [RequestType] = &[
                $(RequestType::$variant,)*
            ];

            /// The value of the `X-RequestType` header.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(RequestType::$variant => $name,)*
                }
            }

            /// The endpoint that serves this request type, or `None` if
            /// both do.
            pub fn endpoint(self) -> Option<ServerEndpoint> {
                match self {
                    $(RequestType::$variant => request_types!(@endpoint $endpoint),)*
                }
            }

            pub fn cookie_policy(self) -> CookiePolicy {
                match self {
                    $(RequestType::$variant => CookiePolicy::$cookies,)*
                }
            }
        }

        impl FromStr for RequestType {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, String> {
                match s {
                    $($name => Ok(RequestType::$variant),)*
                    _ => Err(format!("Unknown request type: {}", s)),
                }
            }
        }
    };

    (@endpoint Mailbox) => { Some(ServerEndpoint::Mailbox) };
    (@endpoint AddressBook) => { Some(ServerEndpoint::AddressBook) };
    (@endpoint Any) => { None };
}

request_types! {
    Connect = "Connect", Mailbox, Establish;
    Execute = "Execute", Mailbox, Refresh;
    Disconnect = "Disconnect", Mailbox, Invalidate;
    NotificationWait = "NotificationWait", Mailbox, Refresh;
    Ping = "PING", Any, Untouched;
    Bind = "Bind", AddressBook, Establish;
    Unbind = "Unbind", AddressBook, Invalidate;
    CompareMinIds = "CompareMIds", AddressBook, Refresh;
    DnToMinId = "DNToMId", AddressBook, Refresh;
    GetMatches = "GetMatches", AddressBook, Refresh;
    GetPropList = "GetPropList", AddressBook, Refresh;
    GetProps = "GetProps", AddressBook, Refresh;
    GetSpecialTable = "GetSpecialTable", AddressBook, Refresh;
    GetTemplateInfo = "GetTemplateInfo", AddressBook, Refresh;
    ModLinkAtt = "ModLinkAtt", AddressBook, Refresh;
    ModProps = "ModProps", AddressBook, Refresh;
    QueryColumns = "QueryColumns", AddressBook, Refresh;
    QueryRows = "QueryRows", AddressBook, Refresh;
    ResolveNames = "ResolveNames", AddressBook, Refresh;
    ResortRestriction = "ResortRestriction", AddressBook, Refresh;
    SeekEntries = "SeekEntries", AddressBook, Refresh;
    UpdateStat = "UpdateStat", AddressBook, Refresh;
    GetMailboxUrl = "GetMailboxUrl", AddressBook, Untouched;
    GetAddressBookUrl = "GetAddressBookUrl", AddressBook, Untouched;
}

impl RequestType {
    /// Whether this request type can be sent to `endpoint`.
    pub fn is_served_by(self, endpoint: ServerEndpoint) -> bool {
        self.endpoint().map_or(true, |e| e == endpoint)
    }

    /// Whether this request type only makes sense within a Session Context.
    pub fn requires_session(self) -> bool {
        match self.cookie_policy() {
            CookiePolicy::Refresh | CookiePolicy::Invalidate => true,
            CookiePolicy::Establish | CookiePolicy::Untouched => false,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
