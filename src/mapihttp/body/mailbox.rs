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

//! Bodies for the mailbox (EMSMDB) endpoint.

use bitflags::bitflags;

bitflags! {
    /// Flags of the Execute request.
    pub struct ExecuteFlags: u32 {
        /// The server must not compress the ROP response.
        const NO_COMPRESSION = 0x0000_0001;
        /// The server must not obfuscate the ROP response.
        const NO_XOR_MAGIC = 0x0000_0002;
        /// The client accepts chained ROP responses.
        const CHAIN = 0x0000_0004;
    }
}

wire_struct! {
    pub struct ConnectRequestBody {
        /// DN of the user, e.g. `/o=First Organization/ou=.../cn=user`.
        pub user_dn: String = ascii,
        pub flags: u32 = uint32,
        pub default_code_page: u32 = uint32,
        pub lcid_sort: u32 = uint32,
        pub lcid_string: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

impl ConnectRequestBody {
    pub fn new(user_dn: String) -> Self {
        ConnectRequestBody {
            user_dn,
            flags: 0x0000_0001,
            default_code_page: 1252,
            lcid_sort: 0x0409,
            lcid_string: 0x0409,
            auxiliary_buffer: vec![],
        }
    }
}

wire_struct! {
    pub struct ConnectSuccessResponseBody {
        pub error_code: u32 = uint32,
        /// The longest time, in milliseconds, the client may wait between
        /// requests before the Session Context expires.
        pub polls_max: u32 = uint32,
        pub retry_count: u32 = uint32,
        /// Milliseconds to wait between retries.
        pub retry_delay: u32 = uint32,
        pub dn_prefix: String = ascii,
        pub display_name: String = unicode,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ExecuteRequestBody {
        pub flags: u32 = uint32,
        /// `RPC_HEADER_EXT` framed ROP requests.
        pub rop_buffer: Vec<u8> = binary,
        /// The largest ROP response buffer the client accepts.
        pub max_rop_out: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

impl ExecuteRequestBody {
    pub fn new(rop_buffer: Vec<u8>) -> Self {
        ExecuteRequestBody {
            flags: (ExecuteFlags::NO_COMPRESSION | ExecuteFlags::NO_XOR_MAGIC)
                .bits(),
            rop_buffer,
            max_rop_out: 0x0001_0008,
            auxiliary_buffer: vec![],
        }
    }
}

wire_struct! {
    pub struct ExecuteSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub flags: u32 = uint32,
        pub rop_buffer: Vec<u8> = binary,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    #[derive(Default)]
    pub struct DisconnectRequestBody {
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct DisconnectSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    #[derive(Default)]
    pub struct NotificationWaitRequestBody {
        /// Reserved; must be zero.
        pub flags: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct NotificationWaitSuccessResponseBody {
        pub error_code: u32 = uint32,
        /// Nonzero if an event is pending on the Session Context.
        pub event_pending: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

request_body!(ConnectRequestBody, Connect, ConnectSuccessResponseBody);
request_body!(ExecuteRequestBody, Execute, ExecuteSuccessResponseBody);
request_body!(
    DisconnectRequestBody,
    Disconnect,
    DisconnectSuccessResponseBody
);
request_body!(
    NotificationWaitRequestBody,
    NotificationWait,
    NotificationWaitSuccessResponseBody
);

// Status, error code, three u32s, two empty strings, aux size
response_body!(ConnectSuccessResponseBody, Connect, 4 + 4 + 12 + 1 + 2 + 4);
response_body!(ExecuteSuccessResponseBody, Execute, 4 + 4 + 4 + 4 + 4);
response_body!(DisconnectSuccessResponseBody, Disconnect, 4 + 4 + 4);
response_body!(
    NotificationWaitSuccessResponseBody,
    NotificationWait,
    4 + 4 + 4 + 4
);
