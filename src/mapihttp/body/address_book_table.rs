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

//! Address book (NSPI) bodies which read or write table rows and property
//! values.

use crate::mapihttp::property::LargePropertyTagArray;
use crate::mapihttp::restriction::Restriction;
use crate::mapihttp::row::{
    AddressBookPropertyValueList, AddressBookTaggedPropertyValue,
    ColumnsAndRows,
};
use crate::mapihttp::stat::Stat;
use crate::mapihttp::wire::Guid;

wire_struct! {
    /// A named property: the property set GUID and the LID within it.
    #[derive(Copy, Eq)]
    pub struct PropertyName {
        pub guid: Guid = wire,
        pub id: u32 = uint32,
    }
}

wire_struct! {
    pub struct GetMatchesRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub interface_option_flags: u32 = uint32,
        pub filter: Option<Restriction> = optional(wire),
        pub property_name: Option<PropertyName> = optional(wire),
        pub row_count: u32 = uint32,
        pub columns: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetMatchesSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub columns_and_rows: Option<ColumnsAndRows> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetPropsRequestBody {
        /// `fEphID` (`0x2`) and `fSkipObjects` (`0x1`).
        pub flags: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub property_tags: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetPropsSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub code_page: u32 = uint32,
        pub property_values: Option<AddressBookPropertyValueList> =
            optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetSpecialTableRequestBody {
        /// `NspiAddressCreationTemplates` (`0x2`) or `NspiUnicodeStrings`
        /// (`0x4`).
        pub flags: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub version: Option<u32> = optional(uint32),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetSpecialTableSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub code_page: u32 = uint32,
        pub version: Option<u32> = optional(uint32),
        pub rows: Option<Vec<AddressBookPropertyValueList>> =
            optional(wire_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetTemplateInfoRequestBody {
        pub flags: u32 = uint32,
        pub display_type: u32 = uint32,
        pub template_dn: Option<String> = optional(ascii),
        pub code_page: u32 = uint32,
        pub locale_id: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetTemplateInfoSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub code_page: u32 = uint32,
        pub row: Option<AddressBookPropertyValueList> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ModPropsRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub property_tags_to_remove: Option<LargePropertyTagArray> =
            optional(wire),
        pub property_values: Option<AddressBookPropertyValueList> =
            optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ModPropsSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct QueryRowsRequestBody {
        pub flags: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        /// Minimal Entry IDs to return instead of reading from `state`.
        pub explicit_table: Vec<u32> = uint32_array,
        pub row_count: u32 = uint32,
        pub columns: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct QueryRowsSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub columns_and_rows: Option<ColumnsAndRows> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ResolveNamesRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub property_tags: Option<LargePropertyTagArray> = optional(wire),
        pub names: Option<Vec<String>> = optional(unicode_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ResolveNamesSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub code_page: u32 = uint32,
        /// One entry per name: `MID_UNRESOLVED`, `MID_AMBIGUOUS`, or the
        /// Minimal Entry ID of the match.
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub rows_and_columns: Option<ColumnsAndRows> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct SeekEntriesRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub target: Option<AddressBookTaggedPropertyValue> = optional(wire),
        pub explicit_table: Option<Vec<u32>> = optional(uint32_array),
        pub columns: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct SeekEntriesSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub columns_and_rows: Option<ColumnsAndRows> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

/// `MID_UNRESOLVED`: the name matched nothing.
pub const MID_UNRESOLVED: u32 = 0x0000_0000;
/// `MID_AMBIGUOUS`: the name matched more than one entry.
pub const MID_AMBIGUOUS: u32 = 0x0000_0001;
/// `MID_RESOLVED`: the name matched exactly one entry.
pub const MID_RESOLVED: u32 = 0x0000_0002;

request_body!(GetMatchesRequestBody, GetMatches, GetMatchesSuccessResponseBody);
request_body!(GetPropsRequestBody, GetProps, GetPropsSuccessResponseBody);
request_body!(
    GetSpecialTableRequestBody,
    GetSpecialTable,
    GetSpecialTableSuccessResponseBody
);
request_body!(
    GetTemplateInfoRequestBody,
    GetTemplateInfo,
    GetTemplateInfoSuccessResponseBody
);
request_body!(ModPropsRequestBody, ModProps, ModPropsSuccessResponseBody);
request_body!(QueryRowsRequestBody, QueryRows, QueryRowsSuccessResponseBody);
request_body!(
    ResolveNamesRequestBody,
    ResolveNames,
    ResolveNamesSuccessResponseBody
);
request_body!(
    SeekEntriesRequestBody,
    SeekEntries,
    SeekEntriesSuccessResponseBody
);

response_body!(
    GetMatchesSuccessResponseBody,
    GetMatches,
    4 + 4 + 1 + 1 + 1 + 4
);
response_body!(GetPropsSuccessResponseBody, GetProps, 4 + 4 + 4 + 1 + 4);
response_body!(
    GetSpecialTableSuccessResponseBody,
    GetSpecialTable,
    4 + 4 + 4 + 1 + 1 + 4
);
response_body!(
    GetTemplateInfoSuccessResponseBody,
    GetTemplateInfo,
    4 + 4 + 4 + 1 + 4
);
response_body!(ModPropsSuccessResponseBody, ModProps, 4 + 4 + 4);
response_body!(QueryRowsSuccessResponseBody, QueryRows, 4 + 4 + 1 + 1 + 4);
response_body!(
    ResolveNamesSuccessResponseBody,
    ResolveNames,
    4 + 4 + 4 + 1 + 1 + 4
);
response_body!(
    SeekEntriesSuccessResponseBody,
    SeekEntries,
    4 + 4 + 1 + 1 + 4
);
