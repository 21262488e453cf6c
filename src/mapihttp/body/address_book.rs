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

//! Address book (NSPI) bodies which do not deal in rows.

use crate::mapihttp::property::{LargePropertyTagArray, PropertyTag};
use crate::mapihttp::stat::Stat;
use crate::mapihttp::wire::Guid;

wire_struct! {
    pub struct BindRequestBody {
        pub flags: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct BindSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub server_guid: Guid = wire,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    #[derive(Default)]
    pub struct UnbindRequestBody {
        pub reserved: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct UnbindSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct CompareMinIdsRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub minimal_id1: u32 = uint32,
        pub minimal_id2: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct CompareMinIdsSuccessResponseBody {
        pub error_code: u32 = uint32,
        /// Negative, zero, or positive as the first Minimal Entry ID sorts
        /// before, equal to, or after the second.
        pub result: i32 = int32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct DnToMinIdRequestBody {
        pub reserved: u32 = uint32,
        /// Distinguished names to map.
        pub names: Option<Vec<String>> = optional(ascii_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct DnToMinIdSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetPropListRequestBody {
        pub flags: u32 = uint32,
        pub minimal_id: u32 = uint32,
        pub code_page: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetPropListSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub property_tags: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ModLinkAttRequestBody {
        /// Bit `0x1` (`fDelete`) removes the entries instead of adding them.
        pub flags: u32 = uint32,
        pub property_tag: PropertyTag = wire,
        pub minimal_id: u32 = uint32,
        pub entry_ids: Option<Vec<Vec<u8>>> = optional(binary_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ModLinkAttSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct QueryColumnsRequestBody {
        pub reserved: u32 = uint32,
        /// `NspiUnicodeProptypes` (`0x80000000`) requests `PtypString`
        /// rather than `PtypString8` columns.
        pub mapi_flags: u32 = uint32,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct QueryColumnsSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub columns: Option<LargePropertyTagArray> = optional(wire),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ResortRestrictionRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct ResortRestrictionSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub minimal_ids: Option<Vec<u32>> = optional(uint32_array),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct UpdateStatRequestBody {
        pub reserved: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub delta_requested: bool = boolean,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct UpdateStatSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub state: Option<Stat> = optional(wire),
        pub delta: Option<i32> = optional(int32),
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetMailboxUrlRequestBody {
        pub flags: u32 = uint32,
        /// DN of the mailbox server.
        pub server_dn: String = unicode,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetMailboxUrlSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub server_url: String = unicode,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetAddressBookUrlRequestBody {
        pub flags: u32 = uint32,
        pub user_dn: String = unicode,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

wire_struct! {
    pub struct GetAddressBookUrlSuccessResponseBody {
        pub error_code: u32 = uint32,
        pub server_url: String = unicode,
        pub auxiliary_buffer: Vec<u8> = aux,
    }
}

request_body!(BindRequestBody, Bind, BindSuccessResponseBody);
request_body!(UnbindRequestBody, Unbind, UnbindSuccessResponseBody);
request_body!(
    CompareMinIdsRequestBody,
    CompareMinIds,
    CompareMinIdsSuccessResponseBody
);
request_body!(DnToMinIdRequestBody, DnToMinId, DnToMinIdSuccessResponseBody);
request_body!(
    GetPropListRequestBody,
    GetPropList,
    GetPropListSuccessResponseBody
);
request_body!(
    ModLinkAttRequestBody,
    ModLinkAtt,
    ModLinkAttSuccessResponseBody
);
request_body!(
    QueryColumnsRequestBody,
    QueryColumns,
    QueryColumnsSuccessResponseBody
);
request_body!(
    ResortRestrictionRequestBody,
    ResortRestriction,
    ResortRestrictionSuccessResponseBody
);
request_body!(
    UpdateStatRequestBody,
    UpdateStat,
    UpdateStatSuccessResponseBody
);
request_body!(
    GetMailboxUrlRequestBody,
    GetMailboxUrl,
    GetMailboxUrlSuccessResponseBody
);
request_body!(
    GetAddressBookUrlRequestBody,
    GetAddressBookUrl,
    GetAddressBookUrlSuccessResponseBody
);

response_body!(BindSuccessResponseBody, Bind, 4 + 4 + 16 + 4);
response_body!(UnbindSuccessResponseBody, Unbind, 4 + 4 + 4);
response_body!(
    CompareMinIdsSuccessResponseBody,
    CompareMinIds,
    4 + 4 + 4 + 4
);
response_body!(DnToMinIdSuccessResponseBody, DnToMinId, 4 + 4 + 1 + 4);
response_body!(GetPropListSuccessResponseBody, GetPropList, 4 + 4 + 1 + 4);
response_body!(ModLinkAttSuccessResponseBody, ModLinkAtt, 4 + 4 + 4);
response_body!(QueryColumnsSuccessResponseBody, QueryColumns, 4 + 4 + 1 + 4);
response_body!(
    ResortRestrictionSuccessResponseBody,
    ResortRestriction,
    4 + 4 + 1 + 1 + 4
);
response_body!(
    UpdateStatSuccessResponseBody,
    UpdateStat,
    4 + 4 + 1 + 1 + 4
);
response_body!(
    GetMailboxUrlSuccessResponseBody,
    GetMailboxUrl,
    4 + 4 + 2 + 4
);
response_body!(
    GetAddressBookUrlSuccessResponseBody,
    GetAddressBookUrl,
    4 + 4 + 2 + 4
);

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::super::strategies::*;
    use super::super::*;
    use super::*;
    use crate::mapihttp::property::PropertyType;
    use crate::mapihttp::wire::DecodeError;

    proptest! {
        #[test]
        fn bind_request_round_trip(
            flags in any::<u32>(),
            state in prop::option::of(arb_stat()),
            auxiliary_buffer in arb_aux(),
        ) {
            let body = BindRequestBody {
                flags,
                state,
                auxiliary_buffer,
            };
            let data = body.serialize().unwrap();
            prop_assert_eq!(
                1 + if body.state.is_some() { Stat::SIZE } else { 0 },
                data.len() - 4 - 4 - body.auxiliary_buffer.len()
            );
            prop_assert_eq!(&body, &BindRequestBody::parse(&data).unwrap());
        }

        #[test]
        fn update_stat_response_round_trip(
            state in prop::option::of(arb_stat()),
            delta in prop::option::of(any::<i32>()),
        ) {
            let body = UpdateStatSuccessResponseBody {
                error_code: 0,
                state,
                delta,
                auxiliary_buffer: vec![],
            };
            prop_assert_eq!(
                &body,
                &UpdateStatSuccessResponseBody::parse(
                    &body.serialize().unwrap()
                ).unwrap()
            );
        }

        #[test]
        fn dn_to_min_id_request_round_trip(
            names in prop::option::of(
                prop::collection::vec("[ -~]{0,30}", 0..5)
            ),
        ) {
            let body = DnToMinIdRequestBody {
                reserved: 0,
                names,
                auxiliary_buffer: vec![],
            };
            prop_assert_eq!(
                &body,
                &DnToMinIdRequestBody::parse(&body.serialize().unwrap())
                    .unwrap()
            );
        }
    }

    proptest! {
        #[test]
        fn unbind_round_trip(
            reserved in any::<u32>(),
            error_code in any::<u32>(),
            auxiliary_buffer in arb_aux(),
        ) {
            let request = UnbindRequestBody {
                reserved,
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            prop_assert_eq!(
                &request,
                &UnbindRequestBody::parse(&request.serialize().unwrap())
                    .unwrap()
            );

            let response = UnbindSuccessResponseBody {
                error_code,
                auxiliary_buffer,
            };
            prop_assert_eq!(
                &response,
                &UnbindSuccessResponseBody::parse(
                    &response.serialize().unwrap()
                ).unwrap()
            );
        }

        #[test]
        fn compare_min_ids_round_trip(
            state in prop::option::of(arb_stat()),
            minimal_id1 in any::<u32>(),
            minimal_id2 in any::<u32>(),
            result in any::<i32>(),
            auxiliary_buffer in arb_aux(),
            flag in 1u8..,
        ) {
            let request = CompareMinIdsRequestBody {
                reserved: 0,
                state,
                minimal_id1,
                minimal_id2,
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            let data = request.serialize().unwrap();
            prop_assert_eq!(
                &request,
                &CompareMinIdsRequestBody::parse(&data).unwrap()
            );
            if request.state.is_some() {
                prop_assert_eq!(
                    &request,
                    &CompareMinIdsRequestBody::parse(
                        &with_flag(&data, 4, flag)
                    ).unwrap()
                );
            } else {
                prop_assert_eq!(0, data[4]);
            }

            let response = CompareMinIdsSuccessResponseBody {
                error_code: 0,
                result,
                auxiliary_buffer,
            };
            prop_assert_eq!(
                &response,
                &CompareMinIdsSuccessResponseBody::parse(
                    &response.serialize().unwrap()
                ).unwrap()
            );
        }

        #[test]
        fn get_prop_list_round_trip(
            flags in any::<u32>(),
            minimal_id in any::<u32>(),
            code_page in any::<u32>(),
            property_tags in prop::option::of(arb_tags()),
            auxiliary_buffer in arb_aux(),
            flag in 1u8..,
        ) {
            let request = GetPropListRequestBody {
                flags,
                minimal_id,
                code_page,
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            prop_assert_eq!(
                &request,
                &GetPropListRequestBody::parse(&request.serialize().unwrap())
                    .unwrap()
            );

            let response = GetPropListSuccessResponseBody {
                error_code: 0,
                property_tags,
                auxiliary_buffer,
            };
            let data = response.serialize().unwrap();
            prop_assert_eq!(
                &response,
                &GetPropListSuccessResponseBody::parse(&data).unwrap()
            );
            if response.property_tags.is_some() {
                prop_assert_eq!(
                    &response,
                    &GetPropListSuccessResponseBody::parse(
                        &with_flag(&data, 8, flag)
                    ).unwrap()
                );
            } else {
                prop_assert_eq!(0, data[8]);
            }
        }

        #[test]
        fn query_columns_round_trip(
            mapi_flags in any::<u32>(),
            columns in prop::option::of(arb_tags()),
            auxiliary_buffer in arb_aux(),
            flag in 1u8..,
        ) {
            let request = QueryColumnsRequestBody {
                reserved: 0,
                mapi_flags,
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            prop_assert_eq!(
                &request,
                &QueryColumnsRequestBody::parse(&request.serialize().unwrap())
                    .unwrap()
            );

            let response = QueryColumnsSuccessResponseBody {
                error_code: 0,
                columns,
                auxiliary_buffer,
            };
            let data = response.serialize().unwrap();
            prop_assert_eq!(
                &response,
                &QueryColumnsSuccessResponseBody::parse(&data).unwrap()
            );
            if response.columns.is_some() {
                prop_assert_eq!(
                    &response,
                    &QueryColumnsSuccessResponseBody::parse(
                        &with_flag(&data, 8, flag)
                    ).unwrap()
                );
            } else {
                prop_assert_eq!(0, data[8]);
            }
        }

        #[test]
        fn resort_restriction_request_round_trip(
            state in prop::option::of(arb_stat()),
            minimal_ids in arb_minimal_ids(),
            auxiliary_buffer in arb_aux(),
            flag in 1u8..,
        ) {
            let body = ResortRestrictionRequestBody {
                reserved: 0,
                state,
                minimal_ids,
                auxiliary_buffer,
            };
            let data = body.serialize().unwrap();
            prop_assert_eq!(
                &body,
                &ResortRestrictionRequestBody::parse(&data).unwrap()
            );

            let ids_flag = 5 + body.state.map_or(0, |_| Stat::SIZE);
            for &(offset, present) in &[
                (4, body.state.is_some()),
                (ids_flag, body.minimal_ids.is_some()),
            ] {
                if present {
                    prop_assert_eq!(
                        &body,
                        &ResortRestrictionRequestBody::parse(
                            &with_flag(&data, offset, flag)
                        ).unwrap()
                    );
                } else {
                    prop_assert_eq!(0, data[offset]);
                }
            }
        }

        #[test]
        fn update_stat_request_round_trip(
            state in prop::option::of(arb_stat()),
            delta_requested in any::<bool>(),
            auxiliary_buffer in arb_aux(),
            flag in 1u8..,
        ) {
            let body = UpdateStatRequestBody {
                reserved: 0,
                state,
                delta_requested,
                auxiliary_buffer,
            };
            let data = body.serialize().unwrap();
            prop_assert_eq!(&body, &UpdateStatRequestBody::parse(&data).unwrap());

            let delta_flag = 5 + body.state.map_or(0, |_| Stat::SIZE);
            prop_assert_eq!(u8::from(delta_requested), data[delta_flag]);
            if body.state.is_some() {
                prop_assert_eq!(
                    &body,
                    &UpdateStatRequestBody::parse(&with_flag(&data, 4, flag))
                        .unwrap()
                );
            } else {
                prop_assert_eq!(0, data[4]);
            }
        }

        #[test]
        fn mod_link_att_response_round_trip(
            error_code in any::<u32>(),
            auxiliary_buffer in arb_aux(),
        ) {
            let body = ModLinkAttSuccessResponseBody {
                error_code,
                auxiliary_buffer,
            };
            prop_assert_eq!(
                &body,
                &ModLinkAttSuccessResponseBody::parse(
                    &body.serialize().unwrap()
                ).unwrap()
            );
        }

        #[test]
        fn url_bodies_round_trip(
            flags in any::<u32>(),
            dn in "\\PC{0,20}",
            server_url in "\\PC{0,40}",
            auxiliary_buffer in arb_aux(),
        ) {
            let request = GetAddressBookUrlRequestBody {
                flags,
                user_dn: dn.clone(),
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            prop_assert_eq!(
                &request,
                &GetAddressBookUrlRequestBody::parse(
                    &request.serialize().unwrap()
                ).unwrap()
            );

            let response = GetAddressBookUrlSuccessResponseBody {
                error_code: 0,
                server_url: server_url.clone(),
                auxiliary_buffer: auxiliary_buffer.clone(),
            };
            prop_assert_eq!(
                &response,
                &GetAddressBookUrlSuccessResponseBody::parse(
                    &response.serialize().unwrap()
                ).unwrap()
            );

            let request = GetMailboxUrlRequestBody {
                flags,
                server_dn: dn,
                auxiliary_buffer,
            };
            prop_assert_eq!(
                &request,
                &GetMailboxUrlRequestBody::parse(
                    &request.serialize().unwrap()
                ).unwrap()
            );
        }
    }

    #[test]
    fn bind_response_layout() {
        let body = BindSuccessResponseBody {
            error_code: 0,
            server_guid: Guid([7; 16]),
            auxiliary_buffer: vec![],
        };
        let data = body.serialize().unwrap();
        assert_eq!(BindSuccessResponseBody::MIN_LEN, data.len());
        assert_eq!([7; 16], data[8..24]);
        assert_eq!(body, BindSuccessResponseBody::parse(&data).unwrap());
    }

    #[test]
    fn nonzero_has_flag_means_present() {
        let mut data = vec![0, 0, 0, 0, 0, 0, 0, 0, 0x80];
        data.extend_from_slice(&[2, 0, 0, 0, 10, 0, 0, 0, 20, 0, 0, 0]);
        data.extend_from_slice(&[0, 0, 0, 0]);
        let body = DnToMinIdSuccessResponseBody::parse(&data).unwrap();
        assert_eq!(Some(vec![10, 20]), body.minimal_ids);

        // Re-serialising normalises the flag
        assert_eq!(1, body.serialize().unwrap()[8]);
    }

    #[test]
    fn absent_state_is_not_a_zero_stat() {
        let data = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let body = ResortRestrictionSuccessResponseBody::parse(&data).unwrap();
        assert_eq!(None, body.state);
        assert_eq!(None, body.minimal_ids);
    }

    #[test]
    fn mod_link_att_layout() {
        let body = ModLinkAttRequestBody {
            flags: 0,
            property_tag: PropertyTag::new(0x8009, PropertyType::MultipleBinary),
            minimal_id: 0x1234,
            entry_ids: Some(vec![vec![1, 2], vec![]]),
            auxiliary_buffer: vec![],
        };
        let data = body.serialize().unwrap();
        assert_eq!(
            vec![
                0, 0, 0, 0, // Flags
                0x02, 0x11, 0x09, 0x80, // PropertyTag
                0x34, 0x12, 0, 0, // MinimalId
                1, // HasEntryIds
                2, 0, 0, 0, // EntryIdCount
                2, 0, 0, 0, 1, 2, // EntryIds[0]
                0, 0, 0, 0, // EntryIds[1]
                0, 0, 0, 0, // AuxiliaryBufferSize
            ],
            data
        );
        assert_eq!(body, ModLinkAttRequestBody::parse(&data).unwrap());
    }

    #[test]
    fn url_bodies() {
        let body = GetMailboxUrlSuccessResponseBody {
            error_code: 0,
            server_url: "https://mail.contoso.com/mapi/emsmdb/?MailboxId=x"
                .to_owned(),
            auxiliary_buffer: vec![],
        };
        assert_eq!(
            body,
            GetMailboxUrlSuccessResponseBody::parse(&body.serialize().unwrap())
                .unwrap()
        );

        // Missing terminator in the URL
        assert_matches!(
            Err(DecodeError::MissingTerminator(8)),
            GetAddressBookUrlSuccessResponseBody::parse(&[
                0, 0, 0, 0, 0, 0, 0, 0, b'h', 0, b't', 0, b'x', 0
            ])
        );
    }
}
