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

wire_struct! {
    /// The `STAT` structure: the client's position in an address book table.
    #[derive(Copy, Default, Eq)]
    pub struct Stat {
        pub sort_type: u32 = uint32,
        pub container_id: u32 = uint32,
        pub current_record: u32 = uint32,
        pub delta: i32 = int32,
        pub num_position: u32 = uint32,
        pub total_records: u32 = uint32,
        pub code_page: u32 = uint32,
        pub template_locale: u32 = uint32,
        pub sort_locale: u32 = uint32,
    }
}

impl Stat {
    pub const SIZE: usize = 36;

    pub const SORT_TYPE_DISPLAY_NAME: u32 = 0x0000_0000;
    pub const SORT_TYPE_PHONETIC_DISPLAY_NAME: u32 = 0x0000_0003;

    /// `MID_BEGINNING_OF_TABLE`
    pub const BEGINNING_OF_TABLE: u32 = 0x0000_0000;
    /// `MID_END_OF_TABLE`
    pub const END_OF_TABLE: u32 = 0x0000_0002;

    /// A `STAT` positioned at the start of the Global Address List.
    pub fn beginning(code_page: u32, locale: u32) -> Self {
        Stat {
            sort_type: Self::SORT_TYPE_DISPLAY_NAME,
            container_id: 0,
            current_record: Self::BEGINNING_OF_TABLE,
            delta: 0,
            num_position: 0,
            total_records: 0,
            code_page,
            template_locale: locale,
            sort_locale: locale,
        }
    }
}
