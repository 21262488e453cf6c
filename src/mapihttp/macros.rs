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

//! Declarative definitions of fixed-layout wire structures.
//!
//! ```ignore
//! wire_struct! {
//!     pub struct Example {
//!         pub flags: u32 = uint32,
//!         pub state: Option<Stat> = optional(wire),
//!         pub auxiliary_buffer: Vec<u8> = aux,
//!     }
//! }
//! ```
//!
//! Fields are read and written in declaration order. The name after `=` is a
//! submodule of `forms`; `optional(form)` prefixes the field with a `Has*`
//! flag byte.

macro_rules! wire_field {
    (decode $d:ident, optional($inner:ident)) => {
        $crate::mapihttp::wire::read_optional(
            $d,
            $crate::mapihttp::forms::$inner::decode,
        )?
    };
    (decode $d:ident, $form:ident) => {
        $crate::mapihttp::forms::$form::decode($d)?
    };
    (encode $w:ident, $v:expr, optional($inner:ident)) => {
        $crate::mapihttp::wire::write_optional(
            $w,
            ($v).as_ref(),
            $crate::mapihttp::forms::$inner::encode,
        )?
    };
    (encode $w:ident, $v:expr, $form:ident) => {
        $crate::mapihttp::forms::$form::encode($w, $v)?
    };
}

macro_rules! wire_struct {
    ($(#[$meta:meta])*
     pub struct $name:ident {
         $($(#[$fmeta:meta])*
           pub $field:ident: $ty:ty = $form:ident $(($inner:ident))?,)*
     }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            $($(#[$fmeta])* pub $field: $ty,)*
        }

        impl $crate::mapihttp::wire::Wire for $name {
            #[allow(unused_variables)]
            fn decode(
                d: &mut $crate::mapihttp::wire::Decoder<'_>,
            ) -> Result<Self, $crate::mapihttp::wire::DecodeError> {
                Ok($name {
                    $($field: wire_field!(decode d, $form $(($inner))?),)*
                })
            }

            #[allow(unused_variables)]
            fn encode<W: std::io::Write>(
                &self,
                w: &mut W,
            ) -> std::io::Result<()> {
                $(wire_field!(encode w, &self.$field, $form $(($inner))?);)*
                Ok(())
            }
        }
    };
}
