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

//! Restrictions, as carried by the `Filter` of a GetMatches request.
//!
//! This is the MS-OXCDATA restriction structure in its 32-bit-count form,
//! with property values encoded as address book tagged values.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use super::property::PropertyTag;
use super::row::AddressBookTaggedPropertyValue;
use super::wire::*;

/// Restrictions deeper than this are rejected rather than recursed into.
const MAX_DEPTH: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Relop {
    LessThan = 0x00,
    LessThanOrEqual = 0x01,
    GreaterThan = 0x02,
    GreaterThanOrEqual = 0x03,
    Equal = 0x04,
    NotEqual = 0x05,
    Like = 0x06,
    MemberOfDistributionList = 0x64,
}

impl Relop {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(match d.u8()? {
            0x00 => Relop::LessThan,
            0x01 => Relop::LessThanOrEqual,
            0x02 => Relop::GreaterThan,
            0x03 => Relop::GreaterThanOrEqual,
            0x04 => Relop::Equal,
            0x05 => Relop::NotEqual,
            0x06 => Relop::Like,
            0x64 => Relop::MemberOfDistributionList,
            other => return Err(DecodeError::BadRelop(other)),
        })
    }
}

/// Fuzzy-level flags of a content restriction.
pub mod fuzzy {
    pub const FULL_STRING: u16 = 0x0000;
    pub const SUBSTRING: u16 = 0x0001;
    pub const PREFIX: u16 = 0x0002;

    pub const IGNORE_CASE: u16 = 0x0001;
    pub const IGNORE_NON_SPACE: u16 = 0x0002;
    pub const LOOSE: u16 = 0x0004;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Restriction {
    And(Vec<Restriction>),
    Or(Vec<Restriction>),
    Not(Box<Restriction>),
    Content {
        fuzzy_low: u16,
        fuzzy_high: u16,
        property_tag: PropertyTag,
        value: AddressBookTaggedPropertyValue,
    },
    Property {
        relop: Relop,
        property_tag: PropertyTag,
        value: AddressBookTaggedPropertyValue,
    },
    CompareProperties {
        relop: Relop,
        property_tag1: PropertyTag,
        property_tag2: PropertyTag,
    },
    Bitmask {
        /// `true` for `BMR_NEZ`, `false` for `BMR_EQZ`.
        nonzero: bool,
        property_tag: PropertyTag,
        mask: u32,
    },
    Size {
        relop: Relop,
        property_tag: PropertyTag,
        size: u32,
    },
    Exist {
        property_tag: PropertyTag,
    },
    SubObject {
        subobject: PropertyTag,
        restriction: Box<Restriction>,
    },
    Comment {
        values: Vec<AddressBookTaggedPropertyValue>,
        restriction: Option<Box<Restriction>>,
    },
    Count {
        count: u32,
        restriction: Box<Restriction>,
    },
}

const AND: u8 = 0x00;
const OR: u8 = 0x01;
const NOT: u8 = 0x02;
const CONTENT: u8 = 0x03;
const PROPERTY: u8 = 0x04;
const COMPARE_PROPERTIES: u8 = 0x05;
const BITMASK: u8 = 0x06;
const SIZE: u8 = 0x07;
const EXIST: u8 = 0x08;
const SUB_OBJECT: u8 = 0x09;
const COMMENT: u8 = 0x0A;
const COUNT: u8 = 0x0B;

impl Restriction {
    /// A prefix match on `PidTagDisplayName`, the usual ambiguous name
    /// resolution filter.
    pub fn display_name_prefix(prefix: &str) -> Self {
        Restriction::Content {
            fuzzy_low: fuzzy::PREFIX,
            fuzzy_high: fuzzy::IGNORE_CASE,
            property_tag: PropertyTag::DISPLAY_NAME,
            value: AddressBookTaggedPropertyValue::new(
                PropertyTag::DISPLAY_NAME.property_id,
                super::property::PropertyValue::String(prefix.to_owned()),
            ),
        }
    }

    fn decode_at(
        d: &mut Decoder<'_>,
        depth: u32,
    ) -> Result<Self, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::RestrictionTooDeep);
        }

        let sub = |d: &mut Decoder<'_>| -> Result<Box<Restriction>, DecodeError> {
            Restriction::decode_at(d, depth + 1).map(Box::new)
        };

        Ok(match d.u8()? {
            t @ AND | t @ OR => {
                let count = d.count(1)?;
                let children = (0..count)
                    .map(|_| Restriction::decode_at(d, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                if AND == t {
                    Restriction::And(children)
                } else {
                    Restriction::Or(children)
                }
            }
            NOT => Restriction::Not(sub(d)?),
            CONTENT => Restriction::Content {
                fuzzy_low: d.u16()?,
                fuzzy_high: d.u16()?,
                property_tag: PropertyTag::decode(d)?,
                value: AddressBookTaggedPropertyValue::decode(d)?,
            },
            PROPERTY => Restriction::Property {
                relop: Relop::decode(d)?,
                property_tag: PropertyTag::decode(d)?,
                value: AddressBookTaggedPropertyValue::decode(d)?,
            },
            COMPARE_PROPERTIES => Restriction::CompareProperties {
                relop: Relop::decode(d)?,
                property_tag1: PropertyTag::decode(d)?,
                property_tag2: PropertyTag::decode(d)?,
            },
            BITMASK => Restriction::Bitmask {
                nonzero: match d.u8()? {
                    0 => false,
                    1 => true,
                    other => return Err(DecodeError::BadRelop(other)),
                },
                property_tag: PropertyTag::decode(d)?,
                mask: d.u32()?,
            },
            SIZE => Restriction::Size {
                relop: Relop::decode(d)?,
                property_tag: PropertyTag::decode(d)?,
                size: d.u32()?,
            },
            EXIST => Restriction::Exist {
                property_tag: PropertyTag::decode(d)?,
            },
            SUB_OBJECT => Restriction::SubObject {
                subobject: PropertyTag::decode(d)?,
                restriction: sub(d)?,
            },
            COMMENT => {
                let count = d.u8()?;
                let values = (0..count)
                    .map(|_| AddressBookTaggedPropertyValue::decode(d))
                    .collect::<Result<Vec<_>, _>>()?;
                let restriction = read_optional(d, sub)?;
                Restriction::Comment {
                    values,
                    restriction,
                }
            }
            COUNT => Restriction::Count {
                count: d.u32()?,
                restriction: sub(d)?,
            },
            other => return Err(DecodeError::UnsupportedRestriction(other)),
        })
    }
}

impl Wire for Restriction {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Restriction::decode_at(d, 0)
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match *self {
            Restriction::And(ref children) | Restriction::Or(ref children) => {
                w.write_u8(if let Restriction::And(..) = *self {
                    AND
                } else {
                    OR
                })?;
                write_count(w, children.len())?;
                children.iter().try_for_each(|c| c.encode(w))
            }
            Restriction::Not(ref r) => {
                w.write_u8(NOT)?;
                r.encode(w)
            }
            Restriction::Content {
                fuzzy_low,
                fuzzy_high,
                property_tag,
                ref value,
            } => {
                w.write_u8(CONTENT)?;
                w.write_u16::<LittleEndian>(fuzzy_low)?;
                w.write_u16::<LittleEndian>(fuzzy_high)?;
                property_tag.encode(w)?;
                value.encode(w)
            }
            Restriction::Property {
                relop,
                property_tag,
                ref value,
            } => {
                w.write_u8(PROPERTY)?;
                w.write_u8(relop as u8)?;
                property_tag.encode(w)?;
                value.encode(w)
            }
            Restriction::CompareProperties {
                relop,
                property_tag1,
                property_tag2,
            } => {
                w.write_u8(COMPARE_PROPERTIES)?;
                w.write_u8(relop as u8)?;
                property_tag1.encode(w)?;
                property_tag2.encode(w)
            }
            Restriction::Bitmask {
                nonzero,
                property_tag,
                mask,
            } => {
                w.write_u8(BITMASK)?;
                w.write_u8(nonzero as u8)?;
                property_tag.encode(w)?;
                w.write_u32::<LittleEndian>(mask)
            }
            Restriction::Size {
                relop,
                property_tag,
                size,
            } => {
                w.write_u8(SIZE)?;
                w.write_u8(relop as u8)?;
                property_tag.encode(w)?;
                w.write_u32::<LittleEndian>(size)
            }
            Restriction::Exist { property_tag } => {
                w.write_u8(EXIST)?;
                property_tag.encode(w)
            }
            Restriction::SubObject {
                subobject,
                ref restriction,
            } => {
                w.write_u8(SUB_OBJECT)?;
                subobject.encode(w)?;
                restriction.encode(w)
            }
            Restriction::Comment {
                ref values,
                ref restriction,
            } => {
                if values.len() > u8::MAX as usize {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Too many values in comment restriction",
                    ));
                }

                w.write_u8(COMMENT)?;
                w.write_u8(values.len() as u8)?;
                values.iter().try_for_each(|v| v.encode(w))?;
                write_optional(w, restriction.as_deref(), |w, r| r.encode(w))
            }
            Restriction::Count {
                count,
                ref restriction,
            } => {
                w.write_u8(COUNT)?;
                w.write_u32::<LittleEndian>(count)?;
                restriction.encode(w)
            }
        }
    }
}
