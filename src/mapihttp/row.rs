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

//! Address book property values and the rows built out of them.
//!
//! Neither a value nor a row is self-describing: the property type (for
//! values) or the column set (for rows) comes from elsewhere in the enclosing
//! body, so these types have explicit `decode`/`encode` functions taking that
//! context instead of implementing `Wire`.

use std::io::{self, Write};

use byteorder::WriteBytesExt;

use super::property::*;
use super::wire::*;

const HAS_VALUE: u8 = 0xFF;
const NO_VALUE: u8 = 0x00;

/// A property value which may be absent if its type carries a `HasValue`
/// discriminator.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressBookPropertyValue {
    pub property_type: PropertyType,
    /// Always `Some` for types without a `HasValue` discriminator.
    pub value: Option<PropertyValue>,
}

impl AddressBookPropertyValue {
    pub fn new(value: PropertyValue) -> Self {
        AddressBookPropertyValue {
            property_type: value.property_type(),
            value: Some(value),
        }
    }

    pub fn absent(property_type: PropertyType) -> Self {
        AddressBookPropertyValue {
            property_type,
            value: None,
        }
    }

    pub fn decode(
        d: &mut Decoder<'_>,
        property_type: PropertyType,
    ) -> Result<Self, DecodeError> {
        let value = if property_type.has_value_discriminator() {
            match d.u8()? {
                HAS_VALUE => Some(PropertyValue::decode(d, property_type)?),
                NO_VALUE => None,
                other => return Err(DecodeError::BadHasValue(other)),
            }
        } else {
            Some(PropertyValue::decode(d, property_type)?)
        };

        Ok(AddressBookPropertyValue {
            property_type,
            value,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if let Some(ref value) = self.value {
            if value.property_type() != self.property_type {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{:?} value declared as {:?}",
                        value.property_type(),
                        self.property_type
                    ),
                ));
            }
        }

        if self.property_type.has_value_discriminator() {
            match self.value {
                Some(ref value) => {
                    w.write_u8(HAS_VALUE)?;
                    value.encode(w)
                }
                None => w.write_u8(NO_VALUE),
            }
        } else {
            match self.value {
                Some(ref value) => value.encode(w),
                None => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{:?} values cannot be absent",
                        self.property_type
                    ),
                )),
            }
        }
    }

    /// Decode a cell of a column declared as `column_type`.
    ///
    /// Cells of `PtypUnspecified` columns are typed values, i.e., carry their
    /// own type prefix.
    pub fn decode_cell(
        d: &mut Decoder<'_>,
        column_type: PropertyType,
    ) -> Result<Self, DecodeError> {
        if PropertyType::Unspecified == column_type {
            AddressBookTypedPropertyValue::decode(d).map(|v| v.0)
        } else {
            Self::decode(d, column_type)
        }
    }

    pub fn encode_cell<W: Write>(
        &self,
        w: &mut W,
        column_type: PropertyType,
    ) -> io::Result<()> {
        if PropertyType::Unspecified == column_type {
            self.property_type.encode(w)?;
        } else if column_type != self.property_type {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{:?} cell in {:?} column",
                    self.property_type, column_type
                ),
            ));
        }

        self.encode(w)
    }
}

/// A property value preceded by its 16-bit property type.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressBookTypedPropertyValue(pub AddressBookPropertyValue);

impl Wire for AddressBookTypedPropertyValue {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let property_type = PropertyType::decode(d)?;
        if PropertyType::Unspecified == property_type {
            return Err(DecodeError::UnsupportedPropertyType(0));
        }

        AddressBookPropertyValue::decode(d, property_type)
            .map(AddressBookTypedPropertyValue)
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.0.property_type.encode(w)?;
        self.0.encode(w)
    }
}

/// A property value preceded by its full property tag.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressBookTaggedPropertyValue {
    pub property_tag: PropertyTag,
    pub value: AddressBookPropertyValue,
}

impl AddressBookTaggedPropertyValue {
    pub fn new(property_id: u16, value: PropertyValue) -> Self {
        let value = AddressBookPropertyValue::new(value);
        AddressBookTaggedPropertyValue {
            property_tag: PropertyTag::new(property_id, value.property_type),
            value,
        }
    }
}

impl Wire for AddressBookTaggedPropertyValue {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let property_tag = PropertyTag::decode(d)?;
        if PropertyType::Unspecified == property_tag.property_type {
            return Err(DecodeError::UnsupportedPropertyType(0));
        }

        let value =
            AddressBookPropertyValue::decode(d, property_tag.property_type)?;
        Ok(AddressBookTaggedPropertyValue {
            property_tag,
            value,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.property_tag.encode(w)?;
        self.value.encode_cell(w, self.property_tag.property_type)
    }
}

const FLAG_VALUE: u8 = 0x0;
const FLAG_NOT_AVAILABLE: u8 = 0x1;
const FLAG_ERROR: u8 = 0xA;

/// A cell of a flagged row.
#[derive(Clone, Debug, PartialEq)]
pub enum AddressBookFlaggedPropertyValue {
    /// Flag `0x0`: a value of the column type follows.
    Value(AddressBookPropertyValue),
    /// Flag `0x1`: nothing follows.
    NotAvailable,
    /// Flag `0xA`: a `PtypErrorCode` follows.
    Error(u32),
}

impl AddressBookFlaggedPropertyValue {
    pub fn decode(
        d: &mut Decoder<'_>,
        column_type: PropertyType,
    ) -> Result<Self, DecodeError> {
        match d.u8()? {
            FLAG_VALUE => AddressBookPropertyValue::decode_cell(d, column_type)
                .map(AddressBookFlaggedPropertyValue::Value),
            FLAG_NOT_AVAILABLE => {
                Ok(AddressBookFlaggedPropertyValue::NotAvailable)
            }
            FLAG_ERROR => Ok(AddressBookFlaggedPropertyValue::Error(d.u32()?)),
            other => Err(DecodeError::BadPropertyFlag(other)),
        }
    }

    pub fn encode<W: Write>(
        &self,
        w: &mut W,
        column_type: PropertyType,
    ) -> io::Result<()> {
        match *self {
            AddressBookFlaggedPropertyValue::Value(ref v) => {
                w.write_u8(FLAG_VALUE)?;
                v.encode_cell(w, column_type)
            }
            AddressBookFlaggedPropertyValue::NotAvailable => {
                w.write_u8(FLAG_NOT_AVAILABLE)
            }
            AddressBookFlaggedPropertyValue::Error(code) => {
                w.write_u8(FLAG_ERROR)?;
                PropertyValue::ErrorCode(code).encode(w)
            }
        }
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        match *self {
            AddressBookFlaggedPropertyValue::Value(ref v) => v.value.as_ref(),
            _ => None,
        }
    }
}

/// One row of a table; the number of cells is the number of columns.
#[derive(Clone, Debug, PartialEq)]
pub enum AddressBookPropertyRow {
    /// `Flag == 0`: every cell is a plain value.
    Standard(Vec<AddressBookPropertyValue>),
    /// `Flag != 0`: every cell is a flagged value.
    Flagged(Vec<AddressBookFlaggedPropertyValue>),
}

impl AddressBookPropertyRow {
    pub fn decode(
        d: &mut Decoder<'_>,
        columns: &[PropertyTag],
    ) -> Result<Self, DecodeError> {
        if 0 == d.u8()? {
            columns
                .iter()
                .map(|c| {
                    AddressBookPropertyValue::decode_cell(d, c.property_type)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AddressBookPropertyRow::Standard)
        } else {
            columns
                .iter()
                .map(|c| {
                    AddressBookFlaggedPropertyValue::decode(d, c.property_type)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AddressBookPropertyRow::Flagged)
        }
    }

    pub fn encode<W: Write>(
        &self,
        w: &mut W,
        columns: &[PropertyTag],
    ) -> io::Result<()> {
        if self.len() != columns.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Row has {} cells but there are {} columns",
                    self.len(),
                    columns.len()
                ),
            ));
        }

        match *self {
            AddressBookPropertyRow::Standard(ref cells) => {
                w.write_u8(0)?;
                for (cell, column) in cells.iter().zip(columns) {
                    cell.encode_cell(w, column.property_type)?;
                }
            }
            AddressBookPropertyRow::Flagged(ref cells) => {
                w.write_u8(1)?;
                for (cell, column) in cells.iter().zip(columns) {
                    cell.encode(w, column.property_type)?;
                }
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        match *self {
            AddressBookPropertyRow::Standard(ref c) => c.len(),
            AddressBookPropertyRow::Flagged(ref c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// The value of cell `ix`, if it has one.
    pub fn get(&self, ix: usize) -> Option<&PropertyValue> {
        match *self {
            AddressBookPropertyRow::Standard(ref c) => {
                c.get(ix).and_then(|v| v.value.as_ref())
            }
            AddressBookPropertyRow::Flagged(ref c) => {
                c.get(ix).and_then(|v| v.value())
            }
        }
    }
}

/// A 32-bit count followed by tagged property values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddressBookPropertyValueList(
    pub Vec<AddressBookTaggedPropertyValue>,
);

impl AddressBookPropertyValueList {
    pub fn get(&self, tag: PropertyTag) -> Option<&PropertyValue> {
        self.0
            .iter()
            .find(|v| v.property_tag == tag)
            .and_then(|v| v.value.value.as_ref())
    }
}

impl Wire for AddressBookPropertyValueList {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let count = d.count(4)?;
        (0..count)
            .map(|_| AddressBookTaggedPropertyValue::decode(d))
            .collect::<Result<Vec<_>, _>>()
            .map(AddressBookPropertyValueList)
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_count(w, self.0.len())?;
        self.0.iter().try_for_each(|v| v.encode(w))
    }
}

/// A column set followed by `RowCount` rows using those columns.
///
/// This is the group gated by `HasColumnsAndRows` in several responses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnsAndRows {
    pub columns: LargePropertyTagArray,
    pub rows: Vec<AddressBookPropertyRow>,
}

impl Wire for ColumnsAndRows {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let columns = LargePropertyTagArray::decode(d)?;
        let row_count = d.count(1)?;
        let rows = (0..row_count)
            .map(|_| AddressBookPropertyRow::decode(d, &columns.0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ColumnsAndRows { columns, rows })
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.columns.encode(w)?;
        write_count(w, self.rows.len())?;
        self.rows
            .iter()
            .try_for_each(|row| row.encode(w, &self.columns.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_all<T>(
        data: &[u8],
        f: impl FnOnce(&mut Decoder<'_>) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let mut d = Decoder::new(data);
        let v = f(&mut d)?;
        d.finish()?;
        Ok(v)
    }

    #[test]
    fn has_value_discriminator() {
        assert_eq!(
            AddressBookPropertyValue::new(PropertyValue::String(
                "x".to_owned()
            )),
            decode_all(&[0xFF, b'x', 0, 0, 0], |d| {
                AddressBookPropertyValue::decode(d, PropertyType::String)
            })
            .unwrap()
        );
        assert_eq!(
            AddressBookPropertyValue::absent(PropertyType::Binary),
            decode_all(&[0x00], |d| {
                AddressBookPropertyValue::decode(d, PropertyType::Binary)
            })
            .unwrap()
        );
        assert_matches!(
            Err(DecodeError::BadHasValue(0x01)),
            decode_all(&[0x01, 0, 0, 0, 0], |d| {
                AddressBookPropertyValue::decode(d, PropertyType::Binary)
            })
        );
        // Fixed-width types have no discriminator at all
        assert_eq!(
            AddressBookPropertyValue::new(PropertyValue::Integer32(-1)),
            decode_all(&[0xFF; 4], |d| {
                AddressBookPropertyValue::decode(d, PropertyType::Integer32)
            })
            .unwrap()
        );
    }

    #[test]
    fn absent_fixed_width_value_cannot_be_encoded() {
        assert!(AddressBookPropertyValue::absent(PropertyType::Integer32)
            .encode(&mut Vec::new())
            .is_err());
    }

    #[test]
    fn flagged_values() {
        let columns = [
            PropertyTag::DISPLAY_NAME,
            PropertyTag::OBJECT_TYPE,
            PropertyTag::new(0x1234, PropertyType::Unspecified),
        ];
        let data = [
            0x01, // Row flag
            0x00, 0xFF, b'a', 0, 0, 0, // Value
            0x0A, 0x0F, 0x01, 0x04, 0x80, // Error
            0x00, 0x03, 0x00, 7, 0, 0, 0, // Typed value
        ];
        let row = decode_all(&data, |d| {
            AddressBookPropertyRow::decode(d, &columns)
        })
        .unwrap();
        assert_eq!(
            AddressBookPropertyRow::Flagged(vec![
                AddressBookFlaggedPropertyValue::Value(
                    AddressBookPropertyValue::new(PropertyValue::String(
                        "a".to_owned()
                    ))
                ),
                AddressBookFlaggedPropertyValue::Error(0x8004_010F),
                AddressBookFlaggedPropertyValue::Value(
                    AddressBookPropertyValue::new(PropertyValue::Integer32(7))
                ),
            ]),
            row
        );
        assert_eq!(Some(&PropertyValue::Integer32(7)), row.get(2));
        assert_eq!(None, row.get(1));

        let mut out = Vec::new();
        row.encode(&mut out, &columns).unwrap();
        assert_eq!(data.to_vec(), out);
    }

    #[test]
    fn unknown_flag_rejected() {
        assert_matches!(
            Err(DecodeError::BadPropertyFlag(0x02)),
            decode_all(&[0x01, 0x02], |d| {
                AddressBookPropertyRow::decode(d, &[PropertyTag::OBJECT_TYPE])
            })
        );
    }

    #[test]
    fn not_available_consumes_nothing_more() {
        let row = decode_all(&[0x01, 0x01, 0x01], |d| {
            AddressBookPropertyRow::decode(
                d,
                &[PropertyTag::DISPLAY_NAME, PropertyTag::OBJECT_TYPE],
            )
        })
        .unwrap();
        assert_eq!(2, row.len());
        assert_eq!(None, row.get(0));
    }

    #[test]
    fn row_width_must_match_columns() {
        let row = AddressBookPropertyRow::Standard(vec![]);
        assert!(row
            .encode(&mut Vec::new(), &[PropertyTag::OBJECT_TYPE])
            .is_err());
    }

    #[test]
    fn value_list_lookup() {
        let list = AddressBookPropertyValueList(vec![
            AddressBookTaggedPropertyValue::new(
                0x3001,
                PropertyValue::String("Administrator".to_owned()),
            ),
            AddressBookTaggedPropertyValue::new(
                0x0FFE,
                PropertyValue::Integer32(6),
            ),
        ]);
        let mut out = Vec::new();
        list.encode(&mut out).unwrap();
        let parsed =
            decode_all(&out, AddressBookPropertyValueList::decode).unwrap();
        assert_eq!(list, parsed);
        assert_eq!(
            Some("Administrator"),
            parsed.get(PropertyTag::DISPLAY_NAME).and_then(|v| v.as_str())
        );
        assert_eq!(
            Some(&PropertyValue::Integer32(6)),
            parsed.get(PropertyTag::OBJECT_TYPE)
        );
    }
}
