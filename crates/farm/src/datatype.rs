// The data-type specification record stored in every cell of the FARM table.
//
// On disk a record is a u16 discriminant followed by a payload whose length depends on the
// discriminant:
//
//   0  NoValue       (nothing)
//   1  BoundedInt    i32 offset, i32 default, i32 min, i32 max
//   2  BoundedFloat  i32 offset, f64 default, f64 min, f64 max
//   3  StringRef     i32 offset
//   4  EnumRef       i32 offset, (i32, i32) default, i32 count, count x (i32, i32)
//   5  BoolRef       i32 offset, i32 default
//   6  UuidRef       i32 offset
//
// The payload length is unknown for any other discriminant, so those cannot be skipped.

use crate::error::{FarmError, Result};
use crate::model::{DataKind, Enumerant};
use crate::reader::{DataReader, Readable};
use itertools::Itertools;
use log::trace;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

impl Readable for Enumerant {
    fn read(reader: &mut DataReader) -> Result<Enumerant> {
        let attribute_code = reader.read_i32()?;
        let enumerant_code = reader.read_i32()?;
        Ok(Enumerant::new(attribute_code, enumerant_code))
    }
}

/// A numeric attribute: where it lives in the overlay, its default, and its legal range.
///
/// The values are kept exactly as stored; nothing checks that min <= default <= max.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bounded<T> {
    /// Byte offset of the value within the feature's attribute overlay.
    pub offset: i32,
    pub default: T,
    pub min: T,
    pub max: T,
}

impl<T: Readable> Bounded<T> {
    fn decode(reader: &mut DataReader) -> Result<Bounded<T>> {
        let offset = reader.read_i32()?;
        let default = reader.read()?;
        let min = reader.read()?;
        let max = reader.read()?;
        Ok(Bounded {
            offset,
            default,
            min,
            max,
        })
    }
}

/// An enumeration attribute. The default is always a member of the valid set.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumSpec {
    offset: i32,
    default: Enumerant,
    valid_set: BTreeSet<Enumerant>,
}

impl EnumSpec {
    /// Builds an enumeration spec, failing if `default` is not in `valid_set`.
    ///
    /// `position` is the byte offset of the record, used only for the error.
    pub fn new(
        offset: i32,
        default: Enumerant,
        valid_set: BTreeSet<Enumerant>,
        position: usize,
    ) -> Result<EnumSpec> {
        if !valid_set.contains(&default) {
            return Err(FarmError::InvalidEnumDefault {
                offset: position,
                default,
            });
        }
        Ok(EnumSpec {
            offset,
            default,
            valid_set,
        })
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn default(&self) -> Enumerant {
        self.default
    }

    pub fn valid_set(&self) -> &BTreeSet<Enumerant> {
        &self.valid_set
    }

    pub fn is_valid(&self, value: &Enumerant) -> bool {
        self.valid_set.contains(value)
    }
}

/// What a feature may store for one attribute, or NoValue if it may not carry it at all.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "dataType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataTypeSpec {
    NoValue,
    BoundedInt(Bounded<i32>),
    BoundedFloat(Bounded<f64>),
    StringRef { offset: i32 },
    EnumRef(EnumSpec),
    BoolRef { offset: i32, default: bool },
    UuidRef { offset: i32 },
}

impl DataTypeSpec {
    /// Decodes one record, consuming exactly its discriminant and payload.
    pub fn decode(reader: &mut DataReader) -> Result<DataTypeSpec> {
        let position = reader.position();
        let discriminant = reader.read_u16()?;
        let spec = match discriminant {
            0 => DataTypeSpec::NoValue,
            1 => DataTypeSpec::BoundedInt(Bounded::<i32>::decode(reader)?),
            2 => DataTypeSpec::BoundedFloat(Bounded::<f64>::decode(reader)?),
            3 => DataTypeSpec::StringRef {
                offset: reader.read_i32()?,
            },
            4 => {
                let offset = reader.read_i32()?;
                let default: Enumerant = reader.read()?;
                let count_position = reader.position();
                let count = reader.read_i32()?;
                if count < 0 {
                    return Err(FarmError::InvalidCount {
                        offset: count_position,
                        found: count,
                    });
                }
                // The default counts as valid whether or not the list repeats it.
                let mut valid_set = BTreeSet::new();
                valid_set.insert(default);
                for _ in 0..count {
                    valid_set.insert(reader.read()?);
                }
                DataTypeSpec::EnumRef(EnumSpec::new(offset, default, valid_set, position)?)
            }
            5 => {
                let offset = reader.read_i32()?;
                let default = reader.read_i32()? != 0;
                DataTypeSpec::BoolRef { offset, default }
            }
            6 => DataTypeSpec::UuidRef {
                offset: reader.read_i32()?,
            },
            _ => {
                return Err(FarmError::UnsupportedDataKind {
                    offset: position,
                    found: discriminant as i32,
                })
            }
        };
        trace!("  data type at {}: {}", position, &spec);
        Ok(spec)
    }

    pub fn kind(&self) -> DataKind {
        match self {
            DataTypeSpec::NoValue => DataKind::NoType,
            DataTypeSpec::BoundedInt(_) => DataKind::Int32,
            DataTypeSpec::BoundedFloat(_) => DataKind::Float64,
            DataTypeSpec::StringRef { .. } => DataKind::String,
            DataTypeSpec::EnumRef(_) => DataKind::Enumeration,
            DataTypeSpec::BoolRef { .. } => DataKind::Boolean,
            DataTypeSpec::UuidRef { .. } => DataKind::Uuid,
        }
    }

    /// Whether the feature may carry this attribute at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, DataTypeSpec::NoValue)
    }

    /// Offset of the value within the attribute overlay, if the attribute is present.
    pub fn overlay_offset(&self) -> Option<i32> {
        match self {
            DataTypeSpec::NoValue => None,
            DataTypeSpec::BoundedInt(b) => Some(b.offset),
            DataTypeSpec::BoundedFloat(b) => Some(b.offset),
            DataTypeSpec::StringRef { offset } => Some(*offset),
            DataTypeSpec::EnumRef(e) => Some(e.offset),
            DataTypeSpec::BoolRef { offset, .. } => Some(*offset),
            DataTypeSpec::UuidRef { offset } => Some(*offset),
        }
    }
}

impl fmt::Display for DataTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataTypeSpec::NoValue => write!(f, "{}", self.kind()),
            DataTypeSpec::BoundedInt(b) => write!(
                f,
                "{} @{} default={} range=[{}, {}]",
                self.kind(),
                b.offset,
                b.default,
                b.min,
                b.max
            ),
            DataTypeSpec::BoundedFloat(b) => write!(
                f,
                "{} @{} default={} range=[{}, {}]",
                self.kind(),
                b.offset,
                b.default,
                b.min,
                b.max
            ),
            DataTypeSpec::EnumRef(e) => write!(
                f,
                "{} @{} default={} valid={{{}}}",
                self.kind(),
                e.offset,
                e.default,
                e.valid_set.iter().join(", ")
            ),
            DataTypeSpec::BoolRef { offset, default } => {
                write!(f, "{} @{} default={}", self.kind(), offset, default)
            }
            DataTypeSpec::StringRef { offset } | DataTypeSpec::UuidRef { offset } => {
                write!(f, "{} @{}", self.kind(), offset)
            }
        }
    }
}

#[cfg(test)]
mod datatype_tests {
    use super::*;
    use crate::reader::ByteOrder;

    fn decode_le(data: &[u8]) -> Result<(DataTypeSpec, usize)> {
        let mut reader = DataReader::new(data);
        let spec = DataTypeSpec::decode(&mut reader)?;
        Ok((spec, reader.position()))
    }

    #[test]
    fn no_value_has_no_payload() {
        let (spec, used) = decode_le(&[0, 0, 0xaa, 0xbb]).unwrap();
        assert_eq!(DataTypeSpec::NoValue, spec);
        assert_eq!(2, used);
        assert!(!spec.is_present());
        assert_eq!(None, spec.overlay_offset());
    }

    #[test]
    fn bounded_int() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            1, 0,  // discriminant: Int32
            4, 0, 0, 0,  // offset
            10, 0, 0, 0,  // default
            0, 0, 0, 0,  // min
            100, 0, 0, 0,  // max
        ];
        let (spec, used) = decode_le(&data).unwrap();
        assert_eq!(18, used);
        assert_eq!(
            DataTypeSpec::BoundedInt(Bounded {
                offset: 4,
                default: 10,
                min: 0,
                max: 100
            }),
            spec
        );
        assert_eq!(DataKind::Int32, spec.kind());
        assert_eq!("INT32 @4 default=10 range=[0, 100]", spec.to_string());
    }

    #[test]
    fn bounded_float_big_endian_out_of_range_default_is_kept() {
        let mut data = vec![0, 2];
        data.extend_from_slice(&8i32.to_be_bytes());
        data.extend_from_slice(&500.0f64.to_be_bytes());
        data.extend_from_slice(&(-1.5f64).to_be_bytes());
        data.extend_from_slice(&1.5f64.to_be_bytes());
        let mut reader = DataReader::new(&data);
        reader.set_byte_order(ByteOrder::Big);
        let spec = DataTypeSpec::decode(&mut reader).unwrap();
        assert!(reader.done());
        assert_eq!(
            DataTypeSpec::BoundedFloat(Bounded {
                offset: 8,
                default: 500.0,
                min: -1.5,
                max: 1.5
            }),
            spec
        );
    }

    #[test]
    fn offset_only_variants() {
        let (spec, used) = decode_le(&[3, 0, 12, 0, 0, 0]).unwrap();
        assert_eq!(DataTypeSpec::StringRef { offset: 12 }, spec);
        assert_eq!(6, used);
        let (spec, _) = decode_le(&[6, 0, 16, 0, 0, 0]).unwrap();
        assert_eq!(DataTypeSpec::UuidRef { offset: 16 }, spec);
        assert_eq!(Some(16), spec.overlay_offset());
    }

    #[test]
    fn bool_default() {
        let (spec, used) = decode_le(&[5, 0, 2, 0, 0, 0, 7, 0, 0, 0]).unwrap();
        assert_eq!(10, used);
        assert_eq!(
            DataTypeSpec::BoolRef {
                offset: 2,
                default: true
            },
            spec
        );
        let (spec, _) = decode_le(&[5, 0, 2, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(
            DataTypeSpec::BoolRef {
                offset: 2,
                default: false
            },
            spec
        );
    }

    #[test]
    fn enum_default_is_always_valid() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            4, 0,  // discriminant: Enumeration
            20, 0, 0, 0,  // offset
            9, 0, 0, 0, 1, 0, 0, 0,  // default (9, 1)
            2, 0, 0, 0,  // two more
            9, 0, 0, 0, 2, 0, 0, 0,
            9, 0, 0, 0, 3, 0, 0, 0,
        ];
        let (spec, used) = decode_le(&data).unwrap();
        assert_eq!(data.len(), used);
        match spec {
            DataTypeSpec::EnumRef(e) => {
                assert_eq!(20, e.offset());
                assert_eq!(Enumerant::new(9, 1), e.default());
                assert_eq!(3, e.valid_set().len());
                assert!(e.is_valid(&e.default()));
                assert!(e.is_valid(&Enumerant::new(9, 3)));
            }
            other => panic!("expected EnumRef, got {:?}", other),
        }
    }

    #[test]
    fn enum_default_listed_twice_is_not_duplicated() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            4, 0,
            0, 0, 0, 0,
            9, 0, 0, 0, 1, 0, 0, 0,  // default (9, 1)
            2, 0, 0, 0,
            9, 0, 0, 0, 1, 0, 0, 0,  // the default again
            9, 0, 0, 0, 2, 0, 0, 0,
        ];
        let (spec, _) = decode_le(&data).unwrap();
        match spec {
            DataTypeSpec::EnumRef(e) => {
                let codes: Vec<i32> = e.valid_set().iter().map(|v| v.enumerant_code).collect();
                assert_eq!(vec![1, 2], codes);
            }
            other => panic!("expected EnumRef, got {:?}", other),
        }
    }

    #[test]
    fn enum_with_empty_list_contains_only_default() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            4, 0,
            0, 0, 0, 0,
            3, 0, 0, 0, 4, 0, 0, 0,
            0, 0, 0, 0,
        ];
        let (spec, _) = decode_le(&data).unwrap();
        assert_eq!("ENUMERATION @0 default=(3, 4) valid={(3, 4)}", spec.to_string());
    }

    #[test]
    fn enum_spec_rejects_default_outside_valid_set() {
        let valid: BTreeSet<Enumerant> = [Enumerant::new(1, 1), Enumerant::new(1, 2)]
            .into_iter()
            .collect();
        match EnumSpec::new(0, Enumerant::new(1, 3), valid.clone(), 42) {
            Err(FarmError::InvalidEnumDefault { offset, default }) => {
                assert_eq!(42, offset);
                assert_eq!(Enumerant::new(1, 3), default);
            }
            other => panic!("expected InvalidEnumDefault, got {:?}", other),
        }
        assert!(EnumSpec::new(0, Enumerant::new(1, 2), valid, 0).is_ok());
    }

    #[test]
    fn enum_negative_count() {
        #[rustfmt::skip]
        let data: Vec<u8> = vec![
            4, 0,
            0, 0, 0, 0,
            1, 0, 0, 0, 1, 0, 0, 0,
            0xff, 0xff, 0xff, 0xff,  // -1
        ];
        assert!(matches!(
            decode_le(&data),
            Err(FarmError::InvalidCount {
                offset: 14,
                found: -1
            })
        ));
    }

    #[test]
    fn unsupported_discriminants() {
        for disc in [7u8, 8, 0xff] {
            match decode_le(&[disc, 0, 0, 0, 0, 0]) {
                Err(FarmError::UnsupportedDataKind { offset, found }) => {
                    assert_eq!(0, offset);
                    assert_eq!(disc as i32, found);
                }
                other => panic!("expected UnsupportedDataKind, got {:?}", other),
            }
        }
    }

    #[test]
    fn truncated_payload() {
        assert!(matches!(
            decode_le(&[1, 0, 4, 0, 0, 0, 10, 0]),
            Err(FarmError::UnexpectedEof { offset: 6, .. })
        ));
    }
}
