// Builds synthetic FARM files for tests, in either byte order.

use crate::datatype::DataTypeSpec;
use crate::model::{Attribute, Feature, Version};
use crate::reader::ByteOrder;

pub(crate) struct FarmWriter {
    order: ByteOrder,
    data: Vec<u8>,
}

impl FarmWriter {
    pub fn new(order: ByteOrder) -> FarmWriter {
        FarmWriter {
            order,
            data: vec![],
        }
    }

    pub fn finish(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        match self.order {
            ByteOrder::Little => self.data.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.data.extend_from_slice(&value.to_be_bytes()),
        }
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        match self.order {
            ByteOrder::Little => self.data.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.data.extend_from_slice(&value.to_be_bytes()),
        }
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        match self.order {
            ByteOrder::Little => self.data.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => self.data.extend_from_slice(&value.to_be_bytes()),
        }
        self
    }

    /// Writes a length-prefixed string, padded to an even length.
    pub fn string(&mut self, s: &str) -> &mut Self {
        self.string_unpadded(s);
        if s.len() % 2 == 1 {
            self.data.push(0);
        }
        self
    }

    /// Writes a length-prefixed string without the alignment byte.
    pub fn string_unpadded(&mut self, s: &str) -> &mut Self {
        self.u16(s.len() as u16).raw(s.as_bytes())
    }

    /// Writes the byte-order marker and version header.
    pub fn header(&mut self, version: Version) -> &mut Self {
        let marker = self.order.marker();
        self.u16(marker)
            .u16(version.major)
            .u16(version.format)
            .u16(version.update)
    }

    pub fn spec(&mut self, spec: &DataTypeSpec) -> &mut Self {
        match spec {
            DataTypeSpec::NoValue => self.u16(0),
            DataTypeSpec::BoundedInt(b) => {
                self.u16(1).i32(b.offset).i32(b.default).i32(b.min).i32(b.max)
            }
            DataTypeSpec::BoundedFloat(b) => {
                self.u16(2).i32(b.offset).f64(b.default).f64(b.min).f64(b.max)
            }
            DataTypeSpec::StringRef { offset } => self.u16(3).i32(*offset),
            DataTypeSpec::EnumRef(e) => {
                self.u16(4)
                    .i32(e.offset())
                    .i32(e.default().attribute_code)
                    .i32(e.default().enumerant_code)
                    .i32(e.valid_set().len() as i32);
                for value in e.valid_set() {
                    self.i32(value.attribute_code).i32(value.enumerant_code);
                }
                self
            }
            DataTypeSpec::BoolRef { offset, default } => {
                self.u16(5).i32(*offset).i32(*default as i32)
            }
            DataTypeSpec::UuidRef { offset } => self.u16(6).i32(*offset),
        }
    }

    /// Writes a table whose rows list one record per code, in the order of `codes`.
    pub fn table(&mut self, codes: &[u16], rows: &[Vec<DataTypeSpec>]) -> &mut Self {
        self.u16(rows.len() as u16).u16(codes.len() as u16);
        for &code in codes {
            self.u16(code);
        }
        for row in rows {
            assert_eq!(codes.len(), row.len());
            for spec in row {
                self.spec(spec);
            }
        }
        self
    }

    pub fn label_map(&mut self, entries: &[(&str, u16, u16)]) -> &mut Self {
        self.u16(entries.len() as u16);
        for (label, geometry, category) in entries {
            self.string(label).u16(*geometry).u16(*category);
        }
        self
    }

    pub fn category_map(&mut self, entries: &[(u16, Feature)]) -> &mut Self {
        self.u16(entries.len() as u16);
        for (category, feature) in entries {
            self.u16(*category)
                .i32(feature.category)
                .i32(feature.code)
                .i32(feature.geometry as i32)
                .i32(feature.usage_bitmask.bits())
                .i32(feature.precedence)
                .i32(feature.attribute_overlay_size);
        }
        self
    }

    pub fn attribute_map(&mut self, entries: &[(i32, Attribute)]) -> &mut Self {
        self.u16(entries.len() as u16);
        for (code, attribute) in entries {
            self.i32(*code)
                .string(&attribute.label)
                .i32(attribute.code)
                .i32(attribute.data_kind as i32)
                .i32(attribute.units as i32)
                .i32(attribute.editable as i32);
        }
        self
    }
}

pub(crate) fn avenue() -> Feature {
    Feature {
        category: 0,
        code: 7,
        geometry: crate::model::Geometry::Point,
        usage_bitmask: crate::model::UsageFlags(0x1),
        precedence: 3,
        attribute_overlay_size: 16,
    }
}

pub(crate) fn width() -> Attribute {
    Attribute {
        label: String::from("WIDTH"),
        code: 5,
        data_kind: crate::model::DataKind::Int32,
        units: crate::model::Units::Meters,
        editable: true,
    }
}

pub(crate) fn width_spec() -> DataTypeSpec {
    DataTypeSpec::BoundedInt(crate::datatype::Bounded {
        offset: 4,
        default: 10,
        min: 0,
        max: 100,
    })
}

/// A complete version 8.0.0 file: one POINT feature AVENUE (category 0) that may carry the
/// INT32 attribute WIDTH (code 5).
pub(crate) fn avenue_farm(order: ByteOrder) -> Vec<u8> {
    FarmWriter::new(order)
        .header(crate::model::SUPPORTED_VERSION)
        .table(&[5], &[vec![width_spec()]])
        .label_map(&[("AVENUE", 1, 0)])
        .category_map(&[(0, avenue())])
        .attribute_map(&[(5, width())])
        .finish()
}
