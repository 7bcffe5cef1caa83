// Plain records and closed enumerations of the FARM data model.
//
// Discriminant conversions are fallible and report the offset of the field they came from;
// the numeric values below are fixed by the file format.

use crate::error::{FarmError, Result};
use itertools::Itertools;
use serde::Serialize;
use simple_error::SimpleError;
use std::fmt;
use std::str::FromStr;

/// The FARM file version (`major.format.update`).
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct Version {
    pub major: u16,
    pub format: u16,
    pub update: u16,
}

impl Version {
    pub const fn new(major: u16, format: u16, update: u16) -> Version {
        Version {
            major,
            format,
            update,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.format, self.update)
    }
}

/// The only version this decoder was written against. Others are decoded best-effort.
pub const SUPPORTED_VERSION: Version = Version::new(8, 0, 0);

#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Geometry {
    None = 0,
    Point = 1,
    Linear = 2,
    Areal = 3,
}

impl Geometry {
    /// Parses a discriminant read at the given offset.
    pub fn from_i32(value: i32, offset: usize) -> Result<Geometry> {
        match value {
            0 => Ok(Geometry::None),
            1 => Ok(Geometry::Point),
            2 => Ok(Geometry::Linear),
            3 => Ok(Geometry::Areal),
            _ => Err(FarmError::InvalidGeometryDiscriminant {
                offset,
                found: value,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Geometry::None => "NONE",
            Geometry::Point => "POINT",
            Geometry::Linear => "LINEAR",
            Geometry::Areal => "AREAL",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Geometry {
    type Err = SimpleError;

    /// Accepts the geometry names case-insensitively, as typed on a command line.
    fn from_str(s: &str) -> std::result::Result<Geometry, SimpleError> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "null" => Ok(Geometry::None),
            "point" => Ok(Geometry::Point),
            "linear" => Ok(Geometry::Linear),
            "areal" => Ok(Geometry::Areal),
            _ => Err(SimpleError::new(format!(
                "invalid geometry type {}; valid types: none, point, linear, areal",
                s
            ))),
        }
    }
}

/// Key of the label map: a feature is identified by its label together with its geometry.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FeatureKey {
    pub label: String,
    pub geometry: Geometry,
}

impl FeatureKey {
    pub fn new(label: &str, geometry: Geometry) -> FeatureKey {
        FeatureKey {
            label: String::from(label),
            geometry,
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.geometry)
    }
}

/// The usage bitmask of a feature.
///
/// The decoder treats it as opaque; the names are only used for display.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UsageFlags(pub i32);

impl UsageFlags {
    pub const NAMES: [(i32, &'static str); 21] = [
        (0x0000001, "AVENUE"),
        (0x0000002, "APERTURE"),
        (0x0000004, "BUILDING"),
        (0x0000008, "AGRICULTURE_FARM"),
        (0x0000010, "FOREST"),
        (0x0000020, "FURNITURE"),
        (0x0000040, "RAISED_COMBAT_POS"),
        (0x0000080, "DUG_IN_COMBAT_POS"),
        (0x0000100, "LANE"),
        (0x0000200, "MULTI_BLDG"),
        (0x0000400, "LF_SML_VEH_OBSTACLE"),
        (0x0000800, "VEH_OBSTACLE"),
        (0x0001000, "AIR_VEH_OBSTACLE"),
        (0x0002000, "URBAN"),
        (0x0004000, "NBC"),
        (0x0008000, "BLOCKS_L_SML_VEH_LOS"),
        (0x0010000, "BLOCKS_VEH_LOS"),
        (0x0020000, "BLOCKS_LOS"),
        (0x0040000, "PROTECTS_L_SML_VEH"),
        (0x0080000, "PROTECTS_VEH"),
        (0x0100000, "BODY_OF_WATER"),
    ];

    pub fn bits(&self) -> i32 {
        self.0
    }

    pub fn contains(&self, flag: i32) -> bool {
        self.0 & flag == flag
    }

    /// Returns the names of the set flags, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }

    /// Bits that have no name.
    pub fn unknown_bits(&self) -> i32 {
        let known = Self::NAMES.iter().fold(0, |acc, (bit, _)| acc | bit);
        self.0 & !known
    }
}

impl fmt::Display for UsageFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<String> = self.names().iter().map(|s| s.to_string()).collect();
        if self.unknown_bits() != 0 {
            parts.push(format!("{:#x}", self.unknown_bits()));
        }
        if parts.is_empty() {
            f.write_str("-")
        } else {
            write!(f, "{}", parts.iter().join(" | "))
        }
    }
}

/// One feature type. Labels live in the label map, not here.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub category: i32,
    pub code: i32,
    pub geometry: Geometry,
    pub usage_bitmask: UsageFlags,
    /// Tie-break priority among overlapping features.
    pub precedence: i32,
    /// Size in bytes of the attribute value blob an instance of this feature allocates.
    pub attribute_overlay_size: i32,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataKind {
    NoType = 0,
    Int32 = 1,
    Float64 = 2,
    String = 3,
    Enumeration = 4,
    Boolean = 5,
    Uuid = 6,
    Deleted = 7,
}

impl DataKind {
    pub fn from_i32(value: i32, offset: usize) -> Result<DataKind> {
        match value {
            0 => Ok(DataKind::NoType),
            1 => Ok(DataKind::Int32),
            2 => Ok(DataKind::Float64),
            3 => Ok(DataKind::String),
            4 => Ok(DataKind::Enumeration),
            5 => Ok(DataKind::Boolean),
            6 => Ok(DataKind::Uuid),
            7 => Ok(DataKind::Deleted),
            _ => Err(FarmError::UnsupportedDataKind {
                offset,
                found: value,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataKind::NoType => "NO_TYPE",
            DataKind::Int32 => "INT32",
            DataKind::Float64 => "FLOAT64",
            DataKind::String => "STRING",
            DataKind::Enumeration => "ENUMERATION",
            DataKind::Boolean => "BOOLEAN",
            DataKind::Uuid => "UUID",
            DataKind::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Physical units of an attribute's values.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Units {
    Unitless = 0,
    Meters = 1,
    MetersPerSecond = 2,
    SquareMeters = 3,
    Degrees = 4,
    Kilograms = 5,
    KilogramsPerCubicMeter = 6,
    Celsius = 7,
    Liters = 8,
    Lux = 9,
    Pascals = 10,
    Enumeration = 11,
    Milliseconds = 12,
}

impl Units {
    pub fn from_i32(value: i32, offset: usize) -> Result<Units> {
        Ok(match value {
            0 => Units::Unitless,
            1 => Units::Meters,
            2 => Units::MetersPerSecond,
            3 => Units::SquareMeters,
            4 => Units::Degrees,
            5 => Units::Kilograms,
            6 => Units::KilogramsPerCubicMeter,
            7 => Units::Celsius,
            8 => Units::Liters,
            9 => Units::Lux,
            10 => Units::Pascals,
            11 => Units::Enumeration,
            12 => Units::Milliseconds,
            _ => {
                return Err(FarmError::InvalidUnits {
                    offset,
                    found: value,
                })
            }
        })
    }

    /// Short symbol for printing next to values.
    pub fn symbol(&self) -> &'static str {
        match self {
            Units::Unitless => "",
            Units::Meters => "m",
            Units::MetersPerSecond => "m/s",
            Units::SquareMeters => "m^2",
            Units::Degrees => "deg",
            Units::Kilograms => "kg",
            Units::KilogramsPerCubicMeter => "kg/m^3",
            Units::Celsius => "C",
            Units::Liters => "L",
            Units::Lux => "lx",
            Units::Pascals => "Pa",
            Units::Enumeration => "enum",
            Units::Milliseconds => "ms",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Units::Unitless => "UNITLESS",
            Units::Meters => "METERS",
            Units::MetersPerSecond => "METERS_PER_SECOND",
            Units::SquareMeters => "SQUARE_METERS",
            Units::Degrees => "DEGREES",
            Units::Kilograms => "KILOGRAMS",
            Units::KilogramsPerCubicMeter => "KILOGRAMS_PER_CUBIC_METER",
            Units::Celsius => "CELSIUS",
            Units::Liters => "LITERS",
            Units::Lux => "LUX",
            Units::Pascals => "PASCALS",
            Units::Enumeration => "ENUMERATION",
            Units::Milliseconds => "MILLISECONDS",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub label: String,
    pub code: i32,
    pub data_kind: DataKind,
    pub units: Units,
    pub editable: bool,
}

/// One enumeration value: the attribute it belongs to and its code within that attribute.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumerant {
    pub attribute_code: i32,
    pub enumerant_code: i32,
}

impl Enumerant {
    pub fn new(attribute_code: i32, enumerant_code: i32) -> Enumerant {
        Enumerant {
            attribute_code,
            enumerant_code,
        }
    }
}

impl fmt::Display for Enumerant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.attribute_code, self.enumerant_code)
    }
}
