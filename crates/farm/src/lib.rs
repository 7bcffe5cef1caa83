// This is a library for reading FARM files: the binary feature and attribute dictionary of
// an environmental terrain database.
//
// A FARM file describes which kinds of features exist (labels, geometry, usage flags), which
// attributes exist (units, data kind), and, in a feature x attribute table, which attributes
// each feature may carry together with the type, default, and legal range of each value.
//
// The file is a single, strictly sequential record stream:
//
//   u16 byte-order marker    1 = little-endian, 0 = big-endian
//   u16 major, format, update
//   the FARM table           see table.rs
//   the label map            see maps.rs
//   the category map
//   the attribute map
//
// Strings are a u16 length and UTF-8 bytes, followed by one pad byte when the length is odd.
// Only version 8.0.0 is known; other versions are read the same way with a warning.

mod datatype;
mod error;
mod export;
mod maps;
mod model;
mod reader;
mod session;
mod table;
mod visit;

#[cfg(test)]
mod testdata;

pub use datatype::{Bounded, DataTypeSpec, EnumSpec};
pub use error::{FarmError, Result};
pub use export::{to_json, to_json_string};
pub use model::{
    Attribute, DataKind, Enumerant, Feature, FeatureKey, Geometry, Units, UsageFlags, Version,
    SUPPORTED_VERSION,
};
pub use reader::{ByteOrder, DataReader, Readable, Uuid};
pub use session::{resolve_path, FarmCache, FarmSession, FarmSource};
pub use table::FarmTable;
pub use visit::{AttributeUsageCounter, DotConverter, FarmVisitor};

use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A fully decoded FARM file. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct FarmModel {
    byte_order: ByteOrder,
    version: Version,
    table: FarmTable,
    labels: HashMap<FeatureKey, u16>,
    /// Indexed by category.
    features: Vec<Option<Feature>>,
    /// Indexed by attribute code.
    attributes: Vec<Option<Attribute>>,
}

/// One attribute that a table row allows.
#[derive(Clone, Debug, PartialEq)]
pub struct LegalAttribute<'a> {
    pub code: u16,
    /// None if the attribute map has no entry for the code.
    pub attribute: Option<&'a Attribute>,
    pub spec: &'a DataTypeSpec,
}

impl FarmModel {
    /// Decodes a complete FARM file held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<FarmModel> {
        let mut reader = DataReader::new(data);
        let byte_order = reader.detect_byte_order()?;
        reader.set_byte_order(byte_order);
        let _marker = reader.read_u16()?;
        let major = reader.read_u16()?;
        let format = reader.read_u16()?;
        let update = reader.read_u16()?;
        let version = Version::new(major, format, update);
        info!("FARM version {}, {}", version, byte_order);
        if version != SUPPORTED_VERSION {
            warn!(
                "{}; decoding anyway",
                FarmError::VersionMismatch {
                    found: version,
                    expected: SUPPORTED_VERSION,
                }
            );
        }

        let table = FarmTable::decode(&mut reader)?;
        info!(
            "FARM table: {} features x {} attributes",
            table.feature_count(),
            table.attribute_count()
        );
        let labels = maps::read_label_map(&mut reader)?;
        info!("Read {} feature labels", labels.len());
        let features = maps::read_category_map(&mut reader)?;
        info!("Read {} feature categories", features.iter().flatten().count());
        let attributes = maps::read_attribute_map(&mut reader)?;
        info!("Read {} attributes", attributes.iter().flatten().count());

        if !reader.done() {
            warn!(
                "Ignoring {} bytes after the attribute map at offset {}",
                reader.remaining(),
                reader.position()
            );
        }

        Ok(FarmModel {
            byte_order,
            version,
            table,
            labels,
            features,
            attributes,
        })
    }

    /// Reads and decodes a FARM file, or the otf/farm.dat of a database directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FarmModel> {
        let source = FarmSource::from_path(path);
        let data = source.load()?;
        FarmModel::from_bytes(&data)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn table(&self) -> &FarmTable {
        &self.table
    }

    /// Returns the category a (label, geometry) pair maps to.
    pub fn category_of(&self, label: &str, geometry: Geometry) -> Option<u16> {
        self.labels
            .get(&FeatureKey::new(label, geometry))
            .copied()
    }

    pub fn feature_by_label_and_geometry(&self, label: &str, geometry: Geometry) -> Option<&Feature> {
        let category = self.category_of(label, geometry)?;
        self.feature_by_category(category as usize)
    }

    pub fn feature_by_category(&self, category: usize) -> Option<&Feature> {
        self.features.get(category)?.as_ref()
    }

    pub fn attribute_by_code(&self, code: i32) -> Option<&Attribute> {
        if code < 0 {
            return None;
        }
        self.attributes.get(code as usize)?.as_ref()
    }

    /// Returns the attribute with the given label. Labels are expected to be unique; if they
    /// are not, the lowest code wins.
    pub fn attribute_by_label(&self, label: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .flatten()
            .find(|attribute| attribute.label == label)
    }

    /// Returns the table record for (row, code). See FarmTable::cell_at.
    pub fn cell_at(&self, row: usize, code: u16) -> Option<&DataTypeSpec> {
        self.table.cell_at(row, code)
    }

    /// Returns every (label, geometry) that maps to the category, sorted.
    pub fn labels_for_category(&self, category: usize) -> Vec<&FeatureKey> {
        self.labels
            .iter()
            .filter(|&(_, &c)| c as usize == category)
            .map(|(key, _)| key)
            .sorted()
            .collect()
    }

    /// Returns the label map sorted by category, then label and geometry.
    pub fn labels(&self) -> Vec<(&FeatureKey, u16)> {
        self.labels
            .iter()
            .map(|(key, &category)| (key, category))
            .sorted_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .collect()
    }

    /// Iterates over the defined features by category.
    pub fn features(&self) -> impl Iterator<Item = (usize, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (i, f)))
    }

    /// Iterates over the defined attributes by code.
    pub fn attributes(&self) -> impl Iterator<Item = (usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (i, a)))
    }

    /// Returns the attributes a table row allows, by code.
    pub fn legal_attributes(&self, row: usize) -> Vec<LegalAttribute> {
        self.table
            .present_cells(row)
            .map(|(code, spec)| LegalAttribute {
                code,
                attribute: self.attribute_by_code(code as i32),
                spec,
            })
            .collect()
    }

    /// Walks the whole model. See FarmVisitor for the order of the calls.
    pub fn process_with_visitor(&self, visitor: &mut impl FarmVisitor) {
        visitor.begin_model(self.byte_order, &self.version);
        for (key, category) in self.labels() {
            visitor.accept_label(key, category);
        }
        for (category, feature) in self.features() {
            visitor.accept_feature(category, feature, &self.labels_for_category(category));
        }
        for (code, attribute) in self.attributes() {
            visitor.accept_attribute(code, attribute);
        }
        for row in 0..self.table.feature_count() as usize {
            for (code, spec) in self.table.present_cells(row) {
                visitor.accept_cell(row, code, spec);
            }
        }
        visitor.end_model();
    }

    /// Outputs the model as a Graphviz DOT document, with at most max_nodes feature and
    /// attribute nodes.
    pub fn to_dot(&self, max_nodes: Option<usize>) -> String {
        let mut converter = DotConverter::new(max_nodes);
        self.process_with_visitor(&mut converter);
        let out = converter.into_string();
        debug!("DOT document: {} bytes", out.len());
        out
    }
}

impl fmt::Display for FarmModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let print_tables = f.sign_plus();
        let table = &self.table;
        writeln!(f, "FARM: version {}, {}", self.version, self.byte_order)?;
        writeln!(
            f,
            "    table:      {} rows x {} columns, {} slots per row",
            table.feature_count(),
            table.attribute_count(),
            table.width()
        )?;
        writeln!(f, "    labels:     {} items", self.labels.len())?;
        writeln!(f, "    features:   {} items", self.features().count())?;
        writeln!(f, "    attributes: {} items", self.attributes().count())?;
        if print_tables {
            let mut usage = AttributeUsageCounter::default();
            self.process_with_visitor(&mut usage);

            writeln!(f, "\nLabels:")?;
            for (key, category) in self.labels() {
                writeln!(f, "    {:<32} {:<8} -> {}", key.label, key.geometry, category)?;
            }
            writeln!(f, "\nFeatures:")?;
            for (category, feature) in self.features() {
                writeln!(
                    f,
                    "    #{:<5} code={:<6} {:<7} precedence={:<4} overlay={:<4} [{}] {}",
                    category,
                    feature.code,
                    feature.geometry,
                    feature.precedence,
                    feature.attribute_overlay_size,
                    feature.usage_bitmask,
                    self.labels_for_category(category)
                        .iter()
                        .map(|k| &k.label)
                        .join(", ")
                )?;
            }
            writeln!(f, "\nAttributes:")?;
            for (code, attribute) in self.attributes() {
                let symbol = match attribute.units.symbol() {
                    "" => "-",
                    symbol => symbol,
                };
                writeln!(
                    f,
                    "    #{:<5} {:<32} {:<11} {:<25} {:<6} {:<9} rows={}",
                    code,
                    attribute.label,
                    attribute.data_kind,
                    attribute.units,
                    symbol,
                    if attribute.editable { "editable" } else { "fixed" },
                    usage.rows_allowing(code)
                )?;
            }
            let unused: Vec<usize> = usage
                .unused_codes()
                .into_iter()
                .filter(|&code| self.attribute_by_code(code as i32).is_some())
                .collect();
            if !unused.is_empty() {
                writeln!(f, "\nAllowed by no row: {}", unused.iter().join(", "))?;
            }
        }
        Ok(())
    }
}
