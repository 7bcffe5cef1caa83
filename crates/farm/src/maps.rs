// The three maps that follow the table: labels, categories, and attributes.
//
// Each map is a u16 count followed by that many entries. The label map is keyed by
// (label, geometry); the other two are keyed by small integers and are stored as vectors
// indexed by key, with None where no entry was given.

use crate::error::{FarmError, Result};
use crate::model::{Attribute, DataKind, Feature, FeatureKey, Geometry, UsageFlags, Units};
use crate::reader::{DataReader, Readable};
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

impl Readable for Feature {
    fn read(reader: &mut DataReader) -> Result<Feature> {
        let category = reader.read_i32()?;
        let code = reader.read_i32()?;
        let geometry_offset = reader.position();
        let geometry = Geometry::from_i32(reader.read_i32()?, geometry_offset)?;
        let usage_bitmask = UsageFlags(reader.read_i32()?);
        let precedence = reader.read_i32()?;
        let attribute_overlay_size = reader.read_i32()?;
        Ok(Feature {
            category,
            code,
            geometry,
            usage_bitmask,
            precedence,
            attribute_overlay_size,
        })
    }
}

impl Readable for Attribute {
    fn read(reader: &mut DataReader) -> Result<Attribute> {
        let label = reader.read_string()?;
        let code = reader.read_i32()?;
        let kind_offset = reader.position();
        let data_kind = DataKind::from_i32(reader.read_i32()?, kind_offset)?;
        let units_offset = reader.position();
        let units = Units::from_i32(reader.read_i32()?, units_offset)?;
        let editable = reader.read_i32()? != 0;
        Ok(Attribute {
            label,
            code,
            data_kind,
            units,
            editable,
        })
    }
}

/// Stores `value` at `index`, growing `v` with None as needed. Returns the value it replaced.
fn store<T>(v: &mut Vec<Option<T>>, index: usize, value: T) -> Option<T> {
    if v.len() <= index {
        v.resize_with(index + 1, || None);
    }
    v[index].replace(value)
}

/// Reads the label map. A repeated (label, geometry) keeps the last category.
pub fn read_label_map(reader: &mut DataReader) -> Result<HashMap<FeatureKey, u16>> {
    let count = reader.read_u16()?;
    debug!("Label map at {}: {} entries", reader.position(), count);
    let mut labels = HashMap::with_capacity(count as usize);
    for _ in 0..count {
        let label = reader.read_string()?;
        let geometry_offset = reader.position();
        let geometry = Geometry::from_i32(reader.read_u16()? as i32, geometry_offset)?;
        let category = reader.read_u16()?;
        trace!("  label {} ({}) -> {}", label, geometry, category);
        match labels.entry(FeatureKey { label, geometry }) {
            Entry::Occupied(mut e) => {
                debug!(
                    "Label {} remapped from category {} to {}",
                    e.key(),
                    e.get(),
                    category
                );
                e.insert(category);
            }
            Entry::Vacant(e) => {
                e.insert(category);
            }
        }
    }
    Ok(labels)
}

/// Reads the category map into a vector indexed by category.
pub fn read_category_map(reader: &mut DataReader) -> Result<Vec<Option<Feature>>> {
    let count = reader.read_u16()?;
    debug!("Category map at {}: {} entries", reader.position(), count);
    let mut features = vec![];
    for _ in 0..count {
        let category = reader.read_u16()?;
        let feature: Feature = reader.read()?;
        trace!("  category {}: {:?}", category, feature);
        if feature.category != category as i32 {
            debug!(
                "Category map key {} holds a feature that calls itself category {}",
                category, feature.category
            );
        }
        if store(&mut features, category as usize, feature).is_some() {
            debug!("Category {} redefined", category);
        }
    }
    Ok(features)
}

/// Reads the attribute map into a vector indexed by attribute code.
pub fn read_attribute_map(reader: &mut DataReader) -> Result<Vec<Option<Attribute>>> {
    let count = reader.read_u16()?;
    debug!("Attribute map at {}: {} entries", reader.position(), count);
    let mut attributes = vec![];
    for _ in 0..count {
        let code_offset = reader.position();
        let code = reader.read_i32()?;
        // Table columns are u16, so no cell can refer to a larger code.
        if code < 0 || code > u16::MAX as i32 {
            return Err(FarmError::InvalidIndex {
                offset: code_offset,
                found: code,
            });
        }
        let attribute: Attribute = reader.read()?;
        trace!("  attribute {}: {:?}", code, attribute);
        if attribute.code != code {
            debug!(
                "Attribute map key {} holds an attribute that calls itself code {}",
                code, attribute.code
            );
        }
        if store(&mut attributes, code as usize, attribute).is_some() {
            debug!("Attribute {} redefined", code);
        }
    }
    Ok(attributes)
}
