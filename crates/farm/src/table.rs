// The feature x attribute table.
//
// On disk the table is `u16 rows, u16 columns`, the column attribute codes (u16 each), and
// then rows x columns data-type records in row-major, physical column order.
//
// In memory each row is widened to `max(code) + 1` slots and every record is stored at the
// slot of its attribute code, so a cell is found by (row, code) without a column search.
// Slots for codes that no column declares hold NoValue. All rows live in a single vector
// (row * width + code), like the interleaved point planes of a pool.

use crate::datatype::DataTypeSpec;
use crate::error::Result;
use crate::reader::DataReader;
use log::{debug, warn};

static NO_VALUE: DataTypeSpec = DataTypeSpec::NoValue;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FarmTable {
    feature_count: u16,
    attribute_count: u16,
    /// Column identities, in file order.
    attribute_codes: Vec<u16>,
    /// Slots per row.
    width: usize,
    cells: Vec<DataTypeSpec>,
}

impl FarmTable {
    pub fn decode(reader: &mut DataReader) -> Result<FarmTable> {
        let feature_count = reader.read_u16()?;
        let attribute_count = reader.read_u16()?;
        let attribute_codes: Vec<u16> = reader.read_vec(attribute_count as usize)?;
        let width = attribute_codes
            .iter()
            .max()
            .map_or(0, |&max| max as usize + 1);
        debug!(
            "FARM table at {}: {} rows, {} columns, {} slots per row",
            reader.position(),
            feature_count,
            attribute_count,
            width
        );
        let mut sorted = attribute_codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != attribute_codes.len() {
            warn!(
                "FARM table declares {} columns but only {} distinct attribute codes; \
                 later columns overwrite earlier ones.",
                attribute_codes.len(),
                sorted.len()
            );
        }

        let mut cells: Vec<DataTypeSpec> = vec![];
        for _ in 0..feature_count {
            // Rows are added as they are read, so a truncated file fails before the whole
            // table is allocated.
            let start = cells.len();
            cells.resize(start + width, DataTypeSpec::NoValue);
            for &code in &attribute_codes {
                cells[start + code as usize] = DataTypeSpec::decode(reader)?;
            }
        }

        Ok(FarmTable {
            feature_count,
            attribute_count,
            attribute_codes,
            width,
            cells,
        })
    }

    /// Number of rows (features) in the table.
    pub fn feature_count(&self) -> u16 {
        self.feature_count
    }

    /// Number of declared columns.
    pub fn attribute_count(&self) -> u16 {
        self.attribute_count
    }

    pub fn attribute_codes(&self) -> &[u16] {
        &self.attribute_codes
    }

    /// Slots per row: the largest declared code plus one, or zero without columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the row's slots, indexed by attribute code.
    pub fn row(&self, row: usize) -> Option<&[DataTypeSpec]> {
        if row >= self.feature_count as usize {
            return None;
        }
        let start = row * self.width;
        Some(&self.cells[start..start + self.width])
    }

    /// Returns the record for (row, code).
    ///
    /// Every code that no column declares, including codes past the widest one, is NoValue.
    /// None means the row doesn't exist.
    pub fn cell_at(&self, row: usize, code: u16) -> Option<&DataTypeSpec> {
        let cells = self.row(row)?;
        Some(cells.get(code as usize).unwrap_or(&NO_VALUE))
    }

    /// Iterates over the (code, record) pairs of a row that are not NoValue, by code.
    pub fn present_cells(&self, row: usize) -> impl Iterator<Item = (u16, &DataTypeSpec)> {
        self.row(row)
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.is_present())
            .map(|(code, spec)| (code as u16, spec))
    }
}
