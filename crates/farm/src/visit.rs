// Walking a decoded model, and the visitors built on the walk.

use crate::datatype::DataTypeSpec;
use crate::model::{Attribute, Feature, FeatureKey, Version};
use crate::reader::ByteOrder;
use log::debug;
use std::collections::HashSet;
use std::fmt::Write;

/// Receives the contents of a model, in order: the header, the labels (sorted by category),
/// the features and attributes (by index), the non-empty table cells (by row, then code), and
/// the end.
#[allow(unused_variables)] // So trait func parameters can avoid the leading _ for nop defaults.
pub trait FarmVisitor {
    fn begin_model(&mut self, byte_order: ByteOrder, version: &Version) {}
    fn accept_label(&mut self, key: &FeatureKey, category: u16) {}
    fn accept_feature(&mut self, category: usize, feature: &Feature, labels: &[&FeatureKey]) {}
    fn accept_attribute(&mut self, code: usize, attribute: &Attribute) {}
    fn accept_cell(&mut self, row: usize, code: u16, spec: &DataTypeSpec) {}
    fn end_model(&mut self) {}
}

/// Counts how many table rows allow each attribute code.
#[derive(Debug, Default)]
pub struct AttributeUsageCounter {
    rows_by_code: Vec<usize>,
}

impl AttributeUsageCounter {
    fn add(v: &mut Vec<usize>, i: usize, x: usize) {
        if v.len() <= i {
            v.resize(i + 1, 0);
        }
        v[i] += x;
    }

    pub fn rows_allowing(&self, code: usize) -> usize {
        self.rows_by_code.get(code).copied().unwrap_or(0)
    }

    /// Codes that no row allows, among those below the largest counted code.
    pub fn unused_codes(&self) -> Vec<usize> {
        self.rows_by_code
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == 0)
            .map(|(code, _)| code)
            .collect()
    }
}

impl FarmVisitor for AttributeUsageCounter {
    fn accept_cell(&mut self, _: usize, code: u16, _: &DataTypeSpec) {
        Self::add(&mut self.rows_by_code, code as usize, 1);
    }
}

/// Produces a Graphviz digraph: a root node, one node per feature and per attribute, and an
/// edge from each feature to every attribute its table row allows.
///
/// With a node limit, features and attributes beyond it are left out along with their edges.
pub struct DotConverter {
    /// The document is accumulated here.
    out: String,
    max_nodes: Option<usize>,
    nodes: usize,
    features: HashSet<usize>,
    attributes: HashSet<usize>,
}

impl DotConverter {
    pub fn new(max_nodes: Option<usize>) -> DotConverter {
        DotConverter {
            out: String::with_capacity(64 * 1024),
            max_nodes,
            nodes: 0,
            features: HashSet::new(),
            attributes: HashSet::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn has_room(&mut self) -> bool {
        match self.max_nodes {
            Some(max) if self.nodes >= max => {
                if self.nodes == max {
                    debug!("DOT node limit {} reached; remaining nodes omitted", max);
                    // Only log once.
                    self.nodes += 1;
                }
                false
            }
            _ => {
                self.nodes += 1;
                true
            }
        }
    }
}

fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// Writing into a String cannot fail, so the fmt::Results below are dropped.
impl FarmVisitor for DotConverter {
    fn begin_model(&mut self, byte_order: ByteOrder, version: &Version) {
        let _ = writeln!(self.out, "digraph farm {{");
        let _ = writeln!(self.out, "  rankdir=LR;");
        let _ = writeln!(self.out, "  node [shape=box, style=filled, fillcolor=lightblue];");
        let _ = writeln!(
            self.out,
            "  farm [label=\"FARM {}\\n{}\", shape=ellipse, fillcolor=lightgreen];",
            version, byte_order
        );
    }

    fn accept_feature(&mut self, category: usize, feature: &Feature, labels: &[&FeatureKey]) {
        if !self.has_room() {
            return;
        }
        let names: Vec<String> = labels.iter().map(|k| quote(&k.label)).collect();
        let _ = writeln!(
            self.out,
            "  feature{} [label=\"#{} {}\\n{} code={} precedence={}\"];",
            category,
            category,
            names.join(" / "),
            feature.geometry,
            feature.code,
            feature.precedence
        );
        let _ = writeln!(self.out, "  farm -> feature{};", category);
        self.features.insert(category);
    }

    fn accept_attribute(&mut self, code: usize, attribute: &Attribute) {
        if !self.has_room() {
            return;
        }
        let _ = writeln!(
            self.out,
            "  attribute{} [label=\"{} #{}\\n{} {}\", fillcolor=lightyellow];",
            code,
            quote(&attribute.label),
            code,
            attribute.data_kind,
            attribute.units
        );
        self.attributes.insert(code);
    }

    fn accept_cell(&mut self, row: usize, code: u16, spec: &DataTypeSpec) {
        if self.features.contains(&row) && self.attributes.contains(&(code as usize)) {
            let _ = writeln!(
                self.out,
                "  feature{} -> attribute{} [label=\"{}\"];",
                row,
                code,
                spec.kind()
            );
        }
    }

    fn end_model(&mut self) {
        let _ = writeln!(self.out, "}}");
    }
}
