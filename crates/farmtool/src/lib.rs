use farm::{FarmModel, Geometry};
use itertools::Itertools;
use log::info;
use simple_error::bail;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ExportFormat {
    Json,
    Dot,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Dot => "dot",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = simple_error::SimpleError;

    fn from_str(s: &str) -> Result<ExportFormat, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" => Ok(ExportFormat::Dot),
            _ => Err(simple_error::SimpleError::new(format!(
                "unknown export format {}; expected json or dot",
                s
            ))),
        }
    }
}

/// Returns `<input>.<extension>`, e.g. farm.dat -> farm.dat.json.
pub fn default_output_path<P: AsRef<Path>>(input: P, format: ExportFormat) -> PathBuf {
    let mut name = OsString::from(input.as_ref().as_os_str());
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

pub fn render(model: &FarmModel, format: ExportFormat) -> Result<String, Box<dyn Error>> {
    Ok(match format {
        ExportFormat::Json => farm::to_json_string(model)?,
        ExportFormat::Dot => model.to_dot(None),
    })
}

/// Decodes `input` and writes it in the given format. Returns the path written.
pub fn export<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    format: ExportFormat,
) -> Result<PathBuf, Box<dyn Error>> {
    let model = FarmModel::open(&input)?;
    let out_path = match output {
        Some(path) => PathBuf::from(path),
        None => default_output_path(&input, format),
    };
    let text = render(&model, format)?;
    std::fs::write(&out_path, text.as_bytes())?;
    info!("Wrote {} bytes to {}", text.len(), out_path.display());
    Ok(out_path)
}

/// One line per defined feature: category, code, geometry, and every label mapped to it.
pub fn list_features(model: &FarmModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>8}  {:>6}  {:<8}  LABELS", "CATEGORY", "CODE", "GEOMETRY");
    for (category, feature) in model.features() {
        let labels = model
            .labels_for_category(category)
            .iter()
            .map(|k| &k.label)
            .join(", ");
        let _ = writeln!(
            out,
            "{:>8}  {:>6}  {:<8}  {}",
            category, feature.code, feature.geometry, labels
        );
    }
    out
}

/// Describes one feature and every attribute its table row allows.
pub fn feature_info(
    model: &FarmModel,
    label: &str,
    geometry: Geometry,
) -> Result<String, Box<dyn Error>> {
    let category = match model.category_of(label, geometry) {
        Some(category) => category as usize,
        None => bail!("no feature labeled {} with geometry {}", label, geometry),
    };
    let feature = match model.feature_by_category(category) {
        Some(feature) => feature,
        None => bail!(
            "{} ({}) maps to category {}, which is not defined",
            label,
            geometry,
            category
        ),
    };

    let mut out = String::new();
    writeln!(out, "Feature {} ({})", label, geometry)?;
    writeln!(out, "    category:    {}", category)?;
    writeln!(out, "    code:        {}", feature.code)?;
    writeln!(out, "    geometry:    {}", feature.geometry)?;
    writeln!(out, "    precedence:  {}", feature.precedence)?;
    writeln!(out, "    overlay:     {} bytes", feature.attribute_overlay_size)?;
    writeln!(out, "    usage:       {}", feature.usage_bitmask)?;
    writeln!(
        out,
        "    labels:      {}",
        model.labels_for_category(category).iter().join(", ")
    )?;

    let legal = model.legal_attributes(category);
    writeln!(out, "Legal attributes ({}):", legal.len())?;
    for entry in legal {
        match entry.attribute {
            Some(attribute) => writeln!(
                out,
                "    #{:<5} {:<32} {} {}{}",
                entry.code,
                attribute.label,
                entry.spec,
                attribute.units,
                if attribute.editable { "" } else { " (fixed)" }
            )?,
            None => writeln!(out, "    #{:<5} {:<32} {}", entry.code, "<undefined>", entry.spec)?,
        }
    }
    Ok(out)
}
