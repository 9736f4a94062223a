//! Delimited-text descriptor files.
//!
//! The first line is a header. Every other line is `label`, seven Hu
//! values, then a signature of any length. Fields are separated by `;`,
//! tab or `,` (first one present on the line, in that order) and decimal
//! commas are accepted in numeric fields. Labels are kept as written. Rows that cannot be parsed are skipped and
//! reported, never fatal.

use std::path::Path;

use tracing::{info, warn};

use crate::{
    database::DescriptorDatabase,
    error::{Result, SketchError},
    types::{Descriptor, HU_MOMENT_COUNT},
};

const MIN_FIELDS: usize = 1 + HU_MOMENT_COUNT;

/// What happened while loading a descriptor file
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// One `MalformedDescriptorRecord` per skipped row
    pub skipped: Vec<SketchError>,
}

fn split_fields(line: &str) -> Vec<String> {
    let delimiter = [';', '\t', ',']
        .into_iter()
        .find(|&d| line.contains(d))
        .unwrap_or(',');

    let mut fields: Vec<String> = line
        .split(delimiter)
        .map(|field| field.trim().to_string())
        .collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

fn parse_number(field: &str, index: usize) -> std::result::Result<f64, String> {
    let value: f64 = field
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("field {index}: '{field}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("field {index}: '{field}' is not finite"));
    }
    Ok(value)
}

fn parse_record(line: &str) -> std::result::Result<Descriptor, String> {
    let fields = split_fields(line);
    if fields.len() < MIN_FIELDS {
        return Err(format!("expected at least {MIN_FIELDS} fields, found {}", fields.len()));
    }

    let label = fields[0].clone();
    if label.is_empty() {
        return Err("empty label".to_string());
    }

    let mut hu_moments = [0.0; HU_MOMENT_COUNT];
    for (slot, (index, field)) in hu_moments.iter_mut().zip(fields.iter().enumerate().skip(1)) {
        *slot = parse_number(field, index)?;
    }

    let signature = fields
        .iter()
        .enumerate()
        .skip(MIN_FIELDS)
        .map(|(index, field)| parse_number(field, index))
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    Ok(Descriptor::new(label, hu_moments, signature))
}

/// Parse descriptor text into a database, skipping malformed rows
pub fn parse_descriptors(content: &str) -> (DescriptorDatabase, LoadReport) {
    let mut report = LoadReport::default();
    let mut descriptors = Vec::new();

    for (index, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        match parse_record(line) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(reason) => {
                warn!(line = line_number, %reason, "skipping descriptor record");
                report.skipped.push(SketchError::MalformedDescriptorRecord {
                    line: line_number,
                    reason,
                });
            }
        }
    }

    report.loaded = descriptors.len();
    (DescriptorDatabase::new(descriptors), report)
}

/// Read and parse a descriptor file
pub fn load_descriptor_file<P: AsRef<Path>>(path: P) -> Result<(DescriptorDatabase, LoadReport)> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let (database, report) = parse_descriptors(&content);
    info!(
        path = %path.as_ref().display(),
        loaded = report.loaded,
        skipped = report.skipped.len(),
        "parsed descriptor file"
    );
    Ok((database, report))
}
