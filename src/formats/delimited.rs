//! Tab or comma separated files: a header row naming the id, label and feature columns,
//! then one dense row per example.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet, Label};
use crate::formats::{check_column_names, default_id, LoadOptions, WriteOptions};
use crate::utils::{format_value, safe_float};

pub fn read(path: &Path, delimiter: u8, options: &LoadOptions) -> Result<Vec<Example>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let id_column = headers.iter().position(|h| *h == options.id_col);
    let label_column = headers.iter().position(|h| *h == options.label_col);

    let mut examples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let row = examples.len();

        let id = match id_column.and_then(|c| record.get(c)).map(str::trim) {
            Some(text) if !text.is_empty() => ExampleId::parse(text, options.ids_to_floats)?,
            _ => default_id(row, options)?,
        };

        let label = match label_column.and_then(|c| record.get(c)).map(str::trim) {
            Some(text) if !text.is_empty() => Some(Label::parse(text)),
            _ => None,
        };

        let mut features = BTreeMap::new();
        for (column, cell) in record.iter().enumerate() {
            if Some(column) == id_column || Some(column) == label_column {
                continue;
            }
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            let value = safe_float(cell).ok_or_else(|| {
                Error::format(path, line, format!("column {} has non-numeric value {:?}", headers[column], cell))
            })?;
            features.insert(headers[column].clone(), value);
        }

        examples.push(Example::new(id, label, features));
    }

    Ok(examples)
}

pub fn write(path: &Path, delimiter: u8, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    check_column_names(set, options)?;
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    let with_labels = set.has_labels();

    let mut header: Vec<&str> = vec![options.id_col.as_str()];
    header.extend(set.feature_names().iter().map(String::as_str));
    if with_labels {
        header.push(options.label_col.as_str());
    }
    writer.write_record(&header)?;

    for row in 0..set.len() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(set.ids[row].to_string());
        for column in 0..set.feature_len() {
            record.push(format_value(set.X.get(&(row, column)).copied().unwrap_or(0.0)));
        }
        if with_labels {
            record.push(set.labels[row].as_ref().map(|l| l.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
