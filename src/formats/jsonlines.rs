//! One JSON object per line: `{"id": ..., "y": ..., "x": {"feature": value, ...}}`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet, Label};
use crate::formats::{default_id, LoadOptions, WriteOptions};

pub fn read(path: &Path, options: &LoadOptions) -> Result<Vec<Example>> {
    let reader = BufReader::new(File::open(path)?);
    let mut examples = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            debug!("{}:{} skipped", path.display(), line_number + 1);
            continue;
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| Error::format(path, line_number + 1, e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(Error::format(path, line_number + 1, "expected a JSON object"));
        };
        let row = examples.len();

        let id = match object.get(&options.id_col) {
            None | Some(Value::Null) => default_id(row, options)?,
            Some(Value::String(text)) => ExampleId::parse(text, options.ids_to_floats)?,
            Some(Value::Number(number)) => ExampleId::parse(&number.to_string(), options.ids_to_floats)?,
            Some(other) => {
                return Err(Error::format(path, line_number + 1, format!("unusable example id {}", other)))
            }
        };

        let label = match object.get(&options.label_col) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(Label::parse(text)),
            Some(Value::Number(number)) => number.as_f64().map(Label::Number),
            Some(other) => {
                return Err(Error::format(path, line_number + 1, format!("unusable label {}", other)))
            }
        };

        let mut features = BTreeMap::new();
        match object.get("x") {
            None | Some(Value::Null) => {}
            Some(Value::Object(x)) => {
                for (name, value) in x {
                    let number = value.as_f64().ok_or_else(|| {
                        Error::format(path, line_number + 1, format!("feature {} has non-numeric value {}", name, value))
                    })?;
                    features.insert(name.clone(), number);
                }
            }
            Some(other) => {
                return Err(Error::format(path, line_number + 1, format!("\"x\" must be an object, got {}", other)))
            }
        }

        examples.push(Example::new(id, label, features));
    }

    Ok(examples)
}

pub fn write(path: &Path, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    for (id, label, features) in set.iter() {
        let mut object = Map::new();
        object.insert(
            options.id_col.clone(),
            match id {
                ExampleId::Text(text) => Value::from(text.as_str()),
                ExampleId::Float(value) => float_id(*value),
            },
        );
        match label {
            Some(Label::Number(number)) => {
                object.insert(options.label_col.clone(), Value::from(*number));
            }
            Some(Label::Text(text)) => {
                object.insert(options.label_col.clone(), Value::from(text.as_str()));
            }
            None => {}
        }
        let x: Map<String, Value> = features.into_iter().map(|(name, value)| (name, Value::from(value))).collect();
        object.insert("x".to_string(), Value::Object(x));

        serde_json::to_writer(&mut writer, &Value::Object(object))?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}

/// Integral float ids are written as JSON integers so they read back as the same text.
fn float_id(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
