//! MegaM files: an optional `# id` comment line, then `label name value name value ...`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet, Label};
use crate::formats::{default_id, LoadOptions};
use crate::utils::{format_value, safe_float};

const SECTION_MARKERS: [&str; 3] = ["TRAIN", "TEST", "DEV"];

pub fn read(path: &Path, options: &LoadOptions) -> Result<Vec<Example>> {
    let reader = BufReader::new(File::open(path)?);
    let mut examples = Vec::new();
    let mut current_id: Option<String> = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if let Some(comment) = line.strip_prefix('#') {
            current_id = Some(comment.trim().to_string());
            continue;
        }
        if line.is_empty() || SECTION_MARKERS.contains(&line) {
            debug!("{}:{} skipped", path.display(), line_number + 1);
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        // an odd number of tokens means the first one is the label
        let (label, pairs) = if tokens.len() % 2 == 1 {
            (Some(Label::parse(tokens[0])), &tokens[1..])
        } else {
            (None, &tokens[..])
        };

        let mut features = BTreeMap::new();
        for pair in pairs.chunks(2) {
            let value = safe_float(pair[1]).ok_or_else(|| {
                Error::format(path, line_number + 1, format!("feature {} has non-numeric value {:?}", pair[0], pair[1]))
            })?;
            features.insert(pair[0].to_string(), value);
        }

        let row = examples.len();
        let id = match current_id.take() {
            Some(id) if !id.is_empty() => ExampleId::parse(&id, options.ids_to_floats)?,
            _ => default_id(row, options)?,
        };
        examples.push(Example::new(id, label, features));
    }

    Ok(examples)
}

pub fn write(path: &Path, set: &FeatureSet) -> Result<()> {
    if let Some(name) = set.feature_names().iter().find(|n| n.is_empty() || n.contains(char::is_whitespace)) {
        return Err(Error::InvalidArgument(format!("MegaM feature names cannot contain whitespace: {:?}", name)));
    }
    let mut writer = BufWriter::new(File::create(path)?);

    for (id, label, features) in set.iter() {
        let id = id.to_string();
        if id.contains('\n') {
            return Err(Error::InvalidArgument(format!("MegaM ids cannot span lines: {:?}", id)));
        }
        let mut tokens: Vec<String> = Vec::with_capacity(1 + 2 * features.len());
        match label {
            Some(label) => {
                let label = label.to_string();
                if label.is_empty() || label.contains(char::is_whitespace) {
                    return Err(Error::InvalidArgument(format!("MegaM labels cannot contain whitespace: {:?}", label)));
                }
                tokens.push(label);
            }
            None if features.is_empty() => {
                return Err(Error::InvalidArgument(format!(
                    "MegaM cannot represent example {} without a label or features",
                    id
                )));
            }
            None => {}
        }
        for (name, value) in features {
            tokens.push(name);
            tokens.push(format_value(value));
        }

        writeln!(writer, "# {}", id)?;
        writeln!(writer, "{}", tokens.join(" "))?;
    }

    writer.flush()?;
    Ok(())
}
