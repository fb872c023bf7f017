//! Attribute-relation files: `@relation`, one `@attribute` per column, then `@data` rows.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet, Label};
use crate::formats::{check_column_names, default_id, LoadOptions, WriteOptions};
use crate::utils::{format_value, safe_float};

const MISSING: &str = "?";

/// Quote a name or value when ARFF would otherwise split or misread it.
fn quote(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text == MISSING
        || text.chars().any(|c| c.is_whitespace() || ",'\"{}%\\".contains(c));
    if needs_quotes {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        text.to_string()
    }
}

/// Split off one possibly quoted token, returning it and the unparsed rest.
fn next_token(text: &str) -> Option<(String, bool, &str)> {
    let text = text.trim_start();
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;

    if first == '\'' || first == '"' {
        let mut token = String::new();
        let mut escaped = false;
        for (i, c) in chars {
            if escaped {
                token.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == first {
                return Some((token, true, &text[i + c.len_utf8()..]));
            } else {
                token.push(c);
            }
        }
        None
    } else {
        let end = text
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || *c == ',')
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        Some((text[..end].to_string(), false, &text[end..]))
    }
}

/// Split a dense data row on commas, honouring quotes. Quoted `?` stays a value.
fn split_row(line: &str) -> Option<Vec<(String, bool)>> {
    let mut fields = Vec::new();
    let mut rest = line;
    loop {
        let (token, quoted, after) = next_token(rest)?;
        // unquoted values may contain inner spaces up to the next comma
        let (token, after) = if quoted {
            (token, after)
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            (rest[..end].trim().to_string(), &rest[end..])
        };
        fields.push((token, quoted));
        let after = after.trim_start();
        match after.strip_prefix(',') {
            Some(next) => rest = next,
            None if after.is_empty() => return Some(fields),
            None => return None,
        }
    }
}

pub fn read(path: &Path, options: &LoadOptions) -> Result<Vec<Example>> {
    let reader = BufReader::new(File::open(path)?);
    let mut attributes: Vec<String> = Vec::new();
    let mut in_data = false;
    let mut examples = Vec::new();
    let mut id_column = None;
    let mut label_column = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        let line_number = line_number + 1;
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }

        if !in_data {
            let lower = trimmed.to_ascii_lowercase();
            if lower.starts_with("@relation") {
                continue;
            } else if lower.starts_with("@attribute") {
                let (name, _, _) = next_token(&trimmed["@attribute".len()..])
                    .ok_or_else(|| Error::format(path, line_number, "attribute without a name"))?;
                attributes.push(name);
            } else if lower.starts_with("@data") {
                in_data = true;
                id_column = attributes.iter().position(|a| *a == options.id_col);
                label_column = attributes.iter().position(|a| *a == options.label_col);
            } else {
                return Err(Error::format(path, line_number, format!("unexpected header line {:?}", trimmed)));
            }
            continue;
        }

        let fields: Vec<(String, bool)> = if let Some(sparse) = trimmed.strip_prefix('{') {
            // sparse rows list `index value` pairs, unlisted columns are zero
            let body = sparse
                .strip_suffix('}')
                .ok_or_else(|| Error::format(path, line_number, "unterminated sparse row"))?;
            let mut dense = vec![("0".to_string(), false); attributes.len()];
            let pairs = if body.trim().is_empty() {
                Vec::new()
            } else {
                split_row(body).ok_or_else(|| Error::format(path, line_number, "unbalanced quotes"))?
            };
            for pair in pairs {
                let (index, value) = pair
                    .0
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::format(path, line_number, format!("bad sparse entry {:?}", pair.0)))?;
                let index: usize = index
                    .parse()
                    .ok()
                    .filter(|i| *i < attributes.len())
                    .ok_or_else(|| Error::format(path, line_number, format!("bad sparse index {:?}", index)))?;
                let (value, quoted, _) =
                    next_token(value).ok_or_else(|| Error::format(path, line_number, "unbalanced quotes"))?;
                dense[index] = (value, quoted);
            }
            dense
        } else {
            split_row(trimmed).ok_or_else(|| Error::format(path, line_number, "unbalanced quotes"))?
        };

        if fields.len() != attributes.len() {
            return Err(Error::format(
                path,
                line_number,
                format!("{} values for {} attributes", fields.len(), attributes.len()),
            ));
        }

        let row = examples.len();
        let is_missing = |(value, quoted): &(String, bool)| !quoted && value == MISSING;

        let id = match id_column.map(|c| &fields[c]) {
            Some(field) if !is_missing(field) => ExampleId::parse(&field.0, options.ids_to_floats)?,
            _ => default_id(row, options)?,
        };
        let label = match label_column.map(|c| &fields[c]) {
            Some(field) if !is_missing(field) => Some(Label::parse(&field.0)),
            _ => None,
        };

        let mut features = BTreeMap::new();
        for (column, field) in fields.iter().enumerate() {
            if Some(column) == id_column || Some(column) == label_column || is_missing(field) {
                continue;
            }
            let value = safe_float(&field.0).ok_or_else(|| {
                Error::format(path, line_number, format!("attribute {} has non-numeric value {:?}", attributes[column], field.0))
            })?;
            features.insert(attributes[column].clone(), value);
        }

        examples.push(Example::new(id, label, features));
    }

    if !in_data {
        return Err(Error::format(path, 0, "no @data section"));
    }
    Ok(examples)
}

pub fn write(path: &Path, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    check_column_names(set, options)?;
    let mut writer = BufWriter::new(File::create(path)?);
    let with_labels = set.has_labels();

    let relation = options.relation.as_deref().unwrap_or(&set.name);
    writeln!(writer, "@relation {}\n", quote(relation))?;
    writeln!(writer, "@attribute {} string", quote(&options.id_col))?;
    for name in set.feature_names() {
        writeln!(writer, "@attribute {} numeric", quote(name))?;
    }
    if with_labels {
        let labels: Vec<&Label> = set.labels.iter().flatten().collect();
        if labels.iter().all(|l| l.is_numeric()) {
            writeln!(writer, "@attribute {} numeric", quote(&options.label_col))?;
        } else {
            let classes: BTreeSet<String> = labels.iter().map(|l| l.to_string()).collect();
            let classes: Vec<String> = classes.iter().map(|c| quote(c)).collect();
            writeln!(writer, "@attribute {} {{{}}}", quote(&options.label_col), classes.join(","))?;
        }
    }
    writeln!(writer, "\n@data")?;

    for row in 0..set.len() {
        let mut fields: Vec<String> = Vec::with_capacity(set.feature_len() + 2);
        fields.push(quote(&set.ids[row].to_string()));
        for column in 0..set.feature_len() {
            fields.push(format_value(set.X.get(&(row, column)).copied().unwrap_or(0.0)));
        }
        if with_labels {
            fields.push(match &set.labels[row] {
                Some(label) => quote(&label.to_string()),
                None => MISSING.to_string(),
            });
        }
        writeln!(writer, "{}", fields.join(","))?;
    }

    writer.flush()?;
    Ok(())
}
