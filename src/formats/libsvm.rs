//! LibSVM files with a trailing comment that keeps what the numeric layout loses:
//!
//! `label idx:value ... # id | label_field=class | idx=name ...`
//!
//! Text labels are written as their index in a [`LabelMap`], feature indices are 1-based.
//! Characters that carry meaning in the comment are swapped for look-alikes so that ids,
//! classes and feature names survive the round trip.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet, Label};
use crate::formats::{default_id, LoadOptions, WriteOptions};
use crate::utils::{format_value, safe_float};

/// Label field written for examples without a label.
pub const MISSING_LABEL: &str = "00000";

const LOOKALIKES: [(char, char); 6] = [
    ('#', '\u{FF03}'),
    (':', '\u{FF1A}'),
    ('=', '\u{FF1D}'),
    ('|', '\u{FF5C}'),
    (' ', '\u{2423}'),
    ('\t', '\u{2409}'),
];

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| LOOKALIKES.iter().find(|(raw, _)| *raw == c).map(|(_, safe)| *safe).unwrap_or(c))
        .collect()
}

fn desanitize(text: &str) -> String {
    text.chars()
        .map(|c| LOOKALIKES.iter().find(|(_, safe)| *safe == c).map(|(raw, _)| *raw).unwrap_or(c))
        .collect()
}

/// Integer codes of the text classes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelMap {
    map: BTreeMap<String, usize>,
}

impl LabelMap {
    pub fn new(map: BTreeMap<String, usize>) -> LabelMap {
        LabelMap { map }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.map.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Label field of a libsvm line.
    pub fn encode(&self, label: Option<&Label>) -> Result<String> {
        match label {
            None => Ok(MISSING_LABEL.to_string()),
            Some(Label::Number(number)) => Ok(format_value(*number)),
            Some(Label::Text(text)) => self
                .get(text)
                .map(|code| code.to_string())
                .ok_or_else(|| Error::InvalidArgument(format!("label {:?} is missing from the label map", text))),
        }
    }
}

/// Map the sorted distinct text labels to 0, 1, 2... Numeric labels keep their value.
pub fn build_label_map(labels: &[Option<Label>]) -> LabelMap {
    let classes: BTreeSet<&str> = labels
        .iter()
        .flatten()
        .filter_map(|label| match label {
            Label::Text(text) => Some(text.as_str()),
            Label::Number(_) => None,
        })
        .collect();
    LabelMap::new(classes.into_iter().enumerate().map(|(code, class)| (class.to_string(), code)).collect())
}

pub fn read(path: &Path, options: &LoadOptions) -> Result<Vec<Example>> {
    let reader = BufReader::new(File::open(path)?);
    let mut examples = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = line_number + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (data, comment) = match line.split_once('#') {
            Some((data, comment)) => (data, Some(comment)),
            None => (line.as_str(), None),
        };

        let mut tokens = data.split_whitespace();
        let field = tokens
            .next()
            .ok_or_else(|| Error::format(path, line_number, "line without a label field"))?;

        let mut sections = comment.map(|c| c.splitn(3, '|').map(str::trim).collect::<Vec<_>>()).unwrap_or_default();
        sections.resize(3, "");
        let (id_text, label_section, name_section) = (sections[0], sections[1], sections[2]);

        let names: HashMap<&str, String> = name_section
            .split_whitespace()
            .filter_map(|pair| pair.split_once('='))
            .map(|(index, name)| (index, desanitize(name)))
            .collect();

        let label = match label_section.split_once('=') {
            Some((_, class)) => Some(Label::Text(desanitize(class))),
            None if field == MISSING_LABEL => None,
            None => Some(Label::parse(field)),
        };

        let mut features = BTreeMap::new();
        for pair in tokens {
            let (index, value) = pair
                .split_once(':')
                .ok_or_else(|| Error::format(path, line_number, format!("expected index:value, got {:?}", pair)))?;
            let value = safe_float(value).ok_or_else(|| {
                Error::format(path, line_number, format!("feature {} has non-numeric value {:?}", index, value))
            })?;
            let name = names.get(index).cloned().unwrap_or_else(|| index.to_string());
            features.insert(name, value);
        }

        let row = examples.len();
        let id = if id_text.is_empty() {
            default_id(row, options)?
        } else {
            ExampleId::parse(&desanitize(id_text), options.ids_to_floats)?
        };
        examples.push(Example::new(id, label, features));
    }

    debug!("{}: {} libsvm lines", path.display(), examples.len());
    Ok(examples)
}

pub fn write(path: &Path, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    let label_map = match &options.label_map {
        Some(label_map) => label_map.clone(),
        None => build_label_map(&set.labels),
    };

    // 1-based indices, shared between files when a vocabulary is supplied
    let indices: Vec<usize> = match &options.feature_vocabulary {
        Some(vocabulary) => set
            .feature_names()
            .iter()
            .map(|name| {
                vocabulary.index_of(name).map(|column| column + 1).ok_or_else(|| {
                    Error::InvalidArgument(format!("feature {} is missing from the supplied vocabulary", name))
                })
            })
            .collect::<Result<_>>()?,
        None => (1..=set.feature_len()).collect(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    for row in 0..set.len() {
        let label = set.labels[row].as_ref();
        let field = label_map.encode(label)?;

        let mut columns: Vec<(usize, f64)> = (0..set.feature_len())
            .filter_map(|column| set.X.get(&(row, column)).map(|value| (column, *value)))
            .collect();
        columns.sort_by_key(|(column, _)| indices[*column]);

        let values: Vec<String> =
            columns.iter().map(|(column, value)| format!("{}:{}", indices[*column], format_value(*value))).collect();
        let names: Vec<String> = columns
            .iter()
            .map(|(column, _)| format!("{}={}", indices[*column], sanitize(&set.feature_names()[*column])))
            .collect();
        let label_section = match label {
            Some(Label::Text(text)) => format!("{}={}", field, sanitize(text)),
            _ => String::new(),
        };

        let mut line = field;
        for value in &values {
            line.push(' ');
            line.push_str(value);
        }
        writeln!(
            writer,
            "{} # {} | {} | {}",
            line,
            sanitize(&set.ids[row].to_string()),
            label_section,
            names.join(" ")
        )?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::FeatureVocabulary;
    use std::fs;

    fn text(label: &str) -> Option<Label> {
        Some(Label::Text(label.to_string()))
    }

    #[test]
    fn test_build_label_map() {
        let labels = vec![text("dog"), None, text("cat"), Some(Label::Number(3.0)), text("dog")];
        let label_map = build_label_map(&labels);
        assert_eq!(label_map.len(), 2, "numeric labels need no code");
        assert_eq!(label_map.get("cat"), Some(0), "classes are coded in sorted order");
        assert_eq!(label_map.get("dog"), Some(1));
        assert_eq!(label_map.encode(None).unwrap(), MISSING_LABEL);
        assert_eq!(label_map.encode(Some(&Label::Number(2.5))).unwrap(), "2.5");
        assert!(matches!(label_map.encode(text("bird").as_ref()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_sanitize_round_trip() {
        let raw = "a b|c=d:e#f\tg";
        let safe = sanitize(raw);
        assert!(!safe.contains(|c: char| "# :=|\t".contains(c)), "{:?} still holds a reserved character", safe);
        assert_eq!(desanitize(&safe), raw);
    }

    #[test]
    fn test_write_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.libsvm");
        let examples = vec![
            Example::new(ExampleId::Text("a".into()), text("dog"), BTreeMap::from([("f 2".to_string(), 1.5)])),
            Example::new(ExampleId::Text("b".into()), None, BTreeMap::from([("f1".to_string(), 1.0), ("f 2".to_string(), 2.0)])),
        ];
        let set = FeatureSet::from_examples("out", examples, Default::default()).unwrap();
        write(&path, &set, &WriteOptions::default()).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "0 1:1.5 # a | 0=dog | 1=f\u{2423}2");
        assert_eq!(lines[1], "00000 1:2 2:1 # b |  | 1=f\u{2423}2 2=f1");
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.libsvm");
        let examples = vec![
            Example::new(ExampleId::Text("id #1".into()), text("big cat"), BTreeMap::from([("x:y".to_string(), 2.0)])),
            Example::new(ExampleId::Text("id 2".into()), Some(Label::Number(0.0)), BTreeMap::from([("z".to_string(), -1.0)])),
            Example::new(ExampleId::Text("id 3".into()), None, BTreeMap::new()),
        ];
        let set = FeatureSet::from_examples("out", examples.clone(), Default::default()).unwrap();
        write(&path, &set, &WriteOptions::default()).unwrap();
        assert_eq!(read(&path, &LoadOptions::default()).unwrap(), examples);
    }

    #[test]
    fn test_write_with_shared_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subset.libsvm");
        let examples = vec![Example::new(ExampleId::Text("a".into()), None, BTreeMap::from([("f3".to_string(), 4.0)]))];
        let set = FeatureSet::from_examples("subset", examples, Default::default()).unwrap();

        let options = WriteOptions {
            feature_vocabulary: Some(FeatureVocabulary::from_names(vec!["f1", "f2", "f3"])),
            ..WriteOptions::default()
        };
        write(&path, &set, &options).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("00000 3:4 "), "f3 keeps its global index");

        let narrow = WriteOptions {
            feature_vocabulary: Some(FeatureVocabulary::from_names(vec!["f1"])),
            ..WriteOptions::default()
        };
        assert!(matches!(write(&path, &set, &narrow), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_read_plain_libsvm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.libsvm");
        fs::write(&path, "1 1:0.5 4:2\n-1 2:1\n").unwrap();
        let examples = read(&path, &LoadOptions::default()).unwrap();
        assert_eq!(examples[0].id, ExampleId::Text("EXAMPLE_0".into()));
        assert_eq!(examples[0].features.get("4"), Some(&2.0), "without a name map the index is the name");
        assert_eq!(examples[1].label, Some(Label::Number(-1.0)));
    }
}
