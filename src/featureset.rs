use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::utils::{format_value, safe_float};
use crate::vectorizer::{FeatureVocabulary, Vectorizer};

/// Identifier of one example. Text unless the caller asked for float ids.
#[derive(Clone, Debug, PartialEq)]
pub enum ExampleId {
    Text(String),
    Float(f64),
}

impl ExampleId {
    /// Read an id from its textual form, coercing to float when requested.
    pub fn parse(value: &str, ids_to_floats: bool) -> Result<ExampleId> {
        if ids_to_floats {
            safe_float(value).map(ExampleId::Float).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "ids_to_floats is set but example id {:?} is not a number",
                    value
                ))
            })
        } else {
            Ok(ExampleId::Text(value.to_string()))
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExampleId::Text(text) => Some(text),
            ExampleId::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ExampleId::Float(value) => Some(*value),
            ExampleId::Text(_) => None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ExampleId::Float(_))
    }

    /// Hashable key used for uniqueness and alignment checks.
    pub(crate) fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleId::Text(text) => write!(f, "{}", text),
            ExampleId::Float(value) => write!(f, "{}", format_value(*value)),
        }
    }
}

/// Regression target or class name.
#[derive(Clone, Debug, PartialEq)]
pub enum Label {
    Number(f64),
    Text(String),
}

impl Label {
    /// Numeric text becomes a number, anything else stays text.
    pub fn parse(value: &str) -> Label {
        match safe_float(value) {
            Some(number) => Label::Number(number),
            None => Label::Text(value.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Label::Number(number) => Some(*number),
            Label::Text(text) => safe_float(text),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Label::Number(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(number) => write!(f, "{}", format_value(*number)),
            Label::Text(text) => write!(f, "{}", text),
        }
    }
}

/// One labelled, sparse data point as read from or written to a feature file.
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    pub id: ExampleId,
    pub label: Option<Label>,
    pub features: BTreeMap<String, f64>,
}

impl Example {
    pub fn new(id: ExampleId, label: Option<Label>, features: BTreeMap<String, f64>) -> Example {
        Example { id, label, features }
    }
}

/// Ordered collection of examples sharing one feature vocabulary.
///
/// `X` is keyed by `(row, column)` and only stores non-zero values; the columns follow
/// `vocabulary`, which also registers names whose values were all zero.
#[derive(Clone)]
pub struct FeatureSet {
    pub name: String,
    pub ids: Vec<ExampleId>,
    pub labels: Vec<Option<Label>>,
    pub X: HashMap<(usize, usize), f64>,
    pub vocabulary: FeatureVocabulary,
    pub vectorizer: Vectorizer,
}

impl FeatureSet {
    pub fn new(name: &str, vectorizer: Vectorizer) -> FeatureSet {
        FeatureSet {
            name: name.to_string(),
            ids: Vec::new(),
            labels: Vec::new(),
            X: HashMap::new(),
            vocabulary: FeatureVocabulary::new(),
            vectorizer,
        }
    }

    /// Vectorize in-memory examples: sorted vocabulary over every feature name seen.
    pub fn from_examples(name: &str, examples: Vec<Example>, vectorizer: Vectorizer) -> Result<FeatureSet> {
        let vocabulary = FeatureVocabulary::from_names(
            examples.iter().flat_map(|example| example.features.keys().cloned()),
        );

        let mut seen: HashSet<String> = HashSet::with_capacity(examples.len());
        let mut ids = Vec::with_capacity(examples.len());
        let mut labels = Vec::with_capacity(examples.len());
        let mut X = HashMap::new();

        for (row, example) in examples.into_iter().enumerate() {
            if !seen.insert(example.id.key()) {
                return Err(Error::DuplicateId(format!(
                    "example id {} appears more than once in {}",
                    example.id, name
                )));
            }
            for (feature, value) in example.features {
                if value != 0.0 {
                    // every name is in the vocabulary by construction
                    if let Some(column) = vocabulary.index_of(&feature) {
                        X.insert((row, column), value);
                    }
                }
            }
            ids.push(example.id);
            labels.push(example.label);
        }

        debug!("{}: {} examples, {} features, {:?}", name, ids.len(), vocabulary.len(), vectorizer);

        Ok(FeatureSet { name: name.to_string(), ids, labels, X, vocabulary, vectorizer })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_names(&self) -> &[String] {
        self.vocabulary.names()
    }

    /// True if at least one example carries a label.
    pub fn has_labels(&self) -> bool {
        self.labels.iter().any(Option::is_some)
    }

    pub fn value(&self, row: usize, feature: &str) -> f64 {
        self.vocabulary
            .index_of(feature)
            .and_then(|column| self.X.get(&(row, column)).copied())
            .unwrap_or(0.0)
    }

    /// Non-zero features of one row, by name.
    pub fn row(&self, row: usize) -> BTreeMap<String, f64> {
        (0..self.feature_len())
            .filter_map(|column| {
                self.X
                    .get(&(row, column))
                    .map(|value| (self.vocabulary.names()[column].clone(), *value))
            })
            .collect()
    }

    /// Iterate over `(id, label, features)` triples, zero-valued features omitted.
    pub fn iter(&self) -> impl Iterator<Item = (&ExampleId, Option<&Label>, BTreeMap<String, f64>)> + '_ {
        (0..self.len()).map(move |row| (&self.ids[row], self.labels[row].as_ref(), self.row(row)))
    }

    pub fn examples(&self) -> Vec<Example> {
        self.iter()
            .map(|(id, label, features)| Example::new(id.clone(), label.cloned(), features))
            .collect()
    }

    /// Sparse matrix in the vectorizer's column space. Hashed columns sum colliding features.
    pub fn transform(&self) -> HashMap<(usize, usize), f64> {
        match self.vectorizer {
            Vectorizer::Dict => self.X.clone(),
            Vectorizer::Hasher(hasher) => {
                let buckets: Vec<(usize, f64)> =
                    self.vocabulary.names().iter().map(|name| hasher.bucket(name)).collect();
                let mut hashed: HashMap<(usize, usize), f64> = HashMap::new();
                for (&(row, column), value) in self.X.iter() {
                    let (bucket, sign) = buckets[column];
                    *hashed.entry((row, bucket)).or_insert(0.0) += sign * value;
                }
                hashed.retain(|_, value| *value != 0.0);
                hashed
            }
        }
    }

    /// Express the rows against another, already fitted vocabulary. Unknown names are dropped.
    pub fn vectorize_with(&self, vocabulary: &FeatureVocabulary) -> HashMap<(usize, usize), f64> {
        let mapping: Vec<Option<usize>> =
            self.vocabulary.names().iter().map(|name| vocabulary.index_of(name)).collect();
        self.X
            .iter()
            .filter_map(|(&(row, column), value)| mapping[column].map(|target| ((row, target), *value)))
            .collect()
    }

    /// Restrict the set to the given feature names, keeping every example.
    pub fn select_features<S: AsRef<str>>(&self, names: &[S]) -> FeatureSet {
        let kept: Vec<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| {
                let known = self.vocabulary.contains(name);
                if !known {
                    warn!("Feature {} is not part of {} and is ignored", name, self.name);
                }
                known
            })
            .collect();
        self.restrict_columns(FeatureVocabulary::from_names(kept))
    }

    /// Keep features that are non-zero in at least `min_count` examples.
    pub fn select_by_min_count(&self, min_count: usize) -> FeatureSet {
        let mut counts = vec![0usize; self.feature_len()];
        for &(_, column) in self.X.keys() {
            counts[column] += 1;
        }
        let kept = self
            .vocabulary
            .names()
            .iter()
            .zip(counts.iter())
            .filter(|(_, &count)| count >= min_count.max(1))
            .map(|(name, _)| name.clone());
        let vocabulary = FeatureVocabulary::from_names(kept);
        debug!("{} of {} features kept with min_count={}", vocabulary.len(), self.feature_len(), min_count);
        self.restrict_columns(vocabulary)
    }

    fn restrict_columns(&self, vocabulary: FeatureVocabulary) -> FeatureSet {
        let X = self.vectorize_with(&vocabulary);
        FeatureSet {
            name: self.name.clone(),
            ids: self.ids.clone(),
            labels: self.labels.clone(),
            X,
            vocabulary,
            vectorizer: self.vectorizer,
        }
    }

    /// Rows reordered to follow `ids`, which must be a permutation of this set's ids.
    pub fn reorder(&self, ids: &[ExampleId]) -> Result<FeatureSet> {
        if ids.len() != self.len() {
            return Err(Error::ShapeMismatch(format!(
                "cannot reorder {} examples of {} to {} ids",
                self.len(),
                self.name,
                ids.len()
            )));
        }
        let position: HashMap<String, usize> =
            self.ids.iter().enumerate().map(|(row, id)| (id.key(), row)).collect();

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            match position.get(&id.key()) {
                Some(&row) => rows.push(row),
                None => {
                    return Err(Error::ShapeMismatch(format!("example id {} is missing from {}", id, self.name)))
                }
            }
        }

        let mut new_row_of = vec![0usize; self.len()];
        for (new_row, &old_row) in rows.iter().enumerate() {
            new_row_of[old_row] = new_row;
        }

        Ok(FeatureSet {
            name: self.name.clone(),
            ids: rows.iter().map(|&row| self.ids[row].clone()).collect(),
            labels: rows.iter().map(|&row| self.labels[row].clone()).collect(),
            X: self.X.iter().map(|(&(row, column), value)| ((new_row_of[row], column), *value)).collect(),
            vocabulary: self.vocabulary.clone(),
            vectorizer: self.vectorizer,
        })
    }

    /// Collapse labels through a map of new label -> original labels.
    pub fn collapse_labels(&mut self, class_map: &BTreeMap<String, Vec<String>>) {
        let mut new_label_of: HashMap<&str, &str> = HashMap::new();
        for (new_label, originals) in class_map {
            for original in originals {
                new_label_of.insert(original.as_str(), new_label.as_str());
            }
        }
        for label in self.labels.iter_mut().flatten() {
            let current = label.to_string();
            if let Some(new_label) = new_label_of.get(current.as_str()) {
                debug!("Label {} collapsed to {}", current, new_label);
                *label = Label::parse(new_label);
            }
        }
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}   Examples: {}   Features: {}", self.name, self.len(), self.feature_len())?;

        let header = self.vocabulary.names().join("\t");
        let truncated_header = truncate(header, 100);
        writeln!(f, "{:<20} {:<10} {}", "id", "label", truncated_header)?;

        // Limit to the first 20 rows
        for row in (0..self.len()).take(20) {
            let row_display: String = (0..self.feature_len())
                .map(|column| self.X.get(&(row, column)).map(|v| format!("{:.2}", v)).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\t");
            let truncated_row = truncate(row_display, 80);
            let label = self.labels[row].as_ref().map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(f, "{:<20} {:<10} {}", self.ids[row].to_string(), label, truncated_row)?;
        }

        Ok(())
    }
}

fn truncate(text: String, width: usize) -> String {
    if text.chars().count() > width {
        format!("{}...", text.chars().take(width - 3).collect::<String>())
    } else {
        text
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
