//! Feature file formats.
//!
//! Every format reads into a list of [`Example`]s and writes from a [`FeatureSet`]; the
//! format itself is picked from the file extension, the same way experiments are saved
//! and loaded by extension.

pub mod arff;
pub mod delimited;
pub mod jsonlines;
pub mod libsvm;
pub mod megam;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::featureset::{Example, ExampleId, FeatureSet};
use crate::vectorizer::{FeatureVocabulary, Vectorizer};

pub use libsvm::{build_label_map, LabelMap, MISSING_LABEL};

/// Supported serialization formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatKind {
    JsonLines,
    Tsv,
    Csv,
    Arff,
    Megam,
    Libsvm,
}

impl FormatKind {
    pub const SUFFIXES: [&'static str; 7] = [".jsonlines", ".ndj", ".tsv", ".csv", ".arff", ".megam", ".libsvm"];

    /// Format for a suffix such as `.jsonlines` (the leading dot is optional).
    pub fn from_suffix(suffix: &str) -> Result<FormatKind> {
        match suffix.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jsonlines" | "ndj" => Ok(FormatKind::JsonLines),
            "tsv" => Ok(FormatKind::Tsv),
            "csv" => Ok(FormatKind::Csv),
            "arff" => Ok(FormatKind::Arff),
            "megam" => Ok(FormatKind::Megam),
            "libsvm" => Ok(FormatKind::Libsvm),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<FormatKind> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        FormatKind::from_suffix(ext)
    }

    pub fn read(&self, path: &Path, options: &LoadOptions) -> Result<Vec<Example>> {
        match self {
            FormatKind::JsonLines => jsonlines::read(path, options),
            FormatKind::Tsv => delimited::read(path, b'\t', options),
            FormatKind::Csv => delimited::read(path, b',', options),
            FormatKind::Arff => arff::read(path, options),
            FormatKind::Megam => megam::read(path, options),
            FormatKind::Libsvm => libsvm::read(path, options),
        }
    }

    pub fn write(&self, path: &Path, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
        match self {
            FormatKind::JsonLines => jsonlines::write(path, set, options),
            FormatKind::Tsv => delimited::write(path, b'\t', set, options),
            FormatKind::Csv => delimited::write(path, b',', set, options),
            FormatKind::Arff => arff::write(path, set, options),
            FormatKind::Megam => megam::write(path, set),
            FormatKind::Libsvm => libsvm::write(path, set, options),
        }
    }
}

/// How feature files are interpreted while loading.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    pub ids_to_floats: bool,
    pub label_col: String,
    pub id_col: String,
    pub vectorizer: Vectorizer,
    /// new label -> original labels it replaces
    pub class_map: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            ids_to_floats: false,
            label_col: "y".to_string(),
            id_col: "id".to_string(),
            vectorizer: Vectorizer::Dict,
            class_map: None,
        }
    }
}

/// How feature files are laid out while writing.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOptions {
    pub label_col: String,
    pub id_col: String,
    /// libsvm only; derived from the written labels when absent
    pub label_map: Option<LabelMap>,
    /// libsvm only; fixes the feature indices, e.g. to share them between subset files
    pub feature_vocabulary: Option<FeatureVocabulary>,
    /// ARFF relation name, defaults to the feature set name
    pub relation: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            label_col: "y".to_string(),
            id_col: "id".to_string(),
            label_map: None,
            feature_vocabulary: None,
            relation: None,
        }
    }
}

/// Default id for an example that does not carry one.
pub(crate) fn default_id(row: usize, options: &LoadOptions) -> Result<ExampleId> {
    ExampleId::parse(&format!("EXAMPLE_{}", row), options.ids_to_floats)
}

/// Load one feature file into a [`FeatureSet`] named after the file stem.
pub fn load_examples<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<FeatureSet> {
    let path = path.as_ref();
    let kind = FormatKind::from_path(path)?;
    info!("Loading {}...", path.display());

    let examples = kind.read(path, options)?;
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("featureset");
    let mut set = FeatureSet::from_examples(name, examples, options.vectorizer)?;
    if let Some(class_map) = &options.class_map {
        set.collapse_labels(class_map);
    }

    debug!("{:?}: {} examples, {} features", kind, set.len(), set.feature_len());
    Ok(set)
}

/// Write a feature set, the format following the extension of `path`.
pub fn write_feature_file<P: AsRef<Path>>(path: P, set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let kind = FormatKind::from_path(path)?;
    info!("Writing {} examples to {}...", set.len(), path.display());
    kind.write(path, set, options)
}

/// Write one file `<dir>/<subset><suffix>` per named subset of feature names.
pub fn write_subsets<P: AsRef<Path>>(
    dir: P,
    suffix: &str,
    set: &FeatureSet,
    subsets: &BTreeMap<String, Vec<String>>,
    options: &WriteOptions,
) -> Result<()> {
    let kind = FormatKind::from_suffix(suffix)?;
    for (subset_name, features) in subsets {
        let path = dir.as_ref().join(format!("{}{}", subset_name, suffix));
        let mut subset = set.select_features(features);
        subset.name = subset_name.clone();
        info!("Writing subset {} ({} features) to {}...", subset_name, subset.feature_len(), path.display());
        kind.write(&path, &subset, options)?;
    }
    Ok(())
}

pub(crate) fn check_column_names(set: &FeatureSet, options: &WriteOptions) -> Result<()> {
    for reserved in [&options.id_col, &options.label_col] {
        if set.vocabulary.contains(reserved) {
            return Err(Error::InvalidArgument(format!(
                "feature name {} clashes with the id or label column",
                reserved
            )));
        }
    }
    Ok(())
}
