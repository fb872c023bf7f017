use crate::formats::{FormatKind, LoadOptions};
use crate::vectorizer::Vectorizer;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    #[serde(default = "empty_string")]
    pub train_directory: String,
    /// each featureset is the list of file stems merged together
    #[serde(default = "featuresets_default")]
    pub featuresets: Vec<Vec<String>>,
    #[serde(default = "suffix_default")]
    pub suffix: String,
    #[serde(default = "label_col_default")]
    pub label_col: String,
    #[serde(default = "id_col_default")]
    pub id_col: String,
    #[serde(default = "false_default")]
    pub ids_to_floats: bool,
    #[serde(default = "false_default")]
    pub feature_hasher: bool,
    #[serde(default = "uzero_default")]
    pub hasher_features: usize,
    #[serde(default = "class_map_default")]
    pub class_map: BTreeMap<String, Vec<String>>,
}

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loading options described by the `data` section.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            ids_to_floats: self.data.ids_to_floats,
            label_col: self.data.label_col.clone(),
            id_col: self.data.id_col.clone(),
            vectorizer: if self.data.feature_hasher {
                Vectorizer::hashing(self.data.hasher_features)
            } else {
                Vectorizer::Dict
            },
            class_map: if self.data.class_map.is_empty() { None } else { Some(self.data.class_map.clone()) },
        }
    }
}

pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if param.data.feature_hasher && param.data.hasher_features == 0 {
        return Err("feature_hasher=true requires a positive hasher_features.".to_string());
    }

    if !param.data.feature_hasher && param.data.hasher_features > 0 {
        warn!("hasher_features={} is ignored because feature_hasher is false.", param.data.hasher_features);
    }

    if let Err(e) = FormatKind::from_suffix(&param.data.suffix) {
        return Err(format!("Invalid suffix={:?} ({}). Expected one of {:?}.", param.data.suffix, e, FormatKind::SUFFIXES));
    }
    if !param.data.suffix.starts_with('.') {
        param.data.suffix = format!(".{}", param.data.suffix);
    }

    if param.data.label_col.is_empty() || param.data.id_col.is_empty() {
        return Err("label_col and id_col cannot be empty.".to_string());
    }

    if param.data.label_col == param.data.id_col {
        return Err(format!("label_col and id_col cannot both be {:?}.", param.data.label_col));
    }

    if param.data.featuresets.is_empty() || param.data.featuresets.iter().any(|f| f.is_empty()) {
        warn!("No (or an empty) featureset is configured: nothing will be loaded for it.");
    }

    validate_class_map(param)?;
    Ok(())
}

fn validate_class_map(param: &Param) -> Result<(), String> {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for (new_label, originals) in &param.data.class_map {
        for original in originals {
            if let Some(previous) = owner.insert(original, new_label) {
                if previous != new_label {
                    return Err(format!(
                        "Invalid class_map: label {:?} is mapped to both {:?} and {:?}.",
                        original, previous, new_label
                    ));
                }
            }
        }
    }
    Ok(())
}

// Default value definitions

fn empty_string() -> String {
    "".to_string()
}
fn featuresets_default() -> Vec<Vec<String>> {
    Vec::new()
}
fn suffix_default() -> String {
    ".jsonlines".to_string()
}
fn label_col_default() -> String {
    "y".to_string()
}
fn id_col_default() -> String {
    "id".to_string()
}
fn class_map_default() -> BTreeMap<String, Vec<String>> {
    BTreeMap::new()
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn false_default() -> bool {
    false
}
fn uzero_default() -> usize {
    0
}
