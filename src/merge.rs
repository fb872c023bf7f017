//! Column-wise merging of feature sets that describe the same examples.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::featureset::{FeatureSet, Label};
use crate::formats::{load_examples, FormatKind, LoadOptions};
use crate::vectorizer::FeatureVocabulary;

const MAX_LISTED_FEATURES: usize = 5;

/// Load `<dir>/<name><suffix>` for every name of the featureset and merge them.
pub fn load_featureset<P, S>(dir: P, featureset: &[S], suffix: &str, options: &LoadOptions) -> Result<FeatureSet>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    FormatKind::from_suffix(suffix)?;
    if featureset.is_empty() {
        return Err(Error::InvalidArgument("a featureset needs at least one file".to_string()));
    }

    let sets = featureset
        .iter()
        .map(|name| load_examples(dir.as_ref().join(format!("{}{}", name.as_ref(), suffix)), options))
        .collect::<Result<Vec<_>>>()?;

    merge_featuresets(&sets)
}

/// Merge sets holding the same examples and disjoint features into one.
///
/// The first set fixes the row order. Labels must agree wherever more than one set has
/// one, and a feature name may only come from a single set.
pub fn merge_featuresets(sets: &[FeatureSet]) -> Result<FeatureSet> {
    let (first, others) = sets
        .split_first()
        .ok_or_else(|| Error::InvalidArgument("no feature sets to merge".to_string()))?;
    if others.is_empty() {
        return Ok(first.clone());
    }

    for set in others {
        if set.vectorizer != first.vectorizer {
            return Err(Error::InvalidArgument(format!(
                "{} and {} use different vectorizers ({:?} vs {:?})",
                first.name, set.name, first.vectorizer, set.vectorizer
            )));
        }
    }

    for set in sets {
        let mut seen = HashSet::with_capacity(set.len());
        if let Some(id) = set.ids.iter().find(|id| !seen.insert(id.key())) {
            return Err(Error::DuplicateId(format!("example id {} appears more than once in {}", id, set.name)));
        }
    }

    let first_keys: HashSet<String> = first.ids.iter().map(|id| id.key()).collect();
    for set in others {
        if set.len() != first.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} has {} examples but {} has {}",
                first.name,
                first.len(),
                set.name,
                set.len()
            )));
        }
        if let Some(id) = set.ids.iter().find(|id| !first_keys.contains(&id.key())) {
            return Err(Error::ShapeMismatch(format!(
                "example id {} of {} is missing from {}",
                id, set.name, first.name
            )));
        }
    }

    let aligned: Vec<FeatureSet> = others.iter().map(|set| set.reorder(&first.ids)).collect::<Result<_>>()?;
    let all: Vec<&FeatureSet> = std::iter::once(first).chain(aligned.iter()).collect();

    let labels = merge_labels(&all)?;

    let mut vocabulary = FeatureVocabulary::new();
    for set in &all {
        let shared = vocabulary.intersection(&set.vocabulary);
        if !shared.is_empty() {
            let listed: Vec<&str> = shared.iter().take(MAX_LISTED_FEATURES).map(String::as_str).collect();
            return Err(Error::AmbiguousMerge(format!(
                "{} feature(s) of {} are already defined, e.g. {}",
                shared.len(),
                set.name,
                listed.join(", ")
            )));
        }
        vocabulary = vocabulary.union(&set.vocabulary);
    }

    let mut X = HashMap::new();
    for set in &all {
        X.extend(set.vectorize_with(&vocabulary));
    }

    let name = all.iter().map(|set| set.name.as_str()).collect::<Vec<_>>().join("+");
    info!("Merged {} feature sets into {}: {} examples, {} features", all.len(), name, first.len(), vocabulary.len());

    Ok(FeatureSet {
        name,
        ids: first.ids.clone(),
        labels,
        X,
        vocabulary,
        vectorizer: first.vectorizer,
    })
}

/// Per row, the first label any set gives. Two sets that both label a row must agree.
fn merge_labels(sets: &[&FeatureSet]) -> Result<Vec<Option<Label>>> {
    let rows = sets.first().map_or(0, |set| set.len());
    let mut labels: Vec<Option<Label>> = vec![None; rows];
    let mut source: Vec<usize> = vec![0; rows];

    for (index, set) in sets.iter().enumerate() {
        if !set.has_labels() {
            debug!("{} carries no labels", set.name);
            continue;
        }
        for (row, label) in set.labels.iter().enumerate() {
            let Some(label) = label else { continue };
            if labels[row].is_none() {
                labels[row] = Some(label.clone());
                source[row] = index;
            } else if labels[row].as_ref() != Some(label) {
                return Err(Error::LabelConflict(format!(
                    "example {} is labelled {} in {} but {} in {}",
                    set.ids[row],
                    labels[row].as_ref().map(|l| l.to_string()).unwrap_or_default(),
                    sets[source[row]].name,
                    label,
                    set.name
                )));
            }
        }
    }

    Ok(labels)
}
