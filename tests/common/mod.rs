//! Synthetic feature data shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use featlab::{Example, ExampleId, FeatureSet, Label, Vectorizer};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// `num_examples` examples labelled dog/cat alternately, with `num_subsets` groups of
/// `features_per_subset` integer-valued features in 0..=4.
///
/// Returns the full set and the subset name -> feature names map.
pub fn make_merging_data(
    num_examples: usize,
    num_subsets: usize,
    features_per_subset: usize,
    numeric_ids: bool,
    seed: u64,
) -> (FeatureSet, BTreeMap<String, Vec<String>>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let num_features = num_subsets * features_per_subset;
    let feature_names: Vec<String> = (0..num_features).map(|j| format!("f{:03}", j)).collect();

    let examples: Vec<Example> = (0..num_examples)
        .map(|i| {
            let class = if i % 2 == 0 { "dog" } else { "cat" };
            let id = if numeric_ids { ExampleId::Float(i as f64) } else { ExampleId::Text(format!("{}{}", class, i)) };
            let features = feature_names.iter().map(|name| (name.clone(), rng.gen_range(0..=4) as f64)).collect();
            Example::new(id, Some(Label::Text(class.to_string())), features)
        })
        .collect();

    let subsets = (0..num_subsets)
        .map(|s| {
            let names = feature_names[s * features_per_subset..(s + 1) * features_per_subset].to_vec();
            (format!("subset_{}", s + 1), names)
        })
        .collect();

    (FeatureSet::from_examples("all", examples, Vectorizer::Dict).unwrap(), subsets)
}

/// Same examples, same labels, same values, ignoring the set name.
pub fn assert_same_examples(actual: &FeatureSet, expected: &FeatureSet, context: &str) {
    assert_eq!(actual.ids, expected.ids, "{}: ids or their order differ", context);
    assert_eq!(actual.labels, expected.labels, "{}: labels differ", context);
    assert_eq!(actual.feature_names(), expected.feature_names(), "{}: vocabularies differ", context);
    for row in 0..expected.len() {
        assert_eq!(actual.row(row), expected.row(row), "{}: features of row {} differ", context, row);
    }
}
