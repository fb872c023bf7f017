#![allow(non_snake_case)]

pub mod convert;
pub mod error;
pub mod evaluate;
pub mod featureset;
pub mod formats;
pub mod logger;
pub mod merge;
pub mod metrics;
pub mod param;
pub mod utils;
pub mod vectorizer;

pub use convert::{convert, ConvertOptions};
pub use error::{Error, Result};
pub use evaluate::compute_eval_from_predictions;
pub use featureset::{Example, ExampleId, FeatureSet, Label};
pub use formats::{
    build_label_map, load_examples, write_feature_file, write_subsets, FormatKind, LabelMap, LoadOptions,
    WriteOptions,
};
pub use merge::{load_featureset, merge_featuresets};
pub use metrics::{kappa, use_score_func, Kappa, KappaWeights, Metric, Rating};
pub use vectorizer::{FeatureHasher, FeatureVocabulary, Vectorizer};

use log::{debug, info};
use param::Param;

/// Load every featureset listed in the `data` section, each merged from its files.
pub fn load_featuresets(param: &Param) -> Result<Vec<FeatureSet>> {
    let start = std::time::Instant::now();
    let options = param.load_options();

    let mut sets = Vec::with_capacity(param.data.featuresets.len());
    for featureset in &param.data.featuresets {
        debug!("Loading featureset {:?} from {}...", featureset, param.data.train_directory);
        let set = load_featureset(&param.data.train_directory, featureset, &param.data.suffix, &options)?;
        sets.push(set);
    }

    info!("{} featureset(s) loaded in {:.2?}", sets.len(), start.elapsed());
    Ok(sets)
}
