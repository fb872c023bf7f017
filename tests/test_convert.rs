mod common;

use common::{assert_same_examples, make_merging_data};
use featlab::{
    convert, load_examples, load_featureset, write_feature_file, write_subsets, ConvertOptions, FormatKind,
    LoadOptions, WriteOptions,
};

/// Every subset is converted from one format to another; merging the converted files must
/// give back the pre-merged file written directly in the target format.
#[test]
fn test_conversion_between_every_pair_of_formats() {
    let (full, subsets) = make_merging_data(100, 5, 7, false, 1234567890);
    let subset_names: Vec<&String> = subsets.keys().collect();

    for from in FormatKind::SUFFIXES {
        for to in FormatKind::SUFFIXES {
            if from == to {
                continue;
            }
            let context = format!("{} -> {}", from, to);
            let source = tempfile::tempdir().unwrap();
            let target = tempfile::tempdir().unwrap();

            write_subsets(source.path(), from, &full, &subsets, &WriteOptions::default()).unwrap();
            write_feature_file(target.path().join(format!("all{}", to)), &full, &WriteOptions::default()).unwrap();

            for name in &subset_names {
                convert(
                    source.path().join(format!("{}{}", name, from)),
                    target.path().join(format!("{}{}", name, to)),
                    &ConvertOptions::default(),
                )
                .unwrap_or_else(|e| panic!("{}: converting {} failed: {}", context, name, e));
            }

            let merged = load_featureset(target.path(), &subset_names, to, &LoadOptions::default()).unwrap();
            let premerged = load_examples(target.path().join(format!("all{}", to)), &LoadOptions::default()).unwrap();
            assert_same_examples(&merged, &premerged, &context);
        }
    }
}

#[test]
fn test_conversion_keeps_missing_labels() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("partial.jsonlines");
    std::fs::write(
        &source,
        "{\"id\": \"a\", \"y\": 1, \"x\": {\"f1\": 2}}\n{\"id\": \"b\", \"x\": {\"f1\": 1}}\n",
    )
    .unwrap();

    for suffix in [".tsv", ".csv", ".arff", ".megam", ".libsvm"] {
        let output = dir.path().join(format!("partial{}", suffix));
        convert(&source, &output, &ConvertOptions::default()).unwrap();
        let converted = load_examples(&output, &LoadOptions::default()).unwrap();
        assert_eq!(converted.labels[1], None, "{}: a missing label must stay missing", suffix);
        assert_eq!(converted.value(0, "f1"), 2.0, "{}: values must survive", suffix);
    }
}
