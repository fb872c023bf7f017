use featlab::{compute_eval_from_predictions, Error, LoadOptions};

const EXAMPLES: &str = "samples/other/test_eval_examples.jsonlines";
const PREDICTIONS: &str = "samples/other/test_eval_predictions.tsv";

#[test]
fn test_compute_eval_from_predictions() {
    let scores =
        compute_eval_from_predictions(EXAMPLES, PREDICTIONS, &["pearson", "unweighted_kappa"], &LoadOptions::default())
            .unwrap();
    assert_eq!(scores.len(), 2, "one score per requested metric");
    assert!((scores["pearson"] - 9.0 / 11.0).abs() < 1e-9, "pearson was {}", scores["pearson"]);
    assert!((scores["unweighted_kappa"] - 7.0 / 13.0).abs() < 1e-9, "unweighted_kappa was {}", scores["unweighted_kappa"]);
}

#[test]
fn test_compute_eval_every_metric() {
    let names = [
        "unweighted_kappa",
        "linear_weighted_kappa",
        "quadratic_weighted_kappa",
        "uwk_off_by_one",
        "lwk_off_by_one",
        "qwk_off_by_one",
        "pearson",
        "spearman",
        "kendall_tau",
        "accuracy",
        "r2",
        "mean_squared_error",
    ];
    let scores = compute_eval_from_predictions(EXAMPLES, PREDICTIONS, &names, &LoadOptions::default()).unwrap();
    for name in names {
        assert!(scores[name].is_finite(), "{} should be defined on this data", name);
    }
    assert!((scores["accuracy"] - 4.0 / 6.0).abs() < 1e-9);
    assert!((scores["mean_squared_error"] - 2.0 / 6.0).abs() < 1e-9);
    assert_eq!(scores["qwk_off_by_one"], 1.0, "every error is off by one");
}

#[test]
fn test_compute_eval_reversed_inputs_fail() {
    let result = compute_eval_from_predictions(EXAMPLES, EXAMPLES, &["pearson"], &LoadOptions::default());
    assert!(result.is_err(), "a feature file is not a predictions file");
    let result = compute_eval_from_predictions(PREDICTIONS, PREDICTIONS, &["pearson"], &LoadOptions::default());
    assert!(matches!(result, Err(Error::InvalidArgument(_))), "the predictions file has no labels");
}
