use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::featureset::{ExampleId, Label};
use crate::formats::{load_examples, LoadOptions};
use crate::metrics::{accuracy, use_score_func, Metric};
use crate::utils::safe_float;

/// Score a predictions file against the labels of a feature file.
///
/// Predictions are read from a tab-separated file with `id` and `prediction` columns and
/// matched to the examples by id. The result maps each metric name to its value.
pub fn compute_eval_from_predictions<P, Q, S>(
    examples_path: P,
    predictions_path: Q,
    metrics: &[S],
    options: &LoadOptions,
) -> Result<BTreeMap<String, f64>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    S: AsRef<str>,
{
    let metrics: Vec<Metric> = metrics.iter().map(|m| m.as_ref().parse()).collect::<Result<_>>()?;
    let gold = load_examples(examples_path.as_ref(), options)?;
    let predictions = read_predictions(predictions_path.as_ref(), options)?;

    let mut labels: Vec<&Label> = Vec::with_capacity(gold.len());
    let mut predicted: Vec<&str> = Vec::with_capacity(gold.len());
    for (id, label) in gold.ids.iter().zip(gold.labels.iter()) {
        let label = label
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument(format!("example {} has no label to evaluate against", id)))?;
        let prediction = predictions
            .get(&id.key())
            .ok_or_else(|| Error::ShapeMismatch(format!("no prediction for example {}", id)))?;
        labels.push(label);
        predicted.push(prediction);
    }
    if predictions.len() > gold.len() {
        debug!("{} predictions have no matching example", predictions.len() - gold.len());
    }

    let mut scores = BTreeMap::new();
    for metric in metrics {
        let score = if metric == Metric::Accuracy {
            let gold_classes: Vec<Label> = labels.iter().map(|l| (*l).clone()).collect();
            let predicted_classes: Vec<Label> = predicted.iter().map(|p| Label::parse(p)).collect();
            accuracy(&gold_classes, &predicted_classes)?
        } else {
            let y_true = labels
                .iter()
                .map(|l| l.as_f64().ok_or_else(|| Error::InvalidArgument(format!("{} needs numeric labels, got {}", metric, l))))
                .collect::<Result<Vec<f64>>>()?;
            let y_pred = predicted
                .iter()
                .map(|p| safe_float(p).ok_or_else(|| Error::InvalidArgument(format!("{} needs numeric predictions, got {:?}", metric, p))))
                .collect::<Result<Vec<f64>>>()?;
            use_score_func(&metric, &y_true, &y_pred)?
        };
        info!("{}: {}", metric, score);
        scores.insert(metric.name().to_string(), score);
    }

    Ok(scores)
}

/// Prediction text per example id key.
fn read_predictions(path: &Path, options: &LoadOptions) -> Result<HashMap<String, String>> {
    let mut reader = ReaderBuilder::new().delimiter(b'\t').has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::format(path, 1, format!("missing {:?} column", name)))
    };
    let (id_column, prediction_column) = (column("id")?, column("prediction")?);

    let mut predictions = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let (Some(id), Some(prediction)) = (record.get(id_column), record.get(prediction_column)) else {
            return Err(Error::format(path, line, "row is shorter than the header"));
        };
        let key = ExampleId::parse(id.trim(), options.ids_to_floats)?.key();
        if predictions.insert(key, prediction.trim().to_string()).is_some() {
            return Err(Error::DuplicateId(format!("{} is predicted more than once in {}", id, path.display())));
        }
    }
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_eval_from_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let examples = dir.path().join("gold.tsv");
        let predictions = dir.path().join("pred.tsv");
        fs::write(&examples, "id\tf1\ty\nEXAMPLE_1\t1\t1\nEXAMPLE_2\t0\t2\nEXAMPLE_3\t1\t4\n").unwrap();
        fs::write(&predictions, "id\tprediction\nEXAMPLE_3\t2\nEXAMPLE_1\t1\nEXAMPLE_2\t2\n").unwrap();

        let scores = compute_eval_from_predictions(
            &examples,
            &predictions,
            &["qwk_off_by_one", "accuracy", "mean_squared_error"],
            &LoadOptions::default(),
        )
        .unwrap();
        assert!((scores["qwk_off_by_one"] - 0.5).abs() < 1e-9, "predictions are matched by id, not by row");
        assert!((scores["accuracy"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((scores["mean_squared_error"] - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_eval_missing_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let examples = dir.path().join("gold.tsv");
        let predictions = dir.path().join("pred.tsv");
        fs::write(&examples, "id\tf1\ty\na\t1\t1\nb\t0\t2\n").unwrap();
        fs::write(&predictions, "id\tprediction\na\t1\n").unwrap();

        let result = compute_eval_from_predictions(&examples, &predictions, &["pearson"], &LoadOptions::default());
        assert!(matches!(result, Err(Error::ShapeMismatch(_))), "every example needs a prediction");

        let unknown = compute_eval_from_predictions(&examples, &predictions, &["nope"], &LoadOptions::default());
        assert!(matches!(unknown, Err(Error::InvalidArgument(_))), "unknown metrics are rejected up front");
    }
}
