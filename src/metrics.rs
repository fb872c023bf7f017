//! Agreement and correlation metrics between gold and predicted values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::warn;
use statrs::statistics::Statistics;

use crate::error::{Error, Result};
use crate::utils::average_ranks;

//-----------------------------------------------------------------------------
// Ratings
//-----------------------------------------------------------------------------

/// Anything that can stand for an integer rating level.
pub trait Rating {
    fn to_rating(&self) -> Result<i64>;
}

macro_rules! impl_integer_rating {
    ($($t:ty),*) => {
        $(impl Rating for $t {
            fn to_rating(&self) -> Result<i64> {
                i64::try_from(*self)
                    .map_err(|_| Error::InvalidArgument(format!("rating {} does not fit in an i64", self)))
            }
        })*
    };
}

impl_integer_rating!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

fn round_rating(value: f64) -> Result<i64> {
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(Error::InvalidArgument(format!("rating {} cannot be cast to an integer", value)));
    }
    Ok(rounded as i64)
}

impl Rating for f64 {
    fn to_rating(&self) -> Result<i64> {
        round_rating(*self)
    }
}

impl Rating for f32 {
    fn to_rating(&self) -> Result<i64> {
        round_rating(*self as f64)
    }
}

impl Rating for str {
    fn to_rating(&self) -> Result<i64> {
        let value: f64 = self
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("rating {:?} is not a number", self)))?;
        round_rating(value)
    }
}

impl Rating for String {
    fn to_rating(&self) -> Result<i64> {
        self.as_str().to_rating()
    }
}

impl<T: Rating + ?Sized> Rating for &T {
    fn to_rating(&self) -> Result<i64> {
        (**self).to_rating()
    }
}

//-----------------------------------------------------------------------------
// Kappa
//-----------------------------------------------------------------------------

/// Penalty given to a disagreement, as a function of the distance between levels.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum KappaWeights {
    /// Every disagreement costs 1.
    #[default]
    Unweighted,
    /// Cost grows with the distance.
    Linear,
    /// Cost grows with the squared distance.
    Quadratic,
    /// Explicit `n x n` costs indexed from the lowest rating level.
    Custom(Vec<Vec<f64>>),
}

impl KappaWeights {
    /// `None` is unweighted; `"linear"` and `"quadratic"` are the only names accepted.
    pub fn parse(name: Option<&str>) -> Result<KappaWeights> {
        match name {
            None => Ok(KappaWeights::Unweighted),
            Some(name) => name.parse(),
        }
    }
}

impl FromStr for KappaWeights {
    type Err = Error;

    fn from_str(name: &str) -> Result<KappaWeights> {
        match name {
            "linear" => Ok(KappaWeights::Linear),
            "quadratic" => Ok(KappaWeights::Quadratic),
            other => Err(Error::InvalidArgument(format!(
                "invalid weight scheme {:?}, expected \"linear\" or \"quadratic\"",
                other
            ))),
        }
    }
}

/// Cohen's kappa scorer.
///
/// `kappa = 1 - sum(w * O) / sum(w * E)` where `O` is the observed confusion matrix and `E`
/// the outer product of both rating histograms, each normalised to sum to one. With
/// `allow_off_by_one` every non-zero distance between levels is reduced by one before the
/// weight is taken, so adjacent ratings count as agreement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Kappa {
    pub weights: KappaWeights,
    pub allow_off_by_one: bool,
    pub rating_range: Option<(i64, i64)>,
}

impl Kappa {
    pub fn new(weights: KappaWeights) -> Kappa {
        Kappa { weights, ..Kappa::default() }
    }

    pub fn off_by_one(mut self, allow_off_by_one: bool) -> Kappa {
        self.allow_off_by_one = allow_off_by_one;
        self
    }

    /// Fix the levels instead of deriving them from the data.
    pub fn rating_range(mut self, min_rating: i64, max_rating: i64) -> Kappa {
        self.rating_range = Some((min_rating, max_rating));
        self
    }

    pub fn score<A: Rating, B: Rating>(&self, y_true: &[A], y_pred: &[B]) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(Error::InvalidArgument(format!(
                "kappa needs as many predictions as gold ratings ({} vs {})",
                y_pred.len(),
                y_true.len()
            )));
        }
        if y_true.is_empty() {
            return Err(Error::InvalidArgument("kappa of empty ratings is undefined".to_string()));
        }

        let y_true: Vec<i64> = y_true.iter().map(Rating::to_rating).collect::<Result<_>>()?;
        let y_pred: Vec<i64> = y_pred.iter().map(Rating::to_rating).collect::<Result<_>>()?;

        let (min_rating, max_rating) = match self.rating_range {
            Some((min_rating, max_rating)) => {
                if min_rating > max_rating {
                    return Err(Error::InvalidArgument(format!(
                        "rating range {}..={} is empty",
                        min_rating, max_rating
                    )));
                }
                if let Some(outside) = y_true.iter().chain(&y_pred).find(|r| **r < min_rating || **r > max_rating) {
                    return Err(Error::InvalidArgument(format!(
                        "rating {} is outside {}..={}",
                        outside, min_rating, max_rating
                    )));
                }
                (min_rating, max_rating)
            }
            None => {
                let all = y_true.iter().chain(&y_pred).copied();
                (Iterator::min(all.clone()).unwrap_or(0), Iterator::max(all).unwrap_or(0))
            }
        };
        let span = max_rating.abs_diff(min_rating);
        if let KappaWeights::Custom(matrix) = &self.weights {
            let size = span.saturating_add(1);
            if matrix.len() as u64 != size || matrix.iter().any(|row| row.len() as u64 != size) {
                return Err(Error::InvalidArgument(format!(
                    "custom kappa weights must be a {}x{} matrix",
                    size, size
                )));
            }
        }

        // only levels that occur take part, absent ones add zero to both sums
        let present: Vec<i64> = y_true.iter().chain(&y_pred).copied().collect::<BTreeSet<i64>>().into_iter().collect();
        let index: BTreeMap<i64, usize> = present.iter().enumerate().map(|(i, level)| (*level, i)).collect();
        let levels = present.len();

        let weights: Vec<Vec<f64>> = present
            .iter()
            .map(|a| present.iter().map(|b| self.weight(*a, *b, min_rating, span)).collect::<Vec<f64>>())
            .collect();
        if weights.iter().flatten().all(|w| *w == 0.0) {
            return Ok(1.0);
        }

        let mut observed = vec![vec![0.0f64; levels]; levels];
        let mut hist_true = vec![0.0f64; levels];
        let mut hist_pred = vec![0.0f64; levels];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let (i, j) = (index[t], index[p]);
            observed[i][j] += 1.0;
            hist_true[i] += 1.0;
            hist_pred[j] += 1.0;
        }
        let n = y_true.len() as f64;

        // (i, j) and (j, i) are summed together and counts multiplied first, so swapping raters is exact
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for i in 0..levels {
            for j in i..levels {
                if i == j {
                    numerator += weights[i][i] * observed[i][i];
                    denominator += weights[i][i] * (hist_true[i] * hist_pred[i]);
                } else {
                    numerator += weights[i][j] * observed[i][j] + weights[j][i] * observed[j][i];
                    denominator += weights[i][j] * (hist_true[i] * hist_pred[j])
                        + weights[j][i] * (hist_true[j] * hist_pred[i]);
                }
            }
        }
        let numerator = numerator / n;
        let denominator = denominator / (n * n);

        if denominator == 0.0 {
            return Ok(1.0);
        }
        Ok(1.0 - numerator / denominator)
    }

    /// Disagreement weight between levels `a` and `b` of a range starting at `min_rating`.
    fn weight(&self, a: i64, b: i64, min_rating: i64, span: u64) -> f64 {
        let mut distance = a.abs_diff(b);
        if self.allow_off_by_one && distance > 0 {
            distance -= 1;
        }
        let distance = distance as f64;
        let scale = span.max(1) as f64;
        match &self.weights {
            KappaWeights::Unweighted => {
                if distance > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            KappaWeights::Linear => distance / scale,
            KappaWeights::Quadratic => distance * distance / (scale * scale),
            KappaWeights::Custom(matrix) => matrix[a.abs_diff(min_rating) as usize][b.abs_diff(min_rating) as usize],
        }
    }
}

/// Kappa between gold and predicted ratings over the levels both of them span.
pub fn kappa<A: Rating, B: Rating>(
    y_true: &[A],
    y_pred: &[B],
    weights: KappaWeights,
    allow_off_by_one: bool,
) -> Result<f64> {
    Kappa::new(weights).off_by_one(allow_off_by_one).score(y_true, y_pred)
}

//-----------------------------------------------------------------------------
// Companion metrics
//-----------------------------------------------------------------------------

/// Named evaluation metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    UnweightedKappa,
    LinearWeightedKappa,
    QuadraticWeightedKappa,
    UnweightedKappaOffByOne,
    LinearWeightedKappaOffByOne,
    QuadraticWeightedKappaOffByOne,
    Pearson,
    Spearman,
    KendallTau,
    Accuracy,
    R2,
    MeanSquaredError,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::UnweightedKappa,
        Metric::LinearWeightedKappa,
        Metric::QuadraticWeightedKappa,
        Metric::UnweightedKappaOffByOne,
        Metric::LinearWeightedKappaOffByOne,
        Metric::QuadraticWeightedKappaOffByOne,
        Metric::Pearson,
        Metric::Spearman,
        Metric::KendallTau,
        Metric::Accuracy,
        Metric::R2,
        Metric::MeanSquaredError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::UnweightedKappa => "unweighted_kappa",
            Metric::LinearWeightedKappa => "linear_weighted_kappa",
            Metric::QuadraticWeightedKappa => "quadratic_weighted_kappa",
            Metric::UnweightedKappaOffByOne => "uwk_off_by_one",
            Metric::LinearWeightedKappaOffByOne => "lwk_off_by_one",
            Metric::QuadraticWeightedKappaOffByOne => "qwk_off_by_one",
            Metric::Pearson => "pearson",
            Metric::Spearman => "spearman",
            Metric::KendallTau => "kendall_tau",
            Metric::Accuracy => "accuracy",
            Metric::R2 => "r2",
            Metric::MeanSquaredError => "mean_squared_error",
        }
    }

    fn kappa(&self) -> Option<Kappa> {
        let (weights, off_by_one) = match self {
            Metric::UnweightedKappa => (KappaWeights::Unweighted, false),
            Metric::LinearWeightedKappa => (KappaWeights::Linear, false),
            Metric::QuadraticWeightedKappa => (KappaWeights::Quadratic, false),
            Metric::UnweightedKappaOffByOne => (KappaWeights::Unweighted, true),
            Metric::LinearWeightedKappaOffByOne => (KappaWeights::Linear, true),
            Metric::QuadraticWeightedKappaOffByOne => (KappaWeights::Quadratic, true),
            _ => return None,
        };
        Some(Kappa::new(weights).off_by_one(off_by_one))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(name: &str) -> Result<Metric> {
        Metric::ALL
            .iter()
            .find(|metric| metric.name() == name)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("unknown metric {:?}", name)))
    }
}

/// Score predictions with a named metric.
pub fn use_score_func(metric: &Metric, y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    match metric {
        Metric::Pearson => pearson(y_true, y_pred),
        Metric::Spearman => spearman(y_true, y_pred),
        Metric::KendallTau => kendall_tau(y_true, y_pred),
        Metric::Accuracy => accuracy(y_true, y_pred),
        Metric::R2 => r2(y_true, y_pred),
        Metric::MeanSquaredError => mean_squared_error(y_true, y_pred),
        kappa_metric => match kappa_metric.kappa() {
            Some(kappa) => kappa.score(y_true, y_pred),
            None => Err(Error::InvalidArgument(format!("{} is not a kappa metric", kappa_metric))),
        },
    }
}

fn check_lengths<A, B>(y_true: &[A], y_pred: &[B], minimum: usize) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::InvalidArgument(format!(
            "{} predictions for {} gold values",
            y_pred.len(),
            y_true.len()
        )));
    }
    if y_true.len() < minimum {
        return Err(Error::InvalidArgument(format!("at least {} values are needed", minimum)));
    }
    Ok(())
}

/// Pearson correlation; NaN when either side is constant.
pub fn pearson(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred, 2)?;
    let sd_true = y_true.iter().std_dev();
    let sd_pred = y_pred.iter().std_dev();
    if sd_true == 0.0 || sd_pred == 0.0 {
        warn!("Correlation is undefined for constant values");
        return Ok(f64::NAN);
    }
    Ok(y_true.iter().covariance(y_pred.iter()) / (sd_true * sd_pred))
}

/// Pearson correlation of the average ranks.
pub fn spearman(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred, 2)?;
    pearson(&average_ranks(y_true), &average_ranks(y_pred))
}

/// Kendall's tau-b, which corrects for ties on either side.
pub fn kendall_tau(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred, 2)?;
    let (mut concordant, mut discordant, mut ties_true, mut ties_pred) = (0i64, 0i64, 0i64, 0i64);
    let n = y_true.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let dt = y_true[i] - y_true[j];
            let dp = y_pred[i] - y_pred[j];
            match (dt == 0.0, dp == 0.0) {
                (true, true) => {
                    ties_true += 1;
                    ties_pred += 1;
                }
                (true, false) => ties_true += 1,
                (false, true) => ties_pred += 1,
                (false, false) if (dt > 0.0) == (dp > 0.0) => concordant += 1,
                (false, false) => discordant += 1,
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    let denominator = ((pairs - ties_true as f64) * (pairs - ties_pred as f64)).sqrt();
    if denominator == 0.0 {
        warn!("Kendall tau is undefined for constant values");
        return Ok(f64::NAN);
    }
    Ok((concordant - discordant) as f64 / denominator)
}

/// Share of exact matches.
pub fn accuracy<T: PartialEq>(y_true: &[T], y_pred: &[T]) -> Result<f64> {
    check_lengths(y_true, y_pred, 1)?;
    let hits = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Coefficient of determination. Constant gold values score 1 for a perfect fit, 0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred, 1)?;
    let mean = y_true.iter().mean();
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred, 1)?;
    Ok(y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum::<f64>() / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rating_conversions() {
        assert_eq!(3u8.to_rating().unwrap(), 3);
        assert_eq!((-2i32).to_rating().unwrap(), -2);
        assert_eq!(2.5f64.to_rating().unwrap(), 2, "halves round to even");
        assert_eq!(3.5f32.to_rating().unwrap(), 4, "halves round to even");
        assert_eq!("4".to_rating().unwrap(), 4);
        assert_eq!(String::from(" 1.4 ").to_rating().unwrap(), 1);
        assert!(matches!("a".to_rating(), Err(Error::InvalidArgument(_))), "text ratings are rejected");
        assert!(f64::NAN.to_rating().is_err(), "NaN has no level");
        assert!(u64::MAX.to_rating().is_err(), "values beyond i64 are rejected");
    }

    #[test]
    fn test_weights_parse() {
        assert_eq!(KappaWeights::parse(None).unwrap(), KappaWeights::Unweighted);
        assert_eq!(KappaWeights::parse(Some("linear")).unwrap(), KappaWeights::Linear);
        assert_eq!(KappaWeights::parse(Some("quadratic")).unwrap(), KappaWeights::Quadratic);
        assert!(matches!(KappaWeights::parse(Some("invalid")), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_weight_off_by_one() {
        let scorer = Kappa::new(KappaWeights::Quadratic).off_by_one(true);
        assert_eq!(scorer.weight(1, 2, 1, 3), 0.0, "adjacent levels are forgiven");
        assert_eq!(scorer.weight(1, 3, 1, 3), 1.0 / 9.0, "a distance of two counts as one");
        assert_eq!(scorer.weight(4, 1, 1, 3), 4.0 / 9.0);
    }

    #[test]
    fn test_kappa_widely_spread_ratings() {
        let far = 1i64 << 40;
        assert_eq!(kappa(&[0i64, far], &[0i64, far], KappaWeights::Unweighted, false).unwrap(), 1.0);
        let score = kappa(&[0i64, far, far], &[0i64, far, 0], KappaWeights::Quadratic, false).unwrap();
        assert!(close(score, 0.4), "only the levels that occur are tabulated, got {}", score);
        let extreme = kappa(&[i64::MIN, i64::MAX], &[i64::MAX, i64::MIN], KappaWeights::Linear, false).unwrap();
        assert!(close(extreme, -1.0), "full-range ratings must not overflow, got {}", extreme);
        let custom = KappaWeights::Custom(vec![vec![0.0]]);
        assert!(matches!(kappa(&[0i64, far], &[0i64, far], custom, false), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_kappa_basic() {
        assert!(close(kappa(&[1, 2, 3], &[1, 2, 3], KappaWeights::Quadratic, false).unwrap(), 1.0));
        assert!(close(kappa(&[1, 2, 1], &[1, 2, 2], KappaWeights::Unweighted, false).unwrap(), 0.4));
        assert!(close(kappa(&["1", "2", "4"], &[1.0, 2.0, 2.0], KappaWeights::Quadratic, true).unwrap(), 0.5));
    }

    #[test]
    fn test_kappa_single_level_is_perfect() {
        assert_eq!(kappa(&[2, 2, 2], &[2, 2, 2], KappaWeights::Linear, false).unwrap(), 1.0);
        assert_eq!(kappa(&[1, 2], &[2, 1], KappaWeights::Quadratic, true).unwrap(), 1.0, "all weights vanish");
    }

    #[test]
    fn test_kappa_errors() {
        assert!(matches!(kappa(&[1, 2], &[1], KappaWeights::Unweighted, false), Err(Error::InvalidArgument(_))));
        let empty: [i32; 0] = [];
        assert!(kappa(&empty, &empty, KappaWeights::Unweighted, false).is_err(), "empty ratings are rejected");
        assert!(kappa(&["a", "b", "c"], &["a", "b", "c"], KappaWeights::Unweighted, false).is_err());
    }

    #[test]
    fn test_kappa_with_rating_range() {
        let derived = kappa(&[1, 2, 1], &[1, 2, 2], KappaWeights::Linear, false).unwrap();
        let wide = Kappa::new(KappaWeights::Linear).rating_range(1, 3).score(&[1, 2, 1], &[1, 2, 2]).unwrap();
        assert!(close(derived, 0.4));
        assert!(close(wide, 0.4), "an unused level does not change linear kappa here, got {}", wide);
        let narrow = Kappa::new(KappaWeights::Linear).rating_range(1, 1).score(&[1, 2], &[1, 1]);
        assert!(matches!(narrow, Err(Error::InvalidArgument(_))), "ratings outside the range are rejected");
    }

    #[test]
    fn test_kappa_custom_weights() {
        let quadratic = kappa(&[1, 2, 4], &[1, 2, 2], KappaWeights::Quadratic, false).unwrap();
        let matrix: Vec<Vec<f64>> =
            (0..4).map(|i: i32| (0..4).map(|j: i32| ((i - j) as f64).powi(2) / 9.0).collect()).collect();
        let custom = kappa(&[1, 2, 4], &[1, 2, 2], KappaWeights::Custom(matrix), false).unwrap();
        assert!(close(quadratic, custom), "explicit quadratic weights must match the built-in ones");

        let wrong = KappaWeights::Custom(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert!(matches!(kappa(&[1, 2, 4], &[1, 2, 2], wrong, false), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_metric_names() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>().unwrap(), metric, "{} should parse back", metric);
        }
        assert!(matches!("f1_score_least_frequent".parse::<Metric>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_correlations() {
        assert!(close(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap(), 1.0));
        assert!(close(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap(), -1.0));
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap().is_nan(), "constant input has no correlation");
        assert!(close(spearman(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]).unwrap(), 0.8));
        assert!(close(kendall_tau(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 2.0, 4.0]).unwrap(), 4.0 / 6.0));
    }

    #[test]
    fn test_regression_metrics() {
        assert!(close(r2(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]).unwrap(), 0.5));
        assert_eq!(r2(&[2.0, 2.0], &[2.0, 2.0]).unwrap(), 1.0);
        assert_eq!(r2(&[2.0, 2.0], &[2.0, 3.0]).unwrap(), 0.0);
        assert!(close(mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]).unwrap(), 1.0 / 3.0));
        assert!(close(accuracy(&["a", "b"], &["a", "c"]).unwrap(), 0.5));
    }

    #[test]
    fn test_use_score_func() {
        let y_true = [1.0, 2.0, 4.0];
        let y_pred = [1.0, 2.0, 2.0];
        let qwk = use_score_func(&Metric::QuadraticWeightedKappaOffByOne, &y_true, &y_pred).unwrap();
        assert!(close(qwk, 0.5));
        let mse = use_score_func(&Metric::MeanSquaredError, &y_true, &y_pred).unwrap();
        assert!(close(mse, 4.0 / 3.0));
    }
}
