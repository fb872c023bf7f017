use std::cmp::Ordering;

/// Parse a field as a finite float, `None` for anything else.
pub fn safe_float(value: &str) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

/// Shortest text that parses back to the same float (1.0 is written "1").
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

/// 1-based ranks, ties receiving the average of the positions they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let start = i;
        while i + 1 < order.len() && values[order[i]] == values[order[i + 1]] {
            i += 1;
        }
        let rank = (start + i + 2) as f64 / 2.0;
        for j in start..=i {
            ranks[order[j]] = rank;
        }
        i += 1;
    }
    ranks
}
