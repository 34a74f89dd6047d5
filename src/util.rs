pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Drop the fractional part of a metric for storage. Negative and NaN inputs
/// become 0.
pub fn truncate_metric(value: f64) -> u32 {
    // float -> int `as` casts saturate and map NaN to 0
    value.trunc() as u32
}
