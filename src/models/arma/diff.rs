//! Differencing and integration for ARIMA models.

/// Apply ordinary differencing `d` times.
///
/// Each pass shortens the series by one value; differencing stops early if
/// the series runs out.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply lag-`period` differencing `d` times.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `original`.
///
/// `differenced` holds future values of the d-th difference; the result is
/// their continuation on the scale of `original`.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || differenced.is_empty() {
        return differenced.to_vec();
    }

    // Last observed value at each differencing level 0..d-1.
    let anchors: Vec<f64> = (0..d)
        .map(|level| difference(original, level).last().copied().unwrap_or(0.0))
        .collect();

    let mut result = differenced.to_vec();
    for &anchor in anchors.iter().rev() {
        let mut level = anchor;
        for value in result.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    result
}
