//! Technical indicators over rolling price history.
//!
//! All functions are pure and total: degenerate inputs return a neutral value instead of
//! `None`, callers decide whether there is enough history to act on.

/// Default RSI lookback.
pub const RSI_PERIOD: usize = 14;

/// Exponential moving average seeded with the first value, `k = 2 / (period + 1)`.
/// Returns 0 for an empty series.
pub fn ema(values: &[f64], period: usize) -> f64 {
    let Some((first, rest)) = values.split_first() else {
        return 0.0;
    };

    let k = 2.0 / (period as f64 + 1.0);
    rest.iter()
        .fold(*first, |prev, value| value * k + prev * (1.0 - k))
}

/// Relative strength index over the last `period` transitions.
///
/// Returns 50 with fewer than `period + 1` samples and 100 when there are no losses.
pub fn rsi(values: &[f64], period: usize) -> f64 {
    if values.len() < period + 1 {
        return 50.0;
    }

    let window = &values[values.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta >= 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    if losses == 0.0 {
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + gains / losses)
}

/// Sample standard deviation (n - 1). Returns 0 for fewer than 2 samples.
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Percentage move from the first to the last sample, 0 unless there are more than 3 samples.
pub fn slope(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() > 3 && *first != 0.0 => {
            (last - first) / first * 100.0
        }
        _ => 0.0,
    }
}

/// Volatility proxy: standard deviation relative to the latest sample, in percent.
pub fn volatility(values: &[f64]) -> f64 {
    match values.last() {
        Some(last) if *last != 0.0 => stddev(values) / last * 100.0,
        _ => 0.0,
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `min(hi, max(lo, x))`. Unlike [`f64::clamp`] this never panics on `lo > hi`.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    hi.min(lo.max(x))
}
