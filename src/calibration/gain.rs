//! Outlier clamping and adaptive gain balancing of a ratio curve

use crate::error::{ProcessingStage, StitchError, StitchResult};

/// Mean and population standard deviation
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Replace jumps in `filtered` by the average of their neighbours.
///
/// `threshold = mean(raw) + sigma · std(raw)`; index `i` is a jump when
/// `|filtered[i] - mean(raw)| > threshold`. Neighbours always come from
/// `filtered`, so adjacent jumps do not feed each other.
pub fn clamp_outliers(raw: &[f64], filtered: &[f64], sigma: f64) -> StitchResult<Vec<f64>> {
    if raw.len() != filtered.len() {
        return Err(StitchError::invalid_input(
            ProcessingStage::Calibration,
            format!("raw has {} points, filtered has {}", raw.len(), filtered.len()),
        ));
    }

    let (mean, std) = mean_and_std(raw);
    let threshold = mean + sigma * std;
    let last = filtered.len().saturating_sub(1);

    let clamped = filtered
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            if (value - mean).abs() <= threshold || filtered.len() == 1 {
                value
            } else if i == 0 {
                filtered[1]
            } else if i == last {
                filtered[i - 1]
            } else {
                (filtered[i - 1] + filtered[i + 1]) / 2.0
            }
        })
        .collect();

    Ok(clamped)
}

/// Per-point gain pulling every value toward the mean of the values above
/// `floor`: `T/g` above the threshold `T`, `g/T` in `(0, T]`, `1` otherwise.
pub fn adaptive_gain(values: &[f64], floor: f64) -> Vec<f64> {
    let above_floor: Vec<f64> = values.iter().copied().filter(|&g| g > floor).collect();
    if above_floor.is_empty() {
        return vec![1.0; values.len()];
    }
    let threshold = above_floor.iter().sum::<f64>() / above_floor.len() as f64;

    values
        .iter()
        .map(|&g| {
            if g > threshold {
                threshold / g
            } else if g > 0.0 {
                g / threshold
            } else {
                1.0
            }
        })
        .collect()
}
