//! Median and moving-average smoothing with zero-padded edges

use crate::error::{StitchError, StitchResult};

/// Median of every `kernel`-wide window centered on each sample; samples
/// outside the sequence count as zero
pub fn median_filter(values: &[f64], kernel: usize) -> StitchResult<Vec<f64>> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(StitchError::invalid_config(
            "calibration.median_kernel",
            format!("must be a positive odd number, got {kernel}"),
        ));
    }

    let half = kernel / 2;
    let mut window = Vec::with_capacity(kernel);
    let filtered = (0..values.len())
        .map(|i| {
            window.clear();
            window.extend((0..kernel).map(|j| {
                (i + j)
                    .checked_sub(half)
                    .and_then(|idx| values.get(idx))
                    .copied()
                    .unwrap_or(0.0)
            }));
            window.sort_by(|a, b| a.total_cmp(b));
            window[half]
        })
        .collect();

    Ok(filtered)
}

/// Moving average of width `window`, aligned like a "same"-mode convolution:
/// `out[i] = sum(values[i + (w-1)/2 - j] for j in 0..w) / w`, zero outside
pub fn moving_average_same(values: &[f64], window: usize) -> StitchResult<Vec<f64>> {
    if window == 0 {
        return Err(StitchError::invalid_config(
            "calibration.smoothing_window",
            "must be at least 1",
        ));
    }

    let offset = (window - 1) / 2;
    let averaged = (0..values.len())
        .map(|i| {
            (0..window)
                .filter_map(|j| (i + offset).checked_sub(j).and_then(|idx| values.get(idx)))
                .sum::<f64>()
                / window as f64
        })
        .collect();

    Ok(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_removes_spike() {
        let filtered = median_filter(&[1.0, 1.0, 50.0, 1.0, 1.0], 3).unwrap();
        assert_eq!(filtered, vec![1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_median_zero_pads_edges() {
        let filtered = median_filter(&[4.0, 5.0, 6.0], 3).unwrap();
        // edges see a zero neighbour
        assert_eq!(filtered, vec![4.0, 5.0, 5.0]);
    }

    #[test]
    fn test_median_kernel_one_is_identity() {
        let values = [3.0, -1.0, 2.0];
        assert_eq!(median_filter(&values, 1).unwrap(), values.to_vec());
    }

    #[test]
    fn test_median_rejects_even_kernel() {
        assert!(median_filter(&[1.0], 2).is_err());
        assert!(median_filter(&[1.0], 0).is_err());
    }

    #[test]
    fn test_moving_average_width_two() {
        let averaged = moving_average_same(&[1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(averaged, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_moving_average_width_three_is_centered() {
        let averaged = moving_average_same(&[3.0, 6.0, 9.0], 3).unwrap();
        assert_eq!(averaged, vec![3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_moving_average_rejects_zero_window() {
        assert!(moving_average_same(&[1.0], 0).is_err());
    }
}
