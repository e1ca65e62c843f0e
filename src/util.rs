pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Sample standard deviation (Bessel's correction, divides by n - 1).
pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 1 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / (count - 1) as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Standard deviation over mean. Zero for fewer than two samples or a zero mean.
pub fn coeff_variation(data: &[f64]) -> f64 {
    match (mean(data), std_dev(data)) {
        (Some(m), Some(sd)) if m != 0.0 => sd / m,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[15., 7., 55., 12., 4.]), Some(18.6));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_mean_mixed_values() {
        assert_eq!(mean(&[-10.0, 0.0, 10.0]), Some(0.0));
    }

    #[test]
    fn test_std_dev_uses_bessel_correction() {
        // variance = (4 + 0 + 4) / 2
        let result = std_dev(&[1.0, 3.0, 5.0]).unwrap();
        assert!((result - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_needs_two_samples() {
        assert_eq!(std_dev(&[42.0]), None);
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_std_dev_identical_values() {
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_coeff_variation() {
        let cv = coeff_variation(&[1.0, 3.0, 5.0]);
        assert!((cv - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_coeff_variation_degenerate() {
        assert_eq!(coeff_variation(&[]), 0.0);
        assert_eq!(coeff_variation(&[100.0]), 0.0);
        assert_eq!(coeff_variation(&[0.0, 0.0]), 0.0);
        assert_eq!(coeff_variation(&[7.0, 7.0, 7.0]), 0.0);
    }
}
