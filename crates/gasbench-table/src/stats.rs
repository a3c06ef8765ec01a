//! Sample statistics over one row's cross-trial values.

/// Summary statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    /// Number of samples. `None` for statistics read back from a stored
    /// summary, which does not record the trial count.
    pub count: Option<usize>,
    /// Arithmetic mean.
    pub mean: f64,
    /// Unbiased sample variance (divisor `count - 1`).
    /// `None` when fewer than two samples were taken.
    pub variance: Option<f64>,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
}

impl SampleStats {
    /// Compute statistics for a sample. Returns `None` for an empty sample.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        let mean = samples.iter().sum::<f64>() / n;

        // Two-pass: deviations from the computed mean keep small variances exact.
        let variance = (count >= 2).then(|| {
            let ss: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
            ss / (n - 1.0)
        });

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count: Some(count),
            mean,
            variance,
            min,
            max,
        })
    }

    /// Sample standard deviation, when variance is defined.
    #[must_use]
    pub fn std_dev(&self) -> Option<f64> {
        self.variance.map(f64::sqrt)
    }
}

/// Format a statistic for a table cell.
///
/// Integral values print without a fractional part (`252`, not `252.0`).
#[must_use]
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_samples() {
        let stats = SampleStats::from_samples(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(stats.count, Some(3));
        assert_eq!(stats.mean, 20.0);
        assert_eq!(stats.variance, Some(100.0));
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 30.0);
        assert_eq!(stats.std_dev(), Some(10.0));
    }

    #[test]
    fn test_single_sample_has_no_variance() {
        let stats = SampleStats::from_samples(&[42.0]).unwrap();
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.variance, None);
        assert_eq!(stats.min, 42.0);
        assert_eq!(stats.max, 42.0);
    }

    #[test]
    fn test_empty_sample() {
        assert!(SampleStats::from_samples(&[]).is_none());
    }

    #[test]
    fn test_constant_sample() {
        let stats = SampleStats::from_samples(&[7.0; 10]).unwrap();
        assert_eq!(stats.variance, Some(0.0));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(252.0), "252");
        assert_eq!(format_value(20.5), "20.5");
        assert_eq!(format_value(-3.0), "-3");
    }
}
