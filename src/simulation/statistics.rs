use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Median, Min, OrderStatistics};

/// Summary of the values one result quantity took over all iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultStatistics {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; 0 with fewer than two values.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub percentile_5: f64,
    pub percentile_95: f64,
}

impl ResultStatistics {
    /// `None` for an empty series.
    pub fn of(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mut data = Data::new(values);
        Some(Self {
            count,
            mean: data.mean().unwrap_or(0.0),
            std_dev: data.std_dev().filter(|s| s.is_finite()).unwrap_or(0.0),
            min: data.min(),
            max: data.max(),
            median: data.median(),
            percentile_5: data.percentile(5),
            percentile_95: data.percentile(95),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_of_series() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let stats = ResultStatistics::of(values).unwrap();
        assert_eq!(stats.count, 100);
        assert!((stats.mean - 50.5).abs() < 1e-9);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert!((stats.median - 50.5).abs() < 1e-9);
        assert!(stats.percentile_5 > 4.0 && stats.percentile_5 < 6.0);
        assert!(stats.percentile_95 > 95.0 && stats.percentile_95 < 97.0);
        assert!(stats.std_dev > 28.0 && stats.std_dev < 30.0);
    }

    #[test]
    fn test_single_value() {
        let stats = ResultStatistics::of(vec![3.0]).unwrap();
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.percentile_95, 3.0);
        assert!(ResultStatistics::of(Vec::new()).is_none());
    }
}
