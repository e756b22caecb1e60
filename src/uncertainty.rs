//! Random number generation for uncertain values.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal, Triangular, Uniform};
use tracing::warn;

use crate::domain::{DistributionType, Uncertainty};

/// A ready-to-sample distribution.
#[derive(Debug, Clone)]
pub enum NumberGenerator {
    Discrete(f64),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Triangular(Triangular<f64>),
    Uniform(Uniform<f64>),
}

impl NumberGenerator {
    /// Builds a generator for the declared distribution. Unknown types and
    /// invalid parameters give a constant `fallback`.
    pub fn of(uncertainty: &Uncertainty, fallback: f64) -> Self {
        let (p1, p2, p3) = (uncertainty.parameter1, uncertainty.parameter2, uncertainty.parameter3);
        let generator = match &uncertainty.distribution {
            DistributionType::None => return NumberGenerator::Discrete(fallback),
            DistributionType::Normal => Normal::new(p1, p2).ok().map(NumberGenerator::Normal),
            DistributionType::LogNormal => {
                // geometric mean and geometric standard deviation
                if p1 > 0.0 && p2 >= 1.0 {
                    LogNormal::new(p1.ln(), p2.ln()).ok().map(NumberGenerator::LogNormal)
                } else {
                    None
                }
            }
            DistributionType::Triangle => Triangular::new(p1, p3, p2).ok().map(NumberGenerator::Triangular),
            DistributionType::Uniform => {
                if !p1.is_finite() || !p2.is_finite() {
                    None
                } else if p1 < p2 {
                    Some(NumberGenerator::Uniform(Uniform::new(p1, p2)))
                } else if p1 == p2 {
                    Some(NumberGenerator::Discrete(p1))
                } else {
                    None
                }
            }
            DistributionType::Other(name) => {
                warn!(distribution = %name, "unknown distribution type; using constant value");
                return NumberGenerator::Discrete(fallback);
            }
        };
        generator.unwrap_or_else(|| {
            warn!(
                distribution = %uncertainty.distribution,
                p1, p2, p3,
                "invalid distribution parameters; using constant value"
            );
            NumberGenerator::Discrete(fallback)
        })
    }

    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            NumberGenerator::Discrete(v) => *v,
            NumberGenerator::Normal(d) => d.sample(rng),
            NumberGenerator::LogNormal(d) => d.sample(rng),
            NumberGenerator::Triangular(d) => d.sample(rng),
            NumberGenerator::Uniform(d) => d.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use statrs::statistics::Statistics;

    fn draws(uncertainty: Uncertainty, n: usize) -> Vec<f64> {
        let generator = NumberGenerator::of(&uncertainty, -1.0);
        let mut rng = StdRng::seed_from_u64(42);
        (0..n).map(|_| generator.next(&mut rng)).collect()
    }

    #[test]
    fn test_normal_mean_converges() {
        let values = draws(Uncertainty::normal(10.0, 2.0), 20_000);
        assert!((values.as_slice().mean() - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_log_normal_median_is_geometric_mean() {
        let mut values = draws(Uncertainty::log_normal(5.0, 1.5), 20_001);
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = values[values.len() / 2];
        assert!((median - 5.0).abs() < 0.15);
        assert!(values.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_triangle_and_uniform_bounds() {
        assert!(draws(Uncertainty::triangle(1.0, 2.0, 4.0), 1000)
            .iter()
            .all(|v| (1.0..=4.0).contains(v)));
        assert!(draws(Uncertainty::uniform(-1.0, 1.0), 1000)
            .iter()
            .all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_fallbacks() {
        let unknown = Uncertainty {
            distribution: DistributionType::Other("BETA".to_string()),
            ..Default::default()
        };
        assert!(draws(unknown, 5).iter().all(|v| *v == -1.0));
        assert!(draws(Uncertainty::normal(1.0, -3.0), 5).iter().all(|v| *v == -1.0));
        assert!(draws(Uncertainty::uniform(2.0, 2.0), 5).iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_non_finite_uniform_bounds_use_constant() {
        assert!(draws(Uncertainty::uniform(0.0, f64::INFINITY), 5).iter().all(|v| *v == -1.0));
        assert!(draws(Uncertainty::uniform(f64::NEG_INFINITY, 1.0), 5).iter().all(|v| *v == -1.0));
        assert!(draws(Uncertainty::uniform(f64::NAN, 1.0), 5).iter().all(|v| *v == -1.0));
    }
}
