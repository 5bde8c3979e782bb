use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::Result;

/// How the parameters of a layer are drawn before training.
///
/// Every variant samples the whole layer, weights and biases alike, from a
/// single distribution parameterized by the layer's fan in and fan out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamInit {
    /// Every parameter takes `value`.
    Const { value: f32 },
    /// `U(low, high)`.
    Uniform { low: f32, high: f32 },
    /// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, the usual default for linear layers.
    FanInUniform,
    /// `U(-r, r)` with `r = sqrt(6 / (fan_in + fan_out))`.
    XavierUniform,
    /// `N(0, sqrt(2 / fan_in))`.
    Kaiming,
}

impl ParamInit {
    /// Samples `n` parameters for a layer with the given fan in and fan out.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to draw from.
    /// * `fan_in` - The number of inputs of the layer.
    /// * `fan_out` - The number of outputs of the layer.
    /// * `n` - The amount of parameters to generate.
    ///
    /// # Returns
    /// The sampled parameters, or an error if the derived distribution is invalid.
    pub fn sample<R>(
        &self,
        rng: &mut R,
        fan_in: usize,
        fan_out: usize,
        n: usize,
    ) -> Result<Vec<f32>>
    where
        R: Rng + ?Sized,
    {
        match *self {
            ParamInit::Const { value } => Ok(vec![value; n]),
            ParamInit::Uniform { low, high } => {
                let distribution = Uniform::new(low, high)?;
                Ok(draw(rng, distribution, n))
            }
            ParamInit::FanInUniform => {
                let bound = 1. / (fan_in.max(1) as f32).sqrt();
                let distribution = Uniform::new(-bound, bound)?;
                Ok(draw(rng, distribution, n))
            }
            ParamInit::XavierUniform => {
                let bound = (6. / (fan_in + fan_out).max(1) as f32).sqrt();
                let distribution = Uniform::new(-bound, bound)?;
                Ok(draw(rng, distribution, n))
            }
            ParamInit::Kaiming => {
                let std_dev = (2. / fan_in.max(1) as f32).sqrt();
                let distribution = Normal::new(0., std_dev)?;
                Ok(draw(rng, distribution, n))
            }
        }
    }
}

fn draw<R, D>(rng: &mut R, distribution: D, n: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
    D: Distribution<f32>,
{
    (0..n).map(|_| distribution.sample(&mut *rng)).collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn const_fills_every_parameter() {
        let params = ParamInit::Const { value: 0.5 }
            .sample(&mut seeded_rng(), 3, 2, 8)
            .unwrap();

        assert_eq!(params, vec![0.5; 8]);
    }

    #[test]
    fn fan_in_uniform_respects_its_bound() {
        let params = ParamInit::FanInUniform
            .sample(&mut seeded_rng(), 16, 4, 1000)
            .unwrap();

        assert_eq!(params.len(), 1000);
        assert!(params.iter().all(|p| p.abs() <= 0.25));
    }

    #[test]
    fn xavier_uniform_respects_its_bound() {
        let bound = (6f32 / 10.).sqrt();
        let params = ParamInit::XavierUniform
            .sample(&mut seeded_rng(), 4, 6, 500)
            .unwrap();

        assert!(params.iter().all(|p| p.abs() <= bound));
    }

    #[test]
    fn same_seed_same_parameters() {
        let a = ParamInit::Kaiming.sample(&mut seeded_rng(), 8, 8, 64).unwrap();
        let b = ParamInit::Kaiming.sample(&mut seeded_rng(), 8, 8, 64).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn empty_uniform_range_is_an_error() {
        let result = ParamInit::Uniform { low: 1., high: 1. }.sample(&mut seeded_rng(), 1, 1, 1);
        assert!(result.is_err());
    }
}
