#[derive(Clone, Debug, Default)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let amp = self.amp;

        (amp * (-z).exp()) / ((-z).exp() + 1.).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered_at_half_amp() {
        let sigmoid = Sigmoid::new(2.);
        assert!((sigmoid.f(0.) - 1.).abs() < 1e-6);
    }

    #[test]
    fn sigmoid_derivative_matches_finite_difference() {
        let sigmoid = Sigmoid::new(1.);
        let h = 1e-3;

        for z in [-2., -0.5, 0., 0.7, 3.] {
            let numeric = (sigmoid.f(z + h) - sigmoid.f(z - h)) / (2. * h);
            assert!((sigmoid.df(z) - numeric).abs() < 1e-3, "z = {z}");
        }
    }
}
