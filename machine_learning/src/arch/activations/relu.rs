/// Rectified linear unit, `max(0, z)`.
#[derive(Clone, Debug, Default)]
pub struct Relu;

impl Relu {
    pub fn new() -> Self {
        Self
    }

    pub fn f(&self, z: f32) -> f32 {
        z.max(0.)
    }

    /// The derivative is taken to be 0 at the kink.
    pub fn df(&self, z: f32) -> f32 {
        if z > 0. { 1. } else { 0. }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        let relu = Relu::new();
        assert_eq!(relu.f(-3.), 0.);
        assert_eq!(relu.f(0.), 0.);
        assert_eq!(relu.f(2.5), 2.5);
    }

    #[test]
    fn relu_derivative_is_a_step() {
        let relu = Relu::new();
        assert_eq!(relu.df(-1.), 0.);
        assert_eq!(relu.df(0.), 0.);
        assert_eq!(relu.df(1e-3), 1.);
    }
}
