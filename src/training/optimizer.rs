//! Adam optimizer

use crate::error::{HarError, Result};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};

/// Adam with bias-corrected moment estimates
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update; `params` and `grads` must line up tensor for tensor
    pub fn step(&mut self, params: Vec<ArrayViewMutD<'_, f32>>, grads: Vec<ArrayViewD<'_, f32>>) -> Result<()> {
        if params.len() != grads.len() {
            return Err(HarError::TrainingError(format!(
                "{} parameter tensors but {} gradients",
                params.len(),
                grads.len()
            )));
        }
        if self.m.is_empty() {
            self.m = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
        }

        self.t += 1;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let lr_t = self.learning_rate * (1.0 - b2.powi(self.t)).sqrt() / (1.0 - b1.powi(self.t));

        for (((mut p, g), m), v) in params.into_iter().zip(grads.iter()).zip(self.m.iter_mut()).zip(self.v.iter_mut()) {
            if p.shape() != g.shape() || m.shape() != g.shape() {
                return Err(HarError::shape(p.shape(), g.shape()));
            }
            Zip::from(&mut p).and(g).and(m).and(v).for_each(|p, &g, m, v| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + eps);
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_minimizes_quadratic() {
        // f(w) = sum((w - 3)^2)
        let mut w: Array1<f32> = array![0.0, 10.0];
        let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-7);

        for _ in 0..1000 {
            let grad = (&w - 3.0) * 2.0;
            adam.step(vec![w.view_mut().into_dyn()], vec![grad.view().into_dyn()]).unwrap();
        }
        assert!(w.iter().all(|v| (v - 3.0).abs() < 5e-2), "{:?}", w);
        assert_eq!(adam.steps(), 1000);
    }

    #[test]
    fn test_first_step_size_is_learning_rate() {
        let mut w: Array1<f32> = array![1.0];
        let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-7);
        let grad: Array1<f32> = array![5.0];
        adam.step(vec![w.view_mut().into_dyn()], vec![grad.view().into_dyn()]).unwrap();
        assert!((w[0] - 0.99).abs() < 1e-5);
    }

    #[test]
    fn test_mismatched_lengths() {
        let mut w: Array1<f32> = array![1.0];
        let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-7);
        assert!(adam.step(vec![w.view_mut().into_dyn()], vec![]).is_err());
    }
}
