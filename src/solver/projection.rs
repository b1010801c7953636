//! Signed margins of every training example
//!
//! `proj[i] = y_i * (w · x_i + bias)` is computed once from scratch and then
//! moved along the search direction each iteration, using the directional
//! margins `grad_proj` that the line search already needs.

use crate::core::{FeatureStore, LabelStore, Result};
use crate::solver::run::allocate;

#[derive(Debug, Clone)]
pub struct ProjectionCache {
    proj: Vec<f64>,
    grad_proj: Vec<f64>,
}

impl ProjectionCache {
    pub fn new(num_examples: usize) -> Result<Self> {
        Ok(Self {
            proj: allocate("proj", num_examples, 0.0)?,
            grad_proj: allocate("grad_proj", num_examples, 0.0)?,
        })
    }

    /// Full recompute of every margin
    pub fn recompute<F, L>(&mut self, features: &F, labels: &L, w: &[f64], bias: f64)
    where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        for (i, p) in self.proj.iter_mut().enumerate() {
            *p = labels.label(i) * features.dense_dot(1.0, i, w, bias);
        }
    }

    /// `grad_proj[i] = y_i * (direction · x_i + grad_b)`
    pub fn project_direction<F, L>(
        &mut self,
        features: &F,
        labels: &L,
        direction: &[f64],
        grad_b: f64,
    ) where
        F: FeatureStore + ?Sized,
        L: LabelStore + ?Sized,
    {
        for (i, g) in self.grad_proj.iter_mut().enumerate() {
            *g = labels.label(i) * features.dense_dot(1.0, i, direction, grad_b);
        }
    }

    /// `proj -= alpha * grad_proj`
    pub fn update(&mut self, alpha: f64) {
        if alpha == 0.0 {
            return;
        }
        for (p, &g) in self.proj.iter_mut().zip(&self.grad_proj) {
            *p -= alpha * g;
        }
    }

    pub fn proj(&self) -> &[f64] {
        &self.proj
    }

    pub fn grad_proj(&self) -> &[f64] {
        &self.grad_proj
    }

    pub fn len(&self) -> usize {
        self.proj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proj.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Labels, SparseFeatures};
    use approx::assert_relative_eq;

    fn cache(n: usize) -> ProjectionCache {
        ProjectionCache::new(n).unwrap()
    }

    #[test]
    fn test_recompute_signed_margins() {
        let features = SparseFeatures::from_dense(&[vec![1.0, 2.0], vec![-1.0, 0.5]]);
        let labels = Labels::new(vec![1.0, -1.0]).unwrap();
        let mut cache = cache(2);

        cache.recompute(&features, &labels, &[0.5, 1.0], 0.25);

        assert_relative_eq!(cache.proj()[0], 2.75);
        assert_relative_eq!(cache.proj()[1], -(-0.5 + 0.5 + 0.25));
    }

    #[test]
    fn test_incremental_update_matches_recompute() {
        let features = SparseFeatures::from_dense(&[
            vec![1.0, 2.0, 0.0],
            vec![-1.0, 0.5, 3.0],
            vec![0.0, -2.0, 1.0],
        ]);
        let labels = Labels::new(vec![1.0, -1.0, 1.0]).unwrap();
        let mut w = vec![0.1, -0.2, 0.3];
        let mut bias = 0.05;

        let mut incremental = cache(3);
        incremental.recompute(&features, &labels, &w, bias);

        let direction = [0.7, 0.1, -0.4];
        let grad_b = 0.2;
        for step in [0.5, 0.25, 1.5] {
            incremental.project_direction(&features, &labels, &direction, grad_b);
            incremental.update(step);
            for (wj, dj) in w.iter_mut().zip(&direction) {
                *wj -= step * dj;
            }
            bias -= step * grad_b;
        }

        let mut full = cache(3);
        full.recompute(&features, &labels, &w, bias);
        for (a, b) in incremental.proj().iter().zip(full.proj()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
