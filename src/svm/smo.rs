//! ν-one-class SVM by sequential minimal optimization.
//!
//! Solves
//!
//! ```text
//! min ½ αᵀKα   s.t.  0 ≤ α_i ≤ 1,  Σ α_i = ν·n
//! ```
//!
//! over the precomputed kernel `K`, using the second-order working-set
//! selection of Fan, Chen and Lin (2005). The starting point puts
//! `floor(ν·n)` coefficients at the upper bound and the fractional remainder
//! on the next one, so the equality constraint holds from the first step.
//!
//! `K` is read exactly as given; an asymmetric matrix is accepted but makes
//! the gradient updates less stable.
use super::{OneClassSolver, SupportVectorSet};
use crate::error::{CosegError, Result};
use crate::gram::GramMatrix;
use log::{debug, warn};

const TAU: f64 = 1e-12;
const UPPER: f64 = 1.0;

/// SMO solver configuration.
#[derive(Clone, Debug)]
pub struct SmoOneClass {
    /// Stopping tolerance on the maximal KKT violation.
    pub tolerance: f64,
    /// Iteration cap; exceeding it is a training failure.
    pub max_iter: usize,
}

impl Default for SmoOneClass {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iter: 10_000_000,
        }
    }
}

impl SmoOneClass {
    fn validate(gram: &GramMatrix, nu: f64) -> Result<()> {
        if gram.is_empty() {
            return Err(CosegError::Training("empty Gram matrix".to_string()));
        }
        if !(nu > 0.0 && nu <= 1.0) {
            return Err(CosegError::Training(format!("nu={nu} outside (0, 1]")));
        }
        if !gram.is_finite() {
            return Err(CosegError::Training(
                "Gram matrix contains non-finite entries".to_string(),
            ));
        }
        Ok(())
    }

    fn initial_alpha(n: usize, nu: f64) -> Vec<f64> {
        let total = nu * n as f64;
        let full = (total.floor() as usize).min(n);
        let mut alpha = vec![0.0; n];
        for a in alpha.iter_mut().take(full) {
            *a = UPPER;
        }
        if full < n {
            alpha[full] = total - full as f64;
        }
        alpha
    }

    /// Maximal violating pair by second-order gain, or `None` at optimum.
    fn select_working_set(&self, k: &GramMatrix, alpha: &[f64], grad: &[f64]) -> Option<(usize, usize)> {
        let n = alpha.len();
        let mut gmax = f64::NEG_INFINITY;
        let mut i_sel = None;
        for t in 0..n {
            if alpha[t] < UPPER && -grad[t] >= gmax {
                gmax = -grad[t];
                i_sel = Some(t);
            }
        }

        let mut gmax2 = f64::NEG_INFINITY;
        let mut j_sel = None;
        let mut best_obj = f64::INFINITY;
        if let Some(i) = i_sel {
            let kii = k.get(i, i);
            for j in 0..n {
                if alpha[j] <= 0.0 {
                    continue;
                }
                let grad_diff = gmax + grad[j];
                if grad[j] >= gmax2 {
                    gmax2 = grad[j];
                }
                if grad_diff > 0.0 {
                    let mut quad = kii + k.get(j, j) - 2.0 * k.get(i, j);
                    if quad <= 0.0 {
                        quad = TAU;
                    }
                    let obj = -(grad_diff * grad_diff) / quad;
                    if obj <= best_obj {
                        best_obj = obj;
                        j_sel = Some(j);
                    }
                }
            }
        }

        if gmax + gmax2 < self.tolerance {
            return None;
        }
        Some((i_sel?, j_sel?))
    }

    fn compute_rho(alpha: &[f64], grad: &[f64]) -> f64 {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut free = 0usize;
        let mut sum_free = 0.0;
        for (&a, &g) in alpha.iter().zip(grad) {
            if a >= UPPER {
                lb = lb.max(g);
            } else if a <= 0.0 {
                ub = ub.min(g);
            } else {
                free += 1;
                sum_free += g;
            }
        }
        if free > 0 {
            sum_free / free as f64
        } else {
            (ub + lb) / 2.0
        }
    }
}

impl OneClassSolver for SmoOneClass {
    fn fit(&self, gram: &GramMatrix, nu: f64) -> Result<SupportVectorSet> {
        Self::validate(gram, nu)?;
        let n = gram.len();
        let asym = gram.asymmetry();
        if asym > 1e-9 {
            warn!("one-class training on an asymmetric Gram matrix (max |K - Kᵀ| = {asym:.3e})");
        }

        let mut alpha = Self::initial_alpha(n, nu);
        let mut grad = vec![0.0; n];
        for (j, &a) in alpha.iter().enumerate() {
            if a != 0.0 {
                for (t, g) in grad.iter_mut().enumerate() {
                    *g += a * gram.get(t, j);
                }
            }
        }

        let mut iter = 0usize;
        while let Some((i, j)) = self.select_working_set(gram, &alpha, &grad) {
            if iter >= self.max_iter {
                return Err(CosegError::Training(format!(
                    "SMO did not converge within {} iterations",
                    self.max_iter
                )));
            }
            iter += 1;

            let (old_i, old_j) = (alpha[i], alpha[j]);
            let mut quad = gram.get(i, i) + gram.get(j, j) - 2.0 * gram.get(i, j);
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = old_i + old_j;
            let mut ai = old_i - delta;
            let mut aj = old_j + delta;
            if sum > UPPER {
                if ai > UPPER {
                    ai = UPPER;
                    aj = sum - UPPER;
                }
            } else if aj < 0.0 {
                aj = 0.0;
                ai = sum;
            }
            if sum > UPPER {
                if aj > UPPER {
                    aj = UPPER;
                    ai = sum - UPPER;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = sum;
            }
            alpha[i] = ai;
            alpha[j] = aj;

            let (di, dj) = (ai - old_i, aj - old_j);
            for (t, g) in grad.iter_mut().enumerate() {
                *g += gram.get(t, i) * di + gram.get(t, j) * dj;
            }
        }

        let rho = Self::compute_rho(&alpha, &grad);
        let (indices, alphas): (Vec<usize>, Vec<f64>) = alpha
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a > 0.0)
            .map(|(i, &a)| (i, a))
            .unzip();
        debug!(
            "SMO one-class: n={n} nu={nu} iterations={iter} support={} rho={rho:.4}",
            indices.len()
        );
        SupportVectorSet::new(indices, alphas, rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn rbf_gram(points: &[f64]) -> GramMatrix {
        let n = points.len();
        GramMatrix {
            matrix: DMatrix::from_fn(n, n, |i, j| (-(points[i] - points[j]).powi(2)).exp()),
        }
    }

    #[test]
    fn solution_satisfies_constraints() {
        let gram = rbf_gram(&[0.0, 0.1, 0.2, 0.15, 0.05, 3.0, 0.12, 0.18]);
        let nu = 0.3;
        let svs = SmoOneClass::default().fit(&gram, nu).unwrap();
        let total: f64 = svs.alphas.iter().sum();
        assert_relative_eq!(total, nu * 8.0, epsilon = 1e-9);
        assert!(svs.alphas.iter().all(|&a| a > 0.0 && a <= 1.0));
        assert!(!svs.is_empty());
        assert!(svs.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn outlier_scores_below_inliers() {
        let points = [0.0, 0.1, 0.2, 0.15, 0.05, 3.0, 0.12, 0.18];
        let gram = rbf_gram(&points);
        let svs = SmoOneClass::default().fit(&gram, 0.5).unwrap();
        let score = |x: f64| svs.decision_value(|k| (-(x - points[k]).powi(2)).exp());
        assert!(score(0.1) > score(3.0));
    }

    #[test]
    fn nu_of_one_keeps_every_sample() {
        let gram = rbf_gram(&[0.0, 1.0, 2.0]);
        let svs = SmoOneClass::default().fit(&gram, 1.0).unwrap();
        assert_eq!(svs.indices, vec![0, 1, 2]);
    }

    #[test]
    fn invalid_inputs_fail_training() {
        let gram = rbf_gram(&[0.0, 1.0]);
        assert!(matches!(
            SmoOneClass::default().fit(&gram, 0.0),
            Err(CosegError::Training(_))
        ));
        let mut bad = gram.clone();
        bad.matrix[(0, 1)] = f64::NAN;
        assert!(matches!(
            SmoOneClass::default().fit(&bad, 0.5),
            Err(CosegError::Training(_))
        ));
    }
}
