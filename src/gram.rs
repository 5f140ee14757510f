//! Weighted combination of the kernel channels into the Gram matrix.
//!
//! `gram[i][j] = theta[i][j] · (β₁·omega1[i][j] + β₂·omega2[i][j] + β₃·omega3[i][j])`
//!
//! Cheap relative to the kernels themselves, so it is rebuilt freely
//! whenever β changes.
use crate::kernels::KernelMatrix;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Channel weights `(β₁, β₂, β₃)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Betas {
    pub beta1: f64,
    pub beta2: f64,
    pub beta3: f64,
}

impl Betas {
    pub fn new(beta1: f64, beta2: f64, beta3: f64) -> Self {
        Self {
            beta1,
            beta2,
            beta3,
        }
    }

    pub fn scaled(&self, k: f64) -> Self {
        Self::new(self.beta1 * k, self.beta2 * k, self.beta3 * k)
    }

    pub fn with_beta1(&self, beta1: f64) -> Self {
        Self { beta1, ..*self }
    }

    pub fn with_beta3(&self, beta3: f64) -> Self {
        Self { beta3, ..*self }
    }

    pub fn is_finite(&self) -> bool {
        self.beta1.is_finite() && self.beta2.is_finite() && self.beta3.is_finite()
    }
}

/// Square similarity matrix consumed by the one-class solver.
#[derive(Clone, Debug, PartialEq)]
pub struct GramMatrix {
    pub matrix: DMatrix<f64>,
}

impl GramMatrix {
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    /// Largest `|g_ij − g_ji|`; non-zero because omega2 is directional.
    pub fn asymmetry(&self) -> f64 {
        let m = &self.matrix;
        (m - m.transpose()).amax()
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}

/// Assemble the Gram matrix from cached kernel channels and `betas`.
pub fn gram(kernels: &KernelMatrix, betas: Betas) -> GramMatrix {
    let n = kernels.len();
    let matrix = DMatrix::from_fn(n, n, |i, j| {
        let k = kernels.get(i, j);
        k.theta * (betas.beta1 * k.omega1 + betas.beta2 * k.omega2 + betas.beta3 * k.omega3)
    });
    GramMatrix { matrix }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::KernelEntry;
    use approx::assert_relative_eq;

    fn kernels() -> KernelMatrix {
        let entries = (0..9)
            .map(|k| {
                let v = k as f64;
                KernelEntry {
                    theta: 1.0 / (1.0 + v),
                    omega1: 0.1 * v,
                    omega2: 2.0 + v,
                    omega3: 0.5 * v * v,
                }
            })
            .collect();
        KernelMatrix::from_entries(3, entries).unwrap()
    }

    #[test]
    fn gram_is_linear_in_betas() {
        let k = kernels();
        let b = Betas::new(0.28, 1.0, 0.05);
        let g1 = gram(&k, b);
        let g2 = gram(&k, b.scaled(2.0));
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(g2.get(i, j), 2.0 * g1.get(i, j), epsilon = 1e-12);
            }
        }
        // Each beta separately.
        let only1 = gram(&k, Betas::new(1.0, 0.0, 0.0));
        let double1 = gram(&k, Betas::new(2.0, 0.0, 0.0));
        assert_relative_eq!(double1.get(1, 2), 2.0 * only1.get(1, 2), epsilon = 1e-12);
    }

    #[test]
    fn gram_matches_formula() {
        let k = kernels();
        let g = gram(&k, Betas::new(0.2, 1.0, 0.16));
        let e = k.get(2, 1);
        let expected = e.theta * (0.2 * e.omega1 + e.omega2 + 0.16 * e.omega3);
        assert_relative_eq!(g.get(2, 1), expected, epsilon = 1e-12);
        assert!(g.asymmetry() > 0.0);
    }
}
