//! One-class support-vector training over a precomputed Gram matrix.
//!
//! The pipeline consumes the solver through [`OneClassSolver`]: a Gram
//! matrix and `ν` in, support indices with their dual coefficients out.
//! [`SmoOneClass`] is the bundled ν-one-class SMO implementation.

pub mod smo;

pub use smo::SmoOneClass;

use crate::error::{CosegError, Result};
use crate::gram::GramMatrix;
use serde::{Deserialize, Serialize};

/// Training images that define the boundary of the foreground class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorSet {
    /// Training-set indices with non-zero dual coefficient, ascending.
    pub indices: Vec<usize>,
    /// Dual coefficient for each entry of `indices`.
    pub alphas: Vec<f64>,
    /// Decision offset reported by the solver.
    pub rho: f64,
}

impl SupportVectorSet {
    /// Pair indices with coefficients; both must have equal, non-zero length.
    pub fn new(indices: Vec<usize>, alphas: Vec<f64>, rho: f64) -> Result<Self> {
        if indices.len() != alphas.len() {
            return Err(CosegError::invalid(
                "alphas",
                format!("{} indices but {} coefficients", indices.len(), alphas.len()),
            ));
        }
        if indices.is_empty() {
            return Err(CosegError::EmptySupport);
        }
        Ok(Self {
            indices,
            alphas,
            rho,
        })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `(training index, α)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.alphas.iter().copied())
    }

    /// `Σ α_k K(k, ·) − ρ` for a kernel row evaluated against the supports.
    pub fn decision_value(&self, kernel: impl Fn(usize) -> f64) -> f64 {
        self.iter().map(|(k, a)| a * kernel(k)).sum::<f64>() - self.rho
    }
}

/// Narrow contract of the one-class classifier.
pub trait OneClassSolver: Send + Sync {
    /// Fit on a precomputed kernel with expected outlier fraction `nu`.
    fn fit(&self, gram: &GramMatrix, nu: f64) -> Result<SupportVectorSet>;
}
