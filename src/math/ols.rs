//! Least squares via the Moore–Penrose pseudo-inverse.
//!
//! Each continuous node is fitted stratum by stratum as
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2,   x_i = [1, parent values...]
//! ```
//!
//! Strata can be thin (`n <= m + 1`) or have collinear parents, so the design
//! matrix is frequently rank deficient or wider than it is tall. Solving with
//! the SVD pseudo-inverse returns the minimum-norm solution in those cases
//! instead of failing.

use nalgebra::{DMatrix, DVector};

/// Relative cutoff for singular values. Loose enough that exactly collinear
/// parents are detected despite rounding in the decomposition.
const RCOND: f64 = 1e-10;

/// Result of one least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    pub beta: DVector<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

/// Solve `x β ≈ y` by pseudo-inverse.
///
/// Singular values below `RCOND · σ_max` are treated as zero.
/// Returns `None` only if the decomposition yields non-finite values.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<LeastSquaresFit> {
    let (n, p) = x.shape();
    if n == 0 || p == 0 {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let tol = sigma_max * RCOND;
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();

    let pinv = svd.pseudo_inverse(tol).ok()?;
    let beta = pinv * y;
    if !beta.iter().all(|v| v.is_finite()) {
        return None;
    }

    let resid = y - x * &beta;
    let rss = resid.norm_squared();

    Some(LeastSquaresFit { beta, rss, rank })
}
