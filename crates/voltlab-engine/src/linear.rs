//! Linear system solving.
//!
//! LU decomposition with partial pivoting via nalgebra. A factorization
//! is considered singular when back-substitution fails or any pivot
//! falls below a small epsilon scaled by the matrix magnitude; both
//! surface as [`Error::SingularMatrix`], which is fatal for the current
//! topology.

use nalgebra::{DMatrix, DVector, Dyn, LU};

use crate::error::{Error, Result};

/// Relative pivot threshold below which the matrix is treated as
/// singular.
const PIVOT_EPSILON: f64 = 1e-13;

fn check_pivots(matrix: &DMatrix<f64>, lu: &LU<f64, Dyn, Dyn>) -> Result<()> {
    let scale = matrix.amax();
    if scale == 0.0 {
        return Err(Error::SingularMatrix);
    }
    let u = lu.u();
    for i in 0..u.nrows().min(u.ncols()) {
        if u[(i, i)].abs() < PIVOT_EPSILON * scale {
            return Err(Error::SingularMatrix);
        }
    }
    Ok(())
}

/// Solve `Ax = b` by LU decomposition with partial pivoting.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }
    if a.nrows() == 0 {
        return Ok(DVector::zeros(0));
    }

    let lu = a.clone().lu();
    check_pivots(a, &lu)?;
    lu.solve(b).ok_or(Error::SingularMatrix)
}

/// Cached LU factorization keyed by the MNA matrix version.
///
/// Across sub-iterations and ticks where only the RHS changes (linear
/// circuits, gate outputs, companion current sources) the factors are
/// reused and each solve is a pair of triangular substitutions.
/// Re-factoring on every call remains the valid fallback and happens
/// automatically whenever the version moves.
#[derive(Debug, Default)]
pub struct LuCache {
    factors: Option<(u64, LU<f64, Dyn, Dyn>)>,
}

impl LuCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any cached factorization.
    pub fn invalidate(&mut self) {
        self.factors = None;
    }

    /// Solve against `matrix` at `version`, factoring only if the
    /// cached factorization is stale.
    pub fn solve(
        &mut self,
        matrix: &DMatrix<f64>,
        version: u64,
        rhs: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        if matrix.nrows() == 0 {
            return Ok(DVector::zeros(0));
        }

        if let Some((cached, lu)) = &self.factors {
            if *cached == version {
                return lu.solve(rhs).ok_or(Error::SingularMatrix);
            }
        }

        let lu = matrix.clone().lu();
        check_pivots(matrix, &lu)?;
        let solution = lu.solve(rhs).ok_or(Error::SingularMatrix)?;
        self.factors = Some((version, lu));
        Ok(solution)
    }
}
