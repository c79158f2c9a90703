// Polynomial gain functions
//
// Calibrated gains are stored as polynomials in alpha with coefficients
// ordered highest power first. A polynomial is produced by a fit, persisted
// and reloaded, and never mutated; recalibration produces a new value.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Degree used for luminance calibration fits
pub const DEFAULT_DEGREE: usize = 2;

/// Polynomial with coefficients highest power first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Constant `x -> 1.0`, the gain before any calibration
    pub fn default_beta_function() -> Self {
        Self::new(vec![1.0])
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate with Horner's scheme. The result is a raw factor; callers clamp.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .fold(0.0, |acc, &coefficient| acc * x + coefficient)
    }

    /// Least-squares polynomial fit of `ys` against `xs`
    ///
    /// Solves the Vandermonde system through an SVD, so rank-deficient input
    /// (e.g. all `xs` equal) still yields the minimum-norm solution instead of
    /// an error.
    ///
    /// # Errors
    /// `ConfigError::InvalidFitInput` when the slices differ in length or hold
    /// fewer than `degree + 1` points.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Self, ConfigError> {
        if xs.len() != ys.len() {
            return Err(ConfigError::InvalidFitInput {
                reason: format!("{} x values but {} y values", xs.len(), ys.len()),
            });
        }
        if xs.len() < degree + 1 {
            return Err(ConfigError::InvalidFitInput {
                reason: format!(
                    "degree {} needs at least {} points, got {}",
                    degree,
                    degree + 1,
                    xs.len()
                ),
            });
        }

        let n = xs.len();
        let columns = degree + 1;
        let vandermonde =
            DMatrix::from_fn(n, columns, |row, col| xs[row].powi((degree - col) as i32));
        let targets = DVector::from_column_slice(ys);

        let svd = vandermonde.svd(true, true);
        let eps = svd.singular_values.max() * n.max(columns) as f64 * f64::EPSILON;
        let solution = svd
            .solve(&targets, eps)
            .map_err(|reason| ConfigError::InvalidFitInput {
                reason: reason.to_string(),
            })?;

        log::debug!(
            "[PolynomialFit] Fitted degree {} over {} points: {:?}",
            degree,
            n,
            solution.as_slice()
        );

        Ok(Self::new(solution.iter().copied().collect()))
    }
}

/// Gain polynomials applied by the colour model
#[derive(Debug, Clone, PartialEq)]
pub struct GainFunctions {
    /// Colour B gain relative to colour A
    pub beta: Polynomial,
    /// Background luminance gain
    pub kappa: Polynomial,
}

impl Default for GainFunctions {
    fn default() -> Self {
        Self {
            beta: Polynomial::default_beta_function(),
            kappa: Polynomial::default_beta_function(),
        }
    }
}
