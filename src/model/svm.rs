//! L2-regularised linear support vector classifier over sparse rows.
//!
//! Each binary problem minimises
//!
//! ```text
//! 0.5 * ||w||^2 + C * sum_i max(0, 1 - y_i (w . x_i + b))^2
//! ```
//!
//! with dual coordinate descent. The intercept is learned as the weight of a
//! constant unit feature, so it is regularised like any other weight.
//! Multi-class problems are decomposed one-vs-rest; a two-class problem yields
//! a single weight vector scoring the second class against the first.

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use sprs::{CsMat, CsVecView};
use tracing::{debug, warn};

use super::TrainingError;

/// Hyper-parameters of the solver.
#[derive(Debug, Clone)]
pub struct LinearSvc {
    c: f64,
    tol: f64,
    max_iter: usize,
    seed: u64,
}

impl Default for LinearSvc {
    fn default() -> Self {
        Self {
            c: 1.0,
            tol: 1e-4,
            max_iter: 1000,
            seed: 0,
        }
    }
}

impl LinearSvc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inverse regularisation strength; smaller values give simpler models.
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Stop once the projected gradient spread falls below `tol`.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Seed of the coordinate visiting order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on the rows of `x`, one label per row.
    pub fn fit(&self, x: &CsMat<f64>, y: &[usize]) -> Result<FittedLinearSvc, TrainingError> {
        if x.rows() == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if x.rows() != y.len() {
            return Err(TrainingError::LengthMismatch {
                sentences: x.rows(),
                labels: y.len(),
            });
        }
        if self.c.is_nan() || self.c <= 0.0 {
            return Err(TrainingError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }

        let mut classes: Vec<usize> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(TrainingError::InsufficientClasses {
                found: classes.len(),
            });
        }

        let csr;
        let x = if x.is_csr() {
            x
        } else {
            csr = x.to_csr();
            &csr
        };
        let rows: Vec<CsVecView<'_, f64>> = x.outer_iterator().collect();

        // two classes share one hyperplane, positive side = second class
        let positives: Vec<usize> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut coef = Array2::<f64>::zeros((positives.len(), x.cols()));
        for (k, &positive) in positives.iter().enumerate() {
            let signs: Vec<f64> = y
                .iter()
                .map(|&label| if label == positive { 1.0 } else { -1.0 })
                .collect();
            let w = self.solve_binary(&rows, x.cols(), &signs, &mut rng);
            coef.row_mut(k).assign(&w);
        }

        Ok(FittedLinearSvc { coef, classes })
    }

    fn solve_binary(
        &self,
        rows: &[CsVecView<'_, f64>],
        n_features: usize,
        signs: &[f64],
        rng: &mut StdRng,
    ) -> Array1<f64> {
        let diag = 0.5 / self.c;
        let q_diag: Vec<f64> = rows
            .iter()
            .map(|row| row.data().iter().map(|v| v * v).sum::<f64>() + 1.0 + diag)
            .collect();
        let mut alpha = vec![0.0; rows.len()];
        let mut w = Array1::<f64>::zeros(n_features);
        let mut b = 0.0;
        let mut order: Vec<usize> = (0..rows.len()).collect();

        for iter in 0..self.max_iter {
            order.shuffle(rng);
            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            for &i in &order {
                let yi = signs[i];
                let score: f64 = rows[i].iter().map(|(j, &v)| w[j] * v).sum();
                let gradient = yi * (score + b) - 1.0 + diag * alpha[i];
                let projected = if alpha[i] == 0.0 {
                    gradient.min(0.0)
                } else {
                    gradient
                };
                pg_max = pg_max.max(projected);
                pg_min = pg_min.min(projected);

                if projected.abs() > 1e-12 {
                    let previous = alpha[i];
                    alpha[i] = (previous - gradient / q_diag[i]).max(0.0);
                    let step = (alpha[i] - previous) * yi;
                    for (j, &v) in rows[i].iter() {
                        w[j] += step * v;
                    }
                    b += step;
                }
            }

            if pg_max - pg_min <= self.tol {
                debug!(iterations = iter + 1, "linear svc converged");
                return w;
            }
        }

        warn!(
            max_iter = self.max_iter,
            "linear svc did not converge; using last iterate"
        );
        w
    }
}

/// Trained hyperplanes, one row of `coef` per scored class.
#[derive(Debug, Clone)]
pub struct FittedLinearSvc {
    pub coef: Array2<f64>,
    /// Sorted distinct labels seen during fitting.
    pub classes: Vec<usize>,
}
