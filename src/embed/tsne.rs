use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Iterations during which attractive forces are exaggerated and momentum is low.
const EXAGGERATION_ITERS: usize = 250;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;

/// Settings for exact t-SNE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneConfig {
    pub n_components: usize,
    /// Effective neighbourhood size; must be below the number of samples.
    pub perplexity: f64,
    pub learning_rate: f64,
    pub n_iter: usize,
    pub early_exaggeration: f64,
    pub seed: u64,
}

impl Default for TsneConfig {
    fn default() -> Self {
        TsneConfig {
            n_components: 2,
            perplexity: 30.0,
            learning_rate: 200.0,
            n_iter: 1_000,
            early_exaggeration: 12.0,
            seed: 0,
        }
    }
}

impl TsneConfig {
    pub fn validate(&self, n_samples: usize) -> Result<()> {
        if self.n_components == 0 {
            return Err(Error::InvalidConfig("n_components must be at least 1".to_owned()));
        }
        if !(self.perplexity > 0.0) || self.perplexity >= n_samples as f64 {
            return Err(Error::InvalidConfig(format!(
                "perplexity must be in (0, {}), got {}",
                n_samples, self.perplexity
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig("learning_rate must be positive".to_owned()));
        }
        if self.n_iter == 0 {
            return Err(Error::InvalidConfig("n_iter must be at least 1".to_owned()));
        }
        Ok(())
    }
}

/// Embeds the rows of `data` in `config.n_components` dimensions with exact
/// (O(n²) per iteration) t-SNE.
pub fn tsne(data: &Matrix, config: &TsneConfig) -> Result<Matrix> {
    if data.rows == 0 {
        return Err(Error::EmptyBatch);
    }
    config.validate(data.rows)?;
    let n = data.rows;
    let dims = config.n_components;

    let p = joint_probabilities(&squared_distances(data), config.perplexity);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut y = Matrix::normal(n, dims, 1e-4, &mut rng);
    let mut update = Matrix::zeros(n, dims);
    let mut gains = Matrix::from_data(vec![vec![1.0; dims]; n]);

    for iter in 0..config.n_iter {
        let (exaggeration, momentum) = if iter < EXAGGERATION_ITERS {
            (config.early_exaggeration, 0.5)
        } else {
            (1.0, 0.8)
        };

        // Student-t kernel between every pair of embedded points.
        let mut num = squared_distances(&y);
        let mut total = 0.0;
        for (i, row) in num.data.iter_mut().enumerate() {
            for (j, d) in row.iter_mut().enumerate() {
                *d = if i == j { 0.0 } else { 1.0 / (1.0 + *d) };
                total += *d;
            }
        }

        let mut grad = Matrix::zeros(n, dims);
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num.data[i][j] / total).max(MIN_PROBABILITY);
                let force = 4.0 * (exaggeration * p.data[i][j] - q) * num.data[i][j];
                for k in 0..dims {
                    grad.data[i][k] += force * (y.data[i][k] - y.data[j][k]);
                }
            }
        }

        for i in 0..n {
            for k in 0..dims {
                let g = grad.data[i][k];
                let u = &mut update.data[i][k];
                let gain = &mut gains.data[i][k];
                // Grow the step while the gradient agrees with the direction of travel.
                *gain = if g * *u < 0.0 { *gain + 0.2 } else { *gain * 0.8 };
                *gain = gain.max(MIN_GAIN);
                *u = momentum * *u - config.learning_rate * *gain * g;
                y.data[i][k] += *u;
            }
        }

        let mean = y.mean_rows();
        y = y.add_row(&mean.scale(-1.0));

        if (iter + 1) % 100 == 0 {
            debug!(iter = iter + 1, kl = kl_divergence(&p, &num, total), "t-SNE progress");
        }
    }
    Ok(y)
}

/// Pairwise squared Euclidean distances between rows.
fn squared_distances(x: &Matrix) -> Matrix {
    let mut d = Matrix::zeros(x.rows, x.rows);
    for i in 0..x.rows {
        for j in (i + 1)..x.rows {
            let dist: f64 = x.data[i].iter().zip(x.data[j].iter()).map(|(a, b)| (a - b) * (a - b)).sum();
            d.data[i][j] = dist;
            d.data[j][i] = dist;
        }
    }
    d
}

/// Symmetrized affinities `(P_j|i + P_i|j) / 2n`.
fn joint_probabilities(distances: &Matrix, perplexity: f64) -> Matrix {
    let n = distances.rows;
    let conditional = conditional_probabilities(distances, perplexity);

    let scale = 1.0 / (2.0 * n as f64);
    let mut joint = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint.data[i][j] = ((conditional.data[i][j] + conditional.data[j][i]) * scale).max(MIN_PROBABILITY);
            }
        }
    }
    joint
}

/// Gaussian `P_j|i` rows, each calibrated by binary search on the precision
/// so its entropy matches `ln(perplexity)`.
fn conditional_probabilities(distances: &Matrix, perplexity: f64) -> Matrix {
    let n = distances.rows;
    let target = perplexity.ln();
    let mut conditional = Matrix::zeros(n, n);

    for i in 0..n {
        let mut beta = 1.0;
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        let mut row = vec![0.0; n];

        for _ in 0..100 {
            let entropy = conditional_row(&distances.data[i], i, beta, &mut row);
            let diff = entropy - target;
            if diff.abs() < 1e-5 {
                break;
            }
            // Too much entropy means too wide a kernel.
            if diff > 0.0 {
                lo = beta;
                beta = if hi.is_finite() { (beta + hi) / 2.0 } else { beta * 2.0 };
            } else {
                hi = beta;
                beta = if lo.is_finite() { (beta + lo) / 2.0 } else { beta / 2.0 };
            }
        }
        conditional.data[i] = row;
    }
    conditional
}

/// Fills `row` with the Gaussian conditional distribution around point `i`
/// at precision `beta` and returns its entropy in nats.
fn conditional_row(distances: &[f64], i: usize, beta: f64, row: &mut [f64]) -> f64 {
    // Shift by the nearest neighbour so the largest weight is exp(0).
    let nearest = distances.iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);

    let mut sum = 0.0;
    for (j, (p, &d)) in row.iter_mut().zip(distances.iter()).enumerate() {
        *p = if j == i { 0.0 } else { (-(d - nearest) * beta).exp() };
        sum += *p;
    }

    let mut weighted = 0.0;
    for (p, &d) in row.iter_mut().zip(distances.iter()) {
        *p /= sum;
        weighted += *p * (d - nearest);
    }
    sum.ln() + beta * weighted
}

fn kl_divergence(p: &Matrix, num: &Matrix, total: f64) -> f64 {
    let mut kl = 0.0;
    for (p_row, n_row) in p.data.iter().zip(num.data.iter()) {
        for (&pij, &nij) in p_row.iter().zip(n_row.iter()) {
            if pij > MIN_PROBABILITY {
                let q = (nij / total).max(MIN_PROBABILITY);
                kl += pij * (pij / q).ln();
            }
        }
    }
    kl
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three tight clusters of `per` points each, far apart in 5-D.
    fn clusters(per: usize) -> (Matrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for c in 0..3 {
            for i in 0..per {
                let mut row = vec![c as f64 * 10.0; 5];
                row[i % 5] += 0.1 * (i / 5 + 1) as f64;
                rows.push(row);
                labels.push(c);
            }
        }
        (Matrix::from_data(rows), labels)
    }

    fn config() -> TsneConfig {
        TsneConfig { perplexity: 5.0, n_iter: 1_000, ..TsneConfig::default() }
    }

    #[test]
    fn nearest_neighbours_stay_in_cluster() {
        let (data, labels) = clusters(10);
        let y = tsne(&data, &config()).unwrap();
        assert_eq!(y.shape(), (30, 2));

        let d = squared_distances(&y);
        for i in 0..30 {
            let nearest = (0..30)
                .filter(|&j| j != i)
                .min_by(|&a, &b| d.data[i][a].total_cmp(&d.data[i][b]))
                .unwrap();
            assert_eq!(labels[nearest], labels[i], "point {i} drifted to another cluster");
        }
    }

    #[test]
    fn same_seed_same_embedding() {
        let (data, _) = clusters(4);
        let cfg = TsneConfig { perplexity: 3.0, n_iter: 50, ..TsneConfig::default() };
        assert_eq!(tsne(&data, &cfg).unwrap(), tsne(&data, &cfg).unwrap());
    }

    #[test]
    fn calibrated_rows_hit_the_target_perplexity() {
        let (data, _) = clusters(10);
        let d = squared_distances(&data);
        let conditional = conditional_probabilities(&d, 5.0);
        for (i, row) in conditional.data.iter().enumerate() {
            assert_eq!(row[i], 0.0);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            let entropy: f64 = row.iter().filter(|&&p| p > 0.0).map(|&p| -p * p.ln()).sum();
            assert!((entropy - 5.0_f64.ln()).abs() < 1e-4, "row {i} entropy {entropy}");
        }
    }

    #[test]
    fn joint_affinities_are_a_symmetric_distribution() {
        let (data, _) = clusters(10);
        let d = squared_distances(&data);
        let p = joint_probabilities(&d, 5.0);
        let total: f64 = p.data.iter().flatten().sum();
        assert!((total - 1.0).abs() < 1e-6);
        for i in 0..30 {
            assert_eq!(p.data[i][i], 0.0);
            for j in 0..30 {
                assert_eq!(p.data[i][j], p.data[j][i]);
            }
        }
    }

    #[test]
    fn perplexity_must_be_below_sample_count() {
        let (data, _) = clusters(2);
        let cfg = TsneConfig { perplexity: 6.0, ..TsneConfig::default() };
        assert!(matches!(tsne(&data, &cfg), Err(Error::InvalidConfig(_))));
        assert!(matches!(tsne(&Matrix::zeros(0, 3), &config()), Err(Error::EmptyBatch)));
    }
}
