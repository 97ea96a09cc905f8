//! Spin sampling over the constrained atoms
//!
//! Every constrained atom contributes a one-dimensional array of candidate
//! spin values; the sweep visits the Cartesian product of those arrays.

use crate::config::{Bound, SpinConstraint};
use crate::error::{Result, SpinForceError};
use itertools::Itertools;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::str::FromStr;
use tracing::warn;

/// Relative slack when counting interval steps, absorbs round-off in
/// `(high - low) / interval`
const STEP_TOLERANCE: f64 = 1e-9;

/// Upper limit on the values sampled for one atom
pub const MAX_SAMPLES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMethod {
    Uniform,
    Random,
}

impl FromStr for SamplingMethod {
    type Err = SpinForceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(Self::Uniform),
            "random" => Ok(Self::Random),
            _ => Err(SpinForceError::config(format!(
                "invalid sampling method \"{}\"",
                s
            ))),
        }
    }
}

/// Produce the candidate values of one atom.
pub fn sample_values<R: Rng + ?Sized>(
    method: SamplingMethod,
    bound: &Bound,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let Bound {
        low,
        high,
        interval,
        points,
    } = *bound;

    if !low.is_finite() || !high.is_finite() {
        return Err(SpinForceError::config("sampling bounds must be finite"));
    }
    if high < low {
        return Err(SpinForceError::config(format!(
            "upper bound {} is below lower bound {}",
            high, low
        )));
    }
    if points == Some(0) {
        return Err(SpinForceError::config("\"points\" must be at least 1"));
    }
    if let Some(n) = points.filter(|&n| n > MAX_SAMPLES) {
        return Err(SpinForceError::config(format!(
            "\"points\" = {} exceeds the limit of {} samples per atom",
            n, MAX_SAMPLES
        )));
    }

    match method {
        SamplingMethod::Uniform => match (interval, points) {
            (Some(step), points) => {
                if points.is_some() {
                    warn!("Entry \"interval\" and \"points\" are both in the configuration, using \"interval\" anyway!");
                }
                arange_inclusive(low, high, step)
            }
            (None, Some(n)) => Ok(linspace(low, high, n)),
            (None, None) => Err(SpinForceError::config(
                "one of \"interval\"/\"points\" must be specified for uniform sampling",
            )),
        },
        SamplingMethod::Random => {
            let n = points.ok_or_else(|| {
                SpinForceError::config("\"random\" sampling must be used with \"points\" specified")
            })?;
            if low == high {
                return Err(SpinForceError::config(
                    "\"random\" sampling needs a non-empty [low, high) range",
                ));
            }
            let dist = Uniform::new(low, high);
            Ok(dist.sample_iter(rng).take(n).collect())
        }
    }
}

fn arange_inclusive(low: f64, high: f64, step: f64) -> Result<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(SpinForceError::config(format!(
            "\"interval\" must be positive, got {}",
            step
        )));
    }
    let count = ((high - low) / step + STEP_TOLERANCE).floor() + 1.0;
    if !count.is_finite() || count > MAX_SAMPLES as f64 {
        return Err(SpinForceError::config(format!(
            "\"interval\" {} over [{}, {}] gives more than {} samples",
            step, low, high, MAX_SAMPLES
        )));
    }
    let n = count as usize;
    Ok((0..n).map(|i| low + i as f64 * step).collect())
}

fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![low];
    }
    let step = (high - low) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { high } else { low + i as f64 * step })
        .collect()
}

/// Cartesian product of the per-atom arrays, last array varying fastest.
///
/// An empty list of arrays yields a single empty grid point.
pub fn cartesian_product(arrays: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if arrays.is_empty() {
        return vec![Vec::new()];
    }
    arrays
        .iter()
        .map(|a| a.iter().copied())
        .multi_cartesian_product()
        .collect()
}

/// All joint spin configurations of one tag
#[derive(Debug, Clone)]
pub struct SpinGrid {
    indices: Vec<usize>,
    points: Vec<Vec<f64>>,
}

impl SpinGrid {
    pub fn from_constraint<R: Rng + ?Sized>(
        constraint: &SpinConstraint,
        rng: &mut R,
    ) -> Result<Self> {
        let mut arrays = Vec::with_capacity(constraint.atoms.len());
        for atom in &constraint.atoms {
            let method = SamplingMethod::from_str(&atom.sampling)?;
            arrays.push(sample_values(method, &atom.bound, rng)?);
        }

        Ok(Self {
            indices: constraint.indices(),
            points: cartesian_product(&arrays),
        })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Overwrite the constrained entries of `spins` with grid point `i`.
    pub fn apply(&self, i: usize, spins: &mut [f64]) {
        for (&atom, &value) in self.indices.iter().zip(self.points[i].iter()) {
            spins[atom] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AtomConstraint;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn bound(low: f64, high: f64, interval: Option<f64>, points: Option<usize>) -> Bound {
        Bound {
            low,
            high,
            interval,
            points,
        }
    }

    #[test]
    fn test_uniform_interval_count() {
        let mut rng = StdRng::seed_from_u64(0);
        for &(low, high, step) in &[(-1.0, 1.0, 0.1), (0.0, 2.0, 0.5), (0.3, 1.0, 0.25), (1.0, 1.0, 0.2)] {
            let values =
                sample_values(SamplingMethod::Uniform, &bound(low, high, Some(step), None), &mut rng)
                    .unwrap();
            let expected = ((high - low) / step + STEP_TOLERANCE).floor() as usize + 1;
            assert_eq!(values.len(), expected);
            assert_eq!(values[0], low);
            for pair in values.windows(2) {
                assert_relative_eq!(pair[1] - pair[0], step, epsilon = 1e-12);
            }
            assert!(*values.last().unwrap() <= high + 1e-12);
        }
    }

    #[test]
    fn test_uniform_interval_round_off() {
        let mut rng = StdRng::seed_from_u64(0);
        let values =
            sample_values(SamplingMethod::Uniform, &bound(-1.0, 1.0, Some(0.1), None), &mut rng)
                .unwrap();
        assert_eq!(values.len(), 21);
        assert_relative_eq!(values[20], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interval_takes_precedence() {
        let mut rng = StdRng::seed_from_u64(0);
        let values =
            sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, Some(0.5), Some(7)), &mut rng)
                .unwrap();
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_uniform_points() {
        let mut rng = StdRng::seed_from_u64(0);
        for &(low, high, n) in &[(-1.0, 1.0, 3), (0.1, 0.7, 7), (2.0, 5.0, 2)] {
            let values =
                sample_values(SamplingMethod::Uniform, &bound(low, high, None, Some(n)), &mut rng)
                    .unwrap();
            assert_eq!(values.len(), n);
            assert_eq!(values[0], low);
            assert_eq!(values[n - 1], high);
        }
        let single =
            sample_values(SamplingMethod::Uniform, &bound(0.4, 0.9, None, Some(1)), &mut rng)
                .unwrap();
        assert_eq!(single, vec![0.4]);
    }

    #[test]
    fn test_uniform_without_step_or_points() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, None, None), &mut rng);
        assert!(matches!(err, Err(SpinForceError::Config(_))));
    }

    #[test]
    fn test_invalid_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_values(SamplingMethod::Uniform, &bound(1.0, 0.0, None, Some(2)), &mut rng).is_err());
        assert!(sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, Some(0.0), None), &mut rng).is_err());
        assert!(sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, Some(-0.1), None), &mut rng).is_err());
        assert!(sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, None, Some(0)), &mut rng).is_err());
    }

    #[test]
    fn test_sample_count_limit() {
        let mut rng = StdRng::seed_from_u64(0);
        for step in [1e-300, 1e-12, f64::MIN_POSITIVE] {
            let err = sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, Some(step), None), &mut rng);
            assert!(matches!(err, Err(SpinForceError::Config(_))), "{}", step);
        }
        let err = sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, None, Some(MAX_SAMPLES + 1)), &mut rng);
        assert!(matches!(err, Err(SpinForceError::Config(_))));
        let err = sample_values(SamplingMethod::Random, &bound(0.0, 1.0, None, Some(usize::MAX)), &mut rng);
        assert!(matches!(err, Err(SpinForceError::Config(_))));

        let values =
            sample_values(SamplingMethod::Uniform, &bound(0.0, 1.0, Some(1e-4), None), &mut rng)
                .unwrap();
        assert_eq!(values.len(), 10_001);
    }

    #[test]
    fn test_random_sampling() {
        let mut rng = StdRng::seed_from_u64(42);
        let values =
            sample_values(SamplingMethod::Random, &bound(-0.5, 0.5, None, Some(100)), &mut rng)
                .unwrap();
        assert_eq!(values.len(), 100);
        assert!(values.iter().all(|&v| (-0.5..0.5).contains(&v)));

        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let b = bound(0.0, 1.0, None, Some(5));
        assert_eq!(
            sample_values(SamplingMethod::Random, &b, &mut rng_a).unwrap(),
            sample_values(SamplingMethod::Random, &b, &mut rng_b).unwrap()
        );
    }

    #[test]
    fn test_random_requires_points() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = sample_values(SamplingMethod::Random, &bound(0.0, 1.0, Some(0.1), None), &mut rng);
        assert!(matches!(err, Err(SpinForceError::Config(_))));
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            SamplingMethod::from_str("gaussian"),
            Err(SpinForceError::Config(_))
        ));
        assert_eq!(SamplingMethod::from_str("random").unwrap(), SamplingMethod::Random);
    }

    #[test]
    fn test_cartesian_product() {
        let arrays = vec![vec![1.0, 2.0], vec![10.0, 20.0, 30.0], vec![100.0, 200.0]];
        let grid = cartesian_product(&arrays);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0], vec![1.0, 10.0, 100.0]);
        assert_eq!(grid[1], vec![1.0, 10.0, 200.0]);
        assert_eq!(grid[2], vec![1.0, 20.0, 100.0]);
        assert_eq!(grid[11], vec![2.0, 30.0, 200.0]);

        let unique: HashSet<Vec<u64>> = grid
            .iter()
            .map(|p| p.iter().map(|v| v.to_bits()).collect())
            .collect();
        assert_eq!(unique.len(), grid.len());
    }

    #[test]
    fn test_cartesian_product_empty() {
        assert_eq!(cartesian_product(&[]), vec![Vec::<f64>::new()]);
        assert!(cartesian_product(&[vec![1.0], vec![]]).is_empty());
    }

    #[test]
    fn test_spin_grid_apply() {
        let constraint = SpinConstraint {
            collinear: true,
            atoms: vec![
                AtomConstraint {
                    index: 2,
                    sampling: "uniform".to_string(),
                    bound: bound(-1.0, 1.0, None, Some(3)),
                },
                AtomConstraint {
                    index: 0,
                    sampling: "uniform".to_string(),
                    bound: bound(0.0, 0.5, Some(0.5), None),
                },
            ],
        };
        let mut rng = StdRng::seed_from_u64(0);
        let grid = SpinGrid::from_constraint(&constraint, &mut rng).unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.indices(), &[2, 0]);

        let mut spins = vec![9.0, 9.0, 9.0];
        grid.apply(1, &mut spins);
        assert_eq!(spins, vec![0.5, 9.0, -1.0]);
        grid.apply(5, &mut spins);
        assert_eq!(spins, vec![0.5, 9.0, 1.0]);
    }
}
