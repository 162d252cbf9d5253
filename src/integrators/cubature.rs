//! Adaptive deterministic cubature with the degree 7/5 embedded rule of
//! Genz and Malik (J. Comput. Appl. Math. 6 (1980) 295).
//!
//! The region with the largest error estimate is halved along the axis
//! with the largest fourth difference until the requested precision or
//! the evaluation budget is reached.

use super::{
    evaluate_batch, make_workers, precision_target, send, Domain, IntegrationResult, Integrator,
};
use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::Integrand;
use crate::IntegratorSettings;
use color_eyre::Report;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const LAMBDA2: f64 = 0.358_568_582_800_318_1; // sqrt(9/70)
const LAMBDA4: f64 = 0.948_683_298_050_513_8; // sqrt(9/10)
const LAMBDA5: f64 = 0.688_247_201_611_685_3; // sqrt(9/19)
/// `(λ2 / λ4)²`, weighting the second differences of the fourth-difference split.
const DIFFERENCE_RATIO: f64 = 1. / 7.;
/// Relative precision used when no target is configured.
const DEFAULT_EPS_REL: f64 = 1e-4;

/// Number of points of the rule in `n` dimensions.
pub fn rule_size(n: usize) -> usize {
    1 + 4 * n + 2 * n * (n - 1) + (1 << n)
}

#[derive(Debug, Clone)]
struct Region {
    center: Vec<f64>,
    half_width: Vec<f64>,
    value: f64,
    error: f64,
    split_dim: usize,
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.error == other.error
    }
}

impl Eq for Region {}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error
            .partial_cmp(&other.error)
            .unwrap_or(Ordering::Equal)
    }
}

/// Points of the rule for the box around `center`, in the order expected
/// by [`apply_rule`].
fn rule_points(center: &[f64], half_width: &[f64], points: &mut Vec<f64>) {
    let n = center.len();
    let mut push = |offsets: &[(usize, f64)]| {
        let start = points.len();
        points.extend_from_slice(center);
        for &(d, l) in offsets {
            points[start + d] += l * half_width[d];
        }
    };

    push(&[]);
    for &lambda in &[LAMBDA2, LAMBDA4] {
        for d in 0..n {
            push(&[(d, lambda)]);
            push(&[(d, -lambda)]);
        }
    }
    for i in 0..n {
        for j in i + 1..n {
            for &(si, sj) in &[(1., 1.), (1., -1.), (-1., 1.), (-1., -1.)] {
                push(&[(i, si * LAMBDA4), (j, sj * LAMBDA4)]);
            }
        }
    }
    let mut corner = Vec::with_capacity(n);
    for mask in 0..(1usize << n) {
        corner.clear();
        corner.extend((0..n).map(|d| {
            let sign = if mask & (1 << d) == 0 { 1. } else { -1. };
            (d, sign * LAMBDA5)
        }));
        push(&corner);
    }
}

/// Degree 7 value, its error estimate and the axis to split along.
fn apply_rule(f: &[f64], half_width: &[f64]) -> (f64, f64, usize) {
    let n = half_width.len();
    let nf = n as f64;
    let volume: f64 = half_width.iter().map(|h| 2. * h).product();

    let f0 = f[0];
    let (mut s2, mut s3, mut s4, mut s5) = (0., 0., 0., 0.);
    let mut split_dim = 0;
    let mut max_diff = -1.;
    for d in 0..n {
        let f2 = f[1 + 2 * d] + f[2 + 2 * d];
        let f3 = f[1 + 2 * n + 2 * d] + f[2 + 2 * n + 2 * d];
        s2 += f2;
        s3 += f3;
        let diff = (f2 - 2. * f0 - DIFFERENCE_RATIO * (f3 - 2. * f0)).abs();
        if diff > max_diff
            || (diff == max_diff && half_width[d] > half_width[split_dim])
        {
            max_diff = diff;
            split_dim = d;
        }
    }
    let offset = 1 + 4 * n;
    let n_pairs = 2 * n * (n - 1);
    for v in &f[offset..offset + n_pairs] {
        s4 += v;
    }
    for v in &f[offset + n_pairs..] {
        s5 += v;
    }

    let w1 = (12824. - 9120. * nf + 400. * nf * nf) / 19683.;
    let w2 = 980. / 6561.;
    let w3 = (1820. - 400. * nf) / 19683.;
    let w4 = 200. / 19683.;
    let w5 = 6859. / 19683. / (1u64 << n) as f64;
    let degree7 = w1 * f0 + w2 * s2 + w3 * s3 + w4 * s4 + w5 * s5;

    let v1 = (729. - 950. * nf + 50. * nf * nf) / 729.;
    let v2 = 245. / 486.;
    let v3 = (265. - 100. * nf) / 1458.;
    let v4 = 25. / 729.;
    let degree5 = v1 * f0 + v2 * s2 + v3 * s3 + v4 * s4;

    (
        volume * degree7,
        volume * (degree7 - degree5).abs(),
        split_dim,
    )
}

pub struct CubatureIntegrator {
    max_evals: usize,
    eps_rel: f64,
    eps_abs: f64,
    n_cores: usize,
    max_weight: Option<f64>,
    status_update_sender: StatusUpdateSender,
}

impl CubatureIntegrator {
    pub fn new(settings: &IntegratorSettings, status_update_sender: StatusUpdateSender) -> CubatureIntegrator {
        let (eps_rel, eps_abs) = if settings.eps_rel <= 0. && settings.eps_abs <= 0. {
            (DEFAULT_EPS_REL, 0.)
        } else {
            (settings.eps_rel, settings.eps_abs)
        };
        CubatureIntegrator {
            max_evals: settings.n_max,
            eps_rel,
            eps_abs,
            n_cores: settings.n_cores,
            max_weight: None,
            status_update_sender,
        }
    }

    /// Evaluate the rule on each of the boxes.
    fn evaluate(
        &mut self,
        integrand: &mut dyn Integrand,
        workers: &mut [Box<dyn Integrand>],
        domain: &Domain,
        boxes: Vec<(Vec<f64>, Vec<f64>)>,
    ) -> Vec<Region> {
        let size = rule_size(domain.ndim());
        let mut points = Vec::with_capacity(boxes.len() * size * domain.ndim());
        for (c, h) in &boxes {
            rule_points(c, h, &mut points);
        }
        let mut f = vec![0.; boxes.len() * size];
        evaluate_batch(integrand, workers, domain, &points, &mut f);

        let max = f.iter().cloned().fold(self.max_weight.unwrap_or(0.), f64::max);
        self.max_weight = Some(max);

        boxes
            .into_iter()
            .zip(f.chunks(size))
            .map(|((center, half_width), fr)| {
                let (value, error, split_dim) = apply_rule(fr, &half_width);
                Region {
                    center,
                    half_width,
                    value,
                    error,
                    split_dim,
                }
            })
            .collect()
    }
}

impl Integrator for CubatureIntegrator {
    fn name(&self) -> &str {
        "cubature"
    }

    fn min_dimension(&self) -> usize {
        2
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report> {
        let ndim = domain.ndim();
        let size = rule_size(ndim);
        let mut workers = make_workers(integrand, self.n_cores);

        let mut heap = BinaryHeap::new();
        let first = self.evaluate(
            integrand,
            &mut workers,
            domain,
            vec![(vec![0.5; ndim], vec![0.5; ndim])],
        );
        heap.extend(first);
        let mut n_evals = size;
        let mut n_iterations = 1;

        let (value, error, converged) = loop {
            let value: f64 = heap.iter().map(|r: &Region| r.value).sum();
            let error: f64 = heap.iter().map(|r: &Region| r.error).sum();
            let target = precision_target(self.eps_rel, self.eps_abs, value).unwrap_or(0.);
            if error <= target {
                break (value, error, true);
            }
            if n_evals + 2 * size > self.max_evals {
                break (value, error, false);
            }

            let region = match heap.pop() {
                Some(r) => r,
                None => break (value, error, false),
            };
            let d = region.split_dim;
            let mut half_width = region.half_width;
            half_width[d] *= 0.5;
            let mut lower = region.center.clone();
            lower[d] -= half_width[d];
            let mut upper = region.center;
            upper[d] += half_width[d];

            let halves = self.evaluate(
                integrand,
                &mut workers,
                domain,
                vec![(lower, half_width.clone()), (upper, half_width)],
            );
            heap.extend(halves);
            n_evals += 2 * size;
            n_iterations += 1;
        };

        if !converged {
            send(
                &self.status_update_sender,
                StatusUpdate::Warning(format!(
                    "cubature stopped after {} evaluations with error {:e}",
                    n_evals, error
                )),
            );
        }
        send(
            &self.status_update_sender,
            StatusUpdate::NewPoint(n_iterations, value, error, 0., false),
        );

        Ok(IntegrationResult {
            integrator: self.name().to_owned(),
            value,
            error,
            chi_sq: 0.,
            n_evals,
            n_iterations,
            converged,
            max_weight: self.max_weight.unwrap_or(0.),
        })
    }

    fn max_weight(&self) -> Option<f64> {
        self.max_weight
    }

    fn reset(&mut self) {
        self.max_weight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_integrates_polynomials_exactly() {
        let n = 3;
        let center = vec![0.5; n];
        let half_width = vec![0.5; n];
        let mut points = vec![];
        rule_points(&center, &half_width, &mut points);
        assert_eq!(points.len(), rule_size(n) * n);

        // x² y z³ on the unit cube integrates to 1/24
        let f: Vec<f64> = points
            .chunks(n)
            .map(|x| x[0] * x[0] * x[1] * x[2].powi(3))
            .collect();
        let (value, error, _) = apply_rule(&f, &half_width);
        assert!((value - 1. / 24.).abs() < 1e-12);
        assert!(error < 1e-12);
    }

    #[test]
    fn split_follows_the_variation() {
        let n = 2;
        let half_width = vec![0.5; n];
        let mut points = vec![];
        rule_points(&[0.5, 0.5], &half_width, &mut points);
        let f: Vec<f64> = points.chunks(n).map(|x| (10. * x[1]).sin()).collect();
        let (_, _, d) = apply_rule(&f, &half_width);
        assert_eq!(d, 1);
    }
}
