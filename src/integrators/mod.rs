//! Integration backends behind a common [`Integrator`] interface.
//!
//! Every backend works on the unit hypercube; a [`Domain`] rescales the
//! points to the integration limits and multiplies the integrand by the
//! volume.

pub mod cubature;
pub mod gauss_legendre;
pub mod miser;
pub mod plain;
pub mod vegas;

use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::{FunctionIntegrand, Integrand};
use crate::limits::Limits;
use crate::ConfigurationError;
use color_eyre::Report;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationResult {
    pub integrator: String,
    pub value: f64,
    pub error: f64,
    /// `χ²` per degree of freedom of the combined iterations, zero for deterministic rules.
    pub chi_sq: f64,
    pub n_evals: usize,
    pub n_iterations: usize,
    pub converged: bool,
    pub max_weight: f64,
}

/// Integration region, an empty set of limits being the unit hypercube.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    ndim: usize,
    limits: Vec<Limits>,
    volume: f64,
}

impl Domain {
    pub fn unit(ndim: usize) -> Domain {
        Domain {
            ndim,
            limits: vec![],
            volume: 1.,
        }
    }

    /// Check the limits against the dimension of the integrand.
    pub fn new(ndim: usize, limits: &[Limits]) -> Result<Domain, Report> {
        if ndim == 0 {
            return Err(ConfigurationError::ZeroDimension.into());
        }
        if limits.is_empty() {
            return Ok(Domain::unit(ndim));
        }
        if limits.len() != ndim {
            return Err(ConfigurationError::DimensionMismatch {
                expected: ndim,
                found: limits.len(),
            }
            .into());
        }
        let mut volume = 1.;
        for (i, l) in limits.iter().enumerate() {
            match l.range() {
                Some(r) if r.is_finite() => volume *= r,
                _ => return Err(ConfigurationError::UnboundedLimits(i).into()),
            }
        }
        Ok(Domain {
            ndim,
            limits: limits.to_vec(),
            volume,
        })
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_unit(&self) -> bool {
        self.limits.is_empty()
    }

    /// Map a point of the unit hypercube into the domain.
    pub fn map(&self, u: &[f64], x: &mut [f64]) {
        if self.limits.is_empty() {
            x.copy_from_slice(u);
        } else {
            for ((xi, ui), l) in x.iter_mut().zip(u).zip(&self.limits) {
                *xi = l.x(*ui).unwrap_or(*ui);
            }
        }
    }

    /// Integrand value at the unit-hypercube point `u`, scaled by the volume.
    pub fn eval(&self, integrand: &mut dyn Integrand, u: &[f64], buffer: &mut Vec<f64>) -> f64 {
        buffer.resize(self.ndim, 0.);
        self.map(u, buffer);
        integrand.eval(buffer) * self.volume
    }
}

/// A numerical integration algorithm. The backend state (grid, running
/// maximum) belongs to the last call to [`Integrator::integrate`].
pub trait Integrator: Send {
    fn name(&self) -> &str;

    /// Only integrates functions of one variable.
    fn one_dimensional(&self) -> bool {
        false
    }

    fn min_dimension(&self) -> usize {
        1
    }

    /// Integrate over `limits`, or over the unit hypercube if `limits` is empty.
    fn integrate(
        &mut self,
        integrand: &mut dyn Integrand,
        limits: &[Limits],
    ) -> Result<IntegrationResult, Report> {
        let ndim = integrand.size();
        let domain = Domain::new(ndim, limits)?;
        if self.one_dimensional() && ndim != 1 {
            return Err(ConfigurationError::OneDimensionalOnly {
                integrator: self.name().to_owned(),
                dimension: ndim,
            }
            .into());
        }
        if ndim < self.min_dimension() {
            return Err(ConfigurationError::TooFewDimensions {
                integrator: self.name().to_owned(),
                minimum: self.min_dimension(),
                dimension: ndim,
            }
            .into());
        }

        self.reset();
        self.integrate_domain(integrand, &domain)
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report>;

    fn integrate_1d(
        &mut self,
        f: &mut (dyn FnMut(f64) -> f64 + Send),
        limits: Limits,
    ) -> Result<IntegrationResult, Report> {
        let mut integrand = FunctionIntegrand::new(1, |x: &[f64]| f(x[0]));
        self.integrate(&mut integrand, &[limits])
    }

    fn integrate_nd(
        &mut self,
        f: &mut (dyn FnMut(&[f64]) -> f64 + Send),
        ndim: usize,
        limits: &[Limits],
    ) -> Result<IntegrationResult, Report> {
        let mut integrand = FunctionIntegrand::new(ndim, f);
        self.integrate(&mut integrand, limits)
    }

    /// Weight of the unit-hypercube point `u` as sampled for event generation.
    fn eval(&mut self, integrand: &mut dyn Integrand, u: &[f64]) -> f64 {
        integrand.eval(u)
    }

    /// Largest weight seen by the last integration, on the scale of [`Integrator::eval`].
    fn max_weight(&self) -> Option<f64>;

    fn reset(&mut self);
}

/// Running mean and error of a Monte Carlo estimate, combined over
/// iterations with inverse-variance weights.
#[derive(Debug, Clone, Default)]
pub struct AverageAndErrorAccumulator {
    sum: f64,
    sum_sq: f64,
    weight_sum: f64,
    avg_sum: f64,
    chi_sum: f64,
    pub avg: f64,
    pub err: f64,
    pub chi_sq: f64,
    pub num_samples: usize,
    pub total_samples: usize,
    pub cur_iter: usize,
    /// Every iteration so far had an exactly vanishing variance.
    pub zero_variance: bool,
}

impl AverageAndErrorAccumulator {
    pub fn new() -> AverageAndErrorAccumulator {
        AverageAndErrorAccumulator {
            zero_variance: true,
            ..AverageAndErrorAccumulator::default()
        }
    }

    pub fn add_sample(&mut self, f: f64) {
        self.sum += f;
        self.sum_sq += f * f;
        self.num_samples += 1;
    }

    /// Close the current iteration and fold it into the combined estimate.
    pub fn update_iter(&mut self) {
        if self.num_samples == 0 {
            return;
        }
        let n = self.num_samples as f64;
        let mean = self.sum / n;
        let var = if self.num_samples > 1 {
            ((self.sum_sq / n - mean * mean) / (n - 1.)).max(0.)
        } else {
            0.
        };

        self.cur_iter += 1;
        self.total_samples += self.num_samples;
        self.sum = 0.;
        self.sum_sq = 0.;
        self.num_samples = 0;

        if var == 0. {
            if self.zero_variance {
                self.avg = mean;
                self.err = 0.;
                self.chi_sq = 0.;
            }
            return;
        }

        if self.zero_variance {
            // drop the exact iterations from the weighted combination
            self.zero_variance = false;
            self.weight_sum = 0.;
            self.avg_sum = 0.;
            self.chi_sum = 0.;
        }

        let w = 1. / var;
        self.weight_sum += w;
        self.avg_sum += w * mean;
        self.chi_sum += w * mean * mean;
        self.avg = self.avg_sum / self.weight_sum;
        self.err = (1. / self.weight_sum).sqrt();
        self.chi_sq = (self.chi_sum - self.avg_sum * self.avg_sum / self.weight_sum).max(0.);
    }

    /// `χ²` per degree of freedom, zero for a single iteration.
    pub fn chi_sq_per_dof(&self) -> f64 {
        if self.cur_iter > 1 {
            self.chi_sq / (self.cur_iter - 1) as f64
        } else {
            0.
        }
    }
}

/// Per-thread copies of an integrand, when it can be cloned and more than
/// one core is requested.
pub fn make_workers(integrand: &dyn Integrand, n_cores: usize) -> Vec<Box<dyn Integrand>> {
    if n_cores <= 1 {
        return vec![];
    }
    (0..n_cores).map_while(|_| integrand.try_clone()).collect()
}

/// Evaluate `f` at the unit-hypercube points stored contiguously in `points`.
/// The work is split over the workers when there are any; their statistics
/// are merged back into `integrand`.
pub fn evaluate_batch(
    integrand: &mut dyn Integrand,
    workers: &mut [Box<dyn Integrand>],
    domain: &Domain,
    points: &[f64],
    f: &mut [f64],
) {
    let ndim = domain.ndim();
    let n = f.len();
    if n == 0 {
        return;
    }

    if workers.is_empty() {
        let mut buffer = vec![0.; ndim];
        for (fi, u) in f.iter_mut().zip(points.chunks(ndim)) {
            *fi = domain.eval(integrand, u, &mut buffer);
        }
        return;
    }

    // the number of points per core for all cores but the last, which may have fewer
    let n_per_core = (n - 1) / workers.len() + 1;
    workers
        .par_iter_mut()
        .zip(f.par_chunks_mut(n_per_core))
        .zip(points.par_chunks(n_per_core * ndim))
        .for_each(|((w, ff), xi)| {
            let mut buffer = vec![0.; ndim];
            for (ffi, u) in ff.iter_mut().zip(xi.chunks(ndim)) {
                *ffi = domain.eval(w.as_mut(), u, &mut buffer);
            }
        });

    if let Some(master) = integrand.statistics_mut() {
        for w in workers.iter_mut() {
            if let Some(s) = w.statistics_mut() {
                master.merge(s);
            }
        }
    }
}

/// Relative or absolute precision target, `None` when neither is set.
pub fn precision_target(eps_rel: f64, eps_abs: f64, value: f64) -> Option<f64> {
    if eps_rel <= 0. && eps_abs <= 0. {
        None
    } else {
        Some(eps_abs.max(eps_rel * value.abs()))
    }
}

pub(crate) fn send(sender: &StatusUpdateSender, update: StatusUpdate) {
    // the dashboard may already be gone at the end of a run
    let _ = sender.send(update);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_variance_combination() {
        let mut acc = AverageAndErrorAccumulator::new();
        for &f in &[1., 3.] {
            acc.add_sample(f);
        }
        acc.update_iter();
        assert_eq!(acc.avg, 2.);
        // variance of the mean: ((1+9)/2 - 4) / 1 = 1
        assert!((acc.err - 1.).abs() < 1e-12);

        for &f in &[2., 6.] {
            acc.add_sample(f);
        }
        acc.update_iter();
        // weights 1 and 1/4
        assert!((acc.avg - (2. + 4. * 0.25) / 1.25).abs() < 1e-12);
        assert!(acc.chi_sq > 0.);
        assert_eq!(acc.cur_iter, 2);
        assert_eq!(acc.total_samples, 4);
    }

    #[test]
    fn constant_samples_have_zero_variance() {
        let mut acc = AverageAndErrorAccumulator::new();
        for _ in 0..10 {
            acc.add_sample(0.5);
        }
        acc.update_iter();
        assert!(acc.zero_variance);
        assert_eq!(acc.avg, 0.5);
        assert_eq!(acc.err, 0.);
    }

    #[test]
    fn domain_checks() {
        assert!(Domain::new(2, &[]).unwrap().is_unit());
        let err = Domain::new(2, &[Limits::unit()]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        let err = Domain::new(2, &[Limits::unit(), Limits::with_min(0.)]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnboundedLimits(1))
        );

        let d = Domain::new(2, &[Limits::new(0., 2.).unwrap(), Limits::new(-1., 1.).unwrap()])
            .unwrap();
        assert_eq!(d.volume(), 4.);
        let mut x = [0.; 2];
        d.map(&[0.5, 0.25], &mut x);
        assert_eq!(x, [1., -0.5]);
    }
}
