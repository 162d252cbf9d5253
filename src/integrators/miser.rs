//! Recursive stratified sampling (Press and Farrar, Computers in Physics 4 (1990) 190).
//!
//! A region receiving enough calls is bisected along the dimension whose
//! halves have the smallest combined spread, and the remaining calls are
//! shared between the halves in proportion to their spread.

use super::{
    evaluate_batch, make_workers, send, AverageAndErrorAccumulator, Domain, IntegrationResult,
    Integrator,
};
use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::Integrand;
use crate::{ConfigurationError, IntegratorSettings};
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Estimate of one region: integral, its variance and the number of calls spent.
#[derive(Debug, Clone, Copy, Default)]
struct Estimate {
    integral: f64,
    variance: f64,
    n_evals: usize,
}

impl Estimate {
    fn combine(self, other: Estimate) -> Estimate {
        Estimate {
            integral: self.integral + other.integral,
            variance: self.variance + other.variance,
            n_evals: self.n_evals + other.n_evals,
        }
    }
}

/// Sampling state shared by the recursion.
struct Sampler<'a> {
    integrand: &'a mut dyn Integrand,
    workers: Vec<Box<dyn Integrand>>,
    domain: &'a Domain,
    rng: StdRng,
    max_weight: f64,
}

impl<'a> Sampler<'a> {
    /// Uniform points in the box `[lo, hi]` and their values.
    fn sample(&mut self, lo: &[f64], hi: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
        let ndim = lo.len();
        let mut points = Vec::with_capacity(n * ndim);
        for _ in 0..n {
            for (l, h) in lo.iter().zip(hi) {
                points.push(l + self.rng.gen::<f64>() * (h - l));
            }
        }
        let mut f = vec![0.; n];
        evaluate_batch(
            self.integrand,
            &mut self.workers,
            self.domain,
            &points,
            &mut f,
        );
        self.max_weight = f.iter().fold(self.max_weight, |m, &v| m.max(v));
        (points, f)
    }
}

pub struct MiserIntegrator {
    settings: IntegratorSettings,
    max_weight: Option<f64>,
    status_update_sender: StatusUpdateSender,
}

impl MiserIntegrator {
    pub fn new(settings: &IntegratorSettings, status_update_sender: StatusUpdateSender) -> MiserIntegrator {
        MiserIntegrator {
            settings: settings.clone(),
            max_weight: None,
            status_update_sender,
        }
    }

    fn min_calls(&self, ndim: usize) -> usize {
        self.settings.min_calls.unwrap_or(16 * ndim).max(2)
    }

    fn min_calls_per_bisection(&self, ndim: usize) -> usize {
        self.settings
            .min_calls_per_bisection
            .unwrap_or(32 * self.min_calls(ndim))
    }

    fn plain(sampler: &mut Sampler, lo: &[f64], hi: &[f64], calls: usize) -> Estimate {
        let volume: f64 = lo.iter().zip(hi).map(|(l, h)| h - l).product();
        let (_, f) = sampler.sample(lo, hi, calls);

        let mut acc = AverageAndErrorAccumulator::new();
        f.iter().for_each(|&v| acc.add_sample(v));
        acc.update_iter();
        Estimate {
            integral: volume * acc.avg,
            variance: (volume * acc.err).powi(2),
            n_evals: calls,
        }
    }

    fn miser(&self, sampler: &mut Sampler, lo: &[f64], hi: &[f64], calls: usize) -> Estimate {
        let ndim = lo.len();
        let min_calls = self.min_calls(ndim);
        if calls < self.min_calls_per_bisection(ndim) {
            return MiserIntegrator::plain(sampler, lo, hi, calls.max(2));
        }

        let n_est = ((calls as f64 * self.settings.estimate_fraction) as usize).max(min_calls);
        let (points, f) = sampler.sample(lo, hi, n_est);

        // spread of each half for every bisection candidate
        let beta = 2. / (1. + self.settings.miser_alpha);
        let mut best: Option<(usize, f64, f64, f64)> = None;
        for d in 0..ndim {
            let mid = 0.5 * (lo[d] + hi[d]);
            let mut left = AverageAndErrorAccumulator::new();
            let mut right = AverageAndErrorAccumulator::new();
            for (x, &v) in points.chunks(ndim).zip(&f) {
                if x[d] <= mid {
                    left.add_sample(v);
                } else {
                    right.add_sample(v);
                }
            }
            if left.num_samples < 2 || right.num_samples < 2 {
                continue;
            }
            let sigma_l = spread(&left);
            let sigma_r = spread(&right);
            let score = sigma_l.powf(beta) + sigma_r.powf(beta);
            if best.map_or(true, |(_, s, _, _)| score < s) {
                best = Some((d, score, sigma_l, sigma_r));
            }
        }

        let (dim, sigma_l, sigma_r) = match best {
            Some((d, _, l, r)) => (d, l, r),
            None => (sampler.rng.gen_range(0..ndim), 0., 0.),
        };

        let remaining = calls.saturating_sub(n_est);
        let (w_l, w_r) = (sigma_l.powf(beta), sigma_r.powf(beta));
        let fraction_l = if w_l + w_r > 0. {
            w_l / (w_l + w_r)
        } else {
            0.5
        };
        let calls_l = ((remaining as f64 * fraction_l) as usize)
            .max(min_calls)
            .min(remaining.saturating_sub(min_calls).max(min_calls));
        let calls_r = remaining.saturating_sub(calls_l).max(min_calls);

        let mid = 0.5 * (lo[dim] + hi[dim]);
        let mut hi_l = hi.to_vec();
        hi_l[dim] = mid;
        let mut lo_r = lo.to_vec();
        lo_r[dim] = mid;

        let left = self.miser(sampler, lo, &hi_l, calls_l);
        let right = self.miser(sampler, &lo_r, hi, calls_r);
        let mut total = left.combine(right);
        total.n_evals += n_est;
        total
    }
}

/// Standard deviation of the samples of one half.
fn spread(acc: &AverageAndErrorAccumulator) -> f64 {
    let mut a = acc.clone();
    let n = a.num_samples as f64;
    a.update_iter();
    // the error of the mean times the square root of the sample size
    a.err * n.sqrt()
}

impl Integrator for MiserIntegrator {
    fn name(&self) -> &str {
        "miser"
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report> {
        let ndim = domain.ndim();
        let (min_calls, per_bisection) = (self.min_calls(ndim), self.min_calls_per_bisection(ndim));
        // both halves of a bisection must fall below the threshold eventually
        if per_bisection < 2 * min_calls {
            return Err(ConfigurationError::InvalidSetting(format!(
                "min_calls_per_bisection ({}) is smaller than twice min_calls ({})",
                per_bisection, min_calls
            ))
            .into());
        }
        let workers = make_workers(integrand, self.settings.n_cores);
        let mut sampler = Sampler {
            integrand,
            workers,
            domain,
            rng: StdRng::seed_from_u64(self.settings.seed),
            max_weight: 0.,
        };

        let lo = vec![0.; ndim];
        let hi = vec![1.; ndim];
        let estimate = self.miser(&mut sampler, &lo, &hi, self.settings.n_start.max(2));
        let error = estimate.variance.sqrt();
        self.max_weight = Some(sampler.max_weight);

        send(
            &self.status_update_sender,
            StatusUpdate::NewPoint(1, estimate.integral, error, 0., false),
        );
        if let Some(s) = sampler.integrand.statistics() {
            send(&self.status_update_sender, StatusUpdate::Statistics(s.clone()));
        }

        Ok(IntegrationResult {
            integrator: self.name().to_owned(),
            value: estimate.integral,
            error,
            chi_sq: 0.,
            n_evals: estimate.n_evals,
            n_iterations: 1,
            converged: error.is_finite(),
            max_weight: sampler.max_weight,
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
    use crate::dashboard::Dashboard;
    use crate::integrand::FunctionIntegrand;

    #[test]
    fn peaked_integrand() {
        let settings = IntegratorSettings {
            n_start: 50000,
            ..IntegratorSettings::default()
        };
        let mut miser = MiserIntegrator::new(&settings, Dashboard::new(false).status_update_sender);
        // integrates to (erf(5) √π / 10)² ≈ 0.0314
        let mut f = FunctionIntegrand::new(2, |x: &[f64]| {
            (-100. * ((x[0] - 0.5).powi(2) + (x[1] - 0.5).powi(2))).exp()
        });
        let res = miser.integrate(&mut f, &[]).unwrap();
        let exact = std::f64::consts::PI / 100.;
        assert!((res.value - exact).abs() < 5. * res.error + 1e-3);
        assert!(res.error < 1e-3);
        assert!(res.n_evals >= 50000);
        assert!(miser.max_weight().unwrap() <= 1.);
    }

    #[test]
    fn small_bisection_threshold_is_rejected() {
        let settings = IntegratorSettings {
            min_calls_per_bisection: Some(10),
            ..IntegratorSettings::default()
        };
        let mut miser = MiserIntegrator::new(&settings, Dashboard::new(false).status_update_sender);
        let mut f = FunctionIntegrand::new(2, |x: &[f64]| x[0] * x[1]);
        let err = miser.integrate(&mut f, &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::InvalidSetting(_))
        ));
    }

    #[test]
    fn smallest_valid_bisection_threshold_terminates() {
        let settings = IntegratorSettings {
            n_start: 2000,
            min_calls: Some(4),
            min_calls_per_bisection: Some(8),
            estimate_fraction: 0.5,
            ..IntegratorSettings::default()
        };
        let mut miser = MiserIntegrator::new(&settings, Dashboard::new(false).status_update_sender);
        let mut f = FunctionIntegrand::new(2, |x: &[f64]| 4. * x[0] * x[1]);
        let res = miser.integrate(&mut f, &[]).unwrap();
        assert!((res.value - 1.).abs() < 5. * res.error + 1e-2);
        assert!(res.n_evals >= 2000);
    }
}
