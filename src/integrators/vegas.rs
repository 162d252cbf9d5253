//! Adaptive importance sampling (Lepage, J. Comput. Phys. 27 (1978) 192).
//!
//! Each dimension carries its own grid of bins of equal probability. After
//! every iteration the bin edges move towards the regions where `(f w)²`
//! is large, damped by the learning rate.

use super::{
    evaluate_batch, make_workers, precision_target, send, AverageAndErrorAccumulator, Domain,
    IntegrationResult, Integrator,
};
use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::Integrand;
use crate::IntegratorSettings;
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, PartialEq)]
pub struct VegasGrid {
    n_bins: usize,
    /// Bin edges per dimension, from 0 to 1.
    edges: Vec<Vec<f64>>,
    /// Accumulated `(f w)²` per bin.
    training: Vec<Vec<f64>>,
}

impl VegasGrid {
    pub fn new(ndim: usize, n_bins: usize) -> VegasGrid {
        let n_bins = n_bins.max(1);
        let uniform: Vec<f64> = (0..=n_bins).map(|i| i as f64 / n_bins as f64).collect();
        VegasGrid {
            n_bins,
            edges: vec![uniform; ndim],
            training: vec![vec![0.; n_bins]; ndim],
        }
    }

    pub fn ndim(&self) -> usize {
        self.edges.len()
    }

    /// Map the uniform point `y` through the grid into `x`, recording the
    /// bin of each coordinate. Returns the Jacobian of the map.
    pub fn map(&self, y: &[f64], x: &mut [f64], bins: &mut [usize]) -> f64 {
        let n = self.n_bins as f64;
        let mut jacobian = 1.;
        for (d, edges) in self.edges.iter().enumerate() {
            let z = y[d] * n;
            let k = (z as usize).min(self.n_bins - 1);
            let width = edges[k + 1] - edges[k];
            x[d] = edges[k] + (z - k as f64) * width;
            bins[d] = k;
            jacobian *= n * width;
        }
        jacobian
    }

    pub fn add_training_sample(&mut self, bins: &[usize], fw: f64) {
        if !fw.is_finite() {
            return;
        }
        for (t, &b) in self.training.iter_mut().zip(bins) {
            t[b] += fw * fw;
        }
    }

    /// Move the bin edges according to the training samples and clear them.
    pub fn update(&mut self, alpha: f64) {
        let n_bins = self.n_bins;
        if n_bins < 2 {
            return;
        }

        for (edges, d) in self.edges.iter_mut().zip(self.training.iter_mut()) {
            // smooth the accumulated values with the neighbouring bins
            let old = d.clone();
            d[0] = 0.5 * (old[0] + old[1]);
            for i in 1..n_bins - 1 {
                d[i] = (old[i - 1] + old[i] + old[i + 1]) / 3.;
            }
            d[n_bins - 1] = 0.5 * (old[n_bins - 2] + old[n_bins - 1]);

            let total: f64 = d.iter().sum();
            if !(total > 0.) {
                d.iter_mut().for_each(|v| *v = 0.);
                continue;
            }

            let weights: Vec<f64> = d
                .iter()
                .map(|&v| {
                    if v > 0. {
                        let r = total / v;
                        ((r - 1.) / r / r.ln()).powf(alpha)
                    } else {
                        0.
                    }
                })
                .collect();
            let total_weight: f64 = weights.iter().sum();
            if !(total_weight > 0.) || !total_weight.is_finite() {
                d.iter_mut().for_each(|v| *v = 0.);
                continue;
            }
            let per_bin = total_weight / n_bins as f64;

            let mut new_edges = Vec::with_capacity(n_bins + 1);
            new_edges.push(0.);
            let mut accumulated = 0.;
            let mut x_new = 0.;
            for (k, &w) in weights.iter().enumerate() {
                accumulated += w;
                let x_old = x_new;
                x_new = edges[k + 1];
                while accumulated > per_bin && new_edges.len() < n_bins {
                    accumulated -= per_bin;
                    new_edges.push(x_new - (x_new - x_old) * accumulated / w);
                }
            }
            while new_edges.len() < n_bins {
                new_edges.push(1.);
            }
            new_edges.push(1.);
            *edges = new_edges;

            d.iter_mut().for_each(|v| *v = 0.);
        }
    }
}

pub struct VegasIntegrator {
    settings: IntegratorSettings,
    grid: VegasGrid,
    /// Largest `f w` and `f` seen while integrating.
    max_weight_grid: Option<f64>,
    max_weight_raw: Option<f64>,
    bins: Vec<usize>,
    status_update_sender: StatusUpdateSender,
}

impl VegasIntegrator {
    pub fn new(settings: &IntegratorSettings, status_update_sender: StatusUpdateSender) -> VegasIntegrator {
        VegasIntegrator {
            settings: settings.clone(),
            grid: VegasGrid::new(0, settings.n_bins),
            max_weight_grid: None,
            max_weight_raw: None,
            bins: vec![],
            status_update_sender,
        }
    }

    pub fn grid(&self) -> &VegasGrid {
        &self.grid
    }

    /// Sample `n` points through the grid and adapt it. The grid-weighted
    /// values are accumulated into `integral` when one is given.
    fn iteration(
        &mut self,
        integrand: &mut dyn Integrand,
        workers: &mut [Box<dyn Integrand>],
        domain: &Domain,
        rng: &mut StdRng,
        n: usize,
        mut integral: Option<&mut AverageAndErrorAccumulator>,
    ) {
        let ndim = domain.ndim();
        let mut y = vec![0.; ndim];
        let mut x = vec![0.; n * ndim];
        let mut bins = vec![0; n * ndim];
        let mut jacobians = vec![0.; n];
        for ((xi, bi), jac) in x
            .chunks_mut(ndim)
            .zip(bins.chunks_mut(ndim))
            .zip(jacobians.iter_mut())
        {
            y.iter_mut().for_each(|v| *v = rng.gen());
            *jac = self.grid.map(&y, xi, bi);
        }

        let mut f = vec![0.; n];
        evaluate_batch(integrand, workers, domain, &x, &mut f);

        let mut max_grid = self.max_weight_grid.unwrap_or(0.);
        let mut max_raw = self.max_weight_raw.unwrap_or(0.);
        for ((fi, jac), bi) in f.iter().zip(&jacobians).zip(bins.chunks(ndim)) {
            let fw = fi * jac;
            self.grid.add_training_sample(bi, fw);
            if let Some(acc) = integral.as_mut() {
                acc.add_sample(fw);
                max_grid = max_grid.max(fw);
                max_raw = max_raw.max(*fi);
            }
        }
        if integral.is_some() {
            self.max_weight_grid = Some(max_grid);
            self.max_weight_raw = Some(max_raw);
        }
        self.grid.update(self.settings.learning_rate);
    }
}

impl Integrator for VegasIntegrator {
    fn name(&self) -> &str {
        "vegas"
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report> {
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let mut workers = make_workers(integrand, self.settings.n_cores);
        self.grid = VegasGrid::new(domain.ndim(), self.settings.n_bins);

        // warm-up: trains the grid, the estimate is discarded
        if self.settings.warmup_points > 0 {
            let n = self.settings.warmup_points;
            self.iteration(integrand, &mut workers, domain, &mut rng, n, None);
            send(
                &self.status_update_sender,
                StatusUpdate::IntegratorUpdate(format!("VEGAS warm-up with {} points done", n)),
            );
        }

        let mut integral = AverageAndErrorAccumulator::new();
        let mut num_points = 0;
        let mut iter = 1;
        let mut converged = false;
        while num_points < self.settings.n_max {
            let cur_points = (self.settings.n_start + self.settings.n_increase * (iter - 1))
                .min(self.settings.n_max - num_points)
                .max(2);
            self.iteration(
                integrand,
                &mut workers,
                domain,
                &mut rng,
                cur_points,
                Some(&mut integral),
            );
            integral.update_iter();

            let chi_sq = integral.chi_sq_per_dof();
            send(
                &self.status_update_sender,
                StatusUpdate::NewPoint(iter, integral.avg, integral.err, chi_sq, false),
            );

            let precision_reached = match precision_target(
                self.settings.eps_rel,
                self.settings.eps_abs,
                integral.avg,
            ) {
                Some(target) => integral.err <= target,
                None => true,
            };
            // an exact estimate needs at least one non-vanishing weight
            let exact = integral.zero_variance && integral.avg != 0.;
            if exact
                || (iter >= 2
                    && (chi_sq - 1.).abs() <= self.settings.chisq_cut - 1.
                    && precision_reached)
            {
                converged = true;
                break;
            }

            iter += 1;
            num_points += cur_points;
        }

        if !converged {
            send(
                &self.status_update_sender,
                StatusUpdate::Warning(format!(
                    "VEGAS did not converge within {} points: χ²/dof = {:.2}",
                    self.settings.n_max,
                    integral.chi_sq_per_dof()
                )),
            );
        }
        if let Some(s) = integrand.statistics() {
            send(&self.status_update_sender, StatusUpdate::Statistics(s.clone()));
        }

        Ok(IntegrationResult {
            integrator: self.name().to_owned(),
            value: integral.avg,
            error: integral.err,
            chi_sq: integral.chi_sq_per_dof(),
            n_evals: integral.total_samples,
            n_iterations: integral.cur_iter,
            converged,
            max_weight: self.max_weight().unwrap_or(0.),
        })
    }

    fn eval(&mut self, integrand: &mut dyn Integrand, u: &[f64]) -> f64 {
        if !self.settings.treat || self.grid.ndim() != u.len() {
            return integrand.eval(u);
        }
        let mut x = vec![0.; u.len()];
        self.bins.resize(u.len(), 0);
        let jacobian = self.grid.map(u, &mut x, &mut self.bins);
        integrand.eval(&x) * jacobian
    }

    fn max_weight(&self) -> Option<f64> {
        if self.settings.treat {
            self.max_weight_grid
        } else {
            self.max_weight_raw
        }
    }

    fn reset(&mut self) {
        self.grid = VegasGrid::new(0, self.settings.n_bins);
        self.max_weight_grid = None;
        self.max_weight_raw = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;
    use crate::integrand::FunctionIntegrand;
    use rand::Rng;

    fn small_settings() -> IntegratorSettings {
        IntegratorSettings {
            n_start: 1000,
            n_max: 5000,
            warmup_points: 1000,
            ..IntegratorSettings::default()
        }
    }

    #[test]
    fn grid_map_is_uniform_initially() {
        let grid = VegasGrid::new(2, 10);
        let mut x = [0.; 2];
        let mut bins = [0; 2];
        let jac = grid.map(&[0.25, 0.999], &mut x, &mut bins);
        assert!((jac - 1.).abs() < 1e-12);
        assert!((x[0] - 0.25).abs() < 1e-12);
        assert_eq!(bins, [2, 9]);
    }

    #[test]
    fn grid_adapts_to_a_peak() {
        let mut grid = VegasGrid::new(1, 20);
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = [0.];
        let mut bins = [0];
        for _ in 0..5 {
            for _ in 0..5000 {
                let jac = grid.map(&[rng.gen()], &mut x, &mut bins);
                let f = (-(x[0] - 0.2f64).powi(2) / 0.001).exp();
                grid.add_training_sample(&bins, f * jac);
            }
            grid.update(1.5);
        }

        let edges = &grid.edges[0];
        assert_eq!(edges.len(), 21);
        assert!(edges.windows(2).all(|w| w[0] <= w[1]));
        // the bins around the peak shrink
        let k = edges.iter().position(|&e| e > 0.2).unwrap();
        assert!(edges[k] - edges[k - 1] < 0.05);
    }

    #[test]
    fn constant_integrand_is_exact() {
        let settings = IntegratorSettings {
            warmup_points: 0,
            ..small_settings()
        };
        let mut vegas = VegasIntegrator::new(&settings, Dashboard::new(false).status_update_sender);
        let mut f = FunctionIntegrand::new(2, |_: &[f64]| 2.);
        let res = vegas.integrate(&mut f, &[]).unwrap();
        assert!(res.converged);
        assert_eq!(res.n_iterations, 1);
        assert!((res.value - 2.).abs() < 1e-12);
    }

    #[test]
    fn vanishing_weights_do_not_converge() {
        let mut vegas = VegasIntegrator::new(&small_settings(), Dashboard::new(false).status_update_sender);
        let mut f = FunctionIntegrand::new(2, |_: &[f64]| 0.);
        let res = vegas.integrate(&mut f, &[]).unwrap();
        assert!(!res.converged);
        assert_eq!(res.value, 0.);
        assert!(res.n_iterations > 1);
    }
}
