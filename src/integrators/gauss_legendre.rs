//! Fixed-order Gauss-Legendre quadrature for functions of one variable.

use super::{evaluate_batch, make_workers, send, Domain, IntegrationResult, Integrator};
use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::Integrand;
use crate::IntegratorSettings;
use color_eyre::Report;
use std::f64::consts::PI;

/// Nodes and weights of the `n`-point rule on `[-1, 1]`.
pub fn nodes_and_weights(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.; n];
    let mut weights = vec![0.; n];
    for i in 0..(n + 1) / 2 {
        // Newton iterations from the Tricomi estimate of the root
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 0.;
        for _ in 0..100 {
            let (p, d) = legendre(n, x);
            dp = d;
            let dx = p / d;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let w = 2. / ((1. - x * x) * dp * dp);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

/// `P_n(x)` and its derivative.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.;
    let mut p1 = x;
    if n == 0 {
        return (1., 0.);
    }
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2. * k - 1.) * x * p1 - (k - 1.) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let n = n as f64;
    (p1, n * (x * p1 - p0) / (x * x - 1.))
}

pub struct GaussLegendreIntegrator {
    order: usize,
    n_cores: usize,
    max_weight: Option<f64>,
    status_update_sender: StatusUpdateSender,
}

impl GaussLegendreIntegrator {
    pub fn new(
        settings: &IntegratorSettings,
        status_update_sender: StatusUpdateSender,
    ) -> GaussLegendreIntegrator {
        GaussLegendreIntegrator {
            order: settings.quadrature_order.max(2),
            n_cores: settings.n_cores,
            max_weight: None,
            status_update_sender,
        }
    }

    fn rule(
        &self,
        integrand: &mut dyn Integrand,
        workers: &mut [Box<dyn Integrand>],
        domain: &Domain,
        n: usize,
    ) -> (f64, f64) {
        let (nodes, weights) = nodes_and_weights(n);
        let points: Vec<f64> = nodes.iter().map(|x| 0.5 * (x + 1.)).collect();
        let mut f = vec![0.; n];
        evaluate_batch(integrand, workers, domain, &points, &mut f);
        let value = 0.5 * f.iter().zip(&weights).map(|(f, w)| f * w).sum::<f64>();
        let max = f.iter().cloned().fold(0., f64::max);
        (value, max)
    }
}

impl Integrator for GaussLegendreIntegrator {
    fn name(&self) -> &str {
        "gauss_legendre"
    }

    fn one_dimensional(&self) -> bool {
        true
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report> {
        let mut workers = make_workers(integrand, self.n_cores);
        let (value, max) = self.rule(integrand, &mut workers, domain, self.order);
        // the half-order rule estimates the error
        let (coarse, _) = self.rule(integrand, &mut workers, domain, self.order / 2);
        let error = (value - coarse).abs();
        self.max_weight = Some(max);

        send(
            &self.status_update_sender,
            StatusUpdate::NewPoint(1, value, error, 0., false),
        );

        Ok(IntegrationResult {
            integrator: self.name().to_owned(),
            value,
            error,
            chi_sq: 0.,
            n_evals: self.order + self.order / 2,
            n_iterations: 1,
            converged: error.is_finite(),
            max_weight: max,
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
    fn rule_is_exact_for_polynomials() {
        let (x, w) = nodes_and_weights(5);
        assert!((w.iter().sum::<f64>() - 2.).abs() < 1e-13);
        // degree 2n - 1 = 9
        let i: f64 = x.iter().zip(&w).map(|(x, w)| w * x.powi(8)).sum();
        assert!((i - 2. / 9.).abs() < 1e-13);
        assert!(x.windows(2).all(|p| p[0] < p[1]));
    }
}
