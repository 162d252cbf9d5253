use super::{
    evaluate_batch, make_workers, send, AverageAndErrorAccumulator, Domain, IntegrationResult,
    Integrator,
};
use crate::dashboard::{StatusUpdate, StatusUpdateSender};
use crate::integrand::Integrand;
use crate::IntegratorSettings;
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform sampling of the hypercube.
pub struct PlainIntegrator {
    n_calls: usize,
    batch_size: usize,
    seed: u64,
    n_cores: usize,
    max_weight: Option<f64>,
    status_update_sender: StatusUpdateSender,
}

impl PlainIntegrator {
    pub fn new(settings: &IntegratorSettings, status_update_sender: StatusUpdateSender) -> PlainIntegrator {
        PlainIntegrator {
            n_calls: settings.n_start,
            batch_size: 10000,
            seed: settings.seed,
            n_cores: settings.n_cores,
            max_weight: None,
            status_update_sender,
        }
    }
}

impl Integrator for PlainIntegrator {
    fn name(&self) -> &str {
        "plain"
    }

    fn integrate_domain(
        &mut self,
        integrand: &mut dyn Integrand,
        domain: &Domain,
    ) -> Result<IntegrationResult, Report> {
        let ndim = domain.ndim();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut workers = make_workers(integrand, self.n_cores);
        let mut integral = AverageAndErrorAccumulator::new();
        let mut max_weight: f64 = 0.;

        let mut points = vec![];
        let mut f = vec![];
        let mut remaining = self.n_calls;
        while remaining > 0 {
            let n = remaining.min(self.batch_size);
            points.clear();
            points.extend((0..n * ndim).map(|_| rng.gen::<f64>()));
            f.resize(n, 0.);

            evaluate_batch(integrand, &mut workers, domain, &points, &mut f);
            for &fi in &f {
                integral.add_sample(fi);
                max_weight = max_weight.max(fi);
            }
            remaining -= n;
        }
        integral.update_iter();
        self.max_weight = Some(max_weight);

        send(
            &self.status_update_sender,
            StatusUpdate::NewPoint(1, integral.avg, integral.err, 0., false),
        );
        if let Some(s) = integrand.statistics() {
            send(&self.status_update_sender, StatusUpdate::Statistics(s.clone()));
        }

        Ok(IntegrationResult {
            integrator: self.name().to_owned(),
            value: integral.avg,
            error: integral.err,
            chi_sq: 0.,
            n_evals: integral.total_samples,
            n_iterations: 1,
            converged: integral.err.is_finite(),
            max_weight,
        })
    }

    fn max_weight(&self) -> Option<f64> {
        self.max_weight
    }

    fn reset(&mut self) {
        self.max_weight = None;
    }
}
