use crate::event::Event;
use crate::process::Process;
use rand::rngs::StdRng;
use serde::Serialize;

/// Counters collected while an integrand is sampled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrandStatistics {
    pub total_samples: usize,
    pub regular_point_count: usize,
    /// Points outside the physical region or failing the cuts.
    pub rejected_point_count: usize,
    pub nan_point_count: usize,
    pub running_max: f64,
    pub running_max_coordinate: Vec<f64>,
}

impl IntegrandStatistics {
    pub fn new(n_dims: usize) -> IntegrandStatistics {
        IntegrandStatistics {
            running_max_coordinate: vec![0.; n_dims],
            ..IntegrandStatistics::default()
        }
    }

    /// Record one evaluation of `f` at `x`.
    pub fn add(&mut self, x: &[f64], f: f64) {
        self.total_samples += 1;
        if !f.is_finite() {
            self.nan_point_count += 1;
        } else if f <= 0. {
            self.rejected_point_count += 1;
        } else {
            self.regular_point_count += 1;
            if f > self.running_max {
                self.running_max = f;
                self.running_max_coordinate.clear();
                self.running_max_coordinate.extend_from_slice(x);
            }
        }
    }

    /// Add the counters of `other` to these ones and reset `other`.
    pub fn merge(&mut self, other: &mut IntegrandStatistics) {
        self.total_samples += other.total_samples;
        self.regular_point_count += other.regular_point_count;
        self.rejected_point_count += other.rejected_point_count;
        self.nan_point_count += other.nan_point_count;

        if self.running_max < other.running_max {
            self.running_max = other.running_max;
            self.running_max_coordinate.clear();
            self.running_max_coordinate
                .extend_from_slice(&other.running_max_coordinate);
        }

        other.total_samples = 0;
        other.regular_point_count = 0;
        other.rejected_point_count = 0;
        other.nan_point_count = 0;
    }

    /// Fraction of the samples with a non-zero weight.
    pub fn efficiency(&self) -> f64 {
        if self.total_samples == 0 {
            0.
        } else {
            self.regular_point_count as f64 / self.total_samples as f64
        }
    }
}

/// A scalar function over a hypercube.
pub trait Integrand: Send {
    fn size(&self) -> usize;

    fn eval(&mut self, x: &[f64]) -> f64;

    fn has_process(&self) -> bool {
        false
    }

    fn process(&self) -> Option<&dyn Process> {
        None
    }

    /// An independent copy for parallel evaluation, if the integrand supports it.
    fn try_clone(&self) -> Option<Box<dyn Integrand>> {
        None
    }

    fn statistics(&self) -> Option<&IntegrandStatistics> {
        None
    }

    fn statistics_mut(&mut self) -> Option<&mut IntegrandStatistics> {
        None
    }

    /// Event of the last evaluated point, for integrands backed by a process.
    fn event(&self, rng: &mut StdRng) -> Option<Event> {
        self.process().and_then(|p| p.event(rng))
    }
}

/// Adapter turning a closure into an [`Integrand`].
pub struct FunctionIntegrand<F> {
    ndim: usize,
    f: F,
}

impl<F: FnMut(&[f64]) -> f64 + Send> FunctionIntegrand<F> {
    pub fn new(ndim: usize, f: F) -> FunctionIntegrand<F> {
        FunctionIntegrand { ndim, f }
    }
}

impl<F: FnMut(&[f64]) -> f64 + Send> Integrand for FunctionIntegrand<F> {
    fn size(&self) -> usize {
        self.ndim
    }

    fn eval(&mut self, x: &[f64]) -> f64 {
        (self.f)(x)
    }
}

/// Integrand of a physics process. Unphysical points and invalid weights
/// evaluate to zero and are counted.
#[derive(Clone)]
pub struct ProcessIntegrand {
    process: Box<dyn Process>,
    statistics: IntegrandStatistics,
}

impl ProcessIntegrand {
    pub fn new(process: Box<dyn Process>) -> ProcessIntegrand {
        let n_dims = process.ndim();
        ProcessIntegrand {
            process,
            statistics: IntegrandStatistics::new(n_dims),
        }
    }
}

impl Integrand for ProcessIntegrand {
    fn size(&self) -> usize {
        self.process.ndim()
    }

    fn eval(&mut self, x: &[f64]) -> f64 {
        let w = self.process.weight(x);
        self.statistics.add(x, w);
        if w.is_finite() && w > 0. {
            w
        } else {
            0.
        }
    }

    fn has_process(&self) -> bool {
        true
    }

    fn process(&self) -> Option<&dyn Process> {
        Some(self.process.as_ref())
    }

    fn try_clone(&self) -> Option<Box<dyn Integrand>> {
        let mut c = self.clone();
        c.statistics = IntegrandStatistics::new(self.size());
        Some(Box::new(c))
    }

    fn statistics(&self) -> Option<&IntegrandStatistics> {
        Some(&self.statistics)
    }

    fn statistics_mut(&mut self) -> Option<&mut IntegrandStatistics> {
        Some(&mut self.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_merge_resets_the_source() {
        let mut a = IntegrandStatistics::new(2);
        let mut b = IntegrandStatistics::new(2);
        a.add(&[0.1, 0.2], 1.);
        b.add(&[0.3, 0.4], 3.);
        b.add(&[0.5, 0.6], f64::NAN);
        b.add(&[0.5, 0.6], 0.);

        a.merge(&mut b);
        assert_eq!(a.total_samples, 4);
        assert_eq!(a.nan_point_count, 1);
        assert_eq!(a.rejected_point_count, 1);
        assert_eq!(a.running_max, 3.);
        assert_eq!(a.running_max_coordinate, vec![0.3, 0.4]);
        assert_eq!(b.total_samples, 0);
        assert!((a.efficiency() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn closure_integrand() {
        let mut calls = 0;
        let mut f = FunctionIntegrand::new(2, |x: &[f64]| {
            calls += 1;
            x[0] * x[1]
        });
        assert_eq!(f.size(), 2);
        assert_eq!(f.eval(&[2., 3.]), 6.);
        assert!(!f.has_process());
        assert!(f.try_clone().is_none());
        drop(f);
        assert_eq!(calls, 1);
    }
}
