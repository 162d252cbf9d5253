//! Conversion of weighted phase-space points into unweighted events.
//!
//! The plain strategy accepts a point with probability `w / w_max` over the
//! whole hypercube. The grid-optimised strategy splits the hypercube into
//! `bin_size^ndim` boxes, records the maximum weight of every box in a
//! preparation run and draws boxes according to their maxima. A weight
//! found above the maximum of its box starts correction cycles that
//! compensate the events the box has been missing.

use crate::integrand::Integrand;
use crate::integrators::Integrator;
use crate::{ConfigurationError, GenerationSettings, UnweightingStrategy};
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of the search for one unweighted event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Draw {
    /// Weight of the accepted point, `None` when `max_trials` was reached.
    pub weight: Option<f64>,
    pub trials: usize,
    /// Evaluations returning a vanishing weight.
    pub zero_weight: usize,
    /// New maximum weight, when the accepted point exceeded the previous one.
    pub new_max_weight: Option<f64>,
    /// The search ended on the stop flag.
    pub stopped: bool,
}

impl Draw {
    fn count(&mut self, weight: f64) {
        self.trials += 1;
        if !(weight > 0.) {
            self.zero_weight += 1;
        }
    }

    /// Whether the search may evaluate another point.
    fn proceed(&mut self, stop: &AtomicBool, max_trials: usize) -> bool {
        if stop.load(Ordering::Relaxed) {
            self.stopped = true;
        }
        !self.stopped && self.trials < max_trials
    }
}

pub trait Unweighter: Send {
    fn name(&self) -> &str;

    /// Prepare the generation, `max_weight` being the largest weight known
    /// from the integration.
    fn prepare(
        &mut self,
        integrator: &mut dyn Integrator,
        integrand: &mut dyn Integrand,
        rng: &mut StdRng,
        max_weight: Option<f64>,
    ) -> Result<(), Report>;

    fn prepared(&self) -> bool;

    /// Draw points until one is accepted, `max_trials` evaluations were
    /// spent or `stop` is raised. `stop` is read before every evaluation.
    /// The accepted point is the last one evaluated by `integrand`.
    fn next(
        &mut self,
        integrator: &mut dyn Integrator,
        integrand: &mut dyn Integrand,
        rng: &mut StdRng,
        max_trials: usize,
        stop: &AtomicBool,
    ) -> Draw;
}

pub fn build_unweighter(settings: &GenerationSettings, ndim: usize) -> Box<dyn Unweighter> {
    match settings.unweighting {
        UnweightingStrategy::Plain => Box::new(PlainUnweighter::new(ndim)),
        UnweightingStrategy::GridOptimised => Box::new(GridUnweighter::new(
            ndim,
            settings.bin_size,
            settings.num_points,
        )),
    }
}

/// Hit-or-miss against a single maximum weight.
pub struct PlainUnweighter {
    max_weight: Option<f64>,
    point: Vec<f64>,
}

impl PlainUnweighter {
    pub fn new(ndim: usize) -> PlainUnweighter {
        PlainUnweighter {
            max_weight: None,
            point: vec![0.; ndim],
        }
    }
}

impl Unweighter for PlainUnweighter {
    fn name(&self) -> &str {
        "plain"
    }

    fn prepare(
        &mut self,
        _integrator: &mut dyn Integrator,
        _integrand: &mut dyn Integrand,
        _rng: &mut StdRng,
        max_weight: Option<f64>,
    ) -> Result<(), Report> {
        match max_weight {
            Some(w) if w > 0. && w.is_finite() => {
                self.max_weight = Some(w);
                Ok(())
            }
            _ => Err(ConfigurationError::MissingMaxWeight.into()),
        }
    }

    fn prepared(&self) -> bool {
        self.max_weight.is_some()
    }

    fn next(
        &mut self,
        integrator: &mut dyn Integrator,
        integrand: &mut dyn Integrand,
        rng: &mut StdRng,
        max_trials: usize,
        stop: &AtomicBool,
    ) -> Draw {
        let mut draw = Draw::default();
        let max_weight = match self.max_weight {
            Some(w) => w,
            None => return draw,
        };

        while draw.proceed(stop, max_trials) {
            self.point.iter_mut().for_each(|x| *x = rng.gen());
            let weight = integrator.eval(integrand, &self.point);
            draw.count(weight);
            if weight > 0. && weight > rng.gen::<f64>() * max_weight {
                if weight > max_weight {
                    self.max_weight = Some(weight);
                    draw.new_max_weight = Some(weight);
                }
                draw.weight = Some(weight);
                break;
            }
        }
        draw
    }
}

/// Per-box maxima of the weight over a regular partition of the hypercube.
#[derive(Debug, Clone)]
pub struct GridParameters {
    bin_size: usize,
    ndim: usize,
    max_values: Vec<f64>,
    /// Number of times each box was selected.
    num_selected: Vec<usize>,
    global_max: f64,
    correction: f64,
    correction2: f64,
    max_old: f64,
    max_diff: f64,
    max2: f64,
}

impl GridParameters {
    pub fn new(bin_size: usize, ndim: usize) -> Result<GridParameters, Report> {
        let size = bin_size
            .checked_pow(ndim as u32)
            .filter(|&s| s > 0 && s <= 1 << 26)
            .ok_or_else(|| {
                ConfigurationError::InvalidSetting(format!(
                    "a grid of {}^{} boxes cannot be allocated",
                    bin_size, ndim
                ))
            })?;
        Ok(GridParameters {
            bin_size,
            ndim,
            max_values: vec![0.; size],
            num_selected: vec![0; size],
            global_max: 0.,
            correction: 0.,
            correction2: 0.,
            max_old: 0.,
            max_diff: 0.,
            max2: 0.,
        })
    }

    pub fn size(&self) -> usize {
        self.max_values.len()
    }

    pub fn global_max(&self) -> f64 {
        self.global_max
    }

    pub fn max_value(&self, bin: usize) -> f64 {
        self.max_values[bin]
    }

    /// Box coordinates of `bin`, each in `0..bin_size`.
    pub fn coordinates(&self, bin: usize) -> Vec<usize> {
        let mut rest = bin;
        (0..self.ndim)
            .map(|_| {
                let c = rest % self.bin_size;
                rest /= self.bin_size;
                c
            })
            .collect()
    }

    /// Uniform point inside box `bin`.
    pub fn shoot(&self, rng: &mut StdRng, bin: usize, x: &mut [f64]) {
        let inv = 1. / self.bin_size as f64;
        let mut rest = bin;
        for xi in x.iter_mut().take(self.ndim) {
            let c = rest % self.bin_size;
            rest /= self.bin_size;
            *xi = (c as f64 + rng.gen::<f64>()) * inv;
        }
    }

    pub fn set_value(&mut self, bin: usize, weight: f64) {
        if !weight.is_finite() {
            return;
        }
        if weight > self.max_values[bin] {
            self.max_values[bin] = weight;
        }
        if weight > self.global_max {
            self.global_max = weight;
        }
    }

    fn increment(&mut self, bin: usize) {
        self.num_selected[bin] += 1;
    }

    /// Number of missed events to make up for after `new_max` was found in `bin`.
    fn correction_for(&self, bin: usize, new_max: f64) -> f64 {
        let mut c = (self.num_selected[bin] as f64 - 1.) * (new_max - self.max_old) / self.global_max;
        if new_max >= self.global_max {
            c *= new_max / self.global_max;
        }
        c
    }

    fn init_correction_cycle(&mut self, bin: usize, weight: f64) {
        self.max_old = self.max_values[bin];
        self.max_diff = weight - self.max_old;
        self.correction = self.correction_for(bin, weight);
        self.set_value(bin, weight);
        self.correction2 = 0.;
        self.max2 = 0.;
    }

    /// Keep track of weights above the box maximum seen during a correction.
    fn rescale(&mut self, bin: usize, weight: f64) {
        if weight > self.max_values[bin] {
            self.max2 = self.max2.max(weight);
            self.correction += 1.;
            self.correction2 -= 1.;
        }
    }

    /// Start a new correction when a larger weight was found during the
    /// previous one. Returns whether the corrections are over.
    fn correct(&mut self, bin: usize) -> bool {
        if self.max2 > self.max_values[bin] {
            let new_max = self.max2;
            self.max_old = self.max_values[bin];
            self.max_diff = new_max - self.max_old;
            self.correction = self.correction_for(bin, new_max) - self.correction2;
            self.set_value(bin, new_max);
            self.correction2 = 0.;
            self.max2 = 0.;
            return false;
        }
        true
    }
}

pub struct GridUnweighter {
    ndim: usize,
    bin_size: usize,
    num_points: usize,
    grid: Option<GridParameters>,
    /// Box waiting for correction cycles.
    pending_bin: Option<usize>,
    point: Vec<f64>,
}

impl GridUnweighter {
    pub fn new(ndim: usize, bin_size: usize, num_points: usize) -> GridUnweighter {
        GridUnweighter {
            ndim,
            bin_size,
            num_points,
            grid: None,
            pending_bin: None,
            point: vec![0.; ndim],
        }
    }

    pub fn grid(&self) -> Option<&GridParameters> {
        self.grid.as_ref()
    }
}

impl Unweighter for GridUnweighter {
    fn name(&self) -> &str {
        "grid_optimised"
    }

    fn prepare(
        &mut self,
        integrator: &mut dyn Integrator,
        integrand: &mut dyn Integrand,
        rng: &mut StdRng,
        _max_weight: Option<f64>,
    ) -> Result<(), Report> {
        if self.num_points == 0 {
            return Err(ConfigurationError::InvalidSetting(
                "the grid preparation needs at least one point per box".to_owned(),
            )
            .into());
        }
        let mut grid = GridParameters::new(self.bin_size, self.ndim)?;
        for bin in 0..grid.size() {
            for _ in 0..self.num_points {
                grid.shoot(rng, bin, &mut self.point);
                let weight = integrator.eval(integrand, &self.point);
                grid.set_value(bin, weight);
            }
        }
        if !(grid.global_max() > 0.) {
            return Err(ConfigurationError::MissingMaxWeight.into());
        }
        self.grid = Some(grid);
        self.pending_bin = None;
        Ok(())
    }

    fn prepared(&self) -> bool {
        self.grid.is_some()
    }

    fn next(
        &mut self,
        integrator: &mut dyn Integrator,
        integrand: &mut dyn Integrand,
        rng: &mut StdRng,
        max_trials: usize,
        stop: &AtomicBool,
    ) -> Draw {
        let mut draw = Draw::default();
        let grid = match self.grid.as_mut() {
            Some(g) => g,
            None => return draw,
        };

        if let Some(bin) = self.pending_bin {
            loop {
                if !draw.proceed(stop, max_trials) {
                    return draw;
                }
                if grid.correction >= 1. {
                    grid.correction -= 1.;
                }
                if rng.gen::<f64>() < grid.correction {
                    grid.correction = -1.;
                    grid.shoot(rng, bin, &mut self.point);
                    let weight = integrator.eval(integrand, &self.point);
                    draw.count(weight);
                    grid.rescale(bin, weight);
                    if weight > 0. && weight >= rng.gen::<f64>() * grid.max_diff + grid.max_old {
                        draw.weight = Some(weight);
                        return draw;
                    }
                } else if grid.correct(bin) {
                    self.pending_bin = None;
                    break;
                }
            }
        }

        while draw.proceed(stop, max_trials) {
            let bin = rng.gen_range(0..grid.size());
            let y = rng.gen::<f64>() * grid.global_max();
            grid.increment(bin);
            if y > grid.max_value(bin) {
                continue;
            }

            grid.shoot(rng, bin, &mut self.point);
            let weight = integrator.eval(integrand, &self.point);
            draw.count(weight);
            if weight > 0. && weight > y {
                if weight > grid.max_value(bin) {
                    grid.init_correction_cycle(bin, weight);
                    self.pending_bin = Some(bin);
                    draw.new_max_weight = Some(weight);
                }
                draw.weight = Some(weight);
                break;
            }
        }
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;
    use crate::integrand::FunctionIntegrand;
    use crate::integrators::plain::PlainIntegrator;
    use crate::IntegratorSettings;
    use rand::SeedableRng;

    #[test]
    fn box_coordinates() {
        let grid = GridParameters::new(3, 2).unwrap();
        assert_eq!(grid.size(), 9);
        assert_eq!(grid.coordinates(5), vec![2, 1]);

        let mut rng = StdRng::seed_from_u64(1);
        let mut x = [0.; 2];
        grid.shoot(&mut rng, 5, &mut x);
        assert!(x[0] >= 2. / 3. && x[0] < 1.);
        assert!(x[1] >= 1. / 3. && x[1] < 2. / 3.);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let err = GridParameters::new(3, 40).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::InvalidSetting(_))
        ));
    }

    #[test]
    fn plain_needs_a_maximum() {
        let mut integrator =
            PlainIntegrator::new(&IntegratorSettings::default(), Dashboard::new(false).status_update_sender);
        let mut f = FunctionIntegrand::new(1, |x: &[f64]| x[0]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut u = PlainUnweighter::new(1);
        let err = u.prepare(&mut integrator, &mut f, &mut rng, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::MissingMaxWeight)
        );
    }

    #[test]
    fn grid_events_follow_the_weight() {
        let mut integrator =
            PlainIntegrator::new(&IntegratorSettings::default(), Dashboard::new(false).status_update_sender);
        let mut accepted = vec![];
        let mut rng = StdRng::seed_from_u64(7);
        let mut u = GridUnweighter::new(2, 4, 50);
        let mut f = FunctionIntegrand::new(2, |x: &[f64]| x[0]);
        u.prepare(&mut integrator, &mut f, &mut rng, None).unwrap();
        for _ in 0..4000 {
            let draw = u.next(&mut integrator, &mut f, &mut rng, 1000, &AtomicBool::new(false));
            assert!(draw.weight.is_some());
            accepted.push(draw.weight.unwrap_or(0.));
        }
        // for a density 2x the mean of x is 2/3
        let mean = accepted.iter().sum::<f64>() / accepted.len() as f64;
        assert!((mean - 2. / 3.).abs() < 0.03, "mean {}", mean);
    }

    #[test]
    fn stop_interrupts_the_search() {
        let mut integrator =
            PlainIntegrator::new(&IntegratorSettings::default(), Dashboard::new(false).status_update_sender);
        let mut rng = StdRng::seed_from_u64(3);
        let stop = std::sync::Arc::new(AtomicBool::new(false));
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        // never accepted against the maximum, the flag is raised on the tenth call
        let (s, c) = (stop.clone(), calls.clone());
        let mut f = FunctionIntegrand::new(2, move |_: &[f64]| {
            if c.fetch_add(1, Ordering::Relaxed) + 1 == 10 {
                s.store(true, Ordering::Relaxed);
            }
            1e-12
        });

        let mut u = PlainUnweighter::new(2);
        u.prepare(&mut integrator, &mut f, &mut rng, Some(1.)).unwrap();
        let draw = u.next(&mut integrator, &mut f, &mut rng, 100000, &stop);
        assert!(draw.stopped);
        assert!(draw.weight.is_none());
        assert_eq!(draw.trials, 10);
        assert_eq!(calls.load(Ordering::Relaxed), 10);
    }
}
