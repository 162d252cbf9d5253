//! Cross-section computation and unweighted event generation.

use crate::dashboard::{EventInfo, StatusUpdate, StatusUpdateSender};
use crate::event::Event;
use crate::integrand::Integrand;
use crate::integrators::{IntegrationResult, Integrator};
use crate::unweighting::{build_unweighter, Unweighter};
use crate::{GeneralSettings, GenerationSettings, Settings};
use color_eyre::Report;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeneratorState {
    Idle,
    /// The cross section is known, generation has not started.
    Accumulating,
    Generating,
    Done,
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeneratorState::Idle => write!(f, "idle"),
            GeneratorState::Accumulating => write!(f, "accumulating"),
            GeneratorState::Generating => write!(f, "generating"),
            GeneratorState::Done => write!(f, "done"),
        }
    }
}

/// Drives one run: the integration of the cross section followed by the
/// generation of unweighted events from the same integrand.
pub struct Generator {
    general: GeneralSettings,
    generation: GenerationSettings,
    integrand: Box<dyn Integrand>,
    integrator: Box<dyn Integrator>,
    unweighter: Box<dyn Unweighter>,
    state: GeneratorState,
    result: Option<IntegrationResult>,
    max_weight: Option<f64>,
    rng: StdRng,
    event_info: EventInfo,
    stop: Arc<AtomicBool>,
    status_update_sender: StatusUpdateSender,
}

impl Generator {
    pub fn new(
        settings: &Settings,
        integrand: Box<dyn Integrand>,
        integrator: Box<dyn Integrator>,
        status_update_sender: StatusUpdateSender,
    ) -> Generator {
        let unweighter = build_unweighter(&settings.generation, integrand.size());
        Generator {
            general: settings.general.clone(),
            generation: settings.generation.clone(),
            integrand,
            integrator,
            unweighter,
            state: GeneratorState::Idle,
            result: None,
            max_weight: None,
            rng: StdRng::seed_from_u64(settings.generation.seed),
            event_info: EventInfo::default(),
            stop: Arc::new(AtomicBool::new(false)),
            status_update_sender,
        }
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn result(&self) -> Option<&IntegrationResult> {
        self.result.as_ref()
    }

    pub fn event_info(&self) -> &EventInfo {
        &self.event_info
    }

    pub fn integrand(&self) -> &dyn Integrand {
        self.integrand.as_ref()
    }

    /// Flag checked between two points; setting it ends the generation.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Share an external stop flag, read between evaluated points.
    pub fn set_stop_handle(&mut self, stop: Arc<AtomicBool>) {
        self.stop = stop;
    }

    /// Maximum weight used by the plain unweighting, overriding the one
    /// found by the integrator.
    pub fn set_max_weight(&mut self, max_weight: f64) {
        self.max_weight = Some(max_weight);
    }

    pub fn max_weight(&self) -> Option<f64> {
        self.max_weight.or_else(|| self.integrator.max_weight())
    }

    fn send(&self, update: StatusUpdate) {
        let _ = self.status_update_sender.send(update);
    }

    /// Integrate the process over the whole unit hypercube.
    pub fn compute_cross_section(&mut self) -> Result<IntegrationResult, Report> {
        self.send(StatusUpdate::Message(format!(
            "Computing the cross section with the {} integrator",
            self.integrator.name()
        )));
        let result = self.integrator.integrate(self.integrand.as_mut(), &[])?;

        if self.general.debug > 0 {
            println!(
                "Cross section: {} pb after {} evaluations, maximum weight {:e}",
                crate::utils::format_uncertainty(result.value, result.error),
                result.n_evals,
                result.max_weight
            );
        }

        self.result = Some(result.clone());
        self.state = GeneratorState::Accumulating;
        Ok(result)
    }

    fn start_generation(&mut self) -> Result<(), Report> {
        let max_weight = self.max_weight();
        self.unweighter.prepare(
            self.integrator.as_mut(),
            self.integrand.as_mut(),
            &mut self.rng,
            max_weight,
        )?;
        self.send(StatusUpdate::Message(format!(
            "Generating events with the {} unweighting",
            self.unweighter.name()
        )));
        self.state = GeneratorState::Generating;
        Ok(())
    }

    /// Trials left in the global budget.
    fn remaining_trials(&self) -> usize {
        if self.generation.trial_budget == 0 {
            usize::MAX
        } else {
            self.generation
                .trial_budget
                .saturating_sub(self.event_info.total_trials)
        }
    }

    /// Draw the next unweighted event. `Ok(None)` is returned when the
    /// draws allowed for this event were spent without an acceptance, or
    /// when the generation is over.
    pub fn next_event(&mut self) -> Result<Option<Event>, Report> {
        if self.state == GeneratorState::Done {
            return Ok(None);
        }
        if self.stop.load(Ordering::Relaxed) || self.remaining_trials() == 0 {
            self.state = GeneratorState::Done;
            return Ok(None);
        }
        if self.state != GeneratorState::Generating {
            self.start_generation()?;
        }

        let max_trials = self.generation.max_trials.min(self.remaining_trials());
        let draw = self.unweighter.next(
            self.integrator.as_mut(),
            self.integrand.as_mut(),
            &mut self.rng,
            max_trials,
            &self.stop,
        );

        let accepted = draw.weight.is_some() as usize;
        self.event_info.total_trials += draw.trials;
        self.event_info.no_phase_space_counter += draw.zero_weight;
        self.event_info.rejected_event_counter += draw.trials - draw.zero_weight - accepted;

        if let Some(w) = draw.new_max_weight {
            self.send(StatusUpdate::Warning(format!(
                "weight {:e} above the maximum used for the unweighting",
                w
            )));
        }

        if draw.weight.is_none() {
            if draw.stopped {
                self.state = GeneratorState::Done;
                return Ok(None);
            }
            self.event_info.exhausted_event_counter += 1;
            if self.general.debug > 1 {
                println!(
                    "No event accepted after {} trials ({} without phase space)",
                    draw.trials, draw.zero_weight
                );
            }
            if self.remaining_trials() == 0 {
                self.state = GeneratorState::Done;
            }
            return Ok(None);
        }

        self.event_info.accepted_event_counter += 1;
        let print_every = self.generation.print_every;
        if print_every > 0 && self.event_info.accepted_event_counter % print_every == 0 {
            self.send(StatusUpdate::EventInfo(self.event_info.clone()));
        }

        let mut event = self.integrand.event(&mut self.rng).unwrap_or_default();
        event.weight = 1.;
        Ok(Some(event))
    }

    /// Generate `num_events` events, handing each to `callback`, until the
    /// count is reached, the trial budget is spent or the run is stopped.
    pub fn generate<F: FnMut(&Event)>(
        &mut self,
        num_events: usize,
        mut callback: F,
    ) -> Result<EventInfo, Report> {
        let target = self.event_info.accepted_event_counter + num_events;
        while self.event_info.accepted_event_counter < target {
            match self.next_event()? {
                Some(e) => callback(&e),
                None => {
                    if self.state == GeneratorState::Done {
                        break;
                    }
                }
            }
        }
        self.state = GeneratorState::Done;

        self.send(StatusUpdate::EventInfo(self.event_info.clone()));
        if self.event_info.accepted_event_counter < target {
            self.send(StatusUpdate::Warning(format!(
                "generation ended after {} of {} events",
                self.event_info.accepted_event_counter, target
            )));
        }
        Ok(self.event_info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;
    use crate::integrand::FunctionIntegrand;
    use crate::integrators::plain::PlainIntegrator;
    use crate::ConfigurationError;

    fn generator(settings: &Settings) -> Generator {
        let sender = Dashboard::new(false).status_update_sender;
        Generator::new(
            settings,
            Box::new(FunctionIntegrand::new(2, |x: &[f64]| x[0] + x[1])),
            Box::new(PlainIntegrator::new(&settings.integrator, sender.clone())),
            sender,
        )
    }

    #[test]
    fn state_machine() {
        let mut settings = Settings::default();
        settings.integrator.n_start = 1000;
        let mut g = generator(&settings);
        assert_eq!(g.state(), GeneratorState::Idle);

        let res = g.compute_cross_section().unwrap();
        assert!((res.value - 1.).abs() < 0.1);
        assert_eq!(g.state(), GeneratorState::Accumulating);

        assert!(g.next_event().unwrap().is_some());
        assert_eq!(g.state(), GeneratorState::Generating);

        let info = g.generate(10, |e| assert_eq!(e.weight, 1.)).unwrap();
        assert_eq!(info.accepted_event_counter, 11);
        assert_eq!(g.state(), GeneratorState::Done);
        assert!(g.next_event().unwrap().is_none());
    }

    #[test]
    fn generation_needs_a_maximum_weight() {
        let mut g = generator(&Settings::default());
        let err = g.next_event().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::MissingMaxWeight)
        );
    }
}
