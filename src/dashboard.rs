use crate::integrand::IntegrandStatistics;
use crate::utils;
use colored::Colorize;
use serde::Serialize;
use std::sync::mpsc::{channel, Sender};
use std::thread;
use thousands::Separable;

pub type StatusUpdateSender = Sender<StatusUpdate>;

/// Progress of the event generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventInfo {
    pub accepted_event_counter: usize,
    pub rejected_event_counter: usize,
    /// Draws outside the physical region.
    pub no_phase_space_counter: usize,
    /// Events abandoned after `max_trials` draws.
    pub exhausted_event_counter: usize,
    pub total_trials: usize,
}

impl EventInfo {
    pub fn efficiency(&self) -> f64 {
        if self.total_trials == 0 {
            0.
        } else {
            self.accepted_event_counter as f64 / self.total_trials as f64
        }
    }
}

#[derive(Clone, Debug)]
pub enum StatusUpdate {
    /// Iteration number, average, error, `χ²/dof` and whether the iteration is still running.
    NewPoint(usize, f64, f64, f64, bool),
    IntegratorUpdate(String),
    Statistics(IntegrandStatistics),
    EventInfo(EventInfo),
    Message(String),
    Warning(String),
}

pub struct Dashboard {
    pub status_update_sender: StatusUpdateSender,
}

impl Dashboard {
    pub fn new(print: bool) -> Dashboard {
        if print {
            Dashboard::minimal_dashboard()
        } else {
            Dashboard::silent_dashboard()
        }
    }

    pub fn minimal_dashboard() -> Dashboard {
        let (log_sender, log_receiver) = channel();

        thread::spawn(move || {
            while let Ok(x) = log_receiver.recv() {
                match x {
                    StatusUpdate::Message(m) => println!("{}", m),
                    StatusUpdate::Warning(m) => println!("{} {}", "Warning:".yellow().bold(), m),
                    StatusUpdate::IntegratorUpdate(m) => println!("{}", m),
                    StatusUpdate::NewPoint(iter, avg, err, chi_sq, live) => {
                        if !live {
                            println!(
                                "Iteration {}: {} {:.2} χ²",
                                iter,
                                utils::format_uncertainty(avg, err),
                                chi_sq
                            );
                        }
                    }
                    StatusUpdate::Statistics(s) => {
                        println!(
                            "Samples: {}, regular: {}, rejected: {}, NaN: {}, max weight: {:e}",
                            s.total_samples.separate_with_spaces(),
                            s.regular_point_count.separate_with_spaces(),
                            s.rejected_point_count.separate_with_spaces(),
                            s.nan_point_count.separate_with_spaces(),
                            s.running_max
                        );
                    }
                    StatusUpdate::EventInfo(e) => {
                        if e.accepted_event_counter != 0 {
                            println!(
                                "Events: {} accepted, {} rejected, {} trials ({:.3}% efficiency)",
                                e.accepted_event_counter.separate_with_spaces(),
                                e.rejected_event_counter.separate_with_spaces(),
                                e.total_trials.separate_with_spaces(),
                                e.efficiency() * 100.
                            );
                        }
                    }
                }
            }
        });

        Dashboard {
            status_update_sender: log_sender,
        }
    }

    /// Drain the updates without printing them.
    pub fn silent_dashboard() -> Dashboard {
        let (log_sender, log_receiver) = channel::<StatusUpdate>();
        thread::spawn(move || while log_receiver.recv().is_ok() {});
        Dashboard {
            status_update_sender: log_sender,
        }
    }
}
