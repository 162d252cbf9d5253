use color_eyre::{Help, Report};
use eyre::WrapErr;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use thiserror::Error;

pub mod algebra;
pub mod dashboard;
pub mod event;
pub mod form_factors;
pub mod generator;
pub mod integrand;
pub mod integrators;
pub mod kinematics;
pub mod limits;
pub mod orient;
pub mod pdg;
pub mod pickin;
pub mod process;
pub mod registry;
pub mod unweighting;
pub mod utils;

pub use form_factors::FormFactorsModel;
pub use limits::Limits;
pub use vector::Momentum;

/// Invalid setup of a run. Raised before any point is evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("the integrand has no dimension")]
    ZeroDimension,
    #[error("expected {expected} integration limits, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("integration limits of dimension {0} are not bounded")]
    UnboundedLimits(usize),
    #[error("integrator {integrator} is one-dimensional, the integrand has {dimension} dimensions")]
    OneDimensionalOnly { integrator: String, dimension: usize },
    #[error("integrator {integrator} needs at least {minimum} dimensions, the integrand has {dimension}")]
    TooFewDimensions {
        integrator: String,
        minimum: usize,
        dimension: usize,
    },
    #[error("unknown {kind} '{name}'")]
    UnknownModule { kind: String, name: String },
    #[error("no range set for {0}")]
    MissingRange(String),
    #[error("unknown particle with PDG id {0}")]
    UnknownParticle(i64),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("no maximum weight available for unweighting")]
    MissingMaxWeight,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum ProcessMode {
    #[serde(rename = "elastic_elastic")]
    ElasticElastic,
    #[serde(rename = "inelastic_elastic")]
    InelasticElastic,
    #[serde(rename = "elastic_inelastic")]
    ElasticInelastic,
    #[serde(rename = "inelastic_inelastic")]
    InelasticInelastic,
}

impl ProcessMode {
    pub fn dissociates_first(&self) -> bool {
        matches!(
            self,
            ProcessMode::InelasticElastic | ProcessMode::InelasticInelastic
        )
    }

    pub fn dissociates_second(&self) -> bool {
        matches!(
            self,
            ProcessMode::ElasticInelastic | ProcessMode::InelasticInelastic
        )
    }

    pub fn dissociates_any(&self) -> bool {
        self.dissociates_first() || self.dissociates_second()
    }

    /// Dimension of the phase space: seven variables plus one per remnant mass.
    pub fn ndim(&self) -> usize {
        7 + self.dissociates_first() as usize + self.dissociates_second() as usize
    }
}

impl fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessMode::ElasticElastic => write!(f, "elastic_elastic"),
            ProcessMode::InelasticElastic => write!(f, "inelastic_elastic"),
            ProcessMode::ElasticInelastic => write!(f, "elastic_inelastic"),
            ProcessMode::InelasticInelastic => write!(f, "inelastic_inelastic"),
        }
    }
}

impl Default for ProcessMode {
    fn default() -> ProcessMode {
        ProcessMode::ElasticElastic
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum UnweightingStrategy {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "grid_optimised")]
    GridOptimised,
}

impl fmt::Display for UnweightingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnweightingStrategy::Plain => write!(f, "plain"),
            UnweightingStrategy::GridOptimised => write!(f, "grid_optimised"),
        }
    }
}

impl Default for UnweightingStrategy {
    fn default() -> UnweightingStrategy {
        UnweightingStrategy::Plain
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub debug: usize,
    pub res_file_prefix: String,
    pub dashboard: bool,
}

impl Default for GeneralSettings {
    fn default() -> GeneralSettings {
        GeneralSettings {
            debug: 0,
            res_file_prefix: String::new(),
            dashboard: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    /// Registry key of the backend.
    pub integrator: String,
    pub n_start: usize,
    pub n_increase: usize,
    pub n_max: usize,
    pub n_bins: usize,
    /// Damping exponent of the VEGAS grid refinement.
    pub learning_rate: f64,
    pub chisq_cut: f64,
    pub warmup_points: usize,
    /// Sample generation points through the trained VEGAS grid.
    pub treat: bool,
    pub eps_rel: f64,
    pub eps_abs: f64,
    pub seed: u64,
    pub n_cores: usize,
    pub quadrature_order: usize,
    pub min_calls: Option<usize>,
    pub min_calls_per_bisection: Option<usize>,
    pub estimate_fraction: f64,
    pub miser_alpha: f64,
}

impl Default for IntegratorSettings {
    fn default() -> IntegratorSettings {
        IntegratorSettings {
            integrator: "vegas".to_owned(),
            n_start: 10000,
            n_increase: 0,
            n_max: 1000000,
            n_bins: 128,
            learning_rate: 1.5,
            chisq_cut: 1.5,
            warmup_points: 25000,
            treat: true,
            eps_rel: 0.,
            eps_abs: 0.,
            seed: 1,
            n_cores: 1,
            quadrature_order: 64,
            min_calls: None,
            min_calls_per_bisection: None,
            estimate_fraction: 0.1,
            miser_alpha: 2.,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BeamSettings {
    pub pdg: i64,
    /// Longitudinal momentum in GeV. The first beam travels along `+z`, the second along `-z`.
    pub pz: f64,
}

impl Default for BeamSettings {
    fn default() -> BeamSettings {
        BeamSettings {
            pdg: pdg::PROTON,
            pz: 6500.,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CutsSettings {
    /// Virtuality `-t1` of the first photon.
    pub q2: Limits,
    /// Squared mass of the two-photon system.
    pub w: Limits,
    /// Mass of the dissociated remnants.
    pub mx: Limits,
    pub pt_single: Limits,
    pub energy_single: Limits,
    pub eta_single: Limits,
    /// Invariant mass of the lepton pair.
    pub mass_sum: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KinematicsSettings {
    pub process: String,
    pub beam1: BeamSettings,
    pub beam2: BeamSettings,
    pub mode: ProcessMode,
    pub pair: i64,
    pub remnant_form_factors: FormFactorsModel,
    pub n_opt: i32,
    pub cuts: CutsSettings,
}

impl Default for KinematicsSettings {
    fn default() -> KinematicsSettings {
        KinematicsSettings {
            process: "lpair".to_owned(),
            beam1: BeamSettings::default(),
            beam2: BeamSettings::default(),
            mode: ProcessMode::default(),
            pair: pdg::MUON,
            remnant_form_factors: FormFactorsModel::default(),
            n_opt: 0,
            cuts: CutsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub num_events: usize,
    /// Maximum number of draws spent on a single event.
    pub max_trials: usize,
    /// Maximum number of draws over the whole generation, unlimited if zero.
    pub trial_budget: usize,
    pub seed: u64,
    pub unweighting: UnweightingStrategy,
    pub bin_size: usize,
    pub num_points: usize,
    pub print_every: usize,
}

impl Default for GenerationSettings {
    fn default() -> GenerationSettings {
        GenerationSettings {
            num_events: 1000,
            max_trials: 100000,
            trial_budget: 0,
            seed: 42,
            unweighting: UnweightingStrategy::default(),
            bin_size: 3,
            num_points: 100,
            print_every: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(rename = "General", default)]
    pub general: GeneralSettings,
    #[serde(rename = "Integrator", default)]
    pub integrator: IntegratorSettings,
    #[serde(rename = "Kinematics", default)]
    pub kinematics: KinematicsSettings,
    #[serde(rename = "Generation", default)]
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn from_file(filename: &str) -> Result<Settings, Report> {
        let f = File::open(filename)
            .wrap_err_with(|| format!("Could not open settings file {}", filename))
            .suggestion("Does the path exist?")?;
        serde_yaml::from_reader(f)
            .wrap_err("Could not parse settings file")
            .suggestion("Is it a correct yaml file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_use_defaults() {
        let s: Settings = serde_yaml::from_str(
            "
Kinematics:
  mode: inelastic_inelastic
  beam1: {pdg: 2212, pz: 50.}
  cuts:
    mx: {max: 100.}
    pt_single: {min: 5.}
Generation:
  unweighting: grid_optimised
",
        )
        .unwrap();
        assert_eq!(s.kinematics.mode.ndim(), 9);
        assert_eq!(s.kinematics.beam1.pz, 50.);
        assert_eq!(s.kinematics.beam2.pz, 6500.);
        assert_eq!(s.kinematics.cuts.mx, Limits::with_max(100.));
        assert_eq!(s.generation.unweighting, UnweightingStrategy::GridOptimised);
        assert_eq!(s.integrator.integrator, "vegas");
        assert_eq!(s.general.debug, 0);
    }

    #[test]
    fn reversed_cut_is_rejected() {
        let res = serde_yaml::from_str::<Settings>(
            "
Kinematics:
  cuts:
    q2: {min: 10., max: 1.}
",
        );
        assert!(res.is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(Settings::from_file("/nonexistent/lpair.yaml").is_err());
    }
}
