//! Name-keyed builders of integrators and processes.

use crate::dashboard::StatusUpdateSender;
use crate::integrators::cubature::CubatureIntegrator;
use crate::integrators::gauss_legendre::GaussLegendreIntegrator;
use crate::integrators::miser::MiserIntegrator;
use crate::integrators::plain::PlainIntegrator;
use crate::integrators::vegas::VegasIntegrator;
use crate::integrators::Integrator;
use crate::process::{GamGamLL, Process};
use crate::{ConfigurationError, IntegratorSettings, KinematicsSettings};
use color_eyre::Report;
use fnv::FnvHashMap;

pub type IntegratorBuilder =
    fn(&IntegratorSettings, StatusUpdateSender) -> Result<Box<dyn Integrator>, Report>;
pub type ProcessBuilder = fn(&KinematicsSettings, usize) -> Result<Box<dyn Process>, Report>;

pub struct Registry<B> {
    kind: &'static str,
    builders: FnvHashMap<String, B>,
}

impl<B> Registry<B> {
    pub fn new(kind: &'static str) -> Registry<B> {
        Registry {
            kind,
            builders: FnvHashMap::default(),
        }
    }

    /// Add a builder, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, builder: B) {
        self.builders.insert(name.to_owned(), builder);
    }

    pub fn get(&self, name: &str) -> Result<&B, Report> {
        self.builders.get(name).ok_or_else(|| {
            ConfigurationError::UnknownModule {
                kind: self.kind.to_owned(),
                name: name.to_owned(),
            }
            .into()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builders.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Registry<IntegratorBuilder> {
    pub fn integrators() -> Registry<IntegratorBuilder> {
        let mut r: Registry<IntegratorBuilder> = Registry::new("integrator");
        r.register("plain", |s, sender| Ok(Box::new(PlainIntegrator::new(s, sender))));
        r.register("vegas", |s, sender| Ok(Box::new(VegasIntegrator::new(s, sender))));
        r.register("miser", |s, sender| Ok(Box::new(MiserIntegrator::new(s, sender))));
        r.register("gauss_legendre", |s, sender| {
            Ok(Box::new(GaussLegendreIntegrator::new(s, sender)))
        });
        r.register("cubature", |s, sender| {
            Ok(Box::new(CubatureIntegrator::new(s, sender)))
        });
        r
    }

    pub fn build(
        &self,
        settings: &IntegratorSettings,
        sender: StatusUpdateSender,
    ) -> Result<Box<dyn Integrator>, Report> {
        (self.get(&settings.integrator)?)(settings, sender)
    }
}

impl Registry<ProcessBuilder> {
    pub fn processes() -> Registry<ProcessBuilder> {
        let mut r: Registry<ProcessBuilder> = Registry::new("process");
        r.register("lpair", |k, debug| Ok(Box::new(GamGamLL::new(k, debug)?)));
        r
    }

    pub fn build(&self, settings: &KinematicsSettings, debug: usize) -> Result<Box<dyn Process>, Report> {
        (self.get(&settings.process)?)(settings, debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::Dashboard;

    #[test]
    fn builtin_modules() {
        let integrators = Registry::integrators();
        assert_eq!(
            integrators.names(),
            vec!["cubature", "gauss_legendre", "miser", "plain", "vegas"]
        );
        let sender = Dashboard::new(false).status_update_sender;
        let settings = IntegratorSettings {
            integrator: "miser".to_owned(),
            ..IntegratorSettings::default()
        };
        assert_eq!(integrators.build(&settings, sender).unwrap().name(), "miser");

        let processes = Registry::processes();
        assert!(processes.contains("lpair"));
    }

    #[test]
    fn unknown_name() {
        let processes = Registry::processes();
        let err = processes.get("lpair2").err().unwrap();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnknownModule {
                kind: "process".to_owned(),
                name: "lpair2".to_owned()
            })
        );
    }
}
