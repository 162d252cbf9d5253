use lpair::dashboard::Dashboard;
use lpair::event::Role;
use lpair::generator::{Generator, GeneratorState};
use lpair::integrand::{FunctionIntegrand, ProcessIntegrand};
use lpair::integrators::plain::PlainIntegrator;
use lpair::pdg;
use lpair::process::GamGamLL;
use lpair::registry::Registry;
use lpair::{BeamSettings, Limits, ProcessMode, Settings, UnweightingStrategy};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Elastic muon pairs at √s = 100 GeV.
fn lpair_settings(integrator: &str) -> Settings {
    let mut settings = Settings::default();
    settings.general.dashboard = false;
    settings.integrator.integrator = integrator.to_owned();
    settings.integrator.n_start = 5000;
    settings.integrator.n_max = 10000;
    settings.integrator.warmup_points = 2000;

    let k = &mut settings.kinematics;
    k.mode = ProcessMode::ElasticElastic;
    k.beam1 = BeamSettings {
        pdg: pdg::PROTON,
        pz: 50.,
    };
    k.beam2 = k.beam1.clone();
    k.cuts.mx = Limits::new(1.07, 20.).unwrap();
    settings
}

fn lpair_generator(settings: &Settings) -> Generator {
    let sender = Dashboard::new(false).status_update_sender;
    let process = GamGamLL::new(&settings.kinematics, 0).unwrap();
    let integrator = Registry::integrators()
        .build(&settings.integrator, sender.clone())
        .unwrap();
    Generator::new(
        settings,
        Box::new(ProcessIntegrand::new(Box::new(process))),
        integrator,
        sender,
    )
}

fn constant_generator(settings: &Settings) -> Generator {
    let sender = Dashboard::new(false).status_update_sender;
    Generator::new(
        settings,
        Box::new(FunctionIntegrand::new(3, |_: &[f64]| 1.)),
        Box::new(PlainIntegrator::new(&settings.integrator, sender.clone())),
        sender,
    )
}

mod budget {
    use super::*;

    #[test]
    fn trial_budget_ends_the_generation() {
        let mut settings = Settings::default();
        settings.generation.max_trials = 1;
        settings.generation.trial_budget = 200000;
        let mut g = constant_generator(&settings);
        // one acceptance in a thousand draws
        g.set_max_weight(1000.);

        let info = g.generate(1_000_000, |e| assert_eq!(e.weight, 1.)).unwrap();
        assert_eq!(g.state(), GeneratorState::Done);
        assert_eq!(info.total_trials, 200000);
        assert!(
            info.accepted_event_counter >= 130 && info.accepted_event_counter <= 270,
            "{} events accepted",
            info.accepted_event_counter
        );
        assert_eq!(
            info.accepted_event_counter + info.exhausted_event_counter,
            info.total_trials
        );
        assert_eq!(info.no_phase_space_counter, 0);
    }

    #[test]
    fn stop_flag_ends_the_generation() {
        let mut g = constant_generator(&Settings::default());
        g.set_max_weight(2.);
        let stop = g.stop_handle();

        let mut seen = 0;
        let info = g
            .generate(1000, |_| {
                seen += 1;
                if seen == 5 {
                    stop.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(info.accepted_event_counter, 5);
        assert_eq!(g.state(), GeneratorState::Done);
        assert!(g.next_event().unwrap().is_none());
    }

    #[test]
    fn stop_flag_interrupts_the_search_for_an_event() {
        let mut settings = Settings::default();
        settings.generation.max_trials = 100000;
        let stop = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));

        // a weight far below the maximum: no event is found before the flag is raised
        let (s, c) = (stop.clone(), calls.clone());
        let sender = Dashboard::new(false).status_update_sender;
        let mut g = Generator::new(
            &settings,
            Box::new(FunctionIntegrand::new(3, move |_: &[f64]| {
                if c.fetch_add(1, Ordering::Relaxed) + 1 == 50 {
                    s.store(true, Ordering::Relaxed);
                }
                1e-12
            })),
            Box::new(PlainIntegrator::new(&settings.integrator, sender.clone())),
            sender,
        );
        g.set_stop_handle(stop);
        g.set_max_weight(1.);

        assert!(g.next_event().unwrap().is_none());
        assert_eq!(g.state(), GeneratorState::Done);
        assert_eq!(calls.load(Ordering::Relaxed), 50);
        let info = g.generate(10, |_| panic!("no event expected")).unwrap();
        assert_eq!(info.total_trials, 50);
        assert_eq!(info.accepted_event_counter, 0);
        assert_eq!(info.exhausted_event_counter, 0);
    }
}

mod physics {
    use super::*;

    #[test]
    fn elastic_cross_section_and_events() {
        let settings = lpair_settings("vegas");
        let mut g = lpair_generator(&settings);

        let res = g.compute_cross_section().unwrap();
        assert!(res.value > 0. && res.value.is_finite(), "{:?}", res);
        assert!(res.error < res.value);
        assert!(g.max_weight().unwrap() > 0.);
        let stats = g.integrand().statistics().unwrap();
        assert!(stats.regular_point_count > 0);
        assert_eq!(stats.nan_point_count, 0);

        let mut n = 0;
        let info = g
            .generate(20, |e| {
                n += 1;
                let balance = e.momentum_balance();
                for i in 0..4 {
                    assert!(balance[i].abs() < 1e-3, "unbalanced event:\n{}", e);
                }
                assert_eq!(e.by_role(Role::CentralSystem).count(), 2);
            })
            .unwrap();
        assert_eq!(n, 20);
        assert_eq!(info.accepted_event_counter, 20);
        assert!(info.total_trials >= 20);
    }

    #[test]
    fn grid_optimised_unweighting() {
        let mut settings = lpair_settings("plain");
        settings.generation.unweighting = UnweightingStrategy::GridOptimised;
        settings.generation.bin_size = 2;
        settings.generation.num_points = 20;
        let mut g = lpair_generator(&settings);
        g.compute_cross_section().unwrap();

        let mut n = 0;
        g.generate(10, |e| {
            n += 1;
            assert!(e.one_with_role(Role::OutgoingBeam1).is_some());
            assert_eq!(e.weight, 1.);
        })
        .unwrap();
        assert_eq!(n, 10);
        assert_eq!(g.state(), GeneratorState::Done);
    }
}
