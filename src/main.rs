use clap::{App, Arg, ArgMatches, SubCommand};
use color_eyre::{Help, Report};
use eyre::WrapErr;
use itertools::Itertools;
use rand::prelude::*;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::str::FromStr;
use std::time::Instant;

use lpair::algebra;
use lpair::dashboard::{Dashboard, StatusUpdate, StatusUpdateSender};
use lpair::event::Role;
use lpair::generator::Generator;
use lpair::integrand::ProcessIntegrand;
use lpair::registry::Registry;
use lpair::{ConfigurationError, Momentum, Settings};

fn parse<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, Report>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|x| {
            T::from_str(x).wrap_err_with(|| format!("Could not parse the value '{}' of --{}", x, name))
        })
        .transpose()
}

fn bench(settings: &Settings, num_samples: usize) -> Result<(), Report> {
    let mut process = Registry::processes().build(&settings.kinematics, settings.general.debug)?;
    let mut x = vec![0.; process.ndim()];
    let mut rng: StdRng = SeedableRng::seed_from_u64(100);

    let mut accepted = 0;
    let now = Instant::now();
    for _ in 0..num_samples {
        for xi in x.iter_mut() {
            *xi = rng.gen();
        }
        if process.weight(&x) > 0. {
            accepted += 1;
        }
    }

    println!(
        "{:#?} for {} samples, {} in the physical region",
        now.elapsed(),
        num_samples,
        accepted
    );
    Ok(())
}

fn inspect(settings: &Settings, matches: &ArgMatches) -> Result<(), Report> {
    let mut process = Registry::processes().build(&settings.kinematics, settings.general.debug)?;

    let pt = matches
        .values_of("point")
        .map(|v| {
            v.map(|x| f64::from_str(x.trim_end_matches(',')))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap_or_else(|| Ok(vec![]))
        .wrap_err("Could not parse the point")?;
    if pt.len() != process.ndim() {
        return Err(ConfigurationError::DimensionMismatch {
            expected: process.ndim(),
            found: pt.len(),
        })
        .suggestion(format!("The {} mode has {} dimensions", settings.kinematics.mode, process.ndim()));
    }

    let weight = process.weight(&pt);
    println!("weight={:e} pb\n  | x=({})\n", weight, pt.iter().format(", "));
    if let Some(r) = process.last_rejection() {
        println!("rejected: {}", r);
        return Ok(());
    }

    let mut rng: StdRng = SeedableRng::seed_from_u64(settings.generation.seed);
    if let Some(event) = process.event(&mut rng) {
        println!("{}", event);

        // light-cone fractions of the photons with respect to the beams
        let beam1 = event.one_with_role(Role::IncomingBeam1).map(|p| p.momentum);
        let beam2 = event.one_with_role(Role::IncomingBeam2).map(|p| p.momentum);
        if let (Some(b1), Some(b2)) = (beam1, beam2) {
            let basis = [
                b1,
                b2,
                Momentum::from_px_py_pz_e(1., 0., 0., 0.),
                Momentum::from_px_py_pz_e(0., 1., 0., 0.),
            ];
            for role in &[Role::Parton1, Role::Parton2] {
                if let Some(q) = event.one_with_role(*role) {
                    let c = algebra::decompose(&q.momentum, &basis)?;
                    println!(
                        "{}: x1={:.6e} x2={:.6e} kt=({:.4}, {:.4}) virtuality={:.6e}",
                        role,
                        c[0],
                        c[1],
                        c[2],
                        c[3],
                        -q.momentum.mass2()
                    );
                }
            }
        }
        println!("momentum balance: {}", event.momentum_balance());
    }
    Ok(())
}

fn run(
    settings: &Settings,
    status_update_sender: StatusUpdateSender,
    num_events: Option<usize>,
) -> Result<(), Report> {
    let process = Registry::processes().build(&settings.kinematics, settings.general.debug)?;
    let integrator = Registry::integrators().build(&settings.integrator, status_update_sender.clone())?;

    status_update_sender
        .send(StatusUpdate::Message(format!(
            "Integrating {} in {} mode with beams of {} and {} GeV using the {} integrator ({} samples)",
            process.name(),
            settings.kinematics.mode,
            settings.kinematics.beam1.pz,
            settings.kinematics.beam2.pz,
            integrator.name(),
            settings.integrator.n_max
        )))
        .wrap_err("The dashboard is gone")?;

    let mut generator = Generator::new(
        settings,
        Box::new(ProcessIntegrand::new(process)),
        integrator,
        status_update_sender,
    );
    let result = generator.compute_cross_section()?;
    println!(
        "Cross section: {} pb ({} evaluations, converged: {})",
        lpair::utils::format_uncertainty(result.value, result.error),
        result.n_evals,
        result.converged
    );

    let f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(format!("{}lpair_res.dat", settings.general.res_file_prefix))
        .wrap_err("Unable to create result file")?;
    let mut result_file = BufWriter::new(f);
    writeln!(&mut result_file, "{}", serde_yaml::to_string(&result)?)?;
    writeln!(&mut result_file, "...")?; // write end-marker, for easy streaming

    if let Some(n) = num_events {
        let debug = settings.general.debug;
        let now = Instant::now();
        let info = generator.generate(n, |event| {
            if debug > 1 {
                println!("{}", event);
            }
        })?;
        println!(
            "Generated {} events in {:#?} ({} trials, {} exhausted)",
            info.accepted_event_counter,
            now.elapsed(),
            info.total_trials,
            info.exhausted_event_counter
        );
    }
    Ok(())
}

fn main() -> Result<(), Report> {
    let matches = App::new("LPAIR")
        .version("0.1")
        .about("Two-photon production of lepton pairs in hadron collisions")
        .arg(
            Arg::with_name("cores")
                .short("c")
                .long("cores")
                .value_name("NUMCORES")
                .help("Set the number of cores"),
        )
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .value_name("LEVEL")
                .help("Set the debug level. Higher means more verbose."),
        )
        .arg(
            Arg::with_name("samples")
                .short("s")
                .long("samples")
                .value_name("SAMPLES")
                .help("Number of samples per integration"),
        )
        .arg(
            Arg::with_name("n_start")
                .long("n_start")
                .value_name("N_START")
                .help("Number of starting samples for Vegas"),
        )
        .arg(
            Arg::with_name("n_increase")
                .long("n_increase")
                .value_name("N_INCREASE")
                .help("Number of increase samples for Vegas"),
        )
        .arg(
            Arg::with_name("integrator")
                .long("integrator")
                .value_name("INTEGRATOR")
                .help("Select the integrator (plain, vegas, miser, gauss_legendre, cubature)"),
        )
        .arg(
            Arg::with_name("config")
                .short("f")
                .long("config")
                .value_name("CONFIG_FILE")
                .default_value("lpair.yaml")
                .help("Set the configuration file"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Specify the integration and generation seed"),
        )
        .arg(
            Arg::with_name("res_file_prefix")
                .long("res_file_prefix")
                .value_name("RES_FILE_PREFIX")
                .help("Set the prefix to apply to the result file"),
        )
        .subcommand(
            SubCommand::with_name("generate")
                .about("Integrate and generate unweighted events")
                .arg(
                    Arg::with_name("events")
                        .long("events")
                        .short("n")
                        .value_name("EVENTS")
                        .help("Number of events to generate"),
                ),
        )
        .subcommand(
            SubCommand::with_name("bench").about("Run a benchmark").arg(
                Arg::with_name("samples")
                    .required(true)
                    .long("samples")
                    .short("s")
                    .value_name("SAMPLES")
                    .help("Number of samples for benchmark"),
            ),
        )
        .subcommand(
            SubCommand::with_name("inspect")
                .about("Inspect a single input point")
                .arg(
                    Arg::with_name("point")
                        .short("p")
                        .required(true)
                        .min_values(7)
                        .allow_hyphen_values(true),
                ),
        )
        .get_matches();

    let config = matches.value_of("config").unwrap_or("lpair.yaml");
    let mut settings = Settings::from_file(config)?;

    if let Some(x) = parse(&matches, "cores")? {
        settings.integrator.n_cores = x;
    }
    if let Some(x) = parse(&matches, "debug")? {
        settings.general.debug = x;
    }
    if let Some(x) = parse::<u64>(&matches, "seed")? {
        settings.integrator.seed = x;
        settings.generation.seed = x;
    }
    if let Some(x) = parse(&matches, "samples")? {
        settings.integrator.n_max = x;
    }
    if let Some(x) = parse(&matches, "n_start")? {
        settings.integrator.n_start = x;
    }
    if let Some(x) = parse(&matches, "n_increase")? {
        settings.integrator.n_increase = x;
    }
    if let Some(x) = matches.value_of("integrator") {
        settings.integrator.integrator = x.to_owned();
    }
    if let Some(x) = matches.value_of("res_file_prefix") {
        settings.general.res_file_prefix = x.to_owned();
    }

    if settings.integrator.n_cores > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.integrator.n_cores)
            .build_global()
            .wrap_err("Could not build the thread pool")?;
    }

    if let Some(matches) = matches.subcommand_matches("bench") {
        let samples = parse(matches, "samples")?.unwrap_or(1000);
        return bench(&settings, samples);
    }

    if let Some(matches) = matches.subcommand_matches("inspect") {
        return inspect(&settings, matches);
    }

    let dashboard = Dashboard::new(settings.general.dashboard);
    let num_events = match matches.subcommand_matches("generate") {
        Some(m) => Some(parse(m, "events")?.unwrap_or(settings.generation.num_events)),
        None => None,
    };
    run(&settings, dashboard.status_update_sender, num_events)
}
