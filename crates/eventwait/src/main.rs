use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use eventwait::logging::init_tracing;
use eventwait::test_harness::{run_simulation, SimulatorConfig};
use eventwait::{EventWaiter, WaiterConfig};
use std::path::PathBuf;
use std::time::Duration;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML file with waiter settings")
}

fn load_config(args: &ArgMatches) -> anyhow::Result<WaiterConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => WaiterConfig::load(path)
            .with_context(|| format!("loading waiter config from {}", path.display())),
        None => Ok(WaiterConfig::default()),
    }
}

fn cli() -> Command {
    Command::new("eventwait")
        .version(eventwait::VERSION)
        .about("Quiescence-based accessibility event waiter")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run concurrent provider rounds against a waiter")
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .default_value("5")
                        .value_parser(value_parser!(u32))
                        .help("Number of arm/wait/purge cycles"),
                )
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .default_value("4")
                        .value_parser(value_parser!(u32))
                        .help("Provider threads per round"),
                )
                .arg(
                    Arg::new("events-per-thread")
                        .long("events-per-thread")
                        .default_value("3")
                        .value_parser(value_parser!(u32))
                        .help("Events each provider thread fires"),
                )
                .arg(
                    Arg::new("spacing-ms")
                        .long("spacing-ms")
                        .default_value("20")
                        .value_parser(value_parser!(u64))
                        .help("Upper bound of the random pause before each event"),
                )
                .arg(
                    Arg::new("quiescence-ms")
                        .long("quiescence-ms")
                        .default_value("100")
                        .value_parser(value_parser!(u64))
                        .help("Quiescence window for every wait"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop at the first violating round"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("wait-idle")
                .about("Arm a waiter with no provider and time one quiescence wait")
                .arg(
                    Arg::new("quiescence-ms")
                        .long("quiescence-ms")
                        .value_parser(value_parser!(u64))
                        .help("Quiescence window; defaults to the configured one"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective waiter configuration")
                .arg(config_arg()),
        )
}

fn main() -> anyhow::Result<()> {
    init_tracing("eventwait=info");
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let waiter = load_config(args)?;
            let config = SimulatorConfig {
                seed: *args.get_one::<u64>("seed").context("seed")?,
                rounds: *args.get_one::<u32>("rounds").context("rounds")?,
                threads: *args.get_one::<u32>("threads").context("threads")?,
                events_per_thread: *args.get_one::<u32>("events-per-thread").context("events-per-thread")?,
                max_spacing: Duration::from_millis(*args.get_one::<u64>("spacing-ms").context("spacing-ms")?),
                quiescence: Duration::from_millis(*args.get_one::<u64>("quiescence-ms").context("quiescence-ms")?),
                waiter,
                stop_on_first_violation: args.get_flag("stop-on-violation"),
            };

            let report = run_simulation(&config);

            if args.get_flag("json") {
                println!("{}", report.to_json());
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("wait-idle", args)) => {
            let config = load_config(args)?;
            let quiescence = args
                .get_one::<u64>("quiescence-ms")
                .map_or(config.default_quiescence, |ms| Duration::from_millis(*ms));

            let waiter = EventWaiter::with_config(config);
            waiter.arm();
            let outcome = waiter.wait_for_events(0, quiescence);
            waiter.purge();

            println!("Window: {}ms", outcome.window.as_millis());
            println!("Elapsed: {}ms", outcome.elapsed.as_millis());
            println!("Observed: {}", outcome.observed);
        }
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string());
        }
        _ => {}
    }

    Ok(())
}
