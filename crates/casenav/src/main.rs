use anyhow::Context;
use casenav::test_harness::{run_simulator, SimulatorConfig, TestHarness};
use casenav::{query, NavigationConfig, StateValidator};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("casenav=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("casenav")
        .version(casenav::VERSION)
        .about("Navigation state synchronizer tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Navigation configuration file (TOML)"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the navigation simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
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
                        .help("Stop simulation on first violation"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Run stress test")
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .default_value("100000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations"),
                ),
        )
        .subcommand(
            Command::new("check-url")
                .about("Parse a URL into a navigation state")
                .arg(Arg::new("url").required(true).help("URL to parse"))
                .arg(
                    Arg::new("default-view")
                        .long("default-view")
                        .help("Override the configured default view"),
                ),
        );

    let matches = cli.get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => NavigationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NavigationConfig::default(),
    };

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let operations = args.get_one::<u64>("operations").copied().unwrap_or(10_000);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            let stop_on_violation = args.get_flag("stop-on-violation");

            println!("Running navigation simulator...");
            println!("Operations: {}", operations);
            println!("Seed: {}", seed);
            println!();

            let report = run_simulator(SimulatorConfig {
                seed,
                total_operations: operations,
                navigation: config,
                stop_on_first_violation: stop_on_violation,
                ..Default::default()
            })?;

            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("stress", args)) => {
            let iterations = args.get_one::<u64>("iterations").copied().unwrap_or(100_000);

            println!("Running stress test...");
            println!("Iterations: {}", iterations);
            println!();

            let report = TestHarness::run_stress_test(iterations)?;

            println!("Stress Test Report:");
            println!("  Iterations: {}", report.iterations);
            println!("  History entries: {}", report.history_length);
            println!("  Violations: {}", report.violations);
            println!("  Success: {}", report.success);

            std::process::exit(if report.success { 0 } else { 1 });
        }
        Some(("check-url", args)) => {
            if let Some(view) = args.get_one::<String>("default-view") {
                config = config.with_default_view(view.clone());
                config.validate()?;
            }
            let url = args
                .get_one::<String>("url")
                .context("missing url argument")?;

            let outcome = query::from_url(url, &config.default_view)
                .map_err(anyhow::Error::from)
                .and_then(|state| {
                    StateValidator::validate(&state)?;
                    Ok(state)
                });
            match outcome {
                Ok(state) => {
                    println!("{}", serde_json::to_string_pretty(&state)?);
                    println!("canonical: {}", query::to_url(&state, &config.default_view));
                }
                Err(e) => {
                    println!("invalid: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ => {}
    }

    Ok(())
}
