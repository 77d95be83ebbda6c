mod cli;

use std::process::exit;
use std::time::Duration;

use clap::Parser;

use kocoumat::fuzzer::{BlackboxFuzzer, FuzzerConfig, GreyboxConfig, GreyboxFuzzer, InputMode};

fn main() {
    env_logger::init();

    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            exit(1);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("ERROR: {err}");
        exit(1);
    }
}

fn run(cli: cli::Cli) -> kocoumat::Result<()> {
    let config = FuzzerConfig {
        fuzzed_prog: cli.fuzzed_prog,
        result_dir: cli.result_dir,
        minimize: cli.minimize,
        input_mode: InputMode::parse(&cli.input_mode),
        timeout: Duration::from_secs(cli.timeout_sec),
        nb_known_bugs: cli.nb_known_bugs,
    };

    match cli.schedule {
        None => {
            log::info!("running the blackbox fuzzer");
            BlackboxFuzzer::new(config)?.run()
        }
        Some(schedule) => {
            let (coverage_file, greyness_pct, concatenatedness_pct) = match (
                cli.coverage_file,
                cli.greyness_pct,
                cli.concatenatedness_pct,
            ) {
                (Some(coverage_file), Some(greyness), Some(concatenatedness)) => {
                    (coverage_file, greyness, concatenatedness)
                }
                _ => {
                    eprintln!(
                        "greybox mode needs COVERAGE_FILE, GREYNESS_PCT and CONCATENATEDNESS_PCT"
                    );
                    exit(1);
                }
            };
            if greyness_pct > 100 || concatenatedness_pct > 100 {
                eprintln!("GREYNESS_PCT and CONCATENATEDNESS_PCT must be within [0, 100]");
                exit(1);
            }

            let grey = GreyboxConfig {
                schedule,
                coverage_file,
                greyness: f64::from(greyness_pct) / 100.0,
                concatenatedness: f64::from(concatenatedness_pct) / 100.0,
                seed_dir: cli.seed_dir,
            };

            log::info!("running the greybox fuzzer");
            GreyboxFuzzer::new(config, grey)?.run()
        }
    }
}
