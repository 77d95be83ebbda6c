//! The command line interface of the fuzzer.

use std::path::PathBuf;

use clap::Parser;

use kocoumat::queue::Schedule;

#[derive(Debug, Parser)]
#[command(
    about = "Coverage-guided fuzzer for C programs. The trailing arguments switch on greybox mode."
)]
pub struct Cli {
    #[arg(help = "The binary to fuzz", name = "FUZZED_PROG", required = true)]
    pub fuzzed_prog: PathBuf,

    #[arg(
        help = "Directory where crash reports and statistics are written",
        name = "RESULT_DIR",
        required = true
    )]
    pub result_dir: PathBuf,

    #[arg(
        help = "Minimize crashing inputs (0 or 1)",
        name = "MINIMIZE",
        value_parser = parse_zero_one,
        required = true
    )]
    pub minimize: bool,

    #[arg(
        help = "The literal `stdin`, or the file path each candidate input is written to",
        name = "INPUT_MODE",
        required = true
    )]
    pub input_mode: String,

    #[arg(
        help = "Whole-campaign budget in seconds",
        name = "TIMEOUT_SEC",
        required = true
    )]
    pub timeout_sec: u64,

    #[arg(
        help = "Stop after this many unique bugs were found",
        name = "NB_KNOWN_BUGS",
        required = true
    )]
    pub nb_known_bugs: usize,

    #[arg(
        help = "Power schedule (`simple` or `boosted`); providing it enables greybox mode",
        name = "SCHEDULE",
        value_parser = str::parse::<Schedule>
    )]
    pub schedule: Option<Schedule>,

    #[arg(
        help = "Coverage file the instrumented target writes after each run",
        name = "COVERAGE_FILE"
    )]
    pub coverage_file: Option<PathBuf>,

    #[arg(
        help = "Percentage of trials that use a fresh random input instead of a mutant",
        name = "GREYNESS_PCT"
    )]
    pub greyness_pct: Option<u8>,

    #[arg(
        help = "Percentage of mutants built by concatenation instead of byte edits",
        name = "CONCATENATEDNESS_PCT"
    )]
    pub concatenatedness_pct: Option<u8>,

    #[arg(
        help = "Directory with the initial seed corpus (defaults to self-generated seeds)",
        name = "SEED_DIR"
    )]
    pub seed_dir: Option<PathBuf>,
}

fn parse_zero_one(raw: &str) -> Result<bool, String> {
    match raw.parse::<i32>() {
        Ok(flag) => Ok(flag != 0),
        Err(_) => Err(format!("expected 0 or 1, got `{raw}`")),
    }
}
