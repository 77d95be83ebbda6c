//! The core fuzzer logic: trial processing shared by both loops, the
//! blackbox and greybox variants, and the campaign plumbing around them
//! (stats ticker, deadline watcher, termination signals).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signal_hook::consts::TERM_SIGNALS;

use crate::coverage::{self, CoveragePath, PathRegistry};
use crate::error::{Error, Result};
use crate::exec::{self, ExecutionInput, ExecutionResult, DEFAULT_RUN_TIMEOUT};
use crate::generators;
use crate::minimize::{self, ReplayOutcome};
use crate::mutators;
use crate::oracle::{DetectedError, Oracle, GREYBOX_ASAN_OFFSET};
use crate::queue::{Schedule, Seed, SeedQueue};
use crate::report::{self, CrashReport, GreyboxStatsSnapshot, StatsSnapshot, TimeStatsDoc};
use crate::stats::StatisticsMemory;

pub const FUZZER_NAME: &str = "kocoumat";

/// Fallback seed directory populated with random inputs when the greybox
/// fuzzer is started without a corpus.
const SELF_SEED_DIR: &str = "MY_SEED";
const SELF_SEED_COUNT: usize = 1000;

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// How the target receives its input.
#[derive(Debug, Clone)]
pub enum InputMode {
    Stdin,
    File(PathBuf),
}

impl InputMode {
    /// The CLI encodes stdin as the literal string `stdin`; anything else
    /// names the file the candidate bytes are staged into before each run.
    pub fn parse(raw: &str) -> Self {
        if raw == "stdin" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuzzerConfig {
    pub fuzzed_prog: PathBuf,
    pub result_dir: PathBuf,
    pub minimize: bool,
    pub input_mode: InputMode,
    /// Whole-campaign wall-clock budget.
    pub timeout: Duration,
    /// Stop once this many unique findings have been reported.
    pub nb_known_bugs: usize,
}

#[derive(Debug, Clone)]
pub struct GreyboxConfig {
    pub schedule: Schedule,
    pub coverage_file: PathBuf,
    /// Probability of trialing a fresh random input instead of a mutant.
    pub greyness: f64,
    /// Probability of building the mutant by concatenation instead of edits.
    pub concatenatedness: f64,
    /// Initial corpus directory; `None` self-seeds `MY_SEED/`.
    pub seed_dir: Option<PathBuf>,
}

/// Greybox counters mirrored for the stats ticker, which must not touch the
/// worker-owned queue and registry.
struct GreyboxShared {
    nb_queued_seeds: AtomicUsize,
    nb_unique_paths: AtomicUsize,
    best_coverage_bits: AtomicU64,
}

impl GreyboxShared {
    fn new() -> Self {
        Self {
            nb_queued_seeds: AtomicUsize::new(0),
            nb_unique_paths: AtomicUsize::new(0),
            best_coverage_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn best_coverage(&self) -> f64 {
        f64::from_bits(self.best_coverage_bits.load(Ordering::Relaxed))
    }

    fn set_best_coverage(&self, ratio: f64) {
        self.best_coverage_bits
            .store(ratio.to_bits(), Ordering::Relaxed);
    }
}

/// State shared between the worker and the auxiliary threads.
struct Shared {
    stop: Arc<AtomicBool>,
    nb_before_min: AtomicUsize,
    nb_failed_runs: AtomicUsize,
    nb_hanged_runs: AtomicUsize,
    execution: StatisticsMemory<f64>,
    minimization: StatisticsMemory<f64>,
    minimization_steps: StatisticsMemory<u32>,
    /// Append-only; the position of a finding is its stable report id.
    unique_errors: Mutex<Vec<DetectedError>>,
    greybox: Option<GreyboxShared>,
}

impl Shared {
    fn new(greybox: bool) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            nb_before_min: AtomicUsize::new(0),
            nb_failed_runs: AtomicUsize::new(0),
            nb_hanged_runs: AtomicUsize::new(0),
            execution: StatisticsMemory::default(),
            minimization: StatisticsMemory::default(),
            minimization_steps: StatisticsMemory::default(),
            unique_errors: Mutex::new(Vec::new()),
            greybox: greybox.then(GreyboxShared::new),
        }
    }

    fn keep_running(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn snapshot(&self, fuzzed_program: Vec<u8>) -> StatsSnapshot {
        StatsSnapshot {
            fuzzer_name: FUZZER_NAME,
            fuzzed_program,
            nb_runs: self.execution.count(),
            nb_failed_runs: self.nb_failed_runs.load(Ordering::Relaxed),
            nb_hanged_runs: self.nb_hanged_runs.load(Ordering::Relaxed),
            execution_time: time_stats(&self.execution),
            nb_unique_failures: self.unique_errors.lock().unwrap().len(),
            nb_before_min: self.nb_before_min.load(Ordering::Relaxed),
            avg_steps: self.minimization_steps.avg(),
            minimization_time: time_stats(&self.minimization),
            greybox: self.greybox.as_ref().map(|grey| GreyboxStatsSnapshot {
                nb_queued_seed: grey.nb_queued_seeds.load(Ordering::Relaxed),
                coverage_percent: grey.best_coverage() * 100.0,
                nb_unique_hash: grey.nb_unique_paths.load(Ordering::Relaxed),
            }),
        }
    }
}

fn time_stats(stats: &StatisticsMemory<f64>) -> TimeStatsDoc {
    TimeStatsDoc {
        average: stats.avg(),
        median: stats.median(),
        min: stats.min(),
        max: stats.max(),
    }
}

/// Plumbing shared by the blackbox and greybox variants.
struct Engine {
    config: FuzzerConfig,
    shared: Arc<Shared>,
    oracle: Oracle,
    execution_input: ExecutionInput,
    rng: StdRng,
}

impl Engine {
    fn new(config: FuzzerConfig, greybox: bool) -> Result<Self> {
        if !config.fuzzed_prog.exists() || config.fuzzed_prog.is_dir() {
            return Err(Error::MissingTarget(config.fuzzed_prog.clone()));
        }

        fs::create_dir_all(config.result_dir.join("crashes"))?;
        fs::create_dir_all(config.result_dir.join("hangs"))?;

        let execution_input = match &config.input_mode {
            InputMode::Stdin => {
                ExecutionInput::stdin(config.fuzzed_prog.clone(), DEFAULT_RUN_TIMEOUT)
            }
            InputMode::File(path) => ExecutionInput::file(
                config.fuzzed_prog.clone(),
                DEFAULT_RUN_TIMEOUT,
                path.clone(),
            ),
        };

        let asan_offset = if greybox { GREYBOX_ASAN_OFFSET } else { 0 };

        Ok(Self {
            oracle: Oracle::new(asan_offset)?,
            execution_input,
            shared: Arc::new(Shared::new(greybox)),
            rng: StdRng::from_entropy(),
            config,
        })
    }

    fn keep_running(&self) -> bool {
        self.shared.keep_running()
    }

    /// Run the staged input once and fold the outcome into the counters.
    fn execute(&self) -> std::io::Result<ExecutionResult> {
        let result = exec::run_with_timeout(&self.execution_input, false)?;

        self.shared.execution.add_number(ms(result.elapsed));
        if result.timed_out {
            self.shared.nb_hanged_runs.fetch_add(1, Ordering::Relaxed);
        } else if result.exit_code != 0 {
            self.shared.nb_failed_runs.fetch_add(1, Ordering::Relaxed);
        }

        Ok(result)
    }

    /// Classify one trial, deduplicate, minimize and persist the report.
    ///
    /// Returns the finding (new or already known) so the greybox loop can
    /// tell failing runs from clean ones. `from_min` marks replays issued by
    /// the minimizer, which can themselves surface new findings.
    fn run_and_handle(
        &mut self,
        input: &[u8],
        result: &ExecutionResult,
        from_min: bool,
    ) -> Option<DetectedError> {
        let error = self.oracle.detect(result)?;

        let id = {
            let mut known = self.shared.unique_errors.lock().unwrap();
            if known.iter().any(|seen| *seen == error) {
                return Some(error);
            }
            let id = known.len();
            known.push(error.clone());
            if known.len() >= self.config.nb_known_bugs {
                self.shared.request_stop();
            }
            id
        };
        log::info!("detected new {} error", error.error_name());

        if !from_min {
            self.shared.nb_before_min.fetch_add(1, Ordering::Relaxed);
        }

        let mut report = CrashReport {
            input: input.to_vec(),
            error: error.clone(),
            execution_time_ms: ms(result.elapsed),
            unminimized_size: input.len(),
            nb_steps: 0,
            minimization_time_ms: 0.0,
        };

        if self.config.minimize {
            let started = Instant::now();
            let mut steps = 0usize;
            let target = error.clone();

            report.input = {
                let mut replay = |candidate: &[u8]| {
                    if !self.keep_running() {
                        return ReplayOutcome::Abort;
                    }
                    if let Err(err) = self.execution_input.set_input(candidate) {
                        log::warn!("failed to stage candidate, skipping: {err}");
                        return ReplayOutcome::NotReproduced;
                    }
                    let replayed = match self.execute() {
                        Ok(replayed) => replayed,
                        Err(err) => {
                            log::warn!("failed to replay candidate, skipping: {err}");
                            return ReplayOutcome::NotReproduced;
                        }
                    };
                    if self.oracle.is_same(&target, &replayed) {
                        ReplayOutcome::Reproduced
                    } else {
                        // A different finding surfaced mid-minimization.
                        self.run_and_handle(candidate, &replayed, true);
                        ReplayOutcome::NotReproduced
                    }
                };
                minimize::minimize(input, &mut replay, &mut steps)
            };

            report.nb_steps = steps;
            report.minimization_time_ms = ms(started.elapsed());
            self.shared
                .minimization
                .add_number(report.minimization_time_ms);
            self.shared.minimization_steps.add_number(steps as u32);
        }

        let coverage = self
            .shared
            .greybox
            .as_ref()
            .map(|grey| grey.best_coverage() * 100.0);
        if let Err(err) = report::save_report(&report, id, &self.config.result_dir, coverage) {
            log::error!("failed to save report: {err}");
        }

        Some(error)
    }
}

fn persist_stats(shared: &Shared, fuzzed_prog: &[u8], result_dir: &Path) {
    let snapshot = shared.snapshot(fuzzed_prog.to_vec());
    if let Err(err) = report::save_statistics(&snapshot, result_dir) {
        log::error!("failed to save statistics: {err}");
    }
}

/// Wake every second, persist stats every tenth tick, flush once more on
/// shutdown.
fn spawn_stats_ticker(
    shared: Arc<Shared>,
    fuzzed_prog: Vec<u8>,
    result_dir: PathBuf,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut counter = 0u8;
        while shared.keep_running() {
            thread::sleep(Duration::from_secs(1));
            counter += 1;
            if counter == 10 {
                counter = 0;
                persist_stats(&shared, &fuzzed_prog, &result_dir);
            }
        }
        log::info!("writing one last statistics report before exiting");
        persist_stats(&shared, &fuzzed_prog, &result_dir);
    })
}

/// Flip the stop flag one second before the campaign budget runs out.
fn spawn_deadline_watcher(shared: Arc<Shared>, budget: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        let deadline = budget.saturating_sub(Duration::from_secs(1));
        let started = Instant::now();
        while started.elapsed() < deadline && shared.keep_running() {
            thread::sleep(Duration::from_secs(1));
        }
        shared.request_stop();
        log::info!("time budget reached or everything found, stopping");
    })
}

fn register_stop_signals(shared: &Shared) -> Result<()> {
    for sig in TERM_SIGNALS {
        signal_hook::flag::register(*sig, Arc::clone(&shared.stop))?;
    }
    Ok(())
}

/// Run `body` bracketed by signal registration and the two auxiliary
/// threads; guarantees a final stats flush on every exit path.
fn run_with_background<F>(shared: &Arc<Shared>, config: &FuzzerConfig, body: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    register_stop_signals(shared)?;

    let prog = config
        .fuzzed_prog
        .to_string_lossy()
        .into_owned()
        .into_bytes();
    let ticker = spawn_stats_ticker(Arc::clone(shared), prog, config.result_dir.clone());
    let watcher = spawn_deadline_watcher(Arc::clone(shared), config.timeout);

    let result = body();

    shared.request_stop();
    let _ = ticker.join();
    let _ = watcher.join();
    log::info!("fuzzer done, ready to exit");

    result
}

/// Fuzzer without any feedback from the target: generate, run, classify.
pub struct BlackboxFuzzer {
    engine: Engine,
}

impl BlackboxFuzzer {
    pub fn new(config: FuzzerConfig) -> Result<Self> {
        Ok(Self {
            engine: Engine::new(config, false)?,
        })
    }

    /// Run the fuzzing campaign (blocking).
    pub fn run(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.engine.shared);
        let config = self.engine.config.clone();
        run_with_background(&shared, &config, || {
            self.fuzz();
            Ok(())
        })
    }

    fn fuzz(&mut self) {
        while self.engine.keep_running() {
            let input = generators::random_input(&mut self.engine.rng);

            if let Err(err) = self.engine.execution_input.set_input(&input) {
                log::warn!("failed to stage input, skipping trial: {err}");
                continue;
            }
            let result = match self.engine.execute() {
                Ok(result) => result,
                Err(err) => {
                    log::warn!("failed to run target, skipping trial: {err}");
                    continue;
                }
            };

            self.engine.run_and_handle(&input, &result, false);
        }
    }
}

/// Fuzzer steered by per-run line coverage from an instrumented target.
pub struct GreyboxFuzzer {
    engine: Engine,
    grey: GreyboxConfig,
    queue: Box<dyn SeedQueue>,
    registry: PathRegistry,
    best_coverage: f64,
    seed_dir: PathBuf,
}

impl GreyboxFuzzer {
    pub fn new(config: FuzzerConfig, grey: GreyboxConfig) -> Result<Self> {
        let mut engine = Engine::new(config, true)?;

        let seed_dir = match &grey.seed_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(Error::MissingDir(dir.clone()));
                }
                dir.clone()
            }
            None => {
                let dir = PathBuf::from(SELF_SEED_DIR);
                populate_seed_dir(&dir, SELF_SEED_COUNT, &mut engine.rng)?;
                dir
            }
        };

        Ok(Self {
            queue: grey.schedule.build(),
            registry: PathRegistry::new(),
            best_coverage: 0.0,
            engine,
            grey,
            seed_dir,
        })
    }

    /// Run the fuzzing campaign (blocking).
    pub fn run(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.engine.shared);
        let config = self.engine.config.clone();
        run_with_background(&shared, &config, || self.fuzz())
    }

    fn fuzz(&mut self) -> Result<()> {
        log::info!("executing on empty input to establish baseline coverage");
        if let Err(err) = self.engine.execution_input.set_input(b"") {
            log::warn!("failed to stage empty input: {err}");
        } else if let Err(err) = self.engine.execute() {
            log::warn!("baseline run failed: {err}");
        }
        if let Some((ratio, _)) = self.read_coverage() {
            self.set_best_coverage(ratio);
        }
        log::info!("initial coverage {:.2}%", self.best_coverage * 100.0);

        log::info!("executing initial seeds");
        for entry in fs::read_dir(&self.seed_dir)? {
            if !self.engine.keep_running() {
                break;
            }
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let input = match fs::read(&path) {
                Ok(input) => input,
                Err(err) => {
                    log::warn!("failed to read seed {}: {err}", path.display());
                    continue;
                }
            };
            // Control bytes the report escaper rejects are unsupported.
            if input.is_empty()
                || input
                    .iter()
                    .any(|b| !report::is_json_allowed_or_escapeable(*b))
            {
                continue;
            }
            self.try_seed(None, input, true);
        }
        log::info!("loaded {} seeds", self.queue.len());

        log::info!("mutating");
        while self.engine.keep_running() {
            // Hybrid between greybox and blackbox: sometimes trial a fresh
            // random input instead of mutating an existing seed.
            if self.engine.rng.gen::<f64>() < self.grey.greyness || self.queue.is_empty() {
                let input = generators::random_input(&mut self.engine.rng);
                self.try_seed(None, input, false);
            } else {
                let idx = self.queue.select(&mut self.engine.rng, &self.registry)?;
                self.queue.mark_selected(idx);
                let parent_input = self.queue.get(idx).input.clone();
                let child = self.make_child(parent_input);
                self.try_seed(Some(idx), child, false);
            }
        }

        Ok(())
    }

    /// Derive a child input from a selected seed: either splice other queue
    /// material onto it, or apply a burst of random mutations.
    fn make_child(&mut self, input: Vec<u8>) -> Vec<u8> {
        let mut child = input;
        if self.engine.rng.gen::<f64>() < self.grey.concatenatedness {
            self.mashup(&mut child);
        } else {
            mutators::random_number_of_random_mutants(&mut self.engine.rng, &mut child);
        }
        child
    }

    fn mashup(&mut self, input: &mut Vec<u8>) {
        let pieces = generators::one_plus_exp(&mut self.engine.rng, 0.5);
        for _ in 0..pieces {
            match self.engine.rng.gen_range(0..6) {
                0 => input.push(b'\n'),
                1 => {
                    let digit = generators::random_digit(&mut self.engine.rng);
                    input.push(digit);
                }
                2 => {
                    let ascii = generators::random_ascii(&mut self.engine.rng);
                    input.push(ascii);
                }
                _ => {
                    let pick = self.engine.rng.gen_range(0..self.queue.len());
                    let other = self.queue.get(pick).input.clone();
                    mutators::concat(input, &other);
                }
            }
        }
    }

    /// Execute one candidate, route any finding through the report pipeline,
    /// fold its coverage into the registry and reward the parent seed.
    fn try_seed(&mut self, parent: Option<usize>, mutant: Vec<u8>, always_insert: bool) {
        if let Err(err) = self.engine.execution_input.set_input(&mutant) {
            log::warn!("failed to stage input, skipping trial: {err}");
            if let Some(idx) = parent {
                self.queue.reweigh(idx);
            }
            return;
        }
        let result = match self.engine.execute() {
            Ok(result) => result,
            Err(err) => {
                log::warn!("failed to run target, skipping trial: {err}");
                if let Some(idx) = parent {
                    self.queue.reweigh(idx);
                }
                return;
            }
        };

        let error = self.engine.run_and_handle(&mutant, &result, false);

        // A target killed before flushing leaves no coverage file; that run
        // gets the empty path.
        let (ratio, path) = self
            .read_coverage()
            .unwrap_or_else(|| (0.0, CoveragePath::default()));
        let (path_id, is_new) = self.registry.record(path);

        if let Some(idx) = parent {
            if is_new {
                self.queue.reward_improved(idx);
            }
            self.queue.reweigh(idx);
        }

        if always_insert || is_new {
            self.queue
                .add(Seed::new(mutant, path_id, ms(result.elapsed)));
        }

        if error.is_none() && ratio > self.best_coverage {
            log::info!(
                "coverage improved from {} to {} (nb_runs={})",
                self.best_coverage,
                ratio,
                self.engine.shared.execution.count()
            );
            self.set_best_coverage(ratio);
        }

        self.sync_mirrors();
    }

    /// Read and delete the per-run coverage file. Deleting right away keeps
    /// one run's trace from leaking into the next.
    fn read_coverage(&self) -> Option<(f64, CoveragePath)> {
        let file = &self.grey.coverage_file;
        if !file.exists() {
            return None;
        }
        let text = fs::read_to_string(file);
        if let Err(err) = fs::remove_file(file) {
            log::warn!("failed to delete coverage file: {err}");
        }
        Some(coverage::parse_lcov(&text.ok()?))
    }

    fn set_best_coverage(&mut self, ratio: f64) {
        self.best_coverage = ratio;
        if let Some(grey) = &self.engine.shared.greybox {
            grey.set_best_coverage(ratio);
        }
    }

    fn sync_mirrors(&self) {
        if let Some(grey) = &self.engine.shared.greybox {
            grey.nb_queued_seeds
                .store(self.queue.len(), Ordering::Relaxed);
            grey.nb_unique_paths
                .store(self.registry.unique_paths(), Ordering::Relaxed);
        }
    }
}

fn populate_seed_dir(dir: &Path, count: usize, rng: &mut impl Rng) -> Result<()> {
    log::info!("populating {} with random seeds", dir.display());
    fs::create_dir_all(dir)?;
    for i in 0..count {
        fs::write(dir.join(format!("{i}.txt")), generators::random_input(rng))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(result_dir: &Path, minimize: bool) -> FuzzerConfig {
        FuzzerConfig {
            fuzzed_prog: PathBuf::from("/bin/true"),
            result_dir: result_dir.to_path_buf(),
            minimize,
            input_mode: InputMode::Stdin,
            timeout: Duration::from_secs(60),
            nb_known_bugs: 10,
        }
    }

    fn failing_result(exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            exit_code,
            stdout: None,
            stderr: Vec::new(),
            timed_out: false,
            elapsed: Duration::from_millis(2),
        }
    }

    #[test]
    fn input_mode_parses_the_stdin_literal() {
        assert!(matches!(InputMode::parse("stdin"), InputMode::Stdin));
        match InputMode::parse("/tmp/staged") {
            InputMode::File(path) => assert_eq!(path, PathBuf::from("/tmp/staged")),
            InputMode::Stdin => panic!("expected file mode"),
        }
    }

    #[test]
    fn missing_target_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), false);
        config.fuzzed_prog = PathBuf::from("/nonexistent/target");
        assert!(matches!(
            Engine::new(config, false),
            Err(Error::MissingTarget(_))
        ));
    }

    #[test]
    fn deduplication_is_a_congruence() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path(), false), false).unwrap();

        let first = engine.run_and_handle(b"one", &failing_result(1), false);
        assert_eq!(first, Some(DetectedError::ReturnCode(1)));

        // Equal finding: recognized, but no second report.
        let again = engine.run_and_handle(b"two", &failing_result(1), false);
        assert_eq!(again, Some(DetectedError::ReturnCode(1)));

        // Distinct finding: reported at the next id.
        engine.run_and_handle(b"three", &failing_result(2), false);

        assert!(dir.path().join("crashes/0.json").is_file());
        assert!(dir.path().join("crashes/1.json").is_file());
        assert!(!dir.path().join("crashes/2.json").exists());

        assert_eq!(engine.shared.unique_errors.lock().unwrap().len(), 2);
        assert_eq!(engine.shared.nb_before_min.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn reaching_the_bug_budget_requests_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path(), false);
        config.nb_known_bugs = 1;
        let mut engine = Engine::new(config, false).unwrap();

        assert!(engine.keep_running());
        engine.run_and_handle(b"x", &failing_result(7), false);
        assert!(!engine.keep_running());
    }

    #[test]
    fn clean_results_are_not_findings() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path(), false), false).unwrap();
        assert!(engine
            .run_and_handle(b"ok", &failing_result(0), false)
            .is_none());
        assert!(engine.shared.unique_errors.lock().unwrap().is_empty());
    }

    #[test]
    fn timeouts_file_under_hangs() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(test_config(dir.path(), false), false).unwrap();
        let result = ExecutionResult {
            exit_code: -1,
            timed_out: true,
            ..failing_result(0)
        };
        engine.run_and_handle(b"slow", &result, false);
        assert!(dir.path().join("hangs/0.json").is_file());
    }
}
