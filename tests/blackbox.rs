//! Whole-campaign test of the blackbox fuzzer against `/bin/false`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use kocoumat::fuzzer::{BlackboxFuzzer, FuzzerConfig, InputMode};

#[test]
fn finds_and_reports_the_false_bug() {
    let dir = tempfile::tempdir().unwrap();

    let config = FuzzerConfig {
        fuzzed_prog: PathBuf::from("/bin/false"),
        result_dir: dir.path().to_path_buf(),
        minimize: true,
        input_mode: InputMode::Stdin,
        timeout: Duration::from_secs(60),
        nb_known_bugs: 1,
    };

    BlackboxFuzzer::new(config).unwrap().run().unwrap();

    // /bin/false exits 1 on the very first trial.
    let report = fs::read_to_string(dir.path().join("crashes/0.json")).unwrap();
    assert!(report.starts_with("{\"input\":\""));
    assert!(report.contains("\"oracle\":\"return_code\""));
    assert!(report.contains("\"bug_info\":1,"));
    assert!(report.contains("\"minimization\":{\"unminimized_size\":"));

    // Minimization shrinks the input to a single byte.
    let doc: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(doc["input"].as_str().unwrap().len(), 1);

    // The final flush leaves a stats document behind.
    let stats = fs::read_to_string(dir.path().join("stats.json")).unwrap();
    assert!(stats.starts_with("{\"fuzzer_name\":\"kocoumat\",\"fuzzed_program\":\"/bin/false\""));

    let doc: serde_json::Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(doc["nb_unique_failures"].as_u64(), Some(1));
    assert!(doc["nb_runs"].as_u64().unwrap() >= 1);
    assert!(doc["nb_failed_runs"].as_u64().unwrap() >= 1);
    assert_eq!(doc["nb_hanged_runs"].as_u64(), Some(0));
    assert!(doc.get("nb_queued_seed").is_none());
}
