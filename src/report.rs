//! Crash reports and the statistics document.
//!
//! Inputs are arbitrary byte strings, so their JSON rendering uses an
//! explicit escaper: bytes outside `[8, 126]` (and the vertical tab) become
//! `\u00XX`, the usual control characters use their short escapes, and
//! everything else is emitted literally. The pre-rendered fragments are
//! embedded into the serde documents through [`RawValue`].

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::value::RawValue;

use crate::error::Result;
use crate::oracle::DetectedError;

/// Can this byte survive the JSON escaper? Seed files containing anything
/// else are rejected outright.
pub fn is_json_allowed_or_escapeable(byte: u8) -> bool {
    !(byte > 126 || byte < 8 || byte == 11 || (14..32).contains(&byte))
}

fn escape_into(out: &mut String, byte: u8) {
    if byte > 126 || byte < 8 || byte == 11 || (14..32).contains(&byte) {
        let _ = write!(out, "\\u00{byte:02X}");
        return;
    }
    match byte {
        b'\x08' => out.push_str("\\b"),
        b'\t' => out.push_str("\\t"),
        b'\n' => out.push_str("\\n"),
        b'\x0c' => out.push_str("\\f"),
        b'\r' => out.push_str("\\r"),
        b'"' => out.push_str("\\\""),
        b'\\' => out.push_str("\\\\"),
        other => out.push(other as char),
    }
}

/// Render a byte string as a quoted JSON string fragment.
pub fn json_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for byte in bytes {
        escape_into(&mut out, *byte);
    }
    out.push('"');
    out
}

/// Format a float the way the reports expect: whole values print without a
/// fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Everything a per-bug report carries.
#[derive(Debug, Clone)]
pub struct CrashReport {
    pub input: Vec<u8>,
    pub error: DetectedError,
    pub execution_time_ms: f64,
    pub unminimized_size: usize,
    pub nb_steps: usize,
    pub minimization_time_ms: f64,
}

#[derive(Serialize)]
struct MinimizationDoc {
    unminimized_size: usize,
    nb_steps: usize,
    execution_time: f64,
}

#[derive(Serialize)]
struct ReportDoc<'a> {
    input: &'a RawValue,
    oracle: &'a str,
    bug_info: &'a RawValue,
    execution_time: f64,
    minimization: MinimizationDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<f64>,
}

/// Serialize one crash report. `coverage` is the greybox fuzzer's best
/// observed coverage, in percent.
pub fn render_report(report: &CrashReport, coverage: Option<f64>) -> Result<String> {
    let input = RawValue::from_string(json_string(&report.input))?;
    let bug_info = RawValue::from_string(report.error.bug_info())?;

    let doc = ReportDoc {
        input: &input,
        oracle: report.error.error_name(),
        bug_info: &bug_info,
        execution_time: report.execution_time_ms,
        minimization: MinimizationDoc {
            unminimized_size: report.unminimized_size,
            nb_steps: report.nb_steps,
            execution_time: report.minimization_time_ms,
        },
        coverage,
    };

    Ok(serde_json::to_string(&doc)?)
}

/// Persist a report as `<id>.json` inside the finding's folder.
pub fn save_report(
    report: &CrashReport,
    id: usize,
    result_dir: &Path,
    coverage: Option<f64>,
) -> Result<()> {
    let rendered = render_report(report, coverage)?;

    let folder = result_dir.join(report.error.folder());
    fs::create_dir_all(&folder)?;
    fs::write(folder.join(format!("{id}.json")), &rendered)?;

    log::info!("new error report: {rendered}");
    Ok(())
}

/// Aggregate statistics of one execution-time-like series.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TimeStatsDoc {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize)]
struct MinimizationStatsDoc {
    before: usize,
    avg_steps: i64,
    execution_time: TimeStatsDoc,
}

/// Greybox-only statistics fields.
#[derive(Debug, Clone, Copy)]
pub struct GreyboxStatsSnapshot {
    pub nb_queued_seed: usize,
    pub coverage_percent: f64,
    pub nb_unique_hash: usize,
}

/// One consistent view of the campaign, taken by the stats ticker.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub fuzzer_name: &'static str,
    pub fuzzed_program: Vec<u8>,
    pub nb_runs: usize,
    pub nb_failed_runs: usize,
    pub nb_hanged_runs: usize,
    pub execution_time: TimeStatsDoc,
    pub nb_unique_failures: usize,
    pub nb_before_min: usize,
    pub avg_steps: f64,
    pub minimization_time: TimeStatsDoc,
    pub greybox: Option<GreyboxStatsSnapshot>,
}

#[derive(Serialize)]
struct StatsDoc<'a> {
    fuzzer_name: &'a str,
    fuzzed_program: &'a RawValue,
    nb_runs: usize,
    nb_failed_runs: usize,
    nb_hanged_runs: usize,
    execution_time: TimeStatsDoc,
    nb_unique_failures: usize,
    minimization: MinimizationStatsDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    nb_queued_seed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nb_unique_hash: Option<usize>,
}

pub fn render_statistics(snapshot: &StatsSnapshot) -> Result<String> {
    let fuzzed_program = RawValue::from_string(json_string(&snapshot.fuzzed_program))?;

    let doc = StatsDoc {
        fuzzer_name: snapshot.fuzzer_name,
        fuzzed_program: &fuzzed_program,
        nb_runs: snapshot.nb_runs,
        nb_failed_runs: snapshot.nb_failed_runs,
        nb_hanged_runs: snapshot.nb_hanged_runs,
        execution_time: snapshot.execution_time,
        nb_unique_failures: snapshot.nb_unique_failures,
        minimization: MinimizationStatsDoc {
            before: snapshot.nb_before_min,
            avg_steps: snapshot.avg_steps.round() as i64,
            execution_time: snapshot.minimization_time,
        },
        nb_queued_seed: snapshot.greybox.map(|g| g.nb_queued_seed),
        coverage: snapshot.greybox.map(|g| g.coverage_percent),
        nb_unique_hash: snapshot.greybox.map(|g| g.nb_unique_hash),
    };

    Ok(serde_json::to_string(&doc)?)
}

/// Overwrite `stats.json` in the result directory.
pub fn save_statistics(snapshot: &StatsSnapshot, result_dir: &Path) -> Result<()> {
    let rendered = render_statistics(snapshot)?;
    fs::write(result_dir.join("stats.json"), rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_and_high_bytes() {
        assert_eq!(json_string(b"test"), "\"test\"");
        assert_eq!(json_string(b"a\tb\nc"), "\"a\\tb\\nc\"");
        assert_eq!(json_string(b"\x08\x0c\r"), "\"\\b\\f\\r\"");
        assert_eq!(json_string(b"q\"u\\o"), "\"q\\\"u\\\\o\"");
        assert_eq!(json_string(&[0x0b]), "\"\\u000B\"");
        assert_eq!(json_string(&[0x7f]), "\"\\u007F\"");
        assert_eq!(json_string(&[0x01, 0x1f, 0xff]), "\"\\u0001\\u001F\\u00FF\"");
    }

    #[test]
    fn allowed_byte_set_matches_the_escaper() {
        for byte in 0u8..=255 {
            let allowed = matches!(byte, 8..=10 | 12 | 13 | 32..=126);
            assert_eq!(is_json_allowed_or_escapeable(byte), allowed, "byte {byte}");
        }
    }

    #[test]
    fn whole_floats_print_without_fraction() {
        assert_eq!(format_number(1000.0), "1000");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1.25), "1.25");
    }

    #[test]
    fn report_document_matches_expected_layout() {
        let report = CrashReport {
            input: b"test".to_vec(),
            error: DetectedError::AddressSanitizer {
                kind: "heap".into(),
                file: "main.c".into(),
                line: 30,
            },
            execution_time_ms: 1.25,
            unminimized_size: 42,
            nb_steps: 123,
            minimization_time_ms: 12.75,
        };

        let rendered = render_report(&report, None).unwrap();
        assert_eq!(
            rendered,
            "{\"input\":\"test\",\"oracle\":\"asan\",\"bug_info\":{\"file\":\"main.c\",\"line\":30,\"kind\":\"heap\"},\
             \"execution_time\":1.25,\"minimization\":{\"unminimized_size\":42,\"nb_steps\":123,\"execution_time\":12.75}}"
        );
    }

    #[test]
    fn greybox_reports_append_coverage() {
        let report = CrashReport {
            input: b"x".to_vec(),
            error: DetectedError::ReturnCode(1),
            execution_time_ms: 2.0,
            unminimized_size: 1,
            nb_steps: 0,
            minimization_time_ms: 0.0,
        };

        let rendered = render_report(&report, Some(62.5)).unwrap();
        assert!(rendered.starts_with("{\"input\":\"x\",\"oracle\":\"return_code\",\"bug_info\":1,"));
        assert!(rendered.ends_with(",\"coverage\":62.5}"));
    }

    #[test]
    fn saved_report_lands_in_the_oracle_folder() {
        let dir = tempfile::tempdir().unwrap();
        let crash = CrashReport {
            input: b"in".to_vec(),
            error: DetectedError::ReturnCode(3),
            execution_time_ms: 1.0,
            unminimized_size: 2,
            nb_steps: 0,
            minimization_time_ms: 0.0,
        };
        let hang = CrashReport {
            error: DetectedError::Timeout { elapsed_ms: 1000.0 },
            ..crash.clone()
        };

        save_report(&crash, 0, dir.path(), None).unwrap();
        save_report(&hang, 1, dir.path(), None).unwrap();

        assert!(dir.path().join("crashes/0.json").is_file());
        assert!(dir.path().join("hangs/1.json").is_file());
    }

    #[test]
    fn stats_document_has_all_mandatory_fields() {
        let times = TimeStatsDoc {
            average: 1.5,
            median: 1.0,
            min: 0.5,
            max: 3.0,
        };
        let snapshot = StatsSnapshot {
            fuzzer_name: "kocoumat",
            fuzzed_program: b"/bin/false".to_vec(),
            nb_runs: 6,
            nb_failed_runs: 6,
            nb_hanged_runs: 0,
            execution_time: times,
            nb_unique_failures: 1,
            nb_before_min: 1,
            avg_steps: 3.4,
            minimization_time: times,
            greybox: None,
        };

        let rendered = render_statistics(&snapshot).unwrap();
        assert!(rendered.starts_with(
            "{\"fuzzer_name\":\"kocoumat\",\"fuzzed_program\":\"/bin/false\",\"nb_runs\":6,\
             \"nb_failed_runs\":6,\"nb_hanged_runs\":0"
        ));
        assert!(rendered.contains("\"minimization\":{\"before\":1,\"avg_steps\":3,"));
        assert!(!rendered.contains("nb_queued_seed"));

        let grey = StatsSnapshot {
            greybox: Some(GreyboxStatsSnapshot {
                nb_queued_seed: 7,
                coverage_percent: 85.7,
                nb_unique_hash: 4,
            }),
            ..snapshot
        };
        let rendered = render_statistics(&grey).unwrap();
        assert!(rendered.contains("\"nb_queued_seed\":7"));
        assert!(rendered.contains("\"coverage\":85.7"));
        assert!(rendered.ends_with("\"nb_unique_hash\":4}"));
    }
}
