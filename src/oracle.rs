//! Oracles classifying a run result into a finding.
//!
//! Classification order is Timeout > AddressSanitizer > ReturnCode; the
//! first match wins. Equality between findings is the deduplication
//! relation: return codes compare by code, every timeout is the same
//! finding, ASan reports compare by `(kind, file, line)`.

use regex::Regex;

use crate::error::Result;
use crate::exec::ExecutionResult;
use crate::report;

/// Line-number skew introduced by the instrumenter header in greybox mode.
pub const GREYBOX_ASAN_OFFSET: u32 = 4;

/// A classified failure.
#[derive(Debug, Clone)]
pub enum DetectedError {
    ReturnCode(i32),
    Timeout { elapsed_ms: f64 },
    AddressSanitizer { kind: String, file: String, line: u32 },
}

impl PartialEq for DetectedError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ReturnCode(a), Self::ReturnCode(b)) => a == b,
            // All timeouts collapse to one equivalence class.
            (Self::Timeout { .. }, Self::Timeout { .. }) => true,
            (
                Self::AddressSanitizer { kind, file, line },
                Self::AddressSanitizer {
                    kind: other_kind,
                    file: other_file,
                    line: other_line,
                },
            ) => kind == other_kind && file == other_file && line == other_line,
            _ => false,
        }
    }
}

impl Eq for DetectedError {}

impl DetectedError {
    /// Serialized oracle label.
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::ReturnCode(_) => "return_code",
            Self::Timeout { .. } => "timeout",
            Self::AddressSanitizer { .. } => "asan",
        }
    }

    /// Report folder under the result directory.
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "hangs",
            _ => "crashes",
        }
    }

    /// The `bug_info` JSON fragment for crash reports.
    pub fn bug_info(&self) -> String {
        match self {
            Self::ReturnCode(code) => code.to_string(),
            Self::Timeout { elapsed_ms } => report::format_number(*elapsed_ms),
            Self::AddressSanitizer { kind, file, line } => format!(
                "{{\"file\":{},\"line\":{},\"kind\":{}}}",
                report::json_string(file.as_bytes()),
                line,
                report::json_string(kind.as_bytes()),
            ),
        }
    }
}

/// Detector with its regexes compiled once at engine construction.
pub struct Oracle {
    error_type: Regex,
    location: Regex,
    asan_offset: u32,
}

impl Oracle {
    pub fn new(asan_offset: u32) -> Result<Self> {
        Ok(Self {
            error_type: Regex::new("ERROR: AddressSanitizer: (.*) on address")?,
            location: Regex::new(r"(main.c):(\d+)")?,
            asan_offset,
        })
    }

    /// Classify a run result. `None` means the run was unremarkable.
    pub fn detect(&self, result: &ExecutionResult) -> Option<DetectedError> {
        if result.timed_out {
            return Some(DetectedError::Timeout {
                elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
            });
        }

        if result.exit_code == 1 {
            if let Some(asan) = self.detect_asan(&result.stderr) {
                return Some(asan);
            }
        }

        if result.exit_code != 0 {
            return Some(DetectedError::ReturnCode(result.exit_code));
        }

        None
    }

    /// Does `result` reproduce exactly the finding `error`? Used by the
    /// minimizer to check preservation.
    pub fn is_same(&self, error: &DetectedError, result: &ExecutionResult) -> bool {
        self.detect(result).is_some_and(|detected| detected == *error)
    }

    fn detect_asan(&self, stderr: &[u8]) -> Option<DetectedError> {
        let text = String::from_utf8_lossy(stderr);
        let kind_caps = self.error_type.captures(&text)?;
        let loc_caps = self.location.captures(&text)?;

        let kind = match &kind_caps[1] {
            "heap-buffer-overflow" => "heap",
            "stack-buffer-overflow" => "stack",
            "global-buffer-overflow" => "global",
            other => other,
        }
        .to_string();

        let line: u32 = loc_caps[2].parse().ok()?;

        Some(DetectedError::AddressSanitizer {
            kind,
            file: loc_caps[1].to_string(),
            line: line.saturating_sub(self.asan_offset),
        })
    }
}
