// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Per-session reports and the append-only results log.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;

use crate::errors::{GeneratorError, SpawnError};

/// How a session ended. Every session produces exactly one of these.
#[derive(Debug)]
pub enum Outcome {
    Tested,
    RangeTooSmall,
    SpawnFailed(SpawnError),
    GeneratorFailed(GeneratorError),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Tested => write!(f, "tested"),
            Outcome::RangeTooSmall => write!(f, "skipped: range too small"),
            Outcome::SpawnFailed(e) => write!(f, "spawn failed: {}", e),
            Outcome::GeneratorFailed(e) => write!(f, "generator failed: {}", e),
        }
    }
}

/// Immutable record of one generator's session.
#[derive(Debug)]
pub struct SessionReport {
    pub name: String,
    pub range_label: String,
    pub outcome: Outcome,
    pub bytes_transferred: u64,
    pub exit_status: Option<ExitStatus>,
    /// Verbatim consumer stdout, present only when a process ran.
    pub consumer_output: Option<String>,
}

/// Human-readable label for a generator's output range.
pub fn classify_range(min: u64, max: u64) -> String {
    let range = (max - min) as u128 + 1;
    if range == 1u128 << 32 {
        "(32 bits)".to_owned()
    } else if range == 1u128 << 48 {
        "(48 bits)".to_owned()
    } else if min == 0 && max == u64::MAX {
        "(64 bits)".to_owned()
    } else {
        format!("({}, {})", min, max)
    }
}

/// The single results file shared by all sessions of a run.
/// Truncated once on creation, appended to afterwards.
#[derive(Debug)]
pub struct ResultsLog {
    file: File,
}

impl ResultsLog {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(
            file,
            "# crushbench run {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(ResultsLog { file })
    }

    /// Append one session entry: a `>name` header followed by the
    /// skip/error line or the verbatim consumer report.
    pub fn append(&mut self, report: &SessionReport) -> std::io::Result<()> {
        writeln!(self.file, ">{}", report.name)?;
        match &report.outcome {
            Outcome::RangeTooSmall => {
                writeln!(self.file, "Range too small, skipping.")?;
            }
            Outcome::SpawnFailed(e) => {
                writeln!(self.file, "Spawn failed: {}", e)?;
            }
            Outcome::GeneratorFailed(e) => {
                writeln!(self.file, "Generator failed: {}", e)?;
                if let Some(output) = &report.consumer_output {
                    if !output.is_empty() {
                        self.file.write_all(output.as_bytes())?;
                    }
                }
            }
            Outcome::Tested => {
                if let Some(output) = &report.consumer_output {
                    self.file.write_all(output.as_bytes())?;
                }
                if let Some(status) = report.exit_status {
                    if !status.success() {
                        writeln!(self.file, "Consumer exited abnormally: {}", status)?;
                    }
                }
            }
        }
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_labels() {
        assert_eq!(classify_range(0, u32::MAX as u64), "(32 bits)");
        assert_eq!(classify_range(0, (1u64 << 48) - 1), "(48 bits)");
        assert_eq!(classify_range(0, u64::MAX), "(64 bits)");
        assert_eq!(classify_range(1, 2147483646), "(1, 2147483646)");
        // Offset ranges of power-of-two width still classify by width.
        assert_eq!(classify_range(5, (1u64 << 32) + 4), "(32 bits)");
    }

    #[test]
    fn outcome_strings() {
        assert_eq!(Outcome::Tested.to_string(), "tested");
        assert_eq!(
            Outcome::RangeTooSmall.to_string(),
            "skipped: range too small"
        );
    }

    #[test]
    fn log_truncates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rslt.txt");
        {
            let mut log = ResultsLog::create(&path).unwrap();
            log.append(&SessionReport {
                name: "stale".to_owned(),
                range_label: "(32 bits)".to_owned(),
                outcome: Outcome::RangeTooSmall,
                bytes_transferred: 0,
                exit_status: None,
                consumer_output: None,
            })
            .unwrap();
        }
        let mut log = ResultsLog::create(&path).unwrap();
        log.append(&SessionReport {
            name: "Minstd".to_owned(),
            range_label: "(1, 2147483646)".to_owned(),
            outcome: Outcome::RangeTooSmall,
            bytes_transferred: 0,
            exit_status: None,
            consumer_output: None,
        })
        .unwrap();
        log.append(&SessionReport {
            name: "Mt19937".to_owned(),
            range_label: "(32 bits)".to_owned(),
            outcome: Outcome::Tested,
            bytes_transferred: 65536,
            exit_status: None,
            consumer_output: Some("All tests were passed\n".to_owned()),
        })
        .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains(">stale"));
        assert!(contents.starts_with("# crushbench run "));
        assert!(contents.contains(">Minstd\nRange too small, skipping.\n"));
        assert!(contents.contains(">Mt19937\nAll tests were passed\n"));
    }
}
