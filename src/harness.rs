// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Run configuration and the session loop.
//!
//! All run state that used to be ambient (results path, consumer
//! location) is explicit configuration here; the results log handle is
//! scoped to the harness and sessions run strictly one at a time.

use std::path::{Path, PathBuf};

use crate::errors::HarnessError;
use crate::report::{ResultsLog, SessionReport};
use crate::rngs::Generator;
use crate::streaming::{StreamSession, BATCH_WORDS};

#[derive(Debug)]
pub struct HarnessConfig {
    pub consumer_path: PathBuf,
    pub results_path: PathBuf,
    pub batch_words: usize,
}

impl HarnessConfig {
    pub fn new(consumer_path: PathBuf, results_path: PathBuf) -> Self {
        HarnessConfig {
            consumer_path,
            results_path,
            batch_words: BATCH_WORDS,
        }
    }
}

/// Resolve a file expected to live next to the harness binary itself.
pub fn sibling_path(file_name: &str) -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(file_name))
}

#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    log: ResultsLog,
}

impl Harness {
    /// Validate the consumer executable and open the results log.
    /// Validation runs first: a configuration error must not leave a
    /// truncated or partially written log behind.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        validate_consumer(&config.consumer_path)?;
        let log =
            ResultsLog::create(&config.results_path).map_err(|source| HarnessError::ResultsLog {
                path: config.results_path.clone(),
                source,
            })?;
        Ok(Harness { config, log })
    }

    /// Run one generator start to finish and append its report.
    /// Whatever happens inside the session stays inside the session;
    /// the caller always gets a report back.
    pub fn run_session(&mut self, name: &str, generator: &mut dyn Generator) -> SessionReport {
        let report = StreamSession::new(name, generator, self.config.batch_words)
            .run(&self.config.consumer_path);
        if let Err(e) = self.log.append(&report) {
            tracing::error!("results log write failed: {}", e);
        }
        report
    }
}

fn validate_consumer(path: &Path) -> Result<(), HarnessError> {
    use std::os::unix::fs::PermissionsExt;
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Err(HarnessError::ConsumerMissing(path.to_owned())),
    };
    if !meta.is_file() || meta.permissions().mode() & 0o111 == 0 {
        return Err(HarnessError::ConsumerNotExecutable(path.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Outcome;
    use crate::rngs::{lcg, testgens};
    use crate::streaming::tests::stub_consumer;

    #[test]
    fn missing_consumer_is_fatal_and_leaves_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("rslt.txt");
        let config = HarnessConfig::new(dir.path().join("no-such-consumer"), results.clone());
        let err = Harness::new(config).unwrap_err();
        assert!(matches!(err, HarnessError::ConsumerMissing(_)));
        assert!(!results.exists());
    }

    #[test]
    fn non_executable_consumer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = dir.path().join("consumer.txt");
        std::fs::write(&consumer, "not a program").unwrap();
        let results = dir.path().join("rslt.txt");
        let config = HarnessConfig::new(consumer, results.clone());
        let err = Harness::new(config).unwrap_err();
        assert!(matches!(err, HarnessError::ConsumerNotExecutable(_)));
        assert!(!results.exists());
    }

    #[test]
    fn sessions_append_to_one_log_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = stub_consumer(dir.path(), "#!/bin/sh\nhead -c 65536 | wc -c\n");
        let results = dir.path().join("rslt.txt");
        let mut harness =
            Harness::new(HarnessConfig::new(consumer, results.clone())).unwrap();

        let mut narrow = lcg::Minstd::new(0);
        let skipped = harness.run_session("Minstd", &mut narrow);
        assert!(matches!(skipped.outcome, Outcome::RangeTooSmall));

        let mut wide = testgens::ConstantWord::new(42, 0, u32::MAX as u64);
        let tested = harness.run_session("ConstantWord", &mut wide);
        assert!(matches!(tested.outcome, Outcome::Tested));

        let contents = std::fs::read_to_string(&results).unwrap();
        let minstd_at = contents.find(">Minstd").unwrap();
        let constant_at = contents.find(">ConstantWord").unwrap();
        assert!(minstd_at < constant_at);
        assert!(contents.contains("Range too small, skipping."));
        assert!(contents.contains("65536"));
    }

    #[test]
    fn new_harness_truncates_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let consumer = stub_consumer(dir.path(), "#!/bin/sh\nhead -c 65536 | wc -c\n");
        let results = dir.path().join("rslt.txt");
        {
            let mut harness = Harness::new(HarnessConfig::new(
                consumer.clone(),
                results.clone(),
            ))
            .unwrap();
            let mut narrow = lcg::Minstd::new(0);
            harness.run_session("Stale", &mut narrow);
        }
        let _harness = Harness::new(HarnessConfig::new(consumer, results.clone())).unwrap();
        let contents = std::fs::read_to_string(&results).unwrap();
        assert!(!contents.contains(">Stale"));
    }
}
