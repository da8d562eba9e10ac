// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Continuous streaming of generator output into the consumer process.
//!
//! One session owns one generator and one consumer. A dedicated
//! production thread fills fixed-size batches and pushes them through a
//! [`StreamWriter`]; the session thread closes the pipe, reaps the
//! process and collects its report once production stops. Neither side
//! ever holds more than one batch in memory.

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use tracing::{info, warn};

use crate::consumer::ConsumerProcess;
use crate::errors::GeneratorError;
use crate::report::{classify_range, Outcome, SessionReport};
use crate::rngs::Generator;
use crate::utils::{format_byte_count, format_with_commas};

/// Smallest output range worth streaming. The consumer ingests 32-bit
/// words; anything narrower is defined as invalid input for it, so the
/// session is skipped before any subprocess is started.
pub const MIN_RANGE: u128 = 1 << 32;

/// Default number of 32-bit words per production batch (16 KiB).
pub const BATCH_WORDS: usize = 4096;

/// Writes generated batches into the consumer's input pipe.
///
/// Any write failure is absorbed: a consumer that stops reading mid
/// stream is an expected end of session, not an error. The failure
/// flips the one-way `good` flag, which the production loop polls.
pub struct StreamWriter<'p> {
    consumer: &'p ConsumerProcess,
    good: AtomicBool,
    bytes_transferred: AtomicU64,
}

impl<'p> StreamWriter<'p> {
    pub fn new(consumer: &'p ConsumerProcess) -> Self {
        StreamWriter {
            consumer,
            good: AtomicBool::new(true),
            bytes_transferred: AtomicU64::new(0),
        }
    }

    /// Append one batch. Returns the number of bytes accepted, zero
    /// once the pipeline is no longer live.
    pub fn write(&self, buf: &[u8]) -> usize {
        if !self.is_live() {
            return 0;
        }
        match self.consumer.write_input(buf) {
            Ok(()) => {
                self.bytes_transferred
                    .fetch_add(buf.len() as u64, Ordering::Relaxed);
                buf.len()
            }
            Err(_) => {
                self.stop();
                0
            }
        }
    }

    pub fn stop(&self) {
        self.good.store(false, Ordering::Release);
    }

    /// Sole cancellation signal of the production loop. False as soon
    /// as any of writer flag, process or pipe has gone down; never
    /// becomes true again within a session.
    pub fn is_live(&self) -> bool {
        self.good.load(Ordering::Acquire)
            && self.consumer.is_running()
            && self.consumer.input_open()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }
}

/// Production loop: fill a batch from the generator, hand it to the
/// writer, until the pipeline dies or the generator fails.
///
/// Liveness is polled once per batch, so shutdown latency is bounded
/// by one batch generation.
fn pump(
    generator: &mut dyn Generator,
    writer: &StreamWriter<'_>,
    batch_words: usize,
) -> Result<(), GeneratorError> {
    let mut batch: Vec<u8> = Vec::with_capacity(batch_words * 4);
    while writer.is_live() {
        batch.clear();
        for _ in 0..batch_words {
            batch.extend_from_slice(&generator.draw()?.to_le_bytes());
        }
        writer.write(&batch);
    }
    Ok(())
}

/// One complete run of a single generator against the consumer.
pub struct StreamSession<'a> {
    name: &'a str,
    generator: &'a mut dyn Generator,
    batch_words: usize,
}

impl<'a> StreamSession<'a> {
    pub fn new(name: &'a str, generator: &'a mut dyn Generator, batch_words: usize) -> Self {
        StreamSession {
            name,
            generator,
            batch_words,
        }
    }

    pub fn run(self, consumer_path: &Path) -> SessionReport {
        let min = self.generator.min_value();
        let max = self.generator.max_value();
        let range = (max - min) as u128 + 1;
        let range_label = classify_range(min, max);
        info!("{}: ranged {}.", self.name, format_with_commas(range));

        if range < MIN_RANGE {
            warn!("{}: range too small, skipping.", self.name);
            return SessionReport {
                name: self.name.to_owned(),
                range_label,
                outcome: Outcome::RangeTooSmall,
                bytes_transferred: 0,
                exit_status: None,
                consumer_output: None,
            };
        }

        let mut consumer = match ConsumerProcess::spawn(consumer_path) {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!("{}: {}", self.name, e);
                return SessionReport {
                    name: self.name.to_owned(),
                    range_label,
                    outcome: Outcome::SpawnFailed(e),
                    bytes_transferred: 0,
                    exit_status: None,
                    consumer_output: None,
                };
            }
        };
        info!("{}: subprocess started.", self.name);

        let output_pipe = consumer.take_output();
        let writer = StreamWriter::new(&consumer);
        let generator = self.generator;
        let batch_words = self.batch_words;

        let (pump_result, exit_status, consumer_output) = thread::scope(|s| {
            let producer = s.spawn(|| pump(generator, &writer, batch_words));
            let drain = s.spawn(move || {
                let mut captured = String::new();
                if let Some(mut output) = output_pipe {
                    let _ = output.read_to_string(&mut captured);
                }
                captured
            });
            // Production first, then end-of-input, then reap, then the
            // drained report. Reordering any of these can deadlock.
            let pump_result = producer.join().expect("producer thread panicked");
            consumer.close_input();
            let exit_status = consumer.wait().ok();
            let consumer_output = drain.join().expect("drain thread panicked");
            (pump_result, exit_status, consumer_output)
        });

        let bytes_transferred = writer.bytes_transferred();
        info!(
            "{}: subprocess finished with {} ({} bytes).",
            self.name,
            format_byte_count(bytes_transferred),
            format_with_commas(bytes_transferred as u128)
        );

        let outcome = match pump_result {
            Ok(()) => Outcome::Tested,
            Err(e) => {
                warn!("{}: {}", self.name, e);
                Outcome::GeneratorFailed(e)
            }
        };
        SessionReport {
            name: self.name.to_owned(),
            range_label,
            outcome,
            bytes_transferred,
            exit_status,
            consumer_output: Some(consumer_output),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use super::*;
    use crate::rngs::{splitmix::SplitMix64, testgens};

    /// Write an executable shell stub standing in for the external
    /// suite: reads a bounded prefix of its input, prints a small
    /// report, exits.
    pub fn stub_consumer(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("stub_consumer.sh");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn constant_generator_full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\nhead -c 65536 | wc -c\n");
        let mut generator = testgens::ConstantWord::new(42, 0, u32::MAX as u64);
        let report = StreamSession::new("ConstantWord", &mut generator, BATCH_WORDS).run(&path);

        assert!(matches!(report.outcome, Outcome::Tested));
        assert!(report.bytes_transferred > 0);
        assert_eq!(report.bytes_transferred % 4, 0);
        assert_eq!(report.range_label, "(32 bits)");
        assert!(report.exit_status.unwrap().success());
        assert_eq!(report.consumer_output.unwrap().trim(), "65536");
    }

    #[test]
    fn small_range_skipped_before_any_spawn() {
        // The consumer path does not exist; reaching spawn would turn
        // the outcome into SpawnFailed.
        let mut generator = testgens::ConstantWord::new(7, 0, 255);
        let report = StreamSession::new("TinyRange", &mut generator, BATCH_WORDS)
            .run(Path::new("/nonexistent/no-such-consumer"));

        assert!(matches!(report.outcome, Outcome::RangeTooSmall));
        assert_eq!(report.bytes_transferred, 0);
        assert!(report.consumer_output.is_none());
        assert!(report.exit_status.is_none());
    }

    #[test]
    fn range_boundary_decides_spawn_attempt() {
        let missing = Path::new("/nonexistent/no-such-consumer");
        // One below 2^32: rejected by the gate.
        let mut narrow = testgens::ConstantWord::new(0, 0, u32::MAX as u64 - 1);
        let report = StreamSession::new("Narrow", &mut narrow, BATCH_WORDS).run(missing);
        assert!(matches!(report.outcome, Outcome::RangeTooSmall));
        // Exactly 2^32: passes the gate and reaches (and fails) spawn.
        let mut wide = testgens::ConstantWord::new(0, 0, u32::MAX as u64);
        let report = StreamSession::new("Wide", &mut wide, BATCH_WORDS).run(missing);
        assert!(matches!(report.outcome, Outcome::SpawnFailed(_)));
        assert_eq!(report.bytes_transferred, 0);
    }

    #[test]
    fn producer_stops_after_consumer_exits() {
        let dir = tempfile::tempdir().unwrap();
        // Consumer reads nothing and exits at once; the producer must
        // notice within a batch and the session must come back.
        let path = stub_consumer(dir.path(), "#!/bin/sh\nexit 0\n");
        let mut generator = SplitMix64::new(1);
        let start = std::time::Instant::now();
        let report = StreamSession::new("SplitMix64", &mut generator, BATCH_WORDS).run(&path);
        assert!(matches!(report.outcome, Outcome::Tested));
        assert!(report.exit_status.unwrap().success());
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn consumer_count_never_exceeds_writer_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\nhead -c 131072 | wc -c\n");
        let mut generator = SplitMix64::new(99);
        let report = StreamSession::new("SplitMix64", &mut generator, BATCH_WORDS).run(&path);

        assert!(matches!(report.outcome, Outcome::Tested));
        let reported: u64 = report.consumer_output.unwrap().trim().parse().unwrap();
        assert_eq!(reported, 131072);
        assert!(report.bytes_transferred >= reported);
    }

    #[test]
    fn generator_failure_ends_session_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        // This consumer reads until end-of-input, so only the failing
        // generator can end the session.
        let path = stub_consumer(dir.path(), "#!/bin/sh\ncat >/dev/null\necho done\n");
        let mut generator = testgens::FlakyDevice::new(10000);
        let report = StreamSession::new("FlakyDevice", &mut generator, BATCH_WORDS).run(&path);

        assert!(matches!(report.outcome, Outcome::GeneratorFailed(_)));
        assert!(report.exit_status.unwrap().success());
        assert_eq!(report.consumer_output.unwrap().trim(), "done");
    }

    #[test]
    fn writer_liveness_is_one_way() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\ncat >/dev/null\n");
        let consumer = ConsumerProcess::spawn(&path).unwrap();
        let writer = StreamWriter::new(&consumer);
        assert!(writer.is_live());
        writer.stop();
        for _ in 0..4 {
            assert!(!writer.is_live());
        }
        // A dead writer accepts nothing and the counter stays put.
        assert_eq!(writer.write(b"asdf"), 0);
        assert_eq!(writer.bytes_transferred(), 0);
        consumer.close_input();
        consumer.wait().unwrap();
    }

    #[test]
    fn liveness_follows_consumer_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\nexit 3\n");
        let consumer = ConsumerProcess::spawn(&path).unwrap();
        let writer = StreamWriter::new(&consumer);
        // Give the stub a moment to exit, then the flag must be down
        // and stay down.
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while writer.is_live() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!writer.is_live());
        assert!(!writer.is_live());
        consumer.close_input();
        let status = consumer.wait().unwrap();
        assert_eq!(status.code(), Some(3));
    }
}
