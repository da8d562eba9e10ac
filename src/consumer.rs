// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Ownership and lifecycle of the external test-suite process.
//!
//! The suite is an opaque consumer: it reads raw binary words on its
//! standard input until end-of-input and emits a small text report on
//! its standard output. Its standard error is noise and goes to the
//! null sink.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Mutex;

use crate::errors::SpawnError;

pub struct ConsumerProcess {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Option<ChildStdout>,
}

impl ConsumerProcess {
    /// Start the consumer with no arguments, input piped, output
    /// captured, stderr discarded.
    pub fn spawn(path: &Path) -> Result<Self, SpawnError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpawnError {
                path: PathBuf::from(path),
                source,
            })?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        Ok(ConsumerProcess {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout,
        })
    }

    /// Polled liveness. A reaped or unreachable child counts as dead.
    pub fn is_running(&self) -> bool {
        match self.child.lock().expect("child mutex poisoned").try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => false,
        }
    }

    /// Whether the write side of the input pipe is still open.
    pub fn input_open(&self) -> bool {
        self.stdin.lock().expect("stdin mutex poisoned").is_some()
    }

    /// Append bytes to the consumer's input. Blocks when the OS pipe
    /// buffer is full; that blocking is the only flow control.
    pub fn write_input(&self, buf: &[u8]) -> std::io::Result<()> {
        let mut guard = self.stdin.lock().expect("stdin mutex poisoned");
        match guard.as_mut() {
            Some(stdin) => stdin.write_all(buf),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "input already closed",
            )),
        }
    }

    /// Close the write side of the input pipe so the consumer observes
    /// end-of-input. Idempotent: only the first call drops the handle.
    pub fn close_input(&self) {
        drop(self.stdin.lock().expect("stdin mutex poisoned").take());
    }

    /// Take the captured-output handle. Yields the handle exactly once.
    pub fn take_output(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Block until the consumer terminates. Call `close_input` first,
    /// otherwise a consumer waiting for end-of-input never exits.
    pub fn wait(&self) -> std::io::Result<ExitStatus> {
        self.child.lock().expect("child mutex poisoned").wait()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::streaming::tests::stub_consumer;

    #[test]
    fn spawn_missing_executable_fails() {
        let err = ConsumerProcess::spawn(Path::new("/nonexistent/no-such-consumer"));
        assert!(err.is_err());
    }

    #[test]
    fn close_input_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\ncat >/dev/null\n");
        let consumer = ConsumerProcess::spawn(&path).unwrap();
        assert!(consumer.input_open());
        consumer.close_input();
        consumer.close_input();
        assert!(!consumer.input_open());
        let status = consumer.wait().unwrap();
        assert!(status.success());
        assert!(!consumer.is_running());
    }

    #[test]
    fn write_after_close_reports_broken_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(dir.path(), "#!/bin/sh\ncat >/dev/null\n");
        let consumer = ConsumerProcess::spawn(&path).unwrap();
        consumer.close_input();
        assert!(consumer.write_input(b"late").is_err());
        consumer.wait().unwrap();
    }

    #[test]
    fn output_is_captured_and_stderr_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = stub_consumer(
            dir.path(),
            "#!/bin/sh\ncat >/dev/null\necho report line\necho noise >&2\n",
        );
        let mut consumer = ConsumerProcess::spawn(&path).unwrap();
        let mut stdout = consumer.take_output().unwrap();
        assert!(consumer.take_output().is_none());
        consumer.close_input();
        consumer.wait().unwrap();
        let mut captured = String::new();
        stdout.read_to_string(&mut captured).unwrap();
        assert_eq!(captured, "report line\n");
    }
}
