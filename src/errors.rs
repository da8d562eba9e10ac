// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Error types for the test harness.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. Any of these abort the whole run
/// before a single session is started.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("consumer executable not found: {}", .0.display())]
    ConsumerMissing(PathBuf),
    #[error("consumer is not a regular executable file: {}", .0.display())]
    ConsumerNotExecutable(PathBuf),
    #[error("results log {}: {source}", path.display())]
    ResultsLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to start the consumer process. Recorded per session,
/// never aborts the remaining sessions.
#[derive(Debug, Error)]
#[error("failed to spawn {}: {source}", path.display())]
pub struct SpawnError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A generator backed by an external entropy source failed to read.
/// Fatal to the session that owns the generator, nothing else.
#[derive(Debug, Error)]
#[error("entropy source {path}: {source}")]
pub struct GeneratorError {
    pub path: String,
    #[source]
    pub source: io::Error,
}
