// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Raw generation speed measurement, no subprocess involved.

use std::hint::black_box;
use std::time::{Duration, Instant};

use statrs::statistics::Statistics;

use crate::errors::GeneratorError;
use crate::report::classify_range;
use crate::rngs::Generator;
use crate::utils::format_with_commas;

/// Words generated per timed inner loop.
pub const N_BASES: usize = 1 << 10;
/// Inner loops per timed replica.
pub const N_TIMES: usize = 1 << 10;
/// Timed replicas per generator.
pub const N_REPLICA: usize = 200;

const NAME_LENGTH: usize = 48;

/// Aggregates elapsed-time samples of a repeated timing trial.
/// Must hold at least one sample before any statistic is read.
pub struct ThroughputRecorder {
    samples_us: Vec<f64>,
}

impl ThroughputRecorder {
    pub fn new() -> Self {
        ThroughputRecorder {
            samples_us: Vec::new(),
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples_us.push(elapsed.as_micros() as f64);
    }

    pub fn arithmetic_mean(&self) -> f64 {
        debug_assert!(!self.samples_us.is_empty());
        self.samples_us.iter().mean()
    }

    pub fn geometric_mean(&self) -> f64 {
        debug_assert!(!self.samples_us.is_empty());
        self.samples_us.iter().geometric_mean()
    }

    /// Sample standard deviation, n-1 divisor.
    pub fn std_dev(&self) -> f64 {
        debug_assert!(!self.samples_us.is_empty());
        self.samples_us.iter().std_dev()
    }

    pub fn describe(&self) -> String {
        let mean = self.arithmetic_mean();
        let sd = self.std_dev();
        format!(
            "gmean: {:>10}; mean/sd: {:>15}",
            format_with_commas(self.geometric_mean().round() as u128),
            format!(
                "{}/{}",
                format_with_commas(mean.round() as u128),
                format_with_commas(sd.round() as u128)
            )
        )
    }
}

impl Default for ThroughputRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Time `replicas` repetitions of a fixed-size draw workload.
pub fn speed_trial(
    generator: &mut dyn Generator,
    replicas: usize,
    draws_per_replica: usize,
) -> Result<ThroughputRecorder, GeneratorError> {
    let mut recorder = ThroughputRecorder::new();
    for _ in 0..replicas {
        let start = Instant::now();
        for _ in 0..draws_per_replica {
            black_box(generator.draw()?);
        }
        recorder.record(start.elapsed());
    }
    Ok(recorder)
}

/// One comparison-table line: padded name with range label, then the
/// elapsed-time summary in microseconds.
pub fn speed_line(name: &str, generator: &mut dyn Generator) -> Result<String, GeneratorError> {
    let recorder = speed_trial(generator, N_REPLICA, N_TIMES * N_BASES)?;
    let label = format!(
        "{}{}",
        name,
        classify_range(generator.min_value(), generator.max_value())
    );
    Ok(format!(
        "{:>width$}: {} us",
        label,
        recorder.describe(),
        width = NAME_LENGTH
    ))
}
