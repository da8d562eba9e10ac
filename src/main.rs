// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Benchmark a collection of PRNGs and stream each one through an
//! external statistical test suite.

pub mod bench;
pub mod consumer;
pub mod errors;
pub mod harness;
pub mod report;
pub mod rngs;
pub mod streaming;
pub mod utils;

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use harness::{Harness, HarnessConfig};

/// Expected to live in the same directory as this binary.
const CONSUMER_EXECUTABLE: &str = "testu01_main";
const RESULTS_FILE: &str = "testu01_results.txt";
const SEED: u64 = 0x5eed;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let start = std::time::Instant::now();

    let consumer_path = match harness::sibling_path(CONSUMER_EXECUTABLE) {
        Ok(path) => path,
        Err(e) => {
            error!("cannot resolve harness location: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut harness = match Harness::new(HarnessConfig::new(consumer_path, RESULTS_FILE.into())) {
        Ok(harness) => harness,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    run_streaming_suite(&mut harness);
    run_speed_comparison();

    info!("full program runtime: {:?}", start.elapsed());
    ExitCode::SUCCESS
}

fn run_streaming_suite(harness: &mut Harness) {
    let mut r = rngs::ReferenceRand::new(SEED);
    harness.run_session("ReferenceRand", &mut r);
    let mut r = rngs::mersenne::Mt19937::new(SEED);
    harness.run_session("Mt19937", &mut r);
    let mut r = rngs::pcg::Pcg32::new(SEED);
    harness.run_session("Pcg32", &mut r);
    let mut r = rngs::pcg::Pcg64::new(SEED);
    harness.run_session("Pcg64", &mut r);
    let mut r = rngs::xoshiro::Xoshiro128PlusPlus::new(SEED);
    harness.run_session("Xoshiro128++", &mut r);
    let mut r = rngs::xoshiro::Xoroshiro128PlusPlus::new(SEED);
    harness.run_session("Xoroshiro128++", &mut r);
    let mut r = rngs::xoshiro::Xoshiro256StarStar::new(SEED);
    harness.run_session("Xoshiro256**", &mut r);
    let mut r = rngs::splitmix::SplitMix32::new(SEED);
    harness.run_session("SplitMix32", &mut r);
    let mut r = rngs::splitmix::SplitMix64::new(SEED);
    harness.run_session("SplitMix64", &mut r);
    let mut r = rngs::sfc::Sfc32::new(SEED);
    harness.run_session("Sfc32", &mut r);
    let mut r = rngs::sfc::Sfc64::new(SEED);
    harness.run_session("Sfc64", &mut r);
    let mut r = rngs::sfc::Jsf32::new(SEED);
    harness.run_session("Jsf32", &mut r);
    let mut r = rngs::arc4::Arc4Rand32::new(SEED);
    harness.run_session("Arc4Rand32", &mut r);
    let mut r = rngs::lcg::Lehmer64::new(SEED);
    harness.run_session("Lehmer64", &mut r);
    // Rejected by the range gate, kept in the roster so the skip path
    // shows up in every results file.
    let mut r = rngs::lcg::Minstd::new(SEED);
    harness.run_session("Minstd", &mut r);
    let mut r = rngs::device::DumbDevice::new(SEED);
    harness.run_session("DumbDevice", &mut r);
    match rngs::device::DeviceRand::open_default() {
        Ok(mut r) => {
            harness.run_session("DeviceRand", &mut r);
        }
        Err(e) => warn!("DeviceRand: {}", e),
    }
}

fn print_speed_line(name: &str, generator: &mut dyn rngs::Generator) {
    match bench::speed_line(name, generator) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("{}: {}", name, e),
    }
}

fn run_speed_comparison() {
    let mut r = rngs::ReferenceRand::new(SEED);
    print_speed_line("ReferenceRand", &mut r);
    let mut r = rngs::mersenne::Mt19937::new(SEED);
    print_speed_line("Mt19937", &mut r);
    let mut r = rngs::pcg::Pcg32::new(SEED);
    print_speed_line("Pcg32", &mut r);
    let mut r = rngs::pcg::Pcg64::new(SEED);
    print_speed_line("Pcg64", &mut r);
    let mut r = rngs::xoshiro::Xoshiro128PlusPlus::new(SEED);
    print_speed_line("Xoshiro128++", &mut r);
    let mut r = rngs::xoshiro::Xoroshiro128PlusPlus::new(SEED);
    print_speed_line("Xoroshiro128++", &mut r);
    let mut r = rngs::xoshiro::Xoshiro256StarStar::new(SEED);
    print_speed_line("Xoshiro256**", &mut r);
    let mut r = rngs::splitmix::SplitMix32::new(SEED);
    print_speed_line("SplitMix32", &mut r);
    let mut r = rngs::splitmix::SplitMix64::new(SEED);
    print_speed_line("SplitMix64", &mut r);
    let mut r = rngs::sfc::Sfc32::new(SEED);
    print_speed_line("Sfc32", &mut r);
    let mut r = rngs::sfc::Sfc64::new(SEED);
    print_speed_line("Sfc64", &mut r);
    let mut r = rngs::sfc::Jsf32::new(SEED);
    print_speed_line("Jsf32", &mut r);
    let mut r = rngs::arc4::Arc4Rand32::new(SEED);
    print_speed_line("Arc4Rand32", &mut r);
    let mut r = rngs::lcg::Lehmer64::new(SEED);
    print_speed_line("Lehmer64", &mut r);
    let mut r = rngs::lcg::Minstd::new(SEED);
    print_speed_line("Minstd", &mut r);
    match rngs::device::DeviceRand::open_default() {
        Ok(mut r) => print_speed_line("DeviceRand", &mut r),
        Err(e) => warn!("DeviceRand: {}", e),
    }
}
