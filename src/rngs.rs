// Copyright 2025 N. Dornseif
//
// Dual-licensed under Apache 2.0 and MIT terms.

//! Implementation of various rngs.
//! All implement the Generator interface: draw one 32-bit word and
//! report the value range of the underlying algorithm.

use rand::{RngCore, SeedableRng};

use crate::errors::GeneratorError;

/// Narrow capability interface the harness calls on any generator.
///
/// `min_value`/`max_value` are constant for the life of the instance and
/// describe the output range of the underlying algorithm, not of the
/// 32-bit stream word. The range is `max - min + 1`, computed in u128 by
/// callers so a full 64-bit span does not overflow.
///
/// Generators move into the session's production thread, hence `Send`.
pub trait Generator: Send {
    /// Produce the next 32-bit stream word and advance the state.
    /// Only device-backed generators can fail.
    fn draw(&mut self) -> Result<u32, GeneratorError>;
    /// Smallest value the underlying algorithm can produce.
    fn min_value(&self) -> u64;
    /// Largest value the underlying algorithm can produce.
    fn max_value(&self) -> u64;
}

/// The rand crates StdRng, used as the baseline everything else is
/// compared against.
pub struct ReferenceRand {
    rng: rand::rngs::StdRng,
}

impl ReferenceRand {
    pub fn new(seed: u64) -> Self {
        ReferenceRand {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl Generator for ReferenceRand {
    fn draw(&mut self) -> Result<u32, GeneratorError> {
        Ok(self.rng.next_u32())
    }

    fn min_value(&self) -> u64 {
        0
    }

    fn max_value(&self) -> u64 {
        u64::MAX
    }
}

/// SplitMix, the usual state-expansion workhorse.
/// Other generators here seed their state arrays through it.
pub mod splitmix {
    use super::{Generator, GeneratorError};

    #[derive(Debug, Copy, Clone)]
    pub struct SplitMix64 {
        state: u64,
    }

    impl SplitMix64 {
        pub fn new(seed: u64) -> Self {
            SplitMix64 { state: seed }
        }

        pub fn next_u64(&mut self) -> u64 {
            self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
            let mut z = self.state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            z ^ (z >> 31)
        }
    }

    impl Generator for SplitMix64 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct SplitMix32 {
        state: u32,
    }

    impl SplitMix32 {
        pub fn new(seed: u64) -> Self {
            SplitMix32 { state: seed as u32 }
        }
    }

    impl Generator for SplitMix32 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            self.state = self.state.wrapping_add(0x9e3779b9);
            let mut z = self.state;
            z = (z ^ (z >> 16)).wrapping_mul(0x85ebca6b);
            z = (z ^ (z >> 13)).wrapping_mul(0xc2b2ae35);
            Ok(z ^ (z >> 16))
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}

/// Classic 32-bit Mersenne Twister.
pub mod mersenne {
    use super::{Generator, GeneratorError};

    const N: usize = 624;
    const M: usize = 397;
    const MATRIX_A: u32 = 0x9908b0df;
    const UPPER_MASK: u32 = 0x80000000;
    const LOWER_MASK: u32 = 0x7fffffff;

    pub struct Mt19937 {
        mt: [u32; N],
        index: usize,
    }

    impl Mt19937 {
        pub fn new(seed: u64) -> Self {
            let mut mt = [0u32; N];
            mt[0] = seed as u32;
            for i in 1..N {
                mt[i] = 1812433253u32
                    .wrapping_mul(mt[i - 1] ^ (mt[i - 1] >> 30))
                    .wrapping_add(i as u32);
            }
            Mt19937 { mt, index: N }
        }

        fn twist(&mut self) {
            for i in 0..N {
                let x = (self.mt[i] & UPPER_MASK) | (self.mt[(i + 1) % N] & LOWER_MASK);
                let mut xa = x >> 1;
                if x & 1 != 0 {
                    xa ^= MATRIX_A;
                }
                self.mt[i] = self.mt[(i + M) % N] ^ xa;
            }
            self.index = 0;
        }
    }

    impl Generator for Mt19937 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            if self.index >= N {
                self.twist();
            }
            let mut y = self.mt[self.index];
            self.index += 1;
            y ^= y >> 11;
            y ^= (y << 7) & 0x9d2c5680;
            y ^= (y << 15) & 0xefc60000;
            Ok(y ^ (y >> 18))
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}

/// PCG family (O'Neill). Constants match the reference C implementation.
pub mod pcg {
    use super::splitmix::SplitMix64;
    use super::{Generator, GeneratorError};

    const PCG32_MULT: u64 = 6364136223846793005;
    const PCG64_MULT: u128 = 0x2360ed051fc65da44385df649fccf645;

    #[derive(Debug, Copy, Clone)]
    pub struct Pcg32 {
        state: u64,
        inc: u64,
    }

    impl Pcg32 {
        pub fn new(seed: u64) -> Self {
            let mut sm = SplitMix64::new(seed);
            let initstate = sm.next_u64();
            let initseq = sm.next_u64();
            Self::new_with(initstate, initseq)
        }

        /// Seeding procedure from the reference implementation.
        pub fn new_with(initstate: u64, initseq: u64) -> Self {
            let mut rng = Pcg32 {
                state: 0,
                inc: (initseq << 1) | 1,
            };
            rng.step();
            rng.state = rng.state.wrapping_add(initstate);
            rng.step();
            rng
        }

        fn step(&mut self) {
            self.state = self.state.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);
        }
    }

    impl Generator for Pcg32 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            let oldstate = self.state;
            self.step();
            // XSH RR output function, uses old state for max ILP
            let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
            let rot = (oldstate >> 59) as u32;
            Ok(xorshifted.rotate_right(rot))
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Pcg64 {
        state: u128,
        inc: u128,
    }

    impl Pcg64 {
        pub fn new(seed: u64) -> Self {
            let mut sm = SplitMix64::new(seed);
            let initstate = ((sm.next_u64() as u128) << 64) | sm.next_u64() as u128;
            let initseq = ((sm.next_u64() as u128) << 64) | sm.next_u64() as u128;
            let mut rng = Pcg64 {
                state: 0,
                inc: (initseq << 1) | 1,
            };
            rng.step();
            rng.state = rng.state.wrapping_add(initstate);
            rng.step();
            rng
        }

        fn step(&mut self) {
            self.state = self.state.wrapping_mul(PCG64_MULT).wrapping_add(self.inc);
        }

        fn next_u64(&mut self) -> u64 {
            self.step();
            // XSL RR
            let xored = ((self.state >> 64) as u64) ^ (self.state as u64);
            let rot = (self.state >> 122) as u32;
            xored.rotate_right(rot)
        }
    }

    impl Generator for Pcg64 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }
}

/// Blackman/Vigna shift-register generators.
pub mod xoshiro {
    use super::splitmix::SplitMix64;
    use super::{Generator, GeneratorError};

    fn seed_u32x4(seed: u64) -> [u32; 4] {
        let mut sm = SplitMix64::new(seed);
        let a = sm.next_u64();
        let b = sm.next_u64();
        [a as u32, (a >> 32) as u32, b as u32, (b >> 32) as u32]
    }

    fn seed_u64x2(seed: u64) -> [u64; 2] {
        let mut sm = SplitMix64::new(seed);
        [sm.next_u64(), sm.next_u64()]
    }

    fn seed_u64x4(seed: u64) -> [u64; 4] {
        let mut sm = SplitMix64::new(seed);
        [sm.next_u64(), sm.next_u64(), sm.next_u64(), sm.next_u64()]
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Xoshiro128PlusPlus {
        s: [u32; 4],
    }

    impl Xoshiro128PlusPlus {
        pub fn new(seed: u64) -> Self {
            Xoshiro128PlusPlus { s: seed_u32x4(seed) }
        }
    }

    impl Generator for Xoshiro128PlusPlus {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            let result = self.s[0]
                .wrapping_add(self.s[3])
                .rotate_left(7)
                .wrapping_add(self.s[0]);
            let t = self.s[1] << 9;
            self.s[2] ^= self.s[0];
            self.s[3] ^= self.s[1];
            self.s[1] ^= self.s[2];
            self.s[0] ^= self.s[3];
            self.s[2] ^= t;
            self.s[3] = self.s[3].rotate_left(11);
            Ok(result)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Xoroshiro128PlusPlus {
        s: [u64; 2],
    }

    impl Xoroshiro128PlusPlus {
        pub fn new(seed: u64) -> Self {
            Xoroshiro128PlusPlus { s: seed_u64x2(seed) }
        }

        fn next_u64(&mut self) -> u64 {
            let s0 = self.s[0];
            let mut s1 = self.s[1];
            let result = s0.wrapping_add(s1).rotate_left(17).wrapping_add(s0);
            s1 ^= s0;
            self.s[0] = s0.rotate_left(49) ^ s1 ^ (s1 << 21);
            self.s[1] = s1.rotate_left(28);
            result
        }
    }

    impl Generator for Xoroshiro128PlusPlus {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Xoshiro256StarStar {
        s: [u64; 4],
    }

    impl Xoshiro256StarStar {
        pub fn new(seed: u64) -> Self {
            Xoshiro256StarStar { s: seed_u64x4(seed) }
        }

        fn next_u64(&mut self) -> u64 {
            let result = self.s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
            let t = self.s[1] << 17;
            self.s[2] ^= self.s[0];
            self.s[3] ^= self.s[1];
            self.s[1] ^= self.s[2];
            self.s[0] ^= self.s[3];
            self.s[2] ^= t;
            self.s[3] = self.s[3].rotate_left(45);
            result
        }
    }

    impl Generator for Xoshiro256StarStar {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }
}

/// Chaotic generators: sfc (PractRand) and Jenkins small fast.
pub mod sfc {
    use super::splitmix::SplitMix64;
    use super::{Generator, GeneratorError};

    #[derive(Debug, Copy, Clone)]
    pub struct Sfc32 {
        a: u32,
        b: u32,
        c: u32,
        counter: u32,
    }

    impl Sfc32 {
        pub fn new(seed: u64) -> Self {
            let mut sm = SplitMix64::new(seed);
            let ab = sm.next_u64();
            let mut rng = Sfc32 {
                a: ab as u32,
                b: (ab >> 32) as u32,
                c: sm.next_u64() as u32,
                counter: 1,
            };
            for _ in 0..12 {
                rng.next_u32();
            }
            rng
        }

        fn next_u32(&mut self) -> u32 {
            let tmp = self.a.wrapping_add(self.b).wrapping_add(self.counter);
            self.counter = self.counter.wrapping_add(1);
            self.a = self.b ^ (self.b >> 9);
            self.b = self.c.wrapping_add(self.c << 3);
            self.c = self.c.rotate_left(21).wrapping_add(tmp);
            tmp
        }
    }

    impl Generator for Sfc32 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u32())
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Sfc64 {
        a: u64,
        b: u64,
        c: u64,
        counter: u64,
    }

    impl Sfc64 {
        pub fn new(seed: u64) -> Self {
            let mut sm = SplitMix64::new(seed);
            let mut rng = Sfc64 {
                a: sm.next_u64(),
                b: sm.next_u64(),
                c: sm.next_u64(),
                counter: 1,
            };
            for _ in 0..12 {
                rng.next_u64();
            }
            rng
        }

        fn next_u64(&mut self) -> u64 {
            let tmp = self.a.wrapping_add(self.b).wrapping_add(self.counter);
            self.counter = self.counter.wrapping_add(1);
            self.a = self.b ^ (self.b >> 11);
            self.b = self.c.wrapping_add(self.c << 3);
            self.c = self.c.rotate_left(24).wrapping_add(tmp);
            tmp
        }
    }

    impl Generator for Sfc64 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Jsf32 {
        a: u32,
        b: u32,
        c: u32,
        d: u32,
    }

    impl Jsf32 {
        pub fn new(seed: u64) -> Self {
            let s = seed as u32;
            let mut rng = Jsf32 {
                a: 0xf1ea5eed,
                b: s,
                c: s,
                d: s,
            };
            for _ in 0..20 {
                rng.next_u32();
            }
            rng
        }

        fn next_u32(&mut self) -> u32 {
            let e = self.a.wrapping_sub(self.b.rotate_left(27));
            self.a = self.b ^ self.c.rotate_left(17);
            self.b = self.c.wrapping_add(self.d);
            self.c = self.d.wrapping_add(e);
            self.d = e.wrapping_add(self.a);
            self.d
        }
    }

    impl Generator for Jsf32 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u32())
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}

// Linear congruential generators
pub mod lcg {
    use super::splitmix::SplitMix64;
    use super::{Generator, GeneratorError};

    #[derive(Debug, Copy, Clone)]
    pub struct Lehmer64 {
        state: u128,
    }

    impl Lehmer64 {
        pub fn new(seed: u64) -> Self {
            let mut sm = SplitMix64::new(seed);
            // Multiplicative generator, the state must stay odd.
            let state = ((sm.next_u64() as u128) << 64 | sm.next_u64() as u128) | 1;
            Lehmer64 { state }
        }

        fn next_u64(&mut self) -> u64 {
            self.state = self.state.wrapping_mul(0xda942042e4dd58b5);
            (self.state >> 64) as u64
        }
    }

    impl Generator for Lehmer64 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.next_u64() as u32)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u64::MAX
        }
    }

    /// Lehmer generator modulo the Mersenne prime 2^31-1.
    /// Its reduced output space gets it rejected before any
    /// subprocess is started.
    #[derive(Debug, Copy, Clone)]
    pub struct Minstd {
        state: u32,
    }

    const MINSTD_M: u64 = 2147483647;

    impl Minstd {
        pub fn new(seed: u64) -> Self {
            let state = (seed % MINSTD_M) as u32;
            Minstd {
                state: if state == 0 { 1 } else { state },
            }
        }
    }

    impl Generator for Minstd {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            self.state = ((self.state as u64 * 48271) % MINSTD_M) as u32;
            Ok(self.state)
        }

        fn min_value(&self) -> u64 {
            1
        }

        fn max_value(&self) -> u64 {
            MINSTD_M - 1
        }
    }
}

/// ARC4 keystream used as a generator, four keystream bytes per word.
pub mod arc4 {
    use super::{Generator, GeneratorError};

    pub struct Arc4Rand32 {
        s: [u8; 256],
        i: u8,
        j: u8,
    }

    impl Arc4Rand32 {
        pub fn new(seed: u64) -> Self {
            let key = seed.to_le_bytes();
            let mut s = [0u8; 256];
            for (idx, slot) in s.iter_mut().enumerate() {
                *slot = idx as u8;
            }
            let mut j = 0u8;
            for i in 0..256 {
                j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
                s.swap(i, j as usize);
            }
            Arc4Rand32 { s, i: 0, j: 0 }
        }

        fn next_byte(&mut self) -> u8 {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
            self.s[k as usize]
        }
    }

    impl Generator for Arc4Rand32 {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            let bytes = [
                self.next_byte(),
                self.next_byte(),
                self.next_byte(),
                self.next_byte(),
            ];
            Ok(u32::from_le_bytes(bytes))
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}

/// Generators backed by a character device instead of arithmetic.
pub mod device {
    use std::fs::File;
    use std::io::Read;

    use super::{Generator, GeneratorError};

    /// Reads words straight from an entropy device.
    /// The only generator whose draw can fail.
    pub struct DeviceRand {
        stream: File,
        path: String,
    }

    impl DeviceRand {
        pub fn open_default() -> std::io::Result<Self> {
            Self::open("/dev/urandom")
        }

        pub fn open(path: &str) -> std::io::Result<Self> {
            Ok(DeviceRand {
                stream: File::open(path)?,
                path: path.to_owned(),
            })
        }
    }

    impl Generator for DeviceRand {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            let mut word = [0u8; 4];
            self.stream
                .read_exact(&mut word)
                .map_err(|source| GeneratorError {
                    path: self.path.clone(),
                    source,
                })?;
            Ok(u32::from_le_bytes(word))
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }

    /// Claims the full 32-bit range but only ever produces zero.
    /// Useful as a worst case the external suite must reject.
    pub struct DumbDevice;

    impl DumbDevice {
        pub fn new(_seed: u64) -> Self {
            DumbDevice
        }
    }

    impl Generator for DumbDevice {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(0)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}

/// Degenerate generators used to exercise the harness itself.
pub mod testgens {
    use super::{Generator, GeneratorError};

    /// Always draws the same word, with configurable claimed bounds.
    pub struct ConstantWord {
        word: u32,
        min: u64,
        max: u64,
    }

    impl ConstantWord {
        pub fn new(word: u32, min: u64, max: u64) -> Self {
            ConstantWord { word, min, max }
        }
    }

    impl Generator for ConstantWord {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            Ok(self.word)
        }

        fn min_value(&self) -> u64 {
            self.min
        }

        fn max_value(&self) -> u64 {
            self.max
        }
    }

    /// Draws successfully a fixed number of times, then fails like an
    /// exhausted entropy device.
    pub struct FlakyDevice {
        remaining: usize,
    }

    impl FlakyDevice {
        pub fn new(good_draws: usize) -> Self {
            FlakyDevice {
                remaining: good_draws,
            }
        }
    }

    impl Generator for FlakyDevice {
        fn draw(&mut self) -> Result<u32, GeneratorError> {
            if self.remaining == 0 {
                return Err(GeneratorError {
                    path: "flaky-device".to_owned(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "device exhausted",
                    ),
                });
            }
            self.remaining -= 1;
            Ok(0x5eed5eed)
        }

        fn min_value(&self) -> u64 {
            0
        }

        fn max_value(&self) -> u64 {
            u32::MAX as u64
        }
    }
}
