//! Derives the cycle ratios the rest of the core schedules against.
//!
//! Everything downstream of the CPU (APU mixer, PSG sweep/envelope/length
//! timers) is specified in terms of a fixed reference frequency rather than
//! raw CPU cycles. Centralizing the division here means a non-default CPU
//! clock (used by a couple of test fixtures) propagates everywhere without
//! hunting down scattered constants.

/// GBA main CPU clock, in Hz.
pub const DEFAULT_CPU_FREQUENCY: u64 = 16_777_216;

/// Output sample rate of the APU mixer.
pub const AUDIO_SAMPLE_RATE: u64 = 32_768;

/// The "GB cycle" unit legacy PSG timing math is expressed in (4 CPU cycles).
const CPU_CYCLES_PER_GB_CYCLE: u64 = 4;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Clock {
    cpu_frequency: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            cpu_frequency: DEFAULT_CPU_FREQUENCY,
        }
    }
}

impl Clock {
    #[must_use]
    pub const fn with_cpu_frequency(cpu_frequency: u64) -> Self {
        Self { cpu_frequency }
    }

    #[must_use]
    pub const fn cpu_frequency(&self) -> u64 {
        self.cpu_frequency
    }

    /// CPU cycles between two successive `ApuSampleOutput` events.
    #[must_use]
    pub const fn cpu_cycles_per_sample(&self) -> u64 {
        self.cpu_frequency / AUDIO_SAMPLE_RATE
    }

    #[must_use]
    pub const fn cpu_cycles_per_gb_cycle(&self) -> u64 {
        CPU_CYCLES_PER_GB_CYCLE
    }

    /// Envelope step period: 64 Hz reference divided by the pace field.
    #[must_use]
    pub const fn cpu_cycles_per_envelope_sweep(&self) -> u64 {
        self.cpu_frequency / 64
    }

    /// Frequency-sweep step period: 128 Hz reference.
    #[must_use]
    pub const fn cpu_cycles_per_frequency_sweep(&self) -> u64 {
        self.cpu_frequency / 128
    }

    /// Sound-length step period: 256 Hz reference.
    #[must_use]
    pub const fn cpu_cycles_per_sound_length(&self) -> u64 {
        self.cpu_frequency / 256
    }

    /// CPU cycles in one full 228-line frame.
    #[must_use]
    pub const fn cpu_cycles_per_frame(&self) -> u64 {
        228 * 1232
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_sample_period_matches_32768hz() {
        let clock = Clock::default();
        assert_eq!(clock.cpu_cycles_per_sample(), 512);
    }

    #[test]
    fn frame_length_matches_228_scanlines() {
        assert_eq!(Clock::default().cpu_cycles_per_frame(), 280_896);
    }
}
