//! Sidetone sample synthesis.
//!
//! The operator's real-time feedback: a sine tone mirroring the key state.
//! Frequency comes from a 32-bit phase accumulator over the sine table; the
//! amplitude envelope is a linear slew toward the keyed target, which gives
//! the same anti-click ramp on key-down and key-up without a separate fade
//! state machine.
//!
//! Device output stays with the host application; this type only renders
//! samples.

use super::lut::{sine_table, LUT_SIZE};

/// Full-scale envelope level (Q16).
const LEVEL_FULL: u32 = 0x1_0000;

/// Renders sidetone samples from the key state.
pub struct SidetoneGen {
    /// Phase accumulator; top 8 bits index the sine table.
    phase: u32,
    /// Phase increment per sample.
    step: u32,
    sample_rate: u32,
    /// Current envelope level, 0..=LEVEL_FULL (Q16).
    level: u32,
    /// Level change per sample while ramping.
    ramp_step: u32,
}

impl SidetoneGen {
    /// Create a generator.
    ///
    /// `ramp_samples` is the anti-click ramp length, e.g. 40 samples for
    /// 5 ms at 8 kHz.
    pub fn new(freq_hz: u32, sample_rate: u32, ramp_samples: u16) -> Self {
        let ramp = ramp_samples.max(1) as u32;
        Self {
            phase: 0,
            step: phase_step(freq_hz, sample_rate),
            sample_rate,
            level: 0,
            // Round up so `ramp_samples` steps always reach full scale.
            ramp_step: LEVEL_FULL.div_ceil(ramp),
        }
    }

    /// Change the tone frequency. Phase is preserved, so there is no click.
    pub fn set_frequency(&mut self, freq_hz: u32) {
        self.step = phase_step(freq_hz, self.sample_rate);
    }

    /// True while the envelope is fully closed.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.level == 0
    }

    /// Current envelope level, 0 (silent) to 65536 (full).
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Render the next sample for the given key state.
    #[inline]
    pub fn next_sample(&mut self, key_down: bool) -> i16 {
        // Slew the envelope toward the keyed target.
        let target = if key_down { LEVEL_FULL } else { 0 };
        if self.level < target {
            self.level = (self.level + self.ramp_step).min(LEVEL_FULL);
        } else if self.level > target {
            self.level = self.level.saturating_sub(self.ramp_step);
        }

        if self.level == 0 {
            // Keep the oscillator parked so a new element starts at phase 0.
            self.phase = 0;
            return 0;
        }

        let idx = (self.phase >> 24) as usize % LUT_SIZE;
        self.phase = self.phase.wrapping_add(self.step);

        let raw = sine_table()[idx] as i32;
        ((raw * self.level as i32) >> 16) as i16
    }

    /// Render a whole buffer for one key state.
    pub fn render(&mut self, key_down: bool, out: &mut [i16]) {
        for slot in out.iter_mut() {
            *slot = self.next_sample(key_down);
        }
    }

    /// Reset to silence (e.g. after a fault or disconnect).
    pub fn reset(&mut self) {
        self.phase = 0;
        self.level = 0;
    }
}

/// Phase increment for the target frequency: `freq * 2^32 / sample_rate`.
#[inline]
fn phase_step(freq_hz: u32, sample_rate: u32) -> u32 {
    (((freq_hz as u64) << 32) / sample_rate.max(1) as u64) as u32
}
