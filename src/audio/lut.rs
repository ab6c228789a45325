//! Sine lookup table for sidetone synthesis.
//!
//! 256 entries covering one cycle, full i16 amplitude. Built once at first
//! use; the hot path is a plain indexed read.

use std::sync::OnceLock;

/// Number of entries in the sine table.
pub const LUT_SIZE: usize = 256;

static TABLE: OnceLock<[i16; LUT_SIZE]> = OnceLock::new();

/// One full sine cycle: index 0 = 0°, 64 = 90°, 128 = 180°, 192 = 270°.
pub fn sine_table() -> &'static [i16; LUT_SIZE] {
    TABLE.get_or_init(|| {
        let mut table = [0i16; LUT_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            let angle = (i as f64) * std::f64::consts::TAU / (LUT_SIZE as f64);
            *slot = (angle.sin() * 32767.0).round() as i16;
        }
        table
    })
}
