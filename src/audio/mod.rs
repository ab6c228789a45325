//! Sidetone synthesis.
//!
//! - Sine LUT + 32-bit phase accumulator for frequency control
//! - Linear amplitude slew for anti-click key edges
//!
//! Audio device selection and output belong to the host application.

pub mod lut;
pub mod sidetone;

pub use lut::{sine_table, LUT_SIZE};
pub use sidetone::SidetoneGen;
