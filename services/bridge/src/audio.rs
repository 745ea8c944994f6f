//! Coarse audio level estimation for diagnostics.
//!
//! Purely informational: nothing downstream branches on the result except
//! log lines, and removing the calls would not change bridge behavior.

/// Every Nth sample contributes to the estimate, to keep the per-frame cost
/// negligible on the hot path.
pub const LEVEL_STRIDE: usize = 10;

/// Frames whose level exceeds this are worth a diagnostic log line.
pub const LEVEL_LOG_THRESHOLD: f32 = 100.0;

/// Mean absolute sample value of a PCM16LE frame, sampled at
/// [`LEVEL_STRIDE`]. Returns 0.0 for frames too short to sample.
pub fn frame_level(frame: &[u8]) -> f32 {
    let mut sum: u64 = 0;
    let mut count: u32 = 0;
    for chunk in frame.chunks_exact(2).step_by(LEVEL_STRIDE) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        sum += u64::from(sample.unsigned_abs());
        count += 1;
    }
    if count == 0 { 0.0 } else { sum as f32 / count as f32 }
}
