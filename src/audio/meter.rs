use std::sync::atomic::{AtomicU32, Ordering};

use crate::shared::{MAX_TRACKS, METER_DECIMATION, MIN_METER_DB};

/// Last-writer-wins per-track level storage, f32 dB stored as raw bits.
///
/// Written only by the render callback, read only by the display path.
/// No locking; the display just wants whatever the most recent value was.
pub struct MeterBank {
    levels: [AtomicU32; MAX_TRACKS],
}

impl MeterBank {
    pub fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| AtomicU32::new(f32::NEG_INFINITY.to_bits())),
        }
    }

    pub fn publish(&self, track: usize, db: f32) {
        if track < MAX_TRACKS {
            self.levels[track].store(db.to_bits(), Ordering::Relaxed);
        }
    }

    /// Raw level; may be -inf or NaN for silence.
    pub fn level_db(&self, track: usize) -> f32 {
        if track < MAX_TRACKS {
            f32::from_bits(self.levels[track].load(Ordering::Relaxed))
        } else {
            f32::NEG_INFINITY
        }
    }

    /// Level clamped for display; non-finite reads as the floor.
    pub fn display_db(&self, track: usize) -> f32 {
        let db = self.level_db(track);
        if db.is_finite() { db.max(MIN_METER_DB) } else { MIN_METER_DB }
    }

    pub fn reset(&self) {
        for l in &self.levels {
            l.store(f32::NEG_INFINITY.to_bits(), Ordering::Relaxed);
        }
    }
}

/// Decimated mean square over one channel of an interleaved buffer range.
/// Every 10th frame only; full-resolution RMS is not worth the callback time.
/// Returns None when the decimated range is empty.
pub fn decimated_mean_square(
    data: &[f32],
    channels: usize,
    channel: usize,
    frame_start: usize,
    frame_count: usize,
) -> Option<f32> {
    if channels == 0 || channel >= channels {
        return None;
    }
    let total_frames = data.len() / channels;
    let end = (frame_start + frame_count).min(total_frames);
    let mut sum = 0.0f32;
    let mut n = 0u32;
    let mut f = frame_start;
    while f < end {
        let s = data[f * channels + channel];
        sum += s * s;
        n += 1;
        f += METER_DECIMATION;
    }
    if n == 0 { None } else { Some(sum / n as f32) }
}

/// Mean square to decibels. -inf for silence is expected; callers treat
/// non-finite as the minimum display level.
pub fn mean_square_to_db(ms: f32) -> f32 {
    20.0 * ms.sqrt().log10()
}
