//! Word-sized engine state published to the control context.
//!
//! The engine refreshes these atomics at the end of every render block; the
//! protocol dispatcher reads them to answer status, peak and voice queries
//! without touching engine-owned state. Relaxed ordering is enough: there
//! is a single writer per word and the readers only want a recent value.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::{MAX_AUDIO_TRACKS, MAX_PADS};

pub struct EngineStats {
    pub active_voices: AtomicU32,
    /// Render-time CPU estimate in percent.
    pub cpu_load: AtomicU32,
    pub uptime_ms: AtomicU32,
    /// Bit per pad, set when a sample is loaded.
    pub loaded_mask: AtomicU32,
    pub total_loaded: AtomicU32,
    pub total_sample_bytes: AtomicU32,
    /// Per-track peak meters, f32 bit patterns.
    track_peaks: [AtomicU32; MAX_AUDIO_TRACKS],
    master_peak: AtomicU32,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            active_voices: AtomicU32::new(0),
            cpu_load: AtomicU32::new(0),
            uptime_ms: AtomicU32::new(0),
            loaded_mask: AtomicU32::new(0),
            total_loaded: AtomicU32::new(0),
            total_sample_bytes: AtomicU32::new(0),
            track_peaks: std::array::from_fn(|_| AtomicU32::new(0)),
            master_peak: AtomicU32::new(0),
        }
    }

    pub fn set_track_peak(&self, track: usize, peak: f32) {
        if track < MAX_AUDIO_TRACKS {
            self.track_peaks[track].store(peak.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn track_peak(&self, track: usize) -> f32 {
        if track >= MAX_AUDIO_TRACKS {
            return 0.0;
        }
        f32::from_bits(self.track_peaks[track].load(Ordering::Relaxed))
    }

    /// Destructive read for the peaks poll: returns the meter and zeroes
    /// it, so each poll reports the peak since the previous one. The
    /// master peak is not reset this way.
    pub fn take_track_peak(&self, track: usize) -> f32 {
        if track >= MAX_AUDIO_TRACKS {
            return 0.0;
        }
        f32::from_bits(self.track_peaks[track].swap(0, Ordering::Relaxed))
    }

    pub fn set_master_peak(&self, peak: f32) {
        self.master_peak.store(peak.to_bits(), Ordering::Relaxed);
    }

    pub fn master_peak(&self) -> f32 {
        f32::from_bits(self.master_peak.load(Ordering::Relaxed))
    }

    pub fn pad_loaded(&self, pad: usize) -> bool {
        pad < MAX_PADS && self.loaded_mask.load(Ordering::Relaxed) & (1 << pad) != 0
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}
