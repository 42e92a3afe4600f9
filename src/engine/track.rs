//! Per-track mixer strip: filter/distortion/bitcrush parameters applied at
//! the voice, then a track-level chain of echo -> flanger -> compressor ->
//! 3-band EQ, plus sends, pan, mute and solo.

use crate::audio::delays::TrackEcho;
use crate::audio::dsp::DistortionMode;
use crate::audio::dynamics::Compressor;
use crate::audio::filters::{Biquad, BiquadCoeffs, FilterType};
use crate::audio::modfx::Flanger;

pub const EQ_LOW_HZ: f32 = 200.0;
pub const EQ_MID_HZ: f32 = 1000.0;
pub const EQ_HIGH_HZ: f32 = 4000.0;

const TRACK_FLANGER_BUF: usize = 2048;
// Track flanger sweeps up to ~9 ms
const TRACK_FLANGER_SWEEP: f32 = 400.0;

pub struct TrackFx {
    pub filter_type: FilterType,
    pub filter_coeffs: BiquadCoeffs,
    pub dist_drive: f32,
    pub dist_mode: DistortionMode,
    pub bit_depth: u8,

    eq_low: Biquad,
    eq_mid: Biquad,
    eq_high: Biquad,
    pub eq_low_db: i8,
    pub eq_mid_db: i8,
    pub eq_high_db: i8,

    pub echo: TrackEcho,
    pub flanger: Flanger,
    pub compressor: Compressor,

    pub reverb_send: f32,
    pub delay_send: f32,
    pub chorus_send: f32,
    pub gain: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,

    sr: f32,
}

impl TrackFx {
    pub fn new(sr: f32) -> Self {
        Self {
            filter_type: FilterType::None,
            filter_coeffs: BiquadCoeffs::identity(),
            dist_drive: 0.0,
            dist_mode: DistortionMode::Soft,
            bit_depth: 16,
            eq_low: Biquad::identity(),
            eq_mid: Biquad::identity(),
            eq_high: Biquad::identity(),
            eq_low_db: 0,
            eq_mid_db: 0,
            eq_high_db: 0,
            echo: TrackEcho::new((0.2 * sr) as usize, sr),
            flanger: Flanger::new(TRACK_FLANGER_BUF, TRACK_FLANGER_SWEEP, sr),
            compressor: Compressor::new_track(sr),
            reverb_send: 0.0,
            delay_send: 0.0,
            chorus_send: 0.0,
            gain: 1.0,
            pan: 0.0,
            mute: false,
            solo: false,
            sr,
        }
    }

    pub fn set_filter(&mut self, kind: FilterType, cutoff: f32, resonance: f32, gain_db: f32) {
        self.filter_type = kind;
        self.filter_coeffs = BiquadCoeffs::cookbook(kind, cutoff, resonance, gain_db, self.sr);
    }

    pub fn clear_filter(&mut self) {
        self.filter_type = FilterType::None;
        self.filter_coeffs = BiquadCoeffs::identity();
    }

    pub fn set_eq_low(&mut self, db: i8) {
        self.eq_low_db = db;
        self.eq_low
            .set(FilterType::LowShelf, EQ_LOW_HZ, 0.707, db as f32, self.sr);
    }

    pub fn set_eq_mid(&mut self, db: i8) {
        self.eq_mid_db = db;
        self.eq_mid
            .set(FilterType::Peaking, EQ_MID_HZ, 1.0, db as f32, self.sr);
    }

    pub fn set_eq_high(&mut self, db: i8) {
        self.eq_high_db = db;
        self.eq_high
            .set(FilterType::HighShelf, EQ_HIGH_HZ, 0.707, db as f32, self.sr);
    }

    pub fn clear_live_fx(&mut self) {
        self.echo.clear();
        self.flanger.set_active(false);
        self.compressor.set_active(false);
    }

    pub fn clear_all_fx(&mut self) {
        self.clear_filter();
        self.dist_drive = 0.0;
        self.dist_mode = DistortionMode::Soft;
        self.bit_depth = 16;
        self.clear_live_fx();
        self.eq_low_db = 0;
        self.eq_mid_db = 0;
        self.eq_high_db = 0;
        self.eq_low.reset();
        self.eq_mid.reset();
        self.eq_high.reset();
        self.reverb_send = 0.0;
        self.delay_send = 0.0;
        self.chorus_send = 0.0;
        self.pan = 0.0;
        self.mute = false;
        self.solo = false;
    }

    /// Track-level chain on the summed track signal.
    pub fn process(&mut self, input: f32) -> f32 {
        use crate::audio::AudioProcessor;

        let mut s = input;
        if self.echo.active {
            s = self.echo.process(s);
        }
        if self.flanger.active {
            s = self.flanger.process_track(s);
        }
        if self.compressor.active {
            s = self.compressor.process(s);
        }
        // Each EQ band is bypassed at 0 dB
        if self.eq_low_db != 0 {
            s = self.eq_low.process(s);
        }
        if self.eq_mid_db != 0 {
            s = self.eq_mid.process(s);
        }
        if self.eq_high_db != 0 {
            s = self.eq_high.process(s);
        }
        s
    }
}
