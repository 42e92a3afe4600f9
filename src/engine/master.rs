//! Master FX chain, a fixed-order pipeline over the mix bus plus the three
//! send buses.

use crate::audio::delays::MasterDelay;
use crate::audio::dsp::{bit_crush, distort, soft_clip_knee, DistortionMode};
use crate::audio::dynamics::{Compressor, Wavefolder};
use crate::audio::filters::{Biquad, FilterType};
use crate::audio::modfx::{Chorus, Flanger, Phaser, Tremolo};
use crate::audio::reverbs::FdnReverb;
use crate::audio::{AudioProcessor, StereoAudioProcessor};

const MASTER_FLANGER_BUF: usize = 4096;
const MASTER_FLANGER_SWEEP: f32 = 200.0;

pub struct MasterFx {
    pub filter_type: FilterType,
    pub filter_cutoff: f32,
    pub filter_q: f32,
    filter_l: Biquad,
    filter_r: Biquad,
    pub bit_depth: u8,
    pub dist_drive: f32,
    pub dist_mode: DistortionMode,

    pub sr_reduce_target: u32,
    sr_hold_l: f32,
    sr_hold_r: f32,
    sr_counter: u32,

    pub delay: MasterDelay,
    pub compressor: Compressor,
    pub wavefolder: Wavefolder,
    pub phaser: Phaser,
    pub flanger: Flanger,
    pub tremolo: Tremolo,
    pub chorus: Chorus,
    pub reverb: FdnReverb,
    pub reverb_active: bool,
    pub limiter_active: bool,

    sr: f32,
}

impl MasterFx {
    pub fn new(sr: f32) -> Self {
        Self {
            filter_type: FilterType::None,
            filter_cutoff: 10_000.0,
            filter_q: 0.707,
            filter_l: Biquad::identity(),
            filter_r: Biquad::identity(),
            bit_depth: 16,
            dist_drive: 0.0,
            dist_mode: DistortionMode::Soft,
            sr_reduce_target: 0,
            sr_hold_l: 0.0,
            sr_hold_r: 0.0,
            sr_counter: 0,
            delay: MasterDelay::new(2.0, sr),
            compressor: Compressor::new(sr),
            wavefolder: Wavefolder::new(),
            phaser: Phaser::new(sr),
            flanger: Flanger::new(MASTER_FLANGER_BUF, MASTER_FLANGER_SWEEP, sr),
            tremolo: Tremolo::new(sr),
            chorus: Chorus::new(sr),
            reverb: FdnReverb::new(sr),
            reverb_active: false,
            limiter_active: false,
            sr,
        }
    }

    pub fn set_filter(&mut self, kind: FilterType, cutoff: f32, q: f32) {
        self.filter_type = kind;
        self.filter_cutoff = cutoff.clamp(20.0, 20_000.0);
        self.filter_q = q.clamp(0.3, 10.0);
        self.update_filter();
    }

    pub fn set_filter_cutoff(&mut self, cutoff: f32) {
        self.filter_cutoff = cutoff.clamp(20.0, 20_000.0);
        self.update_filter();
    }

    pub fn set_filter_resonance(&mut self, q: f32) {
        self.filter_q = q.clamp(0.3, 10.0);
        self.update_filter();
    }

    fn update_filter(&mut self) {
        if self.filter_type == FilterType::None {
            self.filter_l.reset();
            self.filter_r.reset();
            return;
        }
        self.filter_l
            .set(self.filter_type, self.filter_cutoff, self.filter_q, 0.0, self.sr);
        self.filter_r
            .set(self.filter_type, self.filter_cutoff, self.filter_q, 0.0, self.sr);
    }

    pub fn set_sr_reduce(&mut self, target: u32) {
        self.sr_reduce_target = target;
        self.sr_counter = 0;
    }

    /// One frame through the whole chain. `delay_send`, `chorus_send` and
    /// `reverb_send` are the per-frame sums of the track send buses.
    pub fn process(
        &mut self,
        mut l: f32,
        mut r: f32,
        delay_send: f32,
        chorus_send: f32,
        reverb_send: f32,
    ) -> (f32, f32) {
        // 1. Global filter, independent stereo state
        if self.filter_type != FilterType::None {
            l = self.filter_l.process(l);
            r = self.filter_r.process(r);
        }

        // 2. + 3. Global bitcrush, distortion
        l = bit_crush(l, self.bit_depth);
        r = bit_crush(r, self.bit_depth);
        l = distort(l, self.dist_drive, self.dist_mode);
        r = distort(r, self.dist_drive, self.dist_mode);

        // 4. Sample-rate reduction: hold the last sampled value
        if self.sr_reduce_target > 0 && self.sr_reduce_target < self.sr as u32 {
            let decimation = (self.sr as u32 / self.sr_reduce_target).max(1);
            self.sr_counter += 1;
            if self.sr_counter >= decimation {
                self.sr_counter = 0;
                self.sr_hold_l = l;
                self.sr_hold_r = r;
            }
            l = self.sr_hold_l;
            r = self.sr_hold_r;
        }

        // 5. Delay with the delay send bus folded into the ring; the mono
        // wet tap is crossfaded into both channels
        if self.delay.active {
            let wet = self.delay.tick(l, delay_send);
            let mix = self.delay.mix;
            l = l * (1.0 - mix) + wet * mix;
            r = r * (1.0 - mix) + wet * mix;
        }

        // 6. Compressor
        if self.compressor.active {
            l = self.compressor.process(l);
            r = self.compressor.process(r);
        }

        // 7. Wavefolder
        if !self.wavefolder.is_bypassed() {
            l = self.wavefolder.process(l);
            r = self.wavefolder.process(r);
        }

        // 8. Phaser on the left path, partially blended into the right for
        // stereo width
        if self.phaser.active {
            let wet = self.phaser.process(l);
            l = wet;
            r = r * 0.7 + wet * 0.3;
        }

        // 9. Flanger, mono wet tap into both channels
        if self.flanger.active {
            let wet = self.flanger.tick(l);
            let mix = self.flanger.mix;
            l = l * (1.0 - mix) + wet * mix;
            r = r * (1.0 - mix) + wet * mix;
        }

        // 10. Tremolo
        if self.tremolo.active {
            let g = self.tremolo.gain();
            l *= g;
            r *= g;
        }

        // 11. Chorus, fed the chorus send bus
        if self.chorus.active {
            let wet = self.chorus.process(l + chorus_send);
            let mix = self.chorus.mix;
            l = l * (1.0 - mix) + wet * mix;
            r = r * (1.0 - mix) + wet * mix;
        }

        // 12. Reverb, fed the reverb send bus on both channels
        if self.reverb_active {
            let (rev_l, rev_r) = self.reverb.process_stereo(l + reverb_send, r + reverb_send);
            let mix = self.reverb.mix;
            l = l * (1.0 - mix) + rev_l * mix;
            r = r * (1.0 - mix) + rev_r * mix;
        }

        // 13. Limiter, or tanh as the fallback clip
        if self.limiter_active {
            l = l.clamp(-1.0, 1.0);
            r = r.clamp(-1.0, 1.0);
        } else {
            l = l.tanh();
            r = r.tanh();
        }

        // 14. Final knee soft clip
        (soft_clip_knee(l), soft_clip_knee(r))
    }

    pub fn reset(&mut self) {
        let sr = self.sr;
        *self = MasterFx::new(sr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_idle_chain_passes_small_signals_nearly_unchanged() {
        let mut master = MasterFx::new(SR);
        // tanh compresses slightly, so check closeness rather than equality
        let y = master.process(0.1, -0.1, 0.0, 0.0, 0.0);
        assert!((y.0 - 0.1).abs() < 0.001);
        assert!((y.1 + 0.1).abs() < 0.001);
    }

    #[test]
    fn test_sr_reduce_at_engine_rate_is_identity() {
        let mut master = MasterFx::new(SR);
        master.set_sr_reduce(SR as u32);
        master.limiter_active = true; // bypass tanh shaping
        for i in 0..1000 {
            let x = (i as f32 * 0.013).sin() * 0.5;
            let (l, _) = master.process(x, x, 0.0, 0.0, 0.0);
            assert_eq!(l, x, "target == sr must be bit-identical");
        }
    }

    #[test]
    fn test_sr_reduce_holds_samples() {
        let mut master = MasterFx::new(SR);
        master.set_sr_reduce(SR as u32 / 4);
        master.limiter_active = true;

        let mut distinct = std::collections::BTreeSet::new();
        for i in 0..64 {
            let x = i as f32 / 64.0;
            let (l, _) = master.process(x, x, 0.0, 0.0, 0.0);
            distinct.insert((l * 1_000_000.0) as i64);
        }
        println!("distinct held values over 64 frames: {}", distinct.len());
        assert!(
            distinct.len() <= 17,
            "4x decimation should hold each value ~4 frames, got {} distinct",
            distinct.len()
        );
    }

    #[test]
    fn test_output_is_bounded_with_everything_on() {
        let mut master = MasterFx::new(SR);
        master.set_filter(FilterType::Lowpass, 2000.0, 2.0);
        master.bit_depth = 8;
        master.dist_drive = 1.0;
        master.set_sr_reduce(12_000);
        master.delay.set_active(true);
        master.compressor.set_active(true);
        master.wavefolder.set_gain(4.0);
        master.phaser.set_active(true);
        master.flanger.set_active(true);
        master.tremolo.active = true;
        master.chorus.set_active(true);
        master.reverb_active = true;

        for i in 0..48_000 {
            let x = (i as f32 * 0.21).sin() * 3.0;
            let (l, r) = master.process(x, x, 0.3, 0.3, 0.3);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() <= 1.0 && r.abs() <= 1.0, "final clip must bound output");
        }
    }

    #[test]
    fn test_global_filter_clear_resets_state() {
        let mut master = MasterFx::new(SR);
        master.set_filter(FilterType::Lowpass, 400.0, 5.0);
        for i in 0..1000 {
            master.process((i as f32 * 0.3).sin(), 0.0, 0.0, 0.0, 0.0);
        }
        master.set_filter(FilterType::None, 400.0, 5.0);
        master.limiter_active = true;
        let (l, _) = master.process(0.25, 0.25, 0.0, 0.0, 0.0);
        assert_eq!(l, 0.25, "cleared filter must be a straight wire");
    }
}
