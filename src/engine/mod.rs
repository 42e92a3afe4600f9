//! The audio-context runtime: voice rendering, pad/track/master chains,
//! queue draining and meter publishing.

pub mod master;
pub mod pad;
pub mod sample;
pub mod sidechain;
pub mod stats;
pub mod track;
pub mod voice;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam::queue::{ArrayQueue, SegQueue};

use crate::audio::dsp::{bit_crush, distort};
use crate::audio::filters::{biquad_process, BiquadState, FilterType};
use crate::commands::{EngineCommand, Trigger, TriggerKind, COMMANDS_PER_BLOCK};
use crate::config::EngineConfig;
use crate::demo::DemoSequencer;
use crate::events::{push_event, EventKind, NotifyEvent};
use crate::synth::SynthRack;

use master::MasterFx;
use pad::PadFx;
use sample::SampleStore;
use sidechain::Sidechain;
use stats::EngineStats;
use track::TrackFx;
use voice::{Voice, VoicePool};

pub const MAX_PADS: usize = 24;
pub const MAX_AUDIO_TRACKS: usize = 16;
pub const MAX_VOICES: usize = 32;
/// Per-pad sample cap, about two seconds at 48 kHz.
pub const MAX_SAMPLE_FRAMES: usize = 96_000;

const TRACK_PEAK_DECAY: f32 = 0.92;
const MASTER_PEAK_DECAY: f32 = 0.95;

pub struct DrumEngine {
    sr: f32,
    samples: SampleStore,
    voices: VoicePool,
    pads: Vec<PadFx>,
    tracks: Vec<TrackFx>,
    master: MasterFx,
    sidechain: Sidechain,
    synths: SynthRack,
    demo: DemoSequencer,
    demo_active: bool,

    master_gain: f32,
    seq_volume: f32,
    live_volume: f32,
    live_pitch: f32,
    track_gain: [f32; MAX_PADS],
    any_solo: bool,

    track_peaks: [f32; MAX_AUDIO_TRACKS],
    master_peak: f32,
    uptime_samples: u64,

    commands: Arc<SegQueue<EngineCommand>>,
    triggers: Arc<ArrayQueue<Trigger>>,
    events: Arc<ArrayQueue<NotifyEvent>>,
    stats: Arc<EngineStats>,
}

impl DrumEngine {
    pub fn new(
        config: EngineConfig,
        commands: Arc<SegQueue<EngineCommand>>,
        triggers: Arc<ArrayQueue<Trigger>>,
        events: Arc<ArrayQueue<NotifyEvent>>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let sr = config.sample_rate as f32;
        Self {
            sr,
            samples: SampleStore::new(),
            voices: VoicePool::new(),
            pads: (0..MAX_PADS).map(|i| PadFx::new(i, sr)).collect(),
            tracks: (0..MAX_AUDIO_TRACKS).map(|_| TrackFx::new(sr)).collect(),
            master: MasterFx::new(sr),
            sidechain: Sidechain::new(sr),
            synths: SynthRack::new(sr),
            demo: DemoSequencer::new(sr),
            demo_active: config.demo_mode,
            master_gain: 1.0,
            seq_volume: 1.0,
            live_volume: 1.0,
            live_pitch: 1.0,
            track_gain: [1.0; MAX_PADS],
            any_solo: false,
            track_peaks: [0.0; MAX_AUDIO_TRACKS],
            master_peak: 0.0,
            uptime_samples: 0,
            commands,
            triggers,
            events,
            stats,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sr
    }

    pub fn stats_handle(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    pub fn active_voices(&self) -> u32 {
        self.voices.active_count()
    }

    /// Direct sample install, for boot loading and tests.
    pub fn load_sample(&mut self, pad: usize, frames: &[i16]) {
        self.samples.load_frames(pad, frames);
        self.publish_sample_stats();
    }

    /// Render one interleaved stereo block. Never fails, never allocates
    /// on the hot path; missing inputs render as silence.
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_control_queues();

        for frame in out.chunks_exact_mut(2) {
            let (l, r) = self.render_frame();
            frame[0] = l;
            frame[1] = r;
        }

        self.decay_peaks();
        self.uptime_samples += (out.len() / 2) as u64;
        self.publish_stats();
    }

    fn drain_control_queues(&mut self) {
        let mut saw_traffic = false;

        for _ in 0..COMMANDS_PER_BLOCK {
            match self.commands.pop() {
                Some(cmd) => {
                    saw_traffic = true;
                    self.apply_command(cmd);
                }
                None => break,
            }
        }

        while let Some(trigger) = self.triggers.pop() {
            saw_traffic = true;
            self.trigger_pad(trigger);
        }

        // The demo runs until the controller shows up
        if saw_traffic {
            self.demo_active = false;
        }
    }

    pub fn trigger_pad(&mut self, t: Trigger) {
        let pad = t.pad as usize;
        if pad >= MAX_PADS || !self.samples.is_loaded(pad) {
            return;
        }

        let live = t.kind == TriggerKind::Live;
        if !live && pad < MAX_AUDIO_TRACKS {
            self.sidechain.trigger(pad, t.velocity);
        }

        let slot = self.voices.find_slot(t.pad);
        let len = self.samples.length(pad);
        let padfx = &self.pads[pad];

        let volume = if live { self.live_volume } else { self.seq_volume };
        let gain = (t.velocity as f32 / 127.0)
            * (t.track_volume as f32 / 100.0)
            * self.track_gain[pad]
            * volume;

        let track_pan = if pad < MAX_AUDIO_TRACKS {
            self.tracks[pad].pan
        } else {
            0.0
        };
        let pan = (track_pan + t.note_pan as f32 / 100.0).clamp(-1.0, 1.0);

        let speed = if live && padfx.pitch == 1.0 {
            self.live_pitch
        } else {
            padfx.pitch
        };

        let age = self.voices.next_age();
        self.voices.voices[slot] = Voice {
            active: true,
            pad: t.pad,
            live,
            pos: if padfx.reverse { (len - 1) as f32 } else { 0.0 },
            speed,
            gain,
            pan_l: 1.0 - pan.clamp(0.0, 1.0),
            pan_r: 1.0 + pan.clamp(-1.0, 0.0),
            max_frames: t.max_frames,
            age,
            filter: BiquadState::default(),
        };
    }

    fn render_frame(&mut self) -> (f32, f32) {
        let sc_gains = self.sidechain.tick();

        let mut track_l = [0.0f32; MAX_AUDIO_TRACKS];
        let mut track_r = [0.0f32; MAX_AUDIO_TRACKS];
        let mut main_l = 0.0f32;
        let mut main_r = 0.0f32;

        // Voices
        for vi in 0..MAX_VOICES {
            if !self.voices.voices[vi].active {
                continue;
            }
            let pad = self.voices.voices[vi].pad as usize;
            let len = self.samples.length(pad);
            if len == 0 {
                // Unloaded while playing
                self.voices.voices[vi].active = false;
                continue;
            }

            let vinyl = self.pads[pad].filter_type.is_vinyl();
            let sample = if vinyl {
                self.render_vinyl_voice(vi, len)
            } else {
                match self.render_normal_voice(vi, len) {
                    Some(s) => s,
                    None => continue,
                }
            };

            let voice = &self.voices.voices[vi];
            if pad < MAX_AUDIO_TRACKS {
                track_l[pad] += sample * voice.pan_l;
                track_r[pad] += sample * voice.pan_r;
            } else {
                // Extra pads bypass the track strips
                main_l += sample * voice.pan_l;
                main_r += sample * voice.pan_r;
            }
        }

        // Track strips: chain, mute/solo, pan, sends, meters
        let mut reverb_bus = 0.0f32;
        let mut delay_bus = 0.0f32;
        let mut chorus_bus = 0.0f32;

        for t in 0..MAX_AUDIO_TRACKS {
            let strip = &mut self.tracks[t];
            let duck = sc_gains[t];
            let in_l = track_l[t] * duck;
            let in_r = track_r[t] * duck;

            let chain_active = strip.echo.active
                || strip.flanger.active
                || strip.compressor.active
                || strip.eq_low_db != 0
                || strip.eq_mid_db != 0
                || strip.eq_high_db != 0;

            let (out_l, out_r) = if chain_active {
                // Chain state is mono: fold, process, re-pan by the strip
                let m = strip.process((in_l + in_r) * 0.5);
                (
                    m * (1.0 - strip.pan.clamp(0.0, 1.0)),
                    m * (1.0 + strip.pan.clamp(-1.0, 0.0)),
                )
            } else {
                (in_l, in_r)
            };

            let silenced = strip.mute || (self.any_solo && !strip.solo);
            let (out_l, out_r) = if silenced { (0.0, 0.0) } else { (out_l, out_r) };

            main_l += out_l;
            main_r += out_r;

            let mono = (out_l + out_r) * 0.5;
            reverb_bus += mono * strip.reverb_send;
            delay_bus += mono * strip.delay_send;
            chorus_bus += mono * strip.chorus_send;

            let peak = out_l.abs().max(out_r.abs());
            if peak > self.track_peaks[t] {
                self.track_peaks[t] = peak;
            }
        }

        // Demo script and math synths
        let fade = if self.demo_active {
            self.demo.tick(&mut self.synths)
        } else {
            1.0
        };
        let synth_mix = self.synths.process() * fade;
        main_l += synth_mix;
        main_r += synth_mix;

        let (l, r) = self.master.process(
            main_l * self.master_gain,
            main_r * self.master_gain,
            delay_bus,
            chorus_bus,
            reverb_bus,
        );

        let peak = l.abs().max(r.abs());
        if peak > self.master_peak {
            self.master_peak = peak;
        }
        (l, r)
    }

    /// Scratch/turntablism voices: the vinyl DSP owns the read head and the
    /// tone; the sample wraps around instead of ending.
    fn render_vinyl_voice(&mut self, vi: usize, len: u32) -> f32 {
        let voice = &mut self.voices.voices[vi];
        let pad = voice.pad as usize;
        let padfx = &mut self.pads[pad];
        let f_len = len as f32;

        let step = match padfx.filter_type {
            FilterType::Scratch => padfx.scratch.tick(self.sr),
            _ => padfx.turntablism.tick(),
        };

        voice.pos += step.advance;
        while voice.pos >= f_len {
            voice.pos -= f_len;
        }
        while voice.pos < 0.0 {
            voice.pos += f_len;
        }

        let idx = (voice.pos as usize).min(len as usize - 1);
        let raw = self.samples.frame(pad, idx) as f32 / 32_768.0 * voice.gain;

        if step.gate_off {
            return 0.0;
        }
        match padfx.filter_type {
            FilterType::Scratch => padfx.scratch.shape(raw, &step, self.sr),
            _ => padfx.turntablism.shape(raw, &step),
        }
    }

    /// Regular playback with the per-voice FX chain. Returns None when the
    /// voice deactivated this frame.
    fn render_normal_voice(&mut self, vi: usize, len: u32) -> Option<f32> {
        let pad = self.voices.voices[vi].pad as usize;

        // Stutter rewind, floor at the sample start
        if self.pads[pad].stutter.tick() {
            let voice = &mut self.voices.voices[vi];
            if voice.pos > 100.0 {
                voice.pos -= 100.0;
            } else {
                voice.pos = 0.0;
            }
        }

        let reverse = self.pads[pad].reverse;
        let loops = self.pads[pad].loop_enabled;
        let voice = &mut self.voices.voices[vi];

        let eff_len = if voice.max_frames > 0 && voice.max_frames < len {
            voice.max_frames
        } else {
            len
        };

        // Wrap or die at the effective end; note-limited voices never loop
        if reverse {
            if voice.pos < 0.0 {
                if loops && voice.max_frames == 0 {
                    voice.pos = (len - 1) as f32;
                } else {
                    voice.active = false;
                    return None;
                }
            }
        } else if voice.pos >= eff_len as f32 {
            if loops && voice.max_frames == 0 {
                voice.pos = 0.0;
            } else {
                voice.active = false;
                return None;
            }
        }

        let has_pitch = voice.speed < 0.99 || voice.speed > 1.01;
        let idx = voice.pos as usize;
        let s0 = self.samples.frame(pad, idx) as f32 / 32_768.0;
        let mut s = if has_pitch {
            let frac = voice.pos - idx as f32;
            let s1 = if idx + 1 < len as usize {
                self.samples.frame(pad, idx + 1) as f32 / 32_768.0
            } else {
                0.0
            };
            s0 + frac * (s1 - s0)
        } else {
            s0
        };

        voice.pos += if reverse { -voice.speed } else { voice.speed };

        // Velocity and volume first, then the per-voice chain
        s *= voice.gain;

        let live = voice.live;
        let (drive, mode, ftype, coeffs, bits) = if live {
            let p = &self.pads[pad];
            (p.dist_drive, p.dist_mode, p.filter_type, p.filter_coeffs, p.bit_depth)
        } else if pad < MAX_AUDIO_TRACKS {
            let t = &self.tracks[pad];
            (t.dist_drive, t.dist_mode, t.filter_type, t.filter_coeffs, t.bit_depth)
        } else {
            let p = &self.pads[pad];
            (p.dist_drive, p.dist_mode, p.filter_type, p.filter_coeffs, p.bit_depth)
        };

        s = distort(s, drive, mode);
        if ftype != FilterType::None && !ftype.is_vinyl() {
            let voice = &mut self.voices.voices[vi];
            s = biquad_process(&coeffs, &mut voice.filter, s);
        }
        s = bit_crush(s, bits);

        // Sidechain ducking is a track affair; it is applied at the strip
        Some(s)
    }

    fn decay_peaks(&mut self) {
        for t in 0..MAX_AUDIO_TRACKS {
            self.stats.set_track_peak(t, self.track_peaks[t].min(1.0));
            self.track_peaks[t] *= TRACK_PEAK_DECAY;
        }
        self.stats.set_master_peak(self.master_peak.min(1.0));
        self.master_peak *= MASTER_PEAK_DECAY;
    }

    fn publish_stats(&self) {
        self.stats
            .active_voices
            .store(self.voices.active_count(), Ordering::Relaxed);
        let ms = (self.uptime_samples * 1000 / self.sr as u64) as u32;
        self.stats.uptime_ms.store(ms, Ordering::Relaxed);
    }

    fn publish_sample_stats(&self) {
        self.stats
            .loaded_mask
            .store(self.samples.loaded_mask(), Ordering::Relaxed);
        self.stats
            .total_loaded
            .store(self.samples.total_loaded(), Ordering::Relaxed);
        self.stats
            .total_sample_bytes
            .store(self.samples.total_bytes(), Ordering::Relaxed);
    }

    fn refresh_any_solo(&mut self) {
        self.any_solo = self.tracks.iter().any(|t| t.solo);
    }

    fn apply_command(&mut self, cmd: EngineCommand) {
        use EngineCommand::*;

        match cmd {
            StopPad(pad) => self.voices.stop_pad(pad),
            StopAll => self.voices.stop_all(),
            TriggerSidechain { source, velocity } => {
                self.sidechain.trigger(source as usize, velocity)
            }

            MasterVolume(v) => self.master_gain = v.clamp(0.0, 1.5),
            SequencerVolume(v) => self.seq_volume = v.clamp(0.0, 1.5),
            LiveVolume(v) => self.live_volume = v.clamp(0.0, 1.5),
            TrackVolume { track, gain } => {
                if (track as usize) < MAX_PADS {
                    self.track_gain[track as usize] = gain.clamp(0.0, 1.5);
                }
            }
            LivePitch(p) => self.live_pitch = p.clamp(0.25, 4.0),

            GlobalFilter { kind, cutoff, resonance } => {
                self.master.set_filter(kind, cutoff, resonance)
            }
            GlobalFilterCutoff(c) => self.master.set_filter_cutoff(c),
            GlobalFilterResonance(q) => self.master.set_filter_resonance(q),
            GlobalBitDepth(bits) => self.master.bit_depth = bits.clamp(4, 16),
            GlobalDistortion(d) => self.master.dist_drive = d.clamp(0.0, 1.0),
            GlobalDistortionMode(m) => self.master.dist_mode = m,
            GlobalSrReduce(target) => self.master.set_sr_reduce(target),

            DelayActive(a) => self.master.delay.set_active(a),
            DelayTimeMs(ms) => self.master.delay.set_time_ms(ms),
            DelayFeedback(f) => self.master.delay.set_feedback(f),
            DelayMix(m) => self.master.delay.set_mix(m),
            PhaserActive(a) => self.master.phaser.set_active(a),
            PhaserRate(hz) => self.master.phaser.set_rate(hz),
            PhaserDepth(d) => self.master.phaser.set_depth(d),
            PhaserFeedback(f) => self.master.phaser.set_feedback(f),
            FlangerActive(a) => self.master.flanger.set_active(a),
            FlangerRate(hz) => self.master.flanger.set_rate(hz),
            FlangerDepth(d) => self.master.flanger.set_depth(d),
            FlangerFeedback(f) => self.master.flanger.set_feedback(f),
            FlangerMix(m) => self.master.flanger.set_mix(m),
            CompActive(a) => self.master.compressor.set_active(a),
            CompThresholdDb(db) => self.master.compressor.set_threshold_db(db),
            CompRatio(r) => self.master.compressor.set_ratio(r),
            CompAttackMs(ms) => self.master.compressor.set_attack_ms(ms),
            CompReleaseMs(ms) => self.master.compressor.set_release_ms(ms),
            CompMakeupDb(db) => self.master.compressor.set_makeup_db(db),
            ReverbActive(a) => {
                self.master.reverb_active = a;
                if a {
                    self.master.reverb.clear();
                }
            }
            ReverbFeedback(f) => self.master.reverb.set_feedback(f),
            ReverbLpFreq(f) => {
                let sr = self.sr;
                self.master.reverb.set_lp_freq(f, sr)
            }
            ReverbMix(m) => self.master.reverb.set_mix(m),
            ChorusActive(a) => self.master.chorus.set_active(a),
            ChorusRate(hz) => self.master.chorus.set_lfo_freq(hz),
            ChorusDepth(d) => self.master.chorus.set_lfo_depth(d),
            ChorusMix(m) => self.master.chorus.set_mix(m),
            TremoloActive(a) => self.master.tremolo.active = a,
            TremoloRate(hz) => self.master.tremolo.set_rate(hz),
            TremoloDepth(d) => self.master.tremolo.set_depth(d),
            WavefolderGain(g) => self.master.wavefolder.set_gain(g),
            LimiterActive(a) => self.master.limiter_active = a,

            TrackFilter { track, kind, cutoff, resonance, gain_db } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.set_filter(kind, cutoff, resonance, gain_db);
                }
            }
            TrackClearFilter(track) => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.clear_filter();
                }
            }
            TrackDistortion { track, drive, mode } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.dist_drive = drive.clamp(0.0, 1.0);
                    t.dist_mode = mode;
                }
            }
            TrackBitCrush { track, bits } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.bit_depth = bits.clamp(4, 16);
                }
            }
            TrackEcho { track, active, time_ms, feedback, mix } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.echo.configure(active, time_ms, feedback, mix);
                }
            }
            TrackFlanger { track, active, depth, rate, feedback } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.flanger.set_active(active);
                    if active {
                        t.flanger.set_depth(depth);
                        t.flanger.set_rate(rate);
                        t.flanger.set_feedback(feedback);
                    }
                }
            }
            TrackCompressor { track, active, threshold, ratio } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.compressor.set_active(active);
                    if active {
                        t.compressor.set_threshold_linear(threshold);
                        t.compressor.set_ratio(ratio);
                    }
                }
            }
            TrackClearLiveFx(track) => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.clear_live_fx();
                }
            }
            TrackClearFx(track) => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.clear_all_fx();
                }
                self.refresh_any_solo();
            }
            TrackReverbSend { track, gain } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.reverb_send = gain.clamp(0.0, 1.0);
                }
            }
            TrackDelaySend { track, gain } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.delay_send = gain.clamp(0.0, 1.0);
                }
            }
            TrackChorusSend { track, gain } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.chorus_send = gain.clamp(0.0, 1.0);
                }
            }
            TrackPan { track, pan } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.pan = pan.clamp(-1.0, 1.0);
                }
            }
            TrackMute { track, mute } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.mute = mute;
                }
            }
            TrackSolo { track, solo } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.solo = solo;
                }
                self.refresh_any_solo();
            }
            TrackEqLow { track, db } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.set_eq_low(db);
                }
            }
            TrackEqMid { track, db } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.set_eq_mid(db);
                }
            }
            TrackEqHigh { track, db } => {
                if let Some(t) = self.tracks.get_mut(track as usize) {
                    t.set_eq_high(db);
                }
            }

            PadFilter { pad, kind, cutoff, resonance, gain_db } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.filter_type = kind;
                    if !kind.is_vinyl() && kind != FilterType::None {
                        p.filter_coeffs = crate::audio::filters::BiquadCoeffs::cookbook(
                            kind, cutoff, resonance, gain_db, self.sr,
                        );
                    }
                }
            }
            PadClearFilter(pad) => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.filter_type = FilterType::None;
                    p.filter_coeffs = crate::audio::filters::BiquadCoeffs::identity();
                }
            }
            PadDistortion { pad, drive, mode } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.dist_drive = drive.clamp(0.0, 1.0);
                    p.dist_mode = mode;
                }
            }
            PadBitCrush { pad, bits } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.bit_depth = bits.clamp(4, 16);
                }
            }
            PadLoop { pad, enabled } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.loop_enabled = enabled;
                }
            }
            PadReverse { pad, reversed } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.reverse = reversed;
                }
            }
            PadPitch { pad, ratio } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.pitch = ratio.clamp(0.25, 4.0);
                }
            }
            PadStutter { pad, active, interval } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.stutter.configure(active, interval);
                }
            }
            PadScratch { pad, active, rate, depth, cutoff, crackle } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    if active {
                        p.filter_type = FilterType::Scratch;
                        p.scratch.configure(rate, depth, cutoff, crackle);
                    } else if p.filter_type == FilterType::Scratch {
                        p.filter_type = FilterType::None;
                    }
                }
            }
            PadTurntablism {
                pad,
                active,
                auto_mode,
                mode,
                brake_ms,
                backspin_ms,
                transform_rate,
                vinyl_noise,
            } => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    if active {
                        p.filter_type = FilterType::Turntablism;
                        p.turntablism.configure(
                            auto_mode,
                            mode,
                            brake_ms,
                            backspin_ms,
                            transform_rate,
                            vinyl_noise,
                        );
                    } else if p.filter_type == FilterType::Turntablism {
                        p.filter_type = FilterType::None;
                    }
                }
            }
            PadClearFx(pad) => {
                if let Some(p) = self.pads.get_mut(pad as usize) {
                    p.clear_fx();
                }
            }

            SidechainSet {
                active,
                source,
                dest_mask,
                amount,
                attack_ms,
                release_ms,
                knee,
            } => self.sidechain.configure(
                active,
                source as usize,
                dest_mask,
                amount,
                attack_ms,
                release_ms,
                knee,
            ),
            SidechainClear => self.sidechain.clear(),

            SampleBegin { pad, total_bytes } => {
                self.samples.begin_upload(pad as usize, total_bytes);
                self.publish_sample_stats();
            }
            SampleData { pad, offset, bytes } => {
                self.samples.upload_chunk(pad as usize, offset, &bytes);
            }
            SampleEnd { pad } => {
                if let Some(frames) = self.samples.end_upload(pad as usize) {
                    if frames > 0 {
                        push_event(
                            &self.events,
                            NotifyEvent::new(
                                EventKind::SampleLoaded,
                                1,
                                1u32 << pad.min(23),
                                "upload",
                            ),
                        );
                    } else {
                        push_event(
                            &self.events,
                            NotifyEvent::new(EventKind::Error, 0, 1u32 << pad.min(23), "empty"),
                        );
                    }
                }
                self.publish_sample_stats();
            }
            SampleUnload { pad } => {
                self.samples.unload(pad as usize);
                self.publish_sample_stats();
            }
            SampleUnloadAll => {
                self.samples.unload_all();
                self.voices.stop_all();
                push_event(
                    &self.events,
                    NotifyEvent::new(EventKind::KitUnloaded, 0, 0, ""),
                );
                self.publish_sample_stats();
            }

            ResetTrackPeaks => self.track_peaks = [0.0; MAX_AUDIO_TRACKS],

            SynthTrigger { engine, instrument, velocity } => {
                self.synths
                    .trigger(engine, instrument, velocity as f32 / 127.0)
            }
            SynthParam { engine, instrument, param, value } => {
                self.synths.set_param(engine, instrument, param, value)
            }
            SynthNoteOn { note, accent, slide } => {
                self.synths.acid.note_on_midi(note, accent, slide)
            }
            SynthNoteOff => self.synths.acid.note_off(),
            AcidParam { param, value } => self.synths.set_acid_param(param, value),
            SynthActiveMask(mask) => self.synths.active_mask = mask,

            Reset => self.reset(),
        }
    }

    fn reset(&mut self) {
        let sr = self.sr;
        self.voices.stop_all();
        self.samples.unload_all();
        self.pads = (0..MAX_PADS).map(|i| PadFx::new(i, sr)).collect();
        self.tracks = (0..MAX_AUDIO_TRACKS).map(|_| TrackFx::new(sr)).collect();
        self.master.reset();
        self.sidechain.clear();
        self.synths = SynthRack::new(sr);
        self.master_gain = 1.0;
        self.seq_volume = 1.0;
        self.live_volume = 1.0;
        self.live_pitch = 1.0;
        self.track_gain = [1.0; MAX_PADS];
        self.any_solo = false;
        self.track_peaks = [0.0; MAX_AUDIO_TRACKS];
        self.master_peak = 0.0;
        self.publish_sample_stats();
    }
}
