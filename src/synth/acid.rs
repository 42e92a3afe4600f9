//! Monophonic acid bass: PolyBLEP saw/square into the resonant ladder,
//! with accent, slide and an envelope-modulated cutoff.

use crate::audio::filters::Ladder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcidWave {
    #[default]
    Saw,
    Square,
}

pub struct AcidSynth {
    pub cutoff: f32,
    pub resonance: f32,
    pub env_mod: f32,
    pub decay: f32,
    pub accent_amount: f32,
    pub slide_time: f32,
    pub waveform: AcidWave,
    pub volume: f32,

    phase: f32,
    current_freq: f32,
    target_freq: f32,
    active: bool,
    gate_on: bool,
    accent: bool,
    sliding: bool,
    filter_env: f32,
    amp_env: f32,
    ladder: Ladder,
    sr: f32,
    dt: f32,
}

fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

// PolyBLEP residual smoothing the saw/square discontinuities
fn poly_blep(phase: f32, dt: f32) -> f32 {
    if phase < dt {
        let t = phase / dt;
        t + t - t * t - 1.0
    } else if phase > 1.0 - dt {
        let t = (phase - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

impl AcidSynth {
    pub fn new(sr: f32) -> Self {
        Self {
            cutoff: 800.0,
            resonance: 0.5,
            env_mod: 0.5,
            decay: 0.3,
            accent_amount: 0.5,
            slide_time: 0.06,
            waveform: AcidWave::Saw,
            volume: 0.7,
            phase: 0.0,
            current_freq: 220.0,
            target_freq: 220.0,
            active: false,
            gate_on: false,
            accent: false,
            sliding: false,
            filter_env: 0.0,
            amp_env: 0.0,
            ladder: Ladder::new(sr),
            sr,
            dt: 1.0 / sr,
        }
    }

    pub fn note_on(&mut self, freq: f32, accent: bool, slide: bool) {
        self.target_freq = freq.clamp(20.0, 5000.0);
        self.accent = accent;

        if slide && self.active {
            self.sliding = true;
        } else {
            self.sliding = false;
            self.current_freq = self.target_freq;
            self.filter_env = 1.0;
        }
        if accent {
            self.filter_env = 1.2;
        }
        self.gate_on = true;
        self.active = true;
    }

    pub fn note_on_midi(&mut self, note: u8, accent: bool, slide: bool) {
        self.note_on(midi_to_freq(note), accent, slide);
    }

    pub fn note_off(&mut self) {
        self.gate_on = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_cutoff(&mut self, c: f32) {
        self.cutoff = c.clamp(20.0, 20_000.0);
    }

    pub fn set_resonance(&mut self, r: f32) {
        self.resonance = r.clamp(0.0, 0.95);
    }

    pub fn set_env_mod(&mut self, e: f32) {
        self.env_mod = e.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, d: f32) {
        self.decay = d.clamp(0.02, 3.0);
    }

    pub fn set_accent(&mut self, a: f32) {
        self.accent_amount = a.clamp(0.0, 1.0);
    }

    pub fn set_slide(&mut self, s: f32) {
        self.slide_time = s.clamp(0.01, 0.5);
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }

        // Portamento towards the target note
        if self.sliding {
            let rate = (-self.dt / self.slide_time).exp();
            self.current_freq = self.current_freq * rate + self.target_freq * (1.0 - rate);
            if (self.current_freq - self.target_freq).abs() < 0.1 {
                self.current_freq = self.target_freq;
                self.sliding = false;
            }
        }

        // Oscillator
        self.phase += self.current_freq * self.dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        let inc = self.current_freq * self.dt;
        let osc = match self.waveform {
            AcidWave::Saw => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            AcidWave::Square => {
                let mut s = if self.phase < 0.5 { 1.0 } else { -1.0 };
                s += poly_blep(self.phase, inc);
                let mut p2 = self.phase + 0.5;
                if p2 >= 1.0 {
                    p2 -= 1.0;
                }
                s - poly_blep(p2, inc)
            }
        };

        // Envelopes: accent shortens the filter decay and lifts resonance
        let env_decay = if self.accent { self.decay * 0.7 } else { self.decay };
        self.filter_env *= (-self.dt / env_decay).exp();

        if self.gate_on {
            self.amp_env += (1.0 - self.amp_env) * 0.05;
        } else {
            let rel = if self.accent { 0.01 } else { 0.005 };
            self.amp_env *= (-self.dt / rel).exp();
            if self.amp_env < 0.001 {
                self.active = false;
                return 0.0;
            }
        }

        let accent_boost = if self.accent {
            self.accent_amount * 6000.0
        } else {
            0.0
        };
        let fc = (self.cutoff + self.env_mod * 10_000.0 * self.filter_env + accent_boost)
            .clamp(20.0, self.sr * 0.45);
        let res = if self.accent {
            (self.resonance + self.accent_amount * 0.3).min(0.95)
        } else {
            self.resonance
        };

        let filtered = self.ladder.process(osc, fc, res);

        let accent_gain = if self.accent {
            1.0 + self.accent_amount * 0.4
        } else {
            1.0
        };
        (filtered * self.amp_env * self.volume * accent_gain * 1.5).tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_midi_to_freq_reference_points() {
        assert!((midi_to_freq(69) - 440.0).abs() < 0.01);
        assert!((midi_to_freq(57) - 220.0).abs() < 0.01);
    }

    #[test]
    fn test_note_produces_sound_then_releases() {
        let mut acid = AcidSynth::new(SR);
        acid.note_on_midi(36, false, false);

        let mut peak = 0.0f32;
        for _ in 0..4800 {
            peak = peak.max(acid.process().abs());
        }
        assert!(peak > 0.05, "note should be audible, got {}", peak);

        acid.note_off();
        for _ in 0..4800 {
            acid.process();
        }
        assert!(!acid.is_active(), "voice should free after release");
        assert_eq!(acid.process(), 0.0);
    }

    #[test]
    fn test_slide_moves_pitch_gradually() {
        let mut acid = AcidSynth::new(SR);
        acid.note_on(110.0, false, false);
        acid.process();
        acid.note_on(220.0, false, true);
        acid.process();
        assert!(
            acid.current_freq < 200.0,
            "slide should not jump, at {}",
            acid.current_freq
        );
        for _ in 0..48_000 {
            acid.process();
        }
        assert!(
            (acid.current_freq - 220.0).abs() < 1.0,
            "slide should land on target, at {}",
            acid.current_freq
        );
    }

    #[test]
    fn test_output_bounded_with_accent_and_resonance() {
        let mut acid = AcidSynth::new(SR);
        acid.set_resonance(0.95);
        acid.set_accent(1.0);
        acid.note_on_midi(36, true, false);
        for _ in 0..48_000 {
            let s = acid.process();
            assert!(s.is_finite() && s.abs() <= 1.0, "sample escaped: {}", s);
        }
    }
}
