//! Built-in demo: a scripted three-minute program driving the math synths,
//! with time-automated parameters. Runs until the first command arrives
//! from the controller.

use crate::synth::kit::{INST_CLAP, INST_HIHAT_C, INST_HIHAT_O, INST_SNARE};
use crate::synth::{AcidWave, SynthRack};

/// A parameter that moves on its own: linear `start -> end` over a sample
/// window.
#[derive(Debug, Clone, Copy, Default)]
struct AutoParam {
    start_val: f32,
    end_val: f32,
    current: f32,
    start_sample: u64,
    duration: u64,
    active: bool,
}

impl AutoParam {
    fn set(&mut self, from: f32, to: f32, start: u64, duration: u64) {
        self.start_val = from;
        self.end_val = to;
        self.current = from;
        self.start_sample = start;
        self.duration = duration;
        self.active = true;
    }

    fn update(&mut self, now: u64) -> f32 {
        if !self.active {
            return self.current;
        }
        if now < self.start_sample {
            self.current = self.start_val;
            return self.current;
        }
        if self.duration == 0 {
            self.current = self.end_val;
            self.active = false;
            return self.current;
        }
        let mut t = (now - self.start_sample) as f32 / self.duration as f32;
        if t >= 1.0 {
            t = 1.0;
            self.active = false;
        }
        self.current = self.start_val + (self.end_val - self.start_val) * t;
        self.current
    }
}

#[derive(Debug, Clone, Copy)]
struct AcidStep {
    note: u8, // 0 = rest/tie
    accent: bool,
    slide: bool,
    note_off: bool,
}

const fn step(note: u8, accent: bool, slide: bool, note_off: bool) -> AcidStep {
    AcidStep {
        note,
        accent,
        slide,
        note_off,
    }
}

// Classic 16-step acid line in C minor
const ACID_PATTERN: [AcidStep; 16] = [
    step(36, false, false, false),
    step(0, false, false, false),
    step(36, false, false, true),
    step(39, true, false, false),
    step(36, false, true, false),
    step(0, false, false, false),
    step(48, true, false, true),
    step(36, false, false, false),
    step(43, false, false, false),
    step(0, false, false, false),
    step(41, true, true, false),
    step(36, false, true, false),
    step(0, false, false, true),
    step(36, false, false, false),
    step(44, true, false, true),
    step(36, false, false, false),
];

pub struct DemoSequencer {
    sr: f32,
    global_sample: u64,
    step_counter: u64,
    acid_step: usize,
    next_trigger: u64,
    next_acid: u64,
    step_len: u64,

    bpm: f32,
    swing: f32,
    kick_mix_boom: f32,
    kick_mix_punch: f32,
    fade_gain: f32,

    kick_on: bool,
    snare_on: bool,
    hihat_on: bool,
    acid_on: bool,
    sweep_on: bool,
    morph_on: bool,
    detroit_on: bool,
    fade_out: bool,
    initialized: bool,

    auto_sweep: AutoParam,
    auto_morph: AutoParam,
    auto_fade: AutoParam,
    auto_bpm: AutoParam,
    auto_swing: AutoParam,
    auto_kick_boom: AutoParam,
    auto_kick_punch: AutoParam,

    sec_15: u64,
    sec_25: u64,
    sec_40: u64,
    sec_60: u64,
    sec_90: u64,
    sec_130: u64,
    sec_170: u64,
    sec_180: u64,
}

impl DemoSequencer {
    pub fn new(sr: f32) -> Self {
        let sec = |s: f32| (s * sr) as u64;
        let mut demo = Self {
            sr,
            global_sample: 0,
            step_counter: 0,
            acid_step: 0,
            next_trigger: 0,
            next_acid: 0,
            step_len: 1,
            bpm: 90.0,
            swing: 0.56,
            kick_mix_boom: 1.0,
            kick_mix_punch: 0.0,
            fade_gain: 1.0,
            kick_on: false,
            snare_on: false,
            hihat_on: false,
            acid_on: false,
            sweep_on: false,
            morph_on: false,
            detroit_on: false,
            fade_out: false,
            initialized: false,
            auto_sweep: AutoParam::default(),
            auto_morph: AutoParam::default(),
            auto_fade: AutoParam::default(),
            auto_bpm: AutoParam::default(),
            auto_swing: AutoParam::default(),
            auto_kick_boom: AutoParam::default(),
            auto_kick_punch: AutoParam::default(),
            sec_15: sec(15.0),
            sec_25: sec(25.0),
            sec_40: sec(40.0),
            sec_60: sec(60.0),
            sec_90: sec(90.0),
            sec_130: sec(130.0),
            sec_170: sec(170.0),
            sec_180: sec(180.0),
        };
        demo.recalc_step_len();
        demo
    }

    fn reset(&mut self, synths: &mut SynthRack) {
        self.global_sample = 0;
        self.step_counter = 0;
        self.acid_step = 0;
        self.next_trigger = 0;
        self.next_acid = 0;
        self.fade_gain = 1.0;
        self.bpm = 90.0;
        self.swing = 0.56;
        self.kick_mix_boom = 1.0;
        self.kick_mix_punch = 0.0;
        self.kick_on = false;
        self.snare_on = false;
        self.hihat_on = false;
        self.acid_on = false;
        self.sweep_on = false;
        self.morph_on = false;
        self.detroit_on = false;
        self.fade_out = false;
        self.auto_sweep.active = false;
        self.auto_morph.active = false;
        self.auto_fade.active = false;
        self.auto_bpm.active = false;
        self.auto_swing.active = false;
        self.auto_kick_boom.active = false;
        self.auto_kick_punch.active = false;
        self.recalc_step_len();

        synths.acid.set_cutoff(200.0);
        synths.acid.set_resonance(0.7);
        synths.acid.set_env_mod(0.4);
        synths.acid.set_decay(0.2);
        synths.acid.set_accent(0.6);
        synths.acid.waveform = AcidWave::Saw;
        synths.acid.volume = 0.6;

        synths.boom.kick.volume = 0.85;
        synths.boom.snare.volume = 0.7;
        synths.boom.hihat_c.volume = 0.45;
        synths.boom.hihat_o.volume = 0.4;
        synths.punch.kick.volume = 0.0;

        self.initialized = true;
    }

    fn recalc_step_len(&mut self) {
        // One sixteenth: 60 / (bpm * 4) seconds
        let step_sec = 60.0 / self.bpm / 4.0;
        self.step_len = ((step_sec * self.sr) as u64).max(1);
    }

    fn sec(&self, s: f32) -> u64 {
        (s * self.sr) as u64
    }

    /// Advance one sample: fire sections, update automations, trigger the
    /// synth engines. Returns the fade gain applied to the synth mix.
    pub fn tick(&mut self, synths: &mut SynthRack) -> f32 {
        if !self.initialized {
            self.reset(synths);
        }
        let g = self.global_sample;

        // Section entries, each exactly once as the counter crosses it
        if g == 0 {
            self.kick_on = true;
        }
        if g == self.sec_15 {
            self.snare_on = true;
        }
        if g == self.sec_25 {
            self.hihat_on = true;
        }
        if g == self.sec_40 {
            self.acid_on = true;
            synths.acid.set_cutoff(200.0);
            synths.acid.set_resonance(0.7);
        }
        if g == self.sec_60 {
            self.sweep_on = true;
            self.auto_sweep.set(200.0, 3000.0, g, self.sec(30.0));
        }
        if g == self.sec_90 {
            self.morph_on = true;
            let morph = self.sec(40.0);
            self.auto_bpm.set(90.0, 145.0, g, morph);
            self.auto_swing.set(0.56, 0.0, g, morph);
            self.auto_kick_boom.set(1.0, 0.0, g, morph);
            self.auto_kick_punch.set(0.0, 1.0, g, morph);
            self.auto_morph.set(200.0, 4000.0, g, morph);
        }
        if g == self.sec_130 {
            self.detroit_on = true;
            self.morph_on = false;
            self.bpm = 145.0;
            self.swing = 0.0;
            self.kick_mix_boom = 0.0;
            self.kick_mix_punch = 1.0;
            synths.acid.set_cutoff(4000.0);
            self.recalc_step_len();
        }
        if g == self.sec_170 {
            self.fade_out = true;
            self.auto_fade.set(1.0, 0.0, g, self.sec(10.0));
        }
        if g >= self.sec_180 {
            synths.acid.note_off();
            self.reset(synths);
            return 0.0;
        }

        // Automation updates
        if self.sweep_on && self.auto_sweep.active {
            let c = self.auto_sweep.update(g);
            synths.acid.set_cutoff(c);
        }
        if self.morph_on {
            if self.auto_bpm.active {
                self.bpm = self.auto_bpm.update(g);
                self.recalc_step_len();
            }
            if self.auto_swing.active {
                self.swing = self.auto_swing.update(g);
            }
            if self.auto_kick_boom.active {
                self.kick_mix_boom = self.auto_kick_boom.update(g);
                synths.boom.kick.volume = 0.85 * self.kick_mix_boom;
            }
            if self.auto_kick_punch.active {
                self.kick_mix_punch = self.auto_kick_punch.update(g);
                synths.punch.kick.volume = 0.85 * self.kick_mix_punch;
            }
            if self.auto_morph.active {
                let c = self.auto_morph.update(g);
                synths.acid.set_cutoff(c);
            }
        }
        if self.fade_out && self.auto_fade.active {
            self.fade_gain = self.auto_fade.update(g);
        }

        // Drum step sequencer, sixteen steps to the bar
        if g >= self.next_trigger {
            let step = (self.step_counter % 16) as u8;

            if self.kick_on && step % 4 == 0 {
                if self.kick_mix_boom > 0.01 {
                    synths.boom.kick.trigger(0.9);
                }
                if self.kick_mix_punch > 0.01 {
                    synths.punch.kick.trigger(0.9);
                }
            }
            if self.snare_on && (step == 4 || step == 12) {
                synths.boom.trigger(INST_SNARE, 0.85);
            }
            if self.hihat_on {
                if step % 4 == 2 {
                    synths.boom.trigger(INST_HIHAT_O, 0.6);
                } else {
                    synths.boom.trigger(INST_HIHAT_C, 0.55);
                }
            }
            if self.detroit_on {
                if step == 4 || step == 12 {
                    synths.punch.trigger(INST_SNARE, 0.8);
                }
                if step % 2 == 0 {
                    synths.punch.trigger(INST_HIHAT_C, 0.5);
                }
                if step == 4 {
                    synths.punch.trigger(INST_CLAP, 0.6);
                }
            }

            // Odd sixteenths are delayed when swing is above center
            self.step_counter += 1;
            let base = self.step_len;
            if self.step_counter % 2 == 1 {
                let swing_amount = ((self.swing - 0.5) * 2.0).max(0.0);
                let offset = (base as f32 * swing_amount) as u64;
                self.next_trigger = g + base + offset;
            } else {
                self.next_trigger = g + base;
            }
        }

        // Acid line runs at the same step rate
        if self.acid_on && g >= self.next_acid {
            let s = ACID_PATTERN[self.acid_step % 16];
            if s.note_off {
                synths.acid.note_off();
            }
            if s.note > 0 {
                synths.acid.note_on_midi(s.note, s.accent, s.slide);
            }
            self.acid_step += 1;
            self.next_acid = g + self.step_len;
        }

        self.global_sample += 1;
        self.fade_gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    fn run_seconds(demo: &mut DemoSequencer, synths: &mut SynthRack, seconds: f32) -> f32 {
        let mut last = 1.0;
        for _ in 0..(seconds * SR) as usize {
            last = demo.tick(synths);
        }
        last
    }

    #[test]
    fn test_auto_param_linear_interpolation() {
        let mut p = AutoParam::default();
        p.set(0.0, 100.0, 1000, 1000);
        assert_eq!(p.update(500), 0.0);
        assert_eq!(p.update(1500), 50.0);
        assert_eq!(p.update(2000), 100.0);
        assert!(!p.active, "automation finishes at the window end");
        assert_eq!(p.update(9999), 100.0);
    }

    #[test]
    fn test_sections_arm_in_order() {
        let mut demo = DemoSequencer::new(SR);
        let mut synths = SynthRack::new(SR);

        run_seconds(&mut demo, &mut synths, 1.0);
        assert!(demo.kick_on);
        assert!(!demo.snare_on);

        run_seconds(&mut demo, &mut synths, 15.0);
        assert!(demo.snare_on, "snare enters at 15 s");
        assert!(!demo.acid_on);

        run_seconds(&mut demo, &mut synths, 25.0); // at 41 s
        assert!(demo.hihat_on);
        assert!(demo.acid_on, "acid enters at 40 s");
    }

    #[test]
    fn test_morph_moves_bpm_and_swing() {
        let mut demo = DemoSequencer::new(SR);
        let mut synths = SynthRack::new(SR);
        run_seconds(&mut demo, &mut synths, 111.0); // mid-morph (90..130 s)
        assert!(
            demo.bpm > 95.0 && demo.bpm < 145.0,
            "bpm should be morphing, at {}",
            demo.bpm
        );
        assert!(demo.swing < 0.56, "swing should be falling, at {}", demo.swing);
        assert!(synths.punch.kick.volume > 0.0, "punch kick fading in");
    }

    #[test]
    fn test_fade_out_then_restart() {
        let mut demo = DemoSequencer::new(SR);
        let mut synths = SynthRack::new(SR);
        let fade = run_seconds(&mut demo, &mut synths, 175.0);
        assert!(fade < 0.7, "half-way into the fade, got {}", fade);

        run_seconds(&mut demo, &mut synths, 6.0); // past 180 s
        assert!(demo.global_sample < (10.0 * SR) as u64, "script restarts");
        assert_eq!(demo.bpm, 90.0);
    }

    #[test]
    fn test_swing_delays_odd_steps_only() {
        let mut demo = DemoSequencer::new(SR);
        let mut synths = SynthRack::new(SR);
        demo.reset(&mut synths);
        demo.swing = 0.56;

        // Collect the first few trigger deadlines
        let mut deadlines = Vec::new();
        let mut last = demo.next_trigger;
        for _ in 0..(SR as usize * 2) {
            demo.tick(&mut synths);
            if demo.next_trigger != last {
                deadlines.push(demo.next_trigger - (demo.global_sample - 1));
                last = demo.next_trigger;
            }
            if deadlines.len() >= 4 {
                break;
            }
        }
        // Steps alternate long (swing-delayed) and base length
        assert!(deadlines[0] > deadlines[1], "odd step delayed: {:?}", deadlines);
        assert!(deadlines[2] > deadlines[3], "pattern repeats: {:?}", deadlines);
    }
}
