//! Math-synthesized drum voices: swept-sine kick, tone+noise snare,
//! filtered-noise hats and a burst clap. Two tunings of the same kit cover
//! the "boom" (deep, long) and "punch" (tight, snappy) engines.

use fastrand::Rng;

use crate::audio::filters::{OnePole, OnePoleMode};
use crate::audio::{AudioProcessor, TWO_PI};

fn decay_coeff(seconds: f32, sr: f32) -> f32 {
    (-1.0 / (sr * seconds.max(0.005))).exp()
}

pub struct KickVoice {
    phase: f32,
    amp_env: f32,
    pitch_env: f32,
    amp_coeff: f32,
    pitch_coeff: f32,
    base_freq: f32,
    sweep_ratio: f32,
    decay: f32,
    pub saturation: f32,
    pub volume: f32,
    velocity: f32,
    sr: f32,
}

impl KickVoice {
    pub fn new(base_freq: f32, sweep_ratio: f32, decay: f32, sr: f32) -> Self {
        Self {
            phase: 0.0,
            amp_env: 0.0,
            pitch_env: 0.0,
            amp_coeff: decay_coeff(decay, sr),
            pitch_coeff: decay_coeff(0.045, sr),
            base_freq,
            sweep_ratio,
            decay,
            saturation: 0.3,
            volume: 0.85,
            velocity: 1.0,
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.amp_env = 1.0;
        self.pitch_env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.clamp(0.05, 2.0);
        self.amp_coeff = decay_coeff(self.decay, self.sr);
    }

    pub fn set_pitch(&mut self, freq: f32) {
        self.base_freq = freq.clamp(25.0, 150.0);
    }

    pub fn process(&mut self) -> f32 {
        if self.amp_env < 0.001 {
            return 0.0;
        }
        self.amp_env *= self.amp_coeff;
        self.pitch_env *= self.pitch_coeff;

        let freq = self.base_freq * (1.0 + self.pitch_env * self.sweep_ratio);
        self.phase += freq / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        let mut s = (self.phase * TWO_PI).sin() * self.amp_env;
        if self.saturation > 0.01 {
            s = (s * (1.0 + self.saturation * 4.0)).tanh();
        }
        s * self.velocity * self.volume
    }
}

pub struct SnareVoice {
    phase: f32,
    tone_env: f32,
    noise_env: f32,
    tone_coeff: f32,
    noise_coeff: f32,
    tone_freq: f32,
    noise_hp: OnePole,
    snappy: f32,
    pub volume: f32,
    velocity: f32,
    rng: Rng,
    sr: f32,
}

impl SnareVoice {
    pub fn new(tone_freq: f32, decay: f32, sr: f32) -> Self {
        Self {
            phase: 0.0,
            tone_env: 0.0,
            noise_env: 0.0,
            tone_coeff: decay_coeff(decay * 0.6, sr),
            noise_coeff: decay_coeff(decay, sr),
            tone_freq,
            noise_hp: OnePole::new(1800.0, OnePoleMode::Highpass, sr),
            snappy: 0.6,
            volume: 0.7,
            velocity: 1.0,
            rng: Rng::with_seed(0x5EED),
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.tone_env = 1.0;
        self.noise_env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        let d = seconds.clamp(0.05, 1.0);
        self.tone_coeff = decay_coeff(d * 0.6, self.sr);
        self.noise_coeff = decay_coeff(d, self.sr);
    }

    pub fn set_tone(&mut self, tone: f32) {
        self.tone_freq = 120.0 + tone.clamp(0.0, 1.0) * 180.0;
    }

    pub fn set_snappy(&mut self, snappy: f32) {
        self.snappy = snappy.clamp(0.0, 1.0);
    }

    pub fn process(&mut self) -> f32 {
        if self.tone_env < 0.001 && self.noise_env < 0.001 {
            return 0.0;
        }
        self.tone_env *= self.tone_coeff;
        self.noise_env *= self.noise_coeff;

        self.phase += self.tone_freq / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        let tone = (self.phase * TWO_PI).sin() * self.tone_env;

        let noise = self.noise_hp.process(self.rng.f32() * 2.0 - 1.0) * self.noise_env;

        (tone * (1.0 - self.snappy * 0.5) + noise * self.snappy) * self.velocity * self.volume
    }
}

pub struct HatVoice {
    env: f32,
    coeff: f32,
    decay: f32,
    hp: OnePole,
    pub volume: f32,
    velocity: f32,
    rng: Rng,
    sr: f32,
}

impl HatVoice {
    pub fn new(decay: f32, sr: f32) -> Self {
        Self {
            env: 0.0,
            coeff: decay_coeff(decay, sr),
            decay,
            hp: OnePole::new(7000.0, OnePoleMode::Highpass, sr),
            volume: 0.45,
            velocity: 1.0,
            rng: Rng::with_seed(0x4A77),
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn choke(&mut self) {
        self.env = 0.0;
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.clamp(0.02, 1.5);
        self.coeff = decay_coeff(self.decay, self.sr);
    }

    pub fn process(&mut self) -> f32 {
        if self.env < 0.001 {
            return 0.0;
        }
        self.env *= self.coeff;
        let noise = self.rng.f32() * 2.0 - 1.0;
        self.hp.process(noise) * self.env * self.velocity * self.volume
    }
}

pub struct ClapVoice {
    env: f32,
    coeff: f32,
    burst_pos: u32,
    burst_len: u32,
    hp: OnePole,
    pub volume: f32,
    velocity: f32,
    rng: Rng,
    sr: f32,
}

impl ClapVoice {
    pub fn new(decay: f32, sr: f32) -> Self {
        Self {
            env: 0.0,
            coeff: decay_coeff(decay, sr),
            burst_pos: u32::MAX,
            burst_len: (sr * 0.010) as u32,
            hp: OnePole::new(900.0, OnePoleMode::Highpass, sr),
            volume: 0.6,
            velocity: 1.0,
            rng: Rng::with_seed(0xC1AB),
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.env = 1.0;
        self.burst_pos = 0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.coeff = decay_coeff(seconds.clamp(0.05, 1.0), self.sr);
    }

    pub fn process(&mut self) -> f32 {
        if self.env < 0.001 {
            return 0.0;
        }
        self.env *= self.coeff;

        // Three retriggered bursts 10 ms apart, then the tail
        let burst_gain = if self.burst_pos < self.burst_len * 3 {
            let within = (self.burst_pos % self.burst_len) as f32 / self.burst_len as f32;
            self.burst_pos += 1;
            1.0 - within * 0.6
        } else {
            1.0
        };

        let noise = self.rng.f32() * 2.0 - 1.0;
        self.hp.process(noise) * self.env * burst_gain * self.velocity * self.volume
    }
}

/// Pitched tom: a sine with a short downward bend, no noise. Three
/// tunings cover low/mid/high.
pub struct TomVoice {
    phase: f32,
    env: f32,
    pitch_env: f32,
    coeff: f32,
    pitch_coeff: f32,
    freq: f32,
    pub volume: f32,
    velocity: f32,
    sr: f32,
}

impl TomVoice {
    pub fn new(freq: f32, decay: f32, sr: f32) -> Self {
        Self {
            phase: 0.0,
            env: 0.0,
            pitch_env: 0.0,
            coeff: decay_coeff(decay, sr),
            pitch_coeff: decay_coeff(0.03, sr),
            freq,
            volume: 0.7,
            velocity: 1.0,
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.env = 1.0;
        self.pitch_env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.coeff = decay_coeff(seconds.clamp(0.05, 1.5), self.sr);
    }

    pub fn process(&mut self) -> f32 {
        if self.env < 0.001 {
            return 0.0;
        }
        self.env *= self.coeff;
        self.pitch_env *= self.pitch_coeff;
        let freq = self.freq * (1.0 + self.pitch_env * 0.8);
        self.phase += freq / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        (self.phase * TWO_PI).sin() * self.env * self.velocity * self.volume
    }
}

/// Cowbell: two detuned partials through a short envelope, the 540/800 Hz
/// pair everybody recognizes.
pub struct CowbellVoice {
    phase_a: f32,
    phase_b: f32,
    env: f32,
    coeff: f32,
    pub volume: f32,
    velocity: f32,
    sr: f32,
}

impl CowbellVoice {
    pub fn new(sr: f32) -> Self {
        Self {
            phase_a: 0.0,
            phase_b: 0.0,
            env: 0.0,
            coeff: decay_coeff(0.18, sr),
            volume: 0.55,
            velocity: 1.0,
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.coeff = decay_coeff(seconds.clamp(0.05, 1.0), self.sr);
    }

    pub fn process(&mut self) -> f32 {
        if self.env < 0.001 {
            return 0.0;
        }
        self.env *= self.coeff;
        self.phase_a += 540.0 / self.sr;
        self.phase_b += 800.0 / self.sr;
        if self.phase_a >= 1.0 {
            self.phase_a -= 1.0;
        }
        if self.phase_b >= 1.0 {
            self.phase_b -= 1.0;
        }
        // Square-ish partials clip into each other
        let a = if self.phase_a < 0.5 { 1.0 } else { -1.0 };
        let b = if self.phase_b < 0.5 { 1.0 } else { -1.0 };
        ((a + b) * 0.5 * self.env).tanh() * self.velocity * self.volume
    }
}

/// Rimshot: a few milliseconds of bandpassed click.
pub struct RimshotVoice {
    phase: f32,
    env: f32,
    coeff: f32,
    hp: OnePole,
    pub volume: f32,
    velocity: f32,
    sr: f32,
}

impl RimshotVoice {
    pub fn new(sr: f32) -> Self {
        Self {
            phase: 0.0,
            env: 0.0,
            coeff: decay_coeff(0.03, sr),
            hp: OnePole::new(500.0, OnePoleMode::Highpass, sr),
            volume: 0.6,
            velocity: 1.0,
            sr,
        }
    }

    pub fn trigger(&mut self, velocity: f32) {
        self.phase = 0.0;
        self.env = 1.0;
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    pub fn process(&mut self) -> f32 {
        if self.env < 0.001 {
            return 0.0;
        }
        self.env *= self.coeff;
        self.phase += 1700.0 / self.sr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        let tone = (self.phase * TWO_PI).sin();
        self.hp.process(tone) * self.env * self.velocity * self.volume
    }
}

/// Instrument indices on the wire.
pub const INST_KICK: u8 = 0;
pub const INST_SNARE: u8 = 1;
pub const INST_CLAP: u8 = 2;
pub const INST_HIHAT_C: u8 = 3;
pub const INST_HIHAT_O: u8 = 4;
pub const INST_LOW_TOM: u8 = 5;
pub const INST_MID_TOM: u8 = 6;
pub const INST_HI_TOM: u8 = 7;
pub const INST_COWBELL: u8 = 8;
pub const INST_RIMSHOT: u8 = 9;

/// One drum kit: a struct of voices, dispatched by a small match. No
/// dynamic calls on the audio path.
pub struct DrumKit {
    pub kick: KickVoice,
    pub snare: SnareVoice,
    pub clap: ClapVoice,
    pub hihat_c: HatVoice,
    pub hihat_o: HatVoice,
    pub low_tom: TomVoice,
    pub mid_tom: TomVoice,
    pub hi_tom: TomVoice,
    pub cowbell: CowbellVoice,
    pub rimshot: RimshotVoice,
}

impl DrumKit {
    /// Deep and loose: low kick with a long tail, dark snare.
    pub fn boom(sr: f32) -> Self {
        Self {
            kick: KickVoice::new(52.0, 6.0, 0.45, sr),
            snare: SnareVoice::new(180.0, 0.25, sr),
            clap: ClapVoice::new(0.30, sr),
            hihat_c: HatVoice::new(0.06, sr),
            hihat_o: HatVoice::new(0.45, sr),
            low_tom: TomVoice::new(80.0, 0.40, sr),
            mid_tom: TomVoice::new(120.0, 0.32, sr),
            hi_tom: TomVoice::new(165.0, 0.26, sr),
            cowbell: CowbellVoice::new(sr),
            rimshot: RimshotVoice::new(sr),
        }
    }

    /// Tight and forward: higher kick sweep, short snare, crisp hats.
    pub fn punch(sr: f32) -> Self {
        Self {
            kick: KickVoice::new(60.0, 8.0, 0.28, sr),
            snare: SnareVoice::new(230.0, 0.16, sr),
            clap: ClapVoice::new(0.22, sr),
            hihat_c: HatVoice::new(0.04, sr),
            hihat_o: HatVoice::new(0.30, sr),
            low_tom: TomVoice::new(95.0, 0.30, sr),
            mid_tom: TomVoice::new(140.0, 0.25, sr),
            hi_tom: TomVoice::new(190.0, 0.20, sr),
            cowbell: CowbellVoice::new(sr),
            rimshot: RimshotVoice::new(sr),
        }
    }

    /// Thin and clicky: short everything, the cheap-preset flavour.
    pub fn tick(sr: f32) -> Self {
        Self {
            kick: KickVoice::new(68.0, 4.0, 0.18, sr),
            snare: SnareVoice::new(260.0, 0.12, sr),
            clap: ClapVoice::new(0.15, sr),
            hihat_c: HatVoice::new(0.03, sr),
            hihat_o: HatVoice::new(0.20, sr),
            low_tom: TomVoice::new(110.0, 0.22, sr),
            mid_tom: TomVoice::new(150.0, 0.18, sr),
            hi_tom: TomVoice::new(200.0, 0.15, sr),
            cowbell: CowbellVoice::new(sr),
            rimshot: RimshotVoice::new(sr),
        }
    }

    pub fn trigger(&mut self, instrument: u8, velocity: f32) {
        match instrument {
            INST_KICK => self.kick.trigger(velocity),
            INST_SNARE => self.snare.trigger(velocity),
            INST_CLAP => self.clap.trigger(velocity),
            INST_HIHAT_C => {
                // Closed hat chokes the open one
                self.hihat_o.choke();
                self.hihat_c.trigger(velocity);
            }
            INST_HIHAT_O => self.hihat_o.trigger(velocity),
            INST_LOW_TOM => self.low_tom.trigger(velocity),
            INST_MID_TOM => self.mid_tom.trigger(velocity),
            INST_HI_TOM => self.hi_tom.trigger(velocity),
            INST_COWBELL => self.cowbell.trigger(velocity),
            INST_RIMSHOT => self.rimshot.trigger(velocity),
            _ => {}
        }
    }

    /// paramId: 0 = decay, 1 = pitch, 2 = tone, 3 = volume, 4 = snappy.
    pub fn set_param(&mut self, instrument: u8, param: u8, value: f32) {
        match (instrument, param) {
            (INST_KICK, 0) => self.kick.set_decay(value),
            (INST_KICK, 1) => self.kick.set_pitch(value),
            (INST_KICK, 2) => self.kick.saturation = value.clamp(0.0, 1.0),
            (INST_KICK, 3) => self.kick.volume = value.clamp(0.0, 1.0),
            (INST_SNARE, 0) => self.snare.set_decay(value),
            (INST_SNARE, 2) => self.snare.set_tone(value),
            (INST_SNARE, 3) => self.snare.volume = value.clamp(0.0, 1.0),
            (INST_SNARE, 4) => self.snare.set_snappy(value),
            (INST_CLAP, 0) => self.clap.set_decay(value),
            (INST_CLAP, 3) => self.clap.volume = value.clamp(0.0, 1.0),
            (INST_HIHAT_C, 0) => self.hihat_c.set_decay(value),
            (INST_HIHAT_C, 3) => self.hihat_c.volume = value.clamp(0.0, 1.0),
            (INST_HIHAT_O, 0) => self.hihat_o.set_decay(value),
            (INST_HIHAT_O, 3) => self.hihat_o.volume = value.clamp(0.0, 1.0),
            (INST_LOW_TOM, 0) => self.low_tom.set_decay(value),
            (INST_LOW_TOM, 3) => self.low_tom.volume = value.clamp(0.0, 1.0),
            (INST_MID_TOM, 0) => self.mid_tom.set_decay(value),
            (INST_MID_TOM, 3) => self.mid_tom.volume = value.clamp(0.0, 1.0),
            (INST_HI_TOM, 0) => self.hi_tom.set_decay(value),
            (INST_HI_TOM, 3) => self.hi_tom.volume = value.clamp(0.0, 1.0),
            (INST_COWBELL, 0) => self.cowbell.set_decay(value),
            (INST_COWBELL, 3) => self.cowbell.volume = value.clamp(0.0, 1.0),
            (INST_RIMSHOT, 3) => self.rimshot.volume = value.clamp(0.0, 1.0),
            _ => {}
        }
    }

    pub fn process(&mut self) -> f32 {
        self.kick.process()
            + self.snare.process()
            + self.clap.process()
            + self.hihat_c.process()
            + self.hihat_o.process()
            + self.low_tom.process()
            + self.mid_tom.process()
            + self.hi_tom.process()
            + self.cowbell.process()
            + self.rimshot.process()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_kick_produces_decaying_tone() {
        let mut kit = DrumKit::boom(SR);
        kit.trigger(INST_KICK, 1.0);

        let mut early = 0.0f32;
        let mut late = 0.0f32;
        for i in 0..48_000 {
            let s = kit.process();
            assert!(s.is_finite());
            if i < 4800 {
                early = early.max(s.abs());
            } else if i > 43_200 {
                late = late.max(s.abs());
            }
        }
        println!("kick: early peak {}, late peak {}", early, late);
        assert!(early > 0.1, "kick should be audible");
        assert!(late < early * 0.1, "kick should decay");
    }

    #[test]
    fn test_idle_kit_is_silent() {
        let mut kit = DrumKit::punch(SR);
        for _ in 0..1000 {
            assert_eq!(kit.process(), 0.0);
        }
    }

    #[test]
    fn test_closed_hat_chokes_open() {
        let mut kit = DrumKit::boom(SR);
        kit.trigger(INST_HIHAT_O, 1.0);
        for _ in 0..100 {
            kit.process();
        }
        kit.trigger(INST_HIHAT_C, 1.0);
        // The open hat alone must now be silent
        let open_only: f32 = (0..100).map(|_| kit.hihat_o.process().abs()).sum();
        assert_eq!(open_only, 0.0, "open hat should be choked");
    }

    #[test]
    fn test_velocity_controls_level() {
        let mut loud = DrumKit::boom(SR);
        let mut soft = DrumKit::boom(SR);
        loud.trigger(INST_KICK, 1.0);
        soft.trigger(INST_KICK, 0.25);
        let mut peak_loud = 0.0f32;
        let mut peak_soft = 0.0f32;
        for _ in 0..9600 {
            peak_loud = peak_loud.max(loud.process().abs());
            peak_soft = peak_soft.max(soft.process().abs());
        }
        assert!(peak_loud > peak_soft * 1.5);
    }

    #[test]
    fn test_unknown_instrument_is_noop() {
        let mut kit = DrumKit::boom(SR);
        kit.trigger(99, 1.0);
        kit.set_param(99, 0, 0.5);
        assert_eq!(kit.process(), 0.0);
    }

    #[test]
    fn test_toms_are_tuned_low_to_high() {
        // Count zero crossings over the same window: the high tom must
        // oscillate faster than the low tom.
        let crossings = |voice: &mut TomVoice| {
            voice.trigger(1.0);
            let mut last = 0.0f32;
            let mut count = 0;
            for _ in 0..4800 {
                let s = voice.process();
                if s.signum() != last.signum() && s != 0.0 {
                    count += 1;
                }
                last = s;
            }
            count
        };

        let mut kit = DrumKit::boom(SR);
        let low = crossings(&mut kit.low_tom);
        let high = crossings(&mut kit.hi_tom);
        println!("tom crossings: low {} high {}", low, high);
        assert!(high > low, "high tom should be pitched above the low tom");
    }

    #[test]
    fn test_cowbell_and_rimshot_are_bounded_and_decay() {
        let mut kit = DrumKit::punch(SR);
        kit.trigger(INST_COWBELL, 1.0);
        kit.trigger(INST_RIMSHOT, 1.0);
        let mut peak = 0.0f32;
        for _ in 0..96_000 {
            let s = kit.process();
            assert!(s.is_finite());
            peak = peak.max(s.abs());
        }
        assert!(peak > 0.05, "metal voices should speak, got {}", peak);
        // Two seconds later both have died out
        assert_eq!(kit.process(), 0.0);
    }
}
