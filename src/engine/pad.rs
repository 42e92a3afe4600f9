//! Per-pad playback flags and FX, including the vinyl DSP (scratch and
//! turntablism) that takes over voice advance entirely.

use crate::audio::dsp::{CrackleNoise, DistortionMode};
use crate::audio::filters::{one_pole_alpha, BiquadCoeffs, FilterType};

/// What the vinyl DSP decided for one sample: how far to move the read
/// head, how dark the tone filter is, and whether to add crackle or gate
/// the sample off entirely.
#[derive(Debug, Clone, Copy)]
pub struct VinylStep {
    pub advance: f32,
    pub cutoff: f32,
    pub crackle: bool,
    pub gate_off: bool,
}

/// Two cascaded one-pole lowpasses, the warm "through a cartridge" tone.
#[derive(Debug, Clone, Copy, Default)]
struct VinylTone {
    lp1: f32,
    lp2: f32,
}

impl VinylTone {
    fn process(&mut self, x: f32, cutoff: f32, sr: f32) -> f32 {
        let alpha = one_pole_alpha(cutoff, sr);
        self.lp1 += alpha * (x - self.lp1);
        self.lp2 += alpha * (self.lp1 - self.lp2);
        self.lp2
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Scratch: a triangle LFO swings the read head forwards and backwards,
/// with a speed-tracking tone filter and sparse crackle.
pub struct ScratchFx {
    lfo_phase: f32,
    pub lfo_rate: f32,
    pub depth: f32,
    pub filter_cutoff: f32,
    pub crackle_amount: f32,
    tone: VinylTone,
    noise: CrackleNoise,
}

impl ScratchFx {
    pub fn new(seed: u32) -> Self {
        Self {
            lfo_phase: 0.0,
            lfo_rate: 5.0,
            depth: 0.85,
            filter_cutoff: 4000.0,
            crackle_amount: 0.25,
            tone: VinylTone::default(),
            noise: CrackleNoise::new(seed),
        }
    }

    pub fn configure(&mut self, rate: f32, depth: f32, cutoff: f32, crackle: f32) {
        self.lfo_phase = 0.0;
        self.lfo_rate = rate.clamp(0.5, 25.0);
        self.depth = depth.clamp(0.1, 1.0);
        self.filter_cutoff = cutoff.clamp(200.0, 12_000.0);
        self.crackle_amount = crackle.clamp(0.0, 1.0);
        self.tone.reset();
    }

    pub fn tick(&mut self, sr: f32) -> VinylStep {
        self.lfo_phase += self.lfo_rate / sr;
        if self.lfo_phase >= 1.0 {
            self.lfo_phase -= 1.0;
        }
        let tri = if self.lfo_phase < 0.5 {
            self.lfo_phase * 4.0 - 1.0
        } else {
            3.0 - self.lfo_phase * 4.0
        };
        let advance = tri * self.depth * 3.0;
        // Brighter when the head moves fast
        let cutoff = self.filter_cutoff * 0.075 + advance.abs() * self.filter_cutoff * 0.875;
        VinylStep {
            advance,
            cutoff,
            crackle: true,
            gate_off: false,
        }
    }

    pub fn shape(&mut self, sample: f32, step: &VinylStep, sr: f32) -> f32 {
        let mut s = self.tone.process(sample, step.cutoff, sr);
        if self.crackle_amount > 0.01 {
            let threshold = (self.crackle_amount * 28.0) as u8;
            let pop = self.noise.pop(threshold);
            if pop != 0.0 {
                s += pop * (0.015 + self.crackle_amount * 0.035);
            }
        }
        s
    }
}

/// Turntablism mode cycle: normal playback, brake, backspin, transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    Normal = 0,
    Brake = 1,
    Backspin = 2,
    Transform = 3,
}

impl TurnMode {
    fn from_index(i: u8) -> Self {
        match i & 3 {
            1 => TurnMode::Brake,
            2 => TurnMode::Backspin,
            3 => TurnMode::Transform,
            _ => TurnMode::Normal,
        }
    }

    fn next(self) -> Self {
        TurnMode::from_index(self as u8 + 1)
    }
}

/// Finite state machine over the four turntablism moves, each with a
/// per-mode timer in samples.
pub struct TurntablismFx {
    mode: TurnMode,
    mode_timer: u32,
    gate_phase: f32,
    pub auto_mode: bool,
    pub brake_len: u32,
    pub backspin_len: u32,
    pub transform_rate: f32,
    pub vinyl_noise: f32,
    tone: VinylTone,
    noise: CrackleNoise,
    sr: f32,
}

impl TurntablismFx {
    pub fn new(seed: u32, sr: f32) -> Self {
        Self {
            mode: TurnMode::Normal,
            mode_timer: Self::normal_len(sr),
            gate_phase: 0.0,
            auto_mode: true,
            brake_len: (sr * 0.32) as u32,
            backspin_len: (sr * 0.41) as u32,
            transform_rate: 11.0,
            vinyl_noise: 0.35,
            tone: VinylTone::default(),
            noise: CrackleNoise::new(seed),
            sr,
        }
    }

    fn normal_len(sr: f32) -> u32 {
        (sr * 0.75) as u32
    }

    fn transform_len(sr: f32) -> u32 {
        (sr * 0.55) as u32
    }

    pub fn configure(
        &mut self,
        auto_mode: bool,
        mode: i8,
        brake_ms: u16,
        backspin_ms: u16,
        transform_rate: f32,
        vinyl_noise: f32,
    ) {
        self.auto_mode = auto_mode;
        self.brake_len = (self.sr * brake_ms.clamp(100, 2000) as f32 / 1000.0) as u32;
        self.backspin_len = (self.sr * backspin_ms.clamp(100, 2000) as f32 / 1000.0) as u32;
        self.transform_rate = transform_rate.clamp(2.0, 30.0);
        self.vinyl_noise = vinyl_noise.clamp(0.0, 1.0);

        if (0..=3).contains(&mode) {
            self.mode = TurnMode::from_index(mode as u8);
            self.mode_timer = self.timer_for(self.mode);
            if self.mode == TurnMode::Transform {
                self.gate_phase = 0.0;
            }
        } else if self.mode_timer == 0 {
            self.mode = TurnMode::Normal;
            self.mode_timer = Self::normal_len(self.sr);
        }
        self.tone.reset();
    }

    fn timer_for(&self, mode: TurnMode) -> u32 {
        match mode {
            TurnMode::Normal => Self::normal_len(self.sr),
            TurnMode::Brake => self.brake_len,
            TurnMode::Backspin => self.backspin_len,
            TurnMode::Transform => Self::transform_len(self.sr),
        }
    }

    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    pub fn tick(&mut self) -> VinylStep {
        if self.mode_timer == 0 {
            if self.auto_mode {
                self.mode = self.mode.next();
            }
            self.mode_timer = self.timer_for(self.mode);
            if self.mode == TurnMode::Transform {
                self.gate_phase = 0.0;
            }
        }
        self.mode_timer -= 1;

        match self.mode {
            TurnMode::Normal => VinylStep {
                advance: 1.0,
                cutoff: 12_000.0,
                crackle: false,
                gate_off: false,
            },
            TurnMode::Brake => {
                // Linear deceleration to near-standstill
                let progress = 1.0 - self.mode_timer as f32 / self.brake_len.max(1) as f32;
                let advance = (1.0 - progress * 0.97).max(0.01);
                VinylStep {
                    advance,
                    cutoff: 10_000.0 * (1.0 - progress * 0.92) + 150.0,
                    crackle: progress > 0.7,
                    gate_off: false,
                }
            }
            TurnMode::Backspin => {
                // Quadratic reverse spin that dies out as the timer runs down
                let progress = self.mode_timer as f32 / self.backspin_len.max(1) as f32;
                VinylStep {
                    advance: -1.8 * progress * progress,
                    cutoff: 1500.0 + progress * 2500.0,
                    crackle: true,
                    gate_off: false,
                }
            }
            TurnMode::Transform => {
                self.gate_phase += self.transform_rate * std::f32::consts::TAU / self.sr;
                if self.gate_phase > std::f32::consts::TAU {
                    self.gate_phase -= std::f32::consts::TAU;
                }
                let gate = if self.gate_phase < std::f32::consts::PI {
                    1.0
                } else {
                    0.0
                };
                VinylStep {
                    advance: gate,
                    cutoff: 5000.0,
                    crackle: false,
                    gate_off: gate == 0.0,
                }
            }
        }
    }

    pub fn shape(&mut self, sample: f32, step: &VinylStep) -> f32 {
        let mut s = self.tone.process(sample, step.cutoff, self.sr);
        if step.crackle && self.vinyl_noise > 0.01 {
            let threshold = (self.vinyl_noise * 28.0) as u8;
            let pop = self.noise.pop(threshold);
            if pop != 0.0 {
                s += pop * (0.02 + self.vinyl_noise * 0.04);
            }
        }
        s
    }
}

/// Stutter: every `interval` samples the playing voice is rewound by 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stutter {
    pub active: bool,
    pub interval: u16,
    counter: u16,
}

impl Stutter {
    pub fn configure(&mut self, active: bool, interval: u16) {
        self.active = active;
        self.interval = interval.clamp(20, 2000);
        self.counter = 0;
    }

    /// Returns true when the voice should rewind this sample.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.counter += 1;
        if self.counter >= self.interval {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

/// Everything one pad owns besides its sample buffer.
pub struct PadFx {
    pub filter_type: FilterType,
    pub filter_coeffs: BiquadCoeffs,
    pub dist_drive: f32,
    pub dist_mode: DistortionMode,
    pub bit_depth: u8,
    pub loop_enabled: bool,
    pub reverse: bool,
    pub pitch: f32,
    pub stutter: Stutter,
    pub scratch: ScratchFx,
    pub turntablism: TurntablismFx,
}

impl PadFx {
    pub fn new(index: usize, sr: f32) -> Self {
        Self {
            filter_type: FilterType::None,
            filter_coeffs: BiquadCoeffs::identity(),
            dist_drive: 0.0,
            dist_mode: DistortionMode::Soft,
            bit_depth: 16,
            loop_enabled: false,
            reverse: false,
            pitch: 1.0,
            stutter: Stutter::default(),
            scratch: ScratchFx::new(12_345 + index as u32 * 7919),
            turntablism: TurntablismFx::new(67_890 + index as u32 * 6271, sr),
        }
    }

    pub fn clear_fx(&mut self) {
        self.filter_type = FilterType::None;
        self.filter_coeffs = BiquadCoeffs::identity();
        self.dist_drive = 0.0;
        self.dist_mode = DistortionMode::Soft;
        self.bit_depth = 16;
        self.loop_enabled = false;
        self.reverse = false;
        self.pitch = 1.0;
        self.stutter = Stutter::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_scratch_advance_swings_both_directions() {
        let mut scratch = ScratchFx::new(1);
        scratch.configure(8.0, 1.0, 4000.0, 0.0);
        let mut saw_forward = false;
        let mut saw_backward = false;
        for _ in 0..12_000 {
            let step = scratch.tick(SR);
            assert!(step.advance.abs() <= 3.0001);
            if step.advance > 1.0 {
                saw_forward = true;
            }
            if step.advance < -1.0 {
                saw_backward = true;
            }
        }
        assert!(saw_forward && saw_backward, "scratch should move both ways");
    }

    #[test]
    fn test_turntablism_auto_cycles_modes() {
        let mut turn = TurntablismFx::new(1, SR);
        turn.configure(true, -1, 300, 400, 11.0, 0.0);
        let mut seen = std::collections::BTreeSet::new();
        // Normal(750ms) + brake(300ms) + backspin(400ms) + transform(550ms)
        // fits well inside 3 seconds
        for _ in 0..(SR as usize * 3) {
            turn.tick();
            seen.insert(turn.mode() as u8);
        }
        assert_eq!(seen.len(), 4, "auto mode should visit all 4 modes");
    }

    #[test]
    fn test_turntablism_manual_stays_in_mode() {
        let mut turn = TurntablismFx::new(1, SR);
        turn.configure(false, 1, 200, 200, 11.0, 0.0);
        for _ in 0..(SR as usize) {
            turn.tick();
            assert_eq!(turn.mode(), TurnMode::Brake);
        }
    }

    #[test]
    fn test_brake_decelerates_monotonically() {
        let mut turn = TurntablismFx::new(1, SR);
        turn.configure(false, 1, 500, 500, 11.0, 0.0);
        let mut last = f32::INFINITY;
        for _ in 0..(SR as usize / 4) {
            let step = turn.tick();
            assert!(step.advance <= last + 1e-6);
            assert!(step.advance >= 0.01);
            last = step.advance;
        }
    }

    #[test]
    fn test_backspin_advances_backwards() {
        let mut turn = TurntablismFx::new(1, SR);
        turn.configure(false, 2, 500, 500, 11.0, 0.0);
        let step = turn.tick();
        assert!(step.advance < 0.0, "backspin must move backwards");
        assert!(step.advance >= -1.8001);
    }

    #[test]
    fn test_transform_gates_on_and_off() {
        let mut turn = TurntablismFx::new(1, SR);
        turn.configure(false, 3, 200, 200, 11.0, 0.0);
        let mut on = 0usize;
        let mut off = 0usize;
        for _ in 0..(SR as usize / 2) {
            let step = turn.tick();
            if step.gate_off {
                off += 1;
            } else {
                on += 1;
            }
        }
        println!("transform duty: {} on / {} off", on, off);
        assert!(on > 0 && off > 0, "transform should chop the signal");
    }

    #[test]
    fn test_stutter_fires_every_interval() {
        let mut stutter = Stutter::default();
        stutter.configure(true, 100);
        let mut fires = 0;
        for _ in 0..1000 {
            if stutter.tick() {
                fires += 1;
            }
        }
        assert_eq!(fires, 10);
    }
}
