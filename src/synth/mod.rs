//! The math-synth collaborators: two drum kits and the acid monosynth,
//! mixed mono behind an engine-activity bitmask.

pub mod acid;
pub mod kit;

pub use acid::{AcidSynth, AcidWave};
pub use kit::DrumKit;

/// Engine indices on the wire.
pub const ENGINE_BOOM: u8 = 0;
pub const ENGINE_PUNCH: u8 = 1;
pub const ENGINE_TICK: u8 = 2;
pub const ENGINE_ACID: u8 = 3;

/// Default mask: boom + punch + acid; the tick kit opts in explicitly.
pub const DEFAULT_ACTIVE_MASK: u8 = 0x0B;

pub struct SynthRack {
    pub boom: DrumKit,
    pub punch: DrumKit,
    pub tick: DrumKit,
    pub acid: AcidSynth,
    pub active_mask: u8,
}

impl SynthRack {
    pub fn new(sr: f32) -> Self {
        Self {
            boom: DrumKit::boom(sr),
            punch: DrumKit::punch(sr),
            tick: DrumKit::tick(sr),
            acid: AcidSynth::new(sr),
            active_mask: DEFAULT_ACTIVE_MASK,
        }
    }

    pub fn trigger(&mut self, engine: u8, instrument: u8, velocity: f32) {
        match engine {
            ENGINE_BOOM => self.boom.trigger(instrument, velocity),
            ENGINE_PUNCH => self.punch.trigger(instrument, velocity),
            ENGINE_TICK => self.tick.trigger(instrument, velocity),
            _ => {}
        }
    }

    pub fn set_param(&mut self, engine: u8, instrument: u8, param: u8, value: f32) {
        match engine {
            ENGINE_BOOM => self.boom.set_param(instrument, param, value),
            ENGINE_PUNCH => self.punch.set_param(instrument, param, value),
            ENGINE_TICK => self.tick.set_param(instrument, param, value),
            _ => {}
        }
    }

    /// Acid parameter ids: 0 cutoff, 1 resonance, 2 env-mod, 3 decay,
    /// 4 accent, 5 slide, 6 waveform, 7 volume.
    pub fn set_acid_param(&mut self, param: u8, value: f32) {
        match param {
            0 => self.acid.set_cutoff(value),
            1 => self.acid.set_resonance(value),
            2 => self.acid.set_env_mod(value),
            3 => self.acid.set_decay(value),
            4 => self.acid.set_accent(value),
            5 => self.acid.set_slide(value),
            6 => {
                self.acid.waveform = if value < 0.5 {
                    AcidWave::Saw
                } else {
                    AcidWave::Square
                }
            }
            7 => self.acid.volume = value.clamp(0.0, 1.0),
            _ => {}
        }
    }

    pub fn process(&mut self) -> f32 {
        let mut mix = 0.0;
        if self.active_mask & (1 << ENGINE_BOOM) != 0 {
            mix += self.boom.process();
        }
        if self.active_mask & (1 << ENGINE_PUNCH) != 0 {
            mix += self.punch.process();
        }
        if self.active_mask & (1 << ENGINE_TICK) != 0 {
            mix += self.tick.process();
        }
        if self.active_mask & (1 << ENGINE_ACID) != 0 {
            mix += self.acid.process();
        }
        mix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_masked_out_engine_is_silent() {
        let mut rack = SynthRack::new(SR);
        rack.active_mask = 0;
        rack.trigger(ENGINE_BOOM, kit::INST_KICK, 1.0);
        for _ in 0..1000 {
            assert_eq!(rack.process(), 0.0);
        }
    }

    #[test]
    fn test_trigger_routes_to_right_kit() {
        let mut rack = SynthRack::new(SR);
        rack.trigger(ENGINE_PUNCH, kit::INST_SNARE, 1.0);
        let mut heard = 0.0f32;
        for _ in 0..2400 {
            heard = heard.max(rack.process().abs());
        }
        assert!(heard > 0.01);
        // Boom kit untouched
        assert_eq!(rack.boom.process(), 0.0);
    }

    #[test]
    fn test_tick_kit_masked_off_by_default() {
        let mut rack = SynthRack::new(SR);
        rack.trigger(ENGINE_TICK, kit::INST_KICK, 1.0);
        for _ in 0..1000 {
            assert_eq!(rack.process(), 0.0, "tick kit is opt-in");
        }
        // Unmask it and the pending envelope becomes audible on retrigger
        rack.active_mask |= 1 << ENGINE_TICK;
        rack.trigger(ENGINE_TICK, kit::INST_KICK, 1.0);
        let mut heard = 0.0f32;
        for _ in 0..2400 {
            heard = heard.max(rack.process().abs());
        }
        assert!(heard > 0.05);
    }

    #[test]
    fn test_acid_param_dispatch() {
        let mut rack = SynthRack::new(SR);
        rack.set_acid_param(0, 3000.0);
        assert_eq!(rack.acid.cutoff, 3000.0);
        rack.set_acid_param(6, 1.0);
        assert_eq!(rack.acid.waveform, AcidWave::Square);
        rack.set_acid_param(99, 1.0); // unknown id is a no-op
    }
}
