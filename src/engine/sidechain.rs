//! Sidechain ducking network: one source track, a bitmask of destinations,
//! and a per-destination envelope with a velocity-scaled hold window.

use crate::engine::MAX_AUDIO_TRACKS;

pub const SIDECHAIN_GAIN_FLOOR: f32 = 0.08;

pub struct Sidechain {
    pub active: bool,
    pub source: usize,
    pub dest_mask: u16,
    pub amount: f32,
    pub knee: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelopes: [f32; MAX_AUDIO_TRACKS],
    hold_samples: [u32; MAX_AUDIO_TRACKS],
    sr: f32,
}

impl Sidechain {
    pub fn new(sr: f32) -> Self {
        let mut sc = Self {
            active: false,
            source: 0,
            dest_mask: 0,
            amount: 0.0,
            knee: 0.4,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelopes: [0.0; MAX_AUDIO_TRACKS],
            hold_samples: [0; MAX_AUDIO_TRACKS],
            sr,
        };
        sc.set_times(6.0, 160.0);
        sc
    }

    pub fn configure(
        &mut self,
        active: bool,
        source: usize,
        dest_mask: u16,
        amount: f32,
        attack_ms: f32,
        release_ms: f32,
        knee: f32,
    ) {
        self.active = active;
        self.source = source.min(MAX_AUDIO_TRACKS - 1);
        self.dest_mask = dest_mask;
        self.amount = amount.clamp(0.0, 1.0);
        self.knee = knee.clamp(0.0, 1.0);
        self.set_times(attack_ms, release_ms);
        if !active {
            self.envelopes = [0.0; MAX_AUDIO_TRACKS];
            self.hold_samples = [0; MAX_AUDIO_TRACKS];
        }
    }

    pub fn clear(&mut self) {
        self.configure(false, 0, 0, 0.0, 6.0, 160.0, 0.4);
    }

    fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        let a = attack_ms.clamp(0.1, 80.0) / 1000.0;
        let r = release_ms.clamp(10.0, 1200.0) / 1000.0;
        self.attack_coeff = (-1.0 / (self.sr * a)).exp();
        self.release_coeff = (-1.0 / (self.sr * r)).exp();
    }

    /// Kick the hold window on every destination. Hold runs
    /// `8 ms + 16 ms * vel/127`, velocity floor 0.25.
    pub fn trigger(&mut self, source: usize, velocity: u8) {
        if !self.active || source != self.source {
            return;
        }
        let vel = (velocity as f32 / 127.0).clamp(0.25, 1.0);
        let hold = (self.sr * (0.008 + 0.016 * vel)) as u32;
        for t in 0..MAX_AUDIO_TRACKS {
            if t != self.source && self.dest_mask & (1 << t) != 0 {
                self.hold_samples[t] = hold;
            }
        }
    }

    /// Advance every destination envelope one sample and return the gains.
    /// The source track and untargeted tracks always get 1.0.
    pub fn tick(&mut self) -> [f32; MAX_AUDIO_TRACKS] {
        let mut gains = [1.0f32; MAX_AUDIO_TRACKS];
        if !self.active {
            self.envelopes = [0.0; MAX_AUDIO_TRACKS];
            self.hold_samples = [0; MAX_AUDIO_TRACKS];
            return gains;
        }

        for t in 0..MAX_AUDIO_TRACKS {
            let targeted = self.dest_mask & (1 << t) != 0;
            if !targeted || t == self.source {
                self.envelopes[t] = 0.0;
                self.hold_samples[t] = 0;
                continue;
            }

            let target = if self.hold_samples[t] > 0 { 1.0 } else { 0.0 };
            let env = self.envelopes[t];
            let coeff = if target > env {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            let env = coeff * env + (1.0 - coeff) * target;
            self.envelopes[t] = env;
            if self.hold_samples[t] > 0 {
                self.hold_samples[t] -= 1;
            }

            let shaped = env.clamp(0.0, 1.0).powf(1.0 + self.knee * 3.0);
            gains[t] = (1.0 - self.amount * shaped).max(SIDECHAIN_GAIN_FLOOR);
        }
        gains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_inactive_sidechain_is_unity() {
        let mut sc = Sidechain::new(SR);
        for _ in 0..1000 {
            assert_eq!(sc.tick(), [1.0; MAX_AUDIO_TRACKS]);
        }
    }

    #[test]
    fn test_gain_stays_in_legal_range() {
        let mut sc = Sidechain::new(SR);
        sc.configure(true, 0, 0xFFFE, 1.0, 0.1, 10.0, 1.0);
        sc.trigger(0, 127);
        for _ in 0..48_000 {
            for (t, g) in sc.tick().iter().enumerate() {
                assert!(
                    (SIDECHAIN_GAIN_FLOOR..=1.0).contains(g),
                    "track {} gain {} out of range",
                    t,
                    g
                );
            }
        }
    }

    #[test]
    fn test_source_track_is_never_attenuated() {
        let mut sc = Sidechain::new(SR);
        // Destination mask includes the source bit on purpose
        sc.configure(true, 2, 0xFFFF, 1.0, 1.0, 50.0, 0.0);
        sc.trigger(2, 127);
        for _ in 0..5000 {
            let gains = sc.tick();
            assert_eq!(gains[2], 1.0);
        }
    }

    #[test]
    fn test_duck_and_recover_timing() {
        let mut sc = Sidechain::new(SR);
        sc.configure(true, 0, 0b0010, 1.0, 10.0, 100.0, 0.0);
        sc.trigger(0, 127);

        // Inside the ~24 ms hold window the envelope charges towards 1 and
        // the destination gain should approach the floor
        let mut min_gain = 1.0f32;
        for _ in 0..((SR * 0.024) as usize) {
            min_gain = min_gain.min(sc.tick()[1]);
        }
        println!("min gain during hold: {}", min_gain);
        assert!(min_gain < 0.15, "should duck close to the floor, got {}", min_gain);

        // 400 ms later (4 release constants) it must be essentially back
        let mut gain = 0.0;
        for _ in 0..((SR * 0.4) as usize) {
            gain = sc.tick()[1];
        }
        println!("gain after release: {}", gain);
        assert!(gain > 0.95, "should recover to unity, got {}", gain);
    }

    #[test]
    fn test_untargeted_track_unaffected() {
        let mut sc = Sidechain::new(SR);
        sc.configure(true, 0, 0b0010, 1.0, 1.0, 50.0, 0.0);
        sc.trigger(0, 127);
        for _ in 0..2000 {
            let gains = sc.tick();
            assert_eq!(gains[5], 1.0);
        }
    }

    #[test]
    fn test_trigger_for_wrong_source_ignored() {
        let mut sc = Sidechain::new(SR);
        sc.configure(true, 0, 0b0010, 1.0, 1.0, 50.0, 0.0);
        sc.trigger(3, 127);
        for _ in 0..1000 {
            assert_eq!(sc.tick()[1], 1.0);
        }
    }
}
