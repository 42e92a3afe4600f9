//! Dynamics processing: envelope-follower compressor and wavefolder.

/// Peak-envelope compressor.
///
/// Attack/release smoothing uses `exp(-1 / (sr * t))` coefficients. Above
/// threshold the static gain is `(env / threshold) ^ (1/ratio - 1)`; makeup
/// is either an explicit dB amount (master) or the ratio-derived
/// `1 + (ratio - 1) * 0.15` law (tracks).
pub struct Compressor {
    pub active: bool,
    pub threshold: f32,
    pub ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    makeup: f32,
    ratio_makeup: bool,
    envelope: f32,
    sr: f32,
}

impl Compressor {
    /// Master-style compressor: unity makeup until set in dB.
    pub fn new(sr: f32) -> Self {
        let mut comp = Self {
            active: false,
            threshold: 0.5,
            ratio: 4.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup: 1.0,
            ratio_makeup: false,
            envelope: 0.0,
            sr,
        };
        comp.set_attack_ms(10.0);
        comp.set_release_ms(100.0);
        comp
    }

    /// Track-style compressor: fast 2 ms / 60 ms coefficients and makeup
    /// derived from the ratio.
    pub fn new_track(sr: f32) -> Self {
        let mut comp = Self::new(sr);
        comp.set_attack_ms(2.0);
        comp.set_release_ms(60.0);
        comp.ratio_makeup = true;
        comp
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.envelope = 0.0;
        }
    }

    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold = 10.0f32.powf(db.clamp(-60.0, 0.0) / 20.0);
    }

    pub fn set_threshold_linear(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 1.0);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(1.0, 20.0);
    }

    pub fn set_attack_ms(&mut self, ms: f32) {
        let t = ms.clamp(0.1, 100.0) / 1000.0;
        self.attack_coeff = (-1.0 / (self.sr * t)).exp();
    }

    pub fn set_release_ms(&mut self, ms: f32) {
        let t = ms.clamp(10.0, 1000.0) / 1000.0;
        self.release_coeff = (-1.0 / (self.sr * t)).exp();
    }

    pub fn set_makeup_db(&mut self, db: f32) {
        self.makeup = 10.0f32.powf(db.clamp(0.0, 24.0) / 20.0);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

        let mut gain = 1.0;
        if self.envelope > self.threshold {
            let excess = self.envelope / self.threshold;
            gain = excess.powf(1.0 / self.ratio - 1.0);
            if self.ratio_makeup {
                gain *= 1.0 + (self.ratio - 1.0) * 0.15;
            }
        }
        input * gain * if self.ratio_makeup { 1.0 } else { self.makeup }
    }
}

/// Reflect-fold wavefolder. Gain at or below 1.01 is treated as bypass.
pub struct Wavefolder {
    pub gain: f32,
}

impl Wavefolder {
    pub fn new() -> Self {
        Self { gain: 1.0 }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.1, 20.0);
    }

    pub fn is_bypassed(&self) -> bool {
        self.gain <= 1.01
    }

    pub fn process(&self, input: f32) -> f32 {
        if self.is_bypassed() {
            return input;
        }
        let mut x = input * self.gain;
        // Mirror back into [-1, 1]; bounded iterations since gain is capped
        while x > 1.0 || x < -1.0 {
            if x > 1.0 {
                x = 2.0 - x;
            }
            if x < -1.0 {
                x = -2.0 - x;
            }
        }
        x
    }
}

impl Default for Wavefolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut comp = Compressor::new(SR);
        comp.set_active(true);
        comp.set_threshold_db(-20.0); // 0.1 linear
        comp.set_ratio(10.0);
        comp.set_attack_ms(1.0);
        comp.set_release_ms(50.0);

        let mut out_peak = 0.0f32;
        for _ in 0..48_000 {
            out_peak = out_peak.max(comp.process(0.9).abs());
        }
        println!("compressed steady 0.9 peak: {}", out_peak);
        // 0.9 is ~19 dB over threshold; at 10:1 the tail should sit far
        // below the input level once the envelope settles
        assert!(out_peak < 0.9);
        let settled = comp.process(0.9);
        assert!(settled < 0.25, "expected heavy reduction, got {}", settled);
    }

    #[test]
    fn test_compressor_passes_quiet_signal() {
        let mut comp = Compressor::new(SR);
        comp.set_active(true);
        comp.set_threshold_db(-6.0);
        comp.set_ratio(4.0);
        for _ in 0..1000 {
            let y = comp.process(0.1);
            assert!((y - 0.1).abs() < 1e-6, "below-threshold should pass, got {}", y);
        }
    }

    #[test]
    fn test_track_compressor_applies_ratio_makeup() {
        let mut comp = Compressor::new_track(SR);
        comp.set_active(true);
        comp.set_threshold_linear(0.1);
        comp.set_ratio(4.0);

        // Settle on a loud steady tone; makeup 1 + 3*0.15 = 1.45 applies
        // only above threshold
        let mut y = 0.0;
        for _ in 0..48_000 {
            y = comp.process(0.8);
        }
        let no_makeup = 0.8 * (0.8f32 / 0.1).powf(1.0 / 4.0 - 1.0);
        assert!(
            (y - no_makeup * 1.45).abs() < 0.02,
            "expected makeup-scaled output near {}, got {}",
            no_makeup * 1.45,
            y
        );
    }

    #[test]
    fn test_wavefolder_bypass_below_threshold_gain() {
        let folder = Wavefolder::new();
        assert_eq!(folder.process(0.7), 0.7);
        assert_eq!(folder.process(-1.5), -1.5);
    }

    #[test]
    fn test_wavefolder_folds_into_unit_range() {
        let mut folder = Wavefolder::new();
        folder.set_gain(6.0);
        for i in -100..=100 {
            let y = folder.process(i as f32 / 100.0);
            assert!((-1.0..=1.0).contains(&y), "folded sample escaped: {}", y);
        }
    }
}
