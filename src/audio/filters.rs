use crate::audio::{AudioProcessor, PI, TWO_PI};

/// Named biquad responses, Audio EQ Cookbook forms.
///
/// `Scratch` and `Turntablism` are not biquads at all: when selected as a
/// pad filter they hand the whole voice advance over to the vinyl DSP in
/// [`crate::engine::pad`]. They live in this enum because the wire protocol
/// selects them through the same filter-type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    None,
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
    Allpass,
    Peaking,
    LowShelf,
    HighShelf,
    Resonant,
    Scratch,
    Turntablism,
}

impl FilterType {
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            1 => FilterType::Lowpass,
            2 => FilterType::Highpass,
            3 => FilterType::Bandpass,
            4 => FilterType::Notch,
            5 => FilterType::Allpass,
            6 => FilterType::Peaking,
            7 => FilterType::LowShelf,
            8 => FilterType::HighShelf,
            9 => FilterType::Resonant,
            10 => FilterType::Scratch,
            11 => FilterType::Turntablism,
            _ => FilterType::None,
        }
    }

    pub fn is_vinyl(self) -> bool {
        matches!(self, FilterType::Scratch | FilterType::Turntablism)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Cookbook coefficients for `kind` at `cutoff`/`q`, normalized by a0.
    /// `gain_db` only matters for the peaking and shelf responses.
    pub fn cookbook(kind: FilterType, cutoff: f32, q: f32, gain_db: f32, sr: f32) -> Self {
        let cutoff = cutoff.clamp(20.0, sr * 0.45);
        let q = q.max(0.3);
        let w0 = TWO_PI * cutoff / sr;
        let sn = w0.sin();
        let cs = w0.cos();
        let alpha = sn / (2.0 * q);
        let a = 10.0f32.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterType::Lowpass | FilterType::Resonant => {
                let b1 = 1.0 - cs;
                (b1 * 0.5, b1, b1 * 0.5, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b1 = -(1.0 + cs);
                (-b1 * 0.5, b1, -b1 * 0.5, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cs, 1.0 - alpha),
            FilterType::Notch => (1.0, -2.0 * cs, 1.0, 1.0 + alpha, -2.0 * cs, 1.0 - alpha),
            FilterType::Allpass => (
                1.0 - alpha,
                -2.0 * cs,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cs,
                1.0 - alpha,
            ),
            FilterType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cs,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cs,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let sq = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cs + sq),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cs),
                    a * ((a + 1.0) - (a - 1.0) * cs - sq),
                    (a + 1.0) + (a - 1.0) * cs + sq,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cs),
                    (a + 1.0) + (a - 1.0) * cs - sq,
                )
            }
            FilterType::HighShelf => {
                let sq = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cs + sq),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cs),
                    a * ((a + 1.0) + (a - 1.0) * cs - sq),
                    (a + 1.0) - (a - 1.0) * cs + sq,
                    2.0 * ((a - 1.0) - (a + 1.0) * cs),
                    (a + 1.0) - (a - 1.0) * cs - sq,
                )
            }
            _ => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
        };

        let inv_a0 = 1.0 / a0;
        Self {
            b0: b0 * inv_a0,
            b1: b1 * inv_a0,
            b2: b2 * inv_a0,
            a1: a1 * inv_a0,
            a2: a2 * inv_a0,
        }
    }
}

/// Two delay words of a Direct Form II Transposed biquad.
///
/// State is kept separate from coefficients so a single coefficient set can
/// drive many independent signal paths (one per voice).
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    pub z1: f32,
    pub z2: f32,
}

impl BiquadState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub fn biquad_process(coeffs: &BiquadCoeffs, state: &mut BiquadState, x: f32) -> f32 {
    let y = coeffs.b0 * x + state.z1;
    state.z1 = coeffs.b1 * x - coeffs.a1 * y + state.z2;
    state.z2 = coeffs.b2 * x - coeffs.a2 * y;
    y
}

/// Biquad with owned state, for fixtures that only need one signal path.
pub struct Biquad {
    pub coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl Biquad {
    pub fn identity() -> Self {
        Self {
            coeffs: BiquadCoeffs::identity(),
            state: BiquadState::default(),
        }
    }

    pub fn set(&mut self, kind: FilterType, cutoff: f32, q: f32, gain_db: f32, sr: f32) {
        self.coeffs = BiquadCoeffs::cookbook(kind, cutoff, q, gain_db, sr);
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }

    pub fn reset(&mut self) {
        self.coeffs = BiquadCoeffs::identity();
        self.state.clear();
    }
}

impl AudioProcessor for Biquad {
    fn process(&mut self, input: f32) -> f32 {
        biquad_process(&self.coeffs, &mut self.state, input)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum OnePoleMode {
    Lowpass,
    Highpass,
}

/// One-pole filter with a single state word, coefficient
/// `alpha = fc / (fc + sr / 2pi)`.
pub struct OnePole {
    state: f32,
    alpha: f32,
    mode: OnePoleMode,
}

impl OnePole {
    pub fn new(cutoff: f32, mode: OnePoleMode, sr: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            alpha: 0.0,
            mode,
        };
        filter.set_cutoff(cutoff, sr);
        filter
    }

    pub fn set_cutoff(&mut self, cutoff: f32, sr: f32) {
        self.alpha = one_pole_alpha(cutoff, sr);
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

pub fn one_pole_alpha(cutoff: f32, sr: f32) -> f32 {
    cutoff / (cutoff + sr / TWO_PI)
}

impl AudioProcessor for OnePole {
    fn process(&mut self, input: f32) -> f32 {
        self.state += self.alpha * (input - self.state);
        match self.mode {
            OnePoleMode::Lowpass => self.state,
            OnePoleMode::Highpass => input - self.state,
        }
    }
}

/// 4-stage tanh-saturating ladder, the resonant core of the acid synth.
///
/// Each stage is a one-pole lowpass; the output of stage 4 is fed back into
/// the input scaled by four times the resonance.
pub struct Ladder {
    stages: [f32; 4],
    sr: f32,
}

impl Ladder {
    pub fn new(sr: f32) -> Self {
        Self {
            stages: [0.0; 4],
            sr,
        }
    }

    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
    }

    pub fn process(&mut self, input: f32, cutoff: f32, resonance: f32) -> f32 {
        let f = (2.0 * cutoff / self.sr).min(0.99);
        // Tuning compensation for the bilinear warp
        let g = f * (1.0 + f * -0.25);
        let fb = resonance * 4.0;
        let comp = 1.0 / (1.0 + fb * 0.25);

        let x = ((input - fb * self.stages[3]) * comp).tanh();

        let mut prev = x;
        for stage in self.stages.iter_mut() {
            *stage += g * (prev.tanh() - stage.tanh());
            prev = *stage;
        }
        self.stages[3]
    }
}

// Tan approximation for allpass coefficients, accurate for small angles
pub fn tan_a(x: f32) -> f32 {
    x + (x * x * x) * 0.333_333
}

/// First-order allpass coefficient for a phaser stage at `freq`.
pub fn allpass_coeff(freq: f32, sr: f32) -> f32 {
    let tn = tan_a(PI * freq / sr);
    (1.0 - tn) / (1.0 + tn)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_identity_biquad_passes_signal() {
        let mut bq = Biquad::identity();
        for i in 0..64 {
            let x = (i as f32 * 0.01).sin();
            assert_eq!(bq.process(x), x);
        }
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let mut bq = Biquad::identity();
        bq.set(FilterType::Lowpass, 500.0, 0.707, 0.0, SR);

        // 8 kHz tone through a 500 Hz lowpass should come out much smaller
        let mut peak_in = 0.0f32;
        let mut peak_out = 0.0f32;
        for i in 0..4800 {
            let x = (TWO_PI * 8000.0 * i as f32 / SR).sin();
            let y = bq.process(x);
            if i > 1000 {
                peak_in = peak_in.max(x.abs());
                peak_out = peak_out.max(y.abs());
            }
        }
        println!("lowpass test: in peak {} out peak {}", peak_in, peak_out);
        assert!(peak_out < peak_in * 0.1, "expected > 20 dB attenuation");
    }

    #[test]
    fn test_filter_clear_restores_fresh_output() {
        let run = |bq: &mut Biquad| -> Vec<f32> {
            (0..256)
                .map(|i| bq.process(if i == 0 { 1.0 } else { 0.0 }))
                .collect()
        };

        let mut fresh = Biquad::identity();
        fresh.set(FilterType::Bandpass, 1200.0, 4.0, 0.0, SR);
        let expected = run(&mut fresh);

        let mut reused = Biquad::identity();
        reused.set(FilterType::Bandpass, 1200.0, 4.0, 0.0, SR);
        // Pollute the state, then clear
        for i in 0..100 {
            reused.process((i as f32 * 0.13).sin());
        }
        reused.clear();
        let actual = run(&mut reused);

        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            assert!(
                (e - a).abs() < 1e-9,
                "sample {} differs after clear: {} vs {}",
                i,
                e,
                a
            );
        }
    }

    #[test]
    fn test_shelf_gain_is_applied_once() {
        // +12 dB low shelf at DC should settle near 4x amplitude; a double
        // a0 normalization would show up as a wildly different gain.
        let mut bq = Biquad::identity();
        bq.set(FilterType::LowShelf, 200.0, 0.707, 12.0, SR);
        let mut y = 0.0;
        for _ in 0..48_000 {
            y = bq.process(1.0);
        }
        let gain_db = 20.0 * y.abs().log10();
        println!("low shelf DC gain: {:.2} dB", gain_db);
        assert!((gain_db - 12.0).abs() < 0.5);
    }

    #[test]
    fn test_one_pole_lowpass_tracks_dc() {
        let mut lp = OnePole::new(1000.0, OnePoleMode::Lowpass, SR);
        let mut y = 0.0;
        for _ in 0..10_000 {
            y = lp.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-3, "one-pole LP should settle to DC, got {}", y);
    }

    #[test]
    fn test_ladder_is_stable_at_high_resonance() {
        let mut ladder = Ladder::new(SR);
        let mut peak = 0.0f32;
        for i in 0..48_000 {
            let x = (TWO_PI * 110.0 * i as f32 / SR).sin();
            let y = ladder.process(x, 800.0, 0.95);
            peak = peak.max(y.abs());
        }
        println!("ladder peak at res 0.95: {}", peak);
        assert!(peak.is_finite());
        assert!(peak < 2.0, "ladder should stay bounded, got {}", peak);
    }
}
