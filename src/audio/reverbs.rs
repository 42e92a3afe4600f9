use crate::audio::buffers::DelayBuffer;
use crate::audio::filters::{OnePole, OnePoleMode};
use crate::audio::{AudioProcessor, StereoAudioProcessor};

// Fast Hadamard Transform for the 8x8 feedback matrix; cheaper than a
// dense matrix multiply and energy-preserving after the 1/sqrt(8) scale.
fn fast_hadamard_transform_8(signals: &mut [f32; 8]) {
    let mut temp = [0.0f32; 8];
    for i in 0..4 {
        temp[i] = signals[i] + signals[i + 4];
        temp[i + 4] = signals[i] - signals[i + 4];
    }
    *signals = temp;

    for i in 0..2 {
        temp[i] = signals[i] + signals[i + 2];
        temp[i + 2] = signals[i] - signals[i + 2];
        temp[i + 4] = signals[i + 4] + signals[i + 6];
        temp[i + 6] = signals[i + 4] - signals[i + 6];
    }
    *signals = temp;

    for i in 0..4 {
        let base = i * 2;
        temp[base] = signals[base] + signals[base + 1];
        temp[base + 1] = signals[base] - signals[base + 1];
    }
    *signals = temp;

    let scale = 1.0 / (8.0f32).sqrt();
    for s in signals.iter_mut() {
        *s *= scale;
    }
}

// Base delay times chosen mutually prime-ish to avoid resonances (seconds)
const BASE_DELAYS: [f32; 8] = [0.046, 0.074, 0.082, 0.106, 0.134, 0.142, 0.158, 0.166];

/// 8-line feedback delay network reverb.
///
/// This is the master chain's reverb collaborator: stereo in/out, feedback
/// controls decay, a one-pole lowpass in each feedback path darkens the
/// tail, `mix` is applied by the caller (the master chain crossfades).
pub struct FdnReverb {
    delay_lines: [DelayBuffer; 8],
    delays_samples: [usize; 8],
    feedback_lowpass: [OnePole; 8],
    feedback: f32,
    pub mix: f32,
}

impl FdnReverb {
    pub fn new(sr: f32) -> Self {
        let delay_lines = std::array::from_fn(|_| DelayBuffer::new((0.2 * sr) as usize + 1));
        let delays_samples = std::array::from_fn(|i| (BASE_DELAYS[i] * sr) as usize);
        // Slightly detuned cutoffs per line for a less static tail
        let feedback_lowpass = std::array::from_fn(|i| {
            OnePole::new(8000.0 - i as f32 * 180.0, OnePoleMode::Lowpass, sr)
        });

        Self {
            delay_lines,
            delays_samples,
            feedback_lowpass,
            feedback: 0.85,
            mix: 0.3,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    pub fn set_lp_freq(&mut self, freq: f32, sr: f32) {
        for lp in self.feedback_lowpass.iter_mut() {
            lp.set_cutoff(freq.clamp(200.0, 18_000.0), sr);
        }
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn clear(&mut self) {
        for line in self.delay_lines.iter_mut() {
            line.clear();
        }
        for lp in self.feedback_lowpass.iter_mut() {
            lp.reset();
        }
    }
}

impl StereoAudioProcessor for FdnReverb {
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut outputs = [0.0f32; 8];
        for i in 0..8 {
            outputs[i] = self.delay_lines[i].read(self.delays_samples[i]);
        }

        fast_hadamard_transform_8(&mut outputs);

        let scaled_left = left * 0.25;
        let scaled_right = right * 0.25;
        for i in 0..8 {
            let fed_back = self.feedback_lowpass[i].process(outputs[i]) * self.feedback;
            let input = if i % 2 == 0 { scaled_left } else { scaled_right };
            self.delay_lines[i].write(input + fed_back);
        }

        let out_left = outputs[0] + outputs[2] + outputs[4] + outputs[6];
        let out_right = outputs[1] + outputs[3] + outputs[5] + outputs[7];
        (out_left, out_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdn_reverb_silence_in_silence_out() {
        let mut reverb = FdnReverb::new(48_000.0);
        for _ in 0..1000 {
            let (l, r) = reverb.process_stereo(0.0, 0.0);
            assert_eq!(l, 0.0);
            assert_eq!(r, 0.0);
        }
    }

    #[test]
    fn test_fdn_reverb_produces_decaying_tail() {
        let mut reverb = FdnReverb::new(48_000.0);
        reverb.set_feedback(0.85);

        reverb.process_stereo(1.0, 0.5);

        let mut early_peak = 0.0f32;
        let mut late_peak = 0.0f32;
        for i in 0..96_000 {
            let (l, r) = reverb.process_stereo(0.0, 0.0);
            let amp = l.abs().max(r.abs());
            if i < 24_000 {
                early_peak = early_peak.max(amp);
            } else if i >= 72_000 {
                late_peak = late_peak.max(amp);
            }
        }

        println!("reverb tail: early {} late {}", early_peak, late_peak);
        assert!(early_peak > 0.01, "impulse should produce a tail");
        assert!(late_peak < early_peak, "tail should decay");
        assert!(late_peak.is_finite());
    }

    #[test]
    fn test_hadamard_energy_conservation() {
        let mut signals = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let energy_in: f32 = signals.iter().map(|x| x * x).sum();
        fast_hadamard_transform_8(&mut signals);
        let energy_out: f32 = signals.iter().map(|x| x * x).sum();
        assert!(
            (energy_in - energy_out).abs() < 1e-3,
            "energy not conserved: {} vs {}",
            energy_in,
            energy_out
        );
    }

    #[test]
    fn test_hadamard_impulse_spreads_evenly() {
        let mut signals = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        fast_hadamard_transform_8(&mut signals);
        let expected = 1.0 / (8.0f32).sqrt();
        for (i, v) in signals.iter().enumerate() {
            assert!(
                (v - expected).abs() < 1e-6,
                "lane {}: expected {}, got {}",
                i,
                expected,
                v
            );
        }
    }
}
