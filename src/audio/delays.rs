use crate::audio::buffers::DelayBuffer;
use crate::audio::dsp::soft_limit;

/// Master delay/echo: circular buffer, feedback, dry/wet crossfade.
///
/// The delay doubles as the return point of the per-track delay send bus:
/// the send sum is injected into the written sample alongside the dry
/// input. Feedback writes are soft-limited to keep runaway loops bounded.
pub struct MasterDelay {
    buffer: DelayBuffer,
    delay_samples: usize,
    pub active: bool,
    pub feedback: f32,
    pub mix: f32,
    sr: f32,
}

impl MasterDelay {
    pub fn new(max_seconds: f32, sr: f32) -> Self {
        Self {
            buffer: DelayBuffer::new((max_seconds * sr) as usize),
            delay_samples: (0.25 * sr) as usize,
            active: false,
            feedback: 0.3,
            mix: 0.3,
            sr,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.buffer.clear();
        }
    }

    pub fn set_time_ms(&mut self, ms: f32) {
        let ms = ms.clamp(10.0, 2000.0);
        self.delay_samples = ((ms * self.sr / 1000.0) as usize).min(self.buffer.len() - 1);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.95);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// One frame: returns the wet tap. `send` is the summed delay-send bus
    /// for this frame; the caller crossfades dry/wet per channel.
    pub fn tick(&mut self, input: f32, send: f32) -> f32 {
        let delayed = self.buffer.read(self.delay_samples);
        self.buffer
            .write(soft_limit(input + send + delayed * self.feedback));
        delayed
    }

    pub fn process(&mut self, input: f32, send: f32) -> f32 {
        let delayed = self.tick(input, send);
        input * (1.0 - self.mix) + delayed * self.mix
    }
}

/// Per-track echo, capped at 200 ms. Identical topology to the master delay
/// but without a send input; the written value is soft-limited against
/// feedback runaway.
pub struct TrackEcho {
    buffer: DelayBuffer,
    delay_samples: usize,
    pub active: bool,
    pub feedback: f32,
    pub mix: f32,
    sr: f32,
}

impl TrackEcho {
    pub fn new(max_samples: usize, sr: f32) -> Self {
        Self {
            buffer: DelayBuffer::new(max_samples),
            delay_samples: (0.1 * sr) as usize,
            active: false,
            feedback: 0.4,
            mix: 0.5,
            sr,
        }
    }

    pub fn configure(&mut self, active: bool, time_ms: f32, feedback: f32, mix: f32) {
        self.active = active;
        if active {
            let samples = (time_ms.clamp(10.0, 200.0) * self.sr / 1000.0) as usize;
            self.delay_samples = samples.clamp(1, self.buffer.len() - 1);
            self.feedback = feedback.clamp(0.0, 0.95);
            self.mix = mix.clamp(0.0, 1.0);
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.buffer.clear();
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer.read(self.delay_samples);
        self.buffer
            .write(soft_limit(input + delayed * self.feedback));
        input * (1.0 - self.mix) + delayed * self.mix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_master_delay_echoes_after_delay_time() {
        let mut delay = MasterDelay::new(2.0, SR);
        delay.set_active(true);
        delay.set_time_ms(10.0); // 480 samples
        delay.set_feedback(0.0);
        delay.set_mix(1.0);

        assert_eq!(delay.process(1.0, 0.0), 0.0);
        for _ in 0..479 {
            assert_eq!(delay.process(0.0, 0.0), 0.0);
        }
        let echoed = delay.process(0.0, 0.0);
        assert!(
            (echoed - 0.5).abs() < 1e-5,
            "soft-limited impulse should echo as 0.5, got {}",
            echoed
        );
    }

    #[test]
    fn test_master_delay_send_bus_reaches_output() {
        let mut delay = MasterDelay::new(2.0, SR);
        delay.set_active(true);
        delay.set_time_ms(10.0);
        delay.set_mix(1.0);

        // Inject only through the send bus
        delay.process(0.0, 1.0);
        let mut heard = 0.0f32;
        for _ in 0..600 {
            heard = heard.max(delay.process(0.0, 0.0).abs());
        }
        assert!(heard > 0.1, "send bus should come back wet, got {}", heard);
    }

    #[test]
    fn test_track_echo_feedback_stays_bounded() {
        let mut echo = TrackEcho::new(9600, SR);
        echo.configure(true, 20.0, 0.95, 1.0);

        let mut peak = 0.0f32;
        for i in 0..48_000 {
            let x = if i < 100 { 1.0 } else { 0.0 };
            peak = peak.max(echo.process(x).abs());
        }
        println!("track echo peak with fb 0.95: {}", peak);
        assert!(peak < 2.0, "soft limiting should cap the loop, got {}", peak);
    }

    #[test]
    fn test_track_echo_inactive_config_keeps_params() {
        let mut echo = TrackEcho::new(9600, SR);
        echo.configure(true, 50.0, 0.5, 0.5);
        echo.configure(false, 999.0, 99.0, 99.0);
        assert!(!echo.active);
        // Deactivation must not have taken the bogus parameters
        assert!((echo.feedback - 0.5).abs() < 1e-6);
    }
}
