/// Fixed-size circular delay buffer. Read positions are relative to the
/// write head; writing advances the head by one sample.
pub struct DelayBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayBuffer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(1)],
            write_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn read(&self, delay_samples: usize) -> f32 {
        let delay = delay_samples.min(self.buffer.len() - 1);
        let read_pos = (self.write_pos + self.buffer.len() - delay) % self.buffer.len();
        self.buffer[read_pos]
    }

    /// Linear-interpolated read between the two taps bracketing
    /// `delay_samples`.
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let delay = delay_samples.clamp(0.0, self.buffer.len() as f32 - 2.0);
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let s0 = self.read(whole);
        let s1 = self.read(whole + 1);
        s0 * (1.0 - frac) + s1 * frac
    }

    pub fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Add into the sample most recently written (feedback injection after
    /// the dry sample was already stored).
    pub fn add_to_last(&mut self, value: f32) {
        let pos = (self.write_pos + self.buffer.len() - 1) % self.buffer.len();
        self.buffer[pos] += value;
    }

    /// Overwrite the sample most recently written.
    pub fn rewrite_last(&mut self, value: f32) {
        let pos = (self.write_pos + self.buffer.len() - 1) % self.buffer.len();
        self.buffer[pos] = value;
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_buffer_basic_operation() {
        let mut buffer = DelayBuffer::new(100);

        assert_eq!(buffer.read(10), 0.0);

        buffer.write(1.0);
        assert_eq!(buffer.read(1), 1.0);

        for _ in 0..10 {
            buffer.write(0.0);
        }
        let delayed = buffer.read(11);
        assert!(
            (delayed - 1.0).abs() < 1e-6,
            "expected 1.0, got {}",
            delayed
        );
    }

    #[test]
    fn test_delay_buffer_continuous_signal() {
        let mut buffer = DelayBuffer::new(50);
        let delay_samples = 20;

        for i in 0..100 {
            let input = (i as f32) * 0.1;
            if i >= 20 {
                let delayed = buffer.read(delay_samples);
                let expected = ((i - 20) as f32) * 0.1;
                assert!(
                    (delayed - expected).abs() < 1e-5,
                    "at sample {}: expected {}, got {}",
                    i,
                    expected,
                    delayed
                );
            }
            buffer.write(input);
        }
    }

    #[test]
    fn test_interpolated_read_between_taps() {
        let mut buffer = DelayBuffer::new(16);
        buffer.write(0.0);
        buffer.write(1.0);
        // Halfway between the last two writes
        let mid = buffer.read_interpolated(1.5);
        assert!((mid - 0.5).abs() < 1e-6, "expected 0.5, got {}", mid);
    }

    #[test]
    fn test_clear_silences_buffer() {
        let mut buffer = DelayBuffer::new(32);
        for _ in 0..32 {
            buffer.write(0.7);
        }
        buffer.clear();
        for d in 0..31 {
            assert_eq!(buffer.read(d), 0.0);
        }
    }
}
