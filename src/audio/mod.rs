pub mod buffers;
pub mod delays;
pub mod dsp;
pub mod dynamics;
pub mod filters;
pub mod lfo;
pub mod modfx;
pub mod reverbs;

pub const PI: f32 = std::f32::consts::PI;
pub const TWO_PI: f32 = 2.0 * PI;

// Basic trait for audio processors consuming and producing a single sample
pub trait AudioProcessor {
    fn process(&mut self, input: f32) -> f32;
}

pub trait StereoAudioProcessor {
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32);
}
