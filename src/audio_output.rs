//! cpal output stream driving the engine render loop.

use std::sync::atomic::Ordering;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use log::info;

use crate::engine::DrumEngine;
use crate::error::AudioOutputError;

pub struct AudioOutput {
    _stream: cpal::Stream,
}

impl AudioOutput {
    /// Take ownership of the engine and start rendering into the default
    /// output device.
    pub fn new(engine: DrumEngine) -> Result<Self, AudioOutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::NoDevice)?;
        let config = device.default_output_config()?;

        info!(
            "audio output: {} ch @ {} Hz, format {:?}",
            config.channels(),
            config.sample_rate().0,
            config.sample_format()
        );

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::run::<f32>(&device, &config.into(), engine)?,
            cpal::SampleFormat::I16 => Self::run::<i16>(&device, &config.into(), engine)?,
            cpal::SampleFormat::U16 => Self::run::<u16>(&device, &config.into(), engine)?,
            other => return Err(AudioOutputError::UnsupportedFormat(format!("{:?}", other))),
        };

        stream.play()?;
        Ok(Self { _stream: stream })
    }

    fn run<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut engine: DrumEngine,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: Sample + cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        assert!(channels == 2, "stereo output required");

        let sr = config.sample_rate.0 as f32;
        let stats = engine.stats_handle();
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let started = Instant::now();

                scratch.resize(data.len(), 0.0);
                engine.render(&mut scratch);
                for (out, &s) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(if s.is_finite() { s } else { 0.0 });
                }

                // Render time against the block period, for the status CPU
                // field
                let frames = data.len() / 2;
                let budget = frames as f32 / sr;
                let spent = started.elapsed().as_secs_f32();
                let pct = ((spent / budget) * 100.0).min(100.0) as u32;
                stats.cpu_load.store(pct, Ordering::Relaxed);
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }
}
