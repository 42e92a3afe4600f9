//! Engine-level error types.
//!
//! The running audio path is infallible by design (it substitutes silence
//! for anything missing); these errors only surface while bringing the
//! output stream up.

use thiserror::Error;

/// Errors that can occur while starting the audio output stream.
#[derive(Debug, Error)]
pub enum AudioOutputError {
    /// No default output device was available.
    #[error("no audio output device available")]
    NoDevice,

    /// The default output configuration could not be queried.
    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    /// The output stream could not be built.
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The output stream could not be started.
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The device reported a sample format this engine does not emit.
    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),
}
