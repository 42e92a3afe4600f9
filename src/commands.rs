//! Typed commands crossing from the control context into the audio context.
//!
//! The protocol dispatcher parses wire frames into these and pushes them on
//! lock-free queues; the engine drains them at the start of each render
//! block, so every write is observed by the next frame at the latest.

use crate::audio::dsp::DistortionMode;
use crate::audio::filters::FilterType;

/// Capacity of the bounded trigger queue. Overflow drops the newest trigger.
pub const TRIGGER_QUEUE_SIZE: usize = 16;
/// Capacity of the bounded event queue. Overflow overwrites the oldest.
pub const EVENT_QUEUE_SIZE: usize = 8;
/// Capacity of the response byte ring. Responses that do not fit truncate.
pub const TX_RING_SIZE: usize = 1024;
/// Commands drained per audio block, so a flood of parameter writes cannot
/// starve the render loop.
pub const COMMANDS_PER_BLOCK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Sequencer trigger: track volume, note pan and an implicit note-off
    /// length ride along, and the sidechain source fires.
    Sequencer,
    /// Live pad hit: full sample, pad FX, live volume/pitch.
    Live,
}

/// One entry of the bounded trigger queue.
#[derive(Debug, Clone, Copy)]
pub struct Trigger {
    pub pad: u8,
    pub velocity: u8,
    pub kind: TriggerKind,
    pub track_volume: u8,
    pub note_pan: i8,
    pub max_frames: u32,
}

impl Trigger {
    pub fn live(pad: u8, velocity: u8) -> Self {
        Self {
            pad,
            velocity,
            kind: TriggerKind::Live,
            track_volume: 100,
            note_pan: 0,
            max_frames: 0,
        }
    }

    pub fn sequencer(pad: u8, velocity: u8, track_volume: u8, note_pan: i8, max_frames: u32) -> Self {
        Self {
            pad,
            velocity,
            kind: TriggerKind::Sequencer,
            track_volume,
            note_pan,
            max_frames,
        }
    }
}

/// Parameter and structural writes, applied on the audio thread between
/// blocks. Sample data chunks travel here too: the copy into the pad buffer
/// is a few hundred bytes and runs well inside the block budget.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    StopPad(u8),
    StopAll,
    TriggerSidechain { source: u8, velocity: u8 },

    MasterVolume(f32),
    SequencerVolume(f32),
    LiveVolume(f32),
    TrackVolume { track: u8, gain: f32 },
    LivePitch(f32),

    GlobalFilter { kind: FilterType, cutoff: f32, resonance: f32 },
    GlobalFilterCutoff(f32),
    GlobalFilterResonance(f32),
    GlobalBitDepth(u8),
    GlobalDistortion(f32),
    GlobalDistortionMode(DistortionMode),
    GlobalSrReduce(u32),

    DelayActive(bool),
    DelayTimeMs(f32),
    DelayFeedback(f32),
    DelayMix(f32),
    PhaserActive(bool),
    PhaserRate(f32),
    PhaserDepth(f32),
    PhaserFeedback(f32),
    FlangerActive(bool),
    FlangerRate(f32),
    FlangerDepth(f32),
    FlangerFeedback(f32),
    FlangerMix(f32),
    CompActive(bool),
    CompThresholdDb(f32),
    CompRatio(f32),
    CompAttackMs(f32),
    CompReleaseMs(f32),
    CompMakeupDb(f32),
    ReverbActive(bool),
    ReverbFeedback(f32),
    ReverbLpFreq(f32),
    ReverbMix(f32),
    ChorusActive(bool),
    ChorusRate(f32),
    ChorusDepth(f32),
    ChorusMix(f32),
    TremoloActive(bool),
    TremoloRate(f32),
    TremoloDepth(f32),
    WavefolderGain(f32),
    LimiterActive(bool),

    TrackFilter { track: u8, kind: FilterType, cutoff: f32, resonance: f32, gain_db: f32 },
    TrackClearFilter(u8),
    TrackDistortion { track: u8, drive: f32, mode: DistortionMode },
    TrackBitCrush { track: u8, bits: u8 },
    TrackEcho { track: u8, active: bool, time_ms: f32, feedback: f32, mix: f32 },
    TrackFlanger { track: u8, active: bool, depth: f32, rate: f32, feedback: f32 },
    TrackCompressor { track: u8, active: bool, threshold: f32, ratio: f32 },
    TrackClearLiveFx(u8),
    TrackClearFx(u8),
    TrackReverbSend { track: u8, gain: f32 },
    TrackDelaySend { track: u8, gain: f32 },
    TrackChorusSend { track: u8, gain: f32 },
    TrackPan { track: u8, pan: f32 },
    TrackMute { track: u8, mute: bool },
    TrackSolo { track: u8, solo: bool },
    TrackEqLow { track: u8, db: i8 },
    TrackEqMid { track: u8, db: i8 },
    TrackEqHigh { track: u8, db: i8 },

    PadFilter { pad: u8, kind: FilterType, cutoff: f32, resonance: f32, gain_db: f32 },
    PadClearFilter(u8),
    PadDistortion { pad: u8, drive: f32, mode: DistortionMode },
    PadBitCrush { pad: u8, bits: u8 },
    PadLoop { pad: u8, enabled: bool },
    PadReverse { pad: u8, reversed: bool },
    PadPitch { pad: u8, ratio: f32 },
    PadStutter { pad: u8, active: bool, interval: u16 },
    PadScratch { pad: u8, active: bool, rate: f32, depth: f32, cutoff: f32, crackle: f32 },
    PadTurntablism {
        pad: u8,
        active: bool,
        auto_mode: bool,
        mode: i8,
        brake_ms: u16,
        backspin_ms: u16,
        transform_rate: f32,
        vinyl_noise: f32,
    },
    PadClearFx(u8),

    SidechainSet {
        active: bool,
        source: u8,
        dest_mask: u16,
        amount: f32,
        attack_ms: f32,
        release_ms: f32,
        knee: f32,
    },
    SidechainClear,

    SampleBegin { pad: u8, total_bytes: u32 },
    SampleData { pad: u8, offset: u32, bytes: Vec<u8> },
    SampleEnd { pad: u8 },
    SampleUnload { pad: u8 },
    SampleUnloadAll,

    /// Follows a peaks poll: clears the render-side meter accumulators so
    /// the next block's publish does not resurrect the value the poll
    /// already reported.
    ResetTrackPeaks,

    SynthTrigger { engine: u8, instrument: u8, velocity: u8 },
    SynthParam { engine: u8, instrument: u8, param: u8, value: f32 },
    SynthNoteOn { note: u8, accent: bool, slide: bool },
    SynthNoteOff,
    AcidParam { param: u8, value: f32 },
    SynthActiveMask(u8),

    Reset,
}
