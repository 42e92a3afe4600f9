//! Command dispatcher: turns validated frames into engine commands,
//! triggers and response frames.

use std::sync::Arc;

use crossbeam::queue::{ArrayQueue, SegQueue};
use log::{debug, trace};

use crate::audio::dsp::DistortionMode;
use crate::audio::filters::FilterType;
use crate::commands::{EngineCommand, Trigger};
use crate::engine::stats::EngineStats;
use crate::engine::MAX_PADS;
use crate::events::{pop_events, NotifyEvent};
use crate::protocol::parser::{encode_frame, Frame, FrameParser};
use crate::protocol::*;

use std::sync::atomic::Ordering;

const STATUS_SIZE: usize = 54;
const EVENTS_PER_RESPONSE: usize = 4;

fn rd_u16(p: &[u8], off: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*p.get(off)?, *p.get(off + 1)?]))
}

fn rd_u32(p: &[u8], off: usize) -> Option<u32> {
    Some(u32::from_le_bytes([
        *p.get(off)?,
        *p.get(off + 1)?,
        *p.get(off + 2)?,
        *p.get(off + 3)?,
    ]))
}

fn rd_f32(p: &[u8], off: usize) -> Option<f32> {
    rd_u32(p, off).map(f32::from_bits)
}

/// The control-context end of the engine: feed it raw bytes, read back
/// response bytes. Talks to the audio context only through lock-free
/// queues and the stats atomics.
pub struct ProtocolPort {
    parser: FrameParser,
    commands: Arc<SegQueue<EngineCommand>>,
    triggers: Arc<ArrayQueue<Trigger>>,
    events: Arc<ArrayQueue<NotifyEvent>>,
    stats: Arc<EngineStats>,
    tx: rtrb::Producer<u8>,
    tx_out: rtrb::Consumer<u8>,
    current_kit: [u8; 32],
}

impl ProtocolPort {
    pub fn new(
        commands: Arc<SegQueue<EngineCommand>>,
        triggers: Arc<ArrayQueue<Trigger>>,
        events: Arc<ArrayQueue<NotifyEvent>>,
        stats: Arc<EngineStats>,
        tx: rtrb::Producer<u8>,
        tx_out: rtrb::Consumer<u8>,
    ) -> Self {
        Self {
            parser: FrameParser::new(),
            commands,
            triggers,
            events,
            stats,
            tx,
            tx_out,
            current_kit: [0; 32],
        }
    }

    /// Frames dropped for framing or CRC errors since the last reset.
    pub fn error_count(&self) -> u16 {
        self.parser.error_count()
    }

    /// Frames accepted since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.parser.frame_count()
    }

    /// Feed raw bytes from the transport; completed frames dispatch
    /// immediately.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if let Some(frame) = self.parser.push_byte(byte) {
                self.dispatch_frame(&frame);
            }
        }
    }

    /// Drain pending response bytes into `buf`; returns the byte count.
    pub fn read_tx(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.tx_out.pop() {
                Ok(b) => {
                    buf[n] = b;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        n
    }

    fn dispatch_frame(&mut self, frame: &Frame) {
        trace!(
            "frame cmd={:#04x} seq={} len={}",
            frame.command,
            frame.sequence,
            frame.payload.len()
        );
        self.dispatch(frame.command, frame.sequence, &frame.payload);
    }

    fn send(&mut self, cmd: EngineCommand) {
        self.commands.push(cmd);
    }

    fn respond(&mut self, command: u8, sequence: u16, payload: &[u8]) {
        let wire = encode_frame(MAGIC_RESP, command, sequence, payload);
        for byte in wire {
            // A full ring truncates the response; the poll-driven master
            // re-queries rather than blocking us here
            if self.tx.push(byte).is_err() {
                debug!("tx ring full, truncating response {:#04x}", command);
                break;
            }
        }
    }

    fn dispatch(&mut self, command: u8, sequence: u16, p: &[u8]) {
        match command {
            CMD_PING => {
                let echo = rd_u32(p, 0).unwrap_or(0);
                let uptime = self.stats.uptime_ms.load(Ordering::Relaxed);
                let mut pong = [0u8; 8];
                pong[..4].copy_from_slice(&echo.to_le_bytes());
                pong[4..].copy_from_slice(&uptime.to_le_bytes());
                self.respond(CMD_PING, sequence, &pong);
            }

            CMD_TRIGGER_LIVE => {
                if p.len() >= 2 {
                    let _ = self.triggers.push(Trigger::live(p[0], p[1]));
                }
            }
            CMD_TRIGGER_SEQ => {
                if p.len() >= 2 {
                    let volume = p.get(2).copied().unwrap_or(100);
                    let pan = p.get(3).map(|&b| b as i8).unwrap_or(0);
                    let max_frames = rd_u32(p, 4).unwrap_or(0);
                    let _ = self
                        .triggers
                        .push(Trigger::sequencer(p[0], p[1], volume, pan, max_frames));
                }
            }
            CMD_TRIGGER_STOP => {
                if !p.is_empty() {
                    self.send(EngineCommand::StopPad(p[0]));
                }
            }
            CMD_TRIGGER_STOP_ALL => self.send(EngineCommand::StopAll),
            CMD_TRIGGER_SIDECHAIN => {
                // Short form {source, vel}; the long form carries a pad byte
                // in between
                if p.len() >= 2 {
                    let velocity = if p.len() >= 3 { p[2] } else { p[1] };
                    self.send(EngineCommand::TriggerSidechain {
                        source: p[0],
                        velocity,
                    });
                }
            }

            CMD_MASTER_VOLUME => {
                if !p.is_empty() {
                    self.send(EngineCommand::MasterVolume(p[0] as f32 / 100.0));
                }
            }
            CMD_SEQ_VOLUME => {
                if !p.is_empty() {
                    self.send(EngineCommand::SequencerVolume(p[0] as f32 / 100.0));
                }
            }
            CMD_LIVE_VOLUME => {
                if !p.is_empty() {
                    self.send(EngineCommand::LiveVolume(p[0] as f32 / 100.0));
                }
            }
            CMD_TRACK_VOLUME => {
                if p.len() >= 2 && (p[0] as usize) < MAX_PADS {
                    self.send(EngineCommand::TrackVolume {
                        track: p[0],
                        gain: p[1] as f32 / 100.0,
                    });
                }
            }
            CMD_LIVE_PITCH => {
                if let Some(pitch) = rd_f32(p, 0) {
                    self.send(EngineCommand::LivePitch(pitch));
                }
            }

            CMD_FILTER_SET => {
                if p.len() >= 20 {
                    let kind = FilterType::from_wire(p[0]);
                    let cutoff = rd_f32(p, 2).unwrap_or(10_000.0);
                    let resonance = rd_f32(p, 6).unwrap_or(0.707);
                    self.send(EngineCommand::GlobalFilter { kind, cutoff, resonance });
                    self.send(EngineCommand::GlobalBitDepth(p[10]));
                    self.send(EngineCommand::GlobalDistortionMode(
                        DistortionMode::from_wire(p[11]),
                    ));
                    self.send(EngineCommand::GlobalDistortion(
                        rd_f32(p, 12).unwrap_or(0.0),
                    ));
                    self.send(EngineCommand::GlobalSrReduce(rd_u32(p, 16).unwrap_or(0)));
                }
            }
            CMD_FILTER_CUTOFF => {
                if let Some(c) = rd_f32(p, 0) {
                    self.send(EngineCommand::GlobalFilterCutoff(c));
                }
            }
            CMD_FILTER_RESONANCE => {
                if let Some(q) = rd_f32(p, 0) {
                    self.send(EngineCommand::GlobalFilterResonance(q));
                }
            }
            CMD_FILTER_BITDEPTH => {
                if !p.is_empty() {
                    self.send(EngineCommand::GlobalBitDepth(p[0]));
                }
            }
            CMD_FILTER_DISTORTION => {
                if let Some(d) = rd_f32(p, 0) {
                    self.send(EngineCommand::GlobalDistortion(d));
                }
            }
            CMD_FILTER_DIST_MODE => {
                if !p.is_empty() {
                    self.send(EngineCommand::GlobalDistortionMode(
                        DistortionMode::from_wire(p[0]),
                    ));
                }
            }
            CMD_FILTER_SR_REDUCE => {
                if let Some(target) = rd_u32(p, 0) {
                    self.send(EngineCommand::GlobalSrReduce(target));
                }
            }

            CMD_DELAY_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::DelayActive(p[0] != 0));
                }
            }
            CMD_DELAY_TIME => {
                if let Some(ms) = rd_u16(p, 0) {
                    self.send(EngineCommand::DelayTimeMs(ms as f32));
                }
            }
            CMD_DELAY_FEEDBACK => {
                if !p.is_empty() {
                    self.send(EngineCommand::DelayFeedback(p[0] as f32 / 100.0));
                }
            }
            CMD_DELAY_MIX => {
                if !p.is_empty() {
                    self.send(EngineCommand::DelayMix(p[0] as f32 / 100.0));
                }
            }

            CMD_PHASER_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::PhaserActive(p[0] != 0));
                }
            }
            CMD_PHASER_RATE => {
                if !p.is_empty() {
                    self.send(EngineCommand::PhaserRate(p[0] as f32 / 10.0));
                }
            }
            CMD_PHASER_DEPTH => {
                if !p.is_empty() {
                    self.send(EngineCommand::PhaserDepth(p[0] as f32 / 100.0));
                }
            }
            CMD_PHASER_FEEDBACK => {
                if !p.is_empty() {
                    self.send(EngineCommand::PhaserFeedback(p[0] as f32 / 100.0));
                }
            }

            CMD_FLANGER_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::FlangerActive(p[0] != 0));
                }
            }
            CMD_FLANGER_RATE => {
                if !p.is_empty() {
                    self.send(EngineCommand::FlangerRate(p[0] as f32 * 0.1));
                }
            }
            CMD_FLANGER_DEPTH => {
                if !p.is_empty() {
                    self.send(EngineCommand::FlangerDepth(p[0] as f32 / 100.0));
                }
            }
            CMD_FLANGER_FEEDBACK => {
                if !p.is_empty() {
                    self.send(EngineCommand::FlangerFeedback(p[0] as f32 / 100.0));
                }
            }
            CMD_FLANGER_MIX => {
                if !p.is_empty() {
                    self.send(EngineCommand::FlangerMix(p[0] as f32 / 100.0));
                }
            }

            CMD_COMP_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompActive(p[0] != 0));
                }
            }
            CMD_COMP_THRESHOLD => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompThresholdDb(-(p[0] as f32)));
                }
            }
            CMD_COMP_RATIO => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompRatio(p[0] as f32));
                }
            }
            CMD_COMP_ATTACK => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompAttackMs(p[0] as f32));
                }
            }
            CMD_COMP_RELEASE => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompReleaseMs(p[0] as f32));
                }
            }
            CMD_COMP_MAKEUP => {
                if !p.is_empty() {
                    self.send(EngineCommand::CompMakeupDb(p[0] as f32 / 10.0));
                }
            }

            CMD_REVERB_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::ReverbActive(p[0] != 0));
                }
            }
            CMD_REVERB_FEEDBACK => {
                if !p.is_empty() {
                    self.send(EngineCommand::ReverbFeedback(p[0] as f32 / 100.0));
                }
            }
            CMD_REVERB_LPFREQ => {
                if let Some(f) = rd_u16(p, 0) {
                    self.send(EngineCommand::ReverbLpFreq(f as f32));
                }
            }
            CMD_REVERB_MIX => {
                if !p.is_empty() {
                    self.send(EngineCommand::ReverbMix(p[0] as f32 / 100.0));
                }
            }

            CMD_CHORUS_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::ChorusActive(p[0] != 0));
                }
            }
            CMD_CHORUS_RATE => {
                if !p.is_empty() {
                    self.send(EngineCommand::ChorusRate(p[0] as f32 / 10.0));
                }
            }
            CMD_CHORUS_DEPTH => {
                if !p.is_empty() {
                    self.send(EngineCommand::ChorusDepth(p[0] as f32 / 100.0));
                }
            }
            CMD_CHORUS_MIX => {
                if !p.is_empty() {
                    self.send(EngineCommand::ChorusMix(p[0] as f32 / 100.0));
                }
            }

            CMD_TREMOLO_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::TremoloActive(p[0] != 0));
                }
            }
            CMD_TREMOLO_RATE => {
                if !p.is_empty() {
                    self.send(EngineCommand::TremoloRate(p[0] as f32 / 10.0));
                }
            }
            CMD_TREMOLO_DEPTH => {
                if !p.is_empty() {
                    self.send(EngineCommand::TremoloDepth(p[0] as f32 / 100.0));
                }
            }

            CMD_WAVEFOLDER_GAIN => {
                if !p.is_empty() {
                    self.send(EngineCommand::WavefolderGain(p[0] as f32 / 10.0));
                }
            }
            CMD_LIMITER_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::LimiterActive(p[0] != 0));
                }
            }

            CMD_TRACK_FILTER => {
                if p.len() >= 12 {
                    self.send(EngineCommand::TrackFilter {
                        track: p[0],
                        kind: FilterType::from_wire(p[1]),
                        cutoff: rd_f32(p, 4).unwrap_or(1000.0),
                        resonance: rd_f32(p, 8).unwrap_or(0.707),
                        gain_db: rd_f32(p, 12).unwrap_or(0.0),
                    });
                }
            }
            CMD_TRACK_CLEAR_FILTER => {
                if !p.is_empty() {
                    self.send(EngineCommand::TrackClearFilter(p[0]));
                }
            }
            CMD_TRACK_DISTORTION => {
                if p.len() >= 5 {
                    self.send(EngineCommand::TrackDistortion {
                        track: p[0],
                        drive: rd_f32(p, 1).unwrap_or(0.0),
                        mode: DistortionMode::from_wire(p.get(5).copied().unwrap_or(0)),
                    });
                } else if p.len() >= 2 {
                    self.send(EngineCommand::TrackDistortion {
                        track: p[0],
                        drive: p[1] as f32 / 255.0,
                        mode: DistortionMode::Soft,
                    });
                }
            }
            CMD_TRACK_BITCRUSH => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackBitCrush { track: p[0], bits: p[1] });
                }
            }
            CMD_TRACK_ECHO => {
                if p.len() >= 16 {
                    self.send(EngineCommand::TrackEcho {
                        track: p[0],
                        active: p[1] != 0,
                        time_ms: rd_f32(p, 4).unwrap_or(100.0),
                        feedback: rd_f32(p, 8).unwrap_or(0.4),
                        mix: rd_f32(p, 12).unwrap_or(0.5),
                    });
                }
            }
            CMD_TRACK_FLANGER_FX => {
                if p.len() >= 16 {
                    self.send(EngineCommand::TrackFlanger {
                        track: p[0],
                        active: p[1] != 0,
                        depth: rd_f32(p, 4).unwrap_or(0.5),
                        rate: rd_f32(p, 8).unwrap_or(0.5),
                        feedback: rd_f32(p, 12).unwrap_or(0.3),
                    });
                }
            }
            CMD_TRACK_COMPRESSOR => {
                if p.len() >= 12 {
                    self.send(EngineCommand::TrackCompressor {
                        track: p[0],
                        active: p[1] != 0,
                        threshold: rd_f32(p, 4).unwrap_or(0.5),
                        ratio: rd_f32(p, 8).unwrap_or(4.0),
                    });
                }
            }
            CMD_TRACK_CLEAR_LIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::TrackClearLiveFx(p[0]));
                }
            }
            CMD_TRACK_CLEAR_FX => {
                if !p.is_empty() {
                    self.send(EngineCommand::TrackClearFx(p[0]));
                }
            }
            CMD_TRACK_REVERB_SEND => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackReverbSend {
                        track: p[0],
                        gain: p[1] as f32 / 100.0,
                    });
                }
            }
            CMD_TRACK_DELAY_SEND => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackDelaySend {
                        track: p[0],
                        gain: p[1] as f32 / 100.0,
                    });
                }
            }
            CMD_TRACK_CHORUS_SEND => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackChorusSend {
                        track: p[0],
                        gain: p[1] as f32 / 100.0,
                    });
                }
            }
            CMD_TRACK_PAN => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackPan {
                        track: p[0],
                        pan: (p[1] as i8) as f32 / 100.0,
                    });
                }
            }
            CMD_TRACK_MUTE => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackMute { track: p[0], mute: p[1] != 0 });
                }
            }
            CMD_TRACK_SOLO => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackSolo { track: p[0], solo: p[1] != 0 });
                }
            }
            CMD_TRACK_EQ_LOW => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackEqLow { track: p[0], db: p[1] as i8 });
                }
            }
            CMD_TRACK_EQ_MID => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackEqMid { track: p[0], db: p[1] as i8 });
                }
            }
            CMD_TRACK_EQ_HIGH => {
                if p.len() >= 2 {
                    self.send(EngineCommand::TrackEqHigh { track: p[0], db: p[1] as i8 });
                }
            }

            CMD_PAD_FILTER => {
                if p.len() >= 12 {
                    self.send(EngineCommand::PadFilter {
                        pad: p[0],
                        kind: FilterType::from_wire(p[1]),
                        cutoff: rd_f32(p, 4).unwrap_or(1000.0),
                        resonance: rd_f32(p, 8).unwrap_or(0.707),
                        gain_db: rd_f32(p, 12).unwrap_or(0.0),
                    });
                }
            }
            CMD_PAD_CLEAR_FILTER => {
                if !p.is_empty() {
                    self.send(EngineCommand::PadClearFilter(p[0]));
                }
            }
            CMD_PAD_DISTORTION => {
                if p.len() >= 5 {
                    self.send(EngineCommand::PadDistortion {
                        pad: p[0],
                        drive: rd_f32(p, 1).unwrap_or(0.0),
                        mode: DistortionMode::from_wire(p.get(5).copied().unwrap_or(0)),
                    });
                } else if p.len() >= 2 {
                    self.send(EngineCommand::PadDistortion {
                        pad: p[0],
                        drive: p[1] as f32 / 255.0,
                        mode: DistortionMode::Soft,
                    });
                }
            }
            CMD_PAD_BITCRUSH => {
                if p.len() >= 2 {
                    self.send(EngineCommand::PadBitCrush { pad: p[0], bits: p[1] });
                }
            }
            CMD_PAD_LOOP => {
                if p.len() >= 2 {
                    self.send(EngineCommand::PadLoop { pad: p[0], enabled: p[1] != 0 });
                }
            }
            CMD_PAD_REVERSE => {
                if p.len() >= 2 {
                    self.send(EngineCommand::PadReverse { pad: p[0], reversed: p[1] != 0 });
                }
            }
            CMD_PAD_PITCH => {
                if p.len() >= 3 {
                    let cents = i16::from_le_bytes([p[1], p[2]]);
                    self.send(EngineCommand::PadPitch {
                        pad: p[0],
                        ratio: 2.0f32.powf(cents as f32 / 1200.0),
                    });
                }
            }
            CMD_PAD_STUTTER => {
                if p.len() >= 4 {
                    self.send(EngineCommand::PadStutter {
                        pad: p[0],
                        active: p[1] != 0,
                        interval: rd_u16(p, 2).unwrap_or(100),
                    });
                }
            }
            CMD_PAD_SCRATCH => {
                if p.len() >= 20 {
                    self.send(EngineCommand::PadScratch {
                        pad: p[0],
                        active: p[1] != 0,
                        rate: rd_f32(p, 4).unwrap_or(5.0),
                        depth: rd_f32(p, 8).unwrap_or(0.85),
                        cutoff: rd_f32(p, 12).unwrap_or(4000.0),
                        crackle: rd_f32(p, 16).unwrap_or(0.25),
                    });
                }
            }
            CMD_PAD_TURNTABLISM => {
                if p.len() >= 16 {
                    self.send(EngineCommand::PadTurntablism {
                        pad: p[0],
                        active: p[1] != 0,
                        auto_mode: p[2] != 0,
                        mode: p[3] as i8,
                        brake_ms: rd_u16(p, 4).unwrap_or(320),
                        backspin_ms: rd_u16(p, 6).unwrap_or(410),
                        transform_rate: rd_f32(p, 8).unwrap_or(11.0),
                        vinyl_noise: rd_f32(p, 12).unwrap_or(0.35),
                    });
                }
            }
            CMD_PAD_CLEAR_FX => {
                if !p.is_empty() {
                    self.send(EngineCommand::PadClearFx(p[0]));
                }
            }

            CMD_SIDECHAIN_SET => {
                if p.len() >= 20 {
                    self.send(EngineCommand::SidechainSet {
                        active: p[0] != 0,
                        source: p[1],
                        dest_mask: rd_u16(p, 2).unwrap_or(0),
                        amount: rd_f32(p, 4).unwrap_or(0.5),
                        attack_ms: rd_f32(p, 8).unwrap_or(6.0),
                        release_ms: rd_f32(p, 12).unwrap_or(160.0),
                        knee: rd_f32(p, 16).unwrap_or(0.4),
                    });
                }
            }
            CMD_SIDECHAIN_CLEAR => self.send(EngineCommand::SidechainClear),

            CMD_SAMPLE_BEGIN => {
                if p.len() >= 8 {
                    self.send(EngineCommand::SampleBegin {
                        pad: p[0],
                        total_bytes: rd_u32(p, 4).unwrap_or(0),
                    });
                }
            }
            CMD_SAMPLE_DATA => {
                if p.len() >= 8 {
                    let chunk = rd_u16(p, 2).unwrap_or(0) as usize;
                    let offset = rd_u32(p, 4).unwrap_or(0);
                    let available = p.len() - 8;
                    let take = chunk.min(available);
                    self.send(EngineCommand::SampleData {
                        pad: p[0],
                        offset,
                        bytes: p[8..8 + take].to_vec(),
                    });
                }
            }
            CMD_SAMPLE_END => {
                if !p.is_empty() {
                    self.send(EngineCommand::SampleEnd { pad: p[0] });
                }
            }
            CMD_SAMPLE_UNLOAD => {
                if !p.is_empty() {
                    self.send(EngineCommand::SampleUnload { pad: p[0] });
                }
            }
            CMD_SAMPLE_UNLOAD_ALL => {
                self.current_kit = [0; 32];
                self.send(EngineCommand::SampleUnloadAll);
            }

            CMD_FS_STATUS => {
                // No filesystem collaborator wired in: present = 0, but the
                // loaded mask and kit name are still real
                let mut resp = [0u8; 36];
                let mask = self.stats.loaded_mask.load(Ordering::Relaxed);
                resp[2..4].copy_from_slice(&((mask & 0xFFFF) as u16).to_le_bytes());
                resp[4..36].copy_from_slice(&self.current_kit);
                self.respond(CMD_FS_STATUS, sequence, &resp);
            }
            CMD_FS_GET_LOADED => {
                let mask = self.stats.loaded_mask.load(Ordering::Relaxed);
                self.respond(CMD_FS_GET_LOADED, sequence, &mask.to_le_bytes());
            }

            CMD_SYNTH_TRIGGER => {
                if p.len() >= 3 {
                    self.send(EngineCommand::SynthTrigger {
                        engine: p[0],
                        instrument: p[1],
                        velocity: p[2],
                    });
                }
            }
            CMD_SYNTH_PARAM => {
                if p.len() >= 7 {
                    self.send(EngineCommand::SynthParam {
                        engine: p[0],
                        instrument: p[1],
                        param: p[2],
                        value: rd_f32(p, 3).unwrap_or(0.0),
                    });
                }
            }
            CMD_SYNTH_NOTE_ON => {
                if p.len() >= 3 {
                    self.send(EngineCommand::SynthNoteOn {
                        note: p[0],
                        accent: p[1] != 0,
                        slide: p[2] != 0,
                    });
                }
            }
            CMD_SYNTH_NOTE_OFF => self.send(EngineCommand::SynthNoteOff),
            CMD_SYNTH_ACID_PARAM => {
                if p.len() >= 5 {
                    self.send(EngineCommand::AcidParam {
                        param: p[0],
                        value: rd_f32(p, 1).unwrap_or(0.0),
                    });
                }
            }
            CMD_SYNTH_ACTIVE => {
                if !p.is_empty() {
                    self.send(EngineCommand::SynthActiveMask(p[0]));
                }
            }

            CMD_GET_STATUS => {
                let resp = self.build_status();
                self.respond(CMD_GET_STATUS, sequence, &resp);
            }
            CMD_GET_PEAKS => {
                // Track meters reset on read, so every poll reports the
                // peak since the previous one; the master meter only decays
                let mut resp = [0u8; 17 * 4];
                for t in 0..16 {
                    resp[t * 4..t * 4 + 4]
                        .copy_from_slice(&self.stats.take_track_peak(t).to_le_bytes());
                }
                resp[64..68].copy_from_slice(&self.stats.master_peak().to_le_bytes());
                self.respond(CMD_GET_PEAKS, sequence, &resp);
                // Clear the render-side accumulators too, or the next
                // block's publish would bring the old peaks back
                self.send(EngineCommand::ResetTrackPeaks);
            }
            CMD_GET_CPU_LOAD => {
                let pct = self.stats.cpu_load.load(Ordering::Relaxed).min(255) as u8;
                self.respond(CMD_GET_CPU_LOAD, sequence, &[pct]);
            }
            CMD_GET_VOICES => {
                let n = self.stats.active_voices.load(Ordering::Relaxed).min(255) as u8;
                self.respond(CMD_GET_VOICES, sequence, &[n]);
            }
            CMD_GET_EVENTS => {
                let drained = pop_events(&self.events, EVENTS_PER_RESPONSE);
                let mut resp = Vec::with_capacity(1 + drained.len() * 32);
                resp.push(drained.len() as u8);
                for event in &drained {
                    resp.extend_from_slice(&event.to_wire());
                }
                self.respond(CMD_GET_EVENTS, sequence, &resp);
            }

            CMD_RESET => {
                self.parser.reset_counters();
                self.current_kit = [0; 32];
                self.send(EngineCommand::Reset);
            }

            CMD_BULK_TRIGGERS => {
                if !p.is_empty() {
                    let count = p[0] as usize;
                    for i in 0..count {
                        let base = 1 + i * 2;
                        if base + 1 >= p.len() {
                            break;
                        }
                        let _ = self.triggers.push(Trigger::live(p[base], p[base + 1]));
                    }
                }
            }
            CMD_BULK_FX => {
                // count, then {sub-command, sub-length, payload} records;
                // each record re-enters the dispatcher
                if !p.is_empty() {
                    let count = p[0] as usize;
                    let mut off = 1;
                    for _ in 0..count {
                        if off + 2 > p.len() {
                            break;
                        }
                        let sub_cmd = p[off];
                        let sub_len = p[off + 1] as usize;
                        off += 2;
                        if off + sub_len > p.len() {
                            break;
                        }
                        let sub = p[off..off + sub_len].to_vec();
                        self.dispatch(sub_cmd, sequence, &sub);
                        off += sub_len;
                    }
                }
            }

            // Remaining filesystem collaborator calls and unknown opcodes
            // are accepted no-ops
            _ => {}
        }
    }

    fn build_status(&self) -> [u8; STATUS_SIZE] {
        let mut resp = [0u8; STATUS_SIZE];
        resp[0] = self.stats.active_voices.load(Ordering::Relaxed).min(255) as u8;
        resp[1] = self.stats.cpu_load.load(Ordering::Relaxed).min(255) as u8;
        let mask = self.stats.loaded_mask.load(Ordering::Relaxed);
        resp[2] = (mask & 0xFF) as u8;
        resp[3] = ((mask >> 8) & 0xFF) as u8;
        resp[4..8].copy_from_slice(&self.stats.uptime_ms.load(Ordering::Relaxed).to_le_bytes());
        resp[8] = 0; // no storage collaborator attached
        resp[9] = ((mask >> 16) & 0xFF) as u8;
        resp[10] = self.events.len().min(255) as u8;
        // 11..14 reserved
        resp[14..46].copy_from_slice(&self.current_kit);
        resp[46] = self.stats.total_loaded.load(Ordering::Relaxed).min(255) as u8;
        resp[47..51].copy_from_slice(
            &self
                .stats
                .total_sample_bytes
                .load(Ordering::Relaxed)
                .to_le_bytes(),
        );
        resp[51] = MAX_PADS as u8;
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{TriggerKind, EVENT_QUEUE_SIZE, TRIGGER_QUEUE_SIZE, TX_RING_SIZE};
    use crate::engine::stats::EngineStats;
    use crate::events::{push_event, EventKind};
    use crate::protocol::crc::crc16;

    fn test_port() -> (
        ProtocolPort,
        Arc<SegQueue<EngineCommand>>,
        Arc<ArrayQueue<Trigger>>,
        Arc<ArrayQueue<NotifyEvent>>,
        Arc<EngineStats>,
    ) {
        let commands = Arc::new(SegQueue::new());
        let triggers = Arc::new(ArrayQueue::new(TRIGGER_QUEUE_SIZE));
        let events = Arc::new(ArrayQueue::new(EVENT_QUEUE_SIZE));
        let stats = Arc::new(EngineStats::new());
        let (tx, tx_out) = rtrb::RingBuffer::new(TX_RING_SIZE);
        let port = ProtocolPort::new(
            Arc::clone(&commands),
            Arc::clone(&triggers),
            Arc::clone(&events),
            Arc::clone(&stats),
            tx,
            tx_out,
        );
        (port, commands, triggers, events, stats)
    }

    fn cmd_frame(command: u8, sequence: u16, payload: &[u8]) -> Vec<u8> {
        encode_frame(MAGIC_CMD, command, sequence, payload)
    }

    fn read_response(port: &mut ProtocolPort) -> Vec<u8> {
        let mut buf = [0u8; 1024];
        let n = port.read_tx(&mut buf);
        buf[..n].to_vec()
    }

    #[test]
    fn test_trigger_live_lands_in_trigger_queue() {
        let (mut port, _cmds, triggers, _ev, _st) = test_port();
        port.feed(&cmd_frame(CMD_TRIGGER_LIVE, 1, &[3, 127]));
        let t = triggers.pop().expect("trigger queued");
        assert_eq!(t.pad, 3);
        assert_eq!(t.velocity, 127);
        assert_eq!(t.kind, TriggerKind::Live);
    }

    #[test]
    fn test_corrupted_trigger_rejected_counter_incremented() {
        // S4: one corrupted payload byte drops the frame, the next good
        // frame still works.
        let (mut port, _cmds, triggers, _ev, _st) = test_port();
        let mut bad = cmd_frame(CMD_TRIGGER_LIVE, 1, &[3, 127]);
        bad[9] ^= 0x40;
        port.feed(&bad);
        assert!(triggers.pop().is_none(), "corrupt frame must not trigger");
        assert_eq!(port.error_count(), 1);

        port.feed(&cmd_frame(CMD_TRIGGER_LIVE, 2, &[3, 127]));
        assert!(triggers.pop().is_some());
        assert_eq!(port.error_count(), 1);
    }

    #[test]
    fn test_bulk_triggers_queue_three_voices() {
        // S5: one bulk frame, three {pad, vel} records.
        let (mut port, _cmds, triggers, _ev, _st) = test_port();
        let payload = [3u8, 0, 100, 1, 110, 2, 120];
        port.feed(&encode_frame(MAGIC_BULK, CMD_BULK_TRIGGERS, 5, &payload));
        let mut pads = Vec::new();
        while let Some(t) = triggers.pop() {
            pads.push((t.pad, t.velocity));
        }
        assert_eq!(pads, vec![(0, 100), (1, 110), (2, 120)]);
    }

    #[test]
    fn test_status_round_trip() {
        // S6: response magic, opcode, echoed sequence, valid CRC, real
        // voice count.
        let (mut port, _cmds, _tr, _ev, stats) = test_port();
        stats.active_voices.store(7, Ordering::Relaxed);
        stats.loaded_mask.store(0b1010_0000_0001, Ordering::Relaxed);

        port.feed(&cmd_frame(CMD_GET_STATUS, 0xBEEF, &[]));
        let resp = read_response(&mut port);

        assert_eq!(resp[0], MAGIC_RESP);
        assert_eq!(resp[1], CMD_GET_STATUS);
        let len = u16::from_le_bytes([resp[2], resp[3]]) as usize;
        assert_eq!(len, STATUS_SIZE);
        assert_eq!(u16::from_le_bytes([resp[4], resp[5]]), 0xBEEF);
        let crc = u16::from_le_bytes([resp[6], resp[7]]);
        assert_eq!(crc16(&resp[8..8 + len]), crc, "response CRC must validate");

        assert_eq!(resp[8], 7, "active voices");
        assert_eq!(resp[8 + 2], 0b0000_0001, "loaded mask low byte");
        assert_eq!(resp[8 + 3], 0b0000_1010, "loaded mask high byte");
        assert_eq!(resp[8 + 51], MAX_PADS as u8);
    }

    #[test]
    fn test_ping_echoes_payload_and_uptime() {
        let (mut port, _cmds, _tr, _ev, stats) = test_port();
        stats.uptime_ms.store(123_456, Ordering::Relaxed);
        port.feed(&cmd_frame(CMD_PING, 42, &[0xDE, 0xAD, 0xBE, 0xEF]));
        let resp = read_response(&mut port);
        assert_eq!(resp[1], CMD_PING);
        assert_eq!(&resp[8..12], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(u32::from_le_bytes([resp[12], resp[13], resp[14], resp[15]]), 123_456);
    }

    #[test]
    fn test_get_events_drains_up_to_four() {
        let (mut port, _cmds, _tr, events, _st) = test_port();
        for i in 0..6u8 {
            push_event(&events, NotifyEvent::new(EventKind::SampleLoaded, i, 0, "s"));
        }
        port.feed(&cmd_frame(CMD_GET_EVENTS, 1, &[]));
        let resp = read_response(&mut port);
        assert_eq!(resp[8], 4, "at most four events per poll");
        assert_eq!(resp.len(), 8 + 1 + 4 * 32);
        // Two remain for the next poll
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unknown_opcode_is_noop() {
        let (mut port, cmds, triggers, _ev, _st) = test_port();
        port.feed(&cmd_frame(0x6F, 1, &[1, 2, 3]));
        assert!(cmds.pop().is_none());
        assert!(triggers.pop().is_none());
        assert_eq!(port.error_count(), 0, "unknown opcode is not an error");
        assert!(read_response(&mut port).is_empty());
    }

    #[test]
    fn test_sidechain_set_payload_layout() {
        let (mut port, cmds, _tr, _ev, _st) = test_port();
        let mut payload = vec![1u8, 0];
        payload.extend_from_slice(&0b0010u16.to_le_bytes());
        payload.extend_from_slice(&1.0f32.to_le_bytes());
        payload.extend_from_slice(&10.0f32.to_le_bytes());
        payload.extend_from_slice(&100.0f32.to_le_bytes());
        payload.extend_from_slice(&0.0f32.to_le_bytes());
        port.feed(&cmd_frame(CMD_SIDECHAIN_SET, 1, &payload));

        match cmds.pop() {
            Some(EngineCommand::SidechainSet {
                active,
                source,
                dest_mask,
                amount,
                attack_ms,
                release_ms,
                knee,
            }) => {
                assert!(active);
                assert_eq!(source, 0);
                assert_eq!(dest_mask, 0b0010);
                assert_eq!(amount, 1.0);
                assert_eq!(attack_ms, 10.0);
                assert_eq!(release_ms, 100.0);
                assert_eq!(knee, 0.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_sample_upload_commands_flow_through() {
        let (mut port, cmds, _tr, _ev, _st) = test_port();

        let mut begin = vec![2u8, 0, 0, 0];
        begin.extend_from_slice(&8u32.to_le_bytes());
        port.feed(&cmd_frame(CMD_SAMPLE_BEGIN, 1, &begin));

        let mut data = vec![2u8, 0];
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[1, 0, 2, 0]);
        port.feed(&cmd_frame(CMD_SAMPLE_DATA, 2, &data));

        port.feed(&cmd_frame(CMD_SAMPLE_END, 3, &[2]));

        assert!(matches!(
            cmds.pop(),
            Some(EngineCommand::SampleBegin { pad: 2, total_bytes: 8 })
        ));
        match cmds.pop() {
            Some(EngineCommand::SampleData { pad, offset, bytes }) => {
                assert_eq!(pad, 2);
                assert_eq!(offset, 0);
                assert_eq!(bytes, vec![1, 0, 2, 0]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(cmds.pop(), Some(EngineCommand::SampleEnd { pad: 2 })));
    }

    #[test]
    fn test_bulk_fx_recurses_sub_records() {
        let (mut port, cmds, _tr, _ev, _st) = test_port();
        // Two sub-records: mute track 1, solo track 2
        let payload = [2u8, CMD_TRACK_MUTE, 2, 1, 1, CMD_TRACK_SOLO, 2, 2, 1];
        port.feed(&encode_frame(MAGIC_BULK, CMD_BULK_FX, 1, &payload));

        assert!(matches!(
            cmds.pop(),
            Some(EngineCommand::TrackMute { track: 1, mute: true })
        ));
        assert!(matches!(
            cmds.pop(),
            Some(EngineCommand::TrackSolo { track: 2, solo: true })
        ));
    }

    #[test]
    fn test_trigger_queue_overflow_drops_newest() {
        let (mut port, _cmds, triggers, _ev, _st) = test_port();
        for i in 0..(TRIGGER_QUEUE_SIZE + 4) {
            port.feed(&cmd_frame(CMD_TRIGGER_LIVE, i as u16, &[(i % 24) as u8, 100]));
        }
        assert_eq!(triggers.len(), TRIGGER_QUEUE_SIZE);
        // The oldest trigger is still the first one sent
        assert_eq!(triggers.pop().unwrap().pad, 0);
    }

    #[test]
    fn test_peaks_response_layout() {
        let (mut port, _cmds, _tr, _ev, stats) = test_port();
        stats.set_track_peak(2, 0.5);
        stats.set_master_peak(0.75);
        port.feed(&cmd_frame(CMD_GET_PEAKS, 1, &[]));
        let resp = read_response(&mut port);
        let len = u16::from_le_bytes([resp[2], resp[3]]) as usize;
        assert_eq!(len, 68);
        let track2 = f32::from_le_bytes([resp[8 + 8], resp[8 + 9], resp[8 + 10], resp[8 + 11]]);
        assert_eq!(track2, 0.5);
        let master = f32::from_le_bytes([resp[8 + 64], resp[8 + 65], resp[8 + 66], resp[8 + 67]]);
        assert_eq!(master, 0.75);
    }

    #[test]
    fn test_peaks_track_meters_reset_on_read() {
        let (mut port, cmds, _tr, _ev, stats) = test_port();
        for t in 0..16 {
            stats.set_track_peak(t, 0.25 + t as f32 * 0.01);
        }
        stats.set_master_peak(0.9);

        port.feed(&cmd_frame(CMD_GET_PEAKS, 1, &[]));
        let first = read_response(&mut port);
        let t0 = f32::from_le_bytes([first[8], first[9], first[10], first[11]]);
        assert_eq!(t0, 0.25, "first poll sees the held peak");

        // The poll also schedules a render-side accumulator clear
        assert!(matches!(cmds.pop(), Some(EngineCommand::ResetTrackPeaks)));

        // Second poll with no render in between: every track meter reads
        // zero, the master meter is untouched
        port.feed(&cmd_frame(CMD_GET_PEAKS, 2, &[]));
        let second = read_response(&mut port);
        for t in 0..16 {
            let peak = f32::from_le_bytes([
                second[8 + t * 4],
                second[8 + t * 4 + 1],
                second[8 + t * 4 + 2],
                second[8 + t * 4 + 3],
            ]);
            assert_eq!(peak, 0.0, "track {} must be reset by the first poll", t);
        }
        let master =
            f32::from_le_bytes([second[8 + 64], second[8 + 65], second[8 + 66], second[8 + 67]]);
        assert_eq!(master, 0.9, "master peak is not reset on read");
    }
}
