//! Byte-framed command protocol: constants, stream parser, dispatcher.

pub mod crc;
pub mod dispatcher;
pub mod parser;

/// Frame magics accepted on the receive side.
pub const MAGIC_CMD: u8 = 0xA5;
pub const MAGIC_BULK: u8 = 0xBB;
pub const MAGIC_SAMPLE_BATCH: u8 = 0xDA;
/// Response frames carry this magic.
pub const MAGIC_RESP: u8 = 0x5A;

/// Header size on the wire: magic, command, length u16, sequence u16,
/// checksum u16.
pub const HEADER_SIZE: usize = 8;
/// Payloads above this are dropped as malformed.
pub const MAX_PAYLOAD: usize = 600;

// Command codes. Unknown codes are no-ops by contract.
pub const CMD_TRIGGER_SEQ: u8 = 0x01;
pub const CMD_TRIGGER_LIVE: u8 = 0x02;
pub const CMD_TRIGGER_STOP: u8 = 0x03;
pub const CMD_TRIGGER_STOP_ALL: u8 = 0x04;
pub const CMD_TRIGGER_SIDECHAIN: u8 = 0x05;

pub const CMD_MASTER_VOLUME: u8 = 0x10;
pub const CMD_SEQ_VOLUME: u8 = 0x11;
pub const CMD_LIVE_VOLUME: u8 = 0x12;
pub const CMD_TRACK_VOLUME: u8 = 0x13;
pub const CMD_LIVE_PITCH: u8 = 0x14;

pub const CMD_FILTER_SET: u8 = 0x20;
pub const CMD_FILTER_CUTOFF: u8 = 0x21;
pub const CMD_FILTER_RESONANCE: u8 = 0x22;
pub const CMD_FILTER_BITDEPTH: u8 = 0x23;
pub const CMD_FILTER_DISTORTION: u8 = 0x24;
pub const CMD_FILTER_DIST_MODE: u8 = 0x25;
pub const CMD_FILTER_SR_REDUCE: u8 = 0x26;

pub const CMD_DELAY_ACTIVE: u8 = 0x30;
pub const CMD_DELAY_TIME: u8 = 0x31;
pub const CMD_DELAY_FEEDBACK: u8 = 0x32;
pub const CMD_DELAY_MIX: u8 = 0x33;
pub const CMD_PHASER_ACTIVE: u8 = 0x34;
pub const CMD_PHASER_RATE: u8 = 0x35;
pub const CMD_PHASER_DEPTH: u8 = 0x36;
pub const CMD_PHASER_FEEDBACK: u8 = 0x37;
pub const CMD_FLANGER_ACTIVE: u8 = 0x38;
pub const CMD_FLANGER_RATE: u8 = 0x39;
pub const CMD_FLANGER_DEPTH: u8 = 0x3A;
pub const CMD_FLANGER_FEEDBACK: u8 = 0x3B;
pub const CMD_FLANGER_MIX: u8 = 0x3C;
pub const CMD_COMP_ACTIVE: u8 = 0x3D;
pub const CMD_COMP_THRESHOLD: u8 = 0x3E;
pub const CMD_COMP_RATIO: u8 = 0x3F;
pub const CMD_COMP_ATTACK: u8 = 0x40;
pub const CMD_COMP_RELEASE: u8 = 0x41;
pub const CMD_COMP_MAKEUP: u8 = 0x42;
pub const CMD_REVERB_ACTIVE: u8 = 0x43;
pub const CMD_REVERB_FEEDBACK: u8 = 0x44;
pub const CMD_REVERB_LPFREQ: u8 = 0x45;
pub const CMD_REVERB_MIX: u8 = 0x46;
pub const CMD_CHORUS_ACTIVE: u8 = 0x47;
pub const CMD_CHORUS_RATE: u8 = 0x48;
pub const CMD_CHORUS_DEPTH: u8 = 0x49;
pub const CMD_CHORUS_MIX: u8 = 0x4A;
pub const CMD_TREMOLO_ACTIVE: u8 = 0x4B;
pub const CMD_TREMOLO_RATE: u8 = 0x4C;
pub const CMD_TREMOLO_DEPTH: u8 = 0x4D;
pub const CMD_WAVEFOLDER_GAIN: u8 = 0x4E;
pub const CMD_LIMITER_ACTIVE: u8 = 0x4F;

pub const CMD_TRACK_FILTER: u8 = 0x50;
pub const CMD_TRACK_CLEAR_FILTER: u8 = 0x51;
pub const CMD_TRACK_DISTORTION: u8 = 0x52;
pub const CMD_TRACK_BITCRUSH: u8 = 0x53;
pub const CMD_TRACK_ECHO: u8 = 0x54;
pub const CMD_TRACK_FLANGER_FX: u8 = 0x55;
pub const CMD_TRACK_COMPRESSOR: u8 = 0x56;
pub const CMD_TRACK_CLEAR_LIVE: u8 = 0x57;
pub const CMD_TRACK_CLEAR_FX: u8 = 0x58;
pub const CMD_TRACK_REVERB_SEND: u8 = 0x59;
pub const CMD_TRACK_DELAY_SEND: u8 = 0x5A;
pub const CMD_TRACK_CHORUS_SEND: u8 = 0x5B;
pub const CMD_TRACK_PAN: u8 = 0x5C;
pub const CMD_TRACK_MUTE: u8 = 0x5D;
pub const CMD_TRACK_SOLO: u8 = 0x5E;
pub const CMD_TRACK_EQ_LOW: u8 = 0x63;
pub const CMD_TRACK_EQ_MID: u8 = 0x64;
pub const CMD_TRACK_EQ_HIGH: u8 = 0x65;

pub const CMD_PAD_FILTER: u8 = 0x70;
pub const CMD_PAD_CLEAR_FILTER: u8 = 0x71;
pub const CMD_PAD_DISTORTION: u8 = 0x72;
pub const CMD_PAD_BITCRUSH: u8 = 0x73;
pub const CMD_PAD_LOOP: u8 = 0x74;
pub const CMD_PAD_REVERSE: u8 = 0x75;
pub const CMD_PAD_PITCH: u8 = 0x76;
pub const CMD_PAD_STUTTER: u8 = 0x77;
pub const CMD_PAD_SCRATCH: u8 = 0x78;
pub const CMD_PAD_TURNTABLISM: u8 = 0x79;
pub const CMD_PAD_CLEAR_FX: u8 = 0x7A;

pub const CMD_SIDECHAIN_SET: u8 = 0x90;
pub const CMD_SIDECHAIN_CLEAR: u8 = 0x91;

pub const CMD_SAMPLE_BEGIN: u8 = 0xA0;
pub const CMD_SAMPLE_DATA: u8 = 0xA1;
pub const CMD_SAMPLE_END: u8 = 0xA2;
pub const CMD_SAMPLE_UNLOAD: u8 = 0xA3;
pub const CMD_SAMPLE_UNLOAD_ALL: u8 = 0xA4;

// Filesystem collaborator range; only the status-style queries answer.
pub const CMD_FS_STATUS: u8 = 0xB6;
pub const CMD_FS_GET_LOADED: u8 = 0xB8;

pub const CMD_SYNTH_TRIGGER: u8 = 0xC0;
pub const CMD_SYNTH_PARAM: u8 = 0xC1;
pub const CMD_SYNTH_NOTE_ON: u8 = 0xC2;
pub const CMD_SYNTH_NOTE_OFF: u8 = 0xC3;
pub const CMD_SYNTH_ACID_PARAM: u8 = 0xC4;
pub const CMD_SYNTH_ACTIVE: u8 = 0xC5;

pub const CMD_GET_STATUS: u8 = 0xE0;
pub const CMD_GET_PEAKS: u8 = 0xE1;
pub const CMD_GET_CPU_LOAD: u8 = 0xE2;
pub const CMD_GET_VOICES: u8 = 0xE3;
pub const CMD_GET_EVENTS: u8 = 0xE4;
pub const CMD_PING: u8 = 0xEE;
pub const CMD_RESET: u8 = 0xEF;

pub const CMD_BULK_TRIGGERS: u8 = 0xF0;
pub const CMD_BULK_FX: u8 = 0xF1;
