pub mod audio;
pub mod audio_output;
pub mod commands;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod events;
pub mod protocol;
pub mod synth;

use std::sync::Arc;

use crossbeam::queue::{ArrayQueue, SegQueue};

use commands::{EVENT_QUEUE_SIZE, TRIGGER_QUEUE_SIZE, TX_RING_SIZE};
use config::EngineConfig;
use engine::stats::EngineStats;
use engine::DrumEngine;
use protocol::dispatcher::ProtocolPort;

/// Build a connected engine/protocol pair.
///
/// The [`DrumEngine`] belongs to the audio context (feed it to
/// [`audio_output::AudioOutput`] or call [`DrumEngine::render`] yourself);
/// the [`ProtocolPort`] belongs to the control context and consumes raw
/// command bytes. The two sides only share lock-free queues and a block of
/// atomics, so each can live on its own thread.
pub fn build(config: EngineConfig) -> (DrumEngine, ProtocolPort) {
    let commands = Arc::new(SegQueue::new());
    let triggers = Arc::new(ArrayQueue::new(TRIGGER_QUEUE_SIZE));
    let events = Arc::new(ArrayQueue::new(EVENT_QUEUE_SIZE));
    let stats = Arc::new(EngineStats::new());
    let (tx_producer, tx_consumer) = rtrb::RingBuffer::new(TX_RING_SIZE);

    let engine = DrumEngine::new(
        config,
        Arc::clone(&commands),
        Arc::clone(&triggers),
        Arc::clone(&events),
        Arc::clone(&stats),
    );
    let port = ProtocolPort::new(commands, triggers, events, stats, tx_producer, tx_consumer);

    (engine, port)
}
