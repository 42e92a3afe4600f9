//! Engine-to-controller notifications.
//!
//! The engine is a slave on the wire and cannot push data to the master;
//! instead it queues typed events here. The controller sees a pending-event
//! count in the status response and drains them with the get-events command,
//! up to four per call.

use crossbeam::queue::ArrayQueue;

/// Size of one event on the wire.
pub const EVENT_WIRE_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    BootLoadDone = 0x01,
    KitLoaded = 0x02,
    SampleLoaded = 0x03,
    KitUnloaded = 0x04,
    Error = 0x05,
    ExtraPadsLoaded = 0x06,
}

/// One notification record: kind, affected-pad count, 24-bit pad mask and a
/// short name (kit or sample).
#[derive(Debug, Clone, Copy)]
pub struct NotifyEvent {
    pub kind: EventKind,
    pub pad_count: u8,
    pub pad_mask: u32,
    pub name: [u8; 24],
}

impl NotifyEvent {
    pub fn new(kind: EventKind, pad_count: u8, pad_mask: u32, name: &str) -> Self {
        let mut buf = [0u8; 24];
        let bytes = name.as_bytes();
        let n = bytes.len().min(23);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self {
            kind,
            pad_count,
            pad_mask,
            name: buf,
        }
    }

    /// 32-byte wire layout: type, padCount, mask lo/hi/xtra, 3 reserved,
    /// 24-char name.
    pub fn to_wire(&self) -> [u8; EVENT_WIRE_SIZE] {
        let mut out = [0u8; EVENT_WIRE_SIZE];
        out[0] = self.kind as u8;
        out[1] = self.pad_count;
        out[2] = (self.pad_mask & 0xFF) as u8;
        out[3] = ((self.pad_mask >> 8) & 0xFF) as u8;
        out[4] = ((self.pad_mask >> 16) & 0xFF) as u8;
        out[8..32].copy_from_slice(&self.name);
        out
    }
}

/// Push an event, overwriting the oldest entry when the queue is full.
pub fn push_event(queue: &ArrayQueue<NotifyEvent>, event: NotifyEvent) {
    let _ = queue.force_push(event);
}

/// Drain up to `max` events, oldest first.
pub fn pop_events(queue: &ArrayQueue<NotifyEvent>, max: usize) -> Vec<NotifyEvent> {
    let mut out = Vec::with_capacity(max);
    while out.len() < max {
        match queue.pop() {
            Some(e) => out.push(e),
            None => break,
        }
    }
    out
}
