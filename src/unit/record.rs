//! record.rs
//! Event and job records moved through the unit, with their wire identities.
//! - events are what producers hand in; payloads clamp to 16 bytes at admission
//! - jobs are what the scheduler emits; payload = tag + original length + copy

/// Inline payload capacity of an [`Event`].
pub const EVENT_PAYLOAD_MAX: usize = 16;
/// Inline payload capacity of a [`Job`].
pub const JOB_PAYLOAD_MAX: usize = 32;

/// How the event queue treats a same-kind entry already waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Every admission appends.
    None,
    /// A newer entry overwrites the queued one in place.
    Last,
}

/// Producer-side event kinds. Discriminants are the wire type byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    #[default]
    Cmd = 1,
    Sensor = 2,
    Hb = 3,
    Telem = 4,
}

impl EventKind {
    /// Commands must never be collapsed; periodic kinds keep only the newest.
    pub fn merge_policy(self) -> MergePolicy {
        match self {
            EventKind::Sensor | EventKind::Hb | EventKind::Telem => MergePolicy::Last,
            EventKind::Cmd => MergePolicy::None,
        }
    }

    /// Job kind this event is promoted to (1:1 mapping).
    pub fn job_kind(self) -> JobKind {
        match self {
            EventKind::Cmd => JobKind::Cmd,
            EventKind::Sensor => JobKind::Sensor,
            EventKind::Hb => JobKind::Hb,
            EventKind::Telem => JobKind::Telem,
        }
    }

    /// Secondary tag written at job payload byte 0.
    pub fn wire_tag(self) -> u8 {
        match self {
            EventKind::Sensor => 0x01,
            EventKind::Hb => 0x02,
            EventKind::Telem => 0x03,
            EventKind::Cmd => 0x04,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Cmd => "cmd",
            EventKind::Sensor => "sensor",
            EventKind::Hb => "heartbeat",
            EventKind::Telem => "telemetry",
        }
    }
}

/// Scheduler-side job kinds. Discriminants are the frame type byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobKind {
    #[default]
    Cmd = 1,
    Sensor = 2,
    Hb = 3,
    Telem = 4,
}

/// One admitted producer event. `t_ms` is a wrap-tolerant millisecond stamp.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub kind: EventKind,
    pub flags: u8,
    pub len: u16,
    pub t_ms: u32,
    pub payload: [u8; EVENT_PAYLOAD_MAX],
}

impl Event {
    /// Build an event from raw producer bytes, truncating past 16.
    pub fn new(kind: EventKind, payload: &[u8], t_ms: u32) -> Self {
        let n = payload.len().min(EVENT_PAYLOAD_MAX);
        let mut buf = [0u8; EVENT_PAYLOAD_MAX];
        buf[..n].copy_from_slice(&payload[..n]);
        Self {
            kind,
            flags: 0,
            len: n as u16,
            t_ms,
            payload: buf,
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self {
            kind: EventKind::default(),
            flags: 0,
            len: 0,
            t_ms: 0,
            payload: [0; EVENT_PAYLOAD_MAX],
        }
    }
}

/// One scheduled job, ready for framing.
#[derive(Debug, Clone, Copy)]
pub struct Job {
    pub kind: JobKind,
    pub flags: u8,
    pub len: u16,
    pub t_ms: u32,
    pub payload: [u8; JOB_PAYLOAD_MAX],
}

impl Job {
    /// Promote an event. Payload layout: byte 0 secondary tag, byte 1 original
    /// event length (low byte), bytes 2.. a copy of the event payload clamped
    /// to the remaining 30 bytes.
    pub fn from_event(e: &Event, now_ms: u32) -> Self {
        let mut payload = [0u8; JOB_PAYLOAD_MAX];
        payload[0] = e.kind.wire_tag();
        payload[1] = e.len as u8;
        let copy_n = (e.len as usize)
            .min(JOB_PAYLOAD_MAX - 2)
            .min(EVENT_PAYLOAD_MAX);
        payload[2..2 + copy_n].copy_from_slice(&e.payload[..copy_n]);
        Self {
            kind: e.kind.job_kind(),
            flags: e.flags,
            len: (2 + copy_n) as u16,
            t_ms: now_ms,
            payload,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self {
            kind: JobKind::default(),
            flags: 0,
            len: 0,
            t_ms: 0,
            payload: [0; JOB_PAYLOAD_MAX],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_truncates_to_inline_capacity() {
        let long = [0xABu8; 24];
        let e = Event::new(EventKind::Telem, &long, 5);
        assert_eq!(e.len, 16);
        assert_eq!(&e.payload[..], &long[..16]);
        assert_eq!(e.flags, 0);
    }

    #[test]
    fn job_promotion_layout() {
        let e = Event::new(EventKind::Hb, &[0x01], 100);
        let j = Job::from_event(&e, 120);
        assert_eq!(j.kind, JobKind::Hb);
        assert_eq!(j.len, 3);
        assert_eq!(j.t_ms, 120);
        assert_eq!(&j.payload[..3], &[0x02, 0x01, 0x01]);
    }

    #[test]
    fn merge_policy_keeps_commands_distinct() {
        assert_eq!(EventKind::Cmd.merge_policy(), MergePolicy::None);
        assert_eq!(EventKind::Sensor.merge_policy(), MergePolicy::Last);
        assert_eq!(EventKind::Hb.merge_policy(), MergePolicy::Last);
        assert_eq!(EventKind::Telem.merge_policy(), MergePolicy::Last);
    }

    #[test]
    fn wire_identities_match_link_protocol() {
        assert_eq!(EventKind::Cmd as u8, 1);
        assert_eq!(EventKind::Sensor as u8, 2);
        assert_eq!(EventKind::Hb as u8, 3);
        assert_eq!(EventKind::Telem as u8, 4);
        assert_eq!(EventKind::Sensor.wire_tag(), 0x01);
        assert_eq!(EventKind::Hb.wire_tag(), 0x02);
        assert_eq!(EventKind::Telem.wire_tag(), 0x03);
        assert_eq!(EventKind::Cmd.wire_tag(), 0x04);
    }
}
