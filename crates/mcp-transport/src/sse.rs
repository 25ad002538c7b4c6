// crates/mcp-transport/src/sse.rs
// ============================================================================
// Module: SSE Channel
// Description: Per-session SSE fan-out with a bounded replay buffer.
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tokio::sync::mpsc;

/// Default size of the event replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 5000;

/// One stored SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// Monotonically increasing id, assigned at store time.
    pub id: u64,
    /// Optional `event:` field.
    pub event_type: Option<String>,
    /// The event payload.
    pub data: String,
    /// Milliseconds since the Unix epoch at the time this event was stored.
    pub timestamp: u128,
}

impl SseEvent {
    /// Formats this event in SSE wire form: `event: T\nid: N\ndata: D\n\n`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(event_type) = &self.event_type {
            out.push_str("event: ");
            out.push_str(event_type);
            out.push('\n');
        }
        out.push_str("id: ");
        out.push_str(&self.id.to_string());
        out.push('\n');
        out.push_str("data: ");
        out.push_str(&self.data);
        out.push_str("\n\n");
        out
    }
}

/// Identifies one live SSE session.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Only events whose `event_type` matches are delivered, if set.
    pub event_type: Option<String>,
    /// Only events targeted at this session id (or untargeted events) are
    /// delivered, if set.
    pub session_id: Option<String>,
}

struct Session {
    filter: SessionFilter,
    sender: mpsc::UnboundedSender<String>,
}

struct Ring {
    events: VecDeque<SseEvent>,
    capacity: usize,
    next_id: u64,
}

/// The SSE fan-out state for one HTTP transport instance: live sessions plus
/// a bounded circular buffer of recent events for reconnect replay.
///
/// Two separate mutexes guard the session list and the event ring; neither
/// is ever acquired while holding the other, to rule out lock-order
/// inversion.
pub struct SseChannel {
    sessions: Mutex<Vec<Session>>,
    ring: Mutex<Ring>,
    last_heartbeat_ms: Mutex<u128>,
}

impl SseChannel {
    /// Builds a channel with the given replay ring capacity.
    #[must_use]
    pub fn new(replay_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            ring: Mutex::new(Ring {
                events: VecDeque::new(),
                capacity: replay_capacity.max(1),
                next_id: 1,
            }),
            last_heartbeat_ms: Mutex::new(0),
        }
    }

    /// Registers a new session and returns the receiving half of its event
    /// stream.
    #[must_use]
    pub fn subscribe(&self, filter: SessionFilter) -> mpsc::UnboundedReceiver<String> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap_or_else(|poison| poison.into_inner()).push(Session { filter, sender });
        receiver
    }

    /// Assigns the next event id, appends to the ring (evicting the oldest
    /// entry on overflow), and writes the formatted event to every session
    /// that matches `target_session_id` and the session's own filter.
    pub fn broadcast(&self, event_type: Option<String>, data: String, target_session_id: Option<&str>) -> u64 {
        let event = {
            let mut ring = self.ring.lock().unwrap_or_else(|poison| poison.into_inner());
            let id = ring.next_id;
            ring.next_id += 1;
            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
            let event = SseEvent {
                id,
                event_type,
                data,
                timestamp,
            };
            if ring.events.len() >= ring.capacity {
                ring.events.pop_front();
            }
            ring.events.push_back(event.clone());
            event
        };
        self.deliver(&event, target_session_id);
        event.id
    }

    fn deliver(&self, event: &SseEvent, target_session_id: Option<&str>) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|poison| poison.into_inner());
        let wire = event.to_wire();
        sessions.retain(|session| {
            if let Some(target) = target_session_id {
                if session.filter.session_id.as_deref() != Some(target) {
                    return true;
                }
            }
            if let Some(filter_type) = &session.filter.event_type {
                if event.event_type.as_deref() != Some(filter_type.as_str()) {
                    return true;
                }
            }
            session.sender.send(wire.clone()).is_ok()
        });
    }

    /// Writes a `: heartbeat\n\n` comment line to every live session and
    /// records the time it was sent.
    pub fn heartbeat(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|poison| poison.into_inner());
        sessions.retain(|session| session.sender.send(": heartbeat\n\n".to_string()).is_ok());
        drop(sessions);
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        *self.last_heartbeat_ms.lock().unwrap_or_else(|poison| poison.into_inner()) = now;
    }

    /// Returns the time of the last [`SseChannel::heartbeat`] call, in
    /// milliseconds since the Unix epoch, or `0` if none has run yet.
    #[must_use]
    pub fn last_heartbeat_ms(&self) -> u128 {
        *self.last_heartbeat_ms.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Returns every ring entry with `id > last_event_id` whose type matches
    /// `event_type_filter` (if set), in id order.
    #[must_use]
    pub fn replay_since(&self, last_event_id: u64, event_type_filter: Option<&str>) -> Vec<String> {
        let ring = self.ring.lock().unwrap_or_else(|poison| poison.into_inner());
        ring.events
            .iter()
            .filter(|event| event.id > last_event_id)
            .filter(|event| match event_type_filter {
                Some(filter_type) => event.event_type.as_deref() == Some(filter_type),
                None => true,
            })
            .map(SseEvent::to_wire)
            .collect()
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|poison| poison.into_inner()).len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_assigns_monotonic_ids() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        let first = channel.broadcast(Some("tick".to_string()), "1".to_string(), None);
        let second = channel.broadcast(Some("tick".to_string()), "2".to_string(), None);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn subscriber_receives_broadcast_event() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        let mut receiver = channel.subscribe(SessionFilter::default());
        channel.broadcast(Some("tick".to_string()), "hello".to_string(), None);
        let wire = receiver.try_recv().expect("event");
        assert!(wire.contains("event: tick"));
        assert!(wire.contains("data: hello"));
    }

    #[test]
    fn broadcast_events_carry_a_nonzero_timestamp() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        channel.broadcast(None, "hello".to_string(), None);
        let replayed = channel.replay_since(0, None);
        assert_eq!(replayed.len(), 1);
        let ring = channel.ring.lock().expect("lock");
        let stored = ring.events.back().expect("event");
        assert!(stored.timestamp > 0);
    }

    #[test]
    fn session_filter_excludes_non_matching_event_type() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        let mut receiver = channel.subscribe(SessionFilter {
            event_type: Some("wanted".to_string()),
            session_id: None,
        });
        channel.broadcast(Some("other".to_string()), "nope".to_string(), None);
        assert!(receiver.try_recv().is_err());
        channel.broadcast(Some("wanted".to_string()), "yes".to_string(), None);
        assert!(receiver.try_recv().is_ok());
    }

    #[test]
    fn targeted_broadcast_only_reaches_matching_session() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        let mut a = channel.subscribe(SessionFilter {
            event_type: None,
            session_id: Some("a".to_string()),
        });
        let mut b = channel.subscribe(SessionFilter {
            event_type: None,
            session_id: Some("b".to_string()),
        });
        channel.broadcast(None, "for-a".to_string(), Some("a"));
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity() {
        let channel = SseChannel::new(2);
        channel.broadcast(None, "1".to_string(), None);
        channel.broadcast(None, "2".to_string(), None);
        channel.broadcast(None, "3".to_string(), None);
        let replay = channel.replay_since(0, None);
        assert_eq!(replay.len(), 2);
        assert!(replay[0].contains("data: 2"));
        assert!(replay[1].contains("data: 3"));
    }

    #[test]
    fn replay_since_returns_events_in_id_order_after_cutoff() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        channel.broadcast(None, "1".to_string(), None);
        let cutoff = channel.broadcast(None, "2".to_string(), None);
        channel.broadcast(None, "3".to_string(), None);
        let replay = channel.replay_since(cutoff, None);
        assert_eq!(replay.len(), 1);
        assert!(replay[0].contains("data: 3"));
    }

    #[test]
    fn heartbeat_reaches_sessions_and_stamps_last_heartbeat() {
        let channel = SseChannel::new(DEFAULT_REPLAY_CAPACITY);
        let mut receiver = channel.subscribe(SessionFilter::default());
        assert_eq!(channel.last_heartbeat_ms(), 0);
        channel.heartbeat();
        let wire = receiver.try_recv().expect("heartbeat");
        assert_eq!(wire, ": heartbeat\n\n");
        assert!(channel.last_heartbeat_ms() > 0);
    }
}
