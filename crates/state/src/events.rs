//! Event emission for committed transitions.
//!
//! [`EventEmitter`] stamps each [`LedgerEvent`] with the next ledger-wide
//! sequence number and fans it out to every registered [`EventSink`].
//! Operations reserve their sequence number before the first write; once a
//! [`Reservation`] is held, emission cannot fail and sinks cannot veto it.

use std::{collections::VecDeque, fmt, sync::Arc};

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use passport_ledger_types::{
    Address, EventEntry, LedgerError, LedgerEvent, Result, config::EventLogConfig,
};

/// Receiver of committed events.
///
/// # Implementers
///
/// - [`EventLog`]: bounded in-memory ring with replay
/// - [`TracingSink`]: one structured `tracing` record per event
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Delivers one committed event. Called in sequence order.
    fn publish(&self, entry: &EventEntry);
}

/// Bounded in-memory event log.
///
/// Keeps the most recent `capacity` entries. Older entries are evicted from
/// the front.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    entries: RwLock<VecDeque<EventEntry>>,
}

impl EventLog {
    /// Creates an empty log holding at most `config.capacity` entries.
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(config.capacity.min(1024))),
        }
    }

    /// Number of retained entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Retained entries with `sequence > after`, oldest first.
    ///
    /// `since(0)` returns everything still retained. An indexer that finds
    /// the first returned sequence is not `after + 1` has fallen behind the
    /// ring and must rebuild from a snapshot.
    pub fn since(&self, after: u64) -> Vec<EventEntry> {
        self.entries.read().iter().filter(|e| e.sequence > after).cloned().collect()
    }

    /// The most recent entry.
    pub(crate) fn last(&self) -> Option<EventEntry> {
        self.entries.read().back().cloned()
    }
}

impl EventSink for EventLog {
    fn publish(&self, entry: &EventEntry) {
        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }
}

/// Logs every event at `info` under the `passport_ledger::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, entry: &EventEntry) {
        let action = entry.action();
        tracing::info!(
            target: "passport_ledger::events",
            sequence = entry.sequence,
            event_type = action.event_type(),
            scope = action.scope().as_str(),
            actor = %entry.actor,
            passport = entry.event.passport_id().map(|id| id.value()),
            "ledger event"
        );
    }
}

/// Assigns sequence numbers and delivers events to sinks.
#[derive(Debug)]
pub(crate) struct EventEmitter {
    next_sequence: Mutex<u64>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventEmitter {
    pub(crate) fn new(next_sequence: u64, sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { next_sequence: Mutex::new(next_sequence.max(1)), sinks }
    }

    /// Sequence number the next event will receive.
    pub(crate) fn next_sequence(&self) -> u64 {
        *self.next_sequence.lock()
    }

    /// Reserves the next sequence number.
    ///
    /// The sequence lock is held until the reservation is emitted or
    /// dropped. Dropping it gives the number back. The next sequence never
    /// reaches `u64::MAX`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CounterExhausted`] when no sequence number is left.
    pub(crate) fn reserve(&self) -> Result<Reservation<'_>> {
        let next = self.next_sequence.lock();
        let following = match next.checked_add(1) {
            Some(following) if following < u64::MAX => following,
            _ => {
                tracing::warn!(next_sequence = *next, "event sequence exhausted");
                return Err(LedgerError::CounterExhausted {
                    counter: "event sequence".to_string(),
                });
            },
        };
        Ok(Reservation { sequence: *next, following, next, sinks: &self.sinks })
    }
}

/// A sequence number held for one event.
///
/// Sinks run while the sequence lock is held, so every sink observes events
/// in sequence order.
#[must_use = "a reservation publishes nothing until emitted"]
pub(crate) struct Reservation<'a> {
    sequence: u64,
    following: u64,
    next: MutexGuard<'a, u64>,
    sinks: &'a [Arc<dyn EventSink>],
}

impl Reservation<'_> {
    /// Stamps `event` with the reserved sequence and publishes it.
    pub(crate) fn emit(mut self, actor: &Address, event: LedgerEvent) -> EventEntry {
        let entry = EventEntry {
            sequence: self.sequence,
            timestamp: Utc::now(),
            actor: actor.clone(),
            event,
        };
        *self.next = self.following;
        for sink in self.sinks {
            sink.publish(&entry);
        }
        entry
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use passport_ledger_types::{EventAction, PassportId};

    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn status_event(active: bool) -> LedgerEvent {
        LedgerEvent::WorkshopStatusChanged { workshop: addr("0xaa"), active }
    }

    #[test]
    fn test_emitter_sequences_are_contiguous() {
        let log = Arc::new(EventLog::new(EventLogConfig::default()));
        let emitter = EventEmitter::new(1, vec![log.clone() as Arc<dyn EventSink>]);
        for i in 0..5 {
            let entry = emitter.reserve().unwrap().emit(&addr("0xad"), status_event(i % 2 == 0));
            assert_eq!(entry.sequence, i + 1);
        }
        assert_eq!(emitter.next_sequence(), 6);
        let sequences: Vec<_> = log.since(0).iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_emitter_resumes_from_sequence() {
        let emitter = EventEmitter::new(42, Vec::new());
        assert_eq!(emitter.reserve().unwrap().emit(&addr("0xad"), status_event(true)).sequence, 42);
    }

    #[test]
    fn test_dropped_reservation_keeps_sequence() {
        let log = Arc::new(EventLog::new(EventLogConfig::default()));
        let emitter = EventEmitter::new(7, vec![log.clone() as Arc<dyn EventSink>]);
        drop(emitter.reserve().unwrap());
        assert_eq!(emitter.next_sequence(), 7);
        assert_eq!(log.len(), 0);
        assert_eq!(emitter.reserve().unwrap().emit(&addr("0xad"), status_event(true)).sequence, 7);
    }

    #[test]
    fn test_reserve_refuses_the_last_sequence() {
        let log = Arc::new(EventLog::new(EventLogConfig::default()));
        let emitter = EventEmitter::new(u64::MAX - 2, vec![log.clone() as Arc<dyn EventSink>]);
        let entry = emitter.reserve().unwrap().emit(&addr("0xad"), status_event(true));
        assert_eq!(entry.sequence, u64::MAX - 2);
        assert_eq!(emitter.next_sequence(), u64::MAX - 1);

        let err = emitter.reserve().err().unwrap();
        assert!(matches!(err, LedgerError::CounterExhausted { .. }));
        assert_eq!(emitter.next_sequence(), u64::MAX - 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|e| e.sequence), Some(u64::MAX - 2));
    }

    #[test]
    fn test_event_log_evicts_oldest() {
        let log = EventLog::new(EventLogConfig { capacity: 2 });
        let emitter = EventEmitter::new(1, Vec::new());
        for _ in 0..3 {
            log.publish(&emitter.reserve().unwrap().emit(&addr("0xad"), status_event(true)));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.since(0).first().map(|e| e.sequence), Some(2));
        assert_eq!(log.last().map(|e| e.sequence), Some(3));
    }

    #[test]
    fn test_event_log_since_filters() {
        let log = EventLog::new(EventLogConfig::default());
        assert_eq!(log.last(), None);
        let emitter = EventEmitter::new(1, Vec::new());
        for _ in 0..4 {
            log.publish(&emitter.reserve().unwrap().emit(&addr("0xad"), status_event(false)));
        }
        let tail = log.since(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence, 3);
        assert!(log.since(4).is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_events() {
        let entry = EventEmitter::new(1, Vec::new()).reserve().unwrap().emit(
            &addr("0xbb"),
            LedgerEvent::PassportMinted {
                passport_id: PassportId::new(1),
                vin: "VIN123".to_string(),
                owner: addr("0xbb"),
            },
        );
        TracingSink.publish(&entry);
        assert_eq!(entry.action(), EventAction::PassportMinted);
    }
}
