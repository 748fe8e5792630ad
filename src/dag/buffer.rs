//! Ordering buffer for out-of-order event delivery
//!
//! Events whose parents are not yet known are parked here until the
//! missing parents arrive. Completed events flow to the `process`
//! callback; everything else leaves through the `released` callback
//! exactly once, with the peer that delivered it and the reason.

use super::event::{Event, EventError};
use super::DagError;
use crate::crypto::EventId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Capacity limit of the buffer, by entry count and total weight
#[derive(Debug, Clone, Copy)]
pub struct BufferLimit {
    /// Maximum number of buffered events
    pub num: usize,
    /// Maximum total size of buffered events in bytes
    pub size: u64,
}

impl Default for BufferLimit {
    fn default() -> Self {
        BufferLimit {
            num: 3000,
            size: 10 * 1024 * 1024,
        }
    }
}

/// Callbacks wired into the buffer by its owner
pub struct BufferCallbacks {
    /// Deliver a completed event to consensus
    pub process: Box<dyn Fn(&Event) -> Result<(), DagError> + Send + Sync>,
    /// Resolve an already-connected event by id
    pub get: Box<dyn Fn(&EventId) -> Option<Event> + Send + Sync>,
    /// Optional validation against resolved parents, run before `process`
    pub check: Option<Box<dyn Fn(&Event, &[&Event]) -> Result<(), EventError> + Send + Sync>>,
    /// Fired exactly once per pushed event: on success with `None`, on
    /// drop or spill with the error
    pub released: Box<dyn Fn(&Event, &str, Option<&DagError>) + Send + Sync>,
}

struct Incomplete {
    event: Event,
    peer: String,
    size: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<EventId, Incomplete>,
    /// Insertion order; eviction is FIFO
    order: VecDeque<EventId>,
}

/// Buffer of events waiting for their parents
pub struct OrderingBuffer {
    limit: BufferLimit,
    callbacks: BufferCallbacks,
    inner: Mutex<Inner>,
    total_num: AtomicUsize,
    total_size: AtomicU64,
}

impl OrderingBuffer {
    /// Create a buffer with the given limit and callbacks
    pub fn new(limit: BufferLimit, callbacks: BufferCallbacks) -> Self {
        OrderingBuffer {
            limit,
            callbacks,
            inner: Mutex::new(Inner::default()),
            total_num: AtomicUsize::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Push an event delivered by `peer`.
    ///
    /// Returns true if the event (and possibly buffered descendants of it)
    /// completed and reached `process`. A duplicate of a buffered event is
    /// released with [`DagError::DuplicateEvent`] and does not alter the
    /// buffer.
    pub fn push_event(&self, event: Event, peer: &str) -> bool {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&event.id()) {
            (self.callbacks.released)(&event, peer, Some(&DagError::DuplicateEvent));
            return false;
        }

        let completed = self.try_complete(&mut inner, event, peer);
        if completed {
            self.complete_descendants(&mut inner);
        }

        self.spill_incompletes(&mut inner, self.limit);
        completed
    }

    /// Complete buffered events whose parents became available.
    ///
    /// Each pass scans a snapshot of the currently buffered ids, so the
    /// recursion is bounded: every successful completion removes an entry
    /// before recursing.
    fn complete_descendants(&self, inner: &mut Inner) {
        let snapshot: Vec<EventId> = inner.order.iter().copied().collect();
        for id in snapshot {
            let ready = match inner.entries.get(&id) {
                Some(entry) => self.parents_resolved(&entry.event),
                None => false,
            };
            if ready {
                if let Some(entry) = self.remove(inner, &id) {
                    if self.try_complete(inner, entry.event, &entry.peer) {
                        self.complete_descendants(inner);
                    }
                }
            }
        }
    }

    fn parents_resolved(&self, event: &Event) -> bool {
        event
            .parents()
            .iter()
            .all(|p| (self.callbacks.get)(p).is_some())
    }

    /// Check parents, validate and process `event`, or insert it as
    /// incomplete. Returns true if the event reached `process`.
    fn try_complete(&self, inner: &mut Inner, event: Event, peer: &str) -> bool {
        let mut parents = Vec::with_capacity(event.parents().len());
        for id in event.parents() {
            match (self.callbacks.get)(id) {
                Some(parent) => parents.push(parent),
                None => {
                    self.insert(inner, event, peer);
                    return false;
                }
            }
        }

        if let Some(check) = &self.callbacks.check {
            let parent_refs: Vec<&Event> = parents.iter().collect();
            if let Err(err) = check(&event, &parent_refs) {
                let err = DagError::Validation(err);
                (self.callbacks.released)(&event, peer, Some(&err));
                return false;
            }
        }

        match (self.callbacks.process)(&event) {
            Ok(()) => {
                (self.callbacks.released)(&event, peer, None);
                true
            }
            Err(err) => {
                (self.callbacks.released)(&event, peer, Some(&err));
                false
            }
        }
    }

    fn insert(&self, inner: &mut Inner, event: Event, peer: &str) {
        let id = event.id();
        let size = event.size();
        inner.entries.insert(
            id,
            Incomplete {
                event,
                peer: peer.to_string(),
                size,
            },
        );
        inner.order.push_back(id);
        self.total_num.fetch_add(1, Ordering::Relaxed);
        self.total_size.fetch_add(size, Ordering::Relaxed);
    }

    fn remove(&self, inner: &mut Inner, id: &EventId) -> Option<Incomplete> {
        let entry = inner.entries.remove(id)?;
        inner.order.retain(|e| e != id);
        self.total_num.fetch_sub(1, Ordering::Relaxed);
        self.total_size.fetch_sub(entry.size, Ordering::Relaxed);
        Some(entry)
    }

    /// Evict oldest entries until the buffer fits `limit`
    fn spill_incompletes(&self, inner: &mut Inner, limit: BufferLimit) {
        while self.total_num.load(Ordering::Relaxed) > limit.num
            || self.total_size.load(Ordering::Relaxed) > limit.size
        {
            let oldest = match inner.order.front().copied() {
                Some(id) => id,
                None => break,
            };
            if let Some(entry) = self.remove(inner, &oldest) {
                debug!(event = %oldest, peer = %entry.peer, "spilling incomplete event");
                (self.callbacks.released)(&entry.event, &entry.peer, Some(&DagError::SpilledEvent));
            }
        }
    }

    /// Release every buffered event with [`DagError::Terminated`]
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        while let Some(id) = inner.order.front().copied() {
            if let Some(entry) = self.remove(&mut inner, &id) {
                (self.callbacks.released)(&entry.event, &entry.peer, Some(&DagError::Terminated));
            }
        }
    }

    /// Current (count, total size); lock-free read
    pub fn total(&self) -> (usize, u64) {
        (
            self.total_num.load(Ordering::Relaxed),
            self.total_size.load(Ordering::Relaxed),
        )
    }

    /// True if `id` is currently buffered as incomplete
    pub fn is_buffered(&self, id: &EventId) -> bool {
        self.inner.lock().entries.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::event::EventBuilder;
    use crate::validators::ValidatorId;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    struct Harness {
        processed: Arc<PlMutex<Vec<EventId>>>,
        released: Arc<PlMutex<Vec<(EventId, String, Option<String>)>>>,
        known: Arc<PlMutex<HashMap<EventId, Event>>>,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                processed: Arc::new(PlMutex::new(Vec::new())),
                released: Arc::new(PlMutex::new(Vec::new())),
                known: Arc::new(PlMutex::new(HashMap::new())),
            }
        }

        fn buffer(&self, limit: BufferLimit) -> OrderingBuffer {
            let processed = self.processed.clone();
            let released = self.released.clone();
            let known = self.known.clone();
            let known_get = known.clone();
            OrderingBuffer::new(
                limit,
                BufferCallbacks {
                    process: Box::new(move |e| {
                        processed.lock().push(e.id());
                        known.lock().insert(e.id(), e.clone());
                        Ok(())
                    }),
                    get: Box::new(move |id| known_get.lock().get(id).cloned()),
                    check: None,
                    released: Box::new(move |e, peer, err| {
                        released
                            .lock()
                            .push((e.id(), peer.to_string(), err.map(|e| e.to_string())));
                    }),
                },
            )
        }
    }

    fn event(creator: u64, seq: u32, lamport: u32, parents: Vec<EventId>) -> Event {
        let mut b = EventBuilder::default();
        b.creator = ValidatorId(creator);
        b.seq = seq;
        b.lamport = lamport;
        b.parents = parents;
        b.build()
    }

    #[test]
    fn test_parentless_event_processes_immediately() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit::default());

        let e = event(1, 1, 1, vec![]);
        assert!(buffer.push_event(e.clone(), "peer-a"));
        assert_eq!(h.processed.lock().as_slice(), &[e.id()]);
        assert_eq!(buffer.total(), (0, 0));

        let released = h.released.lock();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].2, None);
    }

    #[test]
    fn test_out_of_order_completion() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit::default());

        let parent = event(1, 1, 1, vec![]);
        let child = event(1, 2, 2, vec![parent.id()]);
        let grandchild = event(1, 3, 3, vec![child.id()]);

        // Deliver deepest first.
        assert!(!buffer.push_event(grandchild.clone(), "p"));
        assert!(!buffer.push_event(child.clone(), "p"));
        assert_eq!(buffer.total().0, 2);

        // The root completes the whole chain in topological order.
        assert!(buffer.push_event(parent.clone(), "p"));
        assert_eq!(
            h.processed.lock().as_slice(),
            &[parent.id(), child.id(), grandchild.id()]
        );
        assert_eq!(buffer.total(), (0, 0));
    }

    #[test]
    fn test_duplicate_push_released_with_error() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit::default());

        let parent = event(1, 1, 1, vec![]);
        let child = event(1, 2, 2, vec![parent.id()]);

        assert!(!buffer.push_event(child.clone(), "p"));
        let size_before = buffer.total();

        assert!(!buffer.push_event(child.clone(), "p"));
        assert_eq!(buffer.total(), size_before);

        let released = h.released.lock();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].2.as_deref(), Some("duplicated event"));
    }

    #[test]
    fn test_spill_evicts_oldest_first() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit {
            num: 2,
            size: u64::MAX,
        });

        let missing = event(9, 1, 1, vec![]);
        let a = event(1, 2, 2, vec![missing.id()]);
        let b = event(2, 2, 2, vec![missing.id()]);
        let c = event(3, 2, 2, vec![missing.id()]);

        buffer.push_event(a.clone(), "p");
        buffer.push_event(b.clone(), "p");
        buffer.push_event(c.clone(), "p");

        assert_eq!(buffer.total().0, 2);
        assert!(!buffer.is_buffered(&a.id()));
        assert!(buffer.is_buffered(&b.id()));
        assert!(buffer.is_buffered(&c.id()));

        let released = h.released.lock();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].0, a.id());
        assert_eq!(
            released[0].2.as_deref(),
            Some("event spilled out of the buffer")
        );
    }

    #[test]
    fn test_spill_by_size() {
        let h = Harness::new();
        let missing = event(9, 1, 1, vec![]);
        let a = event(1, 2, 2, vec![missing.id()]);
        let buffer = h.buffer(BufferLimit {
            num: 100,
            size: a.size(), // a alone fits, two do not
        });

        let b = event(2, 2, 2, vec![missing.id()]);
        buffer.push_event(a.clone(), "p");
        buffer.push_event(b.clone(), "p");

        assert!(!buffer.is_buffered(&a.id()));
        assert!(buffer.is_buffered(&b.id()));
    }

    #[test]
    fn test_check_failure_releases_without_processing() {
        let h = Harness::new();
        let processed = h.processed.clone();
        let released = h.released.clone();
        let known = h.known.clone();
        let known_get = known.clone();
        let buffer = OrderingBuffer::new(
            BufferLimit::default(),
            BufferCallbacks {
                process: Box::new(move |e| {
                    processed.lock().push(e.id());
                    Ok(())
                }),
                get: Box::new(move |id| known_get.lock().get(id).cloned()),
                check: Some(Box::new(|_, _| Err(EventError::WrongLamport))),
                released: Box::new(move |e, peer, err| {
                    released
                        .lock()
                        .push((e.id(), peer.to_string(), err.map(|e| e.to_string())));
                }),
            },
        );

        let e = event(1, 1, 1, vec![]);
        assert!(!buffer.push_event(e, "p"));
        assert!(h.processed.lock().is_empty());
        assert_eq!(h.released.lock().len(), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit::default());

        let missing = event(9, 1, 1, vec![]);
        buffer.push_event(event(1, 2, 2, vec![missing.id()]), "p");
        buffer.push_event(event(2, 2, 2, vec![missing.id()]), "p");

        buffer.clear();
        assert_eq!(buffer.total(), (0, 0));

        let released = h.released.lock();
        assert_eq!(released.len(), 2);
        assert!(released
            .iter()
            .all(|(_, _, err)| err.as_deref() == Some("processor is terminated")));
    }

    #[test]
    fn test_diamond_completes_in_topological_order() {
        let h = Harness::new();
        let buffer = h.buffer(BufferLimit::default());

        let root = event(1, 1, 1, vec![]);
        let left = event(2, 1, 2, vec![root.id()]);
        let right = event(3, 1, 2, vec![root.id()]);
        let top = event(1, 2, 3, vec![root.id(), left.id(), right.id()]);

        buffer.push_event(top.clone(), "p");
        buffer.push_event(left.clone(), "p");
        buffer.push_event(right.clone(), "p");
        buffer.push_event(root.clone(), "p");

        let processed = h.processed.lock();
        assert_eq!(processed.len(), 4);
        assert_eq!(processed[0], root.id());
        assert_eq!(processed[3], top.id());
        // left/right complete in buffer order between root and top
        assert!(processed[1..3].contains(&left.id()));
        assert!(processed[1..3].contains(&right.id()));
    }
}
