//! DAG event processor
//!
//! Thread-safe fan-in/fan-out for peer-delivered events. A batch first
//! acquires `(num, size)` capacity on the data semaphore, then flows
//! through two single-worker pools: a checker running parentless
//! validation in parallel, and an inserter feeding the ordering buffer in
//! either input order or completion order. Capacity is returned as each
//! event leaves through the released callback.

use super::buffer::{BufferCallbacks, OrderingBuffer};
use super::event::{Event, EventError};
use super::semaphore::{DataSemaphore, Metric};
use super::workers::Workers;
use super::{BufferLimit, DagError};
use crate::crypto::EventId;
use crate::Lamport;
use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Buffer limit, also the aggregate in-flight semaphore capacity
    pub events_buffer_limit: BufferLimit,
    /// How long `enqueue` may wait for semaphore capacity
    pub events_semaphore_timeout: Duration,
    /// Capacity of each worker pool's task channel
    pub max_tasks: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            events_buffer_limit: BufferLimit::default(),
            events_semaphore_timeout: Duration::from_secs(1),
            max_tasks: 128,
        }
    }
}

/// Callbacks wired into the processor by its owner
pub struct ProcessorCallbacks {
    /// Deliver a completed event to consensus
    pub process: Box<dyn Fn(&Event) -> Result<(), DagError> + Send + Sync>,
    /// Resolve an already-connected event by id
    pub get: Box<dyn Fn(&EventId) -> Option<Event> + Send + Sync>,
    /// Optional validation against resolved parents
    pub check: Option<Box<dyn Fn(&Event, &[&Event]) -> Result<(), EventError> + Send + Sync>>,
    /// Validation that needs no parents (epoch relevance, creator
    /// authority, structural checks beyond the built-in ones)
    pub check_parentless: Box<dyn Fn(&Event) -> Result<(), EventError> + Send + Sync>,
    /// Fired exactly once per accepted event
    pub released: Box<dyn Fn(&Event, &str, Option<&DagError>) + Send + Sync>,
    /// Highest lamport time connected into the DAG so far
    pub highest_lamport: Box<dyn Fn() -> Lamport + Send + Sync>,
}

struct CheckResult {
    pos: usize,
    event: Event,
    err: Option<EventError>,
}

type ReleaseFn = Arc<dyn Fn(&Event, &str, Option<&DagError>) + Send + Sync>;
type GetFn = Arc<dyn Fn(&EventId) -> Option<Event> + Send + Sync>;
type ParentlessFn = Arc<dyn Fn(&Event) -> Result<(), EventError> + Send + Sync>;
type LamportFn = Arc<dyn Fn() -> Lamport + Send + Sync>;

/// DAG event intake processor
pub struct Processor {
    cfg: ProcessorConfig,
    semaphore: Arc<DataSemaphore>,
    buffer: Arc<OrderingBuffer>,
    checkers: Arc<Workers>,
    inserters: Arc<Workers>,
    quit_tx: Mutex<Option<Sender<()>>>,
    release_event: ReleaseFn,
    get: GetFn,
    check_parentless: ParentlessFn,
    highest_lamport: LamportFn,
}

impl Processor {
    /// Create a processor; call `start` before enqueueing
    pub fn new(cfg: ProcessorConfig, callbacks: ProcessorCallbacks) -> Self {
        let semaphore = Arc::new(DataSemaphore::with_default_warning(Metric {
            num: cfg.events_buffer_limit.num,
            size: cfg.events_buffer_limit.size,
        }));

        let released_user: ReleaseFn = Arc::from(callbacks.released);
        let sem = semaphore.clone();
        let release_event: ReleaseFn = Arc::new(move |e: &Event, peer: &str, err| {
            released_user(e, peer, err);
            sem.release(Metric {
                num: 1,
                size: e.size(),
            });
        });

        let get: GetFn = Arc::from(callbacks.get);

        let buffer_release = release_event.clone();
        let buffer_get = get.clone();
        let buffer = Arc::new(OrderingBuffer::new(
            cfg.events_buffer_limit,
            BufferCallbacks {
                process: callbacks.process,
                get: Box::new(move |id| buffer_get(id)),
                check: callbacks.check,
                released: Box::new(move |e, peer, err| buffer_release(e, peer, err)),
            },
        ));

        let (quit_tx, quit_rx) = unbounded();
        let checkers = Arc::new(Workers::new(cfg.max_tasks, quit_rx.clone()));
        let inserters = Arc::new(Workers::new(cfg.max_tasks, quit_rx));

        Processor {
            cfg,
            semaphore,
            buffer,
            checkers,
            inserters,
            quit_tx: Mutex::new(Some(quit_tx)),
            release_event,
            get,
            check_parentless: Arc::from(callbacks.check_parentless),
            highest_lamport: Arc::from(callbacks.highest_lamport),
        }
    }

    /// Start the checker and inserter workers
    pub fn start(&self) {
        self.checkers.start("dag-checker", 1);
        self.inserters.start("dag-inserter", 1);
    }

    /// Enqueue a batch of events from `peer`.
    ///
    /// With `ordered`, events pass the inserter in input order; otherwise
    /// whichever validation finishes first wins scheduling.
    /// `notify_announces` receives the ids of missing parents worth
    /// requesting from the peer, once per batch; `done` fires after the
    /// whole batch passed the inserter.
    pub fn enqueue(
        &self,
        peer: &str,
        events: Vec<Event>,
        ordered: bool,
        notify_announces: Option<Box<dyn FnOnce(Vec<EventId>) + Send>>,
        done: Option<Box<dyn FnOnce() + Send>>,
    ) -> Result<(), DagError> {
        let metric = events_metric(&events);
        if !self
            .semaphore
            .acquire(metric, self.cfg.events_semaphore_timeout)
        {
            return Err(DagError::Busy);
        }

        let n = events.len();
        let (results_tx, results_rx) = bounded::<CheckResult>(n.max(1));

        let check_parentless = self.check_parentless.clone();
        let checker_task = Box::new(move || {
            use rayon::prelude::*;
            events
                .into_par_iter()
                .enumerate()
                .for_each_with(results_tx, |tx, (pos, event)| {
                    let err = event
                        .validate_basic()
                        .and_then(|_| check_parentless(&event))
                        .err();
                    let _ = tx.send(CheckResult { pos, event, err });
                });
        });
        if self.checkers.enqueue(checker_task).is_err() {
            self.semaphore.release(metric);
            return Err(DagError::Terminated);
        }

        let buffer = self.buffer.clone();
        let get = self.get.clone();
        let release_event = self.release_event.clone();
        let highest_lamport = self.highest_lamport.clone();
        let buffer_num = self.cfg.events_buffer_limit.num;
        let peer = peer.to_string();
        let inserter_task = Box::new(move || {
            let mut to_request: Vec<EventId> = Vec::new();
            let insert = |event: Event, err: Option<EventError>, to_request: &mut Vec<EventId>| {
                if let Some(err) = err {
                    release_event(&event, &peer, Some(&DagError::Validation(err)));
                    return;
                }
                let highest = highest_lamport() as u64;
                if event.lamport() as u64 > highest + buffer_num as u64 + 1 {
                    // Too far above the head to ever complete soon;
                    // spill instead of occupying the buffer.
                    release_event(&event, &peer, Some(&DagError::SpilledEvent));
                    return;
                }
                for p in event.parents() {
                    if get(p).is_none() && !buffer.is_buffered(p) && !to_request.contains(p) {
                        to_request.push(*p);
                    }
                }
                buffer.push_event(event, &peer);
            };

            if ordered {
                let mut staging: Vec<Option<(Event, Option<EventError>)>> =
                    (0..n).map(|_| None).collect();
                let mut next = 0;
                for _ in 0..n {
                    let res = match results_rx.recv() {
                        Ok(res) => res,
                        Err(_) => break,
                    };
                    staging[res.pos] = Some((res.event, res.err));
                    while next < n {
                        match staging[next].take() {
                            Some((event, err)) => {
                                insert(event, err, &mut to_request);
                                next += 1;
                            }
                            None => break,
                        }
                    }
                }
            } else {
                for _ in 0..n {
                    match results_rx.recv() {
                        Ok(res) => insert(res.event, res.err, &mut to_request),
                        Err(_) => break,
                    }
                }
            }

            if !to_request.is_empty() {
                debug!(count = to_request.len(), "requesting missing parents");
            }
            if let Some(notify) = notify_announces {
                notify(to_request);
            }
            if let Some(done) = done {
                done();
            }
        });
        if self.inserters.enqueue(inserter_task).is_err() {
            self.semaphore.release(metric);
            return Err(DagError::Terminated);
        }

        Ok(())
    }

    /// True when either pool's pending work exceeds 75% of its capacity
    pub fn overloaded(&self) -> bool {
        self.checkers.overloaded() || self.inserters.overloaded()
    }

    /// Current (count, total size) of the incomplete-event buffer
    pub fn buffered(&self) -> (usize, u64) {
        self.buffer.total()
    }

    /// True if `id` waits in the incomplete-event buffer
    pub fn is_buffered(&self, id: &EventId) -> bool {
        self.buffer.is_buffered(id)
    }

    /// Shut down: terminate the semaphore, stop and drain the workers,
    /// then clear the buffer so every remaining event is released
    pub fn stop(&self) {
        let quit = self.quit_tx.lock().take();
        drop(quit);
        self.semaphore.terminate();
        self.checkers.drain();
        self.inserters.drain();
        self.checkers.join();
        self.inserters.join();
        self.buffer.clear();
    }
}

fn events_metric(events: &[Event]) -> Metric {
    Metric {
        num: events.len(),
        size: events.iter().map(|e| e.size()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::event::EventBuilder;
    use crate::validators::ValidatorId;
    use parking_lot::Mutex as PlMutex;
    use std::collections::HashMap;

    struct Harness {
        processed: Arc<PlMutex<Vec<EventId>>>,
        released_errs: Arc<PlMutex<Vec<Option<String>>>>,
        known: Arc<PlMutex<HashMap<EventId, Event>>>,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                processed: Arc::new(PlMutex::new(Vec::new())),
                released_errs: Arc::new(PlMutex::new(Vec::new())),
                known: Arc::new(PlMutex::new(HashMap::new())),
            }
        }

        fn processor(&self, cfg: ProcessorConfig) -> Processor {
            let processed = self.processed.clone();
            let known = self.known.clone();
            let known_get = self.known.clone();
            let released = self.released_errs.clone();
            let p = Processor::new(
                cfg,
                ProcessorCallbacks {
                    process: Box::new(move |e| {
                        processed.lock().push(e.id());
                        known.lock().insert(e.id(), e.clone());
                        Ok(())
                    }),
                    get: Box::new(move |id| known_get.lock().get(id).cloned()),
                    check: None,
                    check_parentless: Box::new(|_| Ok(())),
                    released: Box::new(move |_, _, err| {
                        released.lock().push(err.map(|e| e.to_string()));
                    }),
                    highest_lamport: Box::new(|| 0),
                },
            );
            p.start();
            p
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

    fn wait_done(rx: &crossbeam_channel::Receiver<()>) {
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_ordered_batch_processes_in_input_order() {
        let h = Harness::new();
        let p = h.processor(ProcessorConfig::default());

        let a = event(1, 1, 1, vec![]);
        let b = event(2, 1, 1, vec![]);
        let c = event(3, 1, 1, vec![]);
        let expected = vec![a.id(), b.id(), c.id()];

        let (done_tx, done_rx) = bounded(1);
        p.enqueue(
            "peer",
            vec![a, b, c],
            true,
            None,
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .unwrap();

        wait_done(&done_rx);
        assert_eq!(h.processed.lock().as_slice(), expected.as_slice());
        p.stop();
    }

    #[test]
    fn test_busy_when_semaphore_full() {
        let h = Harness::new();
        let cfg = ProcessorConfig {
            events_buffer_limit: BufferLimit { num: 1, size: 64 },
            events_semaphore_timeout: Duration::from_millis(10),
            max_tasks: 4,
        };
        let p = h.processor(cfg);

        let a = event(1, 1, 1, vec![]);
        let b = event(2, 1, 1, vec![]);
        let res = p.enqueue("peer", vec![a, b], false, None, None);
        assert_eq!(res, Err(DagError::Busy));
        p.stop();
    }

    #[test]
    fn test_missing_parents_announced() {
        let h = Harness::new();
        let p = h.processor(ProcessorConfig::default());

        let missing = event(9, 1, 1, vec![]);
        let child = event(1, 2, 2, vec![missing.id()]);

        let (ann_tx, ann_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        p.enqueue(
            "peer",
            vec![child],
            false,
            Some(Box::new(move |ids| {
                let _ = ann_tx.send(ids);
            })),
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .unwrap();

        wait_done(&done_rx);
        let announced = ann_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(announced, vec![missing.id()]);
        p.stop();
    }

    #[test]
    fn test_lamport_too_high_is_spilled() {
        let h = Harness::new();
        let cfg = ProcessorConfig {
            events_buffer_limit: BufferLimit {
                num: 2,
                size: 1 << 20,
            },
            events_semaphore_timeout: Duration::from_millis(100),
            max_tasks: 4,
        };
        let p = h.processor(cfg);

        // highest lamport is 0, window is 0 + 2 + 1
        let far = event(1, 1, 100, vec![]);
        let (done_tx, done_rx) = bounded(1);
        p.enqueue(
            "peer",
            vec![far],
            false,
            None,
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .unwrap();

        wait_done(&done_rx);
        assert!(h.processed.lock().is_empty());
        let errs = h.released_errs.lock();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].as_deref(), Some("event spilled out of the buffer"));
        p.stop();
    }

    #[test]
    fn test_parentless_check_failure_released() {
        let h = Harness::new();
        let processed = h.processed.clone();
        let known_get = h.known.clone();
        let released = h.released_errs.clone();
        let p = Processor::new(
            ProcessorConfig::default(),
            ProcessorCallbacks {
                process: Box::new(move |e| {
                    processed.lock().push(e.id());
                    Ok(())
                }),
                get: Box::new(move |id| known_get.lock().get(id).cloned()),
                check: None,
                check_parentless: Box::new(|_| Err(EventError::Auth)),
                released: Box::new(move |_, _, err| {
                    released.lock().push(err.map(|e| e.to_string()));
                }),
                highest_lamport: Box::new(|| 0),
            },
        );
        p.start();

        let (done_tx, done_rx) = bounded(1);
        p.enqueue(
            "peer",
            vec![event(1, 1, 1, vec![])],
            false,
            None,
            Some(Box::new(move || {
                let _ = done_tx.send(());
            })),
        )
        .unwrap();

        wait_done(&done_rx);
        assert!(h.processed.lock().is_empty());
        assert_eq!(
            h.released_errs.lock()[0].as_deref(),
            Some("event creator is not a known validator")
        );
        p.stop();
    }

    #[test]
    fn test_enqueue_after_stop_terminated() {
        let h = Harness::new();
        let p = h.processor(ProcessorConfig::default());
        p.stop();

        let res = p.enqueue("peer", vec![event(1, 1, 1, vec![])], false, None, None);
        assert!(matches!(
            res,
            Err(DagError::Terminated) | Err(DagError::Busy)
        ));
    }

    #[test]
    fn test_not_overloaded_when_idle() {
        let h = Harness::new();
        let p = h.processor(ProcessorConfig::default());
        assert!(!p.overloaded());
        p.stop();
    }
}
